//! Pull-through caches for the editor binary and editor extensions.
//!
//! Both caches follow the same shape: look for a finished object in the
//! object store, otherwise fetch from upstream and stream the body to the
//! caller while teeing it into the store. The tee commits the object only
//! when the whole body arrived with the advertised length; if the caller
//! disconnects, the upstream fails or the length disagrees, the partial
//! object is discarded.
//!
//! - Domain types in [`domain`]
//! - Port contracts in [`ports`]
//! - Adapter implementations in [`adapters`]
//! - Orchestration services in [`services`]

pub mod adapters;
pub mod domain;
pub mod ports;
pub mod services;
