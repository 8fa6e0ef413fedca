//! Adapter implementations for the pull-through ports.

mod filesystem;
mod http;
pub mod memory;
mod version_cache;

pub use filesystem::FilesystemObjectStore;
pub use http::{HttpFetcher, OpenVsxRegistry};
pub use version_cache::MokaVersionCache;
