//! Adapter implementations for the VCS port.

mod memory;

pub use memory::{InMemoryVcs, VcsEvent};
