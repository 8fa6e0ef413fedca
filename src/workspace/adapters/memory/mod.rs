//! In-memory adapters for the workspace ports.
//!
//! They back the integration tests and support failure injection so tests
//! can observe rollback behaviour.

mod bus;
mod code_source;
mod ids;
mod users;
mod workspace;

pub use bus::InMemoryMessageBus;
pub use code_source::InMemoryCodeSources;
pub use ids::SequentialIdGenerator;
pub use users::InMemoryUserDirectory;
pub use workspace::InMemoryWorkspaceStore;
