//! Port contracts for workspace persistence, messaging and collaborators.

mod bus;
mod code_source;
mod ids;
mod outbox;
mod repository;
mod users;

pub use bus::{BusError, BusResult, MessageBus};
pub use code_source::{
    CodeSourceLink, CodeSourceRepository, CodeSourceRepositoryError, CodeSourceRepositoryResult,
};
pub use ids::IdGenerator;
pub use outbox::{LifecycleOutbox, OutboxEntry, OutboxError, OutboxResult};
pub use repository::{WorkspaceRepository, WorkspaceRepositoryError, WorkspaceRepositoryResult};
pub use users::{UserDirectory, UserDirectoryError, UserDirectoryResult, UserRecord};
