//! Workspace lifecycle management.
//!
//! A workspace is a container-backed editing session over a code source.
//! The lifecycle services mutate rows through [`ports::WorkspaceRepository`],
//! which commits each row change together with its lifecycle intent in a
//! transactional outbox. [`services::OutboxRelay`] then publishes committed
//! intents to the follower pool.
//!
//! - Domain types in [`domain`]
//! - Port contracts in [`ports`]
//! - Adapter implementations in [`adapters`]
//! - Orchestration services in [`services`]

pub mod adapters;
pub mod domain;
pub mod ports;
pub mod services;

#[cfg(test)]
mod tests;
