//! GIGO workspaces: ephemeral development workspace orchestration.
//!
//! This crate decides what container to run for a learner's code source,
//! how much CPU, memory and disk it may use, and when it starts, stops and
//! is destroyed. Container execution itself happens in a follower pool that
//! consumes lifecycle intents from a message bus.
//!
//! # Architecture
//!
//! The crate follows hexagonal architecture principles:
//!
//! - **Domain**: Pure business logic with no infrastructure dependencies
//! - **Ports**: Abstract trait interfaces for external interactions
//! - **Adapters**: Concrete implementations of ports (database, HTTP, filesystem)
//!
//! # Modules
//!
//! - [`resource_policy`]: Tier ceilings and resource clamping
//! - [`vcs`]: Version-control client port
//! - [`workspace_config`]: Workspace config parsing, resolution and templates
//! - [`pull_through`]: Editor binary and extension caches
//! - [`workspace`]: Workspace lifecycle, attempts and ephemeral sessions
//! - [`status`]: Per-workspace status fan-out
//! - [`config`] and [`telemetry`]: Environment configuration and logging

pub mod config;
pub mod error;
pub mod pull_through;
pub mod resource_policy;
pub mod status;
pub mod telemetry;
pub mod vcs;
pub mod workspace;
pub mod workspace_config;
