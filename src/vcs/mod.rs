//! Typed client for the Git server hosting challenge and attempt
//! repositories.
//!
//! The orchestrator reads `.gigo/workspace.yaml` through it, grants and
//! revokes collaborator access, and forks post repositories into attempt
//! repositories.

pub mod adapters;
pub mod ports;
