//! Workspace configuration for GIGO workspaces.
//!
//! Two concerns live here. The resolver turns `.gigo/workspace.yaml` at a
//! pinned commit into a [`ResolvedConfig`](domain::ResolvedConfig) and runs it
//! through the resource policy. Templates are the public, append-only
//! revisions of those YAML files that posts reference. The module follows
//! hexagonal architecture:
//!
//! - Domain types in [`domain`]
//! - Port contracts in [`ports`]
//! - Adapter implementations in [`adapters`]
//! - Orchestration services in [`services`]

pub mod adapters;
pub mod domain;
pub mod ports;
pub mod services;
