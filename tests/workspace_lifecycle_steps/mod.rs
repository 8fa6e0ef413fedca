//! Step definitions for workspace lifecycle scenarios.

pub mod world;

mod given;
mod then;
mod when;
