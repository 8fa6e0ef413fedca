//! Adapter implementations for template persistence.

pub mod memory;
pub mod postgres;
