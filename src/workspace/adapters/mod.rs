//! Adapter implementations for the workspace ports.

pub mod memory;
pub mod postgres;
mod snowflake;

pub use snowflake::SnowflakeIdGenerator;
