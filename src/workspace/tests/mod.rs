//! Service tests for workspace lifecycle, attempts and ephemeral sessions.

mod harness;
