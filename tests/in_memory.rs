//! In-memory adapter and service integration tests.
//!
//! Tests are organized into modules by functionality:
//! - `workspace_store_tests`: Row versioning, live-source uniqueness, outbox
//! - `session_flow_tests`: Attempt, workspace and teardown through the services

mod test_helpers;

mod in_memory {
    pub mod helpers;

    mod session_flow_tests;
    mod workspace_store_tests;
}
