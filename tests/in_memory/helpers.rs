//! Fixtures for the in-memory integration tests.

use gigo_workspaces::workspace::domain::{
    AttemptId, CodeSourceId, CodeSourceRef, CodeSourceType, LifecycleIntent,
};
use rstest::fixture;

use crate::test_helpers::InMemoryStack;

/// Provides a freshly wired in-memory stack for each test.
#[fixture]
pub fn stack() -> InMemoryStack {
    InMemoryStack::new()
}

/// Code source reference for an attempt.
pub const fn attempt_source(attempt_id: AttemptId) -> CodeSourceRef {
    CodeSourceRef::new(
        CodeSourceId::new(attempt_id.into_inner()),
        CodeSourceType::Attempt,
    )
}

/// Bus subjects published so far, in order.
pub fn published_subjects(stack: &InMemoryStack) -> Vec<&'static str> {
    stack
        .bus
        .published()
        .expect("published intents")
        .iter()
        .map(LifecycleIntent::subject)
        .collect()
}
