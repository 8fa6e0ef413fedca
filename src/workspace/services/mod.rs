//! Application services for workspace lifecycle orchestration.

mod attempt_fork;
mod ephemeral;
mod error;
mod lifecycle;
mod outbox_relay;
mod ports;
mod reaper;
mod settings;

pub use attempt_fork::{
    AttemptForkError, AttemptForkResult, AttemptForkService, StartAttemptOutcome,
    StartAttemptRequest, StartedAttempt, thumbnail_key,
};
pub use ephemeral::{
    ALREADY_USED_MESSAGE, EphemeralClaim, EphemeralError, EphemeralOutcome, EphemeralRequest,
    EphemeralResult, EphemeralService, PurgeReport,
};
pub use error::{WorkspaceLifecycleError, WorkspaceLifecycleResult};
pub use lifecycle::{
    CreateOutcome, CreateWorkspaceRequest, ExpirationOutcome, TransitionOutcome,
    WORKSPACE_CREATED_MESSAGE, WorkspaceHandle, WorkspaceLifecycleService, WorkspaceStatus,
};
pub use outbox_relay::{OutboxRelay, OutboxRelayError, OutboxRelayResult};
pub use ports::WorkspacePorts;
pub use reaper::ExpirationReaper;
pub use settings::LifecycleSettings;
