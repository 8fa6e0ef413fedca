//! Workspace lifecycle state and provisioning progress.

use super::{ParseInitStateError, ParseWorkspaceStateError};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Lifecycle state of a workspace row.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WorkspaceState {
    /// Container is being provisioned or restarted.
    Starting,
    /// Provisioning finished and the editor is reachable.
    Active,
    /// A stop intent was published and the follower is draining.
    Stopping,
    /// The container is stopped but its volume is retained.
    Stopped,
    /// A destroy intent was published.
    Removing,
    /// The follower confirmed the container is gone.
    Deleted,
    /// Provisioning failed; `init_failure` explains why.
    Failed,
}

impl WorkspaceState {
    /// Every state, in lifecycle order.
    pub const ALL: [Self; 7] = [
        Self::Starting,
        Self::Active,
        Self::Stopping,
        Self::Stopped,
        Self::Removing,
        Self::Deleted,
        Self::Failed,
    ];

    /// Returns the canonical storage representation.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Starting => "starting",
            Self::Active => "active",
            Self::Stopping => "stopping",
            Self::Stopped => "stopped",
            Self::Removing => "removing",
            Self::Deleted => "deleted",
            Self::Failed => "failed",
        }
    }

    /// Returns whether a row in this state blocks creation of another row
    /// for the same source tuple and may be reused by Create.
    #[must_use]
    pub const fn is_live(self) -> bool {
        !matches!(self, Self::Removing | Self::Deleted | Self::Failed)
    }

    /// Returns whether the in-container agent may act on the workspace.
    #[must_use]
    pub const fn accepts_agent(self) -> bool {
        matches!(self, Self::Starting | Self::Active)
    }

    /// Returns whether a follower may move a row into this state.
    ///
    /// `failed` needs an init failure record and `removing` a destroy
    /// intent, so both are reserved for the orchestrator.
    #[must_use]
    pub const fn is_follower_reportable(self) -> bool {
        matches!(self, Self::Active | Self::Stopped | Self::Deleted)
    }

    /// Returns whether the expiration reaper should destroy an expired row.
    #[must_use]
    pub const fn is_reapable(self) -> bool {
        matches!(
            self,
            Self::Starting | Self::Active | Self::Stopping | Self::Stopped
        )
    }

    /// Returns whether transition to `target` is allowed.
    ///
    /// Self-transitions are accepted so that replayed follower reports are
    /// no-ops rather than failures.
    #[must_use]
    pub fn can_transition_to(self, target: Self) -> bool {
        if self == target {
            return true;
        }
        matches!(
            (self, target),
            (
                Self::Starting,
                Self::Active | Self::Stopping | Self::Removing | Self::Failed
            ) | (
                Self::Active,
                Self::Starting | Self::Stopping | Self::Removing | Self::Failed
            ) | (
                Self::Stopping,
                Self::Stopped | Self::Removing | Self::Failed
            ) | (Self::Stopped, Self::Starting | Self::Removing)
                | (Self::Removing, Self::Deleted | Self::Failed)
                | (Self::Failed, Self::Removing | Self::Deleted)
        )
    }
}

impl fmt::Display for WorkspaceState {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter.write_str(self.as_str())
    }
}

impl TryFrom<&str> for WorkspaceState {
    type Error = ParseWorkspaceStateError;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        let normalized = value.trim().to_ascii_lowercase();
        Self::ALL
            .into_iter()
            .find(|state| state.as_str() == normalized)
            .ok_or_else(|| ParseWorkspaceStateError(value.to_owned()))
    }
}

/// Provisioning step reported by the in-container agent.
///
/// Steps are ordered; `NotStarted` is the `-1` sentinel written whenever a
/// workspace (re)enters `starting`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(into = "i32", try_from = "i32")]
pub enum InitState {
    /// Nothing has run yet.
    NotStarted,
    /// Container resources are being provisioned.
    Provisioning,
    /// Git identity and credentials are written.
    WritingGitConfig,
    /// The source repository is cloned.
    CloningRepository,
    /// `.gigo/workspace.yaml` is written into the container.
    WritingWorkspaceConfig,
    /// The editor binary is installed.
    InstallingEditor,
    /// Editor extensions are installed.
    InstallingExtensions,
    /// User-defined init commands are executed.
    RunningInitCommands,
    /// The editor process is launched.
    LaunchingEditor,
    /// Provisioning finished.
    Completed,
}

impl InitState {
    const ORDER: [Self; 10] = [
        Self::NotStarted,
        Self::Provisioning,
        Self::WritingGitConfig,
        Self::CloningRepository,
        Self::WritingWorkspaceConfig,
        Self::InstallingEditor,
        Self::InstallingExtensions,
        Self::RunningInitCommands,
        Self::LaunchingEditor,
        Self::Completed,
    ];

    /// Returns the persisted integer value.
    #[must_use]
    pub const fn as_i32(self) -> i32 {
        match self {
            Self::NotStarted => -1,
            Self::Provisioning => 0,
            Self::WritingGitConfig => 1,
            Self::CloningRepository => 2,
            Self::WritingWorkspaceConfig => 3,
            Self::InstallingEditor => 4,
            Self::InstallingExtensions => 5,
            Self::RunningInitCommands => 6,
            Self::LaunchingEditor => 7,
            Self::Completed => 8,
        }
    }

    /// Returns the step that follows this one, if any.
    #[must_use]
    pub fn next(self) -> Option<Self> {
        Self::ORDER
            .into_iter()
            .skip_while(|step| *step != self)
            .nth(1)
    }

    /// Returns the value shown to the UI: the step currently in progress.
    #[must_use]
    pub const fn frontend_value(self) -> i32 {
        match self {
            Self::Completed => Self::Completed.as_i32(),
            other => other.as_i32() + 1,
        }
    }
}

impl From<InitState> for i32 {
    fn from(value: InitState) -> Self {
        value.as_i32()
    }
}

impl TryFrom<i32> for InitState {
    type Error = ParseInitStateError;

    fn try_from(value: i32) -> Result<Self, Self::Error> {
        Self::ORDER
            .into_iter()
            .find(|step| step.as_i32() == value)
            .ok_or(ParseInitStateError(value))
    }
}

impl fmt::Display for InitState {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(formatter, "{}", self.as_i32())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case(WorkspaceState::Starting, WorkspaceState::Active, true)]
    #[case(WorkspaceState::Active, WorkspaceState::Stopping, true)]
    #[case(WorkspaceState::Stopping, WorkspaceState::Stopped, true)]
    #[case(WorkspaceState::Stopped, WorkspaceState::Starting, true)]
    #[case(WorkspaceState::Stopped, WorkspaceState::Removing, true)]
    #[case(WorkspaceState::Removing, WorkspaceState::Deleted, true)]
    #[case(WorkspaceState::Active, WorkspaceState::Active, true)]
    #[case(WorkspaceState::Deleted, WorkspaceState::Starting, false)]
    #[case(WorkspaceState::Removing, WorkspaceState::Active, false)]
    #[case(WorkspaceState::Failed, WorkspaceState::Starting, false)]
    #[case(WorkspaceState::Stopped, WorkspaceState::Active, false)]
    fn lifecycle_transition_matrix(
        #[case] current: WorkspaceState,
        #[case] target: WorkspaceState,
        #[case] expected: bool,
    ) {
        assert_eq!(current.can_transition_to(target), expected);
    }

    #[rstest]
    #[case(WorkspaceState::Starting, true)]
    #[case(WorkspaceState::Stopped, true)]
    #[case(WorkspaceState::Removing, false)]
    #[case(WorkspaceState::Deleted, false)]
    #[case(WorkspaceState::Failed, false)]
    fn liveness_excludes_terminal_states(#[case] state: WorkspaceState, #[case] expected: bool) {
        assert_eq!(state.is_live(), expected);
    }

    #[test]
    fn state_round_trips_through_storage_form() {
        for state in WorkspaceState::ALL {
            assert_eq!(WorkspaceState::try_from(state.as_str()), Ok(state));
        }
    }

    #[test]
    fn init_state_advances_by_one() {
        assert_eq!(InitState::NotStarted.next(), Some(InitState::Provisioning));
        assert_eq!(
            InitState::LaunchingEditor.next(),
            Some(InitState::Completed)
        );
        assert_eq!(InitState::Completed.next(), None);
    }

    #[rstest]
    #[case(InitState::NotStarted, 0)]
    #[case(InitState::CloningRepository, 3)]
    #[case(InitState::Completed, 8)]
    fn frontend_value_reports_step_in_progress(#[case] state: InitState, #[case] expected: i32) {
        assert_eq!(state.frontend_value(), expected);
    }

    #[test]
    fn init_state_rejects_unknown_values() {
        assert_eq!(InitState::try_from(3), Ok(InitState::WritingWorkspaceConfig));
        assert_eq!(InitState::try_from(42), Err(ParseInitStateError(42)));
    }
}
