//! Structured record of a failed provisioning step.

use serde::{Deserialize, Serialize};

/// Output of the command that failed during workspace initialisation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InitFailureRecord {
    /// Command that was executed.
    pub command: String,
    /// Process exit status.
    #[serde(rename = "status")]
    pub exit_status: i32,
    /// Captured standard output.
    pub stdout: String,
    /// Captured standard error.
    pub stderr: String,
}

impl InitFailureRecord {
    /// Creates a failure record.
    #[must_use]
    pub fn new(
        command: impl Into<String>,
        exit_status: i32,
        stdout: impl Into<String>,
        stderr: impl Into<String>,
    ) -> Self {
        Self {
            command: command.into(),
            exit_status,
            stdout: stdout.into(),
            stderr: stderr.into(),
        }
    }
}

/// Port forwarded out of a workspace container, reported by followers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PortDescriptor {
    /// Human-readable label.
    pub name: String,
    /// Container port number.
    pub port: u16,
    /// Whether the port is reachable without the owner's session.
    #[serde(default)]
    pub public: bool,
}
