//! Editor URLs handed to the UI.

use super::{UserId, WorkspaceId};

/// Builds the editor URL for a repository-backed workspace.
///
/// # Examples
///
/// ```
/// use gigo_workspaces::workspace::domain::{UserId, WorkspaceId, editor_url};
///
/// let url = editor_url(UserId::new(100), WorkspaceId::new(5), "c1", "/w");
/// assert_eq!(url, "/editor/100/5-c1?folder=%2Fw");
/// ```
#[must_use]
pub fn editor_url(
    owner_id: UserId,
    workspace_id: WorkspaceId,
    commit: &str,
    working_directory: &str,
) -> String {
    format!(
        "/editor/{owner_id}/{workspace_id}-{commit}?folder={}",
        urlencoding::encode(working_directory)
    )
}

/// Builds the agent URL for a byte workspace.
#[must_use]
pub fn byte_agent_url(owner_id: UserId, workspace_id: WorkspaceId) -> String {
    format!("/agent/{owner_id}/{workspace_id}/ws")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn working_directory_is_query_escaped() {
        let url = editor_url(
            UserId::new(1),
            WorkspaceId::new(2),
            "abc",
            "/home/gigo/my project",
        );
        assert_eq!(url, "/editor/1/2-abc?folder=%2Fhome%2Fgigo%2Fmy%20project");
    }

    #[test]
    fn byte_workspaces_use_agent_route() {
        assert_eq!(
            byte_agent_url(UserId::new(7), WorkspaceId::new(9)),
            "/agent/7/9/ws"
        );
    }
}
