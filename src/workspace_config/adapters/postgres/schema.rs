//! Diesel schema for workspace config templates.

diesel::table! {
    /// Append-only template revisions.
    workspace_configs (id, revision) {
        /// Template identifier shared by every revision.
        id -> Int8,
        /// Revision number, starting at zero.
        revision -> Int8,
        /// Author of the revision.
        author_id -> Int8,
        /// Display title.
        title -> Text,
        /// Free-form description.
        description -> Text,
        /// Raw YAML content.
        content -> Text,
        /// Search tags.
        tags -> Array<Text>,
        /// Target programming languages.
        languages -> Array<Text>,
        /// Attempts started from this revision.
        uses -> Int8,
        /// Workspaces created with unmodified content.
        completions -> Int8,
        /// Creation timestamp.
        created_at -> Timestamptz,
    }
}
