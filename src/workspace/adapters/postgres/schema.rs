//! Diesel schema for workspace persistence.

diesel::table! {
    /// Workspace rows.
    workspaces (id) {
        /// Snowflake identifier.
        id -> Int8,
        /// Owning user.
        owner_id -> Int8,
        /// Source repository, `-1` for bytes.
        repo_id -> Int8,
        /// Commit or branch opened in the editor.
        commit_ref -> Text,
        /// Code source row identifier.
        code_source_id -> Int8,
        /// Code source kind.
        #[max_length = 16]
        code_source_type -> Varchar,
        /// Lifecycle state.
        #[max_length = 16]
        state -> Varchar,
        /// Provisioning step.
        init_state -> Int4,
        /// Failure record when provisioning failed.
        init_failure -> Nullable<Jsonb>,
        /// Instant after which the reaper destroys the workspace.
        expiration -> Timestamptz,
        /// Last lifecycle transition.
        last_state_update -> Timestamptz,
        /// Creation timestamp.
        created_at -> Timestamptz,
        /// Editor settings snapshot.
        workspace_settings -> Jsonb,
        /// Clamping record.
        over_allocated -> Nullable<Jsonb>,
        /// Granted CPU cores.
        cpu -> Int8,
        /// Granted memory in GiB.
        mem -> Int8,
        /// Granted disk in GiB.
        disk -> Int8,
        /// Base container image.
        container -> Text,
        /// Forwarded ports.
        ports -> Jsonb,
        /// Whether the workspace belongs to an ephemeral user.
        is_ephemeral -> Bool,
        /// Optimistic concurrency counter.
        version -> Int8,
    }
}

diesel::table! {
    /// Lifecycle intents awaiting delivery to the bus.
    workspace_outbox (id) {
        /// Monotonic entry identifier.
        id -> Int8,
        /// Workspace the intent targets.
        workspace_id -> Int8,
        /// Bus subject.
        #[max_length = 64]
        subject -> Varchar,
        /// JSON payload.
        payload -> Jsonb,
        /// Commit timestamp.
        created_at -> Timestamptz,
        /// Set once the bus accepted the entry.
        delivered_at -> Nullable<Timestamptz>,
    }
}

diesel::table! {
    /// Per-workspace secrets held by in-container agents.
    workspace_agents (workspace_id) {
        /// Workspace the agent runs in.
        workspace_id -> Int8,
        /// Opaque secret.
        secret -> Uuid,
        /// Issue timestamp.
        created_at -> Timestamptz,
    }
}

diesel::table! {
    /// Permanent `(ip, challenge)` claims of ephemeral workspaces.
    ephemeral_shared_workspaces (ip, challenge_id) {
        /// Network identity.
        ip -> Int8,
        /// Challenge post.
        challenge_id -> Int8,
        /// Workspace created for the claim.
        workspace_id -> Int8,
        /// Ephemeral user.
        user_id -> Int8,
        /// Claim timestamp.
        date -> Timestamptz,
    }
}

diesel::table! {
    /// Challenge posts.
    posts (id) {
        /// Post identifier.
        id -> Int8,
        /// Display title.
        title -> Text,
        /// Description.
        description -> Text,
        /// Author.
        author_id -> Int8,
        /// Visibility gate.
        #[max_length = 16]
        visibility -> Varchar,
        /// Backing repository.
        repo_id -> Int8,
        /// Editor settings for workspaces on this post.
        workspace_settings -> Nullable<Jsonb>,
        /// Referenced template.
        template_id -> Nullable<Int8>,
        /// Referenced template revision.
        template_revision -> Nullable<Int8>,
        /// Attempts started.
        attempts -> Int8,
        /// Last activity.
        updated_at -> Nullable<Timestamptz>,
    }
}

diesel::table! {
    /// Learner attempts forked from posts.
    attempts (id) {
        /// Attempt identifier.
        id -> Int8,
        /// Attempted post.
        post_id -> Int8,
        /// Learner.
        author_id -> Int8,
        /// Learner display name.
        author_name -> Text,
        /// Learner tier at creation.
        #[max_length = 16]
        author_tier -> Varchar,
        /// Title copied from the post.
        title -> Text,
        /// Description copied from the post.
        description -> Text,
        /// Forked repository.
        repo_id -> Int8,
        /// Published attempt this one was forked from.
        parent_attempt -> Nullable<Int8>,
        /// Whether the attempt is published.
        closed -> Bool,
        /// Editor settings copied from the post.
        workspace_settings -> Nullable<Jsonb>,
        /// Creation timestamp.
        created_at -> Timestamptz,
        /// Last activity.
        updated_at -> Nullable<Timestamptz>,
    }
}

diesel::table! {
    /// Byte scratch sources.
    bytes (id) {
        /// Byte identifier.
        id -> Int8,
        /// Owner.
        owner_id -> Int8,
        /// Display name.
        name -> Text,
        /// Last activity.
        updated_at -> Nullable<Timestamptz>,
    }
}

diesel::table! {
    /// Posts recommended to users.
    recommended_posts (user_id, post_id) {
        /// Recommended-to user.
        user_id -> Int8,
        /// Recommended post.
        post_id -> Int8,
        /// Set once the user attempts the post.
        accepted -> Bool,
    }
}

diesel::allow_tables_to_appear_in_same_query!(posts, attempts);
