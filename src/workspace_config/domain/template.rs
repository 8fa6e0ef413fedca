//! Workspace config template aggregate.
//!
//! Templates are append-only. Editing one produces a new revision that is a
//! copy of the previous revision with the edit applied; stored revisions are
//! never modified except for their usage counters.

use super::{TemplateDomainError, TemplateId, TemplateRef};
use crate::workspace::domain::UserId;
use chrono::{DateTime, Utc};
use mockable::Clock;
use serde::{Deserialize, Serialize};

/// Inputs for revision zero of a new template.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewTemplateData {
    /// Identifier minted for the template.
    pub id: TemplateId,
    /// Author.
    pub author_id: UserId,
    /// Display title.
    pub title: String,
    /// Free-form description.
    pub description: String,
    /// Raw YAML content.
    pub content: String,
    /// Search tags.
    pub tags: Vec<String>,
    /// Programming languages the template targets.
    pub languages: Vec<String>,
}

/// Delta applied when revising a template. `None` keeps the prior value.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TemplateEdit {
    description: Option<String>,
    content: Option<String>,
    tags: Option<Vec<String>>,
    languages: Option<Vec<String>>,
}

impl TemplateEdit {
    /// Creates an empty edit.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Replaces the description.
    #[must_use]
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    /// Replaces the YAML content.
    #[must_use]
    pub fn with_content(mut self, content: impl Into<String>) -> Self {
        self.content = Some(content.into());
        self
    }

    /// Replaces the tags.
    #[must_use]
    pub fn with_tags(mut self, tags: impl IntoIterator<Item = String>) -> Self {
        self.tags = Some(tags.into_iter().collect());
        self
    }

    /// Replaces the languages.
    #[must_use]
    pub fn with_languages(mut self, languages: impl IntoIterator<Item = String>) -> Self {
        self.languages = Some(languages.into_iter().collect());
        self
    }
}

/// One revision of a workspace config template.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorkspaceTemplate {
    id: TemplateId,
    revision: i64,
    author_id: UserId,
    title: String,
    description: String,
    content: String,
    tags: Vec<String>,
    languages: Vec<String>,
    uses: i64,
    completions: i64,
    created_at: DateTime<Utc>,
}

/// Parameter object for reconstructing a persisted template revision.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PersistedTemplateData {
    /// Persisted identifier.
    pub id: TemplateId,
    /// Persisted revision number.
    pub revision: i64,
    /// Persisted author.
    pub author_id: UserId,
    /// Persisted title.
    pub title: String,
    /// Persisted description.
    pub description: String,
    /// Persisted YAML content.
    pub content: String,
    /// Persisted tags.
    pub tags: Vec<String>,
    /// Persisted languages.
    pub languages: Vec<String>,
    /// Persisted attempt counter.
    pub uses: i64,
    /// Persisted completion counter.
    pub completions: i64,
    /// Persisted creation timestamp.
    pub created_at: DateTime<Utc>,
}

impl WorkspaceTemplate {
    /// Creates revision zero.
    ///
    /// # Errors
    ///
    /// Returns [`TemplateDomainError::EmptyTitle`] for a blank title.
    pub fn new(data: NewTemplateData, clock: &impl Clock) -> Result<Self, TemplateDomainError> {
        if data.title.trim().is_empty() {
            return Err(TemplateDomainError::EmptyTitle);
        }
        Ok(Self {
            id: data.id,
            revision: 0,
            author_id: data.author_id,
            title: data.title,
            description: data.description,
            content: data.content,
            tags: data.tags,
            languages: data.languages,
            uses: 0,
            completions: 0,
            created_at: clock.utc(),
        })
    }

    /// Reconstructs a revision from persistence.
    #[must_use]
    pub fn from_persisted(data: PersistedTemplateData) -> Self {
        Self {
            id: data.id,
            revision: data.revision,
            author_id: data.author_id,
            title: data.title,
            description: data.description,
            content: data.content,
            tags: data.tags,
            languages: data.languages,
            uses: data.uses,
            completions: data.completions,
            created_at: data.created_at,
        }
    }

    /// Builds the next revision with `edit` applied.
    #[must_use]
    pub fn revise(&self, edit: TemplateEdit, clock: &impl Clock) -> Self {
        let TemplateEdit {
            description,
            content,
            tags,
            languages,
        } = edit;
        Self {
            revision: self.revision + 1,
            description: description.unwrap_or_else(|| self.description.clone()),
            content: content.unwrap_or_else(|| self.content.clone()),
            tags: tags.unwrap_or_else(|| self.tags.clone()),
            languages: languages.unwrap_or_else(|| self.languages.clone()),
            created_at: clock.utc(),
            ..self.clone()
        }
    }

    /// Returns the template identifier.
    #[must_use]
    pub const fn id(&self) -> TemplateId {
        self.id
    }

    /// Returns the revision number.
    #[must_use]
    pub const fn revision(&self) -> i64 {
        self.revision
    }

    /// Returns a pointer to this revision.
    #[must_use]
    pub const fn template_ref(&self) -> TemplateRef {
        TemplateRef::new(self.id, self.revision)
    }

    /// Returns the author.
    #[must_use]
    pub const fn author_id(&self) -> UserId {
        self.author_id
    }

    /// Returns the title.
    #[must_use]
    pub fn title(&self) -> &str {
        &self.title
    }

    /// Returns the description.
    #[must_use]
    pub fn description(&self) -> &str {
        &self.description
    }

    /// Returns the raw YAML content.
    #[must_use]
    pub fn content(&self) -> &str {
        &self.content
    }

    /// Returns the tags.
    #[must_use]
    pub fn tags(&self) -> &[String] {
        &self.tags
    }

    /// Returns the languages.
    #[must_use]
    pub fn languages(&self) -> &[String] {
        &self.languages
    }

    /// Returns how many attempts were started from this revision.
    #[must_use]
    pub const fn uses(&self) -> i64 {
        self.uses
    }

    /// Returns how many workspaces were created with unmodified content.
    #[must_use]
    pub const fn completions(&self) -> i64 {
        self.completions
    }

    /// Returns the creation timestamp of this revision.
    #[must_use]
    pub const fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }
}
