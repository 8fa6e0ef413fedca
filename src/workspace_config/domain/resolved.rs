//! Parsed `.gigo/workspace.yaml` documents.
//!
//! Only the keys the orchestrator acts on are typed. Everything else
//! (`environment`, `containers`, `vscode`, `port_forward`, `exec`, ...) is
//! kept verbatim in [`ResolvedConfig::extras`] for the follower pool.

use super::ConfigParseError;
use crate::resource_policy::ResourceSpec;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Repository path of the workspace config file.
pub const WORKSPACE_CONFIG_PATH: &str = ".gigo/workspace.yaml";

/// The only config schema version the orchestrator understands.
pub const SUPPORTED_CONFIG_VERSION: &str = "0.1";

/// Largest resources a published template may request.
pub const TEMPLATE_RESOURCE_CEILING: ResourceSpec = ResourceSpec::new(6, 8, 100);

/// Container image used by byte workspaces.
pub const BYTE_BASE_CONTAINER: &str = "gigodev/gimg:bytes-base-ubuntu";

/// Working directory used by byte workspaces.
pub const BYTE_WORKING_DIRECTORY: &str = "/home/gigo/codebase/";

/// Validated workspace configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResolvedConfig {
    version: String,
    base_container: String,
    working_directory: String,
    resources: ResourceSpec,
    extras: BTreeMap<String, serde_yaml::Value>,
}

#[derive(Debug, Deserialize)]
struct RawConfig {
    version: Option<serde_yaml::Value>,
    base_container: Option<String>,
    working_directory: Option<String>,
    resources: Option<RawResources>,
    #[serde(flatten)]
    extras: BTreeMap<String, serde_yaml::Value>,
}

#[derive(Debug, Deserialize)]
struct RawResources {
    cpu: Option<u32>,
    mem: Option<u32>,
    disk: Option<u32>,
}

impl ResolvedConfig {
    /// Parses and validates a YAML document.
    ///
    /// Resource values above the tier ceilings are accepted here; clamping
    /// is the resource policy's job.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigParseError::Malformed`] when the YAML cannot be
    /// decoded and [`ConfigParseError::Invalid`] when a required value is
    /// missing, empty, zero, or the version is not `0.1`.
    ///
    /// # Examples
    ///
    /// ```
    /// use gigo_workspaces::workspace_config::domain::ResolvedConfig;
    ///
    /// let yaml = b"version: 0.1\nbase_container: img:1\nworking_directory: /w\nresources: {cpu: 1, mem: 2, disk: 5}\n";
    /// let config = ResolvedConfig::parse(yaml).expect("valid config");
    /// assert_eq!(config.working_directory(), "/w");
    /// ```
    pub fn parse(bytes: &[u8]) -> Result<Self, ConfigParseError> {
        let raw: RawConfig = serde_yaml::from_slice(bytes)
            .map_err(|err| ConfigParseError::Malformed(err.to_string()))?;

        let version = raw
            .version
            .as_ref()
            .and_then(normalize_version)
            .ok_or_else(|| ConfigParseError::Invalid("version is required".to_owned()))?;
        if version != SUPPORTED_CONFIG_VERSION {
            return Err(ConfigParseError::Invalid(format!(
                "unsupported config version {version}, expected {SUPPORTED_CONFIG_VERSION}"
            )));
        }

        let base_container = required_text(raw.base_container, "base_container")?;
        let working_directory = required_text(raw.working_directory, "working_directory")?;
        let resources = raw
            .resources
            .ok_or_else(|| ConfigParseError::Invalid("resources are required".to_owned()))?;

        Ok(Self {
            version,
            base_container,
            working_directory,
            resources: ResourceSpec::new(
                positive(resources.cpu, "resources.cpu")?,
                positive(resources.mem, "resources.mem")?,
                positive(resources.disk, "resources.disk")?,
            ),
            extras: raw.extras,
        })
    }

    /// Parses a template document, additionally rejecting resources above
    /// [`TEMPLATE_RESOURCE_CEILING`].
    ///
    /// Repository configs are clamped by the resource policy instead, so
    /// this check applies to published templates only.
    ///
    /// # Errors
    ///
    /// Returns the [`ResolvedConfig::parse`] errors, and
    /// [`ConfigParseError::Invalid`] naming each dimension over the ceiling.
    pub fn parse_template(bytes: &[u8]) -> Result<Self, ConfigParseError> {
        let config = Self::parse(bytes)?;
        let ceiling = TEMPLATE_RESOURCE_CEILING;
        let requested = config.resources;
        let exceeded: Vec<String> = [
            ("cpu", requested.cpu, ceiling.cpu),
            ("mem", requested.mem, ceiling.mem),
            ("disk", requested.disk, ceiling.disk),
        ]
        .into_iter()
        .filter(|(_, value, limit)| value > limit)
        .map(|(field, value, limit)| format!("resources.{field} {value} exceeds {limit}"))
        .collect();
        if exceeded.is_empty() {
            Ok(config)
        } else {
            Err(ConfigParseError::Invalid(exceeded.join(", ")))
        }
    }

    /// Built-in config for byte workspaces, which have no repository.
    #[must_use]
    pub fn byte_default() -> Self {
        Self {
            version: SUPPORTED_CONFIG_VERSION.to_owned(),
            base_container: BYTE_BASE_CONTAINER.to_owned(),
            working_directory: BYTE_WORKING_DIRECTORY.to_owned(),
            resources: ResourceSpec::new(1, 1, 10),
            extras: BTreeMap::new(),
        }
    }

    /// Returns the normalized schema version.
    #[must_use]
    pub fn version(&self) -> &str {
        &self.version
    }

    /// Returns the base container image.
    #[must_use]
    pub fn base_container(&self) -> &str {
        &self.base_container
    }

    /// Returns the editor working directory.
    #[must_use]
    pub fn working_directory(&self) -> &str {
        &self.working_directory
    }

    /// Returns the requested resources.
    #[must_use]
    pub const fn resources(&self) -> ResourceSpec {
        self.resources
    }

    /// Returns the keys passed through to followers.
    #[must_use]
    pub const fn extras(&self) -> &BTreeMap<String, serde_yaml::Value> {
        &self.extras
    }

    /// Replaces the resources, typically with the policy-granted values.
    #[must_use]
    pub const fn with_resources(mut self, resources: ResourceSpec) -> Self {
        self.resources = resources;
        self
    }

    /// Compares the typed keys only; pass-through keys are ignored.
    #[must_use]
    pub fn structurally_matches(&self, other: &Self) -> bool {
        self.version == other.version
            && self.base_container == other.base_container
            && self.working_directory == other.working_directory
            && self.resources == other.resources
    }
}

fn normalize_version(value: &serde_yaml::Value) -> Option<String> {
    match value {
        serde_yaml::Value::Number(number) => Some(number.to_string()),
        serde_yaml::Value::String(text) => Some(text.trim().to_owned()),
        _ => None,
    }
}

fn required_text(value: Option<String>, field: &str) -> Result<String, ConfigParseError> {
    match value {
        Some(text) if !text.trim().is_empty() => Ok(text),
        _ => Err(ConfigParseError::Invalid(format!("{field} must not be empty"))),
    }
}

fn positive(value: Option<u32>, field: &str) -> Result<u32, ConfigParseError> {
    match value {
        Some(amount) if amount > 0 => Ok(amount),
        _ => Err(ConfigParseError::Invalid(format!(
            "{field} must be greater than zero"
        ))),
    }
}
