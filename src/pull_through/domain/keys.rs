//! Cache keys and upstream coordinates for cached artefacts.

use super::{PullThroughDomainError, SemVer};
use std::fmt;

/// Packaging format of the editor binary.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum InstallType {
    /// Gzipped tarball.
    Tar,
    /// Debian package.
    Deb,
    /// RPM package.
    Rpm,
}

impl InstallType {
    /// Returns the canonical name used in cache keys.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Tar => "tar",
            Self::Deb => "deb",
            Self::Rpm => "rpm",
        }
    }
}

impl fmt::Display for InstallType {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter.write_str(self.as_str())
    }
}

impl TryFrom<&str> for InstallType {
    type Error = PullThroughDomainError;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        match value.trim().to_ascii_lowercase().as_str() {
            "tar" => Ok(Self::Tar),
            "deb" => Ok(Self::Deb),
            "rpm" => Ok(Self::Rpm),
            _ => Err(PullThroughDomainError::InvalidInstallType(value.to_owned())),
        }
    }
}

/// One build of the editor binary.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct EditorBinary {
    version: String,
    arch: String,
    os: String,
    install_type: InstallType,
}

impl EditorBinary {
    /// Validates the build coordinates. A leading `v` on the version is
    /// dropped.
    ///
    /// # Errors
    ///
    /// Returns [`PullThroughDomainError`] when the version is not semver or a
    /// component is empty or contains `/`.
    pub fn new(
        version: &str,
        arch: &str,
        os: &str,
        install_type: InstallType,
    ) -> Result<Self, PullThroughDomainError> {
        let trimmed = version.trim();
        let normalized = trimmed.strip_prefix('v').unwrap_or(trimmed);
        SemVer::parse(normalized)?;
        Ok(Self {
            version: normalized.to_owned(),
            arch: path_component("arch", arch)?,
            os: path_component("os", os)?,
            install_type,
        })
    }

    /// Returns the normalized version.
    #[must_use]
    pub fn version(&self) -> &str {
        &self.version
    }

    /// Returns the packaging format.
    #[must_use]
    pub const fn install_type(&self) -> InstallType {
        self.install_type
    }

    /// Object store key of the cached build.
    #[must_use]
    pub fn cache_key(&self) -> String {
        format!(
            "ext/gigo-code-server-cache/{}-{}-{}-{}",
            self.version, self.arch, self.os, self.install_type
        )
    }

    /// Upstream download URL under `release_base`.
    #[must_use]
    pub fn download_url(&self, release_base: &str) -> String {
        let base = release_base.trim_end_matches('/');
        let Self {
            version, arch, os, ..
        } = self;
        match self.install_type {
            InstallType::Tar => {
                format!("{base}/v{version}/code-server-{version}-{os}-{arch}.tar.gz")
            }
            InstallType::Deb => format!("{base}/v{version}/code-server_{version}_{arch}.deb"),
            InstallType::Rpm => format!("{base}/v{version}/code-server-{version}-{arch}.rpm"),
        }
    }
}

/// Editor extension identifier, `publisher.name`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ExtensionId {
    publisher: String,
    name: String,
}

impl ExtensionId {
    /// Parses `publisher.name`.
    ///
    /// # Errors
    ///
    /// Returns [`PullThroughDomainError::InvalidExtensionId`] unless the input
    /// is two non-empty segments separated by a single dot.
    pub fn parse(value: &str) -> Result<Self, PullThroughDomainError> {
        let invalid = || PullThroughDomainError::InvalidExtensionId(value.to_owned());
        let (publisher, name) = value.trim().split_once('.').ok_or_else(invalid)?;
        let valid_segment = |segment: &str| {
            !segment.is_empty()
                && segment
                    .chars()
                    .all(|ch| ch.is_ascii_alphanumeric() || ch == '-' || ch == '_')
        };
        if !valid_segment(publisher) || !valid_segment(name) {
            return Err(invalid());
        }
        Ok(Self {
            publisher: publisher.to_owned(),
            name: name.to_owned(),
        })
    }

    /// Returns the publisher.
    #[must_use]
    pub fn publisher(&self) -> &str {
        &self.publisher
    }

    /// Returns the extension name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Object store key of a cached extension version.
    #[must_use]
    pub fn cache_key(&self, version: &str) -> String {
        format!(
            "ext/open-vsx-cache/{}/{}.{version}.vsix",
            self.publisher, self.name
        )
    }

    /// Key under which the version negotiated for `host_version` is cached.
    #[must_use]
    pub fn negotiation_key(&self, host_version: &str) -> String {
        format!(
            "vsc:ext:version:{}:{}:{host_version}",
            self.publisher, self.name
        )
    }
}

impl fmt::Display for ExtensionId {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(formatter, "{}.{}", self.publisher, self.name)
    }
}

/// Validates an editor host version and returns it without a leading `v`.
///
/// # Errors
///
/// Returns [`PullThroughDomainError::InvalidVersion`] when it is not semver.
pub fn normalize_host_version(host: &str) -> Result<String, PullThroughDomainError> {
    let trimmed = host.trim();
    let normalized = trimmed.strip_prefix('v').unwrap_or(trimmed);
    SemVer::parse(normalized)?;
    Ok(normalized.to_owned())
}

fn path_component(field: &'static str, value: &str) -> Result<String, PullThroughDomainError> {
    let trimmed = value.trim();
    if trimmed.is_empty() || trimmed.contains('/') || trimmed.contains("..") {
        return Err(PullThroughDomainError::InvalidComponent {
            field,
            value: value.to_owned(),
        });
    }
    Ok(trimmed.to_owned())
}
