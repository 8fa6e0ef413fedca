//! Semantic version parsing and precedence.
//!
//! A leading `v` is accepted and dropped. Minor and patch default to zero
//! when omitted. Build metadata is ignored for precedence.

use super::PullThroughDomainError;
use std::cmp::Ordering;
use std::fmt;

/// Parsed semantic version.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct SemVer {
    major: u64,
    minor: u64,
    patch: u64,
    pre: Option<String>,
}

impl SemVer {
    /// Parses a version such as `v1.2.3`, `1.2` or `1.2.3-rc.1+build`.
    ///
    /// # Errors
    ///
    /// Returns [`PullThroughDomainError::InvalidVersion`] when a component is
    /// missing or not a number.
    ///
    /// # Examples
    ///
    /// ```
    /// use gigo_workspaces::pull_through::domain::SemVer;
    ///
    /// let version = SemVer::parse("v1.82").expect("valid version");
    /// assert_eq!(version.to_string(), "1.82.0");
    /// ```
    pub fn parse(input: &str) -> Result<Self, PullThroughDomainError> {
        let invalid = || PullThroughDomainError::InvalidVersion(input.to_owned());
        let trimmed = input.trim();
        let text = trimmed.strip_prefix('v').unwrap_or(trimmed);
        let without_build = text.split_once('+').map_or(text, |(core, _)| core);
        let (core, pre) = match without_build.split_once('-') {
            Some((core, pre)) if !pre.is_empty() => (core, Some(pre.to_owned())),
            Some(_) => return Err(invalid()),
            None => (without_build, None),
        };

        let mut parts = core.split('.');
        let major = parts.next().and_then(parse_number).ok_or_else(invalid)?;
        let minor = optional_component(parts.next()).ok_or_else(invalid)?;
        let patch = optional_component(parts.next()).ok_or_else(invalid)?;
        if parts.next().is_some() {
            return Err(invalid());
        }

        Ok(Self {
            major,
            minor,
            patch,
            pre,
        })
    }

    /// Returns the major component.
    #[must_use]
    pub const fn major(&self) -> u64 {
        self.major
    }

    /// Returns the minor component.
    #[must_use]
    pub const fn minor(&self) -> u64 {
        self.minor
    }

    /// Returns the patch component.
    #[must_use]
    pub const fn patch(&self) -> u64 {
        self.patch
    }

    /// Returns the pre-release identifier, if any.
    #[must_use]
    pub fn pre_release(&self) -> Option<&str> {
        self.pre.as_deref()
    }
}

fn parse_number(part: &str) -> Option<u64> {
    if part.is_empty() || !part.bytes().all(|byte| byte.is_ascii_digit()) {
        return None;
    }
    part.parse().ok()
}

fn optional_component(part: Option<&str>) -> Option<u64> {
    part.map_or(Some(0), parse_number)
}

impl Ord for SemVer {
    fn cmp(&self, other: &Self) -> Ordering {
        self.major
            .cmp(&other.major)
            .then(self.minor.cmp(&other.minor))
            .then(self.patch.cmp(&other.patch))
            .then_with(|| match (&self.pre, &other.pre) {
                (None, None) => Ordering::Equal,
                (None, Some(_)) => Ordering::Greater,
                (Some(_), None) => Ordering::Less,
                (Some(left), Some(right)) => compare_pre_release(left, right),
            })
    }
}

impl PartialOrd for SemVer {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

fn compare_pre_release(left: &str, right: &str) -> Ordering {
    let mut left_ids = left.split('.');
    let mut right_ids = right.split('.');
    loop {
        let (left_id, right_id) = match (left_ids.next(), right_ids.next()) {
            (None, None) => return Ordering::Equal,
            (None, Some(_)) => return Ordering::Less,
            (Some(_), None) => return Ordering::Greater,
            (Some(left_id), Some(right_id)) => (left_id, right_id),
        };
        let ordering = match (parse_number(left_id), parse_number(right_id)) {
            (Some(a), Some(b)) => a.cmp(&b),
            (Some(_), None) => Ordering::Less,
            (None, Some(_)) => Ordering::Greater,
            (None, None) => left_id.cmp(right_id),
        };
        if ordering != Ordering::Equal {
            return ordering;
        }
    }
}

impl fmt::Display for SemVer {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(formatter, "{}.{}.{}", self.major, self.minor, self.patch)?;
        if let Some(pre) = &self.pre {
            write!(formatter, "-{pre}")?;
        }
        Ok(())
    }
}

/// Sorts version strings by descending precedence, dropping any that do not
/// parse. The original spelling of each kept version is preserved.
#[must_use]
pub fn sort_descending<I>(versions: I) -> Vec<String>
where
    I: IntoIterator<Item = String>,
{
    let mut parsed: Vec<(SemVer, String)> = versions
        .into_iter()
        .filter_map(|raw| SemVer::parse(&raw).ok().map(|version| (version, raw)))
        .collect();
    parsed.sort_by(|(left, _), (right, _)| right.cmp(left));
    parsed.into_iter().map(|(_, raw)| raw).collect()
}
