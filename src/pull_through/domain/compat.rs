//! Editor engine compatibility checks for extension versions.

use std::cmp::Ordering;

/// Returns whether `host` (the editor version) satisfies an extension's
/// declared `engines.vscode` range.
///
/// Supported ranges are `*`, `>=X.Y.Z`, and `^X.Y.Z` or a bare `X.Y.Z`. The
/// caret form requires the same major version and a host at least as new.
/// Pre-release suffixes on either side are ignored.
///
/// # Examples
///
/// ```
/// use gigo_workspaces::pull_through::domain::is_compatible;
///
/// assert!(is_compatible("1.82.2", "^1.75.0"));
/// assert!(!is_compatible("1.70.0", "^1.75.0"));
/// assert!(!is_compatible("2.0.0", "^1.75.0"));
/// ```
#[must_use]
pub fn is_compatible(host: &str, range: &str) -> bool {
    let declared = range.trim();
    if declared == "*" {
        return true;
    }

    let host_parts = numeric_parts(host);
    if let Some(minimum) = declared.strip_prefix(">=") {
        return at_least(&host_parts, &numeric_parts(minimum));
    }

    let constraint = declared.strip_prefix('^').unwrap_or(declared);
    caret_satisfied(&host_parts, &numeric_parts(constraint))
}

fn numeric_parts(version: &str) -> Vec<u64> {
    let trimmed = version.trim();
    let text = trimmed.strip_prefix('v').unwrap_or(trimmed);
    let core = text.split_once('-').map_or(text, |(core, _)| core);
    core.split('.')
        .map(|part| part.trim().parse().unwrap_or(0))
        .collect()
}

fn caret_satisfied(version: &[u64], constraint: &[u64]) -> bool {
    for (index, wanted) in constraint.iter().enumerate() {
        let actual = version.get(index).copied().unwrap_or(0);
        if index == 0 {
            if actual != *wanted {
                return false;
            }
            continue;
        }
        match actual.cmp(wanted) {
            Ordering::Less => return false,
            Ordering::Greater => return true,
            Ordering::Equal => {}
        }
    }
    true
}

fn at_least(version: &[u64], minimum: &[u64]) -> bool {
    let width = version.len().max(minimum.len());
    for index in 0..width {
        let actual = version.get(index).copied().unwrap_or(0);
        let wanted = minimum.get(index).copied().unwrap_or(0);
        match actual.cmp(&wanted) {
            Ordering::Less => return false,
            Ordering::Greater => return true,
            Ordering::Equal => {}
        }
    }
    true
}
