//! Version handling and cache key layout for the pull-through caches.

mod compat;
mod error;
mod keys;
mod semver;

pub use compat::is_compatible;
pub use error::PullThroughDomainError;
pub use keys::{EditorBinary, ExtensionId, InstallType, normalize_host_version};
pub use semver::{SemVer, sort_descending};
