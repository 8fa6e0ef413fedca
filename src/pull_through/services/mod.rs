//! Pull-through cache services.

mod editor;
mod error;
mod extension;
mod settings;
mod tee;

pub use editor::{CachedDownload, EditorBinaryCache};
pub use error::{PullThroughError, PullThroughResult};
pub use extension::{ExtensionCache, ExtensionRequest};
pub use settings::{
    DEFAULT_EXTENSION_REGISTRY, DEFAULT_RELEASE_BASE, DEFAULT_USER_AGENT, PullThroughSettings,
};
