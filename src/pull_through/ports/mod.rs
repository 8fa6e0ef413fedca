//! Port contracts for object storage, upstream downloads and the
//! negotiated-version cache.

mod object_store;
mod upstream;
mod version_cache;

pub use object_store::{
    ByteStream, ObjectStore, ObjectStoreError, ObjectStoreResult, ObjectWriter,
};
pub use upstream::{
    ExtensionMetadata, ExtensionRegistry, UpstreamError, UpstreamFetcher, UpstreamResponse,
    UpstreamResult,
};
pub use version_cache::VersionCache;
