//! Port contract for the VCS server.

mod client;

pub use client::{AccessLevel, RepoInfo, RepoPath, VcsClient, VcsCredentials, VcsError, VcsResult};
