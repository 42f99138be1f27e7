//! Resolve Bluesky post identifiers and walk their reply threads.
//!
//! This library handles:
//! - Converting between `at://` URIs and web URLs
//! - Talking XRPC to a PDS with an authenticated session
//! - Fetching posts and reply threads
//! - Printing the leaves (or the whole tree) of a thread

pub mod api;
pub mod config;
pub mod fetch;
pub mod identifier;
pub mod walker;

#[cfg(test)]
pub(crate) mod testing;

pub use api::{BskyApi, BskyClient, Session, ThreadNode, ThreadViewPost, THREAD_DEPTH};
pub use config::{Config, ConfigError};
pub use fetch::{fetch_post, fetch_post_from_identifier, fetch_thread, log_post, FriendlyPost};
pub use identifier::{
    canonicalize, to_native_uri, to_web_url, Canonical, IdentifierError, PostIdentifier,
};
pub use walker::{walk, WalkMode};
