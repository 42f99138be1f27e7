//! In-memory `BskyApi` and thread JSON builders for unit tests.

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};

use anyhow::{anyhow, Result};
use async_trait::async_trait;
use serde_json::{json, Value};

use crate::api::{BskyApi, PostRecord, Profile, ThreadNode};
use crate::identifier::AtUri;

#[derive(Default)]
pub(crate) struct FakeApi {
    profiles: HashMap<String, Profile>,
    posts: HashMap<(String, String), PostRecord>,
    thread: Option<Value>,
    calls: AtomicUsize,
}

impl FakeApi {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    pub(crate) fn with_actor(mut self, did: &str, handle: &str) -> Self {
        self.profiles.insert(
            did.to_string(),
            Profile {
                did: did.to_string(),
                handle: handle.to_string(),
                display_name: None,
            },
        );
        self
    }

    pub(crate) fn with_post(mut self, record: PostRecord) -> Self {
        let uri = AtUri::parse(&record.uri).expect("fake post uri");
        self.posts.insert((uri.authority, uri.rkey), record);
        self
    }

    pub(crate) fn with_thread(mut self, thread: Value) -> Self {
        self.thread = Some(thread);
        self
    }

    /// Number of remote calls made so far.
    pub(crate) fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    fn did_for(&self, actor: &str) -> Option<&str> {
        self.profiles
            .values()
            .find(|p| p.did == actor || p.handle == actor)
            .map(|p| p.did.as_str())
    }
}

#[async_trait]
impl BskyApi for FakeApi {
    async fn resolve_handle(&self, handle: &str) -> Result<String> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.profiles
            .values()
            .find(|p| p.handle == handle)
            .map(|p| p.did.clone())
            .ok_or_else(|| anyhow!("Unable to resolve handle {}", handle))
    }

    async fn get_profile(&self, actor: &str) -> Result<Profile> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.did_for(actor)
            .and_then(|did| self.profiles.get(did))
            .cloned()
            .ok_or_else(|| anyhow!("Profile not found: {}", actor))
    }

    async fn get_post(&self, repo: &str, rkey: &str) -> Result<PostRecord> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let did = self.did_for(repo).unwrap_or(repo);
        self.posts
            .get(&(did.to_string(), rkey.to_string()))
            .cloned()
            .ok_or_else(|| anyhow!("Record not found: {}/{}", repo, rkey))
    }

    async fn get_post_thread(&self, uri: &str, _depth: u16) -> Result<ThreadNode> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let thread = self
            .thread
            .clone()
            .ok_or_else(|| anyhow!("Post not found: {}", uri))?;
        Ok(serde_json::from_value(thread)?)
    }
}

pub(crate) fn post_uri(did: &str, rkey: &str) -> String {
    format!("at://{}/app.bsky.feed.post/{}", did, rkey)
}

/// A `threadViewPost` as the service returns it.
pub(crate) fn post(did: &str, handle: &str, text: &str, rkey: &str, replies: Vec<Value>) -> Value {
    let reply_count = replies.len();
    json!({
        "$type": "app.bsky.feed.defs#threadViewPost",
        "post": {
            "uri": post_uri(did, rkey),
            "cid": format!("bafyrei{}", rkey),
            "author": { "did": did, "handle": handle, "displayName": handle },
            "record": {
                "$type": "app.bsky.feed.post",
                "text": text,
                "createdAt": "2023-04-01T12:00:00.000Z"
            },
            "indexedAt": "2023-04-01T12:00:01.000Z",
            "replyCount": reply_count
        },
        "replies": replies
    })
}

pub(crate) fn not_found(uri: &str) -> Value {
    json!({ "$type": "app.bsky.feed.defs#notFoundPost", "uri": uri, "notFound": true })
}

pub(crate) fn blocked(uri: &str) -> Value {
    json!({
        "$type": "app.bsky.feed.defs#blockedPost",
        "uri": uri,
        "blocked": true,
        "author": { "did": "did:plc:blocker" }
    })
}
