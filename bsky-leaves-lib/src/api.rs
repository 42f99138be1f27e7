//! The remote service boundary.
//!
//! Everything the rest of the crate needs from the network goes through
//! [`BskyApi`]. [`BskyClient`] implements it over XRPC with an authenticated
//! session; tests substitute an in-memory fake.

use anyhow::{anyhow, Context, Result};
use async_trait::async_trait;
use reqwest::StatusCode;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::identifier::{at_uri_to_web_url, POST_COLLECTION};

pub const DEFAULT_SERVICE: &str = "https://bsky.social";

/// Depth requested when fetching a reply thread.
pub const THREAD_DEPTH: u16 = 200;

// ============================================================================
// Public Types
// ============================================================================

#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct Profile {
    pub did: String,
    pub handle: String,
    #[serde(rename = "displayName")]
    pub display_name: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct StrongRef {
    pub uri: String,
    #[serde(default)]
    pub cid: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct ReplyRef {
    pub parent: StrongRef,
    pub root: StrongRef,
}

/// The `app.bsky.feed.post` record body.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct PostRecordValue {
    #[serde(default)]
    pub text: String,
    #[serde(rename = "createdAt")]
    pub created_at: Option<String>,
    pub reply: Option<ReplyRef>,
}

/// A single post as stored in its author's repository.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PostRecord {
    pub uri: String,
    pub cid: Option<String>,
    pub text: String,
    pub reply: Option<ReplyRef>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct PostView {
    pub uri: String,
    pub cid: String,
    pub author: Profile,
    pub record: PostRecordValue,
    #[serde(rename = "indexedAt")]
    pub indexed_at: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ThreadViewPost {
    pub post: PostView,
    #[serde(default)]
    pub replies: Vec<ThreadNode>,
}

impl ThreadViewPost {
    pub fn is_leaf(&self) -> bool {
        self.replies.is_empty()
    }

    pub fn text(&self) -> &str {
        &self.post.record.text
    }

    pub fn handle(&self) -> &str {
        &self.post.author.handle
    }

    /// Web URL of this post, built from data already in the thread.
    pub fn web_url(&self, web_host: &str) -> String {
        at_uri_to_web_url(web_host, &self.post.uri, &self.post.author.handle)
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct NotFoundPost {
    pub uri: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct BlockedPost {
    pub uri: String,
}

/// One node of a reply thread, discriminated by `$type` on the wire.
#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "$type")]
pub enum ThreadNode {
    #[serde(rename = "app.bsky.feed.defs#threadViewPost")]
    Post(ThreadViewPost),
    #[serde(rename = "app.bsky.feed.defs#notFoundPost")]
    NotFound(NotFoundPost),
    #[serde(rename = "app.bsky.feed.defs#blockedPost")]
    Blocked(BlockedPost),
    #[serde(other)]
    Unknown,
}

#[async_trait]
pub trait BskyApi: Send + Sync {
    /// Resolve a handle to its DID.
    async fn resolve_handle(&self, handle: &str) -> Result<String>;

    /// Look up an actor (DID or handle).
    async fn get_profile(&self, actor: &str) -> Result<Profile>;

    /// Fetch a post record from `repo`.
    async fn get_post(&self, repo: &str, rkey: &str) -> Result<PostRecord>;

    /// Fetch the reply thread rooted at `uri`, down to `depth` levels.
    async fn get_post_thread(&self, uri: &str, depth: u16) -> Result<ThreadNode>;
}

// ============================================================================
// Internal API Response Types
// ============================================================================

#[derive(Serialize)]
struct CreateSessionRequest<'a> {
    identifier: &'a str,
    password: &'a str,
}

#[derive(Debug, Deserialize)]
struct ResolveHandleResponse {
    did: String,
}

#[derive(Debug, Deserialize)]
struct GetRecordResponse {
    uri: String,
    cid: Option<String>,
    value: PostRecordValue,
}

#[derive(Debug, Deserialize)]
struct ThreadResponse {
    thread: ThreadNode,
}

#[derive(Debug, Deserialize)]
struct XrpcError {
    error: String,
    message: Option<String>,
}

// ============================================================================
// XRPC Client
// ============================================================================

/// An authenticated session, created once at startup.
#[derive(Clone, Deserialize)]
pub struct Session {
    pub did: String,
    pub handle: String,
    #[serde(rename = "accessJwt")]
    access_jwt: String,
}

impl std::fmt::Debug for Session {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Session")
            .field("did", &self.did)
            .field("handle", &self.handle)
            .finish_non_exhaustive()
    }
}

pub struct BskyClient {
    http: reqwest::Client,
    service: String,
    session: Session,
}

impl BskyClient {
    /// Log in to `service` and keep the session for every later call.
    pub async fn login(service: &str, identifier: &str, password: &str) -> Result<Self> {
        let http = reqwest::Client::new();
        let service = service.trim_end_matches('/').to_string();
        let url = format!("{}/xrpc/com.atproto.server.createSession", service);

        let response = http
            .post(&url)
            .json(&CreateSessionRequest { identifier, password })
            .send()
            .await
            .with_context(|| format!("Failed to reach {}", service))?;

        let session: Session = decode_response("com.atproto.server.createSession", response)
            .await
            .context("Failed to create session")?;

        debug!(did = %session.did, "Created session on {}", service);

        Ok(Self {
            http,
            service,
            session,
        })
    }

    pub fn session(&self) -> &Session {
        &self.session
    }

    async fn query<T: DeserializeOwned>(
        &self,
        method: &str,
        params: &[(&str, &str)],
    ) -> Result<T> {
        let query = params
            .iter()
            .map(|(key, value)| format!("{}={}", key, urlencoding::encode(value)))
            .collect::<Vec<_>>()
            .join("&");
        let url = format!("{}/xrpc/{}?{}", self.service, method, query);

        debug!(%url, "XRPC query");

        let response = self
            .http
            .get(&url)
            .bearer_auth(&self.session.access_jwt)
            .send()
            .await
            .with_context(|| format!("Failed to call {}", method))?;

        decode_response(method, response).await
    }
}

async fn decode_response<T: DeserializeOwned>(
    method: &str,
    response: reqwest::Response,
) -> Result<T> {
    let status = response.status();
    let body = response
        .bytes()
        .await
        .with_context(|| format!("Failed to read {} response", method))?;

    decode_body(method, status, &body)
}

/// Decode an XRPC response body, turning error bodies into errors.
///
/// The recursion limit is lifted because deep reply threads nest well past
/// serde_json's default of 128.
fn decode_body<T: DeserializeOwned>(method: &str, status: StatusCode, body: &[u8]) -> Result<T> {
    if !status.is_success() {
        let detail = match serde_json::from_slice::<XrpcError>(body) {
            Ok(XrpcError {
                error,
                message: Some(message),
            }) => format!("{}: {}", error, message),
            Ok(XrpcError { error, message: None }) => error,
            Err(_) => String::from_utf8_lossy(body).into_owned(),
        };
        return Err(anyhow!("{} failed with status {}: {}", method, status, detail));
    }

    let mut deserializer = serde_json::Deserializer::from_slice(body);
    deserializer.disable_recursion_limit();
    let value = T::deserialize(&mut deserializer)
        .and_then(|value| deserializer.end().map(|()| value))
        .with_context(|| format!("Failed to decode {} response", method))?;

    Ok(value)
}

#[async_trait]
impl BskyApi for BskyClient {
    async fn resolve_handle(&self, handle: &str) -> Result<String> {
        let response: ResolveHandleResponse = self
            .query("com.atproto.identity.resolveHandle", &[("handle", handle)])
            .await?;

        Ok(response.did)
    }

    async fn get_profile(&self, actor: &str) -> Result<Profile> {
        self.query("app.bsky.actor.getProfile", &[("actor", actor)]).await
    }

    async fn get_post(&self, repo: &str, rkey: &str) -> Result<PostRecord> {
        let response: GetRecordResponse = self
            .query(
                "com.atproto.repo.getRecord",
                &[("repo", repo), ("collection", POST_COLLECTION), ("rkey", rkey)],
            )
            .await?;

        Ok(PostRecord {
            uri: response.uri,
            cid: response.cid,
            text: response.value.text,
            reply: response.value.reply,
        })
    }

    async fn get_post_thread(&self, uri: &str, depth: u16) -> Result<ThreadNode> {
        let depth = depth.to_string();
        let response: ThreadResponse = self
            .query("app.bsky.feed.getPostThread", &[("uri", uri), ("depth", &depth)])
            .await?;

        Ok(response.thread)
    }
}
