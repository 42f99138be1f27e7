use std::io::Write;

use anyhow::Result;
use serde::{Deserialize, Serialize};
use tracing::{debug, error};

use crate::api::{BskyApi, PostRecord, ThreadNode, THREAD_DEPTH};
use crate::identifier::{to_web_url, IdentifierError, PostIdentifier};

/// A post with its own, parent and root references turned into web URLs.
///
/// Missing reply references give empty strings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FriendlyPost {
    pub web_url: String,
    pub text: String,
    pub parent_url: String,
    pub root_uri: Option<String>,
    pub root_url: String,
}

pub async fn fetch_post(api: &dyn BskyApi, actor: &str, rkey: &str) -> Result<PostRecord> {
    api.get_post(actor, rkey).await
}

/// Fetch a post and resolve each of its references in turn.
pub async fn fetch_friendly_post(
    api: &dyn BskyApi,
    web_host: &str,
    actor: &str,
    rkey: &str,
) -> Result<FriendlyPost> {
    let post = fetch_post(api, actor, rkey).await?;

    let parent_uri = post.reply.as_ref().map(|r| r.parent.uri.as_str());
    let root_uri = post.reply.as_ref().map(|r| r.root.uri.clone());

    let web_url = to_web_url(api, web_host, Some(post.uri.as_str())).await?;
    let parent_url = to_web_url(api, web_host, parent_uri).await?;
    let root_url = to_web_url(api, web_host, root_uri.as_deref()).await?;

    Ok(FriendlyPost {
        web_url,
        text: post.text,
        parent_url,
        root_uri,
        root_url,
    })
}

/// Fetch a post by either form of identifier.
pub async fn fetch_post_from_identifier(
    api: &dyn BskyApi,
    web_host: &str,
    identifier: &str,
) -> Result<FriendlyPost> {
    let parsed = PostIdentifier::parse(identifier)?;
    if let PostIdentifier::NativeUri(uri) = &parsed {
        if !uri.is_post() {
            return Err(IdentifierError::NotAPost(identifier.to_string()).into());
        }
    }

    fetch_friendly_post(api, web_host, parsed.actor(), parsed.rkey()).await
}

/// Fetch the reply thread rooted at a native URI.
pub async fn fetch_thread(api: &dyn BskyApi, uri: &str) -> Result<ThreadNode> {
    let thread = api.get_post_thread(uri, THREAD_DEPTH).await?;
    debug!(%uri, found = matches!(thread, ThreadNode::Post(_)), "Fetched thread");
    Ok(thread)
}

/// Write a post summary as one JSON line, or log the failure to build one.
/// Never fails.
pub async fn log_post<W: Write>(
    out: &mut W,
    api: &dyn BskyApi,
    web_host: &str,
    identifier: &str,
) {
    let post = match fetch_post_from_identifier(api, web_host, identifier).await {
        Ok(post) => post,
        Err(e) => {
            error!("uri: {} error: {:#}", identifier, e);
            return;
        }
    };

    let written = serde_json::to_string(&post)
        .map_err(anyhow::Error::from)
        .and_then(|json| writeln!(out, "{}", json).map_err(anyhow::Error::from));
    if let Err(e) = written {
        error!("uri: {} error: {:#}", identifier, e);
    }
}
