//! Post identifiers in their two shapes, and conversion between them.
//!
//! A post is addressed either by its native `at://` URI, which names the
//! author by DID, or by a public web URL, which names the author by handle.
//! Going from one to the other needs the remote service, so the conversions
//! are async and take the API as a parameter.

use std::fmt;
use std::sync::LazyLock;

use anyhow::Result;
use regex::Regex;
use thiserror::Error;
use tracing::debug;

use crate::api::BskyApi;

pub const NATIVE_SCHEME: &str = "at://";
pub const WEB_SCHEME: &str = "https://";

/// Collection NSID of feed posts.
pub const POST_COLLECTION: &str = "app.bsky.feed.post";

static AT_URI_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^at://([^/\s]+)/([^/\s]+)/([^/\s]+)$").expect("at-uri pattern")
});

static WEB_URL_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^https://([^/\s?#]+)/profile/([^/\s?#]+)/post/([^/\s?#]+)/?(?:[?#]\S*)?$")
        .expect("web url pattern")
});

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum IdentifierError {
    #[error("Invalid at:// uri, expected at://<authority>/<collection>/<rkey>: {0}")]
    InvalidNativeUri(String),
    #[error("Invalid post url, expected https://<host>/profile/<actor>/post/<rkey>: {0}")]
    InvalidWebUrl(String),
    #[error("Invalid url {0}")]
    NotWebUrl(String),
    #[error("Invalid uri: {0}")]
    UnknownScheme(String),
    #[error("Not a post record: {0}")]
    NotAPost(String),
}

/// `at://<authority>/<collection>/<rkey>`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AtUri {
    pub authority: String,
    pub collection: String,
    pub rkey: String,
}

impl AtUri {
    /// Parse a native URI. All three path segments must be present.
    ///
    /// # Example
    /// ```
    /// use bsky_leaves_lib::identifier::AtUri;
    /// let uri = AtUri::parse("at://did:plc:abc123/app.bsky.feed.post/xyz").unwrap();
    /// assert_eq!(uri.authority, "did:plc:abc123");
    /// assert_eq!(uri.collection, "app.bsky.feed.post");
    /// assert_eq!(uri.rkey, "xyz");
    /// ```
    pub fn parse(input: &str) -> Result<Self, IdentifierError> {
        let caps = AT_URI_RE
            .captures(input)
            .ok_or_else(|| IdentifierError::InvalidNativeUri(input.to_string()))?;

        Ok(Self {
            authority: caps[1].to_string(),
            collection: caps[2].to_string(),
            rkey: caps[3].to_string(),
        })
    }

    pub fn post(authority: impl Into<String>, rkey: impl Into<String>) -> Self {
        Self {
            authority: authority.into(),
            collection: POST_COLLECTION.to_string(),
            rkey: rkey.into(),
        }
    }

    pub fn is_post(&self) -> bool {
        self.collection == POST_COLLECTION
    }
}

impl fmt::Display for AtUri {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "at://{}/{}/{}", self.authority, self.collection, self.rkey)
    }
}

/// `https://<host>/profile/<actor>/post/<rkey>`, where `actor` is a handle or a DID.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WebUrl {
    pub host: String,
    pub actor: String,
    pub rkey: String,
}

impl WebUrl {
    /// Parse a post URL. A trailing slash, query string or fragment is dropped.
    ///
    /// # Example
    /// ```
    /// use bsky_leaves_lib::identifier::WebUrl;
    /// let url = WebUrl::parse("https://bsky.app/profile/alice.test/post/3jux4davwa42j").unwrap();
    /// assert_eq!(url.actor, "alice.test");
    /// assert_eq!(url.rkey, "3jux4davwa42j");
    /// ```
    pub fn parse(input: &str) -> Result<Self, IdentifierError> {
        let caps = WEB_URL_RE
            .captures(input)
            .ok_or_else(|| IdentifierError::InvalidWebUrl(input.to_string()))?;

        Ok(Self {
            host: caps[1].to_string(),
            actor: caps[2].to_string(),
            rkey: caps[3].to_string(),
        })
    }
}

impl fmt::Display for WebUrl {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "https://{}/profile/{}/post/{}", self.host, self.actor, self.rkey)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PostIdentifier {
    NativeUri(AtUri),
    WebUrl(WebUrl),
}

impl PostIdentifier {
    /// Dispatch on the scheme prefix, then parse strictly.
    pub fn parse(input: &str) -> Result<Self, IdentifierError> {
        if input.starts_with(NATIVE_SCHEME) {
            AtUri::parse(input).map(Self::NativeUri)
        } else if input.starts_with(WEB_SCHEME) {
            WebUrl::parse(input).map(Self::WebUrl)
        } else {
            Err(IdentifierError::UnknownScheme(input.to_string()))
        }
    }

    /// DID or handle of the post's author.
    pub fn actor(&self) -> &str {
        match self {
            Self::NativeUri(uri) => &uri.authority,
            Self::WebUrl(url) => &url.actor,
        }
    }

    pub fn rkey(&self) -> &str {
        match self {
            Self::NativeUri(uri) => &uri.rkey,
            Self::WebUrl(url) => &url.rkey,
        }
    }
}

pub fn web_post_url(web_host: &str, actor: &str, rkey: &str) -> String {
    format!("https://{}/profile/{}/post/{}", web_host, actor, rkey)
}

/// Build a web URL from an at:// URI when the author's handle is already known.
pub fn at_uri_to_web_url(web_host: &str, at_uri: &str, handle: &str) -> String {
    let post_id = at_uri.rsplit('/').next().unwrap_or("");
    web_post_url(web_host, handle, post_id)
}

/// Convert an identifier to its web URL.
///
/// An absent or empty identifier gives an empty string and a web URL comes
/// back unchanged. A native URI costs one profile lookup for the author's
/// handle.
pub async fn to_web_url(
    api: &dyn BskyApi,
    web_host: &str,
    identifier: Option<&str>,
) -> Result<String> {
    let Some(identifier) = identifier.filter(|s| !s.is_empty()) else {
        return Ok(String::new());
    };

    if identifier.starts_with(WEB_SCHEME) {
        return Ok(identifier.to_string());
    }
    if !identifier.starts_with(NATIVE_SCHEME) {
        return Err(IdentifierError::UnknownScheme(identifier.to_string()).into());
    }

    let uri = AtUri::parse(identifier)?;
    if !uri.is_post() {
        return Err(IdentifierError::NotAPost(identifier.to_string()).into());
    }

    let profile = api.get_profile(&uri.authority).await?;
    debug!(did = %uri.authority, handle = %profile.handle, "Resolved profile");

    Ok(web_post_url(web_host, &profile.handle, &uri.rkey))
}

/// Convert a web URL to the post's native URI, resolving the handle to a DID.
pub async fn to_native_uri(api: &dyn BskyApi, web_url: &str) -> Result<String> {
    if !web_url.starts_with(WEB_SCHEME) {
        return Err(IdentifierError::NotWebUrl(web_url.to_string()).into());
    }

    let url = WebUrl::parse(web_url)?;

    // Resolve handle to DID (unless it's already a DID)
    let did = if url.actor.starts_with("did:") {
        url.actor
    } else {
        let did = api.resolve_handle(&url.actor).await?;
        debug!(handle = %url.actor, %did, "Resolved handle");
        did
    };

    Ok(AtUri::post(did, url.rkey).to_string())
}

/// Both forms of one post's identifier.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Canonical {
    pub uri: String,
    pub url: String,
}

/// Fill in whichever form `input` is missing.
pub async fn canonicalize(api: &dyn BskyApi, web_host: &str, input: &str) -> Result<Canonical> {
    if input.starts_with(NATIVE_SCHEME) {
        let url = to_web_url(api, web_host, Some(input)).await?;
        Ok(Canonical {
            uri: input.to_string(),
            url,
        })
    } else {
        let uri = to_native_uri(api, input).await?;
        Ok(Canonical {
            uri,
            url: input.to_string(),
        })
    }
}
