use std::io::Write;

use anyhow::{Context, Result};
use bsky_leaves_lib::{
    canonicalize, fetch_thread, log_post, walk, BskyClient, Config, PostIdentifier, ThreadNode,
    WalkMode,
};
use clap::Parser;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "bsky-leaves")]
#[command(about = "Print the leaf posts of a Bluesky reply thread")]
struct Args {
    /// Post identifier: at://did/app.bsky.feed.post/rkey or https://host/profile/handle/post/rkey
    identifier: String,

    /// Print every post in the thread with its author, not just the leaves
    #[arg(long)]
    full: bool,

    /// Log a summary of the post itself before walking its thread
    #[arg(long)]
    post: bool,
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_target(false)
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .init();

    let args = Args::parse();

    // Reject malformed input before touching the network
    PostIdentifier::parse(&args.identifier)?;
    let config = Config::from_env()?;

    let client = BskyClient::login(&config.service, &config.username, &config.password)
        .await
        .context("Failed to log in")?;
    let session = client.session();
    info!(did = %session.did, handle = %session.handle, "Logged in to {}", config.service);

    let stdout = std::io::stdout();
    let mut out = stdout.lock();

    if args.post {
        log_post(&mut out, &client, &config.web_host, &args.identifier).await;
    }

    let canonical = canonicalize(&client, &config.web_host, &args.identifier).await?;
    info!(uri = %canonical.uri, url = %canonical.url, "Resolved post");

    writeln!(out, "{}", canonical.url)?;

    let mode = if args.full { WalkMode::Full } else { WalkMode::Leaves };

    match fetch_thread(&client, &canonical.uri).await? {
        ThreadNode::Post(thread) => walk(&mut out, &thread, mode, &config.web_host)?,
        ThreadNode::NotFound(_) => warn!("Post not found: {}", canonical.uri),
        ThreadNode::Blocked(_) => warn!("Post is blocked: {}", canonical.uri),
        ThreadNode::Unknown => warn!("Unrecognized thread root for {}", canonical.uri),
    }

    out.flush()?;

    Ok(())
}
