//! Depth-first, pre-order traversal of a reply thread.
//!
//! Children are visited in the order the service returned them. Both walkers
//! follow the same path and differ only in what they print.

use std::io::{self, Write};

use crate::api::{ThreadNode, ThreadViewPost};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum WalkMode {
    /// One line per leaf post.
    #[default]
    Leaves,
    /// Every post with its author, plus markers for leaves and missing replies.
    Full,
}

/// Run the walker selected by `mode` from the root of a thread.
pub fn walk<W: Write>(
    out: &mut W,
    thread: &ThreadViewPost,
    mode: WalkMode,
    web_host: &str,
) -> io::Result<()> {
    match mode {
        WalkMode::Leaves => print_leaves(out, thread, 0, web_host),
        WalkMode::Full => print_tree(out, thread, 0),
    }
}

/// Print `<depth> <text> <url>` for every leaf below `thread`.
///
/// Newlines in the text are escaped so each leaf stays on one line. Not-found
/// and blocked replies are skipped.
pub fn print_leaves<W: Write>(
    out: &mut W,
    thread: &ThreadViewPost,
    depth: usize,
    web_host: &str,
) -> io::Result<()> {
    if thread.is_leaf() {
        writeln!(
            out,
            "{} {} {}",
            depth,
            escape_newlines(thread.text()),
            thread.web_url(web_host)
        )?;
    }

    for reply in &thread.replies {
        if let ThreadNode::Post(child) = reply {
            print_leaves(out, child, depth + 1, web_host)?;
        }
    }

    Ok(())
}

/// Print every post as `<handle>: <text>`, indented by depth.
pub fn print_tree<W: Write>(out: &mut W, thread: &ThreadViewPost, indent: usize) -> io::Result<()> {
    let pad = " ".repeat(indent);
    writeln!(out, "{}{}: {}", pad, thread.handle(), thread.text())?;

    if thread.is_leaf() {
        writeln!(out, "{}LEAF", pad)?;
    }

    for reply in &thread.replies {
        match reply {
            ThreadNode::Post(child) => print_tree(out, child, indent + 1)?,
            _ => writeln!(out, "{}Not found", pad)?,
        }
    }

    Ok(())
}

/// Collect the leaf posts below `thread`, in traversal order.
pub fn leaves(thread: &ThreadViewPost) -> Vec<&ThreadViewPost> {
    let mut found = Vec::new();
    collect_leaves(thread, &mut found);
    found
}

fn collect_leaves<'a>(thread: &'a ThreadViewPost, found: &mut Vec<&'a ThreadViewPost>) {
    if thread.is_leaf() {
        found.push(thread);
    }

    for reply in &thread.replies {
        if let ThreadNode::Post(child) = reply {
            collect_leaves(child, found);
        }
    }
}

fn escape_newlines(text: &str) -> String {
    text.replace('\n', "\\n")
}
