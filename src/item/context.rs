//! Rendering of an item into the text block sent for rating.

use std::fmt::Write as _;

use super::Item;
use crate::constants::REPLY_SEPARATOR;

/// Renders an item with its media placeholders and quoted sub-context.
pub fn format_context(item: &Item) -> String {
    let mut out = String::with_capacity(item.text.len() + 64);
    let _ = write!(out, "[POST {}]\n Author:@{}:\n{}", item.id, item.author_handle, item.text);
    push_media(&mut out, &item.media_urls);

    if let Some(quoted) = &item.quoted_item {
        let _ = write!(
            out,
            "\n[QUOTED_POST]:\n Author:@{}:\n{}",
            quoted.author_handle, quoted.text
        );
        push_media(&mut out, &quoted.media_urls);
    }

    out
}

/// Prefixes `own` with ancestor context when there is any.
pub fn with_ancestors(ancestors: Option<&str>, own: &str) -> String {
    match ancestors.filter(|a| !a.trim().is_empty()) {
        Some(ancestors) => format!("{ancestors}{REPLY_SEPARATOR}{own}"),
        None => own.to_string(),
    }
}

fn push_media(out: &mut String, urls: &[String]) {
    if urls.is_empty() {
        return;
    }
    out.push_str("\n[MEDIA_URLS]:\n");
    out.push_str(&urls.join(", "));
}
