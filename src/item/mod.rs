//! Items under rating and their textual context.

pub mod context;

#[cfg(test)]
mod tests;

pub use context::{format_context, with_ancestors};

use serde::{Deserialize, Serialize};

/// Stable identifier of an item, used for caching and de-duplication.
pub type ItemId = String;

/// A single post to be rated, as yielded by the content extractor.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct Item {
    pub id: ItemId,

    #[serde(default)]
    pub text: String,

    #[serde(default)]
    pub author_handle: String,

    #[serde(default)]
    pub media_urls: Vec<String>,

    /// Quoted post, one level deep.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub quoted_item: Option<Box<Item>>,

    /// Conversation this item belongs to; the root item's id doubles as the
    /// conversation id.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub conversation_id: Option<String>,

    /// Pre-assembled ancestor text, present only on replies.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parent_context: Option<String>,
}

impl Item {
    pub fn new(id: impl Into<ItemId>, author_handle: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            author_handle: author_handle.into(),
            text: text.into(),
            ..Default::default()
        }
    }

    pub fn with_media(mut self, urls: impl IntoIterator<Item = impl Into<String>>) -> Self {
        self.media_urls = urls.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_quoted(mut self, quoted: Item) -> Self {
        self.quoted_item = Some(Box::new(quoted));
        self
    }

    pub fn in_conversation(mut self, conversation_id: impl Into<String>) -> Self {
        self.conversation_id = Some(conversation_id.into());
        self
    }

    pub fn with_parent_context(mut self, context: impl Into<String>) -> Self {
        self.parent_context = Some(context.into());
        self
    }

    /// Returns `true` if this item opens its conversation (or has none).
    pub fn is_thread_root(&self) -> bool {
        match &self.conversation_id {
            Some(conversation) => *conversation == self.id,
            None => true,
        }
    }

    /// Returns `true` if there is nothing to rate: no text and no media,
    /// directly or through the quoted item.
    pub fn is_empty(&self) -> bool {
        self.text.trim().is_empty()
            && self.media_urls.is_empty()
            && self.quoted_item.as_ref().is_none_or(|q| q.is_empty())
    }

    /// Media URLs of this item followed by those of the quoted item.
    pub fn all_media(&self) -> Vec<&str> {
        let mut urls: Vec<&str> = self.media_urls.iter().map(String::as_str).collect();
        if let Some(quoted) = &self.quoted_item {
            urls.extend(quoted.media_urls.iter().map(String::as_str));
        }
        urls
    }
}
