use std::collections::HashMap;

use parking_lot::Mutex;
use tracing::{debug, trace};

use crate::cache::ResultCache;
use crate::constants::REPLY_SEPARATOR;
use crate::extractor::ContentExtractor;
use crate::item::{Item, ItemId, format_context};
use crate::rating::RatingError;

/// Assembly state of one conversation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ThreadMarker {
    Absent,
    Pending,
    Ready,
}

/// What one call to [`ThreadContextAssembler::extend`] did.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExtendOutcome {
    /// A reply was appended, by reference to its cached content or freshly
    /// rendered.
    Appended { reply_id: ItemId, from_cache: bool },
    /// No reply is ready to be appended.
    NothingToAppend,
    /// Another extension of this conversation is in progress.
    Busy,
    /// The conversation's root has not been observed.
    NotStarted,
}

#[derive(Debug)]
struct ThreadState {
    marker: ThreadMarker,
    assembled: String,
    /// Appended replies with the length of the assembled text before each.
    /// Assembly only ever extends the text, so that length is a valid prefix.
    replies: Vec<(ItemId, usize)>,
}

type Threads = Mutex<HashMap<String, ThreadState>>;

/// Returns a conversation to `Ready` when an extension step ends, including
/// when its future is dropped mid-way.
struct PendingGuard<'a> {
    threads: &'a Threads,
    conversation_id: &'a str,
}

impl Drop for PendingGuard<'_> {
    fn drop(&mut self) {
        if let Some(state) = self.threads.lock().get_mut(self.conversation_id) {
            state.marker = ThreadMarker::Ready;
        }
    }
}

/// Per-conversation ancestor context, owned by the pipeline service.
#[derive(Debug, Default)]
pub struct ThreadContextAssembler {
    threads: Threads,
}

impl ThreadContextAssembler {
    pub fn new() -> Self {
        Self::default()
    }

    /// Starts a conversation from its root item. Returns `false` if the
    /// conversation was already known.
    pub fn observe_root(&self, root: &Item) -> bool {
        let conversation_id = root.conversation_id.as_deref().unwrap_or(&root.id);
        let mut threads = self.threads.lock();
        if threads.contains_key(conversation_id) {
            return false;
        }

        threads.insert(
            conversation_id.to_string(),
            ThreadState {
                marker: ThreadMarker::Pending,
                assembled: String::new(),
                replies: Vec::new(),
            },
        );
        let assembled = format_context(root);
        if let Some(state) = threads.get_mut(conversation_id) {
            state.assembled = assembled;
            state.marker = ThreadMarker::Ready;
        }
        debug!(conversation_id, "thread root assembled");
        true
    }

    /// Appends the next ready reply of `conversation_id`, if any.
    ///
    /// A reply whose cached source content already holds the assembled
    /// ancestors plus itself replaces the text outright; any other cached
    /// content is appended after a reply separator. Uncached replies are
    /// rendered through the extractor.
    pub async fn extend(
        &self,
        conversation_id: &str,
        extractor: &dyn ContentExtractor,
        cache: &ResultCache,
    ) -> Result<ExtendOutcome, RatingError> {
        {
            let mut threads = self.threads.lock();
            let Some(state) = threads.get_mut(conversation_id) else {
                return Ok(ExtendOutcome::NotStarted);
            };
            if state.marker == ThreadMarker::Pending {
                trace!(conversation_id, "thread extension already in progress");
                return Ok(ExtendOutcome::Busy);
            }
            state.marker = ThreadMarker::Pending;
        }
        let _guard = PendingGuard {
            threads: &self.threads,
            conversation_id,
        };

        let Some(reply_id) = extractor
            .find_next_unprocessed_sibling(conversation_id)
            .await
        else {
            return Ok(ExtendOutcome::NothingToAppend);
        };

        let (addition, from_cache) = match cache.lookup_final(&reply_id) {
            Some(entry) => (entry.source_content, true),
            None => {
                let reply = extractor.extract(&reply_id).await?;
                (format_context(&reply), false)
            }
        };

        let mut threads = self.threads.lock();
        if let Some(state) = threads.get_mut(conversation_id) {
            let prefix_before = state.assembled.len();
            let prefix_len = state.assembled.len() + REPLY_SEPARATOR.len();
            let extends_current = from_cache
                && addition.len() > prefix_len
                && addition.starts_with(state.assembled.as_str())
                && addition[state.assembled.len()..].starts_with(REPLY_SEPARATOR);
            if extends_current {
                state.assembled = addition;
            } else {
                state.assembled.push_str(REPLY_SEPARATOR);
                state.assembled.push_str(&addition);
            }
            state.replies.push((reply_id.clone(), prefix_before));
            debug!(
                conversation_id,
                reply_id = %reply_id,
                from_cache,
                assembled_len = state.assembled.len(),
                "thread extended"
            );
        }

        Ok(ExtendOutcome::Appended {
            reply_id,
            from_cache,
        })
    }

    /// Assembled text to prepend to a reply's own content.
    pub fn ancestor_context(&self, conversation_id: &str) -> Option<String> {
        self.threads
            .lock()
            .get(conversation_id)
            .filter(|s| !s.assembled.is_empty())
            .map(|s| s.assembled.clone())
    }

    /// Ancestor context for `item_id`: the text assembled before it was
    /// appended, or everything so far if it has not been appended.
    pub fn context_before(&self, conversation_id: &str, item_id: &str) -> Option<String> {
        let threads = self.threads.lock();
        let state = threads.get(conversation_id)?;
        let end = state
            .replies
            .iter()
            .find(|(id, _)| id == item_id)
            .map_or(state.assembled.len(), |(_, len)| *len);
        state
            .assembled
            .get(..end)
            .filter(|s| !s.is_empty())
            .map(str::to_string)
    }

    pub fn marker(&self, conversation_id: &str) -> ThreadMarker {
        self.threads
            .lock()
            .get(conversation_id)
            .map_or(ThreadMarker::Absent, |s| s.marker)
    }

    /// Replies appended so far, in order.
    pub fn replies(&self, conversation_id: &str) -> Vec<ItemId> {
        self.threads
            .lock()
            .get(conversation_id)
            .map(|s| s.replies.iter().map(|(id, _)| id.clone()).collect())
            .unwrap_or_default()
    }

    /// Drops a conversation whose view has gone away.
    pub fn forget(&self, conversation_id: &str) -> bool {
        self.threads.lock().remove(conversation_id).is_some()
    }

    pub fn len(&self) -> usize {
        self.threads.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.threads.lock().is_empty()
    }
}
