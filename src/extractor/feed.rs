use std::collections::{HashMap, HashSet, VecDeque};

use async_trait::async_trait;
use parking_lot::RwLock;
use tracing::trace;

use super::ContentExtractor;
use crate::item::{Item, ItemId};
use crate::rating::RatingError;

#[derive(Debug, Default)]
struct FeedState {
    items: HashMap<ItemId, Item>,
    /// Replies per conversation in arrival order, not yet handed out.
    queued: HashMap<String, VecDeque<ItemId>>,
    handed_out: HashSet<ItemId>,
}

/// In-memory extractor fed by item discovery.
///
/// A reply becomes available to [`find_next_unprocessed_sibling`] once a
/// later reply in the same conversation has been observed, and is handed out
/// exactly once.
///
/// [`find_next_unprocessed_sibling`]: ContentExtractor::find_next_unprocessed_sibling
#[derive(Debug, Default)]
pub struct FeedExtractor {
    state: RwLock<FeedState>,
}

impl FeedExtractor {
    pub fn new() -> Self {
        Self::default()
    }

    /// Records a discovered item. Re-observing an id refreshes its content
    /// without changing its position in the thread.
    pub fn observe(&self, item: Item) {
        let mut state = self.state.write();
        let id = item.id.clone();
        let reply_of = (!item.is_thread_root())
            .then(|| item.conversation_id.clone())
            .flatten();
        let is_new = state.items.insert(id.clone(), item).is_none();

        if let Some(conversation_id) = reply_of
            && is_new
            && !state.handed_out.contains(&id)
        {
            trace!(item_id = %id, conversation_id, "reply queued");
            state.queued.entry(conversation_id).or_default().push_back(id);
        }
    }

    pub fn get(&self, item_id: &str) -> Option<Item> {
        self.state.read().items.get(item_id).cloned()
    }

    pub fn len(&self) -> usize {
        self.state.read().items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.state.read().items.is_empty()
    }
}

#[async_trait]
impl ContentExtractor for FeedExtractor {
    async fn extract(&self, item_id: &str) -> Result<Item, RatingError> {
        let item = self
            .get(item_id)
            .ok_or_else(|| RatingError::context_unavailable(format!("item {item_id} not observed")))?;
        if item.is_empty() {
            return Err(RatingError::context_unavailable(format!(
                "item {item_id} has no text or media"
            )));
        }
        Ok(item)
    }

    async fn find_next_unprocessed_sibling(&self, conversation_id: &str) -> Option<ItemId> {
        let mut state = self.state.write();
        let queue = state.queued.get_mut(conversation_id)?;
        if queue.len() < 2 {
            return None;
        }
        let next = queue.pop_front()?;
        state.handed_out.insert(next.clone());
        Some(next)
    }
}
