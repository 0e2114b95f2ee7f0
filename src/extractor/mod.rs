//! Source of items and thread structure.
//!
//! The pipeline never inspects a document itself. It asks a
//! [`ContentExtractor`] for an item by id and for the next reply of a
//! conversation that is ready to be folded into thread context.

pub mod feed;

#[cfg(test)]
mod tests;

pub use feed::FeedExtractor;

use async_trait::async_trait;

use crate::item::{Item, ItemId};
use crate::rating::RatingError;

#[async_trait]
pub trait ContentExtractor: Send + Sync {
    /// Resolves an item. Fails with [`RatingError::ContextUnavailable`] when
    /// the item cannot be read.
    async fn extract(&self, item_id: &str) -> Result<Item, RatingError>;

    /// Next reply of `conversation_id` that has a later reply already rendered
    /// and has not been handed out before.
    async fn find_next_unprocessed_sibling(&self, conversation_id: &str) -> Option<ItemId>;
}
