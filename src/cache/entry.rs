use serde::{Deserialize, Serialize};

/// A stored rating for one item.
///
/// Finalised entries (`streaming == false`) are immutable. Streaming entries
/// are advisory: the best score seen so far for an attempt still in progress.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CacheEntry {
    /// The exact text that was rated, assembled thread context included.
    pub source_content: String,
    pub score: u32,
    /// Rationale text.
    pub description: String,
    #[serde(default)]
    pub streaming: bool,
    /// Unix millis at finalisation; absent while streaming.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<i64>,
}

impl CacheEntry {
    #[inline]
    pub fn is_final(&self) -> bool {
        !self.streaming
    }
}

/// Change notification delivered to cache subscribers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CacheChange {
    /// A streaming entry was created or updated.
    Partial { item_id: String, score: u32 },
    /// An entry was finalised.
    Final { item_id: String, score: u32 },
    /// Every entry was removed.
    Cleared,
}

/// Summary of the cache contents.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize)]
pub struct CacheStats {
    pub finalized: usize,
    pub streaming: usize,
    /// Mean score over finalised entries.
    pub mean_score: Option<f64>,
}
