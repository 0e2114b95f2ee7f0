//! Indicator updates delivered to whatever displays ratings.

pub mod sink;


#[cfg(any(test, feature = "mock"))]
pub use sink::RecordingSink;
pub use sink::{IndicatorSink, JsonLinesSink, TracingSink};

use serde::Serialize;

use crate::coordinator::ProcessingState;
use crate::item::ItemId;

/// One change of an item's displayed rating.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct IndicatorUpdate {
    pub item_id: ItemId,
    /// `None` only while pending without a partial score.
    pub score: Option<u32>,
    pub status: ProcessingState,
    pub description: String,
}

impl IndicatorUpdate {
    pub fn new(
        item_id: impl Into<ItemId>,
        score: Option<u32>,
        status: ProcessingState,
        description: impl Into<String>,
    ) -> Self {
        Self {
            item_id: item_id.into(),
            score,
            status,
            description: description.into(),
        }
    }
}
