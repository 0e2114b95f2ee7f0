use std::io::Write;

use parking_lot::Mutex;
use tracing::{info, warn};

use super::IndicatorUpdate;

/// Receives every indicator change. Called synchronously from the pipeline,
/// so implementations must not block for long.
pub trait IndicatorSink: Send + Sync {
    fn on_indicator_update(&self, update: &IndicatorUpdate);
}

/// Logs updates.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingSink;

impl IndicatorSink for TracingSink {
    fn on_indicator_update(&self, update: &IndicatorUpdate) {
        info!(
            item_id = %update.item_id,
            score = ?update.score,
            status = %update.status,
            description_len = update.description.len(),
            "indicator update"
        );
    }
}

/// Writes one JSON object per update to a writer (stdout by default).
pub struct JsonLinesSink {
    out: Mutex<Box<dyn Write + Send>>,
}

impl std::fmt::Debug for JsonLinesSink {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("JsonLinesSink").finish_non_exhaustive()
    }
}

impl JsonLinesSink {
    pub fn stdout() -> Self {
        Self::new(Box::new(std::io::stdout()))
    }

    pub fn new(out: Box<dyn Write + Send>) -> Self {
        Self {
            out: Mutex::new(out),
        }
    }
}

impl IndicatorSink for JsonLinesSink {
    fn on_indicator_update(&self, update: &IndicatorUpdate) {
        let line = match serde_json::to_string(update) {
            Ok(line) => line,
            Err(e) => {
                warn!(item_id = %update.item_id, error = %e, "failed to encode indicator update");
                return;
            }
        };
        let mut out = self.out.lock();
        if let Err(e) = writeln!(out, "{line}").and_then(|()| out.flush()) {
            warn!(item_id = %update.item_id, error = %e, "failed to write indicator update");
        }
    }
}

/// Keeps every update for assertions.
#[cfg(any(test, feature = "mock"))]
#[derive(Debug, Default)]
pub struct RecordingSink {
    updates: Mutex<Vec<IndicatorUpdate>>,
}

#[cfg(any(test, feature = "mock"))]
impl RecordingSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn updates(&self) -> Vec<IndicatorUpdate> {
        self.updates.lock().clone()
    }

    /// Updates for one item, in order.
    pub fn for_item(&self, item_id: &str) -> Vec<IndicatorUpdate> {
        self.updates
            .lock()
            .iter()
            .filter(|u| u.item_id == item_id)
            .cloned()
            .collect()
    }

    pub fn last_for(&self, item_id: &str) -> Option<IndicatorUpdate> {
        self.for_item(item_id).pop()
    }
}

#[cfg(any(test, feature = "mock"))]
impl IndicatorSink for RecordingSink {
    fn on_indicator_update(&self, update: &IndicatorUpdate) {
        self.updates.lock().push(update.clone());
    }
}
