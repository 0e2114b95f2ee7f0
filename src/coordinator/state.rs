use std::fmt;

use serde::Serialize;

use crate::cache::CacheEntry;
use crate::rating::RatingResult;

/// Where an item is in its rating lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ProcessingState {
    #[default]
    Unseen,
    Pending,
    Streaming,
    Rated,
    Cached,
    /// Author is on the allow-list: maximum score, no remote call. Reported
    /// under its historical name.
    #[serde(rename = "blacklisted")]
    AllowListed,
    Error,
}

impl ProcessingState {
    pub fn as_str(&self) -> &'static str {
        match self {
            ProcessingState::Unseen => "unseen",
            ProcessingState::Pending => "pending",
            ProcessingState::Streaming => "streaming",
            ProcessingState::Rated => "rated",
            ProcessingState::Cached => "cached",
            ProcessingState::AllowListed => "blacklisted",
            ProcessingState::Error => "error",
        }
    }

    /// Terminal, displayable states.
    pub fn is_settled(&self) -> bool {
        matches!(
            self,
            ProcessingState::Rated
                | ProcessingState::Cached
                | ProcessingState::AllowListed
                | ProcessingState::Error
        )
    }
}

impl fmt::Display for ProcessingState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// What [`PipelineService::schedule`](super::PipelineService::schedule) did.
#[derive(Debug, Clone, PartialEq)]
pub enum ScheduleOutcome {
    AllowListed { score: u32 },
    Cached(CacheEntry),
    /// Another attempt for the same item is in flight.
    Duplicate,
    Rated(RatingResult),
    /// The pipeline ended in the error state with the fallback score.
    Failed(RatingResult),
}

impl ScheduleOutcome {
    /// Score displayed for the item, if this call settled it.
    pub fn score(&self) -> Option<u32> {
        match self {
            ScheduleOutcome::AllowListed { score } => Some(*score),
            ScheduleOutcome::Cached(entry) => Some(entry.score),
            ScheduleOutcome::Duplicate => None,
            ScheduleOutcome::Rated(result) | ScheduleOutcome::Failed(result) => result.score,
        }
    }

    pub fn state(&self) -> Option<ProcessingState> {
        match self {
            ScheduleOutcome::AllowListed { .. } => Some(ProcessingState::AllowListed),
            ScheduleOutcome::Cached(_) => Some(ProcessingState::Cached),
            ScheduleOutcome::Duplicate => None,
            ScheduleOutcome::Rated(_) => Some(ProcessingState::Rated),
            ScheduleOutcome::Failed(_) => Some(ProcessingState::Error),
        }
    }
}
