//! Per-item processing coordination.
//!
//! [`PipelineService::schedule`] applies the fast paths (allow-listed author,
//! finalised cache entry), de-duplicates concurrent attempts for one item, and
//! otherwise runs context assembly, the retry loop and cache finalisation.
//! Every scheduled item ends in a settled [`ProcessingState`] with a score on
//! display, and a failed item can always be scheduled again.

pub mod service;
pub mod state;


pub use service::PipelineService;
pub use state::{ProcessingState, ScheduleOutcome};
