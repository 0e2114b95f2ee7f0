//! Reply-thread context assembly.
//!
//! Each conversation accumulates the rendered text of its root followed by
//! every reply that has a later reply rendered. The text only ever grows, and
//! at most one extension step runs per conversation: a second caller arriving
//! while one is in progress is turned away rather than queued.

pub mod assembler;


pub use assembler::{ExtendOutcome, ThreadContextAssembler, ThreadMarker};
