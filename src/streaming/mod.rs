//! Server-sent-event decoding of completion streams.
//!
//! The decoder reassembles `data:` lines across chunk boundaries, emits one
//! delta per parsed event, and always ends with a single terminal event:
//! `[DONE]`, transport close, an inactivity timeout, or a run of empty chunks
//! all complete normally with whatever content has accumulated. Malformed
//! lines are logged and skipped.

pub mod decoder;


pub use decoder::{CompletionReason, StreamDecoder, StreamEvent};
