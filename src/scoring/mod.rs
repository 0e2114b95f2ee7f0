//! Rating token extraction.
//!
//! The model is instructed to end its rationale with `SCORE_<digits>`. Extraction
//! is a pure function over the text accumulated so far and must be re-run on
//! every streaming update: a miss now says nothing about the next delta.

pub mod extractor;


pub use extractor::{contains_score, extract_score};
