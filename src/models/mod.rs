//! Model catalog: which models exist and what input they accept.
//!
//! Only request construction consults it, to decide whether media can be sent
//! as image parts.

pub mod catalog;
pub mod error;

#[cfg(test)]
mod tests;

pub use catalog::{ModelCatalog, ModelInfo, ModelPricing, parse_models};
pub use error::ModelsError;
