//! File persistence utilities.

pub mod json_store;

// Re-export commonly used types
pub use json_store::{JsonStore, StoreError};
