//! Storage layer
//!
//! Handles persistence of the dictionary to a single JSON file.
//!
//! ## Format
//!
//! The file holds one JSON object, indented with two spaces, whose keys are
//! words and whose values are definitions:
//!
//! ```text
//! {
//!   "go": "aller",
//!   "hello": "bonjour"
//! }
//! ```

pub mod error;
pub mod persistence;

pub use error::{StorageError, StorageResult};
pub use persistence::{JsonPersistence, StorageStats};
