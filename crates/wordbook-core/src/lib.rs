//! Wordbook Core Library
//!
//! This crate provides the core functionality for wordbook, a small
//! word → definition dictionary kept in memory and persisted to a JSON file.
//!
//! # Architecture
//!
//! - **JSON file**: Durable state, rewritten atomically after every mutation
//! - **Store worker**: A single background task applies every add/remove in
//!   the order they were submitted
//!
//! Reads are served from the last persisted snapshot held in memory.
//!
//! # Quick Start
//!
//! ```text
//! let store = Store::open("dictionary.json").await?;
//!
//! store.add("hello", "bonjour").await?;
//! let entry = store.get("hello");
//! let entries = store.list();
//! ```
//!
//! # Modules
//!
//! - `store`: Store handle and the operation worker (main entry point)
//! - `models`: The `Entry` type
//! - `storage`: JSON file persistence and storage errors
//! - `config`: Application configuration

pub mod config;
pub mod models;
pub mod storage;
pub mod store;

pub use config::Config;
pub use models::{Entries, Entry};
pub use storage::{JsonPersistence, StorageError, StorageResult, StorageStats};
pub use store::{Store, StoreError, StoreResult};
