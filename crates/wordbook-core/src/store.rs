//! Dictionary store
//!
//! The `Store` owns the in-memory dictionary and the JSON file behind it.
//!
//! ## Mutations
//!
//! `add` and `remove` never touch the map directly. Each call packages an
//! [`Operation`] with a one-shot reply channel and hands it to a single
//! background worker, which applies operations one at a time in the order
//! they were received. For every operation the worker:
//!
//! 1. Re-reads the file, so out-of-band edits are picked up
//! 2. Applies the mutation
//! 3. Saves the file
//! 4. Publishes the new map to readers and replies to the caller
//!
//! A failed reload or save is reported to that caller only; the worker keeps
//! serving later operations. The published map is replaced only after a
//! successful save, so readers never see state that is not on disk.
//!
//! ## Reads
//!
//! `get`, `list` and friends read the last published snapshot under a read
//! lock. They never trigger file I/O.
//!
//! ## Usage
//!
//! ```ignore
//! let store = Store::open("dictionary.json").await?;
//!
//! store.add("go", "aller").await?;
//! assert_eq!(store.get("go").unwrap().definition, "aller");
//!
//! let removed = store.remove("go").await?;
//! ```

use std::path::{Path, PathBuf};
use std::sync::{Arc, RwLock, RwLockReadGuard};
use std::time::Duration;

use thiserror::Error;
use tokio::sync::{mpsc, oneshot, watch};
use tracing::{debug, info, warn};

use crate::config::Config;
use crate::models::{Entries, Entry};
use crate::storage::{JsonPersistence, StorageError, StorageResult, StorageStats};

/// Pending operations the worker will buffer before `add`/`remove` wait to enqueue
const QUEUE_CAPACITY: usize = 64;

/// Errors returned by store operations
#[derive(Error, Debug)]
pub enum StoreError {
    /// Loading or saving the dictionary file failed
    #[error(transparent)]
    Storage(#[from] StorageError),

    /// The caller gave up waiting for the worker
    #[error("Timed out after {timeout:?} waiting for {operation} to complete")]
    Timeout {
        operation: &'static str,
        timeout: Duration,
    },

    /// The background worker is no longer running
    #[error("Store worker has stopped")]
    WorkerStopped,
}

/// Result type for store operations
pub type StoreResult<T> = Result<T, StoreError>;

/// A mutation to apply to the dictionary
#[derive(Debug, Clone, PartialEq, Eq)]
enum Mutation {
    Add { word: String, definition: String },
    Remove { word: String },
}

impl Mutation {
    fn name(&self) -> &'static str {
        match self {
            Mutation::Add { .. } => "add",
            Mutation::Remove { .. } => "remove",
        }
    }
}

/// A mutation plus the channel its outcome is reported on
///
/// The reply carries `true` when the word was already present before the
/// mutation was applied.
#[derive(Debug)]
struct Operation {
    mutation: Mutation,
    reply: oneshot::Sender<StorageResult<bool>>,
}

/// Handle to a word → definition store
///
/// Cloning is cheap; all clones share the same worker and snapshot. The
/// worker exits once the last handle is dropped.
#[derive(Clone)]
pub struct Store {
    /// Last persisted map, shared with the worker
    snapshot: Arc<RwLock<Entries>>,
    /// File persistence handler
    persistence: JsonPersistence,
    /// Submission side of the worker queue
    ops_tx: mpsc::Sender<Operation>,
    /// Revision counter, bumped after every persisted change
    revision_rx: watch::Receiver<u64>,
    /// Configuration
    config: Config,
}

impl Store {
    /// Open a store backed by the file at `path`
    ///
    /// If the file doesn't exist, an empty dictionary is created and written.
    /// Fails if the file exists but is not a valid dictionary.
    pub async fn open(path: impl Into<PathBuf>) -> StoreResult<Self> {
        Self::open_with_config(Config::with_data_file(path)).await
    }

    /// Open the store described by a configuration
    ///
    /// Must be called from within a tokio runtime; the worker is spawned on it.
    pub async fn open_with_config(config: Config) -> StoreResult<Self> {
        let persistence = JsonPersistence::new(config.data_file.clone());
        let entries = {
            let persistence = persistence.clone();
            tokio::task::spawn_blocking(move || persistence.load_or_create())
                .await
                .map_err(aborted)??
        };

        info!(
            "Opened dictionary {:?} with {} entries",
            persistence.path(),
            entries.len()
        );

        let snapshot = Arc::new(RwLock::new(entries));
        let (ops_tx, ops_rx) = mpsc::channel(QUEUE_CAPACITY);
        let (revision_tx, revision_rx) = watch::channel(0);

        tokio::spawn(worker_loop(
            persistence.clone(),
            Arc::clone(&snapshot),
            ops_rx,
            revision_tx,
        ));

        Ok(Self {
            snapshot,
            persistence,
            ops_tx,
            revision_rx,
            config,
        })
    }

    // ==================== Mutations ====================

    /// Insert or overwrite the definition of `word`
    ///
    /// Returns once the change is on disk.
    pub async fn add(
        &self,
        word: impl Into<String>,
        definition: impl Into<String>,
    ) -> StoreResult<()> {
        self.submit(Mutation::Add {
            word: word.into(),
            definition: definition.into(),
        })
        .await
        .map(|_| ())
    }

    /// Delete `word` if present
    ///
    /// Returns `false` when the word was not in the dictionary; that is not
    /// an error and leaves the file untouched.
    pub async fn remove(&self, word: impl Into<String>) -> StoreResult<bool> {
        self.submit(Mutation::Remove { word: word.into() }).await
    }

    /// Hand a mutation to the worker and wait for its outcome
    ///
    /// The timeout covers both queueing and execution. An operation that
    /// times out may still be applied by the worker afterwards.
    async fn submit(&self, mutation: Mutation) -> StoreResult<bool> {
        let operation = mutation.name();
        let timeout = self.config.op_timeout();
        let (reply_tx, reply_rx) = oneshot::channel();

        let round_trip = async {
            self.ops_tx
                .send(Operation {
                    mutation,
                    reply: reply_tx,
                })
                .await
                .map_err(|_| StoreError::WorkerStopped)?;

            let outcome = reply_rx.await.map_err(|_| StoreError::WorkerStopped)?;
            outcome.map_err(StoreError::from)
        };

        match tokio::time::timeout(timeout, round_trip).await {
            Ok(result) => result,
            Err(_) => {
                warn!("{} timed out after {:?}", operation, timeout);
                Err(StoreError::Timeout { operation, timeout })
            }
        }
    }

    // ==================== Reads ====================

    /// Get the entry for `word`
    pub fn get(&self, word: &str) -> Option<Entry> {
        self.read_snapshot()
            .get(word)
            .map(|definition| Entry::new(word, definition.clone()))
    }

    /// Get the entry for `word` along with whether it was found
    ///
    /// When absent, the returned entry carries an empty definition.
    pub fn lookup(&self, word: &str) -> (Entry, bool) {
        match self.get(word) {
            Some(entry) => (entry, true),
            None => (Entry::new(word, String::new()), false),
        }
    }

    /// All entries, sorted ascending by word
    pub fn list(&self) -> Vec<Entry> {
        Entry::sorted_from(&self.read_snapshot())
    }

    /// Number of entries
    pub fn len(&self) -> usize {
        self.read_snapshot().len()
    }

    /// Check if the dictionary is empty
    pub fn is_empty(&self) -> bool {
        self.read_snapshot().is_empty()
    }

    fn read_snapshot(&self) -> RwLockReadGuard<'_, Entries> {
        // The map is only ever replaced wholesale, so a poisoned lock still
        // holds a complete snapshot.
        self.snapshot.read().unwrap_or_else(|e| e.into_inner())
    }

    // ==================== Change notification ====================

    /// Current revision; starts at 0 and increases with every persisted change
    pub fn revision(&self) -> u64 {
        *self.revision_rx.borrow()
    }

    /// Subscribe to revision changes
    pub fn subscribe(&self) -> watch::Receiver<u64> {
        self.revision_rx.clone()
    }

    // ==================== Info ====================

    /// Path of the dictionary file
    pub fn path(&self) -> &Path {
        self.persistence.path()
    }

    /// Get the configuration
    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Get statistics about the dictionary file
    pub fn storage_stats(&self) -> StorageStats {
        self.persistence.stats()
    }
}

/// Worker loop: applies operations one at a time in receipt order
///
/// Runs until every `Store` handle has been dropped.
async fn worker_loop(
    persistence: JsonPersistence,
    snapshot: Arc<RwLock<Entries>>,
    mut ops_rx: mpsc::Receiver<Operation>,
    revision_tx: watch::Sender<u64>,
) {
    while let Some(Operation { mutation, reply }) = ops_rx.recv().await {
        let operation = mutation.name();
        let persistence = persistence.clone();
        let snapshot = Arc::clone(&snapshot);

        // File I/O runs on the blocking pool; awaiting it here keeps the
        // next operation from starting until this one is done.
        let outcome = tokio::task::spawn_blocking(move || {
            apply_mutation(&persistence, &snapshot, &mutation)
        })
        .await;

        let result = match outcome {
            Ok(Ok((existed, changed))) => {
                if changed {
                    revision_tx.send_modify(|rev| *rev += 1);
                }
                debug!("{} applied (existed={})", operation, existed);
                Ok(existed)
            }
            Ok(Err(e)) => {
                warn!("{} failed: {}", operation, e);
                Err(e)
            }
            Err(join_err) => {
                warn!("{} aborted: {}", operation, join_err);
                Err(aborted(join_err))
            }
        };

        // The caller may have timed out and dropped its receiver
        let _ = reply.send(result);
    }

    debug!("Store worker stopped");
}

/// Blocking file work that panicked or was cancelled
fn aborted(join_err: tokio::task::JoinError) -> StorageError {
    StorageError::Io(std::io::Error::new(
        std::io::ErrorKind::Other,
        join_err.to_string(),
    ))
}

/// Reload, mutate, save, publish
///
/// Returns `(existed, changed)`: whether the word was present before the
/// mutation, and whether the file was rewritten.
fn apply_mutation(
    persistence: &JsonPersistence,
    snapshot: &RwLock<Entries>,
    mutation: &Mutation,
) -> StorageResult<(bool, bool)> {
    let mut entries = persistence.load_or_create()?;

    let (existed, changed) = match mutation {
        Mutation::Add { word, definition } => {
            let previous = entries.insert(word.clone(), definition.clone());
            (previous.is_some(), true)
        }
        Mutation::Remove { word } => {
            let existed = entries.remove(word).is_some();
            (existed, existed)
        }
    };

    if changed {
        persistence.save(&entries)?;
    }

    *snapshot.write().unwrap_or_else(|e| e.into_inner()) = entries;
    Ok((existed, changed))
}
