//! Entry command handlers

use anyhow::{bail, Context, Result};

use wordbook_core::Store;

use crate::output::Output;

/// Add or overwrite an entry
pub async fn add(store: &Store, word: String, definition: String, output: &Output) -> Result<()> {
    if word.trim().is_empty() {
        bail!("Word must not be empty");
    }

    let replaced = store.get(&word).is_some();
    store
        .add(word.clone(), definition)
        .await
        .with_context(|| format!("Failed to add '{}'", word))?;

    if replaced {
        output.success(&format!("Updated '{}'", word));
    } else {
        output.success(&format!("Added '{}'", word));
    }
    Ok(())
}

/// Show the definition of a word
pub fn get(store: &Store, word: String, output: &Output) -> Result<()> {
    match store.get(&word) {
        Some(entry) => {
            output.print_entry(&entry);
            Ok(())
        }
        None => bail!("No entry found for '{}'", word),
    }
}

/// Remove an entry
///
/// Removing a word that isn't there is reported but is not an error.
pub async fn remove(store: &Store, word: String, output: &Output) -> Result<()> {
    let removed = store
        .remove(word.clone())
        .await
        .with_context(|| format!("Failed to remove '{}'", word))?;

    if removed {
        output.success(&format!("Removed '{}'", word));
    } else {
        output.message(&format!("'{}' was not in the dictionary", word));
    }
    Ok(())
}

/// List all entries, sorted by word
pub fn list(store: &Store, output: &Output) -> Result<()> {
    output.print_entries(&store.list());
    Ok(())
}
