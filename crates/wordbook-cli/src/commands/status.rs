//! Status command handler

use anyhow::Result;

use wordbook_core::Store;

use crate::output::{Output, OutputFormat};

/// Show status information
pub fn show(store: &Store, output: &Output) -> Result<()> {
    let stats = store.storage_stats();

    match output.format {
        OutputFormat::Json => {
            println!(
                "{}",
                serde_json::json!({
                    "data_file": store.path(),
                    "file_exists": stats.file_exists,
                    "file_size": stats.file_size,
                    "entries": store.len()
                })
            );
        }
        OutputFormat::Quiet => {
            println!("{}", store.len());
        }
        OutputFormat::Human => {
            println!("Wordbook Status");
            println!("===============");
            println!();
            println!("Storage:");
            println!("  Location: {}", store.path().display());
            println!("  Size:     {}", stats.file_size_human());
            println!();
            println!("Contents:");
            println!("  Entries: {}", store.len());
        }
    }

    Ok(())
}
