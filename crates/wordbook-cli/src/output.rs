//! Output formatting for CLI
//!
//! Provides consistent output formatting across all commands:
//! - Human-readable default output
//! - JSON output (--json flag)
//! - Quiet mode for scripting (--quiet flag)

use wordbook_core::Entry;

/// Output format options
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
    /// Human-readable output (default)
    Human,
    /// JSON output
    Json,
    /// Quiet mode - minimal output
    Quiet,
}

impl OutputFormat {
    /// Create format from CLI flags
    pub fn from_flags(json: bool, quiet: bool) -> Self {
        if quiet {
            OutputFormat::Quiet
        } else if json {
            OutputFormat::Json
        } else {
            OutputFormat::Human
        }
    }
}

/// Output helper for consistent formatting
pub struct Output {
    /// The output format
    pub format: OutputFormat,
}

impl Output {
    pub fn new(format: OutputFormat) -> Self {
        Self { format }
    }

    /// Print a single entry
    pub fn print_entry(&self, entry: &Entry) {
        match self.format {
            OutputFormat::Human => println!("{}: {}", entry.word, entry.definition),
            OutputFormat::Json => println!("{}", to_json(entry)),
            OutputFormat::Quiet => println!("{}", entry.definition),
        }
    }

    /// Print a list of entries
    pub fn print_entries(&self, entries: &[Entry]) {
        match self.format {
            OutputFormat::Human => {
                if entries.is_empty() {
                    println!("No entries found.");
                    return;
                }
                print!("{}", format_lines(entries));
                println!("\n{} entry(s)", entries.len());
            }
            OutputFormat::Json => println!("{}", to_json(entries)),
            OutputFormat::Quiet => {
                for entry in entries {
                    println!("{}", entry.word);
                }
            }
        }
    }

    /// Print a success message
    pub fn success(&self, message: &str) {
        match self.format {
            OutputFormat::Human => println!("✓ {}", message),
            OutputFormat::Json => {
                println!(
                    "{}",
                    serde_json::json!({"status": "success", "message": message})
                );
            }
            OutputFormat::Quiet => {}
        }
    }

    /// Print an informational message
    pub fn message(&self, msg: &str) {
        match self.format {
            OutputFormat::Human => println!("{}", msg),
            OutputFormat::Json => {
                println!("{}", serde_json::json!({"message": msg}));
            }
            OutputFormat::Quiet => {}
        }
    }
}

/// One `word: definition` line per entry
///
/// Shared with the HTTP `/list` endpoint.
pub fn format_lines(entries: &[Entry]) -> String {
    entries
        .iter()
        .map(|entry| format!("{}: {}\n", entry.word, entry.definition))
        .collect()
}

fn to_json<T: serde::Serialize + ?Sized>(value: &T) -> String {
    serde_json::to_string_pretty(value).unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_from_flags() {
        assert_eq!(OutputFormat::from_flags(false, false), OutputFormat::Human);
        assert_eq!(OutputFormat::from_flags(true, false), OutputFormat::Json);
        assert_eq!(OutputFormat::from_flags(false, true), OutputFormat::Quiet);
        // Quiet takes precedence
        assert_eq!(OutputFormat::from_flags(true, true), OutputFormat::Quiet);
    }

    #[test]
    fn test_format_lines() {
        let entries = vec![Entry::new("go", "aller"), Entry::new("hello", "bonjour")];
        assert_eq!(format_lines(&entries), "go: aller\nhello: bonjour\n");
        assert_eq!(format_lines(&[]), "");
    }

    #[test]
    fn test_to_json() {
        let json = to_json(&Entry::new("go", "aller"));
        assert!(json.contains("\"word\": \"go\""));
        assert!(json.contains("\"definition\": \"aller\""));
    }
}
