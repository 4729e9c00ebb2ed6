//! Output formatting for CLI commands.
//!
//! Provides abstraction layer for outputting results in text or JSON format.

use anyhow::Result;
use fscache_core::{CacheHeader, EntryInfo, SweepFailure, SweepStats};
use serde::Serialize;
use std::io::{self, Write};

/// Output format selection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
    Text,
    Json,
}

/// Writer for command output with format abstraction.
pub struct OutputWriter {
    format: OutputFormat,
    stdout: io::Stdout,
}

impl OutputWriter {
    /// Create a new OutputWriter.
    pub fn new(json: bool) -> Self {
        Self {
            format: if json {
                OutputFormat::Json
            } else {
                OutputFormat::Text
            },
            stdout: io::stdout(),
        }
    }

    /// Check if JSON mode is enabled.
    pub fn is_json(&self) -> bool {
        self.format == OutputFormat::Json
    }

    /// Write output using the configured format.
    ///
    /// The `data` parameter must be a serializable struct that includes
    /// `success: bool` and `result_code: u8` fields.
    ///
    /// The `text_fn` closure is called only in text mode to generate the
    /// human-readable output.
    pub fn write<T: Serialize>(&self, data: &T, text_fn: impl FnOnce() -> String) -> Result<()> {
        match self.format {
            OutputFormat::Json => {
                let json = serde_json::to_string_pretty(data)?;
                writeln!(&self.stdout, "{}", json)?;
            }
            OutputFormat::Text => {
                let text = text_fn();
                if !text.is_empty() {
                    write!(&self.stdout, "{}", text)?;
                }
            }
        }
        Ok(())
    }

    /// Write raw payload bytes to stdout.
    pub fn write_raw(&self, bytes: &[u8]) -> Result<()> {
        let mut handle = self.stdout.lock();
        handle.write_all(bytes)?;
        handle.flush()?;
        Ok(())
    }

    /// Write an error message to stderr.
    ///
    /// In JSON mode, writes a JSON error object with success=false.
    /// In text mode, writes the error message directly.
    pub fn write_error(&self, error: &anyhow::Error, result_code: u8) {
        match self.format {
            OutputFormat::Json => {
                let error_output = ErrorOutput {
                    success: false,
                    result_code,
                    error: format!("{:#}", error),
                };
                if let Ok(json) = serde_json::to_string_pretty(&error_output) {
                    let _ = writeln!(io::stderr(), "{}", json);
                }
            }
            OutputFormat::Text => {
                let _ = writeln!(io::stderr(), "Error: {:#}", error);
            }
        }
    }
}

/// Render a Unix timestamp as RFC 3339, or "never" for 0.
pub fn format_timestamp(secs: u64) -> String {
    if secs == 0 {
        return "never".to_string();
    }
    i64::try_from(secs)
        .ok()
        .and_then(|secs| chrono::DateTime::from_timestamp(secs, 0))
        .map(|dt| dt.to_rfc3339())
        .unwrap_or_else(|| format!("{} (out of range)", secs))
}

// ============================================================================
// Data Transfer Objects (DTOs) for JSON output
// ============================================================================

/// Error output structure.
#[derive(Debug, Serialize)]
pub struct ErrorOutput {
    pub success: bool,
    pub result_code: u8,
    pub error: String,
}

/// Output for `put` command.
#[derive(Debug, Serialize)]
pub struct PutOutput {
    pub success: bool,
    pub result_code: u8,
    pub key: String,
    pub size: usize,
    pub expiration_secs: u64,
}

/// Output for `get` command when the payload goes to a file or is missing.
#[derive(Debug, Serialize)]
pub struct GetOutput {
    pub success: bool,
    pub result_code: u8,
    pub key: String,
    pub found: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub size: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub destination: Option<String>,
}

/// Output for `rm` command.
#[derive(Debug, Serialize)]
pub struct RmOutput {
    pub success: bool,
    pub result_code: u8,
    pub key: String,
    pub removed: bool,
}

/// Header fields with readable timestamps for `stat`.
#[derive(Debug, Serialize)]
pub struct HeaderInfo {
    pub version: u8,
    pub created_at: u64,
    pub created_at_human: String,
    pub expiration_at: u64,
    pub expiration_at_human: String,
    pub data_length: u32,
}

impl From<CacheHeader> for HeaderInfo {
    fn from(header: CacheHeader) -> Self {
        Self {
            version: header.version,
            created_at: header.created_at,
            created_at_human: format_timestamp(header.created_at),
            expiration_at: header.expiration_at,
            expiration_at_human: format_timestamp(header.expiration_at),
            data_length: header.data_length,
        }
    }
}

/// Output for `stat` command.
#[derive(Debug, Serialize)]
pub struct StatOutput {
    pub success: bool,
    pub result_code: u8,
    pub key: String,
    pub path: String,
    pub header: HeaderInfo,
    pub size_on_disk: u64,
    pub expired: bool,
    pub complete: bool,
}

impl StatOutput {
    /// Build from an entry's header info.
    pub fn new(key: &str, info: EntryInfo) -> Self {
        Self {
            success: true,
            result_code: 0,
            key: key.to_string(),
            path: info.path.display().to_string(),
            header: info.header.into(),
            size_on_disk: info.size_on_disk,
            expired: info.expired,
            complete: info.complete,
        }
    }
}

/// Output for `clean` command.
#[derive(Debug, Serialize)]
pub struct CleanOutput {
    pub success: bool,
    pub result_code: u8,
    pub dry_run: bool,
    pub entries_scanned: usize,
    pub entries_removed: usize,
    pub bytes_freed: u64,
    pub failures: Vec<SweepFailure>,
}

impl CleanOutput {
    /// Build from sweep statistics.
    pub fn new(dry_run: bool, stats: SweepStats) -> Self {
        Self {
            success: stats.failures.is_empty(),
            result_code: 0,
            dry_run,
            entries_scanned: stats.entries_scanned,
            entries_removed: stats.entries_removed,
            bytes_freed: stats.bytes_freed,
            failures: stats.failures,
        }
    }
}

/// Output for `purge` command.
#[derive(Debug, Serialize)]
pub struct PurgeOutput {
    pub success: bool,
    pub result_code: u8,
    pub directory: String,
}

/// Output for `path` command.
#[derive(Debug, Serialize)]
pub struct PathOutput {
    pub success: bool,
    pub result_code: u8,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub key: Option<String>,
    pub path: String,
}
