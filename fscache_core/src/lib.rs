//! # fscache core
//!
//! A filesystem-backed key-value cache with optional time-based expiration.
//!
//! Each key is stored as one file in a per-application cache directory. The
//! file carries a fixed 21-byte header (format version, creation time,
//! expiration time, payload length) followed by the payload, so entries
//! survive process restarts and can be validated without an index.
//!
//! ## Features
//!
//! - Expiring and permanent entries
//! - Loads that evict expired and foreign-format entries
//! - Truncation detection for torn or partial writes
//! - Plain or hashed filenames
//! - Best-effort expiration sweep with collected failures
//!
//! ## Example
//!
//! ```no_run
//! use fscache_core::{Cache, CacheConfig};
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let cache = Cache::open(CacheConfig::new("my-app")?.with_default_expiration(3600))?;
//!
//! cache.save("greeting", b"hello")?;
//! assert_eq!(cache.load("greeting")?, Some(b"hello".to_vec()));
//!
//! // Drop anything that has expired
//! let stats = cache.clean_expired();
//! println!("Removed {} entries", stats.entries_removed);
//! # Ok(())
//! # }
//! ```

pub mod clock;
mod config;
mod error;
pub mod header;
mod naming;
mod store;
mod sweep;

pub use clock::{Clock, ManualClock, SystemClock};
pub use config::{CacheConfig, DEFAULT_APP_NAME, default_base_dir};
pub use error::{Error, Result};
pub use header::{CacheHeader, HEADER_SIZE, VERSION};
pub use naming::{FilenameStrategy, hashed_name};
pub use store::{Cache, EntryInfo};
pub use sweep::{SweepFailure, SweepStats};
