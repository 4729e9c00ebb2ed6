//! Expiration sweep.

use crate::error::{Error, Result};
use crate::header::{CacheHeader, HEADER_SIZE};
use crate::store::{Cache, read_entry_header, remove_entry_file};
use serde::Serialize;
use std::fmt::Display;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

/// Statistics from a sweep.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct SweepStats {
    /// Number of entry files examined.
    pub entries_scanned: usize,
    /// Number of entries deleted (or that would be, on a dry run).
    pub entries_removed: usize,
    /// Bytes freed.
    pub bytes_freed: u64,
    /// Problems that stopped individual entries from being handled.
    pub failures: Vec<SweepFailure>,
}

/// A per-entry problem hit during a sweep.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SweepFailure {
    /// File or directory involved.
    pub path: PathBuf,
    /// What went wrong.
    pub reason: String,
}

impl SweepStats {
    fn record_failure(&mut self, path: &Path, reason: impl Display) {
        warn!("Sweep skipped {}: {}", path.display(), reason);
        self.failures.push(SweepFailure {
            path: path.to_path_buf(),
            reason: reason.to_string(),
        });
    }
}

/// Why an entry is being swept.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Verdict {
    Keep,
    Expired,
    Unreadable,
}

impl Cache {
    /// Delete every expired or unreadable entry.
    ///
    /// Best effort: per-entry failures are logged and collected in the
    /// returned stats, never returned as an error.
    pub fn clean_expired(&self) -> SweepStats {
        self.sweep(false)
    }

    /// Run the expiration sweep.
    ///
    /// An entry is removed when its header is expired, or when it cannot
    /// be decoded at all (short header, foreign version, truncated payload).
    /// If `dry_run` is true, reports what would be deleted without deleting.
    pub fn sweep(&self, dry_run: bool) -> SweepStats {
        let mut stats = SweepStats::default();

        let entries = match fs::read_dir(self.dir()) {
            Ok(entries) => entries,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return stats,
            Err(e) => {
                stats.record_failure(self.dir(), e);
                return stats;
            }
        };

        let now = self.now();

        for entry in entries {
            let entry = match entry {
                Ok(entry) => entry,
                Err(e) => {
                    stats.record_failure(self.dir(), e);
                    continue;
                }
            };
            let path = entry.path();

            match entry.file_type() {
                Ok(file_type) if file_type.is_file() => {}
                Ok(_) => continue,
                Err(e) => {
                    stats.record_failure(&path, e);
                    continue;
                }
            }

            stats.entries_scanned += 1;

            let (verdict, size) = match judge_entry(&path, now) {
                Ok(judged) => judged,
                // Removed by someone else since read_dir.
                Err(e) if e.is_not_found() => continue,
                Err(e) => {
                    stats.record_failure(&path, e);
                    continue;
                }
            };

            if verdict == Verdict::Keep {
                continue;
            }

            if !dry_run {
                match remove_entry_file(&path) {
                    Ok(true) => {}
                    Ok(false) => continue,
                    Err(e) => {
                        stats.record_failure(&path, e);
                        continue;
                    }
                }
            }

            debug!("Swept {} ({:?})", path.display(), verdict);
            stats.entries_removed += 1;
            stats.bytes_freed += size;
        }

        info!(
            "Sweep of {}: scanned {}, removed {}, freed {} bytes, {} failures{}",
            self.dir().display(),
            stats.entries_scanned,
            stats.entries_removed,
            stats.bytes_freed,
            stats.failures.len(),
            if dry_run { " (dry run)" } else { "" }
        );

        stats
    }
}

/// Decide whether an entry file should be swept.
///
/// Only I/O failures are returned as errors; decode failures make the
/// entry unreadable.
fn judge_entry(path: &Path, now: u64) -> Result<(Verdict, u64)> {
    let (header, size) = match read_entry_header(path) {
        Ok(found) => found,
        Err(e @ Error::Io { .. }) => return Err(e),
        Err(_) => return Ok((Verdict::Unreadable, fs::metadata(path)?.len())),
    };

    if !payload_complete(&header, size) {
        return Ok((Verdict::Unreadable, size));
    }

    if header.is_expired_at(now) {
        Ok((Verdict::Expired, size))
    } else {
        Ok((Verdict::Keep, size))
    }
}

fn payload_complete(header: &CacheHeader, size: u64) -> bool {
    size >= HEADER_SIZE as u64 + u64::from(header.data_length)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::ManualClock;
    use crate::config::CacheConfig;
    use crate::header::VERSION;
    use std::sync::Arc;
    use tempfile::TempDir;

    fn open_cache(temp_dir: &TempDir) -> (Cache, Arc<ManualClock>) {
        let clock = Arc::new(ManualClock::new(1_000));
        let config = CacheConfig::new("sweep-test")
            .unwrap()
            .with_base_dir(temp_dir.path());
        let cache = Cache::with_clock(config, clock.clone()).unwrap();
        (cache, clock)
    }

    #[test]
    fn test_sweep_empty_cache() {
        let temp_dir = TempDir::new().unwrap();
        let (cache, _) = open_cache(&temp_dir);

        let stats = cache.clean_expired();
        assert_eq!(stats, SweepStats::default());
    }

    #[test]
    fn test_sweep_missing_directory() {
        let temp_dir = TempDir::new().unwrap();
        let (cache, _) = open_cache(&temp_dir);
        cache.clean_all().unwrap();

        let stats = cache.clean_expired();
        assert_eq!(stats.entries_scanned, 0);
        assert!(stats.failures.is_empty());
    }

    #[test]
    fn test_sweep_removes_only_expired() {
        let temp_dir = TempDir::new().unwrap();
        let (cache, clock) = open_cache(&temp_dir);

        cache.save_with_expiration("short", b"gone soon", 5).unwrap();
        cache.save_with_expiration("long", b"stays", 500).unwrap();
        cache.save_with_expiration("forever", b"stays", 0).unwrap();

        clock.advance(10);
        let stats = cache.clean_expired();

        assert_eq!(stats.entries_scanned, 3);
        assert_eq!(stats.entries_removed, 1);
        assert_eq!(stats.bytes_freed, (HEADER_SIZE + 9) as u64);
        assert!(stats.failures.is_empty());

        assert!(!cache.entry_path("short").unwrap().exists());
        assert_eq!(cache.load("long").unwrap(), Some(b"stays".to_vec()));
        assert_eq!(cache.load("forever").unwrap(), Some(b"stays".to_vec()));
    }

    #[test]
    fn test_sweep_removes_unreadable_entries() {
        let temp_dir = TempDir::new().unwrap();
        let (cache, _) = open_cache(&temp_dir);

        cache.save("good", b"fine").unwrap();

        // Short header
        fs::write(cache.dir().join("garbage"), b"junk").unwrap();

        // Foreign version
        let mut foreign = crate::header::encode_at(b"old", 0, 1);
        foreign[0] = VERSION + 1;
        fs::write(cache.dir().join("foreign"), &foreign).unwrap();

        // Truncated payload
        let truncated = crate::header::encode_at(b"0123456789", 0, 1);
        fs::write(cache.dir().join("truncated"), &truncated[..HEADER_SIZE + 2]).unwrap();

        let stats = cache.clean_expired();
        assert_eq!(stats.entries_scanned, 4);
        assert_eq!(stats.entries_removed, 3);
        assert!(stats.failures.is_empty());

        let remaining: Vec<_> = fs::read_dir(cache.dir())
            .unwrap()
            .map(|e| e.unwrap().path())
            .collect();
        assert_eq!(remaining, vec![cache.entry_path("good").unwrap()]);
    }

    #[test]
    fn test_sweep_skips_subdirectories() {
        let temp_dir = TempDir::new().unwrap();
        let (cache, _) = open_cache(&temp_dir);

        fs::create_dir(cache.dir().join("nested")).unwrap();
        fs::write(cache.dir().join("nested").join("junk"), b"x").unwrap();

        let stats = cache.clean_expired();
        assert_eq!(stats.entries_scanned, 0);
        assert!(cache.dir().join("nested").join("junk").exists());
    }

    #[test]
    fn test_sweep_dry_run() {
        let temp_dir = TempDir::new().unwrap();
        let (cache, clock) = open_cache(&temp_dir);

        cache.save_with_expiration("k", b"data", 1).unwrap();
        clock.advance(2);

        // Dry run should report but not delete
        let stats = cache.sweep(true);
        assert_eq!(stats.entries_removed, 1);
        assert!(stats.bytes_freed > 0);
        assert!(cache.entry_path("k").unwrap().exists());

        // Actual sweep should delete
        let stats = cache.clean_expired();
        assert_eq!(stats.entries_removed, 1);
        assert!(!cache.entry_path("k").unwrap().exists());
    }

    #[test]
    fn test_sweep_stats_serialize() {
        let stats = SweepStats {
            entries_scanned: 2,
            entries_removed: 1,
            bytes_freed: 30,
            failures: vec![SweepFailure {
                path: PathBuf::from("/cache/x"),
                reason: "denied".to_string(),
            }],
        };

        let json = serde_json::to_value(&stats).unwrap();
        assert_eq!(json["entries_removed"], 1);
        assert_eq!(json["failures"][0]["reason"], "denied");
    }
}
