//! Cache store: keyed entry I/O with expiration-aware loads.

use crate::clock::{Clock, SystemClock};
use crate::config::CacheConfig;
use crate::error::{Error, Result};
use crate::header::{self, CacheHeader, HEADER_SIZE};
use serde::Serialize;
use std::fmt;
use std::fs;
use std::io::{self, Read, Write};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, info};

/// A filesystem-backed key-value cache.
///
/// Each key maps to one file in the cache directory holding a
/// [`CacheHeader`] followed by the payload.
pub struct Cache {
    config: CacheConfig,
    dir: PathBuf,
    clock: Arc<dyn Clock>,
}

/// Header-level view of a stored entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct EntryInfo {
    /// Location of the entry file.
    pub path: PathBuf,
    /// Decoded header.
    pub header: CacheHeader,
    /// Size of the entry file in bytes, header included.
    pub size_on_disk: u64,
    /// Whether the header is expired at the time of the call.
    pub expired: bool,
    /// Whether the file holds at least `data_length` payload bytes.
    pub complete: bool,
}

impl Cache {
    /// Open the cache described by `config`, creating its directory if needed.
    pub fn open(config: CacheConfig) -> Result<Self> {
        Self::with_clock(config, Arc::new(SystemClock))
    }

    /// Open the cache with a custom time source.
    pub fn with_clock(config: CacheConfig, clock: Arc<dyn Clock>) -> Result<Self> {
        let dir = config.cache_dir()?;
        fs::create_dir_all(&dir)?;

        debug!("Opened cache '{}' at {}", config.app_name(), dir.display());

        Ok(Self { config, dir, clock })
    }

    /// Get the configuration.
    pub fn config(&self) -> &CacheConfig {
        &self.config
    }

    /// Get the directory holding the entries.
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Current time according to this cache's clock.
    pub fn now(&self) -> u64 {
        self.clock.now()
    }

    /// Get the path of the entry file for `key`.
    pub fn entry_path(&self, key: &str) -> Result<PathBuf> {
        let name = self.config.filename_strategy().derive(key)?;
        Ok(self.dir.join(name))
    }

    /// Load the payload stored under `key`.
    ///
    /// Returns `Ok(None)` when there is no entry, when it has expired, or
    /// when it was written in another format version. Expired and
    /// foreign-version entries are deleted as part of the call, so a load
    /// can modify the cache directory.
    ///
    /// A truncated entry or an I/O failure is returned as [`Error::Load`].
    pub fn load(&self, key: &str) -> Result<Option<Vec<u8>>> {
        self.load_entry(key).map_err(|e| Error::load(key, e))
    }

    fn load_entry(&self, key: &str) -> Result<Option<Vec<u8>>> {
        let path = self.entry_path(key)?;

        let raw = match fs::read(&path) {
            Ok(raw) => raw,
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                debug!("Cache miss for '{}'", key);
                return Ok(None);
            }
            Err(e) => return Err(e.into()),
        };

        match header::decode(&raw) {
            Ok((header, payload)) => {
                if header.is_expired_at(self.clock.now()) {
                    debug!(
                        "Evicting expired entry '{}' (expired at {})",
                        key, header.expiration_at
                    );
                    remove_entry_file(&path)?;
                    return Ok(None);
                }
                Ok(Some(payload.to_vec()))
            }
            Err(Error::Version { found, expected }) => {
                debug!(
                    "Evicting entry '{}' with format version {} (current {})",
                    key, found, expected
                );
                remove_entry_file(&path)?;
                Ok(None)
            }
            Err(e) => Err(e),
        }
    }

    /// Store `payload` under `key` with the configured default expiration.
    pub fn save(&self, key: &str, payload: &[u8]) -> Result<()> {
        self.save_with_expiration(key, payload, self.config.default_expiration())
    }

    /// Store `payload` under `key`, expiring `expiration_secs` from now.
    ///
    /// An `expiration_secs` of 0 keeps the entry until it is removed.
    /// Any existing entry for the key is replaced. Payloads must be
    /// smaller than 4 GiB.
    pub fn save_with_expiration(
        &self,
        key: &str,
        payload: &[u8],
        expiration_secs: u64,
    ) -> Result<()> {
        self.save_entry(key, payload, expiration_secs)
            .map_err(|e| Error::save(key, e))
    }

    fn save_entry(&self, key: &str, payload: &[u8], expiration_secs: u64) -> Result<()> {
        let path = self.entry_path(key)?;

        // The directory may have been removed by clean_all.
        fs::create_dir_all(&self.dir)?;

        let raw = header::encode_at(payload, expiration_secs, self.clock.now());
        self.write_entry_atomic(&path, &raw)?;

        debug!(
            "Saved '{}' ({} bytes, expires in {}s)",
            key,
            payload.len(),
            expiration_secs
        );
        Ok(())
    }

    /// Write an entry atomically using tempfile.
    fn write_entry_atomic(&self, path: &Path, raw: &[u8]) -> Result<()> {
        let mut temp_file = tempfile::NamedTempFile::new_in(&self.dir)?;

        temp_file.write_all(raw)?;
        temp_file.flush()?;

        temp_file.persist(path)?;

        Ok(())
    }

    /// Delete the entry for `key`.
    ///
    /// Returns whether an entry was removed.
    pub fn remove(&self, key: &str) -> Result<bool> {
        let path = self.entry_path(key)?;
        let removed = remove_entry_file(&path)?;
        if removed {
            debug!("Removed '{}'", key);
        }
        Ok(removed)
    }

    /// Read the header of the entry for `key` without touching it.
    ///
    /// Unlike [`load`](Self::load), expired and foreign-version entries
    /// are left in place; a foreign version is reported as an error.
    pub fn stat(&self, key: &str) -> Result<Option<EntryInfo>> {
        self.stat_entry(key).map_err(|e| Error::load(key, e))
    }

    fn stat_entry(&self, key: &str) -> Result<Option<EntryInfo>> {
        let path = self.entry_path(key)?;

        let (header, size_on_disk) = match read_entry_header(&path) {
            Ok(found) => found,
            Err(e) if e.is_not_found() => return Ok(None),
            Err(e) => return Err(e),
        };

        Ok(Some(EntryInfo {
            expired: header.is_expired_at(self.clock.now()),
            complete: size_on_disk >= HEADER_SIZE as u64 + u64::from(header.data_length),
            path,
            header,
            size_on_disk,
        }))
    }

    /// Remove every entry and the cache directory itself.
    ///
    /// A missing directory is not an error; the next save recreates it.
    pub fn clean_all(&self) -> Result<()> {
        match fs::remove_dir_all(&self.dir) {
            Ok(()) => {
                info!("Removed cache directory {}", self.dir.display());
                Ok(())
            }
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }
}

impl fmt::Debug for Cache {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Cache")
            .field("config", &self.config)
            .field("dir", &self.dir)
            .finish_non_exhaustive()
    }
}

/// Read and validate the header of an entry file.
///
/// Returns the header and the file size.
pub(crate) fn read_entry_header(path: &Path) -> Result<(CacheHeader, u64)> {
    let file = fs::File::open(path)?;
    let size = file.metadata()?.len();

    let mut header_buf = Vec::with_capacity(HEADER_SIZE);
    file.take(HEADER_SIZE as u64).read_to_end(&mut header_buf)?;

    Ok((CacheHeader::decode(&header_buf)?, size))
}

/// Delete an entry file, treating an already missing file as not removed.
pub(crate) fn remove_entry_file(path: &Path) -> Result<bool> {
    match fs::remove_file(path) {
        Ok(()) => Ok(true),
        Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(false),
        Err(e) => Err(e.into()),
    }
}
