//! Binary entry format and encoding.
//!
//! Every stored entry is a 21-byte header followed by the payload. All
//! integers are big-endian:
//!
//! ```text
//! 0x00  1   version (u8) = 1
//! 0x01  8   created_at (u64 BE, Unix seconds)
//! 0x09  8   expiration_at (u64 BE, Unix seconds, 0 = never)
//! 0x11  4   data_length (u32 BE)
//! 0x15  ... payload
//! ```

use crate::clock::{Clock, SystemClock};
use crate::error::{Error, Result};
use serde::Serialize;

/// Current entry format version.
pub const VERSION: u8 = 1;

/// Size of the entry header in bytes.
pub const HEADER_SIZE: usize = 21;

/// A 21-byte entry header.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct CacheHeader {
    /// Entry format version.
    pub version: u8,
    /// Unix timestamp when the entry was written.
    pub created_at: u64,
    /// Unix timestamp after which the entry is invalid, or 0 for never.
    pub expiration_at: u64,
    /// Length of the payload in bytes.
    pub data_length: u32,
}

impl CacheHeader {
    /// Create a header for a payload written at `created_at`.
    ///
    /// An `expiration_secs` of 0 means the entry never expires.
    pub fn new(created_at: u64, expiration_secs: u64, data_length: u32) -> Self {
        let expiration_at = if expiration_secs == 0 {
            0
        } else {
            created_at.saturating_add(expiration_secs)
        };

        Self {
            version: VERSION,
            created_at,
            expiration_at,
            data_length,
        }
    }

    /// Encode the header to a 21-byte array.
    pub fn encode(&self) -> [u8; HEADER_SIZE] {
        let mut buf = [0u8; HEADER_SIZE];
        buf[0] = self.version;
        buf[1..9].copy_from_slice(&self.created_at.to_be_bytes());
        buf[9..17].copy_from_slice(&self.expiration_at.to_be_bytes());
        buf[17..21].copy_from_slice(&self.data_length.to_be_bytes());
        buf
    }

    /// Decode a header from the start of `buf`.
    ///
    /// Checks the length and the version; the payload is not inspected.
    pub fn decode(buf: &[u8]) -> Result<Self> {
        if buf.len() < HEADER_SIZE {
            return Err(Error::header(buf.len(), HEADER_SIZE));
        }

        let version = buf[0];
        if version != VERSION {
            return Err(Error::version(version, VERSION));
        }

        let mut created = [0u8; 8];
        created.copy_from_slice(&buf[1..9]);
        let mut expiration = [0u8; 8];
        expiration.copy_from_slice(&buf[9..17]);
        let mut length = [0u8; 4];
        length.copy_from_slice(&buf[17..21]);

        Ok(Self {
            version,
            created_at: u64::from_be_bytes(created),
            expiration_at: u64::from_be_bytes(expiration),
            data_length: u32::from_be_bytes(length),
        })
    }

    /// Whether the entry never expires.
    pub fn is_permanent(&self) -> bool {
        self.expiration_at == 0
    }

    /// Whether the entry is expired at time `now`.
    ///
    /// An entry is still valid during its expiration second.
    pub fn is_expired_at(&self, now: u64) -> bool {
        !self.is_permanent() && now > self.expiration_at
    }

    /// Whether the entry is expired according to the system clock.
    pub fn is_expired(&self) -> bool {
        self.is_expired_at(SystemClock.now())
    }
}

/// Prefix `payload` with a header stamped at `now`.
///
/// Payloads of 4 GiB or more do not fit the length field and are not supported.
pub fn encode_at(payload: &[u8], expiration_secs: u64, now: u64) -> Vec<u8> {
    let header = CacheHeader::new(now, expiration_secs, payload.len() as u32);
    let mut buf = Vec::with_capacity(HEADER_SIZE + payload.len());
    buf.extend_from_slice(&header.encode());
    buf.extend_from_slice(payload);
    buf
}

/// Prefix `payload` with a header stamped with the current system time.
pub fn encode(payload: &[u8], expiration_secs: u64) -> Vec<u8> {
    encode_at(payload, expiration_secs, SystemClock.now())
}

/// Split a raw entry into its header and payload.
///
/// The returned payload borrows exactly `data_length` bytes from `raw`;
/// anything past that is ignored.
pub fn decode(raw: &[u8]) -> Result<(CacheHeader, &[u8])> {
    let header = CacheHeader::decode(raw)?;

    let body = &raw[HEADER_SIZE..];
    let len = header.data_length as usize;
    if body.len() < len {
        return Err(Error::size(header.data_length, body.len()));
    }

    Ok((header, &body[..len]))
}
