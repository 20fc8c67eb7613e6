//! WAL record type and frame codec.
//!
//! A record travels on disk as a *frame*: a 4-byte little-endian length
//! followed by that many bytes of a JSON document with the keys `seq`,
//! `data`, `crc` and `check`. The byte payload is base64-encoded inside
//! the document. This layout is shared with prior writers of the format,
//! so it must be preserved bit-for-bit.

use crate::error::{WalError, WalResult};
use serde::{Deserialize, Serialize};

/// Size of the frame length prefix.
pub const LEN_PREFIX_SIZE: usize = 4;

/// A single WAL record.
///
/// The checksum covers `data` followed by the low byte of `seq`. Only the
/// low byte participates; this is part of the on-disk contract.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Record {
    /// Sequence number assigned at write time, starting at 1.
    pub seq: i32,
    /// Opaque payload bytes.
    #[serde(with = "base64_bytes")]
    pub data: Vec<u8>,
    /// IEEE CRC-32 over `data || byte(seq)`, reinterpreted as signed.
    pub crc: i32,
    /// Marks a checkpoint barrier record.
    #[serde(rename = "check")]
    pub checkpoint: bool,
}

impl Record {
    /// Creates a record with a freshly computed checksum.
    #[must_use]
    pub fn new(seq: i32, data: Vec<u8>) -> Self {
        let crc = checksum(&data, seq) as i32;
        Self {
            seq,
            data,
            crc,
            checkpoint: false,
        }
    }

    /// Creates a checkpoint barrier record (empty payload, flag set).
    #[must_use]
    pub fn checkpoint_marker(seq: i32) -> Self {
        let crc = checksum(&[], seq) as i32;
        Self {
            seq,
            data: Vec::new(),
            crc,
            checkpoint: true,
        }
    }

    /// Recomputes the checksum and compares it to the stored one.
    #[must_use]
    pub fn is_valid(&self) -> bool {
        self.crc as u32 == checksum(&self.data, self.seq)
    }

    /// Encodes this record as one frame: length prefix plus document.
    ///
    /// # Errors
    ///
    /// Returns an error if the encoded document exceeds the 4-byte length
    /// field, or if serialization fails.
    pub fn encode_frame(&self) -> WalResult<Vec<u8>> {
        let body = serde_json::to_vec(self)?;
        let len = u32::try_from(body.len())
            .map_err(|_| WalError::invalid_argument("record payload too large for frame"))?;

        let mut frame = Vec::with_capacity(LEN_PREFIX_SIZE + body.len());
        frame.extend_from_slice(&len.to_le_bytes());
        frame.extend_from_slice(&body);
        Ok(frame)
    }

    /// Decodes a record from a frame body.
    ///
    /// The checksum is *not* validated here; use [`Record::is_valid`].
    pub fn decode(body: &[u8]) -> WalResult<Self> {
        Ok(serde_json::from_slice(body)?)
    }
}

/// Computes the IEEE CRC-32 of `data` followed by the low byte of `seq`.
#[must_use]
pub fn checksum(data: &[u8], seq: i32) -> u32 {
    let mut hasher = crc32fast::Hasher::new();
    hasher.update(data);
    hasher.update(&[seq as u8]);
    hasher.finalize()
}

mod base64_bytes {
    use base64::engine::general_purpose::STANDARD;
    use base64::Engine;
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S>(bytes: &[u8], serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(&STANDARD.encode(bytes))
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Vec<u8>, D::Error>
    where
        D: Deserializer<'de>,
    {
        // A nil payload serializes as `null` in the legacy format.
        match Option::<String>::deserialize(deserializer)? {
            None => Ok(Vec::new()),
            Some(encoded) => STANDARD.decode(encoded).map_err(serde::de::Error::custom),
        }
    }
}
