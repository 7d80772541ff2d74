//! Versioned nonces
//!
//! Wire format (32 bytes, multi-byte fields big-endian):
//!
//! ```text
//! | magic (4) | version (1) | salt (4) | deadline ns (8) | random (15) |
//! ```
//!
//! The salt ties the nonce to the settlement contract's current salt so that a
//! contract-side salt rotation invalidates all outstanding nonces; the deadline lets
//! the contract reject (and forget) expired nonces. Base64 is only the string
//! encoding used in JSON payloads.

use std::fmt;

use base64::{engine::general_purpose::STANDARD, Engine as _};
use chrono::{DateTime, TimeZone, Utc};
use rand::RngCore;
use serde::{de, Deserialize, Deserializer, Serialize, Serializer};
use thiserror::Error;

use crate::intent::salt::Salt;

/// Magic prefix identifying a versioned nonce.
pub const VERSIONED_MAGIC_PREFIX: [u8; 4] = [0x56, 0x28, 0xF6, 0xC6];

/// Current nonce layout version.
pub const NONCE_VERSION: u8 = 0;

pub const NONCE_LEN: usize = 32;
const INNER_NONCE_LEN: usize = 15;

const VERSION_OFFSET: usize = 4;
const SALT_OFFSET: usize = 5;
const DEADLINE_OFFSET: usize = 9;
const INNER_OFFSET: usize = 17;

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum NonceError {
    #[error("invalid nonce length: expected {NONCE_LEN} bytes, got {0}")]
    InvalidLength(usize),
    #[error("bad nonce prefix: {0}")]
    BadPrefix(String),
    #[error("unsupported nonce version {0}")]
    UnsupportedVersion(u8),
    #[error("nonce deadline out of range")]
    DeadlineOutOfRange,
    #[error("invalid nonce encoding: {0}")]
    InvalidEncoding(String),
}

/// Opaque 32-byte nonce as carried by an intent payload.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct Nonce(pub [u8; NONCE_LEN]);

impl Nonce {
    pub fn as_bytes(&self) -> &[u8; NONCE_LEN] {
        &self.0
    }

    pub fn to_base64(&self) -> String {
        STANDARD.encode(self.0)
    }

    pub fn from_base64(encoded: &str) -> Result<Self, NonceError> {
        let bytes = STANDARD
            .decode(encoded)
            .map_err(|e| NonceError::InvalidEncoding(e.to_string()))?;
        let len = bytes.len();
        let array: [u8; NONCE_LEN] = bytes.try_into().map_err(|_| NonceError::InvalidLength(len))?;
        Ok(Nonce(array))
    }
}

impl fmt::Debug for Nonce {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Nonce({})", self.to_base64())
    }
}

impl Serialize for Nonce {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_base64())
    }
}

impl<'de> Deserialize<'de> for Nonce {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        Nonce::from_base64(&s).map_err(de::Error::custom)
    }
}

/// Decoded view of a versioned nonce.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VersionedNonce {
    pub version: u8,
    pub salt: Salt,
    pub deadline: DateTime<Utc>,
    pub inner_nonce: [u8; INNER_NONCE_LEN],
}

impl VersionedNonce {
    /// A nonce is expired from its deadline onwards.
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        now >= self.deadline
    }
}

/// Encodes a fresh versioned nonce with 15 bytes of OS randomness.
pub fn encode_nonce(salt: Salt, deadline: DateTime<Utc>) -> Result<Nonce, NonceError> {
    let mut inner = [0u8; INNER_NONCE_LEN];
    rand::rngs::OsRng.fill_bytes(&mut inner);
    encode_nonce_with_inner(salt, deadline, inner)
}

/// Deterministic variant of [`encode_nonce`].
pub fn encode_nonce_with_inner(
    salt: Salt,
    deadline: DateTime<Utc>,
    inner: [u8; INNER_NONCE_LEN],
) -> Result<Nonce, NonceError> {
    let deadline_ns = deadline
        .timestamp_nanos_opt()
        .and_then(|ns| u64::try_from(ns).ok())
        .ok_or(NonceError::DeadlineOutOfRange)?;

    let mut bytes = [0u8; NONCE_LEN];
    bytes[..VERSION_OFFSET].copy_from_slice(&VERSIONED_MAGIC_PREFIX);
    bytes[VERSION_OFFSET] = NONCE_VERSION;
    bytes[SALT_OFFSET..DEADLINE_OFFSET].copy_from_slice(salt.as_bytes());
    bytes[DEADLINE_OFFSET..INNER_OFFSET].copy_from_slice(&deadline_ns.to_be_bytes());
    bytes[INNER_OFFSET..].copy_from_slice(&inner);
    Ok(Nonce(bytes))
}

/// Decodes a versioned nonce, rejecting foreign prefixes and unknown versions.
pub fn decode_nonce(bytes: &[u8]) -> Result<VersionedNonce, NonceError> {
    if bytes.len() != NONCE_LEN {
        return Err(NonceError::InvalidLength(bytes.len()));
    }
    if bytes[..VERSION_OFFSET] != VERSIONED_MAGIC_PREFIX {
        return Err(NonceError::BadPrefix(hex::encode(&bytes[..VERSION_OFFSET])));
    }
    let version = bytes[VERSION_OFFSET];
    if version != NONCE_VERSION {
        return Err(NonceError::UnsupportedVersion(version));
    }

    let mut salt = [0u8; 4];
    salt.copy_from_slice(&bytes[SALT_OFFSET..DEADLINE_OFFSET]);

    let mut deadline_be = [0u8; 8];
    deadline_be.copy_from_slice(&bytes[DEADLINE_OFFSET..INNER_OFFSET]);
    let deadline_ns =
        i64::try_from(u64::from_be_bytes(deadline_be)).map_err(|_| NonceError::DeadlineOutOfRange)?;

    let mut inner_nonce = [0u8; INNER_NONCE_LEN];
    inner_nonce.copy_from_slice(&bytes[INNER_OFFSET..]);

    Ok(VersionedNonce {
        version,
        salt: Salt::new(salt),
        deadline: Utc.timestamp_nanos(deadline_ns),
        inner_nonce,
    })
}
