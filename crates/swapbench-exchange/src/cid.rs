//! Self-describing content identifiers.
//!
//! A [`ContentId`] is the BLAKE3 digest of a block wrapped in a CIDv1 layout:
//!
//! ```text
//! [version = 0x01][codec = 0x55 raw][multihash code = 0x1e blake3][length = 0x20][32-byte digest]
//! ```
//!
//! rendered in multibase base16 (a leading `f` followed by lowercase hex).
//! Every header field fits in a single varint byte, so the binary form is
//! always 36 bytes.

use std::fmt;
use std::str::FromStr;

use serde::Deserialize;
use serde::Deserializer;
use serde::Serialize;
use serde::Serializer;

use crate::error::ExchangeError;
use crate::error::InvalidContentIdSnafu;

const CID_VERSION: u8 = 0x01;
const RAW_CODEC: u8 = 0x55;
const BLAKE3_CODE: u8 = 0x1e;
const DIGEST_LEN: usize = 32;
const HEADER: [u8; 4] = [CID_VERSION, RAW_CODEC, BLAKE3_CODE, DIGEST_LEN as u8];
const ENCODED_LEN: usize = HEADER.len() + DIGEST_LEN;
const MULTIBASE_BASE16: char = 'f';

/// Content identifier of a block.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ContentId {
    digest: [u8; DIGEST_LEN],
}

impl ContentId {
    /// Compute the identifier of `data`.
    pub fn for_bytes(data: &[u8]) -> Self {
        Self {
            digest: *blake3::hash(data).as_bytes(),
        }
    }

    /// Raw BLAKE3 digest.
    pub fn digest(&self) -> &[u8; DIGEST_LEN] {
        &self.digest
    }

    /// Binary CIDv1 form.
    pub fn to_bytes(&self) -> [u8; ENCODED_LEN] {
        let mut out = [0u8; ENCODED_LEN];
        out[..HEADER.len()].copy_from_slice(&HEADER);
        out[HEADER.len()..].copy_from_slice(&self.digest);
        out
    }

    /// Parse the binary CIDv1 form.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, ExchangeError> {
        if bytes.len() != ENCODED_LEN {
            return InvalidContentIdSnafu {
                input: hex::encode(bytes),
                reason: format!("expected {} bytes, got {}", ENCODED_LEN, bytes.len()),
            }
            .fail();
        }

        let (header, digest) = bytes.split_at(HEADER.len());
        if header != HEADER {
            return InvalidContentIdSnafu {
                input: hex::encode(bytes),
                reason: format!("unsupported header {}", hex::encode(header)),
            }
            .fail();
        }

        let mut out = [0u8; DIGEST_LEN];
        out.copy_from_slice(digest);
        Ok(Self { digest: out })
    }

    /// Abbreviated form for log lines.
    pub fn short(&self) -> String {
        hex::encode(&self.digest[..6])
    }
}

impl fmt::Display for ContentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", MULTIBASE_BASE16, hex::encode(self.to_bytes()))
    }
}

impl fmt::Debug for ContentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ContentId({})", self)
    }
}

impl FromStr for ContentId {
    type Err = ExchangeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let Some(body) = s.strip_prefix(MULTIBASE_BASE16) else {
            return InvalidContentIdSnafu {
                input: s,
                reason: "missing base16 multibase prefix 'f'",
            }
            .fail();
        };

        let bytes = hex::decode(body).map_err(|e| ExchangeError::InvalidContentId {
            input: s.to_string(),
            reason: e.to_string(),
        })?;
        Self::from_bytes(&bytes)
    }
}

impl Serialize for ContentId {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for ContentId {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}
