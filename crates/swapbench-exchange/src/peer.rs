//! Peer identities, address records and connections.

use std::fmt;
use std::str::FromStr;

use serde::Deserialize;
use serde::Deserializer;
use serde::Serialize;
use serde::Serializer;

use crate::error::ExchangeError;

const PEER_ID_LEN: usize = 32;

/// Random identity of a node, fixed for the lifetime of the process.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct PeerId([u8; PEER_ID_LEN]);

impl PeerId {
    /// Generate a fresh random identity.
    pub fn random() -> Self {
        Self(rand::random())
    }

    /// Identity from raw bytes.
    pub const fn from_bytes(bytes: [u8; PEER_ID_LEN]) -> Self {
        Self(bytes)
    }

    /// Abbreviated form for log lines.
    pub fn fmt_short(&self) -> String {
        hex::encode(&self.0[..5])
    }
}

impl fmt::Display for PeerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&hex::encode(self.0))
    }
}

impl fmt::Debug for PeerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "PeerId({})", self.fmt_short())
    }
}

impl FromStr for PeerId {
    type Err = ExchangeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let bytes = hex::decode(s).map_err(|e| ExchangeError::InvalidPeerId {
            input: s.to_string(),
            reason: e.to_string(),
        })?;
        let bytes: [u8; PEER_ID_LEN] = bytes.try_into().map_err(|b: Vec<u8>| ExchangeError::InvalidPeerId {
            input: s.to_string(),
            reason: format!("expected {} bytes, got {}", PEER_ID_LEN, b.len()),
        })?;
        Ok(Self(bytes))
    }
}

impl Serialize for PeerId {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for PeerId {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}

/// Everything needed to dial a node: its identity and reachable addresses.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AddressRecord {
    /// Identity the node presents when dialled.
    pub peer_id: PeerId,
    /// Addresses the node listens on, in preference order.
    pub addrs: Vec<String>,
}

impl fmt::Display for AddressRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.addrs.first() {
            Some(addr) => write!(f, "{}/p2p/{}", addr, self.peer_id),
            None => write!(f, "p2p/{}", self.peer_id),
        }
    }
}

/// An established connection to a peer, passed to fetches as context.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Connection {
    /// Remote identity, verified during the dial.
    pub peer_id: PeerId,
    /// Address the connection was made to.
    pub addr: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_peer_id_text_round_trip() {
        let id = PeerId::random();
        assert_eq!(id.to_string().parse::<PeerId>().unwrap(), id);
        assert!("abcd".parse::<PeerId>().is_err());
        assert!("zz".parse::<PeerId>().is_err());
    }

    #[test]
    fn test_record_display_names_first_addr() {
        let record = AddressRecord {
            peer_id: PeerId::from_bytes([0xab; 32]),
            addrs: vec!["10.0.0.1:3333".into(), "192.168.1.1:3333".into()],
        };
        let text = record.to_string();
        assert!(text.starts_with("10.0.0.1:3333/p2p/abab"));
    }

    #[test]
    fn test_record_json_shape() {
        let record = AddressRecord {
            peer_id: PeerId::from_bytes([1; 32]),
            addrs: vec!["mem/x".into()],
        };
        let json = serde_json::to_value(&record).unwrap();
        assert_eq!(json["addrs"][0], "mem/x");
        assert_eq!(json["peer_id"], "01".repeat(32));
        let back: AddressRecord = serde_json::from_value(json).unwrap();
        assert_eq!(back, record);
    }
}
