//! Block hash type and hashing helpers.

use std::{fmt, str::FromStr};

use serde::{de, Deserialize, Deserializer, Serialize, Serializer};
use sha2::{Digest, Sha256};

use crate::errors::ParseError;

/// Hash identifying a block on the chain source, 32 opaque bytes.
#[derive(Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Hash, Default)]
pub struct BlockHash([u8; 32]);

impl BlockHash {
    pub const LEN: usize = 32;

    pub const fn new(bytes: [u8; 32]) -> Self {
        Self(bytes)
    }

    pub const fn zero() -> Self {
        Self([0; 32])
    }

    pub fn is_zero(&self) -> bool {
        self.0 == [0; 32]
    }

    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }

    pub fn to_hex(&self) -> String {
        hex::encode(self.0)
    }
}

impl From<[u8; 32]> for BlockHash {
    fn from(value: [u8; 32]) -> Self {
        Self(value)
    }
}

impl From<BlockHash> for [u8; 32] {
    fn from(value: BlockHash) -> Self {
        value.0
    }
}

impl AsRef<[u8]> for BlockHash {
    fn as_ref(&self) -> &[u8] {
        &self.0
    }
}

impl FromStr for BlockHash {
    type Err = ParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.strip_prefix("0x").unwrap_or(s);
        let raw = hex::decode(s).map_err(|e| ParseError::InvalidHex(e.to_string()))?;
        let bytes: [u8; 32] = raw
            .as_slice()
            .try_into()
            .map_err(|_| ParseError::InvalidLength {
                expected: Self::LEN,
                actual: raw.len(),
            })?;
        Ok(Self(bytes))
    }
}

impl fmt::Display for BlockHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        // Show first 2 and last 2 bytes, enough to tell hashes apart in logs.
        write!(
            f,
            "{}..{}",
            hex::encode(&self.0[..2]),
            hex::encode(&self.0[30..])
        )
    }
}

impl fmt::Debug for BlockHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "BlockHash({})", self.to_hex())
    }
}

impl Serialize for BlockHash {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_hex())
    }
}

impl<'de> Deserialize<'de> for BlockHash {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(de::Error::custom)
    }
}

/// Computes a single SHA-256 digest.
pub fn sha256(buf: &[u8]) -> [u8; 32] {
    Sha256::digest(buf).into()
}

/// Computes the double SHA-256 digest chain daemons use for block hashes.
pub fn sha256d(buf: &[u8]) -> BlockHash {
    BlockHash(sha256(&sha256(buf)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hex_roundtrip_through_from_str() {
        let mut bytes = [0u8; 32];
        bytes[0] = 0xab;
        bytes[31] = 0x01;
        let hash = BlockHash::new(bytes);

        let parsed: BlockHash = hash.to_hex().parse().unwrap();
        assert_eq!(parsed, hash);

        let prefixed: BlockHash = format!("0x{}", hash.to_hex()).parse().unwrap();
        assert_eq!(prefixed, hash);
    }

    #[test]
    fn test_from_str_rejects_wrong_length() {
        let err = "abcd".parse::<BlockHash>().unwrap_err();
        assert!(matches!(
            err,
            ParseError::InvalidLength {
                expected: 32,
                actual: 2
            }
        ));
    }

    #[test]
    fn test_from_str_rejects_bad_hex() {
        let err = "zz".parse::<BlockHash>().unwrap_err();
        assert!(matches!(err, ParseError::InvalidHex(_)));
    }

    #[test]
    fn test_display_is_abbreviated() {
        let mut bytes = [0u8; 32];
        bytes[0] = 0x12;
        bytes[1] = 0x34;
        bytes[30] = 0x56;
        bytes[31] = 0x78;
        assert_eq!(BlockHash::new(bytes).to_string(), "1234..5678");
    }

    #[test]
    fn test_serde_uses_hex_string() {
        let hash = sha256d(b"block");
        let json = serde_json::to_string(&hash).unwrap();
        assert_eq!(json, format!("\"{}\"", hash.to_hex()));
        let back: BlockHash = serde_json::from_str(&json).unwrap();
        assert_eq!(back, hash);
    }

    #[test]
    fn test_sha256d_is_not_single_sha256() {
        let single = BlockHash::new(sha256(b"block"));
        assert_ne!(sha256d(b"block"), single);
        assert!(!sha256d(b"block").is_zero());
    }
}
