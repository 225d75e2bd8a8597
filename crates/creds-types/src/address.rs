use crate::error::{CredsError, CredsResult};
use crate::ETH_ADDRESS_SIZE;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use sha3::{Digest, Keccak256};
use std::fmt;
use std::str::FromStr;

#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct EthAddress(pub [u8; ETH_ADDRESS_SIZE]);

impl EthAddress {
    pub fn from_bytes(bytes: [u8; ETH_ADDRESS_SIZE]) -> Self {
        Self(bytes)
    }

    pub fn as_bytes(&self) -> &[u8; ETH_ADDRESS_SIZE] {
        &self.0
    }

    /// EIP-55 mixed-case encoding.
    pub fn to_checksum(&self) -> String {
        let hex_addr = hex::encode(self.0);
        let hash = Keccak256::digest(hex_addr.as_bytes());
        let hash_hex = hex::encode(hash);

        let mut checksummed = String::with_capacity(42);
        checksummed.push_str("0x");

        for (c, h) in hex_addr.chars().zip(hash_hex.chars()) {
            if c.is_ascii_alphabetic() && h >= '8' {
                checksummed.push(c.to_ascii_uppercase());
            } else {
                checksummed.push(c);
            }
        }
        checksummed
    }

    pub fn to_hex(&self) -> String {
        format!("0x{}", hex::encode(self.0))
    }

    pub fn from_hex(s: &str) -> CredsResult<Self> {
        let s = s.trim();
        let s = s.strip_prefix("0x").unwrap_or(s);
        let bytes = hex::decode(s).map_err(|e| CredsError::InvalidAddress(e.to_string()))?;
        if bytes.len() != ETH_ADDRESS_SIZE {
            return Err(CredsError::InvalidAddress(format!(
                "Invalid address length: {}",
                bytes.len()
            )));
        }
        let mut arr = [0u8; ETH_ADDRESS_SIZE];
        arr.copy_from_slice(&bytes);
        Ok(Self(arr))
    }

    pub fn zero() -> Self {
        Self([0u8; ETH_ADDRESS_SIZE])
    }

    pub fn is_zero(&self) -> bool {
        self.0 == [0u8; ETH_ADDRESS_SIZE]
    }
}

impl FromStr for EthAddress {
    type Err = CredsError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::from_hex(s)
    }
}

impl fmt::Debug for EthAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "EthAddress({})", self.to_checksum())
    }
}

impl fmt::Display for EthAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_checksum())
    }
}

impl Default for EthAddress {
    fn default() -> Self {
        Self::zero()
    }
}

impl Serialize for EthAddress {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_checksum())
    }
}

impl<'de> Deserialize<'de> for EthAddress {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        Self::from_hex(&s).map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_checksum_known_vector() {
        let addr = EthAddress::from_hex("0x5aaeb6053f3e94c9b9a09f33669435e7ef1beaed").unwrap();
        assert_eq!(addr.to_checksum(), "0x5aAeb6053F3E94C9b9A09f33669435E7Ef1BeAed");
    }

    #[test]
    fn test_invalid_length() {
        assert!(EthAddress::from_hex("0x1234").is_err());
        assert!(EthAddress::from_hex("not hex at all").is_err());
    }

    #[test]
    fn test_serde_as_string() {
        let addr = EthAddress::from_bytes([0x11; ETH_ADDRESS_SIZE]);
        let json = serde_json::to_string(&addr).unwrap();
        assert!(json.starts_with("\"0x"));
        let back: EthAddress = serde_json::from_str(&json).unwrap();
        assert_eq!(addr, back);
    }

    #[test]
    fn test_zero() {
        assert!(EthAddress::zero().is_zero());
        assert!(EthAddress::default().is_zero());
    }
}
