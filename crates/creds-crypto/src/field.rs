//! Field element encodings.
//!
//! Two byte orders meet here: arkworks serializes `Fr` little-endian, while
//! the EVM ABI and hex strings shown to users are big-endian `uint256`.

use ark_bn254::Fr;
use ark_ff::{BigInteger, PrimeField};
use creds_types::{CredsError, CredsResult, FIELD_ELEMENT_SIZE};
use sha3::{Digest, Keccak256};

/// Little-endian canonical encoding.
pub fn fr_to_le_bytes(f: &Fr) -> [u8; FIELD_ELEMENT_SIZE] {
    let mut out = [0u8; FIELD_ELEMENT_SIZE];
    out.copy_from_slice(&f.into_bigint().to_bytes_le());
    out
}

pub fn fr_from_le_bytes_mod_order(bytes: &[u8; FIELD_ELEMENT_SIZE]) -> Fr {
    Fr::from_le_bytes_mod_order(bytes)
}

/// Big-endian `uint256` word.
pub fn fr_to_be_bytes(f: &Fr) -> [u8; FIELD_ELEMENT_SIZE] {
    let mut out = [0u8; FIELD_ELEMENT_SIZE];
    out.copy_from_slice(&f.into_bigint().to_bytes_be());
    out
}

/// Strict decoding of a big-endian word. Values at or above the modulus are rejected.
pub fn fr_from_be_bytes(bytes: &[u8; FIELD_ELEMENT_SIZE]) -> Option<Fr> {
    let mut limbs = [0u64; 4];
    for (i, chunk) in bytes.chunks_exact(8).enumerate() {
        let mut limb = [0u8; 8];
        limb.copy_from_slice(chunk);
        limbs[3 - i] = u64::from_be_bytes(limb);
    }
    Fr::from_bigint(ark_ff::BigInt::new(limbs))
}

pub fn fr_to_hex(f: &Fr) -> String {
    format!("0x{}", hex::encode(fr_to_be_bytes(f)))
}

pub fn fr_from_hex(s: &str) -> CredsResult<Fr> {
    let s = s.trim();
    let s = s.strip_prefix("0x").unwrap_or(s);
    if s.is_empty() || s.len() > 2 * FIELD_ELEMENT_SIZE {
        return Err(CredsError::Serialization(format!(
            "Invalid field element length: {}",
            s.len()
        )));
    }
    let padded = format!("{:0>64}", s);
    let bytes = hex::decode(padded).map_err(|e| CredsError::Serialization(e.to_string()))?;
    let mut word = [0u8; FIELD_ELEMENT_SIZE];
    word.copy_from_slice(&bytes);
    fr_from_be_bytes(&word)
        .ok_or_else(|| CredsError::Serialization("Value is not less than the field modulus".into()))
}

/// Short hex prefix for log lines.
pub fn fr_short_hex(f: &Fr) -> String {
    let full = fr_to_hex(f);
    format!("{}..", &full[..12])
}

/// `uint256(keccak256(data)) >> 8`, the contract-side mapping of signals to field elements.
pub fn hash_to_field(data: &[u8]) -> Fr {
    let digest = Keccak256::digest(data);
    let mut shifted = [0u8; FIELD_ELEMENT_SIZE];
    shifted[1..].copy_from_slice(&digest[..FIELD_ELEMENT_SIZE - 1]);
    Fr::from_be_bytes_mod_order(&shifted)
}

/// Right-padded UTF-8 `bytes32`, NUL terminated.
pub fn format_bytes32(text: &str) -> CredsResult<[u8; 32]> {
    let bytes = text.as_bytes();
    if bytes.len() > 31 {
        return Err(CredsError::Serialization(format!(
            "bytes32 string must be at most 31 bytes, got {}",
            bytes.len()
        )));
    }
    let mut out = [0u8; 32];
    out[..bytes.len()].copy_from_slice(bytes);
    Ok(out)
}

pub fn parse_bytes32(word: &[u8; 32]) -> String {
    let end = word.iter().position(|b| *b == 0).unwrap_or(word.len());
    String::from_utf8_lossy(&word[..end]).into_owned()
}

/// Serde adapter writing `Fr` as a big-endian hex string.
pub mod fr_hex {
    use super::*;
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(f: &Fr, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&fr_to_hex(f))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Fr, D::Error> {
        let s = String::deserialize(deserializer)?;
        fr_from_hex(&s).map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_be_and_le_agree() {
        let f = Fr::from(0x0102_0304u64);
        let be = fr_to_be_bytes(&f);
        let le = fr_to_le_bytes(&f);
        assert_eq!(be[31], 0x04);
        assert_eq!(le[0], 0x04);
        assert_eq!(fr_from_be_bytes(&be), Some(f));
        assert_eq!(fr_from_le_bytes_mod_order(&le), f);
    }

    #[test]
    fn test_modulus_rejected() {
        assert!(fr_from_be_bytes(&[0xff; 32]).is_none());
        assert!(fr_from_hex(&format!("0x{}", "ff".repeat(32))).is_err());
    }

    #[test]
    fn test_hex_parsing() {
        assert_eq!(fr_from_hex("0x2a").unwrap(), Fr::from(42u64));
        assert_eq!(fr_from_hex("2a").unwrap(), Fr::from(42u64));
        assert_eq!(fr_from_hex(&fr_to_hex(&Fr::from(7u64))).unwrap(), Fr::from(7u64));
        assert!(fr_from_hex("").is_err());
        assert!(fr_from_hex("0xzz").is_err());
    }

    #[test]
    fn test_hash_to_field_drops_low_byte() {
        let digest = Keccak256::digest(b"signal");
        let f = hash_to_field(b"signal");
        let be = fr_to_be_bytes(&f);
        assert_eq!(be[0], 0);
        assert_eq!(&be[1..], &digest[..31]);
    }

    #[test]
    fn test_bytes32_strings() {
        let word = format_bytes32("Hello World").unwrap();
        assert_eq!(&word[..11], b"Hello World");
        assert!(word[11..].iter().all(|b| *b == 0));
        assert_eq!(parse_bytes32(&word), "Hello World");
        assert!(format_bytes32(&"x".repeat(32)).is_err());
    }
}
