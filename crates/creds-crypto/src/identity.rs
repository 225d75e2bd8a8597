use ark_bn254::Fr;
use ark_ff::PrimeField;
use ark_std::{rand::thread_rng, UniformRand};
use creds_types::{CredsError, CredsResult, FIELD_ELEMENT_SIZE};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::fmt;
use subtle::ConstantTimeEq;
use zeroize::{Zeroize, ZeroizeOnDrop};

use crate::field::{fr_from_le_bytes_mod_order, fr_to_le_bytes};
use crate::poseidon::{poseidon_hash1, poseidon_hash2};

const TRAPDOOR_TAG: &[u8] = b"identity_trapdoor";
const NULLIFIER_TAG: &[u8] = b"identity_nullifier";

/// A member's secret pair. Only the commitment ever leaves the holder.
///
/// `secret = H(nullifier, trapdoor)`, `commitment = H(secret)`.
#[derive(Clone, Zeroize, ZeroizeOnDrop)]
pub struct Identity {
    trapdoor: [u8; FIELD_ELEMENT_SIZE],
    nullifier: [u8; FIELD_ELEMENT_SIZE],
}

#[derive(Serialize, Deserialize, Zeroize, ZeroizeOnDrop)]
struct IdentityExport {
    trapdoor: String,
    nullifier: String,
}

impl Identity {
    /// Fresh identity from the thread RNG.
    pub fn new() -> Self {
        let mut rng = thread_rng();
        Self::from_parts(Fr::rand(&mut rng), Fr::rand(&mut rng))
    }

    /// Deterministic identity for a caller-held secret, so the same secret
    /// always restores the same commitment.
    pub fn from_secret(secret: &[u8]) -> Self {
        let seed = Sha256::digest(secret);
        let trapdoor = derive_component(&seed, TRAPDOOR_TAG);
        let nullifier = derive_component(&seed, NULLIFIER_TAG);
        Self::from_parts(trapdoor, nullifier)
    }

    pub fn from_parts(trapdoor: Fr, nullifier: Fr) -> Self {
        Self {
            trapdoor: fr_to_le_bytes(&trapdoor),
            nullifier: fr_to_le_bytes(&nullifier),
        }
    }

    pub fn trapdoor(&self) -> Fr {
        fr_from_le_bytes_mod_order(&self.trapdoor)
    }

    pub fn nullifier(&self) -> Fr {
        fr_from_le_bytes_mod_order(&self.nullifier)
    }

    pub fn secret(&self) -> Fr {
        poseidon_hash2(self.nullifier(), self.trapdoor())
    }

    pub fn commitment(&self) -> Fr {
        poseidon_hash1(self.secret())
    }

    /// Identical for every proof this identity makes under one external nullifier.
    pub fn nullifier_hash(&self, external_nullifier: Fr) -> Fr {
        poseidon_hash2(external_nullifier, self.nullifier())
    }

    pub fn to_json(&self) -> CredsResult<String> {
        let export = IdentityExport {
            trapdoor: hex::encode(self.trapdoor),
            nullifier: hex::encode(self.nullifier),
        };
        serde_json::to_string(&export).map_err(|e| CredsError::Serialization(e.to_string()))
    }

    pub fn from_json(json: &str) -> CredsResult<Self> {
        let export: IdentityExport =
            serde_json::from_str(json).map_err(|e| CredsError::Serialization(e.to_string()))?;
        Ok(Self {
            trapdoor: decode_component(&export.trapdoor)?,
            nullifier: decode_component(&export.nullifier)?,
        })
    }
}

impl Default for Identity {
    fn default() -> Self {
        Self::new()
    }
}

impl PartialEq for Identity {
    fn eq(&self, other: &Self) -> bool {
        let t = self.trapdoor.ct_eq(&other.trapdoor);
        let n = self.nullifier.ct_eq(&other.nullifier);
        (t & n).into()
    }
}

impl Eq for Identity {}

impl fmt::Debug for Identity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Identity(commitment: {})",
            crate::field::fr_short_hex(&self.commitment())
        )
    }
}

fn derive_component(seed: &[u8], tag: &[u8]) -> Fr {
    let mut hasher = Sha256::new();
    hasher.update(seed);
    hasher.update(tag);
    Fr::from_be_bytes_mod_order(&hasher.finalize())
}

fn decode_component(s: &str) -> CredsResult<[u8; FIELD_ELEMENT_SIZE]> {
    let bytes = hex::decode(s).map_err(|e| CredsError::Serialization(e.to_string()))?;
    if bytes.len() != FIELD_ELEMENT_SIZE {
        return Err(CredsError::Serialization("Invalid identity component length".into()));
    }
    let mut out = [0u8; FIELD_ELEMENT_SIZE];
    out.copy_from_slice(&bytes);
    // Reject non-canonical encodings so commitments stay stable across exports.
    if fr_to_le_bytes(&fr_from_le_bytes_mod_order(&out)) != out {
        return Err(CredsError::Serialization(
            "Identity component is not a canonical field element".into(),
        ));
    }
    Ok(out)
}
