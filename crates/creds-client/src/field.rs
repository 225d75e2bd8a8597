//! Conversions between arkworks field elements and EVM words.

use ark_bn254::{Bn254, Fr};
use ark_ff::{BigInt, PrimeField};
use ark_groth16::Proof;
use creds_crypto::{pack_proof, unpack_proof};
use creds_types::{CredsError, CredsResult, EthAddress, PACKED_PROOF_WORDS};
use ethers::types::{Address, U256};

pub fn fr_to_u256(f: &Fr) -> U256 {
    U256(f.into_bigint().0)
}

/// `None` when the word is not below the BN254 scalar modulus.
pub fn u256_to_fr(value: U256) -> Option<Fr> {
    Fr::from_bigint(BigInt::new(value.0))
}

pub fn u256_to_fr_checked(value: U256) -> CredsResult<Fr> {
    u256_to_fr(value).ok_or_else(|| {
        CredsError::InvalidCommitment(format!("{} is not less than the snark scalar field", value))
    })
}

pub fn snark_scalar_field() -> U256 {
    // r - 1 is the largest element; r itself does not fit in Fr.
    fr_to_u256(&-Fr::from(1u64)) + U256::one()
}

pub fn pack_proof_u256(proof: &Proof<Bn254>) -> [U256; PACKED_PROOF_WORDS] {
    let words = pack_proof(proof);
    let mut out = [U256::zero(); PACKED_PROOF_WORDS];
    for (slot, word) in out.iter_mut().zip(words.iter()) {
        *slot = U256::from_big_endian(word);
    }
    out
}

pub fn unpack_proof_u256(words: &[U256; PACKED_PROOF_WORDS]) -> CredsResult<Proof<Bn254>> {
    let mut raw = [[0u8; 32]; PACKED_PROOF_WORDS];
    for (slot, word) in raw.iter_mut().zip(words.iter()) {
        word.to_big_endian(slot);
    }
    unpack_proof(&raw)
}

pub fn to_address(addr: &EthAddress) -> Address {
    Address::from_slice(addr.as_bytes())
}

pub fn from_address(addr: Address) -> EthAddress {
    EthAddress::from_bytes(addr.0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use creds_types::SNARK_SCALAR_FIELD;
    use proptest::prelude::*;

    #[test]
    fn test_fr_u256_roundtrip() {
        let f = Fr::from(0xdead_beef_u64);
        assert_eq!(fr_to_u256(&f), U256::from(0xdead_beef_u64));
        assert_eq!(u256_to_fr(fr_to_u256(&f)), Some(f));
    }

    #[test]
    fn test_modulus_boundary() {
        let modulus = U256::from_dec_str(SNARK_SCALAR_FIELD).unwrap();
        assert_eq!(snark_scalar_field(), modulus);
        assert!(u256_to_fr(modulus).is_none());
        assert!(u256_to_fr(modulus - 1).is_some());
        assert!(u256_to_fr_checked(U256::MAX).is_err());
    }

    #[test]
    fn test_address_conversion() {
        let eth = EthAddress::from_bytes([0xab; 20]);
        assert_eq!(from_address(to_address(&eth)), eth);
    }

    proptest! {
        #[test]
        fn prop_words_above_modulus_rejected(limbs in any::<[u64; 4]>()) {
            let word = U256(limbs);
            match u256_to_fr(word) {
                Some(f) => prop_assert_eq!(fr_to_u256(&f), word),
                None => prop_assert!(word >= snark_scalar_field()),
            }
        }
    }
}
