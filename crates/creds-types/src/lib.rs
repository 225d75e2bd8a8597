#![forbid(unsafe_code)]
#![warn(clippy::all)]

pub mod address;
pub mod error;

pub use address::EthAddress;
pub use error::{CredsError, CredsResult, ErrorKind};

pub const ETH_ADDRESS_SIZE: usize = 20;

pub const FIELD_ELEMENT_SIZE: usize = 32;

/// Order of the BN254 scalar field. Credential ids, commitments, roots and
/// nullifier hashes must all be strictly below it.
pub const SNARK_SCALAR_FIELD: &str =
    "21888242871839275222246405745257275088548364400416034343698204186575808495617";

pub const DEFAULT_MERKLE_TREE_DEPTH: usize = 20;

pub const MIN_MERKLE_TREE_DEPTH: usize = 1;

pub const MAX_MERKLE_TREE_DEPTH: usize = 32;

/// How long a replaced root keeps being accepted for proof verification.
pub const DEFAULT_ROOT_HISTORY_DURATION_SECS: u64 = 3_600;

pub const DEFAULT_GAS_LIMIT: u64 = 1_000_000_000;

/// Number of uint256 words in a Solidity-packed Groth16 proof.
pub const PACKED_PROOF_WORDS: usize = 8;

pub const DEFAULT_SIGNAL: &str = "Hello World";

pub const DEFAULT_CRED_URI: &str = "Cred URI";

pub fn is_supported_depth(depth: usize) -> bool {
    (MIN_MERKLE_TREE_DEPTH..=MAX_MERKLE_TREE_DEPTH).contains(&depth)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_depth_bounds() {
        assert!(!is_supported_depth(0));
        assert!(is_supported_depth(DEFAULT_MERKLE_TREE_DEPTH));
        assert!(is_supported_depth(MAX_MERKLE_TREE_DEPTH));
        assert!(!is_supported_depth(MAX_MERKLE_TREE_DEPTH + 1));
    }
}
