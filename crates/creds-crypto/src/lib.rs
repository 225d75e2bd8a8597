#![deny(unsafe_code)]
#![warn(clippy::all)]

pub mod circuit;
pub mod field;
pub mod group;
pub mod identity;
pub mod packing;
pub mod poseidon;
pub mod prover;

pub use circuit::{MembershipCircuit, PublicSignals};
pub use field::{
    format_bytes32, fr_from_be_bytes, fr_from_hex, fr_short_hex, fr_to_be_bytes, fr_to_hex,
    hash_to_field, parse_bytes32,
};
pub use group::{Group, MerklePath};
pub use identity::Identity;
pub use packing::{pack_proof, unpack_proof};
pub use poseidon::{poseidon_hash1, poseidon_hash2};
pub use prover::{
    proving_key_file, verifying_key_file, FullProof, MembershipVerifier, ProofGenerator,
    ProofRequest, ProvingArtifacts,
};

pub use ark_bn254::Fr;
