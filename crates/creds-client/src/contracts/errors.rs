//! Revert decoding for the Credential contract and the libraries it calls.

use creds_types::CredsError;
use ethers::abi::{self, ParamType, Token};
use ethers::contract::ContractError;
use ethers::providers::Middleware;
use ethers::utils::id;

const ERROR_STRING_SELECTOR: [u8; 4] = [0x08, 0xc3, 0x79, 0xa0];

const CUSTOM_ERRORS: &[&str] = &[
    "Credential__CallerIsNotTheCredAdmin()",
    "Credential__CredAlreadyExists()",
    "Credential__CredDoesNotExist()",
    "Credential__CredIdIsNotLessThanSnarkScalarField()",
    "Credential__MerkleTreeDepthIsNotSupported()",
    "Credential__MerkleTreeRootIsExpired()",
    "Credential__MerkleTreeRootIsNotPartOfTheCred()",
    "Credential__YouAreUsingTheSameNillifierTwice()",
    "InvalidProof()",
];

fn custom_error(signature: &str) -> CredsError {
    match signature {
        "Credential__CallerIsNotTheCredAdmin()" => CredsError::NotAdmin,
        "Credential__CredAlreadyExists()" => CredsError::CredAlreadyExists,
        "Credential__CredDoesNotExist()" => CredsError::CredNotFound,
        "Credential__CredIdIsNotLessThanSnarkScalarField()" => CredsError::IdExceedsFieldModulus,
        "Credential__MerkleTreeDepthIsNotSupported()" => CredsError::DepthUnsupported(0),
        "Credential__MerkleTreeRootIsExpired()" => CredsError::RootExpired,
        "Credential__MerkleTreeRootIsNotPartOfTheCred()" => CredsError::RootUnknown,
        "Credential__YouAreUsingTheSameNillifierTwice()" => CredsError::NullifierReused,
        _ => CredsError::InvalidProof,
    }
}

/// Maps a revert reason string from the tree library or verifier.
pub fn revert_reason_error(reason: &str) -> CredsError {
    let lower = reason.to_lowercase();
    if lower.contains("not part of the tree") || lower.contains("length of path") {
        CredsError::StaleOrInvalidPath
    } else if lower.contains("tree is full") {
        CredsError::CapacityExceeded(0)
    } else if lower.contains("cannot be the same") {
        CredsError::DuplicateMember
    } else if lower.contains("snark_scalar_field") {
        CredsError::InvalidCommitment(reason.to_string())
    } else if lower.contains("invalid proof")
        || lower.contains("invalid-proof")
        || lower.contains("pairing")
    {
        CredsError::InvalidProof
    } else {
        CredsError::Contract(format!("Reverted: {}", reason))
    }
}

/// Decodes raw revert data. `None` when the data matches no known error.
pub fn decode_revert(data: &[u8]) -> Option<CredsError> {
    if data.len() < 4 {
        return None;
    }
    let selector = &data[..4];

    if selector == ERROR_STRING_SELECTOR {
        let tokens = abi::decode(&[ParamType::String], &data[4..]).ok()?;
        return match tokens.into_iter().next() {
            Some(Token::String(reason)) => Some(revert_reason_error(&reason)),
            _ => None,
        };
    }

    CUSTOM_ERRORS
        .iter()
        .find(|signature| id(signature) == selector)
        .map(|signature| custom_error(signature))
}

/// Typed error for a failed contract call, falling back to `Contract`.
pub fn map_contract_error<M: Middleware>(operation: &str, err: ContractError<M>) -> CredsError {
    if let Some(decoded) = err.as_revert().and_then(|data| decode_revert(data)) {
        return decoded;
    }
    match err {
        ContractError::MiddlewareError { e } => {
            CredsError::Network(format!("{} failed: {}", operation, e))
        }
        ContractError::ProviderError { e } => {
            CredsError::Network(format!("{} failed: {}", operation, e))
        }
        other => CredsError::Contract(format!("{} failed: {}", operation, other)),
    }
}
