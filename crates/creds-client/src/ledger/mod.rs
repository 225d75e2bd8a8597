//! Credential ledger access.
//!
//! [`CredentialLedger`] is the contract surface: every state-changing call
//! returns a [`LedgerReceipt`] carrying the decoded events, and every
//! rejection is a typed [`CredsError`]. [`LocalLedger`] enforces the same
//! state machine in process; `contracts::ContractLedger` talks to a deployed
//! Credential contract.

mod history;
mod local;
mod mirror;
mod nullifier;

pub use history::{Clock, ManualClock, RootEntry, RootHistory, SystemClock};
pub use local::{LocalLedger, LocalLedgerBuilder};
pub use mirror::{sync_group, MirroredCred};
pub use nullifier::NullifierSet;

use async_trait::async_trait;
use creds_crypto::{FullProof, MerklePath};
use creds_types::{CredsError, CredsResult, PACKED_PROOF_WORDS};
use ethers::types::{Address, H256, U256};
use serde::Serialize;
use std::time::Duration;

use crate::field::{fr_to_u256, pack_proof_u256};

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(tag = "event", rename_all = "camelCase")]
pub enum CredEvent {
    CredCreated {
        cred_id: U256,
        merkle_tree_depth: U256,
        zero_value: U256,
    },
    IdentityAdded {
        cred_id: U256,
        index: U256,
        identity_commitment: U256,
        merkle_tree_root: U256,
    },
    IdentityRemoved {
        cred_id: U256,
        index: U256,
        identity_commitment: U256,
        merkle_tree_root: U256,
    },
    IdentityUpdated {
        cred_id: U256,
        index: U256,
        identity_commitment: U256,
        new_identity_commitment: U256,
        merkle_tree_root: U256,
    },
    NullifierHashAdded {
        nullifier_hash: U256,
    },
    ProofVerified {
        cred_id: U256,
        merkle_tree_root: U256,
        external_nullifier: U256,
        nullifier_hash: U256,
        signal: [u8; 32],
    },
    CredAdminUpdated {
        cred_id: U256,
        old_admin: Address,
        new_admin: Address,
    },
}

impl CredEvent {
    pub fn name(&self) -> &'static str {
        match self {
            CredEvent::CredCreated { .. } => "CredCreated",
            CredEvent::IdentityAdded { .. } => "IdentityAdded",
            CredEvent::IdentityRemoved { .. } => "IdentityRemoved",
            CredEvent::IdentityUpdated { .. } => "IdentityUpdated",
            CredEvent::NullifierHashAdded { .. } => "NullifierHashAdded",
            CredEvent::ProofVerified { .. } => "ProofVerified",
            CredEvent::CredAdminUpdated { .. } => "credAdminUpdated",
        }
    }

    /// `None` for `NullifierHashAdded`, which carries no credential id.
    pub fn cred_id(&self) -> Option<U256> {
        match self {
            CredEvent::CredCreated { cred_id, .. }
            | CredEvent::IdentityAdded { cred_id, .. }
            | CredEvent::IdentityRemoved { cred_id, .. }
            | CredEvent::IdentityUpdated { cred_id, .. }
            | CredEvent::ProofVerified { cred_id, .. }
            | CredEvent::CredAdminUpdated { cred_id, .. } => Some(*cred_id),
            CredEvent::NullifierHashAdded { .. } => None,
        }
    }

    /// Root after a membership change, if this event is one.
    pub fn merkle_tree_root(&self) -> Option<U256> {
        match self {
            CredEvent::IdentityAdded { merkle_tree_root, .. }
            | CredEvent::IdentityRemoved { merkle_tree_root, .. }
            | CredEvent::IdentityUpdated { merkle_tree_root, .. } => Some(*merkle_tree_root),
            _ => None,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct LedgerReceipt {
    pub tx_hash: H256,
    pub events: Vec<CredEvent>,
}

impl LedgerReceipt {
    /// Root reported by the last membership event in this receipt.
    pub fn last_root(&self) -> Option<U256> {
        self.events.iter().rev().find_map(CredEvent::merkle_tree_root)
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct CredInfo {
    pub admin: Address,
    pub uri: String,
    pub root_history_duration: Duration,
}

/// Arguments of `verifyProof`, in contract encoding.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct ProofSubmission {
    pub cred_id: U256,
    pub merkle_root: U256,
    pub signal: [u8; 32],
    pub nullifier_hash: U256,
    pub external_nullifier: U256,
    pub proof: [U256; PACKED_PROOF_WORDS],
}

impl ProofSubmission {
    /// `signal` must be the same bytes the proof's signal hash was taken over.
    pub fn new(cred_id: U256, signal: [u8; 32], full: &FullProof) -> Self {
        let public = &full.public_signals;
        Self {
            cred_id,
            merkle_root: fr_to_u256(&public.merkle_root),
            signal,
            nullifier_hash: fr_to_u256(&public.nullifier_hash),
            external_nullifier: fr_to_u256(&public.external_nullifier),
            proof: pack_proof_u256(&full.proof),
        }
    }

    /// The external nullifier must be the credential id, so one identity has
    /// exactly one nullifier hash per credential.
    pub fn check_binding(&self) -> CredsResult<()> {
        if self.external_nullifier != self.cred_id {
            return Err(CredsError::ExternalNullifierMismatch);
        }
        Ok(())
    }
}

/// Siblings of a path as contract words.
pub fn path_siblings(path: &MerklePath) -> Vec<U256> {
    path.siblings.iter().map(fr_to_u256).collect()
}

#[async_trait]
pub trait CredentialLedger: Send + Sync {
    /// Account that signs state-changing calls.
    fn caller(&self) -> Address;

    async fn create_cred(
        &self,
        cred_id: U256,
        merkle_tree_depth: usize,
        zero_value: U256,
        admin: Address,
        uri: &str,
    ) -> CredsResult<LedgerReceipt>;

    async fn add_identity(&self, cred_id: U256, commitment: U256) -> CredsResult<LedgerReceipt>;

    async fn add_identities(
        &self,
        cred_id: U256,
        commitments: &[U256],
    ) -> CredsResult<LedgerReceipt>;

    async fn remove_identity(
        &self,
        cred_id: U256,
        commitment: U256,
        siblings: &[U256],
        path_indices: &[u8],
    ) -> CredsResult<LedgerReceipt>;

    async fn update_identity(
        &self,
        cred_id: U256,
        commitment: U256,
        new_commitment: U256,
        siblings: &[U256],
        path_indices: &[u8],
    ) -> CredsResult<LedgerReceipt>;

    async fn update_cred_admin(
        &self,
        cred_id: U256,
        new_admin: Address,
    ) -> CredsResult<LedgerReceipt>;

    /// Callable by anyone.
    async fn verify_proof(&self, submission: &ProofSubmission) -> CredsResult<LedgerReceipt>;

    async fn merkle_tree_root(&self, cred_id: U256) -> CredsResult<U256>;

    async fn merkle_tree_depth(&self, cred_id: U256) -> CredsResult<usize>;

    async fn number_of_leaves(&self, cred_id: U256) -> CredsResult<u64>;

    async fn cred(&self, cred_id: U256) -> CredsResult<CredInfo>;

    /// Verifier registered for a tree depth; zero address if none.
    async fn verifier(&self, merkle_tree_depth: usize) -> CredsResult<Address>;

    /// Every event emitted for the credential, oldest first.
    async fn group_events(&self, cred_id: U256) -> CredsResult<Vec<CredEvent>>;
}

#[cfg(test)]
mod tests;
