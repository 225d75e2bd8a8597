use super::{path_siblings, CredEvent, CredentialLedger, LedgerReceipt, ProofSubmission};
use crate::field::{fr_to_u256, u256_to_fr_checked};
use ark_bn254::Fr;
use creds_crypto::{fr_short_hex, FullProof, Group};
use creds_types::{CredsError, CredsResult};
use ethers::types::{Address, U256};
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Rebuilds a group mirror by replaying the credential's events.
///
/// Fails with `RootMismatch` when the replayed root does not match the
/// ledger's current root, which means the ledger hashes with different
/// Poseidon parameters or events were missed.
pub async fn sync_group<L>(ledger: &L, cred_id: U256) -> CredsResult<Group>
where
    L: CredentialLedger + ?Sized,
{
    let events = ledger.group_events(cred_id).await?;
    let (depth, zero_value) = events
        .iter()
        .find_map(|event| match event {
            CredEvent::CredCreated {
                merkle_tree_depth,
                zero_value,
                ..
            } => Some((merkle_tree_depth.as_usize(), *zero_value)),
            _ => None,
        })
        .ok_or(CredsError::CredNotFound)?;

    let mut group = Group::new(depth, u256_to_fr_checked(zero_value)?)?;
    for event in &events {
        match event {
            CredEvent::IdentityAdded {
                identity_commitment,
                ..
            } => {
                group.add_member(u256_to_fr_checked(*identity_commitment)?)?;
            }
            CredEvent::IdentityRemoved {
                identity_commitment,
                ..
            } => {
                group.remove_member(&u256_to_fr_checked(*identity_commitment)?)?;
            }
            CredEvent::IdentityUpdated {
                identity_commitment,
                new_identity_commitment,
                ..
            } => {
                group.update_member(
                    &u256_to_fr_checked(*identity_commitment)?,
                    u256_to_fr_checked(*new_identity_commitment)?,
                )?;
            }
            _ => {}
        }
    }

    let ledger_root = ledger.merkle_tree_root(cred_id).await?;
    let mirror_root = fr_to_u256(&group.root());
    if ledger_root != mirror_root {
        return Err(root_mismatch(mirror_root, ledger_root));
    }

    debug!(
        "Synced credential {}: {} members, root {}",
        cred_id,
        group.member_count(),
        fr_short_hex(&group.root())
    );
    Ok(group)
}

/// A credential on a ledger together with a local mirror of its tree.
///
/// Every mutation is applied to a copy of the mirror first, so invalid
/// requests are rejected before anything is submitted; the mirror only
/// advances once the ledger has accepted the call and reported the same root.
/// After a `RootMismatch` the mirror is out of date and must be refreshed.
pub struct MirroredCred<L: CredentialLedger + ?Sized> {
    ledger: Arc<L>,
    cred_id: U256,
    group: Group,
}

impl<L: CredentialLedger + ?Sized> MirroredCred<L> {
    pub async fn create(
        ledger: Arc<L>,
        cred_id: U256,
        depth: usize,
        zero_value: Fr,
        admin: Address,
        uri: &str,
    ) -> CredsResult<(Self, LedgerReceipt)> {
        let group = Group::new(depth, zero_value)?;
        let receipt = ledger
            .create_cred(cred_id, depth, fr_to_u256(&zero_value), admin, uri)
            .await?;
        info!("Credential {} created in tx {:?}", cred_id, receipt.tx_hash);
        Ok((
            Self {
                ledger,
                cred_id,
                group,
            },
            receipt,
        ))
    }

    /// Attaches to an existing credential by replaying its history.
    pub async fn attach(ledger: Arc<L>, cred_id: U256) -> CredsResult<Self> {
        let group = sync_group(ledger.as_ref(), cred_id).await?;
        Ok(Self {
            ledger,
            cred_id,
            group,
        })
    }

    pub fn cred_id(&self) -> U256 {
        self.cred_id
    }

    pub fn group(&self) -> &Group {
        &self.group
    }

    pub fn ledger(&self) -> &Arc<L> {
        &self.ledger
    }

    pub async fn refresh(&mut self) -> CredsResult<()> {
        self.group = sync_group(self.ledger.as_ref(), self.cred_id).await?;
        Ok(())
    }

    pub async fn add_identity(&mut self, commitment: Fr) -> CredsResult<LedgerReceipt> {
        let mut next = self.group.clone();
        next.add_member(commitment)?;
        let receipt = self
            .ledger
            .add_identity(self.cred_id, fr_to_u256(&commitment))
            .await?;
        self.advance(next, &receipt)?;
        Ok(receipt)
    }

    pub async fn add_identities(&mut self, commitments: &[Fr]) -> CredsResult<LedgerReceipt> {
        let mut next = self.group.clone();
        next.add_members(commitments)?;
        let words: Vec<U256> = commitments.iter().map(fr_to_u256).collect();
        let receipt = self.ledger.add_identities(self.cred_id, &words).await?;
        self.advance(next, &receipt)?;
        Ok(receipt)
    }

    pub async fn remove_identity(&mut self, commitment: Fr) -> CredsResult<LedgerReceipt> {
        let path = self.group.path_for(&commitment)?;
        let mut next = self.group.clone();
        next.remove_member(&commitment)?;
        let receipt = self
            .ledger
            .remove_identity(
                self.cred_id,
                fr_to_u256(&commitment),
                &path_siblings(&path),
                &path.path_indices,
            )
            .await?;
        self.advance(next, &receipt)?;
        Ok(receipt)
    }

    pub async fn update_identity(
        &mut self,
        commitment: Fr,
        new_commitment: Fr,
    ) -> CredsResult<LedgerReceipt> {
        let path = self.group.path_for(&commitment)?;
        let mut next = self.group.clone();
        next.update_member(&commitment, new_commitment)?;
        let receipt = self
            .ledger
            .update_identity(
                self.cred_id,
                fr_to_u256(&commitment),
                fr_to_u256(&new_commitment),
                &path_siblings(&path),
                &path.path_indices,
            )
            .await?;
        self.advance(next, &receipt)?;
        Ok(receipt)
    }

    /// `signal` is the bytes32 word the proof's signal hash was taken over.
    pub async fn submit_proof(
        &self,
        signal: [u8; 32],
        proof: &FullProof,
    ) -> CredsResult<LedgerReceipt> {
        let submission = ProofSubmission::new(self.cred_id, signal, proof);
        self.ledger.verify_proof(&submission).await
    }

    fn advance(&mut self, next: Group, receipt: &LedgerReceipt) -> CredsResult<()> {
        if let Some(reported) = receipt.last_root() {
            let local = fr_to_u256(&next.root());
            if reported != local {
                warn!(
                    "Ledger root {} differs from mirror root {} for credential {}",
                    reported, local, self.cred_id
                );
                return Err(root_mismatch(local, reported));
            }
        }
        self.group = next;
        Ok(())
    }
}

fn root_mismatch(mirror: U256, ledger: U256) -> CredsError {
    CredsError::RootMismatch {
        mirror: format!("{:#x}", mirror),
        ledger: format!("{:#x}", ledger),
    }
}
