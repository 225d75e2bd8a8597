use super::{
    Clock, CredEvent, CredInfo, CredentialLedger, LedgerReceipt, NullifierSet, ProofSubmission,
    RootHistory, SystemClock,
};
use crate::field::{fr_to_u256, u256_to_fr, u256_to_fr_checked, unpack_proof_u256};
use ark_bn254::Fr;
use async_trait::async_trait;
use creds_crypto::{hash_to_field, Group, MembershipVerifier, MerklePath, PublicSignals};
use creds_types::{CredsError, CredsResult, DEFAULT_ROOT_HISTORY_DURATION_SECS};
use ethers::types::{Address, H256, U256};
use ethers::utils::keccak256;
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{Mutex, RwLock};
use tracing::{debug, info, warn};

struct CredState {
    admin: Address,
    uri: String,
    group: Group,
    history: RootHistory,
    nullifiers: NullifierSet,
    events: Vec<CredEvent>,
}

struct RegisteredVerifier {
    address: Address,
    verifier: MembershipVerifier,
}

struct LedgerState {
    creds: RwLock<HashMap<U256, Arc<Mutex<CredState>>>>,
    verifiers: HashMap<usize, RegisteredVerifier>,
    root_history_duration: Duration,
    clock: Arc<dyn Clock>,
    tx_counter: AtomicU64,
}

impl LedgerState {
    fn next_tx_hash(&self, caller: Address) -> H256 {
        let nonce = self.tx_counter.fetch_add(1, Ordering::SeqCst);
        let mut preimage = Vec::with_capacity(28);
        preimage.extend_from_slice(caller.as_bytes());
        preimage.extend_from_slice(&nonce.to_be_bytes());
        H256(keccak256(preimage))
    }

    async fn cred(&self, cred_id: U256) -> CredsResult<Arc<Mutex<CredState>>> {
        self.creds
            .read()
            .await
            .get(&cred_id)
            .cloned()
            .ok_or(CredsError::CredNotFound)
    }
}

/// Builder for [`LocalLedger`]; only depths with a registered verifier can
/// be used for new credentials.
pub struct LocalLedgerBuilder {
    verifiers: HashMap<usize, RegisteredVerifier>,
    root_history_duration: Duration,
    clock: Arc<dyn Clock>,
}

impl Default for LocalLedgerBuilder {
    fn default() -> Self {
        Self {
            verifiers: HashMap::new(),
            root_history_duration: Duration::from_secs(DEFAULT_ROOT_HISTORY_DURATION_SECS),
            clock: Arc::new(SystemClock),
        }
    }
}

impl LocalLedgerBuilder {
    pub fn verifier(mut self, verifier: MembershipVerifier) -> Self {
        let depth = verifier.depth();
        let address = Address::from_slice(
            &keccak256(format!("creds.verifier.{}", depth).as_bytes())[12..],
        );
        self.verifiers
            .insert(depth, RegisteredVerifier { address, verifier });
        self
    }

    pub fn root_history_duration(mut self, duration: Duration) -> Self {
        self.root_history_duration = duration;
        self
    }

    pub fn clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    pub fn build(self, caller: Address) -> LocalLedger {
        LocalLedger {
            state: Arc::new(LedgerState {
                creds: RwLock::new(HashMap::new()),
                verifiers: self.verifiers,
                root_history_duration: self.root_history_duration,
                clock: self.clock,
                tx_counter: AtomicU64::new(0),
            }),
            caller,
        }
    }
}

/// In-process credential ledger.
///
/// Handles are cheap to clone. [`LocalLedger::connect`] gives a handle on
/// the same state that signs as a different account. Credentials are locked
/// independently, so operations on different credentials run in parallel.
#[derive(Clone)]
pub struct LocalLedger {
    state: Arc<LedgerState>,
    caller: Address,
}

impl LocalLedger {
    pub fn builder() -> LocalLedgerBuilder {
        LocalLedgerBuilder::default()
    }

    pub fn connect(&self, caller: Address) -> Self {
        Self {
            state: self.state.clone(),
            caller,
        }
    }

    pub fn now(&self) -> u64 {
        self.state.clock.now()
    }

    fn receipt(&self, events: Vec<CredEvent>) -> LedgerReceipt {
        LedgerReceipt {
            tx_hash: self.state.next_tx_hash(self.caller),
            events,
        }
    }

    fn ensure_admin(&self, cred: &CredState) -> CredsResult<()> {
        if cred.admin != self.caller {
            warn!("Rejected call from {:?}: not the credential admin", self.caller);
            return Err(CredsError::NotAdmin);
        }
        Ok(())
    }

    fn checked_path(
        cred: &CredState,
        commitment: &Fr,
        siblings: &[U256],
        path_indices: &[u8],
    ) -> CredsResult<MerklePath> {
        let siblings = siblings
            .iter()
            .map(|s| u256_to_fr(*s).ok_or(CredsError::StaleOrInvalidPath))
            .collect::<CredsResult<Vec<_>>>()?;
        let mut path = MerklePath {
            leaf_index: 0,
            siblings,
            path_indices: path_indices.to_vec(),
        };
        if path.depth() != cred.group.depth() || !path.verify(*commitment, cred.group.root()) {
            return Err(CredsError::StaleOrInvalidPath);
        }
        path.leaf_index = path.index_from_bits();
        if cred.group.index_of(commitment) != Some(path.leaf_index) {
            return Err(CredsError::StaleOrInvalidPath);
        }
        Ok(path)
    }
}

#[async_trait]
impl CredentialLedger for LocalLedger {
    fn caller(&self) -> Address {
        self.caller
    }

    async fn create_cred(
        &self,
        cred_id: U256,
        merkle_tree_depth: usize,
        zero_value: U256,
        admin: Address,
        uri: &str,
    ) -> CredsResult<LedgerReceipt> {
        if !self.state.verifiers.contains_key(&merkle_tree_depth) {
            return Err(CredsError::DepthUnsupported(merkle_tree_depth));
        }
        if u256_to_fr(cred_id).is_none() {
            return Err(CredsError::IdExceedsFieldModulus);
        }
        let zero = u256_to_fr_checked(zero_value)?;

        let mut creds = self.state.creds.write().await;
        if creds.contains_key(&cred_id) {
            return Err(CredsError::CredAlreadyExists);
        }

        let group = Group::new(merkle_tree_depth, zero)?;
        let history = RootHistory::new(
            group.root(),
            self.now(),
            self.state.root_history_duration,
        );
        let event = CredEvent::CredCreated {
            cred_id,
            merkle_tree_depth: U256::from(merkle_tree_depth),
            zero_value,
        };
        creds.insert(
            cred_id,
            Arc::new(Mutex::new(CredState {
                admin,
                uri: uri.to_string(),
                group,
                history,
                nullifiers: NullifierSet::new(),
                events: vec![event.clone()],
            })),
        );

        info!(
            "Created credential {} (depth {}, admin {:?})",
            cred_id, merkle_tree_depth, admin
        );
        Ok(self.receipt(vec![event]))
    }

    async fn add_identity(&self, cred_id: U256, commitment: U256) -> CredsResult<LedgerReceipt> {
        self.add_identities(cred_id, &[commitment]).await
    }

    async fn add_identities(
        &self,
        cred_id: U256,
        commitments: &[U256],
    ) -> CredsResult<LedgerReceipt> {
        let cred = self.state.cred(cred_id).await?;
        let mut cred = cred.lock().await;
        self.ensure_admin(&cred)?;

        let leaves = commitments
            .iter()
            .map(|c| u256_to_fr_checked(*c))
            .collect::<CredsResult<Vec<_>>>()?;

        // Validate the whole batch on a copy so a failure leaves no trace.
        let mut group = cred.group.clone();
        group.add_members(&leaves)?;

        let mut events = Vec::with_capacity(leaves.len());
        for leaf in &leaves {
            let index = cred.group.leaf_count();
            let root = cred.group.add_member(*leaf)?;
            events.push(CredEvent::IdentityAdded {
                cred_id,
                index: U256::from(index),
                identity_commitment: fr_to_u256(leaf),
                merkle_tree_root: fr_to_u256(&root),
            });
        }
        let root = cred.group.root();
        let now = self.now();
        cred.history.record(root, now);
        cred.events.extend(events.iter().cloned());

        debug!(
            "Added {} identities to credential {} ({} leaves)",
            leaves.len(),
            cred_id,
            cred.group.leaf_count()
        );
        Ok(self.receipt(events))
    }

    async fn remove_identity(
        &self,
        cred_id: U256,
        commitment: U256,
        siblings: &[U256],
        path_indices: &[u8],
    ) -> CredsResult<LedgerReceipt> {
        let cred = self.state.cred(cred_id).await?;
        let mut cred = cred.lock().await;
        self.ensure_admin(&cred)?;

        let leaf = u256_to_fr(commitment).ok_or(CredsError::StaleOrInvalidPath)?;
        let path = Self::checked_path(&cred, &leaf, siblings, path_indices)?;
        let root = cred.group.remove_member(&leaf)?;
        let now = self.now();
        cred.history.record(root, now);

        let event = CredEvent::IdentityRemoved {
            cred_id,
            index: U256::from(path.leaf_index),
            identity_commitment: commitment,
            merkle_tree_root: fr_to_u256(&root),
        };
        cred.events.push(event.clone());
        debug!("Removed identity at index {} from credential {}", path.leaf_index, cred_id);
        Ok(self.receipt(vec![event]))
    }

    async fn update_identity(
        &self,
        cred_id: U256,
        commitment: U256,
        new_commitment: U256,
        siblings: &[U256],
        path_indices: &[u8],
    ) -> CredsResult<LedgerReceipt> {
        let cred = self.state.cred(cred_id).await?;
        let mut cred = cred.lock().await;
        self.ensure_admin(&cred)?;

        let leaf = u256_to_fr(commitment).ok_or(CredsError::StaleOrInvalidPath)?;
        let new_leaf = u256_to_fr_checked(new_commitment)?;
        let path = Self::checked_path(&cred, &leaf, siblings, path_indices)?;
        let root = cred.group.update_member(&leaf, new_leaf)?;
        let now = self.now();
        cred.history.record(root, now);

        let event = CredEvent::IdentityUpdated {
            cred_id,
            index: U256::from(path.leaf_index),
            identity_commitment: commitment,
            new_identity_commitment: new_commitment,
            merkle_tree_root: fr_to_u256(&root),
        };
        cred.events.push(event.clone());
        debug!("Updated identity at index {} in credential {}", path.leaf_index, cred_id);
        Ok(self.receipt(vec![event]))
    }

    async fn update_cred_admin(
        &self,
        cred_id: U256,
        new_admin: Address,
    ) -> CredsResult<LedgerReceipt> {
        let cred = self.state.cred(cred_id).await?;
        let mut cred = cred.lock().await;
        self.ensure_admin(&cred)?;

        let old_admin = std::mem::replace(&mut cred.admin, new_admin);
        let event = CredEvent::CredAdminUpdated {
            cred_id,
            old_admin,
            new_admin,
        };
        cred.events.push(event.clone());
        info!("Credential {} admin changed to {:?}", cred_id, new_admin);
        Ok(self.receipt(vec![event]))
    }

    async fn verify_proof(&self, submission: &ProofSubmission) -> CredsResult<LedgerReceipt> {
        let cred = self.state.cred(submission.cred_id).await?;
        let mut cred = cred.lock().await;
        submission.check_binding()?;

        let root = u256_to_fr(submission.merkle_root).ok_or(CredsError::RootUnknown)?;
        cred.history.check(&root, self.now())?;

        let nullifier_hash =
            u256_to_fr(submission.nullifier_hash).ok_or(CredsError::InvalidProof)?;
        if cred.nullifiers.contains(&nullifier_hash) {
            warn!(
                "Nullifier hash {} already used in credential {}",
                submission.nullifier_hash, submission.cred_id
            );
            return Err(CredsError::NullifierReused);
        }

        let depth = cred.group.depth();
        let registered = self
            .state
            .verifiers
            .get(&depth)
            .ok_or(CredsError::DepthUnsupported(depth))?;
        let public = PublicSignals {
            merkle_root: root,
            nullifier_hash,
            signal_hash: hash_to_field(&submission.signal),
            external_nullifier: u256_to_fr(submission.external_nullifier)
                .ok_or(CredsError::InvalidProof)?,
        };
        let proof = unpack_proof_u256(&submission.proof)?;
        if !registered.verifier.verify(&public, &proof)? {
            return Err(CredsError::InvalidProof);
        }

        cred.nullifiers.insert(nullifier_hash);
        let events = vec![
            CredEvent::NullifierHashAdded {
                nullifier_hash: submission.nullifier_hash,
            },
            CredEvent::ProofVerified {
                cred_id: submission.cred_id,
                merkle_tree_root: submission.merkle_root,
                external_nullifier: submission.external_nullifier,
                nullifier_hash: submission.nullifier_hash,
                signal: submission.signal,
            },
        ];
        cred.events.extend(events.iter().cloned());
        info!("Proof verified for credential {}", submission.cred_id);
        Ok(self.receipt(events))
    }

    async fn merkle_tree_root(&self, cred_id: U256) -> CredsResult<U256> {
        let cred = self.state.cred(cred_id).await?;
        let cred = cred.lock().await;
        Ok(fr_to_u256(&cred.group.root()))
    }

    async fn merkle_tree_depth(&self, cred_id: U256) -> CredsResult<usize> {
        let cred = self.state.cred(cred_id).await?;
        let cred = cred.lock().await;
        Ok(cred.group.depth())
    }

    async fn number_of_leaves(&self, cred_id: U256) -> CredsResult<u64> {
        let cred = self.state.cred(cred_id).await?;
        let cred = cred.lock().await;
        Ok(cred.group.leaf_count() as u64)
    }

    async fn cred(&self, cred_id: U256) -> CredsResult<CredInfo> {
        let cred = self.state.cred(cred_id).await?;
        let cred = cred.lock().await;
        Ok(CredInfo {
            admin: cred.admin,
            uri: cred.uri.clone(),
            root_history_duration: cred.history.duration(),
        })
    }

    async fn verifier(&self, merkle_tree_depth: usize) -> CredsResult<Address> {
        Ok(self
            .state
            .verifiers
            .get(&merkle_tree_depth)
            .map(|v| v.address)
            .unwrap_or_else(Address::zero))
    }

    async fn group_events(&self, cred_id: U256) -> CredsResult<Vec<CredEvent>> {
        let cred = self.state.cred(cred_id).await?;
        let cred = cred.lock().await;
        Ok(cred.events.clone())
    }
}
