use super::bindings::{Credential, CredentialEvents};
use super::config::ContractConfig;
use super::errors::map_contract_error;
use super::rpc::FeeOracle;
use crate::field::to_address;
use crate::ledger::{CredEvent, CredInfo, CredentialLedger, LedgerReceipt, ProofSubmission};
use async_trait::async_trait;
use creds_types::{CredsError, CredsResult, MAX_MERKLE_TREE_DEPTH};
use ethers::{
    abi::Detokenize,
    contract::{parse_log, ContractCall},
    middleware::SignerMiddleware,
    providers::{Http, Middleware, Provider},
    signers::{LocalWallet, Signer},
    types::{Address, U256, U64},
};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info};

pub type SignerClient = SignerMiddleware<Provider<Http>, LocalWallet>;

/// Opens a provider and checks it serves the configured chain.
pub async fn connect_provider(config: &ContractConfig) -> CredsResult<Provider<Http>> {
    info!("Connecting to RPC: {}", config.rpc_url);

    let provider = Provider::<Http>::try_from(config.rpc_url.as_str())
        .map_err(|e| CredsError::Network(format!("Failed to create provider: {}", e)))?;

    let chain_id = provider
        .get_chainid()
        .await
        .map_err(|e| CredsError::Network(format!("Failed to get chain ID: {}", e)))?;

    if chain_id.as_u64() != config.chain_id {
        return Err(CredsError::Network(format!(
            "Chain ID mismatch: expected {}, got {}",
            config.chain_id,
            chain_id.as_u64()
        )));
    }

    info!("Connected to chain {}", config.chain_id);
    Ok(provider)
}

pub fn signer_client(
    provider: Provider<Http>,
    private_key: &str,
    chain_id: u64,
) -> CredsResult<Arc<SignerClient>> {
    let wallet: LocalWallet = private_key
        .trim()
        .parse()
        .map_err(|e| CredsError::Wallet(format!("Invalid private key: {}", e)))?;
    let wallet = wallet.with_chain_id(chain_id);
    info!("Wallet set: {:?}", wallet.address());
    Ok(Arc::new(SignerMiddleware::new(provider, wallet)))
}

impl From<CredentialEvents> for CredEvent {
    fn from(event: CredentialEvents) -> Self {
        match event {
            CredentialEvents::CredCreatedFilter(e) => CredEvent::CredCreated {
                cred_id: e.cred_id,
                merkle_tree_depth: e.merkle_tree_depth,
                zero_value: e.zero_value,
            },
            CredentialEvents::CredAdminUpdatedFilter(e) => CredEvent::CredAdminUpdated {
                cred_id: e.cred_id,
                old_admin: e.old_admin,
                new_admin: e.new_admin,
            },
            CredentialEvents::IdentityAddedFilter(e) => CredEvent::IdentityAdded {
                cred_id: e.cred_id,
                index: e.index,
                identity_commitment: e.identity_commitment,
                merkle_tree_root: e.merkle_tree_root,
            },
            CredentialEvents::IdentityRemovedFilter(e) => CredEvent::IdentityRemoved {
                cred_id: e.cred_id,
                index: e.index,
                identity_commitment: e.identity_commitment,
                merkle_tree_root: e.merkle_tree_root,
            },
            CredentialEvents::IdentityUpdatedFilter(e) => CredEvent::IdentityUpdated {
                cred_id: e.cred_id,
                index: e.index,
                identity_commitment: e.identity_commitment,
                new_identity_commitment: e.new_identity_commitment,
                merkle_tree_root: e.merkle_tree_root,
            },
            CredentialEvents::NullifierHashAddedFilter(e) => CredEvent::NullifierHashAdded {
                nullifier_hash: e.nullifier_hash,
            },
            CredentialEvents::ProofVerifiedFilter(e) => CredEvent::ProofVerified {
                cred_id: e.cred_id,
                merkle_tree_root: e.merkle_tree_root,
                external_nullifier: e.external_nullifier,
                nullifier_hash: e.nullifier_hash,
                signal: e.signal,
            },
        }
    }
}

/// Credential ledger backed by a deployed Credential contract.
///
/// Every transaction is dry-run with `eth_call` first so reverts surface as
/// typed errors, then sent with the configured gas limit and the priority
/// fee reported by the fee endpoint.
pub struct ContractLedger {
    config: ContractConfig,
    address: Address,
    provider: Arc<Provider<Http>>,
    signer: Option<Arc<SignerClient>>,
    fees: FeeOracle,
}

impl ContractLedger {
    pub async fn connect(config: ContractConfig) -> CredsResult<Self> {
        let address = config
            .credential_address
            .as_ref()
            .map(to_address)
            .ok_or_else(|| {
                CredsError::Config("No credential contract configured; run `creds deploy` first".into())
            })?;
        let provider = connect_provider(&config).await?;
        let fees = FeeOracle::new(&config.fee_rpc_url)?;

        Ok(Self {
            config,
            address,
            provider: Arc::new(provider),
            signer: None,
            fees,
        })
    }

    pub fn with_wallet(mut self, private_key: &str) -> CredsResult<Self> {
        let signer = signer_client((*self.provider).clone(), private_key, self.config.chain_id)?;
        self.signer = Some(signer);
        Ok(self)
    }

    pub fn address(&self) -> Address {
        self.address
    }

    pub fn has_wallet(&self) -> bool {
        self.signer.is_some()
    }

    fn reader(&self) -> Credential<Provider<Http>> {
        Credential::new(self.address, self.provider.clone())
    }

    fn writer(&self) -> CredsResult<Credential<SignerClient>> {
        let signer = self
            .signer
            .as_ref()
            .ok_or_else(|| CredsError::Wallet("No wallet configured".into()))?;
        Ok(Credential::new(self.address, signer.clone()))
    }

    async fn existing_depth(&self, cred_id: U256) -> CredsResult<usize> {
        let depth = self
            .reader()
            .get_merkle_tree_depth(cred_id)
            .call()
            .await
            .map_err(|e| map_contract_error("getMerkleTreeDepth", e))?;
        if depth.is_zero() {
            return Err(CredsError::CredNotFound);
        }
        if depth > U256::from(MAX_MERKLE_TREE_DEPTH) {
            return Err(CredsError::Contract(format!("Implausible tree depth {}", depth)));
        }
        Ok(depth.as_usize())
    }

    async fn submit<D>(
        &self,
        operation: &str,
        call: ContractCall<SignerClient, D>,
    ) -> CredsResult<LedgerReceipt>
    where
        D: Detokenize + Send + Sync,
    {
        let priority_fee = self.fees.max_priority_fee_per_gas().await?;
        let mut call = call.gas(self.config.gas_limit);
        if let Some(tx) = call.tx.as_eip1559_mut() {
            tx.max_priority_fee_per_gas = Some(priority_fee);
        }

        call.call()
            .await
            .map_err(|e| map_contract_error(operation, e))?;

        let pending = call
            .send()
            .await
            .map_err(|e| map_contract_error(operation, e))?;
        let tx_hash = pending.tx_hash();
        debug!("{} submitted: {:?}", operation, tx_hash);

        let timeout = self.config.confirmation_timeout;
        let receipt = tokio::time::timeout(timeout, pending)
            .await
            .map_err(|_| {
                CredsError::Network(format!("{} not confirmed within {:?}", operation, timeout))
            })?
            .map_err(|e| CredsError::Network(format!("{} transaction failed: {}", operation, e)))?
            .ok_or_else(|| CredsError::Contract(format!("No receipt for {}", operation)))?;

        if receipt.status == Some(U64::zero()) {
            return Err(CredsError::Contract(format!(
                "{} reverted in {:?}",
                operation, tx_hash
            )));
        }

        let events = receipt
            .logs
            .into_iter()
            .filter_map(|log| parse_log::<CredentialEvents>(log).ok())
            .map(CredEvent::from)
            .collect();

        info!("{} confirmed: {:?}", operation, tx_hash);
        Ok(LedgerReceipt { tx_hash, events })
    }
}

#[async_trait]
impl CredentialLedger for ContractLedger {
    fn caller(&self) -> Address {
        self.signer
            .as_ref()
            .map(|s| s.address())
            .unwrap_or_default()
    }

    async fn create_cred(
        &self,
        cred_id: U256,
        merkle_tree_depth: usize,
        zero_value: U256,
        admin: Address,
        uri: &str,
    ) -> CredsResult<LedgerReceipt> {
        let call = self.writer()?.create_cred(
            cred_id,
            U256::from(merkle_tree_depth),
            zero_value,
            admin,
            uri.to_string(),
        );
        self.submit("createCred", call).await.map_err(|e| match e {
            CredsError::DepthUnsupported(_) => CredsError::DepthUnsupported(merkle_tree_depth),
            other => other,
        })
    }

    async fn add_identity(&self, cred_id: U256, commitment: U256) -> CredsResult<LedgerReceipt> {
        let call = self.writer()?.add_identity(cred_id, commitment);
        self.submit("addIdentity", call).await
    }

    async fn add_identities(
        &self,
        cred_id: U256,
        commitments: &[U256],
    ) -> CredsResult<LedgerReceipt> {
        let call = self.writer()?.add_identities(cred_id, commitments.to_vec());
        self.submit("addIdentities", call).await
    }

    async fn remove_identity(
        &self,
        cred_id: U256,
        commitment: U256,
        siblings: &[U256],
        path_indices: &[u8],
    ) -> CredsResult<LedgerReceipt> {
        let call = self.writer()?.remove_identity(
            cred_id,
            commitment,
            siblings.to_vec(),
            path_indices.to_vec(),
        );
        self.submit("removeIdentity", call).await
    }

    async fn update_identity(
        &self,
        cred_id: U256,
        commitment: U256,
        new_commitment: U256,
        siblings: &[U256],
        path_indices: &[u8],
    ) -> CredsResult<LedgerReceipt> {
        let call = self.writer()?.update_identity(
            cred_id,
            commitment,
            new_commitment,
            siblings.to_vec(),
            path_indices.to_vec(),
        );
        self.submit("updateIdentity", call).await
    }

    async fn update_cred_admin(
        &self,
        cred_id: U256,
        new_admin: Address,
    ) -> CredsResult<LedgerReceipt> {
        let call = self.writer()?.update_cred_admin(cred_id, new_admin);
        self.submit("updateCredAdmin", call).await
    }

    async fn verify_proof(&self, submission: &ProofSubmission) -> CredsResult<LedgerReceipt> {
        submission.check_binding()?;
        let call = self.writer()?.verify_proof(
            submission.cred_id,
            submission.merkle_root,
            submission.signal,
            submission.nullifier_hash,
            submission.external_nullifier,
            submission.proof,
        );
        self.submit("verifyProof", call).await
    }

    async fn merkle_tree_root(&self, cred_id: U256) -> CredsResult<U256> {
        self.existing_depth(cred_id).await?;
        self.reader()
            .get_merkle_tree_root(cred_id)
            .call()
            .await
            .map_err(|e| map_contract_error("getMerkleTreeRoot", e))
    }

    async fn merkle_tree_depth(&self, cred_id: U256) -> CredsResult<usize> {
        self.existing_depth(cred_id).await
    }

    async fn number_of_leaves(&self, cred_id: U256) -> CredsResult<u64> {
        self.existing_depth(cred_id).await?;
        let leaves = self
            .reader()
            .get_number_of_merkle_tree_leaves(cred_id)
            .call()
            .await
            .map_err(|e| map_contract_error("getNumberOfMerkleTreeLeaves", e))?;
        Ok(leaves.low_u64())
    }

    async fn cred(&self, cred_id: U256) -> CredsResult<CredInfo> {
        self.existing_depth(cred_id).await?;
        let (admin, uri, duration) = self
            .reader()
            .creds(cred_id)
            .call()
            .await
            .map_err(|e| map_contract_error("creds", e))?;
        let secs = u64::try_from(duration).unwrap_or(u64::MAX);
        Ok(CredInfo {
            admin,
            uri,
            root_history_duration: Duration::from_secs(secs),
        })
    }

    async fn verifier(&self, merkle_tree_depth: usize) -> CredsResult<Address> {
        self.reader()
            .verifiers(U256::from(merkle_tree_depth))
            .call()
            .await
            .map_err(|e| map_contract_error("verifiers", e))
    }

    /// `NullifierHashAdded` is not indexed by credential and is left out.
    async fn group_events(&self, cred_id: U256) -> CredsResult<Vec<CredEvent>> {
        let events = self
            .reader()
            .events()
            .from_block(self.config.from_block)
            .query()
            .await
            .map_err(|e| map_contract_error("eth_getLogs", e))?;

        Ok(events
            .into_iter()
            .map(CredEvent::from)
            .filter(|event| event.cred_id() == Some(cred_id))
            .collect())
    }
}
