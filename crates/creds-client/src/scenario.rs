//! End-to-end membership walkthrough against any [`CredentialLedger`].
//!
//! Creates a credential, enrolls one of two fresh identities, proves and
//! verifies a signal for the member, then checks that the non-member cannot
//! prove and that resubmitting the member's proof is refused.

use crate::field::{fr_to_u256, u256_to_fr};
use crate::ledger::{CredentialLedger, MirroredCred};
use ark_bn254::Fr;
use creds_crypto::{format_bytes32, fr_short_hex, Identity, ProofGenerator, ProofRequest};
use creds_types::{CredsError, CredsResult, DEFAULT_CRED_URI, DEFAULT_MERKLE_TREE_DEPTH, DEFAULT_SIGNAL};
use ethers::types::{Address, H256, U256};
use std::sync::Arc;
use tracing::{info, warn};

#[derive(Clone, Debug)]
pub struct ScenarioParams {
    pub cred_id: U256,
    pub merkle_tree_depth: usize,
    pub admin: Address,
    pub signal: String,
    pub uri: String,
}

impl ScenarioParams {
    pub fn new(cred_id: U256, admin: Address) -> Self {
        Self {
            cred_id,
            merkle_tree_depth: DEFAULT_MERKLE_TREE_DEPTH,
            admin,
            signal: DEFAULT_SIGNAL.to_string(),
            uri: DEFAULT_CRED_URI.to_string(),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum StepOutcome {
    Accepted(H256),
    Rejected(CredsError),
}

impl StepOutcome {
    pub fn is_accepted(&self) -> bool {
        matches!(self, StepOutcome::Accepted(_))
    }

    pub fn rejection(&self) -> Option<&CredsError> {
        match self {
            StepOutcome::Rejected(e) => Some(e),
            StepOutcome::Accepted(_) => None,
        }
    }

    fn to_json(&self) -> serde_json::Value {
        match self {
            StepOutcome::Accepted(tx) => serde_json::json!({ "accepted": true, "tx_hash": format!("{:?}", tx) }),
            StepOutcome::Rejected(e) => serde_json::json!({ "accepted": false, "error": e.to_string() }),
        }
    }
}

#[derive(Clone, Debug)]
pub struct ScenarioReport {
    pub cred_id: U256,
    pub create_tx: H256,
    pub member_commitment: U256,
    pub merkle_root: U256,
    pub member_proof: StepOutcome,
    pub non_member_proof: StepOutcome,
    pub replayed_proof: StepOutcome,
}

impl ScenarioReport {
    /// Member accepted, non-member refused, replay refused as a reuse.
    pub fn is_expected(&self) -> bool {
        self.member_proof.is_accepted()
            && self.non_member_proof.rejection() == Some(&CredsError::IdentityNotInGroup)
            && self.replayed_proof.rejection() == Some(&CredsError::NullifierReused)
    }

    pub fn to_json(&self) -> serde_json::Value {
        serde_json::json!({
            "cred_id": self.cred_id.to_string(),
            "create_tx": format!("{:?}", self.create_tx),
            "member_commitment": self.member_commitment.to_string(),
            "merkle_root": self.merkle_root.to_string(),
            "member_proof": self.member_proof.to_json(),
            "non_member_proof": self.non_member_proof.to_json(),
            "replayed_proof": self.replayed_proof.to_json(),
            "as_expected": self.is_expected(),
        })
    }
}

pub async fn run_scenario<L>(
    ledger: Arc<L>,
    generator: &ProofGenerator,
    params: &ScenarioParams,
) -> CredsResult<ScenarioReport>
where
    L: CredentialLedger + ?Sized,
{
    if generator.depth() != params.merkle_tree_depth {
        return Err(CredsError::DepthUnsupported(params.merkle_tree_depth));
    }
    let external_nullifier = u256_to_fr(params.cred_id).ok_or(CredsError::IdExceedsFieldModulus)?;
    let signal = format_bytes32(&params.signal)?;

    let (mut cred, created) = MirroredCred::create(
        ledger,
        params.cred_id,
        params.merkle_tree_depth,
        Fr::from(0u64),
        params.admin,
        &params.uri,
    )
    .await?;

    let member = Identity::new();
    let outsider = Identity::new();
    info!("Adding identity {}", fr_short_hex(&member.commitment()));
    cred.add_identity(member.commitment()).await?;

    let request = ProofRequest::new(&member, cred.group(), external_nullifier, &signal)?;
    let proof = generator.generate_async(request).await?;
    let verified = cred.submit_proof(signal, &proof).await?;
    info!("Proof of identity {} verified", fr_short_hex(&member.commitment()));

    let non_member_proof =
        match ProofRequest::new(&outsider, cred.group(), external_nullifier, &signal) {
            Ok(request) => {
                let proof = generator.generate_async(request).await?;
                match cred.submit_proof(signal, &proof).await {
                    Ok(receipt) => StepOutcome::Accepted(receipt.tx_hash),
                    Err(e) => StepOutcome::Rejected(e),
                }
            }
            Err(e) => StepOutcome::Rejected(e),
        };
    if let Some(e) = non_member_proof.rejection() {
        warn!("Proof for identity {} rejected: {}", fr_short_hex(&outsider.commitment()), e);
    }

    let replayed_proof = match cred.submit_proof(signal, &proof).await {
        Ok(receipt) => StepOutcome::Accepted(receipt.tx_hash),
        Err(e) => {
            warn!("Resubmitted proof rejected: {}", e);
            StepOutcome::Rejected(e)
        }
    };

    Ok(ScenarioReport {
        cred_id: params.cred_id,
        create_tx: created.tx_hash,
        member_commitment: fr_to_u256(&member.commitment()),
        merkle_root: fr_to_u256(&cred.group().root()),
        member_proof: StepOutcome::Accepted(verified.tx_hash),
        non_member_proof,
        replayed_proof,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ledger::LocalLedger;
    use crate::test_support::{generator, DEPTH};

    fn admin() -> Address {
        Address::repeat_byte(0xad)
    }

    #[tokio::test]
    async fn test_scenario_on_local_ledger() {
        let ledger = Arc::new(
            LocalLedger::builder()
                .verifier(generator().verifier())
                .build(admin()),
        );
        let params = ScenarioParams::new(U256::from(42u64), admin());

        let report = run_scenario(ledger.clone(), &generator(), &params).await.unwrap();

        assert!(report.is_expected(), "{:?}", report);
        assert_eq!(
            report.replayed_proof,
            StepOutcome::Rejected(CredsError::NullifierReused)
        );
        assert_eq!(ledger.number_of_leaves(U256::from(42u64)).await.unwrap(), 1);
        assert_eq!(
            ledger.merkle_tree_root(U256::from(42u64)).await.unwrap(),
            report.merkle_root
        );
        assert_eq!(report.to_json()["as_expected"], serde_json::json!(true));
    }

    #[tokio::test]
    async fn test_scenario_requires_admin_caller() {
        let ledger = Arc::new(
            LocalLedger::builder()
                .verifier(generator().verifier())
                .build(Address::repeat_byte(0x01)),
        );
        let params = ScenarioParams::new(U256::from(43u64), admin());

        let result = run_scenario(ledger, &generator(), &params).await;
        assert_eq!(result.unwrap_err(), CredsError::NotAdmin);
    }

    #[tokio::test]
    async fn test_scenario_depth_mismatch() {
        let ledger = Arc::new(LocalLedger::builder().build(admin()));
        let mut params = ScenarioParams::new(U256::from(44u64), admin());
        params.merkle_tree_depth = DEPTH - 1;

        let result = run_scenario(ledger, &generator(), &params).await;
        assert_eq!(result.unwrap_err(), CredsError::DepthUnsupported(DEPTH - 1));
    }

    #[test]
    fn test_signal_too_long() {
        let long = "x".repeat(40);
        assert!(format_bytes32(&long).is_err());
    }
}
