use super::*;
use super::bindings::{CredAdminUpdatedFilter, IdentityAddedFilter};
use crate::config::ClientConfig;
use crate::ledger::CredEvent;
use creds_types::{CredsError, EthAddress};
use ethers::types::{Address, U256};
use std::collections::HashMap;
use std::time::Duration;

// Two-byte prefix, one 20-byte placeholder, two-byte suffix.
const LINKED_ARTIFACT: &str = r#"{
    "contractName": "IncrementalBinaryTree",
    "abi": [],
    "bytecode": "0x6080__$0123456789abcdef0123456789abcdef01$__6001",
    "linkReferences": {
        "contracts/Hashes.sol": {
            "PoseidonT3": [{ "start": 2, "length": 20 }]
        }
    }
}"#;

#[test]
fn test_contract_config_default() {
    let config = ContractConfig::default();
    assert_eq!(config.chain_id, 31337);
    assert!(config.rpc_url.contains("localhost"));
    assert!(config.credential_address.is_none());
}

#[test]
fn test_contract_config_from_client() {
    let mut client = ClientConfig::default();
    client.network.fee_rpc_url = Some("https://fees.example.org".into());
    client.network.confirmation_timeout_secs = 30;
    client.ledger.credential_contract = Some(EthAddress::from_bytes([7; 20]));

    let config = ContractConfig::from(&client);
    assert_eq!(config.fee_rpc_url, "https://fees.example.org");
    assert_eq!(config.confirmation_timeout, Duration::from_secs(30));
    assert_eq!(config.credential_address, Some(EthAddress::from_bytes([7; 20])));
}

#[test]
fn test_artifact_linking() {
    let artifact = HardhatArtifact::from_json(LINKED_ARTIFACT).unwrap();
    assert_eq!(artifact.required_libraries(), vec!["PoseidonT3"]);

    let unlinked = artifact.link(&HashMap::new());
    assert!(matches!(unlinked, Err(CredsError::Config(_))));

    let mut libraries = HashMap::new();
    libraries.insert(POSEIDON_LIBRARY.to_string(), Address::repeat_byte(0xaa));
    let code = artifact.link(&libraries).unwrap();

    assert_eq!(code.len(), 24);
    assert_eq!(&code[..2], &[0x60, 0x80]);
    assert_eq!(&code[2..22], &[0xaa; 20]);
    assert_eq!(&code[22..], &[0x60, 0x01]);
}

#[test]
fn test_artifact_without_libraries() {
    let json = r#"{ "abi": [], "bytecode": "0x600160005260206000f3" }"#;
    let artifact = HardhatArtifact::from_json(json).unwrap();
    assert!(artifact.required_libraries().is_empty());
    assert_eq!(artifact.link(&HashMap::new()).unwrap().len(), 10);
}

#[test]
fn test_verifier_contract_name() {
    assert_eq!(verifier_contract(20), "Verifier20");
}

#[test]
fn test_event_conversion() {
    let added = CredentialEvents::IdentityAddedFilter(IdentityAddedFilter {
        cred_id: U256::from(42u64),
        index: U256::zero(),
        identity_commitment: U256::from(5u64),
        merkle_tree_root: U256::from(9u64),
    });
    let event = CredEvent::from(added);
    assert_eq!(event.cred_id(), Some(U256::from(42u64)));
    assert_eq!(event.merkle_tree_root(), Some(U256::from(9u64)));

    let admin = CredentialEvents::CredAdminUpdatedFilter(CredAdminUpdatedFilter {
        cred_id: U256::from(1u64),
        old_admin: Address::zero(),
        new_admin: Address::repeat_byte(1),
    });
    assert_eq!(CredEvent::from(admin).name(), "credAdminUpdated");
}

#[test]
fn test_rpc_client_creation() {
    let client = RpcClient::new("http://localhost:8545").unwrap();
    assert_eq!(client.url(), "http://localhost:8545");
    assert!(FeeOracle::new("http://localhost:8545").is_ok());
}
