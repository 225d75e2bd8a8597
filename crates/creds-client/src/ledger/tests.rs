use super::*;
use crate::field::fr_to_u256;
use crate::test_support::{generator, DEPTH};
use ark_bn254::Fr;
use creds_crypto::{format_bytes32, Group, Identity};
use creds_types::CredsError;
use ethers::types::{Address, U256};
use std::sync::Arc;
use std::time::Duration;

fn admin() -> Address {
    Address::repeat_byte(0xa1)
}

fn stranger() -> Address {
    Address::repeat_byte(0x5e)
}

fn ledger_with_clock(clock: Arc<dyn Clock>) -> LocalLedger {
    LocalLedger::builder()
        .verifier(generator().verifier())
        .clock(clock)
        .build(admin())
}

fn ledger() -> LocalLedger {
    ledger_with_clock(Arc::new(SystemClock))
}

fn signal() -> [u8; 32] {
    format_bytes32("Hello World").unwrap()
}

async fn create(ledger: &LocalLedger, cred_id: u64) -> Group {
    ledger
        .create_cred(U256::from(cred_id), DEPTH, U256::zero(), admin(), "Cred URI")
        .await
        .unwrap();
    Group::new(DEPTH, Fr::from(0u64)).unwrap()
}

async fn add(ledger: &LocalLedger, group: &mut Group, cred_id: u64, identity: &Identity) {
    let commitment = identity.commitment();
    ledger
        .add_identity(U256::from(cred_id), fr_to_u256(&commitment))
        .await
        .unwrap();
    group.add_member(commitment).unwrap();
}

fn submission(cred_id: u64, group: &Group, identity: &Identity) -> ProofSubmission {
    let full = generator()
        .generate(identity, group, Fr::from(cred_id), &signal())
        .unwrap();
    ProofSubmission::new(U256::from(cred_id), signal(), &full)
}

#[tokio::test]
async fn test_create_and_views() {
    let ledger = ledger();
    let receipt = ledger
        .create_cred(U256::from(42u64), DEPTH, U256::zero(), admin(), "Cred URI")
        .await
        .unwrap();
    assert_eq!(receipt.events[0].name(), "CredCreated");

    let empty = Group::new(DEPTH, Fr::from(0u64)).unwrap();
    let id = U256::from(42u64);
    assert_eq!(ledger.merkle_tree_root(id).await.unwrap(), fr_to_u256(&empty.root()));
    assert_eq!(ledger.merkle_tree_depth(id).await.unwrap(), DEPTH);
    assert_eq!(ledger.number_of_leaves(id).await.unwrap(), 0);

    let info = ledger.cred(id).await.unwrap();
    assert_eq!(info.admin, admin());
    assert_eq!(info.uri, "Cred URI");
    assert_eq!(info.root_history_duration, Duration::from_secs(3_600));
    assert!(!ledger.verifier(DEPTH).await.unwrap().is_zero());
    assert!(ledger.verifier(16).await.unwrap().is_zero());
}

#[tokio::test]
async fn test_create_rejections() {
    let ledger = ledger();
    create(&ledger, 1).await;

    let again = ledger
        .create_cred(U256::from(1u64), DEPTH, U256::zero(), admin(), "")
        .await;
    assert_eq!(again.unwrap_err(), CredsError::CredAlreadyExists);

    let depth = ledger
        .create_cred(U256::from(2u64), 16, U256::zero(), admin(), "")
        .await;
    assert_eq!(depth.unwrap_err(), CredsError::DepthUnsupported(16));

    let big = ledger
        .create_cred(crate::field::snark_scalar_field(), DEPTH, U256::zero(), admin(), "")
        .await;
    assert_eq!(big.unwrap_err(), CredsError::IdExceedsFieldModulus);

    assert_eq!(
        ledger.merkle_tree_root(U256::from(3u64)).await.unwrap_err(),
        CredsError::CredNotFound
    );
}

#[tokio::test]
async fn test_verify_then_replay() {
    let ledger = ledger();
    let mut group = create(&ledger, 42).await;
    let user1 = Identity::from_secret(b"user-1");
    add(&ledger, &mut group, 42, &user1).await;

    let proof = submission(42, &group, &user1);
    let receipt = ledger.verify_proof(&proof).await.unwrap();
    let names: Vec<&str> = receipt.events.iter().map(CredEvent::name).collect();
    assert_eq!(names, vec!["NullifierHashAdded", "ProofVerified"]);

    let replay = ledger.verify_proof(&proof).await;
    assert_eq!(replay.unwrap_err(), CredsError::NullifierReused);
}

#[tokio::test]
async fn test_external_nullifier_bound_to_cred_id() {
    let ledger = ledger();
    let mut group = create(&ledger, 42).await;
    let user = Identity::from_secret(b"user-1");
    add(&ledger, &mut group, 42, &user).await;

    let other_scope = generator()
        .generate(&user, &group, Fr::from(4242u64), &signal())
        .unwrap();
    let detached = ProofSubmission::new(U256::from(42u64), signal(), &other_scope);
    assert_eq!(
        ledger.verify_proof(&detached).await.unwrap_err(),
        CredsError::ExternalNullifierMismatch
    );

    let bound = submission(42, &group, &user);
    ledger.verify_proof(&bound).await.unwrap();
    assert_eq!(
        ledger.verify_proof(&detached).await.unwrap_err(),
        CredsError::ExternalNullifierMismatch
    );
    assert_eq!(
        ledger.verify_proof(&bound).await.unwrap_err(),
        CredsError::NullifierReused
    );
}

#[tokio::test]
async fn test_non_member_cannot_prove() {
    let ledger = ledger();
    let mut group = create(&ledger, 5).await;
    add(&ledger, &mut group, 5, &Identity::from_secret(b"member")).await;

    let outsider = Identity::from_secret(b"outsider");
    let result = generator().generate(&outsider, &group, Fr::from(5u64), &signal());
    assert_eq!(result.unwrap_err(), CredsError::IdentityNotInGroup);
}

#[tokio::test]
async fn test_tampered_signal_does_not_spend_nullifier() {
    let ledger = ledger();
    let mut group = create(&ledger, 6).await;
    let user = Identity::from_secret(b"user");
    add(&ledger, &mut group, 6, &user).await;

    let valid = submission(6, &group, &user);
    let mut tampered = valid.clone();
    tampered.signal = format_bytes32("Goodbye").unwrap();

    assert_eq!(
        ledger.verify_proof(&tampered).await.unwrap_err(),
        CredsError::InvalidProof
    );
    assert!(ledger.verify_proof(&valid).await.is_ok());
}

#[tokio::test]
async fn test_root_window() {
    let clock = ManualClock::new(1_000);
    let ledger = ledger_with_clock(Arc::new(clock.clone()));
    let mut group = create(&ledger, 7).await;
    let user = Identity::from_secret(b"early");
    add(&ledger, &mut group, 7, &user).await;
    let old_root_proof = submission(7, &group, &user);

    clock.advance(Duration::from_secs(10));
    add(&ledger, &mut group, 7, &Identity::from_secret(b"late")).await;

    clock.advance(Duration::from_secs(3_600));
    assert_eq!(
        ledger.verify_proof(&old_root_proof).await.unwrap_err(),
        CredsError::RootExpired
    );

    let mut unknown = old_root_proof.clone();
    unknown.merkle_root = U256::from(12345u64);
    assert_eq!(
        ledger.verify_proof(&unknown).await.unwrap_err(),
        CredsError::RootUnknown
    );

    // A proof against the current root is fine however much time passes.
    clock.advance(Duration::from_secs(86_400));
    let fresh = submission(7, &group, &user);
    assert!(ledger.verify_proof(&fresh).await.is_ok());
}

#[tokio::test]
async fn test_creation_root_unknown_after_first_add() {
    let ledger = ledger();
    let mut group = create(&ledger, 11).await;
    let empty_root = fr_to_u256(&group.root());
    let user = Identity::from_secret(b"first");
    add(&ledger, &mut group, 11, &user).await;

    let mut proof = submission(11, &group, &user);
    proof.merkle_root = empty_root;
    assert_eq!(
        ledger.verify_proof(&proof).await.unwrap_err(),
        CredsError::RootUnknown
    );
}

#[tokio::test]
async fn test_recent_root_still_accepted() {
    let clock = ManualClock::new(0);
    let ledger = ledger_with_clock(Arc::new(clock.clone()));
    let mut group = create(&ledger, 8).await;
    let user = Identity::from_secret(b"user");
    add(&ledger, &mut group, 8, &user).await;
    let proof = submission(8, &group, &user);

    add(&ledger, &mut group, 8, &Identity::from_secret(b"other")).await;
    clock.advance(Duration::from_secs(3_600));
    assert!(ledger.verify_proof(&proof).await.is_ok());
}

#[tokio::test]
async fn test_non_admin_changes_nothing() {
    let ledger = ledger();
    create(&ledger, 9).await;
    let root = ledger.merkle_tree_root(U256::from(9u64)).await.unwrap();

    let other = ledger.connect(stranger());
    let result = other.add_identity(U256::from(9u64), U256::from(77u64)).await;
    assert_eq!(result.unwrap_err(), CredsError::NotAdmin);
    let result = other.update_cred_admin(U256::from(9u64), stranger()).await;
    assert_eq!(result.unwrap_err(), CredsError::NotAdmin);

    assert_eq!(ledger.merkle_tree_root(U256::from(9u64)).await.unwrap(), root);
    assert_eq!(ledger.number_of_leaves(U256::from(9u64)).await.unwrap(), 0);
    assert_eq!(ledger.cred(U256::from(9u64)).await.unwrap().admin, admin());
}

#[tokio::test]
async fn test_admin_transfer() {
    let ledger = ledger();
    create(&ledger, 10).await;
    let id = U256::from(10u64);

    let receipt = ledger.update_cred_admin(id, stranger()).await.unwrap();
    assert_eq!(
        receipt.events,
        vec![CredEvent::CredAdminUpdated {
            cred_id: id,
            old_admin: admin(),
            new_admin: stranger(),
        }]
    );
    assert_eq!(
        ledger.add_identity(id, U256::from(1u64)).await.unwrap_err(),
        CredsError::NotAdmin
    );
    assert!(ledger
        .connect(stranger())
        .add_identity(id, U256::from(1u64))
        .await
        .is_ok());
}

#[tokio::test]
async fn test_duplicate_and_zero_commitments() {
    let ledger = ledger();
    create(&ledger, 11).await;
    let id = U256::from(11u64);

    ledger.add_identity(id, U256::from(5u64)).await.unwrap();
    assert_eq!(
        ledger.add_identity(id, U256::from(5u64)).await.unwrap_err(),
        CredsError::DuplicateMember
    );
    assert!(matches!(
        ledger.add_identity(id, U256::zero()).await.unwrap_err(),
        CredsError::InvalidCommitment(_)
    ));
    assert_eq!(
        ledger
            .add_identities(id, &[U256::from(6u64), U256::from(6u64)])
            .await
            .unwrap_err(),
        CredsError::DuplicateMember
    );
    assert_eq!(ledger.number_of_leaves(id).await.unwrap(), 1);
}

#[tokio::test]
async fn test_stale_path_rejected() {
    let ledger = ledger();
    let mut group = create(&ledger, 12).await;
    let id = U256::from(12u64);
    let first = Identity::from_secret(b"first");
    add(&ledger, &mut group, 12, &first).await;

    let stale = group.path_for(&first.commitment()).unwrap();
    add(&ledger, &mut group, 12, &Identity::from_secret(b"second")).await;

    let result = ledger
        .remove_identity(
            id,
            fr_to_u256(&first.commitment()),
            &path_siblings(&stale),
            &stale.path_indices,
        )
        .await;
    assert_eq!(result.unwrap_err(), CredsError::StaleOrInvalidPath);

    let fresh = group.path_for(&first.commitment()).unwrap();
    let receipt = ledger
        .remove_identity(
            id,
            fr_to_u256(&first.commitment()),
            &path_siblings(&fresh),
            &fresh.path_indices,
        )
        .await
        .unwrap();
    group.remove_member(&first.commitment()).unwrap();
    assert_eq!(receipt.last_root(), Some(fr_to_u256(&group.root())));
    // Removal keeps the leaf slot.
    assert_eq!(ledger.number_of_leaves(id).await.unwrap(), 2);
}

#[tokio::test]
async fn test_removed_member_cannot_prove_against_new_root() {
    let ledger = ledger();
    let ledger = Arc::new(ledger);
    let (mut cred, _) =
        MirroredCred::create(ledger.clone(), U256::from(13u64), DEPTH, Fr::from(0u64), admin(), "")
            .await
            .unwrap();
    let user = Identity::from_secret(b"leaver");
    cred.add_identity(user.commitment()).await.unwrap();
    cred.remove_identity(user.commitment()).await.unwrap();

    let result = generator().generate(&user, cred.group(), Fr::from(13u64), &signal());
    assert_eq!(result.unwrap_err(), CredsError::IdentityNotInGroup);
}

#[tokio::test]
async fn test_mirror_tracks_ledger() {
    let ledger = Arc::new(ledger());
    let id = U256::from(14u64);
    let (mut cred, _) = MirroredCred::create(ledger.clone(), id, DEPTH, Fr::from(0u64), admin(), "")
        .await
        .unwrap();

    let members: Vec<Fr> = (1..=4u64).map(Fr::from).collect();
    cred.add_identities(&members).await.unwrap();
    cred.remove_identity(members[1]).await.unwrap();
    cred.update_identity(members[2], Fr::from(40u64)).await.unwrap();

    // Rejected locally before anything is submitted.
    assert_eq!(
        cred.add_identity(members[0]).await.unwrap_err(),
        CredsError::DuplicateMember
    );

    assert_eq!(
        ledger.merkle_tree_root(id).await.unwrap(),
        fr_to_u256(&cred.group().root())
    );

    let synced = sync_group(ledger.as_ref(), id).await.unwrap();
    assert_eq!(synced.root(), cred.group().root());
    assert_eq!(synced.member_count(), 3);

    let attached = MirroredCred::attach(ledger.clone(), id).await.unwrap();
    assert_eq!(attached.group().root(), cred.group().root());
}

#[tokio::test]
async fn test_mirror_reports_diverged_root() {
    let ledger = Arc::new(ledger());
    let id = U256::from(16u64);
    let (mut cred, _) = MirroredCred::create(ledger.clone(), id, DEPTH, Fr::from(0u64), admin(), "")
        .await
        .unwrap();

    // Added behind the mirror's back.
    ledger.add_identity(id, U256::from(77u64)).await.unwrap();

    let err = cred.add_identity(Fr::from(78u64)).await.unwrap_err();
    assert!(matches!(err, CredsError::RootMismatch { .. }), "{:?}", err);
    assert_eq!(cred.group().member_count(), 0);

    cred.refresh().await.unwrap();
    assert_eq!(cred.group().member_count(), 2);
    assert_eq!(
        ledger.merkle_tree_root(id).await.unwrap(),
        fr_to_u256(&cred.group().root())
    );
}

#[tokio::test]
async fn test_mirror_proof_flow() {
    let ledger = Arc::new(ledger());
    let id = U256::from(15u64);
    let (mut cred, _) = MirroredCred::create(ledger.clone(), id, DEPTH, Fr::from(0u64), admin(), "")
        .await
        .unwrap();
    let user = Identity::from_secret(b"mirror-user");
    cred.add_identity(user.commitment()).await.unwrap();

    let full = generator()
        .generate(&user, cred.group(), Fr::from(15u64), &signal())
        .unwrap();
    let receipt = cred.submit_proof(signal(), &full).await.unwrap();
    assert!(receipt
        .events
        .iter()
        .any(|e| matches!(e, CredEvent::ProofVerified { .. })));
}

#[tokio::test]
async fn test_independent_creds_in_parallel() {
    let ledger = ledger();
    let tasks = (100..108u64).map(|cred_id| {
        let ledger = ledger.clone();
        tokio::spawn(async move {
            let id = U256::from(cred_id);
            ledger
                .create_cred(id, DEPTH, U256::zero(), admin(), "")
                .await
                .unwrap();
            for n in 1..=3u64 {
                ledger
                    .add_identity(id, U256::from(cred_id * 10 + n))
                    .await
                    .unwrap();
            }
            ledger.number_of_leaves(id).await.unwrap()
        })
    });

    for count in futures::future::join_all(tasks).await {
        assert_eq!(count.unwrap(), 3);
    }
}

#[tokio::test]
async fn test_tx_hashes_distinct() {
    let ledger = ledger();
    let a = ledger
        .create_cred(U256::from(20u64), DEPTH, U256::zero(), admin(), "")
        .await
        .unwrap();
    let b = ledger
        .create_cred(U256::from(21u64), DEPTH, U256::zero(), admin(), "")
        .await
        .unwrap();
    assert_ne!(a.tx_hash, b.tx_hash);
}
