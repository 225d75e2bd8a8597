use super::*;
use rand::{rngs::StdRng, SeedableRng};
use std::sync::OnceLock;

const TEST_DEPTH: usize = 4;

static ARTIFACTS: OnceLock<Arc<ProvingArtifacts>> = OnceLock::new();

fn generator() -> ProofGenerator {
    let artifacts = ARTIFACTS.get_or_init(|| {
        let mut rng = StdRng::seed_from_u64(2024);
        Arc::new(ProvingArtifacts::setup(TEST_DEPTH, &mut rng).unwrap())
    });
    ProofGenerator::from_shared(artifacts.clone())
}

fn group_with(members: &[&Identity]) -> Group {
    let mut group = Group::new(TEST_DEPTH, Fr::from(0u64)).unwrap();
    group.add_member(Fr::from(99u64)).unwrap();
    for member in members {
        group.add_member(member.commitment()).unwrap();
    }
    group
}

#[test]
fn test_proof_verifies() {
    let identity = Identity::from_secret(b"prover-a");
    let group = group_with(&[&identity]);
    let prover = generator();

    let full = prover
        .generate(&identity, &group, Fr::from(42u64), b"Hello World")
        .unwrap();

    assert_eq!(full.public_signals.merkle_root, group.root());
    assert_eq!(full.public_signals.signal_hash, hash_to_field(b"Hello World"));
    assert!(prover.verify(&full).unwrap());
}

#[test]
fn test_nullifier_hash_stable_per_identity() {
    let a = Identity::from_secret(b"prover-a");
    let b = Identity::from_secret(b"prover-b");
    let group = group_with(&[&a, &b]);
    let prover = generator();

    let first = prover.generate(&a, &group, Fr::from(42u64), b"one").unwrap();
    let second = prover.generate(&a, &group, Fr::from(42u64), b"two").unwrap();
    let other = prover.generate(&b, &group, Fr::from(42u64), b"one").unwrap();

    assert_eq!(
        first.public_signals.nullifier_hash,
        second.public_signals.nullifier_hash
    );
    assert_ne!(
        first.public_signals.nullifier_hash,
        other.public_signals.nullifier_hash
    );
}

#[test]
fn test_non_member_rejected_before_proving() {
    let member = Identity::from_secret(b"member");
    let outsider = Identity::from_secret(b"outsider");
    let group = group_with(&[&member]);

    let err = ProofRequest::new(&outsider, &group, Fr::from(1u64), b"x").unwrap_err();
    assert_eq!(err, CredsError::IdentityNotInGroup);
}

#[test]
fn test_depth_mismatch() {
    let identity = Identity::from_secret(b"deep");
    let mut group = Group::new(TEST_DEPTH + 1, Fr::from(0u64)).unwrap();
    group.add_member(identity.commitment()).unwrap();

    let err = generator()
        .generate(&identity, &group, Fr::from(1u64), b"x")
        .unwrap_err();
    assert_eq!(err, CredsError::DepthUnsupported(TEST_DEPTH + 1));
}

#[test]
fn test_tampered_signal_fails() {
    let identity = Identity::from_secret(b"tamper");
    let group = group_with(&[&identity]);
    let prover = generator();

    let mut full = prover.generate(&identity, &group, Fr::from(7u64), b"yes").unwrap();
    full.public_signals.signal_hash = hash_to_field(b"no");
    assert!(!prover.verify(&full).unwrap());

    full.public_signals.signal_hash = hash_to_field(b"yes");
    full.public_signals.external_nullifier = Fr::from(8u64);
    assert!(!prover.verify(&full).unwrap());
}

#[test]
fn test_full_proof_json() {
    let identity = Identity::from_secret(b"json");
    let group = group_with(&[&identity]);
    let prover = generator();

    let full = prover.generate(&identity, &group, Fr::from(3u64), b"s").unwrap();
    let json = serde_json::to_string(&full).unwrap();
    let back: FullProof = serde_json::from_str(&json).unwrap();
    assert_eq!(full, back);
    assert!(prover.verify(&back).unwrap());
}

#[test]
fn test_save_and_load() {
    let dir = std::env::temp_dir().join(format!("creds-keys-{}", rand::random::<u64>()));
    let artifacts = ARTIFACTS.get_or_init(|| {
        let mut rng = StdRng::seed_from_u64(2024);
        Arc::new(ProvingArtifacts::setup(TEST_DEPTH, &mut rng).unwrap())
    });

    let (pk_path, vk_path) = artifacts.save(&dir).unwrap();
    assert!(pk_path.ends_with(proving_key_file(TEST_DEPTH)));

    let loaded = ProvingArtifacts::load(&dir, TEST_DEPTH).unwrap();
    assert_eq!(loaded.vk_fingerprint().unwrap(), artifacts.vk_fingerprint().unwrap());

    let verifier = MembershipVerifier::from_vk_file(TEST_DEPTH, &vk_path).unwrap();
    let identity = Identity::from_secret(b"loaded");
    let group = group_with(&[&identity]);
    let full = ProofGenerator::new(loaded)
        .generate(&identity, &group, Fr::from(5u64), b"s")
        .unwrap();
    assert!(verifier.verify(&full.public_signals, &full.proof).unwrap());

    std::fs::remove_dir_all(&dir).ok();
}

#[test]
fn test_unsupported_setup_depth() {
    let mut rng = StdRng::seed_from_u64(1);
    assert!(matches!(
        ProvingArtifacts::setup(0, &mut rng),
        Err(CredsError::DepthUnsupported(0))
    ));
}

#[tokio::test]
async fn test_batch_generation() {
    let a = Identity::from_secret(b"batch-a");
    let b = Identity::from_secret(b"batch-b");
    let group = group_with(&[&a, &b]);
    let prover = generator();

    let requests = vec![
        ProofRequest::new(&a, &group, Fr::from(11u64), b"a").unwrap(),
        ProofRequest::new(&b, &group, Fr::from(11u64), b"b").unwrap(),
    ];
    let results = prover.generate_batch(requests).await;

    assert_eq!(results.len(), 2);
    for result in &results {
        let full = result.as_ref().unwrap();
        assert!(prover.verify(full).unwrap());
    }
    assert_eq!(
        results[0].as_ref().unwrap().public_signals.nullifier_hash,
        a.nullifier_hash(Fr::from(11u64))
    );
}
