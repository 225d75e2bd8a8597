use creds_crypto::{ProofGenerator, ProvingArtifacts};
use creds_types::DEFAULT_MERKLE_TREE_DEPTH;
use rand::{rngs::StdRng, SeedableRng};
use std::sync::{Arc, OnceLock};

pub const DEPTH: usize = DEFAULT_MERKLE_TREE_DEPTH;

static ARTIFACTS: OnceLock<Arc<ProvingArtifacts>> = OnceLock::new();

/// Depth-20 keys, set up once per test binary.
pub fn generator() -> ProofGenerator {
    let artifacts = ARTIFACTS.get_or_init(|| {
        let mut rng = StdRng::seed_from_u64(7);
        Arc::new(ProvingArtifacts::setup(DEPTH, &mut rng).unwrap())
    });
    ProofGenerator::from_shared(artifacts.clone())
}
