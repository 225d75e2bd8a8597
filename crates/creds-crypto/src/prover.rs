use ark_bn254::{Bn254, Fr};
use ark_groth16::{Groth16, PreparedVerifyingKey, Proof, ProvingKey, VerifyingKey};
use ark_serialize::{CanonicalDeserialize, CanonicalSerialize};
use ark_snark::SNARK;
use ark_std::rand::{thread_rng, CryptoRng, RngCore};
use base64::{engine::general_purpose::STANDARD as BASE64, Engine};
use creds_types::{is_supported_depth, CredsError, CredsResult};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, info, warn};

use crate::circuit::{MembershipCircuit, PublicSignals};
use crate::field::{fr_short_hex, hash_to_field};
use crate::group::{Group, MerklePath};
use crate::identity::Identity;

pub fn proving_key_file(depth: usize) -> String {
    format!("membership-{}.pk.bin", depth)
}

pub fn verifying_key_file(depth: usize) -> String {
    format!("membership-{}.vk.bin", depth)
}

/// Groth16 keys for one tree depth.
pub struct ProvingArtifacts {
    depth: usize,
    proving_key: ProvingKey<Bn254>,
    verifying_key: VerifyingKey<Bn254>,
    prepared: PreparedVerifyingKey<Bn254>,
}

impl ProvingArtifacts {
    /// Circuit-specific trusted setup. Slow for deep trees.
    pub fn setup<R: RngCore + CryptoRng>(depth: usize, rng: &mut R) -> CredsResult<Self> {
        if !is_supported_depth(depth) {
            return Err(CredsError::DepthUnsupported(depth));
        }

        info!("Generating membership keys for depth {} (this may take a while)...", depth);
        let started = Instant::now();

        let (proving_key, verifying_key) =
            Groth16::<Bn254>::circuit_specific_setup(MembershipCircuit::empty(depth), rng)
                .map_err(|e| CredsError::Crypto(format!("Failed to generate keys: {}", e)))?;
        let prepared = prepare(&verifying_key)?;

        info!("Membership keys ready in {:.2?}", started.elapsed());
        Ok(Self {
            depth,
            proving_key,
            verifying_key,
            prepared,
        })
    }

    pub fn depth(&self) -> usize {
        self.depth
    }

    pub fn verifying_key(&self) -> &VerifyingKey<Bn254> {
        &self.verifying_key
    }

    pub fn verifier(&self) -> MembershipVerifier {
        MembershipVerifier {
            depth: self.depth,
            prepared: Arc::new(self.prepared.clone()),
        }
    }

    pub fn vk_bytes(&self) -> CredsResult<Vec<u8>> {
        let mut bytes = Vec::new();
        self.verifying_key
            .serialize_compressed(&mut bytes)
            .map_err(|e| CredsError::Crypto(format!("Failed to serialize VK: {}", e)))?;
        Ok(bytes)
    }

    pub fn vk_fingerprint(&self) -> CredsResult<String> {
        Ok(blake3::hash(&self.vk_bytes()?).to_hex().to_string())
    }

    /// Writes `membership-<depth>.pk.bin` and `.vk.bin` into `dir`.
    pub fn save(&self, dir: &Path) -> CredsResult<(PathBuf, PathBuf)> {
        fs::create_dir_all(dir)?;

        let mut pk_bytes = Vec::new();
        self.proving_key
            .serialize_compressed(&mut pk_bytes)
            .map_err(|e| CredsError::Crypto(format!("Failed to serialize PK: {}", e)))?;

        let pk_path = dir.join(proving_key_file(self.depth));
        let vk_path = dir.join(verifying_key_file(self.depth));
        fs::write(&pk_path, &pk_bytes)?;
        fs::write(&vk_path, self.vk_bytes()?)?;

        debug!("Saved membership keys to {}", dir.display());
        Ok((pk_path, vk_path))
    }

    pub fn load(dir: &Path, depth: usize) -> CredsResult<Self> {
        Self::load_files(
            depth,
            &dir.join(proving_key_file(depth)),
            &dir.join(verifying_key_file(depth)),
        )
    }

    pub fn load_files(depth: usize, pk_path: &Path, vk_path: &Path) -> CredsResult<Self> {
        if !is_supported_depth(depth) {
            return Err(CredsError::DepthUnsupported(depth));
        }

        let pk_bytes = fs::read(pk_path)?;
        let proving_key = ProvingKey::<Bn254>::deserialize_compressed(pk_bytes.as_slice())
            .map_err(|e| CredsError::Crypto(format!("Failed to deserialize PK: {}", e)))?;
        let vk_bytes = fs::read(vk_path)?;
        let verifying_key = VerifyingKey::<Bn254>::deserialize_compressed(vk_bytes.as_slice())
            .map_err(|e| CredsError::Crypto(format!("Failed to deserialize VK: {}", e)))?;

        if proving_key.vk != verifying_key {
            return Err(CredsError::Crypto(
                "Proving key and verifying key do not belong together".into(),
            ));
        }
        let prepared = prepare(&verifying_key)?;

        info!("Loaded membership keys for depth {}", depth);
        Ok(Self {
            depth,
            proving_key,
            verifying_key,
            prepared,
        })
    }
}

fn prepare(vk: &VerifyingKey<Bn254>) -> CredsResult<PreparedVerifyingKey<Bn254>> {
    Groth16::<Bn254>::process_vk(vk)
        .map_err(|e| CredsError::Crypto(format!("Failed to prepare VK: {}", e)))
}

/// Verification-only half of the artifacts.
#[derive(Clone)]
pub struct MembershipVerifier {
    depth: usize,
    prepared: Arc<PreparedVerifyingKey<Bn254>>,
}

impl MembershipVerifier {
    pub fn from_vk_bytes(depth: usize, bytes: &[u8]) -> CredsResult<Self> {
        let vk = VerifyingKey::<Bn254>::deserialize_compressed(bytes)
            .map_err(|e| CredsError::Crypto(format!("Failed to deserialize VK: {}", e)))?;
        Ok(Self {
            depth,
            prepared: Arc::new(prepare(&vk)?),
        })
    }

    pub fn from_vk_file(depth: usize, path: &Path) -> CredsResult<Self> {
        Self::from_vk_bytes(depth, &fs::read(path)?)
    }

    pub fn depth(&self) -> usize {
        self.depth
    }

    /// `Ok(false)` for a well-formed proof that does not verify.
    pub fn verify(&self, public: &PublicSignals, proof: &Proof<Bn254>) -> CredsResult<bool> {
        Groth16::<Bn254>::verify_with_processed_vk(&self.prepared, &public.to_vec(), proof)
            .map_err(|e| CredsError::Crypto(format!("Proof verification error: {}", e)))
    }
}

impl std::fmt::Debug for MembershipVerifier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MembershipVerifier")
            .field("depth", &self.depth)
            .finish_non_exhaustive()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FullProof {
    #[serde(with = "proof_base64")]
    pub proof: Proof<Bn254>,
    pub public_signals: PublicSignals,
}

/// Everything needed to prove, captured from one group snapshot.
#[derive(Clone)]
pub struct ProofRequest {
    identity: Identity,
    path: MerklePath,
    public: PublicSignals,
}

impl ProofRequest {
    /// Fails with `IdentityNotInGroup` before any proving work.
    pub fn new(
        identity: &Identity,
        group: &Group,
        external_nullifier: Fr,
        signal: &[u8],
    ) -> CredsResult<Self> {
        let commitment = identity.commitment();
        let path = group
            .path_for(&commitment)
            .map_err(|_| CredsError::IdentityNotInGroup)?;

        let public = PublicSignals {
            merkle_root: group.root(),
            nullifier_hash: identity.nullifier_hash(external_nullifier),
            signal_hash: hash_to_field(signal),
            external_nullifier,
        };

        Ok(Self {
            identity: identity.clone(),
            path,
            public,
        })
    }

    pub fn depth(&self) -> usize {
        self.path.depth()
    }

    pub fn public_signals(&self) -> &PublicSignals {
        &self.public
    }
}

impl std::fmt::Debug for ProofRequest {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProofRequest")
            .field("identity", &"<redacted>")
            .field("leaf_index", &self.path.leaf_index)
            .field("public", &self.public)
            .finish()
    }
}

#[derive(Clone)]
pub struct ProofGenerator {
    artifacts: Arc<ProvingArtifacts>,
}

impl ProofGenerator {
    pub fn new(artifacts: ProvingArtifacts) -> Self {
        Self {
            artifacts: Arc::new(artifacts),
        }
    }

    pub fn from_shared(artifacts: Arc<ProvingArtifacts>) -> Self {
        Self { artifacts }
    }

    pub fn depth(&self) -> usize {
        self.artifacts.depth
    }

    pub fn verifier(&self) -> MembershipVerifier {
        self.artifacts.verifier()
    }

    pub fn generate(
        &self,
        identity: &Identity,
        group: &Group,
        external_nullifier: Fr,
        signal: &[u8],
    ) -> CredsResult<FullProof> {
        let request = ProofRequest::new(identity, group, external_nullifier, signal)?;
        self.generate_request(&request)
    }

    pub fn generate_request(&self, request: &ProofRequest) -> CredsResult<FullProof> {
        if request.depth() != self.artifacts.depth {
            return Err(CredsError::DepthUnsupported(request.depth()));
        }

        let started = Instant::now();
        let circuit = MembershipCircuit::new(
            request.identity.nullifier(),
            request.identity.trapdoor(),
            request.path.siblings.clone(),
            request.path.path_bits(),
            request.public,
        );

        let mut rng = thread_rng();
        let proof = Groth16::<Bn254>::prove(&self.artifacts.proving_key, circuit, &mut rng)
            .map_err(|e| CredsError::Crypto(format!("Failed to generate proof: {}", e)))?;

        debug!(
            "Generated membership proof (nullifier hash {}) in {:.2?}",
            fr_short_hex(&request.public.nullifier_hash),
            started.elapsed()
        );
        Ok(FullProof {
            proof,
            public_signals: request.public,
        })
    }

    /// Runs on the blocking pool so async callers are not stalled.
    pub async fn generate_async(&self, request: ProofRequest) -> CredsResult<FullProof> {
        let generator = self.clone();
        tokio::task::spawn_blocking(move || generator.generate_request(&request))
            .await
            .map_err(|e| CredsError::Internal(format!("Proof task failed: {}", e)))?
    }

    /// Independent requests proved concurrently; results keep request order.
    pub async fn generate_batch(&self, requests: Vec<ProofRequest>) -> Vec<CredsResult<FullProof>> {
        let tasks = requests
            .into_iter()
            .map(|request| self.generate_async(request));
        futures::future::join_all(tasks).await
    }

    pub fn verify(&self, full: &FullProof) -> CredsResult<bool> {
        let valid = self
            .artifacts
            .verifier()
            .verify(&full.public_signals, &full.proof)?;
        if !valid {
            warn!("Membership proof failed verification");
        }
        Ok(valid)
    }
}

mod proof_base64 {
    use super::*;

    pub fn serialize<S: Serializer>(proof: &Proof<Bn254>, serializer: S) -> Result<S::Ok, S::Error> {
        let mut bytes = Vec::new();
        proof
            .serialize_compressed(&mut bytes)
            .map_err(serde::ser::Error::custom)?;
        serializer.serialize_str(&BASE64.encode(bytes))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Proof<Bn254>, D::Error> {
        let encoded = String::deserialize(deserializer)?;
        let bytes = BASE64.decode(encoded).map_err(serde::de::Error::custom)?;
        Proof::deserialize_compressed(bytes.as_slice()).map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
mod tests;
