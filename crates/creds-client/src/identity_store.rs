//! Identity files under `<data_dir>/identities/<id>.json`.

use creds_crypto::{fr_to_hex, Identity};
use creds_types::{CredsError, CredsResult};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::info;

const RECORD_VERSION: u32 = 1;

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct IdentityRecord {
    pub version: u32,
    pub id: String,
    pub label: String,
    /// Big-endian hex of the identity commitment.
    pub commitment: String,
    /// Trapdoor and nullifier. Secret.
    pub identity: serde_json::Value,
    pub created_at: String,
}

impl IdentityRecord {
    pub fn new(identity: &Identity, label: Option<String>) -> CredsResult<Self> {
        let commitment = fr_to_hex(&identity.commitment());
        let id = commitment[2..18].to_string();
        let secrets = serde_json::from_str(&identity.to_json()?)
            .map_err(|e| CredsError::Serialization(e.to_string()))?;

        Ok(Self {
            version: RECORD_VERSION,
            label: label.unwrap_or_else(|| format!("identity-{}", &id[..6])),
            id,
            commitment,
            identity: secrets,
            created_at: chrono::Utc::now().to_rfc3339(),
        })
    }

    /// Rebuilds the identity and checks it still matches the stored commitment.
    pub fn identity(&self) -> CredsResult<Identity> {
        let identity = Identity::from_json(&self.identity.to_string())?;
        if fr_to_hex(&identity.commitment()) != self.commitment {
            return Err(CredsError::InvalidCommitment(format!(
                "Identity file {} does not match its commitment",
                self.id
            )));
        }
        Ok(identity)
    }
}

pub struct IdentityStore {
    dir: PathBuf,
}

impl IdentityStore {
    pub fn open(dir: impl Into<PathBuf>) -> CredsResult<Self> {
        let dir = dir.into();
        std::fs::create_dir_all(&dir)
            .map_err(|e| CredsError::Io(format!("Failed to create identities dir: {}", e)))?;
        Ok(Self { dir })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn path_for(&self, id: &str) -> PathBuf {
        self.dir.join(format!("{}.json", id))
    }

    /// A fresh random identity, or one derived from `secret`.
    pub fn generate(
        &self,
        secret: Option<&str>,
        label: Option<String>,
    ) -> CredsResult<(IdentityRecord, PathBuf)> {
        let identity = match secret {
            Some(secret) => Identity::from_secret(secret.as_bytes()),
            None => Identity::new(),
        };
        let record = IdentityRecord::new(&identity, label)?;
        let path = self.save(&record)?;
        info!("Identity {} written to {}", record.id, path.display());
        Ok((record, path))
    }

    pub fn save(&self, record: &IdentityRecord) -> CredsResult<PathBuf> {
        let path = self.path_for(&record.id);
        let content = serde_json::to_string_pretty(record)
            .map_err(|e| CredsError::Serialization(e.to_string()))?;
        std::fs::write(&path, content)
            .map_err(|e| CredsError::Io(format!("Failed to write identity: {}", e)))?;
        Ok(path)
    }

    /// Looks up by id first, then by label.
    pub fn load(&self, id_or_label: &str) -> CredsResult<IdentityRecord> {
        let path = self.path_for(id_or_label);
        if path.exists() {
            return read_record(&path);
        }
        self.list()?
            .into_iter()
            .find(|record| record.label == id_or_label)
            .ok_or_else(|| CredsError::Config(format!("Identity not found: {}", id_or_label)))
    }

    pub fn list(&self) -> CredsResult<Vec<IdentityRecord>> {
        let entries = std::fs::read_dir(&self.dir)
            .map_err(|e| CredsError::Io(format!("Failed to read dir: {}", e)))?;

        let mut records = Vec::new();
        for entry in entries {
            let path = entry
                .map_err(|e| CredsError::Io(format!("Failed to read entry: {}", e)))?
                .path();
            if path.extension().map(|e| e == "json").unwrap_or(false) {
                records.push(read_record(&path)?);
            }
        }
        records.sort_by(|a, b| a.created_at.cmp(&b.created_at));
        Ok(records)
    }
}

fn read_record(path: &Path) -> CredsResult<IdentityRecord> {
    let content = std::fs::read_to_string(path)
        .map_err(|e| CredsError::Io(format!("Failed to read {}: {}", path.display(), e)))?;
    serde_json::from_str(&content)
        .map_err(|e| CredsError::Serialization(format!("Invalid identity file: {}", e)))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn temp_store(name: &str) -> IdentityStore {
        let dir = std::env::temp_dir().join(format!("creds-ids-{}-{}", name, std::process::id()));
        let _ = std::fs::remove_dir_all(&dir);
        IdentityStore::open(dir).unwrap()
    }

    #[test]
    fn test_generate_and_load() {
        let store = temp_store("roundtrip");
        let (record, path) = store.generate(None, Some("alice".into())).unwrap();
        assert!(path.exists());
        assert_eq!(record.id.len(), 16);

        let by_id = store.load(&record.id).unwrap();
        let by_label = store.load("alice").unwrap();
        assert_eq!(by_id.commitment, record.commitment);
        assert_eq!(by_label.id, record.id);
        assert_eq!(
            by_id.identity().unwrap().commitment(),
            record.identity().unwrap().commitment()
        );
        std::fs::remove_dir_all(store.dir()).ok();
    }

    #[test]
    fn test_secret_derivation_is_stable() {
        let store = temp_store("secret");
        let (a, _) = store.generate(Some("correct horse"), None).unwrap();
        let (b, _) = store.generate(Some("correct horse"), None).unwrap();
        assert_eq!(a.commitment, b.commitment);
        assert_eq!(store.list().unwrap().len(), 1);
        std::fs::remove_dir_all(store.dir()).ok();
    }

    #[test]
    fn test_tampered_commitment_rejected() {
        let identity = Identity::from_secret(b"bob");
        let mut record = IdentityRecord::new(&identity, None).unwrap();
        record.commitment = fr_to_hex(&Identity::from_secret(b"eve").commitment());
        assert!(matches!(record.identity(), Err(CredsError::InvalidCommitment(_))));
    }

    #[test]
    fn test_missing_identity() {
        let store = temp_store("missing");
        assert!(store.load("nobody").is_err());
        std::fs::remove_dir_all(store.dir()).ok();
    }
}
