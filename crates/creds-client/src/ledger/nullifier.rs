use ark_bn254::Fr;
use std::collections::HashSet;

/// Nullifier hashes spent against one credential.
///
/// Append-only for the credential's lifetime: there is no eviction, so a
/// spent nullifier hash can never become usable again.
#[derive(Clone, Debug, Default)]
pub struct NullifierSet {
    set: HashSet<Fr>,
    order: Vec<Fr>,
}

impl NullifierSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn contains(&self, nullifier_hash: &Fr) -> bool {
        self.set.contains(nullifier_hash)
    }

    /// Returns false when the hash was already recorded.
    pub fn insert(&mut self, nullifier_hash: Fr) -> bool {
        if !self.set.insert(nullifier_hash) {
            return false;
        }
        self.order.push(nullifier_hash);
        true
    }

    pub fn len(&self) -> usize {
        self.order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    /// Recording order.
    pub fn iter(&self) -> impl Iterator<Item = &Fr> {
        self.order.iter()
    }
}
