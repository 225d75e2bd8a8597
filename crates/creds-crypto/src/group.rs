//! Local mirror of a credential's incremental Merkle tree.
//!
//! Nodes live in one vector per level and are addressed by index arithmetic:
//! the parent of `(level, i)` is `(level + 1, i / 2)`. A level only stores the
//! nodes that have been touched; anything past its end is the zero subtree of
//! that height. Removing a member overwrites its leaf with the zero value, so
//! leaf indices never shift and paths of other members stay valid.

use ark_bn254::Fr;
use creds_types::{is_supported_depth, CredsError, CredsResult};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use crate::field::fr_short_hex;
use crate::poseidon::poseidon_hash2;

/// Authentication path from a leaf to the root.
///
/// `path_indices[i]` is 1 when the running node is the right child at level `i`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MerklePath {
    pub leaf_index: usize,
    #[serde(with = "fr_vec_hex")]
    pub siblings: Vec<Fr>,
    pub path_indices: Vec<u8>,
}

impl MerklePath {
    pub fn depth(&self) -> usize {
        self.siblings.len()
    }

    pub fn compute_root(&self, leaf: Fr) -> Fr {
        self.siblings
            .iter()
            .zip(&self.path_indices)
            .fold(leaf, |node, (sibling, bit)| {
                if *bit == 0 {
                    poseidon_hash2(node, *sibling)
                } else {
                    poseidon_hash2(*sibling, node)
                }
            })
    }

    pub fn verify(&self, leaf: Fr, root: Fr) -> bool {
        self.is_well_formed() && self.compute_root(leaf) == root
    }

    /// Same length on both sides and only 0/1 direction bits.
    pub fn is_well_formed(&self) -> bool {
        self.siblings.len() == self.path_indices.len()
            && self.path_indices.iter().all(|b| *b <= 1)
    }

    /// Leaf index encoded by the direction bits.
    pub fn index_from_bits(&self) -> usize {
        self.path_indices
            .iter()
            .enumerate()
            .fold(0usize, |acc, (i, bit)| acc | ((*bit as usize) << i))
    }

    pub fn path_bits(&self) -> Vec<bool> {
        self.path_indices.iter().map(|b| *b == 1).collect()
    }
}

#[derive(Debug, Clone)]
pub struct Group {
    depth: usize,
    zero_value: Fr,
    zeros: Vec<Fr>,
    levels: Vec<Vec<Fr>>,
    index: HashMap<Fr, usize>,
}

impl Group {
    pub fn new(depth: usize, zero_value: Fr) -> CredsResult<Self> {
        if !is_supported_depth(depth) {
            return Err(CredsError::DepthUnsupported(depth));
        }

        let mut zeros = Vec::with_capacity(depth + 1);
        zeros.push(zero_value);
        for level in 0..depth {
            zeros.push(poseidon_hash2(zeros[level], zeros[level]));
        }

        Ok(Self {
            depth,
            zero_value,
            zeros,
            levels: vec![Vec::new(); depth + 1],
            index: HashMap::new(),
        })
    }

    pub fn depth(&self) -> usize {
        self.depth
    }

    pub fn zero_value(&self) -> Fr {
        self.zero_value
    }

    pub fn capacity(&self) -> u64 {
        1u64 << self.depth
    }

    /// Number of leaf slots used so far, removed slots included.
    pub fn leaf_count(&self) -> usize {
        self.levels[0].len()
    }

    /// Live members only.
    pub fn member_count(&self) -> usize {
        self.index.len()
    }

    pub fn root(&self) -> Fr {
        self.levels[self.depth]
            .first()
            .copied()
            .unwrap_or(self.zeros[self.depth])
    }

    pub fn index_of(&self, commitment: &Fr) -> Option<usize> {
        self.index.get(commitment).copied()
    }

    pub fn contains(&self, commitment: &Fr) -> bool {
        self.index.contains_key(commitment)
    }

    /// Every leaf slot in insertion order; removed slots hold the zero value.
    pub fn leaves(&self) -> &[Fr] {
        &self.levels[0]
    }

    pub fn members(&self) -> impl Iterator<Item = (usize, Fr)> + '_ {
        self.levels[0]
            .iter()
            .enumerate()
            .filter(|(i, leaf)| self.index.get(*leaf) == Some(i))
            .map(|(i, leaf)| (i, *leaf))
    }

    pub fn add_member(&mut self, commitment: Fr) -> CredsResult<Fr> {
        self.check_insertable(&commitment)?;
        if self.leaf_count() as u64 >= self.capacity() {
            return Err(CredsError::CapacityExceeded(self.leaf_count()));
        }

        let leaf_index = self.leaf_count();
        self.set_leaf(leaf_index, commitment);
        self.index.insert(commitment, leaf_index);

        tracing::debug!(
            "Group member {} added at index {}",
            fr_short_hex(&commitment),
            leaf_index
        );
        Ok(self.root())
    }

    /// Validates the whole batch before touching the tree.
    pub fn add_members(&mut self, commitments: &[Fr]) -> CredsResult<Fr> {
        let mut seen = std::collections::HashSet::with_capacity(commitments.len());
        for commitment in commitments {
            self.check_insertable(commitment)?;
            if !seen.insert(*commitment) {
                return Err(CredsError::DuplicateMember);
            }
        }
        let needed = self.leaf_count() as u64 + commitments.len() as u64;
        if needed > self.capacity() {
            return Err(CredsError::CapacityExceeded(self.leaf_count()));
        }

        for commitment in commitments {
            self.add_member(*commitment)?;
        }
        Ok(self.root())
    }

    pub fn remove_member(&mut self, commitment: &Fr) -> CredsResult<Fr> {
        let leaf_index = self.index.remove(commitment).ok_or(CredsError::MemberNotFound)?;
        self.set_leaf(leaf_index, self.zero_value);
        tracing::debug!(
            "Group member {} removed from index {}",
            fr_short_hex(commitment),
            leaf_index
        );
        Ok(self.root())
    }

    pub fn update_member(&mut self, old: &Fr, new: Fr) -> CredsResult<Fr> {
        let leaf_index = self.index_of(old).ok_or(CredsError::MemberNotFound)?;
        self.check_insertable(&new)?;

        self.index.remove(old);
        self.set_leaf(leaf_index, new);
        self.index.insert(new, leaf_index);
        Ok(self.root())
    }

    pub fn path_for(&self, commitment: &Fr) -> CredsResult<MerklePath> {
        let leaf_index = self.index_of(commitment).ok_or(CredsError::MemberNotFound)?;
        Ok(self.path_at(leaf_index))
    }

    fn path_at(&self, leaf_index: usize) -> MerklePath {
        let mut siblings = Vec::with_capacity(self.depth);
        let mut path_indices = Vec::with_capacity(self.depth);
        let mut idx = leaf_index;

        for level in 0..self.depth {
            siblings.push(self.node(level, idx ^ 1));
            path_indices.push((idx & 1) as u8);
            idx >>= 1;
        }

        MerklePath {
            leaf_index,
            siblings,
            path_indices,
        }
    }

    fn node(&self, level: usize, idx: usize) -> Fr {
        self.levels[level]
            .get(idx)
            .copied()
            .unwrap_or(self.zeros[level])
    }

    fn set_leaf(&mut self, leaf_index: usize, value: Fr) {
        let mut idx = leaf_index;
        let mut node = value;

        for level in 0..=self.depth {
            let nodes = &mut self.levels[level];
            if idx < nodes.len() {
                nodes[idx] = node;
            } else {
                nodes.resize(idx, self.zeros[level]);
                nodes.push(node);
            }

            if level == self.depth {
                break;
            }

            node = if idx & 1 == 0 {
                poseidon_hash2(node, self.node(level, idx + 1))
            } else {
                poseidon_hash2(self.node(level, idx - 1), node)
            };
            idx >>= 1;
        }
    }

    fn check_insertable(&self, commitment: &Fr) -> CredsResult<()> {
        if *commitment == self.zero_value {
            return Err(CredsError::InvalidCommitment(
                "commitment equals the tree zero value".into(),
            ));
        }
        if self.index.contains_key(commitment) {
            return Err(CredsError::DuplicateMember);
        }
        Ok(())
    }
}

mod fr_vec_hex {
    use super::*;
    use serde::{Deserializer, Serializer};

    pub fn serialize<S: Serializer>(values: &[Fr], serializer: S) -> Result<S::Ok, S::Error> {
        let encoded: Vec<String> = values.iter().map(crate::field::fr_to_hex).collect();
        encoded.serialize(serializer)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Vec<Fr>, D::Error> {
        let encoded = Vec::<String>::deserialize(deserializer)?;
        encoded
            .iter()
            .map(|s| crate::field::fr_from_hex(s).map_err(serde::de::Error::custom))
            .collect()
    }
}
