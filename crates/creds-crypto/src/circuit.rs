use ark_bn254::Fr;
use ark_r1cs_std::{
    alloc::AllocVar, boolean::Boolean, eq::EqGadget, fields::fp::FpVar, fields::FieldVar,
    select::CondSelectGadget,
};
use ark_relations::r1cs::{ConstraintSynthesizer, ConstraintSystemRef, SynthesisError};
use serde::{Deserialize, Serialize};

use crate::field::fr_hex;
use crate::poseidon::poseidon_hash_var;

/// Group membership relation.
///
/// Public inputs, in this order: `merkle_root`, `nullifier_hash`,
/// `signal_hash`, `external_nullifier`.
#[derive(Clone)]
pub struct MembershipCircuit {
    identity_nullifier: Option<Fr>,
    identity_trapdoor: Option<Fr>,
    path_elements: Vec<Option<Fr>>,
    path_indices: Vec<Option<bool>>,
    merkle_root: Option<Fr>,
    nullifier_hash: Option<Fr>,
    signal_hash: Option<Fr>,
    external_nullifier: Option<Fr>,
}

/// Public half of a membership statement.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PublicSignals {
    #[serde(with = "fr_hex")]
    pub merkle_root: Fr,
    #[serde(with = "fr_hex")]
    pub nullifier_hash: Fr,
    #[serde(with = "fr_hex")]
    pub signal_hash: Fr,
    #[serde(with = "fr_hex")]
    pub external_nullifier: Fr,
}

impl PublicSignals {
    pub fn to_vec(&self) -> Vec<Fr> {
        vec![
            self.merkle_root,
            self.nullifier_hash,
            self.signal_hash,
            self.external_nullifier,
        ]
    }
}

impl MembershipCircuit {
    pub fn new(
        identity_nullifier: Fr,
        identity_trapdoor: Fr,
        path_elements: Vec<Fr>,
        path_indices: Vec<bool>,
        public: PublicSignals,
    ) -> Self {
        Self {
            identity_nullifier: Some(identity_nullifier),
            identity_trapdoor: Some(identity_trapdoor),
            path_elements: path_elements.into_iter().map(Some).collect(),
            path_indices: path_indices.into_iter().map(Some).collect(),
            merkle_root: Some(public.merkle_root),
            nullifier_hash: Some(public.nullifier_hash),
            signal_hash: Some(public.signal_hash),
            external_nullifier: Some(public.external_nullifier),
        }
    }

    /// Shape-only instance for key generation.
    pub fn empty(depth: usize) -> Self {
        Self {
            identity_nullifier: None,
            identity_trapdoor: None,
            path_elements: vec![None; depth],
            path_indices: vec![None; depth],
            merkle_root: None,
            nullifier_hash: None,
            signal_hash: None,
            external_nullifier: None,
        }
    }

    pub fn depth(&self) -> usize {
        self.path_elements.len()
    }
}

impl ConstraintSynthesizer<Fr> for MembershipCircuit {
    fn generate_constraints(self, cs: ConstraintSystemRef<Fr>) -> Result<(), SynthesisError> {
        if self.path_elements.len() != self.path_indices.len() {
            return Err(SynthesisError::Unsatisfiable);
        }

        let merkle_root = FpVar::new_input(cs.clone(), || {
            self.merkle_root.ok_or(SynthesisError::AssignmentMissing)
        })?;
        let nullifier_hash = FpVar::new_input(cs.clone(), || {
            self.nullifier_hash.ok_or(SynthesisError::AssignmentMissing)
        })?;
        let signal_hash = FpVar::new_input(cs.clone(), || {
            self.signal_hash.ok_or(SynthesisError::AssignmentMissing)
        })?;
        let external_nullifier = FpVar::new_input(cs.clone(), || {
            self.external_nullifier.ok_or(SynthesisError::AssignmentMissing)
        })?;

        let identity_nullifier = FpVar::new_witness(cs.clone(), || {
            self.identity_nullifier.ok_or(SynthesisError::AssignmentMissing)
        })?;
        let identity_trapdoor = FpVar::new_witness(cs.clone(), || {
            self.identity_trapdoor.ok_or(SynthesisError::AssignmentMissing)
        })?;

        let mut path_elements = Vec::with_capacity(self.path_elements.len());
        for sibling in &self.path_elements {
            path_elements.push(FpVar::new_witness(cs.clone(), || {
                sibling.ok_or(SynthesisError::AssignmentMissing)
            })?);
        }

        let mut path_indices = Vec::with_capacity(self.path_indices.len());
        for bit in &self.path_indices {
            path_indices.push(Boolean::new_witness(cs.clone(), || {
                bit.ok_or(SynthesisError::AssignmentMissing)
            })?);
        }

        let secret = poseidon_hash_var(&[identity_nullifier.clone(), identity_trapdoor])?;
        let commitment = poseidon_hash_var(&[secret])?;

        let computed_root = merkle_root_var(&commitment, &path_elements, &path_indices)?;
        computed_root.enforce_equal(&merkle_root)?;

        let computed_nullifier_hash =
            poseidon_hash_var(&[external_nullifier, identity_nullifier])?;
        computed_nullifier_hash.enforce_equal(&nullifier_hash)?;

        // Ties the signal into the proof so it cannot be swapped after proving.
        let signal_square = signal_hash.square()?;
        let expected_square = FpVar::new_witness(cs, || {
            self.signal_hash
                .map(|s| s * s)
                .ok_or(SynthesisError::AssignmentMissing)
        })?;
        signal_square.enforce_equal(&expected_square)?;

        Ok(())
    }
}

pub fn merkle_root_var(
    leaf: &FpVar<Fr>,
    path: &[FpVar<Fr>],
    indices: &[Boolean<Fr>],
) -> Result<FpVar<Fr>, SynthesisError> {
    let mut current = leaf.clone();

    for (sibling, is_right) in path.iter().zip(indices.iter()) {
        let left = FpVar::conditionally_select(is_right, sibling, &current)?;
        let right = FpVar::conditionally_select(is_right, &current, sibling)?;
        current = poseidon_hash_var(&[left, right])?;
    }

    Ok(current)
}
