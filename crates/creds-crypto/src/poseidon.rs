//! Poseidon hash over the BN254 scalar field, circomlib-compatible.
//!
//! One parameter family is used everywhere: identity commitments, nullifier
//! hashes, group tree nodes and the membership circuit. Roots computed here
//! match the `PoseidonT3` library the Credential contract links against.
//!
//! ## Parameters
//! - Field: BN254 Fr
//! - Width: number of inputs + 1 (`PoseidonT2` for one input, `PoseidonT3` for two)
//! - Full rounds: 8, partial rounds: 56 (T2) / 57 (T3)
//! - S-box: x^5
//! - Round constants and MDS: circomlib, via `light-poseidon`
//!
//! The state starts as `[0, inputs..]` and the hash is the first state element
//! after the permutation. Each arity has its own constants, so `hash1(x)` and
//! `hash2(x, 0)` are unrelated.

use ark_bn254::Fr;
use ark_ff::{Field, Zero};
use ark_r1cs_std::fields::{fp::FpVar, FieldVar};
use ark_relations::r1cs::SynthesisError;
use light_poseidon::parameters::bn254_x5::get_poseidon_parameters;
use light_poseidon::PoseidonParameters;
use std::sync::OnceLock;

/// Largest input count the group, identity and circuit need.
pub const MAX_INPUTS: usize = 2;

static PARAMETERS: [OnceLock<PoseidonParameters<Fr>>; MAX_INPUTS] =
    [OnceLock::new(), OnceLock::new()];

/// circomlib parameters for `arity` inputs; `None` outside `1..=MAX_INPUTS`.
pub fn circom_parameters(arity: usize) -> Option<&'static PoseidonParameters<Fr>> {
    let slot = PARAMETERS.get(arity.checked_sub(1)?)?;
    Some(slot.get_or_init(|| {
        get_poseidon_parameters::<Fr>((arity + 1) as u8)
            .expect("circomlib parameters exist for widths 2 and 3")
    }))
}

fn full_round(params: &PoseidonParameters<Fr>, round: usize) -> bool {
    let half = params.full_rounds / 2;
    round < half || round >= half + params.partial_rounds
}

fn sbox(x: Fr) -> Fr {
    x.square().square() * x
}

fn permute(params: &PoseidonParameters<Fr>, inputs: &[Fr]) -> Fr {
    let width = inputs.len() + 1;
    let mut state = Vec::with_capacity(width);
    state.push(Fr::zero());
    state.extend_from_slice(inputs);

    for round in 0..params.full_rounds + params.partial_rounds {
        for (i, x) in state.iter_mut().enumerate() {
            *x += params.ark[round * width + i];
        }
        if full_round(params, round) {
            for x in state.iter_mut() {
                *x = sbox(*x);
            }
        } else {
            state[0] = sbox(state[0]);
        }
        state = params.mds[..width]
            .iter()
            .map(|row| {
                state
                    .iter()
                    .zip(row)
                    .fold(Fr::zero(), |acc, (x, m)| acc + *x * m)
            })
            .collect();
    }
    state[0]
}

/// Merkle node hash (`PoseidonT3`).
pub fn poseidon_hash2(left: Fr, right: Fr) -> Fr {
    match circom_parameters(2) {
        Some(params) => permute(params, &[left, right]),
        None => unreachable!("width 3 is always available"),
    }
}

/// Single-input hash (`PoseidonT2`).
pub fn poseidon_hash1(input: Fr) -> Fr {
    match circom_parameters(1) {
        Some(params) => permute(params, &[input]),
        None => unreachable!("width 2 is always available"),
    }
}

fn sbox_var(x: &FpVar<Fr>) -> Result<FpVar<Fr>, SynthesisError> {
    Ok(x.square()?.square()? * x)
}

/// In-circuit counterpart of [`poseidon_hash1`] and [`poseidon_hash2`],
/// chosen by the number of inputs.
pub fn poseidon_hash_var(inputs: &[FpVar<Fr>]) -> Result<FpVar<Fr>, SynthesisError> {
    let params = circom_parameters(inputs.len()).ok_or(SynthesisError::Unsatisfiable)?;
    let width = inputs.len() + 1;
    let mut state = Vec::with_capacity(width);
    state.push(FpVar::zero());
    state.extend_from_slice(inputs);

    for round in 0..params.full_rounds + params.partial_rounds {
        for (i, x) in state.iter_mut().enumerate() {
            *x = &*x + params.ark[round * width + i];
        }
        if full_round(params, round) {
            for x in state.iter_mut() {
                *x = sbox_var(x)?;
            }
        } else {
            state[0] = sbox_var(&state[0])?;
        }
        state = params.mds[..width]
            .iter()
            .map(|row| {
                state
                    .iter()
                    .zip(row)
                    .fold(FpVar::zero(), |acc, (x, m)| acc + x * *m)
            })
            .collect();
    }
    Ok(state.swap_remove(0))
}
