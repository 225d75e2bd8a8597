//! Groth16 proofs in the eight-word layout the Solidity verifier expects:
//! `[a.x, a.y, b.x.c1, b.x.c0, b.y.c1, b.y.c0, c.x, c.y]`, each a big-endian
//! `uint256`. The point at infinity is encoded as all-zero coordinates.

use ark_bn254::{Bn254, Fq, Fq2, G1Affine, G2Affine};
use ark_ec::AffineRepr;
use ark_ff::{BigInteger, PrimeField, Zero};
use ark_groth16::Proof;
use creds_types::{CredsError, CredsResult, FIELD_ELEMENT_SIZE, PACKED_PROOF_WORDS};

pub type Word = [u8; FIELD_ELEMENT_SIZE];

pub fn pack_proof(proof: &Proof<Bn254>) -> [Word; PACKED_PROOF_WORDS] {
    let (ax, ay) = g1_coords(&proof.a);
    let (bx, by) = g2_coords(&proof.b);
    let (cx, cy) = g1_coords(&proof.c);

    [
        fq_to_word(&ax),
        fq_to_word(&ay),
        fq_to_word(&bx.c1),
        fq_to_word(&bx.c0),
        fq_to_word(&by.c1),
        fq_to_word(&by.c0),
        fq_to_word(&cx),
        fq_to_word(&cy),
    ]
}

pub fn unpack_proof(words: &[Word; PACKED_PROOF_WORDS]) -> CredsResult<Proof<Bn254>> {
    let mut coords = [Fq::zero(); PACKED_PROOF_WORDS];
    for (slot, word) in coords.iter_mut().zip(words.iter()) {
        *slot = fq_from_word(word).ok_or(CredsError::InvalidProof)?;
    }

    let a = g1_from_coords(coords[0], coords[1])?;
    let b = g2_from_coords(
        Fq2::new(coords[3], coords[2]),
        Fq2::new(coords[5], coords[4]),
    )?;
    let c = g1_from_coords(coords[6], coords[7])?;

    Ok(Proof { a, b, c })
}

fn g1_coords(p: &G1Affine) -> (Fq, Fq) {
    if p.infinity {
        (Fq::zero(), Fq::zero())
    } else {
        (p.x, p.y)
    }
}

fn g2_coords(p: &G2Affine) -> (Fq2, Fq2) {
    if p.infinity {
        (Fq2::zero(), Fq2::zero())
    } else {
        (p.x, p.y)
    }
}

fn g1_from_coords(x: Fq, y: Fq) -> CredsResult<G1Affine> {
    if x == Fq::zero() && y == Fq::zero() {
        return Ok(G1Affine::zero());
    }
    let point = G1Affine::new_unchecked(x, y);
    if !point.is_on_curve() || !point.is_in_correct_subgroup_assuming_on_curve() {
        return Err(CredsError::InvalidProof);
    }
    Ok(point)
}

fn g2_from_coords(x: Fq2, y: Fq2) -> CredsResult<G2Affine> {
    if x == Fq2::zero() && y == Fq2::zero() {
        return Ok(G2Affine::zero());
    }
    let point = G2Affine::new_unchecked(x, y);
    if !point.is_on_curve() || !point.is_in_correct_subgroup_assuming_on_curve() {
        return Err(CredsError::InvalidProof);
    }
    Ok(point)
}

fn fq_to_word(f: &Fq) -> Word {
    let mut out = [0u8; FIELD_ELEMENT_SIZE];
    out.copy_from_slice(&f.into_bigint().to_bytes_be());
    out
}

fn fq_from_word(word: &Word) -> Option<Fq> {
    let mut limbs = [0u64; 4];
    for (i, chunk) in word.chunks_exact(8).enumerate() {
        let mut limb = [0u8; 8];
        limb.copy_from_slice(chunk);
        limbs[3 - i] = u64::from_be_bytes(limb);
    }
    Fq::from_bigint(ark_ff::BigInt::new(limbs))
}

#[cfg(test)]
mod tests {
    use super::*;
    use ark_ec::CurveGroup;
    use ark_std::UniformRand;
    use rand::{rngs::StdRng, SeedableRng};

    fn sample_proof() -> Proof<Bn254> {
        let mut rng = StdRng::seed_from_u64(7);
        Proof {
            a: ark_bn254::G1Projective::rand(&mut rng).into_affine(),
            b: ark_bn254::G2Projective::rand(&mut rng).into_affine(),
            c: ark_bn254::G1Projective::rand(&mut rng).into_affine(),
        }
    }

    #[test]
    fn test_layout_swaps_g2_limbs() {
        let proof = sample_proof();
        let words = pack_proof(&proof);
        assert_eq!(words[0], fq_to_word(&proof.a.x));
        assert_eq!(words[2], fq_to_word(&proof.b.x.c1));
        assert_eq!(words[3], fq_to_word(&proof.b.x.c0));
        assert_eq!(words[7], fq_to_word(&proof.c.y));
        assert_eq!(unpack_proof(&words).unwrap(), proof);
    }

    #[test]
    fn test_off_curve_point_rejected() {
        let mut words = pack_proof(&sample_proof());
        let bumped = sample_proof().a.y + Fq::from(1u64);
        words[1] = fq_to_word(&bumped);
        assert_eq!(unpack_proof(&words).unwrap_err(), CredsError::InvalidProof);
    }

    #[test]
    fn test_out_of_range_coordinate_rejected() {
        let mut words = pack_proof(&sample_proof());
        words[6] = [0xff; 32];
        assert_eq!(unpack_proof(&words).unwrap_err(), CredsError::InvalidProof);
    }

    #[test]
    fn test_identity_points() {
        let proof = Proof::<Bn254> {
            a: G1Affine::zero(),
            b: G2Affine::zero(),
            c: G1Affine::zero(),
        };
        let words = pack_proof(&proof);
        assert!(words.iter().all(|w| w.iter().all(|b| *b == 0)));
        assert_eq!(unpack_proof(&words).unwrap(), proof);
    }
}
