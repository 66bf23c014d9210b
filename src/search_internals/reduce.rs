//! Low-depth gate-tree reductions.
//!
//! Interactive gates cost one network round per invocation in a real
//! backend, so folds over many shares are arranged as balanced pairwise
//! trees of depth ⌈log2 n⌉ instead of linear chains. Two variants exist:
//! [`low_depth_reduce`] combines already-independent wires (typically
//! pre-batched SIMD lanes), while [`low_depth_reduce_batched`] additionally
//! batches every tree level into a single wide gate, so reducing n single-bit
//! wires costs ⌈log2 n⌉ rounds instead of n − 1.

use crate::{engine::BooleanEngine, search_internals::error::PrivMailSearchError};

/// Reduces a non-empty sequence of same-shaped shares under a commutative,
/// associative gate, combining pairwise per level.
pub fn low_depth_reduce<E, F>(engine: &mut E, mut items: Vec<E::Share>, mut gate: F) -> Result<E::Share, PrivMailSearchError>
where
    E: BooleanEngine,
    F: FnMut(&mut E, &E::Share, &E::Share) -> E::Share,
{
    while items.len() > 1 {
        let mut next = Vec::with_capacity(items.len().div_ceil(2));
        for pair in items.chunks(2) {
            if let [a, b] = pair {
                next.push(gate(engine, a, b));
            } else if let [odd] = pair {
                next.push(odd.clone());
            }
        }
        items = next;
    }

    items.pop().ok_or(PrivMailSearchError::ReducedEmptySequence)
}

/// Same reduction, but every tree level is evaluated as one SIMD-batched
/// gate: the level's left halves and right halves each become one wide
/// share, a single gate combines them, and the result is unbatched for the
/// next level.
pub fn low_depth_reduce_batched<E, F>(engine: &mut E, mut items: Vec<E::Share>, mut gate: F) -> Result<E::Share, PrivMailSearchError>
where
    E: BooleanEngine,
    F: FnMut(&mut E, &E::Share, &E::Share) -> E::Share,
{
    while items.len() > 1 {
        let carry = if items.len() % 2 == 1 { items.pop() } else { None };

        let right = items.split_off(items.len() / 2);
        let left_wide = engine.batch(&items);
        let right_wide = engine.batch(&right);
        let combined = gate(engine, &left_wide, &right_wide);

        items = engine.unbatch(&combined);
        if let Some(odd) = carry {
            items.push(odd);
        }
    }

    items.pop().ok_or(PrivMailSearchError::ReducedEmptySequence)
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::clear::{ClearEngine, ClearShare};
    use rand::prelude::*;
    use rand_chacha::ChaCha8Rng;

    fn input_bits(engine: &mut ClearEngine, values: &[bool]) -> Vec<ClearShare> {
        values.iter().map(|&v| engine.input_bit(v, 0)).collect()
    }

    #[test]
    fn reductions_agree_with_logical_folds() {
        let mut rng = ChaCha8Rng::from_os_rng();

        for len in 1..=40 {
            let values: Vec<bool> = (0..len).map(|_| rng.random()).collect();
            let expected_and = values.iter().all(|&v| v);
            let expected_or = values.iter().any(|&v| v);

            let mut engine = ClearEngine::new(1);
            let wires = input_bits(&mut engine, &values);
            let anded = low_depth_reduce(&mut engine, wires, |e, a, b| e.and(a, b)).expect("non-empty reduction");
            assert_eq!(anded.value() == 1, expected_and, "AND, len = {}", len);

            let mut engine = ClearEngine::new(1);
            let wires = input_bits(&mut engine, &values);
            let ored = low_depth_reduce_batched(&mut engine, wires, |e, a, b| e.or(a, b)).expect("non-empty reduction");
            assert_eq!(ored.value() == 1, expected_or, "OR, len = {}", len);
        }
    }

    #[test]
    fn batched_reduction_spends_logarithmically_many_rounds() {
        for (len, max_rounds) in [(2usize, 1usize), (5, 3), (64, 6), (100, 7)] {
            let mut engine = ClearEngine::new(1);
            let wires = input_bits(&mut engine, &vec![true; len]);

            low_depth_reduce_batched(&mut engine, wires, |e, a, b| e.or(a, b)).expect("non-empty reduction");
            assert!(
                engine.interactive_gate_rounds() <= max_rounds,
                "len = {}: {} rounds exceeds ⌈log2 n⌉ = {}",
                len,
                engine.interactive_gate_rounds(),
                max_rounds
            );
        }
    }

    #[test]
    fn single_element_reduction_is_free() {
        let mut engine = ClearEngine::new(1);
        let wires = input_bits(&mut engine, &[true]);

        let out = low_depth_reduce(&mut engine, wires, |e, a, b| e.and(a, b)).expect("non-empty reduction");
        assert_eq!(out.value(), 1);
        assert_eq!(engine.interactive_gate_rounds(), 0);
    }

    #[test]
    fn empty_reduction_is_rejected() {
        let mut engine = ClearEngine::new(1);

        let plain = low_depth_reduce(&mut engine, Vec::new(), |e, a, b| e.and(a, b));
        assert_eq!(plain.unwrap_err(), PrivMailSearchError::ReducedEmptySequence);

        let batched = low_depth_reduce_batched(&mut engine, Vec::new(), |e, a, b| e.or(a, b));
        assert_eq!(batched.unwrap_err(), PrivMailSearchError::ReducedEmptySequence);
    }
}
