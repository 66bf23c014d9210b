//! Secret modifier-chain combination.
//!
//! How per-keyword results combine (AND/OR, with optional negation) is query
//! data, not code: the chain arrives as secret bits, and a fixed two-gate
//! formula applies whichever operator the bits select without revealing the
//! choice to the computing parties.

use crate::{
    engine::BooleanEngine,
    search_internals::{
        armor::{self, DecodedShares},
        params::CHAIN_BITS_PER_EXTRA_KEYWORD,
    },
};

/// Folds one keyword's result into the accumulator under secret operator
/// selection:
///
/// `((previous ^ OR) & ((next ^ NOT) ^ OR)) ^ OR`
///
/// evaluates to `previous AND (next ^ NOT)` when `OR = 0` and to
/// `previous OR (next ^ NOT)` when `OR = 1`.
pub fn chaining_circuit<E: BooleanEngine>(engine: &mut E, previous: &E::Share, next: &E::Share, or_bit: &E::Share, not_bit: &E::Share) -> E::Share {
    let lhs = engine.xor(previous, or_bit);
    let negated = engine.xor(next, not_bit);
    let rhs = engine.xor(&negated, or_bit);
    let selected = engine.and(&lhs, &rhs);
    engine.xor(&selected, or_bit)
}

/// The decoded modifier chain of one query: bit 0 is the NOT flag for the
/// first keyword, bits `2j − 1` and `2j` the OR-selector and NOT flag for
/// keyword `j`. The orchestrator guarantees at least `2k − 1` bits before
/// construction starts.
pub struct ModifierChain<S> {
    bits: Vec<S>,
}

impl<S: Clone> ModifierChain<S> {
    /// Turns the validated chain shares into input wires, split to single
    /// bits most significant first.
    pub fn decode<E: BooleanEngine<Share = S>>(engine: &mut E, shares: &DecodedShares) -> ModifierChain<S> {
        let bytes = armor::input_shared_bytes(engine, shares);
        let bits = armor::split_to_bits(engine, &bytes);
        ModifierChain { bits }
    }

    /// Applies the first keyword's NOT flag: `result ^ chain[0]`.
    pub fn apply_first<E: BooleanEngine<Share = S>>(&self, engine: &mut E, result: &S) -> S {
        engine.xor(result, &self.bits[0])
    }

    /// Combines keyword `keyword_index ≥ 1` into the accumulated result.
    pub fn combine<E: BooleanEngine<Share = S>>(&self, engine: &mut E, previous: &S, result: &S, keyword_index: usize) -> S {
        let or_bit = &self.bits[CHAIN_BITS_PER_EXTRA_KEYWORD * keyword_index - 1];
        let not_bit = &self.bits[CHAIN_BITS_PER_EXTRA_KEYWORD * keyword_index];
        chaining_circuit(engine, previous, result, or_bit, not_bit)
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::clear::ClearEngine;

    #[test]
    fn formula_selects_and_or_with_optional_negation() {
        for previous in [false, true] {
            for next in [false, true] {
                for or_flag in [false, true] {
                    for not_flag in [false, true] {
                        let mut engine = ClearEngine::new(1);
                        let wire_prev = engine.input_bit(previous, 0);
                        let wire_next = engine.input_bit(next, 0);
                        let wire_or = engine.input_bit(or_flag, 0);
                        let wire_not = engine.input_bit(not_flag, 0);

                        let out = chaining_circuit(&mut engine, &wire_prev, &wire_next, &wire_or, &wire_not);

                        let operand = next ^ not_flag;
                        let expected = if or_flag { previous || operand } else { previous && operand };
                        assert_eq!(
                            out.value() == 1,
                            expected,
                            "previous = {}, next = {}, or = {}, not = {}",
                            previous,
                            next,
                            or_flag,
                            not_flag
                        );
                    }
                }
            }
        }
    }
}
