//! Oblivious character comparison.
//!
//! Characters are compared on the low-order six bits of their 8-bit shares,
//! the usable alphabet width of the PrivMail text encoding. Comparison is
//! branch-free: every bit of every compared pair is always evaluated, since
//! skipping work based on a secret value would leak it.

use crate::{
    engine::BooleanEngine,
    search_internals::{error::PrivMailSearchError, params::CHARACTER_BIT_LEN, reduce},
};

/// Truncates an 8-bit character wire to the low-order encoding bits.
pub fn truncate_character<E: BooleanEngine>(engine: &mut E, character: &E::Share) -> E::Share {
    let bits = engine.split(character);
    engine.concatenate(&bits[..CHARACTER_BIT_LEN])
}

/// Bitwise XNOR: each result bit is 1 iff the operand bits agree.
pub fn xnor<E: BooleanEngine>(engine: &mut E, a: &E::Share, b: &E::Share) -> E::Share {
    let disagreement = engine.xor(a, b);
    engine.not(&disagreement)
}

/// Equality of two characters: 1 iff the truncated codes are identical,
/// computed as the AND-reduction of their bitwise XNOR.
pub fn characters_equal<E: BooleanEngine>(engine: &mut E, a: &E::Share, b: &E::Share) -> Result<E::Share, PrivMailSearchError> {
    let a_trunc = truncate_character(engine, a);
    let b_trunc = truncate_character(engine, b);

    let agreement = xnor(engine, &a_trunc, &b_trunc);
    let agreement_bits = engine.split(&agreement);

    reduce::low_depth_reduce(engine, agreement_bits, |e, x, y| e.and(x, y))
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::clear::ClearEngine;

    #[test]
    fn equality_holds_exactly_on_the_diagonal() {
        for a in 0u8..64 {
            for b in 0u8..64 {
                let mut engine = ClearEngine::new(1);
                let wire_a = engine.input_byte(a, 0);
                let wire_b = engine.input_byte(b, 0);

                let equal = characters_equal(&mut engine, &wire_a, &wire_b).expect("comparison must build");
                assert_eq!(equal.value() == 1, a == b, "a = {}, b = {}", a, b);
            }
        }
    }

    #[test]
    fn high_order_bits_are_ignored() {
        // 0x21 and 0x61 share their low six bits and must collide.
        let mut engine = ClearEngine::new(1);
        let wire_a = engine.input_byte(0x21, 0);
        let wire_b = engine.input_byte(0x61, 0);

        let equal = characters_equal(&mut engine, &wire_a, &wire_b).expect("comparison must build");
        assert_eq!(equal.value(), 1);
    }
}
