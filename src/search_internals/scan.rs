//! The oblivious substring scan shared by every search mode.
//!
//! For one keyword and a list of target words, the scan produces one match
//! bit per word: 1 iff the keyword occurs as a contiguous substring at some
//! position of that word. Each candidate position compares every keyword
//! character against the corresponding text character; there is no early
//! exit anywhere, since both the characters and the match evidence are
//! secret.
//!
//! The work is arranged in two passes so the backend sees a handful of wide
//! SIMD gates instead of thousands of narrow ones. The first pass emits the
//! per-(word, position, character) XNOR agreement bits into six flat lanes,
//! AND-reduces the lanes, OR-masks padding positions, then regroups the flat
//! results per character index and AND-reduces again, yielding one bit per
//! candidate position. The second pass walks that flat array back into
//! per-word slices and OR-reduces each. The result is identical to the naive
//! nested-loop formulation, position for position.

use crate::{
    engine::BooleanEngine,
    search_internals::{compare, error::PrivMailSearchError, params::CHARACTER_BIT_LEN, reduce},
};

/// One keyword prepared for scanning.
pub struct KeywordWires<'a, S> {
    /// 8-bit character wires; for bucketed keywords the length equals the
    /// bucket size.
    pub characters: &'a [S],
    /// Per-character padding flags (1 = padding); absent for keywords with
    /// public length.
    pub length_mask: Option<&'a [S]>,
    /// Smallest true keyword length admitted by the keyword's bucket; equals
    /// the full character count when the length is public.
    pub min_length: usize,
}

/// Candidate positions at which a keyword of minimum length `min_length`
/// could start inside a word of `word_len` characters.
fn candidate_positions(word_len: usize, min_length: usize) -> usize {
    (word_len + 1).saturating_sub(min_length)
}

/// Scans one keyword over one word; see [`scan_words`].
pub fn scan_word<E: BooleanEngine>(
    engine: &mut E,
    keyword: &KeywordWires<'_, E::Share>,
    word: &[E::Share],
    zero: &E::Share,
) -> Result<E::Share, PrivMailSearchError> {
    let mut bits = scan_words(engine, keyword, &[word], zero)?;
    let bit = bits.pop().ok_or(PrivMailSearchError::ReducedEmptySequence)?;
    debug_assert_eq!(engine.bit_length(&bit), 1);
    Ok(bit)
}

/// Scans one keyword over a list of words and returns one match bit per
/// word, in input order. A word with no candidate positions (shorter than
/// the minimum keyword length) contributes the public zero bit: not a match,
/// not an error.
pub fn scan_words<E: BooleanEngine>(
    engine: &mut E,
    keyword: &KeywordWires<'_, E::Share>,
    words: &[&[E::Share]],
    zero: &E::Share,
) -> Result<Vec<E::Share>, PrivMailSearchError> {
    let keyword_len = keyword.characters.len();
    let positions: Vec<usize> = words.iter().map(|word| candidate_positions(word.len(), keyword.min_length)).collect();

    if positions.iter().all(|&count| count == 0) {
        return Ok(vec![zero.clone(); words.len()]);
    }

    // Truncate every character to its encoding width once, up front.
    let keyword_trunc: Vec<E::Share> = keyword.characters.iter().map(|ch| compare::truncate_character(engine, ch)).collect();
    let mut word_trunc: Vec<Vec<E::Share>> = Vec::with_capacity(words.len());
    for word in words {
        word_trunc.push(word.iter().map(|ch| compare::truncate_character(engine, ch)).collect());
    }

    // First pass: one XNOR agreement entry per (word, position, character),
    // collected directly into per-bit lanes for batching. A keyword
    // character overhanging the end of its word contributes a public
    // mismatch, so only its padding mask can lift it back to neutral.
    let mut agreement_lanes: Vec<Vec<E::Share>> = vec![Vec::new(); CHARACTER_BIT_LEN];
    let mut mask_entries: Vec<E::Share> = Vec::new();

    for (word, &count) in word_trunc.iter().zip(positions.iter()) {
        for position in 0..count {
            for (index, keyword_char) in keyword_trunc.iter().enumerate() {
                if position + index < word.len() {
                    let agreement = compare::xnor(engine, keyword_char, &word[position + index]);
                    for (lane, bit) in agreement_lanes.iter_mut().zip(engine.split(&agreement)) {
                        lane.push(bit);
                    }
                } else {
                    for lane in agreement_lanes.iter_mut() {
                        lane.push(zero.clone());
                    }
                }
                if let Some(mask) = keyword.length_mask {
                    mask_entries.push(mask[index].clone());
                }
            }
        }
    }

    // Batched AND across the character-encoding bit lanes gives one equality
    // bit per entry; padding positions are then forced to "match" in one
    // wide OR.
    let lane_wires: Vec<E::Share> = agreement_lanes.iter().map(|lane| engine.batch(lane)).collect();
    let equality = reduce::low_depth_reduce(engine, lane_wires, |e, a, b| e.and(a, b))?;

    let masked = match keyword.length_mask {
        Some(_) => {
            let mask_wide = engine.batch(&mask_entries);
            engine.or(&equality, &mask_wide)
        }
        None => equality,
    };

    // Regroup the flat entries per character index and AND-reduce across the
    // keyword, yielding one bit per candidate position.
    let per_entry = engine.unbatch(&masked);
    let mut character_lanes: Vec<Vec<E::Share>> = vec![Vec::new(); keyword_len];
    for (index, bit) in per_entry.into_iter().enumerate() {
        character_lanes[index % keyword_len].push(bit);
    }

    let character_wires: Vec<E::Share> = character_lanes.iter().map(|lane| engine.batch(lane)).collect();
    let position_match = reduce::low_depth_reduce(engine, character_wires, |e, a, b| e.and(a, b))?;
    let position_bits = engine.unbatch(&position_match);

    // Second pass: walk the flat per-position verdicts back into per-word
    // slices and OR-reduce each.
    let mut results = Vec::with_capacity(words.len());
    let mut cursor = 0;
    for &count in &positions {
        if count == 0 {
            results.push(zero.clone());
            continue;
        }

        let slice = position_bits[cursor..cursor + count].to_vec();
        cursor += count;
        results.push(reduce::low_depth_reduce_batched(engine, slice, |e, a, b| e.or(a, b))?);
    }

    Ok(results)
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::clear::{ClearEngine, ClearShare};

    fn input_text(engine: &mut ClearEngine, text: &[u8]) -> Vec<ClearShare> {
        text.iter().map(|&byte| engine.input_byte(byte, 0)).collect()
    }

    fn input_mask(engine: &mut ClearEngine, true_len: usize, bucket_size: usize) -> Vec<ClearShare> {
        (0..bucket_size).map(|index| engine.input_bit(index >= true_len, 0)).collect()
    }

    #[test]
    fn public_length_keyword_matches_at_any_position() {
        for (text, expected) in [(&b"the cat sat"[..], 1u64), (&b"the dog sat"[..], 0), (&b"cat"[..], 1), (&b"ca"[..], 0)] {
            let mut engine = ClearEngine::new(1);
            let zero = engine.input_bit(false, 0);
            let keyword = input_text(&mut engine, b"cat");
            let word = input_text(&mut engine, text);

            let wires = KeywordWires {
                characters: &keyword,
                length_mask: None,
                min_length: keyword.len(),
            };
            let bit = scan_word(&mut engine, &wires, &word, &zero).expect("scan must build");
            assert_eq!(bit.value(), expected, "text = {:?}", core::str::from_utf8(text));
        }
    }

    #[test]
    fn padding_never_blocks_a_match() {
        // True length 5 inside an 8-byte bucket; padding bytes are arbitrary.
        let mut engine = ClearEngine::new(1);
        let zero = engine.input_bit(false, 0);
        let keyword = input_text(&mut engine, b"melonqqq");
        let mask = input_mask(&mut engine, 5, 8);
        let word = input_text(&mut engine, b"a melon rolled");

        let wires = KeywordWires {
            characters: &keyword,
            length_mask: Some(&mask),
            min_length: 5,
        };
        let bit = scan_word(&mut engine, &wires, &word, &zero).expect("scan must build");
        assert_eq!(bit.value(), 1);
    }

    #[test]
    fn unmasked_overhang_never_fakes_a_match() {
        // True length 7 in an 8-byte bucket, scanned over a 5-character text:
        // the two real characters overhanging the text end must veto the
        // otherwise-agreeing prefix.
        let mut engine = ClearEngine::new(1);
        let zero = engine.input_bit(false, 0);
        let keyword = input_text(&mut engine, b"melonesq");
        let mask = input_mask(&mut engine, 7, 8);
        let word = input_text(&mut engine, b"melon");

        let wires = KeywordWires {
            characters: &keyword,
            length_mask: Some(&mask),
            min_length: 5,
        };
        let bit = scan_word(&mut engine, &wires, &word, &zero).expect("scan must build");
        assert_eq!(bit.value(), 0);
    }

    #[test]
    fn per_word_bits_come_back_in_input_order() {
        let mut engine = ClearEngine::new(1);
        let zero = engine.input_bit(false, 0);
        let keyword = input_text(&mut engine, b"ore");
        let words = [
            input_text(&mut engine, b"boredom"),
            input_text(&mut engine, b"ox"),
            input_text(&mut engine, b"explore"),
            input_text(&mut engine, b"bead"),
        ];

        let wires = KeywordWires {
            characters: &keyword,
            length_mask: None,
            min_length: keyword.len(),
        };
        let word_refs: Vec<&[ClearShare]> = words.iter().map(Vec::as_slice).collect();
        let bits = scan_words(&mut engine, &wires, &word_refs, &zero).expect("scan must build");

        let values: Vec<u64> = bits.iter().map(|bit| bit.value()).collect();
        assert_eq!(values, vec![1, 0, 1, 0]);
    }
}
