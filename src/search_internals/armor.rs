//! Armored secret-share decoding.
//!
//! Every secret value reaching the search circuits arrives as one
//! ascii-armored string per computing party, holding that party's XOR share
//! of the value's bytes. Decoding reconstructs the shared value inside the
//! engine: each party's bytes become per-party input wires, and the per-party
//! byte sequences are XOR-folded position-wise, so no party's plaintext share
//! ever leaves its own input gate.

use crate::{
    engine::BooleanEngine,
    query::ArmoredShare,
    search_internals::{branch_opt_util, error::PrivMailSearchError, params::BYTE_BIT_LEN},
};

const ARMOR_ALPHABET: &str = "ABCDEFGHIJKLMNOPQRSTUVWXYZabcdefghijklmnopqrstuvwxyz0123456789+/";

/// Decodes one armored share string into raw bytes.
///
/// The armor dialect is deliberately forgiving about `'='`, which is skipped
/// wherever it appears (while still advancing the character counter), and
/// deliberately strict about everything else: any character outside the
/// alphabet makes the whole decode return an empty vector. Callers treat an
/// empty result for a non-empty input as a decode failure.
pub fn armor_decode(input: &str) -> Vec<u8> {
    let mut decoded = Vec::with_capacity(input.len() / 4 * 3);
    let mut bit_stream: u32 = 0;
    let mut counter: u32 = 0;

    for ch in input.chars() {
        if let Some(value) = ARMOR_ALPHABET.find(ch) {
            let offset = 18 - (counter % 4) * 6;
            bit_stream = bit_stream.wrapping_add((value as u32) << offset);
            match offset {
                12 => decoded.push(((bit_stream >> 16) & 0xff) as u8),
                6 => decoded.push(((bit_stream >> 8) & 0xff) as u8),
                0 => {
                    decoded.push((bit_stream & 0xff) as u8);
                    bit_stream = 0;
                }
                _ => {}
            }
        } else if ch != '=' {
            return Vec::new();
        }
        counter += 1;
    }

    decoded
}

/// The validated per-party byte shares of one secret value, decoded from its
/// armored strings but not yet turned into input wires.
#[derive(Debug)]
pub struct DecodedShares {
    per_party: Vec<Vec<u8>>,
}

impl DecodedShares {
    /// Byte length of the shared value.
    pub fn byte_len(&self) -> usize {
        self.per_party.first().map_or(0, Vec::len)
    }

    /// Bit length of the shared value.
    pub fn bit_len(&self) -> usize {
        self.byte_len() * BYTE_BIT_LEN
    }
}

/// Decodes and validates the armored share strings of one value.
///
/// There must be exactly one string per party, every string must decode
/// cleanly, and all decoded shares must have equal byte length. This is pure
/// validation work on public data; no input wire is created here.
pub fn decode_shares(armored: &ArmoredShare, num_parties: usize) -> Result<DecodedShares, PrivMailSearchError> {
    let strings = armored.per_party();
    if branch_opt_util::unlikely(strings.len() != num_parties) {
        return Err(PrivMailSearchError::PartyCountMismatch(num_parties, strings.len()));
    }

    let mut per_party = Vec::with_capacity(strings.len());
    for share in strings {
        let decoded = armor_decode(share);
        if branch_opt_util::unlikely(decoded.is_empty() && !share.is_empty()) {
            return Err(PrivMailSearchError::ShareDecodeFailed);
        }
        per_party.push(decoded);
    }

    if branch_opt_util::unlikely(per_party.windows(2).any(|pair| pair[0].len() != pair[1].len())) {
        return Err(PrivMailSearchError::UnequalShareLengths);
    }

    Ok(DecodedShares { per_party })
}

/// Reconstructs the shared value as one 8-bit wire per byte: each party's
/// bytes enter as that party's inputs, then the per-party sequences are
/// XOR-folded position-wise.
pub fn input_shared_bytes<E: BooleanEngine>(engine: &mut E, shares: &DecodedShares) -> Vec<E::Share> {
    let mut value: Vec<E::Share> = Vec::new();

    for (party, bytes) in shares.per_party.iter().enumerate() {
        if party == 0 {
            value = bytes.iter().map(|&byte| engine.input_byte(byte, party)).collect();
        } else {
            for (slot, &byte) in value.iter_mut().zip(bytes.iter()) {
                let wire = engine.input_byte(byte, party);
                *slot = engine.xor(slot, &wire);
            }
        }
    }

    value
}

/// Splits 8-bit wires into single-bit wires, most significant bit first,
/// matching the bit order of armored bit fields (modifier chains and length
/// masks).
pub fn split_to_bits<E: BooleanEngine>(engine: &mut E, bytes: &[E::Share]) -> Vec<E::Share> {
    let mut bits = Vec::with_capacity(bytes.len() * BYTE_BIT_LEN);
    for byte in bytes {
        let mut split = engine.split(byte);
        split.reverse();
        bits.extend(split);
    }
    bits
}

/// Inverse of [`split_to_bits`]: packs most-significant-bit-first single-bit
/// wires back into 8-bit wires, padding an incomplete trailing group with the
/// public zero bit.
pub fn concat_to_bytes<E: BooleanEngine>(engine: &mut E, bits: &[E::Share], zero: &E::Share) -> Vec<E::Share> {
    let mut bytes = Vec::with_capacity(bits.len().div_ceil(BYTE_BIT_LEN));
    for group in bits.chunks(BYTE_BIT_LEN) {
        let mut byte_bits: Vec<E::Share> = group.to_vec();
        while byte_bits.len() < BYTE_BIT_LEN {
            byte_bits.push(zero.clone());
        }
        byte_bits.reverse();
        bytes.push(engine.concatenate(&byte_bits));
    }
    bytes
}

/// Armors raw bytes; test-side inverse of [`armor_decode`].
#[cfg(test)]
pub fn armor_encode(bytes: &[u8]) -> String {
    let alphabet = ARMOR_ALPHABET.as_bytes();
    let mut out = String::with_capacity(bytes.len().div_ceil(3) * 4);

    for chunk in bytes.chunks(3) {
        let b0 = chunk[0] as u32;
        let b1 = chunk.get(1).copied().unwrap_or(0) as u32;
        let b2 = chunk.get(2).copied().unwrap_or(0) as u32;
        let triple = (b0 << 16) | (b1 << 8) | b2;

        out.push(alphabet[((triple >> 18) & 0x3f) as usize] as char);
        out.push(alphabet[((triple >> 12) & 0x3f) as usize] as char);
        out.push(if chunk.len() > 1 { alphabet[((triple >> 6) & 0x3f) as usize] as char } else { '=' });
        out.push(if chunk.len() > 2 { alphabet[(triple & 0x3f) as usize] as char } else { '=' });
    }

    out
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::clear::ClearEngine;
    use rand::prelude::*;
    use rand_chacha::ChaCha8Rng;
    use test_case::test_case;

    #[test_case("" => Vec::<u8>::new(); "empty input decodes to nothing")]
    #[test_case("TQ==" => vec![0x4d]; "one byte with trailing padding")]
    #[test_case("Y2F0" => vec![0x63, 0x61, 0x74]; "three clean bytes")]
    #[test_case("Y2F=0=" => vec![0x63, 0x61]; "padding consumes counter slots mid-stream")]
    #[test_case("Y2\nF0" => Vec::<u8>::new(); "whitespace is outside the alphabet")]
    #[test_case("Y2F0!" => Vec::<u8>::new(); "any invalid character voids the decode")]
    fn armor_decoder_quirks(input: &str) -> Vec<u8> {
        armor_decode(input)
    }

    #[test]
    fn armor_round_trips_random_bytes() {
        let mut rng = ChaCha8Rng::from_os_rng();

        for len in 1..=48 {
            let mut bytes = vec![0u8; len];
            rng.fill_bytes(&mut bytes);

            assert_eq!(armor_decode(&armor_encode(&bytes)), bytes, "len = {}", len);
        }
    }

    #[test]
    fn shared_value_reconstructs_for_any_party_count() {
        let mut rng = ChaCha8Rng::from_os_rng();
        let plaintext = b"oblivious";

        for num_parties in 1..=4 {
            let mut shares = vec![vec![0u8; plaintext.len()]; num_parties];
            for (index, &byte) in plaintext.iter().enumerate() {
                let mut first = byte;
                for party in 1..num_parties {
                    let blind: u8 = rng.random();
                    shares[party][index] = blind;
                    first ^= blind;
                }
                shares[0][index] = first;
            }

            let armored = ArmoredShare::new(shares.iter().map(|share| armor_encode(share)).collect());

            let mut engine = ClearEngine::new(num_parties);
            let decoded = decode_shares(&armored, num_parties).expect("valid shares must decode");
            let wires = input_shared_bytes(&mut engine, &decoded);

            let reconstructed: Vec<u8> = wires.iter().map(|wire| wire.value() as u8).collect();
            assert_eq!(reconstructed, plaintext, "num_parties = {}", num_parties);
        }
    }

    #[test]
    fn share_validation_rejects_malformed_inputs() {
        let armored = ArmoredShare::new(vec!["Y2F0".to_string()]);
        assert_eq!(decode_shares(&armored, 2).unwrap_err(), PrivMailSearchError::PartyCountMismatch(2, 1));

        let armored = ArmoredShare::new(vec!["Y2F0".to_string(), "@@@@".to_string()]);
        assert_eq!(decode_shares(&armored, 2).unwrap_err(), PrivMailSearchError::ShareDecodeFailed);

        let armored = ArmoredShare::new(vec!["Y2F0".to_string(), "TQ==".to_string()]);
        assert_eq!(decode_shares(&armored, 2).unwrap_err(), PrivMailSearchError::UnequalShareLengths);
    }

    #[test]
    fn bit_splitting_is_most_significant_first_and_concat_pads_with_zeros() {
        let mut engine = ClearEngine::new(1);
        let zero = engine.input_bit(false, 0);

        let byte = engine.input_byte(0b1011_0001, 0);
        let bits = split_to_bits(&mut engine, std::slice::from_ref(&byte));

        let values: Vec<u64> = bits.iter().map(|bit| bit.value()).collect();
        assert_eq!(values, vec![1, 0, 1, 1, 0, 0, 0, 1]);

        let rebuilt = concat_to_bytes(&mut engine, &bits, &zero);
        assert_eq!(rebuilt.len(), 1);
        assert_eq!(rebuilt[0].value(), 0b1011_0001);

        // A partial trailing group refills its low-order positions with zeros.
        let partial = concat_to_bytes(&mut engine, &bits[..3], &zero);
        assert_eq!(partial.len(), 1);
        assert_eq!(partial[0].value(), 0b1010_0000);
    }
}
