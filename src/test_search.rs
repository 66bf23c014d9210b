#![cfg(test)]

use crate::{
    PrivMailSearchError,
    clear::{ClearEngine, ClearShare},
    query::{ArmoredShare, BucketScheme, IndexBucket, IndexEntry, MailText, SearchIndex, SearchMode, SearchQuery, WordBucket},
    search::search,
    search_internals::armor::armor_encode,
};
use rand::prelude::*;
use rand_chacha::ChaCha8Rng;

const PADDING_BYTE: u8 = b'*';

/// Splits plaintext bytes into `num_parties` XOR shares and armors each.
fn share_bytes(rng: &mut ChaCha8Rng, plaintext: &[u8], num_parties: usize) -> ArmoredShare {
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
    ArmoredShare::new(shares.iter().map(|share| armor_encode(share)).collect())
}

/// Packs modifier-chain bits most significant first into zero-padded bytes
/// and shares them.
fn share_chain(rng: &mut ChaCha8Rng, bits: &[bool], num_parties: usize) -> ArmoredShare {
    let mut bytes = vec![0u8; bits.len().div_ceil(8)];
    for (index, &bit) in bits.iter().enumerate() {
        if bit {
            bytes[index / 8] |= 1 << (7 - (index % 8));
        }
    }
    share_bytes(rng, &bytes, num_parties)
}

/// Length-mask bytes for a keyword of `true_len` characters in a bucket of
/// `bucket_size`: 0 marks a real character, 1 marks padding.
fn length_mask_bytes(true_len: usize, bucket_size: usize) -> Vec<u8> {
    let mut bytes = vec![0u8; bucket_size.div_ceil(8)];
    for index in 0..(bytes.len() * 8) {
        if index >= true_len {
            bytes[index / 8] |= 1 << (7 - (index % 8));
        }
    }
    bytes
}

/// A keyword in all three share encodings, bucketed up to `bucket_size`.
fn query_for(rng: &mut ChaCha8Rng, keyword: &str, bucket_size: u32, num_parties: usize) -> SearchQuery {
    let mut bucketed = keyword.as_bytes().to_vec();
    bucketed.resize(bucket_size as usize, PADDING_BYTE);

    SearchQuery {
        truncated: share_bytes(rng, keyword.as_bytes(), num_parties),
        bucketed: share_bytes(rng, &bucketed, num_parties),
        length_mask: share_bytes(rng, &length_mask_bytes(keyword.len(), bucket_size as usize), num_parties),
        bucket_size,
    }
}

fn mail_for(rng: &mut ChaCha8Rng, body: &str, num_parties: usize) -> MailText {
    MailText {
        truncated: share_bytes(rng, body.as_bytes(), num_parties),
        buckets: Vec::new(),
    }
}

fn word_bucket_for(rng: &mut ChaCha8Rng, bucket_size: u32, words: &[&str], num_parties: usize) -> WordBucket {
    WordBucket {
        bucket_size,
        words: words.iter().map(|word| share_bytes(rng, word.as_bytes(), num_parties)).collect(),
    }
}

fn reveal(results: &[ClearShare]) -> Vec<u64> {
    results.iter().map(|share| share.value()).collect()
}

#[test]
fn normal_mode_finds_the_keyword_across_mails() {
    let mut rng = ChaCha8Rng::from_os_rng();
    let scheme = BucketScheme::new(vec![4, 8]).expect("scheme is ascending");

    for num_parties in [1, 2, 3] {
        let mut engine = ClearEngine::new(num_parties);

        let queries = vec![query_for(&mut rng, "secret", 8, num_parties)];
        let chain = share_chain(&mut rng, &[false], num_parties);
        let mails = vec![
            mail_for(&mut rng, "keep this secret safe", num_parties),
            mail_for(&mut rng, "nothing to see here", num_parties),
            mail_for(&mut rng, "secret", num_parties),
        ];

        let results = search(&mut engine, &queries, &chain, &mails, &SearchIndex::default(), &scheme, SearchMode::Normal).expect("query is well-formed");
        assert_eq!(reveal(&results), vec![1, 0, 1], "num_parties = {}", num_parties);
    }
}

#[test]
fn hidden_mode_agrees_with_normal_mode() {
    let mut rng = ChaCha8Rng::from_os_rng();
    let scheme = BucketScheme::new(vec![4, 8]).expect("scheme is ascending");
    let num_parties = 2;

    // "melon" has true length 5, so its correct bucket is 8.
    let queries = vec![query_for(&mut rng, "melon", 8, num_parties)];
    let chain = share_chain(&mut rng, &[false], num_parties);
    let bodies = ["watermelon juice", "apple pie", "melo", ""];

    let mut verdicts = Vec::new();
    for mode in [SearchMode::Normal, SearchMode::Hidden] {
        let mut engine = ClearEngine::new(num_parties);
        let mails: Vec<MailText> = bodies.iter().map(|body| mail_for(&mut rng, body, num_parties)).collect();

        let results = search(&mut engine, &queries, &chain, &mails, &SearchIndex::default(), &scheme, mode).expect("query is well-formed");
        verdicts.push(reveal(&results));
    }

    assert_eq!(verdicts[0], vec![1, 0, 0, 0]);
    assert_eq!(verdicts[0], verdicts[1]);
}

#[test]
fn hidden_mode_padding_stays_transparent() {
    let mut rng = ChaCha8Rng::from_os_rng();
    let scheme = BucketScheme::new(vec![4, 8]).expect("scheme is ascending");
    let num_parties = 2;

    // True length 3 inside bucket 4: padding must not block the match, and
    // the padded byte must not be required to appear in the text.
    let queries = vec![query_for(&mut rng, "fig", 4, num_parties)];
    let chain = share_chain(&mut rng, &[false], num_parties);
    let mails = vec![
        mail_for(&mut rng, "figs and plums", num_parties),
        mail_for(&mut rng, "grapes only", num_parties),
    ];

    let mut engine = ClearEngine::new(num_parties);
    let results = search(&mut engine, &queries, &chain, &mails, &SearchIndex::default(), &scheme, SearchMode::Hidden).expect("query is well-formed");
    assert_eq!(reveal(&results), vec![1, 0]);
}

#[test]
fn modifier_chain_selects_and_or_and_not() {
    let mut rng = ChaCha8Rng::from_os_rng();
    let scheme = BucketScheme::new(vec![4, 8]).expect("scheme is ascending");
    let num_parties = 2;

    let body = "the cat sat on the mat";
    // Per-keyword verdicts on this body: "cat" = 1, "dog" = 0.
    let cases: [(&[bool], u64); 4] = [
        (&[false, true, true], 1),  // cat OR (NOT dog)
        (&[false, false, false], 0), // cat AND dog
        (&[false, false, true], 1), // cat AND (NOT dog)
        (&[true, true, false], 0),  // (NOT cat) OR dog
    ];

    for (chain_bits, expected) in cases {
        let mut engine = ClearEngine::new(num_parties);

        let queries = vec![query_for(&mut rng, "cat", 4, num_parties), query_for(&mut rng, "dog", 4, num_parties)];
        let chain = share_chain(&mut rng, chain_bits, num_parties);
        let mails = vec![mail_for(&mut rng, body, num_parties)];

        let results = search(&mut engine, &queries, &chain, &mails, &SearchIndex::default(), &scheme, SearchMode::Normal).expect("query is well-formed");
        assert_eq!(reveal(&results), vec![expected], "chain = {:?}", chain_bits);
    }
}

#[test]
fn too_short_targets_read_as_no_match_and_chain_correctly() {
    let mut rng = ChaCha8Rng::from_os_rng();
    let scheme = BucketScheme::new(vec![4, 8]).expect("scheme is ascending");
    let num_parties = 2;

    // "tea" is present in the text, "brewing" cannot fit at all; an AND
    // chain must therefore reject the mail.
    let queries = vec![query_for(&mut rng, "tea", 4, num_parties), query_for(&mut rng, "brewing", 8, num_parties)];
    let chain = share_chain(&mut rng, &[false, false, false], num_parties);
    let mails = vec![mail_for(&mut rng, "tea", num_parties)];

    let mut engine = ClearEngine::new(num_parties);
    let results = search(&mut engine, &queries, &chain, &mails, &SearchIndex::default(), &scheme, SearchMode::Hidden).expect("query is well-formed");
    assert_eq!(reveal(&results), vec![0]);
}

#[test]
fn bucket_mode_skips_undersized_blocks() {
    let mut rng = ChaCha8Rng::from_os_rng();
    let scheme = BucketScheme::new(vec![4, 8]).expect("scheme is ascending");
    let num_parties = 2;

    let queries = vec![query_for(&mut rng, "lemon", 8, num_parties)];
    let chain = share_chain(&mut rng, &[false], num_parties);

    let mails = vec![
        // A qualifying block containing the keyword.
        MailText {
            truncated: ArmoredShare::new(vec![String::new(); num_parties]),
            buckets: vec![
                word_bucket_for(&mut rng, 4, &["much", "else"], num_parties),
                word_bucket_for(&mut rng, 8, &["lemonade", "grinding"], num_parties),
            ],
        },
        // Only an undersized block; it holds matching bytes, but a block
        // this small is categorically skipped.
        MailText {
            truncated: ArmoredShare::new(vec![String::new(); num_parties]),
            buckets: vec![word_bucket_for(&mut rng, 4, &["lemonade"], num_parties)],
        },
        // No blocks at all.
        MailText {
            truncated: ArmoredShare::new(vec![String::new(); num_parties]),
            buckets: Vec::new(),
        },
    ];

    let mut engine = ClearEngine::new(num_parties);
    let results = search(&mut engine, &queries, &chain, &mails, &SearchIndex::default(), &scheme, SearchMode::Bucket).expect("query is well-formed");
    assert_eq!(reveal(&results), vec![1, 0, 0]);
}

#[test]
fn index_mode_emits_one_bit_per_indexed_word() {
    let mut rng = ChaCha8Rng::from_os_rng();
    let scheme = BucketScheme::new(vec![4, 8]).expect("scheme is ascending");
    let num_parties = 2;

    let queries = vec![query_for(&mut rng, "lemon", 8, num_parties)];
    let chain = share_chain(&mut rng, &[false], num_parties);

    let index = SearchIndex {
        buckets: vec![
            IndexBucket {
                bucket_size: 4,
                entries: vec![IndexEntry {
                    word: share_bytes(&mut rng, b"mint", num_parties),
                    occurrences: "kQ==".to_string(),
                }],
            },
            IndexBucket {
                bucket_size: 8,
                entries: vec![
                    IndexEntry {
                        word: share_bytes(&mut rng, b"lemonade", num_parties),
                        occurrences: "aB==".to_string(),
                    },
                    IndexEntry {
                        word: share_bytes(&mut rng, b"rosemary", num_parties),
                        occurrences: "cD==".to_string(),
                    },
                ],
            },
        ],
    };

    let mut engine = ClearEngine::new(num_parties);
    let results = search(&mut engine, &queries, &chain, &[], &index, &scheme, SearchMode::Index).expect("query is well-formed");

    assert_eq!(results.len(), index.num_words());
    // Index order: "mint" sits in an undersized block and reads as a public
    // no-match; "lemonade" matches; "rosemary" does not.
    assert_eq!(reveal(&results), vec![0, 1, 0]);
}

#[test]
fn malformed_queries_fail_before_any_input_is_created() {
    let mut rng = ChaCha8Rng::from_os_rng();
    let scheme = BucketScheme::new(vec![4, 8]).expect("scheme is ascending");
    let num_parties = 2;

    let well_formed_mail = mail_for(&mut rng, "plain sailing", num_parties);

    // No keywords at all.
    let mut engine = ClearEngine::new(num_parties);
    let chain = share_chain(&mut rng, &[false], num_parties);
    let outcome = search(&mut engine, &[], &chain, std::slice::from_ref(&well_formed_mail), &SearchIndex::default(), &scheme, SearchMode::Normal);
    assert_eq!(outcome.unwrap_err(), PrivMailSearchError::EmptyQuerySet);
    assert_eq!(engine.inputs_created(), 0);

    // Five keywords need nine chain bits; one byte provides only eight.
    let mut engine = ClearEngine::new(num_parties);
    let queries: Vec<SearchQuery> = (0..5).map(|_| query_for(&mut rng, "tea", 4, num_parties)).collect();
    let chain = share_bytes(&mut rng, &[0u8], num_parties);
    let outcome = search(&mut engine, &queries, &chain, std::slice::from_ref(&well_formed_mail), &SearchIndex::default(), &scheme, SearchMode::Normal);
    assert_eq!(outcome.unwrap_err(), PrivMailSearchError::ModifierChainTooShort(9, 8));
    assert_eq!(engine.inputs_created(), 0);

    // A bucket size missing from the scheme.
    let mut engine = ClearEngine::new(num_parties);
    let queries = vec![query_for(&mut rng, "tea", 6, num_parties)];
    let chain = share_chain(&mut rng, &[false], num_parties);
    let outcome = search(&mut engine, &queries, &chain, std::slice::from_ref(&well_formed_mail), &SearchIndex::default(), &scheme, SearchMode::Hidden);
    assert_eq!(outcome.unwrap_err(), PrivMailSearchError::UnknownBucketSize(6));
    assert_eq!(engine.inputs_created(), 0);

    // Per-party shares of different lengths.
    let mut engine = ClearEngine::new(num_parties);
    let queries = vec![query_for(&mut rng, "tea", 4, num_parties)];
    let chain = share_chain(&mut rng, &[false], num_parties);
    let lopsided = MailText {
        truncated: ArmoredShare::new(vec!["Y2F0".to_string(), "TQ==".to_string()]),
        buckets: Vec::new(),
    };
    let outcome = search(&mut engine, &queries, &chain, &[lopsided], &SearchIndex::default(), &scheme, SearchMode::Normal);
    assert_eq!(outcome.unwrap_err(), PrivMailSearchError::UnequalShareLengths);
    assert_eq!(engine.inputs_created(), 0);

    // A share string with characters outside the armor alphabet.
    let mut engine = ClearEngine::new(num_parties);
    let queries = vec![query_for(&mut rng, "tea", 4, num_parties)];
    let chain = share_chain(&mut rng, &[false], num_parties);
    let garbled = MailText {
        truncated: ArmoredShare::new(vec!["Y2F0".to_string(), "$$$$".to_string()]),
        buckets: Vec::new(),
    };
    let outcome = search(&mut engine, &queries, &chain, &[garbled], &SearchIndex::default(), &scheme, SearchMode::Normal);
    assert_eq!(outcome.unwrap_err(), PrivMailSearchError::ShareDecodeFailed);
    assert_eq!(engine.inputs_created(), 0);

    // A keyword whose truncated form decodes to zero bytes.
    let mut engine = ClearEngine::new(num_parties);
    let mut queries = vec![query_for(&mut rng, "tea", 4, num_parties)];
    queries[0].truncated = ArmoredShare::new(vec![String::new(); num_parties]);
    let chain = share_chain(&mut rng, &[false], num_parties);
    let outcome = search(&mut engine, &queries, &chain, std::slice::from_ref(&well_formed_mail), &SearchIndex::default(), &scheme, SearchMode::Normal);
    assert_eq!(outcome.unwrap_err(), PrivMailSearchError::EmptyKeyword);
    assert_eq!(engine.inputs_created(), 0);

    // A bucketed keyword that does not fill its bucket.
    let mut engine = ClearEngine::new(num_parties);
    let mut queries = vec![query_for(&mut rng, "tea", 4, num_parties)];
    queries[0].bucketed = share_bytes(&mut rng, b"tea", num_parties);
    let chain = share_chain(&mut rng, &[false], num_parties);
    let outcome = search(&mut engine, &queries, &chain, std::slice::from_ref(&well_formed_mail), &SearchIndex::default(), &scheme, SearchMode::Hidden);
    assert_eq!(outcome.unwrap_err(), PrivMailSearchError::BucketedKeywordLengthMismatch(4, 3));
    assert_eq!(engine.inputs_created(), 0);

    // A length mask with fewer bits than the bucket has positions.
    let mut engine = ClearEngine::new(num_parties);
    let mut queries = vec![query_for(&mut rng, "porcupine", 12, num_parties)];
    queries[0].length_mask = share_bytes(&mut rng, &[0xffu8], num_parties);
    let chain = share_chain(&mut rng, &[false], num_parties);
    let scheme_with_12 = BucketScheme::new(vec![4, 8, 12]).expect("scheme is ascending");
    let outcome = search(&mut engine, &queries, &chain, std::slice::from_ref(&well_formed_mail), &SearchIndex::default(), &scheme_with_12, SearchMode::Hidden);
    assert_eq!(outcome.unwrap_err(), PrivMailSearchError::LengthMaskTooShort(12, 8));
    assert_eq!(engine.inputs_created(), 0);
}
