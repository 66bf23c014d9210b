//! Query orchestration.
//!
//! [`search`] validates every public precondition of a query, decodes the
//! armored shares into engine wires, dispatches to the driver for the
//! selected [`SearchMode`], and folds the per-keyword verdicts through the
//! secret modifier chain into the final result vector. All four drivers
//! route their comparisons through the single substring scan in
//! `search_internals::scan`; they differ only in which targets they scan and
//! in how per-word evidence is aggregated.

use crate::{
    engine::BooleanEngine,
    query::{ArmoredShare, BucketScheme, MailText, SearchIndex, SearchMode, SearchQuery},
    search_internals::{
        armor::{self, DecodedShares},
        branch_opt_util,
        chain::ModifierChain,
        error::PrivMailSearchError,
        params::CHAIN_BITS_PER_EXTRA_KEYWORD,
        reduce,
        scan::{self, KeywordWires},
    },
};
use tracing::debug;

/// Validated byte shares of one bucketed keyword, before wire creation.
struct BucketedQueryShares {
    keyword: DecodedShares,
    length_mask: DecodedShares,
    bucket_size: u32,
    min_length: usize,
}

/// A bucketed keyword as engine wires.
struct BucketedKeywordWires<S> {
    characters: Vec<S>,
    length_mask: Vec<S>,
    bucket_size: u32,
    min_length: usize,
}

/// Validated byte shares of one word block.
struct DecodedWordBucket {
    bucket_size: u32,
    words: Vec<DecodedShares>,
}

/// A word block as engine wires.
struct WordBucketWires<S> {
    bucket_size: u32,
    words: Vec<Vec<S>>,
}

/// Builds and returns the match-bit circuit for one search query.
///
/// The returned vector holds one secret match bit per mail for the `Normal`,
/// `Hidden` and `Bucket` modes, and one secret match bit per indexed word
/// (in index order) for the `Index` mode. The bits stay secret-shared;
/// whether and to whom they are revealed is the caller's decision.
///
/// Every public precondition is checked before the first gate is issued,
/// since issued gates cost interaction rounds with peer parties and cannot
/// be unwound: the keyword set must be non-empty, the modifier chain must
/// decode to at least `2k − 1` bits for `k` keywords, every armored share
/// must decode cleanly with equal per-party lengths, and every bucket size
/// in play must appear in the bucket scheme. A mail or word too short for a
/// keyword is not an error; its match bit is the public zero.
///
/// # Arguments
///
/// * `engine` - The secure-computation backend the circuit is built against.
/// * `queries` - One entry per keyword, in query order.
/// * `modifier_chain_share` - The armored share of the secret modifier chain.
/// * `mails` - The mails to search; consulted by every mode except `Index`.
/// * `index` - The global word index; consulted only by the `Index` mode.
/// * `scheme` - The public bucket-size boundaries.
/// * `mode` - The search strategy to drive.
///
/// # Returns
///
/// The ordered result shares, or the first precondition violation
/// encountered. A failure aborts the whole query; no partial result vector
/// is ever produced.
pub fn search<E: BooleanEngine>(
    engine: &mut E,
    queries: &[SearchQuery],
    modifier_chain_share: &ArmoredShare,
    mails: &[MailText],
    index: &SearchIndex,
    scheme: &BucketScheme,
    mode: SearchMode,
) -> Result<Vec<E::Share>, PrivMailSearchError> {
    if branch_opt_util::unlikely(queries.is_empty()) {
        return Err(PrivMailSearchError::EmptyQuerySet);
    }

    let num_parties = engine.num_parties();

    let chain_shares = armor::decode_shares(modifier_chain_share, num_parties)?;
    let needed_bits = CHAIN_BITS_PER_EXTRA_KEYWORD * queries.len() - 1;
    if branch_opt_util::unlikely(chain_shares.bit_len() < needed_bits) {
        return Err(PrivMailSearchError::ModifierChainTooShort(needed_bits, chain_shares.bit_len()));
    }

    debug!(?mode, num_keywords = queries.len(), num_mails = mails.len(), "constructing search circuit");

    match mode {
        SearchMode::Normal => search_normal(engine, queries, &chain_shares, mails, num_parties),
        SearchMode::Hidden => search_hidden(engine, queries, &chain_shares, mails, scheme, num_parties),
        SearchMode::Bucket => search_bucket(engine, queries, &chain_shares, mails, scheme, num_parties),
        SearchMode::Index => search_index(engine, queries, &chain_shares, index, scheme, num_parties),
    }
}

/// Full scan with public keyword lengths.
fn search_normal<E: BooleanEngine>(
    engine: &mut E,
    queries: &[SearchQuery],
    chain_shares: &DecodedShares,
    mails: &[MailText],
    num_parties: usize,
) -> Result<Vec<E::Share>, PrivMailSearchError> {
    let mut keywords = Vec::with_capacity(queries.len());
    for query in queries {
        let decoded = armor::decode_shares(&query.truncated, num_parties)?;
        if branch_opt_util::unlikely(decoded.byte_len() == 0) {
            return Err(PrivMailSearchError::EmptyKeyword);
        }
        debug!(keyword_len = decoded.byte_len(), "decoded keyword without bucketing");
        keywords.push(decoded);
    }

    let mut texts = Vec::with_capacity(mails.len());
    for mail in mails {
        texts.push(armor::decode_shares(&mail.truncated, num_parties)?);
    }

    // Public data is fully validated; gates may be issued from here on.
    let zero = engine.input_bit(false, 0);
    let chain = ModifierChain::decode(engine, chain_shares);

    let keyword_wires: Vec<Vec<E::Share>> = keywords.iter().map(|keyword| armor::input_shared_bytes(engine, keyword)).collect();
    let mut text_wires = Vec::with_capacity(texts.len());
    for text in &texts {
        text_wires.push(armor::input_shared_bytes(engine, text));
    }

    let mut results = Vec::new();
    for (keyword_index, characters) in keyword_wires.iter().enumerate() {
        let wires = KeywordWires {
            characters: characters.as_slice(),
            length_mask: None,
            min_length: characters.len(),
        };

        let mut per_mail = Vec::with_capacity(text_wires.len());
        for text in &text_wires {
            per_mail.push(scan::scan_word(engine, &wires, text, &zero)?);
        }

        results = fold_keyword(engine, &chain, results, &per_mail, keyword_index);
    }

    Ok(results)
}

/// Full scan with bucketed keywords; true keyword lengths stay hidden inside
/// their buckets.
fn search_hidden<E: BooleanEngine>(
    engine: &mut E,
    queries: &[SearchQuery],
    chain_shares: &DecodedShares,
    mails: &[MailText],
    scheme: &BucketScheme,
    num_parties: usize,
) -> Result<Vec<E::Share>, PrivMailSearchError> {
    let bucketed = decode_bucketed_queries(queries, scheme, num_parties)?;

    let mut texts = Vec::with_capacity(mails.len());
    for mail in mails {
        texts.push(armor::decode_shares(&mail.truncated, num_parties)?);
    }

    let zero = engine.input_bit(false, 0);
    let chain = ModifierChain::decode(engine, chain_shares);
    let keywords = bucketed_keyword_wires(engine, &bucketed);

    let mut text_wires = Vec::with_capacity(texts.len());
    for text in &texts {
        text_wires.push(armor::input_shared_bytes(engine, text));
    }

    let mut results = Vec::new();
    for (keyword_index, keyword) in keywords.iter().enumerate() {
        let wires = KeywordWires {
            characters: keyword.characters.as_slice(),
            length_mask: Some(keyword.length_mask.as_slice()),
            min_length: keyword.min_length,
        };

        let mut per_mail = Vec::with_capacity(text_wires.len());
        for text in &text_wires {
            per_mail.push(scan::scan_word(engine, &wires, text, &zero)?);
        }

        results = fold_keyword(engine, &chain, results, &per_mail, keyword_index);
    }

    Ok(results)
}

/// Bucketed keywords over per-mail word blocks. Blocks whose bucket size is
/// smaller than the keyword's cannot contain it and are skipped outright;
/// evidence from the remaining blocks is OR-reduced per block and then
/// across blocks.
fn search_bucket<E: BooleanEngine>(
    engine: &mut E,
    queries: &[SearchQuery],
    chain_shares: &DecodedShares,
    mails: &[MailText],
    scheme: &BucketScheme,
    num_parties: usize,
) -> Result<Vec<E::Share>, PrivMailSearchError> {
    let bucketed = decode_bucketed_queries(queries, scheme, num_parties)?;

    let mut decoded_mails = Vec::with_capacity(mails.len());
    for mail in mails {
        let mut buckets = Vec::with_capacity(mail.buckets.len());
        for bucket in &mail.buckets {
            if branch_opt_util::unlikely(!scheme.contains(bucket.bucket_size)) {
                return Err(PrivMailSearchError::UnknownBucketSize(bucket.bucket_size));
            }
            let mut words = Vec::with_capacity(bucket.words.len());
            for word in &bucket.words {
                words.push(armor::decode_shares(word, num_parties)?);
            }
            buckets.push(DecodedWordBucket {
                bucket_size: bucket.bucket_size,
                words,
            });
        }
        decoded_mails.push(buckets);
    }

    let zero = engine.input_bit(false, 0);
    let chain = ModifierChain::decode(engine, chain_shares);
    let keywords = bucketed_keyword_wires(engine, &bucketed);

    let mut mail_wires: Vec<Vec<WordBucketWires<E::Share>>> = Vec::with_capacity(decoded_mails.len());
    for buckets in &decoded_mails {
        let mut bucket_wires = Vec::with_capacity(buckets.len());
        for bucket in buckets {
            let mut words = Vec::with_capacity(bucket.words.len());
            for word in &bucket.words {
                words.push(armor::input_shared_bytes(engine, word));
            }
            bucket_wires.push(WordBucketWires {
                bucket_size: bucket.bucket_size,
                words,
            });
        }
        mail_wires.push(bucket_wires);
    }

    let mut results = Vec::new();
    for (keyword_index, keyword) in keywords.iter().enumerate() {
        let wires = KeywordWires {
            characters: keyword.characters.as_slice(),
            length_mask: Some(keyword.length_mask.as_slice()),
            min_length: keyword.min_length,
        };

        let mut per_mail = Vec::with_capacity(mail_wires.len());
        for mail in &mail_wires {
            let qualifying: Vec<&WordBucketWires<E::Share>> = mail.iter().filter(|bucket| bucket.bucket_size >= keyword.bucket_size).collect();
            let word_refs: Vec<&[E::Share]> = qualifying.iter().flat_map(|bucket| bucket.words.iter().map(Vec::as_slice)).collect();

            let mail_bit = if word_refs.is_empty() {
                // No block can possibly contain the keyword.
                zero.clone()
            } else {
                let per_word = scan::scan_words(engine, &wires, &word_refs, &zero)?;

                let mut per_bucket = Vec::with_capacity(qualifying.len());
                let mut cursor = 0;
                for bucket in &qualifying {
                    if bucket.words.is_empty() {
                        continue;
                    }
                    let slice = per_word[cursor..cursor + bucket.words.len()].to_vec();
                    cursor += bucket.words.len();
                    per_bucket.push(reduce::low_depth_reduce_batched(engine, slice, |e, a, b| e.or(a, b))?);
                }

                reduce::low_depth_reduce_batched(engine, per_bucket, |e, a, b| e.or(a, b))?
            };
            per_mail.push(mail_bit);
        }

        results = fold_keyword(engine, &chain, results, &per_mail, keyword_index);
    }

    Ok(results)
}

/// Bucketed keywords over the global word index: one match bit per indexed
/// word rather than per mail. Mapping word bits back to mails through the
/// occurrence bitmaps happens outside this crate.
fn search_index<E: BooleanEngine>(
    engine: &mut E,
    queries: &[SearchQuery],
    chain_shares: &DecodedShares,
    index: &SearchIndex,
    scheme: &BucketScheme,
    num_parties: usize,
) -> Result<Vec<E::Share>, PrivMailSearchError> {
    let bucketed = decode_bucketed_queries(queries, scheme, num_parties)?;

    let mut decoded_buckets = Vec::with_capacity(index.buckets.len());
    for bucket in &index.buckets {
        if branch_opt_util::unlikely(!scheme.contains(bucket.bucket_size)) {
            return Err(PrivMailSearchError::UnknownBucketSize(bucket.bucket_size));
        }
        let mut words = Vec::with_capacity(bucket.entries.len());
        for entry in &bucket.entries {
            words.push(armor::decode_shares(&entry.word, num_parties)?);
        }
        decoded_buckets.push(DecodedWordBucket {
            bucket_size: bucket.bucket_size,
            words,
        });
    }

    let zero = engine.input_bit(false, 0);
    let chain = ModifierChain::decode(engine, chain_shares);
    let keywords = bucketed_keyword_wires(engine, &bucketed);

    let mut bucket_wires: Vec<WordBucketWires<E::Share>> = Vec::with_capacity(decoded_buckets.len());
    for bucket in &decoded_buckets {
        let mut words = Vec::with_capacity(bucket.words.len());
        for word in &bucket.words {
            words.push(armor::input_shared_bytes(engine, word));
        }
        bucket_wires.push(WordBucketWires {
            bucket_size: bucket.bucket_size,
            words,
        });
    }

    let mut results = Vec::new();
    for (keyword_index, keyword) in keywords.iter().enumerate() {
        let wires = KeywordWires {
            characters: keyword.characters.as_slice(),
            length_mask: Some(keyword.length_mask.as_slice()),
            min_length: keyword.min_length,
        };

        let qualifying_refs: Vec<&[E::Share]> = bucket_wires
            .iter()
            .filter(|bucket| bucket.bucket_size >= keyword.bucket_size)
            .flat_map(|bucket| bucket.words.iter().map(Vec::as_slice))
            .collect();

        let scanned = if qualifying_refs.is_empty() {
            Vec::new()
        } else {
            scan::scan_words(engine, &wires, &qualifying_refs, &zero)?
        };

        // One bit per indexed word, in index order; words in blocks too
        // small for the keyword read as a public no-match.
        let mut per_word = Vec::with_capacity(index.num_words());
        let mut cursor = 0;
        for bucket in &bucket_wires {
            if bucket.bucket_size < keyword.bucket_size {
                per_word.extend(std::iter::repeat_with(|| zero.clone()).take(bucket.words.len()));
            } else {
                per_word.extend_from_slice(&scanned[cursor..cursor + bucket.words.len()]);
                cursor += bucket.words.len();
            }
        }

        results = fold_keyword(engine, &chain, results, &per_word, keyword_index);
    }

    Ok(results)
}

/// Folds one keyword's per-target bits into the accumulated results through
/// the modifier chain. The first keyword seeds the accumulator.
fn fold_keyword<E: BooleanEngine>(
    engine: &mut E,
    chain: &ModifierChain<E::Share>,
    previous: Vec<E::Share>,
    keyword_results: &[E::Share],
    keyword_index: usize,
) -> Vec<E::Share> {
    if keyword_index == 0 {
        keyword_results.iter().map(|bit| chain.apply_first(engine, bit)).collect()
    } else {
        previous
            .iter()
            .zip(keyword_results.iter())
            .map(|(accumulated, bit)| chain.combine(engine, accumulated, bit, keyword_index))
            .collect()
    }
}

/// Validates and decodes every bucketed keyword of a query: the bucket size
/// must come from the scheme, the keyword share must decode to exactly the
/// bucket size, and the length mask must cover every bucketed position.
fn decode_bucketed_queries(queries: &[SearchQuery], scheme: &BucketScheme, num_parties: usize) -> Result<Vec<BucketedQueryShares>, PrivMailSearchError> {
    let mut decoded = Vec::with_capacity(queries.len());
    for query in queries {
        let min_length = scheme.min_keyword_length(query.bucket_size)? as usize;

        let keyword = armor::decode_shares(&query.bucketed, num_parties)?;
        if branch_opt_util::unlikely(keyword.byte_len() != query.bucket_size as usize) {
            return Err(PrivMailSearchError::BucketedKeywordLengthMismatch(query.bucket_size, keyword.byte_len()));
        }

        let length_mask = armor::decode_shares(&query.length_mask, num_parties)?;
        if branch_opt_util::unlikely(length_mask.bit_len() < query.bucket_size as usize) {
            return Err(PrivMailSearchError::LengthMaskTooShort(query.bucket_size, length_mask.bit_len()));
        }

        debug!(bucket_size = query.bucket_size, min_length, "decoded bucketed keyword");
        decoded.push(BucketedQueryShares {
            keyword,
            length_mask,
            bucket_size: query.bucket_size,
            min_length,
        });
    }
    Ok(decoded)
}

/// Turns validated bucketed-keyword shares into engine wires; the length
/// mask is split to single bits and trimmed to the bucketed positions.
fn bucketed_keyword_wires<E: BooleanEngine>(engine: &mut E, shares: &[BucketedQueryShares]) -> Vec<BucketedKeywordWires<E::Share>> {
    let mut keywords = Vec::with_capacity(shares.len());
    for share in shares {
        let characters = armor::input_shared_bytes(engine, &share.keyword);
        let mask_bytes = armor::input_shared_bytes(engine, &share.length_mask);
        let mut length_mask = armor::split_to_bits(engine, &mask_bytes);
        length_mask.truncate(share.bucket_size as usize);

        keywords.push(BucketedKeywordWires {
            characters,
            length_mask,
            bucket_size: share.bucket_size,
            min_length: share.min_length,
        });
    }
    keywords
}
