//! Query, mail and index data as handed over by the loading layer.
//!
//! Everything in this module is public metadata plus armored share strings;
//! nothing here touches the engine. The loading layer (YAML files, proxy
//! handoff) lives outside this crate and delivers these values fully
//! assembled.

use crate::search_internals::{branch_opt_util, error::PrivMailSearchError};
use std::str::FromStr;

/// Ascii-armored XOR-sharing of one secret byte string: one armored share
/// string per computing party.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ArmoredShare {
    per_party: Vec<String>,
}

impl ArmoredShare {
    pub fn new(per_party: Vec<String>) -> ArmoredShare {
        ArmoredShare { per_party }
    }

    pub fn per_party(&self) -> &[String] {
        &self.per_party
    }
}

impl From<Vec<String>> for ArmoredShare {
    fn from(per_party: Vec<String>) -> ArmoredShare {
        ArmoredShare::new(per_party)
    }
}

/// One search keyword in its three share encodings.
///
/// `truncated` carries the fixed-length form used by [`SearchMode::Normal`];
/// `bucketed` the form padded up to `bucket_size`, and `length_mask` one bit
/// per bucketed character position (0 = real character, 1 = padding) so the
/// true length stays hidden inside its bucket.
#[derive(Clone, Debug)]
pub struct SearchQuery {
    pub truncated: ArmoredShare,
    pub bucketed: ArmoredShare,
    pub length_mask: ArmoredShare,
    pub bucket_size: u32,
}

/// Words of one fixed block size extracted from a mail body.
#[derive(Clone, Debug)]
pub struct WordBucket {
    pub bucket_size: u32,
    pub words: Vec<ArmoredShare>,
}

/// One secret-shared mail: the full body for scanning modes, plus the
/// pre-segmented word blocks consumed by [`SearchMode::Bucket`].
#[derive(Clone, Debug)]
pub struct MailText {
    pub truncated: ArmoredShare,
    pub buckets: Vec<WordBucket>,
}

/// One indexed word and the opaque occurrence bitmap associating it with the
/// mails containing it. The bitmap is produced and consumed outside this
/// crate; the search core never decodes it.
#[derive(Clone, Debug)]
pub struct IndexEntry {
    pub word: ArmoredShare,
    pub occurrences: String,
}

/// All indexed words of one block size, in index order.
#[derive(Clone, Debug)]
pub struct IndexBucket {
    pub bucket_size: u32,
    pub entries: Vec<IndexEntry>,
}

/// The global pre-built word index shared by all mails.
#[derive(Clone, Debug, Default)]
pub struct SearchIndex {
    pub buckets: Vec<IndexBucket>,
}

impl SearchIndex {
    /// Total number of indexed words, which is also the length of an
    /// Index-mode result vector.
    pub fn num_words(&self) -> usize {
        self.buckets.iter().map(|bucket| bucket.entries.len()).sum()
    }
}

/// The public, strictly ascending bucket-size boundaries every bucketed
/// keyword, mail block and index block must come from.
#[derive(Clone, Debug)]
pub struct BucketScheme {
    sizes: Vec<u32>,
}

impl BucketScheme {
    pub fn new(sizes: Vec<u32>) -> Result<BucketScheme, PrivMailSearchError> {
        let ascending = sizes.windows(2).all(|pair| pair[0] < pair[1]);
        if branch_opt_util::unlikely(!ascending || sizes.first() == Some(&0)) {
            return Err(PrivMailSearchError::InvalidBucketScheme);
        }
        Ok(BucketScheme { sizes })
    }

    pub fn sizes(&self) -> &[u32] {
        &self.sizes
    }

    pub fn contains(&self, bucket_size: u32) -> bool {
        self.sizes.contains(&bucket_size)
    }

    /// Smallest true keyword length that can land in the given bucket: one
    /// past the previous boundary, or 1 for the first bucket.
    pub fn min_keyword_length(&self, bucket_size: u32) -> Result<u32, PrivMailSearchError> {
        match self.sizes.iter().position(|&size| size == bucket_size) {
            Some(0) => Ok(1),
            Some(index) => Ok(self.sizes[index - 1] + 1),
            None => Err(PrivMailSearchError::UnknownBucketSize(bucket_size)),
        }
    }
}

/// The four search strategies; see [`crate::search::search`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SearchMode {
    /// Full scan with public keyword length.
    Normal,
    /// Full scan with bucketed keyword length.
    Hidden,
    /// Bucketed keyword over per-mail word blocks.
    Bucket,
    /// Bucketed keyword over the global word index.
    Index,
}

impl FromStr for SearchMode {
    type Err = PrivMailSearchError;

    fn from_str(mode: &str) -> Result<SearchMode, PrivMailSearchError> {
        match mode {
            "normal" => Ok(SearchMode::Normal),
            "hidden" => Ok(SearchMode::Hidden),
            "bucket" => Ok(SearchMode::Bucket),
            "index" => Ok(SearchMode::Index),
            other => Err(PrivMailSearchError::UnknownSearchMode(other.to_string())),
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use test_case::test_case;

    #[test_case(vec![4, 8, 12, 16] => matches Ok(_); "ascending boundaries are valid")]
    #[test_case(vec![4] => matches Ok(_); "a single boundary is valid")]
    #[test_case(vec![] => matches Ok(_); "an empty scheme is valid until looked up")]
    #[test_case(vec![4, 4, 8] => matches Err(PrivMailSearchError::InvalidBucketScheme); "repeated boundaries are rejected")]
    #[test_case(vec![8, 4] => matches Err(PrivMailSearchError::InvalidBucketScheme); "descending boundaries are rejected")]
    #[test_case(vec![0, 4] => matches Err(PrivMailSearchError::InvalidBucketScheme); "a zero boundary is rejected")]
    fn bucket_scheme_construction(sizes: Vec<u32>) -> Result<BucketScheme, PrivMailSearchError> {
        BucketScheme::new(sizes)
    }

    #[test_case(4 => matches Ok(1); "first bucket starts at length one")]
    #[test_case(8 => matches Ok(5); "later buckets start past the previous boundary")]
    #[test_case(16 => matches Ok(13); "last bucket follows the same rule")]
    #[test_case(6 => matches Err(PrivMailSearchError::UnknownBucketSize(6)); "unknown sizes are rejected")]
    fn minimum_keyword_lengths(bucket_size: u32) -> Result<u32, PrivMailSearchError> {
        let scheme = BucketScheme::new(vec![4, 8, 12, 16]).expect("scheme is ascending");
        scheme.min_keyword_length(bucket_size)
    }

    #[test_case("normal" => matches Ok(SearchMode::Normal); "normal mode")]
    #[test_case("hidden" => matches Ok(SearchMode::Hidden); "hidden mode")]
    #[test_case("bucket" => matches Ok(SearchMode::Bucket); "bucket mode")]
    #[test_case("index" => matches Ok(SearchMode::Index); "index mode")]
    #[test_case("fuzzy" => matches Err(PrivMailSearchError::UnknownSearchMode(_)); "anything else is rejected")]
    fn search_mode_parsing(mode: &str) -> Result<SearchMode, PrivMailSearchError> {
        mode.parse()
    }
}
