//! privmail_search: oblivious keyword search over secret-shared e-mail, expressed as boolean secure-computation circuits.
//!
//! This crate builds the comparison circuits with which a set of computing parties can decide, for every stored mail,
//! whether it satisfies a keyword query, without any party seeing the mail bodies, the keywords, or the per-mail verdicts.
//! Mails and keywords arrive as ascii-armored XOR shares; the query's boolean structure (which keywords are AND-ed,
//! OR-ed or negated) itself stays secret, carried as a shared modifier-chain bit string and applied through an oblivious
//! selection formula.
//!
//! ## Features
//!
//! * **Branch-free matching:** every candidate position and every character is always compared; no control flow ever
//!   depends on secret data.
//! * **Four search strategies:** a full scan with public keyword lengths (`Normal`), a full scan with bucket-hidden
//!   lengths (`Hidden`), a scan over pre-segmented per-mail word blocks (`Bucket`), and a scan over a global word
//!   index (`Index`), all sharing one substring-scan core.
//! * **Round-conscious circuits:** independent comparisons are SIMD-batched and folded through balanced gate trees of
//!   depth ⌈log2 n⌉, so the number of interaction rounds in the backing protocol stays logarithmic.
//! * **Backend-agnostic:** circuits are built against the [`engine::BooleanEngine`] trait; any secure-computation
//!   backend exposing XOR/AND/OR/NOT, bit split/concatenate and SIMD batch/unbatch can evaluate them. An insecure
//!   cleartext engine ships in [`clear`] for tests and experiments.
//!
//! ## Usage
//!
//! Add privmail_search as a dependency to your `Cargo.toml`:
//!
//! ```toml
//! [dependencies]
//! privmail_search = "=0.3.0"
//! ```
//!
//! Then, you can use it in your code:
//!
//! ```rust
//! use privmail_search::clear::ClearEngine;
//! use privmail_search::query::{ArmoredShare, BucketScheme, MailText, SearchIndex, SearchMode, SearchQuery};
//! use privmail_search::search::search;
//!
//! // A single computing party holds the plaintext as its only XOR share.
//! let mut engine = ClearEngine::new(1);
//!
//! let queries = vec![SearchQuery {
//!     truncated: ArmoredShare::new(vec!["Y2F0".to_string()]), // "cat"
//!     bucketed: ArmoredShare::new(vec![String::new()]),       // unused in Normal mode
//!     length_mask: ArmoredShare::new(vec![String::new()]),
//!     bucket_size: 0,
//! }];
//! let modifier_chain = ArmoredShare::new(vec!["AA==".to_string()]); // single keyword, not negated
//!
//! let mails = vec![MailText {
//!     truncated: ArmoredShare::new(vec!["dGhlIGNhdCBzYXQ=".to_string()]), // "the cat sat"
//!     buckets: Vec::new(),
//! }];
//!
//! let scheme = BucketScheme::new(vec![8, 16]).expect("boundaries are ascending");
//! let index = SearchIndex::default();
//!
//! let results = search(&mut engine, &queries, &modifier_chain, &mails, &index, &scheme, SearchMode::Normal)
//!     .expect("query is well-formed");
//!
//! // The match bits stay secret-shared against a real backend; the clear
//! // engine lets us peek for the sake of the example.
//! assert_eq!(results.len(), 1);
//! assert_eq!(results[0].value(), 1);
//! ```
//!
//! ## Modules
//!
//! * `engine`: The [`engine::BooleanEngine`] trait every circuit is built against.
//! * `clear`: An insecure cleartext engine for tests, demos and benchmarks.
//! * `query`: Query, mail, index and bucket-scheme data as delivered by the loading layer.
//! * `search`: The query orchestrator and the four search-mode drivers.

pub use search_internals::error::PrivMailSearchError;

pub mod clear;
pub mod engine;
pub mod query;
pub mod search;

mod search_internals;

mod test_search;
