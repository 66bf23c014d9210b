//! Walks one keyword query through the Normal and Hidden search modes on the
//! cleartext reference engine, with the inputs split into two XOR shares the
//! way the incoming proxy would deliver them.

use privmail_search::{
    clear::ClearEngine,
    query::{ArmoredShare, BucketScheme, MailText, SearchIndex, SearchMode, SearchQuery},
    search::search,
};
use rand::prelude::*;
use rand_chacha::ChaCha8Rng;

const NUM_PARTIES: usize = 2;
const ARMOR_ALPHABET: &[u8] = b"ABCDEFGHIJKLMNOPQRSTUVWXYZabcdefghijklmnopqrstuvwxyz0123456789+/";

fn armor_encode(bytes: &[u8]) -> String {
    let mut out = String::with_capacity(bytes.len().div_ceil(3) * 4);
    for chunk in bytes.chunks(3) {
        let b0 = chunk[0] as u32;
        let b1 = chunk.get(1).copied().unwrap_or(0) as u32;
        let b2 = chunk.get(2).copied().unwrap_or(0) as u32;
        let triple = (b0 << 16) | (b1 << 8) | b2;

        out.push(ARMOR_ALPHABET[((triple >> 18) & 0x3f) as usize] as char);
        out.push(ARMOR_ALPHABET[((triple >> 12) & 0x3f) as usize] as char);
        out.push(if chunk.len() > 1 { ARMOR_ALPHABET[((triple >> 6) & 0x3f) as usize] as char } else { '=' });
        out.push(if chunk.len() > 2 { ARMOR_ALPHABET[(triple & 0x3f) as usize] as char } else { '=' });
    }
    out
}

fn share_bytes(rng: &mut ChaCha8Rng, plaintext: &[u8]) -> ArmoredShare {
    let mut shares = vec![vec![0u8; plaintext.len()]; NUM_PARTIES];
    for (index, &byte) in plaintext.iter().enumerate() {
        let mut first = byte;
        for party in 1..NUM_PARTIES {
            let blind: u8 = rng.random();
            shares[party][index] = blind;
            first ^= blind;
        }
        shares[0][index] = first;
    }
    ArmoredShare::new(shares.iter().map(|share| armor_encode(share)).collect())
}

fn main() {
    let mut rng = ChaCha8Rng::from_os_rng();

    let keyword = b"invoice";
    const BUCKET_SIZE: usize = 8;

    let mut bucketed = keyword.to_vec();
    bucketed.resize(BUCKET_SIZE, b'*');

    let mut mask_bytes = vec![0u8; BUCKET_SIZE.div_ceil(8)];
    for index in keyword.len()..(mask_bytes.len() * 8) {
        mask_bytes[index / 8] |= 1 << (7 - (index % 8));
    }

    let queries = vec![SearchQuery {
        truncated: share_bytes(&mut rng, keyword),
        bucketed: share_bytes(&mut rng, &bucketed),
        length_mask: share_bytes(&mut rng, &mask_bytes),
        bucket_size: BUCKET_SIZE as u32,
    }];

    // One keyword, not negated.
    let modifier_chain = share_bytes(&mut rng, &[0u8]);

    let bodies: [&[u8]; 3] = [
        b"please find the invoice attached",
        b"lunch on thursday?",
        b"re: invoices overdue since march",
    ];
    let mails: Vec<MailText> = bodies
        .iter()
        .map(|body| MailText {
            truncated: share_bytes(&mut rng, body),
            buckets: Vec::new(),
        })
        .collect();

    let scheme = BucketScheme::new(vec![4, 8, 12, 16]).expect("boundaries are ascending");
    let index = SearchIndex::default();

    for mode in [SearchMode::Normal, SearchMode::Hidden] {
        let mut engine = ClearEngine::new(NUM_PARTIES);
        let results = search(&mut engine, &queries, &modifier_chain, &mails, &index, &scheme, mode).expect("query is well-formed");

        println!("{:?} mode ({} interactive gate rounds):", mode, engine.interactive_gate_rounds());
        for (body, result) in bodies.iter().zip(results.iter()) {
            println!("  match = {}  {:?}", result.value(), String::from_utf8_lossy(body));
        }
    }
}
