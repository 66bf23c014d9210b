use divan;
use privmail_search::{
    clear::ClearEngine,
    query::{ArmoredShare, BucketScheme, MailText, SearchIndex, SearchMode, SearchQuery},
    search::search,
};
use rand::prelude::*;
use rand_chacha::ChaCha8Rng;

fn main() {
    divan::main();
}

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

fn random_body(rng: &mut ChaCha8Rng, len: usize) -> Vec<u8> {
    (0..len).map(|_| rng.random_range(b'a'..=b'z')).collect()
}

#[derive(Debug)]
struct SearchConfig {
    num_parties: usize,
    num_mails: usize,
    body_len: usize,
}

const ARGS: &[SearchConfig] = &[
    SearchConfig {
        num_parties: 2,
        num_mails: 8,
        body_len: 256,
    },
    SearchConfig {
        num_parties: 2,
        num_mails: 32,
        body_len: 1024,
    },
    SearchConfig {
        num_parties: 3,
        num_mails: 8,
        body_len: 256,
    },
];

#[divan::bench(args = ARGS)]
fn normal_mode_circuit(bencher: divan::Bencher, config: &SearchConfig) {
    let mut rng = ChaCha8Rng::from_os_rng();

    let queries = vec![SearchQuery {
        truncated: share_bytes(&mut rng, b"accountant", config.num_parties),
        bucketed: ArmoredShare::new(vec![String::new(); config.num_parties]),
        length_mask: ArmoredShare::new(vec![String::new(); config.num_parties]),
        bucket_size: 0,
    }];
    let chain = share_bytes(&mut rng, &[0u8], config.num_parties);
    let mails: Vec<MailText> = (0..config.num_mails)
        .map(|_| MailText {
            truncated: share_bytes(&mut rng, &random_body(&mut rng, config.body_len), config.num_parties),
            buckets: Vec::new(),
        })
        .collect();
    let scheme = BucketScheme::new(vec![4, 8, 12, 16]).unwrap();
    let index = SearchIndex::default();

    bencher.bench_local(|| {
        let mut engine = ClearEngine::new(config.num_parties);
        search(&mut engine, &queries, &chain, &mails, &index, &scheme, SearchMode::Normal).unwrap()
    });
}

#[divan::bench(args = ARGS)]
fn hidden_mode_circuit(bencher: divan::Bencher, config: &SearchConfig) {
    const BUCKET_SIZE: usize = 12;
    let mut rng = ChaCha8Rng::from_os_rng();

    let keyword = b"accountant";
    let mut bucketed = keyword.to_vec();
    bucketed.resize(BUCKET_SIZE, b'*');

    let mut mask_bytes = vec![0u8; BUCKET_SIZE.div_ceil(8)];
    for index in keyword.len()..(mask_bytes.len() * 8) {
        mask_bytes[index / 8] |= 1 << (7 - (index % 8));
    }

    let queries = vec![SearchQuery {
        truncated: share_bytes(&mut rng, keyword, config.num_parties),
        bucketed: share_bytes(&mut rng, &bucketed, config.num_parties),
        length_mask: share_bytes(&mut rng, &mask_bytes, config.num_parties),
        bucket_size: BUCKET_SIZE as u32,
    }];
    let chain = share_bytes(&mut rng, &[0u8], config.num_parties);
    let mails: Vec<MailText> = (0..config.num_mails)
        .map(|_| MailText {
            truncated: share_bytes(&mut rng, &random_body(&mut rng, config.body_len), config.num_parties),
            buckets: Vec::new(),
        })
        .collect();
    let scheme = BucketScheme::new(vec![4, 8, 12, 16]).unwrap();
    let index = SearchIndex::default();

    bencher.bench_local(|| {
        let mut engine = ClearEngine::new(config.num_parties);
        search(&mut engine, &queries, &chain, &mails, &index, &scheme, SearchMode::Hidden).unwrap()
    });
}
