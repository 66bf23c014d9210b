/// Number of usable bits per character in the PrivMail text encoding. Every
/// comparison truncates the 8-bit share of a character down to this width.
pub const CHARACTER_BIT_LEN: usize = 6;

/// Width of one armored byte once reconstructed as a secret-shared value.
pub const BYTE_BIT_LEN: usize = 8;

/// Number of modifier-chain bits consumed by every keyword after the first
/// (one OR-selector bit and one NOT-flag bit).
pub const CHAIN_BITS_PER_EXTRA_KEYWORD: usize = 2;
