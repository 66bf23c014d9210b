//! Boundary with the secure-computation backend.
//!
//! The search circuits in this crate are built against the [`BooleanEngine`]
//! trait and never against a concrete protocol implementation. An engine hands
//! out opaque [`BooleanEngine::Share`] handles for secret-shared bits (or
//! SIMD-batched vectors of bits) and turns gate requests into whatever its
//! protocol requires: local share arithmetic, network rounds with peer
//! parties, or plain cleartext evaluation for the reference backend in
//! [`crate::clear`].

/// A gate-graph construction backend over secret-shared boolean values.
///
/// A `Share` is a handle to one secret-shared value: `n` bits wide, and
/// optionally batched into `k` independent SIMD lanes of identical width.
/// Gate methods consume handles and return freshly created handles; shares
/// are never mutated in place. `xor` and `not` are expected to be local to
/// each party, while `and` and `or` typically cost one round of interaction
/// per invocation regardless of width or lane count, which is why the circuit
/// builders in this crate aggressively batch independent work before gating.
pub trait BooleanEngine {
    type Share: Clone;

    /// Number of computing parties contributing input shares.
    fn num_parties(&self) -> usize;

    /// Creates a 1-bit secret share from the named party's plaintext input.
    fn input_bit(&mut self, value: bool, party: usize) -> Self::Share;

    /// Creates an 8-bit secret share from the named party's plaintext input.
    fn input_byte(&mut self, value: u8, party: usize) -> Self::Share;

    fn xor(&mut self, a: &Self::Share, b: &Self::Share) -> Self::Share;

    fn and(&mut self, a: &Self::Share, b: &Self::Share) -> Self::Share;

    fn or(&mut self, a: &Self::Share, b: &Self::Share) -> Self::Share;

    /// Complement of every bit; equivalent to XOR with a public all-ones value.
    fn not(&mut self, a: &Self::Share) -> Self::Share;

    /// Decomposes an `n`-bit share into `n` single-bit shares, least
    /// significant bit first.
    fn split(&mut self, share: &Self::Share) -> Vec<Self::Share>;

    /// Composes single-bit shares into one multi-bit share; `bits[0]` becomes
    /// the least significant bit.
    fn concatenate(&mut self, bits: &[Self::Share]) -> Self::Share;

    /// Groups `k` same-shaped shares into one SIMD-batched share whose gates
    /// evaluate all `k` lanes in a single round.
    fn batch(&mut self, shares: &[Self::Share]) -> Self::Share;

    /// Splits a batched share back into its individual lanes.
    fn unbatch(&mut self, batched: &Self::Share) -> Vec<Self::Share>;

    /// Width in bits of a (per-lane) share value.
    fn bit_length(&self, share: &Self::Share) -> usize;
}
