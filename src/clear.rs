//! Cleartext reference engine.
//!
//! [`ClearEngine`] implements [`BooleanEngine`] by evaluating every gate on
//! plaintext values. It provides no privacy whatsoever and exists for tests,
//! demos and benchmarks: the circuits built against it compute the same
//! functions as against a real secure backend, and its gate counters expose
//! how many interactive rounds a real backend would spend.

use crate::engine::BooleanEngine;

/// A plaintext stand-in for a secret share: a value of `width` bits per SIMD
/// lane, with one `u64` word per lane.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ClearShare {
    width: usize,
    lanes: Vec<u64>,
}

impl ClearShare {
    pub fn width(&self) -> usize {
        self.width
    }

    pub fn num_lanes(&self) -> usize {
        self.lanes.len()
    }

    /// Plaintext value of one lane.
    pub fn lane(&self, index: usize) -> u64 {
        self.lanes[index]
    }

    /// Plaintext value of a single-lane share.
    pub fn value(&self) -> u64 {
        assert_eq!(self.lanes.len(), 1, "share is SIMD-batched, read a specific lane instead");
        self.lanes[0]
    }

    fn value_mask(&self) -> u64 {
        if self.width == u64::BITS as usize { u64::MAX } else { (1u64 << self.width) - 1 }
    }
}

/// Insecure [`BooleanEngine`] evaluating gates on plaintext.
///
/// Shape mismatches between gate operands are programming errors in the
/// circuit builder and abort via assertion. The engine counts how many
/// inputs were created and how often an interactive gate (AND, OR) was
/// invoked; XOR and NOT are local operations under XOR secret sharing and
/// are not counted.
pub struct ClearEngine {
    num_parties: usize,
    inputs_created: usize,
    interactive_gate_rounds: usize,
}

impl ClearEngine {
    pub fn new(num_parties: usize) -> ClearEngine {
        assert!(num_parties >= 1, "at least one computing party is required");
        ClearEngine {
            num_parties,
            inputs_created: 0,
            interactive_gate_rounds: 0,
        }
    }

    /// Number of input wires created so far.
    pub fn inputs_created(&self) -> usize {
        self.inputs_created
    }

    /// Number of AND/OR gate invocations so far. Each invocation corresponds
    /// to one round of party interaction in an interactive backend, however
    /// wide or deeply batched the operands are.
    pub fn interactive_gate_rounds(&self) -> usize {
        self.interactive_gate_rounds
    }

    fn checked_operands(a: &ClearShare, b: &ClearShare) {
        assert_eq!(a.width, b.width, "gate operands must have equal bit width");
        assert_eq!(a.lanes.len(), b.lanes.len(), "gate operands must have equal lane count");
    }

    fn lanewise(&mut self, a: &ClearShare, b: &ClearShare, op: impl Fn(u64, u64) -> u64) -> ClearShare {
        Self::checked_operands(a, b);
        let mask = a.value_mask();
        ClearShare {
            width: a.width,
            lanes: a.lanes.iter().zip(b.lanes.iter()).map(|(&x, &y)| op(x, y) & mask).collect(),
        }
    }
}

impl BooleanEngine for ClearEngine {
    type Share = ClearShare;

    fn num_parties(&self) -> usize {
        self.num_parties
    }

    fn input_bit(&mut self, value: bool, party: usize) -> ClearShare {
        assert!(party < self.num_parties, "input owner out of range");
        self.inputs_created += 1;
        ClearShare {
            width: 1,
            lanes: vec![value as u64],
        }
    }

    fn input_byte(&mut self, value: u8, party: usize) -> ClearShare {
        assert!(party < self.num_parties, "input owner out of range");
        self.inputs_created += 1;
        ClearShare {
            width: 8,
            lanes: vec![value as u64],
        }
    }

    fn xor(&mut self, a: &ClearShare, b: &ClearShare) -> ClearShare {
        self.lanewise(a, b, |x, y| x ^ y)
    }

    fn and(&mut self, a: &ClearShare, b: &ClearShare) -> ClearShare {
        self.interactive_gate_rounds += 1;
        self.lanewise(a, b, |x, y| x & y)
    }

    fn or(&mut self, a: &ClearShare, b: &ClearShare) -> ClearShare {
        self.interactive_gate_rounds += 1;
        self.lanewise(a, b, |x, y| x | y)
    }

    fn not(&mut self, a: &ClearShare) -> ClearShare {
        let mask = a.value_mask();
        ClearShare {
            width: a.width,
            lanes: a.lanes.iter().map(|&x| !x & mask).collect(),
        }
    }

    fn split(&mut self, share: &ClearShare) -> Vec<ClearShare> {
        (0..share.width)
            .map(|bit| ClearShare {
                width: 1,
                lanes: share.lanes.iter().map(|&lane| (lane >> bit) & 1).collect(),
            })
            .collect()
    }

    fn concatenate(&mut self, bits: &[ClearShare]) -> ClearShare {
        assert!(!bits.is_empty(), "cannot concatenate zero shares");

        let num_lanes = bits[0].lanes.len();
        let width: usize = bits.iter().map(|b| b.width).sum();
        assert!(width <= u64::BITS as usize, "concatenated width exceeds the lane word size");

        let mut lanes = vec![0u64; num_lanes];
        let mut offset = 0;
        for part in bits {
            assert_eq!(part.lanes.len(), num_lanes, "concatenated shares must have equal lane count");
            for (lane, &value) in lanes.iter_mut().zip(part.lanes.iter()) {
                *lane |= value << offset;
            }
            offset += part.width;
        }

        ClearShare { width, lanes }
    }

    fn batch(&mut self, shares: &[ClearShare]) -> ClearShare {
        assert!(!shares.is_empty(), "cannot batch zero shares");

        let width = shares[0].width;
        let mut lanes = Vec::with_capacity(shares.iter().map(|s| s.lanes.len()).sum());
        for share in shares {
            assert_eq!(share.width, width, "batched shares must have equal bit width");
            lanes.extend_from_slice(&share.lanes);
        }

        ClearShare { width, lanes }
    }

    fn unbatch(&mut self, batched: &ClearShare) -> Vec<ClearShare> {
        batched
            .lanes
            .iter()
            .map(|&lane| ClearShare {
                width: batched.width,
                lanes: vec![lane],
            })
            .collect()
    }

    fn bit_length(&self, share: &ClearShare) -> usize {
        share.width
    }
}
