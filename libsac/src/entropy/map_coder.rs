//! coding of the sparse remap "used value" bitmap

use super::model::BitModel;
use super::range_coder::{RangeDecoder, RangeEncoder};

/// previous bits forming the context
const HISTORY_BITS: u32 = 3;

const ADAPT_LIMIT: u32 = 6;

/// order-3 binary context coder for the used bitmap
pub struct MapCoder {
    models: [BitModel; 1 << HISTORY_BITS],
    history: usize,
}

impl Default for MapCoder {
    fn default() -> Self {
        Self::new()
    }
}

impl MapCoder {
    pub fn new() -> Self {
        MapCoder {
            models: [BitModel::default(); 1 << HISTORY_BITS],
            history: 0,
        }
    }

    #[inline]
    fn push(&mut self, bit: bool) {
        self.history = ((self.history << 1) | bit as usize) & ((1 << HISTORY_BITS) - 1);
    }

    pub fn encode(&mut self, enc: &mut RangeEncoder, used: &[bool]) {
        for &bit in used {
            self.models[self.history].encode(enc, bit, ADAPT_LIMIT);
            self.push(bit);
        }
    }

    /// decode a bitmap of `len` entries
    pub fn decode(&mut self, dec: &mut RangeDecoder, len: usize) -> Vec<bool> {
        let mut used = Vec::with_capacity(len);
        for _ in 0..len {
            let bit = self.models[self.history].decode(dec, ADAPT_LIMIT);
            self.push(bit);
            used.push(bit);
        }
        used
    }
}
