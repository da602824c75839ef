//! adaptive probability for a single binary decision

use super::range_coder::{RangeDecoder, RangeEncoder, PROB_SCALE};

/// keeps coded probabilities this far from 0 and the full scale
const PROB_MARGIN: u32 = 32;

/// state-counting bit model
///
/// The adaptation shift grows with the number of observations, so a
/// fresh cell moves quickly and a busy one settles, up to `limit`.
#[derive(Debug, Clone, Copy)]
pub struct BitModel {
    p1: u32,
    n: u8,
}

impl Default for BitModel {
    fn default() -> Self {
        BitModel {
            p1: PROB_SCALE / 2,
            n: 0,
        }
    }
}

impl BitModel {
    /// probability of a one, clamped for the coder
    #[inline]
    pub fn p1(&self) -> u32 {
        self.p1.clamp(PROB_MARGIN, PROB_SCALE - PROB_MARGIN)
    }

    #[inline]
    pub fn update(&mut self, bit: bool, limit: u32) {
        let shift = (1 + (self.n as u32 >> 1)).min(limit);
        if bit {
            self.p1 += (PROB_SCALE - self.p1) >> shift;
        } else {
            self.p1 -= self.p1 >> shift;
        }
        if (self.n as u32) < 2 * limit {
            self.n += 1;
        }
    }

    #[inline]
    pub fn encode(&mut self, enc: &mut RangeEncoder, bit: bool, limit: u32) {
        enc.encode_bit(self.p1(), bit);
        self.update(bit, limit);
    }

    #[inline]
    pub fn decode(&mut self, dec: &mut RangeDecoder, limit: u32) -> bool {
        let bit = dec.decode_bit(self.p1());
        self.update(bit, limit);
        bit
    }
}
