//! Bitplane coding of non-negative residuals.
//!
//! Each value is sent as `maxbpn` bits, most significant first. A bit is
//! coded under a context built from:
//!
//! - the bitplane index,
//! - a magnitude class, the bit length of a running average of previous
//!   values,
//! - the significance prefix, 0 until the first one bit of the value and
//!   afterwards the already coded high bits capped to 7.
//!
//! Encoder and decoder update the same cells in the same order, so the
//! models stay in lockstep.

use super::model::BitModel;
use super::range_coder::{RangeDecoder, RangeEncoder};
use crate::core::bits::bit_length;

const PLANES: usize = 32;
const MAG_CLASSES: usize = 33;
const PREFIX_CLASSES: usize = 8;

/// running average keeps this many fractional bits
const AVG_SHIFT: u32 = 4;

const ADAPT_LIMIT: u32 = 5;

pub struct BitplaneCoder {
    maxbpn: u32,
    models: Vec<BitModel>,
    avg: u64,
}

impl BitplaneCoder {
    /// coder for values below `2^maxbpn`
    pub fn new(maxbpn: u32) -> Self {
        debug_assert!(maxbpn as usize <= PLANES);
        let models = if maxbpn == 0 {
            Vec::new()
        } else {
            vec![BitModel::default(); PLANES * MAG_CLASSES * PREFIX_CLASSES]
        };
        BitplaneCoder {
            maxbpn,
            models,
            avg: 0,
        }
    }

    pub fn maxbpn(&self) -> u32 {
        self.maxbpn
    }

    #[inline]
    fn mag_class(&self) -> usize {
        (bit_length((self.avg >> AVG_SHIFT).min(u32::MAX as u64) as u32) as usize)
            .min(MAG_CLASSES - 1)
    }

    #[inline]
    fn ctx(plane: u32, mag: usize, prefix: u32) -> usize {
        (plane as usize * MAG_CLASSES + mag) * PREFIX_CLASSES + prefix as usize
    }

    #[inline]
    fn observe(&mut self, v: u32) {
        self.avg = self.avg - (self.avg >> AVG_SHIFT) + v as u64;
    }

    pub fn encode(&mut self, enc: &mut RangeEncoder, values: &[u32]) {
        if self.maxbpn == 0 {
            return;
        }
        for &v in values {
            debug_assert!(bit_length(v) <= self.maxbpn);
            let mag = self.mag_class();
            let mut prefix = 0u32;
            for plane in (0..self.maxbpn).rev() {
                let bit = (v >> plane) & 1 == 1;
                let ctx = Self::ctx(plane, mag, prefix);
                self.models[ctx].encode(enc, bit, ADAPT_LIMIT);
                if prefix > 0 || bit {
                    prefix = ((prefix << 1) | bit as u32).min(PREFIX_CLASSES as u32 - 1);
                }
            }
            self.observe(v);
        }
    }

    pub fn decode(&mut self, dec: &mut RangeDecoder, dst: &mut [u32]) {
        if self.maxbpn == 0 {
            dst.fill(0);
            return;
        }
        for out in dst.iter_mut() {
            let mag = self.mag_class();
            let mut prefix = 0u32;
            let mut v = 0u32;
            for plane in (0..self.maxbpn).rev() {
                let ctx = Self::ctx(plane, mag, prefix);
                let bit = self.models[ctx].decode(dec, ADAPT_LIMIT);
                v |= (bit as u32) << plane;
                if prefix > 0 || bit {
                    prefix = ((prefix << 1) | bit as u32).min(PREFIX_CLASSES as u32 - 1);
                }
            }
            self.observe(v);
            *out = v;
        }
    }
}
