//! Binary adaptive range coder.
//!
//! Carry-less 32-bit coder: the interval `[x1, x2]` is split at a point
//! proportional to the probability of a one bit, and leading bytes are
//! shifted out as soon as both ends agree on them. Probabilities use a
//! 16-bit scale and must lie strictly inside `(0, PROB_SCALE)`.

/// probabilities are fixed point with this many fractional bits
pub const PROB_BITS: u32 = 16;

/// full probability scale, `p1 == PROB_SCALE` would mean "certainly one"
pub const PROB_SCALE: u32 = 1 << PROB_BITS;

#[inline]
fn split(x1: u32, x2: u32, p1: u32) -> u32 {
    assert!(
        p1 > 0 && p1 < PROB_SCALE,
        "bit probability {p1} outside (0, {PROB_SCALE})"
    );
    let range = (x2 - x1) as u64;
    x1 + ((range * p1 as u64) >> PROB_BITS) as u32
}

/// encoder writing into an owned, growable buffer
#[derive(Debug)]
pub struct RangeEncoder {
    x1: u32,
    x2: u32,
    out: Vec<u8>,
    coded: u64,
}

impl RangeEncoder {
    /// start a new coded segment appended to `out`
    pub fn new(out: Vec<u8>) -> Self {
        RangeEncoder {
            x1: 0,
            x2: u32::MAX,
            out,
            coded: 0,
        }
    }

    /// encode `bit` where `p1` is the probability of a one
    #[inline]
    pub fn encode_bit(&mut self, p1: u32, bit: bool) {
        let xmid = split(self.x1, self.x2, p1);
        if bit {
            self.x2 = xmid;
        } else {
            self.x1 = xmid + 1;
        }
        self.coded += 1;

        while (self.x1 ^ self.x2) & 0xff00_0000 == 0 {
            self.out.push((self.x2 >> 24) as u8);
            self.x1 <<= 8;
            self.x2 = (self.x2 << 8) | 0xff;
        }
    }

    /// bits encoded so far
    pub fn bits_coded(&self) -> u64 {
        self.coded
    }

    /// flush the pending interval and hand back the buffer
    ///
    /// Nothing is flushed when no bit was coded, an empty segment
    /// decodes without reading.
    pub fn finish(mut self) -> Vec<u8> {
        if self.coded > 0 {
            self.out.extend_from_slice(&self.x1.to_be_bytes());
        }
        self.out
    }
}

/// decoder over a borrowed byte slice
#[derive(Debug)]
pub struct RangeDecoder<'a> {
    x1: u32,
    x2: u32,
    x: u32,
    data: &'a [u8],
    pos: usize,
}

impl<'a> RangeDecoder<'a> {
    pub fn new(data: &'a [u8]) -> Self {
        let mut dec = RangeDecoder {
            x1: 0,
            x2: u32::MAX,
            x: 0,
            data,
            pos: 0,
        };
        for _ in 0..4 {
            dec.x = (dec.x << 8) | dec.next_byte() as u32;
        }
        dec
    }

    #[inline]
    fn next_byte(&mut self) -> u8 {
        match self.data.get(self.pos) {
            Some(&b) => {
                self.pos += 1;
                b
            }
            None => 0,
        }
    }

    /// decode one bit coded with probability `p1` of a one
    #[inline]
    pub fn decode_bit(&mut self, p1: u32) -> bool {
        let xmid = split(self.x1, self.x2, p1);
        let bit = self.x <= xmid;
        if bit {
            self.x2 = xmid;
        } else {
            self.x1 = xmid + 1;
        }

        while (self.x1 ^ self.x2) & 0xff00_0000 == 0 {
            self.x1 <<= 8;
            self.x2 = (self.x2 << 8) | 0xff;
            self.x = (self.x << 8) | self.next_byte() as u32;
        }
        bit
    }

    /// bytes consumed from the input, capped at its length
    pub fn position(&self) -> usize {
        self.pos
    }
}
