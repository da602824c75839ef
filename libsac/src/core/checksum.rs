//! blake3 digest over the interleaved pcm stream
//!
//! Samples are hashed as little-endian i32 in interleaved order, so the
//! frame-wise hasher and [`compute`] over a flat buffer agree.

pub const CHECKSUM_SIZE: usize = 32;

pub type Checksum = [u8; CHECKSUM_SIZE];

/// hash an interleaved buffer in one go
pub fn compute(interleaved: &[i32]) -> Checksum {
    let mut hasher = blake3::Hasher::new();
    for &s in interleaved {
        hasher.update(&s.to_le_bytes());
    }
    *hasher.finalize().as_bytes()
}

/// incremental hasher fed one frame at a time
#[derive(Debug, Clone, Default)]
pub struct FrameHasher {
    hasher: blake3::Hasher,
    scratch: Vec<u8>,
}

impl FrameHasher {
    pub fn new() -> Self {
        Self::default()
    }

    /// hash `count` samples of each channel buffer, interleaved
    pub fn update(&mut self, channels: &[Vec<i32>], count: usize) {
        self.scratch.clear();
        for i in 0..count {
            for ch in channels {
                self.scratch.extend_from_slice(&ch[i].to_le_bytes());
            }
        }
        self.hasher.update(&self.scratch);
    }

    pub fn finalize(&self) -> Checksum {
        *self.hasher.finalize().as_bytes()
    }
}

/// lowercase hex, for display
pub fn to_hex(sum: &Checksum) -> String {
    sum.iter().map(|b| format!("{b:02x}")).collect()
}
