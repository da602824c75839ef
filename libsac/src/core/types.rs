//! container constants and the plain records read back from a stream

use crate::core::checksum::Checksum;

// constants

/// Magic number "SAC!"
pub const MAGIC: [u8; 4] = [0x53, 0x41, 0x43, 0x21];

/// header size (excludes magic)
pub const HEADER_SIZE: usize = 58;

/// byte offset of the checksum inside the header (excludes magic)
pub const CHECKSUM_OFFSET: usize = 22;

/// format version
pub const VERSION_MAJOR: u8 = 1;
pub const VERSION_MINOR: u8 = 0;

/// hard cap on samples per frame, bounds decoder allocations
pub const MAX_FRAME_LEN: u32 = 1 << 24;

/// largest channel count the predictor pairs handle
pub const MAX_CHANNELS: u8 = 2;

/// widest input sample
pub const MAX_BITS_PER_SAMPLE: u8 = 16;

/// header flag: mid/side was enabled for the stream
pub const HEADER_FLAG_MID_SIDE: u16 = 1 << 0;

/// header flag: coefficients were searched per frame
pub const HEADER_FLAG_OPTIMIZED: u16 = 1 << 1;

// types

/// file header
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Header {
    pub version_major: u8,
    pub version_minor: u8,
    pub flags: u16,
    pub sample_rate: u32,
    pub channels: u8,
    pub bits_per_sample: u8,
    /// samples per channel
    pub num_samples: u64,
    /// max samples per frame
    pub frame_len: u32,
    pub checksum: Checksum,
    pub meta_size: u32,
}

impl Header {
    pub fn duration_secs(&self) -> f64 {
        if self.sample_rate == 0 {
            return 0.0;
        }
        self.num_samples as f64 / self.sample_rate as f64
    }

    /// frames needed for the whole stream
    pub fn num_frames(&self) -> u64 {
        if self.frame_len == 0 {
            return 0;
        }
        self.num_samples.div_ceil(self.frame_len as u64)
    }

    /// size of the uncompressed pcm in bytes
    pub fn pcm_bytes(&self) -> u64 {
        let bytes_per_sample = (self.bits_per_sample as u64).div_ceil(8);
        self.num_samples * self.channels as u64 * bytes_per_sample
    }
}

/// one channel block of a frame, as stored
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BlockSummary {
    pub blocksize: u32,
    pub mean: i32,
    pub minval: i32,
    pub maxval: i32,
    /// residual bit width actually coded
    pub bits: u8,
    pub mapped: bool,
    pub mid_side: bool,
}

/// one frame as seen by a scan
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FrameSummary {
    pub index: usize,
    pub num_samples: u32,
    /// bytes used by sample count, profile and block headers
    pub header_bytes: usize,
    pub blocks: Vec<BlockSummary>,
}

impl FrameSummary {
    pub fn payload_bytes(&self) -> usize {
        self.blocks.iter().map(|b| b.blocksize as usize).sum()
    }

    pub fn total_bytes(&self) -> usize {
        self.header_bytes + self.payload_bytes()
    }
}

/// summary of a stream without decoding it
#[derive(Debug, Clone)]
pub struct StreamInfo {
    pub header: Header,
    pub file_size: usize,
    pub metadata: Vec<u8>,
}

impl StreamInfo {
    pub fn compression_ratio(&self) -> f64 {
        if self.file_size == 0 {
            return 0.0;
        }
        self.header.pcm_bytes() as f64 / self.file_size as f64
    }

    /// average coded bits per sample over all channels
    pub fn bits_per_sample(&self) -> f64 {
        let total = self.header.num_samples * self.header.channels as u64;
        if total == 0 {
            return 0.0;
        }
        self.file_size as f64 * 8.0 / total as f64
    }
}
