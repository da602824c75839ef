use tracing::{debug, info, warn};

use super::frame::FrameCoder;
use super::run_in_pool;
use crate::core::checksum::to_hex;
use crate::core::{CoderConfig, FrameHasher, MtMode, PcmSink, SacResult, SampleSink};
use crate::reader::{frame_alloc, overshoot, ByteReader, SacFile};
use crate::Reader;

/// a fully decoded stream
#[derive(Debug, Clone)]
pub struct DecodedAudio {
    /// interleaved
    pub samples: Vec<i32>,
    pub sample_rate: u32,
    pub channels: u8,
    pub bits_per_sample: u8,
    /// raw metadata block
    pub metadata: Vec<u8>,
    /// decoded pcm hashes to the checksum stored in the header
    pub checksum_ok: bool,
}

/// audio decoder for sac format
#[derive(Debug, Clone)]
pub struct Decoder {
    mt_mode: MtMode,
    threads: usize,
}

impl Decoder {
    pub fn new() -> Self {
        Decoder {
            mt_mode: MtMode::default(),
            threads: 0,
        }
    }

    pub fn with_mt_mode(mut self, mt_mode: MtMode) -> Self {
        self.mt_mode = mt_mode;
        self
    }

    pub fn with_threads(mut self, threads: usize) -> Self {
        self.threads = threads;
        self
    }

    /// decode sac data to interleaved samples
    pub fn decode(&self, data: &[u8]) -> SacResult<DecodedAudio> {
        let file = Reader::new().read(data)?;
        let header = &file.header;

        // capacity is a hint, a lying header must not reserve gigabytes
        let capacity = (header.num_samples as usize).min(data.len().saturating_mul(8));
        let mut sink = PcmSink::new(header.channels as usize, header.bits_per_sample, capacity);
        let checksum_ok = self.decode_file(&file, &mut sink)?;

        Ok(DecodedAudio {
            samples: sink.into_samples(),
            sample_rate: header.sample_rate,
            channels: header.channels,
            bits_per_sample: header.bits_per_sample,
            metadata: file.metadata.to_vec(),
            checksum_ok,
        })
    }

    /// decode every frame into `sink`, returns whether the checksum matched
    pub fn decode_file(&self, file: &SacFile, sink: &mut dyn SampleSink) -> SacResult<bool> {
        run_in_pool(self.threads, || self.decode_frames(file, sink))
    }

    fn decode_frames(&self, file: &SacFile, sink: &mut dyn SampleSink) -> SacResult<bool> {
        let header = &file.header;
        let config = CoderConfig {
            mt_mode: self.mt_mode,
            ..Default::default()
        };
        let mut coder = FrameCoder::new(header.channels as usize, frame_alloc(header), config)?;
        let mut cursor = ByteReader::new(file.frames);
        let mut hasher = FrameHasher::new();
        let mut seen = 0u64;
        let mut frames = 0usize;

        while seen < header.num_samples {
            coder.read_encoded(&mut cursor)?;
            let n = coder.num_samples();
            seen += n as u64;
            if seen > header.num_samples {
                return Err(overshoot(header));
            }

            coder.decode()?;
            coder.unpredict()?;
            hasher.update(coder.buffers(), n);
            coder.write_samples(sink)?;

            debug!(frame = frames, samples = n, "frame decoded");
            frames += 1;
        }

        let checksum = hasher.finalize();
        let ok = checksum == header.checksum;
        if ok {
            info!(frames, samples = seen, "stream decoded, checksum ok");
        } else {
            warn!(
                expected = %to_hex(&header.checksum),
                actual = %to_hex(&checksum),
                "checksum mismatch, decoded audio differs from the source"
            );
        }
        Ok(ok)
    }
}

impl Default for Decoder {
    fn default() -> Self {
        Self::new()
    }
}
