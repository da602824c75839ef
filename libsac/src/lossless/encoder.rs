use std::time::{Duration, Instant};

use tracing::{debug, info};

use super::frame::FrameCoder;
use super::run_in_pool;
use crate::core::{
    CoderConfig, FrameHasher, Header, PcmSource, Preset, SacError, SacResult, SampleSource,
    CHECKSUM_SIZE, HEADER_FLAG_MID_SIDE, HEADER_FLAG_OPTIMIZED, MAX_BITS_PER_SAMPLE,
    MAX_CHANNELS, MAX_FRAME_LEN, VERSION_MAJOR, VERSION_MINOR,
};
use crate::Writer;

/// reported after every frame
#[derive(Debug, Clone, Copy)]
pub struct Progress {
    pub frame: usize,
    pub samples_done: u64,
    pub samples_total: u64,
}

impl Progress {
    pub fn fraction(&self) -> f64 {
        if self.samples_total == 0 {
            return 1.0;
        }
        self.samples_done as f64 / self.samples_total as f64
    }
}

/// what an encode run did
#[derive(Debug, Clone, Default)]
pub struct EncodeReport {
    pub frames: usize,
    pub bytes: usize,
    /// analysis, coefficient search and prediction
    pub predict_time: Duration,
    /// residual coding
    pub encode_time: Duration,
    pub total_time: Duration,
}

/// audio encoder for sac format
pub struct Encoder {
    sample_rate: u32,
    channels: u8,
    bits_per_sample: u8,
    config: CoderConfig,
}

impl Encoder {
    pub fn new(sample_rate: u32, channels: u8, bits_per_sample: u8) -> Self {
        Encoder {
            sample_rate,
            channels,
            bits_per_sample,
            config: CoderConfig::default(),
        }
    }

    pub fn with_config(mut self, config: CoderConfig) -> Self {
        self.config = config;
        self
    }

    /// keep the configuration, swap the optimizer effort
    pub fn with_preset(mut self, preset: Preset) -> Self {
        self.config.apply_preset(preset);
        self
    }

    pub fn config(&self) -> &CoderConfig {
        &self.config
    }

    /// encode interleaved samples to sac format
    pub fn encode(&self, samples: &[i32], metadata: &[u8]) -> SacResult<Vec<u8>> {
        self.validate()?;
        let mut source = PcmSource::new(samples, self.channels as usize)?;
        let num_samples = source.remaining() as u64;
        let (bytes, _) = self.encode_source(&mut source, num_samples, metadata, &mut |_| {})?;
        Ok(bytes)
    }

    /// encode `num_samples` samples per channel pulled from `source`
    pub fn encode_source(
        &self,
        source: &mut dyn SampleSource,
        num_samples: u64,
        metadata: &[u8],
        progress: &mut (dyn FnMut(Progress) + Send),
    ) -> SacResult<(Vec<u8>, EncodeReport)> {
        self.validate()?;
        run_in_pool(self.config.threads, || {
            self.encode_frames(source, num_samples, metadata, progress)
        })
    }

    fn validate(&self) -> SacResult<()> {
        if self.channels == 0 || self.channels > MAX_CHANNELS {
            return Err(SacError::Unsupported(format!(
                "{} channels, supported are 1..={MAX_CHANNELS}",
                self.channels
            )));
        }
        if self.bits_per_sample == 0 || self.bits_per_sample > MAX_BITS_PER_SAMPLE {
            return Err(SacError::Unsupported(format!(
                "{} bits per sample, supported are 1..={MAX_BITS_PER_SAMPLE}",
                self.bits_per_sample
            )));
        }
        if self.sample_rate == 0 {
            return Err(SacError::Unsupported("sample rate of 0 Hz".to_string()));
        }
        self.config.validate()?;
        if self.config.frame_len(self.sample_rate) > MAX_FRAME_LEN as usize {
            return Err(SacError::Config(format!(
                "{} s frames at {} Hz exceed {MAX_FRAME_LEN} samples",
                self.config.frame_secs, self.sample_rate
            )));
        }
        Ok(())
    }

    fn header(&self, num_samples: u64, frame_len: usize, meta_size: u32) -> Header {
        let mut flags = 0;
        if self.config.stereo_ms && self.channels == 2 {
            flags |= HEADER_FLAG_MID_SIDE;
        }
        if self.config.optimize.enabled {
            flags |= HEADER_FLAG_OPTIMIZED;
        }
        Header {
            version_major: VERSION_MAJOR,
            version_minor: VERSION_MINOR,
            flags,
            sample_rate: self.sample_rate,
            channels: self.channels,
            bits_per_sample: self.bits_per_sample,
            num_samples,
            frame_len: frame_len as u32,
            checksum: [0; CHECKSUM_SIZE],
            meta_size,
        }
    }

    fn encode_frames(
        &self,
        source: &mut dyn SampleSource,
        num_samples: u64,
        metadata: &[u8],
        progress: &mut (dyn FnMut(Progress) + Send),
    ) -> SacResult<(Vec<u8>, EncodeReport)> {
        let start = Instant::now();
        let meta_size = u32::try_from(metadata.len())
            .map_err(|_| SacError::Metadata(format!("{} bytes of metadata", metadata.len())))?;

        // short inputs do not need full length buffers
        let max_frame_len = self.config.frame_len(self.sample_rate);
        let frame_len = (max_frame_len as u64).min(num_samples).max(1) as usize;

        let header = self.header(num_samples, frame_len, meta_size);
        let mut writer = Writer::begin(&header, metadata);
        let mut coder = FrameCoder::new(self.channels as usize, frame_len, self.config.clone())?
            .with_window_base(max_frame_len);
        let mut hasher = FrameHasher::new();
        let mut report = EncodeReport::default();
        let mut done = 0u64;

        loop {
            let n = coder.read_samples(source)?;
            if n == 0 {
                break;
            }
            check_range(coder.buffers(), n, self.bits_per_sample)?;
            hasher.update(coder.buffers(), n);

            let t = Instant::now();
            coder.predict()?;
            report.predict_time += t.elapsed();

            let t = Instant::now();
            coder.encode()?;
            report.encode_time += t.elapsed();

            let bytes = coder.encoded_size();
            coder.write_encoded(writer.buffer_mut())?;
            done += n as u64;
            debug!(
                frame = report.frames,
                samples = n,
                bytes,
                bps = bytes as f64 * 8.0 / (n * self.channels as usize) as f64,
                "frame encoded"
            );
            report.frames += 1;
            progress(Progress {
                frame: report.frames,
                samples_done: done,
                samples_total: num_samples,
            });
        }

        if done != num_samples {
            return Err(SacError::Format(format!(
                "source delivered {done} samples per channel, header says {num_samples}"
            )));
        }

        let bytes = writer.finish(&hasher.finalize());
        report.bytes = bytes.len();
        report.total_time = start.elapsed();
        info!(
            frames = report.frames,
            bytes = report.bytes,
            predict_ms = report.predict_time.as_millis() as u64,
            encode_ms = report.encode_time.as_millis() as u64,
            "stream encoded"
        );
        Ok((bytes, report))
    }
}

/// every sample has to fit the declared width
fn check_range(buffers: &[Vec<i32>], n: usize, bits: u8) -> SacResult<()> {
    let hi = (1i32 << (bits - 1)) - 1;
    let lo = -hi - 1;
    for (ch, buf) in buffers.iter().enumerate() {
        if let Some(&s) = buf[..n].iter().find(|&&s| s < lo || s > hi) {
            return Err(SacError::Unsupported(format!(
                "sample {s} on channel {ch} does not fit {bits} bits"
            )));
        }
    }
    Ok(())
}
