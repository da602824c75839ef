//! frame-wise pcm exchange between the codec and the file layer

use crate::core::{SacError, SacResult};

/// supplies planar integer samples, one frame at a time
pub trait SampleSource: Send {
    /// fill `buffers[ch][..n]` and return `n`; `n < max_samples` only at the end
    fn read_samples(&mut self, buffers: &mut [Vec<i32>], max_samples: usize) -> SacResult<usize>;
}

/// receives decoded planar samples, one frame at a time
pub trait SampleSink: Send {
    /// consume `buffers[ch][..count]`, returns bytes written
    fn write_samples(&mut self, buffers: &[Vec<i32>], count: usize) -> SacResult<usize>;
}

/// reads from an interleaved in-memory buffer
pub struct PcmSource<'a> {
    samples: &'a [i32],
    channels: usize,
    pos: usize,
}

impl<'a> PcmSource<'a> {
    pub fn new(samples: &'a [i32], channels: usize) -> SacResult<Self> {
        if channels == 0 {
            return Err(SacError::Unsupported("zero channels".to_string()));
        }
        if samples.len() % channels != 0 {
            return Err(SacError::Unsupported(format!(
                "{} samples do not divide into {channels} channels",
                samples.len()
            )));
        }
        Ok(PcmSource {
            samples,
            channels,
            pos: 0,
        })
    }

    /// samples per channel still unread
    pub fn remaining(&self) -> usize {
        (self.samples.len() - self.pos) / self.channels
    }
}

impl SampleSource for PcmSource<'_> {
    fn read_samples(&mut self, buffers: &mut [Vec<i32>], max_samples: usize) -> SacResult<usize> {
        if buffers.len() != self.channels {
            return Err(SacError::Unsupported(format!(
                "source has {} channels, got {} buffers",
                self.channels,
                buffers.len()
            )));
        }
        let n = self.remaining().min(max_samples);
        let frame = &self.samples[self.pos..self.pos + n * self.channels];
        for (ch, buf) in buffers.iter_mut().enumerate() {
            if buf.len() < n {
                buf.resize(n, 0);
            }
            for (dst, src) in buf.iter_mut().zip(frame.iter().skip(ch).step_by(self.channels)) {
                *dst = *src;
            }
        }
        self.pos += n * self.channels;
        Ok(n)
    }
}

/// collects decoded samples into an interleaved buffer
pub struct PcmSink {
    channels: usize,
    bytes_per_sample: usize,
    samples: Vec<i32>,
}

impl PcmSink {
    pub fn new(channels: usize, bits_per_sample: u8, capacity: usize) -> Self {
        PcmSink {
            channels,
            bytes_per_sample: (bits_per_sample as usize).div_ceil(8).max(1),
            samples: Vec::with_capacity(capacity.saturating_mul(channels)),
        }
    }

    pub fn into_samples(self) -> Vec<i32> {
        self.samples
    }
}

impl SampleSink for PcmSink {
    fn write_samples(&mut self, buffers: &[Vec<i32>], count: usize) -> SacResult<usize> {
        if buffers.len() != self.channels {
            return Err(SacError::Unsupported(format!(
                "sink has {} channels, got {} buffers",
                self.channels,
                buffers.len()
            )));
        }
        for i in 0..count {
            for ch in buffers {
                self.samples.push(ch[i]);
            }
        }
        Ok(count * self.channels * self.bytes_per_sample)
    }
}
