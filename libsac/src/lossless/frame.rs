//! Frame coder.
//!
//! Runs one frame at a time through
//!
//! ```text
//! encode: Idle -> Loaded -> Predicted -> Encoded -> (written) Idle
//! decode: Idle -> HeaderRead -> Decoded -> SamplesReady -> (written) Idle
//! ```
//!
//! Buffers are allocated once for the max frame length and reused; only
//! the first `num_samples` entries of each are meaningful. Per-channel
//! work runs on rayon when the configuration allows it. Channels own
//! disjoint buffers, the only shared data is read-only (the samples and
//! the profile), so no locking is involved.
//!
//! Frame layout, little endian:
//!
//! ```text
//! u32 numsamples
//! profile       Profile::LEN x f32
//! per channel   u32 blocksize, u32 mean, u32 minval, u32 maxval, u16 flags
//! per channel   blocksize payload bytes
//! ```
//!
//! `flags`: low 8 bits residual bit width, bit 9 remap used, bit 10
//! mid/side applied.

use rayon::prelude::*;
use tracing::{debug, trace};

use super::cost::CostKind;
use super::dds::Dds;
use super::predictor::{clamp_prediction, Predictor, PredictorParams};
use super::profile::{Profile, Role};
use super::remap::{Remap, MAX_MAP_SPAN};
use crate::core::bits::{bit_length, s2u, u2s};
use crate::core::{
    BlockSummary, CoderConfig, FrameSummary, SacError, SacResult, SampleSink, SampleSource,
    MAX_CHANNELS,
};
use crate::entropy::{BitplaneCoder, MapCoder, RangeDecoder, RangeEncoder};
use crate::reader::ByteReader;

/// block flag: payload starts with a remap bitmap
pub const FLAG_REMAP: u16 = 1 << 9;
/// block flag: the frame was mid/side transformed
pub const FLAG_MID_SIDE: u16 = 1 << 10;
/// block flag bits holding the residual bit width
pub const FLAG_BITS_MASK: u16 = 0xff;

/// serialized size of one channel block header
pub const BLOCK_HEADER_SIZE: usize = 18;

/// everything before the payloads of a frame
pub fn frame_header_size(channels: usize) -> usize {
    4 + Profile::BYTES + channels * BLOCK_HEADER_SIZE
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FrameState {
    /// no frame in flight
    Idle,
    /// samples read, waiting for analysis and prediction
    Loaded,
    /// residuals computed
    Predicted,
    /// payloads coded, ready to be written
    Encoded,
    /// frame parsed from a stream
    HeaderRead,
    /// residuals decoded
    Decoded,
    /// samples reconstructed, ready to be written out
    SamplesReady,
}

/// per-channel statistics of the current frame
#[derive(Debug, Clone, Default)]
pub struct FrameStats {
    pub mean: i32,
    /// range after mean removal
    pub minval: i32,
    pub maxval: i32,
    pub maxbpn: u32,
    pub maxbpn_map: u32,
    pub enc_mapped: bool,
    pub blocksize: u32,
    pub remap: Remap,
}

impl FrameStats {
    /// bit width of the residuals actually coded
    pub fn coded_bits(&self) -> u32 {
        if self.enc_mapped {
            self.maxbpn_map
        } else {
            self.maxbpn
        }
    }
}

#[derive(Debug, Default)]
struct ChannelWork {
    error: Vec<i32>,
    error_map: Vec<i32>,
    pred: Vec<i32>,
    residual: Vec<u32>,
    residual_map: Vec<u32>,
    encoded: Vec<u8>,
    spare: Vec<u8>,
    stats: FrameStats,
}

impl ChannelWork {
    /// grow the per-sample buffers to hold `n` samples, never shrinks
    fn reserve(&mut self, n: usize) {
        if self.error.len() >= n {
            return;
        }
        self.error.resize(n, 0);
        self.error_map.resize(n, 0);
        self.pred.resize(n, 0);
        self.residual.resize(n, 0);
        self.residual_map.resize(n, 0);
    }
}

pub struct FrameCoder {
    config: CoderConfig,
    frame_len: usize,
    /// configured max frame length, the base of the search window
    window_base: usize,
    num_samples: usize,
    samples: Vec<Vec<i32>>,
    work: Vec<ChannelWork>,
    profile: Profile,
    mid_side: bool,
    state: FrameState,
    frame_index: u64,
}

impl FrameCoder {
    pub fn new(channels: usize, frame_len: usize, config: CoderConfig) -> SacResult<Self> {
        if channels == 0 || channels > MAX_CHANNELS as usize {
            return Err(SacError::Unsupported(format!(
                "{channels} channels, supported are 1..={MAX_CHANNELS}"
            )));
        }
        if frame_len == 0 {
            return Err(SacError::Config("frame length of zero samples".to_string()));
        }
        config.validate()?;

        Ok(FrameCoder {
            config,
            frame_len,
            window_base: frame_len,
            num_samples: 0,
            samples: vec![Vec::new(); channels],
            work: (0..channels).map(|_| ChannelWork::default()).collect(),
            profile: Profile::baseline(),
            mid_side: false,
            state: FrameState::Idle,
            frame_index: 0,
        })
    }

    /// size the search window from `len` rather than the buffer length,
    /// for coders whose buffers were shrunk to a short input
    pub fn with_window_base(mut self, len: usize) -> Self {
        self.window_base = len.max(1);
        self
    }

    pub fn channels(&self) -> usize {
        self.samples.len()
    }

    /// samples of the current frame the coefficient search runs over
    pub fn search_window(&self) -> usize {
        let frac = self.config.optimize.fraction;
        ((frac * self.window_base as f64).ceil() as usize).clamp(1, self.num_samples.max(1))
    }

    pub fn frame_len(&self) -> usize {
        self.frame_len
    }

    pub fn num_samples(&self) -> usize {
        self.num_samples
    }

    pub fn state(&self) -> FrameState {
        self.state
    }

    pub fn profile(&self) -> &Profile {
        &self.profile
    }

    pub fn stats(&self, ch: usize) -> &FrameStats {
        &self.work[ch].stats
    }

    pub fn mid_side(&self) -> bool {
        self.mid_side
    }

    /// channel buffers; only `..num_samples()` is valid
    pub fn buffers(&self) -> &[Vec<i32>] {
        &self.samples
    }

    /// residuals of the current frame for one channel
    pub fn residuals(&self, ch: usize) -> &[i32] {
        &self.work[ch].error[..self.num_samples]
    }

    /// encoded size of the current frame
    pub fn encoded_size(&self) -> usize {
        frame_header_size(self.channels())
            + self.work.iter().map(|w| w.encoded.len()).sum::<usize>()
    }

    /// buffers grow to the largest frame seen, so a header's frame length
    /// alone never reserves memory
    fn reserve(&mut self, n: usize) {
        for buf in &mut self.samples {
            if buf.len() < n {
                buf.resize(n, 0);
            }
        }
        for w in &mut self.work {
            w.reserve(n);
        }
    }

    /// samples the buffers currently hold per channel
    pub fn capacity(&self) -> usize {
        self.samples.iter().map(Vec::len).min().unwrap_or(0)
    }

    fn expect(&self, expected: FrameState) -> SacResult<()> {
        if self.state != expected {
            return Err(SacError::InvalidState {
                expected,
                found: self.state,
            });
        }
        Ok(())
    }

    /// drop whatever frame is in flight
    pub fn reset(&mut self) {
        self.num_samples = 0;
        self.state = FrameState::Idle;
    }

    // encode path

    /// pull the next frame from `source`, returns the samples read
    pub fn read_samples(&mut self, source: &mut dyn SampleSource) -> SacResult<usize> {
        self.expect(FrameState::Idle)?;
        self.reserve(self.frame_len);
        let n = source.read_samples(&mut self.samples, self.frame_len)?;
        if n > self.frame_len {
            return Err(SacError::Format(format!(
                "source returned {n} samples for a {} sample frame",
                self.frame_len
            )));
        }
        self.num_samples = n;
        if n > 0 {
            self.state = FrameState::Loaded;
        }
        Ok(n)
    }

    /// analyse, optionally search coefficients, and compute residuals
    pub fn predict(&mut self) -> SacResult<()> {
        self.expect(FrameState::Loaded)?;
        let n = self.num_samples;

        self.mid_side = self.config.stereo_ms && self.channels() == 2;
        if self.mid_side {
            let (left, right) = self.samples.split_at_mut(1);
            to_mid_side(&mut left[0][..n], &mut right[0][..n]);
        }

        for (samples, work) in self.samples.iter_mut().zip(&mut self.work) {
            analyse_channel(
                &mut samples[..n],
                &mut work.stats,
                self.config.zero_mean,
                self.config.sparse_pcm,
            );
        }

        if self.config.optimize.enabled {
            self.optimize();
        }

        predict_channels(
            &self.samples,
            &mut self.work,
            &self.profile,
            0,
            n,
            false,
            self.config.mt_mode.parallel_channels(),
        );

        for w in &mut self.work {
            let mut emax = 0u32;
            for (r, &e) in w.residual[..n].iter_mut().zip(&w.error[..n]) {
                *r = s2u(e);
                emax = emax.max(*r);
            }
            w.stats.maxbpn = bit_length(emax);
        }

        self.state = FrameState::Predicted;
        Ok(())
    }

    fn optimize(&mut self) {
        let opt = self.config.optimize.clone();
        let n = self.num_samples;
        let window = self.search_window();
        let from = (n - window) / 2;

        if opt.reset_profile {
            self.profile = Profile::baseline();
        }

        let indices = Profile::search_indices(self.channels());
        let x0 = self.profile.values(&indices);
        let seed = opt.seed ^ self.frame_index.wrapping_mul(0x9E37_79B9_7F4A_7C15);
        let mut dds = Dds::new(self.profile.bounds(&indices), opt.schedule, seed);

        let parallel = self.config.mt_mode.parallel_costs();
        let mut candidate = self.profile.clone();
        let (samples, work) = (&self.samples, &mut self.work);
        let result = dds.run(
            |x| {
                candidate.set_values(&indices, x);
                window_cost(samples, &mut work[..], &candidate, from, window, opt.cost, parallel)
            },
            &x0,
            opt.max_evals,
        );

        self.profile.set_values(&indices, &result.best);
        debug!(
            frame = self.frame_index,
            window,
            evaluations = result.evaluations,
            start_cost = result.history.first().copied().unwrap_or(f64::NAN),
            best_cost = result.best_cost,
            cost = %opt.cost,
            "coefficient search"
        );
        if self.config.verbose >= 2 {
            let dump: Vec<String> = Profile::names()
                .zip(self.profile.iter())
                .map(|(name, c)| format!("{name}={:.6}", c.value))
                .collect();
            debug!(frame = self.frame_index, profile = %dump.join(" "));
        }
    }

    /// entropy code every channel
    pub fn encode(&mut self) -> SacResult<()> {
        self.expect(FrameState::Predicted)?;
        let n = self.num_samples;
        let sparse = self.config.sparse_pcm;
        let ratio = self.config.remap_ratio;
        let run = |w: &mut ChannelWork| encode_channel(w, n, sparse, ratio);

        if self.config.mt_mode.parallel_channels() && self.work.len() > 1 {
            self.work.par_iter_mut().for_each(run);
        } else {
            self.work.iter_mut().for_each(run);
        }

        self.state = FrameState::Encoded;
        Ok(())
    }

    /// append the encoded frame to `out`
    pub fn write_encoded(&mut self, out: &mut Vec<u8>) -> SacResult<()> {
        self.expect(FrameState::Encoded)?;

        out.extend_from_slice(&(self.num_samples as u32).to_le_bytes());
        self.profile.write_to(out);

        for w in &self.work {
            let s = &w.stats;
            let mut flags = s.coded_bits() as u16 & FLAG_BITS_MASK;
            if s.enc_mapped {
                flags |= FLAG_REMAP;
            }
            if self.mid_side {
                flags |= FLAG_MID_SIDE;
            }
            out.extend_from_slice(&s.blocksize.to_le_bytes());
            out.extend_from_slice(&(s.mean as u32).to_le_bytes());
            out.extend_from_slice(&(s.minval as u32).to_le_bytes());
            out.extend_from_slice(&(s.maxval as u32).to_le_bytes());
            out.extend_from_slice(&flags.to_le_bytes());
        }
        for w in &self.work {
            out.extend_from_slice(&w.encoded);
        }

        self.frame_index += 1;
        self.num_samples = 0;
        self.state = FrameState::Idle;
        Ok(())
    }

    // decode path

    /// parse the next frame from `reader`
    pub fn read_encoded(&mut self, reader: &mut ByteReader) -> SacResult<()> {
        self.expect(FrameState::Idle)?;

        let n = reader.read_u32_le()? as usize;
        if n == 0 || n > self.frame_len {
            return Err(SacError::Format(format!(
                "frame {} claims {n} samples, limit is {}",
                self.frame_index, self.frame_len
            )));
        }
        self.profile = Profile::read_from(reader.read_slice(Profile::BYTES)?)?;

        let mut mid_side = None;
        for w in &mut self.work {
            let block = read_block_header(reader)?;
            if *mid_side.get_or_insert(block.mid_side) != block.mid_side {
                return Err(SacError::Format(
                    "channels disagree on mid/side".to_string(),
                ));
            }
            let s = &mut w.stats;
            s.mean = block.mean;
            s.minval = block.minval;
            s.maxval = block.maxval;
            s.blocksize = block.blocksize;
            s.enc_mapped = block.mapped;
            s.maxbpn = block.bits as u32;
            s.maxbpn_map = block.bits as u32;
        }
        self.mid_side = mid_side.unwrap_or(false);
        if self.mid_side && self.channels() != 2 {
            return Err(SacError::Format(
                "mid/side flag on a stream that is not stereo".to_string(),
            ));
        }

        for w in &mut self.work {
            let payload = reader.read_slice(w.stats.blocksize as usize)?;
            w.encoded.clear();
            w.encoded.extend_from_slice(payload);
        }

        self.reserve(n);
        self.num_samples = n;
        self.state = FrameState::HeaderRead;
        Ok(())
    }

    /// what the last [`FrameCoder::read_encoded`] parsed
    pub fn frame_summary(&self) -> FrameSummary {
        FrameSummary {
            index: self.frame_index as usize,
            num_samples: self.num_samples as u32,
            header_bytes: frame_header_size(self.channels()),
            blocks: self
                .work
                .iter()
                .map(|w| BlockSummary {
                    blocksize: w.stats.blocksize,
                    mean: w.stats.mean,
                    minval: w.stats.minval,
                    maxval: w.stats.maxval,
                    bits: w.stats.coded_bits() as u8,
                    mapped: w.stats.enc_mapped,
                    mid_side: self.mid_side,
                })
                .collect(),
        }
    }

    /// skip the parsed frame without decoding it
    pub fn skip_frame(&mut self) -> SacResult<()> {
        self.expect(FrameState::HeaderRead)?;
        self.frame_index += 1;
        self.reset();
        Ok(())
    }

    /// entropy decode every channel's residuals
    pub fn decode(&mut self) -> SacResult<()> {
        self.expect(FrameState::HeaderRead)?;
        let n = self.num_samples;
        let run = |w: &mut ChannelWork| decode_channel(w, n);

        if self.config.mt_mode.parallel_channels() && self.work.len() > 1 {
            self.work
                .par_iter_mut()
                .map(run)
                .collect::<SacResult<Vec<()>>>()?;
        } else {
            self.work
                .iter_mut()
                .map(run)
                .collect::<SacResult<Vec<()>>>()?;
        }

        self.state = FrameState::Decoded;
        Ok(())
    }

    /// replay the predictors over the decoded residuals
    pub fn unpredict(&mut self) -> SacResult<()> {
        self.expect(FrameState::Decoded)?;
        let n = self.num_samples;

        for ch in 0..self.channels() {
            let (head, tail) = self.samples.split_at_mut(ch);
            let dst = &mut tail[0][..n];
            let master: &[i32] = match head.first() {
                Some(m) => &m[..n],
                None => &[],
            };
            unpredict_channel(ch, dst, master, &self.work[ch], &self.profile);
        }

        for (samples, w) in self.samples.iter_mut().zip(&self.work) {
            let mean = w.stats.mean;
            if mean != 0 {
                for s in &mut samples[..n] {
                    *s = s.wrapping_add(mean);
                }
            }
        }

        if self.mid_side {
            let (mid, side) = self.samples.split_at_mut(1);
            from_mid_side(&mut mid[0][..n], &mut side[0][..n]);
        }

        self.state = FrameState::SamplesReady;
        Ok(())
    }

    /// hand the reconstructed frame to `sink`, returns its byte count
    pub fn write_samples(&mut self, sink: &mut dyn SampleSink) -> SacResult<usize> {
        self.expect(FrameState::SamplesReady)?;
        let written = sink.write_samples(&self.samples, self.num_samples)?;
        self.frame_index += 1;
        self.reset();
        Ok(written)
    }
}

fn read_block_header(reader: &mut ByteReader) -> SacResult<BlockSummary> {
    let blocksize = reader.read_u32_le()?;
    let mean = reader.read_u32_le()? as i32;
    let minval = reader.read_u32_le()? as i32;
    let maxval = reader.read_u32_le()? as i32;
    let flags = reader.read_u16_le()?;

    let bits = (flags & FLAG_BITS_MASK) as u8;
    let mapped = flags & FLAG_REMAP != 0;
    if bits > 32 {
        return Err(SacError::Format(format!("residual width {bits} bits")));
    }
    if minval > maxval {
        return Err(SacError::Format(format!(
            "block range [{minval}, {maxval}] is empty"
        )));
    }
    if mapped {
        let span = maxval as i64 - minval as i64 + 1;
        let lo = minval as i64 + mean as i64;
        if span > MAX_MAP_SPAN as i64 || lo < i32::MIN as i64 || lo + span - 1 > i32::MAX as i64 {
            return Err(SacError::Format(format!(
                "remap over [{minval}, {maxval}] + {mean} not representable"
            )));
        }
    }

    Ok(BlockSummary {
        blocksize,
        mean,
        minval,
        maxval,
        bits,
        mapped,
        mid_side: flags & FLAG_MID_SIDE != 0,
    })
}

/// mean/min/max, dc removal and remap analysis for one channel
fn analyse_channel(samples: &mut [i32], stats: &mut FrameStats, zero_mean: bool, sparse: bool) {
    stats.remap.reset();
    if sparse {
        stats.remap.analyse(samples);
    }

    let n = samples.len() as i64;
    let mean = if zero_mean && n > 0 {
        let sum: i64 = samples.iter().map(|&s| s as i64).sum();
        sum.div_euclid(n) as i32
    } else {
        0
    };
    if mean != 0 {
        for s in samples.iter_mut() {
            *s -= mean;
        }
    }

    stats.mean = mean;
    stats.minval = samples.iter().copied().min().unwrap_or(0);
    stats.maxval = samples.iter().copied().max().unwrap_or(0);
    stats.maxbpn = 0;
    stats.maxbpn_map = 0;
    stats.enc_mapped = false;
    stats.blocksize = 0;
}

fn role_of(ch: usize) -> Role {
    if ch == 0 {
        Role::Master
    } else {
        Role::Slave
    }
}

/// run channel `ch`'s predictor over `samples[ch][from..from + len]`
fn predict_channel(
    ch: usize,
    samples: &[Vec<i32>],
    w: &mut ChannelWork,
    profile: &Profile,
    from: usize,
    len: usize,
    searching: bool,
) {
    let role = role_of(ch);
    let mut predictor = Predictor::new(&PredictorParams::from_profile(profile, role, searching));
    let src = &samples[ch][from..from + len];
    let master = &samples[0][from..from + len];
    let (mean, minval, maxval) = (w.stats.mean, w.stats.minval, w.stats.maxval);

    for i in 0..len {
        let pd = match role {
            Role::Master => predictor.predict(),
            Role::Slave => predictor.predict_with_master(master, i),
        };
        let p = clamp_prediction(pd, minval, maxval);
        w.pred[i] = p + mean;
        w.error[i] = src[i] - p;
        predictor.update(src[i]);
    }
}

fn predict_channels(
    samples: &[Vec<i32>],
    work: &mut [ChannelWork],
    profile: &Profile,
    from: usize,
    len: usize,
    searching: bool,
    parallel: bool,
) {
    let run = |(ch, w): (usize, &mut ChannelWork)| {
        predict_channel(ch, samples, w, profile, from, len, searching)
    };
    if parallel && work.len() > 1 {
        work.par_iter_mut().enumerate().for_each(run);
    } else {
        work.iter_mut().enumerate().for_each(run);
    }
}

/// summed cost of all channels over a window, in channel order
fn window_cost(
    samples: &[Vec<i32>],
    work: &mut [ChannelWork],
    profile: &Profile,
    from: usize,
    len: usize,
    cost: CostKind,
    parallel: bool,
) -> f64 {
    let eval = |(ch, w): (usize, &mut ChannelWork)| {
        predict_channel(ch, samples, w, profile, from, len, true);
        cost.calc(&w.error[..len])
    };
    let costs: Vec<f64> = if parallel && work.len() > 1 {
        work.par_iter_mut().enumerate().map(eval).collect()
    } else {
        work.iter_mut().enumerate().map(eval).collect()
    };
    costs.iter().sum()
}

fn encode_channel(w: &mut ChannelWork, n: usize, sparse: bool, ratio: f64) {
    w.encoded = encode_plain(
        std::mem::take(&mut w.encoded),
        &w.residual[..n],
        w.stats.maxbpn,
    );
    w.stats.enc_mapped = false;

    if sparse && w.stats.remap.is_available() {
        let gain = remap_gain(w, n);
        trace!(gain, maxbpn = w.stats.maxbpn, maxbpn_map = w.stats.maxbpn_map, "remap gain");
        if gain > ratio {
            let mapped = encode_mapped(
                std::mem::take(&mut w.spare),
                &w.stats.remap,
                &w.residual_map[..n],
                w.stats.maxbpn_map,
            );
            trace!(plain = w.encoded.len(), mapped = mapped.len(), "remap trial");
            if mapped.len() < w.encoded.len() {
                w.spare = std::mem::replace(&mut w.encoded, mapped);
                w.stats.enc_mapped = true;
            } else {
                w.spare = mapped;
            }
        }
    }

    w.stats.blocksize = w.encoded.len() as u32;
}

/// map the residuals and return the l1 ratio plain / mapped
fn remap_gain(w: &mut ChannelWork, n: usize) -> f64 {
    let mut emax = 0u32;
    for i in 0..n {
        let m = w.stats.remap.map(w.pred[i], w.error[i]);
        w.error_map[i] = m;
        w.residual_map[i] = s2u(m);
        emax = emax.max(w.residual_map[i]);
    }
    w.stats.maxbpn_map = bit_length(emax);

    let mapped = CostKind::L1.calc(&w.error_map[..n]);
    if mapped > 0.0 {
        CostKind::L1.calc(&w.error[..n]) / mapped
    } else {
        1.0
    }
}

fn encode_plain(mut buf: Vec<u8>, values: &[u32], maxbpn: u32) -> Vec<u8> {
    buf.clear();
    let mut enc = RangeEncoder::new(buf);
    BitplaneCoder::new(maxbpn).encode(&mut enc, values);
    enc.finish()
}

fn encode_mapped(mut buf: Vec<u8>, remap: &Remap, values: &[u32], maxbpn: u32) -> Vec<u8> {
    buf.clear();
    let mut enc = RangeEncoder::new(buf);
    MapCoder::new().encode(&mut enc, remap.used());
    BitplaneCoder::new(maxbpn).encode(&mut enc, values);
    enc.finish()
}

fn decode_channel(w: &mut ChannelWork, n: usize) -> SacResult<()> {
    let mut dec = RangeDecoder::new(&w.encoded);
    let s = &mut w.stats;

    if s.enc_mapped {
        let span = (s.maxval as i64 - s.minval as i64 + 1) as usize;
        let used = MapCoder::new().decode(&mut dec, span);
        let vmin = s.minval.checked_add(s.mean).ok_or_else(|| {
            SacError::Format("remap base outside the sample range".to_string())
        })?;
        s.remap = Remap::from_used(vmin, used);
    } else {
        s.remap.reset();
    }

    BitplaneCoder::new(s.coded_bits()).decode(&mut dec, &mut w.residual[..n]);
    for (e, &r) in w.error[..n].iter_mut().zip(&w.residual[..n]) {
        *e = u2s(r);
    }
    Ok(())
}

fn unpredict_channel(
    ch: usize,
    dst: &mut [i32],
    master: &[i32],
    w: &ChannelWork,
    profile: &Profile,
) {
    let role = role_of(ch);
    let mut predictor = Predictor::new(&PredictorParams::from_profile(profile, role, false));
    let s = &w.stats;

    for i in 0..dst.len() {
        let pd = match role {
            Role::Master => predictor.predict(),
            Role::Slave => predictor.predict_with_master(master, i),
        };
        let p = clamp_prediction(pd, s.minval, s.maxval);
        let e = w.error[i];
        let val = if s.enc_mapped {
            p.wrapping_add(s.remap.unmap(p.wrapping_add(s.mean), e))
        } else {
            p.wrapping_add(e)
        };
        dst[i] = val;
        predictor.update(val);
    }
}

fn to_mid_side(left: &mut [i32], right: &mut [i32]) {
    for (l, r) in left.iter_mut().zip(right.iter_mut()) {
        let (a, b) = (*l, *r);
        *l = (a + b) >> 1;
        *r = a - b;
    }
}

fn from_mid_side(mid: &mut [i32], side: &mut [i32]) {
    for (m, s) in mid.iter_mut().zip(side.iter_mut()) {
        let d = *s;
        let sum = (*m << 1) | (d & 1);
        *m = sum.wrapping_add(d) >> 1;
        *s = sum.wrapping_sub(d) >> 1;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mid_side_is_exact() {
        let mut l = vec![3, -1, 32767, -32768, 0, 5];
        let mut r = vec![0, 0, -32768, 32767, -1, 5];
        let (l0, r0) = (l.clone(), r.clone());
        to_mid_side(&mut l, &mut r);
        from_mid_side(&mut l, &mut r);
        assert_eq!(l, l0);
        assert_eq!(r, r0);
    }

    #[test]
    fn analyse_floors_the_mean() {
        let mut samples = vec![-3, -2, 0];
        let mut stats = FrameStats::default();
        analyse_channel(&mut samples, &mut stats, true, true);
        assert_eq!(stats.mean, -2);
        assert_eq!((stats.minval, stats.maxval), (-1, 2));
        assert_eq!(stats.remap.vmin(), -3);
    }
}
