//! sac - command line front end library for the SAC lossless codec
//!
//! Reads integer PCM (WAV, FLAC) through symphonia, drives the libsac
//! encoder and decoder, and writes PCM WAV back out.

pub mod audio;

use anyhow::{anyhow, Context, Result};
use serde::Serialize;
use tracing::info;

pub use libsac::{
    CoderConfig, CostKind, DecodedAudio, EncodeReport, FrameSummary, MtMode, OptimizeConfig,
    Preset, Progress, StreamMetadata,
};

use audio::SourceAudio;

/// Information about a sac file
#[derive(Debug, Clone, Serialize)]
pub struct SacInfo {
    pub version: String,
    pub sample_rate: u32,
    pub channels: u8,
    pub bits_per_sample: u8,
    pub num_samples: u64,
    pub num_frames: u64,
    /// max samples per frame
    pub frame_len: u32,
    pub duration_secs: f64,
    pub file_size: usize,
    pub compression_ratio: f64,
    /// coded bits per sample, all channels
    pub coded_bps: f64,
    pub optimized: bool,
    pub mid_side: bool,
    pub metadata: Option<StreamMetadata>,
}

/// Get information about a sac file, frames are not decoded
pub fn get_sac_info(data: &[u8]) -> Result<SacInfo> {
    let info = libsac::Reader::new()
        .read_info(data)
        .map_err(|e| anyhow!("Failed to read sac file: {}", e))?;
    let h = &info.header;

    Ok(SacInfo {
        version: format!("{}.{}", h.version_major, h.version_minor),
        sample_rate: h.sample_rate,
        channels: h.channels,
        bits_per_sample: h.bits_per_sample,
        num_samples: h.num_samples,
        num_frames: h.num_frames(),
        frame_len: h.frame_len,
        duration_secs: h.duration_secs(),
        file_size: info.file_size,
        compression_ratio: info.compression_ratio(),
        coded_bps: info.bits_per_sample(),
        optimized: h.flags & libsac::core::HEADER_FLAG_OPTIMIZED != 0,
        mid_side: h.flags & libsac::core::HEADER_FLAG_MID_SIDE != 0,
        metadata: StreamMetadata::parse_lenient(&info.metadata),
    })
}

/// Per-frame, per-channel block table
pub fn list_frames(data: &[u8]) -> Result<Vec<FrameSummary>> {
    libsac::Reader::new()
        .scan_frames(data)
        .map_err(|e| anyhow!("Failed to scan frames: {}", e))
}

/// Encoding options for converting audio to sac format
#[derive(Debug, Clone, Default)]
pub struct EncodeOptions {
    pub config: CoderConfig,
    /// extra tags, added after the ones found in the source
    pub tags: Vec<(String, String)>,
}

impl EncodeOptions {
    pub fn preset(preset: Preset) -> Self {
        EncodeOptions {
            config: CoderConfig::preset(preset),
            tags: Vec::new(),
        }
    }

    pub fn with_config(mut self, config: CoderConfig) -> Self {
        self.config = config;
        self
    }

    pub fn with_tag(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.tags.push((key.into(), value.into()));
        self
    }
}

/// Encode audio file bytes (WAV, FLAC) to sac format
pub fn encode_from_audio(audio_bytes: &[u8], options: &EncodeOptions) -> Result<Vec<u8>> {
    let source = audio::read_audio_from_bytes(audio_bytes).context("Failed to read audio file")?;
    let (bytes, _) = encode_from_samples(&source, options, &mut |_| {})?;
    Ok(bytes)
}

/// Encode decoded source audio, reporting progress after every frame
pub fn encode_from_samples(
    source: &SourceAudio,
    options: &EncodeOptions,
    progress: &mut (dyn FnMut(Progress) + Send),
) -> Result<(Vec<u8>, EncodeReport)> {
    let mut meta = StreamMetadata::new().with_config(&options.config);
    meta.encoded_at = Some(chrono::Utc::now().format("%Y-%m-%dT%H:%M:%SZ").to_string());
    meta.source_format = source.source_format.clone();
    meta.tags = source.tags.clone();
    meta.tags.extend(options.tags.iter().cloned());
    let metadata = meta
        .to_msgpack()
        .map_err(|e| anyhow!("Failed to serialize metadata: {}", e))?;

    let encoder = libsac::Encoder::new(source.sample_rate, source.channels, source.bits_per_sample)
        .with_config(options.config.clone());
    let mut pcm = libsac::core::PcmSource::new(&source.samples, source.channels as usize)
        .map_err(|e| anyhow!("Invalid sample buffer: {}", e))?;

    let (bytes, report) = encoder
        .encode_source(&mut pcm, source.num_samples() as u64, &metadata, progress)
        .map_err(|e| anyhow!("Encoding failed: {}", e))?;

    info!(
        input_samples = source.samples.len(),
        bytes = bytes.len(),
        frames = report.frames,
        "encoded"
    );
    Ok((bytes, report))
}

/// Decode a sac file to interleaved samples
pub fn decode_to_samples(
    sac_bytes: &[u8],
    mt_mode: MtMode,
    threads: usize,
) -> Result<DecodedAudio> {
    libsac::Decoder::new()
        .with_mt_mode(mt_mode)
        .with_threads(threads)
        .decode(sac_bytes)
        .map_err(|e| anyhow!("Invalid sac file: {}", e))
}

/// Decode a sac file to WAV format
///
/// A checksum mismatch is logged but the best effort audio is still
/// returned; use [`validate_sac`] to treat it as an error.
pub fn decode_to_wav(sac_bytes: &[u8]) -> Result<Vec<u8>> {
    let decoded = decode_to_samples(sac_bytes, MtMode::default(), 0)?;
    audio::write_wav_to_bytes(
        &decoded.samples,
        decoded.sample_rate,
        decoded.channels,
        decoded.bits_per_sample,
    )
    .context("Failed to write WAV data")
}

/// Full decode, true when the checksum matches
pub fn validate_sac(sac_bytes: &[u8]) -> Result<bool> {
    Ok(decode_to_samples(sac_bytes, MtMode::default(), 0)?.checksum_ok)
}

/// Get metadata from a sac file
pub fn get_metadata(sac_bytes: &[u8]) -> Result<Option<StreamMetadata>> {
    let file = libsac::Reader::new()
        .read(sac_bytes)
        .map_err(|e| anyhow!("Invalid sac file: {}", e))?;

    if file.metadata.is_empty() {
        return Ok(None);
    }

    let meta = StreamMetadata::from_msgpack(file.metadata)
        .map_err(|e| anyhow!("Invalid metadata: {}", e))?;
    Ok(Some(meta))
}
