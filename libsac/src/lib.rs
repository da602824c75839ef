#![allow(clippy::needless_range_loop)]

use wasm_bindgen::prelude::*;

pub mod core;
pub mod entropy;
pub mod lossless;

mod reader;
mod writer;

pub use crate::core::{
    checksum, CoderConfig, FrameSummary, Header, MtMode, OptimizeConfig, Preset, SacError,
    SacResult, SampleSink, SampleSource, StreamInfo, StreamMetadata, HEADER_SIZE, MAGIC,
    VERSION_MAJOR, VERSION_MINOR,
};
pub use lossless::{
    CostKind, DecodedAudio, Decoder, EncodeReport, Encoder, FrameCoder, FrameState, Profile,
    Progress,
};
pub use reader::{ByteReader, Reader, SacFile};
pub use writer::Writer;

// audio info for the info() function

/// info about a sac file
#[wasm_bindgen]
#[derive(Debug, Clone)]
pub struct AudioInfo {
    /// version string like "1.0"
    #[wasm_bindgen(skip)]
    pub version: String,
    /// Sample rate in Hz
    pub sample_rate: u32,
    /// Number of channels
    pub channels: u8,
    /// Bits per sample
    pub bits_per_sample: u8,
    /// Samples per channel
    pub num_samples: u64,
    /// Number of frames
    pub num_frames: u64,
    /// Duration in seconds
    pub duration_secs: f64,
    /// File size in bytes
    pub file_size: usize,
    /// Compression ratio (original / compressed)
    pub compression_ratio: f64,
    /// Coefficients were searched per frame
    pub optimized: bool,
    /// Mid/side was enabled
    pub mid_side: bool,
}

#[wasm_bindgen]
impl AudioInfo {
    #[wasm_bindgen(getter)]
    pub fn version(&self) -> String {
        self.version.clone()
    }
}

// result helpers

/// turn an error into js
fn to_js_err(e: SacError) -> JsValue {
    JsValue::from_str(&e.to_string())
}

// api functions

/// encode samples to sac
///
/// # Arguments
/// * `samples` - Interleaved integer samples
/// * `sample_rate` - Sample rate in Hz (e.g., 44100)
/// * `channels` - Number of channels (1 or 2)
/// * `bits_per_sample` - Bits per sample (1 to 16)
/// * `level` - 0 normal, 1 high, 2 veryhigh, 3 best, 4 insane
///
/// # Note
/// Runs single threaded. Use the `Encoder` builder for the full
/// configuration surface.
#[wasm_bindgen]
pub fn encode(
    samples: &[i32],
    sample_rate: u32,
    channels: u8,
    bits_per_sample: u8,
    level: u8,
) -> Result<Vec<u8>, JsValue> {
    let mut config = CoderConfig::preset(Preset::from_level(level));
    config.mt_mode = MtMode::Off;

    let metadata = StreamMetadata::new()
        .with_config(&config)
        .to_msgpack()
        .map_err(to_js_err)?;

    Encoder::new(sample_rate, channels, bits_per_sample)
        .with_config(config)
        .encode(samples, &metadata)
        .map_err(to_js_err)
}

/// decode sac to interleaved integer samples
#[wasm_bindgen]
pub fn decode(data: &[u8]) -> Result<Vec<i32>, JsValue> {
    Decoder::new()
        .with_mt_mode(MtMode::Off)
        .decode(data)
        .map(|audio| audio.samples)
        .map_err(to_js_err)
}

/// Validate sac file integrity
///
/// # Returns
/// true if the file decodes and its checksum matches
#[wasm_bindgen]
pub fn validate(data: &[u8]) -> bool {
    Decoder::new()
        .with_mt_mode(MtMode::Off)
        .decode(data)
        .map(|audio| audio.checksum_ok)
        .unwrap_or(false)
}

/// Get information about a sac file without decoding it
#[wasm_bindgen]
pub fn info(data: &[u8]) -> Result<AudioInfo, JsValue> {
    let info = Reader::new().read_info(data).map_err(to_js_err)?;
    let h = &info.header;

    Ok(AudioInfo {
        version: format!("{}.{}", h.version_major, h.version_minor),
        sample_rate: h.sample_rate,
        channels: h.channels,
        bits_per_sample: h.bits_per_sample,
        num_samples: h.num_samples,
        num_frames: h.num_frames(),
        duration_secs: h.duration_secs(),
        file_size: info.file_size,
        compression_ratio: info.compression_ratio(),
        optimized: h.flags & crate::core::HEADER_FLAG_OPTIMIZED != 0,
        mid_side: h.flags & crate::core::HEADER_FLAG_MID_SIDE != 0,
    })
}

/// stream metadata as a JSON string, empty if there is none
#[wasm_bindgen]
pub fn metadata_json(data: &[u8]) -> Result<String, JsValue> {
    let file = Reader::new().read(data).map_err(to_js_err)?;
    if file.metadata.is_empty() {
        return Ok(String::new());
    }
    let meta = StreamMetadata::from_msgpack(file.metadata).map_err(to_js_err)?;
    serde_json::to_string(&meta).map_err(|e| JsValue::from_str(&e.to_string()))
}

/// does the file carry a metadata block
#[wasm_bindgen]
pub fn has_metadata(data: &[u8]) -> bool {
    Reader::new()
        .read(data)
        .map(|file| !file.metadata.is_empty())
        .unwrap_or(false)
}

/// replace the metadata block, frames and checksum stay untouched
#[wasm_bindgen]
pub fn update_metadata(data: &[u8], metadata: &[u8]) -> Result<Vec<u8>, JsValue> {
    update_metadata_bytes(data, metadata).map_err(to_js_err)
}

/// see [`update_metadata`]
pub fn update_metadata_bytes(data: &[u8], metadata: &[u8]) -> SacResult<Vec<u8>> {
    let file = Reader::new().read(data)?;
    let mut header = file.header.clone();
    header.meta_size = u32::try_from(metadata.len())
        .map_err(|_| SacError::Metadata(format!("{} bytes of metadata", metadata.len())))?;

    let mut out =
        Vec::with_capacity(MAGIC.len() + HEADER_SIZE + metadata.len() + file.frames.len());
    out.extend_from_slice(&MAGIC);
    writer::write_header(&mut out, &header);
    out.extend_from_slice(metadata);
    out.extend_from_slice(file.frames);
    Ok(out)
}

/// get lib version
#[wasm_bindgen]
pub fn version() -> String {
    format!("{}.{}", VERSION_MAJOR, VERSION_MINOR)
}

/// Format time in seconds to MM:SS or H:MM:SS string
#[wasm_bindgen]
pub fn format_time(seconds: f64) -> String {
    if !seconds.is_finite() || seconds < 0.0 {
        return "0:00".to_string();
    }

    let total_secs = seconds.floor() as u64;
    let hours = total_secs / 3600;
    let mins = (total_secs % 3600) / 60;
    let secs = total_secs % 60;

    if hours > 0 {
        format!("{}:{:02}:{:02}", hours, mins, secs)
    } else {
        format!("{}:{:02}", mins, secs)
    }
}
