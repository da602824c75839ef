use anyhow::{bail, Context, Result};
use std::io::{Cursor, Write};
use std::path::Path;
use symphonia::core::audio::{AudioBufferRef, SampleBuffer};
use symphonia::core::codecs::{DecoderOptions, CODEC_TYPE_NULL};
use symphonia::core::formats::FormatOptions;
use symphonia::core::io::MediaSourceStream;
use symphonia::core::meta::{MetadataOptions, MetadataRevision, StandardTagKey, Value};
use symphonia::core::probe::Hint;

/// integer pcm read from a wav or flac file
#[derive(Debug, Clone, Default)]
pub struct SourceAudio {
    /// interleaved, right aligned to `bits_per_sample`
    pub samples: Vec<i32>,
    pub sample_rate: u32,
    pub channels: u8,
    pub bits_per_sample: u8,
    /// e.g. "WAV", "FLAC"
    pub source_format: Option<String>,
    /// text tags found in the source, standard keys lowercased
    pub tags: Vec<(String, String)>,
}

impl SourceAudio {
    /// samples per channel
    pub fn num_samples(&self) -> usize {
        if self.channels == 0 {
            return 0;
        }
        self.samples.len() / self.channels as usize
    }

    pub fn duration_secs(&self) -> f64 {
        if self.sample_rate == 0 {
            return 0.0;
        }
        self.num_samples() as f64 / self.sample_rate as f64
    }
}

/// Read an audio file from disk
pub fn read_audio_file(path: &Path) -> Result<SourceAudio> {
    let file = std::fs::File::open(path).context("Failed to open audio file")?;
    let mss = MediaSourceStream::new(Box::new(file), Default::default());
    read_from_source(mss, path.extension().and_then(|e| e.to_str()))
}

/// Read audio from bytes
pub fn read_audio_from_bytes(bytes: &[u8]) -> Result<SourceAudio> {
    let cursor = Cursor::new(bytes.to_vec());
    let mss = MediaSourceStream::new(Box::new(cursor), Default::default());
    read_from_source(mss, None)
}

fn read_from_source(mss: MediaSourceStream, extension: Option<&str>) -> Result<SourceAudio> {
    let mut hint = Hint::new();
    if let Some(ext) = extension {
        hint.with_extension(ext);
    }

    let mut probed = symphonia::default::get_probe()
        .format(
            &hint,
            mss,
            &FormatOptions::default(),
            &MetadataOptions::default(),
        )
        .context("Unsupported audio format")?;

    let mut audio = SourceAudio {
        source_format: extension.map(|ext| ext.to_uppercase()),
        ..Default::default()
    };

    if let Some(meta_rev) = probed.metadata.get() {
        if let Some(current) = meta_rev.current() {
            extract_tags(current, &mut audio.tags);
        }
    }

    let mut format = probed.format;
    if let Some(meta_rev) = format.metadata().current() {
        extract_tags(meta_rev, &mut audio.tags);
    }

    let track = format
        .tracks()
        .iter()
        .find(|t| t.codec_params.codec != CODEC_TYPE_NULL)
        .context("No audio track found")?;

    if audio.source_format.is_none() {
        let codec = track.codec_params.codec;
        audio.source_format = Some(
            if codec == symphonia::core::codecs::CODEC_TYPE_FLAC {
                "FLAC"
            } else {
                "WAV"
            }
            .to_string(),
        );
    }

    let track_id = track.id;
    audio.sample_rate = track
        .codec_params
        .sample_rate
        .context("Unknown sample rate")?;
    let channels = track
        .codec_params
        .channels
        .context("Unknown channel count")?
        .count();
    if channels == 0 || channels > libsac::core::MAX_CHANNELS as usize {
        bail!("{channels} channels, only mono and stereo are supported");
    }
    audio.channels = channels as u8;

    let bits = track.codec_params.bits_per_sample.unwrap_or(16);
    if bits == 0 || bits > libsac::core::MAX_BITS_PER_SAMPLE as u32 {
        bail!("{bits} bit source, at most 16 bit integer pcm is supported");
    }
    audio.bits_per_sample = bits as u8;
    let shift = 16 - bits;

    let mut decoder = symphonia::default::get_codecs()
        .make(&track.codec_params, &DecoderOptions::default())
        .context("Failed to create decoder")?;

    let mut buf: Option<SampleBuffer<i16>> = None;
    let mut buf_frames = 0u64;
    loop {
        let packet = match format.next_packet() {
            Ok(packet) => packet,
            Err(symphonia::core::errors::Error::IoError(e))
                if e.kind() == std::io::ErrorKind::UnexpectedEof =>
            {
                break
            }
            Err(e) => return Err(e).context("Error reading packet"),
        };

        if packet.track_id() != track_id {
            continue;
        }

        let decoded = match decoder.decode(&packet) {
            Ok(decoded) => decoded,
            Err(symphonia::core::errors::Error::DecodeError(_)) => continue,
            Err(e) => return Err(e).context("Error decoding packet"),
        };
        if matches!(decoded, AudioBufferRef::F32(_) | AudioBufferRef::F64(_)) {
            bail!("floating point source, only integer pcm is supported");
        }

        // i16 conversion is exact for sources up to 16 bit
        let needed = decoded.capacity() as u64;
        if buf.is_none() || buf_frames < needed {
            buf = Some(SampleBuffer::new(needed, *decoded.spec()));
            buf_frames = needed;
        }
        if let Some(buf) = buf.as_mut() {
            buf.copy_interleaved_ref(decoded);
            audio
                .samples
                .extend(buf.samples().iter().map(|&s| (s >> shift) as i32));
        }
    }

    Ok(audio)
}

fn extract_tags(meta: &MetadataRevision, tags: &mut Vec<(String, String)>) {
    for tag in meta.tags() {
        let Value::String(value) = &tag.value else {
            continue;
        };
        let key = match tag.std_key {
            Some(StandardTagKey::TrackTitle) => "title".to_string(),
            Some(StandardTagKey::Artist) => "artist".to_string(),
            Some(StandardTagKey::Album) => "album".to_string(),
            Some(StandardTagKey::Date) => "date".to_string(),
            Some(StandardTagKey::Genre) => "genre".to_string(),
            Some(StandardTagKey::Comment) => "comment".to_string(),
            _ => tag.key.to_lowercase(),
        };
        if !tags.iter().any(|(k, _)| *k == key) {
            tags.push((key, value.clone()));
        }
    }
}

/// Write samples to a WAV file
pub fn write_wav(
    path: &Path,
    samples: &[i32],
    sample_rate: u32,
    channels: u8,
    bits_per_sample: u8,
) -> Result<()> {
    let bytes = write_wav_to_bytes(samples, sample_rate, channels, bits_per_sample)?;
    std::fs::write(path, bytes).context("Failed to write WAV file")
}

/// Write integer samples as PCM WAV in memory
///
/// Up to 8 bits are stored as unsigned 8 bit, wider sources as signed
/// 16 bit, left aligned as the RIFF format expects.
pub fn write_wav_to_bytes(
    samples: &[i32],
    sample_rate: u32,
    channels: u8,
    bits_per_sample: u8,
) -> Result<Vec<u8>> {
    if bits_per_sample == 0 || bits_per_sample > 16 {
        bail!("cannot write {bits_per_sample} bit WAV");
    }
    let container_bits: u16 = if bits_per_sample <= 8 { 8 } else { 16 };
    let shift = container_bits as u32 - bits_per_sample as u32;
    let bytes_per_sample = container_bits as usize / 8;

    let data_size = samples.len() * bytes_per_sample;
    let file_size = 36 + data_size;
    let mut buffer = Vec::with_capacity(8 + file_size);

    // RIFF header
    buffer.write_all(b"RIFF")?;
    buffer.write_all(&(file_size as u32).to_le_bytes())?;
    buffer.write_all(b"WAVE")?;

    // fmt chunk
    buffer.write_all(b"fmt ")?;
    buffer.write_all(&16u32.to_le_bytes())?; // chunk size
    buffer.write_all(&1u16.to_le_bytes())?; // format = PCM
    buffer.write_all(&(channels as u16).to_le_bytes())?;
    buffer.write_all(&sample_rate.to_le_bytes())?;
    let block_align = channels as u16 * bytes_per_sample as u16;
    let byte_rate = sample_rate * block_align as u32;
    buffer.write_all(&byte_rate.to_le_bytes())?;
    buffer.write_all(&block_align.to_le_bytes())?;
    buffer.write_all(&container_bits.to_le_bytes())?;

    // data chunk
    buffer.write_all(b"data")?;
    buffer.write_all(&(data_size as u32).to_le_bytes())?;

    if container_bits == 8 {
        for &s in samples {
            buffer.push(((s << shift) + 128) as u8);
        }
    } else {
        for &s in samples {
            buffer.write_all(&((s << shift) as i16).to_le_bytes())?;
        }
    }

    Ok(buffer)
}
