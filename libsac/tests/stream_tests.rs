//! Whole-stream tests: encoder, container, decoder and scanning

use libsac::core::checksum;
use libsac::core::{
    CoderConfig, MtMode, OptimizeConfig, PcmSource, Preset, SampleSource, HEADER_FLAG_MID_SIDE,
    HEADER_FLAG_OPTIMIZED, HEADER_SIZE, MAGIC,
};
use libsac::{CostKind, Decoder, Encoder, Reader, SacError, SacResult, StreamMetadata};
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;

/// tone plus a little noise, interleaved, fitting `bits`
fn music(seed: u64, frames: usize, channels: usize, bits: u8) -> Vec<i32> {
    let mut rng = ChaCha8Rng::seed_from_u64(seed);
    let amp = ((1i32 << (bits - 1)) - 1) as f64;
    let mut out = Vec::with_capacity(frames * channels);
    for i in 0..frames {
        let t = i as f64;
        let base = (t * 0.021).sin() * 0.5 + (t * 0.13).sin() * 0.2;
        for ch in 0..channels {
            let v = base * (1.0 - 0.3 * ch as f64) + rng.gen_range(-0.002..0.002);
            out.push((v * amp).round() as i32);
        }
    }
    out
}

fn quick_config() -> CoderConfig {
    CoderConfig {
        frame_secs: 1,
        ..CoderConfig::default()
    }
}

fn search_config(mt_mode: MtMode, threads: usize) -> CoderConfig {
    CoderConfig {
        frame_secs: 1,
        mt_mode,
        threads,
        optimize: OptimizeConfig {
            enabled: true,
            fraction: 0.1,
            max_evals: 6,
            ..OptimizeConfig::default()
        },
        ..CoderConfig::default()
    }
}

// ============================================================================
// Round Trip Tests
// ============================================================================

#[test]
fn test_roundtrip_formats() {
    let cases: [(u32, u8, u8, bool); 6] = [
        (8000, 1, 16, false),
        (8000, 2, 16, false),
        (8000, 2, 16, true),
        (11025, 1, 8, false),
        (11025, 2, 12, true),
        (16000, 2, 1, false),
    ];
    for (sr, ch, bits, stereo_ms) in cases {
        let samples = music(sr as u64, sr as usize * 5 / 2, ch as usize, bits.max(2));
        let samples: Vec<i32> = if bits == 1 {
            samples.iter().map(|&s| if s < 0 { -1 } else { 0 }).collect()
        } else {
            samples
        };
        let config = CoderConfig {
            stereo_ms,
            ..quick_config()
        };

        let bytes = Encoder::new(sr, ch, bits)
            .with_config(config)
            .encode(&samples, &[])
            .unwrap();
        let decoded = Decoder::new().decode(&bytes).unwrap();

        let label = format!("{sr} Hz, {ch} ch, {bits} bit, ms {stereo_ms}");
        assert!(decoded.checksum_ok, "{label}");
        assert_eq!(decoded.samples, samples, "{label}");
        assert_eq!(decoded.sample_rate, sr);
        assert_eq!(decoded.channels, ch);
        assert_eq!(decoded.bits_per_sample, bits);
    }
}

#[test]
fn test_empty_input() {
    let bytes = Encoder::new(44100, 2, 16).encode(&[], b"meta").unwrap();
    assert_eq!(bytes.len(), MAGIC.len() + HEADER_SIZE + 4);

    let decoded = Decoder::new().decode(&bytes).unwrap();
    assert!(decoded.samples.is_empty());
    assert!(decoded.checksum_ok);
    assert_eq!(decoded.metadata, b"meta");
    assert!(Reader::new().scan_frames(&bytes).unwrap().is_empty());
}

#[test]
fn test_single_sample() {
    let bytes = Encoder::new(44100, 2, 16).encode(&[-32768, 32767], &[]).unwrap();
    let decoded = Decoder::new().decode(&bytes).unwrap();
    assert_eq!(decoded.samples, vec![-32768, 32767]);
    assert!(decoded.checksum_ok);
}

#[test]
fn test_full_scale_square_wave() {
    let samples: Vec<i32> = (0..6000)
        .map(|i| if (i / 20) % 2 == 0 { 32767 } else { -32768 })
        .collect();
    let bytes = Encoder::new(8000, 1, 16)
        .with_config(quick_config())
        .encode(&samples, &[])
        .unwrap();
    assert_eq!(Decoder::new().decode(&bytes).unwrap().samples, samples);
}

#[test]
fn test_tone_compresses() {
    let samples = music(1, 16000, 2, 16);
    let bytes = Encoder::new(16000, 2, 16)
        .with_config(quick_config())
        .encode(&samples, &[])
        .unwrap();
    let info = Reader::new().read_info(&bytes).unwrap();
    assert!(info.compression_ratio() > 1.5, "ratio {}", info.compression_ratio());
    assert!(info.bits_per_sample() < 11.0);
}

// ============================================================================
// Container Tests
// ============================================================================

#[test]
fn test_header_fields() {
    let samples = music(2, 10000, 2, 16);
    let config = CoderConfig {
        stereo_ms: true,
        ..quick_config()
    };
    let bytes = Encoder::new(8000, 2, 16)
        .with_config(config)
        .encode(&samples, b"abc")
        .unwrap();
    assert_eq!(&bytes[..4], b"SAC!");

    let file = Reader::new().read(&bytes).unwrap();
    let h = &file.header;
    assert_eq!(h.sample_rate, 8000);
    assert_eq!(h.channels, 2);
    assert_eq!(h.bits_per_sample, 16);
    assert_eq!(h.num_samples, 10000);
    assert_eq!(h.frame_len, 8000);
    assert_eq!(h.num_frames(), 2);
    assert_eq!(h.flags & HEADER_FLAG_MID_SIDE, HEADER_FLAG_MID_SIDE);
    assert_eq!(h.flags & HEADER_FLAG_OPTIMIZED, 0);
    assert_eq!(h.meta_size, 3);
    assert_eq!(file.metadata, b"abc");
    assert_eq!(h.checksum, checksum::compute(&samples));
}

#[test]
fn test_frame_length_clamps_to_input() {
    let samples = music(3, 1234, 1, 16);
    let bytes = Encoder::new(44100, 1, 16).encode(&samples, &[]).unwrap();
    let header = Reader::new().read(&bytes).unwrap().header;
    assert_eq!(header.frame_len, 1234);
    assert_eq!(header.num_frames(), 1);
}

#[test]
fn test_scan_frames() {
    let samples = music(4, 8000 * 5 / 2, 2, 16);
    let config = CoderConfig {
        stereo_ms: true,
        ..quick_config()
    };
    let bytes = Encoder::new(8000, 2, 16)
        .with_config(config)
        .encode(&samples, b"xyz")
        .unwrap();

    let frames = Reader::new().scan_frames(&bytes).unwrap();
    assert_eq!(frames.len(), 3);
    assert_eq!(
        frames.iter().map(|f| f.num_samples).collect::<Vec<_>>(),
        vec![8000, 8000, 4000]
    );
    for (i, f) in frames.iter().enumerate() {
        assert_eq!(f.index, i);
        assert_eq!(f.blocks.len(), 2);
        assert!(f.blocks.iter().all(|b| b.mid_side));
        assert!(f.blocks.iter().all(|b| b.minval <= b.maxval));
    }

    let file = Reader::new().read(&bytes).unwrap();
    let total: usize = frames.iter().map(|f| f.total_bytes()).sum();
    assert_eq!(total, file.frames.len());
}

#[test]
fn test_metadata_block_roundtrip() {
    let config = quick_config();
    let mut meta = StreamMetadata::new().with_config(&config);
    meta.tags.push(("title".into(), "Test".into()));
    let packed = meta.to_msgpack().unwrap();

    let samples = music(5, 3000, 1, 16);
    let bytes = Encoder::new(8000, 1, 16)
        .with_config(config)
        .encode(&samples, &packed)
        .unwrap();

    let info = Reader::new().read_info(&bytes).unwrap();
    let parsed = StreamMetadata::parse_lenient(&info.metadata).unwrap();
    assert_eq!(parsed, meta);
    assert!(parsed.encoder.starts_with("libsac"));

    assert!(StreamMetadata::parse_lenient(b"\xc1 not msgpack").is_none());
    assert!(StreamMetadata::parse_lenient(&[]).is_none());
}

// ============================================================================
// Parameter Validation Tests
// ============================================================================

#[test]
fn test_unsupported_inputs() {
    let cases = [(44100, 3, 16), (44100, 0, 16), (44100, 2, 24), (44100, 1, 0), (0, 1, 16)];
    for (sr, ch, bits) in cases {
        let err = Encoder::new(sr, ch, bits).encode(&[], &[]).unwrap_err();
        assert!(matches!(err, SacError::Unsupported(_)), "{sr} {ch} {bits}: {err}");
    }
}

#[test]
fn test_sample_outside_bit_width() {
    let err = Encoder::new(8000, 1, 8).encode(&[0, 127, 128], &[]).unwrap_err();
    assert!(matches!(err, SacError::Unsupported(_)));
    let err = Encoder::new(8000, 1, 8).encode(&[-129], &[]).unwrap_err();
    assert!(matches!(err, SacError::Unsupported(_)));
}

#[test]
fn test_odd_interleaved_length() {
    let err = Encoder::new(8000, 2, 16).encode(&[1, 2, 3], &[]).unwrap_err();
    assert!(matches!(err, SacError::Unsupported(_)));
}

#[test]
fn test_frame_length_limit() {
    let config = CoderConfig {
        frame_secs: 60,
        ..CoderConfig::default()
    };
    let err = Encoder::new(384_000, 1, 16)
        .with_config(config)
        .encode(&[0; 16], &[])
        .unwrap_err();
    assert!(matches!(err, SacError::Config(_)));
}

#[test]
fn test_config_errors_before_encoding() {
    assert!(matches!(
        OptimizeConfig::parse_spec("0.2,100,zstd"),
        Err(SacError::Config(_))
    ));
    assert!(matches!(
        CoderConfig::from_json(r#"{"optimize": {"cost": "zstd"}}"#),
        Err(SacError::Config(_))
    ));
    assert!(matches!(
        CoderConfig::from_json(r#"{"frame_secs": 0}"#),
        Err(SacError::Config(_))
    ));

    let bad = CoderConfig {
        optimize: OptimizeConfig {
            enabled: true,
            max_evals: 0,
            ..OptimizeConfig::default()
        },
        ..CoderConfig::default()
    };
    let err = Encoder::new(8000, 1, 16)
        .with_config(bad)
        .encode(&[1, 2, 3], &[])
        .unwrap_err();
    assert!(matches!(err, SacError::Config(_)));
}

#[test]
fn test_config_json_roundtrip() {
    let mut config = CoderConfig::preset(Preset::VeryHigh);
    config.optimize.cost = CostKind::Golomb;
    config.stereo_ms = true;
    let json = config.to_json().unwrap();
    assert_eq!(CoderConfig::from_json(&json).unwrap(), config);

    // missing fields take their defaults
    let partial = CoderConfig::from_json(r#"{"stereo_ms": true}"#).unwrap();
    assert!(partial.stereo_ms);
    assert_eq!(partial.frame_secs, CoderConfig::default().frame_secs);
}

// ============================================================================
// Coefficient Search Tests
// ============================================================================

#[test]
fn test_search_is_deterministic_across_threading() {
    let samples = music(6, 12000, 2, 16);
    let encode = |config: CoderConfig| {
        Encoder::new(8000, 2, 16)
            .with_config(config)
            .encode(&samples, b"m")
            .unwrap()
    };

    let serial = encode(search_config(MtMode::Off, 0));
    assert_eq!(serial, encode(search_config(MtMode::Channels, 0)));
    assert_eq!(serial, encode(search_config(MtMode::Full, 2)));
    assert_eq!(serial, encode(search_config(MtMode::Off, 0)));

    let header = Reader::new().read(&serial).unwrap().header;
    assert_eq!(header.flags & HEADER_FLAG_OPTIMIZED, HEADER_FLAG_OPTIMIZED);

    let decoded = Decoder::new()
        .with_mt_mode(MtMode::Full)
        .with_threads(2)
        .decode(&serial)
        .unwrap();
    assert!(decoded.checksum_ok);
    assert_eq!(decoded.samples, samples);
}

#[test]
fn test_every_cost_function_roundtrips() {
    let samples = music(7, 6000, 1, 16);
    for cost in [
        CostKind::L1,
        CostKind::Rms,
        CostKind::Golomb,
        CostKind::Entropy,
        CostKind::Bitplane,
    ] {
        let mut config = search_config(MtMode::Off, 0);
        config.optimize.cost = cost;
        config.optimize.max_evals = 3;
        config.optimize.reset_profile = cost == CostKind::Rms;
        let bytes = Encoder::new(8000, 1, 16)
            .with_config(config)
            .encode(&samples, &[])
            .unwrap();
        let decoded = Decoder::new().decode(&bytes).unwrap();
        assert!(decoded.checksum_ok, "{cost}");
        assert_eq!(decoded.samples, samples, "{cost}");
    }
}

#[test]
fn test_preset_sets_search() {
    let encoder = Encoder::new(8000, 1, 16).with_preset(Preset::High);
    assert!(encoder.config().optimize.enabled);
    assert_eq!(encoder.config().optimize.max_evals, 100);
}

// ============================================================================
// Source And Progress Tests
// ============================================================================

#[test]
fn test_progress_reports_every_frame() {
    let samples = music(8, 20000, 1, 16);
    let mut source = PcmSource::new(&samples, 1).unwrap();
    let mut seen = Vec::new();
    let (bytes, report) = Encoder::new(8000, 1, 16)
        .with_config(quick_config())
        .encode_source(&mut source, 20000, &[], &mut |p| seen.push(p))
        .unwrap();

    assert_eq!(report.frames, 3);
    assert_eq!(report.bytes, bytes.len());
    assert_eq!(seen.len(), 3);
    assert_eq!(
        seen.iter().map(|p| p.samples_done).collect::<Vec<_>>(),
        vec![8000, 16000, 20000]
    );
    assert_eq!(seen[2].fraction(), 1.0);
    assert_eq!(seen[0].frame, 1);
}

#[test]
fn test_short_source_is_an_error() {
    let samples = music(9, 1000, 1, 16);
    let mut source = PcmSource::new(&samples, 1).unwrap();
    let err = Encoder::new(8000, 1, 16)
        .encode_source(&mut source, 1500, &[], &mut |_| {})
        .unwrap_err();
    assert!(matches!(err, SacError::Format(_)));
}

/// source producing a ramp without any backing buffer
struct Ramp {
    left: usize,
    next: i32,
}

impl SampleSource for Ramp {
    fn read_samples(&mut self, buffers: &mut [Vec<i32>], max_samples: usize) -> SacResult<usize> {
        let n = self.left.min(max_samples);
        for i in 0..n {
            let v = (self.next + i as i32) % 1000;
            buffers[0][i] = v;
            buffers[1][i] = -v;
        }
        self.next += n as i32;
        self.left -= n;
        Ok(n)
    }
}

#[test]
fn test_custom_sample_source() {
    let mut source = Ramp { left: 9000, next: 0 };
    let (bytes, _) = Encoder::new(8000, 2, 16)
        .with_config(quick_config())
        .encode_source(&mut source, 9000, &[], &mut |_| {})
        .unwrap();

    let decoded = Decoder::new().decode(&bytes).unwrap();
    assert!(decoded.checksum_ok);
    assert_eq!(decoded.samples.len(), 18000);
    assert_eq!(&decoded.samples[2000..2004], &[0, 0, 1, -1]);
}

// ============================================================================
// Damaged Stream Tests
// ============================================================================

#[test]
fn test_checksum_mismatch_is_reported() {
    let samples = music(10, 4000, 1, 16);
    let mut bytes = Encoder::new(8000, 1, 16).encode(&samples, &[]).unwrap();
    bytes[MAGIC.len() + 22] ^= 0xFF;

    let decoded = Decoder::new().decode(&bytes).unwrap();
    assert!(!decoded.checksum_ok);
    assert_eq!(decoded.samples, samples);
}

#[test]
fn test_truncated_stream() {
    let samples = music(11, 4000, 2, 16);
    let bytes = Encoder::new(8000, 2, 16).encode(&samples, &[]).unwrap();

    for cut in [3, 20, MAGIC.len() + HEADER_SIZE + 10, bytes.len() - 1] {
        let err = Decoder::new().decode(&bytes[..cut]).unwrap_err();
        assert!(matches!(err, SacError::Format(_)), "cut at {cut}: {err}");
    }
}

#[test]
fn test_header_sanity_checks() {
    let bytes = Encoder::new(8000, 1, 16).encode(&[1, 2, 3], &[]).unwrap();
    let at = MAGIC.len();

    let mut bad_version = bytes.clone();
    bad_version[at] = 9;
    let mut bad_channels = bytes.clone();
    bad_channels[at + 8] = 5;
    let mut bad_bits = bytes.clone();
    bad_bits[at + 9] = 17;
    let mut bad_frame_len = bytes.clone();
    bad_frame_len[at + 18..at + 22].copy_from_slice(&0u32.to_le_bytes());

    for data in [bad_version, bad_channels, bad_bits, bad_frame_len] {
        assert!(matches!(Reader::new().read(&data), Err(SacError::Format(_))));
    }
}

#[test]
fn test_header_overclaiming_samples() {
    let samples = music(12, 3000, 1, 16);
    let mut bytes = Encoder::new(8000, 1, 16).encode(&samples, &[]).unwrap();
    // one frame of 3000 samples, header now claims 2000
    bytes[MAGIC.len() + 10..MAGIC.len() + 18].copy_from_slice(&2000u64.to_le_bytes());
    assert!(matches!(
        Decoder::new().decode(&bytes),
        Err(SacError::Format(_))
    ));
}

#[test]
fn test_corrupted_payload_never_panics() {
    let samples = music(13, 3000, 2, 16);
    let clean = Encoder::new(8000, 2, 16).encode(&samples, &[]).unwrap();
    let frames_at = MAGIC.len() + HEADER_SIZE;

    let mut rng = ChaCha8Rng::seed_from_u64(99);
    for _ in 0..40 {
        let mut bytes = clean.clone();
        let pos = rng.gen_range(frames_at..bytes.len());
        bytes[pos] ^= rng.gen_range(1..=255u8);

        if let Ok(decoded) = Decoder::new().with_mt_mode(MtMode::Off).decode(&bytes) {
            assert_eq!(decoded.samples.len(), samples.len());
            if decoded.samples != samples {
                assert!(!decoded.checksum_ok);
            }
        }
    }
}
