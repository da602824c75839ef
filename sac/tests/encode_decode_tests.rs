use sac::audio::{read_audio_from_bytes, write_wav_to_bytes, SourceAudio};
use sac::{
    decode_to_samples, decode_to_wav, encode_from_audio, encode_from_samples, get_metadata,
    get_sac_info, list_frames, validate_sac, CoderConfig, EncodeOptions, MtMode, Preset,
};

fn tone(frames: usize, channels: usize, amp: f64) -> Vec<i32> {
    let mut samples = Vec::with_capacity(frames * channels);
    for i in 0..frames {
        let t = i as f64 / 8000.0;
        for ch in 0..channels {
            let freq = 440.0 * (ch + 1) as f64;
            samples.push(((t * freq * std::f64::consts::TAU).sin() * amp).round() as i32);
        }
    }
    samples
}

fn short_frames() -> EncodeOptions {
    EncodeOptions::default().with_config(CoderConfig {
        frame_secs: 1,
        ..CoderConfig::default()
    })
}

// ============================================================================
// WAV Round Trip Tests
// ============================================================================

#[test]
fn test_wav_encode_decode_round_trip() {
    let samples = tone(12000, 2, 12000.0);
    let wav = write_wav_to_bytes(&samples, 8000, 2, 16).unwrap();

    let sac_bytes = encode_from_audio(&wav, &short_frames()).unwrap();
    assert!(sac_bytes.len() < wav.len());

    let decoded = decode_to_samples(&sac_bytes, MtMode::Channels, 0).unwrap();
    assert!(decoded.checksum_ok);
    assert_eq!(decoded.sample_rate, 8000);
    assert_eq!(decoded.channels, 2);
    assert_eq!(decoded.bits_per_sample, 16);
    assert_eq!(decoded.samples, samples);

    // the decoded WAV is byte identical to the source
    assert_eq!(decode_to_wav(&sac_bytes).unwrap(), wav);
}

#[test]
fn test_eight_bit_wav() {
    let samples = tone(4000, 1, 100.0);
    let wav = write_wav_to_bytes(&samples, 8000, 1, 8).unwrap();

    let source = read_audio_from_bytes(&wav).unwrap();
    assert_eq!(source.bits_per_sample, 8);
    assert_eq!(source.samples, samples);

    let sac_bytes = encode_from_audio(&wav, &short_frames()).unwrap();
    let info = get_sac_info(&sac_bytes).unwrap();
    assert_eq!(info.bits_per_sample, 8);
    assert_eq!(decode_to_wav(&sac_bytes).unwrap(), wav);
}

#[test]
fn test_wav_writer_rejects_wide_samples() {
    assert!(write_wav_to_bytes(&[0], 8000, 1, 24).is_err());
    assert!(write_wav_to_bytes(&[0], 8000, 1, 0).is_err());
}

// ============================================================================
// Info And Metadata Tests
// ============================================================================

#[test]
fn test_info_and_frame_listing() {
    let source = SourceAudio {
        samples: tone(20000, 2, 8000.0),
        sample_rate: 8000,
        channels: 2,
        bits_per_sample: 16,
        source_format: Some("WAV".to_string()),
        tags: vec![("artist".to_string(), "Nobody".to_string())],
    };
    let options = short_frames().with_tag("title", "Two Tones");
    let mut calls = 0;
    let (sac_bytes, report) = encode_from_samples(&source, &options, &mut |_| calls += 1).unwrap();
    assert_eq!(calls, 3);
    assert_eq!(report.frames, 3);

    let info = get_sac_info(&sac_bytes).unwrap();
    assert_eq!(info.version, "1.0");
    assert_eq!(info.num_samples, 20000);
    assert_eq!(info.num_frames, 3);
    assert_eq!(info.frame_len, 8000);
    assert!((info.duration_secs - 2.5).abs() < 1e-9);
    assert!(info.compression_ratio > 1.0);
    assert!(!info.optimized);

    let meta = info.metadata.unwrap();
    assert_eq!(meta.source_format.as_deref(), Some("WAV"));
    assert!(meta.encoded_at.is_some());
    assert!(meta.tags.contains(&("artist".to_string(), "Nobody".to_string())));
    assert!(meta.tags.contains(&("title".to_string(), "Two Tones".to_string())));
    assert_eq!(meta.config.unwrap().frame_secs, 1);

    let frames = list_frames(&sac_bytes).unwrap();
    assert_eq!(frames.len(), 3);
    assert_eq!(frames[2].num_samples, 4000);

    let again = get_metadata(&sac_bytes).unwrap().unwrap();
    assert_eq!(again.tags.len(), 2);

    // json output used by `sac list --json`
    let json = serde_json::to_value(get_sac_info(&sac_bytes).unwrap()).unwrap();
    assert_eq!(json["sample_rate"], 8000);
}

#[test]
fn test_preset_is_recorded() {
    let samples = tone(4000, 1, 5000.0);
    let wav = write_wav_to_bytes(&samples, 8000, 1, 16).unwrap();

    let mut options = EncodeOptions::preset(Preset::High);
    options.config.optimize.max_evals = 4;
    let sac_bytes = encode_from_audio(&wav, &options).unwrap();

    let info = get_sac_info(&sac_bytes).unwrap();
    assert!(info.optimized);
    assert!(validate_sac(&sac_bytes).unwrap());
}

// ============================================================================
// Error Tests
// ============================================================================

#[test]
fn test_invalid_input_is_rejected() {
    assert!(encode_from_audio(b"definitely not audio", &EncodeOptions::default()).is_err());
    assert!(decode_to_samples(b"SAC!", MtMode::Off, 0).is_err());
    assert!(get_sac_info(b"RIFF").is_err());
}

#[test]
fn test_damaged_checksum_fails_validation() {
    let wav = write_wav_to_bytes(&tone(3000, 1, 3000.0), 8000, 1, 16).unwrap();
    let mut sac_bytes = encode_from_audio(&wav, &EncodeOptions::default()).unwrap();
    sac_bytes[4 + 22] ^= 1;
    assert!(!validate_sac(&sac_bytes).unwrap());
}

#[test]
fn test_damaged_checksum_still_decodes() {
    let samples = tone(3000, 2, 3000.0);
    let wav = write_wav_to_bytes(&samples, 8000, 2, 16).unwrap();
    let mut sac_bytes = encode_from_audio(&wav, &EncodeOptions::default()).unwrap();
    sac_bytes[4 + 22 + 31] ^= 0x80;

    let decoded = decode_to_samples(&sac_bytes, MtMode::Off, 0).unwrap();
    assert!(!decoded.checksum_ok);
    assert_eq!(decoded.samples, samples);
    // best effort output is the untouched audio
    assert_eq!(decode_to_wav(&sac_bytes).unwrap(), wav);
}
