//! Range coder, bit model and bitplane coder tests

use libsac::core::bits::{bit_length, s2u, u2s};
use libsac::entropy::{
    BitModel, BitplaneCoder, MapCoder, RangeDecoder, RangeEncoder, PROB_SCALE,
};
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;

fn biased_bits(seed: u64, n: usize, p_one: f64) -> Vec<bool> {
    let mut rng = ChaCha8Rng::seed_from_u64(seed);
    (0..n).map(|_| rng.gen::<f64>() < p_one).collect()
}

// ============================================================================
// Range Coder Tests
// ============================================================================

#[test]
fn test_fixed_probability_roundtrip() {
    let bits = biased_bits(1, 4000, 0.3);
    let probs = [PROB_SCALE / 2, PROB_SCALE / 5, 40, PROB_SCALE - 40];

    let mut enc = RangeEncoder::new(Vec::new());
    for (i, &b) in bits.iter().enumerate() {
        enc.encode_bit(probs[i % probs.len()], b);
    }
    assert_eq!(enc.bits_coded(), bits.len() as u64);
    let bytes = enc.finish();

    let mut dec = RangeDecoder::new(&bytes);
    for (i, &b) in bits.iter().enumerate() {
        assert_eq!(dec.decode_bit(probs[i % probs.len()]), b, "bit {i}");
    }
}

#[test]
fn test_same_sequence_gives_same_bytes() {
    let mut rng = ChaCha8Rng::seed_from_u64(5);
    let pairs: Vec<(u32, bool)> = (0..6000)
        .map(|_| (rng.gen_range(1..PROB_SCALE), rng.gen::<bool>()))
        .collect();
    let run = || {
        let mut enc = RangeEncoder::new(Vec::new());
        for &(p1, bit) in &pairs {
            enc.encode_bit(p1, bit);
        }
        enc.finish()
    };
    let (first, second) = (run(), run());
    assert_eq!(first, second);

    let mut dec = RangeDecoder::new(&first);
    for (i, &(p1, bit)) in pairs.iter().enumerate() {
        assert_eq!(dec.decode_bit(p1), bit, "bit {i}");
    }
}

#[test]
fn test_empty_segment_writes_nothing() {
    let enc = RangeEncoder::new(Vec::new());
    assert!(enc.finish().is_empty());

    // an empty segment still decodes, reading zeros past the end
    let mut dec = RangeDecoder::new(&[]);
    let _ = dec.decode_bit(PROB_SCALE / 2);
    assert_eq!(dec.position(), 0);
}

#[test]
fn test_encoder_appends_to_existing_buffer() {
    let enc = {
        let mut enc = RangeEncoder::new(vec![0xAA, 0xBB]);
        enc.encode_bit(PROB_SCALE / 2, true);
        enc
    };
    let out = enc.finish();
    assert_eq!(&out[..2], &[0xAA, 0xBB]);
    assert!(out.len() > 2);

    let mut dec = RangeDecoder::new(&out[2..]);
    assert!(dec.decode_bit(PROB_SCALE / 2));
}

#[test]
#[should_panic]
fn test_probability_outside_scale_panics() {
    let mut enc = RangeEncoder::new(Vec::new());
    enc.encode_bit(PROB_SCALE, true);
}

// ============================================================================
// Bit Model Tests
// ============================================================================

#[test]
fn test_adaptive_model_compresses_skewed_bits() {
    let bits = biased_bits(2, 10_000, 0.05);

    let mut model = BitModel::default();
    let mut enc = RangeEncoder::new(Vec::new());
    for &b in &bits {
        model.encode(&mut enc, b, 5);
    }
    let bytes = enc.finish();
    // order-0 entropy of p = 0.05 is about 0.29 bits
    assert!(bytes.len() < 500, "{} bytes for 10000 skewed bits", bytes.len());

    let mut model = BitModel::default();
    let mut dec = RangeDecoder::new(&bytes);
    for &b in &bits {
        assert_eq!(model.decode(&mut dec, 5), b);
    }
}

#[test]
fn test_model_probability_stays_codable() {
    let mut model = BitModel::default();
    for _ in 0..10_000 {
        model.update(true, 7);
    }
    assert!(model.p1() < PROB_SCALE);
    for _ in 0..10_000 {
        model.update(false, 7);
    }
    assert!(model.p1() > 0);
}

// ============================================================================
// Bitplane Coder Tests
// ============================================================================

fn laplacian_residuals(seed: u64, n: usize, scale: f64) -> Vec<u32> {
    let mut rng = ChaCha8Rng::seed_from_u64(seed);
    (0..n)
        .map(|_| {
            let u: f64 = rng.gen_range(1e-9..1.0);
            let mag = (-u.ln() * scale) as i32;
            let v = if rng.gen::<bool>() { mag } else { -mag };
            s2u(v)
        })
        .collect()
}

#[test]
fn test_bitplane_roundtrip() {
    let values = laplacian_residuals(3, 5000, 40.0);
    let maxbpn = values.iter().copied().max().map_or(0, bit_length);

    let mut enc = RangeEncoder::new(Vec::new());
    BitplaneCoder::new(maxbpn).encode(&mut enc, &values);
    let bytes = enc.finish();

    let mut decoded = vec![0u32; values.len()];
    let mut dec = RangeDecoder::new(&bytes);
    BitplaneCoder::new(maxbpn).decode(&mut dec, &mut decoded);
    assert_eq!(decoded, values);

    // well below the raw width of maxbpn bits per value
    assert!(bytes.len() * 8 < values.len() * maxbpn as usize);
}

#[test]
fn test_bitplane_zero_width_codes_nothing() {
    let values = vec![0u32; 1000];
    let mut enc = RangeEncoder::new(Vec::new());
    let mut coder = BitplaneCoder::new(0);
    assert_eq!(coder.maxbpn(), 0);
    coder.encode(&mut enc, &values);
    assert!(enc.finish().is_empty());

    let mut out = vec![7u32; 10];
    BitplaneCoder::new(0).decode(&mut RangeDecoder::new(&[]), &mut out);
    assert!(out.iter().all(|&v| v == 0));
}

#[test]
fn test_bitplane_full_width_values() {
    let values: Vec<u32> = vec![u32::MAX, 0, 1, u32::MAX - 1, 1 << 31];
    let mut enc = RangeEncoder::new(Vec::new());
    BitplaneCoder::new(32).encode(&mut enc, &values);
    let bytes = enc.finish();

    let mut decoded = vec![0u32; values.len()];
    BitplaneCoder::new(32).decode(&mut RangeDecoder::new(&bytes), &mut decoded);
    assert_eq!(decoded, values);
}

#[test]
fn test_zigzag_mapping_inverts() {
    for v in [0, 1, -1, 2, -2, 12345, -12345, i32::MAX, i32::MIN] {
        assert_eq!(u2s(s2u(v)), v);
    }
    assert_eq!(s2u(0), 0);
    assert_eq!(s2u(-1), 1);
    assert_eq!(s2u(1), 2);
}

// ============================================================================
// Map Coder Tests
// ============================================================================

#[test]
fn test_map_coder_shares_stream_with_bitplanes() {
    let used: Vec<bool> = (0..3000).map(|i| i % 16 == 0 || i % 16 == 1).collect();
    let values = laplacian_residuals(4, 800, 3.0);
    let maxbpn = values.iter().copied().max().map_or(0, bit_length);

    let mut enc = RangeEncoder::new(Vec::new());
    MapCoder::new().encode(&mut enc, &used);
    BitplaneCoder::new(maxbpn).encode(&mut enc, &values);
    let bytes = enc.finish();

    let mut dec = RangeDecoder::new(&bytes);
    assert_eq!(MapCoder::new().decode(&mut dec, used.len()), used);
    let mut decoded = vec![0u32; values.len()];
    BitplaneCoder::new(maxbpn).decode(&mut dec, &mut decoded);
    assert_eq!(decoded, values);
}

#[test]
fn test_periodic_bitmap_is_cheap() {
    let used: Vec<bool> = (0..1 << 16).map(|i| i % 4 == 0).collect();
    let mut enc = RangeEncoder::new(Vec::new());
    MapCoder::default().encode(&mut enc, &used);
    let bytes = enc.finish();
    // the order-3 context sees the period
    assert!(bytes.len() < used.len() / 64, "{} bytes", bytes.len());
}
