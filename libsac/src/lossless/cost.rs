//! Residual cost estimators used to score predictor coefficients.
//!
//! Lower is better. Every estimator takes a read-only view of the
//! residuals and returns 0 for an empty buffer.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::core::bits::{bit_length, s2u};
use crate::core::math::RunningAverage;
use crate::core::{SacError, SacResult};
use crate::entropy::{BitplaneCoder, RangeEncoder};

/// decay of the running mean that parameterizes the golomb estimate
const GOLOMB_ALPHA: f64 = 0.97;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CostKind {
    /// mean absolute residual
    L1,
    /// root mean square residual
    Rms,
    /// adaptive golomb code length, bytes per sample
    Golomb,
    /// order-0 entropy in bits
    #[default]
    Entropy,
    /// bytes produced by the bitplane coder
    Bitplane,
}

impl CostKind {
    pub fn calc(self, residuals: &[i32]) -> f64 {
        if residuals.is_empty() {
            return 0.0;
        }
        match self {
            CostKind::L1 => l1(residuals),
            CostKind::Rms => rms(residuals),
            CostKind::Golomb => golomb(residuals),
            CostKind::Entropy => entropy(residuals),
            CostKind::Bitplane => bitplane(residuals),
        }
    }

    /// short selector as used on the command line
    pub fn selector(self) -> &'static str {
        match self {
            CostKind::L1 => "l1",
            CostKind::Rms => "rms",
            CostKind::Golomb => "glb",
            CostKind::Entropy => "ent",
            CostKind::Bitplane => "bpn",
        }
    }
}

impl fmt::Display for CostKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.selector())
    }
}

impl FromStr for CostKind {
    type Err = SacError;

    fn from_str(s: &str) -> SacResult<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "l1" => Ok(CostKind::L1),
            "rms" => Ok(CostKind::Rms),
            "glb" | "golomb" => Ok(CostKind::Golomb),
            "ent" | "entropy" => Ok(CostKind::Entropy),
            "bpn" | "bitplane" => Ok(CostKind::Bitplane),
            other => Err(SacError::Config(format!("unknown cost function '{other}'"))),
        }
    }
}

fn l1(e: &[i32]) -> f64 {
    e.iter().map(|&v| (v as f64).abs()).sum::<f64>() / e.len() as f64
}

fn rms(e: &[i32]) -> f64 {
    let sum: f64 = e.iter().map(|&v| (v as f64) * (v as f64)).sum();
    (sum / e.len() as f64).sqrt()
}

fn golomb(e: &[i32]) -> f64 {
    let mut mean = RunningAverage::new(GOLOMB_ALPHA);
    let mut nbits = 0u64;
    for &v in e {
        let u = s2u(v);
        let m = (mean.sum as u32).max(1);
        nbits += (u / m) as u64 + 1;
        if m > 1 {
            nbits += bit_length(m - 1) as u64;
        }
        mean.update(u as f64);
    }
    nbits as f64 / (8.0 * e.len() as f64)
}

fn entropy(e: &[i32]) -> f64 {
    let mut sorted = e.to_vec();
    sorted.sort_unstable();
    let n = sorted.len() as f64;
    sorted
        .chunk_by(|a, b| a == b)
        .map(|run| {
            let c = run.len() as f64;
            c * (n / c).log2()
        })
        .sum()
}

fn bitplane(e: &[i32]) -> f64 {
    let values: Vec<u32> = e.iter().map(|&v| s2u(v)).collect();
    let maxbpn = values.iter().copied().max().map_or(0, bit_length);
    let mut enc = RangeEncoder::new(Vec::new());
    BitplaneCoder::new(maxbpn).encode(&mut enc, &values);
    enc.finish().len() as f64
}
