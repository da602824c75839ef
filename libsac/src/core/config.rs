//! encoder and decoder configuration
//!
//! Everything here is plain data; the frame coder only reads it. All
//! types round-trip through serde so a configuration can be stored in
//! the stream metadata or loaded from JSON.

use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::core::{SacError, SacResult};
use crate::lossless::{CostKind, DdsSchedule};

/// default max frame length in seconds
pub const DEFAULT_FRAME_SECS: u32 = 8;

/// upper bound for the frame length in seconds
pub const MAX_FRAME_SECS: u32 = 60;

/// cost ratio (normal / remapped) above which the remap encode is tried
pub const REMAP_ATTEMPT_RATIO: f64 = 1.05;

/// seed for the coefficient search, mixed with the frame index
pub const DEFAULT_SEARCH_SEED: u64 = 0x05AC_0DD5;

/// how much per-channel work fans out to worker threads
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MtMode {
    /// everything on the calling thread
    Off,
    /// channel encode/decode in parallel
    #[default]
    Channels,
    /// channel encode/decode and optimizer cost evaluation in parallel
    Full,
}

impl MtMode {
    /// map the numeric command line level (0, 1, 2+)
    pub fn from_level(level: u8) -> Self {
        match level {
            0 => MtMode::Off,
            1 => MtMode::Channels,
            _ => MtMode::Full,
        }
    }

    pub fn parallel_channels(self) -> bool {
        self != MtMode::Off
    }

    pub fn parallel_costs(self) -> bool {
        self == MtMode::Full
    }
}

/// coefficient search strategy
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SearchMethod {
    /// dynamically dimensioned search
    #[default]
    Dds,
}

impl FromStr for SearchMethod {
    type Err = SacError;

    fn from_str(s: &str) -> SacResult<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "dds" => Ok(SearchMethod::Dds),
            other => Err(SacError::Config(format!("unknown search method '{other}'"))),
        }
    }
}

/// named effort levels
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Preset {
    Normal,
    High,
    VeryHigh,
    Best,
    Insane,
}

impl Preset {
    /// 0 = normal ... 4 = insane, anything above clamps to insane
    pub fn from_level(level: u8) -> Self {
        match level {
            0 => Preset::Normal,
            1 => Preset::High,
            2 => Preset::VeryHigh,
            3 => Preset::Best,
            _ => Preset::Insane,
        }
    }
}

impl FromStr for Preset {
    type Err = SacError;

    fn from_str(s: &str) -> SacResult<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "normal" => Ok(Preset::Normal),
            "high" => Ok(Preset::High),
            "veryhigh" => Ok(Preset::VeryHigh),
            "best" => Ok(Preset::Best),
            "insane" => Ok(Preset::Insane),
            other => Err(SacError::Config(format!("unknown preset '{other}'"))),
        }
    }
}

/// per-frame coefficient search settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OptimizeConfig {
    pub enabled: bool,
    /// window length as a fraction of the max frame length
    pub fraction: f64,
    /// cost evaluations per frame
    pub max_evals: usize,
    pub cost: CostKind,
    pub search: SearchMethod,
    /// start every frame from the baseline profile instead of the last result
    pub reset_profile: bool,
    pub seed: u64,
    pub schedule: DdsSchedule,
}

impl Default for OptimizeConfig {
    fn default() -> Self {
        OptimizeConfig {
            enabled: false,
            fraction: 0.075,
            max_evals: 100,
            cost: CostKind::default(),
            search: SearchMethod::default(),
            reset_profile: false,
            seed: DEFAULT_SEARCH_SEED,
            schedule: DdsSchedule::default(),
        }
    }
}

impl OptimizeConfig {
    /// parse `frac,n[,cost]` or `no`
    pub fn parse_spec(spec: &str) -> SacResult<Self> {
        let spec = spec.trim();
        if spec.eq_ignore_ascii_case("no") {
            return Ok(OptimizeConfig::default());
        }

        let parts: Vec<&str> = spec.split(',').map(str::trim).collect();
        if parts.len() < 2 || parts.len() > 3 {
            return Err(SacError::Config(format!(
                "optimize expects 'frac,n[,cost]', got '{spec}'"
            )));
        }

        let fraction: f64 = parts[0]
            .parse()
            .map_err(|_| SacError::Config(format!("bad optimize fraction '{}'", parts[0])))?;
        let max_evals: usize = parts[1]
            .parse()
            .map_err(|_| SacError::Config(format!("bad optimize budget '{}'", parts[1])))?;
        let cost = match parts.get(2) {
            Some(name) => name.parse()?,
            None => CostKind::default(),
        };

        let cfg = OptimizeConfig {
            enabled: true,
            fraction,
            max_evals,
            cost,
            ..OptimizeConfig::default()
        };
        cfg.validate()?;
        Ok(cfg)
    }

    pub fn validate(&self) -> SacResult<()> {
        if !self.enabled {
            return Ok(());
        }
        if !(self.fraction > 0.0 && self.fraction <= 1.0) {
            return Err(SacError::Config(format!(
                "optimize fraction must be in (0, 1], got {}",
                self.fraction
            )));
        }
        if self.max_evals == 0 {
            return Err(SacError::Config(
                "optimize budget must be at least one evaluation".to_string(),
            ));
        }
        self.schedule.validate()
    }
}

/// full coder configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CoderConfig {
    /// max frame length in seconds
    pub frame_secs: u32,
    pub optimize: OptimizeConfig,
    /// try the sparse value remap per channel
    pub sparse_pcm: bool,
    pub remap_ratio: f64,
    /// remove the per-frame dc offset before prediction
    pub zero_mean: bool,
    /// mid/side decorrelation for stereo frames
    pub stereo_ms: bool,
    pub mt_mode: MtMode,
    /// worker threads, 0 uses the global rayon pool
    pub threads: usize,
    /// diagnostic detail, never changes the output
    pub verbose: u8,
}

impl Default for CoderConfig {
    fn default() -> Self {
        CoderConfig {
            frame_secs: DEFAULT_FRAME_SECS,
            optimize: OptimizeConfig::default(),
            sparse_pcm: true,
            remap_ratio: REMAP_ATTEMPT_RATIO,
            zero_mean: true,
            stereo_ms: false,
            mt_mode: MtMode::default(),
            threads: 0,
            verbose: 0,
        }
    }
}

impl CoderConfig {
    pub fn preset(preset: Preset) -> Self {
        let mut cfg = CoderConfig::default();
        cfg.apply_preset(preset);
        cfg
    }

    /// overwrite the optimizer effort with a preset, keeping the rest
    pub fn apply_preset(&mut self, preset: Preset) {
        let (enabled, fraction, max_evals) = match preset {
            Preset::Normal => (false, 0.075, 100),
            Preset::High => (true, 0.075, 100),
            Preset::VeryHigh => (true, 0.20, 250),
            Preset::Best => (true, 0.50, 1000),
            Preset::Insane => (true, 0.75, 1500),
        };
        self.optimize.enabled = enabled;
        self.optimize.fraction = fraction;
        self.optimize.max_evals = max_evals;
    }

    /// max samples per frame for a given sample rate
    pub fn frame_len(&self, sample_rate: u32) -> usize {
        (self.frame_secs as usize).saturating_mul(sample_rate as usize)
    }

    pub fn validate(&self) -> SacResult<()> {
        if self.frame_secs == 0 || self.frame_secs > MAX_FRAME_SECS {
            return Err(SacError::Config(format!(
                "frame length must be 1..={MAX_FRAME_SECS} seconds, got {}",
                self.frame_secs
            )));
        }
        if !(self.remap_ratio.is_finite() && self.remap_ratio > 0.0) {
            return Err(SacError::Config(format!(
                "remap ratio must be positive, got {}",
                self.remap_ratio
            )));
        }
        self.optimize.validate()
    }

    pub fn from_json(json: &str) -> SacResult<Self> {
        let cfg: CoderConfig =
            serde_json::from_str(json).map_err(|e| SacError::Config(e.to_string()))?;
        cfg.validate()?;
        Ok(cfg)
    }

    pub fn to_json(&self) -> SacResult<String> {
        serde_json::to_string_pretty(self).map_err(|e| SacError::Config(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn presets_match_effort_table() {
        assert!(!CoderConfig::preset(Preset::Normal).optimize.enabled);
        let best = CoderConfig::preset(Preset::Best);
        assert!(best.optimize.enabled);
        assert_eq!(best.optimize.max_evals, 1000);
        assert_eq!(best.optimize.fraction, 0.5);
    }

    #[test]
    fn parse_optimize_spec() {
        let cfg = OptimizeConfig::parse_spec("0.2,250,bpn").unwrap();
        assert!(cfg.enabled);
        assert_eq!(cfg.max_evals, 250);
        assert_eq!(cfg.cost, CostKind::Bitplane);

        assert!(!OptimizeConfig::parse_spec("no").unwrap().enabled);
        assert!(OptimizeConfig::parse_spec("0.2").is_err());
        assert!(OptimizeConfig::parse_spec("1.5,10").is_err());
    }
}
