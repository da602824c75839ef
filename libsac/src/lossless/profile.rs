//! Predictor coefficient profile.
//!
//! The profile is the full set of real valued hyperparameters the
//! predictor ensemble is built from. It is written verbatim into every
//! frame as little-endian `f32`, in the order master group, slave group,
//! shared group, each group in field declaration order.

use serde::{Deserialize, Serialize};

use crate::core::{SacError, SacResult};

/// one tunable coefficient and its admissible range
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Coef {
    pub min: f32,
    pub max: f32,
    pub value: f32,
}

impl Coef {
    pub const fn new(min: f32, max: f32, value: f32) -> Self {
        Coef { min, max, value }
    }

    /// set from a search vector entry, kept inside the range
    pub fn set(&mut self, v: f64) {
        self.value = (v as f32).clamp(self.min, self.max);
    }
}

macro_rules! coef_group {
    (
        $(#[$meta:meta])*
        pub struct $name:ident {
            $( $(#[$fmeta:meta])* $field:ident : ($min:expr, $max:expr, $def:expr) ),* $(,)?
        }
    ) => {
        $(#[$meta])*
        #[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
        pub struct $name {
            $( $(#[$fmeta])* pub $field: Coef, )*
        }

        impl $name {
            /// field names in serialization order
            pub const NAMES: &'static [&'static str] = &[$( stringify!($field) ),*];
            pub const LEN: usize = Self::NAMES.len();

            pub fn baseline() -> Self {
                $name { $( $field: Coef::new($min, $max, $def), )* }
            }

            pub fn iter(&self) -> impl Iterator<Item = &Coef> + '_ {
                [$( &self.$field ),*].into_iter()
            }

            pub fn iter_mut(&mut self) -> impl Iterator<Item = &mut Coef> + '_ {
                [$( &mut self.$field ),*].into_iter()
            }
        }
    };
}

coef_group! {
    /// coefficients derived separately for the master and the slave channel
    pub struct ChannelCoefs {
        /// ols covariance leakage
        lambda: (0.99, 0.9999, 0.998),
        /// ols ridge regularization
        ols_nu: (0.0001, 10.0, 0.001),
        mu_0: (0.0001, 0.02, 0.002),
        mu_1: (0.0001, 0.02, 0.001),
        mu_2: (0.0001, 0.02, 0.001),
        mu_3: (0.0001, 0.02, 0.0005),
        mu_decay_0: (0.99, 1.0, 0.998),
        mu_decay_1: (0.95, 1.0, 0.99),
        mu_decay_2: (0.95, 1.0, 0.99),
        mu_decay_3: (0.95, 1.0, 0.99),
        pow_decay_0: (0.9, 0.9999, 0.998),
        pow_decay_1: (0.9, 0.9999, 0.998),
        pow_decay_2: (0.9, 0.9999, 0.998),
        pow_decay_3: (0.9, 0.9999, 0.998),
        taps_0: (16.0, 512.0, 256.0),
        taps_1: (8.0, 64.0, 32.0),
        taps_2: (4.0, 32.0, 16.0),
        taps_3: (2.0, 16.0, 8.0),
        /// stage mixer step size
        mix_mu: (0.0005, 0.02, 0.002),
        /// stage mixer gradient averaging
        mix_beta: (0.9, 0.999, 0.97),
        /// residual cancellation fraction between stages
        mix_nu: (0.2, 1.0, 1.0),
        /// bias mixer step size
        bias_mu: (0.0001, 0.01, 0.0015),
    }
}

coef_group! {
    /// coefficients shared by both channels
    pub struct SharedCoefs {
        /// own-history ols taps
        ols_order: (8.0, 32.0, 16.0),
        /// master taps fed to the slave ols
        cross_taps: (2.0, 32.0, 8.0),
        /// how far ahead of the current position the slave reads the master
        cross_lookahead: (0.0, 4.0, 2.0),
        /// error average decay for the ols sample weight
        beta_sum: (0.5, 0.99, 0.6),
        beta_pow: (0.5, 1.0, 0.75),
        beta_add: (0.5, 10.0, 2.0),
        /// bias counter saturation, log2
        bias_scale: (3.0, 7.0, 5.0),
    }
}

/// channel role inside the predictor pair
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Role {
    Master,
    Slave,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Profile {
    pub master: ChannelCoefs,
    pub slave: ChannelCoefs,
    pub shared: SharedCoefs,
}

impl Default for Profile {
    fn default() -> Self {
        Self::baseline()
    }
}

impl Profile {
    /// coefficients stored per frame
    pub const LEN: usize = 2 * ChannelCoefs::LEN + SharedCoefs::LEN;

    /// serialized size in bytes
    pub const BYTES: usize = Self::LEN * 4;

    pub fn baseline() -> Self {
        Profile {
            master: ChannelCoefs::baseline(),
            slave: ChannelCoefs::baseline(),
            shared: SharedCoefs::baseline(),
        }
    }

    pub fn channel(&self, role: Role) -> &ChannelCoefs {
        match role {
            Role::Master => &self.master,
            Role::Slave => &self.slave,
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = &Coef> + '_ {
        self.master
            .iter()
            .chain(self.slave.iter())
            .chain(self.shared.iter())
    }

    pub fn iter_mut(&mut self) -> impl Iterator<Item = &mut Coef> + '_ {
        self.master
            .iter_mut()
            .chain(self.slave.iter_mut())
            .chain(self.shared.iter_mut())
    }

    /// qualified coefficient names, in serialization order
    pub fn names() -> impl Iterator<Item = String> {
        let ch = |prefix: &'static str| {
            ChannelCoefs::NAMES
                .iter()
                .map(move |n| format!("{prefix}.{n}"))
        };
        ch("master")
            .chain(ch("slave"))
            .chain(SharedCoefs::NAMES.iter().map(|n| format!("shared.{n}")))
    }

    /// positions worth searching for a stream with `channels` channels
    pub fn search_indices(channels: usize) -> Vec<usize> {
        let master = 0..ChannelCoefs::LEN;
        let shared = 2 * ChannelCoefs::LEN..Self::LEN;
        if channels > 1 {
            (0..Self::LEN).collect()
        } else {
            master.chain(shared).collect()
        }
    }

    pub fn values(&self, indices: &[usize]) -> Vec<f64> {
        let all: Vec<f64> = self.iter().map(|c| c.value as f64).collect();
        indices.iter().map(|&i| all[i]).collect()
    }

    pub fn bounds(&self, indices: &[usize]) -> Vec<(f64, f64)> {
        let all: Vec<(f64, f64)> = self.iter().map(|c| (c.min as f64, c.max as f64)).collect();
        indices.iter().map(|&i| all[i]).collect()
    }

    /// write `values[k]` into coefficient `indices[k]`
    pub fn set_values(&mut self, indices: &[usize], values: &[f64]) {
        let mut coefs: Vec<&mut Coef> = self.iter_mut().collect();
        for (&i, &v) in indices.iter().zip(values) {
            coefs[i].set(v);
        }
    }

    pub fn write_to(&self, out: &mut Vec<u8>) {
        for c in self.iter() {
            out.extend_from_slice(&c.value.to_le_bytes());
        }
    }

    /// restore values from `Profile::BYTES` bytes, ranges stay at baseline
    pub fn read_from(bytes: &[u8]) -> SacResult<Self> {
        if bytes.len() != Self::BYTES {
            return Err(SacError::Format(format!(
                "profile needs {} bytes, got {}",
                Self::BYTES,
                bytes.len()
            )));
        }
        let mut profile = Profile::baseline();
        for ((coef, raw), name) in profile
            .iter_mut()
            .zip(bytes.chunks_exact(4))
            .zip(Self::names())
        {
            let v = f32::from_le_bytes([raw[0], raw[1], raw[2], raw[3]]);
            if !(coef.min..=coef.max).contains(&v) {
                return Err(SacError::Format(format!(
                    "profile coefficient {name} = {v} outside [{}, {}]",
                    coef.min, coef.max
                )));
            }
            coef.value = v;
        }
        Ok(profile)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn baseline_values_are_in_range() {
        let p = Profile::baseline();
        assert_eq!(p.iter().count(), Profile::LEN);
        for (name, c) in Profile::names().zip(p.iter()) {
            assert!(c.min <= c.value && c.value <= c.max, "{name} out of range");
        }
    }

    #[test]
    fn serialized_layout_is_stable() {
        let mut p = Profile::baseline();
        p.master.lambda.value = 0.995;
        p.shared.bias_scale.value = 6.0;

        let mut bytes = Vec::new();
        p.write_to(&mut bytes);
        assert_eq!(bytes.len(), Profile::BYTES);
        assert_eq!(&bytes[..4], &0.995f32.to_le_bytes());
        assert_eq!(&bytes[bytes.len() - 4..], &6.0f32.to_le_bytes());
        assert_eq!(Profile::read_from(&bytes).unwrap(), p);
    }

    #[test]
    fn mono_search_skips_slave_group() {
        let idx = Profile::search_indices(1);
        assert_eq!(idx.len(), ChannelCoefs::LEN + SharedCoefs::LEN);
        assert!(!idx.contains(&ChannelCoefs::LEN));
    }
}
