//! Per-channel predictor ensemble: weighted OLS, an NLMS cascade on the
//! OLS residual and a bias corrector on top.
//!
//! A predictor is a pure function of its parameters and the samples fed
//! to it so far. The frame coder builds a fresh one for every frame,
//! which is what lets the decoder retrace the encoder exactly.

pub mod bias;
pub mod lms;
pub mod ols;

pub use bias::BiasEstimator;
pub use lms::{LadMixer, LmsCascade, Nlms, SignLms, StageParams};
pub use ols::Ols;

use super::profile::{Profile, Role};
use crate::core::math::RollBuffer;

/// ols re-solve cadence while searching coefficients
pub const SEARCH_SOLVE_INTERVAL: usize = 4;

/// hyperparameters for one channel's predictor
#[derive(Debug, Clone, PartialEq)]
pub struct PredictorParams {
    pub role: Role,
    pub ols_order: usize,
    /// master taps seen by the slave, 0 for the master
    pub cross_taps: usize,
    pub cross_lookahead: usize,
    pub lambda: f64,
    pub ols_nu: f64,
    pub beta_sum: f64,
    pub beta_pow: f64,
    pub beta_add: f64,
    pub solve_interval: usize,
    pub stages: [StageParams; 4],
    pub mix_mu: f64,
    pub mix_beta: f64,
    pub mix_nu: f64,
    pub bias_mu: f64,
    pub bias_scale: u32,
}

fn count(v: f32) -> usize {
    v.round().max(1.0) as usize
}

impl PredictorParams {
    pub fn from_profile(profile: &Profile, role: Role, searching: bool) -> Self {
        let c = profile.channel(role);
        let s = &profile.shared;
        let f = |coef: &super::profile::Coef| coef.value as f64;
        let stage = |taps: f32, mu, decay, pow| StageParams {
            taps: count(taps),
            mu,
            mu_decay: decay,
            pow_decay: pow,
        };

        PredictorParams {
            role,
            ols_order: count(s.ols_order.value),
            cross_taps: match role {
                Role::Master => 0,
                Role::Slave => count(s.cross_taps.value),
            },
            cross_lookahead: s.cross_lookahead.value.round().max(0.0) as usize,
            lambda: f(&c.lambda),
            ols_nu: f(&c.ols_nu),
            beta_sum: f(&s.beta_sum),
            beta_pow: f(&s.beta_pow),
            beta_add: f(&s.beta_add),
            solve_interval: if searching { SEARCH_SOLVE_INTERVAL } else { 1 },
            stages: [
                stage(c.taps_0.value, f(&c.mu_0), f(&c.mu_decay_0), f(&c.pow_decay_0)),
                stage(c.taps_1.value, f(&c.mu_1), f(&c.mu_decay_1), f(&c.pow_decay_1)),
                stage(c.taps_2.value, f(&c.mu_2), f(&c.mu_decay_2), f(&c.pow_decay_2)),
                stage(c.taps_3.value, f(&c.mu_3), f(&c.mu_decay_3), f(&c.pow_decay_3)),
            ],
            mix_mu: f(&c.mix_mu),
            mix_beta: f(&c.mix_beta),
            mix_nu: f(&c.mix_nu),
            bias_mu: f(&c.bias_mu),
            bias_scale: s.bias_scale.value.round().max(0.0) as u32,
        }
    }
}

/// the full per-channel ensemble
#[derive(Debug, Clone)]
pub struct Predictor {
    ols_order: usize,
    cross_taps: usize,
    lookahead: usize,
    hist: RollBuffer,
    ols: Ols,
    cascade: LmsCascade,
    bias: BiasEstimator,
    p_ols: f64,
}

impl Predictor {
    pub fn new(params: &PredictorParams) -> Self {
        Predictor {
            ols_order: params.ols_order,
            cross_taps: params.cross_taps,
            lookahead: params.cross_lookahead,
            hist: RollBuffer::new(params.ols_order),
            ols: Ols::new(
                params.ols_order + params.cross_taps,
                params.solve_interval,
                params.lambda,
                params.ols_nu,
                params.beta_sum,
                params.beta_pow,
                params.beta_add,
            ),
            cascade: LmsCascade::new(
                &params.stages,
                params.mix_mu,
                params.mix_beta,
                params.mix_nu,
            ),
            bias: BiasEstimator::new(params.bias_mu, params.bias_scale),
            p_ols: 0.0,
        }
    }

    /// prediction from the channel's own history
    pub fn predict(&mut self) -> f64 {
        self.ols.input_mut()[..self.ols_order].copy_from_slice(self.hist.as_slice());
        self.finish_predict()
    }

    /// prediction that also reads the master channel around `pos`
    ///
    /// `master` holds the whole frame of the master channel; entries
    /// outside the frame read as zero.
    pub fn predict_with_master(&mut self, master: &[i32], pos: usize) -> f64 {
        let (own, cross) = self.ols.input_mut().split_at_mut(self.ols_order);
        own.copy_from_slice(self.hist.as_slice());
        let ahead = (pos + self.lookahead) as i64;
        for (j, x) in cross[..self.cross_taps].iter_mut().enumerate() {
            let idx = ahead - j as i64;
            *x = if idx >= 0 && (idx as usize) < master.len() {
                master[idx as usize] as f64
            } else {
                0.0
            };
        }
        self.finish_predict()
    }

    fn finish_predict(&mut self) -> f64 {
        self.p_ols = self.ols.predict();
        let p_lms = self.cascade.predict();
        self.bias.predict(self.p_ols + p_lms)
    }

    /// feed the true sample after a prediction
    pub fn update(&mut self, val: i32) {
        let v = val as f64;
        self.ols.update(v);
        self.cascade.update(v, self.p_ols);
        self.bias.update(v);
        self.hist.push(v);
    }
}

/// round and clamp a prediction into the frame's value range
#[inline]
pub fn clamp_prediction(p: f64, minval: i32, maxval: i32) -> i32 {
    if !p.is_finite() {
        return 0i32.clamp(minval, maxval);
    }
    (p.round().clamp(i32::MIN as f64, i32::MAX as f64) as i32).clamp(minval, maxval)
}
