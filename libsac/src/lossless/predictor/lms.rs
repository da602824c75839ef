//! Normalized LMS filters, the stage cascade and its mixers.

use crate::core::math::{dot, sign, RollBuffer};

/// keeps the power normalization away from zero on silence
const POWER_EPS: f64 = 1e-3;

/// normalized LMS filter with per-tap step decay
#[derive(Debug, Clone)]
pub struct Nlms {
    hist: RollBuffer,
    w: Vec<f64>,
    mu_tab: Vec<f64>,
    pow_decay: f64,
    power: f64,
    pred: f64,
}

impl Nlms {
    pub fn new(n: usize, mu: f64, mu_decay: f64, pow_decay: f64) -> Self {
        let mut mu_tab = Vec::with_capacity(n);
        let mut step = mu;
        for _ in 0..n {
            mu_tab.push(step);
            step *= mu_decay;
        }
        Nlms {
            hist: RollBuffer::new(n),
            w: vec![0.0; n],
            mu_tab,
            pow_decay,
            power: 0.0,
            pred: 0.0,
        }
    }

    pub fn predict(&mut self) -> f64 {
        self.pred = dot(&self.w, self.hist.as_slice());
        self.pred
    }

    pub fn update(&mut self, target: f64) {
        let err = target - self.pred;
        let norm = err / (self.hist.len() as f64 * self.power + POWER_EPS);
        for ((w, &x), &mu) in self.w.iter_mut().zip(self.hist.as_slice()).zip(&self.mu_tab) {
            *w += mu * norm * x;
        }
        self.power = self.pow_decay * self.power + (1.0 - self.pow_decay) * target * target;
        self.hist.push(target);
    }
}

/// sign-error mixer with adaptive (rms normalized) step
#[derive(Debug, Clone)]
pub struct LadMixer {
    x: Vec<f64>,
    w: Vec<f64>,
    eg: Vec<f64>,
    mu: f64,
    beta: f64,
    pred: f64,
}

impl LadMixer {
    pub fn new(n: usize, mu: f64, beta: f64) -> Self {
        LadMixer {
            x: vec![0.0; n],
            w: vec![1.0; n],
            eg: vec![0.0; n],
            mu,
            beta,
            pred: 0.0,
        }
    }

    pub fn predict(&mut self, inputs: &[f64]) -> f64 {
        self.x.copy_from_slice(inputs);
        self.pred = dot(&self.w, &self.x);
        self.pred
    }

    pub fn update(&mut self, target: f64) {
        let s = sign(target - self.pred);
        for ((w, eg), &x) in self.w.iter_mut().zip(&mut self.eg).zip(&self.x) {
            let grad = s * x;
            *eg = self.beta * *eg + (1.0 - self.beta) * grad * grad;
            *w += self.mu * grad / (eg.sqrt() + POWER_EPS);
        }
    }
}

/// sign-sign LMS mixer
#[derive(Debug, Clone)]
pub struct SignLms {
    x: Vec<f64>,
    w: Vec<f64>,
    mu: f64,
    pred: f64,
}

impl SignLms {
    pub fn new(n: usize, mu: f64) -> Self {
        SignLms {
            x: vec![0.0; n],
            w: vec![1.0 / n.max(1) as f64; n],
            mu,
            pred: 0.0,
        }
    }

    pub fn predict(&mut self, inputs: &[f64]) -> f64 {
        self.x.copy_from_slice(inputs);
        self.pred = dot(&self.w, &self.x);
        self.pred
    }

    pub fn update(&mut self, target: f64) {
        let s = sign(target - self.pred);
        for (w, &x) in self.w.iter_mut().zip(&self.x) {
            *w += self.mu * s * sign(x);
        }
    }
}

/// configuration of one cascade stage
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct StageParams {
    pub taps: usize,
    pub mu: f64,
    pub mu_decay: f64,
    pub pow_decay: f64,
}

/// NLMS stages in series, each modelling what the previous left over
#[derive(Debug, Clone)]
pub struct LmsCascade {
    stages: Vec<Nlms>,
    preds: Vec<f64>,
    mix: LadMixer,
    nu: f64,
}

impl LmsCascade {
    pub fn new(stages: &[StageParams], mix_mu: f64, mix_beta: f64, nu: f64) -> Self {
        LmsCascade {
            stages: stages
                .iter()
                .map(|s| Nlms::new(s.taps, s.mu, s.mu_decay, s.pow_decay))
                .collect(),
            preds: vec![0.0; stages.len()],
            mix: LadMixer::new(stages.len(), mix_mu, mix_beta),
            nu,
        }
    }

    pub fn predict(&mut self) -> f64 {
        for (p, stage) in self.preds.iter_mut().zip(&mut self.stages) {
            *p = stage.predict();
        }
        self.mix.predict(&self.preds)
    }

    /// `ols_pred` is what the first stage already explained
    pub fn update(&mut self, input: f64, ols_pred: f64) {
        let mut target = input - ols_pred;
        self.mix.update(target);
        for (stage, &p) in self.stages.iter_mut().zip(&self.preds) {
            stage.update(target);
            target -= self.nu * p;
        }
    }
}
