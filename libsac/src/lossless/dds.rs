//! Dynamically dimensioned search.
//!
//! Derivative free, greedy: every iteration perturbs a random subset of
//! the incumbent's coordinates with gaussian noise scaled to each
//! coordinate's range, and keeps the candidate if it is no worse. Both
//! the subset probability and the noise width shrink linearly over the
//! evaluation budget, so the search starts global and ends local.

use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use serde::{Deserialize, Serialize};
use std::f64::consts::TAU;

use crate::core::math::linear_map;
use crate::core::{SacError, SacResult};

/// noise width at the first iteration, fraction of the coordinate range
pub const SIGMA_START: f64 = 0.25;
/// noise width at the last iteration
pub const SIGMA_END: f64 = 0.05;
/// per-coordinate perturbation probability at the first iteration
pub const PROB_START: f64 = 1.0;
/// per-coordinate perturbation probability at the last iteration
pub const PROB_END: f64 = 0.0;

/// linear annealing of the perturbation width and probability
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DdsSchedule {
    pub sigma_start: f64,
    pub sigma_end: f64,
    pub prob_start: f64,
    pub prob_end: f64,
}

impl Default for DdsSchedule {
    fn default() -> Self {
        DdsSchedule {
            sigma_start: SIGMA_START,
            sigma_end: SIGMA_END,
            prob_start: PROB_START,
            prob_end: PROB_END,
        }
    }
}

impl DdsSchedule {
    pub fn sigma(&self, iter: usize, budget: usize) -> f64 {
        linear_map(0.0, budget as f64, self.sigma_start, self.sigma_end, iter as f64)
    }

    pub fn probability(&self, iter: usize, budget: usize) -> f64 {
        linear_map(0.0, budget as f64, self.prob_start, self.prob_end, iter as f64)
    }

    pub fn validate(&self) -> SacResult<()> {
        let ok = [self.sigma_start, self.sigma_end, self.prob_start, self.prob_end]
            .iter()
            .all(|v| v.is_finite() && *v >= 0.0);
        if !ok || self.prob_start > 1.0 || self.prob_end > 1.0 {
            return Err(SacError::Config(format!("invalid search schedule {self:?}")));
        }
        Ok(())
    }
}

#[derive(Debug, Clone)]
pub struct DdsResult {
    pub best_cost: f64,
    pub best: Vec<f64>,
    /// best cost after each evaluation, non-increasing
    pub history: Vec<f64>,
    pub evaluations: usize,
}

pub struct Dds {
    bounds: Vec<(f64, f64)>,
    schedule: DdsSchedule,
    rng: ChaCha8Rng,
}

impl Dds {
    pub fn new(bounds: Vec<(f64, f64)>, schedule: DdsSchedule, seed: u64) -> Self {
        Dds {
            bounds,
            schedule,
            rng: ChaCha8Rng::seed_from_u64(seed),
        }
    }

    /// standard normal sample (Box-Muller)
    fn gaussian(&mut self) -> f64 {
        let u1: f64 = 1.0 - self.rng.gen::<f64>();
        let u2: f64 = self.rng.gen::<f64>();
        (-2.0 * u1.ln()).sqrt() * (TAU * u2).cos()
    }

    fn perturb(&mut self, x: &mut [f64], d: usize, sigma: f64) {
        let (lo, hi) = self.bounds[d];
        let width = hi - lo;
        if width <= 0.0 {
            return;
        }
        let mut v = x[d] + sigma * width * self.gaussian();
        if v < lo {
            v = lo + (lo - v);
            if v > hi {
                v = lo;
            }
        } else if v > hi {
            v = hi - (v - hi);
            if v < lo {
                v = hi;
            }
        }
        x[d] = v.clamp(lo, hi);
    }

    /// minimize `cost` from `x0` within `budget` evaluations
    ///
    /// The first evaluation scores `x0` itself, so the result is never
    /// worse than the starting point.
    pub fn run<F>(&mut self, mut cost: F, x0: &[f64], budget: usize) -> DdsResult
    where
        F: FnMut(&[f64]) -> f64,
    {
        let mut best = x0.to_vec();
        if budget == 0 {
            return DdsResult {
                best_cost: f64::INFINITY,
                best,
                history: Vec::new(),
                evaluations: 0,
            };
        }

        let mut best_cost = cost(&best);
        let mut history = Vec::with_capacity(budget);
        history.push(best_cost);

        let ndim = best.len();
        if ndim > 0 {
            let mut cand = vec![0.0; ndim];
            for iter in 1..budget {
                let sigma = self.schedule.sigma(iter, budget);
                let prob = self.schedule.probability(iter, budget);

                cand.copy_from_slice(&best);
                let mut perturbed = 0;
                for d in 0..ndim {
                    if self.rng.gen::<f64>() < prob {
                        self.perturb(&mut cand, d, sigma);
                        perturbed += 1;
                    }
                }
                if perturbed == 0 {
                    let d = self.rng.gen_range(0..ndim);
                    self.perturb(&mut cand, d, sigma);
                }

                let c = cost(&cand);
                if c <= best_cost {
                    best_cost = c;
                    best.copy_from_slice(&cand);
                }
                history.push(best_cost);
            }
        }

        let evaluations = history.len();
        DdsResult {
            best_cost,
            best,
            history,
            evaluations,
        }
    }
}
