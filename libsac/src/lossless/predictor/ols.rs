//! Recursive weighted least squares stage.
//!
//! Keeps a leaky covariance estimate of the input history and re-solves
//! the normal equations by Cholesky factorization every
//! `solve_interval` samples. Samples are weighted by the inverse of the
//! recent absolute error so bursts do not dominate the estimate.

use crate::core::math::{dot, RunningAverage};

/// diagonal pivots at or below this abort the factorization
const FACTOR_TOLERANCE: f64 = 1e-8;

#[derive(Debug, Clone)]
pub struct Ols {
    n: usize,
    solve_interval: usize,
    since_solve: usize,
    lambda: f64,
    nu: f64,
    beta_pow: f64,
    beta_add: f64,
    esum: RunningAverage,
    x: Vec<f64>,
    w: Vec<f64>,
    b: Vec<f64>,
    /// lower triangle used, row major `n * n`
    cov: Vec<f64>,
    chol: Vec<f64>,
    y: Vec<f64>,
    pred: f64,
}

impl Ols {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        n: usize,
        solve_interval: usize,
        lambda: f64,
        nu: f64,
        beta_sum: f64,
        beta_pow: f64,
        beta_add: f64,
    ) -> Self {
        Ols {
            n,
            solve_interval: solve_interval.max(1),
            since_solve: 0,
            lambda,
            nu,
            beta_pow,
            beta_add,
            esum: RunningAverage::new(beta_sum),
            x: vec![0.0; n],
            w: vec![0.0; n],
            b: vec![0.0; n],
            cov: vec![0.0; n * n],
            chol: vec![0.0; n * n],
            y: vec![0.0; n],
            pred: 0.0,
        }
    }

    /// input vector for the next prediction
    pub fn input_mut(&mut self) -> &mut [f64] {
        &mut self.x
    }

    pub fn predict(&mut self) -> f64 {
        self.pred = dot(&self.w, &self.x);
        self.pred
    }

    pub fn update(&mut self, val: f64) {
        let err = val - self.pred;
        self.esum.update(err.abs());
        let c0 = (self.esum.sum + self.beta_add).powf(-self.beta_pow);

        let n = self.n;
        for i in 0..n {
            let cx = c0 * self.x[i];
            let row = &mut self.cov[i * n..i * n + i + 1];
            for (j, c) in row.iter_mut().enumerate() {
                *c = self.lambda * *c + cx * self.x[j];
            }
            self.b[i] = self.lambda * self.b[i] + cx * val;
        }

        self.since_solve += 1;
        if self.since_solve >= self.solve_interval {
            self.since_solve = 0;
            if self.factor() {
                self.solve();
            }
        }
    }

    /// cholesky of `cov + nu*I` into `chol`, false if not positive definite
    fn factor(&mut self) -> bool {
        let n = self.n;
        for i in 0..n {
            for j in 0..=i {
                let mut sum = self.cov[i * n + j];
                if i == j {
                    sum += self.nu;
                }
                for k in 0..j {
                    sum -= self.chol[i * n + k] * self.chol[j * n + k];
                }
                if i == j {
                    if sum <= FACTOR_TOLERANCE || !sum.is_finite() {
                        return false;
                    }
                    self.chol[i * n + i] = sum.sqrt();
                } else {
                    self.chol[i * n + j] = sum / self.chol[j * n + j];
                }
            }
        }
        true
    }

    /// forward then backward substitution into the weights
    fn solve(&mut self) {
        let n = self.n;
        for i in 0..n {
            let mut sum = self.b[i];
            for k in 0..i {
                sum -= self.chol[i * n + k] * self.y[k];
            }
            self.y[i] = sum / self.chol[i * n + i];
        }
        for i in (0..n).rev() {
            let mut sum = self.y[i];
            for k in i + 1..n {
                sum -= self.chol[k * n + i] * self.w[k];
            }
            self.w[i] = sum / self.chol[i * n + i];
        }
    }

    pub fn weights(&self) -> &[f64] {
        &self.w
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn constant_history_keeps_weights_finite() {
        let mut ols = Ols::new(4, 1, 0.998, 0.0, 0.6, 0.75, 2.0);
        for _ in 0..64 {
            ols.input_mut().fill(0.0);
            let p = ols.predict();
            assert!(p.is_finite());
            ols.update(0.0);
        }
        assert!(ols.weights().iter().all(|w| w.is_finite()));
    }

    #[test]
    fn learns_a_linear_recurrence() {
        // x[t] = 2 x[t-1] - x[t-2] is a ramp
        let mut ols = Ols::new(2, 1, 0.999, 0.001, 0.6, 0.75, 2.0);
        let mut last_err = f64::MAX;
        for t in 2..400 {
            let (x1, x2) = ((t - 1) as f64, (t - 2) as f64);
            ols.input_mut().copy_from_slice(&[x1, x2]);
            let p = ols.predict();
            last_err = (p - t as f64).abs();
            ols.update(t as f64);
        }
        assert!(last_err < 0.5, "ramp error {last_err}");
    }
}
