//! Context mixing bias correction for the final prediction.

use super::lms::SignLms;
use crate::core::math::RollBuffer;

/// gate width in standard deviations for accepting a bias sample
const GATE_SIGMA: f64 = 1.5;

/// decay of the delta mean/variance trackers
const TRACK_LAMBDA: f64 = 0.998;

const HISTORY: usize = 8;
const TABLE_SIZE: usize = 64;
const MIX_CONTEXTS: usize = 4;
const NUM_BIASES: usize = 3;

/// initial pseudo-count of a table cell
const CELL_PRIOR: u32 = 4;

/// running average that halves itself once the count saturates
#[derive(Debug, Clone, Copy)]
struct BiasCell {
    sum: f64,
    count: u32,
}

impl Default for BiasCell {
    fn default() -> Self {
        BiasCell {
            sum: 0.0,
            count: CELL_PRIOR,
        }
    }
}

impl BiasCell {
    #[inline]
    fn get(&self) -> f64 {
        self.sum / self.count as f64
    }

    #[inline]
    fn update(&mut self, delta: f64, limit: u32) {
        self.sum += delta;
        self.count += 1;
        if self.count >= limit {
            self.sum *= 0.5;
            self.count >>= 1;
        }
    }
}

#[derive(Debug, Clone)]
pub struct BiasEstimator {
    cell_limit: u32,
    tables: [Vec<BiasCell>; NUM_BIASES],
    ctx: [usize; NUM_BIASES],
    mix: Vec<SignLms>,
    mix_ctx: usize,
    hist_input: RollBuffer,
    hist_delta: RollBuffer,
    mean: f64,
    var: f64,
    base: f64,
    pred: f64,
}

impl BiasEstimator {
    /// `scale` is log2 of the cell count limit
    pub fn new(mu: f64, scale: u32) -> Self {
        BiasEstimator {
            cell_limit: 1u32 << scale.clamp(3, 16),
            tables: std::array::from_fn(|_| vec![BiasCell::default(); TABLE_SIZE]),
            ctx: [0; NUM_BIASES],
            mix: (0..MIX_CONTEXTS).map(|_| SignLms::new(NUM_BIASES, mu)).collect(),
            mix_ctx: 0,
            hist_input: RollBuffer::new(HISTORY),
            hist_delta: RollBuffer::new(HISTORY),
            mean: 0.0,
            var: 0.0,
            base: 0.0,
            pred: 0.0,
        }
    }

    fn contexts(&mut self, p: f64) {
        let d = |i: usize| self.hist_delta.get(i);
        let x = |i: usize| self.hist_input.get(i);
        let bit = |c: bool| usize::from(!c);

        let b0 = bit(x(0) > p);
        let b2 = bit(d(0) < 0.0);
        let b3 = bit(d(1) < 0.0);
        let b4 = bit(d(2) < 0.0);
        let b5 = bit(d(1) < d(0));
        let b6 = bit(d(2) < d(1));
        let b7 = bit(d(3) < d(2));
        let b8 = bit(d(4) < d(3));
        let b9 = bit(d(0).abs() > 32.0);
        let b10 = bit(2.0 * x(0) - x(1) > p);
        let b11 = bit(3.0 * x(0) - 3.0 * x(1) + x(2) > p);

        self.ctx = [
            b0 | b2 << 1 | b9 << 2 | b10 << 3 | b11 << 4,
            b2 | b3 << 1 | b4 << 2,
            b5 | b6 << 1 | b7 << 2 | b8 << 3,
        ];

        let avg = (0..5).map(|i| d(i).abs()).sum::<f64>() / 5.0;
        self.mix_ctx = if avg > 512.0 {
            2
        } else if avg > 32.0 {
            1
        } else {
            0
        };
    }

    /// corrected prediction for the ensemble output `p`
    pub fn predict(&mut self, p: f64) -> f64 {
        self.base = p;
        self.contexts(p);
        let mut biases = [0.0; NUM_BIASES];
        for (b, (table, &ctx)) in biases.iter_mut().zip(self.tables.iter().zip(&self.ctx)) {
            *b = table[ctx].get();
        }
        self.pred = p + self.mix[self.mix_ctx].predict(&biases);
        self.pred
    }

    pub fn update(&mut self, val: f64) {
        let delta = val - self.base.round();

        let dev = GATE_SIGMA * self.var.sqrt();
        if delta > self.mean - dev && delta < self.mean + dev {
            for (table, &ctx) in self.tables.iter_mut().zip(&self.ctx) {
                table[ctx].update(delta, self.cell_limit);
            }
        }
        self.mix[self.mix_ctx].update(val - self.base);

        self.mean = TRACK_LAMBDA * self.mean + (1.0 - TRACK_LAMBDA) * delta;
        let dm = delta - self.mean;
        self.var = TRACK_LAMBDA * self.var + (1.0 - TRACK_LAMBDA) * dm * dm;

        self.hist_delta.push(delta);
        self.hist_input.push(val);
    }
}
