//! numeric building blocks shared by the predictors, the cost
//! estimators and the optimizer

/// exponentially weighted running average: `sum = a*sum + (1-a)*v`
#[derive(Debug, Clone, Copy)]
pub struct RunningAverage {
    alpha: f64,
    pub sum: f64,
}

impl RunningAverage {
    pub fn new(alpha: f64) -> Self {
        RunningAverage { alpha, sum: 0.0 }
    }

    pub fn with_initial(alpha: f64, sum: f64) -> Self {
        RunningAverage { alpha, sum }
    }

    #[inline]
    pub fn update(&mut self, v: f64) {
        self.sum = self.alpha * self.sum + (1.0 - self.alpha) * v;
    }
}

/// fixed-length history where index 0 is the most recent value
///
/// Backed by a doubled buffer so the window is always one contiguous
/// slice, no wrap handling in the dot products.
#[derive(Debug, Clone)]
pub struct RollBuffer {
    n: usize,
    pos: usize,
    buf: Vec<f64>,
}

impl RollBuffer {
    pub fn new(n: usize) -> Self {
        RollBuffer {
            n,
            pos: 0,
            buf: vec![0.0; 2 * n],
        }
    }

    #[inline]
    pub fn push(&mut self, v: f64) {
        if self.n == 0 {
            return;
        }
        self.pos = if self.pos == 0 { self.n - 1 } else { self.pos - 1 };
        self.buf[self.pos] = v;
        self.buf[self.pos + self.n] = v;
    }

    #[inline]
    pub fn as_slice(&self) -> &[f64] {
        &self.buf[self.pos..self.pos + self.n]
    }

    #[inline]
    pub fn get(&self, i: usize) -> f64 {
        self.buf[self.pos + i]
    }

    pub fn len(&self) -> usize {
        self.n
    }

    pub fn is_empty(&self) -> bool {
        self.n == 0
    }
}

/// map `x` from `[x0, x1]` onto `[y0, y1]` linearly
#[inline]
pub fn linear_map(x0: f64, x1: f64, y0: f64, y1: f64, x: f64) -> f64 {
    if x1 == x0 {
        return y0;
    }
    y0 + (y1 - y0) * (x - x0) / (x1 - x0)
}

#[inline]
pub fn sign(v: f64) -> f64 {
    if v > 0.0 {
        1.0
    } else if v < 0.0 {
        -1.0
    } else {
        0.0
    }
}

#[inline]
pub fn dot(a: &[f64], b: &[f64]) -> f64 {
    a.iter().zip(b).map(|(x, y)| x * y).sum()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn roll_buffer_keeps_latest_first() {
        let mut rb = RollBuffer::new(3);
        for v in 1..=5 {
            rb.push(v as f64);
        }
        assert_eq!(rb.as_slice(), &[5.0, 4.0, 3.0]);
        assert_eq!(rb.get(1), 4.0);
    }

    #[test]
    fn linear_map_endpoints() {
        assert_eq!(linear_map(0.0, 10.0, 0.25, 0.05, 0.0), 0.25);
        assert!((linear_map(0.0, 10.0, 0.25, 0.05, 10.0) - 0.05).abs() < 1e-12);
        assert_eq!(linear_map(3.0, 3.0, 1.0, 2.0, 3.0), 1.0);
    }

    #[test]
    fn running_average_converges() {
        let mut ra = RunningAverage::new(0.9);
        for _ in 0..200 {
            ra.update(4.0);
        }
        assert!((ra.sum - 4.0).abs() < 1e-6);
    }
}
