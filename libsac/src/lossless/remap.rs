//! Sparse value remapping.
//!
//! Some material only ever touches a handful of values inside a wide
//! range (upsampled low-bit audio, digitally mixed silence, ...). For
//! such channels the residual is rewritten as a signed count of *used*
//! values between the prediction and the true sample, which is a much
//! smaller number than the raw difference.

/// ranges wider than this are never remapped
pub const MAX_MAP_SPAN: usize = 1 << 20;

/// bijection between residuals and ranks over the used value set
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Remap {
    vmin: i32,
    used: Vec<bool>,
    /// `rank[k]` = used values with index below `k`, `span + 1` entries
    rank: Vec<u32>,
    /// used values in increasing order
    values: Vec<i32>,
}

impl Remap {
    pub fn new() -> Self {
        Self::default()
    }

    /// forget the previous frame's map
    pub fn reset(&mut self) {
        self.vmin = 0;
        self.used.clear();
        self.rank.clear();
        self.values.clear();
    }

    /// record which values in `[min, max]` of `samples` occur
    ///
    /// Leaves the map unavailable when the range is wider than
    /// [`MAX_MAP_SPAN`] or the channel is empty.
    pub fn analyse(&mut self, samples: &[i32]) {
        self.reset();
        let (Some(&lo), Some(&hi)) = (samples.iter().min(), samples.iter().max()) else {
            return;
        };
        let span = hi as i64 - lo as i64 + 1;
        if span as u64 > MAX_MAP_SPAN as u64 {
            return;
        }

        self.vmin = lo;
        self.used = vec![false; span as usize];
        for &s in samples {
            self.used[(s as i64 - lo as i64) as usize] = true;
        }
        self.build_tables();
    }

    /// rebuild a map from a decoded bitmap
    pub fn from_used(vmin: i32, used: Vec<bool>) -> Self {
        let mut map = Remap {
            vmin,
            used,
            rank: Vec::new(),
            values: Vec::new(),
        };
        map.build_tables();
        map
    }

    fn build_tables(&mut self) {
        self.rank.clear();
        self.values.clear();
        self.rank.reserve(self.used.len() + 1);
        let mut count = 0u32;
        for (k, &u) in self.used.iter().enumerate() {
            self.rank.push(count);
            if u {
                self.values.push((self.vmin as i64 + k as i64) as i32);
                count += 1;
            }
        }
        self.rank.push(count);
    }

    pub fn is_available(&self) -> bool {
        !self.used.is_empty()
    }

    pub fn vmin(&self) -> i32 {
        self.vmin
    }

    pub fn span(&self) -> usize {
        self.used.len()
    }

    pub fn used(&self) -> &[bool] {
        &self.used
    }

    pub fn num_used(&self) -> usize {
        self.values.len()
    }

    /// used values strictly below `v`
    #[inline]
    fn rank_below(&self, v: i64) -> i64 {
        let k = (v - self.vmin as i64).clamp(0, self.used.len() as i64);
        self.rank[k as usize] as i64
    }

    /// rank distance from `pred` to `pred + error`
    ///
    /// `pred + error` must be a used value.
    pub fn map(&self, pred: i32, error: i32) -> i32 {
        if error == 0 || !self.is_available() {
            return error;
        }
        let pred = pred as i64;
        let x = pred + error as i64;
        debug_assert!(self.is_used(x), "value {x} not in the map");
        if x > pred {
            (self.rank_below(x + 1) - self.rank_below(pred + 1)) as i32
        } else {
            -((self.rank_below(pred) - self.rank_below(x)) as i32)
        }
    }

    /// inverse of [`Remap::map`]
    ///
    /// Out of range ranks only occur on corrupt input; they resolve to
    /// the nearest used value instead of panicking.
    pub fn unmap(&self, pred: i32, mapped: i32) -> i32 {
        if mapped == 0 || self.values.is_empty() {
            return mapped;
        }
        let p = pred as i64;
        let k = if mapped > 0 {
            self.rank_below(p + 1) + mapped as i64 - 1
        } else {
            self.rank_below(p) + mapped as i64
        };
        let k = k.clamp(0, self.values.len() as i64 - 1) as usize;
        (self.values[k] as i64 - p) as i32
    }

    fn is_used(&self, v: i64) -> bool {
        let k = v - self.vmin as i64;
        k >= 0 && (k as usize) < self.used.len() && self.used[k as usize]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ranks_skip_unused_values() {
        let mut map = Remap::new();
        map.analyse(&[0, 10, 20, 10, 0]);
        assert_eq!(map.num_used(), 3);
        assert_eq!(map.map(0, 10), 1);
        assert_eq!(map.map(0, 20), 2);
        assert_eq!(map.map(20, -20), -2);
        assert_eq!(map.map(5, 5), 1);
        assert_eq!(map.map(5, -5), -1);
        assert_eq!(map.unmap(5, 1), 5);
        assert_eq!(map.unmap(5, -1), -5);
    }

    #[test]
    fn wide_range_is_not_mapped() {
        let mut map = Remap::new();
        map.analyse(&[0, MAX_MAP_SPAN as i32 + 5]);
        assert!(!map.is_available());
        assert_eq!(map.map(0, 7), 7);
    }
}
