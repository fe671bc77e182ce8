use rand::Rng;
use rand::seq::SliceRandom;

/// Shuffled stop/go order for one block.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BlockPlan {
    stops: Vec<bool>,
}

impl BlockPlan {
    /// `floor(len * stop_ratio)` stop trials, the rest go, uniformly shuffled.
    pub fn generate<R: Rng + ?Sized>(len: usize, stop_ratio: f64, rng: &mut R) -> Self {
        let ratio = if stop_ratio.is_finite() {
            stop_ratio.clamp(0.0, 1.0)
        } else {
            0.0
        };
        let stop_count = ((len as f64) * ratio).floor() as usize;
        Self::with_stop_count(len, stop_count, rng)
    }

    /// Exactly `stop_count` stop trials at random, non-repeating positions.
    pub fn with_stop_count<R: Rng + ?Sized>(len: usize, stop_count: usize, rng: &mut R) -> Self {
        let stop_count = stop_count.min(len);
        let mut stops = vec![false; len];
        stops[..stop_count].fill(true);
        stops.shuffle(rng);
        Self { stops }
    }

    pub fn len(&self) -> usize {
        self.stops.len()
    }

    pub fn is_empty(&self) -> bool {
        self.stops.is_empty()
    }

    /// Out-of-range indices read as go trials.
    pub fn is_stop(&self, index: usize) -> bool {
        self.stops.get(index).copied().unwrap_or(false)
    }

    pub fn stop_count(&self) -> usize {
        self.stops.iter().filter(|s| **s).count()
    }

    pub fn as_slice(&self) -> &[bool] {
        &self.stops
    }
}
