//! Numeric helpers for scoring and cross-wave comparison.

// =============================================================================
// STREAMING STATISTICS
// =============================================================================
// Welford's online algorithm, extended with a co-moment for paired values.

/// Single-pass mean accumulator. Keeps the sum of squared deviations for
/// [`PairedStats`].
#[derive(Debug, Clone, Copy, Default)]
pub struct RunningMean {
    count: usize,
    mean: f64,
    m2: f64,
}

impl RunningMean {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, value: f64) {
        self.count += 1;
        let delta = value - self.mean;
        self.mean += delta / self.count as f64;
        self.m2 += delta * (value - self.mean);
    }

    /// Mean of the values seen, or `None` when nothing was added.
    pub fn mean(&self) -> Option<f64> {
        (self.count > 0).then_some(self.mean)
    }
}

/// Single-pass accumulator for paired values.
#[derive(Debug, Clone, Copy, Default)]
pub struct PairedStats {
    x: RunningMean,
    y: RunningMean,
    /// Sum of co-deviations from the running means.
    c: f64,
}

impl PairedStats {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, x: f64, y: f64) {
        let dx = x - self.x.mean;
        self.x.add(x);
        self.y.add(y);
        self.c += dx * (y - self.y.mean);
    }

    pub fn count(&self) -> usize {
        self.x.count
    }

    pub fn mean_x(&self) -> Option<f64> {
        self.x.mean()
    }

    pub fn mean_y(&self) -> Option<f64> {
        self.y.mean()
    }

    /// Pearson correlation; `None` with fewer than two pairs or a constant side.
    pub fn pearson(&self) -> Option<f64> {
        if self.count() < 2 || self.x.m2 <= 0.0 || self.y.m2 <= 0.0 {
            return None;
        }
        let r = self.c / (self.x.m2.sqrt() * self.y.m2.sqrt());
        Some(r.clamp(-1.0, 1.0))
    }
}

/// Round half away from zero to `decimals` places.
pub fn round_to(value: f64, decimals: u32) -> f64 {
    let factor = 10f64.powi(decimals as i32);
    (value * factor).round() / factor
}

/// Number of distinct values (exact comparison).
pub fn distinct_count(values: impl IntoIterator<Item = f64>) -> usize {
    let mut seen: Vec<f64> = Vec::new();
    for v in values {
        if !seen.contains(&v) {
            seen.push(v);
        }
    }
    seen.len()
}
