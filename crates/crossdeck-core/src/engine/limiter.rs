//! Two-stage output protection
//!
//! 1. [`SourceLimiter`]: per slot, per block. If a deck's block peaks above
//!    the threshold the whole block is scaled so its peak lands on it.
//! 2. [`BusClipper`]: on the summed bus. Linear below the knee, tanh
//!    compression above, approaching the ceiling (below full scale).
//!
//! The clipper is continuous with unit slope at the knee, so there is no
//! corner when it engages. Below the knee it is a pure bypass and the output
//! is bit-identical to the input.

/// Default per-source limit threshold (linear)
pub const DEFAULT_SOURCE_LIMIT: f32 = 0.8;
/// Default bus knee: samples at or below this pass untouched
pub const DEFAULT_BUS_KNEE: f32 = 0.7;
/// Default bus ceiling: asymptote of the soft clip
pub const DEFAULT_BUS_CEILING: f32 = 0.98;

/// Per-source peak limiter
#[derive(Debug, Clone, Copy)]
pub struct SourceLimiter {
    threshold: f32,
}

impl SourceLimiter {
    pub fn new(threshold: f32) -> Self {
        let threshold = if threshold.is_finite() && threshold > 0.0 {
            threshold.min(1.0)
        } else {
            DEFAULT_SOURCE_LIMIT
        };
        Self { threshold }
    }

    pub fn threshold(&self) -> f32 {
        self.threshold
    }

    /// `min(1, threshold / peak)` when `peak > threshold`, else 1
    #[inline]
    pub fn gain_for_peak(&self, peak: f32) -> f32 {
        if peak > self.threshold {
            self.threshold / peak
        } else {
            1.0
        }
    }
}

impl Default for SourceLimiter {
    fn default() -> Self {
        Self::new(DEFAULT_SOURCE_LIMIT)
    }
}

/// Bus soft clipper
#[derive(Debug, Clone, Copy)]
pub struct BusClipper {
    knee: f32,
    ceiling: f32,
    /// ceiling - knee
    range: f32,
}

impl BusClipper {
    /// Invalid settings (knee >= ceiling, ceiling above full scale) fall back
    /// to the defaults.
    pub fn new(knee: f32, ceiling: f32) -> Self {
        let valid = knee.is_finite()
            && ceiling.is_finite()
            && knee > 0.0
            && knee < ceiling
            && ceiling <= 1.0;
        let (knee, ceiling) = if valid {
            (knee, ceiling)
        } else {
            (DEFAULT_BUS_KNEE, DEFAULT_BUS_CEILING)
        };
        Self {
            knee,
            ceiling,
            range: ceiling - knee,
        }
    }

    pub fn knee(&self) -> f32 {
        self.knee
    }

    pub fn ceiling(&self) -> f32 {
        self.ceiling
    }

    /// Transfer curve for one sample
    #[inline]
    pub fn shape(&self, x: f32) -> f32 {
        let magnitude = x.abs();
        if magnitude <= self.knee {
            return x;
        }
        let over = (magnitude - self.knee) / self.range;
        let shaped = self.knee + self.range * over.tanh();
        shaped.copysign(x)
    }

    /// Shape a block of interleaved samples in place. Returns true if any
    /// sample went past the knee.
    #[inline]
    pub fn process(&self, samples: &mut [f32]) -> bool {
        let mut engaged = false;
        for sample in samples.iter_mut() {
            if sample.abs() > self.knee {
                *sample = self.shape(*sample);
                engaged = true;
            }
        }
        engaged
    }
}

impl Default for BusClipper {
    fn default() -> Self {
        Self::new(DEFAULT_BUS_KNEE, DEFAULT_BUS_CEILING)
    }
}
