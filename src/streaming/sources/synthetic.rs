//! Synthetic source that stands in for a headset.
//!
//! Samples are drawn from a Gaussian, floored to integers and resampled until
//! they fall strictly inside `(-bound, bound)`. Each sample comes with a
//! uniformly random quality in `[0, quality_max]`.

use crate::streaming::{
    error::{StreamError, StreamResult},
    protocol::{RawSample, SignalQuality},
    traits::{Reading, SampleSource},
};
use rand::{Rng, SeedableRng, rngs::StdRng};
use rand_distr::{Distribution, Normal};
use std::time::Duration;
use tokio::time::{Instant, Interval, MissedTickBehavior, interval_at};

/// Rejected draws tolerated for a single sample before giving up.
pub const MAX_DRAW_ATTEMPTS: usize = 10_000;

/// Configuration for the synthetic generator.
#[derive(Debug, Clone)]
pub struct SyntheticConfig {
    pub mean: f64,
    pub std_dev: f64,
    /// Accepted samples satisfy `-bound < sample < bound`
    pub bound: RawSample,
    pub quality_max: SignalQuality,
    /// Target samples per second; `None` runs unpaced
    pub rate_hz: Option<u32>,
    /// Samples produced per call to `next_readings`
    pub chunk_size: usize,
    /// Fixed seed for reproducible output
    pub seed: Option<u64>,
}

impl Default for SyntheticConfig {
    fn default() -> Self {
        Self {
            mean: 0.0,
            std_dev: 150.0,
            bound: 150,
            quality_max: 100,
            rate_hz: Some(512),
            chunk_size: 16,
            seed: None,
        }
    }
}

impl SyntheticConfig {
    /// Unpaced, seeded configuration.
    pub fn seeded(seed: u64) -> Self {
        Self {
            rate_hz: None,
            seed: Some(seed),
            ..Self::default()
        }
    }

    fn chunk_period(&self) -> Option<Duration> {
        self.rate_hz
            .filter(|&rate| rate > 0)
            .map(|rate| Duration::from_secs_f64(self.chunk_size.max(1) as f64 / f64::from(rate)))
    }
}

/// A source that generates bounded Gaussian noise in place of the bridge.
pub struct SyntheticSource {
    config: SyntheticConfig,
    rng: StdRng,
    normal: Normal<f64>,
    pacing: Option<Interval>,
    generated: u64,
}

impl SyntheticSource {
    /// Create a new generator with the given configuration.
    pub fn new(config: SyntheticConfig) -> StreamResult<Self> {
        if config.bound <= 0 {
            return Err(StreamError::InvalidConfig(format!(
                "synthetic bound must be positive, got {}",
                config.bound
            )));
        }
        if !(config.std_dev.is_finite() && config.std_dev > 0.0) {
            return Err(StreamError::InvalidConfig(format!(
                "synthetic std_dev must be a positive number, got {}",
                config.std_dev
            )));
        }
        if !(config.mean.is_finite() && config.mean.abs() < f64::from(config.bound)) {
            return Err(StreamError::InvalidConfig(format!(
                "synthetic mean must lie inside (-{bound}, {bound}), got {}",
                config.mean,
                bound = config.bound
            )));
        }
        if config.quality_max < 0 {
            return Err(StreamError::InvalidConfig(format!(
                "synthetic quality_max must be non-negative, got {}",
                config.quality_max
            )));
        }
        let normal = Normal::new(config.mean, config.std_dev).map_err(|e| {
            StreamError::InvalidConfig(format!("invalid synthetic distribution: {e}"))
        })?;
        let rng = match config.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };

        Ok(Self {
            config,
            rng,
            normal,
            pacing: None,
            generated: 0,
        })
    }

    /// Draw one sample, resampling until it lies inside the open bound.
    ///
    /// Gives up after [`MAX_DRAW_ATTEMPTS`] rejected draws.
    pub fn draw_sample(&mut self) -> StreamResult<RawSample> {
        let bound = f64::from(self.config.bound);
        for _ in 0..MAX_DRAW_ATTEMPTS {
            let draw = self.normal.sample(&mut self.rng).floor();
            if -bound < draw && draw < bound {
                return Ok(draw as RawSample);
            }
        }
        Err(StreamError::InvalidConfig(format!(
            "no sample inside (-{bound}, {bound}) after {MAX_DRAW_ATTEMPTS} draws from N({}, {})",
            self.config.mean, self.config.std_dev
        )))
    }

    /// Draw one quality value in `[0, quality_max]`.
    pub fn draw_quality(&mut self) -> SignalQuality {
        self.rng.gen_range(0..=self.config.quality_max)
    }

    /// Total samples produced so far.
    pub fn generated(&self) -> u64 {
        self.generated
    }
}

impl SampleSource for SyntheticSource {
    fn name(&self) -> &'static str {
        "synthetic"
    }

    async fn open(&mut self) -> StreamResult<()> {
        self.pacing = self.config.chunk_period().map(|period| {
            let mut ticker = interval_at(Instant::now() + period, period);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Burst);
            ticker
        });
        Ok(())
    }

    async fn next_readings(&mut self) -> StreamResult<Vec<Reading>> {
        match self.pacing.as_mut() {
            Some(ticker) => {
                ticker.tick().await;
            }
            None => tokio::task::yield_now().await,
        }

        let count = self.config.chunk_size.max(1);
        let mut readings = Vec::with_capacity(count);
        for _ in 0..count {
            let raw = self.draw_sample()?;
            readings.push(Reading::with_quality(raw, self.draw_quality()));
        }
        self.generated += count as u64;
        Ok(readings)
    }
}
