//! Per-column marginal synthesis.
//!
//! Each column is sampled independently. The primary strategy estimates the
//! column's density with a Gaussian kernel density estimate (Scott's rule
//! bandwidth), evaluates it on a fine grid spanning the observed range and
//! draws grid points weighted by density. This keeps multi-modal shapes that a
//! normal approximation would flatten.
//!
//! Fallbacks, in order:
//! 1. one distinct value → the constant repeated
//! 2. density estimation fails → normal(mean, std) clipped to [min, max]
//! 3. std is zero → the mean repeated

use ndarray::{Array1, Array2, ArrayView1};
use rand::distributions::WeightedIndex;
use rand::Rng;
use rand_distr::{Distribution, Normal};
use serde::{Deserialize, Serialize};
use vera_core::{Error, NumericTable, Result};

use crate::stats::{distinct_count, mean, min_max, std_population, std_sample};

/// How a synthetic column was produced
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ColumnStrategy {
    Constant,
    Density,
    NormalFallback,
}

/// Gaussian kernel density estimate of one column
#[derive(Debug, Clone)]
pub struct GaussianKde {
    points: Vec<f64>,
    bandwidth: f64,
}

impl GaussianKde {
    /// Fit with Scott's rule: h = σ̂ · n^(-1/5)
    pub fn fit(column: &str, values: ArrayView1<'_, f64>) -> Result<Self> {
        let degenerate = |reason: &str| Error::DegenerateColumn {
            column: column.to_string(),
            reason: reason.to_string(),
        };

        if values.len() < 2 {
            return Err(degenerate("fewer than two observations"));
        }
        if values.iter().any(|v| !v.is_finite()) {
            return Err(degenerate("non-finite observation"));
        }

        let sigma = std_sample(values);
        let bandwidth = sigma * (values.len() as f64).powf(-0.2);
        if !bandwidth.is_finite() || bandwidth <= 0.0 {
            return Err(degenerate("singular bandwidth"));
        }

        Ok(Self {
            points: values.to_vec(),
            bandwidth,
        })
    }

    pub fn bandwidth(&self) -> f64 {
        self.bandwidth
    }

    /// Estimated density at `x`
    pub fn density(&self, x: f64) -> f64 {
        let norm = 1.0 / (self.bandwidth * (2.0 * std::f64::consts::PI).sqrt());
        let sum: f64 = self
            .points
            .iter()
            .map(|p| {
                let z = (x - p) / self.bandwidth;
                (-0.5 * z * z).exp()
            })
            .sum();
        norm * sum / self.points.len() as f64
    }
}

/// Evenly spaced grid over [lo, hi] with `n` points (n >= 2)
fn linspace(lo: f64, hi: f64, n: usize) -> Vec<f64> {
    let n = n.max(2);
    let step = (hi - lo) / (n - 1) as f64;
    (0..n).map(|i| lo + step * i as f64).collect()
}

/// Generates synthetic columns matching each original column's marginal
#[derive(Debug, Clone, Copy)]
pub struct MarginalSynthesizer {
    /// Rows to generate
    pub num_samples: usize,
    /// Resolution of the density grid
    pub grid_points: usize,
}

impl Default for MarginalSynthesizer {
    fn default() -> Self {
        Self {
            num_samples: 100,
            grid_points: 1000,
        }
    }
}

impl MarginalSynthesizer {
    pub fn new(num_samples: usize, grid_points: usize) -> Self {
        Self {
            num_samples,
            grid_points,
        }
    }

    /// Synthesize every column of `original` independently
    pub fn synthesize<R: Rng + ?Sized>(
        &self,
        original: &NumericTable,
        rng: &mut R,
    ) -> Result<(NumericTable, Vec<ColumnStrategy>)> {
        let mut data = Array2::zeros((self.num_samples, original.n_cols()));
        let mut strategies = Vec::with_capacity(original.n_cols());

        for (j, name) in original.columns().iter().enumerate() {
            let (samples, strategy) = self.synthesize_column(name, original.column(j), rng)?;
            for (i, v) in samples.into_iter().enumerate() {
                data[[i, j]] = v;
            }
            strategies.push(strategy);
        }

        let table = NumericTable::new(original.columns().to_vec(), data)?;
        Ok((table, strategies))
    }

    /// Synthesize one column.
    ///
    /// Non-finite observations are ignored. Errors only when no finite
    /// observation remains; every other degenerate case recovers through a
    /// fallback.
    pub fn synthesize_column<R: Rng + ?Sized>(
        &self,
        name: &str,
        values: ArrayView1<'_, f64>,
        rng: &mut R,
    ) -> Result<(Vec<f64>, ColumnStrategy)> {
        let finite: Array1<f64> = values.iter().copied().filter(|v| v.is_finite()).collect();
        let values = finite.view();

        let (lo, hi) = min_max(values).ok_or_else(|| Error::DegenerateColumn {
            column: name.to_string(),
            reason: "no finite observations".to_string(),
        })?;

        if distinct_count(values) <= 1 {
            return Ok((vec![lo; self.num_samples], ColumnStrategy::Constant));
        }

        match self.sample_density(name, values, lo, hi, rng) {
            Ok(samples) => Ok((samples, ColumnStrategy::Density)),
            Err(e) => {
                tracing::warn!(column = name, "density estimation failed, using normal fallback: {}", e);
                Ok(self.sample_normal(values, lo, hi, rng))
            }
        }
    }

    fn sample_density<R: Rng + ?Sized>(
        &self,
        name: &str,
        values: ArrayView1<'_, f64>,
        lo: f64,
        hi: f64,
        rng: &mut R,
    ) -> Result<Vec<f64>> {
        let kde = GaussianKde::fit(name, values)?;
        let grid = linspace(lo, hi, self.grid_points);
        let weights: Vec<f64> = grid.iter().map(|&x| kde.density(x)).collect();

        let dist = WeightedIndex::new(&weights).map_err(|e| Error::DegenerateColumn {
            column: name.to_string(),
            reason: e.to_string(),
        })?;

        Ok((0..self.num_samples).map(|_| grid[dist.sample(rng)]).collect())
    }

    fn sample_normal<R: Rng + ?Sized>(
        &self,
        values: ArrayView1<'_, f64>,
        lo: f64,
        hi: f64,
        rng: &mut R,
    ) -> (Vec<f64>, ColumnStrategy) {
        let mu = mean(values);
        let sigma = std_population(values);

        match Normal::new(mu, sigma) {
            Ok(normal) if sigma > 0.0 => {
                let samples = (0..self.num_samples)
                    .map(|_| normal.sample(rng).clamp(lo, hi))
                    .collect();
                (samples, ColumnStrategy::NormalFallback)
            }
            _ => {
                let fill = if mu.is_finite() { mu.clamp(lo, hi) } else { lo };
                (vec![fill; self.num_samples], ColumnStrategy::Constant)
            }
        }
    }
}
