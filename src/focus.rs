//! Focus curve
//!
//! The FWHM measured at each focus setting of a configuration group is fitted
//! with a polynomial. The polynomial is sampled on a dense grid across the
//! focus range and the best focus is the grid point where the forward
//! difference derivative is closest to zero.

use crate::polynomial::Polynomial;
use std::path::PathBuf;

/// FWHM measured on the image taken at a given focus setting
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FocusSample {
    pub focus: f64,
    pub fwhm: f64,
}
impl From<(f64, f64)> for FocusSample {
    fn from((focus, fwhm): (f64, f64)) -> Self {
        Self { focus, fwhm }
    }
}

/// Focus samples of images sharing the same instrument configuration
#[derive(Debug, Clone, Default)]
pub struct FocusGroup {
    samples: Vec<FocusSample>,
    /// Images the samples were measured on
    pub files: Vec<PathBuf>,
}
impl FocusGroup {
    /// Creates a group, sorting the samples by increasing focus
    pub fn new(mut samples: Vec<FocusSample>, files: Vec<PathBuf>) -> Self {
        samples.sort_by(|a, b| a.focus.total_cmp(&b.focus));
        Self { samples, files }
    }
    pub fn samples(&self) -> &[FocusSample] {
        &self.samples
    }
    pub fn len(&self) -> usize {
        self.samples.len()
    }
    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }
    /// Focus and FWHM vectors
    pub fn unzip(&self) -> (Vec<f64>, Vec<f64>) {
        self.samples.iter().map(|s| (s.focus, s.fwhm)).unzip()
    }
    /// Focus range `(min, max)`
    pub fn range(&self) -> Option<(f64, f64)> {
        Some((self.samples.first()?.focus, self.samples.last()?.focus))
    }
}

/// Focus curve fitting settings
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CurveConfig {
    /// Polynomial degree
    pub degree: usize,
    /// Number of points of the grid the polynomial is sampled on
    pub grid_size: usize,
    /// Minimum number of samples required to fit the curve
    pub min_samples: usize,
}
impl Default for CurveConfig {
    fn default() -> Self {
        Self {
            degree: 5,
            grid_size: 2000,
            min_samples: 6,
        }
    }
}

/// Fitted focus curve
#[derive(Debug, Clone, PartialEq)]
pub struct FocusCurveFit {
    pub polynomial: Polynomial,
    /// Focus value minimizing the FWHM
    pub best_focus: f64,
    /// Focus range the curve was fitted over
    pub range: (f64, f64),
}
impl FocusCurveFit {
    /// FWHM predicted at the given focus
    pub fn eval(&self, focus: f64) -> f64 {
        self.polynomial.eval(focus)
    }
    /// The curve sampled on `n` regularly spaced focus values
    pub fn curve(&self, n: usize) -> Vec<(f64, f64)> {
        linspace(self.range.0, self.range.1, n)
            .into_iter()
            .map(|x| (x, self.eval(x)))
            .collect()
    }
}

/// `n` regularly spaced values from `start` to `end` inclusive
pub fn linspace(start: f64, end: f64, n: usize) -> Vec<f64> {
    match n {
        0 => vec![],
        1 => vec![start],
        _ => {
            let step = (end - start) / (n - 1) as f64;
            (0..n).map(|i| start + step * i as f64).collect()
        }
    }
}

/// Focus curve solver
#[derive(Debug, Clone, Copy, Default)]
pub struct FocusCurve {
    config: CurveConfig,
}
impl FocusCurve {
    pub fn new(config: CurveConfig) -> Self {
        Self { config }
    }
    /// Grid point where the derivative of the sampled curve is closest to zero
    ///
    /// The derivative is the forward difference `(f[i+1] - f[i]) / (x[i+1] - x[i])`.
    pub fn local_minimum(&self, polynomial: &Polynomial, x1: f64, x2: f64) -> f64 {
        let grid = linspace(x1, x2, self.config.grid_size.max(2));
        let modeled: Vec<f64> = grid.iter().map(|&x| polynomial.eval(x)).collect();
        grid.windows(2)
            .zip(modeled.windows(2))
            .map(|(x, y)| (y[1] - y[0]) / (x[1] - x[0]))
            .enumerate()
            .min_by(|(_, a), (_, b)| a.abs().total_cmp(&b.abs()))
            .map_or(x1, |(i, _)| grid[i])
    }
    /// Fits the focus curve of a group and locates the best focus
    ///
    /// Returns `None` when the group holds fewer than the minimum number of
    /// samples or when the polynomial cannot be fitted.
    pub fn solve(&self, group: &FocusGroup) -> Option<FocusCurveFit> {
        let n = group.len();
        if n < self.config.min_samples {
            log::warn!(
                "{} focus samples, at least {} are required to fit the focus curve",
                n,
                self.config.min_samples
            );
            return None;
        }
        let (focus, fwhm) = group.unzip();
        let Some(polynomial) = Polynomial::fit(&focus, &fwhm, self.config.degree) else {
            log::warn!(
                "failed to fit a degree {} polynomial to {} focus samples",
                self.config.degree,
                n
            );
            return None;
        };
        let range = group.range()?;
        let best_focus = self.local_minimum(&polynomial, range.0, range.1);
        log::debug!("focus curve: {}", polynomial);
        Some(FocusCurveFit {
            polynomial,
            best_focus,
            range,
        })
    }
}
