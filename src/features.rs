//! Line profile fitting
//!
//! Each detected line is fitted with a [FeatureModel] over the whole profile
//! and the FWHM of the fitted model is the sharpness metric of the image.
//! When several lines are found, outliers are rejected with a single 3-sigma
//! clipping pass and the remaining FWHM values are averaged.

use crate::{
    lm::{self, LMConfig, LineShape},
    peaks::Peak,
    profile::Profile,
    stats::SigmaClip,
};
use nalgebra::DVector;
use std::fmt;
use strum_macros::{Display, EnumIter, EnumString};

/// Initial Gaussian standard deviation in pixels
pub const INITIAL_STDDEV: f64 = 5.;
/// FWHM outlier rejection threshold in standard deviations
pub const FWHM_SIGMA: f64 = 3.;
/// Number of FWHM clipping passes
pub const FWHM_ITERATIONS: usize = 1;

/// `2 * sqrt(2 * ln(2))`
const GAUSSIAN_SIGMA_TO_FWHM: f64 = 2.354_820_045_030_949_3;

/// Line profile model
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Display, EnumString, EnumIter)]
#[strum(serialize_all = "lowercase", ascii_case_insensitive)]
pub enum FeatureModel {
    #[default]
    Gaussian,
    Moffat,
}
impl FeatureModel {
    /// Fits the model to the full profile starting from the peak
    pub fn fit(&self, peak: &Peak, profile: &Profile, config: &LMConfig) -> FeatureFit {
        match self {
            FeatureModel::Gaussian => {
                let init = Gaussian::seed(peak);
                log::debug!(
                    "Fitting {} with amplitude={}, mean={}, stddev={}",
                    self,
                    init.amplitude,
                    init.mean,
                    init.stddev
                );
                let result = lm::fit(init, &profile.x_axis, &profile.data, config);
                FeatureFit::Gaussian(result.shape)
            }
            FeatureModel::Moffat => {
                let init = Moffat::seed(peak);
                log::debug!(
                    "Fitting {} with amplitude={}, x_0={}",
                    self,
                    init.amplitude,
                    init.x_0
                );
                let result = lm::fit(init, &profile.x_axis, &profile.data, config);
                FeatureFit::Moffat(result.shape)
            }
        }
    }
}

/// `amplitude * exp(-0.5 * ((x - mean) / stddev)^2)`
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Gaussian {
    pub amplitude: f64,
    pub mean: f64,
    pub stddev: f64,
}
impl Gaussian {
    fn seed(peak: &Peak) -> Self {
        Self {
            amplitude: peak.value,
            mean: peak.position,
            stddev: INITIAL_STDDEV,
        }
    }
    pub fn fwhm(&self) -> f64 {
        GAUSSIAN_SIGMA_TO_FWHM * self.stddev.abs()
    }
}
impl From<[f64; 3]> for Gaussian {
    fn from([amplitude, mean, stddev]: [f64; 3]) -> Self {
        Self {
            amplitude,
            mean,
            stddev,
        }
    }
}
impl From<Gaussian> for [f64; 3] {
    fn from(g: Gaussian) -> Self {
        [g.amplitude, g.mean, g.stddev]
    }
}

/// `amplitude * (1 + ((x - x_0) / gamma)^2)^(-alpha)`
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Moffat {
    pub amplitude: f64,
    pub x_0: f64,
    pub gamma: f64,
    pub alpha: f64,
}
impl Moffat {
    fn seed(peak: &Peak) -> Self {
        Self {
            amplitude: peak.value,
            x_0: peak.position,
            gamma: 1.,
            alpha: 1.,
        }
    }
    pub fn fwhm(&self) -> f64 {
        2. * self.gamma.abs() * (2f64.powf(1. / self.alpha) - 1.).sqrt()
    }
}
impl From<[f64; 4]> for Moffat {
    fn from([amplitude, x_0, gamma, alpha]: [f64; 4]) -> Self {
        Self {
            amplitude,
            x_0,
            gamma,
            alpha,
        }
    }
}
impl From<Moffat> for [f64; 4] {
    fn from(m: Moffat) -> Self {
        [m.amplitude, m.x_0, m.gamma, m.alpha]
    }
}

impl LineShape for Gaussian {
    fn params(&self) -> DVector<f64> {
        DVector::from_column_slice(&<[f64; 3]>::from(*self))
    }
    fn from_params(p: &DVector<f64>) -> Self {
        Self::from([p[0], p[1], p[2]])
    }
    fn eval(&self, x: f64) -> f64 {
        let u = (x - self.mean) / self.stddev;
        self.amplitude * (-0.5 * u * u).exp()
    }
    fn gradient(&self, x: f64) -> Vec<f64> {
        let Self {
            amplitude,
            mean,
            stddev,
        } = *self;
        let u = (x - mean) / stddev;
        let e = (-0.5 * u * u).exp();
        vec![e, amplitude * e * u / stddev, amplitude * e * u * u / stddev]
    }
}

impl LineShape for Moffat {
    fn params(&self) -> DVector<f64> {
        DVector::from_column_slice(&<[f64; 4]>::from(*self))
    }
    fn from_params(p: &DVector<f64>) -> Self {
        Self::from([p[0], p[1], p[2], p[3]])
    }
    fn eval(&self, x: f64) -> f64 {
        let u = (x - self.x_0) / self.gamma;
        self.amplitude * (1. + u * u).powf(-self.alpha)
    }
    fn gradient(&self, x: f64) -> Vec<f64> {
        let Self {
            amplitude,
            x_0,
            gamma,
            alpha,
        } = *self;
        let u = (x - x_0) / gamma;
        let b = 1. + u * u;
        let f = b.powf(-alpha);
        let g = 2. * amplitude * alpha * f / b;
        vec![f, g * u / gamma, g * u * u / gamma, -amplitude * f * b.ln()]
    }
}

/// Fitted line profile
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum FeatureFit {
    Gaussian(Gaussian),
    Moffat(Moffat),
}
impl FeatureFit {
    /// Full width at half maximum, `NaN` for a degenerate fit
    pub fn fwhm(&self) -> f64 {
        match self {
            FeatureFit::Gaussian(g) => g.fwhm(),
            FeatureFit::Moffat(m) => m.fwhm(),
        }
    }
    pub fn eval(&self, x: f64) -> f64 {
        match self {
            FeatureFit::Gaussian(g) => g.eval(x),
            FeatureFit::Moffat(m) => m.eval(x),
        }
    }
}
impl fmt::Display for FeatureFit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FeatureFit::Gaussian(g) => write!(
                f,
                "Gaussian(amplitude={:.3}, mean={:.3}, stddev={:.3})",
                g.amplitude, g.mean, g.stddev
            ),
            FeatureFit::Moffat(m) => write!(
                f,
                "Moffat(amplitude={:.3}, x_0={:.3}, gamma={:.3}, alpha={:.3})",
                m.amplitude, m.x_0, m.gamma, m.alpha
            ),
        }
    }
}

/// Combines the FWHM of the lines of an image
///
/// A single value is returned as is; otherwise the values are 3-sigma clipped
/// once and the mean of the survivors is returned.
pub fn aggregate_fwhm(values: &[f64]) -> Option<f64> {
    if let [fwhm] = values {
        log::info!("Returning single FWHM value: {}", fwhm);
        return Some(*fwhm);
    }
    log::info!(
        "Applying sigma clipping to collected FWHM values. SIGMA: {}, ITERATIONS: {}",
        FWHM_SIGMA,
        FWHM_ITERATIONS
    );
    let clipped = SigmaClip::new(FWHM_SIGMA, FWHM_ITERATIONS).clip(values);
    match clipped.n_rejected() {
        0 => log::debug!("No FWHM value was discarded."),
        n => {
            log::info!("Discarded {} FWHM values", n);
            clipped
                .rejected()
                .for_each(|fwhm| log::debug!("FWHM {} discarded", fwhm));
        }
    }
    let kept = clipped.kept_values();
    if kept.is_empty() {
        log::error!("Unable to obtain usable FWHM value");
        return None;
    }
    log::debug!("Remaining FWHM values: {}", kept.len());
    let mean = clipped.mean();
    log::debug!("Mean FWHM value {}", mean);
    Some(mean)
}

/// FWHM of an image from the lines detected in its profile
///
/// Fits yielding a non-finite FWHM are left out.
/// Returns `None` when no usable FWHM is left.
pub fn fit_fwhm(peaks: &[Peak], profile: &Profile, model: FeatureModel) -> Option<f64> {
    let config = LMConfig::default();
    let all_fwhm: Vec<f64> = peaks
        .iter()
        .filter_map(|peak| {
            let fit = model.fit(peak, profile, &config);
            let fwhm = fit.fwhm();
            if fwhm.is_finite() {
                Some(fwhm)
            } else {
                log::debug!("{} at {} yields no FWHM", fit, peak.position);
                None
            }
        })
        .collect();
    aggregate_fwhm(&all_fwhm)
}
