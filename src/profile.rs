//! Profile extraction
//!
//! A 2-D frame is collapsed into a 1-D profile along the columns by taking the
//! median of a band of rows around the middle of the detector.
//! The continuum is then modeled with a straight line fitted to the samples
//! that survive a 1-sigma clipping and removed from the profile.

use crate::{
    image::Image,
    stats::{self, Clipped, SigmaClip},
};
use nalgebra::{DMatrix, DVector};

/// Number of rows in the median band
pub const BAND_HEIGHT: usize = 100;
/// Background clipping threshold in standard deviations
pub const BACKGROUND_SIGMA: f64 = 1.;
/// Maximum number of background clipping passes
pub const BACKGROUND_ITERATIONS: usize = 5;

/// Linear continuum model `intercept + slope * x`
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct Background {
    pub slope: f64,
    pub intercept: f64,
}
impl Background {
    /// Flat background
    pub fn flat(level: f64) -> Self {
        Self {
            slope: 0.,
            intercept: level,
        }
    }
    pub fn eval(&self, x: f64) -> f64 {
        self.intercept + self.slope * x
    }
    /// Least-squares line through the samples kept by the clipping
    ///
    /// With fewer than 2 samples, or all of them at the same abscissa, the
    /// problem is ill-posed and a flat background at the mean level is returned.
    pub fn fit(x_axis: &[f64], clipped: &Clipped) -> Self {
        let (x, y): (Vec<f64>, Vec<f64>) = clipped.kept().map(|(i, y)| (x_axis[i], y)).unzip();
        let level = if y.is_empty() { 0. } else { stats::mean(&y) };
        if x.len() < 2 || stats::std(&x) == 0. {
            log::debug!("degenerate background, using flat level {}", level);
            return Self::flat(level);
        }
        let a = DMatrix::from_fn(x.len(), 2, |i, j| if j == 0 { x[i] } else { 1. });
        let b = DVector::from_vec(y);
        match a.svd(true, true).solve(&b, 1e-12) {
            Ok(p) if p.iter().all(|p| p.is_finite()) => Self {
                slope: p[0],
                intercept: p[1],
            },
            _ => {
                log::debug!("background fit failed, using flat level {}", level);
                Self::flat(level)
            }
        }
    }
}

/// Background-subtracted 1-D profile of an [Image]
#[derive(Debug, Clone, Default)]
pub struct Profile {
    /// Pixel positions `0..N`
    pub x_axis: Vec<f64>,
    /// Median of the central band of rows
    pub raw: Vec<f64>,
    /// Raw profile with the samples rejected from the background fit masked
    pub clipped: Clipped,
    pub background: Background,
    /// Raw profile minus background
    pub data: Vec<f64>,
}
impl Profile {
    pub fn len(&self) -> usize {
        self.data.len()
    }
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }
    /// Background model evaluated along the x axis
    pub fn background_curve(&self) -> Vec<f64> {
        self.x_axis.iter().map(|&x| self.background.eval(x)).collect()
    }
}

/// Rows `[low, high)` of the median band, clamped to the frame
fn band(n_rows: usize) -> (usize, usize) {
    let center = n_rows / 2;
    let half = BAND_HEIGHT / 2;
    (center.saturating_sub(half), (center + half).min(n_rows))
}

/// Median of the central band of rows, one sample per column
pub fn median_profile(data: &DMatrix<f64>) -> Vec<f64> {
    let (low, high) = band(data.nrows());
    (0..data.ncols())
        .map(|col| {
            let column: Vec<f64> = data.column(col).rows_range(low..high).iter().copied().collect();
            stats::median(&column)
        })
        .collect()
}

/// Extracts the background-subtracted profile of an image
pub fn extract_profile(image: &Image) -> Profile {
    let raw = median_profile(&image.data);
    let x_axis: Vec<f64> = (0..raw.len()).map(|i| i as f64).collect();
    let clipped = SigmaClip::new(BACKGROUND_SIGMA, BACKGROUND_ITERATIONS).clip(&raw);
    let background = Background::fit(&x_axis, &clipped);
    let data = raw
        .iter()
        .zip(&x_axis)
        .map(|(y, &x)| y - background.eval(x))
        .collect();
    Profile {
        x_axis,
        raw,
        clipped,
        background,
        data,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn frame(n_rows: usize, n_cols: usize, f: impl Fn(usize, usize) -> f64) -> Image {
        Image::new(DMatrix::from_fn(n_rows, n_cols, f), 0.)
    }

    #[test]
    fn band_limits() {
        assert_eq!(band(400), (150, 250));
        assert_eq!(band(60), (0, 60));
        assert_eq!(band(0), (0, 0));
    }

    #[test]
    fn median_rejects_hot_pixels() {
        let image = frame(200, 10, |i, j| if i == 100 { 1e6 } else { j as f64 });
        let raw = median_profile(&image.data);
        assert_eq!(raw, (0..10).map(|j| j as f64).collect::<Vec<_>>());
    }

    #[test]
    fn removes_linear_continuum() {
        // line on the bright end of the ramp: its wings never fall back
        // inside the clipping window around the median
        let image = frame(120, 300, |_, j| {
            let x = j as f64;
            50. + 0.2 * x + 500. * (-0.5 * ((x - 280.) / 3.).powi(2)).exp()
        });
        let profile = extract_profile(&image);
        assert_eq!(profile.len(), 300);
        assert!((profile.background.slope - 0.2).abs() < 1e-6);
        assert!((profile.background.intercept - 50.).abs() < 1e-4);
        assert!(profile.data[10].abs() < 1e-4);
        assert!((profile.data[280] - 500.).abs() < 1e-3);
        assert!(profile.clipped.mask[280]);
        assert!(profile.clipped.kept().all(|(i, _)| i < 265));
    }

    #[test]
    fn line_wings_inside_the_window_bias_the_continuum() {
        // the wings of a line close to the median level survive the 1-sigma
        // clipping and pull the continuum fit
        let image = frame(120, 300, |_, j| {
            let x = j as f64;
            50. + 0.2 * x + 500. * (-0.5 * ((x - 60.) / 3.).powi(2)).exp()
        });
        let profile = extract_profile(&image);
        assert!(profile.clipped.mask[60]);
        assert!(profile.background.slope < 0.2);
    }

    #[test]
    fn featureless_profile_is_flat_background() {
        let image = frame(100, 50, |_, _| 7.);
        let profile = extract_profile(&image);
        assert!(profile.background.slope.abs() < 1e-9);
        assert!((profile.background.intercept - 7.).abs() < 1e-9);
        assert!(profile.data.iter().all(|y| y.abs() < 1e-9));
    }

    #[test]
    fn single_column_is_degenerate() {
        let image = frame(100, 1, |_, _| 3.);
        let profile = extract_profile(&image);
        assert_eq!(profile.background.slope, 0.);
        assert_eq!(profile.data, vec![0.]);
    }
}
