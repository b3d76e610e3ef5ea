//! Line detection in a background-subtracted profile

use crate::profile::Profile;

/// Fraction of the profile maximum above the profile minimum that a sample
/// must exceed to be considered part of a line
pub const THRESHOLD_FRACTION: f64 = 0.03;
/// Number of samples on each side a local maximum must dominate
pub const ORDER: usize = 5;

/// Local maximum of a profile
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Peak {
    /// Sample index in the profile
    pub index: usize,
    /// Abscissa of the sample, `x_axis[index]`
    pub position: f64,
    /// Background-subtracted intensity at `index`
    pub value: f64,
}

/// Zeroes the samples that do not exceed `min + THRESHOLD_FRACTION * max`
pub fn threshold(data: &[f64]) -> Vec<f64> {
    let min = data.iter().cloned().fold(f64::INFINITY, f64::min);
    let max = data.iter().cloned().fold(f64::NEG_INFINITY, f64::max);
    let limit = min + THRESHOLD_FRACTION * max;
    data.iter()
        .map(|&y| if y > limit { y } else { 0. })
        .collect()
}

/// Indices of the samples strictly greater than their `order` neighbors on both sides
///
/// Neighbor indices falling outside the data are clamped to the first or last
/// sample so the end points are never maxima.
pub fn local_maxima(data: &[f64], order: usize) -> Vec<usize> {
    let n = data.len();
    (0..n)
        .filter(|&i| {
            (1..=order).all(|k| {
                let left = i.saturating_sub(k);
                let right = (i + k).min(n - 1);
                data[i] > data[left] && data[i] > data[right]
            })
        })
        .collect()
}

/// Finds the lines of a profile
pub fn find_peaks(profile: &Profile) -> Vec<Peak> {
    let filtered = threshold(&profile.data);
    let peaks: Vec<Peak> = local_maxima(&filtered, ORDER)
        .into_iter()
        .map(|index| Peak {
            index,
            position: profile.x_axis[index],
            value: profile.data[index],
        })
        .collect();
    match peaks.len() {
        1 => log::debug!("Found 1 peak in file"),
        n => log::debug!("Found {} peaks in file", n),
    }
    peaks
}
