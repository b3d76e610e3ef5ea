//! Descriptive statistics and sigma-clipping

/// Arithmetic mean, `NaN` for an empty sample
pub fn mean(data: &[f64]) -> f64 {
    data.iter().sum::<f64>() / data.len() as f64
}

/// Population standard deviation (`ddof = 0`)
pub fn std(data: &[f64]) -> f64 {
    let n = data.len() as f64;
    let mean = mean(data);
    (data.iter().map(|x| x - mean).fold(0f64, |s, x| s + x * x) / n).sqrt()
}

/// Median, `NaN` for an empty sample
///
/// An even number of samples returns the average of the two middle values.
pub fn median(data: &[f64]) -> f64 {
    if data.is_empty() {
        return f64::NAN;
    }
    let mut sorted = data.to_vec();
    sorted.sort_by(|a, b| a.total_cmp(b));
    let n = sorted.len();
    if n % 2 == 1 {
        sorted[n / 2]
    } else {
        0.5 * (sorted[n / 2 - 1] + sorted[n / 2])
    }
}

/// Iterative sigma-clipping
///
/// At each iteration the median and the standard deviation of the samples
/// still in play are computed and every sample further than `sigma` standard
/// deviations from the median is masked.
/// Clipping stops after `iterations` passes or as soon as a pass masks nothing.
#[derive(Debug, Clone, Copy)]
pub struct SigmaClip {
    pub sigma: f64,
    pub iterations: usize,
}
impl SigmaClip {
    pub fn new(sigma: f64, iterations: usize) -> Self {
        Self { sigma, iterations }
    }
    /// Returns the clipped sample
    pub fn clip(&self, data: &[f64]) -> Clipped {
        let mut mask = vec![false; data.len()];
        for _ in 0..self.iterations {
            let kept: Vec<f64> = data
                .iter()
                .zip(&mask)
                .filter_map(|(&x, &m)| (!m).then_some(x))
                .collect();
            if kept.is_empty() {
                break;
            }
            let center = median(&kept);
            let limit = self.sigma * std(&kept);
            let mut changed = false;
            for (x, m) in data.iter().zip(mask.iter_mut()).filter(|(_, m)| !**m) {
                if (x - center).abs() > limit {
                    *m = true;
                    changed = true;
                }
            }
            if !changed {
                break;
            }
        }
        Clipped {
            data: data.to_vec(),
            mask,
        }
    }
}

/// A sample together with its clipping mask (`true` means rejected)
#[derive(Debug, Clone, Default)]
pub struct Clipped {
    pub data: Vec<f64>,
    pub mask: Vec<bool>,
}
impl Clipped {
    /// Iterator over the `(index, value)` pairs that survived clipping
    pub fn kept(&self) -> impl Iterator<Item = (usize, f64)> + '_ {
        self.data
            .iter()
            .zip(&self.mask)
            .enumerate()
            .filter_map(|(i, (&x, &m))| (!m).then_some((i, x)))
    }
    /// Iterator over the rejected values
    pub fn rejected(&self) -> impl Iterator<Item = f64> + '_ {
        self.data
            .iter()
            .zip(&self.mask)
            .filter_map(|(&x, &m)| m.then_some(x))
    }
    pub fn kept_values(&self) -> Vec<f64> {
        self.kept().map(|(_, x)| x).collect()
    }
    pub fn n_rejected(&self) -> usize {
        self.mask.iter().filter(|&&m| m).count()
    }
    /// Mean of the surviving values
    pub fn mean(&self) -> f64 {
        mean(&self.kept_values())
    }
}
