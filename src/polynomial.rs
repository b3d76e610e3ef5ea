use nalgebra::{DMatrix, DVector};
use std::fmt;

/// Least-squares polynomial
///
/// The abscissa is mapped from `domain` onto `[-1, 1]` before the powers are
/// taken, the coefficients apply to the mapped variable.
#[derive(Debug, Clone, PartialEq)]
pub struct Polynomial {
    /// Coefficients in increasing power order
    pub coefficients: Vec<f64>,
    pub domain: (f64, f64),
}
impl Polynomial {
    fn map(&self, x: f64) -> f64 {
        let (a, b) = self.domain;
        (2. * x - (a + b)) / (b - a)
    }
    pub fn degree(&self) -> usize {
        self.coefficients.len().saturating_sub(1)
    }
    /// Fits a polynomial of the given degree to the samples
    ///
    /// Returns `None` with fewer than `degree + 1` samples, when all abscissas
    /// are equal or when the least-squares problem cannot be solved.
    pub fn fit(x: &[f64], y: &[f64], degree: usize) -> Option<Self> {
        if x.len() != y.len() || x.len() <= degree {
            return None;
        }
        let min = x.iter().cloned().fold(f64::INFINITY, f64::min);
        let max = x.iter().cloned().fold(f64::NEG_INFINITY, f64::max);
        if !(max > min) {
            return None;
        }
        let mut this = Self {
            coefficients: vec![0.; degree + 1],
            domain: (min, max),
        };
        let t: Vec<f64> = x.iter().map(|&x| this.map(x)).collect();
        let vandermonde = DMatrix::from_fn(x.len(), degree + 1, |i, j| t[i].powi(j as i32));
        let coefficients = vandermonde
            .svd(true, true)
            .solve(&DVector::from_column_slice(y), 1e-12)
            .ok()?;
        if !coefficients.iter().all(|c| c.is_finite()) {
            return None;
        }
        this.coefficients = coefficients.iter().copied().collect();
        Some(this)
    }
    /// Evaluates the polynomial (Horner's scheme)
    pub fn eval(&self, x: f64) -> f64 {
        let t = self.map(x);
        self.coefficients.iter().rev().fold(0., |s, c| s * t + c)
    }
}
impl fmt::Display for Polynomial {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let terms: Vec<String> = self
            .coefficients
            .iter()
            .enumerate()
            .map(|(k, c)| match k {
                0 => format!("{:.6}", c),
                1 => format!("{:+.6} t", c),
                _ => format!("{:+.6} t^{}", c, k),
            })
            .collect();
        write!(
            f,
            "{} with t = (2x - {}) / {}",
            terms.join(" "),
            self.domain.0 + self.domain.1,
            self.domain.1 - self.domain.0
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn recovers_cubic() {
        let x: Vec<f64> = (0..20).map(|i| -500. + 50. * i as f64).collect();
        let f = |x: f64| 3. - 2e-2 * x + 1e-5 * x * x + 4e-9 * x * x * x;
        let y: Vec<f64> = x.iter().map(|&x| f(x)).collect();
        let p = Polynomial::fit(&x, &y, 5).unwrap();
        assert_eq!(p.degree(), 5);
        for x in [-500., -123., 0., 321., 450.] {
            assert!((p.eval(x) - f(x)).abs() < 1e-8, "{}: {} vs {}", x, p.eval(x), f(x));
        }
    }

    #[test]
    fn underdetermined() {
        assert!(Polynomial::fit(&[0., 1., 2.], &[1., 2., 3.], 3).is_none());
        assert!(Polynomial::fit(&[1., 1., 1.], &[1., 2., 3.], 1).is_none());
        assert!(Polynomial::fit(&[0., 1.], &[1.], 0).is_none());
    }

    #[test]
    fn straight_line() {
        let p = Polynomial::fit(&[0., 1., 2., 3.], &[1., 3., 5., 7.], 1).unwrap();
        assert!((p.eval(10.) - 21.).abs() < 1e-10);
    }
}
