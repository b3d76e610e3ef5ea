//! Line shape fitting with the Levenberg-Marquardt solver
//!
//! A [LineShape] is fitted to the samples `(x, y)` by minimizing the sum of
//! the squared residuals `f(x; p) - y` with the analytic Jacobian of the shape.

use levenberg_marquardt::{LeastSquaresProblem, LevenbergMarquardt};
use nalgebra::{storage::Owned, DMatrix, DVector, Dyn};

/// Solver settings
#[derive(Debug, Clone)]
pub struct LMConfig {
    /// Relative sum-of-squares decrease below which the fit has converged
    pub ftol: f64,
    /// Relative parameter change below which the fit has converged
    pub xtol: f64,
    /// Orthogonality between residuals and Jacobian columns
    pub gtol: f64,
    /// The solver stops after `patience * (n_params + 1)` evaluations
    pub patience: usize,
}
impl Default for LMConfig {
    fn default() -> Self {
        Self {
            ftol: 1.49012e-8,
            xtol: 1.49012e-8,
            gtol: 0.,
            patience: 100,
        }
    }
}

/// 1-D parametric line shape
pub trait LineShape: Sized {
    fn params(&self) -> DVector<f64>;
    fn from_params(params: &DVector<f64>) -> Self;
    fn eval(&self, x: f64) -> f64;
    /// Partial derivatives of the shape with respect to each parameter
    fn gradient(&self, x: f64) -> Vec<f64>;
}

/// Least-squares problem of a shape over a set of samples
struct LineFit<'a, S: LineShape> {
    x: &'a [f64],
    y: &'a [f64],
    shape: S,
}
impl<S: LineShape> LeastSquaresProblem<f64, Dyn, Dyn> for LineFit<'_, S> {
    type ResidualStorage = Owned<f64, Dyn>;
    type JacobianStorage = Owned<f64, Dyn, Dyn>;
    type ParameterStorage = Owned<f64, Dyn>;

    fn set_params(&mut self, params: &DVector<f64>) {
        self.shape = S::from_params(params);
    }

    fn params(&self) -> DVector<f64> {
        self.shape.params()
    }

    fn residuals(&self) -> Option<DVector<f64>> {
        Some(DVector::from_iterator(
            self.x.len(),
            self.x
                .iter()
                .zip(self.y)
                .map(|(&x, &y)| self.shape.eval(x) - y),
        ))
    }

    fn jacobian(&self) -> Option<DMatrix<f64>> {
        let n_params = self.shape.params().len();
        Some(DMatrix::from_row_iterator(
            self.x.len(),
            n_params,
            self.x.iter().flat_map(|&x| self.shape.gradient(x)),
        ))
    }
}

/// Outcome of [fit]
#[derive(Debug, Clone)]
pub struct LMResult<S> {
    pub shape: S,
    /// Half the sum of the squared residuals
    pub objective: f64,
    pub evaluations: usize,
    pub converged: bool,
}

/// Fits `shape` to the samples `(x, y)`, `shape` being the initial guess
pub fn fit<S: LineShape>(shape: S, x: &[f64], y: &[f64], config: &LMConfig) -> LMResult<S> {
    let (problem, report) = LevenbergMarquardt::new()
        .with_ftol(config.ftol)
        .with_xtol(config.xtol)
        .with_gtol(config.gtol)
        .with_patience(config.patience.max(1))
        .minimize(LineFit { x, y, shape });
    let converged = report.termination.was_successful();
    if !converged {
        log::debug!(
            "Levenberg-Marquardt stopped after {} evaluations: {:?}",
            report.number_of_evaluations,
            report.termination
        );
    }
    LMResult {
        shape: problem.shape,
        objective: report.objective_function,
        evaluations: report.number_of_evaluations,
        converged,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// y = a * exp(b * x)
    #[derive(Debug, Clone, Copy)]
    struct Exponential {
        a: f64,
        b: f64,
    }
    impl LineShape for Exponential {
        fn params(&self) -> DVector<f64> {
            DVector::from_column_slice(&[self.a, self.b])
        }
        fn from_params(params: &DVector<f64>) -> Self {
            Self {
                a: params[0],
                b: params[1],
            }
        }
        fn eval(&self, x: f64) -> f64 {
            self.a * (self.b * x).exp()
        }
        fn gradient(&self, x: f64) -> Vec<f64> {
            let e = (self.b * x).exp();
            vec![e, self.a * x * e]
        }
    }

    #[test]
    fn fit_exponential() {
        let x: Vec<f64> = (0..50).map(|i| i as f64 * 0.1).collect();
        let y: Vec<f64> = x.iter().map(|x| 3. * (-0.7 * x).exp()).collect();
        let result = fit(Exponential { a: 1., b: -0.1 }, &x, &y, &LMConfig::default());
        assert!(result.converged, "{:?}", result);
        assert!((result.shape.a - 3.).abs() < 1e-6);
        assert!((result.shape.b + 0.7).abs() < 1e-6);
        assert!(result.objective < 1e-12);
    }

    #[test]
    fn exact_start_stays_put() {
        let x: Vec<f64> = (0..10).map(|i| i as f64).collect();
        let y: Vec<f64> = x.iter().map(|x| 2. * (0.1 * x).exp()).collect();
        let result = fit(Exponential { a: 2., b: 0.1 }, &x, &y, &LMConfig::default());
        assert!((result.shape.a - 2.).abs() < 1e-10);
        assert!((result.shape.b - 0.1).abs() < 1e-10);
    }

    #[test]
    fn jacobian_layout() {
        let x = [0., 1., 2.];
        let y = [0.; 3];
        let problem = LineFit {
            x: &x,
            y: &y,
            shape: Exponential { a: 2., b: 0. },
        };
        let jacobian = problem.jacobian().unwrap();
        assert_eq!(jacobian.shape(), (3, 2));
        assert_eq!(jacobian[(2, 0)], 1.);
        assert_eq!(jacobian[(2, 1)], 4.);
        assert_eq!(problem.residuals().unwrap(), DVector::from_element(3, 2.));
    }
}
