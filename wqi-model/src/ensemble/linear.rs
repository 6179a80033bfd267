//! Ordinary least squares with intercept
//!
//! Columns are centered so the intercept falls out of the means; the centered
//! normal equations get a tiny relative ridge term on the diagonal and are
//! solved by Gaussian elimination with partial pivoting. Constant columns get
//! a zero coefficient.

use crate::error::{ModelError, ModelResult};
use serde::{Deserialize, Serialize};

const RIDGE: f64 = 1e-8;
const PIVOT_EPS: f64 = 1e-12;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LinearRegression {
    pub intercept: f64,
    pub coefficients: Vec<f64>,
}

impl LinearRegression {
    pub fn fit(x: &[Vec<f64>], y: &[f64]) -> ModelResult<Self> {
        let n = x.len();
        if n == 0 || n != y.len() {
            return Err(ModelError::InsufficientData(format!(
                "linear fit needs matching non-empty inputs (x: {}, y: {})",
                n,
                y.len()
            )));
        }
        let p = x[0].len();
        if x.iter().any(|row| row.len() != p) {
            return Err(ModelError::InvalidFeature("ragged design matrix".to_string()));
        }

        let mut x_mean = vec![0.0; p];
        for row in x {
            for (m, v) in x_mean.iter_mut().zip(row) {
                *m += v;
            }
        }
        x_mean.iter_mut().for_each(|m| *m /= n as f64);
        let y_mean = y.iter().sum::<f64>() / n as f64;

        // Augmented [XᵀX | Xᵀy] on centered data
        let mut a = vec![vec![0.0; p + 1]; p];
        for (row, &target) in x.iter().zip(y) {
            let yc = target - y_mean;
            for i in 0..p {
                let xi = row[i] - x_mean[i];
                for j in i..p {
                    a[i][j] += xi * (row[j] - x_mean[j]);
                }
                a[i][p] += xi * yc;
            }
        }
        for i in 0..p {
            for j in 0..i {
                a[i][j] = a[j][i];
            }
        }

        // Zero-variance columns carry no signal; pin them at 0
        let active: Vec<usize> = (0..p).filter(|&i| a[i][i] > PIVOT_EPS).collect();
        let mut reduced: Vec<Vec<f64>> = active
            .iter()
            .map(|&i| {
                let mut row: Vec<f64> = active.iter().map(|&j| a[i][j]).collect();
                row.push(a[i][p]);
                row
            })
            .collect();
        for (k, row) in reduced.iter_mut().enumerate() {
            row[k] += RIDGE * row[k];
        }

        let mut coefficients = vec![0.0; p];
        for (&i, beta) in active.iter().zip(solve(reduced)?) {
            coefficients[i] = beta;
        }
        let intercept = y_mean - coefficients.iter().zip(&x_mean).map(|(c, m)| c * m).sum::<f64>();
        Ok(Self { intercept, coefficients })
    }

    pub fn predict(&self, row: &[f64]) -> f64 {
        self.intercept + self.coefficients.iter().zip(row).map(|(c, v)| c * v).sum::<f64>()
    }

    pub fn validate(&self, n_inputs: usize) -> ModelResult<()> {
        if self.coefficients.len() != n_inputs {
            return Err(ModelError::Artifact(format!(
                "meta-learner has {} coefficients, expected {}",
                self.coefficients.len(),
                n_inputs
            )));
        }
        if !self.intercept.is_finite() || self.coefficients.iter().any(|c| !c.is_finite()) {
            return Err(ModelError::Artifact("meta-learner weights are not finite".to_string()));
        }
        Ok(())
    }
}

/// Solve an augmented `p x (p+1)` system in place
fn solve(mut a: Vec<Vec<f64>>) -> ModelResult<Vec<f64>> {
    let p = a.len();
    for col in 0..p {
        let pivot = (col..p)
            .max_by(|&r, &s| a[r][col].abs().total_cmp(&a[s][col].abs()))
            .unwrap_or(col);
        if !(a[pivot][col].abs() > PIVOT_EPS) {
            return Err(ModelError::SingularSystem);
        }
        a.swap(col, pivot);
        for r in (col + 1)..p {
            let factor = a[r][col] / a[col][col];
            if factor != 0.0 {
                for c in col..=p {
                    a[r][c] -= factor * a[col][c];
                }
            }
        }
    }

    let mut beta = vec![0.0; p];
    for i in (0..p).rev() {
        let tail: f64 = ((i + 1)..p).map(|j| a[i][j] * beta[j]).sum();
        beta[i] = (a[i][p] - tail) / a[i][i];
    }
    if beta.iter().any(|b| !b.is_finite()) {
        return Err(ModelError::SingularSystem);
    }
    Ok(beta)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_recovers_exact_linear_relation() {
        let x: Vec<Vec<f64>> = (0..30).map(|i| vec![i as f64, ((i * i) % 13) as f64]).collect();
        let y: Vec<f64> = x.iter().map(|r| 2.0 * r[0] - 0.5 * r[1] + 4.0).collect();
        let model = LinearRegression::fit(&x, &y).unwrap();
        assert!((model.intercept - 4.0).abs() < 1e-4);
        assert!((model.coefficients[0] - 2.0).abs() < 1e-6);
        assert!((model.coefficients[1] + 0.5).abs() < 1e-6);
        assert!((model.predict(&[10.0, 2.0]) - 23.0).abs() < 1e-4);
    }

    #[test]
    fn test_collinear_columns_still_solve_with_ridge() {
        let x: Vec<Vec<f64>> = (0..20).map(|i| vec![i as f64, 2.0 * i as f64]).collect();
        let y: Vec<f64> = (0..20).map(|i| 3.0 * i as f64).collect();
        let model = LinearRegression::fit(&x, &y).unwrap();
        assert!((model.predict(&[5.0, 10.0]) - 15.0).abs() < 1e-3);
    }

    #[test]
    fn test_constant_column_gets_zero_weight() {
        let x: Vec<Vec<f64>> = (0..10).map(|i| vec![1.0, i as f64]).collect();
        let y: Vec<f64> = (0..10).map(|i| 2.0 * i as f64 + 1.0).collect();
        let model = LinearRegression::fit(&x, &y).unwrap();
        assert_eq!(model.coefficients[0], 0.0);
        assert!((model.coefficients[1] - 2.0).abs() < 1e-6);
        assert!((model.intercept - 1.0).abs() < 1e-5);
    }

    #[test]
    fn test_singular_system_detected() {
        let a = vec![vec![1.0, 2.0, 3.0], vec![2.0, 4.0, 6.0]];
        assert!(matches!(solve(a), Err(ModelError::SingularSystem)));
    }

    #[test]
    fn test_empty_input_rejected() {
        assert!(LinearRegression::fit(&[], &[]).is_err());
    }
}
