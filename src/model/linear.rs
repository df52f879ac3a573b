//! Ordinary least-squares line fit

use crate::{ProjectionError, Result};
use serde::{Deserialize, Serialize};

/// Minimum number of points for a meaningful line
pub const MIN_FIT_POINTS: usize = 2;

/// Fitted line `f(x) = slope * x + intercept`
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ProjectionModel {
    pub slope: f64,
    pub intercept: f64,
    /// Coefficient of determination on the training points
    pub r_squared: f64,
    /// Number of games the line was fitted on
    pub games: usize,
}

impl ProjectionModel {
    /// Fit a line through `(xs[i], ys[i])` by ordinary least squares
    pub fn fit(xs: &[f64], ys: &[f64]) -> Result<Self> {
        if xs.len() != ys.len() {
            return Err(ProjectionError::Fit(format!(
                "{} inputs but {} targets",
                xs.len(),
                ys.len()
            )));
        }
        let n = xs.len();
        if n < MIN_FIT_POINTS {
            return Err(ProjectionError::InsufficientData {
                games: n,
                required: MIN_FIT_POINTS,
            });
        }

        let mean_x = xs.iter().sum::<f64>() / n as f64;
        let mean_y = ys.iter().sum::<f64>() / n as f64;

        let mut sxx = 0.0;
        let mut sxy = 0.0;
        let mut syy = 0.0;
        for (x, y) in xs.iter().zip(ys) {
            let dx = x - mean_x;
            let dy = y - mean_y;
            sxx += dx * dx;
            sxy += dx * dy;
            syy += dy * dy;
        }

        if !sxx.is_finite() || sxx <= 0.0 {
            return Err(ProjectionError::Fit("inputs have no variance".to_string()));
        }

        let slope = sxy / sxx;
        let intercept = mean_y - slope * mean_x;

        // A flat target is fitted exactly by a flat line
        let r_squared = if syy > 0.0 { (sxy * sxy) / (sxx * syy) } else { 1.0 };

        let model = ProjectionModel {
            slope,
            intercept,
            r_squared,
            games: n,
        };
        if !model.is_finite() {
            return Err(ProjectionError::Fit("non-finite coefficients".to_string()));
        }
        Ok(model)
    }

    pub fn evaluate(&self, x: f64) -> f64 {
        self.slope * x + self.intercept
    }

    pub fn is_finite(&self) -> bool {
        self.slope.is_finite() && self.intercept.is_finite()
    }
}
