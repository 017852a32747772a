//! Statistical helpers for goodness-of-fit reporting.

use crate::error::{ModelError, Result};
use statrs::distribution::{ChiSquared, ContinuousCDF};

/// Survival probability of the chi-squared distribution: the probability of
/// observing a statistic at least as large as `chi2` under `dof` degrees of
/// freedom.
pub fn chi2_survival(chi2: f64, dof: f64) -> Result<f64> {
    if dof <= 0.0 {
        return Err(ModelError::Computation(format!(
            "chi-squared degrees of freedom must be positive, got {}",
            dof
        )));
    }
    let dist = ChiSquared::new(dof).map_err(|e| {
        ModelError::Computation(format!("invalid chi-squared distribution: {}", e))
    })?;
    Ok(1.0 - dist.cdf(chi2))
}
