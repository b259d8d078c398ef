//! Share of sessions a sampled report is based on.
//!
//! The API reports `sampleSize` (sessions read) and `sampleSpace` (sessions
//! available). For `201000 / 220000` the report covers 91.36% of sessions.

use serde_json::Value;
use thiserror::Error;

#[derive(Debug, Error, PartialEq)]
pub enum SamplingError {
    #[error("`{0}` is missing")]
    Missing(&'static str),
    #[error("`{field}` is not numeric: {value}")]
    NotNumeric { field: &'static str, value: String },
    #[error("sample space is zero")]
    ZeroSpace,
    #[error("sample size {size} exceeds sample space {space}")]
    OutOfRange { size: f64, space: f64 },
}

/// Numeric value of a sampling field; the API sends these as strings.
pub fn numeric(field: &'static str, value: Option<&Value>) -> Result<f64, SamplingError> {
    let value = value
        .filter(|v| !v.is_null())
        .ok_or(SamplingError::Missing(field))?;
    let parsed = match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse::<f64>().ok(),
        _ => None,
    };
    parsed
        .filter(|n| n.is_finite())
        .ok_or_else(|| SamplingError::NotNumeric {
            field,
            value: value.to_string(),
        })
}

/// `round(size / space * 100, 2)`, in `[0, 100]`.
///
/// Callers fall back to `0.0` on any error; see [`percent_or_zero`].
pub fn sampling_percent(size: Option<&Value>, space: Option<&Value>) -> Result<f64, SamplingError> {
    let size = numeric("sampleSize", size)?;
    let space = numeric("sampleSpace", space)?;
    if space == 0.0 {
        return Err(SamplingError::ZeroSpace);
    }
    let ratio = size / space * 100.0;
    if !(0.0..=100.0).contains(&ratio) {
        return Err(SamplingError::OutOfRange { size, space });
    }
    Ok(round2(ratio))
}

/// Round to two decimals from the exact binary value, ties to even: `3.125`
/// becomes `3.12`.
pub fn round2(x: f64) -> f64 {
    format!("{:.2}", x).parse().unwrap_or(x)
}

/// The zero fallback: a report whose sampling stats cannot be used still loads.
pub fn percent_or_zero(size: Option<&Value>, space: Option<&Value>) -> f64 {
    sampling_percent(size, space).unwrap_or_else(|e| {
        tracing::debug!(error = %e, "sampling percentage unavailable, using 0");
        0.0
    })
}
