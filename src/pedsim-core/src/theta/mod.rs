//! Wright's F_ST / theta / f estimation (§4.5). The single-subpopulation
//! solve uses a QR least-squares fit via `nalgebra`; the multi-subpopulation
//! estimator is closed-form per Weir's GDA2 (pp. 168-179).

pub mod multi;
pub mod single;

#[derive(Debug, thiserror::Error)]
pub enum ThetaError {
    #[error("invalid argument: {0}")]
    InvalidArgument(String),
}

/// Non-fatal diagnostic result (§7): numeric failures and out-of-range
/// estimates are surfaced here rather than raised as errors.
#[derive(Debug, Clone, PartialEq)]
pub struct ThetaEstimate {
    pub estimate: f64,
    pub error: bool,
    pub details: String,
}

impl ThetaEstimate {
    fn ok(estimate: f64) -> Self {
        Self {
            estimate,
            error: false,
            details: "OK".into(),
        }
    }

    fn failed(estimate: f64, details: impl Into<String>) -> Self {
        Self {
            estimate,
            error: true,
            details: details.into(),
        }
    }
}
