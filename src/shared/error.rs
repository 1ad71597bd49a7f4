use thiserror::Error;

use super::PercentChange;

#[derive(Error, Debug)]
pub enum PercentChangeValidationError {
    #[error("Invalid percent change, must be a finite number")]
    NotFinite,

    #[error("Invalid percent change, must be at least {}", PercentChange::MIN)]
    TooLow,

    #[error("Invalid percent change, must be at most {}", PercentChange::MAX)]
    TooHigh,
}

#[derive(Error, Debug)]
pub enum PriceBandValidationError {
    #[error("Invalid price band, bounds must be finite numbers")]
    NotFinite,

    #[error("Invalid price band, lower bound {0} is negative")]
    NegativeLowerBound(f64),

    #[error("Invalid price band, lower bound {lower} must be below upper bound {upper}")]
    EmptyInterval { lower: f64, upper: f64 },
}
