use std::{fmt, result::Result};

pub mod error;

use error::{PercentChangeValidationError, PriceBandValidationError};

/// Validated minimum premarket percent change used to derive a symbol's threshold price from its
/// initial price.
///
/// A value of `30` means the threshold sits 30% above the initial price.
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd)]
pub struct PercentChange(f64);

impl PercentChange {
    /// Minimum accepted percent change (exclusive lower bound is zero).
    pub const MIN: Self = Self(0.01);

    /// Maximum accepted percent change: 1000%.
    pub const MAX: Self = Self(1_000.);

    /// Returns the percent change as an `f64` (e.g. `30.0` for 30%).
    pub fn as_f64(&self) -> f64 {
        self.0
    }

    /// Scales `price` by `(1 + percent / 100)`.
    ///
    /// # Examples
    ///
    /// ```
    /// use premarket_perk::models::PercentChange;
    ///
    /// let change = PercentChange::try_from(30.).unwrap();
    /// assert!((change.apply(10.) - 13.).abs() < 1e-9);
    /// ```
    pub fn apply(&self, price: f64) -> f64 {
        price * (1. + self.0 / 100.)
    }
}

impl Default for PercentChange {
    fn default() -> Self {
        Self(30.)
    }
}

impl TryFrom<f64> for PercentChange {
    type Error = PercentChangeValidationError;

    fn try_from(value: f64) -> Result<Self, Self::Error> {
        if !value.is_finite() {
            return Err(PercentChangeValidationError::NotFinite);
        }

        if value < Self::MIN.0 {
            return Err(PercentChangeValidationError::TooLow);
        }

        if value > Self::MAX.0 {
            return Err(PercentChangeValidationError::TooHigh);
        }

        Ok(Self(value))
    }
}

impl TryFrom<u32> for PercentChange {
    type Error = PercentChangeValidationError;

    fn try_from(value: u32) -> Result<Self, Self::Error> {
        Self::try_from(value as f64)
    }
}

impl fmt::Display for PercentChange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}%", self.0)
    }
}

/// Open price interval `(lower, upper)` used to select symbols by close price.
///
/// Both bounds are exclusive: a close equal to either bound is outside the band.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PriceBand {
    lower: f64,
    upper: f64,
}

impl PriceBand {
    /// Creates a new price band. Bounds must be finite, non-negative and `lower < upper`.
    pub fn new(lower: f64, upper: f64) -> Result<Self, PriceBandValidationError> {
        if !lower.is_finite() || !upper.is_finite() {
            return Err(PriceBandValidationError::NotFinite);
        }

        if lower < 0. {
            return Err(PriceBandValidationError::NegativeLowerBound(lower));
        }

        if lower >= upper {
            return Err(PriceBandValidationError::EmptyInterval { lower, upper });
        }

        Ok(Self { lower, upper })
    }

    pub fn lower(&self) -> f64 {
        self.lower
    }

    pub fn upper(&self) -> f64 {
        self.upper
    }

    /// Returns `true` if `price` lies strictly between the bounds.
    pub fn contains(&self, price: f64) -> bool {
        price > self.lower && price < self.upper
    }
}

impl Default for PriceBand {
    fn default() -> Self {
        Self {
            lower: 0.8,
            upper: 20.,
        }
    }
}

impl fmt::Display for PriceBand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {})", self.lower, self.upper)
    }
}
