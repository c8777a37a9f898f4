use derive_more::{
    Add, AddAssign, Display, Div, DivAssign, From, Into, Mul, MulAssign, Neg,
    Sub, SubAssign, Sum,
};
use serde::{Deserialize, Serialize};

/// Unit used for terrain height, planet radius, and physical path lengths.
/// Heights are relative to sea level, so a negative value is underwater.
#[derive(
    Copy,
    Clone,
    Debug,
    Default,
    Display,
    PartialEq,
    PartialOrd,
    From,
    Into,
    Neg,
    Add,
    Sub,
    Mul,
    Div,
    AddAssign,
    SubAssign,
    MulAssign,
    DivAssign,
    Sum,
    Serialize,
    Deserialize,
)]
#[display(fmt = "{} m", "self.0")]
pub struct Meter(pub f64);

impl Meter {
    /// Sea level. Anything strictly below this is ocean.
    pub const SEA_LEVEL: Self = Self(0.0);

    /// Is this height underwater?
    pub fn is_underwater(self) -> bool {
        self < Self::SEA_LEVEL
    }

    /// Absolute value, e.g. for the magnitude of a height delta
    pub fn abs(self) -> Self {
        Self(self.0.abs())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_underwater() {
        assert!(Meter(-0.1).is_underwater());
        assert!(!Meter(0.0).is_underwater());
        assert!(!Meter(1200.0).is_underwater());
    }

    #[test]
    fn test_display() {
        assert_eq!(Meter(12.5).to_string(), "12.5 m");
        assert_eq!((Meter(-3.0) - Meter(4.0)).abs(), Meter(7.0));
    }
}
