use serde::{Deserialize, Serialize};

use super::super::rule::ScaleRange;

/// Maturity rung a score maps to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MaturityLevel {
    Initial,
    Managed,
    Defined,
    QuantitativelyManaged,
    Optimizing,
}

impl MaturityLevel {
    pub const fn ordered() -> [Self; 5] {
        [
            Self::Initial,
            Self::Managed,
            Self::Defined,
            Self::QuantitativelyManaged,
            Self::Optimizing,
        ]
    }

    pub const fn label(self) -> &'static str {
        match self {
            Self::Initial => "Initial",
            Self::Managed => "Managed",
            Self::Defined => "Defined",
            Self::QuantitativelyManaged => "Quantitatively Managed",
            Self::Optimizing => "Optimizing",
        }
    }

    /// Breakpoints are fractions of `scale`, so rules with different ranges map consistently.
    pub fn from_score(score: f64, scale: ScaleRange, breakpoints: &[f64; 4]) -> Self {
        let fraction = scale.fraction_of(score);
        let rung = breakpoints
            .iter()
            .take_while(|&&breakpoint| fraction >= breakpoint)
            .count();
        Self::ordered()[rung]
    }
}
