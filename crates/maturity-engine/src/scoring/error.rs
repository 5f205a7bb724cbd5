use super::rule::RuleId;
use super::taxonomy::TaxonomyInconsistency;

/// The scoring rule cannot drive a calculation.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ConfigurationError {
    #[error("scoring rule {0} does not exist")]
    MissingRule(RuleId),
    #[error("no default scoring rule is configured")]
    NoDefaultRule,
    #[error("scoring rule {existing} is already the default; clear it before adding {candidate}")]
    MultipleDefaults { existing: RuleId, candidate: RuleId },
    #[error("scoring rule {0} already exists")]
    DuplicateRule(RuleId),
    #[error("unknown aggregation method '{0}'")]
    UnknownMethod(String),
    #[error("unknown answered-metric mode '{0}'")]
    UnknownAnsweredMode(String),
    #[error("invalid topic scale [{min}, {max}]: min must be below max")]
    InvalidScale { min: f64, max: f64 },
    #[error("metric max level must be at least 1")]
    InvalidMetricMaxLevel,
    #[error("unanswered metric value {value} lies outside [0, {max_level}]")]
    InvalidUnansweredValue { value: f64, max_level: u32 },
    #[error("rounding precision {0} exceeds the supported maximum of 6 decimals")]
    InvalidRoundingPrecision(u32),
    #[error("maturity breakpoints must be strictly increasing fractions between 0 and 1")]
    InvalidBreakpoints,
}

/// Fatal failure of a single calculation run.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ScoringError {
    #[error(transparent)]
    Configuration(#[from] ConfigurationError),
    #[error(transparent)]
    Taxonomy(#[from] TaxonomyInconsistency),
}
