use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use super::error::ConfigurationError;

/// Identifier wrapper for scoring rules.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RuleId(pub String);

impl fmt::Display for RuleId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Aggregation applied at the topic, pillar or overall level.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE", try_from = "String")]
pub enum AggregationMethod {
    Average,
    WeightedAverage,
    PercentageToScale,
    Sum,
    Median,
    Min,
    Max,
}

impl AggregationMethod {
    pub const fn ordered() -> [Self; 7] {
        [
            Self::Average,
            Self::WeightedAverage,
            Self::PercentageToScale,
            Self::Sum,
            Self::Median,
            Self::Min,
            Self::Max,
        ]
    }

    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Average => "AVERAGE",
            Self::WeightedAverage => "WEIGHTED_AVERAGE",
            Self::PercentageToScale => "PERCENTAGE_TO_SCALE",
            Self::Sum => "SUM",
            Self::Median => "MEDIAN",
            Self::Min => "MIN",
            Self::Max => "MAX",
        }
    }
}

impl fmt::Display for AggregationMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for AggregationMethod {
    type Err = ConfigurationError;

    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        let normalized = raw.trim().replace('-', "_").to_ascii_uppercase();
        Self::ordered()
            .into_iter()
            .find(|method| method.as_str() == normalized)
            .ok_or_else(|| ConfigurationError::UnknownMethod(raw.to_string()))
    }
}

impl TryFrom<String> for AggregationMethod {
    type Error = ConfigurationError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

/// What an answered metric contributes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", try_from = "String")]
pub enum MetricAnsweredValue {
    /// The metric's `level` attribute.
    #[default]
    UseLevel,
    /// Always zero; the metric is informational only.
    FixedZero,
}

impl FromStr for MetricAnsweredValue {
    type Err = ConfigurationError;

    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        match raw.trim().replace('-', "_").to_ascii_lowercase().as_str() {
            "use_level" | "level" => Ok(Self::UseLevel),
            "fixed_zero" | "zero" => Ok(Self::FixedZero),
            _ => Err(ConfigurationError::UnknownAnsweredMode(raw.to_string())),
        }
    }
}

impl TryFrom<String> for MetricAnsweredValue {
    type Error = ConfigurationError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

/// Closed numeric interval a score is expressed in.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ScaleRange {
    pub min: f64,
    pub max: f64,
}

impl ScaleRange {
    pub const fn new(min: f64, max: f64) -> Self {
        Self { min, max }
    }

    pub fn span(&self) -> f64 {
        self.max - self.min
    }

    pub fn clamp(&self, value: f64) -> f64 {
        value.max(self.min).min(self.max)
    }

    pub fn contains(&self, value: f64) -> bool {
        value >= self.min && value <= self.max
    }

    /// Position of `value` within the range as a fraction in `[0, 1]`.
    pub fn fraction_of(&self, value: f64) -> f64 {
        if self.span() <= 0.0 {
            return 0.0;
        }
        ((value - self.min) / self.span()).clamp(0.0, 1.0)
    }

    /// Inverse of [`ScaleRange::fraction_of`].
    pub fn from_fraction(&self, fraction: f64) -> f64 {
        self.min + fraction.clamp(0.0, 1.0) * self.span()
    }
}

const MAX_ROUNDING_PRECISION: u32 = 6;

/// Quintile breakpoints separating the five maturity levels.
pub const DEFAULT_MATURITY_BREAKPOINTS: [f64; 4] = [0.2, 0.4, 0.6, 0.8];

/// Versioned configuration controlling every aggregation decision.
///
/// Every field has a default, so a JSON rule only needs to spell out what it changes.
/// The defaults reproduce the historical calculator: plain average per topic, weighted
/// averages above it, a 0–5 scale and two-decimal rounding.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScoringRule {
    pub id: RuleId,
    pub name: String,
    pub version: u32,
    pub is_default: bool,

    pub metric_answered_value: MetricAnsweredValue,
    pub metric_unanswered_value: f64,
    pub metric_max_level: u32,

    pub topic_score_method: AggregationMethod,
    pub topic_scale_min: f64,
    pub topic_scale_max: f64,
    pub topic_exclude_empty: bool,

    pub pillar_score_method: AggregationMethod,
    pub pillar_exclude_empty: bool,
    pub pillar_min_topics: usize,

    pub overall_score_method: AggregationMethod,
    pub overall_exclude_empty: bool,
    pub overall_min_pillars: usize,

    pub rounding_precision: u32,
    pub penalize_incomplete: bool,
    /// Fractions of the score scale where each maturity level begins, `Managed` first.
    pub maturity_breakpoints: [f64; 4],
}

impl Default for ScoringRule {
    fn default() -> Self {
        Self {
            id: RuleId("standard".to_string()),
            name: "Standard maturity rule".to_string(),
            version: 1,
            is_default: false,
            metric_answered_value: MetricAnsweredValue::UseLevel,
            metric_unanswered_value: 0.0,
            metric_max_level: 5,
            topic_score_method: AggregationMethod::Average,
            topic_scale_min: 0.0,
            topic_scale_max: 5.0,
            topic_exclude_empty: false,
            pillar_score_method: AggregationMethod::WeightedAverage,
            pillar_exclude_empty: true,
            pillar_min_topics: 1,
            overall_score_method: AggregationMethod::WeightedAverage,
            overall_exclude_empty: true,
            overall_min_pillars: 1,
            rounding_precision: 2,
            penalize_incomplete: false,
            maturity_breakpoints: DEFAULT_MATURITY_BREAKPOINTS,
        }
    }
}

impl ScoringRule {
    pub fn new(id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id: RuleId(id.into()),
            name: name.into(),
            ..Self::default()
        }
    }

    /// Range topic, pillar and overall scores are expressed in.
    pub fn score_scale(&self) -> ScaleRange {
        ScaleRange::new(self.topic_scale_min, self.topic_scale_max)
    }

    /// Range a single metric score can take.
    pub fn metric_scale(&self) -> ScaleRange {
        ScaleRange::new(0.0, f64::from(self.metric_max_level))
    }

    /// Round half away from zero to `rounding_precision` decimals.
    pub fn round(&self, value: f64) -> f64 {
        let factor = 10f64.powi(self.rounding_precision.min(MAX_ROUNDING_PRECISION) as i32);
        (value * factor).round() / factor
    }

    pub fn validate(&self) -> Result<(), ConfigurationError> {
        let scale = self.score_scale();
        if !scale.min.is_finite() || !scale.max.is_finite() || scale.min >= scale.max {
            return Err(ConfigurationError::InvalidScale {
                min: scale.min,
                max: scale.max,
            });
        }

        if self.metric_max_level == 0 {
            return Err(ConfigurationError::InvalidMetricMaxLevel);
        }

        if !self.metric_scale().contains(self.metric_unanswered_value) {
            return Err(ConfigurationError::InvalidUnansweredValue {
                value: self.metric_unanswered_value,
                max_level: self.metric_max_level,
            });
        }

        if self.rounding_precision > MAX_ROUNDING_PRECISION {
            return Err(ConfigurationError::InvalidRoundingPrecision(
                self.rounding_precision,
            ));
        }

        let breakpoints = &self.maturity_breakpoints;
        let in_unit_interval = breakpoints
            .iter()
            .all(|point| point.is_finite() && *point > 0.0 && *point < 1.0);
        let increasing = breakpoints.windows(2).all(|pair| pair[0] < pair[1]);
        if !in_unit_interval || !increasing {
            return Err(ConfigurationError::InvalidBreakpoints);
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_rule_is_valid() {
        assert!(ScoringRule::default().validate().is_ok());
    }

    #[test]
    fn parses_method_names_leniently() {
        assert_eq!(
            "weighted-average".parse::<AggregationMethod>(),
            Ok(AggregationMethod::WeightedAverage)
        );
        assert_eq!(
            " percentage_to_scale ".parse::<AggregationMethod>(),
            Ok(AggregationMethod::PercentageToScale)
        );
        assert_eq!(
            "GEOMETRIC".parse::<AggregationMethod>(),
            Err(ConfigurationError::UnknownMethod("GEOMETRIC".to_string()))
        );
    }

    #[test]
    fn rejects_inverted_scale() {
        let rule = ScoringRule {
            topic_scale_min: 5.0,
            topic_scale_max: 5.0,
            ..ScoringRule::default()
        };
        assert_eq!(
            rule.validate(),
            Err(ConfigurationError::InvalidScale { min: 5.0, max: 5.0 })
        );
    }

    #[test]
    fn rejects_unanswered_value_above_max_level() {
        let rule = ScoringRule {
            metric_max_level: 3,
            metric_unanswered_value: 4.0,
            ..ScoringRule::default()
        };
        assert!(matches!(
            rule.validate(),
            Err(ConfigurationError::InvalidUnansweredValue { .. })
        ));
    }

    #[test]
    fn rejects_unordered_breakpoints() {
        let rule = ScoringRule {
            maturity_breakpoints: [0.2, 0.6, 0.4, 0.8],
            ..ScoringRule::default()
        };
        assert_eq!(rule.validate(), Err(ConfigurationError::InvalidBreakpoints));
    }

    #[test]
    fn partial_json_rule_fills_defaults() {
        let rule: ScoringRule = serde_json::from_str(
            r#"{"id": "strict", "name": "Strict", "topic_score_method": "MEDIAN", "penalize_incomplete": true}"#,
        )
        .expect("partial rule parses");

        assert_eq!(rule.id, RuleId("strict".to_string()));
        assert_eq!(rule.topic_score_method, AggregationMethod::Median);
        assert!(rule.penalize_incomplete);
        assert_eq!(rule.metric_max_level, 5);
        assert_eq!(rule.pillar_score_method, AggregationMethod::WeightedAverage);
    }

    #[test]
    fn unknown_method_in_json_is_rejected() {
        let parsed = serde_json::from_str::<ScoringRule>(r#"{"topic_score_method": "MODE"}"#);
        let err = parsed.expect_err("MODE is not a method");
        assert!(err.to_string().contains("unknown aggregation method"));
    }

    #[test]
    fn rounds_half_away_from_zero() {
        let rule = ScoringRule::default();
        assert_eq!(rule.round(3.336), 3.34);
        assert_eq!(rule.round(-1.255_1), -1.26);
        assert_eq!(rule.round(10.0 / 3.0), 3.33);
    }
}
