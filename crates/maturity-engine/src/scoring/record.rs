use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::answers::SessionId;
use super::completion::CompletionSummary;
use super::engine::MaturityLevel;
use super::rule::{RuleId, ScoringRule};
use super::taxonomy::{MetricId, PillarId, TopicId};

/// Identifies the calculation logic that produced a record.
pub const ALGORITHM_VERSION: &str = concat!("maturity-engine/", env!("CARGO_PKG_VERSION"));

/// The rule (and the exact revision of it) a record was computed with.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RuleReference {
    pub id: RuleId,
    pub name: String,
    pub version: u32,
}

impl From<&ScoringRule> for RuleReference {
    fn from(rule: &ScoringRule) -> Self {
        Self {
            id: rule.id.clone(),
            name: rule.name.clone(),
            version: rule.version,
        }
    }
}

/// Score and coverage for one topic.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TopicBreakdown {
    pub topic_id: TopicId,
    pub name: String,
    pub weight: f64,
    pub score: Option<f64>,
    pub maturity_level: Option<MaturityLevel>,
    pub empty: bool,
    pub eligible_metrics: usize,
    pub answered_metrics: usize,
    pub total_metrics: usize,
}

impl TopicBreakdown {
    pub fn summary(&self) -> String {
        match (self.score, self.maturity_level) {
            (Some(score), Some(level)) => format!(
                "{}: {:.2} ({}) from {} of {} metrics, {} answered",
                self.name,
                score,
                level.label(),
                self.eligible_metrics,
                self.total_metrics,
                self.answered_metrics
            ),
            _ => format!(
                "{}: not scored, no eligible metrics ({} of {} answered)",
                self.name, self.answered_metrics, self.total_metrics
            ),
        }
    }
}

/// Score, coverage and topic detail for one pillar.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PillarBreakdown {
    pub pillar_id: PillarId,
    pub name: String,
    pub weight: f64,
    pub score: Option<f64>,
    pub maturity_level: Option<MaturityLevel>,
    pub empty: bool,
    pub eligible_topics: usize,
    pub total_topics: usize,
    pub answered_metrics: usize,
    pub total_metrics: usize,
    pub topics: Vec<TopicBreakdown>,
}

impl PillarBreakdown {
    pub fn completion(&self) -> CompletionSummary {
        CompletionSummary::from_counts(self.answered_metrics, self.total_metrics)
    }

    pub fn summary(&self) -> String {
        let coverage = self.completion().completion_percentage;
        match (self.score, self.maturity_level) {
            (Some(score), Some(level)) => format!(
                "{}: {:.2} ({}) from {} of {} topics, {:.1}% answered",
                self.name,
                score,
                level.label(),
                self.eligible_topics,
                self.total_topics,
                coverage
            ),
            _ => format!(
                "{}: not scored, {} of {} topics eligible, {:.1}% answered",
                self.name, self.eligible_topics, self.total_topics, coverage
            ),
        }
    }
}

/// Expected data gaps surfaced alongside a result. None of these abort a calculation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ScoringWarning {
    EmptyTopic {
        topic_id: TopicId,
    },
    EmptyPillar {
        pillar_id: PillarId,
    },
    PillarBelowMinimum {
        pillar_id: PillarId,
        eligible_topics: usize,
        required_topics: usize,
    },
    OverallBelowMinimum {
        eligible_pillars: usize,
        required_pillars: usize,
    },
    PenalizedPillar {
        pillar_id: PillarId,
    },
    UnknownMetricAnswer {
        metric_id: MetricId,
    },
    AnswerOutOfRange {
        metric_id: MetricId,
        value: f64,
        min: f64,
        max: f64,
    },
}

impl ScoringWarning {
    pub fn summary(&self) -> String {
        match self {
            ScoringWarning::EmptyTopic { topic_id } => {
                format!("topic {topic_id} has no eligible metric scores")
            }
            ScoringWarning::EmptyPillar { pillar_id } => {
                format!("pillar {pillar_id} has no eligible topic scores")
            }
            ScoringWarning::PillarBelowMinimum {
                pillar_id,
                eligible_topics,
                required_topics,
            } => format!(
                "pillar {pillar_id} has {eligible_topics} eligible topic(s), {required_topics} required"
            ),
            ScoringWarning::OverallBelowMinimum {
                eligible_pillars,
                required_pillars,
            } => format!(
                "overall score needs {required_pillars} eligible pillar(s), found {eligible_pillars}"
            ),
            ScoringWarning::PenalizedPillar { pillar_id } => {
                format!("pillar {pillar_id} counted as 0 because it is incomplete")
            }
            ScoringWarning::UnknownMetricAnswer { metric_id } => {
                format!("answer for unknown metric {metric_id} ignored")
            }
            ScoringWarning::AnswerOutOfRange {
                metric_id,
                value,
                min,
                max,
            } => format!("answer {value} for metric {metric_id} lies outside [{min}, {max}]"),
        }
    }
}

/// Immutable result of one calculation run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CalculationRecord {
    pub session_id: SessionId,
    pub rule: RuleReference,
    pub answer_set_version: u64,
    pub overall_score: Option<f64>,
    pub maturity_level: Option<MaturityLevel>,
    pub pillar_breakdown: BTreeMap<PillarId, PillarBreakdown>,
    /// Pillar ids in taxonomy order, for display.
    #[serde(default)]
    pub pillar_order: Vec<PillarId>,
    pub completion: CompletionSummary,
    pub warnings: Vec<ScoringWarning>,
    pub algorithm_version: String,
    pub calculated_at: DateTime<Utc>,
}

impl CalculationRecord {
    pub fn completion_percentage(&self) -> f64 {
        self.completion.completion_percentage
    }

    pub fn summary(&self) -> String {
        let head = match (self.overall_score, self.maturity_level) {
            (Some(score), Some(level)) => format!("overall {:.2} ({})", score, level.label()),
            _ => "overall not scored".to_string(),
        };
        format!(
            "{head} under rule '{}' v{}, {:.1}% of metrics answered",
            self.rule.name, self.rule.version, self.completion.completion_percentage
        )
    }

    /// Breakdowns in taxonomy order; id order for records stored without one.
    pub fn pillars(&self) -> Vec<&PillarBreakdown> {
        if self.pillar_order.is_empty() {
            return self.pillar_breakdown.values().collect();
        }
        self.pillar_order
            .iter()
            .filter_map(|id| self.pillar_breakdown.get(id))
            .collect()
    }

    /// Human-readable explanation: the headline, then each pillar with its topics, then warnings.
    pub fn explain(&self) -> Vec<String> {
        let mut lines = vec![self.summary()];
        for pillar in self.pillars() {
            lines.push(format!("- {}", pillar.summary()));
            lines.extend(
                pillar
                    .topics
                    .iter()
                    .map(|topic| format!("  - {}", topic.summary())),
            );
        }
        lines.extend(
            self.warnings
                .iter()
                .map(|warning| format!("! {}", warning.summary())),
        );
        lines
    }
}
