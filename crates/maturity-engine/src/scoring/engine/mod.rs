mod level;
pub(crate) mod method;
pub(crate) mod metric;
pub(crate) mod overall;
pub(crate) mod pillar;
pub(crate) mod topic;

pub use level::MaturityLevel;

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use tracing::info;

use super::answers::AnswerSet;
use super::completion::CompletionSummary;
use super::error::{ConfigurationError, ScoringError};
use super::record::{CalculationRecord, RuleReference, ScoringWarning, ALGORITHM_VERSION};
use super::rule::ScoringRule;
use super::taxonomy::Taxonomy;

use metric::score_metric;
use overall::score_overall;
use pillar::score_pillar;
use topic::score_topic;

/// Stateless evaluator applying one validated scoring rule to taxonomy and answer snapshots.
#[derive(Debug, Clone)]
pub struct ScoringEngine {
    rule: ScoringRule,
}

impl ScoringEngine {
    pub fn new(rule: ScoringRule) -> Result<Self, ConfigurationError> {
        rule.validate()?;
        Ok(Self { rule })
    }

    pub fn rule(&self) -> &ScoringRule {
        &self.rule
    }

    /// Run Metric → Topic → Pillar → Overall for one session.
    ///
    /// Pure and synchronous: identical inputs (including `calculated_at`) always produce
    /// identical records.
    pub fn calculate(
        &self,
        taxonomy: &Taxonomy,
        answers: &AnswerSet,
        calculated_at: DateTime<Utc>,
    ) -> Result<CalculationRecord, ScoringError> {
        let rule = &self.rule;
        taxonomy.validate_against(rule)?;

        let mut warnings = audit_answers(taxonomy, answers);
        let mut pillar_breakdown = BTreeMap::new();
        let mut pillar_order = Vec::new();

        for pillar in taxonomy.active_pillars() {
            let topics = taxonomy
                .active_topics_of(&pillar.id)
                .map(|topic| {
                    let metric_scores: Vec<_> = taxonomy
                        .active_metrics_of(&topic.id)
                        .map(|metric| score_metric(metric, answers.get(&metric.id), rule))
                        .collect();
                    score_topic(topic, &metric_scores, rule, &mut warnings)
                })
                .collect();

            let breakdown = score_pillar(pillar, topics, rule, &mut warnings);
            pillar_order.push(pillar.id.clone());
            pillar_breakdown.insert(pillar.id.clone(), breakdown);
        }

        let overall = score_overall(
            taxonomy
                .active_pillars()
                .filter_map(|pillar| pillar_breakdown.get(&pillar.id)),
            rule,
            &mut warnings,
        );
        let completion = CompletionSummary::compute(taxonomy, answers);

        info!(
            session = %answers.session_id,
            rule = %rule.id,
            rule_version = rule.version,
            overall = ?overall.score,
            completion = completion.completion_percentage,
            warnings = warnings.len(),
            "maturity score calculated"
        );

        Ok(CalculationRecord {
            session_id: answers.session_id.clone(),
            rule: RuleReference::from(rule),
            answer_set_version: answers.version,
            overall_score: overall.score,
            maturity_level: overall.maturity_level,
            pillar_breakdown,
            pillar_order,
            completion,
            warnings,
            algorithm_version: ALGORITHM_VERSION.to_string(),
            calculated_at,
        })
    }
}

fn audit_answers(taxonomy: &Taxonomy, answers: &AnswerSet) -> Vec<ScoringWarning> {
    answers
        .iter()
        .filter_map(|(metric_id, answer)| match taxonomy.metric(metric_id) {
            None => Some(ScoringWarning::UnknownMetricAnswer {
                metric_id: metric_id.clone(),
            }),
            Some(metric) => {
                let value = answer.value.as_f64();
                let in_range = value >= metric.min_value && value <= metric.max_value;
                (answer.answered && taxonomy.is_participating(metric_id) && !in_range).then(|| {
                    ScoringWarning::AnswerOutOfRange {
                        metric_id: metric_id.clone(),
                        value,
                        min: metric.min_value,
                        max: metric.max_value,
                    }
                })
            }
        })
        .collect()
}
