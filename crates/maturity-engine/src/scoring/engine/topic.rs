use tracing::debug;

use super::super::record::{ScoringWarning, TopicBreakdown};
use super::super::rule::ScoringRule;
use super::super::taxonomy::Topic;
use super::level::MaturityLevel;
use super::method::ScoreInput;
use super::metric::MetricScore;

pub(crate) fn score_topic(
    topic: &Topic,
    metrics: &[MetricScore],
    rule: &ScoringRule,
    warnings: &mut Vec<ScoringWarning>,
) -> TopicBreakdown {
    let metric_scale = rule.metric_scale();
    let inputs: Vec<ScoreInput> = metrics
        .iter()
        .filter(|metric| metric.answered || !rule.topic_exclude_empty)
        .map(|metric| ScoreInput {
            score: metric.score,
            weight: metric.weight,
            range: metric_scale,
        })
        .collect();

    let scale = rule.score_scale();
    let score = rule
        .topic_score_method
        .apply(&inputs, scale)
        .map(|raw| rule.round(scale.clamp(raw)));

    if score.is_none() {
        warnings.push(ScoringWarning::EmptyTopic {
            topic_id: topic.id.clone(),
        });
    }

    debug!(
        topic = %topic.id,
        method = %rule.topic_score_method,
        eligible = inputs.len(),
        ?score,
        "topic scored"
    );

    TopicBreakdown {
        topic_id: topic.id.clone(),
        name: topic.name.clone(),
        weight: topic.weight,
        score,
        maturity_level: score
            .map(|value| MaturityLevel::from_score(value, scale, &rule.maturity_breakpoints)),
        empty: score.is_none(),
        eligible_metrics: inputs.len(),
        answered_metrics: metrics.iter().filter(|metric| metric.answered).count(),
        total_metrics: metrics.len(),
    }
}
