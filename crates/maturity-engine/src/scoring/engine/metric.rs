use super::super::answers::Answer;
use super::super::rule::{MetricAnsweredValue, ScoringRule};
use super::super::taxonomy::{Metric, MetricId};

/// Score of one active metric as seen by its topic.
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct MetricScore {
    pub metric_id: MetricId,
    pub weight: f64,
    pub score: f64,
    pub answered: bool,
}

/// Missing answers are a normal state: they score `metric_unanswered_value`.
pub(crate) fn score_metric(
    metric: &Metric,
    answer: Option<&Answer>,
    rule: &ScoringRule,
) -> MetricScore {
    let answered = answer.map(|answer| answer.answered).unwrap_or(false);

    let score = if answered {
        match rule.metric_answered_value {
            MetricAnsweredValue::UseLevel => rule.metric_scale().clamp(f64::from(metric.level)),
            MetricAnsweredValue::FixedZero => 0.0,
        }
    } else {
        rule.metric_unanswered_value
    };

    MetricScore {
        metric_id: metric.id.clone(),
        weight: metric.weight,
        score,
        answered,
    }
}
