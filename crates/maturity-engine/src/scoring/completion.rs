use serde::{Deserialize, Serialize};

use super::answers::AnswerSet;
use super::taxonomy::Taxonomy;

/// Coverage of an assessment. Independent of every scoring rule flag.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CompletionSummary {
    pub total_metrics: usize,
    pub answered_metrics: usize,
    pub remaining_metrics: usize,
    pub completion_percentage: f64,
}

impl CompletionSummary {
    pub fn from_counts(answered_metrics: usize, total_metrics: usize) -> Self {
        let completion_percentage = if total_metrics == 0 {
            0.0
        } else {
            let raw = answered_metrics as f64 / total_metrics as f64 * 100.0;
            (raw * 10.0).round() / 10.0
        };

        Self {
            total_metrics,
            answered_metrics,
            remaining_metrics: total_metrics.saturating_sub(answered_metrics),
            completion_percentage,
        }
    }

    /// Answered participating metrics over all participating metrics.
    pub fn compute(taxonomy: &Taxonomy, answers: &AnswerSet) -> Self {
        let (answered, total) = taxonomy
            .participating_metrics()
            .fold((0, 0), |(answered, total), metric| {
                let hit = usize::from(answers.is_answered(&metric.id));
                (answered + hit, total + 1)
            });
        Self::from_counts(answered, total)
    }
}
