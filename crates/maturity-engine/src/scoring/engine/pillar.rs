use tracing::debug;

use super::super::record::{PillarBreakdown, ScoringWarning, TopicBreakdown};
use super::super::rule::ScoringRule;
use super::super::taxonomy::Pillar;
use super::level::MaturityLevel;
use super::method::ScoreInput;

/// Empty topics either drop out or count as 0, depending on `pillar_exclude_empty`.
pub(crate) fn score_pillar(
    pillar: &Pillar,
    topics: Vec<TopicBreakdown>,
    rule: &ScoringRule,
    warnings: &mut Vec<ScoringWarning>,
) -> PillarBreakdown {
    let scale = rule.score_scale();
    let inputs: Vec<ScoreInput> = topics
        .iter()
        .filter(|topic| !(topic.empty && rule.pillar_exclude_empty))
        .map(|topic| ScoreInput {
            score: topic.score.unwrap_or(0.0),
            weight: topic.weight,
            range: scale,
        })
        .collect();

    let below_minimum = inputs.len() < rule.pillar_min_topics;
    let score = if below_minimum {
        None
    } else {
        rule.pillar_score_method
            .apply(&inputs, scale)
            .map(|raw| rule.round(scale.clamp(raw)))
    };

    if below_minimum && !inputs.is_empty() {
        warnings.push(ScoringWarning::PillarBelowMinimum {
            pillar_id: pillar.id.clone(),
            eligible_topics: inputs.len(),
            required_topics: rule.pillar_min_topics,
        });
    } else if score.is_none() {
        warnings.push(ScoringWarning::EmptyPillar {
            pillar_id: pillar.id.clone(),
        });
    }

    debug!(
        pillar = %pillar.id,
        method = %rule.pillar_score_method,
        eligible = inputs.len(),
        required = rule.pillar_min_topics,
        ?score,
        "pillar scored"
    );

    PillarBreakdown {
        pillar_id: pillar.id.clone(),
        name: pillar.name.clone(),
        weight: pillar.weight,
        score,
        maturity_level: score
            .map(|value| MaturityLevel::from_score(value, scale, &rule.maturity_breakpoints)),
        empty: score.is_none(),
        eligible_topics: inputs.len(),
        total_topics: topics.len(),
        answered_metrics: topics.iter().map(|topic| topic.answered_metrics).sum(),
        total_metrics: topics.iter().map(|topic| topic.total_metrics).sum(),
        topics,
    }
}
