use tracing::debug;

use super::super::record::{PillarBreakdown, ScoringWarning};
use super::super::rule::ScoringRule;
use super::level::MaturityLevel;
use super::method::ScoreInput;

#[derive(Debug, Clone, PartialEq)]
pub(crate) struct OverallScore {
    pub score: Option<f64>,
    pub maturity_level: Option<MaturityLevel>,
}

/// The minimum-pillar threshold is checked against scored pillars; `penalize_incomplete`
/// then re-adds every excluded empty pillar as a 0 entry.
pub(crate) fn score_overall<'a>(
    pillars: impl IntoIterator<Item = &'a PillarBreakdown>,
    rule: &ScoringRule,
    warnings: &mut Vec<ScoringWarning>,
) -> OverallScore {
    let scale = rule.score_scale();
    let mut inputs = Vec::new();
    let mut excluded = Vec::new();

    for pillar in pillars {
        if pillar.empty && rule.overall_exclude_empty {
            excluded.push(pillar);
            continue;
        }
        inputs.push(ScoreInput {
            score: pillar.score.unwrap_or(0.0),
            weight: pillar.weight,
            range: scale,
        });
    }

    let eligible = inputs.len();
    if eligible < rule.overall_min_pillars {
        warnings.push(ScoringWarning::OverallBelowMinimum {
            eligible_pillars: eligible,
            required_pillars: rule.overall_min_pillars,
        });
        debug!(eligible, required = rule.overall_min_pillars, "overall below minimum");
        return OverallScore {
            score: None,
            maturity_level: None,
        };
    }

    if rule.penalize_incomplete {
        for pillar in excluded {
            warnings.push(ScoringWarning::PenalizedPillar {
                pillar_id: pillar.pillar_id.clone(),
            });
            inputs.push(ScoreInput {
                score: 0.0,
                weight: pillar.weight,
                range: scale,
            });
        }
    }

    let score = rule
        .overall_score_method
        .apply(&inputs, scale)
        .map(|raw| rule.round(scale.clamp(raw)));

    debug!(
        method = %rule.overall_score_method,
        eligible,
        penalized = inputs.len() - eligible,
        ?score,
        "overall scored"
    );

    OverallScore {
        score,
        maturity_level: score
            .map(|value| MaturityLevel::from_score(value, scale, &rule.maturity_breakpoints)),
    }
}
