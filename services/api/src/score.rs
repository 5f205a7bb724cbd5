use chrono::Utc;
use clap::Args;
use maturity_engine::config::AppConfig;
use maturity_engine::error::AppError;
use maturity_engine::scoring::{
    AnswerOverride, AnswerSet, CalculationRecord, CatalogLoadError, RuleCatalog, RuleId,
    ScoringEngine, ScoringRule, ScoringServiceError, Taxonomy, TaxonomySnapshot,
};
use serde::Deserialize;
use std::fs::File;
use std::io::BufReader;
use std::path::PathBuf;

#[derive(Args, Debug)]
pub(crate) struct ScoreArgs {
    /// JSON file holding `taxonomy`, `answers` and optional `rule` / `overrides`
    #[arg(long)]
    pub(crate) input: PathBuf,
    /// Rule id to apply from the configured catalog (defaults to the catalog default)
    #[arg(long)]
    pub(crate) rule: Option<String>,
    /// Rule catalog file; falls back to SCORING_RULES_PATH, then the built-in rule
    #[arg(long)]
    pub(crate) rules: Option<PathBuf>,
    /// Print the full calculation record as JSON instead of the text explanation
    #[arg(long)]
    pub(crate) json: bool,
}

/// Offline assessment document accepted by `score --input`.
#[derive(Debug, Deserialize)]
pub(crate) struct ScoreInput {
    pub(crate) taxonomy: TaxonomySnapshot,
    pub(crate) answers: AnswerSet,
    /// Inline rule; takes precedence over the catalog.
    #[serde(default)]
    pub(crate) rule: Option<ScoringRule>,
    #[serde(default)]
    pub(crate) overrides: Vec<AnswerOverride>,
}

pub(crate) fn run_score(args: ScoreArgs) -> Result<(), AppError> {
    let ScoreArgs {
        input,
        rule,
        rules,
        json,
    } = args;

    let document: ScoreInput = serde_json::from_reader(BufReader::new(File::open(&input)?))?;
    let rules_path = match rules {
        Some(path) => Some(path),
        None => AppConfig::load()?.scoring.rules_path,
    };
    let catalog = match rules_path {
        Some(path) => RuleCatalog::from_path(path)?,
        None => RuleCatalog::standard(),
    };

    let record = score_document(document, &catalog, rule.map(RuleId))?;
    if json {
        println!("{}", serde_json::to_string_pretty(&record)?);
    } else {
        render_record(&record);
    }
    Ok(())
}

pub(crate) fn score_document(
    document: ScoreInput,
    catalog: &RuleCatalog,
    rule_id: Option<RuleId>,
) -> Result<CalculationRecord, AppError> {
    let ScoreInput {
        taxonomy,
        answers,
        rule,
        overrides,
    } = document;

    let rule = match rule {
        Some(rule) => rule,
        None => catalog
            .resolve(rule_id.as_ref())
            .map_err(ScoringServiceError::from)?
            .clone(),
    };
    let taxonomy = Taxonomy::try_from(taxonomy).map_err(CatalogLoadError::from)?;
    let engine = ScoringEngine::new(rule).map_err(ScoringServiceError::from)?;
    let answers = if overrides.is_empty() {
        answers
    } else {
        answers.with_overrides(&overrides)
    };

    engine
        .calculate(&taxonomy, &answers, Utc::now())
        .map_err(|err| AppError::Scoring(err.into()))
}

fn render_record(record: &CalculationRecord) {
    println!("Maturity assessment for session {}", record.session_id);
    for line in record.explain() {
        println!("{line}");
    }
    println!(
        "{} of {} metrics answered ({} remaining)",
        record.completion.answered_metrics,
        record.completion.total_metrics,
        record.completion.remaining_metrics
    );
    println!("Calculated by {} at {}", record.algorithm_version, record.calculated_at);
}

#[cfg(test)]
mod tests {
    use super::*;
    use maturity_engine::scoring::{AnswerValue, MetricId};

    const DOCUMENT: &str = r#"{
        "taxonomy": {
            "pillars": [{"id": "ops", "name": "Operations"}],
            "topics": [{"id": "release", "name": "Release", "pillar_id": "ops"}],
            "metrics": [
                {"id": "m1", "name": "Scripted deploy", "topic_id": "release", "level": 2},
                {"id": "m2", "name": "Progressive delivery", "topic_id": "release", "level": 4}
            ]
        },
        "answers": {
            "session_id": "cli-1",
            "version": 1,
            "answers": {"m1": {"value": true}}
        }
    }"#;

    fn document() -> ScoreInput {
        serde_json::from_str(DOCUMENT).expect("document parses")
    }

    #[test]
    fn scores_with_catalog_default() {
        let record = score_document(document(), &RuleCatalog::standard(), None)
            .expect("document scores");

        assert_eq!(record.overall_score, Some(1.0));
        assert_eq!(record.completion.completion_percentage, 50.0);
    }

    #[test]
    fn inline_rule_wins_over_catalog() {
        let mut input = document();
        input.rule = Some(ScoringRule {
            topic_exclude_empty: true,
            ..ScoringRule::default()
        });

        let record = score_document(
            input,
            &RuleCatalog::standard(),
            Some(RuleId("ghost".to_string())),
        )
        .expect("inline rule applies");

        assert_eq!(record.overall_score, Some(2.0));
    }

    #[test]
    fn unknown_catalog_rule_is_an_error() {
        let err = score_document(
            document(),
            &RuleCatalog::standard(),
            Some(RuleId("ghost".to_string())),
        )
        .expect_err("missing rule");

        assert!(matches!(err, AppError::Scoring(_)));
        assert!(err.to_string().contains("ghost"));
    }

    #[test]
    fn overrides_are_applied_before_scoring() {
        let mut input = document();
        input.overrides = vec![AnswerOverride {
            metric_id: MetricId("m2".to_string()),
            value: AnswerValue::Boolean(true),
            answered: true,
        }];

        let record =
            score_document(input, &RuleCatalog::standard(), None).expect("document scores");

        assert_eq!(record.overall_score, Some(3.0));
        assert!(record.completion.completion_percentage > 50.0);
    }
}
