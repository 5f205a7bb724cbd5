//! Maturity scoring: taxonomy and answer snapshots, versioned rules, the aggregation engine
//! and the service that caches and persists its results.
//!
//! Scores flow strictly upward (metric, topic, pillar, overall). Every level applies its own
//! aggregation method from the active [`ScoringRule`], and every calculation is captured as an
//! immutable [`CalculationRecord`] naming the rule version that produced it.

pub mod answers;
pub mod cache;
pub mod catalog;
pub mod completion;
pub mod engine;
pub mod error;
pub mod record;
pub mod repository;
pub mod router;
pub mod rule;
pub mod service;
pub mod taxonomy;

#[cfg(test)]
mod tests;

pub use answers::{Answer, AnswerOverride, AnswerSet, AnswerValue, SessionId};
pub use cache::{CacheKey, InMemoryScoreCache, NoopScoreCache, ScoreCache};
pub use catalog::{load_taxonomy, taxonomy_from_json_reader, CatalogLoadError, RuleCatalog};
pub use completion::CompletionSummary;
pub use engine::{MaturityLevel, ScoringEngine};
pub use error::{ConfigurationError, ScoringError};
pub use record::{
    CalculationRecord, PillarBreakdown, RuleReference, ScoringWarning, TopicBreakdown,
    ALGORITHM_VERSION,
};
pub use repository::{CalculationRepository, RepositoryError};
pub use router::scoring_router;
pub use rule::{
    AggregationMethod, MetricAnsweredValue, RuleId, ScaleRange, ScoringRule,
    DEFAULT_MATURITY_BREAKPOINTS,
};
pub use service::{CalculationRequest, ScoringService, ScoringServiceError};
pub use taxonomy::{
    Metric, MetricId, MetricKind, Pillar, PillarId, Taxonomy, TaxonomyInconsistency,
    TaxonomySnapshot, Topic, TopicId,
};
