//! Hierarchical maturity scoring.
//!
//! Raw per-metric answers are folded into topic, pillar and overall scores under a
//! versioned [`scoring::ScoringRule`]. The [`scoring::ScoringEngine`] is a pure function of
//! taxonomy, answers and rule; [`scoring::ScoringService`] layers rule selection, caching and
//! persistence around it for the HTTP service in `services/api`.

pub mod config;
pub mod error;
pub mod scoring;
pub mod telemetry;
