use std::collections::BTreeMap;
use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use super::taxonomy::MetricId;

/// Identifier wrapper for assessment sessions.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SessionId(pub String);

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Raw answer payload; interpretation depends on the metric kind.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum AnswerValue {
    Boolean(bool),
    Numeric(f64),
}

impl AnswerValue {
    pub fn as_f64(self) -> f64 {
        match self {
            AnswerValue::Boolean(true) => 1.0,
            AnswerValue::Boolean(false) => 0.0,
            AnswerValue::Numeric(value) => value,
        }
    }
}

fn answered_by_default() -> bool {
    true
}

/// Recorded response for one metric within a session.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Answer {
    pub value: AnswerValue,
    /// False when the row only carries a placeholder value nobody supplied.
    #[serde(default = "answered_by_default")]
    pub answered: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub recorded_at: Option<DateTime<Utc>>,
}

impl Answer {
    pub fn new(value: AnswerValue) -> Self {
        Self {
            value,
            answered: true,
            recorded_at: None,
        }
    }
}

/// Hypothetical answer used for what-if calculations.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnswerOverride {
    pub metric_id: MetricId,
    pub value: AnswerValue,
    #[serde(default = "answered_by_default")]
    pub answered: bool,
}

/// Sparse set of answers for one session. `version` increases on every write.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnswerSet {
    pub session_id: SessionId,
    #[serde(default)]
    pub version: u64,
    #[serde(default)]
    pub answers: BTreeMap<MetricId, Answer>,
    /// Set on sets derived through [`AnswerSet::with_overrides`].
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub what_if: bool,
}

impl AnswerSet {
    pub fn new(session_id: SessionId) -> Self {
        Self {
            session_id,
            version: 0,
            answers: BTreeMap::new(),
            what_if: false,
        }
    }

    /// Store or overwrite the answer for `metric`.
    pub fn record(&mut self, metric: MetricId, value: AnswerValue) {
        self.insert(metric, Answer::new(value));
    }

    pub fn insert(&mut self, metric: MetricId, answer: Answer) {
        self.answers.insert(metric, answer);
        self.version += 1;
    }

    pub fn get(&self, metric: &MetricId) -> Option<&Answer> {
        self.answers.get(metric)
    }

    /// True only when a user actually supplied a value.
    pub fn is_answered(&self, metric: &MetricId) -> bool {
        self.answers
            .get(metric)
            .map(|answer| answer.answered)
            .unwrap_or(false)
    }

    pub fn len(&self) -> usize {
        self.answers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.answers.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&MetricId, &Answer)> + '_ {
        self.answers.iter()
    }

    /// SHA-256 over every metric id, value and answered flag, in metric order.
    ///
    /// Two sets with the same content share a digest whatever their `version`.
    pub fn digest(&self) -> [u8; 32] {
        let mut hasher = Sha256::new();
        for (metric_id, answer) in &self.answers {
            hasher.update(metric_id.0.as_bytes());
            hasher.update([0u8]);
            match answer.value {
                AnswerValue::Boolean(flag) => hasher.update([1u8, u8::from(flag)]),
                AnswerValue::Numeric(value) => {
                    hasher.update([2u8]);
                    hasher.update(value.to_bits().to_le_bytes());
                }
            }
            hasher.update([u8::from(answer.answered)]);
        }
        hasher.finalize().into()
    }

    /// Copy of this set with `overrides` applied on top, flagged as a what-if scenario.
    pub fn with_overrides(&self, overrides: &[AnswerOverride]) -> AnswerSet {
        let mut scenario = self.clone();
        for entry in overrides {
            scenario.answers.insert(
                entry.metric_id.clone(),
                Answer {
                    value: entry.value,
                    answered: entry.answered,
                    recorded_at: None,
                },
            );
        }
        scenario.what_if = true;
        scenario
    }
}
