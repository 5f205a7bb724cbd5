use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

use super::rule::ScoringRule;

/// Identifier wrapper for maturity pillars.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PillarId(pub String);

/// Identifier wrapper for assessment topics.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TopicId(pub String);

/// Identifier wrapper for individual metrics.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct MetricId(pub String);

impl fmt::Display for PillarId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl fmt::Display for TopicId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl fmt::Display for MetricId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// How a metric's raw answer is captured. Scoring does not depend on it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MetricKind {
    #[default]
    Scale,
    Boolean,
    Numeric,
}

fn default_weight() -> f64 {
    1.0
}

fn default_active() -> bool {
    true
}

fn default_max_value() -> f64 {
    1.0
}

/// Top level grouping of the maturity model.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Pillar {
    pub id: PillarId,
    pub name: String,
    #[serde(default = "default_weight")]
    pub weight: f64,
    #[serde(default = "default_active")]
    pub active: bool,
}

/// Topic within a pillar; owns the metrics that are scored together.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Topic {
    pub id: TopicId,
    pub name: String,
    pub pillar_id: PillarId,
    #[serde(default = "default_weight")]
    pub weight: f64,
    #[serde(default = "default_active")]
    pub active: bool,
}

/// Leaf unit of assessment. `level` is the maturity rung the metric represents.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Metric {
    pub id: MetricId,
    pub name: String,
    pub topic_id: TopicId,
    pub level: u32,
    #[serde(default = "default_weight")]
    pub weight: f64,
    #[serde(default)]
    pub kind: MetricKind,
    #[serde(default)]
    pub min_value: f64,
    #[serde(default = "default_max_value")]
    pub max_value: f64,
    #[serde(default = "default_active")]
    pub active: bool,
}

/// Structural problems in the taxonomy snapshot handed to the engine.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum TaxonomyInconsistency {
    #[error("pillar {0} is defined more than once")]
    DuplicatePillar(PillarId),
    #[error("topic {0} is defined more than once")]
    DuplicateTopic(TopicId),
    #[error("metric {0} is defined more than once")]
    DuplicateMetric(MetricId),
    #[error("topic {topic} references unknown pillar {pillar}")]
    UnknownPillar { topic: TopicId, pillar: PillarId },
    #[error("metric {metric} references unknown topic {topic}")]
    UnknownTopic { metric: MetricId, topic: TopicId },
    #[error("{entity} has invalid weight {weight}; weights must be finite and non-negative")]
    InvalidWeight { entity: String, weight: f64 },
    #[error("metric {metric} has min value {min} above max value {max}")]
    InvalidValueRange { metric: MetricId, min: f64, max: f64 },
    #[error("metric {metric} has level {level}, outside the rule's scale 1..={max_level}")]
    MetricLevelOutOfRange {
        metric: MetricId,
        level: u32,
        max_level: u32,
    },
}

#[derive(Debug, Clone, PartialEq)]
struct PillarNode {
    pillar: Pillar,
    topics: Vec<TopicId>,
}

#[derive(Debug, Clone, PartialEq)]
struct TopicNode {
    topic: Topic,
    metrics: Vec<MetricId>,
}

/// Read-only Pillar → Topic → Metric hierarchy, validated on construction.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Taxonomy {
    pillar_order: Vec<PillarId>,
    pillars: BTreeMap<PillarId, PillarNode>,
    topics: BTreeMap<TopicId, TopicNode>,
    metrics: BTreeMap<MetricId, Metric>,
}

impl Taxonomy {
    /// Build the hierarchy from flat lists. Input order is kept for display purposes.
    pub fn new(
        pillars: Vec<Pillar>,
        topics: Vec<Topic>,
        metrics: Vec<Metric>,
    ) -> Result<Self, TaxonomyInconsistency> {
        let mut pillar_order = Vec::with_capacity(pillars.len());
        let mut pillar_nodes = BTreeMap::new();
        for pillar in pillars {
            check_weight(format!("pillar {}", pillar.id), pillar.weight)?;
            if pillar_nodes.contains_key(&pillar.id) {
                return Err(TaxonomyInconsistency::DuplicatePillar(pillar.id));
            }
            pillar_order.push(pillar.id.clone());
            pillar_nodes.insert(
                pillar.id.clone(),
                PillarNode {
                    pillar,
                    topics: Vec::new(),
                },
            );
        }

        let mut topic_nodes = BTreeMap::new();
        for topic in topics {
            check_weight(format!("topic {}", topic.id), topic.weight)?;
            if topic_nodes.contains_key(&topic.id) {
                return Err(TaxonomyInconsistency::DuplicateTopic(topic.id));
            }
            let parent = pillar_nodes.get_mut(&topic.pillar_id).ok_or_else(|| {
                TaxonomyInconsistency::UnknownPillar {
                    topic: topic.id.clone(),
                    pillar: topic.pillar_id.clone(),
                }
            })?;
            parent.topics.push(topic.id.clone());
            topic_nodes.insert(
                topic.id.clone(),
                TopicNode {
                    topic,
                    metrics: Vec::new(),
                },
            );
        }

        let mut metric_map = BTreeMap::new();
        for metric in metrics {
            check_weight(format!("metric {}", metric.id), metric.weight)?;
            if metric_map.contains_key(&metric.id) {
                return Err(TaxonomyInconsistency::DuplicateMetric(metric.id));
            }
            if metric.min_value.is_nan()
                || metric.max_value.is_nan()
                || metric.min_value > metric.max_value
            {
                return Err(TaxonomyInconsistency::InvalidValueRange {
                    metric: metric.id,
                    min: metric.min_value,
                    max: metric.max_value,
                });
            }
            let parent = topic_nodes.get_mut(&metric.topic_id).ok_or_else(|| {
                TaxonomyInconsistency::UnknownTopic {
                    metric: metric.id.clone(),
                    topic: metric.topic_id.clone(),
                }
            })?;
            parent.metrics.push(metric.id.clone());
            metric_map.insert(metric.id.clone(), metric);
        }

        Ok(Self {
            pillar_order,
            pillars: pillar_nodes,
            topics: topic_nodes,
            metrics: metric_map,
        })
    }

    /// Every participating metric must sit on the rule's level scale.
    pub fn validate_against(&self, rule: &ScoringRule) -> Result<(), TaxonomyInconsistency> {
        for pillar in self.active_pillars() {
            for topic in self.active_topics_of(&pillar.id) {
                for metric in self.active_metrics_of(&topic.id) {
                    if metric.level == 0 || metric.level > rule.metric_max_level {
                        return Err(TaxonomyInconsistency::MetricLevelOutOfRange {
                            metric: metric.id.clone(),
                            level: metric.level,
                            max_level: rule.metric_max_level,
                        });
                    }
                }
            }
        }
        Ok(())
    }

    pub fn pillars(&self) -> impl Iterator<Item = &Pillar> + '_ {
        self.pillar_order
            .iter()
            .filter_map(|id| self.pillars.get(id).map(|node| &node.pillar))
    }

    pub fn active_pillars(&self) -> impl Iterator<Item = &Pillar> + '_ {
        self.pillars().filter(|pillar| pillar.active)
    }

    pub fn pillar(&self, id: &PillarId) -> Option<&Pillar> {
        self.pillars.get(id).map(|node| &node.pillar)
    }

    pub fn topics_of(&self, pillar: &PillarId) -> impl Iterator<Item = &Topic> + '_ {
        self.pillars
            .get(pillar)
            .into_iter()
            .flat_map(|node| node.topics.iter())
            .filter_map(|id| self.topics.get(id).map(|node| &node.topic))
    }

    pub fn active_topics_of(&self, pillar: &PillarId) -> impl Iterator<Item = &Topic> + '_ {
        self.topics_of(pillar).filter(|topic| topic.active)
    }

    pub fn topic(&self, id: &TopicId) -> Option<&Topic> {
        self.topics.get(id).map(|node| &node.topic)
    }

    pub fn metrics_of(&self, topic: &TopicId) -> impl Iterator<Item = &Metric> + '_ {
        self.topics
            .get(topic)
            .into_iter()
            .flat_map(|node| node.metrics.iter())
            .filter_map(|id| self.metrics.get(id))
    }

    pub fn active_metrics_of(&self, topic: &TopicId) -> impl Iterator<Item = &Metric> + '_ {
        self.metrics_of(topic).filter(|metric| metric.active)
    }

    pub fn metric(&self, id: &MetricId) -> Option<&Metric> {
        self.metrics.get(id)
    }

    /// A metric participates iff it, its topic and its pillar are all active.
    pub fn is_participating(&self, id: &MetricId) -> bool {
        let Some(metric) = self.metrics.get(id) else {
            return false;
        };
        let Some(topic) = self.topic(&metric.topic_id) else {
            return false;
        };
        metric.active
            && topic.active
            && self
                .pillar(&topic.pillar_id)
                .map(|pillar| pillar.active)
                .unwrap_or(false)
    }

    pub fn participating_metrics(&self) -> impl Iterator<Item = &Metric> + '_ {
        self.active_pillars()
            .flat_map(move |pillar| self.active_topics_of(&pillar.id))
            .flat_map(move |topic| self.active_metrics_of(&topic.id))
    }

    pub fn active_metric_count(&self) -> usize {
        self.participating_metrics().count()
    }

    /// Flatten back into the `(pillars, topics, metrics)` lists accepted by [`Taxonomy::new`].
    pub fn to_parts(&self) -> (Vec<Pillar>, Vec<Topic>, Vec<Metric>) {
        let pillars: Vec<Pillar> = self.pillars().cloned().collect();
        let topics: Vec<Topic> = pillars
            .iter()
            .flat_map(|pillar| self.topics_of(&pillar.id).cloned())
            .collect();
        let metrics = topics
            .iter()
            .flat_map(|topic| self.metrics_of(&topic.id).cloned())
            .collect();
        (pillars, topics, metrics)
    }
}

fn check_weight(entity: String, weight: f64) -> Result<(), TaxonomyInconsistency> {
    if weight.is_finite() && weight >= 0.0 {
        Ok(())
    } else {
        Err(TaxonomyInconsistency::InvalidWeight { entity, weight })
    }
}

/// Wire shape of a taxonomy: three flat lists linked by parent ids.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TaxonomySnapshot {
    pub pillars: Vec<Pillar>,
    #[serde(default)]
    pub topics: Vec<Topic>,
    #[serde(default)]
    pub metrics: Vec<Metric>,
}

impl TryFrom<TaxonomySnapshot> for Taxonomy {
    type Error = TaxonomyInconsistency;

    fn try_from(snapshot: TaxonomySnapshot) -> Result<Self, Self::Error> {
        Taxonomy::new(snapshot.pillars, snapshot.topics, snapshot.metrics)
    }
}

impl From<&Taxonomy> for TaxonomySnapshot {
    fn from(taxonomy: &Taxonomy) -> Self {
        let (pillars, topics, metrics) = taxonomy.to_parts();
        Self {
            pillars,
            topics,
            metrics,
        }
    }
}
