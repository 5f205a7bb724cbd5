use std::collections::BTreeMap;
use std::fs::File;
use std::io::{BufReader, Read};
use std::path::Path;

use tracing::info;

use super::error::ConfigurationError;
use super::rule::{RuleId, ScoringRule};
use super::taxonomy::{Taxonomy, TaxonomyInconsistency, TaxonomySnapshot};

/// Failure to read a rule catalog or taxonomy snapshot from JSON.
#[derive(Debug, thiserror::Error)]
pub enum CatalogLoadError {
    #[error("failed to read catalog file: {0}")]
    Io(#[from] std::io::Error),
    #[error("invalid catalog JSON: {0}")]
    Json(#[from] serde_json::Error),
    #[error(transparent)]
    Configuration(#[from] ConfigurationError),
    #[error(transparent)]
    Taxonomy(#[from] TaxonomyInconsistency),
}

/// Parse a [`TaxonomySnapshot`] document and build the hierarchy.
pub fn taxonomy_from_json_reader<R: Read>(reader: R) -> Result<Taxonomy, CatalogLoadError> {
    let snapshot: TaxonomySnapshot = serde_json::from_reader(reader)?;
    Ok(Taxonomy::try_from(snapshot)?)
}

pub fn load_taxonomy(path: impl AsRef<Path>) -> Result<Taxonomy, CatalogLoadError> {
    let path = path.as_ref();
    let file = File::open(path)?;
    let taxonomy = taxonomy_from_json_reader(BufReader::new(file))?;
    info!(
        path = %path.display(),
        pillars = taxonomy.pillars().count(),
        metrics = taxonomy.active_metric_count(),
        "taxonomy loaded"
    );
    Ok(taxonomy)
}

/// All known scoring rules. At most one of them is the default.
#[derive(Debug, Clone, Default)]
pub struct RuleCatalog {
    rules: BTreeMap<RuleId, ScoringRule>,
}

impl RuleCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Catalog holding only the built-in rule, flagged as default.
    pub fn standard() -> Self {
        let mut rule = ScoringRule::default();
        rule.is_default = true;
        let mut rules = BTreeMap::new();
        rules.insert(rule.id.clone(), rule);
        Self { rules }
    }

    pub fn from_rules(
        rules: impl IntoIterator<Item = ScoringRule>,
    ) -> Result<Self, ConfigurationError> {
        let mut catalog = Self::new();
        for rule in rules {
            catalog.insert(rule)?;
        }
        Ok(catalog)
    }

    /// Parse a JSON array of rules.
    pub fn from_json_reader<R: Read>(reader: R) -> Result<Self, CatalogLoadError> {
        let rules: Vec<ScoringRule> = serde_json::from_reader(reader)?;
        Ok(Self::from_rules(rules)?)
    }

    pub fn from_path(path: impl AsRef<Path>) -> Result<Self, CatalogLoadError> {
        let path = path.as_ref();
        let file = File::open(path)?;
        let catalog = Self::from_json_reader(BufReader::new(file))?;
        info!(path = %path.display(), rules = catalog.len(), "rule catalog loaded");
        Ok(catalog)
    }

    pub fn len(&self) -> usize {
        self.rules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }

    pub fn get(&self, id: &RuleId) -> Option<&ScoringRule> {
        self.rules.get(id)
    }

    pub fn rules(&self) -> impl Iterator<Item = &ScoringRule> + '_ {
        self.rules.values()
    }

    pub fn default_rule(&self) -> Option<&ScoringRule> {
        self.rules.values().find(|rule| rule.is_default)
    }

    /// Add a new rule. A second default is rejected rather than silently demoting the first.
    pub fn insert(&mut self, rule: ScoringRule) -> Result<(), ConfigurationError> {
        rule.validate()?;
        if self.rules.contains_key(&rule.id) {
            return Err(ConfigurationError::DuplicateRule(rule.id));
        }
        if rule.is_default {
            if let Some(existing) = self.default_rule() {
                return Err(ConfigurationError::MultipleDefaults {
                    existing: existing.id.clone(),
                    candidate: rule.id,
                });
            }
        }
        self.rules.insert(rule.id.clone(), rule);
        Ok(())
    }

    /// Replace an existing rule with an edited copy, returning the stored revision.
    ///
    /// The version always moves to `previous + 1`; the default flag stays with the stored rule.
    pub fn revise(&mut self, mut rule: ScoringRule) -> Result<&ScoringRule, ConfigurationError> {
        rule.validate()?;
        let previous = self
            .rules
            .get(&rule.id)
            .ok_or_else(|| ConfigurationError::MissingRule(rule.id.clone()))?;
        rule.version = previous.version + 1;
        rule.is_default = previous.is_default;

        let id = rule.id.clone();
        self.rules.insert(id.clone(), rule);
        Ok(&self.rules[&id])
    }

    /// Move the default flag to `id`.
    pub fn set_default(&mut self, id: &RuleId) -> Result<(), ConfigurationError> {
        if !self.rules.contains_key(id) {
            return Err(ConfigurationError::MissingRule(id.clone()));
        }
        for rule in self.rules.values_mut() {
            rule.is_default = &rule.id == id;
        }
        Ok(())
    }

    /// Explicitly requested rule, or the default when none is named.
    pub fn resolve(&self, id: Option<&RuleId>) -> Result<&ScoringRule, ConfigurationError> {
        match id {
            Some(id) => self
                .rules
                .get(id)
                .ok_or_else(|| ConfigurationError::MissingRule(id.clone())),
            None => self.default_rule().ok_or(ConfigurationError::NoDefaultRule),
        }
    }
}
