use std::collections::HashSet;

use serde::{Deserialize, Serialize};

use crate::error::ReconError;

// ---------------------------------------------------------------------------
// Limits
// ---------------------------------------------------------------------------

/// Brute-force comparison cap when no amount rule can pre-filter candidates.
pub const MAX_CROSS_PRODUCT: u64 = 10_000_000;

/// Combined row cap for one request on the wire path.
pub const MAX_TOTAL_ROWS: usize = 200_000;

/// Similarity tables smaller than this (distinct A × distinct B) are built eagerly.
pub const PRECOMPUTE_PAIR_LIMIT: usize = 50_000;

/// Pre-filter window as a multiple of the amount tolerance.
pub const PREFILTER_WIDENING: f64 = 5.0;

/// Numeric scores reach 0 at this multiple of the tolerance.
pub const NUMERIC_DECAY: f64 = 10.0;

/// Date scores reach 0 at this multiple of the day tolerance.
pub const DATE_DECAY: f64 = 5.0;

/// Group tolerance used when the config has no `tolerance_numeric` rule.
pub const DEFAULT_GROUP_TOLERANCE: f64 = 0.01;

/// Largest `group.maxGroupSize` a config may ask for.
pub const MAX_GROUP_SIZE_LIMIT: usize = 64;

// ---------------------------------------------------------------------------
// Top-level config
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MatchingConfig {
    #[serde(default)]
    pub rules: Vec<MatchingRule>,
    #[serde(default = "default_threshold")]
    pub min_confidence_threshold: f64,
    #[serde(default)]
    pub matching_type: MatchingType,
    #[serde(default)]
    pub group: GroupSearchConfig,
}

fn default_threshold() -> f64 {
    0.8
}

impl Default for MatchingConfig {
    fn default() -> Self {
        Self {
            rules: Vec::new(),
            min_confidence_threshold: default_threshold(),
            matching_type: MatchingType::default(),
            group: GroupSearchConfig::default(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum MatchingType {
    #[default]
    OneToOne,
    Group,
}

/// Bounds for the subset-sum search in the group pass.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GroupSearchConfig {
    #[serde(default = "default_max_group_size")]
    pub max_group_size: usize,
    #[serde(default = "default_max_search_nodes")]
    pub max_search_nodes: usize,
}

fn default_max_group_size() -> usize {
    12
}

fn default_max_search_nodes() -> usize {
    100_000
}

impl Default for GroupSearchConfig {
    fn default() -> Self {
        Self {
            max_group_size: default_max_group_size(),
            max_search_nodes: default_max_search_nodes(),
        }
    }
}

// ---------------------------------------------------------------------------
// Rules
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MatchType {
    Exact,
    ToleranceNumeric,
    ToleranceDate,
    SimilarText,
    Contains,
}

impl std::fmt::Display for MatchType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Exact => write!(f, "exact"),
            Self::ToleranceNumeric => write!(f, "tolerance_numeric"),
            Self::ToleranceDate => write!(f, "tolerance_date"),
            Self::SimilarText => write!(f, "similar_text"),
            Self::Contains => write!(f, "contains"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NumericMode {
    #[default]
    Fixed,
    /// `toleranceValue` is a fraction of the larger amount (0.01 = 1%).
    Percentage,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MatchingRule {
    pub id: String,
    pub column_a: String,
    pub column_b: String,
    pub match_type: MatchType,
    #[serde(default = "default_weight")]
    pub weight: f64,
    /// Amount for `tolerance_numeric`, days for `tolerance_date`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tolerance_value: Option<f64>,
    #[serde(default)]
    pub tolerance_numeric_mode: NumericMode,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub similarity_threshold: Option<f64>,
}

fn default_weight() -> f64 {
    1.0
}

const DEFAULT_SIMILARITY_THRESHOLD: f64 = 0.8;

impl MatchingRule {
    /// Configured tolerance, never negative.
    pub fn tolerance(&self) -> f64 {
        self.tolerance_value.unwrap_or(0.0).max(0.0)
    }

    pub fn similarity_threshold(&self) -> f64 {
        self.similarity_threshold.unwrap_or(DEFAULT_SIMILARITY_THRESHOLD)
    }

    /// Weight used by the aggregator: non-positive weights count as 1.
    pub fn effective_weight(&self) -> f64 {
        if self.weight > 0.0 && self.weight.is_finite() {
            self.weight
        } else {
            1.0
        }
    }

    /// Absolute amount tolerance around `reference` for a numeric rule.
    pub fn amount_tolerance(&self, reference: f64) -> f64 {
        match self.tolerance_numeric_mode {
            NumericMode::Fixed => self.tolerance(),
            NumericMode::Percentage => reference.max(0.0) * self.tolerance(),
        }
    }
}

// ---------------------------------------------------------------------------
// Lookups
// ---------------------------------------------------------------------------

impl MatchingConfig {
    /// First `tolerance_numeric` rule; drives the pre-filter and group tolerance.
    pub fn numeric_rule(&self) -> Option<&MatchingRule> {
        self.first_of(MatchType::ToleranceNumeric)
    }

    pub fn first_of(&self, match_type: MatchType) -> Option<&MatchingRule> {
        self.rules.iter().find(|r| r.match_type == match_type)
    }

    /// Tolerance for a group whose one-sided sum must explain `target`.
    pub fn group_tolerance(&self, target: f64) -> f64 {
        match self.numeric_rule() {
            Some(rule) => match rule.tolerance_numeric_mode {
                NumericMode::Fixed => rule.tolerance(),
                NumericMode::Percentage => target.abs() * rule.tolerance(),
            },
            None => DEFAULT_GROUP_TOLERANCE,
        }
    }

    pub fn total_weight(&self) -> f64 {
        self.rules.iter().map(MatchingRule::effective_weight).sum()
    }
}

// ---------------------------------------------------------------------------
// Parse + Validate
// ---------------------------------------------------------------------------

/// Non-fatal config finding. The engine runs regardless.
#[derive(Debug, Clone, PartialEq)]
pub enum ConfigWarning {
    NoRules,
    WeightsNotNormalized { total: f64 },
    NonPositiveWeight { rule_id: String },
}

impl std::fmt::Display for ConfigWarning {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::NoRules => write!(f, "no rules configured; nothing can match"),
            Self::WeightsNotNormalized { total } => {
                write!(f, "rule weights sum to {total:.4}, not 1; confidences are rescaled")
            }
            Self::NonPositiveWeight { rule_id } => {
                write!(f, "rule '{rule_id}': non-positive weight is treated as 1")
            }
        }
    }
}

impl MatchingConfig {
    pub fn from_toml(input: &str) -> Result<Self, ReconError> {
        let config: MatchingConfig =
            toml::from_str(input).map_err(|e| ReconError::ConfigParse(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_json(input: &str) -> Result<Self, ReconError> {
        let config: MatchingConfig =
            serde_json::from_str(input).map_err(|e| ReconError::ConfigParse(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Reject configs the engine cannot interpret; report soft issues as warnings.
    pub fn validate(&self) -> Result<Vec<ConfigWarning>, ReconError> {
        if !(0.0..=1.0).contains(&self.min_confidence_threshold) {
            return Err(ReconError::ConfigValidation(format!(
                "minConfidenceThreshold must be in [0, 1], got {}",
                self.min_confidence_threshold
            )));
        }

        if !(2..=MAX_GROUP_SIZE_LIMIT).contains(&self.group.max_group_size) {
            return Err(ReconError::ConfigValidation(format!(
                "group.maxGroupSize must be between 2 and {MAX_GROUP_SIZE_LIMIT}, got {}",
                self.group.max_group_size
            )));
        }

        let mut seen = HashSet::new();
        for rule in &self.rules {
            if !seen.insert(rule.id.as_str()) {
                return Err(ReconError::ConfigValidation(format!(
                    "duplicate rule id '{}'",
                    rule.id
                )));
            }
            if let Some(tol) = rule.tolerance_value {
                if !tol.is_finite() || tol < 0.0 {
                    return Err(ReconError::ConfigValidation(format!(
                        "rule '{}': toleranceValue must be a non-negative number, got {tol}",
                        rule.id
                    )));
                }
            }
            if let Some(threshold) = rule.similarity_threshold {
                if !(0.0..=1.0).contains(&threshold) {
                    return Err(ReconError::ConfigValidation(format!(
                        "rule '{}': similarityThreshold must be in [0, 1], got {threshold}",
                        rule.id
                    )));
                }
            }
        }

        Ok(self.warnings())
    }

    /// Soft findings only. The engine logs these but never rejects a run over them.
    pub fn warnings(&self) -> Vec<ConfigWarning> {
        let mut warnings = Vec::new();
        if self.rules.is_empty() {
            warnings.push(ConfigWarning::NoRules);
            return warnings;
        }
        for rule in &self.rules {
            if rule.effective_weight() != rule.weight {
                warnings.push(ConfigWarning::NonPositiveWeight { rule_id: rule.id.clone() });
            }
        }
        let total = self.total_weight();
        if (total - 1.0).abs() > 1e-6 {
            warnings.push(ConfigWarning::WeightsNotNormalized { total });
        }
        warnings
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
