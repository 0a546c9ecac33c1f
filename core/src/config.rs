use crate::index::Field;
use serde::{Deserialize, Serialize};

/// Multipliers applied to each field's BM25 sum.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FieldWeights {
    pub name: f64,
    pub title: f64,
    pub topics: f64,
    pub description: f64,
}

impl Default for FieldWeights {
    fn default() -> Self { Self { name: 10.0, title: 5.0, topics: 3.0, description: 1.0 } }
}

impl FieldWeights {
    pub fn get(&self, field: Field) -> f64 {
        match field {
            Field::Name => self.name,
            Field::Title => self.title,
            Field::Topics => self.topics,
            Field::Description => self.description,
        }
    }
}

/// Ranking constants. The defaults were tuned empirically against the
/// package catalog and should be kept for compatible orderings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RankConfig {
    /// Maximum number of identifiers returned.
    pub limit: usize,
    /// Records scoring below this are dropped from the BM25 results.
    pub threshold: f64,
    /// Term-frequency saturation.
    pub k1: f64,
    /// Length normalization strength.
    pub b: f64,
    pub field_weights: FieldWeights,
    /// Added when a raw query word equals the record name.
    pub exact_name_boost: f64,
    /// Multiplier for the record's quality score.
    pub quality_weight: f64,
    /// Minimum mean IDF for an expansion term to be used.
    pub min_specificity: f64,
    pub max_expansion_terms: usize,
}

impl Default for RankConfig {
    fn default() -> Self {
        Self {
            limit: 100,
            threshold: 3.0,
            k1: 1.2,
            b: 0.75,
            field_weights: FieldWeights::default(),
            exact_name_boost: 50.0,
            quality_weight: 0.1,
            min_specificity: 1.0,
            max_expansion_terms: 5,
        }
    }
}

impl RankConfig {
    /// Settings must be a JSON object; missing keys keep their defaults.
    pub fn from_json_str(s: &str) -> anyhow::Result<Self> {
        let value: serde_json::Value = serde_json::from_str(s)?;
        if !value.is_object() {
            anyhow::bail!("ranking settings must be a JSON object");
        }
        Ok(serde_json::from_value(value)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn partial_json_keeps_defaults() {
        let cfg = RankConfig::from_json_str(r#"{"limit": 20, "field_weights": {"name": 12}}"#).unwrap();
        assert_eq!(cfg.limit, 20);
        assert_eq!(cfg.threshold, 3.0);
        assert_eq!(cfg.field_weights.name, 12.0);
        assert_eq!(cfg.field_weights.title, 5.0);
        assert_eq!(cfg.field_weights.get(Field::Description), 1.0);
    }

    #[test]
    fn rejects_garbage() {
        assert!(RankConfig::from_json_str("[1, 2]").is_err());
        assert!(RankConfig::from_json_str("3").is_err());
        assert!(RankConfig::from_json_str("{not json").is_err());
        assert_eq!(RankConfig::from_json_str("{}").unwrap(), RankConfig::default());
    }
}
