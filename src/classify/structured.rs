// SPDX-License-Identifier: MIT
// SPDX-FileCopyrightText: 2025 Jonathan D. A. Jewell <hyperpolymath>

//! Shape-based classifier for JSON values
//!
//! Recommends a rigid-schema relational layout or a flexible document layout
//! for a value by scoring six structural signals against a fixed rule table.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeSet;

/// The two competing storage layouts
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StorageParadigm {
    /// Rigid schema, tables and foreign keys
    Relational,
    /// Flexible schema, nested documents
    Document,
}

/// Structural signals measured on the sampled value
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StructureMetrics {
    pub max_depth: usize,
    pub has_arrays: bool,
    pub has_nested_objects: bool,
    pub field_count: usize,
    /// Fraction of array elements sharing the first element's key set (1.0 for non-arrays)
    pub consistency: f64,
    pub relationship_fields: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StructuredClassification {
    pub recommendation: StorageParadigm,
    pub confidence: u8,
    pub reasons: Vec<String>,
    pub metrics: StructureMetrics,
}

// Rule table
const DEEP_NESTING_DEPTH: usize = 3;
const DEEP_NESTING_POINTS: u32 = 3;
const ARRAYS_POINTS: u32 = 2;
const HIGH_CONSISTENCY: f64 = 0.9;
const HIGH_CONSISTENCY_POINTS: u32 = 3;
const LOW_CONSISTENCY: f64 = 0.7;
const LOW_CONSISTENCY_POINTS: u32 = 2;
const MANY_RELATIONSHIPS: usize = 2;
const RELATIONSHIP_POINTS: u32 = 2;
const MANY_FIELDS: usize = 10;
const FEW_FIELDS: usize = 5;
const FIELD_COUNT_POINTS: u32 = 1;
const NESTED_OBJECTS_POINTS: u32 = 2;
const FLAT_POINTS: u32 = 2;

const RELATIONSHIP_NAMES: &[&str] = &["id", "owner", "category", "author", "parent", "user"];

/// Sample used for an empty array
static EMPTY_SAMPLE: Value = Value::Null;

/// Classify a JSON value. Arrays are judged by their first element.
pub fn classify_structured(value: &Value) -> StructuredClassification {
    let metrics = measure(value);

    let mut relational = 0u32;
    let mut document = 0u32;
    let mut reasons = Vec::new();

    if metrics.max_depth > DEEP_NESTING_DEPTH {
        document += DEEP_NESTING_POINTS;
        reasons.push(format!(
            "Deep nesting (depth {}) fits embedded documents",
            metrics.max_depth
        ));
    }

    if metrics.has_arrays {
        document += ARRAYS_POINTS;
        reasons.push("Contains arrays, which map naturally onto documents".to_string());
    }

    if metrics.consistency >= HIGH_CONSISTENCY {
        relational += HIGH_CONSISTENCY_POINTS;
        reasons.push(format!(
            "Consistent structure ({:.0}% identical key sets) suits a fixed schema",
            metrics.consistency * 100.0
        ));
    } else if metrics.consistency < LOW_CONSISTENCY {
        document += LOW_CONSISTENCY_POINTS;
        reasons.push(format!(
            "Varying structure ({:.0}% identical key sets) needs a flexible schema",
            metrics.consistency * 100.0
        ));
    }

    if metrics.relationship_fields.len() >= MANY_RELATIONSHIPS {
        relational += RELATIONSHIP_POINTS;
        reasons.push(format!(
            "Relationship fields ({}) suggest foreign keys",
            metrics.relationship_fields.join(", ")
        ));
    }

    if metrics.field_count > MANY_FIELDS {
        relational += FIELD_COUNT_POINTS;
        reasons.push(format!("Many fields ({}) benefit from typed columns", metrics.field_count));
    } else if metrics.field_count < FEW_FIELDS {
        document += FIELD_COUNT_POINTS;
        reasons.push(format!("Few fields ({}) keep documents lightweight", metrics.field_count));
    }

    if metrics.has_nested_objects {
        document += NESTED_OBJECTS_POINTS;
        reasons.push("Nested objects below the top level favor documents".to_string());
    } else {
        relational += FLAT_POINTS;
        reasons.push("Flat structure maps directly onto table columns".to_string());
    }

    let total = relational + document;
    let (recommendation, confidence) = if total == 0 {
        (StorageParadigm::Relational, 50)
    } else if relational >= document {
        (StorageParadigm::Relational, percent(relational, total))
    } else {
        (StorageParadigm::Document, percent(document, total))
    };

    reasons.insert(0, format!("Score: relational={}, document={}", relational, document));

    StructuredClassification {
        recommendation,
        confidence,
        reasons,
        metrics,
    }
}

fn percent(part: u32, total: u32) -> u8 {
    (part as f64 / total as f64 * 100.0).round() as u8
}

fn measure(value: &Value) -> StructureMetrics {
    let (sample, consistency) = match value {
        Value::Array(items) => (items.first().unwrap_or(&EMPTY_SAMPLE), consistency(items)),
        other => (other, 1.0),
    };

    let mut relationship_fields = Vec::new();
    let mut field_count = 0;
    let mut has_nested_objects = false;
    if let Value::Object(map) = sample {
        field_count = map.len();
        for (key, child) in map {
            if is_relationship_field(key) {
                relationship_fields.push(key.clone());
            }
            if contains_object(child) {
                has_nested_objects = true;
            }
        }
    }

    StructureMetrics {
        max_depth: depth(sample),
        has_arrays: contains_array(sample),
        has_nested_objects,
        field_count,
        consistency,
        relationship_fields,
    }
}

/// Containers count one level each; scalars are depth zero
fn depth(value: &Value) -> usize {
    match value {
        Value::Object(map) => 1 + map.values().map(depth).max().unwrap_or(0),
        Value::Array(items) => 1 + items.iter().map(depth).max().unwrap_or(0),
        _ => 0,
    }
}

fn contains_array(value: &Value) -> bool {
    match value {
        Value::Array(_) => true,
        Value::Object(map) => map.values().any(contains_array),
        _ => false,
    }
}

fn contains_object(value: &Value) -> bool {
    match value {
        Value::Object(_) => true,
        Value::Array(items) => items.iter().any(contains_object),
        _ => false,
    }
}

fn key_set(value: &Value) -> BTreeSet<&str> {
    match value {
        Value::Object(map) => map.keys().map(String::as_str).collect(),
        _ => BTreeSet::new(),
    }
}

fn consistency(items: &[Value]) -> f64 {
    let Some(first) = items.first() else {
        return 1.0;
    };
    let reference = key_set(first);
    let matching = items.iter().filter(|item| key_set(item) == reference).count();
    matching as f64 / items.len() as f64
}

fn is_relationship_field(key: &str) -> bool {
    let lower = key.to_lowercase();
    lower.ends_with("_id")
        || lower.ends_with("_ref")
        || lower.starts_with("ref_")
        || (key.len() > 2 && key.ends_with("Id"))
        || RELATIONSHIP_NAMES.contains(&lower.as_str())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_uniform_flat_records_are_relational() {
        let records: Vec<Value> = (0..100)
            .map(|i| json!({"id": i, "name": format!("user{}", i), "email": "a@b.c", "age": 30}))
            .collect();
        let result = classify_structured(&Value::Array(records));

        assert_eq!(result.recommendation, StorageParadigm::Relational);
        // consistency +3, flat +2 vs few fields +1
        assert_eq!(result.reasons[0], "Score: relational=5, document=1");
        assert_eq!(result.confidence, 83);
        assert_eq!(result.metrics.consistency, 1.0);
        assert_eq!(result.metrics.field_count, 4);
        assert_eq!(result.metrics.relationship_fields, vec!["id".to_string()]);
        assert!(!result.metrics.has_nested_objects);
    }

    #[test]
    fn test_deep_irregular_documents() {
        let value = json!([
            {"title": "a", "meta": {"tags": ["x"], "extra": {"deeper": {"deepest": 1}}}},
            {"title": "b", "body": "text"},
            {"other": true},
        ]);
        let result = classify_structured(&value);

        assert_eq!(result.recommendation, StorageParadigm::Document);
        assert!(result.metrics.max_depth > 3);
        assert!(result.metrics.has_arrays);
        assert!(result.metrics.has_nested_objects);
        assert!((result.metrics.consistency - 1.0 / 3.0).abs() < 1e-9);
        // deep 3 + arrays 2 + low consistency 2 + few fields 1 + nested 2 = 10
        assert_eq!(result.reasons[0], "Score: relational=0, document=10");
        assert_eq!(result.confidence, 100);
    }

    #[test]
    fn test_relationship_fields_detected() {
        let value = json!({
            "id": 1, "owner": "u1", "category_id": 4, "parentId": 9, "title": "t",
            "a": 1, "b": 2, "c": 3, "d": 4, "e": 5, "f": 6
        });
        let result = classify_structured(&value);

        let fields = &result.metrics.relationship_fields;
        assert!(fields.contains(&"id".to_string()));
        assert!(fields.contains(&"owner".to_string()));
        assert!(fields.contains(&"category_id".to_string()));
        assert!(fields.contains(&"parentId".to_string()));
        assert!(!fields.contains(&"title".to_string()));
        assert_eq!(result.metrics.field_count, 11);
        // consistency 3 + relationships 2 + many fields 1 + flat 2
        assert_eq!(result.reasons[0], "Score: relational=8, document=0");
        assert_eq!(result.recommendation, StorageParadigm::Relational);
    }

    #[test]
    fn test_scalar_and_empty_inputs() {
        for value in [json!(42), json!(null), json!([]), json!("text")] {
            let result = classify_structured(&value);
            assert!(result.confidence <= 100);
            assert!(result.reasons[0].starts_with("Score: "));
            assert_eq!(result.metrics.field_count, 0);
        }
    }

    #[test]
    fn test_reasons_one_per_fired_signal() {
        let result = classify_structured(&json!({"a": 1}));
        // summary + consistency + few fields + flat
        assert_eq!(result.reasons.len(), 4);
    }

    #[test]
    fn test_does_not_mutate_input() {
        let value = json!([{"a": {"b": [1, 2]}}, {"a": 1}]);
        let before = value.clone();
        let first = classify_structured(&value);
        let second = classify_structured(&value);
        assert_eq!(value, before);
        assert_eq!(first, second);
    }
}
