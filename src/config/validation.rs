//! Config validation: unknown-key detection with Levenshtein suggestions
//! and cross-field range checks.
//!
//! Two-pass parse approach: first deserialize raw TOML into `toml::Value`,
//! walk the key tree, compare against known field names, and emit warnings
//! with "did you mean?" suggestions. Then proceed with normal serde
//! deserialization. Warnings never break existing configs.
//!
//! Arrays of tables are walked element by element under a `[]` marker, so
//! every `[[evaluation.items]]` entry is checked against `evaluation.items[]`.

use super::analysis_config::{AnalysisConfig, TriggerSpec};
use crate::snapshot::Combination;
use std::collections::{HashMap, HashSet};

/// A non-fatal config warning (typo, suspicious value).
#[derive(Debug, Clone)]
pub struct ValidationWarning {
    pub field: String,
    pub message: String,
    pub suggestion: Option<String>,
}

impl std::fmt::Display for ValidationWarning {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.message)?;
        if let Some(ref s) = self.suggestion {
            write!(f, ", did you mean '{s}'?")?;
        }
        Ok(())
    }
}

// ============================================================================
// Known Config Keys
// ============================================================================

const CONDITION_FIELDS: &[&str] = &[
    "channel",
    "statistic",
    "duration",
    "duration_sec",
    "logic",
    "threshold",
];

const RUNDOWN_FIELDS: &[&str] = &[
    "channel",
    "statistic",
    "duration",
    "duration_sec",
    "threshold_high",
    "threshold_low",
    "threshold1",
    "threshold2",
];

const ITEM_FIELDS: &[&str] = &[
    "id",
    "item",
    "display_name",
    "assessment_name",
    "type",
    "condition_logic",
    "conditions",
    "condition",
    "source",
    "logic",
    "threshold",
];

fn add_fields(keys: &mut HashSet<String>, prefix: &str, fields: &[&str]) {
    keys.insert(prefix.to_string());
    for field in fields {
        keys.insert(format!("{prefix}.{field}"));
    }
}

/// Returns the complete set of valid dotted key paths for `AnalysisConfig`.
///
/// Must be kept in step with the serde structs in `analysis_config.rs`,
/// aliases included.
pub fn known_config_keys() -> HashSet<String> {
    let mut keys = HashSet::new();

    add_fields(&mut keys, "run", &["name", "engine", "bench"]);

    keys.insert("cycle".to_string());
    for event in ["time_base", "startup_time", "ignition_time"] {
        add_fields(&mut keys, &format!("cycle.{event}"), CONDITION_FIELDS);
    }
    for rundown in ["rundown_ng", "rundown_np"] {
        add_fields(&mut keys, &format!("cycle.{rundown}"), RUNDOWN_FIELDS);
    }

    add_fields(&mut keys, "snapshot", &["display_channels", "combination"]);
    for trigger in ["condition1", "condition2"] {
        let prefix = format!("snapshot.{trigger}");
        add_fields(&mut keys, &prefix, CONDITION_FIELDS);
        keys.insert(format!("{prefix}.enabled"));
    }

    add_fields(&mut keys, "evaluation", &["items", "evaluations"]);
    for items in ["evaluation.items[]", "evaluation.evaluations[]"] {
        add_fields(&mut keys, items, ITEM_FIELDS);
        add_fields(&mut keys, &format!("{items}.conditions[]"), CONDITION_FIELDS);
        add_fields(&mut keys, &format!("{items}.condition"), CONDITION_FIELDS);
    }

    keys
}

// ============================================================================
// TOML Key Walker
// ============================================================================

/// Recursively collect dotted key paths from a TOML value.
///
/// Tables inside arrays are walked under `<key>[]`.
pub fn walk_toml_keys(value: &toml::Value, prefix: &str) -> Vec<String> {
    let mut keys = Vec::new();
    if let Some(table) = value.as_table() {
        for (k, v) in table {
            let path = if prefix.is_empty() {
                k.clone()
            } else {
                format!("{prefix}.{k}")
            };
            keys.push(path.clone());
            match v {
                toml::Value::Table(_) => keys.extend(walk_toml_keys(v, &path)),
                toml::Value::Array(elements) => {
                    let element_path = format!("{path}[]");
                    for element in elements.iter().filter(|e| e.is_table()) {
                        keys.extend(walk_toml_keys(element, &element_path));
                    }
                }
                _ => {}
            }
        }
    }
    keys
}

// ============================================================================
// Levenshtein Distance
// ============================================================================

/// Compute the Levenshtein edit distance between two strings.
fn levenshtein(a: &str, b: &str) -> usize {
    let a: Vec<char> = a.chars().collect();
    let b: Vec<char> = b.chars().collect();
    if a.is_empty() {
        return b.len();
    }
    if b.is_empty() {
        return a.len();
    }

    let mut prev: Vec<usize> = (0..=b.len()).collect();
    let mut curr = vec![0; b.len() + 1];

    for (i, ca) in a.iter().enumerate() {
        curr[0] = i + 1;
        for (j, cb) in b.iter().enumerate() {
            let cost = usize::from(ca != cb);
            curr[j + 1] = (prev[j + 1] + 1).min(curr[j] + 1).min(prev[j] + cost);
        }
        std::mem::swap(&mut prev, &mut curr);
    }

    prev[b.len()]
}

/// Suggest the closest known key for an unknown key, if within edit distance 3.
///
/// Ties go to the lexicographically smaller key so suggestions are stable.
pub fn suggest_correction(unknown: &str, known: &HashSet<String>) -> Option<String> {
    known
        .iter()
        .map(|k| (levenshtein(unknown, k), k))
        .filter(|(dist, _)| *dist <= 3)
        .min()
        .map(|(_, k)| k.clone())
}

// ============================================================================
// Unknown Key Validation
// ============================================================================

/// Check a raw TOML string for unknown keys. Each distinct unknown path is
/// reported once.
///
/// Returns warnings only; never fails.
pub fn validate_unknown_keys(raw_toml: &str) -> Vec<ValidationWarning> {
    let value: toml::Value = match raw_toml.parse() {
        Ok(v) => v,
        Err(_) => return Vec::new(), // parse errors are handled by serde later
    };

    let known = known_config_keys();
    let mut reported = HashSet::new();
    let mut warnings = Vec::new();

    for key in walk_toml_keys(&value, "") {
        if known.contains(&key) || !reported.insert(key.clone()) {
            continue;
        }
        let suggestion = suggest_correction(&key, &known);
        warnings.push(ValidationWarning {
            message: format!("Unknown config key '{key}'"),
            field: key,
            suggestion,
        });
    }

    warnings
}

// ============================================================================
// Cross-Field Validation
// ============================================================================

/// Checks that span more than one field.
///
/// Returns (errors, warnings). Errors are values no run can be analysed
/// with; warnings are legal but almost certainly not what was meant.
pub fn validate_ranges(config: &AnalysisConfig) -> (Vec<String>, Vec<ValidationWarning>) {
    let mut errors = Vec::new();
    let mut warnings = Vec::new();

    if let Some(cycle) = &config.cycle {
        for (name, rundown) in [("rundown_ng", &cycle.rundown_ng), ("rundown_np", &cycle.rundown_np)] {
            let Some(r) = rundown else { continue };
            if r.threshold_low >= r.threshold_high {
                errors.push(format!(
                    "cycle.{name}: threshold_low ({}) must be < threshold_high ({})",
                    r.threshold_low, r.threshold_high
                ));
            }
            if r.threshold_low < 0.0 {
                warnings.push(ValidationWarning {
                    field: format!("cycle.{name}.threshold_low"),
                    message: format!(
                        "cycle.{name}.threshold_low = {} is negative, T2 can never be reached on a speed channel",
                        r.threshold_low
                    ),
                    suggestion: None,
                });
            }
        }
    }

    if let Some(snapshot) = &config.snapshot {
        if snapshot.display_channels.is_empty() {
            errors.push("snapshot.display_channels must list at least one channel".to_string());
        }
        let enabled = |t: &Option<TriggerSpec>| t.as_ref().is_some_and(|t| t.enabled);
        let (c1, c2) = (enabled(&snapshot.condition1), enabled(&snapshot.condition2));
        let dead = match snapshot.combination {
            Combination::Cond1Only => !c1,
            Combination::Cond2Only => !c2,
            Combination::And => !(c1 && c2),
        };
        if dead {
            warnings.push(ValidationWarning {
                field: "snapshot.combination".to_string(),
                message: format!(
                    "snapshot.combination = {} but a required condition is disabled or absent, no snapshots will be taken",
                    snapshot.combination
                ),
                suggestion: None,
            });
        }
    }

    if let Some(evaluation) = &config.evaluation {
        let mut seen: HashMap<&str, usize> = HashMap::new();
        for (idx, item) in evaluation.items.iter().enumerate() {
            if item.id.trim().is_empty() {
                errors.push(format!("evaluation.items[{idx}].id must not be empty"));
                continue;
            }
            if let Some(first) = seen.insert(item.id.as_str(), idx) {
                errors.push(format!(
                    "evaluation.items[{idx}].id '{}' duplicates evaluation.items[{first}]",
                    item.id
                ));
            }
        }
    }

    (errors, warnings)
}

// ============================================================================
// Tests
// ============================================================================
