//! Analysis Configuration - operator-authored run settings
//!
//! The on-disk format is TOML (JSON is accepted for configs exported by
//! older tooling). Parsing yields a loosely-typed [`AnalysisConfig`];
//! [`AnalysisConfig::validate`] turns it into an [`AnalysisPlan`] whose
//! conditions are the typed variants from [`crate::condition`]. Engines
//! only ever see the plan.
//!
//! ```toml
//! [run]
//! name = "ENG-042 acceptance"
//!
//! [cycle.startup_time]
//! channel = "Ng"
//! statistic = "mean"
//! duration = 0.5
//! logic = ">"
//! threshold = 100.0
//!
//! [cycle.rundown_ng]
//! channel = "Ng"
//! statistic = "instant"
//! threshold_high = 8000.0
//! threshold_low = 2000.0
//!
//! [[evaluation.items]]
//! id = "egt_limit"
//! display_name = "EGT limit"
//! conditions = [{ channel = "T45", statistic = "instant", logic = ">", threshold = 850.0 }]
//! ```

use crate::condition::{
    AmplitudeCondition, Comparison, Condition, DifferenceCondition, DualThresholdCondition,
    StatisticCondition, UnknownComparison,
};
use crate::cycle::CycleConfig;
use crate::report::FunctionalCheck;
use crate::snapshot::{Combination, SnapshotConfig};
use crate::types::{CycleMetric, Sample};
use crate::veto::{ConditionLogic, EvaluationItem, VetoConfig};
use crate::window::Statistic;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{info, warn};

/// Environment variable naming the config file.
pub const CONFIG_ENV_VAR: &str = "RUNSCAN_CONFIG";
/// Config file looked up in the working directory.
pub const DEFAULT_CONFIG_FILE: &str = "runscan.toml";

pub const DEFAULT_WINDOW_SECS: f64 = 1.0;
pub const DEFAULT_IGNITION_WINDOW_SECS: f64 = 10.0;

// ============================================================================
// Error Type
// ============================================================================

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Config I/O error ({}): {1}", .0.display())]
    Io(PathBuf, #[source] std::io::Error),

    #[error("Config parse error ({}): {1}", .0.display())]
    Parse(PathBuf, #[source] toml::de::Error),

    #[error("Config parse error ({}): {1}", .0.display())]
    ParseJson(PathBuf, #[source] serde_json::Error),

    #[error("Config TOML error: {0}")]
    Toml(#[from] toml::de::Error),

    #[error("Config JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Config serialization error: {0}")]
    Serialize(#[from] toml::ser::Error),

    #[error("{field}: {source}")]
    UnknownComparison {
        field: String,
        #[source]
        source: UnknownComparison,
    },

    #[error("Config validation failed: {}", .0.join("; "))]
    Validation(Vec<String>),
}

// ============================================================================
// Raw Configuration
// ============================================================================

/// Parsed, not yet validated configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AnalysisConfig {
    #[serde(default)]
    pub run: RunInfo,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cycle: Option<CycleSection>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub snapshot: Option<SnapshotSection>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub evaluation: Option<EvaluationSection>,
}

/// Identification metadata. Not used for logic, but appears in logs.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunInfo {
    #[serde(default = "default_run_name")]
    pub name: String,

    /// Engine serial / model
    #[serde(default)]
    pub engine: String,

    /// Test bench identifier
    #[serde(default)]
    pub bench: String,
}

fn default_run_name() -> String {
    "unnamed-run".to_string()
}

impl Default for RunInfo {
    fn default() -> Self {
        Self {
            name: default_run_name(),
            engine: String::new(),
            bench: String::new(),
        }
    }
}

fn default_statistic() -> String {
    Statistic::Mean.as_str().to_string()
}

fn default_logic() -> String {
    Comparison::Greater.as_str().to_string()
}

/// `statistic(channel over duration) <logic> threshold`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConditionSpec {
    pub channel: String,

    #[serde(default = "default_statistic")]
    pub statistic: String,

    /// Window length in seconds
    #[serde(default, alias = "duration_sec", skip_serializing_if = "Option::is_none")]
    pub duration: Option<f64>,

    #[serde(default = "default_logic")]
    pub logic: String,

    #[serde(default)]
    pub threshold: f64,
}

/// Rundown dual threshold on a speed channel.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RundownSpec {
    pub channel: String,

    #[serde(default = "default_statistic")]
    pub statistic: String,

    #[serde(default, alias = "duration_sec", skip_serializing_if = "Option::is_none")]
    pub duration: Option<f64>,

    #[serde(alias = "threshold1")]
    pub threshold_high: f64,

    #[serde(alias = "threshold2")]
    pub threshold_low: f64,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CycleSection {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub time_base: Option<ConditionSpec>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub startup_time: Option<ConditionSpec>,
    /// Always evaluated as a difference; `statistic` is ignored
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ignition_time: Option<ConditionSpec>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rundown_ng: Option<RundownSpec>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rundown_np: Option<RundownSpec>,
}

/// Snapshot trigger condition with an on/off switch.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TriggerSpec {
    /// Off unless explicitly enabled
    #[serde(default)]
    pub enabled: bool,

    #[serde(flatten)]
    pub condition: ConditionSpec,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SnapshotSection {
    #[serde(default)]
    pub display_channels: Vec<String>,

    #[serde(default)]
    pub combination: Combination,

    /// Statistic against threshold
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub condition1: Option<TriggerSpec>,

    /// Amplitude against threshold; `statistic` is ignored
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub condition2: Option<TriggerSpec>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ItemKind {
    /// Scanned tick by tick
    #[default]
    ContinuousCheck,
    /// Single-condition form of a continuous check
    EventCheck,
    /// Pass condition on a per-cycle metric
    FunctionalResult,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ItemSpec {
    #[serde(alias = "item")]
    pub id: String,

    #[serde(default, alias = "assessment_name", skip_serializing_if = "Option::is_none")]
    pub display_name: Option<String>,

    #[serde(default, rename = "type")]
    pub kind: ItemKind,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub condition_logic: Option<String>,

    /// Cycle metric (`functional_result`)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source: Option<CycleMetric>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub logic: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub threshold: Option<f64>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub conditions: Vec<ConditionSpec>,

    /// Single condition (`event_check`)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub condition: Option<ConditionSpec>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct EvaluationSection {
    #[serde(default, alias = "evaluations")]
    pub items: Vec<ItemSpec>,
}

// ============================================================================
// Validated Plan
// ============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum EvaluationEntry {
    Continuous(EvaluationItem),
    Functional(FunctionalCheck),
}

impl EvaluationEntry {
    pub fn id(&self) -> &str {
        match self {
            EvaluationEntry::Continuous(item) => &item.id,
            EvaluationEntry::Functional(check) => &check.id,
        }
    }
}

/// Evaluation items in configured order.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct EvaluationPlan {
    pub entries: Vec<EvaluationEntry>,
}

impl EvaluationPlan {
    /// Continuous items only, for the veto scanner.
    pub fn veto_config(&self) -> VetoConfig {
        VetoConfig {
            items: self
                .entries
                .iter()
                .filter_map(|e| match e {
                    EvaluationEntry::Continuous(item) => Some(item.clone()),
                    EvaluationEntry::Functional(_) => None,
                })
                .collect(),
        }
    }

    pub fn functional_checks(&self) -> impl Iterator<Item = &FunctionalCheck> {
        self.entries.iter().filter_map(|e| match e {
            EvaluationEntry::Functional(check) => Some(check),
            EvaluationEntry::Continuous(_) => None,
        })
    }
}

/// Validated configuration handed to the engines.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AnalysisPlan {
    pub run: RunInfo,
    pub cycle: Option<CycleConfig>,
    pub snapshot: Option<SnapshotConfig>,
    pub evaluation: Option<EvaluationPlan>,
}

impl AnalysisPlan {
    /// Load, parse and validate a config file.
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        AnalysisConfig::load_from_file(path)?.validate()
    }

    /// Every channel a condition reads. Display channels are not included.
    pub fn required_channels(&self) -> BTreeSet<String> {
        let mut channels = BTreeSet::new();
        if let Some(cycle) = &self.cycle {
            channels.insert(cycle.time_base.channel.clone());
            channels.insert(cycle.startup.channel.clone());
            channels.insert(cycle.ignition.channel.clone());
            for rundown in [&cycle.rundown_ng, &cycle.rundown_np].into_iter().flatten() {
                channels.insert(rundown.channel.clone());
            }
        }
        if let Some(snapshot) = &self.snapshot {
            if let Some(c) = &snapshot.condition1 {
                channels.insert(c.channel.clone());
            }
            if let Some(c) = &snapshot.condition2 {
                channels.insert(c.channel.clone());
            }
        }
        if let Some(evaluation) = &self.evaluation {
            for entry in &evaluation.entries {
                if let EvaluationEntry::Continuous(item) = entry {
                    channels.extend(item.conditions.iter().map(|c| c.channel().to_string()));
                }
            }
        }
        channels
    }

    /// Required channels that never appear in `samples`.
    ///
    /// Conditions on such channels are silently never met; this lets the
    /// caller report the gap before running.
    pub fn check_channel_coverage(&self, samples: &[Sample]) -> Vec<String> {
        let missing: Vec<String> = self
            .required_channels()
            .into_iter()
            .filter(|channel| !samples.iter().any(|s| s.values.contains_key(channel)))
            .collect();
        for channel in &missing {
            warn!(channel = %channel, "Configured channel never present in the run");
        }
        missing
    }
}

// ============================================================================
// Loading
// ============================================================================

impl AnalysisConfig {
    /// Load configuration using the standard search order:
    /// 1. `$RUNSCAN_CONFIG` environment variable
    /// 2. `./runscan.toml` in the current working directory
    /// 3. Built-in defaults (no engines configured)
    pub fn load() -> Self {
        if let Ok(path) = std::env::var(CONFIG_ENV_VAR) {
            let p = PathBuf::from(&path);
            if p.exists() {
                match Self::load_from_file(&p) {
                    Ok(config) => {
                        info!(path = %p.display(), run = %config.run.name, "Loaded config from RUNSCAN_CONFIG");
                        return config;
                    }
                    Err(e) => {
                        warn!(path = %p.display(), error = %e, "Failed to load config from RUNSCAN_CONFIG, falling back");
                    }
                }
            } else {
                warn!(path = %path, "RUNSCAN_CONFIG points to non-existent file, falling back");
            }
        }

        let local = PathBuf::from(DEFAULT_CONFIG_FILE);
        if local.exists() {
            match Self::load_from_file(&local) {
                Ok(config) => {
                    info!(run = %config.run.name, "Loaded config from ./runscan.toml");
                    return config;
                }
                Err(e) => {
                    warn!(error = %e, "Failed to load ./runscan.toml, using defaults");
                }
            }
        }

        info!("No runscan.toml found, using built-in defaults");
        Self::default()
    }

    /// Load from a TOML file, or JSON when the extension is `.json`.
    pub fn load_from_file(path: &Path) -> Result<Self, ConfigError> {
        let contents =
            std::fs::read_to_string(path).map_err(|e| ConfigError::Io(path.to_path_buf(), e))?;

        let is_json = path
            .extension()
            .and_then(|ext| ext.to_str())
            .is_some_and(|ext| ext.eq_ignore_ascii_case("json"));
        if is_json {
            return serde_json::from_str(&contents)
                .map_err(|e| ConfigError::ParseJson(path.to_path_buf(), e));
        }

        for w in super::validation::validate_unknown_keys(&contents) {
            warn!("{}", w);
        }
        toml::from_str(&contents).map_err(|e| ConfigError::Parse(path.to_path_buf(), e))
    }

    pub fn from_toml_str(contents: &str) -> Result<Self, ConfigError> {
        for w in super::validation::validate_unknown_keys(contents) {
            warn!("{}", w);
        }
        Ok(toml::from_str(contents)?)
    }

    pub fn from_json_str(contents: &str) -> Result<Self, ConfigError> {
        Ok(serde_json::from_str(contents)?)
    }

    pub fn to_toml(&self) -> Result<String, ConfigError> {
        Ok(toml::to_string_pretty(self)?)
    }

    pub fn save_to_file(&self, path: &Path) -> Result<(), ConfigError> {
        let contents = self.to_toml()?;
        std::fs::write(path, contents).map_err(|e| ConfigError::Io(path.to_path_buf(), e))?;
        info!(path = %path.display(), "Config saved");
        Ok(())
    }

    // ========================================================================
    // Validation
    // ========================================================================

    /// Build the typed plan.
    ///
    /// An unsupported comparison operator aborts immediately; every other
    /// problem is collected and reported together as
    /// [`ConfigError::Validation`].
    pub fn validate(&self) -> Result<AnalysisPlan, ConfigError> {
        let mut errors = Vec::new();

        let cycle = match &self.cycle {
            Some(section) => section.build(&mut errors)?,
            None => None,
        };
        let snapshot = self
            .snapshot
            .as_ref()
            .map(|section| section.build(&mut errors))
            .transpose()?;
        let evaluation = self
            .evaluation
            .as_ref()
            .map(|section| section.build(&mut errors))
            .transpose()?;

        let (range_errors, warnings) = super::validation::validate_ranges(self);
        errors.extend(range_errors);
        for w in &warnings {
            warn!("{}", w);
        }

        if !errors.is_empty() {
            return Err(ConfigError::Validation(errors));
        }

        info!(
            run = %self.run.name,
            cycle = cycle.is_some(),
            snapshot = snapshot.is_some(),
            items = evaluation.as_ref().map_or(0, |e: &EvaluationPlan| e.entries.len()),
            "Config validated"
        );
        Ok(AnalysisPlan {
            run: self.run.clone(),
            cycle,
            snapshot,
            evaluation,
        })
    }
}

fn check_channel(field: &str, channel: &str, errors: &mut Vec<String>) {
    if channel.trim().is_empty() {
        errors.push(format!("{field}.channel must not be empty"));
    }
}

fn check_duration(field: &str, duration: f64, errors: &mut Vec<String>) {
    if !duration.is_finite() || duration <= 0.0 {
        errors.push(format!(
            "{field}.duration must be a positive number of seconds (got {duration})"
        ));
    }
}

fn check_finite(field: &str, value: f64, errors: &mut Vec<String>) {
    if !value.is_finite() {
        errors.push(format!("{field} must be finite (got {value})"));
    }
}

fn parse_comparison(field: &str, logic: &str) -> Result<Comparison, ConfigError> {
    logic.parse().map_err(|source| ConfigError::UnknownComparison {
        field: format!("{field}.logic"),
        source,
    })
}

impl ConditionSpec {
    fn duration_or(&self, default: f64) -> f64 {
        self.duration.unwrap_or(default)
    }

    fn build_statistic(
        &self,
        field: &str,
        statistic: Statistic,
        errors: &mut Vec<String>,
    ) -> Result<StatisticCondition, ConfigError> {
        let comparison = parse_comparison(field, &self.logic)?;
        let statistic = if statistic == Statistic::Difference {
            errors.push(format!(
                "{field}.statistic: 'difference' is only allowed on evaluation item conditions"
            ));
            Statistic::Mean
        } else {
            statistic
        };
        let duration = self.duration_or(DEFAULT_WINDOW_SECS);
        check_channel(field, &self.channel, errors);
        if statistic.is_windowed() {
            check_duration(field, duration, errors);
        }
        check_finite(&format!("{field}.threshold"), self.threshold, errors);
        Ok(StatisticCondition {
            channel: self.channel.clone(),
            statistic,
            duration,
            comparison,
            threshold: self.threshold,
        })
    }

    pub fn to_statistic_condition(
        &self,
        field: &str,
        errors: &mut Vec<String>,
    ) -> Result<StatisticCondition, ConfigError> {
        self.build_statistic(field, Statistic::parse(&self.statistic), errors)
    }

    pub fn to_difference_condition(
        &self,
        field: &str,
        default_duration: f64,
        errors: &mut Vec<String>,
    ) -> Result<DifferenceCondition, ConfigError> {
        let comparison = parse_comparison(field, &self.logic)?;
        let duration = self.duration_or(default_duration);
        check_channel(field, &self.channel, errors);
        check_duration(field, duration, errors);
        check_finite(&format!("{field}.threshold"), self.threshold, errors);
        Ok(DifferenceCondition {
            channel: self.channel.clone(),
            duration,
            comparison,
            threshold: self.threshold,
        })
    }

    pub fn to_amplitude_condition(
        &self,
        field: &str,
        errors: &mut Vec<String>,
    ) -> Result<AmplitudeCondition, ConfigError> {
        let comparison = parse_comparison(field, &self.logic)?;
        let duration = self.duration_or(DEFAULT_WINDOW_SECS);
        check_channel(field, &self.channel, errors);
        check_duration(field, duration, errors);
        check_finite(&format!("{field}.threshold"), self.threshold, errors);
        Ok(AmplitudeCondition {
            channel: self.channel.clone(),
            duration,
            comparison,
            threshold: self.threshold,
        })
    }

    /// Any evaluation condition: statistic, instant or difference.
    pub fn to_condition(
        &self,
        field: &str,
        errors: &mut Vec<String>,
    ) -> Result<Condition, ConfigError> {
        match Statistic::parse(&self.statistic) {
            Statistic::Difference => Ok(self
                .to_difference_condition(field, DEFAULT_WINDOW_SECS, errors)?
                .into()),
            statistic => Ok(self.build_statistic(field, statistic, errors)?.into()),
        }
    }
}

impl RundownSpec {
    pub fn to_condition(
        &self,
        field: &str,
        errors: &mut Vec<String>,
    ) -> DualThresholdCondition {
        let mut statistic = Statistic::parse(&self.statistic);
        if statistic == Statistic::Difference {
            errors.push(format!("{field}.statistic: 'difference' is not valid for a rundown"));
            statistic = Statistic::Mean;
        }
        let duration = self.duration.unwrap_or(DEFAULT_WINDOW_SECS);
        check_channel(field, &self.channel, errors);
        if statistic.is_windowed() {
            check_duration(field, duration, errors);
        }
        check_finite(&format!("{field}.threshold_high"), self.threshold_high, errors);
        check_finite(&format!("{field}.threshold_low"), self.threshold_low, errors);
        DualThresholdCondition {
            channel: self.channel.clone(),
            statistic,
            duration,
            threshold_high: self.threshold_high,
            threshold_low: self.threshold_low,
        }
    }
}

impl CycleSection {
    fn build(&self, errors: &mut Vec<String>) -> Result<Option<CycleConfig>, ConfigError> {
        let mut required = |name: &str, spec: &Option<ConditionSpec>| {
            if spec.is_none() {
                errors.push(format!("cycle.{name} is required when [cycle] is present"));
            }
        };
        required("time_base", &self.time_base);
        required("startup_time", &self.startup_time);
        required("ignition_time", &self.ignition_time);

        let (Some(time_base), Some(startup), Some(ignition)) =
            (&self.time_base, &self.startup_time, &self.ignition_time)
        else {
            return Ok(None);
        };

        Ok(Some(CycleConfig {
            time_base: time_base.to_statistic_condition("cycle.time_base", errors)?,
            startup: startup.to_statistic_condition("cycle.startup_time", errors)?,
            ignition: ignition.to_difference_condition(
                "cycle.ignition_time",
                DEFAULT_IGNITION_WINDOW_SECS,
                errors,
            )?,
            rundown_ng: self
                .rundown_ng
                .as_ref()
                .map(|r| r.to_condition("cycle.rundown_ng", errors)),
            rundown_np: self
                .rundown_np
                .as_ref()
                .map(|r| r.to_condition("cycle.rundown_np", errors)),
        }))
    }
}

impl SnapshotSection {
    fn build(&self, errors: &mut Vec<String>) -> Result<SnapshotConfig, ConfigError> {
        let condition1 = match &self.condition1 {
            Some(t) if t.enabled => Some(
                t.condition
                    .to_statistic_condition("snapshot.condition1", errors)?,
            ),
            _ => None,
        };
        let condition2 = match &self.condition2 {
            Some(t) if t.enabled => Some(
                t.condition
                    .to_amplitude_condition("snapshot.condition2", errors)?,
            ),
            _ => None,
        };
        Ok(SnapshotConfig {
            display_channels: self.display_channels.clone(),
            combination: self.combination,
            condition1,
            condition2,
        })
    }
}

impl EvaluationSection {
    fn build(&self, errors: &mut Vec<String>) -> Result<EvaluationPlan, ConfigError> {
        let mut entries = Vec::with_capacity(self.items.len());
        for (idx, item) in self.items.iter().enumerate() {
            let field = format!("evaluation.items[{idx}]");
            let display_name = item.display_name.clone().unwrap_or_else(|| item.id.clone());

            match item.kind {
                ItemKind::FunctionalResult => {
                    let Some(source) = item.source else {
                        errors.push(format!("{field}: functional_result needs a 'source' metric"));
                        continue;
                    };
                    let Some(threshold) = item.threshold else {
                        errors.push(format!("{field}: functional_result needs a 'threshold'"));
                        continue;
                    };
                    check_finite(&format!("{field}.threshold"), threshold, errors);
                    let logic = item.logic.clone().unwrap_or_else(default_logic);
                    entries.push(EvaluationEntry::Functional(FunctionalCheck {
                        id: item.id.clone(),
                        display_name,
                        source,
                        comparison: parse_comparison(&field, &logic)?,
                        threshold,
                    }));
                }
                ItemKind::ContinuousCheck | ItemKind::EventCheck => {
                    let logic = match item.condition_logic.as_deref() {
                        None => ConditionLogic::And,
                        Some(name) => ConditionLogic::parse(name).unwrap_or_else(|| {
                            errors.push(format!(
                                "{field}.condition_logic: only \"AND\" is supported (got \"{name}\")"
                            ));
                            ConditionLogic::And
                        }),
                    };
                    let specs: Vec<&ConditionSpec> =
                        item.conditions.iter().chain(item.condition.as_ref()).collect();
                    if specs.is_empty() {
                        errors.push(format!("{field}: item '{}' has no conditions", item.id));
                    }
                    let mut conditions = Vec::with_capacity(specs.len());
                    for (cidx, spec) in specs.into_iter().enumerate() {
                        let cfield = format!("{field}.conditions[{cidx}]");
                        conditions.push(spec.to_condition(&cfield, errors)?);
                    }
                    entries.push(EvaluationEntry::Continuous(EvaluationItem {
                        id: item.id.clone(),
                        display_name,
                        logic,
                        conditions,
                    }));
                }
            }
        }
        Ok(EvaluationPlan { entries })
    }
}
