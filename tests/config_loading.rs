//! Config Loading Tests
//!
//! File-based loading (TOML and JSON), typo warnings, and the validation
//! errors a malformed config must produce.

use runscan::config::validation::{known_config_keys, suggest_correction, validate_unknown_keys};
use runscan::config::{AnalysisConfig, AnalysisPlan, ConfigError};
use runscan::snapshot::Combination;
use std::io::Write;
use tempfile::NamedTempFile;

fn write_temp(suffix: &str, contents: &str) -> anyhow::Result<NamedTempFile> {
    let mut file = tempfile::Builder::new().suffix(suffix).tempfile()?;
    file.write_all(contents.as_bytes())?;
    file.flush()?;
    Ok(file)
}

#[test]
fn toml_file_loads_and_validates() -> anyhow::Result<()> {
    let file = write_temp(
        ".toml",
        r#"
[run]
name = "cell-2 acceptance"

[snapshot]
display_channels = ["Ng", "Np", "T45", "Fuel"]
combination = "Cond1_Only"

[snapshot.condition1]
enabled = true
channel = "Ng"
statistic = "rms"
duration = 3.0
logic = ">="
threshold = 9000.0
"#,
    )?;

    let plan = AnalysisPlan::from_file(file.path())?;
    assert_eq!(plan.run.name, "cell-2 acceptance");
    let snapshot = plan.snapshot.expect("snapshot configured");
    assert_eq!(snapshot.combination, Combination::Cond1Only);
    assert_eq!(snapshot.display_channels.len(), 4);
    Ok(())
}

#[test]
fn json_file_is_detected_by_extension() -> anyhow::Result<()> {
    let file = write_temp(
        ".json",
        r#"{
            "run": { "name": "legacy export" },
            "evaluation": {
                "items": [
                    {
                        "item": "oil_pressure",
                        "assessment_name": "Oil pressure",
                        "type": "event_check",
                        "condition": { "channel": "P_oil", "statistic": "instant", "logic": "<", "threshold": 20.0 }
                    }
                ]
            }
        }"#,
    )?;

    let plan = AnalysisPlan::from_file(file.path())?;
    let veto = plan.evaluation.expect("evaluation configured").veto_config();
    assert_eq!(veto.items.len(), 1);
    assert_eq!(veto.items[0].display_name, "Oil pressure");
    Ok(())
}

#[test]
fn missing_file_is_io_error() {
    let result = AnalysisConfig::load_from_file(std::path::Path::new("/nonexistent/runscan.toml"));
    assert!(matches!(result, Err(ConfigError::Io(..))));
}

#[test]
fn malformed_toml_is_parse_error() -> anyhow::Result<()> {
    let file = write_temp(".toml", "[cycle.startup_time\nchannel = ")?;
    let result = AnalysisConfig::load_from_file(file.path());
    assert!(matches!(result, Err(ConfigError::Parse(..))));
    Ok(())
}

#[test]
fn save_and_reload_roundtrip() -> anyhow::Result<()> {
    let config = AnalysisConfig::from_toml_str(
        r#"
[cycle.time_base]
channel = "Ng"
statistic = "instant"
threshold = 7000.0

[cycle.startup_time]
channel = "Ng"
duration = 0.5
threshold = 100.0

[cycle.ignition_time]
channel = "T45"
threshold = 50.0

[cycle.rundown_np]
channel = "Np"
threshold_high = 9000.0
threshold_low = 1500.0
"#,
    )?;
    let dir = tempfile::tempdir()?;
    let path = dir.path().join("runscan.toml");
    config.save_to_file(&path)?;

    let reloaded = AnalysisPlan::from_file(&path)?;
    assert_eq!(reloaded, config.validate()?);
    let np = reloaded
        .cycle
        .and_then(|c| c.rundown_np)
        .expect("np rundown configured");
    assert_eq!(np.threshold_low, 1500.0);
    Ok(())
}

#[test]
fn validation_error_lists_every_problem() {
    let config = AnalysisConfig::from_toml_str(
        r#"
[snapshot]
display_channels = []

[snapshot.condition2]
enabled = true
channel = "T45"
duration = 0.0
logic = "<"
threshold = 5.0

[[evaluation.items]]
id = "a"
conditions = [{ channel = "T45", threshold = 850.0 }]

[[evaluation.items]]
id = "a"
type = "functional_result"
logic = ">"
threshold = 10.0
"#,
    )
    .expect("config parses");

    let Err(ConfigError::Validation(errors)) = config.validate() else {
        panic!("expected validation errors");
    };
    assert!(errors.iter().any(|e| e.contains("snapshot.condition2.duration")));
    assert!(errors.iter().any(|e| e.contains("display_channels")));
    assert!(errors.iter().any(|e| e.contains("needs a 'source'")));
    assert!(errors.iter().any(|e| e.contains("duplicates")));
}

#[test]
fn nan_threshold_rejected() {
    let config = AnalysisConfig::from_toml_str(
        r#"
[[evaluation.items]]
id = "a"
conditions = [{ channel = "T45", threshold = nan }]
"#,
    )
    .expect("config parses");
    assert!(matches!(config.validate(), Err(ConfigError::Validation(_))));
}

#[test]
fn typo_warns_with_suggestion() {
    let warnings = validate_unknown_keys(
        r#"
[snapshot]
combinaton = "AND"
"#,
    );
    assert_eq!(warnings.len(), 1);
    assert_eq!(warnings[0].suggestion.as_deref(), Some("snapshot.combination"));
}

#[test]
fn known_keys_cover_every_section() {
    let known = known_config_keys();
    for key in [
        "run.name",
        "cycle.startup_time.duration",
        "cycle.rundown_ng.threshold_low",
        "snapshot.condition2.enabled",
        "evaluation.items[].conditions[].logic",
        "evaluation.items[].condition.threshold",
    ] {
        assert!(known.contains(key), "missing known key {key}");
    }
    assert_eq!(
        suggest_correction("cycle.rundown_ng.treshold_low", &known).as_deref(),
        Some("cycle.rundown_ng.threshold_low")
    );
}
