//! Integration tests for the survey pipeline.

use std::fs;
use std::path::Path;

use chrono::NaiveDate;
use tempfile::tempdir;

use welzijn::{
    Codebook, IssueKind, Parser, Pipeline, PipelineConfig, ScoringConfig, Severity, Stability,
    TypedValue, render_text,
};

const WAVE_VARIABLES: &[&str] = &[
    "Geslacht",
    "Geboortejaar",
    "Opleiding",
    "Werksituatie",
    "Woonsituatie",
    "Gezondheid",
    "Corstress1",
    "Corstress2",
    "Corstress3",
    "Corstress4",
    "Corstress5",
    "Eenzaam1",
    "Eenzaam2",
    "Eenzaam3",
];

/// (Nummer, W1, W2, wave 1 values, wave 2 values)
const PARTICIPANTS: &[(&str, &str, &str, [&str; 14], [&str; 14])] = &[
    (
        "1", "1", "1",
        ["1", "1970", "3", "1", "2", "4", "4", "4", "3", "2", "5", "1", "2", "1"],
        ["1", "1970", "3", "1", "2", "3", "4", "3", "3", "2", "5", "1", "1", "1"],
    ),
    (
        "2", "1", "1",
        ["2", "1985", "4", "1", "3", "3", "2", "2", "2", "2", "2", "2", "2", "3"],
        ["2", "1985", "5", "2", "3", "3", "2", "2", "", "", "", "2", "3", "3"],
    ),
    (
        "3", "1", "0",
        ["2", "1990", "5", "3", "1", "5", "1", "1", "1", "1", "1", "3", "3", "3"],
        ["", "", "", "", "", "", "", "", "", "", "", "", "", ""],
    ),
    (
        "4", "0", "1",
        ["", "", "", "", "", "", "", "", "", "", "", "", "", ""],
        ["1", "1960", "2", "4", "2", "2", "5", "5", "5", "5", "5", "1", "1", "1"],
    ),
    (
        "5", "1", "1",
        ["3", "1975", "3", "9", "2", "4", "3", "3", "3", "3", "3", "2", "2", "2"],
        ["3", "1975", "3", "1", "2", "4", "3", "3", "3", "3", "3", "2", "2", "2"],
    ),
];

fn survey_csv() -> String {
    let mut header = vec!["Nummer".to_string(), "W1".to_string(), "W2".to_string()];
    for wave in 1..=2 {
        header.extend(WAVE_VARIABLES.iter().map(|v| format!("W{}_{}", wave, v)));
    }
    let mut lines = vec![header.join(";")];
    for (id, w1, w2, first, second) in PARTICIPANTS {
        let mut row = vec![*id, *w1, *w2];
        row.extend(first.iter());
        row.extend(second.iter());
        lines.push(row.join(";"));
    }
    lines.join("\n") + "\n"
}

fn write_survey(dir: &Path) -> std::path::PathBuf {
    let path = dir.join("corona_welzijn.csv");
    fs::write(&path, survey_csv()).expect("Failed to write survey");
    path
}

// =============================================================================
// Full Pipeline
// =============================================================================

#[test]
fn test_participation_counts() {
    let dir = tempdir().unwrap();
    let result = Pipeline::new().run(write_survey(dir.path())).expect("Pipeline failed");

    let counts = result.report.participation;
    assert_eq!(counts.total, 5);
    assert_eq!(counts.both, 3);
    assert_eq!(counts.only_w1, 1);
    assert_eq!(counts.only_w2, 1);
    assert_eq!(counts.neither, 0);
    assert_eq!(counts.unknown, 0);
    assert!(!result.report.has_invariant_violations());
    assert_eq!(result.source().format, "csv-semicolon");
}

#[test]
fn test_cross_wave_comparisons() {
    let dir = tempdir().unwrap();
    let result = Pipeline::new().run(write_survey(dir.path())).unwrap();
    let report = &result.report;

    assert_eq!(report.comparisons.len(), WAVE_VARIABLES.len());

    let gender = report.comparison("Geslacht").unwrap();
    assert_eq!(gender.valid_case_count, 3);
    assert_eq!(gender.percent_identical, Some(100.0));
    assert_eq!(gender.stability, Stability::Stable);

    let birth_year = report.comparison("Geboortejaar").unwrap();
    assert_eq!(birth_year.percent_identical, Some(100.0));
    assert_eq!(birth_year.correlation, Some(1.0));

    let education = report.comparison("Opleiding").unwrap();
    assert_eq!(education.identical_count, 2);
    assert_eq!(education.percent_identical, Some(66.7));
    assert_eq!(education.stability, Stability::Moderate);

    // participant 5 has unmapped work situation 9 in wave 1
    let work = report.comparison("Werksituatie").unwrap();
    assert_eq!(work.valid_case_count, 2);
    assert_eq!(work.percent_identical, Some(50.0));

    let item = report.comparison("Corstress3").unwrap();
    assert_eq!(item.valid_case_count, 2);
    assert_eq!(item.correlation, None);

    let lonely = report.comparison("Eenzaam2").unwrap();
    assert_eq!(lonely.percent_identical, Some(33.3));
    assert_eq!(lonely.stability, Stability::Unstable);
    assert_eq!(lonely.mean_w1, Some(2.0));
    assert_eq!(lonely.mean_w2, Some(2.0));
}

#[test]
fn test_ranking_and_buckets() {
    let dir = tempdir().unwrap();
    let result = Pipeline::new().run(write_survey(dir.path())).unwrap();
    let report = &result.report;

    assert_eq!(report.comparisons[0].variable_name, "Geslacht");
    assert_eq!(report.comparisons[1].variable_name, "Geboortejaar");
    assert_eq!(report.comparisons.last().unwrap().variable_name, "Eenzaam2");

    let percents: Vec<f64> = report
        .comparisons
        .iter()
        .filter_map(|c| c.percent_identical)
        .collect();
    assert!(percents.windows(2).all(|w| w[0] >= w[1]));

    assert_eq!(report.buckets.unstable, vec!["Eenzaam2"]);
    assert!(report.buckets.stable.contains(&"Woonsituatie".to_string()));
    assert!(report.buckets.not_computable.is_empty());
}

#[test]
fn test_recoding_diagnostics() {
    let dir = tempdir().unwrap();
    let result = Pipeline::new().run(write_survey(dir.path())).unwrap();

    let work = &result.typed.diagnostics.variables["W1_Werksituatie"];
    assert_eq!(work.unmapped, 1);
    assert_eq!(work.unmapped_values.get("9"), Some(&1));
    assert_eq!(work.unmapped_ids, vec!["5"]);
    // participant 4 skipped wave 1
    assert_eq!(work.declared_missing, 1);

    assert!(result.issues().iter().any(|i| {
        i.kind == IssueKind::UnmappedCode
            && i.variable == "W1_Werksituatie"
            && i.severity == Severity::Warning
    }));

    let first = &result.typed.records[0];
    assert_eq!(first.get("W1_Geslacht"), Some(&TypedValue::label(1, "Man")));
    assert_eq!(first.get("W1_Leeftijd"), Some(&TypedValue::Number(50.0)));
    assert_eq!(first.get("W2_Leeftijd"), Some(&TypedValue::Number(51.0)));
}

#[test]
fn test_composite_scores_follow_policy() {
    let dir = tempdir().unwrap();
    let path = write_survey(dir.path());

    let result = Pipeline::new().run(&path).unwrap();
    let p1 = &result.typed.records[0];
    assert_eq!(p1.number("W1_Corstress_Gem"), Some(3.6));
    // participant 2 answered 2 of 5 stress items in wave 2: below half
    let p2 = &result.typed.records[1];
    assert_eq!(p2.number("W2_Corstress_Gem"), None);

    let lenient = PipelineConfig {
        scoring: ScoringConfig {
            min_items_present: Some(1),
        },
        ..PipelineConfig::default()
    };
    let result = Pipeline::with_config(lenient).run(&path).unwrap();
    assert_eq!(result.typed.records[1].number("W2_Corstress_Gem"), Some(2.0));

    let summary = result
        .report
        .scales
        .iter()
        .find(|s| s.scale == "W1_Corstress_Gem")
        .unwrap();
    assert_eq!(summary.items, 5);
    assert_eq!(summary.scored, 4);
    assert_eq!(summary.all_missing, 1);
}

#[test]
fn test_item_threshold_is_clamped_to_scale_size() {
    let dir = tempdir().unwrap();
    let (table, source) = Parser::new().parse_file(write_survey(dir.path())).unwrap();

    let strict = PipelineConfig {
        scoring: ScoringConfig {
            min_items_present: Some(99),
        },
        ..PipelineConfig::default()
    };
    let result = Pipeline::with_config(strict).run_table(table, source);

    // every item answered still scores
    assert_eq!(result.typed.records[0].number("W1_Corstress_Gem"), Some(3.6));
    assert_eq!(result.typed.records[1].number("W1_Corstress_Gem"), Some(2.0));
    assert_eq!(result.typed.records[1].number("W2_Corstress_Gem"), None);

    let stress = result
        .report
        .scales
        .iter()
        .find(|s| s.scale == "W1_Corstress_Gem")
        .unwrap();
    assert_eq!(stress.min_items_present, 5);
    assert_eq!(stress.scored, 4);
    let lonely = result
        .report
        .scales
        .iter()
        .find(|s| s.scale == "W2_Eenzaam_Gem")
        .unwrap();
    assert_eq!(lonely.min_items_present, 3);
}

#[test]
fn test_composite_scores_compared_across_waves() {
    let dir = tempdir().unwrap();
    let result = Pipeline::new().run(write_survey(dir.path())).unwrap();
    let composites = &result.report.composite_comparisons;

    let names: Vec<&str> = composites.iter().map(|c| c.variable_name.as_str()).collect();
    assert_eq!(names, vec!["Corstress_Gem", "Eenzaam_Gem"]);

    // participant 2 has no wave 2 stress score
    let stress = &composites[0];
    assert_eq!(stress.var_w1, "W1_Corstress_Gem");
    assert_eq!(stress.var_w2, "W2_Corstress_Gem");
    assert_eq!(stress.valid_case_count, 2);
    assert_eq!(stress.identical_count, 1);
    assert_eq!(stress.percent_identical, Some(50.0));
    assert_eq!(stress.mean_w1, Some(3.3));
    assert_eq!(stress.mean_w2, Some(3.2));
    assert_eq!(stress.stability, Stability::Moderate);

    let lonely = &composites[1];
    assert_eq!(lonely.valid_case_count, 3);
    assert_eq!(lonely.percent_identical, Some(33.3));
    assert_eq!(lonely.stability, Stability::Unstable);

    // composites stay out of the item-level buckets
    assert!(result.report.comparison("Corstress_Gem").is_none());
    assert_eq!(result.report.buckets.unstable, vec!["Eenzaam2"]);
}

#[test]
fn test_duplicate_participant_ids_are_reported() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("duplicates.csv");
    let mut content = survey_csv();
    let repeated = content.lines().nth(1).unwrap().to_string();
    content.push_str(&repeated);
    content.push('\n');
    fs::write(&path, content).unwrap();

    let result = Pipeline::new().run(&path).unwrap();
    assert_eq!(result.report.participation.total, 6);
    assert!(result.report.has_invariant_violations());

    let duplicate = result
        .issues()
        .iter()
        .find(|i| i.kind == IssueKind::InvariantViolation && i.variable == "Nummer")
        .unwrap();
    assert_eq!(duplicate.severity, Severity::Error);
    assert_eq!(duplicate.evidence.sample_ids, vec!["1"]);
}

// =============================================================================
// Sinks
// =============================================================================

#[test]
fn test_write_recoded_dataset() {
    let dir = tempdir().unwrap();
    let result = Pipeline::new().run(write_survey(dir.path())).unwrap();

    let out = dir.path().join("out");
    let date = NaiveDate::from_ymd_opt(2021, 6, 1).unwrap();
    let written = result.write_recoded(&out, date).unwrap();
    assert_eq!(
        written.file_name().unwrap().to_string_lossy(),
        "corona_welzijn_recoded_2021-06-01.csv"
    );

    let mut reader = csv::Reader::from_path(&written).unwrap();
    let headers = reader.headers().unwrap().clone();
    assert!(headers.iter().any(|h| h == "W1_Leeftijd"));
    assert!(headers.iter().any(|h| h == "W2_Eenzaam_Gem"));

    let gender = headers.iter().position(|h| h == "W1_Geslacht").unwrap();
    let rows: Vec<csv::StringRecord> = reader.records().map(|r| r.unwrap()).collect();
    assert_eq!(rows.len(), 5);
    assert_eq!(&rows[0][0], "1");
    assert_eq!(&rows[0][gender], "Man");
    // unmapped value written as empty
    let work = headers.iter().position(|h| h == "W1_Werksituatie").unwrap();
    assert_eq!(&rows[4][work], "");
}

#[test]
fn test_json_and_text_report() {
    let dir = tempdir().unwrap();
    let result = Pipeline::new().run(write_survey(dir.path())).unwrap();

    let json_path = dir.path().join("report.json");
    welzijn::output::write_report_json(&json_path, &result.report).unwrap();
    let value: serde_json::Value =
        serde_json::from_str(&fs::read_to_string(&json_path).unwrap()).unwrap();
    assert_eq!(value["participation"]["both"], 3);
    assert_eq!(value["comparisons"][0]["variable_name"], "Geslacht");
    assert_eq!(value["comparisons"][0]["stability"], "stable");

    assert_eq!(value["composite_comparisons"][0]["variable_name"], "Corstress_Gem");

    let text_path = dir.path().join("reports").join("report.txt");
    welzijn::output::write_report_text(&text_path, &result.report).unwrap();
    let text = fs::read_to_string(&text_path).unwrap();
    assert_eq!(text, render_text(&result.report));
    assert!(text.contains("Wave participation"));
    assert!(text.contains("Eenzaam2"));
    assert!(text.contains("W1_Werksituatie"));
    assert!(text.contains("Composite scores across waves"));
}

// =============================================================================
// Codebook and configuration files
// =============================================================================

#[test]
fn test_codebook_file_round_trip() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("codebook.json");

    let builtin = Codebook::corona_welzijn();
    builtin.save(&path).unwrap();
    let loaded = Codebook::load(&path).unwrap();

    assert_eq!(loaded.len(), builtin.len());
    assert_eq!(loaded.entries(), builtin.entries());
    assert_eq!(loaded.scales(), builtin.scales());

    let survey = write_survey(dir.path());
    let a = Pipeline::new().run(&survey).unwrap();
    let b = Pipeline::new().with_codebook(loaded).run(&survey).unwrap();
    assert_eq!(a.report.comparisons, b.report.comparisons);
}

#[test]
fn test_invalid_codebook_file_is_rejected() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("bad.json");
    fs::write(
        &path,
        r#"{
            "name": "bad",
            "variables": [
                { "type": "variable", "raw_name": "W1_X", "derived_name": "W1_X",
                  "kind": "nominal", "levels": [ { "code": 1, "label": "a" }, { "code": 1, "label": "b" } ] }
            ]
        }"#,
    )
    .unwrap();
    assert!(matches!(
        Codebook::load(&path),
        Err(welzijn::WelzijnError::Codebook(_))
    ));
}

#[test]
fn test_custom_indicator_columns() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("renamed.csv");
    fs::write(&path, "Id,Golf1,Golf2,W1_Geslacht,W2_Geslacht\na,1,1,1,2\nb,1,1,2,2\n").unwrap();

    let config = PipelineConfig {
        id_column: "Id".to_string(),
        w1_column: "Golf1".to_string(),
        w2_column: "Golf2".to_string(),
        ..PipelineConfig::default()
    };
    let result = Pipeline::with_config(config).run(&path).unwrap();

    assert_eq!(result.partition.counts.both, 2);
    assert_eq!(result.partition.membership[0].0, "a");
    let gender = result.report.comparison("Geslacht").unwrap();
    assert_eq!(gender.percent_identical, Some(50.0));
}
