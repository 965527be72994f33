use log::{debug, info, warn};

use snafu::{prelude::*, Snafu};
use survey_stats::datetime::parse_day_first_date;
use survey_stats::*;

use std::fs;
use std::path::Path;

use calamine::{open_workbook, Reader, Xlsx};
use chrono::{Local, NaiveDate};

use serde_json::json;
use serde_json::Value as JSValue;
use text_diff::print_diff;

use crate::args::Args;
use crate::survey::config_reader::*;
use crate::survey::io_common::simplify_file_name;
use crate::survey::io_csv::read_csv_table;
use crate::survey::io_xlsx::read_excel_table;

mod config_reader;
mod io_common;
mod io_csv;
mod io_xlsx;

#[derive(Debug, Snafu)]
#[snafu(visibility(pub(crate)))]
pub enum SurveyError {
    #[snafu(display("Error opening file {path}"))]
    OpeningInput {
        source: std::io::Error,
        path: String,
    },
    #[snafu(display(
        "Could not read {path}: not valid UTF-8 ({utf8}) and not valid Latin-1 ({latin1})"
    ))]
    Unreadable {
        path: String,
        utf8: String,
        latin1: String,
    },
    #[snafu(display("Error opening Excel file {path}"))]
    OpeningExcel {
        source: calamine::XlsxError,
        path: String,
    },
    #[snafu(display("No data in Excel file {path} (worksheet: {worksheet:?})"))]
    EmptyExcel {
        path: String,
        worksheet: Option<String>,
    },
    #[snafu(display(
        "Excel file {path} has several worksheets, pick one with --excel-worksheet-name"
    ))]
    AmbiguousWorksheet { path: String },
    #[snafu(display("Invalid table in {path}"))]
    InvalidTable { source: StatsError, path: String },
    #[snafu(display("Error opening JSON file {path}"))]
    OpeningJson {
        source: std::io::Error,
        path: String,
    },
    #[snafu(display("Error parsing JSON"))]
    ParsingJson { source: serde_json::Error },
    #[snafu(display("Error writing the summary to {path}"))]
    WritingOutput {
        source: std::io::Error,
        path: String,
    },
    #[snafu(display("Could not understand the date {value:?}"))]
    InvalidDate { value: String },
    #[snafu(display("Unknown input type {input_type:?} (expected csv or xlsx)"))]
    UnknownInputType { input_type: String },
    #[snafu(display("Unknown date fallback {policy:?} (expected today or unparsed)"))]
    UnknownDateFallback { policy: String },
    #[snafu(display("No input file: use --input or set fileSource.filePath in the configuration"))]
    MissingInput {},
    #[snafu(display("Could not compute the summaries"))]
    Summarizing { source: StatsError },

    #[snafu(whatever, display("{message}"))]
    Whatever {
        message: String,
        #[snafu(source(from(Box<dyn std::error::Error>, Some)))]
        source: Option<Box<dyn std::error::Error>>,
    },
}

pub type SurveyResult<T> = Result<T, SurveyError>;

#[derive(Eq, PartialEq, Debug, Clone, Copy)]
pub enum InputType {
    Csv,
    Xlsx,
}

/// Everything a run needs, once the command line and the configuration file
/// have been merged.
#[derive(Eq, PartialEq, Debug, Clone)]
pub struct Settings {
    pub study_name: Option<String>,
    pub input_path: String,
    pub input_type: InputType,
    pub excel_worksheet_name: Option<String>,
    pub columns: ColumnNames,
    pub sentinels: Sentinels,
    pub date_fallback: DateFallback,
    pub filter: Filter,
    pub goal: u64,
    pub out: Option<String>,
    pub reference: Option<String>,
}

fn parse_input_type(s: &str) -> SurveyResult<InputType> {
    match s.to_lowercase().as_str() {
        "csv" => Ok(InputType::Csv),
        "xlsx" | "excel" => Ok(InputType::Xlsx),
        x => UnknownInputTypeSnafu { input_type: x }.fail(),
    }
}

fn parse_date_fallback(s: &str) -> SurveyResult<DateFallback> {
    match s {
        "today" => Ok(DateFallback::Today),
        "unparsed" => Ok(DateFallback::Unparsed),
        x => UnknownDateFallbackSnafu { policy: x }.fail(),
    }
}

fn parse_date_arg(s: &str) -> SurveyResult<NaiveDate> {
    parse_day_first_date(s).context(InvalidDateSnafu { value: s })
}

fn role_filter(roles: Option<Vec<String>>) -> RoleFilter {
    match roles {
        Some(names) if !names.iter().any(|n| n == ALL_ROLES) => RoleFilter::Only(names),
        _ => RoleFilter::All,
    }
}

// Paths in the configuration file are relative to the file itself.
fn config_relative(config_path: &str, path: &str) -> String {
    match Path::new(config_path).parent() {
        Some(dir) => dir.join(path).display().to_string(),
        None => path.to_string(),
    }
}

/// Merges the command line with the configuration file, if any. The command
/// line wins.
pub fn load_settings(args: &Args) -> SurveyResult<Settings> {
    let (config, config_path) = match &args.config {
        Some(p) => (read_config(p)?, Some(p.as_str())),
        None => (SurveyConfig::default(), None),
    };
    let file_source = &config.file_source;
    let rules = &config.rules;

    let input_path = match (&args.input, &file_source.file_path, config_path) {
        (Some(p), _, _) => p.clone(),
        (None, Some(p), Some(cp)) => config_relative(cp, p),
        _ => return MissingInputSnafu {}.fail(),
    };

    let input_type = match args.input_type.as_ref().or(file_source.provider.as_ref()) {
        Some(x) => parse_input_type(x)?,
        None if input_path.to_lowercase().ends_with(".xlsx") => InputType::Xlsx,
        None => InputType::Csv,
    };

    let date_fallback = match args.date_fallback.as_ref().or(rules.date_fallback.as_ref()) {
        Some(x) => parse_date_fallback(x)?,
        None => DateFallback::Today,
    };

    let start = match args.start_date.as_ref().or(rules.start_date.as_ref()) {
        Some(s) => Some(parse_date_arg(s)?),
        None => None,
    };
    let end = match args.end_date.as_ref().or(rules.end_date.as_ref()) {
        Some(s) => Some(parse_date_arg(s)?),
        None => None,
    };
    if let (Some(s), Some(e)) = (start, end) {
        if s > e {
            warn!("load_settings: start date {} is after end date {}", s, e);
        }
    }

    let out = match (&args.out, &config.output_settings.output_path, config_path) {
        (Some(o), _, _) => Some(o.clone()),
        (None, Some(o), Some(cp)) => Some(config_relative(cp, o)),
        _ => None,
    };

    let settings = Settings {
        study_name: config.output_settings.study_name.clone(),
        input_path,
        input_type,
        excel_worksheet_name: args
            .excel_worksheet_name
            .clone()
            .or_else(|| file_source.excel_worksheet_name.clone()),
        columns: file_source
            .columns
            .clone()
            .unwrap_or_default()
            .apply(ColumnNames::default()),
        sentinels: rules
            .sentinels
            .clone()
            .unwrap_or_default()
            .apply(Sentinels::default()),
        date_fallback,
        filter: Filter {
            roles: role_filter(args.roles.clone().or_else(|| rules.roles.clone())),
            start,
            end,
        },
        goal: args.goal.or(rules.goal).unwrap_or(DEFAULT_GOAL),
        out,
        reference: args.reference.clone(),
    };
    debug!("load_settings: {:?}", settings);
    Ok(settings)
}

pub fn read_survey_data(settings: &Settings) -> SurveyResult<RawTable> {
    info!(
        "Attempting to read survey file {:?} ({:?})",
        settings.input_path, settings.input_type
    );
    match settings.input_type {
        InputType::Csv => read_csv_table(&settings.input_path),
        InputType::Xlsx => read_excel_table(
            &settings.input_path,
            settings.excel_worksheet_name.as_deref(),
        ),
    }
}

fn round2(x: f64) -> f64 {
    (x * 100.0).round() / 100.0
}

fn counts_to_json(counts: &Option<Vec<(String, u64)>>) -> JSValue {
    match counts {
        Some(counts) => counts
            .iter()
            .map(|(label, count)| json!({"label": label, "count": count}))
            .collect(),
        None => JSValue::Null,
    }
}

fn build_summary_js(
    settings: &Settings,
    schema: &Schema,
    resolved: &ResolvedFilter,
    s: &Summaries,
) -> JSValue {
    let roles: Option<Vec<String>> = resolved.roles.as_ref().map(|rs| {
        let mut v: Vec<String> = rs.iter().cloned().collect();
        v.sort();
        v
    });
    let fmt = |d: NaiveDate| d.format("%Y-%m-%d").to_string();
    let daily: JSValue = match &s.daily {
        Some(daily) => daily
            .iter()
            .map(|(d, c)| json!({"date": fmt(*d), "count": c}))
            .collect(),
        None => JSValue::Null,
    };
    let hourly: JSValue = match &s.hourly {
        Some(hourly) => hourly
            .iter()
            .map(|(h, c)| json!({"hour": h, "count": c}))
            .collect(),
        None => JSValue::Null,
    };
    json!({
        "config": {
            "study": settings.study_name,
            "input": simplify_file_name(&settings.input_path),
            "goal": settings.goal,
            "roles": roles,
            "startDate": resolved.dates.map(|(start, _)| fmt(start)),
            "endDate": resolved.dates.map(|(_, end)| fmt(end)),
        },
        "schema": {
            "temporal": schema.temporal.name(),
            "role": schema.has_role,
            "gender": schema.has_gender,
            "location": schema.has_location,
        },
        "progress": {
            "responsesTotal": s.progress.responses_total,
            "responsesFiltered": s.responses_filtered,
            "goal": s.progress.goal,
            "remaining": s.progress.remaining,
            "pct": round2(s.progress.pct),
        },
        "daily": daily,
        "hourly": hourly,
        "gender": counts_to_json(&s.gender),
        "roles": counts_to_json(&s.roles),
        "locations": counts_to_json(&s.locations),
        "fallbackDates": s.fallback_dates,
    })
}

/// Reads, normalizes and summarizes the survey.
///
/// `today` is the processing day, substituted for the dates that cannot be read.
pub fn build_summary(settings: &Settings, today: NaiveDate) -> SurveyResult<JSValue> {
    let raw = read_survey_data(settings)?;
    let options = NormalizeOptions {
        columns: settings.columns.clone(),
        sentinels: settings.sentinels.clone(),
        date_fallback: settings.date_fallback,
        today,
    };
    let table = normalize(&raw, &options);
    let summaries = aggregate(&table, &settings.filter, settings.goal).context(SummarizingSnafu {})?;
    let resolved = table.resolve_filter(&settings.filter);
    Ok(build_summary_js(settings, &table.schema, &resolved, &summaries))
}

/// Compares the summary with a reference summary, printing the differences.
pub fn check_reference(reference_path: &str, pretty_js_stats: &str) -> SurveyResult<()> {
    let summary_ref = read_summary(reference_path)?;
    let pretty_js_summary_ref =
        serde_json::to_string_pretty(&summary_ref).context(ParsingJsonSnafu {})?;
    if pretty_js_summary_ref != pretty_js_stats {
        warn!("Found differences with the reference summary");
        print_diff(pretty_js_summary_ref.as_str(), pretty_js_stats, "\n");
        whatever!("Difference detected between calculated summary and reference summary")
    }
    info!("The summary matches the reference {:?}", reference_path);
    Ok(())
}

pub fn run_survey(args: &Args) -> SurveyResult<()> {
    let settings = load_settings(args)?;
    let today = Local::now().date_naive();
    let result_js = build_summary(&settings, today)?;
    let pretty_js_stats = serde_json::to_string_pretty(&result_js).context(ParsingJsonSnafu {})?;

    match settings.out.as_deref() {
        None | Some("stdout") => println!("{}", pretty_js_stats),
        Some(path) => {
            fs::write(path, &pretty_js_stats).context(WritingOutputSnafu { path })?;
            info!("Summary written to {:?}", path);
        }
    }

    if let Some(reference_path) = &settings.reference {
        check_reference(reference_path, &pretty_js_stats)?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;

    fn test_path(name: &str) -> String {
        format!("{}/tests/data/{}", env!("CARGO_MANIFEST_DIR"), name)
    }

    fn fixture_day() -> NaiveDate {
        NaiveDate::from_ymd_opt(2026, 3, 5).unwrap()
    }

    fn args(extra: &[&str]) -> Args {
        let mut v: Vec<&str> = vec!["survey-monitor"];
        v.extend_from_slice(extra);
        Args::parse_from(v)
    }

    fn summary_for(extra: &[&str]) -> JSValue {
        let _ = env_logger::builder().is_test(true).try_init();
        let settings = load_settings(&args(extra)).unwrap();
        build_summary(&settings, fixture_day()).unwrap()
    }

    #[test]
    fn utf8_export_matches_reference() {
        let input = test_path("responses_utf8.csv");
        let js = summary_for(&["-i", input.as_str()]);
        let pretty = serde_json::to_string_pretty(&js).unwrap();
        check_reference(test_path("responses_utf8_expected_summary.json").as_str(), &pretty).unwrap();
    }

    #[test]
    fn latin1_export_gives_the_same_summary() {
        let utf8 = summary_for(&["-i", test_path("responses_utf8.csv").as_str()]);
        let latin1 = summary_for(&["-i", test_path("responses_latin1.csv").as_str()]);
        for key in ["progress", "daily", "hourly", "gender", "roles", "locations"] {
            assert_eq!(utf8[key], latin1[key], "{}", key);
        }
        assert_eq!(latin1["config"]["input"], "responses_latin1.csv");
    }

    #[test]
    fn combined_timestamp_export() {
        let js = summary_for(&["-i", test_path("responses_timestamp.csv").as_str()]);
        assert_eq!(js["schema"]["temporal"], "combinedTimestamp");
        assert_eq!(js["schema"]["gender"], false);
        assert_eq!(js["gender"], JSValue::Null);
        assert_eq!(js["hourly"].as_array().map(|a| a.len()), Some(24));
        assert_eq!(js["fallbackDates"], 0);
        // The unreadable timestamp stays out of the date filter.
        assert_eq!(js["progress"]["responsesTotal"], 4);
        assert_eq!(js["progress"]["responsesFiltered"], 3);
    }

    #[test]
    fn study_configuration() {
        let js = summary_for(&["-c", test_path("study_config.json").as_str()]);
        assert_eq!(js["config"]["study"], "Fieldwork test");
        assert_eq!(js["config"]["roles"], json!(["Guionista"]));
        assert_eq!(js["config"]["endDate"], "2026-03-02");
        assert_eq!(js["progress"]["responsesFiltered"], 2);
        assert_eq!(js["progress"]["remaining"], 0);
        assert_eq!(js["progress"]["pct"], 150.0);
    }

    #[test]
    fn command_line_overrides_configuration() {
        let js = summary_for(&[
            "-c",
            test_path("study_config.json").as_str(),
            "--role",
            "all",
            "--goal",
            "12",
            "--date-fallback",
            "unparsed",
        ]);
        assert_eq!(js["progress"]["goal"], 12);
        assert_eq!(js["progress"]["pct"], 50.0);
        // Start 2026-03-01 and end 2026-03-02 from the configuration.
        assert_eq!(js["progress"]["responsesFiltered"], 4);
        assert_eq!(js["fallbackDates"], 0);
    }

    #[test]
    fn excel_export_with_a_worksheet_name() {
        let js = summary_for(&[
            "-i",
            test_path("responses_two_sheets.xlsx").as_str(),
            "--excel-worksheet-name",
            "Respuestas",
        ]);
        assert_eq!(js["config"]["input"], "responses_two_sheets.xlsx");
        assert_eq!(js["schema"]["temporal"], "combinedTimestamp");
        assert_eq!(js["progress"]["responsesTotal"], 3);
        assert_eq!(
            js["daily"],
            json!([
                {"date": "2026-03-01", "count": 1},
                {"date": "2026-03-02", "count": 2},
            ])
        );
        assert_eq!(js["hourly"][9]["count"], 1);
        assert_eq!(js["hourly"][10]["count"], 1);
        assert_eq!(js["hourly"][18]["count"], 1);
        assert_eq!(
            js["gender"],
            json!([
                {"label": "Mujer", "count": 1},
                {"label": "prefers not to say", "count": 1},
                {"label": "Hombre", "count": 1},
            ])
        );
    }

    #[test]
    fn excel_export_without_a_worksheet_name() {
        let settings =
            load_settings(&args(&["-i", test_path("responses_two_sheets.xlsx").as_str()])).unwrap();
        assert_eq!(settings.input_type, InputType::Xlsx);
        let res = build_summary(&settings, fixture_day());
        assert!(matches!(res, Err(SurveyError::AmbiguousWorksheet { .. })));
    }

    #[test]
    fn unreadable_export() {
        let settings = load_settings(&args(&["-i", test_path("unreadable.csv").as_str()])).unwrap();
        let res = build_summary(&settings, fixture_day());
        assert!(matches!(res, Err(SurveyError::Unreadable { .. })));
    }

    #[test]
    fn missing_export() {
        let settings = load_settings(&args(&["-i", test_path("no_such_file.csv").as_str()])).unwrap();
        let res = build_summary(&settings, fixture_day());
        assert!(matches!(res, Err(SurveyError::OpeningInput { .. })));
    }

    #[test]
    fn bad_arguments() {
        let res = load_settings(&args(&[]));
        assert!(matches!(res, Err(SurveyError::MissingInput {})));
        let res = load_settings(&args(&["-i", "x.csv", "--start-date", "someday"]));
        assert!(matches!(res, Err(SurveyError::InvalidDate { .. })));
        let res = load_settings(&args(&["-i", "x.csv", "--input-type", "ods"]));
        assert!(matches!(res, Err(SurveyError::UnknownInputType { .. })));
        let settings = load_settings(&args(&["-i", "x.csv", "--goal", "0"])).unwrap();
        assert!(matches!(
            build_summary(
                &Settings {
                    input_path: test_path("responses_utf8.csv"),
                    ..settings
                },
                fixture_day()
            ),
            Err(SurveyError::Summarizing {
                source: StatsError::InvalidGoal
            })
        ));
    }

    #[test]
    fn input_type_from_extension() {
        let settings = load_settings(&args(&["-i", "Results.XLSX"])).unwrap();
        assert_eq!(settings.input_type, InputType::Xlsx);
        let settings = load_settings(&args(&["-i", "results.txt"])).unwrap();
        assert_eq!(settings.input_type, InputType::Csv);
        assert_eq!(settings.goal, DEFAULT_GOAL);
        assert_eq!(settings.filter, Filter::ALL);
    }
}
