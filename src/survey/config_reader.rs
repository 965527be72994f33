use crate::survey::*;

use serde::{Deserialize, Serialize};

#[derive(Eq, PartialEq, Debug, Clone, Default, Serialize, Deserialize)]
pub struct OutputSettings {
    #[serde(rename = "studyName")]
    pub study_name: Option<String>,
    #[serde(rename = "outputPath")]
    pub output_path: Option<String>,
}

/// Column names that differ from the default export. Unset names keep their
/// default.
#[derive(Eq, PartialEq, Debug, Clone, Default, Serialize, Deserialize)]
pub struct ColumnsConfig {
    pub role: Option<String>,
    pub gender: Option<String>,
    pub date: Option<String>,
    pub time: Option<String>,
    pub timestamp: Option<String>,
    pub region: Option<String>,
    pub country: Option<String>,
}

impl ColumnsConfig {
    pub fn apply(&self, mut names: ColumnNames) -> ColumnNames {
        let overrides = [
            (&self.role, &mut names.role),
            (&self.gender, &mut names.gender),
            (&self.date, &mut names.date),
            (&self.time, &mut names.time),
            (&self.timestamp, &mut names.timestamp),
            (&self.region, &mut names.region),
            (&self.country, &mut names.country),
        ];
        for (value, name) in overrides {
            if let Some(v) = value {
                *name = v.clone();
            }
        }
        names
    }
}

#[derive(Eq, PartialEq, Debug, Clone, Default, Serialize, Deserialize)]
pub struct SentinelsConfig {
    pub role: Option<String>,
    pub gender: Option<String>,
    pub location: Option<String>,
}

impl SentinelsConfig {
    pub fn apply(&self, mut sentinels: Sentinels) -> Sentinels {
        if let Some(v) = &self.role {
            sentinels.role = v.clone();
        }
        if let Some(v) = &self.gender {
            sentinels.gender = v.clone();
        }
        if let Some(v) = &self.location {
            sentinels.location = v.clone();
        }
        sentinels
    }
}

#[derive(Eq, PartialEq, Debug, Clone, Default, Serialize, Deserialize)]
pub struct FileSource {
    /// "csv" or "xlsx"
    pub provider: Option<String>,
    /// Relative to the directory of the configuration file.
    #[serde(rename = "filePath")]
    pub file_path: Option<String>,
    #[serde(rename = "excelWorksheetName")]
    pub excel_worksheet_name: Option<String>,
    pub columns: Option<ColumnsConfig>,
}

#[derive(Eq, PartialEq, Debug, Clone, Default, Serialize, Deserialize)]
pub struct SurveyRules {
    pub goal: Option<u64>,
    #[serde(rename = "dateFallback")]
    pub date_fallback: Option<String>,
    pub roles: Option<Vec<String>>,
    #[serde(rename = "startDate")]
    pub start_date: Option<String>,
    #[serde(rename = "endDate")]
    pub end_date: Option<String>,
    pub sentinels: Option<SentinelsConfig>,
}

#[derive(Eq, PartialEq, Debug, Clone, Default, Serialize, Deserialize)]
pub struct SurveyConfig {
    #[serde(rename = "outputSettings", default)]
    pub output_settings: OutputSettings,
    #[serde(rename = "fileSource", default)]
    pub file_source: FileSource,
    #[serde(default)]
    pub rules: SurveyRules,
}

pub fn read_config(path: &str) -> SurveyResult<SurveyConfig> {
    let contents = fs::read_to_string(path).context(OpeningJsonSnafu { path })?;
    let config: SurveyConfig = serde_json::from_str(&contents).context(ParsingJsonSnafu {})?;
    debug!("read_config: {:?}", config);
    Ok(config)
}

pub fn read_summary(path: &str) -> SurveyResult<JSValue> {
    let contents = fs::read_to_string(path).context(OpeningJsonSnafu { path })?;
    let js: JSValue = serde_json::from_str(&contents).context(ParsingJsonSnafu {})?;
    Ok(js)
}
