// ********* Input data structures ***********

use chrono::NaiveDate;
use std::error::Error;
use std::fmt::Display;

/// Values that count as a missing cell, in addition to empty or blank cells.
///
/// These are the markers that spreadsheet and statistics tools write out for
/// "no value" in their CSV exports.
pub const MISSING_MARKERS: &[&str] = &[
    "#N/A", "#N/A N/A", "#NA", "-1.#IND", "-1.#QNAN", "-NaN", "-nan", "1.#IND", "1.#QNAN", "<NA>",
    "N/A", "NA", "NULL", "NaN", "None", "n/a", "nan", "null",
];

/// A survey export, as read by the file readers.
///
/// The header names are already trimmed. Every row has exactly as many cells as
/// the header; a `None` cell is a missing value.
///
/// Use the [`crate::builder::TableBuilder`] to create one.
#[derive(Eq, PartialEq, Debug, Clone)]
pub struct RawTable {
    pub(crate) header: Vec<String>,
    pub(crate) rows: Vec<Vec<Option<String>>>,
}

impl RawTable {
    pub fn header(&self) -> &[String] {
        &self.header
    }

    pub fn rows(&self) -> &[Vec<Option<String>>] {
        &self.rows
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// The position of a column, looked up by its exact (trimmed) name.
    /// The first column wins if a name is repeated.
    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.header.iter().position(|h| h == name.trim())
    }
}

// ******** Output data structures *********

/// The date of a submission, with a record of where it came from.
#[derive(Eq, PartialEq, Debug, Clone, Copy, Hash)]
pub enum SubmissionDate {
    /// Read from the export.
    Parsed(NaiveDate),
    /// The date in the export could not be read and the processing day was
    /// substituted for it (see [`DateFallback::Today`]).
    Fallback(NaiveDate),
    /// No usable date for this submission.
    Unparsed,
}

impl SubmissionDate {
    pub fn date(&self) -> Option<NaiveDate> {
        match self {
            SubmissionDate::Parsed(d) | SubmissionDate::Fallback(d) => Some(*d),
            SubmissionDate::Unparsed => None,
        }
    }

    pub fn is_fallback(&self) -> bool {
        matches!(self, SubmissionDate::Fallback(_))
    }
}

/// One survey submission after normalization.
#[derive(Eq, PartialEq, Debug, Clone)]
pub struct CleanRecord {
    pub role: String,
    pub gender: String,
    pub submission_date: SubmissionDate,
    /// Always in 0..=23 when present.
    pub submission_hour: Option<u32>,
    pub location: String,
}

/// How the submission time is laid out in the export.
///
/// It is decided once per table, from the columns that are present.
#[derive(Eq, PartialEq, Debug, Clone, Copy, Hash)]
pub enum TemporalShape {
    /// One column for the date and one for the time of day.
    SeparateDateTime,
    /// A single column holding the full timestamp.
    CombinedTimestamp,
    NoTemporalData,
}

impl TemporalShape {
    pub fn name(&self) -> &'static str {
        match self {
            TemporalShape::SeparateDateTime => "separateDateTime",
            TemporalShape::CombinedTimestamp => "combinedTimestamp",
            TemporalShape::NoTemporalData => "noTemporalData",
        }
    }

    pub fn is_present(&self) -> bool {
        !matches!(self, TemporalShape::NoTemporalData)
    }
}

/// The dimensions available in a normalized table.
#[derive(Eq, PartialEq, Debug, Clone, Copy)]
pub struct Schema {
    pub temporal: TemporalShape,
    pub has_role: bool,
    pub has_gender: bool,
    pub has_location: bool,
}

/// The normalized survey table. It has exactly one record per row of the export.
#[derive(Eq, PartialEq, Debug, Clone)]
pub struct CleanTable {
    pub records: Vec<CleanRecord>,
    pub schema: Schema,
}

/// Progress of the whole study towards its goal. It ignores the filters.
#[derive(PartialEq, Debug, Clone)]
pub struct GoalProgress {
    pub responses_total: u64,
    pub goal: u64,
    /// Never negative: a study that passed its goal has nothing remaining.
    pub remaining: u64,
    /// Not capped at 100.
    pub pct: f64,
}

/// All the summaries computed for one filter.
///
/// A summary is `None` when the table does not have the dimension it groups by.
#[derive(PartialEq, Debug, Clone)]
pub struct Summaries {
    pub progress: GoalProgress,
    pub responses_filtered: u64,
    /// Ascending dates, only the dates that were observed.
    pub daily: Option<Vec<(NaiveDate, u64)>>,
    /// Always the 24 hours of the day, in order.
    pub hourly: Option<Vec<(u32, u64)>>,
    pub gender: Option<Vec<(String, u64)>>,
    /// At most [`TOP_ROLES`] entries, descending counts.
    pub roles: Option<Vec<(String, u64)>>,
    /// At most [`TOP_LOCATIONS`] entries, descending counts.
    pub locations: Option<Vec<(String, u64)>>,
    /// Filtered records whose date was substituted by the processing day.
    pub fallback_dates: u64,
}

/// Errors that prevent the summaries from being computed.
#[derive(Eq, PartialEq, Debug, Clone)]
pub enum StatsError {
    /// The goal of the study must be strictly positive.
    InvalidGoal,
    /// A row of the export has more cells than the header.
    RowTooLong { lineno: usize, cells: usize },
    EmptyHeader,
}

impl Error for StatsError {}

impl Display for StatsError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            StatsError::InvalidGoal => write!(f, "the goal of the study must be at least 1"),
            StatsError::RowTooLong { lineno, cells } => {
                write!(f, "row {} has {} cells, more than the header", lineno, cells)
            }
            StatsError::EmptyHeader => write!(f, "the table has no header row"),
        }
    }
}

// ********* Configuration **********

pub const DEFAULT_GOAL: u64 = 150;
pub const TOP_ROLES: usize = 7;
pub const TOP_LOCATIONS: usize = 15;

/// The role name that callers use to select every role.
pub const ALL_ROLES: &str = "all";

/// What to do with a submission whose date cannot be read, when the export has
/// separate date and time columns.
#[derive(Eq, PartialEq, Debug, Clone, Copy)]
pub enum DateFallback {
    /// Use the processing day, tagged as [`SubmissionDate::Fallback`].
    Today,
    /// Leave the submission without a date. It is then excluded from the date
    /// filter and from the daily series.
    Unparsed,
}

/// The names of the columns of the export. Lookups are exact, after trimming.
#[derive(Eq, PartialEq, Debug, Clone)]
pub struct ColumnNames {
    pub role: String,
    pub gender: String,
    pub date: String,
    pub time: String,
    pub timestamp: String,
    pub region: String,
    pub country: String,
}

impl Default for ColumnNames {
    fn default() -> Self {
        ColumnNames {
            role: "A7. Rol Principal".to_string(),
            gender: "A2. Identidad de género".to_string(),
            date: "Fecha".to_string(),
            time: "Hora".to_string(),
            timestamp: "Fecha de envío".to_string(),
            region: "A5. Provincia de residencia".to_string(),
            country: "A5a. País Extranjero".to_string(),
        }
    }
}

/// Placeholders for the categorical values that were not answered.
#[derive(Eq, PartialEq, Debug, Clone)]
pub struct Sentinels {
    pub role: String,
    pub gender: String,
    pub location: String,
}

impl Default for Sentinels {
    fn default() -> Self {
        Sentinels {
            role: "unspecified".to_string(),
            gender: "prefers not to say".to_string(),
            location: "unknown".to_string(),
        }
    }
}

#[derive(Eq, PartialEq, Debug, Clone)]
pub struct NormalizeOptions {
    pub columns: ColumnNames,
    pub sentinels: Sentinels,
    pub date_fallback: DateFallback,
    /// The processing day, used by [`DateFallback::Today`].
    pub today: NaiveDate,
}

impl NormalizeOptions {
    pub fn new(today: NaiveDate) -> NormalizeOptions {
        NormalizeOptions {
            columns: ColumnNames::default(),
            sentinels: Sentinels::default(),
            date_fallback: DateFallback::Today,
            today,
        }
    }
}

/// The roles to keep.
#[derive(Eq, PartialEq, Debug, Clone)]
pub enum RoleFilter {
    /// Every role observed in the table.
    All,
    Only(Vec<String>),
}

/// The selection made by the operator.
///
/// Missing dates default to the earliest and latest dates of the table.
#[derive(Eq, PartialEq, Debug, Clone)]
pub struct Filter {
    pub roles: RoleFilter,
    pub start: Option<NaiveDate>,
    pub end: Option<NaiveDate>,
}

impl Filter {
    pub const ALL: Filter = Filter {
        roles: RoleFilter::All,
        start: None,
        end: None,
    };
}
