mod config;
pub mod builder;
pub mod datetime;
pub mod manual;

use chrono::{NaiveDate, Timelike};
use log::{debug, info, warn};

use std::collections::{HashMap, HashSet};

pub use crate::config::*;
use crate::datetime::{parse_clock_time, parse_day_first_date, parse_day_first_timestamp};

// **** Private structures ****

// The temporal shape of a table, with the positions of the columns it reads.
#[derive(Eq, PartialEq, Debug, Clone, Copy)]
enum TemporalColumns {
    SeparateDateTime { date: usize, time: usize },
    CombinedTimestamp { timestamp: usize },
    NoTemporalData,
}

impl TemporalColumns {
    fn detect(raw: &RawTable, columns: &ColumnNames) -> TemporalColumns {
        match (
            raw.column_index(&columns.date),
            raw.column_index(&columns.time),
            raw.column_index(&columns.timestamp),
        ) {
            (Some(date), Some(time), _) => TemporalColumns::SeparateDateTime { date, time },
            (_, _, Some(timestamp)) => TemporalColumns::CombinedTimestamp { timestamp },
            _ => TemporalColumns::NoTemporalData,
        }
    }

    fn shape(&self) -> TemporalShape {
        match self {
            TemporalColumns::SeparateDateTime { .. } => TemporalShape::SeparateDateTime,
            TemporalColumns::CombinedTimestamp { .. } => TemporalShape::CombinedTimestamp,
            TemporalColumns::NoTemporalData => TemporalShape::NoTemporalData,
        }
    }
}

// The positions of all the columns that normalization reads.
#[derive(Eq, PartialEq, Debug, Clone, Copy)]
struct ColumnLayout {
    role: Option<usize>,
    gender: Option<usize>,
    region: Option<usize>,
    country: Option<usize>,
    temporal: TemporalColumns,
}

/// A filter, once checked against a table.
///
/// `roles` is `None` when the table has no role dimension, and `dates` is `None`
/// when it has no temporal dimension: the corresponding test always passes.
#[derive(Eq, PartialEq, Debug, Clone)]
pub struct ResolvedFilter {
    pub roles: Option<HashSet<String>>,
    pub dates: Option<(NaiveDate, NaiveDate)>,
}

impl ResolvedFilter {
    pub fn accepts(&self, record: &CleanRecord) -> bool {
        let role_ok = match &self.roles {
            Some(roles) => roles.contains(&record.role),
            None => true,
        };
        let date_ok = match self.dates {
            Some((start, end)) => match record.submission_date.date() {
                Some(d) => start <= d && d <= end,
                None => false,
            },
            None => true,
        };
        role_ok && date_ok
    }
}

/// Turns a raw survey export into the clean table.
///
/// This never drops nor merges rows: the output has one record per input row.
/// Missing categorical values are replaced by the sentinels of the options, and
/// the columns that are absent make the corresponding dimension absent from the
/// schema.
pub fn normalize(raw: &RawTable, options: &NormalizeOptions) -> CleanTable {
    let columns = &options.columns;
    let layout = ColumnLayout {
        role: raw.column_index(&columns.role),
        gender: raw.column_index(&columns.gender),
        region: raw.column_index(&columns.region),
        country: raw.column_index(&columns.country),
        temporal: TemporalColumns::detect(raw, columns),
    };
    let schema = Schema {
        temporal: layout.temporal.shape(),
        has_role: layout.role.is_some(),
        has_gender: layout.gender.is_some(),
        has_location: layout.region.is_some() || layout.country.is_some(),
    };
    info!(
        "normalize: {} rows, {} columns, temporal shape: {}",
        raw.len(),
        raw.header().len(),
        schema.temporal.name()
    );
    debug!("normalize: layout {:?}", layout);
    if !schema.has_role {
        warn!("normalize: no column {:?}, roles are not available", columns.role);
    }
    if !schema.has_gender {
        warn!(
            "normalize: no column {:?}, genders are not available",
            columns.gender
        );
    }

    let mut records: Vec<CleanRecord> = Vec::with_capacity(raw.len());
    let mut num_fallbacks: usize = 0;
    for (idx, row) in raw.rows().iter().enumerate() {
        let record = normalize_row(row, &layout, options);
        if record.submission_date.is_fallback() {
            // The header is line 1.
            debug!(
                "normalize: line {}: unreadable date {:?}, using {}",
                idx + 2,
                cell(row, date_column(&layout.temporal)),
                options.today
            );
            num_fallbacks += 1;
        }
        records.push(record);
    }
    if num_fallbacks > 0 {
        warn!(
            "normalize: {} submissions had an unreadable date and were assigned the processing day {}",
            num_fallbacks, options.today
        );
    }
    CleanTable { records, schema }
}

fn normalize_row(
    row: &[Option<String>],
    layout: &ColumnLayout,
    options: &NormalizeOptions,
) -> CleanRecord {
    let sentinels = &options.sentinels;
    let (submission_date, submission_hour) = derive_time(row, &layout.temporal, options);
    CleanRecord {
        role: cell(row, layout.role)
            .unwrap_or(sentinels.role.as_str())
            .to_string(),
        gender: cell(row, layout.gender)
            .unwrap_or(sentinels.gender.as_str())
            .to_string(),
        submission_date,
        submission_hour,
        location: resolve_location(
            cell(row, layout.region),
            cell(row, layout.country),
            &sentinels.location,
        ),
    }
}

fn cell(row: &[Option<String>], idx: Option<usize>) -> Option<&str> {
    idx.and_then(|i| row.get(i)).and_then(|c| c.as_deref())
}

fn date_column(temporal: &TemporalColumns) -> Option<usize> {
    match temporal {
        TemporalColumns::SeparateDateTime { date, .. } => Some(*date),
        TemporalColumns::CombinedTimestamp { timestamp } => Some(*timestamp),
        TemporalColumns::NoTemporalData => None,
    }
}

fn derive_time(
    row: &[Option<String>],
    temporal: &TemporalColumns,
    options: &NormalizeOptions,
) -> (SubmissionDate, Option<u32>) {
    match *temporal {
        TemporalColumns::SeparateDateTime { date, time } => {
            let submission_date = match cell(row, Some(date)).and_then(parse_day_first_date) {
                Some(d) => SubmissionDate::Parsed(d),
                None => match options.date_fallback {
                    DateFallback::Today => SubmissionDate::Fallback(options.today),
                    DateFallback::Unparsed => SubmissionDate::Unparsed,
                },
            };
            // A bad time never falls back to a default hour.
            let hour = cell(row, Some(time))
                .and_then(parse_clock_time)
                .map(|t| t.hour());
            (submission_date, hour)
        }
        TemporalColumns::CombinedTimestamp { timestamp } => {
            match cell(row, Some(timestamp)).and_then(parse_day_first_timestamp) {
                Some(dt) => (SubmissionDate::Parsed(dt.date()), Some(dt.hour())),
                None => (SubmissionDate::Unparsed, None),
            }
        }
        TemporalColumns::NoTemporalData => (SubmissionDate::Unparsed, None),
    }
}

/// The place of residence: the region if given, else the foreign country, else
/// the sentinel.
pub fn resolve_location(region: Option<&str>, country: Option<&str>, unknown: &str) -> String {
    region.or(country).unwrap_or(unknown).to_string()
}

impl CleanTable {
    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// The distinct roles, in sorted order. Empty if the table has no role.
    pub fn distinct_roles(&self) -> Vec<String> {
        if !self.schema.has_role {
            return Vec::new();
        }
        let mut roles: Vec<String> = self
            .records
            .iter()
            .map(|r| r.role.clone())
            .collect::<HashSet<String>>()
            .into_iter()
            .collect();
        roles.sort();
        roles
    }

    /// The earliest and latest submission dates, if any.
    pub fn date_bounds(&self) -> Option<(NaiveDate, NaiveDate)> {
        if !self.schema.temporal.is_present() {
            return None;
        }
        let dates = self.records.iter().filter_map(|r| r.submission_date.date());
        dates.fold(None, |acc, d| match acc {
            None => Some((d, d)),
            Some((lo, hi)) => Some((lo.min(d), hi.max(d))),
        })
    }

    /// Checks a filter against this table.
    ///
    /// Selecting all the roles means selecting every role observed in the table.
    pub fn resolve_filter(&self, filter: &Filter) -> ResolvedFilter {
        let roles: Option<HashSet<String>> = if self.schema.has_role {
            Some(match &filter.roles {
                RoleFilter::All => self.distinct_roles().into_iter().collect(),
                RoleFilter::Only(names) => names.iter().cloned().collect(),
            })
        } else {
            None
        };
        let dates = if self.schema.temporal.is_present() {
            match (self.date_bounds(), filter.start, filter.end) {
                (_, Some(start), Some(end)) => Some((start, end)),
                (Some((lo, hi)), start, end) => Some((start.unwrap_or(lo), end.unwrap_or(hi))),
                // No date at all in the table: only explicit bounds make sense.
                (None, start, end) => Some((
                    start.unwrap_or(NaiveDate::MIN),
                    end.unwrap_or(NaiveDate::MAX),
                )),
            }
        } else {
            None
        };
        debug!("resolve_filter: {:?} -> {:?}", filter, (&roles, dates));
        ResolvedFilter { roles, dates }
    }

    /// The records selected by the filter, in table order.
    pub fn filter_records(&self, filter: &Filter) -> Vec<&CleanRecord> {
        let resolved = self.resolve_filter(filter);
        self.records.iter().filter(|r| resolved.accepts(r)).collect()
    }
}

/// Computes all the summaries of the table for the given filter.
///
/// Arguments:
/// * `table` the normalized survey
/// * `filter` the roles and dates selected by the operator
/// * `goal` the number of responses the study aims for
pub fn aggregate(table: &CleanTable, filter: &Filter, goal: u64) -> Result<Summaries, StatsError> {
    if goal == 0 {
        return Err(StatsError::InvalidGoal);
    }
    let progress = goal_progress(table.len() as u64, goal);
    let selected = table.filter_records(filter);
    info!(
        "aggregate: {} of {} responses selected",
        selected.len(),
        table.len()
    );

    let schema = &table.schema;
    let daily = if schema.temporal.is_present() {
        Some(daily_series(&selected))
    } else {
        None
    };
    let hourly = if schema.temporal.is_present() {
        Some(hourly_histogram(&selected))
    } else {
        None
    };
    let gender = if schema.has_gender {
        Some(sorted_by_count(count_by(&selected, |r| r.gender.as_str())))
    } else {
        None
    };
    let roles = if schema.has_role {
        Some(top_n(count_by(&selected, |r| r.role.as_str()), TOP_ROLES))
    } else {
        None
    };
    let locations = if schema.has_location {
        Some(top_n(
            count_by(&selected, |r| r.location.as_str()),
            TOP_LOCATIONS,
        ))
    } else {
        None
    };
    let fallback_dates = selected
        .iter()
        .filter(|r| r.submission_date.is_fallback())
        .count() as u64;

    let summaries = Summaries {
        progress,
        responses_filtered: selected.len() as u64,
        daily,
        hourly,
        gender,
        roles,
        locations,
        fallback_dates,
    };
    log_summaries(&summaries);
    Ok(summaries)
}

/// Progress of the whole study. The percentage is not capped at 100.
pub fn goal_progress(responses_total: u64, goal: u64) -> GoalProgress {
    GoalProgress {
        responses_total,
        goal,
        remaining: goal.saturating_sub(responses_total),
        pct: 100.0 * responses_total as f64 / goal as f64,
    }
}

/// Counts per observed date, in ascending order. Days without submissions are
/// not filled in.
pub fn daily_series(records: &[&CleanRecord]) -> Vec<(NaiveDate, u64)> {
    let mut counts: HashMap<NaiveDate, u64> = HashMap::new();
    for r in records.iter() {
        if let Some(d) = r.submission_date.date() {
            *counts.entry(d).or_insert(0) += 1;
        }
    }
    let mut res: Vec<(NaiveDate, u64)> = counts.into_iter().collect();
    res.sort();
    res
}

/// Counts per hour of the day. All the 24 hours are present, so that the
/// histograms for different filters can be compared.
pub fn hourly_histogram(records: &[&CleanRecord]) -> Vec<(u32, u64)> {
    let mut res: Vec<(u32, u64)> = (0..24).map(|h| (h, 0)).collect();
    for r in records.iter() {
        if let Some((_, count)) = r.submission_hour.and_then(|h| res.get_mut(h as usize)) {
            *count += 1;
        }
    }
    res
}

/// Counts the records per category, in the order the categories are first seen.
pub fn count_by<'a, F>(records: &[&'a CleanRecord], key: F) -> Vec<(String, u64)>
where
    F: Fn(&'a CleanRecord) -> &'a str,
{
    let mut positions: HashMap<&str, usize> = HashMap::new();
    let mut res: Vec<(String, u64)> = Vec::new();
    for r in records.iter().copied() {
        let k = key(r);
        match positions.get(k) {
            Some(pos) => res[*pos].1 += 1,
            None => {
                positions.insert(k, res.len());
                res.push((k.to_string(), 1));
            }
        }
    }
    res
}

// Descending counts. The sort is stable: equal counts keep their discovery order.
fn sorted_by_count(mut counts: Vec<(String, u64)>) -> Vec<(String, u64)> {
    counts.sort_by(|a, b| b.1.cmp(&a.1));
    counts
}

/// The `n` categories with the most records, in descending order of counts.
pub fn top_n(counts: Vec<(String, u64)>, n: usize) -> Vec<(String, u64)> {
    let mut res = sorted_by_count(counts);
    res.truncate(n);
    res
}

fn log_summaries(s: &Summaries) {
    let p = &s.progress;
    info!(
        "Responses: {} selected, {} in total, goal {} ({:.1}%, {} remaining)",
        s.responses_filtered, p.responses_total, p.goal, p.pct, p.remaining
    );
    if let Some(daily) = &s.daily {
        for (d, c) in daily.iter() {
            info!("    {:>4} {}", c, d);
        }
    }
    if let Some(hourly) = &s.hourly {
        let peak = hourly.iter().max_by(|a, b| a.1.cmp(&b.1).then(b.0.cmp(&a.0)));
        if let Some((h, c)) = peak.filter(|(_, c)| *c > 0) {
            info!("Peak hour: {:02}h ({} responses)", h, c);
        }
    }
    let breakdowns = [
        ("Gender", &s.gender),
        ("Roles", &s.roles),
        ("Locations", &s.locations),
    ];
    for (title, counts) in breakdowns.iter() {
        match counts {
            Some(counts) => {
                info!("{}:", title);
                for (name, c) in counts.iter() {
                    info!("    {:>4} {}", c, name);
                }
            }
            None => info!("{}: not available", title),
        }
    }
    if s.fallback_dates > 0 {
        warn!(
            "{} selected responses carry the processing day instead of their submission date",
            s.fallback_dates
        );
    }
}

#[cfg(test)]
mod tests {
    use super::builder::TableBuilder;
    use super::*;

    const ROLE: &str = "A7. Rol Principal";
    const GENDER: &str = "A2. Identidad de género";
    const REGION: &str = "A5. Provincia de residencia";
    const COUNTRY: &str = "A5a. País Extranjero";

    fn init_logger() {
        let _ = env_logger::builder().is_test(true).try_init();
    }

    fn today() -> NaiveDate {
        NaiveDate::from_ymd_opt(2026, 10, 16).unwrap()
    }

    fn ymd(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn table(header: &[&str], rows: &[&[&str]]) -> RawTable {
        let header: Vec<String> = header.iter().map(|s| s.to_string()).collect();
        let mut b = TableBuilder::new(&header).unwrap();
        for row in rows.iter() {
            b.add_row_simple(row).unwrap();
        }
        b.build()
    }

    fn clean(header: &[&str], rows: &[&[&str]]) -> CleanTable {
        normalize(&table(header, rows), &NormalizeOptions::new(today()))
    }

    fn record(role: &str, date: Option<NaiveDate>, hour: Option<u32>, location: &str) -> CleanRecord {
        CleanRecord {
            role: role.to_string(),
            gender: "prefers not to say".to_string(),
            submission_date: date.map_or(SubmissionDate::Unparsed, SubmissionDate::Parsed),
            submission_hour: hour,
            location: location.to_string(),
        }
    }

    fn full_schema() -> Schema {
        Schema {
            temporal: TemporalShape::SeparateDateTime,
            has_role: true,
            has_gender: true,
            has_location: true,
        }
    }

    #[test]
    fn two_row_example() {
        init_logger();
        let t = clean(
            &[ROLE, "Fecha", "Hora"],
            &[
                &["Illustrator", "01/03/2026", "09:15:00"],
                &["", "bad", "23:10:00"],
            ],
        );
        assert_eq!(t.len(), 2);
        assert_eq!(t.schema.temporal, TemporalShape::SeparateDateTime);
        assert_eq!(t.records[0].role, "Illustrator");
        assert_eq!(
            t.records[0].submission_date,
            SubmissionDate::Parsed(ymd(2026, 3, 1))
        );
        assert_eq!(t.records[0].submission_hour, Some(9));
        assert_eq!(t.records[1].role, "unspecified");
        assert_eq!(t.records[1].submission_hour, Some(23));
        assert_eq!(t.records[1].submission_date, SubmissionDate::Fallback(today()));

        let s = aggregate(&t, &Filter::ALL, 150).unwrap();
        assert_eq!(s.progress.responses_total, 2);
        assert_eq!(s.progress.remaining, 148);
        assert!((s.progress.pct - 100.0 * 2.0 / 150.0).abs() < 1e-9);
        assert_eq!(s.responses_filtered, 2);
        assert_eq!(s.fallback_dates, 1);
    }

    #[test]
    fn unparsed_policy_keeps_the_row_without_a_date() {
        let mut options = NormalizeOptions::new(today());
        options.date_fallback = DateFallback::Unparsed;
        let raw = table(
            &[ROLE, "Fecha", "Hora"],
            &[&["Colorist", "02/03/2026", "10:00:00"], &["Colorist", "??", "11:00:00"]],
        );
        let t = normalize(&raw, &options);
        assert_eq!(t.len(), 2);
        assert_eq!(t.records[1].submission_date, SubmissionDate::Unparsed);
        let s = aggregate(&t, &Filter::ALL, 150).unwrap();
        assert_eq!(s.daily, Some(vec![(ymd(2026, 3, 2), 1)]));
        assert_eq!(s.responses_filtered, 1);
        assert_eq!(s.fallback_dates, 0);
    }

    #[test]
    fn bad_time_leaves_the_hour_absent() {
        let t = clean(
            &["Fecha", "Hora"],
            &[&["01/03/2026", "9h15"], &["01/03/2026", ""]],
        );
        assert_eq!(t.records[0].submission_hour, None);
        assert_eq!(t.records[1].submission_hour, None);
        let s = aggregate(&t, &Filter::ALL, 150).unwrap();
        let hourly = s.hourly.unwrap();
        assert_eq!(hourly.len(), 24);
        assert!(hourly.iter().all(|(_, c)| *c == 0));
    }

    #[test]
    fn combined_timestamp_shape() {
        let t = clean(
            &["Fecha de envío", ROLE],
            &[
                &["01/03/2026 09:15:00", "Writer"],
                &["not a date", "Writer"],
                &["2026-03-02 18:05", "Writer"],
            ],
        );
        assert_eq!(t.schema.temporal, TemporalShape::CombinedTimestamp);
        assert_eq!(t.records[0].submission_date.date(), Some(ymd(2026, 3, 1)));
        assert_eq!(t.records[0].submission_hour, Some(9));
        // No fallback to the processing day for this shape.
        assert_eq!(t.records[1].submission_date, SubmissionDate::Unparsed);
        assert_eq!(t.records[1].submission_hour, None);
        assert_eq!(t.records[2].submission_hour, Some(18));

        let s = aggregate(&t, &Filter::ALL, 150).unwrap();
        assert_eq!(
            s.daily,
            Some(vec![(ymd(2026, 3, 1), 1), (ymd(2026, 3, 2), 1)])
        );
    }

    #[test]
    fn separate_columns_win_over_the_timestamp() {
        let t = clean(
            &["Fecha de envío", "Fecha", "Hora"],
            &[&["05/03/2026 08:00:00", "01/03/2026", "09:15:00"]],
        );
        assert_eq!(t.schema.temporal, TemporalShape::SeparateDateTime);
        assert_eq!(t.records[0].submission_date.date(), Some(ymd(2026, 3, 1)));
    }

    #[test]
    fn date_without_time_column_is_not_a_shape() {
        let t = clean(&[ROLE, "Fecha"], &[&["Writer", "01/03/2026"]]);
        assert_eq!(t.schema.temporal, TemporalShape::NoTemporalData);
        assert_eq!(t.date_bounds(), None);
        let s = aggregate(&t, &Filter::ALL, 150).unwrap();
        assert_eq!(s.daily, None);
        assert_eq!(s.hourly, None);
        // No temporal dimension: the date filter lets everything through.
        let f = Filter {
            roles: RoleFilter::All,
            start: Some(ymd(2030, 1, 1)),
            end: Some(ymd(2030, 1, 2)),
        };
        assert_eq!(t.filter_records(&f).len(), 1);
    }

    #[test]
    fn location_precedence() {
        let t = clean(
            &[REGION, COUNTRY],
            &[&["Córdoba", ""], &["", "Chile"], &["", ""], &["Valparaíso", "Perú"]],
        );
        let locations: Vec<&str> = t.records.iter().map(|r| r.location.as_str()).collect();
        assert_eq!(locations, vec!["Córdoba", "Chile", "unknown", "Valparaíso"]);
        assert!(t.schema.has_location);
    }

    #[test]
    fn location_without_country_column() {
        let t = clean(&[REGION], &[&["Córdoba"], &[""]]);
        assert_eq!(t.records[1].location, "unknown");
        assert!(t.schema.has_location);
    }

    #[test]
    fn sentinel_totality_and_row_count() {
        let t = clean(
            &[ROLE, GENDER, REGION, "Fecha", "Hora"],
            &[
                &["", "", "", "", ""],
                &["Letterer", "Mujer", "Lima", "03/03/2026", "12:00:00"],
                &["NA"],
            ],
        );
        assert_eq!(t.len(), 3);
        for r in t.records.iter() {
            assert!(!r.role.is_empty());
            assert!(!r.gender.is_empty());
            assert!(!r.location.is_empty());
            assert!(r.submission_date.date().is_some());
            assert!(r.submission_hour.map_or(true, |h| h < 24));
        }
        assert_eq!(t.records[2].gender, "prefers not to say");
    }

    #[test]
    fn absent_dimensions_degrade() {
        let t = clean(&["Comentario"], &[&["hola"], &["chau"]]);
        assert_eq!(
            t.schema,
            Schema {
                temporal: TemporalShape::NoTemporalData,
                has_role: false,
                has_gender: false,
                has_location: false,
            }
        );
        assert!(t.distinct_roles().is_empty());
        let s = aggregate(&t, &Filter::ALL, 150).unwrap();
        assert_eq!(s.responses_filtered, 2);
        assert_eq!(s.gender, None);
        assert_eq!(s.roles, None);
        assert_eq!(s.locations, None);
        // A role selection cannot exclude anything without a role column.
        let f = Filter {
            roles: RoleFilter::Only(vec!["Writer".to_string()]),
            start: None,
            end: None,
        };
        assert_eq!(t.filter_records(&f).len(), 2);
    }

    #[test]
    fn filter_by_role_and_inclusive_dates() {
        let t = CleanTable {
            records: vec![
                record("Writer", Some(ymd(2026, 3, 1)), Some(9), "Lima"),
                record("Colorist", Some(ymd(2026, 3, 2)), Some(10), "Lima"),
                record("Writer", Some(ymd(2026, 3, 3)), Some(11), "Quito"),
                record("Writer", None, None, "Quito"),
            ],
            schema: full_schema(),
        };
        let f = Filter {
            roles: RoleFilter::Only(vec!["Writer".to_string()]),
            start: Some(ymd(2026, 3, 1)),
            end: Some(ymd(2026, 3, 3)),
        };
        let selected = t.filter_records(&f);
        assert_eq!(selected.len(), 2);
        assert_eq!(selected[1].location, "Quito");

        let f = Filter {
            roles: RoleFilter::All,
            start: Some(ymd(2026, 3, 2)),
            end: None,
        };
        // The end defaults to the latest date of the table.
        assert_eq!(t.filter_records(&f).len(), 2);

        // An unknown role selects nothing.
        let f = Filter {
            roles: RoleFilter::Only(vec!["Inker".to_string()]),
            start: None,
            end: None,
        };
        assert!(t.filter_records(&f).is_empty());
    }

    #[test]
    fn all_roles_is_the_set_of_observed_roles() {
        let t = CleanTable {
            records: vec![
                record("Writer", Some(ymd(2026, 3, 1)), None, "Lima"),
                record("Colorist", Some(ymd(2026, 3, 1)), None, "Lima"),
                record("Writer", Some(ymd(2026, 3, 1)), None, "Lima"),
            ],
            schema: full_schema(),
        };
        let resolved = t.resolve_filter(&Filter::ALL);
        let expected: HashSet<String> = ["Writer", "Colorist"].iter().map(|s| s.to_string()).collect();
        assert_eq!(resolved.roles, Some(expected));
        assert_eq!(resolved.dates, Some((ymd(2026, 3, 1), ymd(2026, 3, 1))));
        assert_eq!(t.distinct_roles(), vec!["Colorist", "Writer"]);
    }

    #[test]
    fn hourly_histogram_is_zero_filled() {
        let a = record("Writer", Some(ymd(2026, 3, 1)), Some(0), "Lima");
        let b = record("Writer", Some(ymd(2026, 3, 1)), Some(23), "Lima");
        let c = record("Writer", Some(ymd(2026, 3, 1)), Some(23), "Lima");
        let hist = hourly_histogram(&[&a, &b, &c]);
        assert_eq!(hist.len(), 24);
        assert_eq!(hist[0], (0, 1));
        assert_eq!(hist[12], (12, 0));
        assert_eq!(hist[23], (23, 2));
        let empty = hourly_histogram(&[]);
        assert_eq!(empty, (0..24).map(|h| (h, 0)).collect::<Vec<(u32, u64)>>());
    }

    #[test]
    fn empty_selection_still_has_24_hours() {
        let t = CleanTable {
            records: vec![record("Writer", Some(ymd(2026, 3, 1)), Some(5), "Lima")],
            schema: full_schema(),
        };
        let f = Filter {
            roles: RoleFilter::Only(vec![]),
            start: None,
            end: None,
        };
        let s = aggregate(&t, &f, 150).unwrap();
        assert_eq!(s.responses_filtered, 0);
        assert_eq!(s.hourly.as_ref().map(|h| h.len()), Some(24));
        assert!(s.hourly.unwrap().iter().all(|(_, c)| *c == 0));
        assert_eq!(s.daily, Some(vec![]));
        assert_eq!(s.progress.responses_total, 1);
    }

    #[test]
    fn top_n_keeps_discovery_order_on_ties() {
        let records: Vec<CleanRecord> = ["B", "A", "C", "A", "D", "B", "E", "F", "G", "H", "I"]
            .iter()
            .map(|r| record(r, Some(ymd(2026, 3, 1)), None, "Lima"))
            .collect();
        let refs: Vec<&CleanRecord> = records.iter().collect();
        let counts = count_by(&refs, |r| r.role.as_str());
        let top = top_n(counts, TOP_ROLES);
        assert_eq!(top.len(), 7);
        assert_eq!(top[0], ("B".to_string(), 2));
        assert_eq!(top[1], ("A".to_string(), 2));
        let names: Vec<&str> = top[2..].iter().map(|(n, _)| n.as_str()).collect();
        assert_eq!(names, vec!["C", "D", "E", "F", "G"]);
    }

    #[test]
    fn top_locations_are_bounded() {
        let records: Vec<CleanRecord> = (0..40)
            .map(|i| record("Writer", Some(ymd(2026, 3, 1)), None, &format!("Place {}", i % 20)))
            .collect();
        let t = CleanTable {
            records,
            schema: full_schema(),
        };
        let s = aggregate(&t, &Filter::ALL, 150).unwrap();
        let locations = s.locations.unwrap();
        assert_eq!(locations.len(), TOP_LOCATIONS);
        assert!(locations.windows(2).all(|w| w[0].1 >= w[1].1));
        let roles = s.roles.unwrap();
        assert!(roles.len() <= TOP_ROLES);
    }

    #[test]
    fn progress_is_not_clamped() {
        let p = goal_progress(180, 150);
        assert_eq!(p.remaining, 0);
        assert!((p.pct - 120.0).abs() < 1e-9);
        let p = goal_progress(0, 150);
        assert_eq!(p.remaining, 150);
        assert_eq!(p.pct, 0.0);
    }

    #[test]
    fn zero_goal_is_rejected() {
        let t = clean(&[ROLE], &[&["Writer"]]);
        assert_eq!(aggregate(&t, &Filter::ALL, 0), Err(StatsError::InvalidGoal));
    }

    #[test]
    fn aggregation_is_repeatable() {
        let t = clean(
            &[ROLE, GENDER, REGION, "Fecha", "Hora"],
            &[
                &["Writer", "Mujer", "Lima", "01/03/2026", "09:00:00"],
                &["Colorist", "", "", "02/03/2026", "10:00:00"],
                &["Writer", "Hombre", "Quito", "02/03/2026", "x"],
            ],
        );
        let f = Filter {
            roles: RoleFilter::Only(vec!["Writer".to_string()]),
            start: Some(ymd(2026, 3, 1)),
            end: Some(ymd(2026, 3, 2)),
        };
        assert_eq!(t.filter_records(&f), t.filter_records(&f));
        assert_eq!(aggregate(&t, &f, 150), aggregate(&t, &f, 150));
    }

    #[test]
    fn gender_breakdown_counts_every_category() {
        let t = clean(
            &[GENDER],
            &[&["Mujer"], &["Mujer"], &[""], &["No binarie"]],
        );
        let s = aggregate(&t, &Filter::ALL, 150).unwrap();
        assert_eq!(
            s.gender,
            Some(vec![
                ("Mujer".to_string(), 2),
                ("prefers not to say".to_string(), 1),
                ("No binarie".to_string(), 1),
            ])
        );
    }
}
