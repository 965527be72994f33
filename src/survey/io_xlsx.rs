use calamine::DataType;
use chrono::{Duration, NaiveDate};

use survey_stats::builder::TableBuilder;

use crate::survey::*;

/// Reads an export saved as an Excel workbook. The first row of the worksheet is
/// the header.
pub fn read_excel_table(path: &str, worksheet: Option<&str>) -> SurveyResult<RawTable> {
    let wrange = get_range(path, worksheet)?;
    let mut rows = wrange.rows();
    let header_row = rows.next().context(EmptyExcelSnafu {
        path,
        worksheet: worksheet.map(String::from),
    })?;
    let header: Vec<String> = header_row
        .iter()
        .map(|c| read_cell(c).unwrap_or_default())
        .collect();
    debug!("read_excel_table: header: {:?}", header);
    let mut builder = TableBuilder::new(&header).context(InvalidTableSnafu { path })?;

    for row in rows {
        let cells: Vec<String> = row.iter().map(|c| read_cell(c).unwrap_or_default()).collect();
        debug!("read_excel_table: row: {:?}", &cells);
        builder.add_row(&cells).context(InvalidTableSnafu { path })?;
    }
    let table = builder.build();
    info!("read_excel_table: read {} rows from {:?}", table.len(), path);
    Ok(table)
}

// The text of a cell, as it would appear in a CSV export of the same sheet.
fn read_cell(cell: &DataType) -> Option<String> {
    match cell {
        DataType::String(s) => Some(s.clone()),
        DataType::Int(i) => Some(i.to_string()),
        DataType::Float(f) if f.fract() == 0.0 => Some(format!("{}", *f as i64)),
        DataType::Float(f) => Some(f.to_string()),
        DataType::Bool(b) => Some(b.to_string()),
        DataType::DateTime(serial) => excel_serial_to_text(*serial),
        DataType::Empty => None,
        // Error cells (#DIV/0!, ...) carry no answer.
        _ => None,
    }
}

/// Converts an Excel serial date into day-first text. Serials below 1 only hold
/// a time of day.
fn excel_serial_to_text(serial: f64) -> Option<String> {
    let epoch = NaiveDate::from_ymd_opt(1899, 12, 30)?.and_hms_opt(0, 0, 0)?;
    // Rounded to the millisecond, then shown without the fraction: a time never
    // rolls over to the next second, hour or day.
    let millis = (serial * 86_400_000.0).round() as i64;
    let dt = epoch.checked_add_signed(Duration::milliseconds(millis))?;
    if serial < 1.0 {
        Some(dt.format("%H:%M:%S").to_string())
    } else {
        Some(dt.format("%d/%m/%Y %H:%M:%S").to_string())
    }
}

fn get_range(path: &str, worksheet: Option<&str>) -> SurveyResult<calamine::Range<DataType>> {
    debug!("get_range: path: {:?} worksheet: {:?}", path, worksheet);
    let mut workbook: Xlsx<_> = open_workbook(path).context(OpeningExcelSnafu { path })?;

    // A worksheet name was provided, use it.
    if let Some(worksheet_name) = worksheet {
        let wrange = workbook
            .worksheet_range(worksheet_name)
            .context(EmptyExcelSnafu {
                path,
                worksheet: Some(worksheet_name.to_string()),
            })?
            .context(OpeningExcelSnafu { path })?;
        Ok(wrange)
    } else {
        let all_worksheets = workbook.worksheets();
        match all_worksheets.as_slice() {
            [] => EmptyExcelSnafu {
                path,
                worksheet: None::<String>,
            }
            .fail(),
            [(worksheet_name, wrange)] => {
                debug!("get_range: using worksheet {:?}", worksheet_name);
                Ok(wrange.clone())
            }
            _ => AmbiguousWorksheetSnafu { path }.fail(),
        }
    }
}
