// Primitives for reading CSV files.

use std::error::Error;
use std::fs;

use survey_stats::builder::TableBuilder;

use crate::survey::{
    io_common::{decode_latin1, decode_utf8},
    *,
};

/// Reads a semicolon-delimited export.
///
/// The file is parsed as UTF-8 first. If anything goes wrong, it is parsed again
/// as Latin-1. If both fail, the file is unreadable.
pub fn read_csv_table(path: &str) -> SurveyResult<RawTable> {
    let bytes = fs::read(path).context(OpeningInputSnafu { path })?;
    debug!("read_csv_table: {:?}: {} bytes", path, bytes.len());

    let utf8_err = match decode_utf8(&bytes)
        .map_err(|e| Box::new(e) as Box<dyn Error>)
        .and_then(parse_csv)
    {
        Ok(table) => {
            info!("read_csv_table: read {} rows from {:?}", table.len(), path);
            return Ok(table);
        }
        Err(e) => e,
    };
    warn!(
        "read_csv_table: could not read {:?} as UTF-8 ({}), trying Latin-1",
        path, utf8_err
    );

    match parse_csv(&decode_latin1(&bytes)) {
        Ok(table) => {
            info!(
                "read_csv_table: read {} rows from {:?} (Latin-1)",
                table.len(),
                path
            );
            Ok(table)
        }
        Err(latin1_err) => UnreadableSnafu {
            path,
            utf8: utf8_err.to_string(),
            latin1: latin1_err.to_string(),
        }
        .fail(),
    }
}

/// Parses decoded text. The first row is the header.
pub fn parse_csv(text: &str) -> Result<RawTable, Box<dyn Error>> {
    let mut rdr = csv::ReaderBuilder::new()
        .delimiter(b';')
        .has_headers(true)
        // Short rows are padded by the table builder, long rows rejected there.
        .flexible(true)
        .from_reader(text.as_bytes());

    let header: Vec<String> = rdr.headers()?.iter().map(|s| s.to_string()).collect();
    debug!("parse_csv: header: {:?}", header);
    let mut builder = TableBuilder::new(&header)?;

    for (idx, line_r) in rdr.records().enumerate() {
        let line = line_r?;
        // Blank lines are skipped by the reader: use its own line count.
        let lineno = line.position().map_or(idx + 2, |p| p.line() as usize);
        let cells: Vec<String> = line.iter().map(|s| s.to_string()).collect();
        debug!("parse_csv: lineno: {:?} row: {:?}", lineno, &cells);
        builder.add_row_at(&cells, lineno)?;
    }
    Ok(builder.build())
}
