pub use crate::config::*;

/// A builder for assembling a raw survey table, row by row.
///
/// The readers of the different file formats all go through it, so the header
/// and the cells are cleaned the same way whatever the source.
///
/// ```
/// pub use survey_stats::builder::TableBuilder;
/// # use survey_stats::StatsError;
///
/// let mut builder = TableBuilder::new(&[" Fecha ".to_string(), "Hora".to_string()])?;
///
/// builder.add_row_simple(&["01/03/2026", "09:15:00"])?;
/// builder.add_row_simple(&["NA"])?;
///
/// let table = builder.build();
/// assert_eq!(table.column_index("Fecha"), Some(0));
/// assert_eq!(table.rows()[1], vec![None::<String>, None]);
///
/// # Ok::<(), StatsError>(())
/// ```
pub struct TableBuilder {
    pub(crate) _header: Vec<String>,
    pub(crate) _rows: Vec<Vec<Option<String>>>,
}

impl TableBuilder {
    /// Starts a table. The column names are trimmed here, before anything looks
    /// them up.
    pub fn new(header: &[String]) -> Result<TableBuilder, StatsError> {
        if header.is_empty() {
            return Err(StatsError::EmptyHeader);
        }
        Ok(TableBuilder {
            _header: header.iter().map(|h| h.trim().to_string()).collect(),
            _rows: Vec::new(),
        })
    }

    pub fn add_row_simple(&mut self, cells: &[&str]) -> Result<(), StatsError> {
        let cells: Vec<String> = cells.iter().map(|s| s.to_string()).collect();
        self.add_row(&cells)
    }

    /// Adds one row of text cells.
    ///
    /// Short rows are padded with missing cells. A row with more cells than the
    /// header is rejected.
    pub fn add_row(&mut self, cells: &[String]) -> Result<(), StatsError> {
        // The header is line 1.
        let lineno = self._rows.len() + 2;
        self.add_row_at(cells, lineno)
    }

    /// Same as [`TableBuilder::add_row`], for readers that know on which line of
    /// the file the row starts.
    pub fn add_row_at(&mut self, cells: &[String], lineno: usize) -> Result<(), StatsError> {
        let width = self._header.len();
        if cells.len() > width {
            return Err(StatsError::RowTooLong {
                lineno,
                cells: cells.len(),
            });
        }
        let mut row: Vec<Option<String>> = cells.iter().map(|s| read_cell(s)).collect();
        row.resize(width, None);
        self._rows.push(row);
        Ok(())
    }

    pub fn build(self) -> RawTable {
        RawTable {
            header: self._header,
            rows: self._rows,
        }
    }
}

fn read_cell(s: &str) -> Option<String> {
    let trimmed = s.trim();
    if trimmed.is_empty() || MISSING_MARKERS.contains(&trimmed) {
        None
    } else {
        Some(trimmed.to_string())
    }
}
