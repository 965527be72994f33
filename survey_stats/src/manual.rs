/*!

This is the long-form manual for `survey_stats` and `survey-monitor`.

## Input formats

The following formats are supported:
* `csv` semicolon-delimited text, as exported by most online survey tools
* `xlsx` the same export, saved as an Excel workbook

### `csv`

The first row is the header. Fields are separated by `;`. The file is read as UTF-8
first, and read again as Latin-1 if that fails (invalid UTF-8, ragged rows, ...).
If neither works, the file is reported as unreadable and nothing else is computed.

```text
A7. Rol Principal;A2. Identidad de género;Fecha;Hora;A5. Provincia de residencia;A5a. País Extranjero
Guionista;Mujer;01/03/2026;09:15:00;Córdoba;
Ilustradora;;02/03/2026;21:40:12;;Chile
```

Spaces around the column names are ignored. Empty cells, and cells with the usual
"no value" markers (`NA`, `N/A`, `null`, `#N/A`, ...), are missing values. Rows may be
shorter than the header, but not longer.

### `xlsx`

The only worksheet of the workbook is used. A workbook with several worksheets needs
a worksheet name (`--excel-worksheet-name` or `excelWorksheetName`), otherwise it is
rejected. Cells holding Excel dates are converted to text (`dd/mm/YYYY HH:MM:SS`) and
then read like in a CSV file.

## Columns

All the columns are optional. A missing column removes the corresponding summary
instead of failing the whole run.

| Column (default name)           | Used for                                          |
|---------------------------------|---------------------------------------------------|
| `A7. Rol Principal`             | role filter and role breakdown                    |
| `A2. Identidad de género`       | gender breakdown                                  |
| `Fecha` and `Hora`              | submission date and hour (both needed)            |
| `Fecha de envío`                | submission date and hour, in a single timestamp   |
| `A5. Provincia de residencia`   | location                                          |
| `A5a. País Extranjero`          | location, when the region is missing              |

Dates are read day first: `01/03/2026` is the 1st of March. ISO dates
(`2026-03-01`) are accepted too. The `Hora` column must be `HH:MM:SS`; a time that
cannot be read leaves the hour unknown for that response.

When `Fecha` cannot be read, the response is dated with the processing day by
default. These responses are counted separately in the output (`fallbackDates`) so
that they can be spotted in the daily series. With the `unparsed` policy, they keep
no date at all and drop out of the date filter and of the daily series.

Unanswered roles, genders and locations are replaced by `unspecified`,
`prefers not to say` and `unknown`.

## Summaries

* progress: responses of the whole study against the goal (150 by default). The
  percentage may go over 100.
* daily: responses per day, for the days that have responses.
* hourly: responses per hour of the day, always the 24 hours.
* gender: responses per gender.
* roles: the 7 roles with the most responses.
* locations: the 15 places with the most responses.

All the summaries except the progress only look at the responses selected by the
role and date filters.

## Configuration

`survey-monitor` comes with sensible defaults but the names of the columns change
from one survey to the next. The program accepts a configuration file in JSON:

```json
{
  "outputSettings": { "studyName": "Mujeres en el Cómic 2026", "outputPath": "summary.json" },
  "fileSource": {
    "provider": "csv",
    "filePath": "results-survey1.csv",
    "columns": { "role": "Q7. Main role" }
  },
  "rules": {
    "goal": 150,
    "dateFallback": "today",
    "roles": ["Guionista", "Ilustradora"],
    "startDate": "2026-03-01",
    "endDate": "2026-03-31"
  }
}
```

The `filePath` is relative to the configuration file. The options given on the
command line take precedence over the configuration file.

 */
