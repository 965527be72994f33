use clap::Parser;

/// This is a monitoring program for the responses of a survey.
#[derive(Parser, Debug, Clone)]
#[clap(author, version, about, long_about = None)]
pub struct Args {
    /// (file path, optional) A JSON file describing the study: input file, column names, goal and filters.
    /// See the manual for the format of this file.
    #[clap(short, long, value_parser)]
    pub config: Option<String>,
    /// (file path) A reference file containing the summary of the survey in JSON format. If provided, survey-monitor will
    /// check that the computed summary matches the reference.
    #[clap(short, long, value_parser)]
    pub reference: Option<String>,

    /// (file path, 'stdout' or empty) If specified, the summary of the survey will be written in JSON format to the given
    /// location. Setting this option overrides the path that may be specified with the --config option.
    #[clap(short, long, value_parser)]
    pub out: Option<String>,

    /// (file path) The export of the survey responses. Setting this option overrides the path that may be
    /// specified with the --config option.
    #[clap(short, long, value_parser)]
    pub input: Option<String>,

    /// (default csv) The type of the input: csv (semicolon-delimited) or xlsx.
    #[clap(long, value_parser)]
    pub input_type: Option<String>,

    /// (repeated, or 'all') The roles to keep. By default, all the roles are kept.
    #[clap(long = "role", value_parser)]
    pub roles: Option<Vec<String>>,

    /// (date, YYYY-MM-DD or DD/MM/YYYY) The first submission day to keep. Defaults to the earliest submission.
    #[clap(long, value_parser)]
    pub start_date: Option<String>,

    /// (date, YYYY-MM-DD or DD/MM/YYYY) The last submission day to keep. Defaults to the latest submission.
    #[clap(long, value_parser)]
    pub end_date: Option<String>,

    /// (default 150) The number of responses the study aims for.
    #[clap(long, value_parser)]
    pub goal: Option<u64>,

    /// (today or unparsed, default today) What to do with submission dates that cannot be read.
    #[clap(long, value_parser)]
    pub date_fallback: Option<String>,

    /// When using an Excel file, indicates the name of the worksheet to use.
    #[clap(long, value_parser)]
    pub excel_worksheet_name: Option<String>,

    // Other arguments
    /// If passed as an argument, will turn on verbose logging to the standard output.
    #[clap(long, takes_value = false)]
    pub verbose: bool,
}
