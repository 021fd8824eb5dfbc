use std::path::PathBuf;

use clap::{Args, Parser, Subcommand, ValueEnum};

use crate::{filter::FilterCriteria, view::AnalysisView};

#[derive(Debug, Parser)]
#[command(author, version, about = "Explore international trade statistics kept in a spreadsheet", long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Print the rows that match the filters
    Rows(RowsArgs),
    /// Print the rankings and trends of one analysis view
    View(ViewArgs),
    /// List the loaded columns and the fields they are bound to
    Columns(ColumnsArgs),
    /// Start a line-oriented session that keeps data cached between commands
    Interactive(InteractiveArgs),
}

#[derive(Debug, Clone, Default, Args)]
pub struct SourceArgs {
    /// YAML configuration file
    #[arg(short = 'c', long = "config")]
    pub config: Option<PathBuf>,
    /// Spreadsheet id (overrides the configuration)
    #[arg(long = "sheet-id")]
    pub sheet_id: Option<String>,
    /// Worksheet (tab) name
    #[arg(long = "tab")]
    pub tab: Option<String>,
    /// Environment variable holding a Sheets API key
    #[arg(long = "api-key-env", conflicts_with = "token_file")]
    pub api_key_env: Option<String>,
    /// File holding an OAuth bearer token
    #[arg(long = "token-file")]
    pub token_file: Option<PathBuf>,
    /// Read the anonymous CSV export of a link-shared spreadsheet
    #[arg(long = "published")]
    pub published: bool,
    /// Read a local CSV/TSV file instead of a spreadsheet ('-' for stdin)
    #[arg(long = "csv", conflicts_with = "published")]
    pub csv: Option<PathBuf>,
    /// CSV delimiter character for --csv (supports ',', 'tab', ';', '|')
    #[arg(long, value_parser = parse_delimiter_name)]
    pub delimiter: Option<String>,
    /// Character encoding of the --csv file (defaults to utf-8)
    #[arg(long = "input-encoding")]
    pub input_encoding: Option<String>,
}

#[derive(Debug, Clone, Default, Args)]
pub struct FilterArgs {
    /// Keep rows whose country name contains this text
    #[arg(long)]
    pub country: Option<String>,
    /// Keep rows whose customs (HS) code contains this text
    #[arg(long = "code")]
    pub code: Option<String>,
    /// Keep rows whose item description contains this text
    #[arg(long)]
    pub item: Option<String>,
    /// Keep rows whose fiscal year contains this text (e.g. 2564)
    #[arg(long)]
    pub year: Option<String>,
}

impl From<&FilterArgs> for FilterCriteria {
    fn from(args: &FilterArgs) -> Self {
        FilterCriteria {
            country: args.country.clone(),
            customs_code: args.code.clone(),
            item: args.item.clone(),
            year: args.year.clone(),
        }
    }
}

#[derive(Debug, Args)]
pub struct RowsArgs {
    #[command(flatten)]
    pub source: SourceArgs,
    #[command(flatten)]
    pub filters: FilterArgs,
    /// Write matching rows as CSV to this file ('-' for stdout)
    #[arg(short = 'o', long = "output")]
    pub output: Option<PathBuf>,
    /// Emit CSV instead of an aligned table
    #[arg(long = "csv-out")]
    pub csv_out: bool,
    /// Limit number of rows emitted
    #[arg(long)]
    pub limit: Option<usize>,
}

#[derive(Debug, Clone, Copy, ValueEnum, PartialEq, Eq, Default)]
#[value(rename_all = "kebab-case")]
pub enum OutputFormat {
    #[default]
    Table,
    Json,
}

#[derive(Debug, Args)]
pub struct ViewArgs {
    #[command(flatten)]
    pub source: SourceArgs,
    #[command(flatten)]
    pub filters: FilterArgs,
    /// Analysis view to compute
    #[arg(short = 'a', long = "analysis", value_enum, default_value_t = AnalysisView::Overview)]
    pub analysis: AnalysisView,
    /// Number of entries per ranking (defaults to the configured value)
    #[arg(long, value_parser = parse_positive)]
    pub top: Option<usize>,
    /// Output format
    #[arg(long, value_enum, default_value = "table")]
    pub format: OutputFormat,
}

#[derive(Debug, Args)]
pub struct ColumnsArgs {
    #[command(flatten)]
    pub source: SourceArgs,
}

#[derive(Debug, Args)]
pub struct InteractiveArgs {
    #[command(flatten)]
    pub source: SourceArgs,
    /// View shown when the session starts
    #[arg(short = 'a', long = "analysis", value_enum, default_value_t = AnalysisView::Overview)]
    pub analysis: AnalysisView,
    /// Number of entries per ranking (defaults to the configured value)
    #[arg(long, value_parser = parse_positive)]
    pub top: Option<usize>,
}

pub fn parse_delimiter(value: &str) -> Result<u8, String> {
    match value {
        "tab" | "\t" => Ok(b'\t'),
        "comma" | "," => Ok(b','),
        "|" | "pipe" => Ok(b'|'),
        ";" | "semicolon" => Ok(b';'),
        other => {
            let mut chars = other.chars();
            let first = chars
                .next()
                .ok_or_else(|| "Delimiter cannot be empty".to_string())?;
            if chars.next().is_some() {
                return Err("Delimiter must be a single character".to_string());
            }
            if !first.is_ascii() {
                return Err("Delimiter must be ASCII".to_string());
            }
            Ok(first as u8)
        }
    }
}

/// Validates a delimiter name but keeps it as text so it can flow into the
/// configuration unchanged.
fn parse_delimiter_name(value: &str) -> Result<String, String> {
    parse_delimiter(value).map(|_| value.to_string())
}

pub fn parse_positive(value: &str) -> Result<usize, String> {
    match value.trim().parse::<usize>() {
        Ok(0) => Err("value must be at least 1".to_string()),
        Ok(parsed) => Ok(parsed),
        Err(err) => Err(format!("invalid number '{value}': {err}")),
    }
}
