use std::path::PathBuf;

use clap::{Args, Parser, Subcommand, ValueEnum};

#[derive(Debug, Parser)]
#[command(
    author,
    version,
    about = "Read tabular sources into typed rows driven by a field mapping",
    long_about = None
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Sample a source and write a step config with one field per column
    Discover(DiscoverArgs),
    /// Check a step config against its source and list every finding
    Check(CheckArgs),
    /// List the columns a source exposes
    Columns(ColumnsArgs),
    /// Stream the source through a step config and write the typed rows
    Read(ReadArgs),
}

/// Options describing how the source file is parsed.
#[derive(Debug, Args)]
pub struct SourceArgs {
    /// Delimiter character (supports ',', 'tab', ';', '|'); defaults from the extension
    #[arg(long, value_parser = parse_delimiter)]
    pub delimiter: Option<u8>,
    /// Character encoding of the source file (defaults to utf-8)
    #[arg(long = "input-encoding")]
    pub input_encoding: Option<String>,
}

#[derive(Debug, Args)]
pub struct DiscoverArgs {
    /// Source file locator; may use `${VAR}` and a `file:` prefix
    #[arg(short = 'i', long = "input")]
    pub input: String,
    /// Destination step config (.yml)
    #[arg(short = 'o', long = "output")]
    pub output: PathBuf,
    /// Maximum number of rows to sample when inferring numeric types
    #[arg(long, default_value_t = crate::sampler::DEFAULT_SAMPLING_CAP)]
    pub sample_rows: usize,
    /// Infer BigDecimal rather than Number for fractional values
    #[arg(long = "prefer-big-decimal")]
    pub prefer_big_decimal: bool,
    #[command(flatten)]
    pub source: SourceArgs,
}

#[derive(Debug, Args)]
pub struct CheckArgs {
    /// Step config to check
    #[arg(short, long)]
    pub config: PathBuf,
    #[command(flatten)]
    pub source: SourceArgs,
}

#[derive(Debug, Args)]
pub struct ColumnsArgs {
    /// Source file locator
    #[arg(short = 'i', long = "input")]
    pub input: String,
    #[command(flatten)]
    pub source: SourceArgs,
}

#[derive(Debug, Args)]
pub struct ReadArgs {
    /// Step config describing the source and its fields
    #[arg(short, long)]
    pub config: PathBuf,
    /// Output file (stdout if omitted)
    #[arg(short = 'o', long = "output")]
    pub output: Option<PathBuf>,
    /// Output format
    #[arg(long, default_value = "csv")]
    pub format: OutputFormat,
    /// Delimiter for CSV output (defaults from the output extension)
    #[arg(long = "output-delimiter", value_parser = parse_delimiter)]
    pub output_delimiter: Option<u8>,
    /// Limit number of rows emitted
    #[arg(long)]
    pub limit: Option<usize>,
    #[command(flatten)]
    pub source: SourceArgs,
}

#[derive(Debug, Clone, Copy, Default, ValueEnum, PartialEq, Eq)]
#[value(rename_all = "kebab-case")]
pub enum OutputFormat {
    #[default]
    Csv,
    Jsonl,
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
