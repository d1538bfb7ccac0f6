pub mod catalog;
pub mod check;
pub mod cli;
pub mod columns;
pub mod config;
pub mod convert;
pub mod csv_source;
pub mod data;
pub mod error;
pub mod io_utils;
pub mod projector;
pub mod read;
pub mod sampler;
pub mod schema;
pub mod source;
pub mod step;
pub mod table;
pub mod validate;

use std::{env, sync::OnceLock};

use anyhow::{Context, Result};
use clap::Parser;
use log::{LevelFilter, info};

use crate::{
    cli::{Cli, Commands},
    config::StepConfig,
    step::SourceOptions,
};

static LOGGER: OnceLock<()> = OnceLock::new();

fn init_logging() {
    LOGGER.get_or_init(|| {
        let mut builder = env_logger::Builder::from_env(env_logger::Env::default());
        if env::var("RUST_LOG").is_err() {
            builder.filter_module("sas_reader_step", LevelFilter::Info);
        }
        let _ = builder.format_timestamp_millis().try_init();
    });
}

pub fn run() -> Result<()> {
    init_logging();
    let cli = Cli::parse();
    match cli.command {
        Commands::Discover(args) => handle_discover(&args),
        Commands::Check(args) => check::execute(&args),
        Commands::Columns(args) => columns::execute(&args),
        Commands::Read(args) => read::execute(&args),
    }
}

fn handle_discover(args: &cli::DiscoverArgs) -> Result<()> {
    info!("Discovering fields in '{}'", args.input);
    let template = StepConfig {
        prefer_big_decimal: args.prefer_big_decimal,
        sampling_cap: args.sample_rows,
        ..StepConfig::default()
    };
    let options = SourceOptions {
        delimiter: args.source.delimiter,
        encoding: io_utils::resolve_encoding(args.source.input_encoding.as_deref())?,
    };
    let (config, report) = step::discover_step(&args.input, &template, options)
        .with_context(|| format!("Discovering fields in {:?}", args.input))?;
    config
        .save(&args.output)
        .with_context(|| format!("Writing step config to {:?}", args.output))?;
    info!(
        "Step config with {} field(s) written to {:?} after sampling {} row(s)",
        config.fields.len(),
        args.output,
        report.rows_sampled()
    );
    Ok(())
}
