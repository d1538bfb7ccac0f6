//! The `check` command: design-time validation of a step config.

use anyhow::{Context, Result, bail};
use log::info;

use crate::{
    cli::CheckArgs,
    config::StepConfig,
    io_utils,
    step::{self, SourceOptions},
    table::Table,
    validate::{Diagnostic, Severity},
};

pub fn execute(args: &CheckArgs) -> Result<()> {
    let config = StepConfig::load(&args.config)
        .with_context(|| format!("Loading step config from {:?}", args.config))?;
    let options = SourceOptions {
        delimiter: args.source.delimiter,
        encoding: io_utils::resolve_encoding(args.source.input_encoding.as_deref())?,
    };
    let diagnostics = step::check_step(&config, options)?;
    render(&diagnostics).print();

    let errors = diagnostics
        .iter()
        .filter(|diagnostic| diagnostic.severity() == Severity::Error)
        .count();
    if errors > 0 {
        bail!("Step config {:?} has {errors} error(s)", args.config);
    }
    info!(
        "Step config {:?} passed with {} finding(s)",
        args.config,
        diagnostics.len()
    );
    Ok(())
}

fn render(diagnostics: &[Diagnostic]) -> Table {
    let mut table = Table::new(["severity", "field", "message"]);
    for diagnostic in diagnostics {
        table.push_row(vec![
            diagnostic.severity().to_string(),
            diagnostic.field().unwrap_or_default().to_string(),
            diagnostic.to_string(),
        ]);
    }
    table
}
