//! Wiring between a [`StepConfig`] and a file-backed source.

use encoding_rs::{Encoding, UTF_8};
use log::{info, warn};

use crate::{
    catalog::Catalog,
    config::StepConfig,
    csv_source::CsvSource,
    error::{EngineError, Result},
    projector::RowProjector,
    sampler::{self, SamplingReport},
    source::TabularSource,
    validate::{Collect, Diagnostic, check_mappings},
};

/// How the configured file is parsed.
#[derive(Debug, Clone, Copy)]
pub struct SourceOptions {
    pub delimiter: Option<u8>,
    pub encoding: &'static Encoding,
}

impl Default for SourceOptions {
    fn default() -> Self {
        Self {
            delimiter: None,
            encoding: UTF_8,
        }
    }
}

/// Opens the file the config points at.
///
/// # Errors
///
/// [`EngineError::NoSourceLocator`] when no file is configured and
/// [`EngineError::SourceUnreadable`] when it cannot be opened.
pub fn open_source(config: &StepConfig, options: SourceOptions) -> Result<CsvSource> {
    let path = config.source_path().ok_or(EngineError::NoSourceLocator)?;
    CsvSource::open(&path, options.delimiter, options.encoding).map_err(|err| {
        EngineError::SourceUnreadable {
            path,
            reason: err.to_string(),
        }
    })
}

/// Opens the source and hands it to a projector over the configured fields.
/// Field validation happens on the projector's first row.
pub fn open_projector(
    config: &StepConfig,
    options: SourceOptions,
) -> Result<RowProjector<CsvSource>> {
    let source = open_source(config, options)?;
    Ok(RowProjector::new(source, config.fields.clone()))
}

/// Design-time check of a step: every finding, in report order.
///
/// # Errors
///
/// Only fails if the collecting reporter does, which it never does.
pub fn check_step(config: &StepConfig, options: SourceOptions) -> Result<Vec<Diagnostic>> {
    let mut collect = Collect::default();
    let source = match open_source(config, options) {
        Ok(source) => Some(source),
        Err(EngineError::NoSourceLocator) => {
            collect.push(Diagnostic::NoSourceLocator);
            None
        }
        Err(EngineError::SourceUnreadable { path, reason }) => {
            collect.push(Diagnostic::SourceUnreadable { path, reason });
            None
        }
        Err(other) => return Err(other),
    };

    match source {
        Some(source) => {
            let catalog = Catalog::from_source(&source);
            let mut fields = config.fields.clone();
            check_mappings(&mut fields, &catalog, source.row_count(), &mut collect)?;
        }
        None if config.fields.is_empty() => collect.push(Diagnostic::NoFields),
        None => {}
    }
    Ok(collect.into_diagnostics())
}

/// Builds a step config for `locator` with one field per source column and
/// sampled output types.
///
/// # Errors
///
/// Fails when the source cannot be opened.
pub fn discover_step(
    locator: &str,
    template: &StepConfig,
    options: SourceOptions,
) -> Result<(StepConfig, SamplingReport)> {
    let mut config = StepConfig {
        filename: Some(locator.to_string()),
        fields: Vec::new(),
        ..template.clone()
    };
    let mut source = open_source(&config, options)?;
    let (fields, report) = sampler::discover(&mut source, config.sampling_options());
    if !report.undetermined().is_empty() {
        warn!(
            "No output type could be inferred for {} field(s): {}",
            report.undetermined().len(),
            report.undetermined().join(", ")
        );
    }
    info!("Discovered {} field(s) in {locator}", fields.len());
    config.fields = fields;
    Ok((config, report))
}
