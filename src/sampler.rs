//! Output type inference by sampling leading source rows.
//!
//! Sampling consumes rows from the source it is given. A source used for
//! inference has to be reopened before it can be streamed.

use log::{debug, info, warn};

use crate::{
    catalog::Catalog,
    data::RawValue,
    schema::{FieldMapping, OutputKind},
    source::TabularSource,
};

/// Rows scanned before giving up on fields that are still undetermined.
pub const DEFAULT_SAMPLING_CAP: usize = 7000;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SamplingOptions {
    /// Infer `BigDecimal` instead of `Number` for floating-point cells.
    pub prefer_big_decimal: bool,
    /// Maximum number of rows to read.
    pub cap: usize,
}

impl Default for SamplingOptions {
    fn default() -> Self {
        Self {
            prefer_big_decimal: false,
            cap: DEFAULT_SAMPLING_CAP,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SamplingReport {
    rows_sampled: usize,
    undetermined: Vec<String>,
    interrupted: bool,
}

impl SamplingReport {
    pub fn rows_sampled(&self) -> usize {
        self.rows_sampled
    }

    /// Names of fields whose output type is still unset, present in the
    /// source or not.
    pub fn undetermined(&self) -> &[String] {
        &self.undetermined
    }

    /// True when a source read error cut sampling short.
    pub fn interrupted(&self) -> bool {
        self.interrupted
    }
}

/// Output kind suggested by a single non-missing cell, if any.
pub fn infer_output_kind(value: &RawValue, prefer_big_decimal: bool) -> Option<OutputKind> {
    match value {
        RawValue::Int(_) | RawValue::Long(_) => Some(OutputKind::Integer),
        RawValue::Date(_) => Some(OutputKind::Date),
        RawValue::Double(_) if prefer_big_decimal => Some(OutputKind::BigDecimal),
        RawValue::Double(_) => Some(OutputKind::Number),
        RawValue::String(_) | RawValue::Bytes(_) => None,
    }
}

fn is_pending(mapping: &FieldMapping) -> bool {
    mapping.output_kind == OutputKind::Unset && mapping.is_resolved()
}

/// Fills in the output kind of every unset, resolved mapping from the first
/// informative cell in its column.
///
/// Reading stops once no resolved mapping is left unset, after `options.cap`
/// rows, at end of data, or on the first read error.
pub fn infer_types<S: TabularSource + ?Sized>(
    mappings: &mut [FieldMapping],
    source: &mut S,
    options: SamplingOptions,
) -> SamplingReport {
    let mut report = SamplingReport::default();

    while report.rows_sampled < options.cap && mappings.iter().any(is_pending) {
        let row = match source.read_next_row() {
            Ok(Some(row)) => row,
            Ok(None) => break,
            Err(err) => {
                warn!(
                    "Type sampling stopped after {} row(s): {err}",
                    report.rows_sampled
                );
                report.interrupted = true;
                break;
            }
        };
        report.rows_sampled += 1;

        for mapping in mappings.iter_mut().filter(|mapping| is_pending(mapping)) {
            let Some(Some(value)) = mapping.position().and_then(|idx| row.get(idx)) else {
                continue;
            };
            if let Some(kind) = infer_output_kind(value, options.prefer_big_decimal) {
                debug!(
                    "Inferred {kind} for '{}' from sampled row {}",
                    mapping.name, report.rows_sampled
                );
                mapping.output_kind = kind;
            }
        }
    }

    report.undetermined = mappings
        .iter()
        .filter(|mapping| mapping.output_kind == OutputKind::Unset)
        .map(|mapping| mapping.name.clone())
        .collect();
    report
}

/// Builds one mapping per source column and infers the numeric ones.
pub fn discover<S: TabularSource + ?Sized>(
    source: &mut S,
    options: SamplingOptions,
) -> (Vec<FieldMapping>, SamplingReport) {
    let catalog = Catalog::from_source(&*source);
    let mut fields = catalog.discover_fields();
    let report = infer_types(&mut fields, source, options);
    info!(
        "Discovered {} field(s) from {} column(s) after sampling {} row(s)",
        fields.len(),
        catalog.len(),
        report.rows_sampled()
    );
    (fields, report)
}
