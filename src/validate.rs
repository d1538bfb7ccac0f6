//! Pre-flight checks of a field mapping list against a source catalog.
//!
//! [`check_mappings()`] is the only check routine. What happens to a finding
//! is up to the [`Reporter`]: [`FailFast`] turns the first error into an
//! [`EngineError`] right before streaming, [`Collect`] keeps every finding as a
//! [`Diagnostic`] for a design-time configuration check.

use std::{fmt, path::PathBuf};

use log::{debug, warn};
use serde::Serialize;

use crate::{
    catalog::Catalog,
    error::{EngineError, Result},
    schema::{FieldMapping, OutputKind},
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub enum Severity {
    Comment,
    Warning,
    Error,
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Severity::Comment => f.write_str("comment"),
            Severity::Warning => f.write_str("warning"),
            Severity::Error => f.write_str("error"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub enum Diagnostic {
    NoSourceLocator,
    SourceUnreadable { path: PathBuf, reason: String },
    EmptySource,
    FieldNotFound { name: String },
    DuplicateColumn { name: String, count: usize },
    UndeterminedType { name: String },
    NoFields,
    SourceInfo { columns: usize, rows: u64 },
}

impl Diagnostic {
    pub fn severity(&self) -> Severity {
        match self {
            Diagnostic::SourceUnreadable { .. }
            | Diagnostic::FieldNotFound { .. }
            | Diagnostic::DuplicateColumn { .. }
            | Diagnostic::UndeterminedType { .. } => Severity::Error,
            Diagnostic::NoSourceLocator | Diagnostic::EmptySource | Diagnostic::NoFields => {
                Severity::Warning
            }
            Diagnostic::SourceInfo { .. } => Severity::Comment,
        }
    }

    /// Name of the field the finding is about, if any.
    pub fn field(&self) -> Option<&str> {
        match self {
            Diagnostic::FieldNotFound { name }
            | Diagnostic::DuplicateColumn { name, .. }
            | Diagnostic::UndeterminedType { name } => Some(name),
            _ => None,
        }
    }

    /// The fatal form of an error finding; `None` for warnings and comments.
    pub fn into_error(self) -> Option<EngineError> {
        match self {
            Diagnostic::SourceUnreadable { path, reason } => {
                Some(EngineError::SourceUnreadable { path, reason })
            }
            Diagnostic::FieldNotFound { name } => Some(EngineError::FieldNotFound { name }),
            Diagnostic::DuplicateColumn { name, count } => {
                Some(EngineError::DuplicateColumn { name, count })
            }
            Diagnostic::UndeterminedType { name } => Some(EngineError::UndeterminedType { name }),
            Diagnostic::NoSourceLocator
            | Diagnostic::EmptySource
            | Diagnostic::NoFields
            | Diagnostic::SourceInfo { .. } => None,
        }
    }
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Diagnostic::NoSourceLocator => f.write_str("No source file name is defined"),
            Diagnostic::SourceUnreadable { path, reason } => {
                write!(f, "Source {path:?} cannot be read: {reason}")
            }
            Diagnostic::EmptySource => f.write_str("The source contains no rows"),
            Diagnostic::FieldNotFound { name } => {
                write!(f, "Column '{name}' was not found in the source")
            }
            Diagnostic::DuplicateColumn { name, count } => {
                write!(f, "Column '{name}' occurs {count} times in the source")
            }
            Diagnostic::UndeterminedType { name } => {
                write!(f, "Output type of field '{name}' is not defined")
            }
            Diagnostic::NoFields => f.write_str("No fields are defined"),
            Diagnostic::SourceInfo { columns, rows } => {
                write!(f, "Source has {columns} column(s) and {rows} row(s)")
            }
        }
    }
}

pub trait Reporter {
    /// Handles one finding.
    ///
    /// # Errors
    ///
    /// Returns an error when the finding must abort the caller.
    fn report(&mut self, diagnostic: Diagnostic) -> Result<()>;
}

/// Run-time reporting: errors abort, warnings are logged.
#[derive(Debug, Default, Clone, Copy)]
pub struct FailFast;

impl Reporter for FailFast {
    fn report(&mut self, diagnostic: Diagnostic) -> Result<()> {
        match diagnostic.severity() {
            Severity::Comment => {
                debug!("{diagnostic}");
                Ok(())
            }
            Severity::Warning => {
                warn!("{diagnostic}");
                Ok(())
            }
            Severity::Error => match diagnostic.into_error() {
                Some(err) => Err(err),
                None => Ok(()),
            },
        }
    }
}

/// Design-time reporting: every finding is kept.
#[derive(Debug, Default, Clone)]
pub struct Collect {
    diagnostics: Vec<Diagnostic>,
}

impl Collect {
    pub fn push(&mut self, diagnostic: Diagnostic) {
        self.diagnostics.push(diagnostic);
    }

    pub fn diagnostics(&self) -> &[Diagnostic] {
        &self.diagnostics
    }

    pub fn into_diagnostics(self) -> Vec<Diagnostic> {
        self.diagnostics
    }

    pub fn has_errors(&self) -> bool {
        self.diagnostics
            .iter()
            .any(|diagnostic| diagnostic.severity() == Severity::Error)
    }
}

impl Reporter for Collect {
    fn report(&mut self, diagnostic: Diagnostic) -> Result<()> {
        self.push(diagnostic);
        Ok(())
    }
}

/// Resolves every mapping against `catalog` and reports what is wrong with
/// the configuration.
///
/// # Errors
///
/// Propagates whatever the reporter returns for a finding.
pub fn check_mappings<R: Reporter + ?Sized>(
    mappings: &mut [FieldMapping],
    catalog: &Catalog,
    row_count: u64,
    reporter: &mut R,
) -> Result<()> {
    if row_count == 0 {
        reporter.report(Diagnostic::EmptySource)?;
    }

    for mapping in mappings.iter_mut() {
        match catalog.resolve(mapping) {
            0 if mapping.optional => {
                debug!("Optional field '{}' is absent from the source", mapping.source_name);
            }
            0 => reporter.report(Diagnostic::FieldNotFound {
                name: mapping.source_name.clone(),
            })?,
            1 => {}
            count => reporter.report(Diagnostic::DuplicateColumn {
                name: mapping.source_name.clone(),
                count,
            })?,
        }
        if mapping.output_kind == OutputKind::Unset {
            reporter.report(Diagnostic::UndeterminedType {
                name: mapping.name.clone(),
            })?;
        }
    }

    reporter.report(Diagnostic::SourceInfo {
        columns: catalog.len(),
        rows: row_count,
    })?;

    if mappings.is_empty() {
        reporter.report(Diagnostic::NoFields)?;
    }
    Ok(())
}
