//! Source column and field mapping model.
//!
//! A [`SourceColumn`] describes one column exactly as the tabular source reports
//! it. A [`FieldMapping`] is the user-declared side: which source column to read
//! (by name), what to call it downstream, and which [`OutputKind`] to convert
//! its cells into. An ordered list of mappings defines the shape of every
//! output row.

use std::{fmt, str::FromStr};

use anyhow::{Result, anyhow};
use serde::{Deserialize, Serialize};

/// Coarse type tag a source reports for a column.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SourceKind {
    Character,
    Numeric,
}

impl fmt::Display for SourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SourceKind::Character => f.write_str("Character"),
            SourceKind::Numeric => f.write_str("Numeric"),
        }
    }
}

/// Declared or inferred target type of a field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum OutputKind {
    String,
    Integer,
    Number,
    #[serde(alias = "BigNumber")]
    BigDecimal,
    Date,
    #[default]
    #[serde(alias = "NotDefined")]
    Unset,
}

impl OutputKind {
    pub const ALL: [OutputKind; 6] = [
        OutputKind::String,
        OutputKind::Integer,
        OutputKind::Number,
        OutputKind::BigDecimal,
        OutputKind::Date,
        OutputKind::Unset,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            OutputKind::String => "String",
            OutputKind::Integer => "Integer",
            OutputKind::Number => "Number",
            OutputKind::BigDecimal => "BigDecimal",
            OutputKind::Date => "Date",
            OutputKind::Unset => "Unset",
        }
    }

    pub fn is_set(&self) -> bool {
        *self != OutputKind::Unset
    }
}

impl fmt::Display for OutputKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for OutputKind {
    type Err = anyhow::Error;

    fn from_str(value: &str) -> Result<Self> {
        let normalized = value.trim().to_ascii_lowercase();
        match normalized.as_str() {
            "string" => Ok(OutputKind::String),
            "integer" | "int" => Ok(OutputKind::Integer),
            "number" | "float" => Ok(OutputKind::Number),
            "bigdecimal" | "bignumber" | "decimal" => Ok(OutputKind::BigDecimal),
            "date" => Ok(OutputKind::Date),
            "unset" | "notdefined" | "" => Ok(OutputKind::Unset),
            _ => Err(anyhow!("Unknown output type '{value}'")),
        }
    }
}

/// A column as listed by the source. `id` is its 1-based position.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceColumn {
    pub id: usize,
    pub name: String,
    pub kind: SourceKind,
    pub length: usize,
    pub label: String,
}

impl SourceColumn {
    pub fn character(id: usize, name: impl Into<String>, length: usize) -> Self {
        let name = name.into();
        Self {
            id,
            label: name.clone(),
            name,
            kind: SourceKind::Character,
            length,
        }
    }

    pub fn numeric(id: usize, name: impl Into<String>) -> Self {
        let name = name.into();
        Self {
            id,
            label: name.clone(),
            name,
            kind: SourceKind::Numeric,
            length: 8,
        }
    }

    pub fn with_label(mut self, label: impl Into<String>) -> Self {
        self.label = label.into();
        self
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldMapping {
    /// Column name looked up in the source (case-insensitive).
    #[serde(alias = "sasname")]
    pub source_name: String,
    /// Name of the emitted field.
    pub name: String,
    pub source_kind: SourceKind,
    #[serde(default, alias = "kettletype")]
    pub output_kind: OutputKind,
    #[serde(default)]
    pub length: usize,
    #[serde(default)]
    pub label: String,
    #[serde(default)]
    pub optional: bool,
    /// Id of the bound source column; `None` until resolved or when absent.
    #[serde(
        default,
        rename = "original_id",
        skip_serializing_if = "Option::is_none"
    )]
    pub resolved_id: Option<usize>,
}

impl FieldMapping {
    pub fn new(source_name: impl Into<String>, source_kind: SourceKind) -> Self {
        let source_name = source_name.into();
        Self {
            name: source_name.clone(),
            source_name,
            source_kind,
            output_kind: OutputKind::Unset,
            length: 0,
            label: String::new(),
            optional: false,
            resolved_id: None,
        }
    }

    pub fn from_column(column: &SourceColumn) -> Self {
        let output_kind = match column.kind {
            SourceKind::Character => OutputKind::String,
            SourceKind::Numeric => OutputKind::Unset,
        };
        Self {
            source_name: column.name.clone(),
            name: column.name.clone(),
            source_kind: column.kind,
            output_kind,
            length: column.length,
            label: column.label.clone(),
            optional: false,
            resolved_id: Some(column.id),
        }
    }

    pub fn renamed(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    pub fn with_output(mut self, kind: OutputKind) -> Self {
        self.output_kind = kind;
        self
    }

    pub fn optional(mut self) -> Self {
        self.optional = true;
        self
    }

    pub fn is_resolved(&self) -> bool {
        self.resolved_id.is_some()
    }

    /// Zero-based index of the bound column within a source row.
    pub fn position(&self) -> Option<usize> {
        self.resolved_id.and_then(|id| id.checked_sub(1))
    }

    /// Optional mappings that found no column produce no output slot.
    pub fn is_emitted(&self) -> bool {
        !(self.optional && self.resolved_id.is_none())
    }
}

/// Description of one emitted column.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct OutputField {
    pub name: String,
    pub kind: OutputKind,
    pub length: usize,
    pub label: String,
    pub origin: String,
}

pub fn output_fields(mappings: &[FieldMapping], origin: &str) -> Vec<OutputField> {
    mappings
        .iter()
        .filter(|mapping| mapping.is_emitted())
        .map(|mapping| OutputField {
            name: mapping.name.clone(),
            kind: mapping.output_kind,
            length: mapping.length,
            label: mapping.label.clone(),
            origin: origin.to_string(),
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn output_kind_parses_legacy_names() {
        assert_eq!(
            OutputKind::from_str("BigNumber").unwrap(),
            OutputKind::BigDecimal
        );
        assert_eq!(OutputKind::from_str("NotDefined").unwrap(), OutputKind::Unset);
        assert_eq!(OutputKind::from_str(" integer ").unwrap(), OutputKind::Integer);
        assert!(OutputKind::from_str("complex").is_err());
    }

    #[test]
    fn from_column_preassigns_string_for_character_columns() {
        let name = FieldMapping::from_column(&SourceColumn::character(2, "NAME", 20));
        assert_eq!(name.output_kind, OutputKind::String);
        assert_eq!(name.resolved_id, Some(2));
        assert_eq!(name.position(), Some(1));

        let id = FieldMapping::from_column(&SourceColumn::numeric(1, "ID").with_label("Key"));
        assert_eq!(id.output_kind, OutputKind::Unset);
        assert_eq!(id.label, "Key");
        assert_eq!(id.length, 8);
    }

    #[test]
    fn output_fields_skip_unresolved_optional_mappings() {
        let mut present = FieldMapping::new("ID", SourceKind::Numeric)
            .renamed("id")
            .with_output(OutputKind::Integer);
        present.resolved_id = Some(1);
        let missing = FieldMapping::new("GONE", SourceKind::Character)
            .with_output(OutputKind::String)
            .optional();

        let fields = output_fields(&[present, missing], "sas-input");
        assert_eq!(fields.len(), 1);
        assert_eq!(fields[0].name, "id");
        assert_eq!(fields[0].kind, OutputKind::Integer);
        assert_eq!(fields[0].origin, "sas-input");
    }
}
