//! Column catalog and name-based field resolution.

use log::debug;

use crate::{
    schema::{FieldMapping, SourceColumn},
    source::TabularSource,
};

/// Read-only view of the columns a source exposes, in source order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Catalog {
    columns: Vec<SourceColumn>,
}

impl Catalog {
    pub fn new(columns: Vec<SourceColumn>) -> Self {
        Self { columns }
    }

    pub fn from_source<S: TabularSource + ?Sized>(source: &S) -> Self {
        Self::new(source.columns().to_vec())
    }

    pub fn columns(&self) -> &[SourceColumn] {
        &self.columns
    }

    pub fn len(&self) -> usize {
        self.columns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.columns.is_empty()
    }

    pub fn column(&self, id: usize) -> Option<&SourceColumn> {
        self.columns.iter().find(|column| column.id == id)
    }

    /// Binds `mapping` to the column whose name matches its source name,
    /// ignoring case, and returns how many columns matched.
    ///
    /// With several matches the mapping ends up bound to the *last* one in
    /// catalog order; callers still have to treat a count above one as an
    /// error. With no match the mapping is left unresolved.
    pub fn resolve(&self, mapping: &mut FieldMapping) -> usize {
        mapping.resolved_id = None;
        let mut matches = 0;
        for column in &self.columns {
            if names_match(&column.name, &mapping.source_name) {
                mapping.resolved_id = Some(column.id);
                matches += 1;
            }
        }
        debug!(
            "Resolved '{}' against {} column(s): {} match(es), bound to {:?}",
            mapping.source_name,
            self.columns.len(),
            matches,
            mapping.resolved_id
        );
        matches
    }

    pub fn resolve_all(&self, mappings: &mut [FieldMapping]) -> Vec<usize> {
        mappings
            .iter_mut()
            .map(|mapping| self.resolve(mapping))
            .collect()
    }

    /// One mapping per column, bound by id. Character columns are typed as
    /// strings right away; numeric ones are left for sampling.
    pub fn discover_fields(&self) -> Vec<FieldMapping> {
        self.columns.iter().map(FieldMapping::from_column).collect()
    }
}

fn names_match(left: &str, right: &str) -> bool {
    left.chars()
        .flat_map(char::to_lowercase)
        .eq(right.chars().flat_map(char::to_lowercase))
}
