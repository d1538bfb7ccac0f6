//! Streaming projection of source rows onto the declared output fields.
//!
//! A [`RowProjector`] owns its source for the whole session. Nothing is
//! validated until the first row is requested (or [`RowProjector::prepare()`]
//! is called); from then on rows are pulled, converted, and handed out one at a
//! time until the source runs dry or fails. Dropping the projector releases the
//! source whichever way the session ended.

use log::{debug, error, info};

use crate::{
    catalog::Catalog,
    convert::convert_cell,
    data::{OutputRow, OutputValue, Row},
    error::{ConversionMismatch, EngineError, Result},
    schema::{FieldMapping, OutputField, output_fields},
    source::TabularSource,
    validate::{FailFast, check_mappings},
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProjectorState {
    Uninitialized,
    Validated,
    Streaming,
    Done,
}

/// A projected row together with the output field each value belongs to.
///
/// Rows shorter than a resolved position have no slot for that field, so
/// `values` can be narrower than the field list.
#[derive(Debug, Clone, PartialEq)]
pub struct ProjectedRow {
    /// Index into [`RowProjector::output_fields()`] for each value.
    pub slots: Vec<usize>,
    pub values: OutputRow,
}

impl ProjectedRow {
    /// Pairs of output field index and value.
    pub fn cells(&self) -> impl Iterator<Item = (usize, Option<&OutputValue>)> {
        self.slots
            .iter()
            .copied()
            .zip(self.values.iter().map(Option::as_ref))
    }

    /// One entry per output field; skipped slots and nulls are both `None`.
    pub fn spread(&self, width: usize) -> Vec<Option<&OutputValue>> {
        let mut cells = vec![None; width];
        for (slot, value) in self.cells() {
            if let Some(cell) = cells.get_mut(slot) {
                *cell = value;
            }
        }
        cells
    }
}

pub struct RowProjector<S: TabularSource> {
    source: S,
    mappings: Vec<FieldMapping>,
    state: ProjectorState,
    rows_read: u64,
    ended_abnormally: bool,
}

impl<S: TabularSource> RowProjector<S> {
    pub fn new(source: S, mappings: Vec<FieldMapping>) -> Self {
        Self {
            source,
            mappings,
            state: ProjectorState::Uninitialized,
            rows_read: 0,
            ended_abnormally: false,
        }
    }

    pub fn state(&self) -> ProjectorState {
        self.state
    }

    pub fn mappings(&self) -> &[FieldMapping] {
        &self.mappings
    }

    pub fn source(&self) -> &S {
        &self.source
    }

    /// Rows pulled from the source so far.
    pub fn rows_read(&self) -> u64 {
        self.rows_read
    }

    /// True when the session stopped on an error rather than end of data.
    pub fn ended_abnormally(&self) -> bool {
        self.ended_abnormally
    }

    /// Emitted columns. Meaningful once the projector has been prepared.
    pub fn output_fields(&self, origin: &str) -> Vec<OutputField> {
        output_fields(&self.mappings, origin)
    }

    /// Resolves and validates the mappings if that has not happened yet.
    ///
    /// # Errors
    ///
    /// Returns the first configuration error; the projector is then done.
    pub fn prepare(&mut self) -> Result<()> {
        if self.state != ProjectorState::Uninitialized {
            return Ok(());
        }
        let catalog = Catalog::from_source(&self.source);
        let row_count = self.source.row_count();
        match check_mappings(&mut self.mappings, &catalog, row_count, &mut FailFast) {
            Ok(()) => {
                info!(
                    "Validated {} field(s) against {} column(s), {} row(s) reported",
                    self.mappings.len(),
                    catalog.len(),
                    row_count
                );
                self.state = ProjectorState::Validated;
                Ok(())
            }
            Err(err) => {
                error!("Field validation failed: {err}");
                self.abort();
                Err(err)
            }
        }
    }

    /// Pulls, converts, and returns the next row; `Ok(None)` once done.
    ///
    /// # Errors
    ///
    /// Configuration errors on the first call, conversion mismatches, and
    /// source read failures. Each of them ends the session.
    pub fn next_row(&mut self) -> Result<Option<OutputRow>> {
        Ok(self.next_projected()?.map(|row| row.values))
    }

    /// Like [`RowProjector::next_row()`], keeping the field index of every value.
    ///
    /// # Errors
    ///
    /// Same as [`RowProjector::next_row()`].
    pub fn next_projected(&mut self) -> Result<Option<ProjectedRow>> {
        match self.state {
            ProjectorState::Uninitialized => self.prepare()?,
            ProjectorState::Done => return Ok(None),
            ProjectorState::Validated | ProjectorState::Streaming => {}
        }

        let row = match self.source.read_next_row() {
            Ok(Some(row)) => row,
            Ok(None) => {
                info!("Source exhausted after {} row(s)", self.rows_read);
                self.state = ProjectorState::Done;
                return Ok(None);
            }
            Err(source) => {
                self.abort();
                return Err(EngineError::SourceRead {
                    row: self.rows_read + 1,
                    source,
                });
            }
        };
        self.state = ProjectorState::Streaming;
        self.rows_read += 1;

        match self.project(&row) {
            Ok(output) => Ok(Some(output)),
            Err(mismatch) => {
                self.abort();
                Err(mismatch.into())
            }
        }
    }

    /// Iterates rows with their field indexes until the session ends.
    pub fn projected(&mut self) -> impl Iterator<Item = Result<ProjectedRow>> + '_ {
        std::iter::from_fn(move || self.next_projected().transpose())
    }

    fn project(&self, row: &Row) -> std::result::Result<ProjectedRow, ConversionMismatch> {
        let mut output = ProjectedRow {
            slots: Vec::with_capacity(self.mappings.len()),
            values: OutputRow::with_capacity(self.mappings.len()),
        };
        let emitted = self.mappings.iter().filter(|mapping| mapping.is_emitted());
        for (slot, mapping) in emitted.enumerate() {
            let Some(position) = mapping.position() else {
                continue;
            };
            let Some(cell) = row.get(position) else {
                debug!(
                    "Row {} has no column {} for '{}'",
                    self.rows_read,
                    position + 1,
                    mapping.name
                );
                continue;
            };
            let value = convert_cell(cell.as_ref(), mapping.output_kind).map_err(|unsupported| {
                ConversionMismatch {
                    source_name: mapping.source_name.clone(),
                    field: mapping.name.clone(),
                    position: position + 1,
                    row: self.rows_read,
                    observed: unsupported.observed,
                    target: unsupported.target,
                }
            })?;
            output.slots.push(slot);
            output.values.push(value);
        }
        Ok(output)
    }

    fn abort(&mut self) {
        self.state = ProjectorState::Done;
        self.ended_abnormally = true;
    }
}

impl<S: TabularSource> Iterator for RowProjector<S> {
    type Item = Result<OutputRow>;

    fn next(&mut self) -> Option<Self::Item> {
        self.next_row().transpose()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        data::RawValue,
        schema::{OutputKind, SourceColumn, SourceKind},
        source::MemorySource,
    };

    fn source(rows: Vec<Row>) -> MemorySource {
        MemorySource::new(
            vec![
                SourceColumn::numeric(1, "ID"),
                SourceColumn::character(2, "NAME", 16),
            ],
            rows,
        )
    }

    fn mappings() -> Vec<FieldMapping> {
        vec![
            FieldMapping::new("id", SourceKind::Numeric).with_output(OutputKind::Integer),
            FieldMapping::new("missing", SourceKind::Character)
                .with_output(OutputKind::String)
                .optional(),
            FieldMapping::new("name", SourceKind::Character)
                .renamed("full_name")
                .with_output(OutputKind::String),
        ]
    }

    #[test]
    fn streams_rows_through_the_state_machine() {
        let rows = vec![
            vec![Some(RawValue::Long(1)), Some(RawValue::String("Ann".into()))],
            vec![None, Some(RawValue::String("Bo".into()))],
        ];
        let mut projector = RowProjector::new(source(rows), mappings());
        assert_eq!(projector.state(), ProjectorState::Uninitialized);

        projector.prepare().unwrap();
        assert_eq!(projector.state(), ProjectorState::Validated);
        let names: Vec<String> = projector
            .output_fields("test")
            .into_iter()
            .map(|field| field.name)
            .collect();
        assert_eq!(names, ["id", "full_name"]);

        assert_eq!(
            projector.next_row().unwrap(),
            Some(vec![
                Some(OutputValue::Integer(1)),
                Some(OutputValue::String("Ann".into()))
            ])
        );
        assert_eq!(projector.state(), ProjectorState::Streaming);
        assert_eq!(
            projector.next_row().unwrap(),
            Some(vec![None, Some(OutputValue::String("Bo".into()))])
        );
        assert_eq!(projector.next_row().unwrap(), None);
        assert_eq!(projector.state(), ProjectorState::Done);
        assert!(!projector.ended_abnormally());
        assert_eq!(projector.next_row().unwrap(), None);
    }

    #[test]
    fn short_rows_skip_the_missing_slot() {
        let rows = vec![vec![Some(RawValue::Int(5))]];
        let mut projector = RowProjector::new(source(rows), mappings());
        assert_eq!(
            projector.next_row().unwrap(),
            Some(vec![Some(OutputValue::Integer(5))])
        );
    }

    #[test]
    fn skipped_slots_keep_later_values_on_their_fields() {
        let mappings = vec![
            FieldMapping::new("NAME", SourceKind::Character).with_output(OutputKind::String),
            FieldMapping::new("ID", SourceKind::Numeric).with_output(OutputKind::Integer),
        ];
        let rows = vec![
            vec![Some(RawValue::Long(1)), Some(RawValue::String("Ann".into()))],
            vec![Some(RawValue::Long(2))],
        ];
        let mut projector = RowProjector::new(source(rows), mappings);

        let full = projector.next_projected().unwrap().unwrap();
        assert_eq!(full.slots, [0, 1]);
        let short = projector.next_projected().unwrap().unwrap();
        assert_eq!(short.slots, [1]);
        assert_eq!(short.values, [Some(OutputValue::Integer(2))]);
        assert_eq!(short.spread(2), [None, Some(&OutputValue::Integer(2))]);
        assert_eq!(projector.next_projected().unwrap(), None);
    }

    #[test]
    fn absent_optional_fields_do_not_shift_slots() {
        let rows = vec![vec![Some(RawValue::Long(3)), None]];
        let mut projector = RowProjector::new(source(rows), mappings());
        let row = projector.projected().next().unwrap().unwrap();
        assert_eq!(row.slots, [0, 1]);
        assert_eq!(row.spread(2), [Some(&OutputValue::Integer(3)), None]);
    }

    #[test]
    fn configuration_errors_end_the_session() {
        let mappings = vec![FieldMapping::new("nope", SourceKind::Numeric)
            .with_output(OutputKind::Number)];
        let mut projector = RowProjector::new(source(vec![]), mappings);
        let err = projector.next_row().unwrap_err();
        assert!(matches!(err, EngineError::FieldNotFound { .. }));
        assert_eq!(projector.state(), ProjectorState::Done);
        assert!(projector.ended_abnormally());
        assert_eq!(projector.next_row().unwrap(), None);
    }

    #[test]
    fn read_failures_are_terminal_and_flagged() {
        let rows = vec![
            vec![Some(RawValue::Long(1)), None],
            vec![Some(RawValue::Long(2)), None],
        ];
        let failing = source(rows).failing_after(1, "checksum mismatch");
        let results: Vec<Result<OutputRow>> = RowProjector::new(failing, mappings()).collect();

        assert_eq!(results.len(), 2);
        assert!(results[0].is_ok());
        assert!(matches!(
            results[1],
            Err(EngineError::SourceRead { row: 2, .. })
        ));
    }

    #[test]
    fn unsupported_values_abort_with_their_location() {
        let rows = vec![vec![Some(RawValue::Bytes(vec![0xde, 0xad])), None]];
        let mut projector = RowProjector::new(source(rows), mappings());
        let err = projector.next_row().unwrap_err();
        let EngineError::ConversionMismatch(mismatch) = err else {
            panic!("expected a conversion mismatch, got {err:?}");
        };
        assert_eq!(mismatch.source_name, "id");
        assert_eq!(mismatch.position, 1);
        assert_eq!(mismatch.row, 1);
        assert_eq!(mismatch.target, OutputKind::Integer);
        assert!(projector.ended_abnormally());
    }
}
