//! The tabular source capability consumed by the engine.
//!
//! A source lists its columns once and then hands out rows through a
//! forward-only cursor. Opening happens on construction and closing on drop,
//! so whoever owns the source owns its lifetime.

use std::{collections::VecDeque, io};

use crate::{
    data::Row,
    error::SourceError,
    schema::SourceColumn,
};

pub trait TabularSource {
    fn columns(&self) -> &[SourceColumn];

    /// Returns the next row, or `None` at end of data.
    fn read_next_row(&mut self) -> Result<Option<Row>, SourceError>;

    /// Row count as reported by the source. Informational only.
    fn row_count(&self) -> u64;

    fn column_count(&self) -> usize {
        self.columns().len()
    }
}

impl<S: TabularSource + ?Sized> TabularSource for &mut S {
    fn columns(&self) -> &[SourceColumn] {
        (**self).columns()
    }

    fn read_next_row(&mut self) -> Result<Option<Row>, SourceError> {
        (**self).read_next_row()
    }

    fn row_count(&self) -> u64 {
        (**self).row_count()
    }

    fn column_count(&self) -> usize {
        (**self).column_count()
    }
}

impl<S: TabularSource + ?Sized> TabularSource for Box<S> {
    fn columns(&self) -> &[SourceColumn] {
        (**self).columns()
    }

    fn read_next_row(&mut self) -> Result<Option<Row>, SourceError> {
        (**self).read_next_row()
    }

    fn row_count(&self) -> u64 {
        (**self).row_count()
    }

    fn column_count(&self) -> usize {
        (**self).column_count()
    }
}

/// Rows held in memory, with an optional injected read failure.
#[derive(Debug, Clone)]
pub struct MemorySource {
    columns: Vec<SourceColumn>,
    rows: VecDeque<Row>,
    total_rows: u64,
    delivered: u64,
    failure: Option<(u64, String)>,
}

impl MemorySource {
    pub fn new(columns: Vec<SourceColumn>, rows: Vec<Row>) -> Self {
        Self {
            columns,
            total_rows: rows.len() as u64,
            rows: rows.into(),
            delivered: 0,
            failure: None,
        }
    }

    /// Makes the read after `rows` delivered rows fail with `message`.
    pub fn failing_after(mut self, rows: u64, message: impl Into<String>) -> Self {
        self.failure = Some((rows, message.into()));
        self
    }

    /// Number of rows handed out so far.
    pub fn delivered(&self) -> u64 {
        self.delivered
    }
}

impl TabularSource for MemorySource {
    fn columns(&self) -> &[SourceColumn] {
        &self.columns
    }

    fn read_next_row(&mut self) -> Result<Option<Row>, SourceError> {
        if self
            .failure
            .as_ref()
            .is_some_and(|(at, _)| *at == self.delivered)
            && let Some((_, message)) = self.failure.take()
        {
            return Err(SourceError::Io(io::Error::other(message)));
        }
        let row = self.rows.pop_front();
        if row.is_some() {
            self.delivered += 1;
        }
        Ok(row)
    }

    fn row_count(&self) -> u64 {
        self.total_rows
    }
}
