//! Delimited text files exposed as a [`TabularSource`].
//!
//! Opening a file makes one full pass to count rows and to type every column:
//! a column whose non-empty cells are all numbers or dates is reported as
//! [`SourceKind::Numeric`], anything else as [`SourceKind::Character`]. A
//! second reader then streams the rows.

use std::{
    fs::File,
    io::BufReader,
    path::{Path, PathBuf},
};

use encoding_rs::Encoding;
use log::{debug, info};

use crate::{
    data::{RawValue, Row, parse_temporal},
    error::SourceError,
    io_utils::{self, printable_delimiter},
    schema::{SourceColumn, SourceKind},
    source::TabularSource,
};

/// Width reported for numeric columns.
pub const NUMERIC_COLUMN_LENGTH: usize = 8;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum CellClass {
    Empty,
    Integer,
    Float,
    Temporal,
    Text,
}

fn classify(text: &str) -> CellClass {
    let trimmed = text.trim();
    if trimmed.is_empty() {
        CellClass::Empty
    } else if trimmed.parse::<i64>().is_ok() {
        CellClass::Integer
    } else if trimmed.bytes().any(|b| b.is_ascii_digit())
        && trimmed.parse::<f64>().is_ok_and(f64::is_finite)
    {
        CellClass::Float
    } else if parse_temporal(trimmed).is_some() {
        CellClass::Temporal
    } else {
        CellClass::Text
    }
}

#[derive(Debug, Clone, Copy, Default)]
struct ColumnProfile {
    numeric_cells: usize,
    text_cells: usize,
    max_length: usize,
}

impl ColumnProfile {
    fn observe(&mut self, text: &str) {
        match classify(text) {
            CellClass::Empty => {}
            CellClass::Integer | CellClass::Float | CellClass::Temporal => {
                self.numeric_cells += 1
            }
            CellClass::Text => self.text_cells += 1,
        }
        self.max_length = self.max_length.max(text.trim_end().len());
    }

    fn column(&self, id: usize, name: &str) -> SourceColumn {
        if self.numeric_cells > 0 && self.text_cells == 0 {
            SourceColumn::numeric(id, name)
        } else {
            SourceColumn::character(id, name, self.max_length)
        }
    }
}

pub struct CsvSource {
    path: PathBuf,
    columns: Vec<SourceColumn>,
    row_count: u64,
    reader: csv::Reader<BufReader<File>>,
    encoding: &'static Encoding,
    record: csv::ByteRecord,
    records_read: u64,
}

impl CsvSource {
    /// Opens `path`, profiling its columns before returning.
    ///
    /// # Errors
    ///
    /// Fails when the file cannot be opened, is not valid delimited text, or
    /// does not decode with `encoding`.
    pub fn open(
        path: &Path,
        delimiter: Option<u8>,
        encoding: &'static Encoding,
    ) -> Result<Self, SourceError> {
        let delimiter = io_utils::resolve_input_delimiter(path, delimiter);
        let (columns, row_count) = profile(path, delimiter, encoding)?;
        info!(
            "Opened {path:?} with delimiter '{}': {} column(s), {} row(s)",
            printable_delimiter(delimiter),
            columns.len(),
            row_count
        );
        let reader = io_utils::open_csv_reader_from_path(path, delimiter)?;
        Ok(Self {
            path: path.to_path_buf(),
            columns,
            row_count,
            reader,
            encoding,
            record: csv::ByteRecord::new(),
            records_read: 0,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn raw_value(
        &self,
        column: &SourceColumn,
        bytes: &[u8],
    ) -> Result<Option<RawValue>, SourceError> {
        let text = io_utils::decode_bytes(bytes, self.encoding)?;
        let value = match (column.kind, classify(&text)) {
            (_, CellClass::Empty) => None,
            (SourceKind::Character, _) => Some(RawValue::String(text.trim_end().to_string())),
            (SourceKind::Numeric, CellClass::Integer) => {
                text.trim().parse().ok().map(RawValue::Long)
            }
            (SourceKind::Numeric, CellClass::Float) => {
                text.trim().parse().ok().map(RawValue::Double)
            }
            (SourceKind::Numeric, CellClass::Temporal) => {
                parse_temporal(text.trim()).map(RawValue::Date)
            }
            (SourceKind::Numeric, CellClass::Text) => {
                debug!(
                    "Record {} of {:?} has text in numeric column '{}'",
                    self.records_read, self.path, column.name
                );
                Some(RawValue::Bytes(bytes.to_vec()))
            }
        };
        Ok(value)
    }

    fn decode_next(&mut self, record: &mut csv::ByteRecord) -> Result<Option<Row>, SourceError> {
        if !self.reader.read_byte_record(record)? {
            return Ok(None);
        }
        self.records_read += 1;
        check_width(record, self.columns.len(), self.records_read)?;
        self.columns
            .iter()
            .zip(record.iter())
            .map(|(column, bytes)| self.raw_value(column, bytes))
            .collect::<Result<Row, _>>()
            .map(Some)
    }
}

fn check_width(record: &csv::ByteRecord, columns: usize, number: u64) -> Result<(), SourceError> {
    if record.len() > columns {
        return Err(SourceError::Malformed {
            record: number,
            message: format!("{} cells for {columns} column(s)", record.len()),
        });
    }
    Ok(())
}

fn profile(
    path: &Path,
    delimiter: u8,
    encoding: &'static Encoding,
) -> Result<(Vec<SourceColumn>, u64), SourceError> {
    let mut reader = io_utils::open_csv_reader_from_path(path, delimiter)?;
    let headers = io_utils::reader_headers(&mut reader, encoding)?;
    let mut profiles = vec![ColumnProfile::default(); headers.len()];

    let mut record = csv::ByteRecord::new();
    let mut rows = 0u64;
    while reader.read_byte_record(&mut record)? {
        rows += 1;
        check_width(&record, headers.len(), rows)?;
        for (profile, bytes) in profiles.iter_mut().zip(record.iter()) {
            profile.observe(&io_utils::decode_bytes(bytes, encoding)?);
        }
    }

    let columns = headers
        .iter()
        .zip(&profiles)
        .enumerate()
        .map(|(idx, (name, profile))| profile.column(idx + 1, name.trim()))
        .collect();
    Ok((columns, rows))
}

impl TabularSource for CsvSource {
    fn columns(&self) -> &[SourceColumn] {
        &self.columns
    }

    fn read_next_row(&mut self) -> Result<Option<Row>, SourceError> {
        let mut record = std::mem::take(&mut self.record);
        let row = self.decode_next(&mut record);
        self.record = record;
        row
    }

    fn row_count(&self) -> u64 {
        self.row_count
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use encoding_rs::{UTF_8, WINDOWS_1252};
    use std::fs;
    use tempfile::tempdir;

    fn write(dir: &Path, name: &str, contents: &[u8]) -> PathBuf {
        let path = dir.join(name);
        fs::write(&path, contents).unwrap();
        path
    }

    #[test]
    fn cells_are_classified_by_content() {
        assert_eq!(classify("  "), CellClass::Empty);
        assert_eq!(classify("-12"), CellClass::Integer);
        assert_eq!(classify("1.5e3"), CellClass::Float);
        assert_eq!(classify("NaN"), CellClass::Text);
        assert_eq!(classify("2024-01-31"), CellClass::Temporal);
        assert_eq!(classify("0x1F"), CellClass::Text);
    }

    #[test]
    fn out_of_range_numbers_are_text() {
        assert_eq!(classify("1e400"), CellClass::Text);
        assert_eq!(classify("-1e400"), CellClass::Text);
        assert_eq!(classify("1e300"), CellClass::Float);

        let dir = tempdir().unwrap();
        let path = write(dir.path(), "huge.csv", b"N
1
1e400
");
        let mut source = CsvSource::open(&path, None, UTF_8).unwrap();
        assert_eq!(source.columns()[0].kind, SourceKind::Character);
        source.read_next_row().unwrap();
        assert_eq!(
            source.read_next_row().unwrap(),
            Some(vec![Some(RawValue::String("1e400".into()))])
        );
    }

    #[test]
    fn columns_are_typed_from_the_whole_file() {
        let dir = tempdir().unwrap();
        let path = write(
            dir.path(),
            "people.csv",
            b"ID,NAME,SCORE,VISIT,CODE\n1,Ann,1.5,2024-01-02,7\n2,Robert,,2024-02-03,X7\n",
        );
        let source = CsvSource::open(&path, None, UTF_8).unwrap();
        let kinds: Vec<SourceKind> = source.columns().iter().map(|c| c.kind).collect();
        assert_eq!(
            kinds,
            [
                SourceKind::Numeric,
                SourceKind::Character,
                SourceKind::Numeric,
                SourceKind::Numeric,
                SourceKind::Character,
            ]
        );
        assert_eq!(source.columns()[0].length, NUMERIC_COLUMN_LENGTH);
        assert_eq!(source.columns()[1].length, 6);
        assert_eq!(source.columns()[4].id, 5);
        assert_eq!(source.row_count(), 2);
    }

    #[test]
    fn rows_stream_as_raw_values() {
        let dir = tempdir().unwrap();
        let path = write(
            dir.path(),
            "rows.tsv",
            b"ID\tNAME\tSCORE\tVISIT\n1\tAnn  \t1.5\t2024-01-02\n2\t\t\t\n",
        );
        let mut source = CsvSource::open(&path, None, UTF_8).unwrap();
        let visit = NaiveDate::from_ymd_opt(2024, 1, 2)
            .unwrap()
            .and_hms_opt(0, 0, 0)
            .unwrap();

        assert_eq!(
            source.read_next_row().unwrap(),
            Some(vec![
                Some(RawValue::Long(1)),
                Some(RawValue::String("Ann".into())),
                Some(RawValue::Double(1.5)),
                Some(RawValue::Date(visit)),
            ])
        );
        assert_eq!(
            source.read_next_row().unwrap(),
            Some(vec![Some(RawValue::Long(2)), None, None, None])
        );
        assert_eq!(source.read_next_row().unwrap(), None);
    }

    #[test]
    fn short_records_yield_short_rows() {
        let dir = tempdir().unwrap();
        let path = write(dir.path(), "short.csv", b"A,B,C\n1,2,3\n4\n");
        let mut source = CsvSource::open(&path, None, UTF_8).unwrap();
        source.read_next_row().unwrap();
        assert_eq!(
            source.read_next_row().unwrap(),
            Some(vec![Some(RawValue::Long(4))])
        );
    }

    #[test]
    fn wide_records_are_malformed() {
        let dir = tempdir().unwrap();
        let path = write(dir.path(), "wide.csv", b"A,B\n1,2\n3,4,5\n");
        assert!(matches!(
            CsvSource::open(&path, None, UTF_8),
            Err(SourceError::Malformed { record: 2, .. })
        ));
    }

    #[test]
    fn input_encoding_is_honoured() {
        let dir = tempdir().unwrap();
        let (encoded, _, _) = WINDOWS_1252.encode("id,name\n1,Caf\u{e9}\n");
        let path = write(dir.path(), "latin.csv", &encoded);

        let mut source = CsvSource::open(&path, None, WINDOWS_1252).unwrap();
        let row = source.read_next_row().unwrap().unwrap();
        assert_eq!(row[1], Some(RawValue::String("Caf\u{e9}".into())));

        assert!(matches!(
            CsvSource::open(&path, None, UTF_8),
            Err(SourceError::Decode { .. })
        ));
    }

    #[test]
    fn missing_files_fail_to_open() {
        let dir = tempdir().unwrap();
        let err = CsvSource::open(&dir.path().join("nope.csv"), None, UTF_8).err();
        assert!(matches!(err, Some(SourceError::Io(_))));
    }
}
