//! The `read` command: stream a source through a step config.

use std::io::Write;

use anyhow::{Context, Result};
use log::info;
use serde::ser::{Serialize, SerializeMap, Serializer};

use crate::{
    cli::{OutputFormat, ReadArgs},
    config::StepConfig,
    data::OutputValue,
    io_utils,
    projector::ProjectedRow,
    schema::OutputField,
    step::{self, SourceOptions},
};

pub fn execute(args: &ReadArgs) -> Result<()> {
    let config = StepConfig::load(&args.config)
        .with_context(|| format!("Loading step config from {:?}", args.config))?;
    let options = SourceOptions {
        delimiter: args.source.delimiter,
        encoding: io_utils::resolve_encoding(args.source.input_encoding.as_deref())?,
    };
    let mut projector = step::open_projector(&config, options)?;
    projector.prepare()?;

    let origin = config.filename.as_deref().unwrap_or_default();
    let fields = projector.output_fields(origin);
    let limit = args.limit.unwrap_or(usize::MAX);
    let rows = projector.projected().take(limit);

    let emitted = match args.format {
        OutputFormat::Csv => {
            let delimiter =
                io_utils::resolve_output_delimiter(args.output.as_deref(), args.output_delimiter);
            let writer = io_utils::open_csv_writer(args.output.as_deref(), delimiter)?;
            write_csv(rows, &fields, writer)?
        }
        OutputFormat::Jsonl => {
            write_jsonl(rows, &fields, io_utils::open_output(args.output.as_deref())?)?
        }
    };
    info!(
        "Wrote {emitted} row(s) from {} source row(s) read",
        projector.rows_read()
    );
    Ok(())
}

fn write_csv<I, E, W>(
    rows: I,
    fields: &[OutputField],
    mut writer: csv::Writer<W>,
) -> Result<usize>
where
    I: Iterator<Item = std::result::Result<ProjectedRow, E>>,
    E: std::error::Error + Send + Sync + 'static,
    W: Write,
{
    writer
        .write_record(fields.iter().map(|field| field.name.as_str()))
        .context("Writing CSV header")?;
    let mut emitted = 0;
    for row in rows {
        let row = row?;
        let cells = row
            .spread(fields.len())
            .into_iter()
            .map(|cell| cell.map(OutputValue::as_display).unwrap_or_default());
        writer.write_record(cells).context("Writing CSV row")?;
        emitted += 1;
    }
    writer.flush().context("Flushing CSV output")?;
    Ok(emitted)
}

/// A projected row as a JSON object keyed by field name, in field order.
/// Fields the row has no slot for are written as null.
struct JsonRow<'a> {
    fields: &'a [OutputField],
    cells: Vec<Option<&'a OutputValue>>,
}

impl Serialize for JsonRow<'_> {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.fields.len()))?;
        for (field, cell) in self.fields.iter().zip(&self.cells) {
            map.serialize_entry(&field.name, cell)?;
        }
        map.end()
    }
}

fn write_jsonl<I, E, W>(rows: I, fields: &[OutputField], mut writer: W) -> Result<usize>
where
    I: Iterator<Item = std::result::Result<ProjectedRow, E>>,
    E: std::error::Error + Send + Sync + 'static,
    W: Write,
{
    let mut emitted = 0;
    for row in rows {
        let row = row?;
        let object = JsonRow {
            fields,
            cells: row.spread(fields.len()),
        };
        serde_json::to_writer(&mut writer, &object).context("Writing JSON row")?;
        writer.write_all(b"\n").context("Writing JSON row")?;
        emitted += 1;
    }
    writer.flush().context("Flushing JSON output")?;
    Ok(emitted)
}
