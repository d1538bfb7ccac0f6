//! Column listing for a source file.

use anyhow::{Context, Result, anyhow};
use log::info;

use crate::{
    catalog::Catalog,
    cli::ColumnsArgs,
    config::resolve_locator,
    csv_source::CsvSource,
    io_utils,
    source::TabularSource,
    table::{Align, Table},
};

pub fn execute(args: &ColumnsArgs) -> Result<()> {
    let path = resolve_locator(&args.input)
        .ok_or_else(|| anyhow!("No source file name is defined"))?;
    let encoding = io_utils::resolve_encoding(args.source.input_encoding.as_deref())?;
    let source = CsvSource::open(&path, args.source.delimiter, encoding)
        .with_context(|| format!("Opening source {path:?}"))?;
    let catalog = Catalog::from_source(&source);

    let mut table = Table::new(["#", "name", "kind", "length", "label"])
        .align(0, Align::Right)
        .align(3, Align::Right);
    for column in catalog.columns() {
        table.push_row(vec![
            column.id.to_string(),
            column.name.clone(),
            column.kind.to_string(),
            column.length.to_string(),
            column.label.clone(),
        ]);
    }
    table.print();
    info!(
        "Listed {} column(s) from {:?} ({} row(s))",
        catalog.len(),
        path,
        source.row_count()
    );
    Ok(())
}
