//! The `rows` command: show or export the filtered table.

use anyhow::{Context, Result};
use log::info;

use crate::{
    cli::RowsArgs,
    diagnostic,
    filter::{FilterCriteria, filter_table},
    io_utils, table,
};

pub fn execute(args: &RowsArgs) -> Result<()> {
    let config = crate::resolve_config(&args.source)?;
    let loader = crate::build_loader(&config)?;
    let outcome = loader.load();
    diagnostic::emit_all(&outcome.diagnostics);
    if outcome.table.has_no_columns() {
        info!("No data available; check the source configuration.");
        return Ok(());
    }

    let criteria = FilterCriteria::from(&args.filters);
    let filtered = filter_table(&outcome.table, &criteria);
    info!(
        "{} of {} row(s) match ({})",
        filtered.len(),
        outcome.table.len(),
        criteria.describe()
    );

    let mut rows = filtered.text_rows();
    if let Some(limit) = args.limit {
        rows.truncate(limit);
    }

    if args.csv_out || args.output.is_some() {
        let output = args.output.as_deref();
        let delimiter = io_utils::resolve_output_delimiter(output);
        let mut writer = io_utils::open_csv_writer(output, delimiter)?;
        writer
            .write_record(filtered.headers())
            .context("Writing CSV header")?;
        for (idx, row) in rows.iter().enumerate() {
            writer
                .write_record(row)
                .with_context(|| format!("Writing row {}", idx + 1))?;
        }
        writer.flush().context("Flushing CSV output")?;
    } else {
        table::print_table(filtered.headers(), &rows);
    }

    if filtered.is_empty() {
        info!("No rows match the selected filters; try different criteria.");
    }
    Ok(())
}
