//! The `columns` command: list loaded headers and the fields bound to them.

use anyhow::Result;
use log::{info, warn};

use crate::{cli::ColumnsArgs, data::Field, diagnostic, table};

pub fn execute(args: &ColumnsArgs) -> Result<()> {
    let config = crate::resolve_config(&args.source)?;
    let loader = crate::build_loader(&config)?;
    let outcome = loader.load();
    diagnostic::emit_all(&outcome.diagnostics);

    let loaded = &outcome.table;
    if loaded.has_no_columns() {
        info!("No data available; check the source configuration.");
        return Ok(());
    }

    let mut rows = Vec::with_capacity(loaded.headers().len());
    for (idx, header) in loaded.headers().iter().enumerate() {
        let field = loaded.columns().field_for(header);
        let kind = match field {
            Some(field) if field.is_numeric() => "number",
            _ => "text",
        };
        rows.push(vec![
            (idx + 1).to_string(),
            header.clone(),
            field.map(|f| f.label().to_string()).unwrap_or_default(),
            kind.to_string(),
        ]);
    }

    let headers = vec![
        "#".to_string(),
        "name".to_string(),
        "field".to_string(),
        "type".to_string(),
    ];
    table::print_table(&headers, &rows);

    for field in Field::ALL {
        if loaded.field_index(field).is_none() {
            warn!(
                "No column named '{}' for the {} field",
                loaded.columns().name(field),
                field
            );
        }
    }
    info!("Listed {} column(s)", loaded.headers().len());
    Ok(())
}
