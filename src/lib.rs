pub mod aggregate;
pub mod cli;
pub mod columns;
pub mod config;
pub mod data;
pub mod diagnostic;
pub mod filter;
pub mod interactive;
pub mod io_utils;
pub mod loader;
pub mod report;
pub mod rows;
pub mod source;
pub mod table;
pub mod view;

use std::{env, sync::OnceLock};

use anyhow::{Context, Result, anyhow};
use clap::Parser;
use log::{LevelFilter, debug};

use crate::{
    cli::{Cli, Commands, SourceArgs},
    config::{CredentialSource, DEFAULT_TAB_NAME, DashboardConfig, SourceConfig},
    loader::DataLoader,
    source::{CsvFileSource, PublishedCsvSource, SheetsApiSource, TableSource},
};

static LOGGER: OnceLock<()> = OnceLock::new();

fn init_logging() {
    LOGGER.get_or_init(|| {
        let mut builder = env_logger::Builder::from_env(env_logger::Env::default());
        if env::var("RUST_LOG").is_err() {
            builder.filter_module("trade_dashboard", LevelFilter::Info);
        }
        let _ = builder.format_timestamp_millis().try_init();
    });
}

pub fn run() -> Result<()> {
    init_logging();
    let cli = Cli::parse();
    match cli.command {
        Commands::Rows(args) => rows::execute(&args),
        Commands::View(args) => report::execute(&args),
        Commands::Columns(args) => columns::execute(&args),
        Commands::Interactive(args) => interactive::execute(&args),
    }
}

/// Loads the configuration file (if any) and applies command-line overrides.
pub fn resolve_config(args: &SourceArgs) -> Result<DashboardConfig> {
    let mut config = match &args.config {
        Some(path) => DashboardConfig::load(path)
            .with_context(|| format!("Loading configuration from {path:?}"))?,
        None => DashboardConfig::default(),
    };

    if let Some(path) = &args.csv {
        config.source = SourceConfig::CsvFile {
            path: path.clone(),
            delimiter: None,
            encoding: None,
        };
    } else if args.published {
        let (sheet_id, tab_name) = match &config.source {
            SourceConfig::GoogleSheets {
                sheet_id, tab_name, ..
            }
            | SourceConfig::PublishedCsv { sheet_id, tab_name } => {
                (sheet_id.clone(), tab_name.clone())
            }
            SourceConfig::CsvFile { .. } => (String::new(), DEFAULT_TAB_NAME.to_string()),
        };
        config.source = SourceConfig::PublishedCsv { sheet_id, tab_name };
    }

    match &mut config.source {
        SourceConfig::GoogleSheets {
            sheet_id,
            tab_name,
            credentials,
        } => {
            apply_sheet_overrides(args, sheet_id, tab_name);
            if let Some(var) = &args.api_key_env {
                *credentials = CredentialSource::ApiKey { env: var.clone() };
            }
            if let Some(path) = &args.token_file {
                *credentials = CredentialSource::BearerTokenFile { path: path.clone() };
            }
        }
        SourceConfig::PublishedCsv { sheet_id, tab_name } => {
            apply_sheet_overrides(args, sheet_id, tab_name);
        }
        SourceConfig::CsvFile {
            delimiter,
            encoding,
            ..
        } => {
            if args.delimiter.is_some() {
                delimiter.clone_from(&args.delimiter);
            }
            if args.input_encoding.is_some() {
                encoding.clone_from(&args.input_encoding);
            }
        }
    }

    debug!("Resolved source configuration: {:?}", config.source);
    Ok(config)
}

fn apply_sheet_overrides(args: &SourceArgs, sheet_id: &mut String, tab_name: &mut String) {
    if let Some(id) = &args.sheet_id {
        sheet_id.clone_from(id);
    }
    if let Some(tab) = &args.tab {
        tab_name.clone_from(tab);
    }
}

pub fn build_source(config: &DashboardConfig) -> Result<Box<dyn TableSource>> {
    let source: Box<dyn TableSource> = match &config.source {
        SourceConfig::GoogleSheets {
            sheet_id,
            tab_name,
            credentials,
        } => Box::new(SheetsApiSource::new(
            sheet_id.clone(),
            tab_name.clone(),
            credentials.clone(),
            config.request_timeout(),
        )),
        SourceConfig::PublishedCsv { sheet_id, tab_name } => Box::new(PublishedCsvSource::new(
            sheet_id.clone(),
            tab_name.clone(),
            config.request_timeout(),
        )),
        SourceConfig::CsvFile {
            path,
            delimiter,
            encoding,
        } => {
            let delimiter = delimiter
                .as_deref()
                .map(cli::parse_delimiter)
                .transpose()
                .map_err(|err| anyhow!("Invalid delimiter: {err}"))?;
            let encoding = io_utils::resolve_encoding(encoding.as_deref())?;
            Box::new(CsvFileSource::new(path.clone(), delimiter, encoding))
        }
    };
    Ok(source)
}

pub fn build_loader(config: &DashboardConfig) -> Result<DataLoader<Box<dyn TableSource>>> {
    let source = build_source(config)?;
    Ok(DataLoader::new(
        source,
        config.columns.clone(),
        config.cache_ttl(),
    ))
}
