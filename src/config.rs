//! Dashboard configuration loaded from YAML.
//!
//! Every key is optional; a missing file section falls back to the defaults
//! below (worksheet `TradeData`, five minute cache, top 10 rankings, API key
//! read from `SHEETS_API_KEY`).

use std::{fs::File, io::BufReader, path::Path, path::PathBuf, time::Duration};

use anyhow::{Context, Result, ensure};
use serde::{Deserialize, Serialize};

use crate::data::ColumnMap;

pub const DEFAULT_TAB_NAME: &str = "TradeData";
pub const DEFAULT_API_KEY_ENV: &str = "SHEETS_API_KEY";
pub const DEFAULT_CACHE_TTL_SECS: u64 = 300;
pub const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 30;
pub const DEFAULT_TOP: usize = 10;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DashboardConfig {
    pub source: SourceConfig,
    pub columns: ColumnMap,
    pub cache_ttl_secs: u64,
    pub request_timeout_secs: u64,
    pub top: usize,
}

impl Default for DashboardConfig {
    fn default() -> Self {
        Self {
            source: SourceConfig::default(),
            columns: ColumnMap::default(),
            cache_ttl_secs: DEFAULT_CACHE_TTL_SECS,
            request_timeout_secs: DEFAULT_REQUEST_TIMEOUT_SECS,
            top: DEFAULT_TOP,
        }
    }
}

impl DashboardConfig {
    pub fn load(path: &Path) -> Result<Self> {
        let file = File::open(path).with_context(|| format!("Opening config file {path:?}"))?;
        let reader = BufReader::new(file);
        let config: DashboardConfig =
            serde_yaml::from_reader(reader).context("Parsing dashboard config YAML")?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        ensure!(self.top > 0, "'top' must be at least 1");
        ensure!(
            self.request_timeout_secs > 0,
            "'request_timeout_secs' must be at least 1"
        );
        Ok(())
    }

    pub fn cache_ttl(&self) -> Duration {
        Duration::from_secs(self.cache_ttl_secs)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum SourceConfig {
    /// Sheets API v4 `values` endpoint.
    GoogleSheets {
        #[serde(default)]
        sheet_id: String,
        #[serde(default = "default_tab_name")]
        tab_name: String,
        #[serde(default)]
        credentials: CredentialSource,
    },
    /// Anonymous CSV export of a link-shared spreadsheet.
    PublishedCsv {
        sheet_id: String,
        #[serde(default = "default_tab_name")]
        tab_name: String,
    },
    CsvFile {
        path: PathBuf,
        #[serde(default)]
        delimiter: Option<String>,
        #[serde(default)]
        encoding: Option<String>,
    },
}

impl Default for SourceConfig {
    fn default() -> Self {
        SourceConfig::GoogleSheets {
            sheet_id: String::new(),
            tab_name: default_tab_name(),
            credentials: CredentialSource::default(),
        }
    }
}

fn default_tab_name() -> String {
    DEFAULT_TAB_NAME.to_string()
}

/// Where the Sheets API credential comes from. The material is passed through
/// verbatim; no token exchange happens here.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum CredentialSource {
    ApiKey { env: String },
    BearerTokenFile { path: PathBuf },
}

impl Default for CredentialSource {
    fn default() -> Self {
        CredentialSource::ApiKey {
            env: DEFAULT_API_KEY_ENV.to_string(),
        }
    }
}
