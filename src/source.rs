//! Remote and local providers of raw spreadsheet rows.
//!
//! A [`TableSource`] returns every row of one worksheet, header first, as
//! text cells. Interpreting those rows is the loader's job.

use std::{env, fs, io, path::PathBuf, time::Duration};

use encoding_rs::{Encoding, UTF_8};
use log::debug;
use reqwest::{StatusCode, blocking::Client, header::CONTENT_TYPE};
use serde::Deserialize;
use thiserror::Error;
use url::Url;

use crate::{config::CredentialSource, io_utils};

pub const SHEETS_API_BASE: &str = "https://sheets.googleapis.com/v4/spreadsheets/";
pub const PUBLISHED_SHEET_BASE: &str = "https://docs.google.com/spreadsheets/d/";

#[derive(Debug, Error)]
pub enum SourceError {
    #[error("no spreadsheet id is configured")]
    MissingSheetId,
    #[error("spreadsheet '{sheet_id}' was not found")]
    SpreadsheetNotFound { sheet_id: String },
    #[error("worksheet '{tab_name}' was not found in spreadsheet '{sheet_id}'")]
    WorksheetNotFound { sheet_id: String, tab_name: String },
    #[error("spreadsheet '{sheet_id}' is not shared publicly")]
    NotPublished { sheet_id: String },
    #[error("credential file {path:?} does not exist")]
    CredentialFileMissing { path: PathBuf },
    #[error("environment variable '{var}' holding the API key is not set")]
    CredentialVarMissing { var: String },
    #[error("access denied by the spreadsheet service (HTTP {status})")]
    Unauthorized { status: u16 },
    #[error("unexpected HTTP status {status} from {url}")]
    HttpStatus { status: u16, url: String },
    #[error("request failed: {0}")]
    Transport(#[from] reqwest::Error),
    #[error("reading {path:?}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("parsing CSV: {0}")]
    Csv(#[from] csv::Error),
    #[error("malformed response: {0}")]
    Malformed(String),
}

impl SourceError {
    /// What the user should check next.
    pub fn hint(&self) -> &'static str {
        match self {
            SourceError::MissingSheetId
            | SourceError::SpreadsheetNotFound { .. }
            | SourceError::WorksheetNotFound { .. } => {
                "Check the spreadsheet id and worksheet name in the configuration."
            }
            SourceError::NotPublished { .. } => {
                "Share the spreadsheet with 'anyone with the link' or use the google_sheets source with credentials."
            }
            SourceError::CredentialFileMissing { .. } | SourceError::CredentialVarMissing { .. } => {
                "Check that the credential file or environment variable is present."
            }
            SourceError::Io { source, .. } if source.kind() == io::ErrorKind::NotFound => {
                "Check the path of the local data file."
            }
            _ => {
                "Check that the credential has access to the spreadsheet and that the connection works."
            }
        }
    }
}

pub trait TableSource {
    /// Human-readable identity used in log lines and diagnostics.
    fn describe(&self) -> String;

    fn fetch_rows(&self) -> Result<Vec<Vec<String>>, SourceError>;
}

impl<T: TableSource + ?Sized> TableSource for Box<T> {
    fn describe(&self) -> String {
        (**self).describe()
    }

    fn fetch_rows(&self) -> Result<Vec<Vec<String>>, SourceError> {
        (**self).fetch_rows()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Credential {
    ApiKey(String),
    Bearer(String),
}

impl CredentialSource {
    pub fn resolve(&self) -> Result<Credential, SourceError> {
        match self {
            CredentialSource::ApiKey { env: var } => match env::var(var) {
                Ok(key) if !key.trim().is_empty() => Ok(Credential::ApiKey(key.trim().to_string())),
                _ => Err(SourceError::CredentialVarMissing { var: var.clone() }),
            },
            CredentialSource::BearerTokenFile { path } => {
                if !path.exists() {
                    return Err(SourceError::CredentialFileMissing { path: path.clone() });
                }
                let token = fs::read_to_string(path).map_err(|source| SourceError::Io {
                    path: path.clone(),
                    source,
                })?;
                let token = token.trim();
                if token.is_empty() {
                    return Err(SourceError::Malformed(format!(
                        "credential file {path:?} is empty"
                    )));
                }
                Ok(Credential::Bearer(token.to_string()))
            }
        }
    }
}

fn build_client(timeout: Duration) -> Result<Client, SourceError> {
    Ok(Client::builder()
        .timeout(timeout)
        .user_agent(concat!("trade-dashboard/", env!("CARGO_PKG_VERSION")))
        .build()?)
}

// API keys travel in the query string; keep them out of error messages.
fn strip_url(err: reqwest::Error) -> SourceError {
    SourceError::Transport(err.without_url())
}

fn push_segments(base: &str, segments: &[&str]) -> Result<Url, SourceError> {
    let mut url = Url::parse(base)
        .map_err(|err| SourceError::Malformed(format!("invalid base URL {base}: {err}")))?;
    url.path_segments_mut()
        .map_err(|_| SourceError::Malformed(format!("base URL {base} cannot take a path")))?
        .pop_if_empty()
        .extend(segments);
    Ok(url)
}

/// Maps a non-success response onto the failure a user can act on. A 400
/// from the values endpoint means the range (worksheet name) did not resolve.
fn status_error(
    status: StatusCode,
    sheet_id: &str,
    tab_name: Option<&str>,
    url: &Url,
) -> Option<SourceError> {
    match (status, tab_name) {
        (s, _) if s.is_success() => None,
        (StatusCode::NOT_FOUND, _) => Some(SourceError::SpreadsheetNotFound {
            sheet_id: sheet_id.to_string(),
        }),
        (StatusCode::BAD_REQUEST, Some(tab_name)) => Some(SourceError::WorksheetNotFound {
            sheet_id: sheet_id.to_string(),
            tab_name: tab_name.to_string(),
        }),
        (StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN, _) => Some(SourceError::Unauthorized {
            status: status.as_u16(),
        }),
        _ => Some(SourceError::HttpStatus {
            status: status.as_u16(),
            url: url.to_string(),
        }),
    }
}

#[derive(Debug, Deserialize)]
struct ValueRange {
    #[serde(default)]
    values: Vec<Vec<serde_json::Value>>,
}

fn cell_text(value: serde_json::Value) -> String {
    match value {
        serde_json::Value::String(text) => text,
        serde_json::Value::Null => String::new(),
        other => other.to_string(),
    }
}

/// A1 notation for a whole worksheet. Unquoted, a name such as `Y2564` would
/// be read as a single cell of the first sheet.
fn quote_sheet_name(name: &str) -> String {
    format!("'{}'", name.replace('\'', "''"))
}

/// Reads a worksheet through the Sheets API v4 `values` endpoint. Cells are
/// requested as formatted text, the same view a spreadsheet user sees.
pub struct SheetsApiSource {
    sheet_id: String,
    tab_name: String,
    credentials: CredentialSource,
    timeout: Duration,
}

impl SheetsApiSource {
    pub fn new(
        sheet_id: impl Into<String>,
        tab_name: impl Into<String>,
        credentials: CredentialSource,
        timeout: Duration,
    ) -> Self {
        Self {
            sheet_id: sheet_id.into(),
            tab_name: tab_name.into(),
            credentials,
            timeout,
        }
    }

    pub fn values_url(&self) -> Result<Url, SourceError> {
        let range = quote_sheet_name(&self.tab_name);
        let mut url = push_segments(
            SHEETS_API_BASE,
            &[self.sheet_id.as_str(), "values", range.as_str()],
        )?;
        url.query_pairs_mut()
            .append_pair("majorDimension", "ROWS")
            .append_pair("valueRenderOption", "FORMATTED_VALUE");
        Ok(url)
    }
}

impl TableSource for SheetsApiSource {
    fn describe(&self) -> String {
        format!("worksheet '{}' of spreadsheet '{}'", self.tab_name, self.sheet_id)
    }

    fn fetch_rows(&self) -> Result<Vec<Vec<String>>, SourceError> {
        if self.sheet_id.trim().is_empty() {
            return Err(SourceError::MissingSheetId);
        }
        let credential = self.credentials.resolve()?;
        let mut url = self.values_url()?;
        let client = build_client(self.timeout)?;
        let request = match credential {
            Credential::ApiKey(key) => {
                url.query_pairs_mut().append_pair("key", &key);
                client.get(url)
            }
            Credential::Bearer(token) => client.get(url).bearer_auth(token),
        };
        debug!("Requesting {}", self.describe());
        let response = request.send().map_err(strip_url)?;
        if let Some(err) = status_error(
            response.status(),
            &self.sheet_id,
            Some(&self.tab_name),
            &self.values_url()?,
        ) {
            return Err(err);
        }
        let body: ValueRange = response.json().map_err(strip_url)?;
        Ok(body
            .values
            .into_iter()
            .map(|row| row.into_iter().map(cell_text).collect())
            .collect())
    }
}

/// Reads the anonymous CSV export of a link-shared spreadsheet.
pub struct PublishedCsvSource {
    sheet_id: String,
    tab_name: String,
    timeout: Duration,
}

impl PublishedCsvSource {
    pub fn new(sheet_id: impl Into<String>, tab_name: impl Into<String>, timeout: Duration) -> Self {
        Self {
            sheet_id: sheet_id.into(),
            tab_name: tab_name.into(),
            timeout,
        }
    }

    pub fn export_url(&self) -> Result<Url, SourceError> {
        let mut url = push_segments(PUBLISHED_SHEET_BASE, &[self.sheet_id.as_str(), "gviz", "tq"])?;
        url.query_pairs_mut()
            .append_pair("tqx", "out:csv")
            .append_pair("sheet", &self.tab_name);
        Ok(url)
    }
}

impl TableSource for PublishedCsvSource {
    fn describe(&self) -> String {
        format!(
            "published worksheet '{}' of spreadsheet '{}'",
            self.tab_name, self.sheet_id
        )
    }

    fn fetch_rows(&self) -> Result<Vec<Vec<String>>, SourceError> {
        if self.sheet_id.trim().is_empty() {
            return Err(SourceError::MissingSheetId);
        }
        let url = self.export_url()?;
        debug!("Requesting {}", self.describe());
        let response = build_client(self.timeout)?.get(url.clone()).send()?;
        if let Some(err) = status_error(response.status(), &self.sheet_id, None, &url) {
            return Err(err);
        }
        // Private sheets redirect to a sign-in page instead of failing.
        let is_html = response
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|value| value.to_str().ok())
            .is_some_and(|value| value.contains("text/html"));
        if is_html {
            return Err(SourceError::NotPublished {
                sheet_id: self.sheet_id.clone(),
            });
        }
        let body = response.bytes()?;
        io_utils::read_rows(body.as_ref(), io_utils::DEFAULT_CSV_DELIMITER, UTF_8)
    }
}

pub struct CsvFileSource {
    path: PathBuf,
    delimiter: u8,
    encoding: &'static Encoding,
}

impl CsvFileSource {
    pub fn new(path: impl Into<PathBuf>, delimiter: Option<u8>, encoding: &'static Encoding) -> Self {
        let path = path.into();
        let delimiter = io_utils::resolve_input_delimiter(&path, delimiter);
        Self {
            path,
            delimiter,
            encoding,
        }
    }
}

impl TableSource for CsvFileSource {
    fn describe(&self) -> String {
        format!("file {:?}", self.path)
    }

    fn fetch_rows(&self) -> Result<Vec<Vec<String>>, SourceError> {
        io_utils::read_rows_from_path(&self.path, self.delimiter, self.encoding)
    }
}
