//! User-facing messages produced when a failure is absorbed at a boundary.

use std::fmt;

use log::{error, info, warn};
use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Level {
    Info,
    Warning,
    Error,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Diagnostic {
    pub level: Level,
    pub message: String,
}

impl Diagnostic {
    pub fn info(message: impl Into<String>) -> Self {
        Self {
            level: Level::Info,
            message: message.into(),
        }
    }

    pub fn warning(message: impl Into<String>) -> Self {
        Self {
            level: Level::Warning,
            message: message.into(),
        }
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self {
            level: Level::Error,
            message: message.into(),
        }
    }

    /// Routes the message through the `log` facade at a matching level.
    pub fn emit(&self) {
        match self.level {
            Level::Info => info!("{}", self.message),
            Level::Warning => warn!("{}", self.message),
            Level::Error => error!("{}", self.message),
        }
    }
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let tag = match self.level {
            Level::Info => "info",
            Level::Warning => "warning",
            Level::Error => "error",
        };
        write!(f, "[{tag}] {}", self.message)
    }
}

pub fn emit_all(diagnostics: &[Diagnostic]) {
    for diagnostic in diagnostics {
        diagnostic.emit();
    }
}
