use serde::Serialize;
use std::{io, path::PathBuf};
use thiserror::Error;

use crate::config::ProfileId;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum StatusLevel {
    Info,
    Success,
    Warn,
    Error,
}

impl StatusLevel {
    pub fn label(self) -> &'static str {
        match self {
            StatusLevel::Info => "INFO",
            StatusLevel::Success => "OK",
            StatusLevel::Warn => "WARN",
            StatusLevel::Error => "ERROR",
        }
    }
}

/// A message surfaced to whatever front end drives the manager.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StatusEvent {
    pub level: StatusLevel,
    pub message: String,
}

impl StatusEvent {
    pub fn info(message: impl Into<String>) -> Self {
        Self {
            level: StatusLevel::Info,
            message: message.into(),
        }
    }

    pub fn success(message: impl Into<String>) -> Self {
        Self {
            level: StatusLevel::Success,
            message: message.into(),
        }
    }

    pub fn warn(message: impl Into<String>) -> Self {
        Self {
            level: StatusLevel::Warn,
            message: message.into(),
        }
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self {
            level: StatusLevel::Error,
            message: message.into(),
        }
    }

    pub fn is_error(&self) -> bool {
        self.level == StatusLevel::Error
    }
}

impl From<&ManagerError> for StatusEvent {
    fn from(err: &ManagerError) -> Self {
        match err {
            ManagerError::ConfigUnavailable(_)
            | ManagerError::GameRootUnset(_)
            | ManagerError::MissingRoot(_) => {
                StatusEvent::warn(err.to_string())
            }
            ManagerError::Format { .. } | ManagerError::NotFound(_) => {
                StatusEvent::warn(err.to_string())
            }
            ManagerError::Io { .. } => StatusEvent::error(err.to_string()),
        }
    }
}

/// Failure kinds of the manager core. None of them are fatal; each one
/// degrades to a skipped item or an empty result plus a status event.
#[derive(Debug, Error)]
pub enum ManagerError {
    #[error("data root not found: {}", .0.display())]
    MissingRoot(PathBuf),
    #[error("unreadable archive {}: {reason}", path.display())]
    Format { path: PathBuf, reason: String },
    #[error("{action} failed for {}: {source}", path.display())]
    Io {
        action: &'static str,
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("{} profile has no documents folder configured", .0.display_name())]
    ConfigUnavailable(ProfileId),
    #[error("{} profile has no game folder configured", .0.display_name())]
    GameRootUnset(ProfileId),
    #[error("no mod file named {0}")]
    NotFound(String),
}

impl ManagerError {
    pub fn io(action: &'static str, path: impl Into<PathBuf>, source: io::Error) -> Self {
        ManagerError::Io {
            action,
            path: path.into(),
            source,
        }
    }
}
