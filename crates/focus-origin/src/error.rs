//! Error types for configuration, timer setup, and change-stream consumption.

use std::{path::PathBuf, result::Result as StdResult};

use thiserror::Error;

/// Convenient result type for the focus-origin crate.
pub type Result<T> = StdResult<T, Error>;

/// Errors produced at the fallible edges: configuration, origin names, and
/// timer runtime setup.
///
/// Tracker operations themselves never fail.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum Error {
    /// I/O or filesystem read error.
    #[error("{message}")]
    Read {
        /// Optional path associated with the read error.
        path: Option<PathBuf>,
        /// Human-readable error message.
        message: String,
    },
    /// RON syntax or shape error.
    #[error("{message}")]
    Parse {
        /// Optional path associated with the parse error.
        path: Option<PathBuf>,
        /// Human-readable error message.
        message: String,
    },
    /// A value parsed but is not acceptable.
    #[error("{message}")]
    Validation {
        /// Human-readable error message.
        message: String,
    },
    /// A string did not name a focus origin.
    #[error("unknown focus origin: {name:?}")]
    UnknownOrigin {
        /// The rejected name.
        name: String,
    },
    /// The tokio runtime cannot back a [`TokioScheduler`](crate::TokioScheduler).
    #[error("{message}")]
    Runtime {
        /// Human-readable error message.
        message: String,
    },
}

impl Error {
    /// Render a human-friendly error message including the path when available.
    pub fn pretty(&self) -> String {
        match self {
            Self::Read { path, message } => match path {
                Some(p) => format!("Read error at {}: {}", p.display(), message),
                None => format!("Read error: {}", message),
            },
            Self::Parse { path, message } => match path {
                Some(p) => format!("Config parse error at {}: {}", p.display(), message),
                None => format!("Config parse error: {}", message),
            },
            Self::Validation { message } => format!("Invalid config: {}", message),
            Self::UnknownOrigin { .. } => self.to_string(),
            Self::Runtime { message } => format!("Timer runtime error: {}", message),
        }
    }

    /// Attach a path to read and parse errors that do not carry one yet.
    pub(crate) fn with_path(self, new_path: PathBuf) -> Self {
        match self {
            Self::Read { path: None, message } => Self::Read {
                path: Some(new_path),
                message,
            },
            Self::Parse { path: None, message } => Self::Parse {
                path: Some(new_path),
                message,
            },
            other => other,
        }
    }
}

/// Error returned by [`FocusChanges::try_recv`](crate::FocusChanges::try_recv).
#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum TryRecvError {
    /// Nothing is buffered right now, but the stream is still open.
    #[error("no focus change buffered")]
    Empty,
    /// Monitoring stopped and every buffered change has been consumed.
    #[error("focus change stream closed")]
    Closed,
}

/// Error returned by [`FocusChanges::recv`](crate::FocusChanges::recv).
#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum RecvError {
    /// Monitoring stopped and every buffered change has been consumed.
    #[error("focus change stream closed")]
    Closed,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pretty_includes_path() {
        let err = Error::Parse {
            path: None,
            message: "1:3: Expected closing `)`".into(),
        }
        .with_path(PathBuf::from("focus.ron"));
        assert_eq!(
            err.pretty(),
            "Config parse error at focus.ron: 1:3: Expected closing `)`"
        );
    }

    #[test]
    fn unknown_origin_is_not_a_config_error() {
        let err = Error::UnknownOrigin {
            name: "telepathy".into(),
        };
        assert_eq!(err.pretty(), "unknown focus origin: \"telepathy\"");
    }

    #[test]
    fn with_path_keeps_existing_path() {
        let err = Error::Read {
            path: Some(PathBuf::from("a.ron")),
            message: "missing".into(),
        }
        .with_path(PathBuf::from("b.ron"));
        assert_eq!(err.pretty(), "Read error at a.ron: missing");
    }
}
