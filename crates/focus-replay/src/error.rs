//! Error handling for the focus-replay crate.

use std::{io, result};

use thiserror::Error;

/// Convenient result type for focus-replay operations.
pub type Result<T> = result::Result<T, Error>;

/// Errors that can occur while replaying a scenario.
#[derive(Debug, Error)]
pub enum Error {
    /// Wrapper for standard I/O errors.
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
    /// Monitor configuration could not be loaded or is invalid.
    #[error("Configuration error: {}", .0.pretty())]
    Config(#[from] focus_origin::Error),
    /// The scenario file is malformed or inconsistent.
    #[error("Scenario error: {0}")]
    Scenario(String),
    /// A step or monitor entry names an element the scenario never declared.
    #[error("Unknown element: {0}")]
    UnknownElement(String),
}

impl Error {
    /// Helper to build a scenario error from an arbitrary message.
    pub fn scenario<M: Into<String>>(msg: M) -> Self {
        Self::Scenario(msg.into())
    }
}
