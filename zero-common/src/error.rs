//! Error types shared by the scoring library and its CLI.
//!
//! Scoring itself never fails; these cover the edges around it: reading
//! configuration and loading instrument bundles from disk.

use thiserror::Error;

use crate::validation::ValidationError;

/// Result alias over [`Error`].
pub type Result<T> = std::result::Result<T, Error>;

/// Failure at the I/O or configuration boundary.
#[derive(Error, Debug)]
pub enum Error {
    /// Configuration could not be loaded or is inconsistent
    #[error("Configuration error: {0}")]
    Config(String),

    /// A bundle file parsed but describes an unusable instrument
    #[error("Invalid bundle: {0}")]
    InvalidBundle(String),

    /// Invariant broken inside the service
    #[error("Internal error: {0}")]
    Internal(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Any of the above, with the operation that hit it
    #[error("{context}: {source}")]
    WithContext {
        context: String,
        #[source]
        source: Box<Error>,
    },
}

impl Error {
    /// Wrap with a description of the failing operation.
    pub fn with_context(self, context: impl Into<String>) -> Self {
        Self::WithContext {
            context: context.into(),
            source: Box::new(self),
        }
    }

    /// The innermost error, past any context wrappers.
    pub fn root(&self) -> &Error {
        match self {
            Self::WithContext { source, .. } => source.root(),
            other => other,
        }
    }

    pub fn is_config(&self) -> bool {
        matches!(self.root(), Self::Config(_))
    }

    /// sysexits-style process exit code.
    pub fn exit_code(&self) -> i32 {
        match self.root() {
            Self::Config(_) => 78,
            Self::Io(_) => 66,
            Self::InvalidBundle(_) | Self::Json(_) => 65,
            Self::Internal(_) | Self::WithContext { .. } => 70,
        }
    }
}

impl From<ValidationError> for Error {
    fn from(err: ValidationError) -> Self {
        Self::Config(err.to_string())
    }
}

/// `.context("...")` for any result whose error converts into [`Error`].
pub trait ResultExt<T> {
    fn context(self, context: impl Into<String>) -> Result<T>;
}

impl<T, E: Into<Error>> ResultExt<T> for std::result::Result<T, E> {
    fn context(self, context: impl Into<String>) -> Result<T> {
        self.map_err(|e| e.into().with_context(context))
    }
}
