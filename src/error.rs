//! Error types for the public API.
//!
//! Internally the crate works with `anyhow` context chains (`Res<T>`). At the boundary of a public
//! function the chain is classified with an `ErrorType` so that callers can tell a transient
//! network outage apart from bad input or a broken local store.

use serde::{Deserialize, Serialize};
use std::fmt::{Debug, Display, Formatter};

/// The internal result type.
pub(crate) type Res<T> = anyhow::Result<T>;

/// The public result type.
pub type Result<T> = std::result::Result<T, Error>;

/// The class of failure.
#[derive(Debug, Clone, Copy, Eq, PartialEq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorType {
    /// The remote was unreachable, timed out, or answered with a non-2xx status.
    Network,
    /// A referenced account, category or transaction does not exist.
    NotFound,
    /// A payload could not be decoded into the expected shape.
    Decoding,
    /// A local store could not be read or written.
    Persistence,
    /// The configuration directory or file is missing or invalid.
    Config,
    /// The caller supplied an invalid value.
    Validation,
}

serde_plain::derive_display_from_serialize!(ErrorType);
serde_plain::derive_fromstr_from_deserialize!(ErrorType);

/// An error with a classification and a chain of context messages.
pub struct Error {
    kind: ErrorType,
    inner: anyhow::Error,
}

impl Error {
    pub fn new(kind: ErrorType, inner: impl Into<anyhow::Error>) -> Self {
        Self {
            kind,
            inner: inner.into(),
        }
    }

    /// Creates an error of `kind` from a message.
    pub fn msg(kind: ErrorType, message: impl Display + Send + Sync + 'static) -> Self {
        Self::new(kind, anyhow::anyhow!("{message}"))
    }

    pub fn kind(&self) -> ErrorType {
        self.kind
    }

    /// Returns true if the failure was caused by the remote being unavailable.
    pub fn is_network(&self) -> bool {
        self.kind == ErrorType::Network
    }

    pub fn is_not_found(&self) -> bool {
        self.kind == ErrorType::NotFound
    }
}

impl Debug for Error {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} error: {:?}", self.kind, self.inner)
    }
}

impl Display for Error {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} error: {:#}", self.kind, self.inner)
    }
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        self.inner.source()
    }
}

/// Classifies an internal result at the public boundary.
pub(crate) trait IntoResult<T> {
    fn pub_result(self, kind: ErrorType) -> Result<T>;
}

impl<T> IntoResult<T> for Res<T> {
    fn pub_result(self, kind: ErrorType) -> Result<T> {
        self.map_err(|e| Error::new(kind, e))
    }
}
