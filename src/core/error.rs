use std::fmt;

/// Coarse error category, surfaced to callers instead of a typed exception
/// hierarchy so the engine's message-passing boundary (§5) stays flat.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    Io,
    Parse,
    NotFound,
    InvalidArgument,
    Internal,
    InvalidInput,
    InvalidState,
    UnsupportedQuery,
}

#[derive(Debug)]
pub struct Error {
    pub kind: ErrorKind,
    pub context: String,
}

impl Error {
    pub fn new(kind: ErrorKind, context: impl Into<String>) -> Self {
        Error { kind, context: context.into() }
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{:?}: {}", self.kind, self.context)
    }
}

impl std::error::Error for Error {}

impl From<std::io::Error> for Error {
    fn from(err: std::io::Error) -> Self {
        Error { kind: ErrorKind::Io, context: err.to_string() }
    }
}

impl From<serde_json::Error> for Error {
    fn from(err: serde_json::Error) -> Self {
        Error { kind: ErrorKind::Parse, context: err.to_string() }
    }
}

impl From<reqwest::Error> for Error {
    fn from(err: reqwest::Error) -> Self {
        Error { kind: ErrorKind::Io, context: err.to_string() }
    }
}

pub type Result<T> = std::result::Result<T, Error>;
