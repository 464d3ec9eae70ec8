use std::{fmt::Display, path::PathBuf};

use thiserror::Error;

/// An error that aborts reading, converting or writing a subtitle file.
#[derive(Debug, Error)]
pub enum Error {
    /// The file could not be opened, read, created or written.
    #[error("{}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    /// A required header or marker is missing or unreadable.
    #[error("line {line}: {reason}")]
    InvalidFormat { line: usize, reason: String },
    /// The file extension does not name a supported subtitle format.
    #[error("unsupported subtitle format: {0}")]
    UnsupportedFormat(String),
    /// The requested style tag cannot be expressed in the target format.
    #[error("style tag `{0}` is not allowed in WebVTT (expected one of b, i, u, c)")]
    UnsupportedStyleTag(String),
    /// An entry was accessed past the end of the store.
    #[error("index {index} is out of range for {len} entries")]
    IndexOutOfRange { index: usize, len: usize },
}

impl Error {
    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }

    pub(crate) fn invalid(line: usize, reason: impl Into<String>) -> Self {
        Self::InvalidFormat {
            line,
            reason: reason.into(),
        }
    }

    /// Returns `true` if the conversion can carry on after this error.
    ///
    /// Only a rejected style tag is recoverable, everything else
    /// aborts the file being processed.
    pub fn is_recoverable(&self) -> bool {
        matches!(self, Self::UnsupportedStyleTag(_))
    }
}

/// The kind of record a [`ParseWarning`] refers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Record {
    /// An ASS `Style:` line
    Style,
    /// An ASS `Dialogue:` line
    Dialogue,
    /// A SAMI `<SYNC>` tag
    Sync,
    /// An SRT positioning suffix
    Coordinates,
}

impl Record {
    pub fn as_str(&self) -> &'static str {
        match self {
            Record::Style => "style",
            Record::Dialogue => "dialogue",
            Record::Sync => "sync",
            Record::Coordinates => "coordinates",
        }
    }
}

/// A malformed record that was skipped while parsing.
///
/// These never abort a parse, they are collected by the adapter so the
/// caller can report or inspect them.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParseWarning {
    pub line: usize,
    pub record: Record,
    pub reason: String,
}

impl ParseWarning {
    pub(crate) fn new(line: usize, record: Record, reason: impl Into<String>) -> Self {
        Self {
            line,
            record,
            reason: reason.into(),
        }
    }
}

impl Display for ParseWarning {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "line {}: skipped {} record: {}",
            self.line,
            self.record.as_str(),
            self.reason
        )
    }
}
