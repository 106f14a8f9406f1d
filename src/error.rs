//! Error types for parsing and editing configuration documents.

use crate::position::Range;

/// Result type alias for nuget-config operations.
pub type Result<T> = std::result::Result<T, ConfigError>;

/// Coarse error category, for callers that branch on the kind of failure
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    NotFound,
    Parse,
    Format,
    Conflict,
    Validation,
    Io,
}

impl ErrorKind {
    pub fn name(&self) -> &'static str {
        match self {
            ErrorKind::NotFound => "not_found",
            ErrorKind::Parse => "parse",
            ErrorKind::Format => "format",
            ErrorKind::Conflict => "conflict",
            ErrorKind::Validation => "validation",
            ErrorKind::Io => "io",
        }
    }
}

impl std::fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

/// Errors raised while parsing, editing or locating a configuration document
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// A referenced key, attribute or file does not exist
    #[error("not found: {what}")]
    NotFound { what: String },

    /// Malformed markup
    #[error("parse error at {line}:{column}: {message} (near `{context}`)")]
    Parse {
        line: usize,
        column: usize,
        context: String,
        message: String,
    },

    /// Well-formed markup that violates the minimal document schema
    #[error("invalid configuration: {message}")]
    Format { message: String },

    /// Two queued edits touch overlapping bytes
    #[error("conflicting edits: `{first_path}` at {first} overlaps `{second_path}` at {second}")]
    Conflict {
        first: Range,
        first_path: String,
        second: Range,
        second_path: String,
    },

    /// Empty or otherwise unusable argument passed to an editor method
    #[error("invalid argument: {message}")]
    Validation { message: String },

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("invalid UTF-8 in {path}")]
    Utf8 { path: String },
}

impl ConfigError {
    pub fn not_found(what: impl Into<String>) -> Self {
        ConfigError::NotFound { what: what.into() }
    }

    pub fn format(message: impl Into<String>) -> Self {
        ConfigError::Format { message: message.into() }
    }

    pub fn validation(message: impl Into<String>) -> Self {
        ConfigError::Validation { message: message.into() }
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            ConfigError::NotFound { .. } => ErrorKind::NotFound,
            ConfigError::Parse { .. } | ConfigError::Utf8 { .. } => ErrorKind::Parse,
            ConfigError::Format { .. } => ErrorKind::Format,
            ConfigError::Conflict { .. } => ErrorKind::Conflict,
            ConfigError::Validation { .. } => ErrorKind::Validation,
            ConfigError::Io(_) => ErrorKind::Io,
        }
    }
}

impl From<quick_xml::Error> for ConfigError {
    fn from(err: quick_xml::Error) -> Self {
        ConfigError::Parse {
            line: 0,
            column: 0,
            context: String::new(),
            message: err.to_string(),
        }
    }
}
