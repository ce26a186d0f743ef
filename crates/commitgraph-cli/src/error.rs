use std::path::PathBuf;

use thiserror::Error;

pub type Result<T> = std::result::Result<T, SourceError>;

/// Failures while fetching or filtering commit records.
#[derive(Debug, Error)]
pub enum SourceError {
    #[error("I/O failure while {operation}: {source}")]
    Io {
        operation: &'static str,
        #[source]
        source: std::io::Error,
    },

    #[error("git command failed: `{program}` {args:?}, exit_code={exit_code:?}, stderr={stderr}")]
    GitCommandFailed {
        program: String,
        args: Vec<String>,
        exit_code: Option<i32>,
        stderr: String,
    },

    #[error("invalid git repository: {0}")]
    InvalidRepository(PathBuf),

    #[error("parse error: {0}")]
    Parse(String),

    #[error("invalid search pattern {pattern:?}: {source}")]
    InvalidPattern {
        pattern: String,
        #[source]
        source: regex::Error,
    },
}

impl SourceError {
    pub fn io(operation: &'static str, source: std::io::Error) -> Self {
        Self::Io { operation, source }
    }
}
