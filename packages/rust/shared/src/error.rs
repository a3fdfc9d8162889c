//! Failures that can stop a tender lookup or an assistant request.
//!
//! Library crates return [`TenderPilotError`]; the binaries convert it into a
//! `color_eyre::Report` at the command boundary.

use std::path::PathBuf;

#[derive(Debug, thiserror::Error)]
pub enum TenderPilotError {
    /// The TOML file is malformed, or a required setting (an API key env var,
    /// the database location) cannot be resolved.
    #[error("config error: {message}")]
    Config { message: String },

    /// The tender CSV could not be downloaded: connection, TLS, redirect or
    /// non-2xx status from open.canada.ca.
    #[error("dataset download failed: {0}")]
    Network(String),

    /// The CSV is not readable as records.
    #[error("could not read tender CSV: {message}")]
    Parse { message: String },

    /// The local snapshot / AI answer database rejected a query.
    #[error("local cache error: {0}")]
    Storage(String),

    /// The model provider failed, returned an error status or sent back no text.
    #[error("AI error: {0}")]
    Ai(String),

    #[error("I/O error at {path:?}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    /// Bad user input or an unacceptable response: an unparseable date, an
    /// unsupported URL scheme, an oversized download.
    #[error("invalid input: {message}")]
    Validation { message: String },

    /// No tender has the requested row number or reference number.
    #[error("not found: {0}")]
    NotFound(String),
}

pub type Result<T> = std::result::Result<T, TenderPilotError>;

impl TenderPilotError {
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config {
            message: msg.into(),
        }
    }

    pub fn parse(msg: impl Into<String>) -> Self {
        Self::Parse {
            message: msg.into(),
        }
    }

    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation {
            message: msg.into(),
        }
    }

    /// Attach the file that was being read or written.
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn messages_name_the_failing_stage() {
        let err = TenderPilotError::config("OPENAI_API_KEY is not set");
        assert_eq!(err.to_string(), "config error: OPENAI_API_KEY is not set");

        let err = TenderPilotError::Network("HTTP 503 Service Unavailable".into());
        assert_eq!(err.to_string(), "dataset download failed: HTTP 503 Service Unavailable");

        let err = TenderPilotError::NotFound("no tender with row or reference 'PW-9'".into());
        assert_eq!(err.to_string(), "not found: no tender with row or reference 'PW-9'");

        let err = TenderPilotError::validation("'2026-13-01' is not a date");
        assert_eq!(err.to_string(), "invalid input: '2026-13-01' is not a date");
    }

    #[test]
    fn io_keeps_path() {
        let err = TenderPilotError::io(
            "tenders.csv",
            std::io::Error::new(std::io::ErrorKind::NotFound, "missing"),
        );
        assert!(err.to_string().starts_with("I/O error at \"tenders.csv\""));
    }
}
