/// Error types for the message-center watcher
use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum WatchError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Transport failure or non-2xx status from the backend
    #[error("HTTP error while {context}: {source}")]
    Http {
        context: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("Authentication error: {0}")]
    Auth(String),

    /// Any failure during login, wrapped so callers see one error class
    #[error("Login failed")]
    LoginFailed(#[source] Box<WatchError>),

    #[error("Not logged in: call login() before {0}")]
    NotLoggedIn(&'static str),

    /// The DiFi envelope or one of its calls did not report success
    #[error("DiFi request for {context} failed: {response}")]
    Rpc { context: String, response: String },

    /// Expected element or attribute missing from a page or fragment
    #[error("Parse error while {context}: {detail}")]
    Parse { context: String, detail: String },

    #[error("Unable to parse timestamp '{value}' while {context}: {source}")]
    Timestamp {
        value: String,
        context: String,
        #[source]
        source: chrono::ParseError,
    },

    #[error("Invalid identifier: {0}")]
    Identifier(String),

    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    /// Snapshot document could not be loaded or saved
    #[error("State file '{}': {detail}", path.display())]
    State {
        path: PathBuf,
        detail: String,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    #[error("Configuration error: {0}")]
    Config(String),

    /// The notification command could not be started
    #[error("Unable to run notification command '{command}': {source}")]
    Notify {
        command: String,
        #[source]
        source: std::io::Error,
    },

    /// Wraps a lower-level failure with the operation that triggered it
    #[error("Unable to {operation}")]
    Operation {
        operation: String,
        #[source]
        source: Box<WatchError>,
    },
}

impl WatchError {
    pub fn parse(context: impl Into<String>, detail: impl Into<String>) -> Self {
        WatchError::Parse {
            context: context.into(),
            detail: detail.into(),
        }
    }

    /// Attach the attempted operation to an error
    pub fn during(self, operation: impl Into<String>) -> Self {
        WatchError::Operation {
            operation: operation.into(),
            source: Box::new(self),
        }
    }
}

pub type Result<T> = std::result::Result<T, WatchError>;

#[cfg(test)]
mod tests {
    use super::*;
    use std::error::Error as _;

    #[test]
    fn test_during_keeps_source() {
        let err = WatchError::Identifier("abc".to_string()).during("fetch note 'abc'");
        assert_eq!(err.to_string(), "Unable to fetch note 'abc'");
        let source = err.source().unwrap();
        assert_eq!(source.to_string(), "Invalid identifier: abc");
    }
}
