//! Error types for the binder command line.
//!
//! Library modules carry their own error enums. This module wraps them at the
//! binary boundary and adds actionable recovery suggestions.

use thiserror::Error;

/// Result type alias for binder operations
pub type Result<T> = std::result::Result<T, BinderError>;

/// Main error type at the command boundary
#[derive(Error, Debug)]
pub enum BinderError {
    /// CLI argument errors
    #[error("CLI error: {0}")]
    Cli(#[from] CliError),

    /// Payload resolution errors
    #[error("Payload error: {0}")]
    Payload(#[from] crate::payload::Error),

    /// Bundle relation errors
    #[error("Relation error: {0}")]
    Relation(#[from] crate::relation::Error),

    /// Symbol model errors
    #[error("Symbol error: {0}")]
    Symbol(#[from] crate::symbol::Error),

    /// Manifest emission errors
    #[error("Manifest error: {0}")]
    Manifest(#[from] crate::manifest::Error),

    /// IO errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// CLI-specific errors
#[derive(Error, Debug)]
pub enum CliError {
    /// Invalid command line arguments
    #[error("Invalid arguments: {reason}")]
    InvalidArguments {
        /// Reason for the error
        reason: String,
    },

    /// Missing required argument
    #[error("Missing required argument: {argument}")]
    MissingArgument {
        /// Argument name
        argument: String,
    },

    /// Download URL template is unusable
    #[error("Invalid download URL '{template}': {reason}")]
    InvalidDownloadUrl {
        /// Template as given
        template: String,
        /// Reason for the error
        reason: String,
    },
}

impl BinderError {
    /// Get actionable recovery suggestions for this error
    pub fn recovery_suggestions(&self) -> Vec<String> {
        use crate::payload::Error as PayloadError;

        match self {
            BinderError::Payload(PayloadError::FileUnreadable { .. }) => vec![
                "Pass --recurse to harvest every file under a directory".to_string(),
            ],
            BinderError::Payload(e) if e.is_file_access() => vec![
                "Check that every payload path exists and is readable".to_string(),
                "Quote wildcard arguments so the shell does not expand them".to_string(),
            ],
            BinderError::Cli(CliError::InvalidDownloadUrl { .. }) => vec![
                "Use a template such as https://www.example.com/files/{0}".to_string(),
            ],
            BinderError::Cli(CliError::MissingArgument { argument }) => {
                vec![format!("Supply {} (see --help)", argument)]
            }
            BinderError::Relation(crate::relation::Error::InvalidAction(_)) => vec![
                "Use one of: Detect, Upgrade, Addon, Patch".to_string(),
            ],
            BinderError::Manifest(crate::manifest::Error::Write { .. }) => vec![
                "Check that the output directory is writable".to_string(),
            ],
            _ => vec!["Check the error message above for specific details".to_string()],
        }
    }
}
