//! Error types for payload resolution.
//!
//! Hard failures (a missing or unreadable input file) abort the whole
//! invocation. Missing version metadata or a missing signature is not an
//! error and never reaches this type.
//!
//! # Example
//!
//! ```no_run
//! use kodegen_bundler_payload::payload::{ErrorExt, Result};
//! use std::path::Path;
//!
//! fn read_header(path: &Path) -> Result<Vec<u8>> {
//!     std::fs::read(path).fs_context("reading payload header", path)
//! }
//! ```

use std::{
    fmt::Display,
    io,
    path::{self, PathBuf},
};
use thiserror::Error as DeriveError;

/// Errors returned while expanding and resolving payloads.
#[derive(Debug, DeriveError)]
#[non_exhaustive]
pub enum Error {
    /// Error with context. Created by the [`Context`] trait.
    #[error("{0}: {1}")]
    Context(String, Box<Self>),

    /// An explicitly named payload file does not exist.
    #[error("payload file not found: {}", path.display())]
    FileNotFound {
        /// Path as supplied
        path: PathBuf,
    },

    /// A payload file exists but cannot be read as a regular file.
    #[error("payload file unreadable {}: {reason}", path.display())]
    FileUnreadable {
        /// Offending path
        path: PathBuf,
        /// What went wrong
        reason: String,
    },

    /// File system error with path context.
    ///
    /// Created by the [`ErrorExt`] trait's `fs_context` method.
    #[error("{context} {}: {error}", path.display())]
    Fs {
        /// Operation being performed (e.g., "hashing payload")
        context: &'static str,
        /// Path that was being accessed
        path: PathBuf,
        /// The underlying I/O error
        error: io::Error,
    },

    /// Generic I/O error.
    #[error("{0}")]
    IoError(#[from] io::Error),

    /// Error walking a payload directory.
    #[error("{0}")]
    WalkdirError(#[from] walkdir::Error),

    /// Path prefix stripping error.
    #[error("{0}")]
    StripError(#[from] path::StripPrefixError),

    /// Invalid wildcard pattern in a payload argument.
    #[error("{0}")]
    GlobPattern(#[from] glob::PatternError),

    /// Wildcard expansion error.
    #[error("{0}")]
    Glob(#[from] glob::GlobError),

    /// Symbol model error while recording a payload.
    #[error(transparent)]
    Symbol(#[from] crate::symbol::Error),

    /// A resolution task was cancelled or panicked.
    #[error("payload resolution task failed: {0}")]
    Task(#[from] tokio::task::JoinError),

    /// Generic error with custom message.
    #[error("{0}")]
    GenericError(String),
}

impl Error {
    /// True for missing/unreadable input, which always aborts the invocation.
    pub fn is_file_access(&self) -> bool {
        match self {
            Error::FileNotFound { .. } | Error::FileUnreadable { .. } | Error::Fs { .. } => true,
            Error::Context(_, inner) => inner.is_file_access(),
            _ => false,
        }
    }
}

/// Convenient type alias for Result.
pub type Result<T> = std::result::Result<T, Error>;

/// Trait for adding context to errors.
///
/// Similar to `anyhow::Context` but integrated with this module's Error type.
pub trait Context<T> {
    /// Add context to an error.
    fn context<C>(self, context: C) -> Result<T>
    where
        C: Display + Send + Sync + 'static;

    /// Add context to an error using a closure (lazy evaluation).
    fn with_context<C, F>(self, f: F) -> Result<T>
    where
        C: Display + Send + Sync + 'static,
        F: FnOnce() -> C;
}

impl<T> Context<T> for Result<T> {
    fn context<C>(self, context: C) -> Result<T>
    where
        C: Display + Send + Sync + 'static,
    {
        self.map_err(|e| Error::Context(context.to_string(), Box::new(e)))
    }

    fn with_context<C, F>(self, f: F) -> Result<T>
    where
        C: Display + Send + Sync + 'static,
        F: FnOnce() -> C,
    {
        self.map_err(|e| Error::Context(f().to_string(), Box::new(e)))
    }
}

impl<T> Context<T> for Option<T> {
    fn context<C>(self, context: C) -> Result<T>
    where
        C: Display + Send + Sync + 'static,
    {
        self.ok_or_else(|| Error::GenericError(context.to_string()))
    }

    fn with_context<C, F>(self, f: F) -> Result<T>
    where
        C: Display + Send + Sync + 'static,
        F: FnOnce() -> C,
    {
        self.ok_or_else(|| Error::GenericError(f().to_string()))
    }
}

/// Extension trait for filesystem operations with automatic path context.
///
/// A `NotFound` I/O error becomes [`Error::FileNotFound`]; anything else is
/// wrapped as [`Error::Fs`] with the operation and path attached.
pub trait ErrorExt<T> {
    /// Add filesystem context to an I/O error.
    ///
    /// The `context` should be a present-tense verb phrase describing the operation,
    /// e.g., "reading payload", "hashing payload".
    fn fs_context(self, context: &'static str, path: impl Into<PathBuf>) -> Result<T>;
}

impl<T> ErrorExt<T> for std::result::Result<T, io::Error> {
    fn fs_context(self, context: &'static str, path: impl Into<PathBuf>) -> Result<T> {
        self.map_err(|error| {
            let path = path.into();
            if error.kind() == io::ErrorKind::NotFound {
                Error::FileNotFound { path }
            } else {
                Error::Fs {
                    context,
                    path,
                    error,
                }
            }
        })
    }
}

/// Macro for early return with a [`Error::GenericError`].
#[macro_export]
macro_rules! bail {
    ($msg:literal $(,)?) => {
        return Err($crate::payload::Error::GenericError(format!($msg)))
    };
    ($err:expr $(,)?) => {
        return Err($crate::payload::Error::GenericError($err.to_string()))
    };
    ($fmt:expr, $($arg:tt)*) => {
        return Err($crate::payload::Error::GenericError(format!($fmt, $($arg)*)))
    };
}
