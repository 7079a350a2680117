//! Error types for the wikitext fixer.
//!
//! The rewriting engine itself never fails: every transform degrades to "leave the
//! input as it was". Errors only exist for the fallible helpers underneath those
//! transforms (fragment decoding, endpoint parsing) and for the outer layers that
//! load configuration or talk to the filesystem.
//!
//! Exported items:
//! - `FixError` - main error enum.
//! - `Result<T>` - convenient alias `std::result::Result<T, FixError>`.

use std::error::Error;
use std::fmt;

/// The canonical result type used across the crate.
pub type Result<T> = std::result::Result<T, FixError>;

/// Error kinds produced by the fixer.
///
/// - `Config` - a configuration file could not be read or understood.
/// - `Io` - wrapper for underlying I/O errors (reading input, writing output).
/// - `Decode` - percent/fragment decoding produced invalid bytes.
/// - `Url` - an endpoint or link could not be parsed as a URL.
/// - `InvalidArgument` - bad command line usage or option value.
#[derive(Debug)]
pub enum FixError {
    Config {
        msg: String,
        source: Option<Box<dyn Error + Send + Sync + 'static>>,
    },
    Io {
        msg: String,
        source: Option<Box<dyn Error + Send + Sync + 'static>>,
    },
    Decode {
        msg: String,
    },
    Url {
        msg: String,
        source: Option<Box<dyn Error + Send + Sync + 'static>>,
    },
    InvalidArgument {
        msg: String,
    },
}

impl FixError {
    /// Construct a configuration error with an optional cause.
    pub fn config<E: Error + Send + Sync + 'static>(msg: impl Into<String>, source: Option<E>) -> Self {
        FixError::Config {
            msg: msg.into(),
            source: source.map(|e| Box::new(e) as Box<dyn Error + Send + Sync>),
        }
    }

    /// Wrap a std::io::Error.
    pub fn io_err<E: Error + Send + Sync + 'static>(msg: impl Into<String>, e: E) -> Self {
        FixError::Io {
            msg: msg.into(),
            source: Some(Box::new(e)),
        }
    }

    /// Construct a decode error.
    pub fn decode<S: Into<String>>(msg: S) -> Self {
        FixError::Decode { msg: msg.into() }
    }

    /// Wrap a URL parse failure.
    pub fn url_err<E: Error + Send + Sync + 'static>(msg: impl Into<String>, e: E) -> Self {
        FixError::Url {
            msg: msg.into(),
            source: Some(Box::new(e)),
        }
    }

    /// Construct an invalid argument error.
    pub fn invalid_arg<S: Into<String>>(msg: S) -> Self {
        FixError::InvalidArgument { msg: msg.into() }
    }

    /// Returns a short, user-friendly description of the error kind.
    pub fn kind(&self) -> &'static str {
        match self {
            FixError::Config { .. } => "Config",
            FixError::Io { .. } => "Io",
            FixError::Decode { .. } => "Decode",
            FixError::Url { .. } => "Url",
            FixError::InvalidArgument { .. } => "InvalidArgument",
        }
    }

    /// If the error has an underlying source, return it (if any).
    pub fn source_opt(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            FixError::Config { source, .. }
            | FixError::Io { source, .. }
            | FixError::Url { source, .. } => source.as_ref().map(|b| b.as_ref() as &dyn Error),
            _ => None,
        }
    }
}

impl fmt::Display for FixError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FixError::Config { msg, source } => {
                if let Some(s) = source {
                    write!(f, "Config error: {} (cause: {})", msg, s)
                } else {
                    write!(f, "Config error: {}", msg)
                }
            }
            FixError::Io { msg, source } => {
                if let Some(s) = source {
                    write!(f, "IO error: {} (cause: {})", msg, s)
                } else {
                    write!(f, "IO error: {}", msg)
                }
            }
            FixError::Decode { msg } => write!(f, "Decode error: {}", msg),
            FixError::Url { msg, source } => {
                if let Some(s) = source {
                    write!(f, "URL error: {} (cause: {})", msg, s)
                } else {
                    write!(f, "URL error: {}", msg)
                }
            }
            FixError::InvalidArgument { msg } => write!(f, "Invalid argument: {}", msg),
        }
    }
}

impl Error for FixError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        self.source_opt()
    }
}

/* Common conversions to make error propagation ergonomic. */

impl From<std::io::Error> for FixError {
    fn from(e: std::io::Error) -> Self {
        FixError::io_err("I/O error", e)
    }
}

impl From<serde_json::Error> for FixError {
    fn from(e: serde_json::Error) -> Self {
        FixError::config("invalid JSON", Some(e))
    }
}

impl From<url::ParseError> for FixError {
    fn from(e: url::ParseError) -> Self {
        FixError::url_err("cannot parse URL", e)
    }
}

impl From<std::string::FromUtf8Error> for FixError {
    fn from(e: std::string::FromUtf8Error) -> Self {
        FixError::decode(format!("utf8 conversion error: {}", e))
    }
}
