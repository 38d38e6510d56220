/*!
 * Error types for the ttcaptions library.
 *
 * Each stage of the caption pipeline has its own error enum so callers can
 * tell a missing source apart from a broken document or a single bad
 * time expression. All of them are built with the thiserror crate.
 */

use thiserror::Error;

/// Errors raised while converting a time expression to milliseconds
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TimeExpressionError {
    /// The expression was empty or missing
    #[error("Empty time expression")]
    Empty,

    /// The expression matches neither the offset nor the clock form
    #[error("Could not parse time expression \"{0}\"")]
    Malformed(String),

    /// One of the fields is not a non-negative decimal number
    #[error("Invalid field \"{field}\" in time expression \"{expr}\"")]
    InvalidField {
        /// Full expression
        expr: String,
        /// Offending field
        field: String,
    },

    /// The value does not fit in the millisecond range
    #[error("Time expression \"{0}\" is out of range")]
    Overflow(String),
}

/// Errors that can occur while parsing a caption document
#[derive(Error, Debug)]
pub enum CaptionError {
    /// The markup could not be tokenized or walked
    #[error("Malformed caption document: {0}")]
    Structural(String),

    /// A single cue carried an unparsable time expression
    #[error("Cue {cue_index} has an invalid time expression: {source}")]
    TimeExpression {
        /// Zero-based position of the cue in the document
        cue_index: usize,
        /// Underlying conversion failure
        #[source]
        source: TimeExpressionError,
    },

    /// Reading the underlying stream failed
    #[error("I/O error while reading captions: {0}")]
    Io(String),
}

impl From<quick_xml::Error> for CaptionError {
    fn from(error: quick_xml::Error) -> Self {
        match error {
            quick_xml::Error::Io(io) => Self::Io(io.to_string()),
            other => Self::Structural(other.to_string()),
        }
    }
}

/// Errors raised by a caption byte source
#[derive(Error, Debug)]
pub enum SourceError {
    /// No locator was supplied
    #[error("Caption locator is empty")]
    EmptyLocator,

    /// The locator could not be turned into a readable stream
    #[error("Could not open caption stream: {0}")]
    CreateStreamFailed(String),

    /// Reading from an opened stream failed
    #[error("I/O error while fetching captions: {0}")]
    Io(String),

    /// The server answered with a non-success status
    #[error("Caption server responded with {status} for {url}")]
    Http {
        /// HTTP status code
        status: u16,
        /// Requested URL
        url: String,
    },
}

/// Main application error type that wraps all other errors
#[derive(Error, Debug)]
pub enum AppError {
    /// Error from a byte source
    #[error("Source error: {0}")]
    Source(#[from] SourceError),

    /// Error from document parsing
    #[error("Caption error: {0}")]
    Caption(#[from] CaptionError),

    /// Error from time expression conversion
    #[error("Time expression error: {0}")]
    TimeExpression(#[from] TimeExpressionError),

    /// Invalid configuration
    #[error("Configuration error: {0}")]
    Config(String),

    /// Any other error
    #[error("Unknown error: {0}")]
    Unknown(String),
}

impl From<anyhow::Error> for AppError {
    fn from(error: anyhow::Error) -> Self {
        Self::Unknown(error.to_string())
    }
}

impl From<std::io::Error> for AppError {
    fn from(error: std::io::Error) -> Self {
        Self::Source(SourceError::Io(error.to_string()))
    }
}
