use crate::status::ExpectationFailure;

/// Boxed error returned by decode functions handed to [`Response::parse`](crate::Response::parse).
pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

pub type Result<T, E = Error> = std::result::Result<T, E>;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// A structured decoder failed. `content` holds the body text mirrored up to the failure.
    #[error("{parser} parse error: {source}\nreceived content: {content}")]
    Parse {
        parser: &'static str,
        source: BoxError,
        content: String,
    },

    #[error("Shape error: expected {expected}: {message}")]
    Shape { expected: String, message: String },

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Transport error: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("Serialization error: {0}")]
    Serialize(#[from] serde_json::Error),

    #[error("Status assertion failed: {0}")]
    Assertion(ExpectationFailure),
}

impl Error {
    /// Returns the expectation failure carried by an assertion error.
    pub fn expectation(&self) -> Option<&ExpectationFailure> {
        match self {
            Error::Assertion(failure) => Some(failure),
            _ => None,
        }
    }

    /// Returns true when this parse error was caused by cancellation.
    pub fn is_cancelled(&self) -> bool {
        match self {
            Error::Parse { source, .. } => source.is::<Cancelled>(),
            _ => false,
        }
    }
}

/// Source of a [`Error::Parse`] raised because the cancellation token fired mid-parse.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
#[error("operation cancelled")]
pub struct Cancelled;
