use std::borrow::Cow;
use std::fmt::{self, Display};

/// The kind of error that occurred.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// The argument provided to the tool was invalid.
    InvalidInput,
    /// An expression could not be evaluated.
    Evaluation,
    /// A knowledge lookup failed or found nothing.
    Lookup,
    /// Error occurred while executing the tool.
    ExecutionError,
    /// The tool did not finish in time.
    Timeout,
}

impl Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ErrorKind::InvalidInput => write!(f, "Invalid input"),
            ErrorKind::Evaluation => write!(f, "Evaluation error"),
            ErrorKind::Lookup => write!(f, "Lookup error"),
            ErrorKind::ExecutionError => write!(f, "Execution error"),
            ErrorKind::Timeout => write!(f, "Timed out"),
        }
    }
}

/// Describes a tool call error.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct Error {
    kind: ErrorKind,
    reason: Option<String>,
}

impl Error {
    #[inline]
    fn with_kind(kind: ErrorKind) -> Self {
        Self { kind, reason: None }
    }

    /// Creates a new error with the `InvalidInput` kind.
    #[inline]
    pub fn invalid_input() -> Self {
        Self::with_kind(ErrorKind::InvalidInput)
    }

    /// Creates a new error with the `Evaluation` kind.
    #[inline]
    pub fn evaluation() -> Self {
        Self::with_kind(ErrorKind::Evaluation)
    }

    /// Creates a new error with the `Lookup` kind.
    #[inline]
    pub fn lookup() -> Self {
        Self::with_kind(ErrorKind::Lookup)
    }

    /// Creates a new error with the `ExecutionError` kind.
    #[inline]
    pub fn execution_error() -> Self {
        Self::with_kind(ErrorKind::ExecutionError)
    }

    /// Creates a new error with the `Timeout` kind.
    #[inline]
    pub fn timeout() -> Self {
        Self::with_kind(ErrorKind::Timeout)
    }

    /// Attaches a reason to the error.
    #[inline]
    pub fn with_reason<S: Into<String>>(self, reason: S) -> Self {
        Self {
            kind: self.kind,
            reason: Some(reason.into()),
        }
    }

    /// Returns the kind of the error.
    #[inline]
    pub fn kind(&self) -> ErrorKind {
        self.kind
    }

    /// Returns the reason for the error.
    #[inline]
    pub fn reason(&self) -> Cow<'_, str> {
        match self.reason.as_deref() {
            Some(reason) => Cow::Borrowed(reason),
            None => Cow::Owned(format!("{}", self.kind)),
        }
    }
}

impl Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.reason {
            Some(reason) => write!(f, "{}: {reason}", self.kind),
            None => write!(f, "{}", self.kind),
        }
    }
}

impl std::error::Error for Error {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_reason_and_display() {
        let err = Error::lookup();
        assert_eq!(err.kind(), ErrorKind::Lookup);
        assert_eq!(err.reason(), "Lookup error");
        assert_eq!(err.to_string(), "Lookup error");

        let err = Error::evaluation().with_reason("division by zero");
        assert_eq!(err.reason(), "division by zero");
        assert_eq!(err.to_string(), "Evaluation error: division by zero");
    }
}
