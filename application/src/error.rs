//! [`Error`]-related definitions.

use std::fmt;

use axum::response::{IntoResponse, Response};
use derive_more::Error as StdError;
use service::{
    command::reconcile_payment,
    dialog,
    infra::database,
};
use tracerr::{Trace, Traced};
use tracing as log;

/// HTTP API [`Error`].
#[derive(Clone, Debug, StdError)]
pub struct Error {
    /// [`Error`] code.
    pub code: Code,

    /// [`http::StatusCode`] of this [`Error`].
    pub status_code: http::StatusCode,

    /// Backtrace of this [`Error`].
    #[error(not(backtrace))]
    pub backtrace: Option<Trace>,

    /// [`Error`] message.
    pub message: String,
}

impl Error {
    /// Create a new [`Error`] representing an internal server error.
    #[must_use]
    pub fn internal(msg: &impl ToString) -> Self {
        Self {
            code: "INTERNAL_SERVER_ERROR",
            status_code: http::StatusCode::INTERNAL_SERVER_ERROR,
            message: msg.to_string(),
            backtrace: None,
        }
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let Self {
            code,
            status_code: _,
            backtrace: _,
            message,
        } = self;

        write!(f, "[{code}]: {message}")
    }
}

impl IntoResponse for Error {
    fn into_response(self) -> Response {
        // Full detail stays in the logs; the wire carries the stable code
        // and a short message only.
        if self.status_code.is_server_error() {
            log::error!(
                code = self.code,
                backtrace = ?self.backtrace,
                "request failed: {}",
                self.message,
            );
        } else {
            log::warn!(code = self.code, "request rejected: {}", self.message);
        }
        (self.status_code, format!("[{}]: {}", self.code, self.message))
            .into_response()
    }
}

/// [`Error`] code.
pub type Code = &'static str;

/// Helper trait for converting types into [`Error`]s.
pub trait AsError {
    /// Tries to convert the type into an [`Error`].
    ///
    /// [`None`] is returned if the type cannot be converted into an [`Error`].
    fn try_as_error(&self) -> Option<Error>;

    /// Converts the type into an [`Error`].
    fn as_error(&self) -> Error
    where
        Self: fmt::Display,
    {
        self.try_as_error()
            .unwrap_or_else(|| Error::internal(&self))
    }

    /// Converts the type into an [`Error`] by consuming it.
    fn into_error(self) -> Error
    where
        Self: fmt::Display + Sized,
    {
        self.as_error()
    }
}

impl<E: AsError> AsError for Traced<E> {
    fn try_as_error(&self) -> Option<Error> {
        let mut error = self.as_ref().try_as_error()?;
        error.backtrace = Some(self.trace().clone());
        Some(error)
    }
}

impl AsError for database::Error {
    fn try_as_error(&self) -> Option<Error> {
        None
    }
}

impl AsError for reconcile_payment::ExecutionError {
    fn try_as_error(&self) -> Option<Error> {
        match self {
            Self::PaymentNotExists(_) => Some(Error {
                code: "PAYMENT_NOT_FOUND",
                status_code: http::StatusCode::NOT_FOUND,
                message: self.to_string(),
                backtrace: None,
            }),
            // Surfaced as a retryable failure, never a silent success.
            Self::Db(_) => None,
        }
    }
}

impl AsError for dialog::Error {
    fn try_as_error(&self) -> Option<Error> {
        match self {
            Self::Db(_)
            | Self::Register(_)
            | Self::Confirm(_)
            | Self::Payment(_)
            | Self::Contract(_)
            | Self::Sign(_)
            | Self::Annul(_)
            | Self::Review(_) => None,
        }
    }
}

#[cfg(test)]
mod spec {
    use service::{command::reconcile_payment, domain::payment};

    use super::AsError as _;

    #[test]
    fn missing_payment_maps_to_not_found() {
        let err = reconcile_payment::ExecutionError::PaymentNotExists(
            payment::Id::new(),
        );
        let error = err.as_error();
        assert_eq!(error.status_code, http::StatusCode::NOT_FOUND);
        assert_eq!(error.code, "PAYMENT_NOT_FOUND");
    }
}
