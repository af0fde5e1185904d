use crate::{call::ResponseBody, http_client::HttpError};
use std::{fmt, panic::Location};

/// A failure while sending an event, together with the place in this crate where it was raised.
///
/// Most callers never see this type: [`Adapter::create_event`](crate::Adapter::create_event)
/// logs it and returns `false`. It is returned by [`Adapter::send`](crate::Adapter::send) and
/// [`HttpCaller::call`](crate::HttpCaller::call).
#[derive(Debug)]
pub struct Error {
    kind: ErrorKind,
    location: &'static Location<'static>,
}

impl Error {
    /// What went wrong.
    pub fn kind(&self) -> &ErrorKind {
        &self.kind
    }

    /// Source location where the error was raised.
    pub fn location(&self) -> &'static Location<'static> {
        self.location
    }

    /// HTTP status code, if the backend responded with an error status.
    pub fn status(&self) -> Option<u16> {
        match self.kind {
            ErrorKind::Http { status, .. } => Some(status),
            _ => None,
        }
    }
}

impl From<ErrorKind> for Error {
    #[track_caller]
    fn from(kind: ErrorKind) -> Self {
        Self {
            kind,
            location: Location::caller(),
        }
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&self.kind, f)
    }
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        std::error::Error::source(&self.kind)
    }
}

/// Kinds of failures.
#[derive(thiserror::Error, Debug)]
#[non_exhaustive]
pub enum ErrorKind {
    /// Could not complete the HTTP request. No response was received.
    #[error("sending request failed with {0}")]
    Transport(#[source] HttpError),

    /// The backend responded with a status code of 400 or above.
    #[error("request failed with status {status}: {body}")]
    Http {
        /// Response status code
        status: u16,
        /// Decoded response body, or the raw text if it could not be decoded
        body: ResponseBody,
    },

    /// Request parameters failed to serialize. Nothing was sent.
    #[error("encoding request body failed with {0}")]
    Encoding(#[source] serde_json::Error),

    /// The response claimed to be JSON but could not be decoded.
    #[error("decoding response body failed with {0}")]
    Parse(#[source] serde_json::Error),

    /// The event is missing required fields or has an unusable URL. Nothing was sent.
    #[error("invalid event: {0}")]
    InvalidEvent(String),

    /// A header value contains characters that are not allowed in HTTP headers.
    #[error("invalid header value: {0}")]
    InvalidHeader(#[source] http::header::InvalidHeaderValue),

    /// The request could not be built, e.g. because the target URL is invalid.
    #[error("building request failed with {0}")]
    InvalidRequest(#[source] http::Error),
}

impl ErrorKind {
    /// Name of the failure class, as written to the logs.
    pub fn name(&self) -> &'static str {
        match self {
            ErrorKind::Transport(_) => "TransportError",
            ErrorKind::Http { .. } => "HttpError",
            ErrorKind::Encoding(_) => "EncodingError",
            ErrorKind::Parse(_) => "ParseError",
            ErrorKind::InvalidEvent(_) => "InvalidEventError",
            ErrorKind::InvalidHeader(_) => "InvalidHeaderError",
            ErrorKind::InvalidRequest(_) => "InvalidRequestError",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fail() -> Result<(), Error> {
        Err(ErrorKind::InvalidEvent("boom".into()))?;
        Ok(())
    }

    #[test]
    fn records_location_of_question_mark() {
        let err = fail().unwrap_err();
        assert!(err.location().file().ends_with("error.rs"));
        assert_eq!("InvalidEventError", err.kind().name());
        assert_eq!("invalid event: boom", err.to_string());
        assert_eq!(None, err.status());
    }

    #[test]
    fn http_error_carries_status() {
        let err = Error::from(ErrorKind::Http {
            status: 404,
            body: ResponseBody::Text("not found".into()),
        });
        assert_eq!(Some(404), err.status());
        assert_eq!("request failed with status 404: not found", err.to_string());
    }
}
