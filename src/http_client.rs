use bytes::Bytes;
use http::{Request, Response};
use std::{fmt::Debug, sync::Arc};

/// Error returned by an [`HttpClient`] when no response could be obtained.
pub type HttpError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// A blocking HTTP client.
///
/// Implement this to plug in your own transport. With the `reqwest-blocking-client` or
/// `reqwest-blocking-client-rustls` feature it is implemented for `reqwest::blocking::Client`.
///
/// Implementations return `Ok` for every response they receive, regardless of the status code.
/// `Err` is reserved for transport failures like connection, DNS or TLS errors.
/// Redirects should be followed by the implementation, as `reqwest` does by default.
pub trait HttpClient: Debug + Send + Sync {
    /// Send the request and wait for the full response.
    fn send(&self, request: Request<Vec<u8>>) -> Result<Response<Bytes>, HttpError>;
}

impl<C: HttpClient + ?Sized> HttpClient for Arc<C> {
    fn send(&self, request: Request<Vec<u8>>) -> Result<Response<Bytes>, HttpError> {
        (**self).send(request)
    }
}

impl<C: HttpClient + ?Sized> HttpClient for &C {
    fn send(&self, request: Request<Vec<u8>>) -> Result<Response<Bytes>, HttpError> {
        (**self).send(request)
    }
}

#[cfg(feature = "reqwest")]
mod reqwest {
    use super::{Bytes, HttpClient, HttpError, Request, Response};

    impl HttpClient for reqwest::blocking::Client {
        fn send(&self, request: Request<Vec<u8>>) -> Result<Response<Bytes>, HttpError> {
            let request: reqwest::blocking::Request = request.try_into()?;
            let response = self.execute(request)?;
            let status = response.status();
            let headers = response.headers().clone();
            let mut result = Response::new(response.bytes()?);
            *result.status_mut() = status;
            *result.headers_mut() = headers;
            Ok(result)
        }
    }
}
