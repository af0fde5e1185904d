use crate::{
    encode::{
        flatten, form_urlencode, media_type, multipart_boundary, multipart_encode, BodyEncoding,
        APPLICATION_JSON, FORM_URLENCODED, MULTIPART_FORM_DATA,
    },
    Error, ErrorKind, HttpClient,
};
use bytes::Bytes;
use http::{
    header::{CONTENT_TYPE, USER_AGENT},
    HeaderMap, HeaderValue, Method, Request,
};
use log::debug;
use serde::{ser::Error as _, Serialize};
use serde_json::{Map, Value};
use std::{fmt, sync::Arc};

/// User agent sent when neither the adapter nor the call sets one.
pub const DEFAULT_USER_AGENT: &str = concat!("analytics-dispatch/", env!("CARGO_PKG_VERSION"));

/// Decoded response body.
#[derive(Debug, Clone, PartialEq)]
pub enum ResponseBody {
    /// The response declared `Content-Type: application/json`.
    Json(Value),
    /// Any other response, as text.
    Text(String),
}

impl ResponseBody {
    /// The decoded JSON value, if the response was JSON.
    pub fn as_json(&self) -> Option<&Value> {
        match self {
            ResponseBody::Json(value) => Some(value),
            ResponseBody::Text(_) => None,
        }
    }

    /// The raw text, if the response was not JSON.
    pub fn as_text(&self) -> Option<&str> {
        match self {
            ResponseBody::Json(_) => None,
            ResponseBody::Text(text) => Some(text),
        }
    }
}

impl fmt::Display for ResponseBody {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ResponseBody::Json(value) => write!(f, "{}", value),
            ResponseBody::Text(text) => f.write_str(text),
        }
    }
}

/// A response that passed status classification.
#[derive(Debug, Clone, PartialEq)]
pub struct CallResponse {
    /// Status code, always below 400.
    pub status: u16,
    /// Response headers. Names are lower case.
    pub headers: HeaderMap,
    /// Decoded body.
    pub body: ResponseBody,
}

/// Executes API calls against a fixed endpoint.
///
/// Every call merges the default headers with the per-call headers (per-call wins), encodes the
/// parameters according to the effective `Content-Type`, and decodes the response.
///
/// | `Content-Type`        | Body                                      |
/// | --------------------- | ----------------------------------------- |
/// | `application/json`    | JSON                                      |
/// | `multipart/form-data` | form fields with bracketed keys (`a[b]`)  |
/// | anything else / unset | `application/x-www-form-urlencoded`       |
///
/// `GET` requests send no body; their parameters go into the query string.
pub struct HttpCaller<C> {
    client: Arc<C>,
    endpoint: String,
    headers: HeaderMap,
}

impl<C: fmt::Debug> fmt::Debug for HttpCaller<C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HttpCaller")
            .field("client", &self.client)
            .field("endpoint", &self.endpoint)
            .field("headers", &self.headers)
            .finish()
    }
}

impl<C> HttpCaller<C> {
    /// Create a caller for relative paths under `endpoint`.
    pub fn new(client: C, endpoint: impl Into<String>) -> Self {
        Self {
            client: Arc::new(client),
            endpoint: endpoint.into(),
            headers: HeaderMap::new(),
        }
    }

    /// Base URL relative paths are appended to.
    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    /// Replace the base URL.
    pub fn set_endpoint(&mut self, endpoint: impl Into<String>) {
        self.endpoint = endpoint.into();
    }

    /// Headers sent with every call unless overridden.
    pub fn headers(&self) -> &HeaderMap {
        &self.headers
    }

    /// Mutable access to the default headers.
    pub fn headers_mut(&mut self) -> &mut HeaderMap {
        &mut self.headers
    }

    /// The underlying HTTP client.
    pub fn client(&self) -> &C {
        &self.client
    }
}

impl<C: HttpClient> HttpCaller<C> {
    /// Make an API call and return the decoded response body.
    ///
    /// `path` is appended to the endpoint unless it is an absolute URL. `params` must serialize
    /// to a map, or to nothing (`()`, `None`).
    pub fn call<P: Serialize + ?Sized>(
        &self,
        method: Method,
        path: &str,
        headers: HeaderMap,
        params: &P,
    ) -> Result<ResponseBody, Error> {
        Ok(self.execute(method, path, headers, params)?.body)
    }

    /// Like [`call`](Self::call), but also return status and headers.
    pub fn execute<P: Serialize + ?Sized>(
        &self,
        method: Method,
        path: &str,
        headers: HeaderMap,
        params: &P,
    ) -> Result<CallResponse, Error> {
        let mut headers = merge_headers(&self.headers, headers);
        let params = to_params(params)?;

        let content_type = headers
            .get(CONTENT_TYPE)
            .and_then(|value| value.to_str().ok())
            .filter(|value| !value.is_empty());
        let has_content_type = content_type.is_some();
        let encoding = BodyEncoding::from_content_type(content_type);

        let mut target = if path.contains("://") {
            path.to_string()
        } else {
            format!("{}{}", self.endpoint, path)
        };

        let body = if method == Method::GET {
            let flat = flatten(&params);
            if !flat.is_empty() {
                target.push(if target.contains('?') { '&' } else { '?' });
                target.push_str(&form_urlencode(&flat));
            }
            Vec::new()
        } else {
            match encoding {
                BodyEncoding::Json => serde_json::to_vec(&params).map_err(ErrorKind::Encoding)?,
                BodyEncoding::Multipart => {
                    let boundary = multipart_boundary();
                    let content_type = format!("{}; boundary={}", MULTIPART_FORM_DATA, boundary);
                    let content_type =
                        HeaderValue::from_str(&content_type).map_err(ErrorKind::InvalidHeader)?;
                    headers.insert(CONTENT_TYPE, content_type);
                    multipart_encode(&flatten(&params), &boundary)
                }
                BodyEncoding::Form => {
                    if !has_content_type {
                        headers.insert(CONTENT_TYPE, HeaderValue::from_static(FORM_URLENCODED));
                    }
                    form_urlencode(&flatten(&params)).into_bytes()
                }
            }
        };

        let mut request = Request::builder()
            .method(method.clone())
            .uri(target.as_str())
            .body(body)
            .map_err(ErrorKind::InvalidRequest)?;
        *request.headers_mut() = headers;

        debug!("{} {}", method, target);
        let response = self.client.send(request).map_err(ErrorKind::Transport)?;
        let (parts, bytes) = response.into_parts();
        let status = parts.status.as_u16();
        debug!("{} {} responded with {}", method, target, status);

        let is_json = parts
            .headers
            .get(CONTENT_TYPE)
            .and_then(|value| value.to_str().ok())
            .map_or(false, |value| {
                media_type(value).eq_ignore_ascii_case(APPLICATION_JSON)
            });

        if status >= 400 {
            let body = if is_json {
                decode_json(&bytes).unwrap_or_else(|_| decode_text(&bytes))
            } else {
                decode_text(&bytes)
            };
            return Err(Error::from(ErrorKind::Http { status, body }));
        }

        let body = if is_json {
            decode_json(&bytes).map_err(ErrorKind::Parse)?
        } else {
            decode_text(&bytes)
        };

        Ok(CallResponse {
            status,
            headers: parts.headers,
            body,
        })
    }
}

fn merge_headers(defaults: &HeaderMap, overrides: HeaderMap) -> HeaderMap {
    let mut headers = defaults.clone();
    // Extending replaces all values of keys present in `overrides`.
    headers.extend(overrides);
    if !headers.contains_key(USER_AGENT) {
        headers.insert(USER_AGENT, HeaderValue::from_static(DEFAULT_USER_AGENT));
    }
    headers
}

fn to_params<P: Serialize + ?Sized>(params: &P) -> Result<Map<String, Value>, ErrorKind> {
    match serde_json::to_value(params).map_err(ErrorKind::Encoding)? {
        Value::Object(map) => Ok(map),
        Value::Null => Ok(Map::new()),
        other => Err(ErrorKind::Encoding(serde_json::Error::custom(format!(
            "request parameters must serialize to a map, got {}",
            other
        )))),
    }
}

fn decode_json(bytes: &Bytes) -> Result<ResponseBody, serde_json::Error> {
    if bytes.iter().all(u8::is_ascii_whitespace) {
        return Ok(ResponseBody::Json(Value::Null));
    }
    serde_json::from_slice(bytes).map(ResponseBody::Json)
}

fn decode_text(bytes: &Bytes) -> ResponseBody {
    ResponseBody::Text(String::from_utf8_lossy(bytes).into_owned())
}

#[cfg(test)]
mod tests {
    use super::*;
    use http::header::AUTHORIZATION;

    #[test]
    fn per_call_headers_win() {
        let mut defaults = HeaderMap::new();
        defaults.insert(CONTENT_TYPE, HeaderValue::from_static("text/plain"));
        defaults.insert(AUTHORIZATION, HeaderValue::from_static("Bearer a"));
        let mut overrides = HeaderMap::new();
        overrides.insert("content-type", HeaderValue::from_static(APPLICATION_JSON));

        let merged = merge_headers(&defaults, overrides);
        assert_eq!(APPLICATION_JSON, merged[CONTENT_TYPE]);
        assert_eq!("Bearer a", merged[AUTHORIZATION]);
        assert_eq!(DEFAULT_USER_AGENT, merged[USER_AGENT]);
    }

    #[test]
    fn params_must_be_a_map() {
        assert!(to_params(&()).unwrap().is_empty());
        assert!(to_params(&Option::<u8>::None).unwrap().is_empty());
        assert!(matches!(to_params(&[1, 2]), Err(ErrorKind::Encoding(_))));
        assert!(matches!(to_params("text"), Err(ErrorKind::Encoding(_))));
    }

    #[test]
    fn decode_empty_json_body() {
        assert_eq!(
            ResponseBody::Json(Value::Null),
            decode_json(&Bytes::from_static(b" \n")).unwrap()
        );
        assert!(decode_json(&Bytes::from_static(b"<html>")).is_err());
    }

    #[test]
    fn response_body_display() {
        assert_eq!(
            r#"{"x":1}"#,
            ResponseBody::Json(serde_json::json!({"x": 1})).to_string()
        );
        assert_eq!("oops", ResponseBody::Text("oops".into()).to_string());
    }
}
