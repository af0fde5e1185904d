//! Google Analytics Measurement Protocol.

use crate::{
    event::{Properties, PropValue, PAGEVIEW},
    log_sink::LogSink,
    Adapter, AdapterState, Error, ErrorKind, Event, HttpCaller, HttpClient, ResponseBody,
};
use http::{HeaderMap, HeaderName, HeaderValue, Method};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// Measurement Protocol collection endpoint.
pub const ENDPOINT: &str = "https://www.google-analytics.com/collect";
/// Measurement Protocol validation endpoint. Hits sent here are checked but not recorded.
pub const DEBUG_ENDPOINT: &str = "https://www.google-analytics.com/debug/collect";

const PROTOCOL_VERSION: u8 = 1;
const HIT_TYPE_EVENT: &str = "event";

/// One Measurement Protocol hit. Absent values are not sent.
#[derive(Debug, Serialize)]
struct Hit<'a> {
    #[serde(rename = "v")]
    version: u8,
    #[serde(rename = "tid")]
    tracking_id: &'a str,
    #[serde(rename = "cid")]
    client_id: &'a str,
    #[serde(rename = "t")]
    hit_type: &'a str,
    #[serde(rename = "ec", skip_serializing_if = "Option::is_none")]
    category: Option<String>,
    #[serde(rename = "ea", skip_serializing_if = "Option::is_none")]
    action: Option<String>,
    #[serde(rename = "el", skip_serializing_if = "Option::is_none")]
    label: Option<&'a str>,
    #[serde(rename = "ev", skip_serializing_if = "Option::is_none")]
    value: Option<i64>,
    #[serde(rename = "dh", skip_serializing_if = "Option::is_none")]
    document_host: Option<String>,
    #[serde(rename = "dp", skip_serializing_if = "Option::is_none")]
    document_path: Option<String>,
    #[serde(rename = "dt", skip_serializing_if = "Option::is_none")]
    document_title: Option<String>,
    #[serde(rename = "uip", skip_serializing_if = "Option::is_none")]
    client_ip: Option<&'a str>,
    #[serde(rename = "ua", skip_serializing_if = "Option::is_none")]
    user_agent: Option<&'a str>,
    #[serde(rename = "sr", skip_serializing_if = "Option::is_none")]
    screen_resolution: Option<String>,
    #[serde(rename = "vp", skip_serializing_if = "Option::is_none")]
    viewport_size: Option<String>,
    #[serde(rename = "dr", skip_serializing_if = "Option::is_none")]
    referrer: Option<String>,
    #[serde(rename = "cd1", skip_serializing_if = "Option::is_none")]
    account: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ValidationResponse {
    hit_parsing_result: Vec<HitParsingResult>,
}

#[derive(Debug, Deserialize)]
struct HitParsingResult {
    valid: bool,
}

/// Google Analytics (Universal Analytics Measurement Protocol v1).
///
/// Page views are sent as `pageview` hits. Every other event type becomes an `event` hit with
/// the type as event action.
///
/// Properties read from the event:
///
/// | Property         | Parameter |
/// | ---------------- | --------- |
/// | `category`       | `ec`      |
/// | `documentTitle`  | `dt`      |
/// | `screenWidth` + `screenHeight` | `sr` |
/// | `viewportSize`   | `vp`      |
/// | `referrer`       | `dr`      |
/// | `account`        | `cd1`     |
#[derive(Debug)]
pub struct GoogleAnalytics<C> {
    caller: HttpCaller<C>,
    state: AdapterState,
    tracking_id: String,
    client_id: String,
    debug_mode: bool,
}

impl<C> GoogleAnalytics<C> {
    /// Create an adapter for the property `tracking_id` (e.g. `UA-XXXXX-Y`), reporting hits for
    /// the anonymous client `client_id`.
    pub fn new(tracking_id: impl Into<String>, client_id: impl Into<String>, client: C) -> Self {
        Self {
            caller: HttpCaller::new(client, ENDPOINT),
            state: AdapterState::default(),
            tracking_id: tracking_id.into(),
            client_id: client_id.into(),
            debug_mode: false,
        }
    }

    /// Send hits to a different collection endpoint.
    pub fn with_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.caller.set_endpoint(endpoint);
        self
    }

    /// Send hits to the validation endpoint and report whether Google considered them valid.
    ///
    /// A custom endpoint set with [`with_endpoint`](Self::with_endpoint) is kept either way.
    ///
    /// Default: `false`
    pub fn with_debug_mode(mut self, debug_mode: bool) -> Self {
        let endpoint = self.caller.endpoint();
        if endpoint == ENDPOINT || endpoint == DEBUG_ENDPOINT {
            self.caller
                .set_endpoint(if debug_mode { DEBUG_ENDPOINT } else { ENDPOINT });
        }
        self.debug_mode = debug_mode;
        self
    }

    /// Send `value` for header `name` with every hit.
    pub fn with_header(mut self, name: HeaderName, value: HeaderValue) -> Self {
        self.caller.headers_mut().insert(name, value);
        self
    }

    /// Report failures to `log_sink` instead of the `log` crate.
    pub fn with_log_sink(mut self, log_sink: impl LogSink + 'static) -> Self {
        self.state.log_sink = Arc::new(log_sink);
        self
    }

    /// Set the IP address of the end user.
    pub fn with_client_ip(mut self, client_ip: impl Into<String>) -> Self {
        self.state.client_ip = Some(client_ip.into());
        self
    }

    /// Set the user agent of the end user.
    pub fn with_user_agent(mut self, user_agent: impl Into<String>) -> Self {
        self.state.user_agent = user_agent.into();
        self
    }

    /// Tracking ID of the Google Analytics property.
    pub fn tracking_id(&self) -> &str {
        &self.tracking_id
    }

    /// Anonymous client ID.
    pub fn client_id(&self) -> &str {
        &self.client_id
    }

    /// Whether hits are validated instead of recorded.
    pub fn is_debug_mode(&self) -> bool {
        self.debug_mode
    }

    /// Current collection endpoint.
    pub fn endpoint(&self) -> &str {
        self.caller.endpoint()
    }

    fn hit<'a>(&'a self, event: &'a Event) -> Result<Hit<'a>, ErrorKind> {
        let url = event.validate()?;

        let mut props = event.props().clone();
        let hit_type = if event.is_pageview() {
            PAGEVIEW
        } else {
            props.insert("action".into(), event.kind().into());
            HIT_TYPE_EVENT
        };

        if let Some(resolution) = screen_resolution(&props) {
            props.insert("screenResolution".into(), resolution.into());
        }

        Ok(Hit {
            version: PROTOCOL_VERSION,
            tracking_id: &self.tracking_id,
            client_id: &self.client_id,
            hit_type,
            category: prop(&props, "category"),
            action: prop(&props, "action"),
            label: non_empty(event.name()),
            value: event.value(),
            document_host: url.host_str().and_then(non_empty).map(Into::into),
            document_path: non_empty(url.path()).map(Into::into),
            document_title: prop(&props, "documentTitle"),
            client_ip: self.state.client_ip().and_then(non_empty),
            user_agent: non_empty(self.state.user_agent()),
            screen_resolution: prop(&props, "screenResolution"),
            viewport_size: prop(&props, "viewportSize"),
            referrer: prop(&props, "referrer"),
            account: prop(&props, "account"),
        })
    }
}

impl<C: HttpClient> Adapter for GoogleAnalytics<C> {
    fn name(&self) -> &'static str {
        "Google Analytics"
    }

    fn state(&self) -> &AdapterState {
        &self.state
    }

    fn state_mut(&mut self) -> &mut AdapterState {
        &mut self.state
    }

    fn send(&self, event: &Event) -> Result<bool, Error> {
        if !self.state.enabled {
            return Ok(false);
        }

        let hit = self.hit(event)?;
        let body = self.caller.call(Method::POST, "", HeaderMap::new(), &hit)?;

        if self.debug_mode {
            return Ok(is_valid_hit(body)?);
        }
        Ok(true)
    }
}

fn is_valid_hit(body: ResponseBody) -> Result<bool, ErrorKind> {
    let response: ValidationResponse = match body {
        ResponseBody::Json(value) => serde_json::from_value(value),
        ResponseBody::Text(text) => serde_json::from_str(&text),
    }
    .map_err(ErrorKind::Parse)?;
    Ok(response
        .hit_parsing_result
        .first()
        .map_or(false, |result| result.valid))
}

fn screen_resolution(props: &Properties) -> Option<String> {
    let width = props.get("screenWidth").filter(|v| !v.is_empty())?;
    let height = props.get("screenHeight").filter(|v| !v.is_empty())?;
    Some(format!("{}x{}", width, height))
}

fn prop(props: &Properties, key: &str) -> Option<String> {
    props
        .get(key)
        .filter(|v| !v.is_empty())
        .map(PropValue::to_string)
}

fn non_empty(value: &str) -> Option<&str> {
    Some(value).filter(|v| !v.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::{json, Value};

    #[derive(Debug)]
    struct Unreachable;

    impl HttpClient for Unreachable {
        fn send(
            &self,
            _request: http::Request<Vec<u8>>,
        ) -> Result<http::Response<bytes::Bytes>, crate::HttpError> {
            Err("no network in unit tests".into())
        }
    }

    fn adapter() -> GoogleAnalytics<Unreachable> {
        GoogleAnalytics::new("UA-123-1", "555", Unreachable)
    }

    fn hit_json(adapter: &GoogleAnalytics<Unreachable>, event: &Event) -> Value {
        serde_json::to_value(adapter.hit(event).unwrap()).unwrap()
    }

    #[test]
    fn custom_event_becomes_event_hit() {
        let event = Event::new("click", "https://example.com/pricing");
        let hit = hit_json(&adapter(), &event);
        assert_eq!(json!("event"), hit["t"]);
        assert_eq!(json!("click"), hit["ea"]);
        assert!(event.props().is_empty(), "caller's event is not modified");
    }

    #[test]
    fn pageview_has_no_action() {
        let hit = hit_json(&adapter(), &Event::pageview("https://example.com/"));
        assert_eq!(json!("pageview"), hit["t"]);
        assert!(hit.get("ea").is_none());
    }

    #[test]
    fn screen_resolution_needs_both_dimensions() {
        let event = Event::pageview("https://example.com/")
            .with_prop("screenWidth", 1024)
            .with_prop("screenHeight", 768);
        assert_eq!(json!("1024x768"), hit_json(&adapter(), &event)["sr"]);

        let event = Event::pageview("https://example.com/").with_prop("screenWidth", 1024);
        assert!(hit_json(&adapter(), &event).get("sr").is_none());
    }

    #[test]
    fn empty_values_are_omitted() {
        let event = Event::pageview("https://example.com/")
            .with_prop("documentTitle", "")
            .with_prop("referrer", "");
        let hit = hit_json(&adapter().with_user_agent("").with_client_ip(""), &event);
        let mut keys: Vec<_> = hit.as_object().unwrap().keys().cloned().collect();
        keys.sort();
        assert_eq!(vec!["cid", "dh", "dp", "t", "tid", "v"], keys);
    }

    #[test]
    fn account_becomes_custom_dimension() {
        let event = Event::pageview("https://example.com/").with_prop("account", "acme");
        assert_eq!(json!("acme"), hit_json(&adapter(), &event)["cd1"]);
    }

    #[test]
    fn debug_mode_switches_endpoint() {
        let adapter = adapter().with_debug_mode(true);
        assert!(adapter.is_debug_mode());
        assert_eq!(DEBUG_ENDPOINT, adapter.endpoint());
        assert_eq!(ENDPOINT, adapter.with_debug_mode(false).endpoint());
    }

    #[test]
    fn debug_mode_keeps_custom_endpoint() {
        let adapter = adapter()
            .with_endpoint("https://proxy.example.com/collect")
            .with_debug_mode(true);
        assert!(adapter.is_debug_mode());
        assert_eq!("https://proxy.example.com/collect", adapter.endpoint());
        let adapter = adapter.with_debug_mode(false);
        assert_eq!("https://proxy.example.com/collect", adapter.endpoint());
    }

    #[test]
    fn validation_response() {
        let valid = json!({"hitParsingResult": [{"valid": true, "hit": "/debug/collect"}]});
        assert!(is_valid_hit(ResponseBody::Json(valid)).unwrap());
        let invalid = r#"{"hitParsingResult": [{"valid": false}]}"#;
        assert!(!is_valid_hit(ResponseBody::Text(invalid.into())).unwrap());
        assert!(!is_valid_hit(ResponseBody::Json(json!({"hitParsingResult": []}))).unwrap());
        assert!(matches!(
            is_valid_hit(ResponseBody::Text("<html>".into())),
            Err(ErrorKind::Parse(_))
        ));
    }

    #[test]
    fn transport_failure_is_reported_not_raised() {
        let _ = env_logger::builder().is_test(true).try_init();
        let adapter = adapter();
        assert!(!adapter.create_event(&Event::pageview("https://example.com/")));
        let err = adapter.send(&Event::pageview("https://example.com/")).unwrap_err();
        assert_eq!("TransportError", err.kind().name());
    }
}
