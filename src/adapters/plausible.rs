//! Plausible Events API.

use crate::{
    event::{PropValue, Properties},
    log_sink::LogSink,
    Adapter, AdapterState, Error, ErrorKind, Event, HttpCaller, HttpClient,
};
use http::{
    header::{AUTHORIZATION, CONTENT_TYPE, USER_AGENT},
    HeaderMap, HeaderName, HeaderValue, Method,
};
use serde::Serialize;
use std::sync::Arc;

/// Plausible API base URL.
pub const ENDPOINT: &str = "https://plausible.io/api";

const GOALS_PATH: &str = "/v1/sites/goals";
const EVENT_PATH: &str = "/event";
const X_FORWARDED_FOR: &str = "x-forwarded-for";

#[derive(Debug, Serialize)]
struct Goal<'a> {
    site_id: &'a str,
    goal_type: &'static str,
    event_name: &'a str,
}

#[derive(Debug, Serialize)]
struct PlausibleEvent<'a> {
    url: &'a str,
    props: &'a Properties,
    domain: &'a str,
    name: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    referrer: Option<&'a PropValue>,
    #[serde(skip_serializing_if = "Option::is_none")]
    screen_width: Option<&'a PropValue>,
}

/// Plausible Analytics.
///
/// Before each event the matching goal is created through the Sites API, which requires an API
/// key with the `sites:provision:*` scope. Creating a goal that already exists is a no-op on the
/// Plausible side. If goal creation fails the event is not sent.
#[derive(Debug)]
pub struct Plausible<C> {
    caller: HttpCaller<C>,
    state: AdapterState,
    domain: String,
    api_key: String,
}

impl<C> Plausible<C> {
    /// Create an adapter for the site `domain`.
    ///
    /// `user_agent` and `client_ip` belong to the end user. Plausible derives unique visitors
    /// from them.
    pub fn new(
        domain: impl Into<String>,
        api_key: impl Into<String>,
        user_agent: impl Into<String>,
        client_ip: impl Into<String>,
        client: C,
    ) -> Self {
        Self {
            caller: HttpCaller::new(client, ENDPOINT),
            state: AdapterState {
                client_ip: Some(client_ip.into()),
                user_agent: user_agent.into(),
                ..AdapterState::default()
            },
            domain: domain.into(),
            api_key: api_key.into(),
        }
    }

    /// Use a self-hosted Plausible instance, e.g. `https://plausible.example.com/api`.
    pub fn with_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.caller.set_endpoint(endpoint);
        self
    }

    /// Report failures to `log_sink` instead of the `log` crate.
    pub fn with_log_sink(mut self, log_sink: impl LogSink + 'static) -> Self {
        self.state.log_sink = Arc::new(log_sink);
        self
    }

    /// Send `value` for header `name` with every request.
    ///
    /// Headers the adapter sets on a request itself, like `Content-Type`, take precedence.
    pub fn with_header(mut self, name: HeaderName, value: HeaderValue) -> Self {
        self.caller.headers_mut().insert(name, value);
        self
    }

    /// Site the events belong to.
    pub fn domain(&self) -> &str {
        &self.domain
    }

    /// Current API base URL.
    pub fn endpoint(&self) -> &str {
        self.caller.endpoint()
    }
}

impl<C: HttpClient> Plausible<C> {
    fn provision_goal(&self, event_name: &str) -> Result<(), Error> {
        let mut authorization = HeaderValue::from_str(&format!("Bearer {}", self.api_key))
            .map_err(ErrorKind::InvalidHeader)?;
        authorization.set_sensitive(true);

        let mut headers = HeaderMap::new();
        headers.insert(
            CONTENT_TYPE,
            HeaderValue::from_static("application/x-www-form-urlencoded"),
        );
        headers.insert(AUTHORIZATION, authorization);

        let goal = Goal {
            site_id: &self.domain,
            goal_type: "event",
            event_name,
        };
        self.caller.call(Method::PUT, GOALS_PATH, headers, &goal)?;
        Ok(())
    }

    fn headers(&self) -> Result<HeaderMap, ErrorKind> {
        let mut headers = HeaderMap::new();
        if let Some(client_ip) = self.state.client_ip() {
            headers.insert(
                X_FORWARDED_FOR,
                HeaderValue::from_str(client_ip).map_err(ErrorKind::InvalidHeader)?,
            );
        }
        headers.insert(
            USER_AGENT,
            HeaderValue::from_str(self.state.user_agent()).map_err(ErrorKind::InvalidHeader)?,
        );
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        Ok(headers)
    }
}

impl<C: HttpClient> Adapter for Plausible<C> {
    fn name(&self) -> &'static str {
        "Plausible"
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

        event.validate()?;
        let headers = self.headers()?;
        self.provision_goal(event.kind())?;

        let body = PlausibleEvent {
            url: event.url(),
            props: event.props(),
            domain: &self.domain,
            name: event.kind(),
            referrer: event.prop("referrer"),
            screen_width: event.prop("screenWidth"),
        };
        self.caller.call(Method::POST, EVENT_PATH, headers, &body)?;
        Ok(true)
    }
}
