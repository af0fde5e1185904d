use crate::{
    log_sink::{log_error, LogCrateSink, LogSink},
    Error, Event, DEFAULT_USER_AGENT,
};
use std::sync::Arc;

/// Configuration shared by all adapters.
#[derive(Debug, Clone)]
pub struct AdapterState {
    pub(crate) enabled: bool,
    pub(crate) client_ip: Option<String>,
    pub(crate) user_agent: String,
    pub(crate) log_sink: Arc<dyn LogSink>,
}

impl Default for AdapterState {
    fn default() -> Self {
        Self {
            enabled: true,
            client_ip: None,
            user_agent: DEFAULT_USER_AGENT.into(),
            log_sink: Arc::new(LogCrateSink),
        }
    }
}

impl AdapterState {
    /// Whether events are sent. Defaults to `true`.
    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    /// IP address of the end user, forwarded to the backend.
    pub fn client_ip(&self) -> Option<&str> {
        self.client_ip.as_deref()
    }

    /// User agent of the end user, forwarded to the backend.
    pub fn user_agent(&self) -> &str {
        &self.user_agent
    }

    /// Where failures are reported.
    pub fn log_sink(&self) -> &dyn LogSink {
        self.log_sink.as_ref()
    }
}

/// An analytics backend.
///
/// Call [`create_event`](Adapter::create_event) to track something. It never fails: errors are
/// reported to the adapter's [`LogSink`] and turned into `false`.
///
/// ```
/// use analytics_dispatch::{adapters::Plausible, Adapter, Event, HttpClient};
///
/// fn track_signup<C: HttpClient>(plausible: &mut Plausible<C>) {
///     let event = Event::new("signup", "https://example.com/register");
///     if !plausible.create_event(&event) {
///         plausible.disable();
///     }
/// }
/// ```
pub trait Adapter {
    /// Display name of the backend.
    fn name(&self) -> &'static str;

    /// Shared configuration.
    fn state(&self) -> &AdapterState;

    /// Mutable shared configuration.
    fn state_mut(&mut self) -> &mut AdapterState;

    /// Send the event using the backend's protocol.
    ///
    /// Returns `Ok(false)` without any network traffic while the adapter is disabled.
    fn send(&self, event: &Event) -> Result<bool, Error>;

    /// Resume sending events.
    fn enable(&mut self) {
        self.state_mut().enabled = true;
    }

    /// Stop sending events. [`send`](Adapter::send) returns `false` until re-enabled.
    fn disable(&mut self) {
        self.state_mut().enabled = false;
    }

    /// Whether events are sent.
    fn is_enabled(&self) -> bool {
        self.state().enabled
    }

    /// Set the IP address of the end user.
    fn set_client_ip(&mut self, client_ip: impl Into<String>) -> &mut Self
    where
        Self: Sized,
    {
        self.state_mut().client_ip = Some(client_ip.into());
        self
    }

    /// Set the user agent of the end user.
    fn set_user_agent(&mut self, user_agent: impl Into<String>) -> &mut Self
    where
        Self: Sized,
    {
        self.state_mut().user_agent = user_agent.into();
        self
    }

    /// Create the event on the backend.
    ///
    /// Failures are logged and reported as `false`.
    fn create_event(&self, event: &Event) -> bool {
        match self.send(event) {
            Ok(created) => created,
            Err(err) => {
                log_error(self.state().log_sink(), self.name(), &err);
                false
            }
        }
    }
}
