//! Supported analytics backends.

pub mod google_analytics;
pub mod plausible;

pub use google_analytics::GoogleAnalytics;
pub use plausible::Plausible;

use crate::{
    connection_string::ConnectionString, Adapter, AdapterState, ConnectionStringError, Error,
    Event, HttpClient,
};

/// Any of the supported adapters, for choosing the backend at runtime.
#[derive(Debug)]
#[non_exhaustive]
pub enum AnyAdapter<C> {
    /// Google Analytics
    GoogleAnalytics(GoogleAnalytics<C>),
    /// Plausible
    Plausible(Plausible<C>),
}

impl<C: HttpClient> AnyAdapter<C> {
    /// Create an adapter from a connection string.
    ///
    /// ```
    /// # use analytics_dispatch::{adapters::AnyAdapter, Adapter, HttpClient};
    /// # fn example<C: HttpClient>(client: C) {
    /// let adapter = AnyAdapter::from_connection_string(
    ///     "Provider=GoogleAnalytics;TrackingId=UA-12345-1;ClientId=35009a79-1a05-49d7-b876-2b884d0f825b",
    ///     client,
    /// )
    /// .expect("connection string is valid");
    /// assert_eq!("Google Analytics", adapter.name());
    /// # }
    /// ```
    ///
    /// Google Analytics takes `TrackingId`, `ClientId` and optionally `Debug` and `Endpoint`.
    /// Plausible takes `Domain`, `ApiKey`, `UserAgent`, `ClientIp` and optionally `Endpoint`.
    pub fn from_connection_string(
        connection_string: impl AsRef<str>,
        client: C,
    ) -> Result<Self, ConnectionStringError> {
        let adapter = match connection_string.as_ref().parse()? {
            ConnectionString::GoogleAnalytics {
                tracking_id,
                client_id,
                debug,
                endpoint,
            } => {
                let mut adapter =
                    GoogleAnalytics::new(tracking_id, client_id, client).with_debug_mode(debug);
                if let Some(endpoint) = endpoint {
                    adapter = adapter.with_endpoint(endpoint);
                }
                AnyAdapter::GoogleAnalytics(adapter)
            }
            ConnectionString::Plausible {
                domain,
                api_key,
                user_agent,
                client_ip,
                endpoint,
            } => {
                let mut adapter = Plausible::new(domain, api_key, user_agent, client_ip, client);
                if let Some(endpoint) = endpoint {
                    adapter = adapter.with_endpoint(endpoint);
                }
                AnyAdapter::Plausible(adapter)
            }
        };
        Ok(adapter)
    }
}

impl<C: HttpClient> From<GoogleAnalytics<C>> for AnyAdapter<C> {
    fn from(adapter: GoogleAnalytics<C>) -> Self {
        AnyAdapter::GoogleAnalytics(adapter)
    }
}

impl<C: HttpClient> From<Plausible<C>> for AnyAdapter<C> {
    fn from(adapter: Plausible<C>) -> Self {
        AnyAdapter::Plausible(adapter)
    }
}

impl<C: HttpClient> Adapter for AnyAdapter<C> {
    fn name(&self) -> &'static str {
        match self {
            AnyAdapter::GoogleAnalytics(adapter) => adapter.name(),
            AnyAdapter::Plausible(adapter) => adapter.name(),
        }
    }

    fn state(&self) -> &AdapterState {
        match self {
            AnyAdapter::GoogleAnalytics(adapter) => adapter.state(),
            AnyAdapter::Plausible(adapter) => adapter.state(),
        }
    }

    fn state_mut(&mut self) -> &mut AdapterState {
        match self {
            AnyAdapter::GoogleAnalytics(adapter) => adapter.state_mut(),
            AnyAdapter::Plausible(adapter) => adapter.state_mut(),
        }
    }

    fn send(&self, event: &Event) -> Result<bool, Error> {
        match self {
            AnyAdapter::GoogleAnalytics(adapter) => adapter.send(event),
            AnyAdapter::Plausible(adapter) => adapter.send(event),
        }
    }
}
