//! Send page views and custom events to third-party analytics backends.
//!
//! Each backend has its own wire protocol and authentication scheme. This crate hides them behind
//! the [`Adapter`] trait: build an [`Event`], pick an adapter, call
//! [`create_event`](Adapter::create_event).
//!
//! # Usage
//!
//! Enable the `reqwest-blocking-client` feature (or bring your own [`HttpClient`]) and configure
//! an adapter:
//!
//! ```rust,no_run
//! # #[cfg(feature = "reqwest")]
//! # fn main() {
//! use analytics_dispatch::{adapters::GoogleAnalytics, Adapter, Event};
//!
//! let mut analytics = GoogleAnalytics::new(
//!     "UA-12345-1",
//!     "35009a79-1a05-49d7-b876-2b884d0f825b",
//!     reqwest::blocking::Client::new(),
//! );
//! analytics
//!     .set_client_ip("203.0.113.7")
//!     .set_user_agent("Mozilla/5.0 (X11; Linux x86_64; rv:128.0) Gecko/20100101 Firefox/128.0");
//!
//! let event = Event::new("click", "https://example.com/pricing")
//!     .with_name("Buy now")
//!     .with_prop("referrer", "https://search.example.org/?q=example")
//!     .with_prop("screenWidth", 1920)
//!     .with_prop("screenHeight", 1080);
//! let created = analytics.create_event(&event);
//! # }
//! # #[cfg(not(feature = "reqwest"))]
//! # fn main() {}
//! ```
//!
//! Or choose the backend at runtime:
//!
//! ```rust,no_run
//! # #[cfg(feature = "reqwest")]
//! # fn main() {
//! use analytics_dispatch::{adapters::AnyAdapter, Adapter, Event};
//!
//! let analytics = AnyAdapter::from_connection_string(
//!     "Provider=Plausible;Domain=example.com;ApiKey=...;UserAgent=Mozilla/5.0;ClientIp=203.0.113.7",
//!     reqwest::blocking::Client::new(),
//! )
//! .expect("connection string is valid");
//! analytics.create_event(&Event::pageview("https://example.com/"));
//! # }
//! # #[cfg(not(feature = "reqwest"))]
//! # fn main() {}
//! ```
//!
//! # Backends
//!
//! | Adapter                              | Protocol                                   |
//! | ------------------------------------ | ------------------------------------------ |
//! | [`GoogleAnalytics`](adapters::GoogleAnalytics) | Measurement Protocol v1, form-encoded POST |
//! | [`Plausible`](adapters::Plausible)   | Sites API goal provisioning + Events API   |
//!
//! # Errors
//!
//! [`Adapter::create_event`] never fails. Errors are written to the adapter's [`LogSink`] (by
//! default the [`log`] crate) and reported as `false`. Use [`Adapter::send`] to get the
//! [`Error`] instead. Nothing is retried.
#![doc(html_root_url = "https://docs.rs/analytics-dispatch/0.1.0")]
#![deny(missing_docs, unreachable_pub, missing_debug_implementations)]
#![cfg_attr(docsrs, feature(doc_cfg))]

mod adapter;
pub mod adapters;
mod call;
mod connection_string;
mod encode;
mod error;
mod event;
mod http_client;
mod log_sink;

pub use adapter::{Adapter, AdapterState};
pub use call::{CallResponse, HttpCaller, ResponseBody, DEFAULT_USER_AGENT};
pub use connection_string::ConnectionStringError;
pub use error::{Error, ErrorKind};
pub use event::{Event, PropValue, Properties, PAGEVIEW};
pub use http_client::{HttpClient, HttpError};
pub use log_sink::{LogCrateSink, LogSink, NoopSink};
