use crate::ErrorKind;
use serde::Serialize;
use std::{collections::BTreeMap, fmt};

/// Event type with special meaning for backends that distinguish page views from custom events.
pub const PAGEVIEW: &str = "pageview";

/// Custom properties attached to an [`Event`].
pub type Properties = BTreeMap<String, PropValue>;

/// A scalar property value.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum PropValue {
    /// Text value
    String(String),
    /// Integer value
    Int(i64),
    /// Floating point value
    Float(f64),
    /// Boolean value
    Bool(bool),
}

impl PropValue {
    /// Returns `true` for values backends treat as "not set": empty strings.
    pub fn is_empty(&self) -> bool {
        matches!(self, PropValue::String(s) if s.is_empty())
    }
}

impl fmt::Display for PropValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PropValue::String(v) => f.write_str(v),
            PropValue::Int(v) => write!(f, "{}", v),
            PropValue::Float(v) => write!(f, "{}", v),
            PropValue::Bool(v) => write!(f, "{}", v),
        }
    }
}

impl From<String> for PropValue {
    fn from(v: String) -> Self {
        PropValue::String(v)
    }
}

impl From<&str> for PropValue {
    fn from(v: &str) -> Self {
        PropValue::String(v.into())
    }
}

impl From<i64> for PropValue {
    fn from(v: i64) -> Self {
        PropValue::Int(v)
    }
}

impl From<i32> for PropValue {
    fn from(v: i32) -> Self {
        PropValue::Int(v.into())
    }
}

impl From<u32> for PropValue {
    fn from(v: u32) -> Self {
        PropValue::Int(v.into())
    }
}

impl From<f64> for PropValue {
    fn from(v: f64) -> Self {
        PropValue::Float(v)
    }
}

impl From<bool> for PropValue {
    fn from(v: bool) -> Self {
        PropValue::Bool(v)
    }
}

/// A trackable occurrence, like a page view or a click on a link.
///
/// Adapters only read events. Backends that need extra properties work on a copy.
///
/// ```
/// use analytics_dispatch::Event;
///
/// let event = Event::new("click", "https://example.com/pricing")
///     .with_name("Buy now")
///     .with_value(5)
///     .with_prop("referrer", "https://search.example.org")
///     .with_prop("screenWidth", 1024);
/// assert_eq!(event.kind(), "click");
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct Event {
    name: String,
    kind: String,
    url: String,
    value: Option<i64>,
    props: Properties,
}

impl Event {
    /// Create a new event of the given type that happened at `url`.
    pub fn new(kind: impl Into<String>, url: impl Into<String>) -> Self {
        Self {
            name: String::new(),
            kind: kind.into(),
            url: url.into(),
            value: None,
            props: Properties::new(),
        }
    }

    /// Create a page view event.
    pub fn pageview(url: impl Into<String>) -> Self {
        Self::new(PAGEVIEW, url)
    }

    /// Set a human-readable label, e.g. the name of a link.
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    /// Set a numeric weight.
    pub fn with_value(mut self, value: i64) -> Self {
        self.value = Some(value);
        self
    }

    /// Add a property, replacing any previous value with the same key.
    pub fn with_prop(mut self, key: impl Into<String>, value: impl Into<PropValue>) -> Self {
        self.props.insert(key.into(), value.into());
        self
    }

    /// Replace all properties.
    pub fn with_props(mut self, props: Properties) -> Self {
        self.props = props;
        self
    }

    /// Human-readable label. Empty if not set.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Event type. `"pageview"` is reserved; any other value is a custom event.
    pub fn kind(&self) -> &str {
        &self.kind
    }

    /// Absolute URL where the event happened.
    pub fn url(&self) -> &str {
        &self.url
    }

    /// Numeric weight.
    pub fn value(&self) -> Option<i64> {
        self.value
    }

    /// All custom properties.
    pub fn props(&self) -> &Properties {
        &self.props
    }

    /// Look up a property. Empty string values count as absent.
    pub fn prop(&self, key: &str) -> Option<&PropValue> {
        self.props.get(key).filter(|v| !v.is_empty())
    }

    /// Whether this is a page view rather than a custom event.
    pub fn is_pageview(&self) -> bool {
        self.kind == PAGEVIEW
    }

    /// Check the fields every backend relies on and return the parsed URL.
    pub(crate) fn validate(&self) -> Result<url::Url, ErrorKind> {
        if self.kind.is_empty() {
            return Err(ErrorKind::InvalidEvent("event type is empty".into()));
        }
        if self.url.is_empty() {
            return Err(ErrorKind::InvalidEvent("event url is empty".into()));
        }
        let url = url::Url::parse(&self.url).map_err(|err| {
            ErrorKind::InvalidEvent(format!("event url {:?} is invalid: {}", self.url, err))
        })?;
        if url.host_str().is_none() {
            return Err(ErrorKind::InvalidEvent(format!(
                "event url {:?} has no host",
                self.url
            )));
        }
        Ok(url)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use test_case::test_case;

    #[test_case(PropValue::from("abc"), "abc" ; "string")]
    #[test_case(PropValue::from(1024), "1024" ; "int")]
    #[test_case(PropValue::from(1.5), "1.5" ; "float")]
    #[test_case(PropValue::from(true), "true" ; "bool")]
    fn prop_value_display(value: PropValue, expected: &'static str) {
        assert_eq!(expected, value.to_string());
    }

    #[test]
    fn empty_string_props_count_as_absent() {
        let event = Event::pageview("https://example.com")
            .with_prop("referrer", "")
            .with_prop("documentTitle", "Home");
        assert_eq!(None, event.prop("referrer"));
        assert_eq!(Some(&PropValue::from("Home")), event.prop("documentTitle"));
        assert_eq!(2, event.props().len());
    }

    #[test_case("", "https://example.com" ; "empty type")]
    #[test_case("click", "" ; "empty url")]
    #[test_case("click", "not a url" ; "relative url")]
    #[test_case("click", "mailto:someone@example.com" ; "url without host")]
    fn validate_fails(kind: &'static str, url: &'static str) {
        let err = Event::new(kind, url).validate().unwrap_err();
        assert!(matches!(err, ErrorKind::InvalidEvent(_)), "{:?}", err);
    }

    #[test]
    fn validate_returns_parsed_url() {
        let url = Event::new("click", "https://a.b/c?d=e").validate().unwrap();
        assert_eq!(Some("a.b"), url.host_str());
        assert_eq!("/c", url.path());
    }
}
