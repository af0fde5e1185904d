use std::{borrow::Cow, collections::HashMap, str::FromStr};

const FIELDS_SEPARATOR: char = ';';
const FIELD_KEY_VALUE_SEPARATOR: char = '=';

/// Adapter settings parsed from a connection string.
#[derive(Debug, Clone, PartialEq)]
pub(crate) enum ConnectionString {
    GoogleAnalytics {
        tracking_id: String,
        client_id: String,
        debug: bool,
        endpoint: Option<String>,
    },
    Plausible {
        domain: String,
        api_key: String,
        user_agent: String,
        client_ip: String,
        endpoint: Option<String>,
    },
}

/// Connection string could not be parsed.
#[derive(thiserror::Error, Debug, PartialEq)]
#[non_exhaustive]
pub enum ConnectionStringError {
    /// A field is not in `Key=Value` form.
    #[error("invalid format")]
    InvalidFormat,
    /// The `Provider` field is missing.
    #[error("missing provider")]
    MissingProvider,
    /// The `Provider` field names an unknown backend.
    #[error("unsupported provider {0:?}; supported are \"GoogleAnalytics\" and \"Plausible\"")]
    UnsupportedProvider(String),
    /// A field required by the provider is missing.
    #[error("missing {0}")]
    MissingField(&'static str),
    /// A flag is neither `true` nor `false`.
    #[error("invalid boolean {0:?}")]
    InvalidBoolean(String),
    /// The endpoint is not a valid URL.
    #[error("invalid endpoint: {0}")]
    InvalidEndpoint(url::ParseError),
}

impl FromStr for ConnectionString {
    type Err = ConnectionStringError;

    /// Parse `Provider=...;Key=Value;...`. Keys are case-insensitive, unknown keys are ignored.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let mut result: HashMap<String, String> = s
            .split(FIELDS_SEPARATOR)
            .filter(|kv| !kv.trim().is_empty())
            .map(|kv| match kv.split_once(FIELD_KEY_VALUE_SEPARATOR) {
                Some((key, value)) => Ok((key.trim().to_lowercase(), value.trim().to_string())),
                None => Err(ConnectionStringError::InvalidFormat),
            })
            .collect::<Result<_, _>>()?;

        let provider = result
            .remove("provider")
            .ok_or(ConnectionStringError::MissingProvider)?;
        let endpoint = result.remove("endpoint").map(sanitize_url).transpose()?;
        let debug = result
            .remove("debug")
            .map(|value| parse_bool(&value))
            .transpose()?
            .unwrap_or(false);

        let mut required = |key: &'static str, name: &'static str| {
            result
                .remove(key)
                .filter(|value| !value.is_empty())
                .ok_or(ConnectionStringError::MissingField(name))
        };

        match provider.to_lowercase().as_str() {
            "googleanalytics" => Ok(ConnectionString::GoogleAnalytics {
                tracking_id: required("trackingid", "TrackingId")?,
                client_id: required("clientid", "ClientId")?,
                debug,
                endpoint,
            }),
            "plausible" => Ok(ConnectionString::Plausible {
                domain: required("domain", "Domain")?,
                api_key: required("apikey", "ApiKey")?,
                user_agent: required("useragent", "UserAgent")?,
                client_ip: required("clientip", "ClientIp")?,
                endpoint,
            }),
            _ => Err(ConnectionStringError::UnsupportedProvider(provider)),
        }
    }
}

fn parse_bool(value: &str) -> Result<bool, ConnectionStringError> {
    if value.eq_ignore_ascii_case("true") || value == "1" {
        Ok(true)
    } else if value.eq_ignore_ascii_case("false") || value == "0" {
        Ok(false)
    } else {
        Err(ConnectionStringError::InvalidBoolean(value.into()))
    }
}

fn sanitize_url(url: String) -> Result<String, ConnectionStringError> {
    let mut new_url: Cow<str> = url.trim().into();
    if !new_url.starts_with("https://") {
        new_url = new_url.replace("http://", "https://").into();
    }

    let new_url = new_url.trim_end_matches('/');
    url::Url::parse(new_url).map_err(ConnectionStringError::InvalidEndpoint)?;
    Ok(new_url.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use test_case::test_case;

    #[test_case(
        "Provider=GoogleAnalytics;TrackingId=UA-1-1;ClientId=555",
        "UA-1-1", "555", false, None ; "default")]
    #[test_case(
        "provider=googleanalytics;trackingid= UA-1-1 ;CLIENTID=555;",
        "UA-1-1", "555", false, None ; "case insensitive keys and trimmed values")]
    #[test_case(
        "Provider=GoogleAnalytics;TrackingId=UA-1-1;ClientId=555;Debug=true",
        "UA-1-1", "555", true, None ; "debug")]
    #[test_case(
        "Provider=GoogleAnalytics;Foo=1;TrackingId=UA-1-1;ClientId=555;Endpoint= http://ga.local/collect/  ",
        "UA-1-1", "555", false, Some("https://ga.local/collect") ; "sanitize endpoint")]
    fn parse_google_analytics(
        connection_string: &'static str,
        expected_tracking_id: &'static str,
        expected_client_id: &'static str,
        expected_debug: bool,
        expected_endpoint: Option<&'static str>,
    ) {
        let result: ConnectionString = connection_string.parse().unwrap();
        assert_eq!(
            ConnectionString::GoogleAnalytics {
                tracking_id: expected_tracking_id.into(),
                client_id: expected_client_id.into(),
                debug: expected_debug,
                endpoint: expected_endpoint.map(Into::into),
            },
            result
        );
    }

    #[test]
    fn parse_plausible() {
        let result: ConnectionString =
            "Provider=Plausible;Domain=a.b;ApiKey=k==;UserAgent=Mozilla/5.0;ClientIp=203.0.113.7"
                .parse()
                .unwrap();
        assert_eq!(
            ConnectionString::Plausible {
                domain: "a.b".into(),
                api_key: "k==".into(),
                user_agent: "Mozilla/5.0".into(),
                client_ip: "203.0.113.7".into(),
                endpoint: None,
            },
            result
        );
    }

    #[test_case("Provider", ConnectionStringError::InvalidFormat ; "no value")]
    #[test_case("TrackingId=UA-1-1", ConnectionStringError::MissingProvider ; "no provider")]
    #[test_case(
        "Provider=Matomo",
        ConnectionStringError::UnsupportedProvider("Matomo".into()) ; "unknown provider")]
    #[test_case(
        "Provider=GoogleAnalytics;TrackingId=UA-1-1",
        ConnectionStringError::MissingField("ClientId") ; "missing client id")]
    #[test_case(
        "Provider=GoogleAnalytics;TrackingId=;ClientId=555",
        ConnectionStringError::MissingField("TrackingId") ; "empty tracking id")]
    #[test_case(
        "Provider=GoogleAnalytics;TrackingId=UA-1-1;ClientId=555;Debug=maybe",
        ConnectionStringError::InvalidBoolean("maybe".into()) ; "invalid debug flag")]
    #[test_case(
        "Provider=Plausible;Domain=a.b;ApiKey=k;UserAgent=ua",
        ConnectionStringError::MissingField("ClientIp") ; "missing client ip")]
    fn parse_fails(connection_string: &'static str, expected: ConnectionStringError) {
        assert_eq!(
            Err(expected),
            connection_string.parse::<ConnectionString>()
        );
    }

    #[test]
    fn parse_fails_on_invalid_endpoint() {
        let result = "Provider=Plausible;Endpoint=not a url".parse::<ConnectionString>();
        assert!(matches!(
            result,
            Err(ConnectionStringError::InvalidEndpoint(_))
        ));
    }
}
