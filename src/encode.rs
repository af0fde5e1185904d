//! Request body encodings.
//!
//! Form and multipart bodies are built from a flat key/value view of the parameters. Nested maps
//! and arrays are flattened with bracket notation: `{"a": {"b": 1}}` becomes `a[b]=1`.

use serde_json::{Map, Value};
use std::collections::BTreeMap;

pub(crate) const APPLICATION_JSON: &str = "application/json";
pub(crate) const MULTIPART_FORM_DATA: &str = "multipart/form-data";
pub(crate) const FORM_URLENCODED: &str = "application/x-www-form-urlencoded";

/// Flattened parameters, sorted by key.
pub(crate) type FlatParams = BTreeMap<String, String>;

/// How the request body is encoded, picked from the effective `Content-Type` header.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum BodyEncoding {
    Json,
    Multipart,
    Form,
}

impl BodyEncoding {
    pub(crate) fn from_content_type(content_type: Option<&str>) -> Self {
        match content_type.map(media_type) {
            Some(media) if media.eq_ignore_ascii_case(APPLICATION_JSON) => BodyEncoding::Json,
            Some(media) if media.eq_ignore_ascii_case(MULTIPART_FORM_DATA) => {
                BodyEncoding::Multipart
            }
            _ => BodyEncoding::Form,
        }
    }
}

/// Strip parameters like `; charset=utf-8` from a content type.
pub(crate) fn media_type(content_type: &str) -> &str {
    content_type
        .split_once(';')
        .map_or(content_type, |(media, _)| media)
        .trim()
}

/// Flatten nested parameters into bracketed keys.
///
/// `null` values are dropped, booleans become `1` and `0`. If two different paths flatten to the
/// same key, the one visited last wins. Keys are visited in sorted order, so a literal `a[b]` key
/// overrides a nested `{"a": {"b": ..}}`.
pub(crate) fn flatten(params: &Map<String, Value>) -> FlatParams {
    let mut output = FlatParams::new();
    for (key, value) in params {
        flatten_into(&mut output, key.clone(), value);
    }
    output
}

fn flatten_into(output: &mut FlatParams, key: String, value: &Value) {
    match value {
        Value::Object(map) => {
            for (child, value) in map {
                flatten_into(output, format!("{}[{}]", key, child), value);
            }
        }
        Value::Array(items) => {
            for (index, value) in items.iter().enumerate() {
                flatten_into(output, format!("{}[{}]", key, index), value);
            }
        }
        Value::Null => {}
        Value::Bool(flag) => {
            output.insert(key, if *flag { "1" } else { "0" }.into());
        }
        Value::Number(number) => {
            output.insert(key, number.to_string());
        }
        Value::String(text) => {
            output.insert(key, text.clone());
        }
    }
}

pub(crate) fn form_urlencode(params: &FlatParams) -> String {
    url::form_urlencoded::Serializer::new(String::new())
        .extend_pairs(params)
        .finish()
}

pub(crate) fn multipart_boundary() -> String {
    format!("analytics-dispatch-{:032x}", rand::random::<u128>())
}

pub(crate) fn multipart_encode(params: &FlatParams, boundary: &str) -> Vec<u8> {
    let mut body = String::new();
    for (name, value) in params {
        body.push_str(&format!(
            "--{}\r\nContent-Disposition: form-data; name=\"{}\"\r\n\r\n{}\r\n",
            boundary,
            escape_field_name(name),
            value
        ));
    }
    body.push_str(&format!("--{}--\r\n", boundary));
    body.into_bytes()
}

fn escape_field_name(name: &str) -> String {
    name.replace('"', "%22")
        .replace('\r', "%0D")
        .replace('\n', "%0A")
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use test_case::test_case;

    fn params(value: Value) -> Map<String, Value> {
        match value {
            Value::Object(map) => map,
            _ => panic!("test params must be an object"),
        }
    }

    #[test_case(None, BodyEncoding::Form ; "unset")]
    #[test_case(Some(""), BodyEncoding::Form ; "empty")]
    #[test_case(Some("application/json"), BodyEncoding::Json ; "json")]
    #[test_case(Some("Application/JSON; charset=utf-8"), BodyEncoding::Json ; "json with charset")]
    #[test_case(Some("multipart/form-data"), BodyEncoding::Multipart ; "multipart")]
    #[test_case(Some("application/x-www-form-urlencoded"), BodyEncoding::Form ; "form")]
    #[test_case(Some("text/plain"), BodyEncoding::Form ; "other")]
    fn encoding_from_content_type(content_type: Option<&'static str>, expected: BodyEncoding) {
        assert_eq!(expected, BodyEncoding::from_content_type(content_type));
    }

    #[test]
    fn flatten_nested() {
        let flat = flatten(&params(json!({
            "a": {"b": 1, "c": {"d": "x"}},
            "list": ["first", "second"],
            "yes": true,
            "no": false,
            "nothing": null,
        })));
        let expected: FlatParams = [
            ("a[b]", "1"),
            ("a[c][d]", "x"),
            ("list[0]", "first"),
            ("list[1]", "second"),
            ("no", "0"),
            ("yes", "1"),
        ]
        .iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect();
        assert_eq!(expected, flat);
    }

    #[test]
    fn flatten_collision_last_write_wins() {
        let flat = flatten(&params(json!({
            "a": {"b": "nested"},
            "a[b]": "literal",
        })));
        assert_eq!(1, flat.len());
        assert_eq!("literal", flat["a[b]"]);
    }

    #[test]
    fn form_encoding_escapes() {
        let flat = flatten(&params(json!({
            "dp": "/c d",
            "dr": "https://x?y=1&z",
            "v": 1,
        })));
        assert_eq!(
            "dp=%2Fc+d&dr=https%3A%2F%2Fx%3Fy%3D1%26z&v=1",
            form_urlencode(&flat)
        );
    }

    #[test]
    fn multipart_fields() {
        let flat = flatten(&params(json!({"a": {"b": 1}, "name": "x"})));
        let body = String::from_utf8(multipart_encode(&flat, "XYZ")).unwrap();
        assert_eq!(
            "--XYZ\r\nContent-Disposition: form-data; name=\"a[b]\"\r\n\r\n1\r\n\
             --XYZ\r\nContent-Disposition: form-data; name=\"name\"\r\n\r\nx\r\n\
             --XYZ--\r\n",
            body
        );
    }

    #[test]
    fn multipart_boundaries_differ() {
        assert_ne!(multipart_boundary(), multipart_boundary());
    }
}
