//! Query-string codec: text <-> [`QueryMap`].
//!
//! Wire format: `&`-joined `key=value` pairs, both sides percent-encoded
//! as URL components, repeated keys for arrays.
//!
//! ```ignore
//! let codec = StandardCodec;
//! let schema = Schema::new(query_map! { "page" => 1 });
//! let map = codec.parse("page=5&tags=a&tags=b", &schema);
//! // {page: 5, tags: ["a", "b"]}
//! assert_eq!(codec.stringify(&map), "page=5&tags=a&tags=b");
//! ```

use std::borrow::Cow;

use indexmap::IndexMap;
use percent_encoding::{AsciiSet, NON_ALPHANUMERIC, percent_decode_str, utf8_percent_encode};

use crate::coerce::{should_coerce, to_numberable};
use crate::schema::Schema;
use crate::value::{QueryMap, QueryValue};

/// Everything except the URL-component unreserved marks gets escaped.
const COMPONENT: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'-')
    .remove(b'_')
    .remove(b'.')
    .remove(b'!')
    .remove(b'~')
    .remove(b'*')
    .remove(b'\'')
    .remove(b'(')
    .remove(b')');

/// A pluggable parse/stringify pair.
///
/// `parse` receives the session schema so that it can coerce values back
/// to their declared kinds. Neither method can fail: malformed input
/// degrades to literal text.
pub trait QueryCodec: Send + Sync {
    /// Parse a query string (with or without the leading `?`).
    fn parse(&self, query: &str, schema: &Schema) -> QueryMap;

    /// Serialize a mapping to a query string (without the leading `?`).
    fn stringify(&self, map: &QueryMap) -> String;
}

/// The default codec.
///
/// - Duplicate keys collapse into an array, in occurrence order.
/// - A single occurrence of a numeric-schema key becomes a number.
/// - Keys outside the schema are returned as raw strings or arrays.
/// - `Null` entries (and `Null` array elements) are not written.
#[derive(Debug, Clone, Copy, Default)]
pub struct StandardCodec;

impl QueryCodec for StandardCodec {
    fn parse(&self, query: &str, schema: &Schema) -> QueryMap {
        let mut grouped: IndexMap<String, Vec<String>> = IndexMap::new();
        for token in tokens(query) {
            let (key, value) = split_token(token);
            if key.is_empty() {
                continue;
            }
            grouped
                .entry(decode_component(key).into_owned())
                .or_default()
                .push(decode_component(value).into_owned());
        }

        grouped
            .into_iter()
            .map(|(key, mut values)| {
                let value = if values.len() == 1 {
                    let single = QueryValue::String(values.remove(0));
                    if should_coerce(schema, &key) {
                        to_numberable(single)
                    } else {
                        single
                    }
                } else {
                    QueryValue::Array(values.into_iter().map(QueryValue::String).collect())
                };
                (key, value)
            })
            .collect()
    }

    fn stringify(&self, map: &QueryMap) -> String {
        let mut pairs = Vec::new();
        for (key, value) in map.iter() {
            match value {
                QueryValue::Null => {}
                QueryValue::Array(items) => {
                    for item in items {
                        if let Some(text) = item.to_query_text() {
                            pairs.push(encode_pair(key, &text));
                        }
                    }
                }
                scalar => {
                    if let Some(text) = scalar.to_query_text() {
                        pairs.push(encode_pair(key, &text));
                    }
                }
            }
        }
        pairs.join("&")
    }
}

/// Percent-encode a key or value as a URL component.
pub fn encode_component(text: &str) -> String {
    utf8_percent_encode(text, COMPONENT).to_string()
}

/// Decode a key or value. `+` reads as a space.
///
/// If the escapes do not form valid UTF-8 the raw text is kept as-is.
pub fn decode_component(raw: &str) -> Cow<'_, str> {
    let spaced: Cow<'_, str> = if raw.contains('+') {
        Cow::Owned(raw.replace('+', " "))
    } else {
        Cow::Borrowed(raw)
    };
    let decoded = percent_decode_str(&spaced)
        .decode_utf8()
        .map(|text| text.into_owned());
    match decoded {
        Ok(text) => Cow::Owned(text),
        Err(_) => Cow::Borrowed(raw),
    }
}

/// Non-empty `&`-separated tokens of a query string.
fn tokens(query: &str) -> impl Iterator<Item = &str> {
    query
        .strip_prefix('?')
        .unwrap_or(query)
        .split('&')
        .filter(|s| !s.is_empty())
}

/// Split `key=value`; a token without `=` is a key with an empty value.
fn split_token(token: &str) -> (&str, &str) {
    token.split_once('=').unwrap_or((token, ""))
}

fn encode_pair(key: &str, value: &str) -> String {
    format!("{}={}", encode_component(key), encode_component(value))
}
