//! Query-string model and canonicalization
//!
//! All functions are **pure**: same input, same output, no side effects.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// A single query value: `?tab=posts` or `?x=1&x=2`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum QueryValue {
    Single(String),
    Multi(Vec<String>),
}

impl QueryValue {
    /// First value, if any
    pub fn first(&self) -> Option<&str> {
        match self {
            QueryValue::Single(value) => Some(value),
            QueryValue::Multi(values) => values.first().map(String::as_str),
        }
    }

    /// All values in their original order
    pub fn values(&self) -> Vec<&str> {
        match self {
            QueryValue::Single(value) => vec![value.as_str()],
            QueryValue::Multi(values) => values.iter().map(String::as_str).collect(),
        }
    }

    fn push(&mut self, value: String) {
        match self {
            QueryValue::Single(first) => {
                *self = QueryValue::Multi(vec![std::mem::take(first), value]);
            }
            QueryValue::Multi(values) => values.push(value),
        }
    }
}

impl From<&str> for QueryValue {
    fn from(value: &str) -> Self {
        QueryValue::Single(value.to_string())
    }
}

impl From<String> for QueryValue {
    fn from(value: String) -> Self {
        QueryValue::Single(value)
    }
}

impl From<Vec<String>> for QueryValue {
    fn from(values: Vec<String>) -> Self {
        QueryValue::Multi(values)
    }
}

impl From<Vec<&str>> for QueryValue {
    fn from(values: Vec<&str>) -> Self {
        QueryValue::Multi(values.into_iter().map(str::to_string).collect())
    }
}

/// Parsed query parameters
pub type Query = BTreeMap<String, QueryValue>;

/// Parses `a=1&b=2&b=3` into a [`Query`]
///
/// Accepts an optional leading `?`. `+` decodes to a space, repeated keys
/// collect into [`QueryValue::Multi`] in order of appearance.
///
/// # Examples
///
/// ```
/// use rhtmx_navigate::query::{parse_query, QueryValue};
///
/// let query = parse_query("?x=2&x=1&tab=posts");
/// assert_eq!(query["tab"], QueryValue::from("posts"));
/// assert_eq!(query["x"], QueryValue::from(vec!["2", "1"]));
/// ```
pub fn parse_query(input: &str) -> Query {
    let input = input.strip_prefix('?').unwrap_or(input);

    input
        .split('&')
        .filter(|pair| !pair.is_empty())
        .map(|pair| match pair.split_once('=') {
            Some((key, value)) => (decode(key), decode(value)),
            None => (decode(pair), String::new()),
        })
        .fold(Query::new(), |mut query, (key, value)| {
            match query.get_mut(&key) {
                Some(existing) => existing.push(value),
                None => {
                    query.insert(key, QueryValue::Single(value));
                }
            }
            query
        })
}

/// Serializes a [`Query`] in map order, arrays as repeated keys
pub fn stringify_query(query: &Query) -> String {
    query
        .iter()
        .flat_map(|(key, value)| {
            value
                .values()
                .into_iter()
                .map(move |item| format!("{}={}", urlencoding::encode(key), urlencoding::encode(item)))
        })
        .collect::<Vec<_>>()
        .join("&")
}

/// Canonical form of a query, used for route equality
///
/// Keys are sorted, array values are cloned and sorted, then the result is
/// serialized with [`stringify_query`]. Two queries that differ only in key
/// order or array element order produce the same string.
///
/// # Examples
///
/// ```
/// use rhtmx_navigate::query::{dump_query, parse_query};
///
/// assert_eq!(
///     dump_query(&parse_query("b=2&a=x&b=1")),
///     dump_query(&parse_query("a=x&b=1&b=2")),
/// );
/// ```
pub fn dump_query(query: &Query) -> String {
    let mut keys: Vec<&String> = query.keys().collect();
    keys.sort();

    let canonical: Query = keys
        .into_iter()
        .map(|key| {
            let value = match &query[key] {
                QueryValue::Multi(values) => {
                    let mut sorted = values.clone();
                    sorted.sort();
                    QueryValue::Multi(sorted)
                }
                single => single.clone(),
            };
            (key.clone(), value)
        })
        .collect();

    stringify_query(&canonical)
}

fn decode(raw: &str) -> String {
    let spaced = raw.replace('+', " ");
    urlencoding::decode(&spaced)
        .map(|decoded| decoded.into_owned())
        .unwrap_or(spaced)
}
