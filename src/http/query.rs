//! Query-string construction.
//!
//! Nested values use the bracket convention: arrays as `key[]=v`, maps as
//! `key[sub]=v`. Keys are emitted in sorted order so the same parameters
//! always produce the same URL.

use std::collections::BTreeMap;
use url::Url;

/// Query parameters of one request.
pub type QueryParameters = BTreeMap<String, QueryValue>;

/// A query parameter value.
#[derive(Debug, Clone, PartialEq)]
pub enum QueryValue {
    String(String),
    Integer(i64),
    Float(f64),
    Bool(bool),
    Array(Vec<QueryValue>),
    Map(BTreeMap<String, QueryValue>),
}

impl QueryValue {
    /// Flatten into `(key, value)` pairs under `key`.
    fn flatten_into(&self, key: &str, out: &mut Vec<(String, String)>) {
        match self {
            QueryValue::String(value) => out.push((key.to_string(), value.clone())),
            QueryValue::Integer(value) => out.push((key.to_string(), value.to_string())),
            QueryValue::Float(value) => out.push((key.to_string(), value.to_string())),
            QueryValue::Bool(value) => out.push((key.to_string(), value.to_string())),
            QueryValue::Array(values) => {
                let nested = format!("{key}[]");
                for value in values {
                    value.flatten_into(&nested, out);
                }
            }
            QueryValue::Map(entries) => {
                for (sub, value) in entries {
                    value.flatten_into(&format!("{key}[{sub}]"), out);
                }
            }
        }
    }
}

impl From<&str> for QueryValue {
    fn from(value: &str) -> Self {
        QueryValue::String(value.to_string())
    }
}

impl From<String> for QueryValue {
    fn from(value: String) -> Self {
        QueryValue::String(value)
    }
}

impl From<i64> for QueryValue {
    fn from(value: i64) -> Self {
        QueryValue::Integer(value)
    }
}

impl From<i32> for QueryValue {
    fn from(value: i32) -> Self {
        QueryValue::Integer(value.into())
    }
}

impl From<f64> for QueryValue {
    fn from(value: f64) -> Self {
        QueryValue::Float(value)
    }
}

impl From<bool> for QueryValue {
    fn from(value: bool) -> Self {
        QueryValue::Bool(value)
    }
}

impl<T: Into<QueryValue>> From<Vec<T>> for QueryValue {
    fn from(values: Vec<T>) -> Self {
        QueryValue::Array(values.into_iter().map(Into::into).collect())
    }
}

/// Flatten parameters into ordered `(key, value)` pairs.
pub fn query_pairs(parameters: &QueryParameters) -> Vec<(String, String)> {
    let mut pairs = Vec::new();
    for (key, value) in parameters {
        value.flatten_into(key, &mut pairs);
    }
    pairs
}

/// Append percent-encoded parameters to the query of `url`.
///
/// An empty parameter map leaves the URL untouched.
pub fn append_query(url: &Url, parameters: &QueryParameters) -> Url {
    let mut url = url.clone();
    let pairs = query_pairs(parameters);
    if !pairs.is_empty() {
        url.query_pairs_mut().extend_pairs(pairs);
    }
    url
}
