//! Method parameters and their wire encodings.
//!
//! # Design
//! The remote API's parameter set is open-ended, so parameters are an ordered
//! name → value mapping rather than typed structs. Values are strings or
//! integers on the wire; booleans become `0`/`1`. Lists and maps are
//! flattened to bracketed keys (`ids[0]`, `info[city]`), which is how the
//! server side decodes nested form fields.

use serde_json::{Map, Value};
use url::form_urlencoded;

/// A single parameter value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ParamValue {
    Str(String),
    Int(i64),
    /// Sent as `1` or `0`.
    Bool(bool),
    /// Flattened to `key[0]`, `key[1]`, ...
    List(Vec<ParamValue>),
    /// Flattened to `key[sub]`.
    Map(Params),
}

impl ParamValue {
    fn to_json(&self) -> Value {
        match self {
            ParamValue::Str(s) => Value::String(s.clone()),
            ParamValue::Int(n) => Value::from(*n),
            ParamValue::Bool(b) => Value::from(i64::from(*b)),
            ParamValue::List(items) => Value::Array(items.iter().map(ParamValue::to_json).collect()),
            ParamValue::Map(params) => params.to_json(),
        }
    }

    fn flatten_into(&self, key: String, out: &mut Vec<(String, String)>) {
        match self {
            ParamValue::Str(s) => out.push((key, s.clone())),
            ParamValue::Int(n) => out.push((key, n.to_string())),
            ParamValue::Bool(b) => out.push((key, if *b { "1" } else { "0" }.to_string())),
            ParamValue::List(items) => {
                for (index, item) in items.iter().enumerate() {
                    item.flatten_into(format!("{key}[{index}]"), out);
                }
            }
            ParamValue::Map(params) => {
                for (sub, value) in params.iter() {
                    value.flatten_into(format!("{key}[{sub}]"), out);
                }
            }
        }
    }
}

impl From<&str> for ParamValue {
    fn from(value: &str) -> Self {
        ParamValue::Str(value.to_string())
    }
}

impl From<String> for ParamValue {
    fn from(value: String) -> Self {
        ParamValue::Str(value)
    }
}

impl From<&String> for ParamValue {
    fn from(value: &String) -> Self {
        ParamValue::Str(value.clone())
    }
}

impl From<i64> for ParamValue {
    fn from(value: i64) -> Self {
        ParamValue::Int(value)
    }
}

impl From<i32> for ParamValue {
    fn from(value: i32) -> Self {
        ParamValue::Int(i64::from(value))
    }
}

impl From<u32> for ParamValue {
    fn from(value: u32) -> Self {
        ParamValue::Int(i64::from(value))
    }
}

impl From<bool> for ParamValue {
    fn from(value: bool) -> Self {
        ParamValue::Bool(value)
    }
}

impl From<Params> for ParamValue {
    fn from(value: Params) -> Self {
        ParamValue::Map(value)
    }
}

impl<T: Into<ParamValue>> From<Vec<T>> for ParamValue {
    fn from(values: Vec<T>) -> Self {
        ParamValue::List(values.into_iter().map(Into::into).collect())
    }
}

/// Ordered parameter mapping for one API call.
///
/// Inserting a name that is already present replaces the value in place, so
/// the first-seen order of names is kept.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Params {
    entries: Vec<(String, ParamValue)>,
}

impl Params {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style `insert`.
    pub fn with(mut self, name: impl Into<String>, value: impl Into<ParamValue>) -> Self {
        self.insert(name, value);
        self
    }

    /// Insert or replace `name`, returning the previous value.
    pub fn insert(&mut self, name: impl Into<String>, value: impl Into<ParamValue>) -> Option<ParamValue> {
        let name = name.into();
        let value = value.into();
        match self.entries.iter_mut().find(|(key, _)| *key == name) {
            Some((_, slot)) => Some(std::mem::replace(slot, value)),
            None => {
                self.entries.push((name, value));
                None
            }
        }
    }

    pub fn get(&self, name: &str) -> Option<&ParamValue> {
        self.entries.iter().find(|(key, _)| key == name).map(|(_, value)| value)
    }

    pub fn remove(&mut self, name: &str) -> Option<ParamValue> {
        let index = self.entries.iter().position(|(key, _)| key == name)?;
        Some(self.entries.remove(index).1)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.get(name).is_some()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &ParamValue)> {
        self.entries.iter().map(|(key, value)| (key.as_str(), value))
    }

    /// Top-level parameter names, in order.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|(key, _)| key.as_str())
    }

    /// Flatten nested values into `(key, value)` string pairs.
    pub fn flatten(&self) -> Vec<(String, String)> {
        let mut out = Vec::with_capacity(self.entries.len());
        for (key, value) in &self.entries {
            value.flatten_into(key.clone(), &mut out);
        }
        out
    }

    /// `application/x-www-form-urlencoded` body of the flattened pairs.
    pub fn to_form(&self) -> String {
        form_urlencoded::Serializer::new(String::new())
            .extend_pairs(self.flatten())
            .finish()
    }

    /// JSON object form, used when requests are sent as JSON. Booleans are
    /// still `0`/`1`.
    pub fn to_json(&self) -> Value {
        let object: Map<String, Value> = self
            .entries
            .iter()
            .map(|(key, value)| (key.clone(), value.to_json()))
            .collect();
        Value::Object(object)
    }
}

impl Extend<(String, ParamValue)> for Params {
    fn extend<I: IntoIterator<Item = (String, ParamValue)>>(&mut self, iter: I) {
        for (name, value) in iter {
            self.insert(name, value);
        }
    }
}

impl<K: Into<String>, V: Into<ParamValue>> FromIterator<(K, V)> for Params {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut params = Params::new();
        for (name, value) in iter {
            params.insert(name, value);
        }
        params
    }
}

impl IntoIterator for Params {
    type Item = (String, ParamValue);
    type IntoIter = std::vec::IntoIter<(String, ParamValue)>;

    fn into_iter(self) -> Self::IntoIter {
        self.entries.into_iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn scalar_form_encoding() {
        let params = Params::new().with("client_id", 42).with("metadata", 1);
        assert_eq!(params.to_form(), "client_id=42&metadata=1");
    }

    #[test]
    fn booleans_encode_as_digits() {
        let params = Params::new().with("on", true).with("off", false);
        assert_eq!(params.to_form(), "on=1&off=0");
        assert_eq!(params.to_json()["on"], 1);
        assert_eq!(params.to_json()["off"], 0);
    }

    #[test]
    fn reserved_characters_are_percent_encoded() {
        let params = Params::new().with("pass", "a&b=c d/é");
        assert_eq!(params.to_form(), "pass=a%26b%3Dc+d%2F%C3%A9");
    }

    #[test]
    fn insert_replaces_in_place() {
        let mut params = Params::new().with("a", 1).with("b", 2);
        let previous = params.insert("a", "x");
        assert_eq!(previous, Some(ParamValue::Int(1)));
        assert_eq!(params.to_form(), "a=x&b=2");
        assert_eq!(params.len(), 2);
    }

    #[test]
    fn remove_drops_entry() {
        let mut params = Params::new().with("a", 1).with("b", 2);
        assert_eq!(params.remove("a"), Some(ParamValue::Int(1)));
        assert!(params.remove("a").is_none());
        assert!(!params.contains("a"));
        assert_eq!(params.to_form(), "b=2");
    }

    #[test]
    fn nested_values_flatten_to_bracketed_keys() {
        let params = Params::new()
            .with("ids", vec![3, 4])
            .with("info", Params::new().with("city", "Montréal").with("tags", vec!["a", "b"]));
        assert_eq!(
            params.flatten(),
            vec![
                ("ids[0]".to_string(), "3".to_string()),
                ("ids[1]".to_string(), "4".to_string()),
                ("info[city]".to_string(), "Montréal".to_string()),
                ("info[tags][0]".to_string(), "a".to_string()),
                ("info[tags][1]".to_string(), "b".to_string()),
            ]
        );
        assert_eq!(
            params.to_form(),
            "ids%5B0%5D=3&ids%5B1%5D=4&info%5Bcity%5D=Montr%C3%A9al&info%5Btags%5D%5B0%5D=a&info%5Btags%5D%5B1%5D=b"
        );
    }

    #[test]
    fn nested_values_stay_structured_in_json() {
        let params = Params::new().with("info", Params::new().with("zip", 10001)).with("ids", vec![1]);
        assert_eq!(params.to_json(), serde_json::json!({"info": {"zip": 10001}, "ids": [1]}));
    }

    #[test]
    fn empty_params_encode_to_empty_body() {
        assert_eq!(Params::new().to_form(), "");
        assert_eq!(Params::new().to_json(), serde_json::json!({}));
    }

    #[test]
    fn collect_from_pairs() {
        let params: Params = [("login", "alice"), ("pass", "secret")].into_iter().collect();
        assert_eq!(params.names().collect::<Vec<_>>(), vec!["login", "pass"]);
    }
}
