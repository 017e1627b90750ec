//! The `{status, data, error_code, error_message}` response envelope.

use serde::de::Error as _;
use serde::Deserialize;
use serde_json::Value;

use crate::error::ApiError;

/// Every JSON answer from the API is wrapped in this object.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct Envelope {
    #[serde(default)]
    pub status: Value,
    #[serde(default)]
    pub data: Value,
    #[serde(default)]
    pub error_code: Value,
    #[serde(default)]
    pub error_message: Value,
}

impl Envelope {
    /// Decode a response body. Only a JSON object is an envelope.
    pub fn from_slice(body: &[u8]) -> Result<Self, serde_json::Error> {
        let value: Value = serde_json::from_slice(body)?;
        if !value.is_object() {
            return Err(serde_json::Error::custom("response envelope must be a JSON object"));
        }
        serde_json::from_value(value)
    }

    pub fn is_success(&self) -> bool {
        is_truthy(&self.status)
    }

    /// `data` on success, otherwise the envelope's error pair.
    pub fn into_result(self) -> Result<Value, ApiError> {
        if self.is_success() {
            return Ok(self.data);
        }
        let message = match self.error_message {
            Value::Null => String::new(),
            Value::String(s) => s,
            other => other.to_string(),
        };
        Err(ApiError {
            code: self.error_code,
            message,
        })
    }
}

/// Truthiness of a `status` value, following the server's PHP semantics:
/// `null`, `false`, `0`, `""`, `"0"`, `[]` and `{}` are false.
pub fn is_truthy(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().is_some_and(|f| f != 0.0),
        Value::String(s) => !(s.is_empty() || s == "0"),
        Value::Array(items) => !items.is_empty(),
        Value::Object(map) => !map.is_empty(),
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    fn envelope(raw: &str) -> Envelope {
        serde_json::from_str(raw).unwrap()
    }

    #[test]
    fn success_returns_data_verbatim() {
        let data = envelope(r#"{"status":true,"data":{"client_id":"1001","metadata":{}}}"#)
            .into_result()
            .unwrap();
        assert_eq!(data, json!({"client_id": "1001", "metadata": {}}));
    }

    #[test]
    fn success_without_data_is_null() {
        assert_eq!(envelope(r#"{"status":1}"#).into_result().unwrap(), Value::Null);
    }

    #[test]
    fn failure_carries_code_and_message() {
        let err = envelope(r#"{"status":false,"error_code":1,"error_message":"Login failed","data":""}"#)
            .into_result()
            .unwrap_err();
        assert_eq!(err.code, json!(1));
        assert_eq!(err.message, "Login failed");
    }

    #[test]
    fn missing_status_is_failure() {
        let err = envelope(r#"{"data":{"a":1}}"#).into_result().unwrap_err();
        assert_eq!(err.code, Value::Null);
        assert_eq!(err.message, "");
    }

    #[test]
    fn non_string_message_is_stringified() {
        let err = envelope(r#"{"status":0,"error_code":"9","error_message":404}"#)
            .into_result()
            .unwrap_err();
        assert_eq!(err.code, json!("9"));
        assert_eq!(err.message, "404");
    }

    #[test]
    fn from_slice_rejects_non_objects() {
        assert!(Envelope::from_slice(b"[true]").is_err());
        assert!(Envelope::from_slice(b"\"ok\"").is_err());
        assert!(Envelope::from_slice(b"not json").is_err());
        assert!(Envelope::from_slice(br#"{"status":true}"#).unwrap().is_success());
    }

    #[test]
    fn truthiness_table() {
        for falsy in [json!(null), json!(false), json!(0), json!(0.0), json!(""), json!("0"), json!([]), json!({})] {
            assert!(!is_truthy(&falsy), "{falsy} should be falsy");
        }
        for truthy in [json!(true), json!(1), json!(-1), json!("1"), json!("false"), json!([0]), json!({"a": 0})] {
            assert!(is_truthy(&truthy), "{truthy} should be truthy");
        }
    }
}
