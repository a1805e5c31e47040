use serde::{Deserialize, Serialize};
use serde_json::{Number, Value};

use crate::error::ProtocolError;

pub const REQUESTED_WITH_HEADER: &str = "x-requested-with";
pub const REQUESTED_WITH_VALUE: &str = "XMLHttpRequest";
/// `meta.code` the endpoint uses to signal login throttling.
pub const RATE_LIMIT_CODE: i64 = 302;

/// Request descriptor handed to a transport: a POST of every named form field.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FormRequest {
    pub url: String,
    pub headers: Vec<(String, String)>,
    pub fields: Vec<(String, String)>,
}

impl FormRequest {
    pub fn post(url: impl Into<String>, fields: Vec<(String, String)>) -> Self {
        Self {
            url: url.into(),
            headers: vec![(
                REQUESTED_WITH_HEADER.to_string(),
                REQUESTED_WITH_VALUE.to_string(),
            )],
            fields,
        }
    }

    pub fn field(&self, name: &str) -> Option<&str> {
        self.fields
            .iter()
            .find(|(field, _)| field == name)
            .map(|(_, value)| value.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResponseStatus {
    Error,
    Success,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ValidationResponse {
    pub status: ResponseStatus,
    #[serde(default)]
    pub data: Option<FieldMessages>,
    #[serde(default)]
    pub meta: Option<ResponseMeta>,
}

impl ValidationResponse {
    pub fn from_value(value: Value) -> Result<Self, ProtocolError> {
        Ok(serde_json::from_value(value)?)
    }

    /// Redirect target when the response is a throttling signal.
    pub fn rate_limit_redirect(&self) -> Option<&str> {
        if self.status != ResponseStatus::Error {
            return None;
        }
        let meta = self.meta.as_ref()?;
        // 302 and 302.0 are the same code on the wire.
        let code = meta.code.as_ref().and_then(Number::as_f64);
        if code != Some(RATE_LIMIT_CODE as f64) {
            return None;
        }
        meta.redirect.as_deref().filter(|target| !target.is_empty())
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ResponseMeta {
    #[serde(default)]
    pub code: Option<Number>,
    #[serde(default)]
    pub redirect: Option<String>,
    #[serde(default)]
    pub description: Option<FieldMessages>,
}

/// Message payload shared by `data` and `meta.description`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FieldMessages {
    #[serde(default, rename = "type")]
    pub kind: Option<String>,
    #[serde(default)]
    pub message: Option<String>,
    #[serde(default)]
    pub email: Option<Vec<String>>,
    #[serde(default)]
    pub valid: Option<Value>,
}

impl FieldMessages {
    pub fn field_kind(&self) -> Option<&str> {
        self.kind.as_deref().filter(|kind| !kind.is_empty())
    }

    pub fn email_message(&self) -> Option<&str> {
        self.email.as_ref()?.first().map(String::as_str)
    }

    pub fn message_text(&self) -> &str {
        self.message.as_deref().unwrap_or_default()
    }

    /// `valid` follows JSON truthiness: `false`, `0`, `""` and `null` are unset.
    pub fn is_valid(&self) -> bool {
        match &self.valid {
            None | Some(Value::Null) => false,
            Some(Value::Bool(flag)) => *flag,
            Some(Value::Number(number)) => number.as_f64().is_some_and(|n| n != 0.0),
            Some(Value::String(text)) => !text.is_empty(),
            Some(Value::Array(_)) | Some(Value::Object(_)) => true,
        }
    }
}

#[cfg(test)]
#[path = "tests/protocol_tests.rs"]
mod tests;
