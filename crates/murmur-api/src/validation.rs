use axum::{
    Json,
    extract::{FromRequest, Request},
};
use serde::de::DeserializeOwned;
use serde_json::Value;

use crate::error::ApiError;

pub const MAX_USERNAME_CHARS: usize = 150;
pub const MAX_MESSAGE_CHARS: usize = 200;

/// JSON body extractor whose rejections are reported as `{"detail": ...}`
/// instead of axum's plain-text bodies. Only a JSON object is accepted as
/// the body.
pub struct JsonBody<T>(pub T);

impl<S, T> FromRequest<S> for JsonBody<T>
where
    T: DeserializeOwned,
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let Json(value) = Json::<Value>::from_request(req, state).await.map_err(|rejection| {
            ApiError::Validation(format!("JSON parse error - {}", rejection.body_text()))
        })?;

        if !value.is_object() {
            return Err(ApiError::Validation(format!(
                "Invalid data. Expected a dictionary, but got {}.",
                type_name(&value)
            )));
        }

        serde_json::from_value(value)
            .map(Self)
            .map_err(|e| ApiError::Validation(format!("JSON parse error - {}", e)))
    }
}

fn type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "bool",
        Value::Number(n) if n.is_f64() => "float",
        Value::Number(_) => "int",
        Value::String(_) => "str",
        Value::Array(_) => "list",
        Value::Object(_) => "dict",
    }
}

/// How a text field is checked.
#[derive(Debug, Clone, Copy)]
pub struct TextField {
    pub max_chars: Option<usize>,
    /// Strip surrounding whitespace before the blank/length checks.
    pub trim: bool,
}

impl TextField {
    pub const USERNAME: Self = Self { max_chars: Some(MAX_USERNAME_CHARS), trim: true };
    pub const PASSWORD: Self = Self { max_chars: None, trim: false };
    pub const MESSAGE: Self = Self { max_chars: Some(MAX_MESSAGE_CHARS), trim: true };

    /// Validates one raw JSON field, returning the cleaned string or the
    /// first problem found.
    pub fn clean(&self, raw: Option<Value>) -> Result<String, ApiError> {
        let value = match raw {
            None => return Err(invalid("This field is required.")),
            Some(Value::Null) => return Err(invalid("This field may not be null.")),
            Some(Value::String(s)) => s,
            // numbers are accepted in their JSON text form
            Some(Value::Number(n)) => n.to_string(),
            Some(_) => return Err(invalid("Not a valid string.")),
        };

        let value = if self.trim { value.trim().to_string() } else { value };
        if value.is_empty() {
            return Err(invalid("This field may not be blank."));
        }

        if let Some(max) = self.max_chars {
            if value.chars().count() > max {
                return Err(ApiError::Validation(format!(
                    "Ensure this field has no more than {} characters.",
                    max
                )));
            }
        }

        Ok(value)
    }
}

fn invalid(msg: &str) -> ApiError {
    ApiError::Validation(msg.to_string())
}
