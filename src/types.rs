use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use url::Url;

use crate::{AuthError, UserDetails};

#[derive(Debug, Clone)]
pub struct AuthorizationRequest {
    pub authorization_url: String,
    pub state: Option<String>,
    pub scope: String,
}

#[derive(Debug, Clone)]
pub struct AuthorizationResponse {
    pub code: String,
    pub state: Option<String>,
}

impl AuthorizationResponse {
    pub fn from_callback(code: &str, state: Option<&str>) -> Self {
        Self {
            code: code.to_string(),
            state: state.map(str::to_string),
        }
    }

    pub fn from_url(callback_url: &str) -> Result<Self, AuthError> {
        let url = Url::parse(callback_url)?;
        let mut code = None;
        let mut state = None;
        let mut error = None;
        let mut error_description = None;

        for (key, value) in url.query_pairs() {
            match key.as_ref() {
                "code" => code = Some(value.to_string()),
                "state" => state = Some(value.to_string()),
                "error" => error = Some(value.to_string()),
                "error_description" => error_description = Some(value.to_string()),
                _ => {}
            }
        }

        if let Some(error) = error {
            return Err(AuthError::auth_failed(error_description.unwrap_or(error)));
        }

        let code = code
            .filter(|code| !code.is_empty())
            .ok_or(AuthError::MissingAuthorizationCode)?;
        Ok(Self::from_callback(&code, state.as_deref()))
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TokenResponse {
    pub access_token: String,
    pub refresh_token: Option<String>,
    pub token_type: Option<String>,
    pub scope: Option<String>,
    pub expires_in: Option<u64>,
    #[serde(flatten)]
    pub extra: HashMap<String, Value>,
}

/// The user-info body returned by a provider, kept as an untyped object.
///
/// Every accessor treats a missing key and an explicit `null` the same way.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct UserResponse(Map<String, Value>);

impl UserResponse {
    /// Only JSON objects are accepted; anything else breaks the provider
    /// contract.
    pub fn from_value(value: Value) -> Result<Self, AuthError> {
        match value {
            Value::Object(fields) => Ok(Self(fields)),
            other => Err(AuthError::malformed(
                format!("expected a json object, found {}", json_kind(&other)),
                other.to_string(),
            )),
        }
    }

    pub fn from_body(body: &str) -> Result<Self, AuthError> {
        let value: Value =
            serde_json::from_str(body).map_err(|err| AuthError::malformed(err, body))?;
        Self::from_value(value)
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.0.get(key).filter(|value| !value.is_null())
    }

    pub fn get_str(&self, key: &str) -> Option<&str> {
        self.get(key).and_then(Value::as_str)
    }

    /// Copies `other` over this response, replacing keys present in both.
    pub fn merge(&mut self, other: Map<String, Value>) {
        self.0.extend(other);
    }

    pub fn fields(&self) -> &Map<String, Value> {
        &self.0
    }

    pub fn into_fields(self) -> Map<String, Value> {
        self.0
    }
}

impl From<Map<String, Value>> for UserResponse {
    fn from(fields: Map<String, Value>) -> Self {
        Self(fields)
    }
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

/// Everything a host needs to persist after a successful login.
#[derive(Debug, Clone, Serialize)]
pub struct LoginOutcome {
    pub provider: &'static str,
    pub tokens: TokenResponse,
    pub user: UserResponse,
    pub details: UserDetails,
    pub extra_data: Map<String, Value>,
}
