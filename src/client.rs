use std::collections::HashMap;
use std::time::Duration;

use reqwest::{
    Client, RequestBuilder, Response,
    header::{HeaderName, HeaderValue},
};
use serde_json::{Map, Value};
use url::Url;

use crate::{
    AccessTokenPlacement, AuthError, AuthorizationRequest, AuthorizationResponse, LoginOutcome,
    OAuthProvider, TokenRequestFormat, TokenResponse, UserResponse, extra_data,
};

const MAX_ERROR_BODY: usize = 256;

#[derive(Debug, Clone)]
pub struct OAuthClientConfig {
    pub client_id: String,
    pub client_secret: Option<String>,
    pub redirect_uri: String,
    pub scope: Option<String>,
    pub authorize_params: Vec<(String, String)>,
    pub token_params: Vec<(String, String)>,
    pub timeout: Option<Duration>,
}

impl OAuthClientConfig {
    pub fn new(client_id: impl Into<String>, redirect_uri: impl Into<String>) -> Self {
        Self {
            client_id: client_id.into(),
            client_secret: None,
            redirect_uri: redirect_uri.into(),
            scope: None,
            authorize_params: Vec::new(),
            token_params: Vec::new(),
            timeout: None,
        }
    }

    pub fn with_client_secret(mut self, client_secret: impl Into<String>) -> Self {
        self.client_secret = Some(client_secret.into());
        self
    }

    pub fn with_scope(mut self, scope: impl Into<String>) -> Self {
        self.scope = Some(scope.into());
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    pub fn with_authorize_param(
        mut self,
        key: impl Into<String>,
        value: impl Into<String>,
    ) -> Self {
        self.authorize_params.push((key.into(), value.into()));
        self
    }

    pub fn with_token_param(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.token_params.push((key.into(), value.into()));
        self
    }
}

/// Authorization-code login driven by a provider value.
///
/// The client holds no per-login state; one instance can serve any number of
/// concurrent logins.
#[derive(Debug, Clone)]
pub struct OAuthClient<P: OAuthProvider> {
    provider: P,
    config: OAuthClientConfig,
    http: Client,
}

impl<P: OAuthProvider> OAuthClient<P> {
    pub fn new(provider: P, config: OAuthClientConfig) -> Result<Self, AuthError> {
        let mut builder = Client::builder();
        if let Some(timeout) = config.timeout {
            builder = builder.timeout(timeout);
        }
        let http = builder.build()?;
        Ok(Self {
            provider,
            config,
            http,
        })
    }

    /// Uses a client built by the host, including its timeouts and proxies.
    pub fn with_http_client(provider: P, config: OAuthClientConfig, http: Client) -> Self {
        Self {
            provider,
            config,
            http,
        }
    }

    pub fn provider(&self) -> &P {
        &self.provider
    }

    pub fn config(&self) -> &OAuthClientConfig {
        &self.config
    }

    pub fn authorization_url(&self) -> Result<AuthorizationRequest, AuthError> {
        self.authorization_url_with_state(None)
    }

    pub fn authorization_url_with_state(
        &self,
        state: Option<String>,
    ) -> Result<AuthorizationRequest, AuthError> {
        let scope = self
            .config
            .scope
            .as_deref()
            .unwrap_or(self.provider.default_scope());

        let mut params: Vec<(String, String)> = Vec::new();
        for (key, value) in &self.config.authorize_params {
            set_param(&mut params, key, value.clone());
        }

        set_param(&mut params, "response_type", "code".to_string());
        set_param(&mut params, "client_id", self.config.client_id.clone());
        set_param(&mut params, "redirect_uri", self.config.redirect_uri.clone());
        set_param(&mut params, "scope", scope.to_string());
        if let Some(state) = &state {
            set_param(&mut params, "state", state.clone());
        }

        let mut url = Url::parse(self.provider.authorize_url())?;
        url.query_pairs_mut().extend_pairs(&params);

        Ok(AuthorizationRequest {
            authorization_url: url.to_string(),
            state,
            scope: scope.to_string(),
        })
    }

    pub async fn exchange_code(
        &self,
        response: AuthorizationResponse,
    ) -> Result<TokenResponse, AuthError> {
        let mut payload = HashMap::new();
        payload.insert("grant_type".to_string(), "authorization_code".to_string());
        payload.insert("code".to_string(), response.code);
        payload.insert("client_id".to_string(), self.config.client_id.clone());
        payload.insert("redirect_uri".to_string(), self.config.redirect_uri.clone());

        if let Some(secret) = &self.config.client_secret {
            payload.insert("client_secret".to_string(), secret.clone());
        }

        self.send_token_request(payload).await
    }

    /// Fetches the user-info document for `access_token`. Every call hits the
    /// network.
    pub async fn user_data(&self, access_token: &str) -> Result<UserResponse, AuthError> {
        let url = self.provider.user_info_url();
        tracing::debug!(provider = self.provider.id(), url, "fetching user data");

        let builder = self.http.get(url).header("Accept", "application/json");
        let builder = match self.provider.access_token_placement() {
            AccessTokenPlacement::Query => builder.query(&[("access_token", access_token)]),
            AccessTokenPlacement::BearerHeader => builder.bearer_auth(access_token),
        };

        let body = self.read_body(builder.send().await, "user data").await?;
        UserResponse::from_body(&body).inspect_err(|err| self.log_malformed("user data", err))
    }

    /// Exchanges the code, fetches the profile and applies the provider's
    /// mappings.
    pub async fn complete(
        &self,
        response: AuthorizationResponse,
    ) -> Result<LoginOutcome, AuthError> {
        let tokens = self.exchange_code(response).await?;
        let user = self.user_data(&tokens.access_token).await?;
        let details = self.provider.user_details(&user);

        let mut combined = user.clone();
        combined.merge(token_fields(&tokens)?);
        let data = self.extra_data(&tokens.access_token, &combined);

        tracing::debug!(
            provider = self.provider.id(),
            username = details.username.as_deref(),
            "login completed"
        );

        Ok(LoginOutcome {
            provider: self.provider.id(),
            tokens,
            user,
            details,
            extra_data: data,
        })
    }

    /// The fields persisted next to an identity: the access token, then the
    /// provider's extra-data list applied to `response`.
    pub fn extra_data(
        &self,
        access_token: &str,
        response: &UserResponse,
    ) -> Map<String, Value> {
        let mut data = Map::new();
        data.insert(
            "access_token".to_string(),
            Value::String(access_token.to_string()),
        );
        data.extend(extra_data(response, self.provider.extra_data_fields()));
        data
    }

    async fn send_token_request(
        &self,
        mut payload: HashMap<String, String>,
    ) -> Result<TokenResponse, AuthError> {
        for (key, value) in &self.config.token_params {
            payload.insert(key.clone(), value.clone());
        }

        let headers = self.provider.token_headers();
        let mut builder = self.http.post(self.provider.token_url());
        builder = apply_headers(builder, &headers)?;

        tracing::debug!(
            provider = self.provider.id(),
            url = self.provider.token_url(),
            "exchanging authorization code"
        );

        let sent = match self.provider.token_request_format() {
            TokenRequestFormat::Json => builder.json(&payload).send().await,
            TokenRequestFormat::Form => builder.form(&payload).send().await,
        };
        let body = self.read_body(sent, "token").await?;

        serde_json::from_str(&body)
            .map_err(|err| AuthError::malformed(err, body))
            .inspect_err(|err| self.log_malformed("token", err))
    }

    async fn read_body(
        &self,
        sent: Result<Response, reqwest::Error>,
        what: &str,
    ) -> Result<String, AuthError> {
        let response = sent.inspect_err(|err| {
            tracing::warn!(provider = self.provider.id(), error = %err, "{what} request failed");
        })?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            tracing::warn!(
                provider = self.provider.id(),
                status = status.as_u16(),
                "{what} request rejected"
            );
            return Err(AuthError::AuthFailed {
                status: Some(status.as_u16()),
                message: format!("error during {what} retrieval: {}", excerpt(&body)),
            });
        }

        Ok(response.text().await?)
    }

    fn log_malformed(&self, what: &str, err: &AuthError) {
        tracing::warn!(provider = self.provider.id(), error = %err, "malformed {what} response");
    }
}

/// At most `MAX_ERROR_BODY` characters of a provider body, for error messages.
fn excerpt(body: &str) -> String {
    match body.char_indices().nth(MAX_ERROR_BODY) {
        Some((end, _)) => format!("{}...", &body[..end]),
        None => body.to_string(),
    }
}

fn token_fields(tokens: &TokenResponse) -> Result<Map<String, Value>, AuthError> {
    match serde_json::to_value(tokens) {
        Ok(Value::Object(fields)) => Ok(fields
            .into_iter()
            .filter(|(_, value)| !value.is_null())
            .collect()),
        Ok(other) => Err(AuthError::malformed(
            "token response is not an object",
            other.to_string(),
        )),
        Err(err) => Err(AuthError::malformed(err, String::new())),
    }
}

fn set_param(params: &mut Vec<(String, String)>, key: &str, value: String) {
    if let Some((_, existing)) = params.iter_mut().find(|(param, _)| param == key) {
        *existing = value;
    } else {
        params.push((key.to_string(), value));
    }
}

fn apply_headers(
    mut builder: RequestBuilder,
    headers: &[(String, String)],
) -> Result<RequestBuilder, AuthError> {
    for (name, value) in headers {
        let invalid = || AuthError::InvalidConfiguration {
            message: format!("invalid header: {name}={value}"),
        };
        let name = HeaderName::from_bytes(name.as_bytes()).map_err(|_| invalid())?;
        let value = HeaderValue::from_str(value).map_err(|_| invalid())?;
        builder = builder.header(name, value);
    }
    Ok(builder)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{GitlabProvider, GitlabSettings};

    fn client(config: OAuthClientConfig) -> OAuthClient<GitlabProvider> {
        let provider =
            GitlabProvider::from_settings(&GitlabSettings::new("gitlab.example.com")).unwrap();
        OAuthClient::new(provider, config).unwrap()
    }

    #[test]
    fn authorization_url_includes_required_params() {
        let config = OAuthClientConfig::new("client-id", "http://localhost:8765/complete");
        let auth = client(config)
            .authorization_url_with_state(Some("xyz".to_string()))
            .unwrap();

        let url = Url::parse(&auth.authorization_url).unwrap();
        assert_eq!(url.host_str(), Some("gitlab.example.com"));
        assert_eq!(url.path(), "/oauth/authorize");

        let pairs: HashMap<_, _> = url.query_pairs().into_owned().collect();
        assert_eq!(pairs.get("response_type"), Some(&"code".to_string()));
        assert_eq!(pairs.get("client_id"), Some(&"client-id".to_string()));
        assert_eq!(
            pairs.get("redirect_uri"),
            Some(&"http://localhost:8765/complete".to_string())
        );
        assert_eq!(pairs.get("scope"), Some(&"api".to_string()));
        assert_eq!(pairs.get("state"), Some(&"xyz".to_string()));
        assert!(!pairs.contains_key("code_challenge"));
        assert_eq!(auth.scope, "api");
    }

    #[test]
    fn configured_scope_and_params_override_defaults() {
        let config = OAuthClientConfig::new("client-id", "http://localhost/complete")
            .with_scope("read_user openid")
            .with_authorize_param("prompt", "consent")
            .with_authorize_param("response_type", "token");
        let auth = client(config).authorization_url().unwrap();

        let url = Url::parse(&auth.authorization_url).unwrap();
        let pairs: HashMap<_, _> = url.query_pairs().into_owned().collect();
        assert_eq!(pairs.get("scope"), Some(&"read_user openid".to_string()));
        assert_eq!(pairs.get("prompt"), Some(&"consent".to_string()));
        assert_eq!(pairs.get("response_type"), Some(&"code".to_string()));
        assert!(!pairs.contains_key("state"));
        assert_eq!(auth.state, None);
    }

    #[test]
    fn error_excerpt_is_bounded() {
        assert_eq!(excerpt("invalid_grant"), "invalid_grant");

        let body = "é".repeat(MAX_ERROR_BODY * 4);
        let short = excerpt(&body);
        assert_eq!(short.chars().count(), MAX_ERROR_BODY + 3);
        assert!(short.ends_with("..."));
    }

    #[test]
    fn extra_data_starts_with_access_token() {
        let client = client(OAuthClientConfig::new("client-id", "http://localhost/complete"));
        let response = UserResponse::from_body(r#"{"id": 7, "username": "bob"}"#).unwrap();
        let data = client.extra_data("at", &response);

        assert_eq!(data.keys().next().map(String::as_str), Some("access_token"));
        assert_eq!(
            Value::Object(data),
            serde_json::json!({
                "access_token": "at",
                "id": 7,
                "expires": null,
                "refresh_token": null
            })
        );
    }

    #[test]
    fn token_fields_skip_missing_values() {
        let tokens: TokenResponse = serde_json::from_value(serde_json::json!({
            "access_token": "at",
            "expires_in": 7200,
            "created_at": 1700000000
        }))
        .unwrap();
        let fields = token_fields(&tokens).unwrap();
        assert_eq!(fields.get("expires_in"), Some(&serde_json::json!(7200)));
        assert_eq!(fields.get("created_at"), Some(&serde_json::json!(1700000000)));
        assert!(!fields.contains_key("refresh_token"));
    }
}
