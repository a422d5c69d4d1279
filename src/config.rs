//! GitLab provider settings.
//!
//! [`GitlabSettings`] holds the raw, optional inputs as they arrive from a
//! TOML file or `GITLAB_*` environment variables. [`GitlabSettings::resolve`]
//! turns them into a [`GitlabConfig`] whose endpoint URLs are fixed for the
//! lifetime of the value.

use std::path::Path;

use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};
use serde::{Deserialize, Deserializer, Serialize};
use url::Url;

use crate::{AuthError, OAuthClientConfig};

pub const ENV_PREFIX: &str = "GITLAB_";

pub const DEFAULT_HTTP_SCHEME: &str = "https";
pub const DEFAULT_API_VERSION: u32 = 4;
pub const DEFAULT_AUTH_SCOPE: &str = "api";

const BASE_DOMAIN_SETTING: &str = "GITLAB_BASE_DOMAIN";
const APP_ID_SETTING: &str = "GITLAB_APP_ID";
const API_SECRET_SETTING: &str = "GITLAB_API_SECRET";

/// Credentials are taken from the environment verbatim instead of going
/// through figment's value parsing, which would turn `0012345` into `12345`.
const VERBATIM_ENV: [(&str, &str); 2] = [
    ("app_id", APP_ID_SETTING),
    ("api_secret", API_SECRET_SETTING),
];

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct GitlabSettings {
    #[serde(deserialize_with = "optional_text")]
    pub base_domain: Option<String>,
    pub http_scheme: String,
    pub api_version: u32,
    pub auth_scope: String,
    #[serde(deserialize_with = "optional_text")]
    pub app_id: Option<String>,
    #[serde(deserialize_with = "optional_text")]
    pub api_secret: Option<String>,
}

impl Default for GitlabSettings {
    fn default() -> Self {
        Self {
            base_domain: None,
            http_scheme: DEFAULT_HTTP_SCHEME.to_string(),
            api_version: DEFAULT_API_VERSION,
            auth_scope: DEFAULT_AUTH_SCOPE.to_string(),
            app_id: None,
            api_secret: None,
        }
    }
}

impl GitlabSettings {
    pub fn new(base_domain: impl Into<String>) -> Self {
        Self {
            base_domain: Some(base_domain.into()),
            ..Self::default()
        }
    }

    pub fn with_http_scheme(mut self, scheme: impl Into<String>) -> Self {
        self.http_scheme = scheme.into();
        self
    }

    pub fn with_api_version(mut self, version: u32) -> Self {
        self.api_version = version;
        self
    }

    pub fn with_auth_scope(mut self, scope: impl Into<String>) -> Self {
        self.auth_scope = scope.into();
        self
    }

    pub fn with_credentials(
        mut self,
        app_id: impl Into<String>,
        api_secret: impl Into<String>,
    ) -> Self {
        self.app_id = Some(app_id.into());
        self.api_secret = Some(api_secret.into());
        self
    }

    /// Defaults, overridden by `GITLAB_*` environment variables.
    pub fn load() -> Result<Self, AuthError> {
        Ok(Self::figment(None).extract()?)
    }

    /// Defaults, then the TOML file at `path`, then `GITLAB_*` environment
    /// variables. A missing file contributes nothing.
    pub fn load_from(path: impl AsRef<Path>) -> Result<Self, AuthError> {
        Ok(Self::figment(Some(path.as_ref())).extract()?)
    }

    fn figment(path: Option<&Path>) -> Figment {
        let mut figment = Figment::new().merge(Serialized::defaults(Self::default()));
        if let Some(path) = path {
            figment = figment.merge(Toml::file(path));
        }
        let verbatim = VERBATIM_ENV.map(|(key, _)| key);
        figment = figment.merge(Env::prefixed(ENV_PREFIX).ignore(&verbatim));
        for (key, variable) in VERBATIM_ENV {
            if let Ok(value) = std::env::var(variable) {
                figment = figment.merge(Serialized::default(key, value));
            }
        }
        figment
    }

    /// Derives the endpoint URLs. Fails when no base domain is set.
    pub fn resolve(&self) -> Result<GitlabConfig, AuthError> {
        let domain = self
            .base_domain
            .as_deref()
            .map(|domain| domain.trim().trim_end_matches('/'))
            .filter(|domain| !domain.is_empty())
            .ok_or(AuthError::ConfigurationMissing {
                setting: BASE_DOMAIN_SETTING,
            })?;

        let scheme = self.http_scheme.trim().to_ascii_lowercase();
        if scheme != "https" && scheme != "http" {
            return Err(AuthError::InvalidConfiguration {
                message: format!("unsupported http scheme `{}`", self.http_scheme),
            });
        }

        let scope = self.auth_scope.trim();
        let scope = if scope.is_empty() {
            DEFAULT_AUTH_SCOPE
        } else {
            scope
        };

        let authorize_url = format!("{scheme}://{domain}/oauth/authorize");
        let token_url = format!("{scheme}://{domain}/oauth/token");
        let api_base_url = format!("{scheme}://{domain}/api/v{}", self.api_version);
        for url in [&authorize_url, &token_url, &api_base_url] {
            Url::parse(url)?;
        }

        tracing::debug!(
            domain,
            scheme = %scheme,
            api_version = self.api_version,
            "resolved gitlab endpoints"
        );

        Ok(GitlabConfig {
            base_domain: domain.to_string(),
            http_scheme: scheme,
            api_version: self.api_version,
            scope: scope.to_string(),
            authorize_url,
            token_url,
            api_base_url,
        })
    }

    /// Credentials for the code exchange. Both the app id and secret are
    /// required.
    pub fn client_config(
        &self,
        redirect_uri: impl Into<String>,
    ) -> Result<OAuthClientConfig, AuthError> {
        let app_id = non_blank(self.app_id.as_deref()).ok_or(AuthError::ConfigurationMissing {
            setting: APP_ID_SETTING,
        })?;
        let api_secret =
            non_blank(self.api_secret.as_deref()).ok_or(AuthError::ConfigurationMissing {
                setting: API_SECRET_SETTING,
            })?;

        Ok(OAuthClientConfig::new(app_id, redirect_uri).with_client_secret(api_secret))
    }
}

fn non_blank(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|value| !value.is_empty())
}

/// A TOML file may spell `app_id = 12345` or `base_domain` as a bare
/// number. Accept any scalar and keep its text.
fn optional_text<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Scalar {
        Text(String),
        Unsigned(u64),
        Signed(i64),
        Float(f64),
        Bool(bool),
    }

    Ok(Option::<Scalar>::deserialize(deserializer)?.map(|value| match value {
        Scalar::Text(text) => text,
        Scalar::Unsigned(number) => number.to_string(),
        Scalar::Signed(number) => number.to_string(),
        Scalar::Float(number) => number.to_string(),
        Scalar::Bool(flag) => flag.to_string(),
    }))
}

/// Resolved, immutable GitLab endpoint configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct GitlabConfig {
    base_domain: String,
    http_scheme: String,
    api_version: u32,
    scope: String,
    authorize_url: String,
    token_url: String,
    api_base_url: String,
}

impl GitlabConfig {
    pub fn base_domain(&self) -> &str {
        &self.base_domain
    }

    pub fn http_scheme(&self) -> &str {
        &self.http_scheme
    }

    pub fn api_version(&self) -> u32 {
        self.api_version
    }

    pub fn scope(&self) -> &str {
        &self.scope
    }

    pub fn scopes(&self) -> Vec<&str> {
        self.scope.split_whitespace().collect()
    }

    pub fn authorize_url(&self) -> &str {
        &self.authorize_url
    }

    pub fn token_url(&self) -> &str {
        &self.token_url
    }

    pub fn api_base_url(&self) -> &str {
        &self.api_base_url
    }

    pub fn user_info_url(&self) -> String {
        format!("{}/user", self.api_base_url)
    }
}
