use thiserror::Error;

const LOGIN_FAILED: &str = "login failed, try again";
const NOT_CONFIGURED: &str = "gitlab login is not configured";

#[derive(Debug, Error)]
pub enum AuthError {
    #[error("missing required setting {setting}")]
    ConfigurationMissing { setting: &'static str },

    #[error("invalid configuration: {message}")]
    InvalidConfiguration { message: String },

    #[error("url parse error: {0}")]
    Url(#[from] url::ParseError),

    #[error("authentication failed{}: {message}", status_suffix(.status))]
    AuthFailed { status: Option<u16>, message: String },

    #[error("malformed response: {message}")]
    MalformedResponse { message: String, body: String },

    #[error("missing authorization code in callback url")]
    MissingAuthorizationCode,
}

fn status_suffix(status: &Option<u16>) -> String {
    status
        .map(|status| format!(" (http status {status})"))
        .unwrap_or_default()
}

impl AuthError {
    pub(crate) fn auth_failed(message: impl Into<String>) -> Self {
        Self::AuthFailed {
            status: None,
            message: message.into(),
        }
    }

    pub(crate) fn malformed(message: impl ToString, body: impl Into<String>) -> Self {
        Self::MalformedResponse {
            message: message.to_string(),
            body: body.into(),
        }
    }

    /// HTTP status reported by the provider, if the failure carried one.
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::AuthFailed { status, .. } => *status,
            _ => None,
        }
    }

    /// Message suitable for showing to the person trying to log in.
    ///
    /// Provider contract violations are reported the same way as plain
    /// authentication failures.
    pub fn user_message(&self) -> &'static str {
        match self {
            Self::AuthFailed { .. }
            | Self::MalformedResponse { .. }
            | Self::MissingAuthorizationCode => LOGIN_FAILED,
            Self::ConfigurationMissing { .. }
            | Self::InvalidConfiguration { .. }
            | Self::Url(_) => NOT_CONFIGURED,
        }
    }
}

impl From<reqwest::Error> for AuthError {
    fn from(err: reqwest::Error) -> Self {
        Self::AuthFailed {
            status: err.status().map(|status| status.as_u16()),
            message: err.to_string(),
        }
    }
}

impl From<figment::Error> for AuthError {
    fn from(err: figment::Error) -> Self {
        Self::InvalidConfiguration {
            message: err.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::AuthError;

    #[test]
    fn malformed_responses_surface_as_login_failures() {
        let err = AuthError::malformed("expected value at line 1 column 1", "<html></html>");
        assert_eq!(err.user_message(), "login failed, try again");
        assert_eq!(err.status(), None);
    }

    #[test]
    fn auth_failed_display_includes_status() {
        let err = AuthError::AuthFailed {
            status: Some(401),
            message: "401 Unauthorized".to_string(),
        };
        assert_eq!(
            err.to_string(),
            "authentication failed (http status 401): 401 Unauthorized"
        );
        assert_eq!(err.status(), Some(401));
    }

    #[test]
    fn missing_configuration_names_the_setting() {
        let err = AuthError::ConfigurationMissing {
            setting: "GITLAB_BASE_DOMAIN",
        };
        assert_eq!(err.to_string(), "missing required setting GITLAB_BASE_DOMAIN");
        assert_eq!(err.user_message(), "gitlab login is not configured");
    }
}
