use crate::{
    AccessTokenPlacement, AuthError, ExtraDataField, GitlabConfig, GitlabSettings, OAuthProvider,
    TokenRequestFormat, UserDetails, UserResponse,
};

const EXTRA_DATA: &[ExtraDataField] = &[
    ExtraDataField::same("id"),
    ExtraDataField::new("expires_in", "expires"),
    ExtraDataField::same("refresh_token"),
];

/// GitLab (gitlab.com or self-hosted) login provider.
#[derive(Debug, Clone)]
pub struct GitlabProvider {
    config: GitlabConfig,
    user_info_url: String,
}

impl GitlabProvider {
    pub const ID: &'static str = "gitlab";

    pub fn new(config: GitlabConfig) -> Self {
        let user_info_url = config.user_info_url();
        Self {
            config,
            user_info_url,
        }
    }

    pub fn from_settings(settings: &GitlabSettings) -> Result<Self, AuthError> {
        Ok(Self::new(settings.resolve()?))
    }

    pub fn config(&self) -> &GitlabConfig {
        &self.config
    }
}

impl OAuthProvider for GitlabProvider {
    fn id(&self) -> &'static str {
        Self::ID
    }

    fn authorize_url(&self) -> &str {
        self.config.authorize_url()
    }

    fn token_url(&self) -> &str {
        self.config.token_url()
    }

    fn user_info_url(&self) -> &str {
        &self.user_info_url
    }

    fn default_scope(&self) -> &str {
        self.config.scope()
    }

    fn user_details(&self, response: &UserResponse) -> UserDetails {
        UserDetails {
            username: response.get_str("username").map(str::to_string),
            email: response.get_str("email").unwrap_or_default().to_string(),
            ..UserDetails::default()
        }
        .with_full_name(response.get_str("name"))
    }

    fn extra_data_fields(&self) -> &[ExtraDataField] {
        EXTRA_DATA
    }

    fn token_request_format(&self) -> TokenRequestFormat {
        TokenRequestFormat::Form
    }

    fn access_token_placement(&self) -> AccessTokenPlacement {
        AccessTokenPlacement::Query
    }
}

#[cfg(test)]
mod tests {
    use serde_json::{Value, json};

    use super::*;
    use crate::extra_data;

    fn provider() -> GitlabProvider {
        GitlabProvider::from_settings(&GitlabSettings::new("gitlab.example.com")).unwrap()
    }

    fn details(value: Value) -> UserDetails {
        provider().user_details(&UserResponse::from_value(value).unwrap())
    }

    #[test]
    fn exposes_endpoints_and_scope() {
        let provider = provider();
        assert_eq!(provider.id(), "gitlab");
        assert_eq!(provider.authorize_url(), "https://gitlab.example.com/oauth/authorize");
        assert_eq!(provider.token_url(), "https://gitlab.example.com/oauth/token");
        assert_eq!(provider.user_info_url(), "https://gitlab.example.com/api/v4/user");
        assert_eq!(provider.default_scope(), "api");
    }

    #[test]
    fn maps_full_profile() {
        let details = details(json!({
            "username": "alice",
            "email": "a@x.com",
            "name": "Alice Smith"
        }));
        assert_eq!(
            details,
            UserDetails {
                username: Some("alice".to_string()),
                email: "a@x.com".to_string(),
                fullname: "Alice Smith".to_string(),
                first_name: "Alice".to_string(),
                last_name: "Smith".to_string(),
            }
        );
    }

    #[test]
    fn missing_email_and_name_degrade_to_empty() {
        let details = details(json!({"username": "bob"}));
        assert_eq!(details.username.as_deref(), Some("bob"));
        assert_eq!(details.email, "");
        assert_eq!(details.fullname, "");
        assert_eq!(details.first_name, "");
        assert_eq!(details.last_name, "");
    }

    #[test]
    fn null_email_is_empty() {
        assert_eq!(details(json!({"username": "bob", "email": null})).email, "");
    }

    #[test]
    fn missing_username_is_not_an_error() {
        let details = details(json!({"email": "c@x.com", "name": "Carol"}));
        assert_eq!(details.username, None);
        assert_eq!(details.email, "c@x.com");
        assert_eq!(details.first_name, "Carol");
        assert_eq!(details.last_name, "");
    }

    #[test]
    fn extra_data_keeps_account_and_token_fields() {
        let response =
            UserResponse::from_value(json!({"id": 42, "expires_in": 3600, "refresh_token": "r1"}))
                .unwrap();
        let data = extra_data(&response, provider().extra_data_fields());
        assert_eq!(
            Value::Object(data),
            json!({"id": 42, "expires": 3600, "refresh_token": "r1"})
        );
    }
}
