use crate::{ExtraDataField, UserDetails, UserResponse};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenRequestFormat {
    Json,
    Form,
}

/// Where the access token goes on the user-info request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AccessTokenPlacement {
    /// `?access_token=...`
    Query,
    /// `Authorization: Bearer ...`
    BearerHeader,
}

/// Everything the generic engine needs to know about one provider: its
/// endpoints and how to read the profile it returns.
pub trait OAuthProvider: Send + Sync {
    fn id(&self) -> &'static str;
    fn authorize_url(&self) -> &str;
    fn token_url(&self) -> &str;
    fn user_info_url(&self) -> &str;
    fn default_scope(&self) -> &str;

    /// Maps a user-info response into a normalized identity. Missing optional
    /// fields degrade to empty values.
    fn user_details(&self, response: &UserResponse) -> UserDetails;

    /// Fields copied from the combined token and user-info response into the
    /// persisted extra data, after the access token.
    fn extra_data_fields(&self) -> &[ExtraDataField] {
        &[]
    }

    fn token_request_format(&self) -> TokenRequestFormat {
        TokenRequestFormat::Json
    }

    fn token_headers(&self) -> Vec<(String, String)> {
        vec![("Accept".to_string(), "application/json".to_string())]
    }

    fn access_token_placement(&self) -> AccessTokenPlacement {
        AccessTokenPlacement::BearerHeader
    }
}
