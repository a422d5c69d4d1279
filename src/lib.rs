//! GitLab social login on top of a small provider-agnostic OAuth 2.0 engine.
//!
//! A provider is a value implementing [`OAuthProvider`]: endpoint URLs, a
//! default scope, a profile mapper and a list of extra fields to persist.
//! [`OAuthClient`] drives the authorization-code grant for any provider.
//! Token refresh, PKCE and state validation are left to the host.

mod client;
mod config;
mod details;
mod error;
mod providers;
mod types;

pub use client::{OAuthClient, OAuthClientConfig};
pub use config::{
    DEFAULT_API_VERSION, DEFAULT_AUTH_SCOPE, DEFAULT_HTTP_SCHEME, ENV_PREFIX, GitlabConfig,
    GitlabSettings,
};
pub use details::{ExtraDataField, UserDetails, extra_data, split_full_name};
pub use error::AuthError;
pub use providers::{AccessTokenPlacement, GitlabProvider, OAuthProvider, TokenRequestFormat};
pub use types::{
    AuthorizationRequest, AuthorizationResponse, LoginOutcome, TokenResponse, UserResponse,
};
