mod gitlab;
mod provider;

pub use gitlab::GitlabProvider;
pub use provider::{AccessTokenPlacement, OAuthProvider, TokenRequestFormat};
