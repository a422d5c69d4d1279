use std::path::PathBuf;

use clap::{Parser, Subcommand};
use gitlab_social_auth::{
    AuthError, AuthorizationResponse, GitlabProvider, GitlabSettings, OAuthClient,
    OAuthClientConfig, OAuthProvider,
};
use serde::Serialize;
use serde_json::json;
use tracing_subscriber::EnvFilter;

#[derive(Debug, Parser)]
#[command(
    name = "gitlab-social-auth",
    about = "Log in with GitLab over OAuth and print the mapped identity as JSON."
)]
struct Cli {
    /// TOML settings file; GITLAB_* environment variables take precedence.
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Print the resolved endpoints and scope.
    Endpoints,
    /// Print the URL that starts a login.
    Authorize {
        #[arg(long)]
        redirect_uri: String,
        #[arg(long)]
        state: Option<String>,
        /// Also open the URL in the default browser.
        #[arg(long)]
        open: bool,
    },
    /// Finish a login from the URL GitLab redirected back to.
    Login {
        #[arg(long)]
        redirect_uri: String,
        #[arg(long)]
        callback_url: String,
    },
    /// Fetch and map the profile behind an access token.
    Whoami {
        #[arg(long)]
        access_token: String,
    },
}

#[tokio::main]
async fn main() -> Result<(), AuthError> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let settings = match &cli.config {
        Some(path) => GitlabSettings::load_from(path)?,
        None => GitlabSettings::load()?,
    };
    let provider = GitlabProvider::from_settings(&settings)?;

    match cli.command {
        Command::Endpoints => print_endpoints(&provider),
        Command::Authorize {
            redirect_uri,
            state,
            open,
        } => {
            let client = OAuthClient::new(provider, settings.client_config(redirect_uri)?)?;
            let auth = client.authorization_url_with_state(state)?;
            eprintln!("Authorization URL:");
            println!("{}", auth.authorization_url);
            if open {
                if let Err(err) = webbrowser::open(&auth.authorization_url) {
                    eprintln!("Failed to open browser automatically: {err}");
                }
            }
            Ok(())
        }
        Command::Login {
            redirect_uri,
            callback_url,
        } => {
            let client = OAuthClient::new(provider, settings.client_config(redirect_uri)?)?;
            let response = AuthorizationResponse::from_url(&callback_url)?;
            let outcome = client.complete(response).await.inspect_err(report)?;
            print_json(&outcome)
        }
        Command::Whoami { access_token } => {
            // The profile endpoint needs no app credentials.
            let config =
                OAuthClientConfig::new(settings.app_id.clone().unwrap_or_default(), String::new());
            let client = OAuthClient::new(provider, config)?;
            let user = client.user_data(&access_token).await.inspect_err(report)?;
            let provider = client.provider();
            print_json(&json!({
                "provider": provider.id(),
                "details": provider.user_details(&user),
                "extra_data": client.extra_data(&access_token, &user),
            }))
        }
    }
}

fn print_endpoints(provider: &GitlabProvider) -> Result<(), AuthError> {
    print_json(&json!({
        "provider": provider.id(),
        "authorize_url": provider.authorize_url(),
        "token_url": provider.token_url(),
        "api_base_url": provider.config().api_base_url(),
        "user_info_url": provider.user_info_url(),
        "scope": provider.config().scopes(),
    }))
}

fn report(err: &AuthError) {
    eprintln!("{}", err.user_message());
}

fn print_json<T: Serialize>(value: &T) -> Result<(), AuthError> {
    let output = serde_json::to_string_pretty(value).map_err(|err| AuthError::MalformedResponse {
        message: err.to_string(),
        body: String::new(),
    })?;
    println!("{output}");
    Ok(())
}
