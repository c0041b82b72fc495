mod file_config;

pub use file_config::{FileConfig, OAuthFileConfig};

use crate::server::RequestsLoggingLevel;
use anyhow::{bail, Result};
use clap::ValueEnum;
use std::path::PathBuf;

pub const DEFAULT_CATALOG_API_URL: &str = "https://api.spotify.com/v1";
pub const DEFAULT_AUTHORIZE_URL: &str = "https://accounts.spotify.com/authorize";
pub const DEFAULT_TOKEN_URL: &str = "https://accounts.spotify.com/api/token";
pub const DEFAULT_POST_LOGIN_REDIRECT: &str = "/";

const DEFAULT_SCOPES: &[&str] = &[
    "user-read-private",
    "user-read-email",
    "user-library-read",
    "streaming",
    "user-read-playback-state",
    "user-modify-playback-state",
];

/// CLI arguments that can be used for config resolution.
/// This struct mirrors the CLI arguments that can be overridden by TOML config.
#[derive(Debug, Clone, Default)]
pub struct CliConfig {
    pub db_dir: Option<PathBuf>,
    pub port: u16,
    pub logging_level: RequestsLoggingLevel,
    pub frontend_dir_path: Option<String>,
    pub catalog_api_url: Option<String>,
    pub catalog_timeout_sec: u64,
    pub oauth_client_id: Option<String>,
    pub oauth_client_secret: Option<String>,
    pub oauth_redirect_uri: Option<String>,
}

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub db_dir: PathBuf,
    pub port: u16,
    pub logging_level: RequestsLoggingLevel,
    pub frontend_dir_path: Option<String>,
    pub catalog_api_url: String,
    pub catalog_timeout_sec: u64,

    /// None when login is not configured.
    pub oauth: Option<OAuthSettings>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OAuthSettings {
    pub client_id: String,
    pub client_secret: Option<String>,
    pub redirect_uri: String,
    pub authorize_url: String,
    pub token_url: String,
    pub scopes: Vec<String>,
    pub post_login_redirect: String,
}

impl AppConfig {
    /// Resolve configuration from CLI arguments and optional TOML file config.
    /// TOML values override CLI values where present.
    pub fn resolve(cli: &CliConfig, file_config: Option<FileConfig>) -> Result<Self> {
        let file = file_config.unwrap_or_default();

        let db_dir = file
            .db_dir
            .map(PathBuf::from)
            .or_else(|| cli.db_dir.clone())
            .ok_or_else(|| {
                anyhow::anyhow!("db_dir must be specified via --db-dir or in config file")
            })?;

        if !db_dir.exists() {
            bail!("Database directory does not exist: {:?}", db_dir);
        }
        if !db_dir.is_dir() {
            bail!("db_dir is not a directory: {:?}", db_dir);
        }

        let port = file.port.unwrap_or(cli.port);

        let logging_level = file
            .logging_level
            .and_then(|s| parse_logging_level(&s))
            .unwrap_or_else(|| cli.logging_level.clone());

        let frontend_dir_path = file
            .frontend_dir_path
            .or_else(|| cli.frontend_dir_path.clone());

        let catalog_api_url = file
            .catalog_api_url
            .or_else(|| cli.catalog_api_url.clone())
            .unwrap_or_else(|| DEFAULT_CATALOG_API_URL.to_string());
        let catalog_timeout_sec = file.catalog_timeout_sec.unwrap_or(cli.catalog_timeout_sec);

        let oauth = resolve_oauth(cli, file.oauth)?;

        Ok(Self {
            db_dir,
            port,
            logging_level,
            frontend_dir_path,
            catalog_api_url,
            catalog_timeout_sec,
            oauth,
        })
    }

    pub fn experiment_db_path(&self) -> PathBuf {
        self.db_dir.join("experiment.db")
    }
}

fn resolve_oauth(cli: &CliConfig, file: Option<OAuthFileConfig>) -> Result<Option<OAuthSettings>> {
    let file = file.unwrap_or_default();

    let client_id = file.client_id.or_else(|| cli.oauth_client_id.clone());
    let client_secret = file
        .client_secret
        .or_else(|| cli.oauth_client_secret.clone());
    let redirect_uri = file.redirect_uri.or_else(|| cli.oauth_redirect_uri.clone());

    let (client_id, redirect_uri) = match (client_id, redirect_uri) {
        (Some(client_id), Some(redirect_uri)) => (client_id, redirect_uri),
        (None, None) if client_secret.is_none() => return Ok(None),
        _ => bail!("OAuth login needs both a client id and a redirect URI"),
    };

    Ok(Some(OAuthSettings {
        client_id,
        client_secret,
        redirect_uri,
        authorize_url: file
            .authorize_url
            .unwrap_or_else(|| DEFAULT_AUTHORIZE_URL.to_string()),
        token_url: file
            .token_url
            .unwrap_or_else(|| DEFAULT_TOKEN_URL.to_string()),
        scopes: file
            .scopes
            .unwrap_or_else(|| DEFAULT_SCOPES.iter().map(|s| s.to_string()).collect()),
        post_login_redirect: file
            .post_login_redirect
            .unwrap_or_else(|| DEFAULT_POST_LOGIN_REDIRECT.to_string()),
    }))
}

/// Parses a logging level string into RequestsLoggingLevel.
/// Uses clap's ValueEnum trait for parsing.
fn parse_logging_level(s: &str) -> Option<RequestsLoggingLevel> {
    RequestsLoggingLevel::from_str(s, true).ok()
}
