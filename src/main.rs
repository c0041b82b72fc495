use anyhow::{Context, Result};
use clap::Parser;
use std::sync::Arc;
use std::{fmt::Debug, path::PathBuf};
use tracing::{info, level_filters::LevelFilter};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use duet_server::config::{AppConfig, CliConfig, FileConfig};
use duet_server::oauth::OAuthClient;
use duet_server::{run_server, HttpCatalogApi, RequestsLoggingLevel, ServerConfig, SqliteStore};

fn parse_path(s: &str) -> Result<PathBuf> {
    let path_buf = PathBuf::from(s);
    let original_path = match path_buf.canonicalize() {
        Ok(path) => path,
        Err(msg) => {
            if msg.kind() == std::io::ErrorKind::NotFound {
                path_buf
            } else {
                return Err(msg).with_context(|| format!("Error resolving path: {}", s));
            }
        }
    };
    if original_path.is_absolute() {
        return Ok(original_path);
    }
    let cwd = std::env::current_dir()?;
    Ok(cwd.join(original_path))
}

#[derive(Parser, Debug)]
struct CliArgs {
    /// Path to a TOML config file. Its values override the CLI ones.
    #[clap(long, value_parser = parse_path)]
    pub config: Option<PathBuf>,

    /// Directory holding the experiment database.
    #[clap(long, value_parser = parse_path)]
    pub db_dir: Option<PathBuf>,

    /// The port to listen on.
    #[clap(short, long, default_value_t = 3001)]
    pub port: u16,

    /// The level of logging to perform on each request.
    #[clap(long, default_value = "path")]
    pub logging_level: RequestsLoggingLevel,

    /// Path to the frontend directory to be statically served.
    #[clap(long)]
    pub frontend_dir_path: Option<String>,

    /// Base URL of the catalog provider's web API.
    #[clap(long)]
    pub catalog_api_url: Option<String>,

    /// Timeout in seconds for catalog provider requests.
    #[clap(long, default_value_t = 30)]
    pub catalog_timeout_sec: u64,

    #[clap(long)]
    pub oauth_client_id: Option<String>,

    #[clap(long)]
    pub oauth_client_secret: Option<String>,

    /// Must match the redirect URI registered with the provider.
    #[clap(long)]
    pub oauth_redirect_uri: Option<String>,
}

impl CliArgs {
    fn to_cli_config(&self) -> CliConfig {
        CliConfig {
            db_dir: self.db_dir.clone(),
            port: self.port,
            logging_level: self.logging_level.clone(),
            frontend_dir_path: self.frontend_dir_path.clone(),
            catalog_api_url: self.catalog_api_url.clone(),
            catalog_timeout_sec: self.catalog_timeout_sec,
            oauth_client_id: self.oauth_client_id.clone(),
            oauth_client_secret: self.oauth_client_secret.clone(),
            oauth_redirect_uri: self.oauth_redirect_uri.clone(),
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli_args = CliArgs::parse();

    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer())
        .with(
            EnvFilter::builder()
                .with_default_directive(LevelFilter::INFO.into())
                .with_env_var("LOG_LEVEL")
                .from_env_lossy(),
        )
        .try_init()
        .context("Failed to initialize logging")?;

    let file_config = match &cli_args.config {
        Some(path) => {
            info!("Loading config from {:?}", path);
            Some(FileConfig::load(path)?)
        }
        None => None,
    };
    let config = AppConfig::resolve(&cli_args.to_cli_config(), file_config)?;

    let db_path = config.experiment_db_path();
    info!("Opening experiment database at {:?}...", db_path);
    let store = Arc::new(SqliteStore::new(&db_path)?);

    info!("Catalog provider at {}", config.catalog_api_url);
    let catalog_api = Arc::new(HttpCatalogApi::new(
        config.catalog_api_url.clone(),
        config.catalog_timeout_sec,
    )?);

    let oauth_client = match config.oauth.clone() {
        Some(settings) => Some(OAuthClient::new(settings)?),
        None => {
            info!("OAuth is not configured, login is disabled");
            None
        }
    };

    let server_config = ServerConfig {
        requests_logging_level: config.logging_level.clone(),
        port: config.port,
        frontend_dir_path: config.frontend_dir_path.clone(),
    };

    info!("Ready to serve at port {}!", config.port);
    run_server(server_config, store, catalog_api, oauth_client).await
}
