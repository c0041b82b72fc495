pub mod config;
mod error;
mod experiment_routes;
mod http_layers;
mod library_routes;
mod playback_routes;
pub mod server;
mod session;
pub mod state;

pub use config::ServerConfig;
pub use error::ApiError;
pub use http_layers::*;
pub use server::{make_app, run_server};
