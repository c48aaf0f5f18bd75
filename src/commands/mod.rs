//! CLI command implementations.

pub mod render;
pub mod replay;
pub mod run;
pub mod sessions;

use warroom::client::BackendClient;
use warroom::config::Config;

/// Build the backend client from the config, honoring a `--server` override.
fn backend_client(config: &Config, server: Option<&str>) -> BackendClient {
    let base_url = server.unwrap_or(&config.backend.base_url);
    BackendClient::new(base_url, config.backend.request_timeout())
}
