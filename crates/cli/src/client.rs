// Builds a todo controller from the user's client configuration.

use anyhow::{Context, Result};
use donelist_client::{
    config::ClientConfig, http::HttpTodoService, SharedSession, TodoController,
};
use donelist_common::error::MutationError;
use tracing::debug;

pub type Controller = TodoController<HttpTodoService, SharedSession>;

/// Load config, then build a controller and fill it from the relay.
///
/// A missing token is not an error here: the controller fails closed on the
/// first call and reports `Unauthenticated`.
pub async fn connect() -> Result<Controller> {
    let config = ClientConfig::load().context("failed to load client config")?;
    let base_url = config.relay_url()?;
    debug!(relay_url = %base_url, "connecting to relay");

    let sessions = match config.session() {
        Some(session) => SharedSession::signed_in(session),
        None => SharedSession::signed_out(),
    };
    let controller = TodoController::new(
        HttpTodoService::new(base_url),
        sessions,
        config.controller_config(),
    );
    controller.reload().await?;
    Ok(controller)
}

/// Error for a task that ended without producing a result.
pub fn task_failed(error: tokio::task::JoinError) -> anyhow::Error {
    anyhow::Error::new(MutationError::network(format!("request task failed: {error}")))
}
