use std::sync::Arc;

use teamdraw_core::config::{AppConfig, ConfigError, LoadOptions};
use teamdraw_slack::{
    events::dispatcher_with_roster,
    roster::InMemoryRoster,
    service::DrawSettings,
    socket::{NoopSocketTransport, ReconnectPolicy, SocketModeRunner},
};
use thiserror::Error;
use tracing::{info, warn};

use crate::directory::{refresh_roster, DirectoryError, HttpMemberDirectory};

pub struct Application {
    pub config: AppConfig,
    pub roster: Arc<InMemoryRoster>,
    pub slack_runner: SocketModeRunner,
}

#[derive(Debug, Error)]
pub enum BootstrapError {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error("member directory client could not be built: {0}")]
    Directory(#[source] DirectoryError),
}

pub async fn bootstrap(options: LoadOptions) -> Result<Application, BootstrapError> {
    let config = AppConfig::load(options)?;
    bootstrap_with_config(config).await
}

pub async fn bootstrap_with_config(config: AppConfig) -> Result<Application, BootstrapError> {
    info!(
        event_name = "system.bootstrap.start",
        correlation_id = "bootstrap",
        "starting application bootstrap"
    );

    let roster = Arc::new(InMemoryRoster::new());
    match HttpMemberDirectory::from_config(&config.directory).map_err(BootstrapError::Directory)? {
        Some(directory) => {
            // A failed refresh leaves the roster empty; mentions still resolve by id.
            if let Err(error) = refresh_roster(&directory, &roster).await {
                warn!(
                    event_name = "system.bootstrap.directory_unavailable",
                    correlation_id = "bootstrap",
                    error = %error,
                    "continuing with an empty member directory"
                );
            }
        }
        None => info!(
            event_name = "system.bootstrap.directory_disabled",
            correlation_id = "bootstrap",
            "member directory disabled; mentions resolve to bare ids"
        ),
    }

    let dispatcher =
        dispatcher_with_roster(roster.clone(), DrawSettings::from_config(&config.draw));
    let slack_runner = SocketModeRunner::new(
        Arc::new(NoopSocketTransport),
        dispatcher,
        ReconnectPolicy::default(),
    );
    info!(
        event_name = "system.bootstrap.ready",
        correlation_id = "bootstrap",
        members = roster.member_count(),
        "application bootstrap complete"
    );

    Ok(Application { config, roster, slack_runner })
}
