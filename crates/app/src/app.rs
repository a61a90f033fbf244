// Composition root: wires adapters, the application service and the console

use anyhow::{Context, Result};
use reqwest::Client;
use sentinel_core::ports::{
    ClientConfig, ConfigStore, ProgressTransport, RepositoryServer, SystemClock,
};
use std::io;
use std::sync::Arc;
use std::time::Duration;
use tokio::io::BufReader;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

use crate::adapters::{
    http::HttpRepositoryServer,
    persistence::FileConfigStore,
    sse::SseProgressTransport,
};
use crate::cli::{Action, CliArgs};
use crate::console::Console;
use crate::services::app_service::AppService;

/// The client application: one service plus the console that talks to it
pub struct SentinelApp {
    app_service: AppService,
    console: Console<BufReader<tokio::io::Stdin>, io::Stdout>,
    notifications: tokio::sync::mpsc::UnboundedReceiver<sentinel_core::app::Notification>,
    commands: tokio::sync::mpsc::UnboundedSender<sentinel_core::app::Command>,
    action: Action,
}

impl SentinelApp {
    /// Build every adapter from the CLI arguments and the config file
    pub fn new(args: CliArgs) -> Result<Self> {
        let config_store: Arc<dyn ConfigStore> = match &args.config {
            Some(path) => Arc::new(FileConfigStore::with_path(path)),
            None => Arc::new(FileConfigStore::new()?),
        };

        let mut config = config_store.load()?;
        if let Some(server) = args.server {
            config.server_url = server; // CLI overrides config file
        }
        info!("Using server {}", config.server_url);

        let (server, transport) = connect(&config)?;
        let (app_service, notifications, commands) =
            AppService::new(server, transport, Arc::new(SystemClock), config.ui.default_sort);

        let console = Console::new(BufReader::new(tokio::io::stdin()), io::stdout(), config);

        Ok(Self {
            app_service,
            console,
            notifications,
            commands,
            action: args.action,
        })
    }

    pub async fn run(self) -> Result<()> {
        let SentinelApp {
            mut app_service,
            mut console,
            notifications,
            commands,
            action,
        } = self;

        let (service_result, console_result) = tokio::join!(
            app_service.start(),
            console.run(action, commands, notifications),
        );

        if let Err(e) = service_result {
            error!("App service failed: {:?}", e);
        }
        console_result
    }
}

/// Build the HTTP adapters for the configured server
pub fn connect(
    config: &ClientConfig,
) -> Result<(Arc<dyn RepositoryServer>, Arc<dyn ProgressTransport>)> {
    // No client-wide timeout: progress channels stay open for minutes
    let client = Client::builder()
        .build()
        .context("Failed to build HTTP client")?;

    let server = HttpRepositoryServer::new(
        client.clone(),
        config.server_url.clone(),
        Duration::from_secs(config.request_timeout_secs),
    );
    let transport = SseProgressTransport::new(client, config.server_url.clone()).with_idle_timeout(
        config
            .channel_idle_timeout_secs
            .filter(|secs| *secs > 0)
            .map(Duration::from_secs),
    );

    Ok((Arc::new(server), Arc::new(transport)))
}

/// Log to stderr so stdout stays clean for command output
pub fn init_tracing(verbose: bool) {
    let default = if verbose { "debug" } else { "warn" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .init();
}
