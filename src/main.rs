//! rmcp-sensorwatch: MCP server that watches hardware sensors
//!
//! A background pass samples temperatures and fan speeds every few seconds
//! and checks them against the watch list. An entry that stays outside its
//! acceptable region for the configured number of passes fires once: it can
//! notify Telegram recipients, reboot or shut down the host.
//!
//! Tools:
//! - sensors: current readings and their watch keys
//! - watch: list, add/update and remove watch entries
//! - power: delayed reboot/shutdown

use std::future::Future;
use std::path::PathBuf;
use std::sync::Arc;

use clap::{Parser, Subcommand};
use rmcp::{
    handler::server::{router::tool::ToolRouter, wrapper::Parameters, ServerHandler},
    model::*,
    ErrorData as McpError,
    ServiceExt,
};
use schemars::JsonSchema;
use serde::Deserialize;
use tokio::signal::unix::{signal, Signal, SignalKind};
use tokio::sync::Mutex;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

// === Modules ===

mod actuators;
mod config;
mod sensors;
mod shared;
mod watch;

use actuators::telegram::Notifier;
use actuators::HostActions;
use config::Config;
use sensors::{SensorSource, SystemSensors};
use watch::{SharedStore, WatchScheduler, WatchStore};

// === CLI ===

#[derive(Parser)]
#[command(name = "rmcp-sensorwatch")]
#[command(about = "MCP server that watches hardware sensors and acts on sustained alarms")]
struct Cli {
    /// Config file (default: ~/.config/rmcp-sensorwatch/config.toml)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Open the config file in your editor
    Config,
    /// Print current sensor readings and their watch keys
    Sensors,
}

// === Common Parameter Types ===

#[derive(Debug, Deserialize, JsonSchema)]
pub struct EmptyParams {}

// === Server ===

#[derive(Debug)]
pub struct SensorWatchServer {
    pub tool_router: ToolRouter<Self>,
    config: Arc<Config>,
    store: SharedStore,
    sensors: SystemSensors,
}

impl SensorWatchServer {
    pub fn new(config: Arc<Config>, store: SharedStore) -> Self {
        let mut tool_router = Self::tool_router();

        for tool_name in &config.disabled {
            if tool_router.has_route(tool_name) {
                tool_router.remove_route(tool_name);
                tracing::info!("Disabled tool: {}", tool_name);
            } else {
                tracing::warn!("Config disables unknown tool: {}", tool_name);
            }
        }

        if !config.disabled.is_empty() {
            tracing::info!(
                "Loaded config: {} tools disabled, {} tools active",
                config.disabled.len(),
                tool_router.map.len()
            );
        }

        Self {
            tool_router,
            config,
            store,
            sensors: SystemSensors::default(),
        }
    }
}

// Tool implementations
#[rmcp::tool_router]
impl SensorWatchServer {
    // --- sensors ---

    #[rmcp::tool(description = "Get current temperatures and fan speeds, grouped by chip, with the key to use in a watch entry")]
    pub async fn get_sensor_readings(
        &self,
        Parameters(_params): Parameters<EmptyParams>,
    ) -> Result<CallToolResult, McpError> {
        sensors::readings::get_sensor_readings(&self.sensors).await
    }

    // --- watch ---

    #[rmcp::tool(description = "List sensor watch entries with their acceptable region, actions and current alarm state")]
    pub async fn list_watches(
        &self,
        Parameters(_params): Parameters<EmptyParams>,
    ) -> Result<CallToolResult, McpError> {
        watch::tools::list_watches(&self.store, self.config.watch_threshold).await
    }

    #[rmcp::tool(description = "Add or replace a sensor watch entry. The entry fires once when the reading stays outside the acceptable region for the configured number of passes, and re-arms when the reading recovers")]
    pub async fn set_watch(
        &self,
        Parameters(params): Parameters<watch::tools::SetWatchParams>,
    ) -> Result<CallToolResult, McpError> {
        watch::tools::set_watch(&self.store, params).await
    }

    #[rmcp::tool(description = "Delete a sensor watch entry")]
    pub async fn remove_watch(
        &self,
        Parameters(params): Parameters<watch::tools::RemoveWatchParams>,
    ) -> Result<CallToolResult, McpError> {
        watch::tools::remove_watch(&self.store, params).await
    }

    // --- power ---

    #[rmcp::tool(description = "Reboot the host after the configured reboot delay")]
    pub async fn reboot_host(
        &self,
        Parameters(_params): Parameters<EmptyParams>,
    ) -> Result<CallToolResult, McpError> {
        actuators::power::reboot_host(&self.config).await
    }

    #[rmcp::tool(description = "Shut the host down after the configured shutdown delay")]
    pub async fn shutdown_host(
        &self,
        Parameters(_params): Parameters<EmptyParams>,
    ) -> Result<CallToolResult, McpError> {
        actuators::power::shutdown_host(&self.config).await
    }
}

#[rmcp::tool_handler]
impl ServerHandler for SensorWatchServer {
    fn get_info(&self) -> ServerInfo {
        let description = format!(
            "rmcp-sensorwatch: hardware sensor watchdog.\n\
             - sensors: temperatures and fan speeds\n\
             - watch: entries fire after {} consecutive alarming readings, checked every {}s\n\
             - power: delayed reboot ({}m) and shutdown ({}m)\n",
            self.config.watch_threshold,
            self.config.watch_interval_secs,
            self.config.reboot_delay_minutes,
            self.config.shutdown_delay_minutes
        );

        ServerInfo {
            protocol_version: ProtocolVersion::V_2024_11_05,
            capabilities: ServerCapabilities::builder().enable_tools().build(),
            server_info: Implementation::from_build_env(),
            instructions: Some(description),
        }
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    match cli.command {
        Some(Commands::Config) => {
            run_config_command(cli.config)?;
        }
        Some(Commands::Sensors) => {
            let snapshot = SystemSensors::default().snapshot();
            print!("{}", sensors::readings::format_snapshot(&snapshot));
        }
        None => {
            run_server(cli.config).await?;
        }
    }

    Ok(())
}

fn load_config(path: Option<&PathBuf>) -> Config {
    match path {
        Some(path) => Config::load_from(path),
        None => Config::load(),
    }
}

/// Open config file in user's editor
fn run_config_command(path: Option<PathBuf>) -> anyhow::Result<()> {
    let config_path = path
        .or_else(Config::path)
        .ok_or_else(|| anyhow::anyhow!("Could not determine config directory"))?;

    // Create config file from template if it doesn't exist
    if !config_path.exists() {
        if let Some(parent) = config_path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let template = include_str!("../config.toml.example");
        std::fs::write(&config_path, template)?;
        println!("Created config file: {}", config_path.display());
    }

    // Get editor from environment or use defaults
    let editor = std::env::var("EDITOR")
        .or_else(|_| std::env::var("VISUAL"))
        .unwrap_or_else(|_| "nano".to_string());

    println!("Opening {} with {}", config_path.display(), editor);

    std::process::Command::new(&editor)
        .arg(&config_path)
        .status()?;

    // Show what the server will pick up
    let config = Config::load_from(&config_path);
    let tools: Vec<String> = config::all_tool_names()
        .into_iter()
        .map(|name| {
            if config.is_enabled(name) {
                name.to_string()
            } else {
                format!("{} (disabled)", name)
            }
        })
        .collect();
    println!("Tools: {}", tools.join(", "));
    println!(
        "Watch list: {}",
        config
            .watch_file()
            .map(|p| p.display().to_string())
            .unwrap_or_else(|| "<unknown>".to_string())
    );

    Ok(())
}

/// Run the MCP server and the sensor watch
async fn run_server(config_path: Option<PathBuf>) -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    tracing::info!("Starting rmcp-sensorwatch server");

    let config = Arc::new(load_config(config_path.as_ref()));
    let watch_file = config.watch_file().unwrap_or_else(|| {
        tracing::warn!("Could not determine config directory, keeping watch list in working directory");
        PathBuf::from(watch::store::WATCH_FILE_NAME)
    });
    let store: SharedStore = Arc::new(Mutex::new(WatchStore::load(watch_file)));

    let http_client = actuators::telegram::http_client(actuators::telegram::REQUEST_TIMEOUT)?;
    let actions = HostActions::from_config(&config, http_client);
    if !config.has_recipients() {
        tracing::info!("No telegram token or recipients configured, notifications disabled");
    }
    actions.notifier().notify_recipients("System monitor online").await;

    let scheduler = WatchScheduler::new(
        store.clone(),
        SystemSensors::default(),
        actions.clone(),
        config.watch_threshold,
        config.watch_interval(),
    );
    let watch_task = tokio::spawn(scheduler.run());

    let sigterm = signal(SignalKind::terminate())?;
    let sigint = signal(SignalKind::interrupt())?;

    let server = SensorWatchServer::new(config.clone(), store);
    let service = server.serve(rmcp::transport::stdio()).await?;

    // dropping the running service on a signal cancels the session
    match wait_for_stop(service.waiting(), stop_signal(sigterm, sigint)).await {
        Stop::SessionEnded => tracing::info!("MCP session ended"),
        Stop::Signal(name) => tracing::info!("Received {}, shutting down", name),
    }

    watch_task.abort();
    actions.notifier().notify_recipients("System monitor offline").await;

    tracing::info!("rmcp-sensorwatch server stopped");
    Ok(())
}

#[derive(Debug, PartialEq, Eq)]
enum Stop {
    SessionEnded,
    Signal(&'static str),
}

async fn stop_signal(mut sigterm: Signal, mut sigint: Signal) -> &'static str {
    tokio::select! {
        _ = sigterm.recv() => "SIGTERM",
        _ = sigint.recv() => "SIGINT",
    }
}

/// Wait for the MCP session to end or a stop signal, whichever comes first
async fn wait_for_stop<F, T, E, S>(session: F, signal: S) -> Stop
where
    F: Future<Output = Result<T, E>>,
    E: std::fmt::Display,
    S: Future<Output = &'static str>,
{
    tokio::select! {
        result = session => {
            if let Err(e) = result {
                tracing::error!("MCP session ended with error: {}", e);
            }
            Stop::SessionEnded
        }
        name = signal => Stop::Signal(name),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::future::pending;

    #[tokio::test]
    async fn test_signal_stops_running_session() {
        let stop = wait_for_stop(pending::<Result<(), std::io::Error>>(), async { "SIGTERM" }).await;
        assert_eq!(stop, Stop::Signal("SIGTERM"));
    }

    #[tokio::test]
    async fn test_session_end_stops_without_signal() {
        let stop = wait_for_stop(async { Ok::<(), std::io::Error>(()) }, pending()).await;
        assert_eq!(stop, Stop::SessionEnded);

        let failed = wait_for_stop(
            async { Err::<(), _>(std::io::Error::other("transport closed")) },
            pending(),
        )
        .await;
        assert_eq!(failed, Stop::SessionEnded);
    }
}
