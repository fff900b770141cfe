use clap::Parser;
use eyre::{Context, Result};
use std::fs;
use std::io::{BufRead, BufReader};
use std::path::PathBuf;
use tracing::{debug, error, info};

use figmabridge::cli::{Cli, Command, get_log_path};
use figmabridge::{BridgeServer, Config, Correlator, McpServer, ToolContext, ToolExecutor};

fn setup_logging(cli_log_level: Option<&str>, config_log_level: Option<&str>) -> Result<()> {
    let log_path = get_log_path();
    let log_dir = log_path.parent().map(PathBuf::from).unwrap_or_else(|| PathBuf::from("."));
    fs::create_dir_all(&log_dir).context("Failed to create log directory")?;

    // Priority: CLI --log-level > config file > INFO
    let level = match cli_log_level.or(config_log_level) {
        Some(s) => match s.parse::<tracing::Level>() {
            Ok(level) => level,
            Err(_) if s.eq_ignore_ascii_case("warning") => tracing::Level::WARN,
            Err(_) => {
                eprintln!("Warning: Unknown log-level '{}', defaulting to INFO", s);
                tracing::Level::INFO
            }
        },
        None => tracing::Level::INFO,
    };

    // stdout belongs to the MCP protocol, so logs only ever go to the file
    let log_file = fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(&log_path)
        .context("Failed to open log file")?;

    tracing_subscriber::fmt()
        .with_writer(log_file)
        .with_ansi(false)
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env().add_directive(level.into()))
        .init();

    info!("Logging initialized (level: {:?})", level);
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Load log level from config file early (before full config load)
    let config_log_level = Config::load_log_level(cli.config.as_ref());

    setup_logging(cli.log_level.as_deref(), config_log_level.as_deref()).context("Failed to setup logging")?;

    let config = Config::load(cli.config.as_ref()).context("Failed to load configuration")?;

    match cli.command.unwrap_or_default() {
        Command::Serve { host, port, timeout_ms } => cmd_serve(config, host, port, timeout_ms).await,
        Command::Config => cmd_config(&config),
        Command::Logs { lines } => cmd_logs(lines),
    }
}

/// Run the plugin bridge and the MCP server until stdin closes
async fn cmd_serve(
    mut config: Config,
    host: Option<String>,
    port: Option<u16>,
    timeout_ms: Option<u64>,
) -> Result<()> {
    debug!(?host, ?port, ?timeout_ms, "cmd_serve: called");
    if let Some(host) = host {
        config.bridge.host = host;
    }
    if let Some(port) = port {
        config.bridge.port = port;
    }
    if let Some(timeout_ms) = timeout_ms {
        config.correlator.request_timeout_ms = timeout_ms;
    }

    let correlator = Correlator::new(config.correlator.clone());
    let handle = correlator.handle();
    let correlator_task = tokio::spawn(correlator.run());

    let bridge = BridgeServer::bind(
        &config.bridge.address(),
        handle.clone(),
        config.correlator.peer_channel_buffer,
    )
    .await?;
    let addr = bridge.local_addr()?;
    eprintln!("figma-bridge: waiting for the Figma plugin on ws://{}", addr);

    let bridge_task = tokio::spawn(async move {
        if let Err(e) = bridge.run().await {
            error!(error = %e, "Bridge server stopped");
        }
    });

    let server = McpServer::new(&config.mcp, ToolExecutor::standard(), ToolContext::new(handle.clone()));
    let result = server.run_stdio().await;

    bridge_task.abort();
    if let Ok(metrics) = handle.metrics().await {
        info!(?metrics, "Correlator summary");
    }
    handle.shutdown().await?;
    correlator_task.await.context("Correlator task failed")?;

    info!("figma-bridge stopped");
    result
}

/// Print the effective configuration
fn cmd_config(config: &Config) -> Result<()> {
    debug!("cmd_config: called");
    print!("{}", config.to_yaml()?);
    Ok(())
}

/// Print the last N lines of the log file
fn cmd_logs(lines: usize) -> Result<()> {
    debug!(lines, "cmd_logs: called");
    let log_path = get_log_path();

    if !log_path.exists() {
        debug!(?log_path, "cmd_logs: log file does not exist");
        println!("No log file found at: {}", log_path.display());
        return Ok(());
    }

    let file = fs::File::open(&log_path).context("Failed to open log file")?;
    let reader = BufReader::new(file);
    let all_lines: Vec<String> = reader.lines().map_while(Result::ok).collect();

    let start = all_lines.len().saturating_sub(lines);
    for line in &all_lines[start..] {
        println!("{}", line);
    }

    Ok(())
}
