//! CLI command definitions and subcommands

use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing::debug;

/// figma-bridge - push AI-generated designs into Figma
#[derive(Parser)]
#[command(
    name = "figma-bridge",
    about = "MCP server bridging AI clients to the Figma plugin over WebSocket",
    version = env!("CARGO_PKG_VERSION"),
    after_help = "Logs are written to: ~/.local/share/figma-bridge/logs/figma-bridge.log"
)]
pub struct Cli {
    /// Path to config file
    #[arg(short, long, global = true, help = "Path to config file")]
    pub config: Option<PathBuf>,

    /// Log level (overrides config file)
    #[arg(
        short = 'l',
        long = "log-level",
        global = true,
        help = "Log level (TRACE, DEBUG, INFO, WARN, ERROR)"
    )]
    pub log_level: Option<String>,

    /// Subcommand to execute (defaults to `serve`)
    #[command(subcommand)]
    pub command: Option<Command>,
}

/// CLI subcommands
#[derive(Subcommand, Debug, PartialEq, Eq)]
pub enum Command {
    /// Run the MCP server on stdio and the plugin bridge
    Serve {
        /// Interface for the plugin WebSocket listener
        #[arg(long)]
        host: Option<String>,

        /// Port for the plugin WebSocket listener
        #[arg(short, long)]
        port: Option<u16>,

        /// How long a tool call waits for the plugin (milliseconds)
        #[arg(short, long = "timeout-ms")]
        timeout_ms: Option<u64>,
    },

    /// Print the effective configuration as YAML
    Config,

    /// Show recent log lines
    Logs {
        /// Number of lines to show
        #[arg(short = 'n', long, default_value = "50")]
        lines: usize,
    },
}

impl Default for Command {
    fn default() -> Self {
        Command::Serve {
            host: None,
            port: None,
            timeout_ms: None,
        }
    }
}

/// Get the log file path
pub fn get_log_path() -> PathBuf {
    debug!("get_log_path: called");
    let path = dirs::data_local_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("figma-bridge")
        .join("logs")
        .join("figma-bridge.log");
    debug!(?path, "get_log_path: returning path");
    path
}
