//! Clap derive structures for the `nmtray` binary.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand, ValueEnum};

// ── Top-Level CLI ────────────────────────────────────────────────────

/// nmtray -- network status indicator driven by the network daemon
#[derive(Debug, Parser)]
#[command(
    name = "nmtray",
    version,
    about = "Mirror the network daemon's state as an indicator, menu and selection",
    propagate_version = true
)]
pub struct Cli {
    #[command(flatten)]
    pub global: GlobalOpts,

    /// Defaults to `watch`
    #[command(subcommand)]
    pub command: Option<Command>,
}

// ── Global Options ───────────────────────────────────────────────────

#[derive(Debug, Args)]
pub struct GlobalOpts {
    /// Daemon socket path (overrides config)
    #[arg(long, env = "NMTRAY_SOCKET", global = true)]
    pub socket: Option<PathBuf>,

    /// Config file (defaults to the platform config dir)
    #[arg(long, env = "NMTRAY_CONFIG", global = true)]
    pub config: Option<PathBuf>,

    /// Refresh interval in milliseconds (overrides config)
    #[arg(long, global = true)]
    pub refresh_ms: Option<u64>,

    /// Output format
    #[arg(long, short = 'o', default_value = "plain", global = true)]
    pub output: OutputFormat,

    /// Write logs to this file instead of stderr
    #[arg(long, global = true)]
    pub log_file: Option<PathBuf>,

    /// Increase verbosity (-v, -vv, -vvv)
    #[arg(long, short = 'v', action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    /// Human-readable text
    Plain,
    /// One JSON document per line
    Json,
}

// ── Commands ─────────────────────────────────────────────────────────

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Print the display state every time it changes, until Ctrl-C
    Watch,

    /// Print the device/network menu and exit
    Menu(SettleArgs),

    /// Activate a device, or a network on a device, and exit
    Select(SelectArgs),
}

#[derive(Debug, Args)]
pub struct SettleArgs {
    /// How long to wait for the daemon's initial notifications
    #[arg(long, default_value_t = 500)]
    pub settle_ms: u64,
}

#[derive(Debug, Args)]
pub struct SelectArgs {
    /// Device identifier as reported by the daemon
    pub device: String,

    /// Wireless network name
    pub essid: Option<String>,

    /// Treat ESSID as a user-typed network, even if it was never scanned
    #[arg(long, requires = "essid")]
    pub custom: bool,

    #[command(flatten)]
    pub settle: SettleArgs,
}
