//! `nmtray`: headless front-end for the network status indicator.
//!
//! Starts the sync worker against the daemon socket, then either streams
//! display state changes (`watch`), prints the menu (`menu`), or forwards a
//! selection (`select`). Logs go to stderr, or to `--log-file`, so stdout
//! carries only rendered output.

mod cli;
mod output;

use std::io::Write;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use clap::Parser;
use color_eyre::eyre::{Result, WrapErr, bail};
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

use nmtray_config::{Config, FileSettingsStore};
use nmtray_core::{Applet, AppletConfig, Selection};

use crate::cli::{Cli, Command, GlobalOpts, OutputFormat, SelectArgs, SettleArgs};
use crate::output::{StdoutPresenter, render_menu};

/// Set up tracing to stderr, or to a file when `--log-file` is given.
/// The returned guard must live until exit so buffered lines are flushed.
fn setup_tracing(global: &GlobalOpts) -> Option<WorkerGuard> {
    let log_level = match global.verbose {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        EnvFilter::new(format!(
            "nmtray={log_level},nmtray_core={log_level},nmtray_api={log_level},nmtray_config={log_level}"
        ))
    });

    match &global.log_file {
        Some(log_file) => {
            let log_dir = log_file.parent().unwrap_or(Path::new("."));
            let log_filename = log_file
                .file_name()
                .unwrap_or(std::ffi::OsStr::new("nmtray.log"));

            let file_appender = tracing_appender::rolling::never(log_dir, log_filename);
            let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);

            tracing_subscriber::registry()
                .with(filter)
                .with(
                    fmt::layer()
                        .with_writer(non_blocking)
                        .with_ansi(false)
                        .with_target(true)
                        .with_thread_names(true),
                )
                .init();
            Some(guard)
        }
        None => {
            tracing_subscriber::registry()
                .with(filter)
                .with(fmt::layer().with_writer(std::io::stderr).with_target(false))
                .init();
            None
        }
    }
}

/// Config file, then CLI overrides.
fn build_config(global: &GlobalOpts) -> Result<Config> {
    let mut config = match &global.config {
        Some(path) => nmtray_config::load_config_from(path),
        None => nmtray_config::load_config(),
    }
    .wrap_err("failed to load configuration")?;

    if let Some(socket) = &global.socket {
        config.daemon.socket = Some(socket.clone());
    }
    if let Some(refresh_ms) = global.refresh_ms {
        config.display.refresh_ms = refresh_ms;
    }
    config.validate()?;
    Ok(config)
}

#[tokio::main]
async fn main() -> Result<()> {
    color_eyre::install()?;
    let cli = Cli::parse();
    let _log_guard = setup_tracing(&cli.global);

    let config = build_config(&cli.global)?;
    let applet_config: AppletConfig = config.to_applet_config()?;
    let settings = FileSettingsStore::open(config.settings_path())
        .wrap_err("failed to open network usage store")?;

    info!(
        socket = %applet_config.socket_path.display(),
        settings = %settings.path().display(),
        "starting nmtray"
    );

    let applet = Applet::start(&applet_config, Arc::new(settings))?;
    let format = cli.global.output;

    let result = match cli.command.unwrap_or(Command::Watch) {
        Command::Watch => {
            watch(&applet, format).await;
            Ok(())
        }
        Command::Menu(args) => {
            settle(&applet, &args).await;
            print_line(&render_menu(format, &applet.menu()))
        }
        Command::Select(args) => {
            settle(&applet, &args.settle).await;
            select(&applet, &args)
        }
    };

    applet.shutdown();
    result
}

/// Render until Ctrl-C.
async fn watch(applet: &Applet, format: OutputFormat) {
    let cancel = CancellationToken::new();
    let signal_cancel = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            debug!("interrupt received");
            signal_cancel.cancel();
        }
    });

    let mut presenter = StdoutPresenter::new(format);
    applet.run(&mut presenter, cancel).await;
}

/// How often `settle` checks whether the sync worker has given up.
const SETTLE_POLL: Duration = Duration::from_millis(20);

/// Give the daemon time to replay its state, unless the link already died.
async fn settle(applet: &Applet, args: &SettleArgs) {
    let deadline = tokio::time::sleep(Duration::from_millis(args.settle_ms));
    tokio::pin!(deadline);
    let mut versions = applet.registry().subscribe();
    let mut poll = tokio::time::interval(SETTLE_POLL);
    poll.set_missed_tick_behavior(MissedTickBehavior::Skip);

    loop {
        tokio::select! {
            () = &mut deadline => return,
            changed = versions.changed() => {
                if changed.is_err() {
                    return;
                }
            }
            _ = poll.tick() => {}
        }
        if !applet.is_connected() {
            debug!("sync worker stopped; not waiting any longer");
            return;
        }
    }
}

fn select(applet: &Applet, args: &SelectArgs) -> Result<()> {
    let device_id = args.device.as_str().into();
    let selection = match (&args.essid, args.custom) {
        (None, _) => Selection::Device { device_id },
        (Some(essid), false) => Selection::Network {
            device_id,
            essid: essid.clone(),
        },
        (Some(essid), true) => Selection::Custom {
            device_id,
            essid: essid.clone(),
        },
    };

    match applet.dispatch_selection(&selection) {
        Ok(()) => {
            info!(?selection, "selection sent");
            Ok(())
        }
        Err(e) if e.is_not_found() => bail!("{e}; it may have disappeared"),
        Err(e) => Err(e).wrap_err("selection failed"),
    }
}

fn print_line(text: &str) -> Result<()> {
    let mut stdout = std::io::stdout().lock();
    writeln!(stdout, "{text}")?;
    Ok(())
}
