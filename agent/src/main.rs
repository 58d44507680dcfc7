//! Switch configuration backup - Entry Point
//!
//! Backs up the running configuration of every switch listed in an inventory
//! file and files the uploads per device and per day.

use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::Context;
use chrono::Local;
use clap::Parser;
use colored::Colorize;
use tracing::{error, info};

use swbackup::app::run::run;
use swbackup::backup::report::{DeviceOutcome, RunReport};
use swbackup::logs::{init_logging, LogLevel, LogOptions};
use swbackup::storage::layout::ArchiveLayout;
use swbackup::storage::settings::Settings;
use swbackup::utils::version_info;

#[derive(Parser, Debug)]
#[command(
    name = "swbackup",
    about = "Back up switch running configurations over SSH and TFTP",
    disable_version_flag = true
)]
struct Cli {
    /// Inventory file: hostname;address;brand;function;command;default_credentials
    #[arg(required_unless_present = "version")]
    inventory: Option<PathBuf>,

    /// Settings file (defaults to ./swbackup.json when present)
    #[arg(long)]
    settings: Option<PathBuf>,

    /// Directory the archive folders are created in
    #[arg(long)]
    work_dir: Option<PathBuf>,

    /// Inventory column delimiter
    #[arg(long)]
    delimiter: Option<char>,

    /// Address devices upload to
    #[arg(long)]
    receiver_address: Option<String>,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long)]
    log_level: Option<LogLevel>,

    /// Log file path
    #[arg(long, conflicts_with = "no_log_file")]
    log_file: Option<PathBuf>,

    /// Log to the console only
    #[arg(long)]
    no_log_file: bool,

    /// Upper bound on waiting for each upload, in milliseconds
    #[arg(long)]
    timeout_ms: Option<u64>,

    /// Upload poll interval in milliseconds
    #[arg(long)]
    poll_interval_ms: Option<u64>,

    /// Print version information and exit
    #[arg(long)]
    version: bool,
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    if cli.version {
        match serde_json::to_string_pretty(&version_info()) {
            Ok(version) => println!("{}", version),
            Err(e) => eprintln!("Unable to render version information: {}", e),
        }
        return ExitCode::SUCCESS;
    }

    match run_cli(cli).await {
        Ok(report) => {
            print_summary(&report);
            ExitCode::SUCCESS
        }
        Err(e) => {
            eprintln!("{} {:#}", "error:".red().bold(), e);
            ExitCode::FAILURE
        }
    }
}

async fn run_cli(cli: Cli) -> anyhow::Result<RunReport> {
    let mut settings = Settings::load(cli.settings.as_deref())
        .await
        .context("Unable to read settings")?;
    apply_overrides(&mut settings, &cli);

    let inventory = cli
        .inventory
        .context("An inventory file is required")?;

    // Date is fixed for the whole run, including the log file name
    let date = Local::now().date_naive();
    let log_file = settings.log_to_file.then(|| {
        settings.log_file.clone().unwrap_or_else(|| {
            ArchiveLayout::new(&settings.work_dir, date)
                .log_file()
                .path()
                .to_path_buf()
        })
    });

    let _guard = init_logging(LogOptions {
        log_level: settings.log_level.clone(),
        log_file,
        ..Default::default()
    })
    .context("Failed to initialize logging")?;

    let version = version_info();
    info!("swbackup {} ({})", version.version, version.git_hash);

    let report = run(settings, &inventory, date, await_shutdown_signal())
        .await
        .inspect_err(|e| error!("Run failed: {}", e))?;
    Ok(report)
}

fn apply_overrides(settings: &mut Settings, cli: &Cli) {
    if let Some(work_dir) = &cli.work_dir {
        settings.work_dir = work_dir.clone();
    }
    if let Some(delimiter) = cli.delimiter {
        settings.inventory_delimiter = delimiter;
    }
    if let Some(address) = &cli.receiver_address {
        settings.receiver.address = Some(address.clone());
    }
    if let Some(level) = &cli.log_level {
        settings.log_level = level.clone();
    }
    if let Some(log_file) = &cli.log_file {
        settings.log_file = Some(log_file.clone());
    }
    if cli.no_log_file {
        settings.log_to_file = false;
    }
    if let Some(timeout_ms) = cli.timeout_ms {
        settings.wait.timeout_ms = timeout_ms;
    }
    if let Some(poll_interval_ms) = cli.poll_interval_ms {
        settings.wait.poll_interval_ms = poll_interval_ms;
    }
}

fn print_summary(report: &RunReport) {
    println!();
    println!("{} run {}", "Backup".bold(), report.run_id);
    for device in &report.devices {
        match &device.outcome {
            DeviceOutcome::Archived(artifact) => println!(
                "  {:<8} {} -> {}",
                "OK".green().bold(),
                device.hostname,
                artifact.daily_path.display()
            ),
            DeviceOutcome::CommandSent => {
                println!("  {:<8} {}", "SENT".cyan().bold(), device.hostname)
            }
            DeviceOutcome::Failed(e) => println!(
                "  {:<8} {}: {}",
                "FAILED".red().bold(),
                device.hostname,
                e
            ),
            DeviceOutcome::Skipped => {
                println!("  {:<8} {}", "SKIPPED".yellow().bold(), device.hostname)
            }
        }
    }
    println!(
        "{} succeeded, {} failed, {} skipped",
        report.succeeded().to_string().green(),
        report.failed().to_string().red(),
        report.skipped().to_string().yellow()
    );
}

async fn await_shutdown_signal() {
    #[cfg(unix)]
    {
        use tokio::signal::unix::{signal, SignalKind};
        let mut sigterm = match signal(SignalKind::terminate()) {
            Ok(sigterm) => sigterm,
            Err(e) => {
                error!("Unable to listen for SIGTERM: {}", e);
                return futures::future::pending().await;
            }
        };

        tokio::select! {
            _ = sigterm.recv() => {
                info!("SIGTERM received, skipping remaining devices...");
            }
            result = tokio::signal::ctrl_c() => {
                if result.is_err() {
                    return futures::future::pending().await;
                }
                info!("Ctrl+C received, skipping remaining devices...");
            }
        }
    }

    #[cfg(not(unix))]
    {
        if let Err(e) = tokio::signal::ctrl_c().await {
            error!("Unable to listen for Ctrl+C: {}", e);
            return futures::future::pending().await;
        }
        info!("Ctrl+C received, skipping remaining devices...");
    }
}
