use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Instant;
use tracing::{error, info, level_filters::LevelFilter, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use queue_rename_fixer::arr::{ArrClient, MediaServerApi, ServerFlavor};
use queue_rename_fixer::cli_style::{self, get_styles, TableBuilder};
use queue_rename_fixer::config;
use queue_rename_fixer::repair::{
    IncompleteRun, PlannedMove, RepairPipeline, RunReport, WaitPolicy,
};

fn parse_path(s: &str) -> Result<PathBuf, String> {
    let path_buf = PathBuf::from(s);
    let original_path = match path_buf.canonicalize() {
        Ok(path) => path,
        Err(msg) => {
            if msg.kind() == std::io::ErrorKind::NotFound {
                path_buf
            } else {
                return Err(format!("Error resolving path '{}': {}", s, msg));
            }
        }
    };
    if original_path.is_absolute() {
        return Ok(original_path);
    }
    let cwd = std::env::current_dir().map_err(|e| format!("Failed to get current dir: {}", e))?;
    Ok(cwd.join(original_path))
}

#[derive(Parser, Debug)]
#[command(styles = get_styles(), version, about)]
struct CliArgs {
    /// Path to TOML configuration file. Values in the file override CLI arguments.
    #[clap(long, value_parser = parse_path)]
    pub config: Option<PathBuf>,

    /// Base URL of the media server, e.g. http://localhost:8989.
    #[clap(long)]
    pub url: Option<String>,

    /// API key of the media server.
    #[clap(long, env = "ARR_API_KEY", hide_env_values = true)]
    pub api_key: Option<String>,

    /// Kind of media server.
    #[clap(long, value_enum, default_value_t = ServerFlavor::Series)]
    pub flavor: ServerFlavor,

    /// Directory the download client saves completed downloads into.
    #[clap(long, value_parser = parse_path)]
    pub download_root: Option<PathBuf>,

    /// Timeout in seconds for each HTTP request.
    #[clap(long, default_value_t = 30)]
    pub http_timeout_sec: u64,

    /// Seconds between two checks of a running command.
    #[clap(long, default_value_t = 5)]
    pub poll_interval_secs: u64,

    /// Longest time in seconds to wait for a command before submitting it again.
    #[clap(long, default_value_t = 30)]
    pub max_wait_secs: u64,

    /// How many times a command is submitted before giving up.
    #[clap(long, default_value_t = 3)]
    pub retries: u32,

    /// Give up waiting on commands after this many seconds from start.
    #[clap(long)]
    pub run_timeout_secs: Option<u64>,

    /// Ask the server to rename the repaired files after the rescan.
    #[clap(long)]
    pub rename_after_rescan: bool,

    #[command(subcommand)]
    pub command: Option<Command>,
}

#[derive(Subcommand, Debug, Clone)]
enum Command {
    /// Repair stalled downloads and clear them from the queue (default).
    Fix,

    /// Show which files would be moved where, without changing anything.
    DryRun,

    /// Rescan the whole library.
    Rescan,

    /// Ask the server to look for finished downloads.
    CheckDownloads,

    /// Ask the server to import the downloads found under a path.
    /// Only available on series servers.
    DownloadScan { path: String },
}

/// Convert CLI args to CliConfig for config resolution
impl From<&CliArgs> for config::CliConfig {
    fn from(args: &CliArgs) -> Self {
        config::CliConfig {
            url: args.url.clone(),
            api_key: args.api_key.clone(),
            flavor: args.flavor,
            download_root: args.download_root.clone(),
            http_timeout_sec: args.http_timeout_sec,
            poll_interval_secs: args.poll_interval_secs,
            max_wait_secs: args.max_wait_secs,
            retries: args.retries,
            run_timeout_secs: args.run_timeout_secs,
            rename_after_rescan: args.rename_after_rescan,
        }
    }
}

fn main() {
    let cli_args = CliArgs::parse();

    let initialized = tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer())
        .with(
            EnvFilter::builder()
                .with_default_directive(LevelFilter::INFO.into())
                .with_env_var("LOG_LEVEL")
                .from_env_lossy(),
        )
        .try_init();
    if let Err(e) = initialized {
        eprintln!("Failed to initialize logging: {}", e);
    }

    info!(
        "queue-rename-fixer {}-{}",
        env!("CARGO_PKG_VERSION"),
        env!("GIT_HASH")
    );

    if let Err(e) = run(cli_args) {
        error!("{:#}", e);
        std::process::exit(1);
    }
}

fn run(cli_args: CliArgs) -> Result<()> {
    // Load TOML config if provided
    let file_config = match &cli_args.config {
        Some(path) => {
            info!("Loading configuration from {:?}", path);
            Some(config::FileConfig::load(path)?)
        }
        None => None,
    };

    // Resolve final configuration (TOML overrides CLI)
    let cli_config: config::CliConfig = (&cli_args).into();
    let app_config = config::AppConfig::resolve(&cli_config, file_config)?;

    info!("Configuration loaded:");
    info!("  url: {}", app_config.url);
    info!("  flavor: {}", app_config.flavor);
    info!("  download_root: {:?}", app_config.download_root);

    let cancelled = Arc::new(AtomicBool::new(false));
    let handler_flag = cancelled.clone();
    ctrlc::set_handler(move || {
        warn!("Interrupted, stopping after the current step");
        handler_flag.store(true, Ordering::SeqCst);
    })
    .context("Failed to install Ctrl-C handler")?;

    let deadline = app_config.run_timeout.map(|timeout| Instant::now() + timeout);

    let client = ArrClient::new(
        &app_config.url,
        app_config.api_key.clone(),
        app_config.flavor,
        app_config.http_timeout_sec,
    )?;

    let pipeline = RepairPipeline::new(
        &client,
        app_config.download_root.clone(),
        app_config.wait.clone(),
    )
    .rename_after_rescan(app_config.rename_after_rescan)
    .with_deadline(deadline)
    .with_cancel_flag(cancelled);

    let flavor = client.flavor();
    match cli_args.command.unwrap_or(Command::Fix) {
        Command::Fix => {
            let report = match pipeline.run() {
                Ok(report) => report,
                Err(e) => {
                    if let Some(incomplete) = e.downcast_ref::<IncompleteRun>() {
                        print_run_report(&incomplete.report, &app_config.wait);
                    }
                    return Err(e);
                }
            };
            print_run_report(&report, &app_config.wait);
            if let Some(e) = report.cleanup_error {
                return Err(e).context("Queue cleanup incomplete");
            }
        }
        Command::DryRun => {
            let planned = pipeline.plan()?;
            print_plan(&planned);
        }
        Command::Rescan => {
            pipeline.execute(&flavor.rescan_command())?;
            cli_style::print_success("Rescan completed");
        }
        Command::CheckDownloads => {
            pipeline.execute(&flavor.check_finished_downloads_command())?;
            cli_style::print_success("Finished downloads checked");
        }
        Command::DownloadScan { path } => {
            let command = flavor.downloaded_scan_command(&path)?;
            pipeline.execute(&command)?;
            cli_style::print_success(&format!("Downloads under {} scanned", path));
        }
    }

    Ok(())
}

fn print_run_report(report: &RunReport, wait: &WaitPolicy) {
    cli_style::print_section_header("Queue repair");
    if report.items.is_empty() {
        cli_style::print_success("No stalled download in the queue");
        return;
    }

    let mut table = TableBuilder::new(vec!["Queue id", "Title", "Status"]);
    for item in &report.items {
        table.add_row(vec![
            item.queue_entry.id.to_string(),
            item.title().to_string(),
            item.status_label(),
        ]);
    }
    table.print();

    cli_style::print_key_value("Renamed", &report.renamed().to_string());
    cli_style::print_key_value("Cleared", &report.cleared().to_string());
    cli_style::print_key_value("Skipped", &report.skipped().to_string());

    let waiting = report
        .items
        .iter()
        .filter(|i| i.has_been_renamed && !i.cleared)
        .count();
    if waiting > 0 {
        cli_style::print_warning(&format!(
            "{} renamed downloads not yet imported after {}s, run again later",
            waiting,
            wait.max_wait.as_secs()
        ));
    }
    if let Some(e) = &report.cleanup_error {
        cli_style::print_error(&e.to_string());
    }
}

fn print_plan(planned: &[PlannedMove]) {
    cli_style::print_section_header("Dry run");
    if planned.is_empty() {
        cli_style::print_success("No stalled download in the queue");
        return;
    }

    let mut table = TableBuilder::new(vec!["Title", "From", "To"]);
    for entry in planned {
        match entry {
            PlannedMove::Move {
                title,
                source,
                destination,
            } => table.add_row(vec![
                title.clone(),
                source.display().to_string(),
                destination.display().to_string(),
            ]),
            PlannedMove::Skip { title, reason } => {
                table.add_row(vec![title.clone(), format!("skipped: {}", reason), String::new()])
            }
        }
    }
    table.print();
}
