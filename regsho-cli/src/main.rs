//! Reg SHO CLI — threshold-list history, streak analysis and export.
//!
//! Commands:
//! - `update` — fetch missing threshold files into the history store
//! - `analyze` — analyze the stored history (no network)
//! - `rebuild` — update, analyze and publish the result
//! - `export` — write the published result as CSV or JSON
//! - `symbol` — presence of one symbol over the last 30 valid dates
//! - `status` — history store and published result status
//! - `serve` — run the rebuild service with its daily schedule

use std::io::BufRead;
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use regsho_core::analysis::RiskTier;
use regsho_core::data::JsonHistoryStore;
use regsho_core::updater::LogProgress;
use regsho_core::AnalysisResult;
use regsho_runner::{
    write_export, ExportFormat, MonitorConfig, RebuildOutcome, RebuildPipeline, RebuildService,
    ResultStoreError, StartupMode,
};

#[derive(Parser)]
#[command(
    name = "regsho",
    version,
    about = "Reg SHO threshold-list streak monitor"
)]
struct Cli {
    /// Path to a TOML config file.
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Data directory (overrides the config file).
    #[arg(long, global = true)]
    data_dir: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Fetch missing threshold files into the history store.
    Update,
    /// Analyze the stored history without touching the network.
    Analyze {
        /// Print the full result as JSON.
        #[arg(long, default_value_t = false)]
        json: bool,
    },
    /// Update the history, analyze it and publish the result.
    Rebuild,
    /// Export the published result.
    Export {
        /// Output file or directory. Defaults to regsho_{YYYYMMDD}.{ext} here.
        #[arg(long)]
        output: Option<PathBuf>,

        /// csv or json.
        #[arg(long, default_value = "csv")]
        format: ExportFormat,
    },
    /// Presence of one symbol over the last 30 valid dates.
    Symbol {
        symbol: String,
    },
    /// Report history store and published result status.
    Status,
    /// Run the rebuild service: startup rebuild, daily schedule, stdin triggers.
    Serve,
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_target(false)
        .init();

    let cli = Cli::parse();
    let mut config = MonitorConfig::load(cli.config.as_deref())?;
    if let Some(data_dir) = cli.data_dir {
        config = config.with_data_dir(data_dir);
    }

    match cli.command {
        Commands::Update => run_update(&config),
        Commands::Analyze { json } => run_analyze(&config, json),
        Commands::Rebuild => run_rebuild(&config),
        Commands::Export { output, format } => run_export(&config, output.as_deref(), format),
        Commands::Symbol { symbol } => run_symbol(&config, &symbol),
        Commands::Status => run_status(&config),
        Commands::Serve => run_serve(&config),
    }
}

fn run_update(config: &MonitorConfig) -> Result<()> {
    let pipeline = RebuildPipeline::from_config(config)?;
    let today = pipeline.today();
    let outcome = pipeline.update(today, &LogProgress);
    let s = &outcome.summary;

    println!("History update as of {today}");
    println!("  Candidates:      {}", s.candidates);
    println!("  Already stored:  {}", s.already_present);
    println!("  Fetched:         {}", s.fetched);
    println!("  Unavailable:     {}", s.unavailable);
    println!("  Pruned:          {}", s.pruned);
    println!("  Stored dates:    {}", outcome.history.len());
    if !s.saved {
        println!("  Warning: history could not be saved; see log");
    }
    Ok(())
}

fn run_analyze(config: &MonitorConfig, json: bool) -> Result<()> {
    let pipeline = RebuildPipeline::from_config(config)?;
    let Some(result) = pipeline.analyze_stored() else {
        bail!("no threshold data stored yet; run `regsho update` first");
    };

    if json {
        println!("{}", serde_json::to_string_pretty(&result)?);
    } else {
        print_result(&result);
    }
    Ok(())
}

fn run_rebuild(config: &MonitorConfig) -> Result<()> {
    let pipeline = RebuildPipeline::from_config(config)?;
    match pipeline.rebuild()? {
        RebuildOutcome::Updated {
            update,
            ref_date,
            summary,
        } => {
            println!(
                "Published result for {} ({} fetched, {} unavailable)",
                ref_date.iso(),
                update.fetched,
                update.unavailable
            );
            println!(
                "  {} listed: {} danger, {} warning, {} safe; {} new, {} removed",
                summary.total,
                summary.danger,
                summary.warning,
                summary.safe,
                summary.new_today,
                summary.removed_today
            );
        }
        RebuildOutcome::NoData { update } => {
            println!(
                "No threshold data available ({} dates unavailable); previous result kept",
                update.unavailable
            );
        }
    }
    Ok(())
}

fn run_export(config: &MonitorConfig, output: Option<&Path>, format: ExportFormat) -> Result<()> {
    let result = load_published(config)?;
    let path = write_export(&result, format, output)?;
    println!(
        "Exported {} securities to {}",
        result.securities.len(),
        path.display()
    );
    Ok(())
}

fn run_symbol(config: &MonitorConfig, symbol: &str) -> Result<()> {
    let pipeline = RebuildPipeline::from_config(config)?;
    let query = pipeline.symbol_history(symbol);

    if query.history.is_empty() {
        println!("No threshold data stored yet");
        return Ok(());
    }

    println!(
        "{}: listed {} of the last {} dates, current streak {}",
        query.symbol,
        query.listed_days(),
        query.history.len(),
        query.current_streak()
    );
    println!();
    for flag in &query.history {
        let mark = if flag.present { "listed" } else { "-" };
        println!("  {}  {}", flag.date.iso(), mark);
    }
    Ok(())
}

fn run_status(config: &MonitorConfig) -> Result<()> {
    let store = JsonHistoryStore::new(&config.data_dir);
    println!("Data directory: {}", config.data_dir.display());

    match store.meta() {
        Some(meta) => {
            println!("{}", "-".repeat(50));
            println!("History dates:   {}", meta.date_count);
            println!("Valid dates:     {}", meta.valid_date_count);
            let range = match (&meta.first_date, &meta.last_date) {
                (Some(first), Some(last)) => format!("{} to {}", first.iso(), last.iso()),
                _ => "(empty)".to_string(),
            };
            println!("Date range:      {range}");
            println!("Content hash:    {}", &meta.data_hash[..meta.data_hash.len().min(16)]);
            println!("Saved at:        {}", meta.saved_at.format("%Y-%m-%d %H:%M:%S"));
        }
        None => println!("History: none stored yet"),
    }

    match regsho_runner::ResultStore::new(&config.data_dir).load() {
        Ok(result) => println!(
            "Result:          {} ({} securities, updated {})",
            result.ref_date.iso(),
            result.summary.total,
            result.last_updated
        ),
        Err(ResultStoreError::NotReady) => println!("Result:          not ready"),
        Err(e) => println!("Result:          unreadable ({e})"),
    }
    Ok(())
}

fn run_serve(config: &MonitorConfig) -> Result<()> {
    let service = RebuildService::from_config(config)?;

    match service.startup()? {
        StartupMode::Synchronous(RebuildOutcome::Updated { ref_date, .. }) => {
            println!("Initial result published for {}", ref_date.iso())
        }
        StartupMode::Synchronous(RebuildOutcome::NoData { .. }) => {
            println!("No threshold data available yet; waiting for the schedule")
        }
        StartupMode::Background => println!("Serving stored result; refresh queued"),
    }

    service.start_schedule(config.schedule_times()?, config.market_tz()?)?;
    println!(
        "Scheduled rebuilds at {} {}. Type `refresh` to rebuild now, `quit` to exit.",
        config.schedule.join(", "),
        config.timezone
    );

    if !read_commands(&service, config)? {
        // Detached (`</dev/null`, a service manager): keep serving the
        // schedule until the process is terminated.
        tracing::info!("stdin closed; serving on schedule until terminated");
        service.wait_for_shutdown();
    }

    service.shutdown();
    if !service.wait_idle(Duration::from_secs(120)) {
        println!("Exiting with a rebuild still running");
    }
    Ok(())
}

/// Handle stdin commands. Returns `true` on `quit`, `false` when stdin closes.
fn read_commands(service: &RebuildService, config: &MonitorConfig) -> Result<bool> {
    let stdin = std::io::stdin();
    for line in stdin.lock().lines() {
        let line = line.context("failed to read stdin")?;
        match line.trim() {
            "refresh" => {
                service.trigger();
                println!("Rebuild queued");
            }
            "status" => run_status(config)?,
            "quit" | "exit" => {
                tracing::info!("shutdown requested");
                return Ok(true);
            }
            "" => {}
            other => println!("Unknown command: {other} (refresh, status, quit)"),
        }
    }
    Ok(false)
}

fn load_published(config: &MonitorConfig) -> Result<AnalysisResult> {
    match regsho_runner::ResultStore::new(&config.data_dir).load() {
        Ok(result) => Ok(result),
        Err(ResultStoreError::NotReady) => {
            bail!("no published result yet; run `regsho rebuild` first")
        }
        Err(e) => Err(e).context("failed to read published result"),
    }
}

fn print_result(result: &AnalysisResult) {
    let s = &result.summary;
    println!(
        "Reg SHO threshold list for {} (updated {})",
        result.ref_date.iso(),
        result.last_updated
    );
    println!(
        "{} listed: {} danger, {} warning, {} safe, {} Rule 3210",
        s.total, s.danger, s.warning, s.safe, s.rule_flagged
    );
    println!();
    println!(
        "{:<7} {:<30} {:<15} {:>6} {:>5} {:<8} {:<11} {:>5} {:<4}",
        "Symbol", "Name", "Market", "Streak", "Left", "Risk", "Since", "Pct", "3210"
    );
    println!("{}", "-".repeat(100));
    for sec in &result.securities {
        let name: String = sec.name.chars().take(30).collect();
        let marker = match (sec.is_new, sec.risk) {
            (true, _) => " NEW",
            (false, RiskTier::Danger) => " !",
            _ => "",
        };
        println!(
            "{:<7} {:<30} {:<15} {:>6} {:>5} {:<8} {:<11} {:>4}% {:<4}{}",
            sec.symbol,
            name,
            sec.market_label,
            sec.streak,
            sec.days_remaining,
            sec.risk.label(),
            sec.first_date.iso(),
            sec.pct,
            sec.rule_flag.as_str(),
            marker
        );
    }

    if !result.added_today.is_empty() {
        println!();
        println!("Added today:   {}", result.added_today.join(", "));
    }
    if !result.removed_today.is_empty() {
        let removed: Vec<String> = result
            .removed_today
            .iter()
            .map(|r| format!("{} ({}d)", r.symbol, r.streak_at_removal))
            .collect();
        println!("Removed today: {}", removed.join(", "));
    }
}
