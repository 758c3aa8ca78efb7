//! confline - Conference publication corpus builder
//!
//! Crawls conference proceedings from dblp and enriches them with OpenAlex
//! and Semantic Scholar data in three stages: base, extended, citations.

use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;

use anyhow::Result;
use clap::{CommandFactory, Parser, Subcommand};
use confline_store::MissingStage;

mod cmd;
mod config;

use config::Config;

#[derive(Parser)]
#[command(name = "confline")]
#[command(about = "Conference publication corpus builder")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Command,

    /// Enable debug logging
    #[arg(long, global = true)]
    debug: bool,

    /// Config file path (default: ./confline.toml or ~/.config/confline/config.toml)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Write logs to this file instead of the terminal
    #[arg(long, global = true)]
    log_file: Option<PathBuf>,
}

#[derive(Subcommand)]
enum Command {
    /// Crawl dblp and attach OpenAlex DOIs, affiliations and references
    Base(cmd::base::BaseArgs),
    /// Add Semantic Scholar abstracts, TLDRs and reference IDs
    Extended(cmd::extended::ExtendedArgs),
    /// Resolve every paper cited by the corpus
    Citations(cmd::citations::CitationsArgs),
    /// Show current configuration
    Config,
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    match run(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            if let Some(missing) = e.downcast_ref::<MissingStage>() {
                eprintln!("{missing}");
                return ExitCode::from(2);
            }
            eprintln!("Error: {e:#}");
            ExitCode::FAILURE
        }
    }
}

fn run(cli: Cli) -> Result<()> {
    // Progress context (TTY auto-detect)
    let progress = Arc::new(confline_core::ProgressContext::new());

    // Logging:
    //   TTY:     warn unless --debug (progress bars show activity)
    //   non-TTY: info unless --debug (logs are the only progress indicator)
    let is_tty = progress.is_tty();
    let multi = if is_tty { Some(progress.multi()) } else { None };
    let quiet = if is_tty { !cli.debug } else { false };
    confline_core::init_logging(quiet, cli.debug, multi, cli.log_file.as_deref())?;

    let config = if let Some(path) = &cli.config {
        Config::from_file(path)?
    } else {
        Config::load()?
    };
    confline_core::set_http_config(config.http.to_http_config());

    match cli.command {
        Command::Base(args) => cmd::base::run(args, &config, &progress),
        Command::Extended(args) => {
            if !args.key.no_key && config.s2.api_key.is_none() {
                Cli::command()
                    .error(
                        clap::error::ErrorKind::MissingRequiredArgument,
                        "no Semantic Scholar API key: set S2_API_KEY or [s2] api_key, \
                         or pass --no-key",
                    )
                    .exit();
            }
            cmd::extended::run(args, &config, &progress)
        }
        Command::Citations(args) => cmd::citations::run(args, &config, &progress),
        Command::Config => {
            print_config(&config);
            Ok(())
        }
    }
}

fn print_config(config: &Config) {
    use comfy_table::{Cell, Color, Table, modifiers::UTF8_ROUND_CORNERS, presets::UTF8_FULL};

    let mut table = Table::new();
    table
        .load_preset(UTF8_FULL)
        .apply_modifier(UTF8_ROUND_CORNERS)
        .set_header(vec![
            Cell::new("Setting").fg(Color::Cyan),
            Cell::new("Value").fg(Color::Cyan),
        ]);

    table.add_row(vec![
        "Base directory",
        &config.output.base_dir.display().to_string(),
    ]);
    table.add_row(vec![
        "Extended directory",
        &config.output.extended_dir.display().to_string(),
    ]);
    table.add_row(vec![
        "Citations directory",
        &config.output.citations_dir.display().to_string(),
    ]);
    table.add_row(vec![
        "Workers",
        &format!("{} (max: {})", config.workers.default, config.workers.max),
    ]);
    table.add_row(vec![
        "Batch workers",
        &config.citations.batch_workers.to_string(),
    ]);
    table.add_row(vec!["dblp base URL", &config.dblp.base_url]);
    let slugs = config
        .dblp
        .slug_overrides
        .iter()
        .map(|(conf, slug)| format!("{conf}={slug}"))
        .collect::<Vec<_>>()
        .join(", ");
    table.add_row(vec!["dblp slug overrides", &slugs]);
    table.add_row(vec!["OA API URL", &config.openalex.api_url]);
    table.add_row(vec!["S2 API URL", &config.s2.api_url]);
    table.add_row(vec![
        "S2 API key",
        if config.s2.api_key.is_some() {
            "configured"
        } else {
            "not set"
        },
    ]);
    table.add_row(vec![
        "Timeouts",
        &format!(
            "connect {}s, request {}s",
            config.http.connect_timeout, config.http.request_timeout
        ),
    ]);
    table.add_row(vec![
        "Retries",
        &format!(
            "{} (delay {}ms + {}ms/attempt)",
            config.retry.max_retries, config.retry.initial_delay_ms, config.retry.backoff_ms
        ),
    ]);
    table.add_row(vec![
        "Throttle",
        &format!(
            "request {}ms, batch {}ms, cited {}ms",
            config.throttle.s2_request_ms,
            config.throttle.s2_batch_ms,
            config.throttle.cited_paper_ms
        ),
    ]);

    eprintln!("\n{table}");
}
