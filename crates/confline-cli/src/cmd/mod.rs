//! Subcommands and the arguments they share

pub mod base;
pub mod citations;
pub mod extended;

use anyhow::{Result, ensure};
use clap::Args;
use confline_core::{ReqwestTransport, SharedProgress};
use confline_enrich::{RunConfig, StageReport};
use confline_openalex::OpenAlexClient;
use confline_semantic_scholar::S2Client;

use crate::config::Config;

/// Conference and year selection common to every stage
#[derive(Args, Debug, Clone)]
pub struct StageArgs {
    /// dblp conference keys (e.g. icse fse cloud)
    #[arg(short, long, num_args = 1.., required = true)]
    pub conferences: Vec<String>,

    /// First and last year; a single value selects one year
    #[arg(short, long, num_args = 1..=2, required = true)]
    pub years: Vec<i64>,

    /// Number of parallel workers per conference
    #[arg(short, long)]
    pub workers: Option<usize>,

    /// Output directory (default from config)
    #[arg(short, long)]
    pub output: Option<std::path::PathBuf>,
}

impl StageArgs {
    /// (first, last) from `--years`
    pub fn year_range(&self) -> Result<(i64, i64)> {
        let (first, last) = match self.years.as_slice() {
            [year] => (*year, *year),
            [first, last] => (*first, *last),
            _ => anyhow::bail!("--years takes one or two values"),
        };
        ensure!(first <= last, "first year {first} is after last year {last}");
        Ok((first, last))
    }

    pub fn run_config(&self, config: &Config) -> Result<RunConfig> {
        let (first, last) = self.year_range()?;
        let workers = self.workers.unwrap_or(config.workers.default);
        ensure!(
            (1..=config.workers.max).contains(&workers),
            "workers must be between 1 and {} (got {workers})",
            config.workers.max
        );
        let mut cfg = RunConfig::new(self.conferences.clone(), first, last, workers);
        cfg.batch_workers = config.citations.batch_workers;
        Ok(cfg)
    }
}

/// Options for the stages that call Semantic Scholar
#[derive(Args, Debug, Clone)]
pub struct KeyArgs {
    /// Run without an API key (forces a single worker)
    #[arg(long)]
    pub no_key: bool,
}

impl KeyArgs {
    /// The key to send, or `None` with `--no-key`
    pub fn api_key<'a>(&self, config: &'a Config) -> Option<&'a str> {
        if self.no_key {
            None
        } else {
            config.s2.api_key.as_deref()
        }
    }

    /// Without a key the shared rate limit only tolerates one worker
    pub fn apply(&self, cfg: &mut RunConfig) {
        if self.no_key && (cfg.workers > 1 || cfg.batch_workers > 1) {
            log::warn!("--no-key: using a single worker");
            cfg.workers = 1;
            cfg.batch_workers = 1;
        }
    }
}

pub fn openalex_client(config: &Config) -> OpenAlexClient {
    OpenAlexClient::new(
        &config.openalex.api_url,
        ReqwestTransport::shared(),
        config.retry.policy(),
    )
}

pub fn s2_client(config: &Config, api_key: Option<&str>) -> S2Client {
    S2Client::new(
        &config.s2.api_url,
        ReqwestTransport::shared(),
        config.retry.policy(),
        api_key,
    )
}

/// Summary table in a terminal, log lines otherwise
pub fn print_report(report: &StageReport, progress: &SharedProgress) {
    if progress.is_tty() {
        progress.println(format!("\n{}", report.format_table()));
        progress.println(report.done_line());
    } else {
        report.log();
    }
}
