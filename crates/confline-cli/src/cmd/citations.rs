//! Citations subcommand - resolve the papers cited by the corpus

use anyhow::Result;
use clap::Args;
use confline_core::SharedProgress;
use confline_enrich::CitationsStage;
use confline_store::DocumentStore;

use crate::config::Config;

use super::{KeyArgs, StageArgs, openalex_client, print_report, s2_client};

#[derive(Args, Debug)]
pub struct CitationsArgs {
    #[command(flatten)]
    pub stage: StageArgs,

    #[command(flatten)]
    pub key: KeyArgs,

    /// Reuse the intermediate batch document if present
    #[arg(long)]
    pub reuse_batches: bool,
}

pub fn run(args: CitationsArgs, config: &Config, progress: &SharedProgress) -> Result<()> {
    let mut cfg = args.stage.run_config(config)?;
    args.key.apply(&mut cfg);
    let api_key = args.key.api_key(config);
    if api_key.is_none() {
        log::warn!("no Semantic Scholar API key; batch requests share the public rate limit");
    }

    let output = args
        .stage
        .output
        .unwrap_or_else(|| config.output.citations_dir.clone());
    let stage = CitationsStage {
        s2: s2_client(config, api_key),
        openalex: openalex_client(config),
        input: DocumentStore::new(&config.output.extended_dir),
        store: DocumentStore::new(output),
        throttle: config.throttle.throttle(),
        progress: progress.clone(),
        reuse_batches: args.reuse_batches,
    };

    let report = stage.run(&cfg)?;
    print_report(&report, progress);
    Ok(())
}
