//! Extended subcommand - Semantic Scholar enrichment of base documents

use anyhow::Result;
use clap::Args;
use confline_core::SharedProgress;
use confline_enrich::ExtendedStage;
use confline_store::DocumentStore;

use crate::config::Config;

use super::{KeyArgs, StageArgs, openalex_client, print_report, s2_client};

#[derive(Args, Debug)]
pub struct ExtendedArgs {
    #[command(flatten)]
    pub stage: StageArgs,

    #[command(flatten)]
    pub key: KeyArgs,
}

pub fn run(args: ExtendedArgs, config: &Config, progress: &SharedProgress) -> Result<()> {
    let mut cfg = args.stage.run_config(config)?;
    args.key.apply(&mut cfg);

    let output = args
        .stage
        .output
        .unwrap_or_else(|| config.output.extended_dir.clone());
    let stage = ExtendedStage {
        s2: s2_client(config, args.key.api_key(config)),
        openalex: openalex_client(config),
        input: DocumentStore::new(&config.output.base_dir),
        store: DocumentStore::new(output),
        throttle: config.throttle.throttle(),
        progress: progress.clone(),
    };

    let report = stage.run(&cfg)?;
    print_report(&report, progress);
    Ok(())
}
