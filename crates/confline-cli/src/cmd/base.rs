//! Base subcommand - dblp listings + OpenAlex

use anyhow::Result;
use clap::Args;
use confline_core::{ReqwestTransport, SharedProgress};
use confline_dblp::{DblpClient, SectionFilter, SlugTable};
use confline_enrich::BaseStage;
use confline_store::DocumentStore;

use crate::config::Config;

use super::{StageArgs, openalex_client, print_report};

#[derive(Args, Debug)]
pub struct BaseArgs {
    #[command(flatten)]
    pub stage: StageArgs,

    /// Extra section header term to skip (repeatable)
    #[arg(long = "skip-section")]
    pub skip_sections: Vec<String>,
}

pub fn run(args: BaseArgs, config: &Config, progress: &SharedProgress) -> Result<()> {
    let cfg = args.stage.run_config(config)?;

    let mut extra = config.dblp.extra_skip_sections.clone();
    extra.extend(args.skip_sections);
    let dblp = DblpClient::new(
        &config.dblp.base_url,
        ReqwestTransport::shared(),
        config.retry.policy(),
        SectionFilter::new(&extra),
        SlugTable::with_overrides(&config.dblp.slug_overrides),
    );

    let output = args
        .stage
        .output
        .unwrap_or_else(|| config.output.base_dir.clone());
    let stage = BaseStage {
        dblp,
        openalex: openalex_client(config),
        store: DocumentStore::new(output),
        progress: progress.clone(),
    };

    let report = stage.run(&cfg)?;
    print_report(&report, progress);
    Ok(())
}
