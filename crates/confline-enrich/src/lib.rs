//! confline-enrich - the three enrichment stages
//!
//! - **Base**: dblp listings + OpenAlex DOI, affiliations and references
//! - **Extended**: Semantic Scholar abstract, TLDR and reference IDs
//! - **Citations**: every cited paper resolved to authors, venue and year
//!
//! Each stage reads the previous stage's documents from a [`DocumentStore`]
//! and writes its own, one per conference.
//!
//! [`DocumentStore`]: confline_store::DocumentStore

pub mod base;
pub mod cache;
pub mod citations;
pub mod extended;
pub mod run;
pub mod stats;
pub mod verify;

pub use base::BaseStage;
pub use cache::{CachedPaper, IdCache};
pub use citations::{BatchResult, CitationsStage};
pub use extended::ExtendedStage;
pub use run::{RunConfig, Throttle};
pub use stats::{ConferenceSummary, StageReport};
