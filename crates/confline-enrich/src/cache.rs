//! Corpus-wide paper ID cache built from extended documents

use anyhow::Result;
use confline_core::{ConferenceYearIndex, PaperRecord};
use confline_store::{DocumentStore, StageName};
use rustc_hash::FxHashMap;

/// A corpus paper together with the conference it came from
#[derive(Debug, Clone)]
pub struct CachedPaper {
    pub paper: PaperRecord,
    pub conference: String,
}

/// S2 paper ID → corpus paper
#[derive(Debug, Default)]
pub struct IdCache {
    papers: FxHashMap<String, CachedPaper>,
}

impl IdCache {
    /// Index every resolved paper of the given conferences' extended documents.
    ///
    /// Fails with `MissingStage` if a document is absent.
    pub fn build(store: &DocumentStore, conferences: &[String]) -> Result<Self> {
        let mut cache = Self::default();
        for conference in conferences {
            let index: ConferenceYearIndex = store.load(conference, StageName::Extended)?;
            cache.add(conference, index);
        }
        log::info!("(citations) id cache: {} papers", cache.len());
        Ok(cache)
    }

    /// Add one conference's papers; papers without an S2 ID are skipped
    pub fn add(&mut self, conference: &str, index: ConferenceYearIndex) {
        for paper in index.into_values().flatten() {
            let Some(id) = paper.paper_id().map(str::to_string) else {
                continue;
            };
            self.papers.insert(
                id,
                CachedPaper {
                    paper,
                    conference: conference.to_string(),
                },
            );
        }
    }

    pub fn get(&self, paper_id: &str) -> Option<&CachedPaper> {
        self.papers.get(paper_id)
    }

    pub fn len(&self) -> usize {
        self.papers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.papers.is_empty()
    }
}
