//! Extended stage: Semantic Scholar abstracts, summaries and references

use std::time::Instant;

use anyhow::Result;
use confline_core::{
    ConferenceYearIndex, ExtendedFields, PaperRecord, SharedProgress, SharedYearIndex,
    paper_count, run_partitioned,
};
use confline_openalex::{InstitutionMode, OpenAlexClient};
use confline_semantic_scholar::{PaperDetails, S2Client};
use confline_store::{DocumentStore, StageName};

use crate::run::{RunConfig, Throttle};
use crate::stats::{ConferenceSummary, StageReport};
use crate::verify::is_same_paper;

pub struct ExtendedStage {
    pub s2: S2Client,
    pub openalex: OpenAlexClient,
    /// Base stage documents
    pub input: DocumentStore,
    /// Output directory
    pub store: DocumentStore,
    pub throttle: Throttle,
    pub progress: SharedProgress,
}

impl ExtendedStage {
    /// Enrich every conference's base document.
    ///
    /// Fails with `MissingStage` before any request if a base document is
    /// missing for any requested conference.
    pub fn run(&self, cfg: &RunConfig) -> Result<StageReport> {
        cfg.validate()?;
        for conference in &cfg.conferences {
            self.input.require_input(conference, StageName::Extended)?;
        }

        let start = Instant::now();
        let mut report = StageReport::new(StageName::Extended);
        let line = self.progress.stage_line("extended");

        for conference in &cfg.conferences {
            line.set_message(conference.clone());
            let conf_start = Instant::now();
            let base: ConferenceYearIndex = self.input.load(conference, StageName::Base)?;
            for year in cfg.year_keys() {
                if !base.contains_key(&year) {
                    log::info!("(extended) {conference}: {year} data not found");
                }
            }

            let index = self.enrich_conference(conference, &base, cfg)?;
            self.store.save(conference, StageName::Extended, &index)?;

            let summary = ConferenceSummary {
                conference: conference.clone(),
                years: index.len(),
                records: paper_count(&index),
                resolved: index
                    .values()
                    .flatten()
                    .filter(|p| p.paper_id().is_some())
                    .count(),
                elapsed: conf_start.elapsed(),
            };
            summary.log(StageName::Extended);
            report.conferences.push(summary);
        }

        line.finish_and_clear();
        report.elapsed = start.elapsed();
        Ok(report)
    }

    /// Enrich the years of `[first, last]` present in `base`, partitioned by year
    pub fn enrich_conference(
        &self,
        conference: &str,
        base: &ConferenceYearIndex,
        cfg: &RunConfig,
    ) -> Result<ConferenceYearIndex> {
        let index = SharedYearIndex::new();
        run_partitioned(cfg.workers, cfg.first_year, cfg.last_year, |start, end| {
            let years: Vec<(String, &Vec<PaperRecord>)> = (start..=end)
                .filter_map(|y| {
                    let key = y.to_string();
                    base.get(&key).map(|papers| (key, papers))
                })
                .collect();
            let total = years.iter().map(|(_, p)| p.len() as u64).sum();
            let pb = self
                .progress
                .worker_bar(&format!("{conference} {start}-{end}"), total);

            for (year, papers) in years {
                pb.set_message(year.clone());
                let enriched = papers
                    .iter()
                    .map(|paper| {
                        let out = self.enrich_paper(paper);
                        pb.inc(1);
                        out
                    })
                    .collect();
                index.insert(&year, enriched);
            }
            pb.finish_and_clear();
        })?;
        Ok(index.into_inner())
    }

    /// Copy of `paper` with Semantic Scholar fields (null when unresolved)
    pub fn enrich_paper(&self, paper: &PaperRecord) -> PaperRecord {
        let mut out = paper.clone();
        let Some(details) = self.resolve(paper) else {
            out.extended = Some(ExtendedFields::default());
            return out;
        };

        out.extended = Some(ExtendedFields {
            paper_id: Some(details.paper_id.clone()).filter(|id| !id.is_empty()),
            citation_ids: Some(details.reference_ids()),
            abstract_text: details.abstract_text.clone(),
            tldr: details.tldr_text(),
            embedding: details.embedding_vector(),
        });

        if let Some(s2_doi) = details.doi() {
            if paper.openalex_link.is_none() && paper.doi.as_deref() != Some(s2_doi) {
                self.backfill(&mut out, s2_doi);
            }
        }
        out
    }

    /// DOI first, then a verified title search
    fn resolve(&self, paper: &PaperRecord) -> Option<PaperDetails> {
        if let Some(doi) = paper.doi.as_deref() {
            let found = self.s2.paper_by_doi(doi);
            Throttle::pause(self.throttle.s2_request);
            if found.is_some() {
                return found;
            }
        }

        let hit = self.s2.search_title(&paper.title);
        Throttle::pause(self.throttle.s2_request);
        let hit = hit?;

        if !is_same_paper(
            &paper.title,
            &paper.author_names(),
            &hit.title,
            &hit.author_names(),
        ) {
            log::info!(
                "(extended) search result {:?} rejected for {}",
                hit.title,
                paper.title
            );
            return None;
        }

        let paper_id = hit.paper_id?;
        let details = self.s2.paper_details(&paper_id);
        Throttle::pause(self.throttle.s2_request);
        details
    }

    /// Fill DOI, affiliations and references from OpenAlex by the S2 DOI;
    /// base values stay if the lookup fails
    fn backfill(&self, paper: &mut PaperRecord, doi: &str) {
        let Some(work) = self.openalex.work_by_doi(doi) else {
            return;
        };
        let details = self.openalex.resolve(&work, InstitutionMode::Lookup);
        paper.doi = details.doi.or_else(|| Some(doi.to_string()));
        if !details.authors.is_empty() {
            paper.authors = details.authors;
        }
        paper.referenced_works = details.referenced_works;
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use confline_core::mock::MockTransport;
    use confline_core::{AuthorEntry, ProgressContext, RetryPolicy};

    use super::*;

    const S2: &str = "https://api.semanticscholar.org/graph/v1";
    const OA: &str = "https://api.openalex.org";

    fn stage(mock: &Arc<MockTransport>, dir: &std::path::Path) -> ExtendedStage {
        ExtendedStage {
            s2: S2Client::new(S2, mock.clone(), RetryPolicy::immediate(0), None),
            openalex: OpenAlexClient::new(OA, mock.clone(), RetryPolicy::immediate(0)),
            input: DocumentStore::new(dir.join("base")),
            store: DocumentStore::new(dir.join("extended")),
            throttle: Throttle::none(),
            progress: Arc::new(ProgressContext::hidden()),
        }
    }

    fn paper(doi: Option<&str>) -> PaperRecord {
        PaperRecord {
            title: "Fuzzing All The Things.".into(),
            year: "2020".into(),
            doi: doi.map(str::to_string),
            authors: vec![
                AuthorEntry::unresolved("José Pérez"),
                AuthorEntry::unresolved("Ana Ruiz"),
            ],
            ..Default::default()
        }
    }

    #[test]
    fn doi_hit_skips_search() {
        let mock = Arc::new(MockTransport::new());
        mock.on_get(
            &format!("{S2}/paper/DOI:10.1/a"),
            200,
            r#"{"paperId": "p1", "abstract": "abs", "references": [{"paperId": "r1"}],
                "externalIds": {"DOI": "10.1/a"}}"#,
        );
        let tmp = tempfile::tempdir().unwrap();
        let out = stage(&mock, tmp.path()).enrich_paper(&paper(Some("10.1/a")));
        assert_eq!(out.paper_id(), Some("p1"));
        assert_eq!(out.citation_ids(), ["r1".to_string()]);
        assert_eq!(mock.hits_prefix(&format!("{S2}/paper/search")), 0);
        // same DOI, no backfill
        assert_eq!(mock.hits_prefix(OA), 0);
    }

    #[test]
    fn doi_miss_falls_back_to_title_search() {
        let mock = Arc::new(MockTransport::new());
        mock.on_get(
            &format!("{S2}/paper/search"),
            200,
            r#"{"data": [{"paperId": "p2", "title": "Fuzzing all the things", "authors": []}]}"#,
        );
        mock.on_get(
            &format!("{S2}/paper/p2"),
            200,
            r#"{"paperId": "p2", "externalIds": {"DOI": "10.1/a"}, "references": []}"#,
        );
        let tmp = tempfile::tempdir().unwrap();
        let out = stage(&mock, tmp.path()).enrich_paper(&paper(Some("10.1/a")));
        assert_eq!(out.paper_id(), Some("p2"));
        assert_eq!(mock.hits(&format!("{S2}/paper/DOI:10.1/a")), 1);
        assert_eq!(mock.hits(&format!("{S2}/paper/search")), 1);
    }

    #[test]
    fn rejected_candidate_leaves_nulls() {
        let mock = Arc::new(MockTransport::new());
        mock.on_get(
            &format!("{S2}/paper/search"),
            200,
            r#"{"data": [{"paperId": "zz", "title": "Something Else", "authors": [{"name": "Bob Smith"}]}]}"#,
        );
        let tmp = tempfile::tempdir().unwrap();
        let out = stage(&mock, tmp.path()).enrich_paper(&paper(None));
        assert_eq!(out.extended, Some(ExtendedFields::default()));
        assert_eq!(mock.hits(&format!("{S2}/paper/zz")), 0);
    }

    #[test]
    fn backfill_from_openalex_when_no_link() {
        let mock = Arc::new(MockTransport::new());
        mock.on_get(
            &format!("{S2}/paper/search"),
            200,
            r#"{"data": [{"paperId": "p9", "title": "Fuzzing all the things", "authors": []}]}"#,
        );
        mock.on_get(
            &format!("{S2}/paper/p9"),
            200,
            r#"{"paperId": "p9", "externalIds": {"DOI": "10.9/z"}, "references": []}"#,
        );
        mock.on_get(
            &format!("{OA}/works/https://doi.org/10.9/z"),
            200,
            r#"{"id": "https://openalex.org/W9", "doi": "https://doi.org/10.9/z",
                "authorships": [{"author": {"display_name": "José Pérez"}, "institutions": []}],
                "referenced_works": ["https://openalex.org/W1"]}"#,
        );
        let tmp = tempfile::tempdir().unwrap();
        let out = stage(&mock, tmp.path()).enrich_paper(&paper(None));
        assert_eq!(out.doi.as_deref(), Some("10.9/z"));
        assert_eq!(out.authors.len(), 1);
        assert_eq!(out.referenced_works, Some(vec!["W1".to_string()]));
        assert_eq!(out.paper_id(), Some("p9"));
    }

    #[test]
    fn openalex_link_blocks_backfill() {
        let mock = Arc::new(MockTransport::new());
        mock.on_get(
            &format!("{S2}/paper/DOI:10.1/a"),
            200,
            r#"{"paperId": "p1", "externalIds": {"DOI": "10.9/z"}, "references": []}"#,
        );
        let mut base = paper(Some("10.1/a"));
        base.openalex_link = Some("https://openalex.org/W100".into());
        let tmp = tempfile::tempdir().unwrap();
        let out = stage(&mock, tmp.path()).enrich_paper(&base);
        assert_eq!(out.paper_id(), Some("p1"));
        assert_eq!(out.doi.as_deref(), Some("10.1/a"));
        assert_eq!(mock.hits_prefix(OA), 0);
    }

    #[test]
    fn failed_backfill_keeps_base_values() {
        let mock = Arc::new(MockTransport::new());
        mock.on_get(
            &format!("{S2}/paper/DOI:10.1/a"),
            200,
            r#"{"paperId": "p1", "externalIds": {"DOI": "10.9/z"}, "references": []}"#,
        );
        mock.on_get(&format!("{OA}/works/https://doi.org/10.9/z"), 500, "");
        let base = paper(Some("10.1/a"));
        let tmp = tempfile::tempdir().unwrap();
        let out = stage(&mock, tmp.path()).enrich_paper(&base);
        assert_eq!(mock.hits(&format!("{OA}/works/https://doi.org/10.9/z")), 1);
        assert_eq!(out.doi.as_deref(), Some("10.1/a"));
        assert_eq!(out.authors, base.authors);
        assert_eq!(out.referenced_works, None);
        assert_eq!(out.paper_id(), Some("p1"));
    }

    #[test]
    fn missing_base_document_fails_before_requests() {
        let mock = Arc::new(MockTransport::new());
        let tmp = tempfile::tempdir().unwrap();
        let cfg = RunConfig::new(vec!["icse".into()], 2020, 2020, 1);
        let err = stage(&mock, tmp.path()).run(&cfg).unwrap_err();
        let missing = err.downcast_ref::<confline_store::MissingStage>().unwrap();
        assert_eq!(missing.stage, StageName::Base);
        assert!(mock.requests().is_empty());
    }
}
