//! Citations stage: resolve every paper cited by the corpus
//!
//! Runs in two passes. The batch pass collects each citing paper's
//! reference IDs and resolves them through `/paper/batch`; its raw output is
//! persisted as the intermediate `citations_s2` document. The resolve pass
//! then turns every batch entry into a reduced cited-paper record, reusing
//! corpus data through the [`IdCache`] where possible.

use std::collections::BTreeMap;
use std::sync::Mutex;
use std::time::Instant;

use anyhow::Result;
use confline_core::{
    AuthorEntry, CitationMap, CitedPaperRecord, ConferenceYearIndex, SharedProgress,
    run_partitioned,
};
use confline_openalex::{InstitutionMode, OpenAlexClient};
use confline_semantic_scholar::{BatchPaper, S2Client, batch_chunks};
use confline_store::{DocumentStore, StageName};
use serde::{Deserialize, Serialize};

use crate::cache::IdCache;
use crate::run::{RunConfig, Throttle};
use crate::stats::{ConferenceSummary, StageReport};

/// Batch responses for one citing paper (intermediate document entry)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BatchResult {
    #[serde(rename = "Title")]
    pub title: String,
    #[serde(rename = "Response")]
    pub responses: Vec<BatchPaper>,
}

pub struct CitationsStage {
    pub s2: S2Client,
    pub openalex: OpenAlexClient,
    /// Extended stage documents
    pub input: DocumentStore,
    /// Output directory (final and intermediate documents)
    pub store: DocumentStore,
    pub throttle: Throttle,
    pub progress: SharedProgress,
    /// Load an existing intermediate document instead of calling `/paper/batch`
    pub reuse_batches: bool,
}

impl CitationsStage {
    pub fn run(&self, cfg: &RunConfig) -> Result<StageReport> {
        cfg.validate()?;
        for conference in &cfg.conferences {
            self.input.require_input(conference, StageName::Citations)?;
        }

        let start = Instant::now();
        let cache = IdCache::build(&self.input, &cfg.conferences)?;
        if cache.is_empty() {
            log::warn!("(citations) no resolved corpus papers; every cited paper goes to OpenAlex");
        }
        let mut report = StageReport::new(StageName::Citations);
        let line = self.progress.stage_line("citations");

        for conference in &cfg.conferences {
            line.set_message(conference.clone());
            let conf_start = Instant::now();
            let extended: ConferenceYearIndex =
                self.input.load(conference, StageName::Extended)?;

            let batches = self.batches(conference, &extended, cfg)?;
            let citations = self.resolve_batches(conference, &batches, &cache, cfg)?;
            self.store.save(conference, StageName::Citations, &citations)?;

            let summary = ConferenceSummary {
                conference: conference.clone(),
                years: extended.len(),
                records: batches.len(),
                resolved: citations.len(),
                elapsed: conf_start.elapsed(),
            };
            summary.log(StageName::Citations);
            report.conferences.push(summary);
        }

        line.finish_and_clear();
        report.elapsed = start.elapsed();
        Ok(report)
    }

    /// Batch pass, or the persisted intermediate document with `reuse_batches`
    pub fn batches(
        &self,
        conference: &str,
        extended: &ConferenceYearIndex,
        cfg: &RunConfig,
    ) -> Result<Vec<BatchResult>> {
        if self.reuse_batches && self.store.exists(conference, StageName::CitationBatches) {
            log::info!(
                "(citations) {conference}: reusing intermediate batch document in {}",
                self.store.dir().display()
            );
            return self.store.load(conference, StageName::CitationBatches);
        }

        let citing = collect_citation_ids(extended, cfg)?;
        log::info!(
            "(citations) {conference}: {} citing papers, {} cited IDs",
            citing.len(),
            citing.iter().map(|(_, ids)| ids.len()).sum::<usize>()
        );
        let batches = self.fetch_batches(conference, &citing, cfg.batch_workers)?;
        self.store
            .save(conference, StageName::CitationBatches, &batches)?;
        Ok(batches)
    }

    /// POST each citing paper's IDs in chunks of at most 500.
    ///
    /// Output keeps the order of `citing`.
    pub fn fetch_batches(
        &self,
        conference: &str,
        citing: &[(String, Vec<String>)],
        workers: usize,
    ) -> Result<Vec<BatchResult>> {
        let results: Mutex<Vec<(usize, BatchResult)>> = Mutex::new(Vec::new());
        run_partitioned(workers, 0, citing.len() as i64 - 1, |start, end| {
            let pb = self.progress.worker_bar(
                &format!("{conference} batch {start}-{end}"),
                (end - start + 1) as u64,
            );
            for i in start..=end {
                let (title, ids) = &citing[i as usize];
                let mut responses = Vec::new();
                for chunk in batch_chunks(ids) {
                    if let Some(papers) = self.s2.batch(chunk, title) {
                        responses.extend(papers.into_iter().flatten());
                    }
                    Throttle::pause(self.throttle.s2_batch);
                }
                let result = BatchResult {
                    title: title.clone(),
                    responses,
                };
                results
                    .lock()
                    .expect("worker thread panicked")
                    .push((i as usize, result));
                pb.inc(1);
            }
            pb.finish_and_clear();
        })?;

        let mut results = results.into_inner().expect("worker thread panicked");
        results.sort_by_key(|(i, _)| *i);
        Ok(results.into_iter().map(|(_, r)| r).collect())
    }

    /// Resolve pass over the batch results, partitioned by index
    pub fn resolve_batches(
        &self,
        conference: &str,
        batches: &[BatchResult],
        cache: &IdCache,
        cfg: &RunConfig,
    ) -> Result<CitationMap> {
        let citations: Mutex<CitationMap> = Mutex::new(CitationMap::new());
        run_partitioned(cfg.workers, 0, batches.len() as i64 - 1, |start, end| {
            let mine = &batches[start as usize..=end as usize];
            let total = mine.iter().map(|b| b.responses.len() as u64).sum();
            let pb = self
                .progress
                .worker_bar(&format!("{conference} cited {start}-{end}"), total);
            for batch in mine {
                if batch.responses.is_empty() {
                    continue;
                }
                let cited: Vec<CitedPaperRecord> = batch
                    .responses
                    .iter()
                    .map(|paper| {
                        let record = self.resolve_cited(paper, cache);
                        pb.inc(1);
                        record
                    })
                    .collect();
                citations
                    .lock()
                    .expect("worker thread panicked")
                    .entry(batch.title.clone())
                    .or_default()
                    .extend(cited);
            }
            pb.finish_and_clear();
        })?;
        Ok(citations.into_inner().expect("worker thread panicked"))
    }

    /// Corpus data when the paper is cached, else OpenAlex by DOI, else the
    /// batch entry's own author names
    pub fn resolve_cited(&self, cited: &BatchPaper, cache: &IdCache) -> CitedPaperRecord {
        if let Some(hit) = cited.paper_id.as_deref().and_then(|id| cache.get(id)) {
            return CitedPaperRecord {
                title: cited.title.clone(),
                authors: Some(hit.paper.authors.clone()),
                venue: Some(hit.conference.clone()),
                year: Some(hit.paper.year.clone()),
            };
        }

        let from_openalex = cited
            .doi()
            .and_then(|doi| {
                let work = self.openalex.work_by_doi(doi);
                Throttle::pause(self.throttle.cited_paper);
                work
            })
            .map(|work| self.openalex.resolve(&work, InstitutionMode::Inline).authors)
            .filter(|authors| !authors.is_empty());
        let authors = from_openalex.unwrap_or_else(|| {
            cited
                .authors
                .iter()
                .map(|a| AuthorEntry::unresolved(a.name.clone()))
                .collect()
        });

        CitedPaperRecord {
            title: cited.title.clone(),
            authors: Some(authors),
            venue: cited.venue.clone(),
            year: cited.year.map(|y| y.to_string()),
        }
    }
}

/// Citing title → reference IDs for the years in range, in year order.
///
/// Papers without references are left out.
pub fn collect_citation_ids(
    extended: &ConferenceYearIndex,
    cfg: &RunConfig,
) -> Result<Vec<(String, Vec<String>)>> {
    let by_year: Mutex<BTreeMap<i64, Vec<(String, Vec<String>)>>> = Mutex::new(BTreeMap::new());
    run_partitioned(cfg.workers, cfg.first_year, cfg.last_year, |start, end| {
        for year in start..=end {
            let Some(papers) = extended.get(&year.to_string()) else {
                continue;
            };
            let citing: Vec<_> = papers
                .iter()
                .filter(|p| !p.citation_ids().is_empty())
                .map(|p| (p.title.clone(), p.citation_ids().to_vec()))
                .collect();
            by_year
                .lock()
                .expect("worker thread panicked")
                .insert(year, citing);
        }
    })?;
    Ok(by_year
        .into_inner()
        .expect("worker thread panicked")
        .into_values()
        .flatten()
        .collect())
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use confline_core::mock::MockTransport;
    use confline_core::{ExtendedFields, PaperRecord, ProgressContext, RetryPolicy};
    use confline_semantic_scholar::{ExternalIds, S2Author};

    use super::*;

    const S2: &str = "https://api.semanticscholar.org/graph/v1";
    const OA: &str = "https://api.openalex.org";

    fn stage(mock: &Arc<MockTransport>, dir: &std::path::Path) -> CitationsStage {
        CitationsStage {
            s2: S2Client::new(S2, mock.clone(), RetryPolicy::immediate(0), None),
            openalex: OpenAlexClient::new(OA, mock.clone(), RetryPolicy::immediate(0)),
            input: DocumentStore::new(dir.join("extended")),
            store: DocumentStore::new(dir.join("citations")),
            throttle: Throttle::none(),
            progress: Arc::new(ProgressContext::hidden()),
            reuse_batches: false,
        }
    }

    fn citing(title: &str, year: &str, refs: Option<Vec<&str>>) -> PaperRecord {
        PaperRecord {
            title: title.into(),
            year: year.into(),
            extended: Some(ExtendedFields {
                paper_id: Some(format!("id-{title}")),
                citation_ids: refs.map(|r| r.into_iter().map(str::to_string).collect()),
                ..Default::default()
            }),
            ..Default::default()
        }
    }

    fn batch_paper(id: &str, doi: Option<&str>) -> BatchPaper {
        BatchPaper {
            paper_id: Some(id.into()),
            title: Some(format!("Cited {id}")),
            year: Some(2017),
            venue: Some("OSDI".into()),
            external_ids: doi.map(|d| ExternalIds {
                doi: Some(d.into()),
            }),
            authors: vec![S2Author {
                author_id: None,
                name: "Grace Hopper".into(),
            }],
        }
    }

    #[test]
    fn collects_in_year_order_skipping_empty() {
        let mut index = ConferenceYearIndex::new();
        index.insert("2021".into(), vec![citing("B", "2021", Some(vec!["r2"]))]);
        index.insert(
            "2020".into(),
            vec![
                citing("A", "2020", Some(vec!["r1", "r3"])),
                citing("Empty", "2020", Some(vec![])),
                citing("Null", "2020", None),
            ],
        );
        index.insert("2019".into(), vec![citing("Out", "2019", Some(vec!["r9"]))]);

        let mut cfg = RunConfig::new(vec!["icse".into()], 2020, 2021, 2);
        let collected = collect_citation_ids(&index, &cfg).unwrap();
        assert_eq!(
            collected,
            vec![
                ("A".to_string(), vec!["r1".to_string(), "r3".to_string()]),
                ("B".to_string(), vec!["r2".to_string()]),
            ]
        );

        cfg.workers = 1;
        assert_eq!(collect_citation_ids(&index, &cfg).unwrap(), collected);
    }

    #[test]
    fn batch_drops_null_entries() {
        let mock = Arc::new(MockTransport::new());
        mock.on_post(
            &format!("{S2}/paper/batch"),
            200,
            r#"[{"paperId": "r1", "title": "One", "authors": []}, null]"#,
        );
        let tmp = tempfile::tempdir().unwrap();
        let citing = vec![("A".to_string(), vec!["r1".to_string(), "bogus".to_string()])];
        let batches = stage(&mock, tmp.path())
            .fetch_batches("icse", &citing, 1)
            .unwrap();
        assert_eq!(batches.len(), 1);
        assert_eq!(batches[0].title, "A");
        assert_eq!(batches[0].responses.len(), 1);
    }

    #[test]
    fn cache_hit_makes_no_call() {
        let mock = Arc::new(MockTransport::new());
        let mut cache = IdCache::default();
        let mut index = ConferenceYearIndex::new();
        let mut corpus = citing("Corpus Paper", "2019", None);
        corpus.extended.as_mut().unwrap().paper_id = Some("r1".into());
        corpus.authors = vec![AuthorEntry::unresolved("Ada Lovelace")];
        index.insert("2019".into(), vec![corpus]);
        cache.add("fse", index);

        let tmp = tempfile::tempdir().unwrap();
        let record = stage(&mock, tmp.path()).resolve_cited(&batch_paper("r1", Some("10.1/x")), &cache);
        assert_eq!(record.venue.as_deref(), Some("fse"));
        assert_eq!(record.year.as_deref(), Some("2019"));
        assert_eq!(record.authors.unwrap()[0].name, "Ada Lovelace");
        assert!(mock.requests().is_empty());
    }

    #[test]
    fn doi_resolves_through_openalex_inline() {
        let mock = Arc::new(MockTransport::new());
        mock.on_get(
            &format!("{OA}/works/https://doi.org/10.1/x"),
            200,
            r#"{"authorships": [{"author": {"display_name": "G. Hopper"},
                 "institutions": [{"id": "https://openalex.org/I5", "display_name": "Yale", "country_code": "US"}]}]}"#,
        );
        let tmp = tempfile::tempdir().unwrap();
        let record = stage(&mock, tmp.path())
            .resolve_cited(&batch_paper("r1", Some("10.1/x")), &IdCache::default());
        let authors = record.authors.unwrap();
        assert_eq!(authors[0].name, "G. Hopper");
        let inst = &authors[0].institutions.as_ref().unwrap()[0];
        assert_eq!(inst.name.as_deref(), Some("Yale"));
        assert_eq!(record.venue.as_deref(), Some("OSDI"));
        assert_eq!(record.year.as_deref(), Some("2017"));
        assert_eq!(mock.hits_prefix(&format!("{OA}/institutions")), 0);
    }

    #[test]
    fn falls_back_to_batch_names() {
        let mock = Arc::new(MockTransport::new());
        let tmp = tempfile::tempdir().unwrap();
        let st = stage(&mock, tmp.path());

        let record = st.resolve_cited(&batch_paper("r1", None), &IdCache::default());
        let authors = record.authors.unwrap();
        assert_eq!(authors[0].name, "Grace Hopper");
        assert!(authors[0].institutions.is_none());
        assert!(mock.requests().is_empty());

        // unregistered DOI lookup 404s
        let record = st.resolve_cited(&batch_paper("r2", Some("10.9/none")), &IdCache::default());
        assert_eq!(record.authors.unwrap()[0].name, "Grace Hopper");
    }

    #[test]
    fn no_pause_without_openalex_request() {
        let mock = Arc::new(MockTransport::new());
        let tmp = tempfile::tempdir().unwrap();
        let mut st = stage(&mock, tmp.path());
        let pause = std::time::Duration::from_millis(300);
        st.throttle.cited_paper = pause;

        let started = Instant::now();
        st.resolve_cited(&batch_paper("r1", None), &IdCache::default());
        assert!(started.elapsed() < pause);
        assert!(mock.requests().is_empty());

        let started = Instant::now();
        st.resolve_cited(&batch_paper("r2", Some("10.9/none")), &IdCache::default());
        assert!(started.elapsed() >= pause);
        assert_eq!(mock.hits_prefix(OA), 1);
    }

    #[test]
    fn empty_responses_are_omitted() {
        let mock = Arc::new(MockTransport::new());
        let tmp = tempfile::tempdir().unwrap();
        let batches = vec![
            BatchResult {
                title: "A".into(),
                responses: vec![batch_paper("r1", None)],
            },
            BatchResult {
                title: "B".into(),
                responses: vec![],
            },
        ];
        let cfg = RunConfig::new(vec!["icse".into()], 2020, 2020, 2);
        let map = stage(&mock, tmp.path())
            .resolve_batches("icse", &batches, &IdCache::default(), &cfg)
            .unwrap();
        assert_eq!(map.keys().collect::<Vec<_>>(), vec!["A"]);
        assert_eq!(map["A"].len(), 1);
    }

    #[test]
    fn reuses_intermediate_document() {
        let mock = Arc::new(MockTransport::new());
        let tmp = tempfile::tempdir().unwrap();
        let mut st = stage(&mock, tmp.path());
        st.reuse_batches = true;
        let saved = vec![BatchResult {
            title: "A".into(),
            responses: vec![batch_paper("r1", None)],
        }];
        st.store
            .save("icse", StageName::CitationBatches, &saved)
            .unwrap();

        let mut index = ConferenceYearIndex::new();
        index.insert("2020".into(), vec![citing("A", "2020", Some(vec!["r1"]))]);
        let cfg = RunConfig::new(vec!["icse".into()], 2020, 2020, 1);
        assert_eq!(st.batches("icse", &index, &cfg).unwrap(), saved);
        assert!(mock.requests().is_empty());
    }
}
