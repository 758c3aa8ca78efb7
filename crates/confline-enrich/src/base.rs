//! Base stage: dblp listings enriched with OpenAlex metadata

use std::time::Instant;

use anyhow::Result;
use confline_core::{
    AuthorEntry, ConferenceYearIndex, PaperRecord, SharedProgress, SharedYearIndex, paper_count,
    run_partitioned,
};
use confline_dblp::{DblpArticle, DblpClient, YearPage};
use confline_openalex::{InstitutionMode, OpenAlexClient};
use confline_store::{DocumentStore, StageName};

use crate::run::RunConfig;
use crate::stats::{ConferenceSummary, StageReport};

pub struct BaseStage {
    pub dblp: DblpClient,
    pub openalex: OpenAlexClient,
    /// Output directory
    pub store: DocumentStore,
    pub progress: SharedProgress,
}

impl BaseStage {
    /// Crawl every conference and write one `basic_data` document each
    pub fn run(&self, cfg: &RunConfig) -> Result<StageReport> {
        cfg.validate()?;
        let start = Instant::now();
        let mut report = StageReport::new(StageName::Base);
        let line = self.progress.stage_line("base");

        for conference in &cfg.conferences {
            line.set_message(conference.clone());
            log::info!("(base) crawling {conference} {}..={}", cfg.first_year, cfg.last_year);
            let conf_start = Instant::now();

            let index = self.crawl_conference(conference, cfg)?;
            self.store.save(conference, StageName::Base, &index)?;

            let summary = ConferenceSummary {
                conference: conference.clone(),
                years: index.len(),
                records: paper_count(&index),
                resolved: index
                    .values()
                    .flatten()
                    .filter(|p| p.openalex_link.is_some())
                    .count(),
                elapsed: conf_start.elapsed(),
            };
            summary.log(StageName::Base);
            report.conferences.push(summary);
        }

        line.finish_and_clear();
        report.elapsed = start.elapsed();
        Ok(report)
    }

    /// Year index of one conference.
    ///
    /// The index page is fetched once; each worker then handles the year
    /// pages of its own sub-range. Papers land under their reported year.
    pub fn crawl_conference(&self, conference: &str, cfg: &RunConfig) -> Result<ConferenceYearIndex> {
        let pages = self
            .dblp
            .year_pages(conference, cfg.first_year, cfg.last_year);
        if pages.is_empty() {
            log::warn!("(base) {conference}: no year pages in range");
        }

        let index = SharedYearIndex::new();
        run_partitioned(cfg.workers, cfg.first_year, cfg.last_year, |start, end| {
            let mine: Vec<&YearPage> = pages
                .iter()
                .filter(|p| (start..=end).contains(&p.year))
                .collect();
            let pb = self
                .progress
                .worker_bar(&format!("{conference} {start}-{end}"), mine.len() as u64);
            for page in mine {
                pb.set_message(page.year.to_string());
                for article in self.dblp.articles(page) {
                    let paper = self.paper_from_article(article);
                    let year = paper.year.clone();
                    index.push(&year, paper);
                }
                pb.inc(1);
            }
            pb.finish_and_clear();
        })?;
        Ok(index.into_inner())
    }

    /// Attach DOI, affiliations and references from the article's OpenAlex work.
    ///
    /// Without a link, or if the lookup fails, authors keep their dblp names
    /// with null institutions.
    pub fn paper_from_article(&self, article: DblpArticle) -> PaperRecord {
        let details = article
            .openalex_link
            .as_deref()
            .and_then(|link| self.openalex.work_by_link(link))
            .map(|work| self.openalex.resolve(&work, InstitutionMode::Lookup));

        let mut paper = PaperRecord {
            title: article.title,
            year: article.year,
            openalex_link: article.openalex_link,
            ..Default::default()
        };
        match details {
            Some(d) if !d.authors.is_empty() => {
                paper.doi = d.doi;
                paper.authors = d.authors;
                paper.referenced_works = d.referenced_works;
            }
            Some(d) => {
                paper.doi = d.doi;
                paper.referenced_works = d.referenced_works;
                paper.authors = unresolved_authors(article.authors);
            }
            None => paper.authors = unresolved_authors(article.authors),
        }
        paper
    }
}

fn unresolved_authors(names: Vec<String>) -> Vec<AuthorEntry> {
    names.into_iter().map(AuthorEntry::unresolved).collect()
}
