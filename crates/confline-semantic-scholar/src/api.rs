//! Semantic Scholar Graph API client

use confline_core::{ApiClient, HttpRequest, RetryPolicy, SharedTransport};

use crate::schema::{BatchPaper, PaperDetails, SearchHit, SearchResponse};

pub const DEFAULT_API_URL: &str = "https://api.semanticscholar.org/graph/v1";

/// Maximum IDs per `/paper/batch` request
pub const BATCH_LIMIT: usize = 500;

const DETAIL_FIELDS: &str = "paperId,title,authors,abstract,tldr,embedding,references,externalIds";
const SEARCH_FIELDS: &str = "title,authors";
const BATCH_FIELDS: &str = "title,year,venue,externalIds,authors.name";

/// Split IDs into request-sized chunks (all full except possibly the last)
pub fn batch_chunks(ids: &[String]) -> std::slice::Chunks<'_, String> {
    ids.chunks(BATCH_LIMIT)
}

#[derive(Debug, Clone)]
pub struct S2Client {
    api: ApiClient,
}

impl S2Client {
    /// `api_key` is sent as `x-api-key` on every request when present
    pub fn new(
        base_url: &str,
        transport: SharedTransport,
        policy: RetryPolicy,
        api_key: Option<&str>,
    ) -> Self {
        let mut api = ApiClient::new("semantic-scholar", base_url, transport, policy);
        if let Some(key) = api_key.filter(|k| !k.is_empty()) {
            api = api.with_header("x-api-key", key);
        }
        Self { api }
    }

    /// Full details for a DOI
    pub fn paper_by_doi(&self, doi: &str) -> Option<PaperDetails> {
        self.api
            .get_json(&format!("paper/DOI:{doi}"), &[("fields", DETAIL_FIELDS)], doi)
    }

    /// Full details for a paper ID
    pub fn paper_details(&self, paper_id: &str) -> Option<PaperDetails> {
        self.api
            .get_json(&format!("paper/{paper_id}"), &[("fields", DETAIL_FIELDS)], paper_id)
    }

    /// Top title-search candidate, if any
    pub fn search_title(&self, title: &str) -> Option<SearchHit> {
        let resp: SearchResponse = self.api.get_json(
            "paper/search",
            &[("query", title), ("limit", "1"), ("fields", SEARCH_FIELDS)],
            title,
        )?;
        let hit = resp.data.into_iter().next();
        if hit.is_none() {
            log::info!("semantic-scholar: no search results for {title}");
        }
        hit
    }

    /// Resolve up to [`BATCH_LIMIT`] IDs in one call.
    ///
    /// Entries are positional; unknown IDs come back as `None`. `item` names
    /// the citing paper in logs.
    pub fn batch(&self, ids: &[String], item: &str) -> Option<Vec<Option<BatchPaper>>> {
        debug_assert!(ids.len() <= BATCH_LIMIT);
        let req = HttpRequest::post_json(
            self.api.url("paper/batch"),
            serde_json::json!({ "ids": ids }),
        )
        .query("fields", BATCH_FIELDS);
        let resp = self.api.request(req, item).into_success()?;
        self.api.decode(&resp, item)
    }
}
