//! Corpus records shared by every stage.
//!
//! Field names on disk follow the established data files (`"DOI Number"`,
//! `"Authors and Institutions"`, ...), so documents written by earlier
//! crawls load unchanged.

use std::collections::BTreeMap;
use std::sync::Mutex;

use serde::{Deserialize, Deserializer, Serialize};

/// One institution affiliation of an author
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct InstitutionEntry {
    #[serde(rename = "Institution Name", default)]
    pub name: Option<String>,
    #[serde(rename = "Country", default)]
    pub country_code: Option<String>,
}

/// Author with optional affiliations (`None` = never resolved)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthorEntry {
    #[serde(rename = "Author")]
    pub name: String,
    #[serde(rename = "Institutions", default)]
    pub institutions: Option<Vec<InstitutionEntry>>,
}

impl AuthorEntry {
    /// Author known only by name
    pub fn unresolved(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            institutions: None,
        }
    }
}

/// A corpus paper, as produced by the base stage and enriched by the extended stage.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PaperRecord {
    #[serde(rename = "Title")]
    pub title: String,
    #[serde(rename = "Year")]
    pub year: String,
    #[serde(rename = "DOI Number", default)]
    pub doi: Option<String>,
    #[serde(rename = "OpenAlex Link", default)]
    pub openalex_link: Option<String>,
    #[serde(rename = "Authors and Institutions", default)]
    pub authors: Vec<AuthorEntry>,
    #[serde(rename = "OpenAlex Referenced Works", default)]
    pub referenced_works: Option<Vec<String>>,

    /// Present once the extended stage has run, even if nothing resolved
    #[serde(flatten, default, skip_serializing_if = "Option::is_none")]
    pub extended: Option<ExtendedFields>,
}

/// Semantic Scholar fields added by the extended stage
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ExtendedFields {
    #[serde(rename = "S2 Paper ID", default)]
    pub paper_id: Option<String>,
    #[serde(rename = "Citations S2", default, deserialize_with = "citation_ids")]
    pub citation_ids: Option<Vec<String>>,
    #[serde(rename = "Abstract", default)]
    pub abstract_text: Option<String>,
    #[serde(rename = "TLDR", default)]
    pub tldr: Option<String>,
    /// Kept in memory only
    #[serde(skip)]
    pub embedding: Option<Vec<f32>>,
}

/// Accepts plain IDs or `{"paperId": ...}` reference objects; null IDs are dropped
fn citation_ids<'de, D>(deserializer: D) -> Result<Option<Vec<String>>, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum CitationRef {
        Id(String),
        Object {
            #[serde(rename = "paperId", default)]
            paper_id: Option<String>,
        },
    }

    let refs = Option::<Vec<Option<CitationRef>>>::deserialize(deserializer)?;
    Ok(refs.map(|refs| {
        refs.into_iter()
            .flatten()
            .filter_map(|r| match r {
                CitationRef::Id(id) => Some(id),
                CitationRef::Object { paper_id } => paper_id,
            })
            .collect()
    }))
}

impl PaperRecord {
    /// Author names in order
    pub fn author_names(&self) -> Vec<&str> {
        self.authors.iter().map(|a| a.name.as_str()).collect()
    }

    pub fn paper_id(&self) -> Option<&str> {
        self.extended.as_ref()?.paper_id.as_deref()
    }

    /// Citation-graph IDs of the references, empty if never resolved
    pub fn citation_ids(&self) -> &[String] {
        self.extended
            .as_ref()
            .and_then(|e| e.citation_ids.as_deref())
            .unwrap_or_default()
    }
}

/// A paper cited by a corpus paper, in reduced shape
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CitedPaperRecord {
    #[serde(rename = "Title")]
    pub title: Option<String>,
    #[serde(rename = "Authors")]
    pub authors: Option<Vec<AuthorEntry>>,
    #[serde(rename = "Venue")]
    pub venue: Option<String>,
    #[serde(rename = "Year")]
    pub year: Option<String>,
}

/// year → papers of one conference for one stage
pub type ConferenceYearIndex = BTreeMap<String, Vec<PaperRecord>>;

/// citing paper title → papers it cites
pub type CitationMap = BTreeMap<String, Vec<CitedPaperRecord>>;

/// Year index shared by the workers of one stage pass.
///
/// All mutation goes through one coarse lock; the network call per record
/// dominates, not the insert.
#[derive(Debug, Default)]
pub struct SharedYearIndex {
    inner: Mutex<ConferenceYearIndex>,
}

impl SharedYearIndex {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append one paper under `year`, creating the key if needed
    pub fn push(&self, year: &str, paper: PaperRecord) {
        let mut index = self.inner.lock().expect("worker thread panicked");
        index.entry(year.to_string()).or_default().push(paper);
    }

    /// Replace the full paper list of `year`
    pub fn insert(&self, year: &str, papers: Vec<PaperRecord>) {
        let mut index = self.inner.lock().expect("worker thread panicked");
        index.insert(year.to_string(), papers);
    }

    pub fn into_inner(self) -> ConferenceYearIndex {
        self.inner.into_inner().expect("worker thread panicked")
    }
}

/// Number of papers across all years
pub fn paper_count(index: &ConferenceYearIndex) -> usize {
    index.values().map(Vec::len).sum()
}
