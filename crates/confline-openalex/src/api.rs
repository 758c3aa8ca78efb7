//! OpenAlex work and institution lookups

use confline_core::{ApiClient, AuthorEntry, InstitutionEntry, RetryPolicy, SharedTransport};

use crate::schema::{InstitutionRow, WorkRow};

pub const DEFAULT_API_URL: &str = "https://api.openalex.org";

const DOI_PREFIX: &str = "https://doi.org/";

/// Last path segment of an OpenAlex URL ("https://openalex.org/W12" → "W12")
pub fn short_id(id: &str) -> &str {
    id.trim_end_matches('/').rsplit('/').next().unwrap_or(id)
}

/// "https://doi.org/10.1/x" → "10.1/x"; bare DOIs pass through
pub fn strip_doi_prefix(doi: &str) -> String {
    doi.strip_prefix(DOI_PREFIX).unwrap_or(doi).to_string()
}

/// How author affiliations are filled in
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InstitutionMode {
    /// One `/institutions/{id}` call per affiliation (base stage)
    Lookup,
    /// Name and country embedded in the work (citations stage)
    Inline,
}

/// Fields the pipeline takes from a work
#[derive(Debug, Clone, Default, PartialEq)]
pub struct WorkDetails {
    pub doi: Option<String>,
    pub authors: Vec<AuthorEntry>,
    /// Short work IDs; `None` when the work lists none
    pub referenced_works: Option<Vec<String>>,
}

/// OpenAlex REST client
#[derive(Debug, Clone)]
pub struct OpenAlexClient {
    api: ApiClient,
}

impl OpenAlexClient {
    pub fn new(base_url: &str, transport: SharedTransport, policy: RetryPolicy) -> Self {
        Self {
            api: ApiClient::new("openalex", base_url, transport, policy),
        }
    }

    /// Fetch the work behind a dblp OpenAlex link
    pub fn work_by_link(&self, link: &str) -> Option<WorkRow> {
        let id = short_id(link);
        if id.is_empty() {
            log::error!("openalex: cannot extract a work ID from {link}");
            return None;
        }
        self.api.get_json(&format!("works/{id}"), &[], link)
    }

    /// Fetch a work by bare DOI
    pub fn work_by_doi(&self, doi: &str) -> Option<WorkRow> {
        let doi = strip_doi_prefix(doi);
        self.api
            .get_json(&format!("works/{DOI_PREFIX}{doi}"), &[], &doi)
    }

    /// Dereference one institution; a failed lookup yields an entry with null fields
    pub fn institution(&self, id: &str) -> InstitutionEntry {
        let short = short_id(id);
        match self
            .api
            .get_json::<InstitutionRow>(&format!("institutions/{short}"), &[], id)
        {
            Some(row) => InstitutionEntry {
                name: row.display_name,
                country_code: row.country_code,
            },
            None => InstitutionEntry::default(),
        }
    }

    /// Flatten a work into DOI, authors with affiliations and referenced works.
    ///
    /// Authorships without a display name are skipped.
    pub fn resolve(&self, work: &WorkRow, mode: InstitutionMode) -> WorkDetails {
        let authors = work
            .authorships
            .iter()
            .filter_map(|authorship| {
                let name = authorship.author.as_ref()?.display_name.clone()?;
                let institutions = authorship
                    .institutions
                    .iter()
                    .map(|inst| match (mode, inst.id.as_deref()) {
                        (InstitutionMode::Lookup, Some(id)) => self.institution(id),
                        _ => InstitutionEntry {
                            name: inst.display_name.clone(),
                            country_code: inst.country_code.clone(),
                        },
                    })
                    .collect::<Vec<_>>();
                // inline mode reports "no affiliation" as null
                let institutions = match mode {
                    InstitutionMode::Inline if institutions.is_empty() => None,
                    _ => Some(institutions),
                };
                Some(AuthorEntry { name, institutions })
            })
            .collect();

        let referenced: Vec<String> = work
            .referenced_works
            .iter()
            .map(|w| short_id(w).to_string())
            .collect();

        WorkDetails {
            doi: work.doi.as_deref().map(strip_doi_prefix),
            authors,
            referenced_works: (!referenced.is_empty()).then_some(referenced),
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use confline_core::mock::MockTransport;

    use super::*;

    const API: &str = "https://api.openalex.org";

    const WORK: &str = r#"{
        "id": "https://openalex.org/W100",
        "doi": "https://doi.org/10.1145/3368089",
        "authorships": [
            {"author": {"display_name": "Ada Lovelace"},
             "institutions": [{"id": "https://openalex.org/I1", "display_name": "Inline U", "country_code": "GB"}]},
            {"author": {"display_name": "Alan Turing"}, "institutions": []},
            {"author": null, "institutions": []}
        ],
        "referenced_works": ["https://openalex.org/W7", "https://openalex.org/W8"]
    }"#;

    fn client(mock: &Arc<MockTransport>) -> OpenAlexClient {
        OpenAlexClient::new(API, mock.clone(), RetryPolicy::immediate(0))
    }

    #[test]
    fn id_helpers() {
        assert_eq!(short_id("https://openalex.org/W2741809807"), "W2741809807");
        assert_eq!(short_id("W1"), "W1");
        assert_eq!(strip_doi_prefix("https://doi.org/10.1/x"), "10.1/x");
        assert_eq!(strip_doi_prefix("10.1/x"), "10.1/x");
    }

    #[test]
    fn link_lookup_uses_short_id() {
        let mock = Arc::new(MockTransport::new());
        mock.on_get(&format!("{API}/works/W100"), 200, WORK);
        let work = client(&mock)
            .work_by_link("https://openalex.org/W100")
            .unwrap();
        assert_eq!(work.authorships.len(), 3);
    }

    #[test]
    fn doi_lookup_path() {
        let mock = Arc::new(MockTransport::new());
        mock.on_get(
            &format!("{API}/works/https://doi.org/10.1145/3368089"),
            200,
            WORK,
        );
        assert!(client(&mock).work_by_doi("10.1145/3368089").is_some());
        assert!(client(&mock).work_by_doi("https://doi.org/10.1145/3368089").is_some());
    }

    #[test]
    fn resolve_with_lookup_dereferences_institutions() {
        let mock = Arc::new(MockTransport::new());
        mock.on_get(
            &format!("{API}/institutions/I1"),
            200,
            r#"{"id": "https://openalex.org/I1", "display_name": "University of London", "country_code": "GB"}"#,
        );
        let oa = client(&mock);
        let work: WorkRow = serde_json::from_str(WORK).unwrap();
        let details = oa.resolve(&work, InstitutionMode::Lookup);

        assert_eq!(details.doi.as_deref(), Some("10.1145/3368089"));
        assert_eq!(details.authors.len(), 2);
        let inst = &details.authors[0].institutions.as_ref().unwrap()[0];
        assert_eq!(inst.name.as_deref(), Some("University of London"));
        assert_eq!(details.authors[1].institutions, Some(vec![]));
        assert_eq!(
            details.referenced_works,
            Some(vec!["W7".to_string(), "W8".to_string()])
        );
        assert_eq!(mock.hits(&format!("{API}/institutions/I1")), 1);
    }

    #[test]
    fn resolve_inline_makes_no_calls() {
        let mock = Arc::new(MockTransport::new());
        let work: WorkRow = serde_json::from_str(WORK).unwrap();
        let details = client(&mock).resolve(&work, InstitutionMode::Inline);
        let inst = &details.authors[0].institutions.as_ref().unwrap()[0];
        assert_eq!(inst.name.as_deref(), Some("Inline U"));
        assert!(details.authors[1].institutions.is_none());
        assert!(mock.requests().is_empty());
    }

    #[test]
    fn failed_institution_lookup_is_null_entry() {
        let mock = Arc::new(MockTransport::new());
        mock.on_get(&format!("{API}/institutions/I1"), 500, "");
        let entry = client(&mock).institution("https://openalex.org/I1");
        assert_eq!(entry, InstitutionEntry::default());
    }

    #[test]
    fn empty_references_are_null() {
        let work = WorkRow::default();
        let mock = Arc::new(MockTransport::new());
        let details = client(&mock).resolve(&work, InstitutionMode::Inline);
        assert!(details.referenced_works.is_none());
        assert!(details.doi.is_none());
    }
}
