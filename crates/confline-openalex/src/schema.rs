//! OpenAlex JSON payloads (only the fields the pipeline reads)

use serde::{Deserialize, Deserializer};

/// Deserialize null as empty Vec
fn null_to_empty_vec<'de, D, T>(deserializer: D) -> Result<Vec<T>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    Option::<Vec<T>>::deserialize(deserializer).map(|opt| opt.unwrap_or_default())
}

/// `/works/{id}` response
#[derive(Debug, Default, Deserialize)]
pub struct WorkRow {
    /// e.g. "https://openalex.org/W2741809807"
    #[serde(default)]
    pub id: String,
    /// Full DOI URL ("https://doi.org/10...")
    #[serde(default)]
    pub doi: Option<String>,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default, deserialize_with = "null_to_empty_vec")]
    pub authorships: Vec<Authorship>,
    /// Full work URLs
    #[serde(default, deserialize_with = "null_to_empty_vec")]
    pub referenced_works: Vec<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct Authorship {
    #[serde(default)]
    pub author: Option<Author>,
    #[serde(default, deserialize_with = "null_to_empty_vec")]
    pub institutions: Vec<Institution>,
}

#[derive(Debug, Default, Deserialize)]
pub struct Author {
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default)]
    pub display_name: Option<String>,
}

/// Institution as embedded in an authorship
#[derive(Debug, Default, Deserialize)]
pub struct Institution {
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default)]
    pub display_name: Option<String>,
    #[serde(default)]
    pub country_code: Option<String>,
}

/// `/institutions/{id}` response
#[derive(Debug, Default, Deserialize)]
pub struct InstitutionRow {
    #[serde(default)]
    pub id: String,
    #[serde(default)]
    pub display_name: Option<String>,
    #[serde(default)]
    pub country_code: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn nulls_become_empty() {
        let work: WorkRow = serde_json::from_str(
            r#"{"id": "https://openalex.org/W1", "doi": null, "authorships": null, "referenced_works": null}"#,
        )
        .unwrap();
        assert!(work.authorships.is_empty());
        assert!(work.referenced_works.is_empty());
        assert!(work.doi.is_none());
    }

    #[test]
    fn parses_authorship_institutions() {
        let work: WorkRow = serde_json::from_str(
            r#"{
                "id": "https://openalex.org/W1",
                "doi": "https://doi.org/10.1145/1",
                "title": "T",
                "authorships": [{
                    "author": {"id": "https://openalex.org/A1", "display_name": "Ada"},
                    "institutions": [{"id": "https://openalex.org/I1", "display_name": "MIT", "country_code": "US", "type": "education"}]
                }],
                "referenced_works": ["https://openalex.org/W2"],
                "cited_by_count": 12
            }"#,
        )
        .unwrap();
        let inst = &work.authorships[0].institutions[0];
        assert_eq!(inst.display_name.as_deref(), Some("MIT"));
        assert_eq!(inst.country_code.as_deref(), Some("US"));
        assert_eq!(
            work.authorships[0].author.as_ref().unwrap().display_name.as_deref(),
            Some("Ada")
        );
    }
}
