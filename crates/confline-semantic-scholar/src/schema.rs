//! Graph API JSON payloads

use serde::{Deserialize, Deserializer, Serialize};

// === Null-handling deserializers ===

/// Deserialize null as empty string
fn null_to_empty<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    Option::<String>::deserialize(deserializer).map(|opt| opt.unwrap_or_default())
}

/// Deserialize null as empty Vec
fn null_to_empty_vec<'de, D, T>(deserializer: D) -> Result<Vec<T>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    Option::<Vec<T>>::deserialize(deserializer).map(|opt| opt.unwrap_or_default())
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct S2Author {
    #[serde(rename = "authorId", default, skip_serializing_if = "Option::is_none")]
    pub author_id: Option<String>,
    #[serde(default, deserialize_with = "null_to_empty")]
    pub name: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ExternalIds {
    #[serde(rename = "DOI", default, skip_serializing_if = "Option::is_none")]
    pub doi: Option<String>,
}

/// `/paper/search` response
#[derive(Debug, Default, Deserialize)]
pub struct SearchResponse {
    #[serde(default, deserialize_with = "null_to_empty_vec")]
    pub data: Vec<SearchHit>,
}

/// One title search candidate (fields `title,authors`)
#[derive(Debug, Clone, Default, Deserialize)]
pub struct SearchHit {
    #[serde(rename = "paperId", default)]
    pub paper_id: Option<String>,
    #[serde(default, deserialize_with = "null_to_empty")]
    pub title: String,
    #[serde(default, deserialize_with = "null_to_empty_vec")]
    pub authors: Vec<S2Author>,
}

impl SearchHit {
    pub fn author_names(&self) -> Vec<&str> {
        self.authors.iter().map(|a| a.name.as_str()).collect()
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct Tldr {
    #[serde(default)]
    pub text: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Embedding {
    pub vector: EmbeddingVector,
}

/// Embedding vector, accepted as a JSON array or as a JSON-encoded string.
#[derive(Debug, Clone, PartialEq)]
pub struct EmbeddingVector(pub Vec<f32>);

impl<'de> Deserialize<'de> for EmbeddingVector {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        struct VecVisitor;

        impl<'de> serde::de::Visitor<'de> for VecVisitor {
            type Value = EmbeddingVector;

            fn expecting(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
                write!(f, "a JSON string or array of floats")
            }

            fn visit_str<E: serde::de::Error>(self, s: &str) -> Result<Self::Value, E> {
                serde_json::from_str::<Vec<f32>>(s)
                    .map(EmbeddingVector)
                    .map_err(serde::de::Error::custom)
            }

            fn visit_seq<A: serde::de::SeqAccess<'de>>(
                self,
                mut seq: A,
            ) -> Result<Self::Value, A::Error> {
                let mut v = Vec::with_capacity(seq.size_hint().unwrap_or(768));
                while let Some(val) = seq.next_element::<f32>()? {
                    v.push(val);
                }
                Ok(EmbeddingVector(v))
            }
        }

        deserializer.deserialize_any(VecVisitor)
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct Reference {
    #[serde(rename = "paperId", default)]
    pub paper_id: Option<String>,
}

/// `/paper/{id}` response with the detail fields
#[derive(Debug, Clone, Default, Deserialize)]
pub struct PaperDetails {
    #[serde(rename = "paperId", default, deserialize_with = "null_to_empty")]
    pub paper_id: String,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default, deserialize_with = "null_to_empty_vec")]
    pub authors: Vec<S2Author>,
    #[serde(rename = "abstract", default)]
    pub abstract_text: Option<String>,
    #[serde(default)]
    pub tldr: Option<Tldr>,
    #[serde(default)]
    pub embedding: Option<Embedding>,
    #[serde(default, deserialize_with = "null_to_empty_vec")]
    pub references: Vec<Reference>,
    #[serde(rename = "externalIds", default)]
    pub external_ids: Option<ExternalIds>,
}

impl PaperDetails {
    pub fn doi(&self) -> Option<&str> {
        self.external_ids.as_ref()?.doi.as_deref()
    }

    pub fn tldr_text(&self) -> Option<String> {
        self.tldr.as_ref()?.text.clone()
    }

    /// Paper IDs of the references, nulls dropped
    pub fn reference_ids(&self) -> Vec<String> {
        self.references
            .iter()
            .filter_map(|r| r.paper_id.clone())
            .collect()
    }

    pub fn embedding_vector(&self) -> Option<Vec<f32>> {
        self.embedding.as_ref().map(|e| e.vector.0.clone())
    }
}

/// One entry of a `/paper/batch` response; also persisted in the
/// intermediate batch document.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BatchPaper {
    #[serde(rename = "paperId", default)]
    pub paper_id: Option<String>,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub year: Option<i32>,
    #[serde(default)]
    pub venue: Option<String>,
    #[serde(rename = "externalIds", default)]
    pub external_ids: Option<ExternalIds>,
    #[serde(default, deserialize_with = "null_to_empty_vec")]
    pub authors: Vec<S2Author>,
}

impl BatchPaper {
    pub fn doi(&self) -> Option<&str> {
        self.external_ids.as_ref()?.doi.as_deref()
    }
}
