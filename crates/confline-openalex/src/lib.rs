//! confline-openalex - OpenAlex REST client
//!
//! Resolves works (by OpenAlex link or DOI) into DOI, author affiliations
//! and referenced works. One client is shared by all three stages.

pub mod api;
pub mod schema;

pub use api::{InstitutionMode, OpenAlexClient, WorkDetails, short_id, strip_doi_prefix};
pub use schema::{Authorship, InstitutionRow, WorkRow};
