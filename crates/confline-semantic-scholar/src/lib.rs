//! confline-semantic-scholar - Semantic Scholar Graph API client
//!
//! Single-paper lookup by DOI or ID, top-1 title search, and the batch
//! endpoint used to resolve cited papers.

pub mod api;
pub mod schema;

pub use api::{BATCH_LIMIT, S2Client, batch_chunks};
pub use schema::{BatchPaper, ExternalIds, PaperDetails, S2Author, SearchHit};
