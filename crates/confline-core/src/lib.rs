//! Confline Core - Common infrastructure for the conference corpus pipeline
//!
//! This crate provides the pieces every enrichment stage shares: the
//! blocking HTTP transport, the rate-limited retry client, the year-range
//! partition runner, the corpus data model, logging and progress bars.

pub mod error;
pub mod http;
pub mod logging;
pub mod model;
pub mod partition;
pub mod progress;
pub mod retry;

#[cfg(any(test, feature = "testing"))]
pub mod mock;

// Re-exports for convenience
pub use error::TransportError;
pub use http::{
    HttpConfig, HttpRequest, HttpResponse, Method, ReqwestTransport, SHARED_RUNTIME,
    SharedTransport, Transport, http_client, set_http_config,
};
pub use logging::{IndicatifLogger, init_logging};
pub use model::{
    AuthorEntry, CitationMap, CitedPaperRecord, ConferenceYearIndex, ExtendedFields,
    InstitutionEntry, PaperRecord, SharedYearIndex, paper_count,
};
pub use partition::{partition, run_partitioned};
pub use progress::{ProgressContext, SharedProgress};
pub use retry::{ApiClient, Outcome, RetryPolicy};
