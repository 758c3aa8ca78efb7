//! confline-store: on-disk JSON documents exchanged between stages
//!
//! Each stage writes one document per conference and reads the previous
//! stage's document. A missing input document is reported as
//! [`MissingStage`], the pipeline's only fatal error.

pub mod stage;
pub mod store;

pub use stage::{MissingStage, StageName};
pub use store::DocumentStore;
