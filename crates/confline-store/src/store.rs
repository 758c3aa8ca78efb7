//! JSON document store keyed by (conference, stage)
//!
//! Directory layout:
//! ```text
//! {dir}/
//! ├── {conference}_basic_data.json        (or extended_data / citations_data)
//! └── intermediate_data_s2/
//!     └── {conference}_citations_s2.json
//! ```

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::Serialize;
use serde::de::DeserializeOwned;

use crate::stage::{MissingStage, StageName};

/// Subdirectory holding intermediate batch documents
const INTERMEDIATE_DIR: &str = "intermediate_data_s2";

/// One stage's document directory.
#[derive(Debug, Clone)]
pub struct DocumentStore {
    dir: PathBuf,
}

impl DocumentStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Path of the document for `conference` at `stage`
    pub fn path(&self, conference: &str, stage: StageName) -> PathBuf {
        let name = format!("{conference}_{}.json", stage.suffix());
        match stage {
            StageName::CitationBatches => self.dir.join(INTERMEDIATE_DIR).join(name),
            _ => self.dir.join(name),
        }
    }

    pub fn exists(&self, conference: &str, stage: StageName) -> bool {
        self.path(conference, stage).is_file()
    }

    /// Fail with [`MissingStage`] unless the document exists
    pub fn require(&self, conference: &str, stage: StageName) -> Result<(), MissingStage> {
        if self.exists(conference, stage) {
            Ok(())
        } else {
            Err(MissingStage {
                conference: conference.to_string(),
                stage,
            })
        }
    }

    /// Fail with [`MissingStage`] unless the document `stage` reads from exists
    pub fn require_input(&self, conference: &str, stage: StageName) -> Result<(), MissingStage> {
        match stage.prerequisite() {
            Some(input) => self.require(conference, input),
            None => Ok(()),
        }
    }

    /// Load a document; a missing file is a [`MissingStage`] error
    pub fn load<T: DeserializeOwned>(&self, conference: &str, stage: StageName) -> Result<T> {
        self.require(conference, stage)?;
        let path = self.path(conference, stage);
        let text = fs::read_to_string(&path)
            .with_context(|| format!("failed to read {}", path.display()))?;
        let value = serde_json::from_str(&text)
            .with_context(|| format!("failed to parse {}", path.display()))?;
        log::debug!("loaded {}", path.display());
        Ok(value)
    }

    /// Write a document atomically (tmp file + rename)
    pub fn save<T: Serialize>(&self, conference: &str, stage: StageName, value: &T) -> Result<PathBuf> {
        let path = self.path(conference, stage);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)
                .with_context(|| format!("failed to create {}", parent.display()))?;
        }
        let json = serde_json::to_string_pretty(value).context("failed to serialize document")?;
        let tmp = path.with_extension("json.tmp");
        fs::write(&tmp, json).with_context(|| format!("failed to write {}", tmp.display()))?;
        fs::rename(&tmp, &path)
            .with_context(|| format!("failed to rename {} -> {}", tmp.display(), path.display()))?;
        log::info!("saved {}", path.display());
        Ok(path)
    }
}
