//! Stage names and the missing-prerequisite error

use std::fmt;

use serde::{Deserialize, Serialize};

/// Pipeline stage identifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StageName {
    Base,
    Extended,
    /// Intermediate raw batch responses of the citations stage
    CitationBatches,
    Citations,
}

impl StageName {
    /// Document name suffix: `{conference}_{suffix}.json`
    pub fn suffix(self) -> &'static str {
        match self {
            Self::Base => "basic_data",
            Self::Extended => "extended_data",
            Self::CitationBatches => "citations_s2",
            Self::Citations => "citations_data",
        }
    }

    /// Subcommand that produces this stage's documents
    pub fn command(self) -> &'static str {
        match self {
            Self::Base => "base",
            Self::Extended => "extended",
            Self::CitationBatches | Self::Citations => "citations",
        }
    }

    /// Stage whose output this stage reads
    pub fn prerequisite(self) -> Option<Self> {
        match self {
            Self::Base => None,
            Self::Extended => Some(Self::Base),
            Self::CitationBatches | Self::Citations => Some(Self::Extended),
        }
    }
}

impl fmt::Display for StageName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.command())
    }
}

/// A stage's input document does not exist.
///
/// This is the one fatal condition of the pipeline: it is raised before any
/// worker starts and the CLI maps it to a non-zero exit.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MissingStage {
    pub conference: String,
    pub stage: StageName,
}

impl fmt::Display for MissingStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "the {} data for the conference {} does not exist. Please run `confline {}` first.",
            self.stage,
            self.conference,
            self.stage.command()
        )
    }
}

impl std::error::Error for MissingStage {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn suffixes_match_document_names() {
        assert_eq!(StageName::Base.suffix(), "basic_data");
        assert_eq!(StageName::Extended.suffix(), "extended_data");
        assert_eq!(StageName::Citations.suffix(), "citations_data");
        assert_eq!(StageName::CitationBatches.suffix(), "citations_s2");
    }

    #[test]
    fn prerequisites_chain() {
        assert_eq!(StageName::Base.prerequisite(), None);
        assert_eq!(StageName::Extended.prerequisite(), Some(StageName::Base));
        assert_eq!(StageName::Citations.prerequisite(), Some(StageName::Extended));
    }

    #[test]
    fn missing_stage_names_remedy() {
        let err = MissingStage {
            conference: "icse".into(),
            stage: StageName::Base,
        };
        let msg = err.to_string();
        assert!(msg.contains("icse"));
        assert!(msg.contains("confline base"));
    }
}
