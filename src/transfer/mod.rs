//! Bookmark document formats: Netscape HTML (browser exports) and the flat JSON backup.

use clap::ValueEnum;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::importer::{self, IdGenerator, ImportOptions, ImportResult};

pub mod json;
pub mod netscape;

#[derive(Debug, Error)]
pub enum TransferError {
    #[error("document contains no bookmark list (<DL>)")]
    MissingBookmarkList,
    #[error("invalid bookmark JSON: {0}")]
    Json(#[from] serde_json::Error),
    #[error("duplicate id '{0}' in bookmark JSON")]
    DuplicateId(String),
    #[error("sub-category '{sub_category}' names parent '{found}' but is listed under '{expected}'")]
    ParentMismatch {
        sub_category: String,
        expected: String,
        found: String,
    },
    #[error("bookmark '{bookmark}' references unknown sub-category '{sub_category}'")]
    UnknownSubCategory {
        bookmark: String,
        sub_category: String,
    },
}

/// Input format for `import`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "kebab-case")]
pub enum DocumentFormat {
    #[default]
    Auto,
    Html,
    Json,
}

/// Output format for `export`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "kebab-case")]
pub enum ExportFormat {
    #[default]
    Html,
    Json,
}

impl ExportFormat {
    pub fn as_str(self) -> &'static str {
        match self {
            ExportFormat::Html => "html",
            ExportFormat::Json => "json",
        }
    }
}

impl DocumentFormat {
    pub fn as_str(self) -> &'static str {
        match self {
            DocumentFormat::Auto => "auto",
            DocumentFormat::Html => "html",
            DocumentFormat::Json => "json",
        }
    }

    /// Resolves `Auto` by looking at the first meaningful character.
    pub fn detect(self, source: &str) -> DocumentFormat {
        match self {
            DocumentFormat::Auto => {
                let body = source.trim_start_matches('\u{feff}').trim_start();
                if body.starts_with('{') {
                    DocumentFormat::Json
                } else {
                    DocumentFormat::Html
                }
            }
            other => other,
        }
    }
}

/// Reads a document in any supported format into an import result.
pub fn load(
    source: &str,
    format: DocumentFormat,
    ids: &mut dyn IdGenerator,
    options: &ImportOptions,
) -> Result<ImportResult, TransferError> {
    match format.detect(source) {
        DocumentFormat::Json => json::parse(source),
        _ => {
            let root = netscape::parse_document(source)?;
            tracing::debug!(
                entries = root.children.len(),
                links = root.link_count(),
                "parsed bookmark document"
            );
            Ok(importer::import(&root, ids, options))
        }
    }
}
