//! Flat JSON backups: `categories` with nested `subCategories`, plus a parallel
//! `bookmarks` array pointing at sub-category ids. Already two-level, so reading one is
//! validation only.

use std::collections::HashSet;

use serde::{Deserialize, Serialize};
use serde_with::skip_serializing_none;
use time::format_description::well_known::Rfc3339;
use time::OffsetDateTime;

use super::TransferError;
use crate::importer::ImportResult;
use crate::library::Library;
use crate::model::{Bookmark, Category};

const FORMAT_VERSION: u32 = 1;

#[skip_serializing_none]
#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct JsonDocument {
    #[serde(default)]
    version: Option<u32>,
    #[serde(default)]
    exported_at: Option<String>,
    #[serde(default)]
    categories: Vec<Category>,
    #[serde(default)]
    bookmarks: Vec<Bookmark>,
}

pub fn parse(source: &str) -> Result<ImportResult, TransferError> {
    let document: JsonDocument = serde_json::from_str(source.trim_start_matches('\u{feff}'))?;
    if let Some(version) = document.version.filter(|version| *version > FORMAT_VERSION) {
        tracing::warn!(version, "bookmark JSON is newer than this build understands");
    }
    validate(&document.categories, &document.bookmarks)?;
    Ok(ImportResult {
        categories: document.categories,
        bookmarks: document.bookmarks,
    })
}

fn validate(categories: &[Category], bookmarks: &[Bookmark]) -> Result<(), TransferError> {
    let mut seen = HashSet::new();
    let mut sub_ids = HashSet::new();
    for category in categories {
        if !seen.insert(category.id.as_str()) {
            return Err(TransferError::DuplicateId(category.id.clone()));
        }
        for sub in &category.sub_categories {
            if sub.parent_id != category.id {
                return Err(TransferError::ParentMismatch {
                    sub_category: sub.id.clone(),
                    expected: category.id.clone(),
                    found: sub.parent_id.clone(),
                });
            }
            if !seen.insert(sub.id.as_str()) {
                return Err(TransferError::DuplicateId(sub.id.clone()));
            }
            sub_ids.insert(sub.id.as_str());
        }
    }
    for bookmark in bookmarks {
        if !seen.insert(bookmark.id.as_str()) {
            return Err(TransferError::DuplicateId(bookmark.id.clone()));
        }
        if !sub_ids.contains(bookmark.sub_category_id.as_str()) {
            return Err(TransferError::UnknownSubCategory {
                bookmark: bookmark.id.clone(),
                sub_category: bookmark.sub_category_id.clone(),
            });
        }
    }
    Ok(())
}

pub fn render(library: &Library) -> Result<String, TransferError> {
    let document = JsonDocument {
        version: Some(FORMAT_VERSION),
        exported_at: OffsetDateTime::now_utc().format(&Rfc3339).ok(),
        categories: library.categories.clone(),
        bookmarks: library.bookmarks.clone(),
    };
    let mut json = serde_json::to_string_pretty(&document)?;
    json.push('\n');
    Ok(json)
}
