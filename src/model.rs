use std::fmt::Write as _;

use serde::{Deserialize, Serialize};
use serde_with::skip_serializing_none;

/// First level of the hierarchy.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Category {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub sub_categories: Vec<SubCategory>,
}

impl Category {
    pub fn new(id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            sub_categories: Vec::new(),
        }
    }

    pub fn sub_category(&self, id: &str) -> Option<&SubCategory> {
        self.sub_categories.iter().find(|sub| sub.id == id)
    }

    pub fn sub_category_named(&self, name: &str) -> Option<&SubCategory> {
        self.sub_categories.iter().find(|sub| sub.name == name)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubCategory {
    pub id: String,
    pub name: String,
    pub parent_id: String,
}

/// A saved link. The optional fields carry whatever the source document or a later
/// metadata pass provided; an import only ever fills them from the document itself.
#[skip_serializing_none]
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Bookmark {
    pub id: String,
    pub title: String,
    pub url: String,
    pub sub_category_id: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub icon: Option<String>,
    #[serde(default)]
    pub created_at: Option<i64>,
}

impl Bookmark {
    pub fn new(
        id: impl Into<String>,
        title: impl Into<String>,
        url: impl Into<String>,
        sub_category_id: impl Into<String>,
    ) -> Self {
        Self {
            id: id.into(),
            title: title.into(),
            url: url.into(),
            sub_category_id: sub_category_id.into(),
            description: None,
            icon: None,
            created_at: None,
        }
    }

    /// Host portion of the URL, lowercased. Empty when the URL has no scheme.
    pub fn host(&self) -> String {
        let rest = match self.url.split_once("://") {
            Some((_, rest)) => rest,
            None => return String::new(),
        };
        let authority = rest.split(['/', '?', '#']).next().unwrap_or_default();
        let host = authority.rsplit('@').next().unwrap_or_default();
        let host = host.split(':').next().unwrap_or_default();
        host.to_lowercase()
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct HierarchySummary {
    pub categories: usize,
    pub sub_categories: usize,
    pub bookmarks: usize,
}

impl HierarchySummary {
    pub fn of(categories: &[Category], bookmarks: &[Bookmark]) -> Self {
        Self {
            categories: categories.len(),
            sub_categories: categories
                .iter()
                .map(|category| category.sub_categories.len())
                .sum(),
            bookmarks: bookmarks.len(),
        }
    }
}

/// Indented plain-text view of a two-level hierarchy, one bookmark per line.
pub fn outline(categories: &[Category], bookmarks: &[Bookmark]) -> String {
    let mut out = String::new();
    for category in categories {
        let _ = writeln!(&mut out, "{}", category.name);
        for sub in &category.sub_categories {
            let _ = writeln!(&mut out, "  {}", sub.name);
            for bookmark in bookmarks.iter().filter(|b| b.sub_category_id == sub.id) {
                if bookmark.url.is_empty() {
                    let _ = writeln!(&mut out, "    {}", bookmark.title);
                } else {
                    let _ = writeln!(&mut out, "    {}  <{}>", bookmark.title, bookmark.url);
                }
            }
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn host_strips_credentials_port_and_path() {
        let bookmark = Bookmark::new("b1", "t", "https://user@Example.COM:8443/a?b#c", "s1");
        assert_eq!(bookmark.host(), "example.com");
    }

    #[test]
    fn host_is_empty_without_scheme() {
        let bookmark = Bookmark::new("b1", "t", "javascript-bookmarklet", "s1");
        assert_eq!(bookmark.host(), "");
    }

    #[test]
    fn serializes_camel_case_and_skips_missing_metadata() {
        let bookmark = Bookmark::new("b1", "Rust", "https://rust-lang.org", "s1");
        let json = serde_json::to_value(&bookmark).expect("serialize");
        assert_eq!(json["subCategoryId"], "s1");
        assert!(json.get("description").is_none());
    }
}
