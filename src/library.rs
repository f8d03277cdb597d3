//! The persisted bookmark collection and the rules for folding imports into it.

use std::collections::{HashMap, HashSet};

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{info, warn};

use crate::importer::{EntityKind, IdGenerator, ImportResult};
use crate::model::{outline, Bookmark, Category, HierarchySummary, SubCategory};

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum LibraryError {
    #[error("category not found: {0}")]
    CategoryNotFound(String),
    #[error("sub-category not found: {0}")]
    SubCategoryNotFound(String),
    #[error("bookmark not found: {0}")]
    BookmarkNotFound(String),
    #[error("a {kind} named '{name}' already exists")]
    DuplicateName { kind: &'static str, name: String },
    #[error("{0} name cannot be empty")]
    EmptyName(&'static str),
    #[error("{kind} '{id}' references missing '{target}'")]
    DanglingReference {
        kind: &'static str,
        id: String,
        target: String,
    },
}

/// Counts of what a merge changed.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MergeOutcome {
    pub categories_added: usize,
    pub sub_categories_added: usize,
    pub bookmarks_added: usize,
    /// Same URL already present in the target sub-category.
    pub duplicates_skipped: usize,
    /// Bookmarks whose sub-category was not part of the incoming data.
    pub orphans_skipped: usize,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Library {
    pub categories: Vec<Category>,
    pub bookmarks: Vec<Bookmark>,
}

impl Library {
    pub fn is_empty(&self) -> bool {
        self.categories.is_empty() && self.bookmarks.is_empty()
    }

    pub fn summary(&self) -> HierarchySummary {
        HierarchySummary::of(&self.categories, &self.bookmarks)
    }

    pub fn outline(&self) -> String {
        outline(&self.categories, &self.bookmarks)
    }

    pub fn category(&self, id: &str) -> Option<&Category> {
        self.categories.iter().find(|category| category.id == id)
    }

    pub fn category_named(&self, name: &str) -> Option<&Category> {
        self.categories.iter().find(|category| category.name == name)
    }

    /// Finds a sub-category together with the category that owns it.
    pub fn locate_sub_category(&self, sub_id: &str) -> Option<(&Category, &SubCategory)> {
        self.categories
            .iter()
            .find_map(|category| category.sub_category(sub_id).map(|sub| (category, sub)))
    }

    pub fn bookmark(&self, id: &str) -> Option<&Bookmark> {
        self.bookmarks.iter().find(|bookmark| bookmark.id == id)
    }

    pub fn bookmarks_in<'a>(&'a self, sub_id: &'a str) -> impl Iterator<Item = &'a Bookmark> + 'a {
        self.bookmarks
            .iter()
            .filter(move |bookmark| bookmark.sub_category_id == sub_id)
    }

    pub fn add_category(
        &mut self,
        name: &str,
        ids: &mut dyn IdGenerator,
    ) -> Result<String, LibraryError> {
        let name = clean_name(name, "category")?;
        if self.category_named(name).is_some() {
            return Err(LibraryError::DuplicateName {
                kind: "category",
                name: name.to_string(),
            });
        }
        let id = ids.next_id(EntityKind::Category);
        self.categories.push(Category::new(id.clone(), name));
        Ok(id)
    }

    pub fn rename_category(&mut self, id: &str, name: &str) -> Result<(), LibraryError> {
        let name = clean_name(name, "category")?;
        if self
            .categories
            .iter()
            .any(|category| category.name == name && category.id != id)
        {
            return Err(LibraryError::DuplicateName {
                kind: "category",
                name: name.to_string(),
            });
        }
        let category = self
            .categories
            .iter_mut()
            .find(|category| category.id == id)
            .ok_or_else(|| LibraryError::CategoryNotFound(id.to_string()))?;
        category.name = name.to_string();
        Ok(())
    }

    /// Removes a category with all of its sub-categories and bookmarks. Returns the
    /// number of bookmarks that went with it.
    pub fn remove_category(&mut self, id: &str) -> Result<usize, LibraryError> {
        let index = self
            .categories
            .iter()
            .position(|category| category.id == id)
            .ok_or_else(|| LibraryError::CategoryNotFound(id.to_string()))?;
        let removed = self.categories.remove(index);
        let sub_ids: HashSet<&str> = removed
            .sub_categories
            .iter()
            .map(|sub| sub.id.as_str())
            .collect();
        let before = self.bookmarks.len();
        self.bookmarks
            .retain(|bookmark| !sub_ids.contains(bookmark.sub_category_id.as_str()));
        Ok(before - self.bookmarks.len())
    }

    pub fn add_sub_category(
        &mut self,
        category_id: &str,
        name: &str,
        ids: &mut dyn IdGenerator,
    ) -> Result<String, LibraryError> {
        let name = clean_name(name, "sub-category")?;
        let category = self
            .categories
            .iter_mut()
            .find(|category| category.id == category_id)
            .ok_or_else(|| LibraryError::CategoryNotFound(category_id.to_string()))?;
        if category.sub_category_named(name).is_some() {
            return Err(LibraryError::DuplicateName {
                kind: "sub-category",
                name: name.to_string(),
            });
        }
        let id = ids.next_id(EntityKind::SubCategory);
        category.sub_categories.push(SubCategory {
            id: id.clone(),
            name: name.to_string(),
            parent_id: category.id.clone(),
        });
        Ok(id)
    }

    pub fn remove_sub_category(&mut self, sub_id: &str) -> Result<usize, LibraryError> {
        let category = self
            .categories
            .iter_mut()
            .find(|category| category.sub_category(sub_id).is_some())
            .ok_or_else(|| LibraryError::SubCategoryNotFound(sub_id.to_string()))?;
        category.sub_categories.retain(|sub| sub.id != sub_id);
        let before = self.bookmarks.len();
        self.bookmarks
            .retain(|bookmark| bookmark.sub_category_id != sub_id);
        Ok(before - self.bookmarks.len())
    }

    /// Resolves `category / sub_category` by name, creating whichever part is missing.
    pub fn ensure_path(
        &mut self,
        category: &str,
        sub_category: &str,
        ids: &mut dyn IdGenerator,
    ) -> Result<String, LibraryError> {
        let category_name = clean_name(category, "category")?;
        let sub_name = clean_name(sub_category, "sub-category")?;
        let category_id = match self.category_named(category_name) {
            Some(existing) => existing.id.clone(),
            None => self.add_category(category_name, ids)?,
        };
        let existing = self
            .category(&category_id)
            .and_then(|category| category.sub_category_named(sub_name))
            .map(|sub| sub.id.clone());
        match existing {
            Some(id) => Ok(id),
            None => self.add_sub_category(&category_id, sub_name, ids),
        }
    }

    pub fn add_bookmark(
        &mut self,
        sub_id: &str,
        title: &str,
        url: &str,
        ids: &mut dyn IdGenerator,
    ) -> Result<String, LibraryError> {
        if self.locate_sub_category(sub_id).is_none() {
            return Err(LibraryError::SubCategoryNotFound(sub_id.to_string()));
        }
        let id = ids.next_id(EntityKind::Bookmark);
        let mut bookmark = Bookmark::new(id.clone(), title.trim(), url.trim(), sub_id);
        bookmark.created_at = Some(time::OffsetDateTime::now_utc().unix_timestamp());
        self.bookmarks.push(bookmark);
        Ok(id)
    }

    pub fn remove_bookmark(&mut self, id: &str) -> Result<Bookmark, LibraryError> {
        let index = self
            .bookmarks
            .iter()
            .position(|bookmark| bookmark.id == id)
            .ok_or_else(|| LibraryError::BookmarkNotFound(id.to_string()))?;
        Ok(self.bookmarks.remove(index))
    }

    pub fn move_bookmark(&mut self, id: &str, sub_id: &str) -> Result<(), LibraryError> {
        if self.locate_sub_category(sub_id).is_none() {
            return Err(LibraryError::SubCategoryNotFound(sub_id.to_string()));
        }
        let bookmark = self
            .bookmarks
            .iter_mut()
            .find(|bookmark| bookmark.id == id)
            .ok_or_else(|| LibraryError::BookmarkNotFound(id.to_string()))?;
        bookmark.sub_category_id = sub_id.to_string();
        Ok(())
    }

    /// Folds an import into the library.
    ///
    /// Categories match by exact name, sub-categories by exact name within their
    /// category; matches reuse the stored ids. A bookmark is skipped when its target
    /// sub-category already holds the same non-empty URL. Incoming ids that clash with
    /// stored ones are replaced.
    pub fn merge(&mut self, incoming: ImportResult, ids: &mut dyn IdGenerator) -> MergeOutcome {
        let mut outcome = MergeOutcome::default();
        let mut taken = self.known_ids();
        let mut resolved_subs: HashMap<String, String> = HashMap::new();

        for category in incoming.categories {
            let index = match self.categories.iter().position(|c| c.name == category.name) {
                Some(index) => index,
                None => {
                    let id = claim_id(category.id, EntityKind::Category, &mut taken, ids);
                    self.categories.push(Category::new(id, category.name));
                    outcome.categories_added += 1;
                    self.categories.len() - 1
                }
            };

            for sub in category.sub_categories {
                let target = &mut self.categories[index];
                let existing = target.sub_category_named(&sub.name).map(|s| s.id.clone());
                let resolved = match existing {
                    Some(id) => id,
                    None => {
                        let id = claim_id(sub.id.clone(), EntityKind::SubCategory, &mut taken, ids);
                        target.sub_categories.push(SubCategory {
                            id: id.clone(),
                            name: sub.name,
                            parent_id: target.id.clone(),
                        });
                        outcome.sub_categories_added += 1;
                        id
                    }
                };
                resolved_subs.insert(sub.id, resolved);
            }
        }

        let mut stored_urls: HashSet<(String, String)> = self
            .bookmarks
            .iter()
            .filter(|bookmark| !bookmark.url.is_empty())
            .map(|bookmark| (bookmark.sub_category_id.clone(), bookmark.url.clone()))
            .collect();

        for mut bookmark in incoming.bookmarks {
            let Some(target) = resolved_subs.get(&bookmark.sub_category_id).cloned() else {
                warn!(
                    bookmark = %bookmark.id,
                    sub_category = %bookmark.sub_category_id,
                    "dropping bookmark with unknown sub-category"
                );
                outcome.orphans_skipped += 1;
                continue;
            };
            if !bookmark.url.is_empty()
                && !stored_urls.insert((target.clone(), bookmark.url.clone()))
            {
                outcome.duplicates_skipped += 1;
                continue;
            }
            bookmark.id = claim_id(bookmark.id, EntityKind::Bookmark, &mut taken, ids);
            bookmark.sub_category_id = target;
            self.bookmarks.push(bookmark);
            outcome.bookmarks_added += 1;
        }

        info!(
            categories_added = outcome.categories_added,
            sub_categories_added = outcome.sub_categories_added,
            bookmarks_added = outcome.bookmarks_added,
            duplicates_skipped = outcome.duplicates_skipped,
            "merged import into library"
        );
        outcome
    }

    /// Checks that every sub-category points at its owning category and every bookmark
    /// at an existing sub-category.
    pub fn validate(&self) -> Result<(), LibraryError> {
        let mut sub_ids = HashSet::new();
        for category in &self.categories {
            for sub in &category.sub_categories {
                if sub.parent_id != category.id {
                    return Err(LibraryError::DanglingReference {
                        kind: "sub-category",
                        id: sub.id.clone(),
                        target: sub.parent_id.clone(),
                    });
                }
                sub_ids.insert(sub.id.as_str());
            }
        }
        for bookmark in &self.bookmarks {
            if !sub_ids.contains(bookmark.sub_category_id.as_str()) {
                return Err(LibraryError::DanglingReference {
                    kind: "bookmark",
                    id: bookmark.id.clone(),
                    target: bookmark.sub_category_id.clone(),
                });
            }
        }
        Ok(())
    }

    fn known_ids(&self) -> HashSet<String> {
        let mut ids = HashSet::new();
        for category in &self.categories {
            ids.insert(category.id.clone());
            for sub in &category.sub_categories {
                ids.insert(sub.id.clone());
            }
        }
        for bookmark in &self.bookmarks {
            ids.insert(bookmark.id.clone());
        }
        ids
    }
}

fn claim_id(
    candidate: String,
    kind: EntityKind,
    taken: &mut HashSet<String>,
    ids: &mut dyn IdGenerator,
) -> String {
    if !candidate.is_empty() && taken.insert(candidate.clone()) {
        return candidate;
    }
    loop {
        let fresh = ids.next_id(kind);
        if taken.insert(fresh.clone()) {
            return fresh;
        }
    }
}

fn clean_name<'n>(name: &'n str, kind: &'static str) -> Result<&'n str, LibraryError> {
    let trimmed = name.trim();
    if trimmed.is_empty() {
        Err(LibraryError::EmptyName(kind))
    } else {
        Ok(trimmed)
    }
}

#[cfg(test)]
mod tests {
    use assert_matches::assert_matches;

    use super::*;
    use crate::importer::{import, ImportOptions, SequentialIds, UuidIds};
    use crate::tree::{FolderNode, LinkNode};

    fn sample_import(ids: &mut dyn IdGenerator) -> ImportResult {
        let root = FolderNode::root(vec![FolderNode::named(
            "Bookmarks Bar",
            vec![
                FolderNode::named(
                    "Dev",
                    vec![
                        LinkNode::new("Rust", "https://rust-lang.org").into(),
                        FolderNode::named(
                            "Docs",
                            vec![LinkNode::new("Book", "https://doc.rust-lang.org/book").into()],
                        )
                        .into(),
                    ],
                )
                .into(),
                LinkNode::new("Google", "https://google.com").into(),
            ],
        )
        .into()]);
        import(&root, ids, &ImportOptions::default())
    }

    #[test]
    fn merge_into_empty_library_keeps_everything() {
        let mut library = Library::default();
        let outcome = library.merge(sample_import(&mut SequentialIds::new()), &mut UuidIds);
        assert_eq!(outcome.categories_added, 2);
        assert_eq!(outcome.sub_categories_added, 3);
        assert_eq!(outcome.bookmarks_added, 3);
        assert_eq!(outcome.duplicates_skipped, 0);
        library.validate().expect("valid library");
    }

    #[test]
    fn reimport_reuses_names_and_skips_known_urls() {
        let mut library = Library::default();
        library.merge(sample_import(&mut SequentialIds::new()), &mut UuidIds);
        let before = library.clone();

        let outcome = library.merge(sample_import(&mut SequentialIds::new()), &mut UuidIds);
        assert_eq!(outcome.categories_added, 0);
        assert_eq!(outcome.sub_categories_added, 0);
        assert_eq!(outcome.bookmarks_added, 0);
        assert_eq!(outcome.duplicates_skipped, 3);
        assert_eq!(library, before);
    }

    #[test]
    fn same_url_in_a_different_sub_category_is_kept() {
        let mut ids = SequentialIds::new();
        let mut library = Library::default();
        let sub = library.ensure_path("Dev", "Tools", &mut ids).expect("path");
        library
            .add_bookmark(&sub, "Rust", "https://rust-lang.org", &mut ids)
            .expect("bookmark");

        let outcome = library.merge(sample_import(&mut SequentialIds::new()), &mut ids);
        assert_eq!(outcome.duplicates_skipped, 0);
        assert_eq!(outcome.bookmarks_added, 3);
        let dev = library.category_named("Dev").expect("dev");
        let names: Vec<_> = dev.sub_categories.iter().map(|s| s.name.as_str()).collect();
        assert_eq!(names, ["Tools", "默认", "Docs"]);
        library.validate().expect("valid library");
    }

    #[test]
    fn clashing_incoming_ids_are_rekeyed() {
        let mut library = Library::default();
        library.merge(sample_import(&mut SequentialIds::new()), &mut SequentialIds::new());

        let other = FolderNode::root(vec![FolderNode::named(
            "Reading",
            vec![LinkNode::new("Blog", "https://blog.test").into()],
        )
        .into()]);
        let incoming = import(&other, &mut SequentialIds::new(), &ImportOptions::default());
        assert_eq!(incoming.categories[0].id, "cat-1");

        let mut fresh = |kind: EntityKind| format!("new-{}", kind.prefix());
        let outcome = library.merge(incoming, &mut fresh);
        assert_eq!(outcome.categories_added, 1);
        let reading = library.category_named("Reading").expect("reading");
        assert_eq!(reading.id, "new-cat");
        assert_eq!(reading.sub_categories[0].parent_id, "new-cat");
        library.validate().expect("valid library");
    }

    #[test]
    fn bookmarks_without_url_are_never_deduplicated() {
        let mut ids = SequentialIds::new();
        let mut library = Library::default();
        let root = FolderNode::root(vec![FolderNode::named(
            "Notes",
            vec![
                LinkNode { title: Some("first".into()), ..LinkNode::default() }.into(),
                LinkNode { title: Some("second".into()), ..LinkNode::default() }.into(),
            ],
        )
        .into()]);
        let incoming = import(&root, &mut ids, &ImportOptions::default());
        let outcome = library.merge(incoming, &mut ids);
        assert_eq!(outcome.bookmarks_added, 2);
    }

    #[test]
    fn orphaned_bookmarks_are_skipped() {
        let mut library = Library::default();
        let incoming = ImportResult {
            categories: Vec::new(),
            bookmarks: vec![Bookmark::new("b1", "t", "https://t.test", "nowhere")],
        };
        let outcome = library.merge(incoming, &mut UuidIds);
        assert_eq!(outcome.orphans_skipped, 1);
        assert!(library.is_empty());
    }

    #[test]
    fn category_names_must_be_unique_and_non_blank() {
        let mut ids = SequentialIds::new();
        let mut library = Library::default();
        let dev = library.add_category("Dev", &mut ids).expect("dev");
        assert_matches!(
            library.add_category(" Dev ", &mut ids),
            Err(LibraryError::DuplicateName { kind: "category", .. })
        );
        assert_matches!(library.add_category("  ", &mut ids), Err(LibraryError::EmptyName(_)));

        library.add_category("Ops", &mut ids).expect("ops");
        assert_matches!(
            library.rename_category(&dev, "Ops"),
            Err(LibraryError::DuplicateName { .. })
        );
        library.rename_category(&dev, "Development").expect("rename");
        assert!(library.category_named("Development").is_some());
    }

    #[test]
    fn removing_a_category_cascades() {
        let mut ids = SequentialIds::new();
        let mut library = Library::default();
        let sub = library.ensure_path("Dev", "Rust", &mut ids).expect("path");
        library.add_bookmark(&sub, "Book", "https://doc.rust-lang.org/book", &mut ids).expect("add");
        let other = library.ensure_path("Ops", "Cloud", &mut ids).expect("path");
        library.add_bookmark(&other, "Console", "https://console.test", &mut ids).expect("add");

        let dev_id = library.category_named("Dev").expect("dev").id.clone();
        assert_eq!(library.remove_category(&dev_id), Ok(1));
        assert_eq!(library.bookmarks.len(), 1);
        assert_matches!(library.remove_category(&dev_id), Err(LibraryError::CategoryNotFound(_)));
        library.validate().expect("valid library");
    }

    #[test]
    fn move_and_remove_bookmarks() {
        let mut ids = SequentialIds::new();
        let mut library = Library::default();
        let rust = library.ensure_path("Dev", "Rust", &mut ids).expect("path");
        let go = library.ensure_path("Dev", "Go", &mut ids).expect("path");
        assert_eq!(library.ensure_path("Dev", "Rust", &mut ids), Ok(rust.clone()));

        let id = library.add_bookmark(&rust, " Book ", "https://doc.rust-lang.org/book", &mut ids).expect("add");
        assert_eq!(library.bookmark(&id).map(|b| b.title.as_str()), Some("Book"));
        library.move_bookmark(&id, &go).expect("move");
        assert_eq!(library.bookmarks_in(&go).count(), 1);
        assert_matches!(library.move_bookmark(&id, "missing"), Err(LibraryError::SubCategoryNotFound(_)));

        let removed = library.remove_bookmark(&id).expect("remove");
        assert_eq!(removed.url, "https://doc.rust-lang.org/book");
        assert_eq!(library.remove_sub_category(&go), Ok(0));
        assert!(library.locate_sub_category(&go).is_none());
    }

    #[test]
    fn validate_reports_dangling_bookmarks() {
        let library = Library {
            categories: Vec::new(),
            bookmarks: vec![Bookmark::new("b1", "t", "u", "gone")],
        };
        assert_matches!(
            library.validate(),
            Err(LibraryError::DanglingReference { kind: "bookmark", .. })
        );
    }
}
