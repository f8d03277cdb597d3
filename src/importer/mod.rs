//! Browser bookmark tree to two-level library conversion.
//!
//! A browser export is an arbitrarily deep folder tree. The library only knows
//! `Category -> SubCategory -> Bookmark`, so [`import`] walks the tree in one of three
//! modes:
//!
//! * [`Mode::Bar`]: the bookmark bar itself. Never becomes a category; its folders do,
//!   and its loose links land in the uncategorized bucket.
//! * [`Mode::Category`]: a folder that already is a category. Loose links go to a
//!   default sub-category, sub-folders become sub-categories.
//! * [`Mode::Flatten`]: anything at or below the sub-category level. Nested folders are
//!   folded into the enclosing sub-category and their names are prepended to bookmark
//!   titles as `[name] `.
//!
//! Categories and sub-categories are only created once they are known to receive a
//! bookmark, so the result never contains empty containers.

use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::model::{outline, Bookmark, Category, HierarchySummary, SubCategory};
use crate::tree::{FolderNode, LinkNode, Node};

pub mod ids;

pub use self::ids::{EntityKind, IdGenerator, SequentialIds, UuidIds};

/// Folder names browsers use for the bookmark bar. Matched exactly.
pub const BOOKMARK_BAR_LABELS: [&str; 5] = [
    "书签栏",
    "书签工具栏",
    "Bookmarks bar",
    "Bookmarks Bar",
    "Bookmarks Toolbar",
];

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ImportOptions {
    /// Category receiving links that sit directly in the bar or at the document top level.
    pub uncategorized_category: String,
    /// Sub-category receiving links that sit directly in a category folder.
    pub default_sub_category: String,
    pub unnamed_bookmark: String,
    pub unnamed_folder: String,
    /// Additional bookmark bar names, checked after [`BOOKMARK_BAR_LABELS`].
    pub extra_bar_labels: Vec<String>,
}

impl Default for ImportOptions {
    fn default() -> Self {
        Self {
            uncategorized_category: "未分类书签".to_string(),
            default_sub_category: "默认".to_string(),
            unnamed_bookmark: "Unnamed Bookmark".to_string(),
            unnamed_folder: "Unnamed Folder".to_string(),
            extra_bar_labels: Vec::new(),
        }
    }
}

impl ImportOptions {
    pub fn is_bookmark_bar(&self, folder: &FolderNode) -> bool {
        if folder.toolbar {
            return true;
        }
        match folder.name.as_deref() {
            Some(name) => {
                BOOKMARK_BAR_LABELS.contains(&name)
                    || self.extra_bar_labels.iter().any(|label| label == name)
            }
            None => false,
        }
    }

    fn folder_name<'n>(&'n self, folder: &'n FolderNode) -> &'n str {
        non_blank(folder.name.as_deref()).unwrap_or(&self.unnamed_folder)
    }

    fn link_title<'n>(&'n self, link: &'n LinkNode) -> &'n str {
        non_blank(link.title.as_deref()).unwrap_or(&self.unnamed_bookmark)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImportResult {
    pub categories: Vec<Category>,
    pub bookmarks: Vec<Bookmark>,
}

impl ImportResult {
    pub fn is_empty(&self) -> bool {
        self.categories.is_empty() && self.bookmarks.is_empty()
    }

    pub fn summary(&self) -> HierarchySummary {
        HierarchySummary::of(&self.categories, &self.bookmarks)
    }

    pub fn outline(&self) -> String {
        outline(&self.categories, &self.bookmarks)
    }
}

/// Converts a parsed bookmark document into categories and bookmarks.
///
/// `root` holds the document's top-level entries. The first folder recognised as the
/// bookmark bar gets bar treatment; any later match is imported as an ordinary folder.
pub fn import(
    root: &FolderNode,
    ids: &mut dyn IdGenerator,
    options: &ImportOptions,
) -> ImportResult {
    let mut importer = Importer::new(ids, options);
    let mut bar_seen = false;

    for child in &root.children {
        match child {
            Node::Link(link) => importer.push_uncategorized(link),
            Node::Folder(folder) if options.is_bookmark_bar(folder) => {
                if bar_seen {
                    warn!(
                        folder = options.folder_name(folder),
                        "additional bookmark bar folder, importing it as a regular category"
                    );
                    importer.open_category(folder);
                } else {
                    bar_seen = true;
                    debug!(folder = options.folder_name(folder), "bookmark bar found");
                    importer.walk(folder, Mode::Bar);
                }
            }
            Node::Folder(folder) => importer.open_category(folder),
        }
    }

    let result = importer.finish();
    let summary = result.summary();
    info!(
        categories = summary.categories,
        sub_categories = summary.sub_categories,
        bookmarks = summary.bookmarks,
        bar_seen,
        "bookmark tree imported"
    );
    result
}

#[derive(Debug, Clone, Copy)]
enum Mode<'a> {
    Bar,
    /// Index into the accumulator's categories.
    Category(usize),
    /// Everything below goes into this sub-category.
    Flatten { sub_category_id: &'a str },
}

struct Importer<'a> {
    ids: &'a mut dyn IdGenerator,
    options: &'a ImportOptions,
    categories: Vec<Category>,
    bookmarks: Vec<Bookmark>,
    uncategorized: Option<String>,
}

impl<'a> Importer<'a> {
    fn new(ids: &'a mut dyn IdGenerator, options: &'a ImportOptions) -> Self {
        Self {
            ids,
            options,
            categories: Vec::new(),
            bookmarks: Vec::new(),
            uncategorized: None,
        }
    }

    fn finish(self) -> ImportResult {
        ImportResult {
            categories: self.categories,
            bookmarks: self.bookmarks,
        }
    }

    fn walk(&mut self, folder: &FolderNode, mode: Mode<'_>) {
        let options = self.options;
        match mode {
            Mode::Bar => {
                for child in &folder.children {
                    match child {
                        Node::Folder(nested) => self.open_category(nested),
                        Node::Link(link) => self.push_uncategorized(link),
                    }
                }
            }
            Mode::Category(category) => {
                let mut default_sub: Option<String> = None;
                for child in &folder.children {
                    match child {
                        Node::Link(link) => {
                            let sub_id = match &default_sub {
                                Some(id) => id.clone(),
                                None => {
                                    let id = self
                                        .open_sub_category(category, &options.default_sub_category);
                                    default_sub = Some(id.clone());
                                    id
                                }
                            };
                            self.push_bookmark(&sub_id, "", link);
                        }
                        Node::Folder(nested) => {
                            if !nested.has_links() {
                                debug!(folder = options.folder_name(nested), "skipping empty folder");
                                continue;
                            }
                            let sub_id =
                                self.open_sub_category(category, options.folder_name(nested));
                            self.walk(
                                nested,
                                Mode::Flatten {
                                    sub_category_id: &sub_id,
                                },
                            );
                        }
                    }
                }
            }
            Mode::Flatten { sub_category_id } => self.flatten(folder, sub_category_id),
        }
    }

    /// Depth-first over everything below a sub-category in document order, on an
    /// explicit stack. Each nested folder adds its name to the title prefix.
    fn flatten(&mut self, folder: &FolderNode, sub_category_id: &str) {
        let options = self.options;
        let mut pending: Vec<(std::slice::Iter<'_, Node>, Option<&str>)> =
            vec![(folder.children.iter(), None)];
        while let Some((children, _)) = pending.last_mut() {
            match children.next() {
                Some(Node::Link(link)) => {
                    let prefix: String = pending
                        .iter()
                        .filter_map(|(_, name)| *name)
                        .map(|name| format!("[{name}] "))
                        .collect();
                    self.push_bookmark(sub_category_id, &prefix, link);
                }
                Some(Node::Folder(nested)) => {
                    pending.push((nested.children.iter(), Some(options.folder_name(nested))));
                }
                None => {
                    pending.pop();
                }
            }
        }
    }

    /// Turns `folder` into a category, unless nothing inside it would be imported.
    fn open_category(&mut self, folder: &FolderNode) {
        let options = self.options;
        let name = options.folder_name(folder);
        if !folder.has_links() {
            debug!(folder = name, "skipping empty folder");
            return;
        }
        let index = self.push_category(name);
        self.walk(folder, Mode::Category(index));
    }

    fn push_category(&mut self, name: &str) -> usize {
        let id = self.ids.next_id(EntityKind::Category);
        self.categories.push(Category::new(id, name));
        self.categories.len() - 1
    }

    fn open_sub_category(&mut self, category: usize, name: &str) -> String {
        let id = self.ids.next_id(EntityKind::SubCategory);
        let parent = &mut self.categories[category];
        parent.sub_categories.push(SubCategory {
            id: id.clone(),
            name: name.to_string(),
            parent_id: parent.id.clone(),
        });
        id
    }

    fn push_uncategorized(&mut self, link: &LinkNode) {
        let sub_id = match &self.uncategorized {
            Some(id) => id.clone(),
            None => {
                let options = self.options;
                let category = self.push_category(&options.uncategorized_category);
                let id = self.open_sub_category(category, &options.default_sub_category);
                self.uncategorized = Some(id.clone());
                id
            }
        };
        self.push_bookmark(&sub_id, "", link);
    }

    fn push_bookmark(&mut self, sub_category_id: &str, prefix: &str, link: &LinkNode) {
        let title = format!("{prefix}{}", self.options.link_title(link));
        let url = link.url.as_deref().map(str::trim).unwrap_or_default();
        let mut bookmark = Bookmark::new(
            self.ids.next_id(EntityKind::Bookmark),
            title,
            url,
            sub_category_id,
        );
        bookmark.description = non_blank(link.description.as_deref()).map(str::to_string);
        bookmark.icon = non_blank(link.icon.as_deref()).map(str::to_string);
        bookmark.created_at = link.add_date;
        self.bookmarks.push(bookmark);
    }
}

fn non_blank(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|value| !value.is_empty())
}
