//! `NETSCAPE-Bookmark-file-1` documents, the format every browser exports.
//!
//! The markup is loose HTML: folders are `<DT><H3>name</H3>` followed by a nested
//! `<DL>`, links are `<DT><A HREF=..>title</A>`, and an optional `<DD>` carries a
//! description. Parsing goes through html5ever (via `scraper`), so unclosed tags end up
//! wherever the HTML tree builder puts them; the lookups below accept each of the
//! placements it produces.

use std::fmt::Write as _;

use scraper::{ElementRef, Html};
use time::OffsetDateTime;
use tracing::warn;

use super::TransferError;
use crate::library::Library;
use crate::tree::{FolderNode, LinkNode, Node};

/// Deepest folder level kept as its own folder when reading a document.
pub const MAX_FOLDER_DEPTH: usize = 256;

/// Parses an export into a root folder holding the document's top-level entries.
pub fn parse_document(source: &str) -> Result<FolderNode, TransferError> {
    let document = Html::parse_document(source);
    let list = root_list(&document).ok_or(TransferError::MissingBookmarkList)?;
    Ok(FolderNode::root(read_list(list)))
}

/// The `<DL>` right after the document heading, or failing that the first `<DL>`.
fn root_list(document: &Html) -> Option<ElementRef<'_>> {
    let root = document.root_element();
    let under_heading = root
        .descendants()
        .filter_map(ElementRef::wrap)
        .find(|element| is(element, "h1"))
        .and_then(|heading| heading.next_siblings().find_map(ElementRef::wrap))
        .filter(|element| is(element, "dl"));
    under_heading.or_else(|| {
        root.descendants()
            .filter_map(ElementRef::wrap)
            .find(|element| is(element, "dl"))
    })
}

/// One `<DL>` being read. `folder` is `None` for the root list and for lists folded
/// into their parent past [`MAX_FOLDER_DEPTH`].
struct OpenList<'a> {
    entries: std::vec::IntoIter<ElementRef<'a>>,
    nodes: Vec<Node>,
    folder: Option<(String, bool)>,
    depth: usize,
    last_was_link: bool,
}

impl<'a> OpenList<'a> {
    fn new(list: ElementRef<'a>, folder: Option<(String, bool)>, depth: usize) -> Self {
        Self {
            entries: list
                .children()
                .filter_map(ElementRef::wrap)
                .collect::<Vec<_>>()
                .into_iter(),
            nodes: Vec::new(),
            folder,
            depth,
            last_was_link: false,
        }
    }
}

/// Reads a `<DL>` and everything nested in it on an explicit stack. Folders below
/// [`MAX_FOLDER_DEPTH`] lose their own level: their entries are kept in the deepest
/// folder that is still allowed.
fn read_list(list: ElementRef<'_>) -> Vec<Node> {
    let mut stack = vec![OpenList::new(list, None, 0)];
    let mut folded = 0usize;
    loop {
        let Some(open) = stack.last_mut() else {
            return Vec::new();
        };
        let Some(entry) = open.entries.next() else {
            let Some(finished) = stack.pop() else {
                return Vec::new();
            };
            let OpenList { nodes, folder, .. } = finished;
            match (stack.last_mut(), folder) {
                (Some(parent), Some((name, toolbar))) => parent.nodes.push(Node::Folder(FolderNode {
                    name: Some(name),
                    toolbar,
                    children: nodes,
                })),
                (Some(parent), None) => parent.nodes.extend(nodes),
                (None, _) => {
                    if folded > 0 {
                        warn!(folded, "folders nested too deeply were merged into their parents");
                    }
                    return nodes;
                }
            }
            continue;
        };
        match entry.value().name() {
            "dt" => {
                open.last_was_link = false;
                match read_entry(entry) {
                    Some(Entry::Link(link)) => {
                        open.nodes.push(Node::Link(link));
                        open.last_was_link = true;
                    }
                    Some(Entry::Folder { name, toolbar, list }) => match list {
                        Some(list) if open.depth < MAX_FOLDER_DEPTH => {
                            let depth = open.depth + 1;
                            stack.push(OpenList::new(list, Some((name, toolbar)), depth));
                        }
                        Some(list) => {
                            folded += 1;
                            let depth = open.depth;
                            stack.push(OpenList::new(list, None, depth));
                        }
                        None => open.nodes.push(Node::Folder(FolderNode {
                            name: Some(name),
                            toolbar,
                            children: Vec::new(),
                        })),
                    },
                    None => {}
                }
            }
            "dd" if open.last_was_link => {
                if let Some(Node::Link(link)) = open.nodes.last_mut() {
                    link.description = Some(own_text(entry)).filter(|text| !text.is_empty());
                }
                open.last_was_link = false;
            }
            _ => {}
        }
    }
}

enum Entry<'a> {
    Link(LinkNode),
    Folder {
        name: String,
        toolbar: bool,
        list: Option<ElementRef<'a>>,
    },
}

fn read_entry(entry: ElementRef<'_>) -> Option<Entry<'_>> {
    entry
        .children()
        .filter_map(ElementRef::wrap)
        .find_map(|child| match child.value().name() {
            "h3" => Some(Entry::Folder {
                name: text_of(child),
                toolbar: is_toolbar(child),
                list: folder_list(entry),
            }),
            "a" => Some(Entry::Link(read_link(child))),
            _ => None,
        })
}

fn is_toolbar(heading: ElementRef<'_>) -> bool {
    heading
        .value()
        .attr("personal_toolbar_folder")
        .map_or(false, |flag| !flag.eq_ignore_ascii_case("false"))
}

/// A folder's `<DL>` is normally nested in its `<DT>`; some exports leave it as the
/// next sibling or tuck it into a `<DD>` description.
fn folder_list(entry: ElementRef<'_>) -> Option<ElementRef<'_>> {
    if let Some(list) = entry
        .children()
        .filter_map(ElementRef::wrap)
        .find(|element| is(element, "dl"))
    {
        return Some(list);
    }
    let next = entry.next_siblings().find_map(ElementRef::wrap)?;
    match next.value().name() {
        "dl" => Some(next),
        "dd" => next
            .children()
            .filter_map(ElementRef::wrap)
            .find(|element| is(element, "dl")),
        _ => None,
    }
}

fn read_link(anchor: ElementRef<'_>) -> LinkNode {
    let attrs = anchor.value();
    LinkNode {
        title: Some(text_of(anchor)),
        url: attrs.attr("href").map(str::to_string),
        add_date: attrs.attr("add_date").and_then(|raw| raw.trim().parse().ok()),
        icon: attrs.attr("icon").map(str::to_string),
        description: None,
    }
}

fn is(element: &ElementRef<'_>, name: &str) -> bool {
    element.value().name() == name
}

fn text_of(element: ElementRef<'_>) -> String {
    element.text().collect::<String>().trim().to_string()
}

/// Text directly inside `element`, ignoring nested markup.
fn own_text(element: ElementRef<'_>) -> String {
    element
        .children()
        .filter_map(|child| child.value().as_text())
        .map(|text| text.trim())
        .filter(|text| !text.is_empty())
        .collect::<Vec<_>>()
        .join(" ")
}

/// Writes the library as a Netscape export: categories and sub-categories become
/// nested `<H3>` folders.
pub fn render(library: &Library) -> String {
    let now = OffsetDateTime::now_utc().unix_timestamp();
    let mut out = String::from(
        "<!DOCTYPE NETSCAPE-Bookmark-file-1>\n\
         <!-- This is an automatically generated file.\n     \
         It will be read and overwritten.\n     \
         DO NOT EDIT! -->\n\
         <META HTTP-EQUIV=\"Content-Type\" CONTENT=\"text/html; charset=UTF-8\">\n\
         <TITLE>Bookmarks</TITLE>\n\
         <H1>Bookmarks</H1>\n\
         <DL><p>\n",
    );
    for category in &library.categories {
        let _ = writeln!(
            &mut out,
            "    <DT><H3 ADD_DATE=\"{now}\">{}</H3>",
            escape(&category.name)
        );
        out.push_str("    <DL><p>\n");
        for sub in &category.sub_categories {
            let _ = writeln!(
                &mut out,
                "        <DT><H3 ADD_DATE=\"{now}\">{}</H3>",
                escape(&sub.name)
            );
            out.push_str("        <DL><p>\n");
            for bookmark in library.bookmarks_in(&sub.id) {
                let _ = write!(&mut out, "            <DT><A HREF=\"{}\"", escape(&bookmark.url));
                if let Some(added) = bookmark.created_at {
                    let _ = write!(&mut out, " ADD_DATE=\"{added}\"");
                }
                if let Some(icon) = &bookmark.icon {
                    let _ = write!(&mut out, " ICON=\"{}\"", escape(icon));
                }
                let _ = writeln!(&mut out, ">{}</A>", escape(&bookmark.title));
                if let Some(description) = &bookmark.description {
                    let _ = writeln!(&mut out, "            <DD>{}", escape(description));
                }
            }
            out.push_str("        </DL><p>\n");
        }
        out.push_str("    </DL><p>\n");
    }
    out.push_str("</DL><p>\n");
    out
}

fn escape(raw: &str) -> String {
    let mut escaped = String::with_capacity(raw.len());
    for ch in raw.chars() {
        match ch {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            _ => escaped.push(ch),
        }
    }
    escaped
}
