//! Read-only view of a parsed bookmark document.
//!
//! The HTML collaborator in [`crate::transfer::netscape`] produces these nodes; the
//! importer only ever borrows them.

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Node {
    Folder(FolderNode),
    Link(LinkNode),
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FolderNode {
    pub name: Option<String>,
    /// Set when the source carried the `PERSONAL_TOOLBAR_FOLDER` marker.
    pub toolbar: bool,
    pub children: Vec<Node>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LinkNode {
    pub title: Option<String>,
    pub url: Option<String>,
    pub add_date: Option<i64>,
    pub icon: Option<String>,
    pub description: Option<String>,
}

impl FolderNode {
    /// Unnamed container for the top-level entries of a document.
    pub fn root(children: Vec<Node>) -> Self {
        Self {
            name: None,
            toolbar: false,
            children,
        }
    }

    pub fn named(name: impl Into<String>, children: Vec<Node>) -> Self {
        Self {
            name: Some(name.into()),
            toolbar: false,
            children,
        }
    }

    pub fn toolbar(mut self) -> Self {
        self.toolbar = true;
        self
    }

    /// Number of links reachable from this folder at any depth.
    pub fn link_count(&self) -> usize {
        let mut count = 0;
        let mut pending = vec![self];
        while let Some(folder) = pending.pop() {
            for child in &folder.children {
                match child {
                    Node::Link(_) => count += 1,
                    Node::Folder(nested) => pending.push(nested),
                }
            }
        }
        count
    }

    pub fn has_links(&self) -> bool {
        let mut pending = vec![self];
        while let Some(folder) = pending.pop() {
            for child in &folder.children {
                match child {
                    Node::Link(_) => return true,
                    Node::Folder(nested) => pending.push(nested),
                }
            }
        }
        false
    }

    /// Levels of folders below this one; `0` when it holds no folders.
    pub fn depth(&self) -> usize {
        let mut deepest = 0;
        let mut pending = vec![(self, 0)];
        while let Some((folder, level)) = pending.pop() {
            deepest = deepest.max(level);
            for child in &folder.children {
                if let Node::Folder(nested) = child {
                    pending.push((nested, level + 1));
                }
            }
        }
        deepest
    }
}

/// Unlinks nested folders one at a time so dropping a deep tree does not recurse.
impl Drop for FolderNode {
    fn drop(&mut self) {
        let mut pending = std::mem::take(&mut self.children);
        while let Some(node) = pending.pop() {
            if let Node::Folder(mut folder) = node {
                pending.append(&mut folder.children);
            }
        }
    }
}

impl LinkNode {
    pub fn new(title: impl Into<String>, url: impl Into<String>) -> Self {
        Self {
            title: Some(title.into()),
            url: Some(url.into()),
            ..Self::default()
        }
    }
}

impl From<FolderNode> for Node {
    fn from(folder: FolderNode) -> Self {
        Node::Folder(folder)
    }
}

impl From<LinkNode> for Node {
    fn from(link: LinkNode) -> Self {
        Node::Link(link)
    }
}
