pub mod cli;
pub mod config;
pub mod importer;
pub mod library;
pub mod model;
pub mod search;
pub mod storage;
pub mod transfer;
pub mod tree;

pub use config::{AppConfig, ConfigLoader, ConfigPaths};
pub use importer::{import, IdGenerator, ImportOptions, ImportResult, SequentialIds, UuidIds};
pub use library::{Library, LibraryError, MergeOutcome};
pub use model::{Bookmark, Category, SubCategory};
pub use tree::{FolderNode, LinkNode, Node};
