use std::fmt::Write as _;
use std::fs;
use std::io::{self, Read};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{bail, Context, Result};
use clap::{Args, Subcommand};
use indexmap::IndexMap;
use regex::Regex;
use time::{format_description::well_known::Rfc3339, OffsetDateTime};
use unicode_width::{UnicodeWidthChar, UnicodeWidthStr};

use crate::config::AppConfig;
use crate::importer::UuidIds;
use crate::library::{Library, MergeOutcome};
use crate::model::outline;
use crate::search::{build_highlight_regex, mark_matches, parse_query, search, SearchHit};
use crate::storage::{ImportRecord, StorageHandle};
use crate::transfer::{self, json, netscape, DocumentFormat, ExportFormat};

const TITLE_WIDTH: usize = 72;
const EMPHASIS: (&str, &str) = ("\x1b[1;33m", "\x1b[0m");

#[derive(Args, Debug, Clone)]
pub struct ImportArgs {
    /// Bookmark file to read, or `-` for stdin
    pub path: PathBuf,
    /// Input format; `auto` picks JSON when the document starts with `{`
    #[arg(long, value_enum, default_value_t = DocumentFormat::Auto)]
    pub format: DocumentFormat,
    /// Print what would be imported without touching the library
    #[arg(long)]
    pub dry_run: bool,
}

#[derive(Args, Debug, Clone)]
pub struct ExportArgs {
    /// Output format (defaults to `export.default_format` from the config)
    #[arg(long, value_enum)]
    pub format: Option<ExportFormat>,
    /// Write to this file instead of stdout
    #[arg(long, short)]
    pub output: Option<PathBuf>,
}

#[derive(Args, Debug, Clone)]
pub struct SearchArgs {
    /// Search terms (supports title:, cat: and site:)
    #[arg()]
    pub query: Vec<String>,
    /// Limit the number of results printed
    #[arg(long, default_value_t = 20)]
    pub limit: usize,
}

#[derive(Args, Debug, Clone, Default)]
pub struct ListArgs {
    /// Only show the category with this name
    #[arg(long)]
    pub category: Option<String>,
}

#[derive(Args, Debug, Clone)]
pub struct AddArgs {
    pub url: String,
    /// Category name (created when missing)
    #[arg(long)]
    pub category: String,
    /// Sub-category name (defaults to the configured default sub-category)
    #[arg(long)]
    pub sub: Option<String>,
    /// Title for the bookmark (defaults to the URL)
    #[arg(long)]
    pub title: Option<String>,
}

#[derive(Args, Debug, Clone)]
pub struct RemoveArgs {
    /// Bookmark identifier
    pub id: String,
}

#[derive(Args, Debug, Clone)]
pub struct MoveArgs {
    /// Bookmark identifier
    pub id: String,
    /// Target category name (created when missing)
    #[arg(long)]
    pub category: String,
    /// Target sub-category name (defaults to the configured default sub-category)
    #[arg(long)]
    pub sub: Option<String>,
}

#[derive(Subcommand, Debug, Clone)]
pub enum CategoryCommand {
    /// Create an empty category
    Add(CategoryAddArgs),
    /// Rename a category
    Rename(CategoryRenameArgs),
    /// Delete a category together with its sub-categories and bookmarks
    Remove(CategoryRemoveArgs),
}

#[derive(Args, Debug, Clone)]
pub struct CategoryAddArgs {
    pub name: String,
}

#[derive(Args, Debug, Clone)]
pub struct CategoryRenameArgs {
    /// Current category name
    pub from: String,
    /// New category name
    pub to: String,
}

#[derive(Args, Debug, Clone)]
pub struct CategoryRemoveArgs {
    pub name: String,
}

#[derive(Args, Debug, Clone)]
pub struct CategoryArgs {
    #[command(subcommand)]
    pub command: CategoryCommand,
}

#[derive(Args, Debug, Clone)]
pub struct HistoryArgs {
    /// Number of imports to show
    #[arg(long, default_value_t = 10)]
    pub limit: usize,
}

pub fn import_bookmarks(config: Arc<AppConfig>, storage: StorageHandle, args: ImportArgs) -> Result<()> {
    let output = run_import(&config, &storage, &args)?;
    print!("{output}");
    Ok(())
}

fn run_import(config: &AppConfig, storage: &StorageHandle, args: &ImportArgs) -> Result<String> {
    let (source, label) = read_source(&args.path)?;
    let format = args.format.detect(&source);
    let incoming = transfer::load(&source, format, &mut UuidIds, &config.import)
        .with_context(|| format!("reading bookmarks from {label}"))?;

    if incoming.is_empty() {
        return Ok(format!("No bookmarks found in {label}.\n"));
    }

    let summary = incoming.summary();
    if args.dry_run {
        let mut out = format!(
            "Dry run: {label} holds {} bookmark{} in {} categor{} / {} sub-categor{}\n\n",
            summary.bookmarks,
            plural(summary.bookmarks, "", "s"),
            summary.categories,
            plural(summary.categories, "y", "ies"),
            summary.sub_categories,
            plural(summary.sub_categories, "y", "ies"),
        );
        out.push_str(&incoming.outline());
        return Ok(out);
    }

    let mut library = storage.load_library().context("loading library")?;
    let outcome = library.merge(incoming, &mut UuidIds);
    storage
        .save_import(&library, &label, format.as_str(), &outcome)
        .context("saving imported bookmarks")?;
    Ok(format_merge_outcome(&label, &outcome))
}

fn read_source(path: &Path) -> Result<(String, String)> {
    if path.as_os_str() == "-" {
        let Some(source) = read_stdin()? else {
            bail!("no input on stdin; pipe a bookmark export or pass a file path");
        };
        return Ok((source, "stdin".to_string()));
    }
    let bytes = fs::read(path).with_context(|| format!("reading {}", path.display()))?;
    Ok((
        String::from_utf8_lossy(&bytes).into_owned(),
        path.display().to_string(),
    ))
}

fn read_stdin() -> Result<Option<String>> {
    if atty::is(atty::Stream::Stdin) {
        return Ok(None);
    }
    let mut buf = String::new();
    io::stdin().read_to_string(&mut buf)?;
    Ok(Some(buf))
}

fn format_merge_outcome(label: &str, outcome: &MergeOutcome) -> String {
    let mut out = format!(
        "Imported {} bookmark{} from {label}\n",
        outcome.bookmarks_added,
        plural(outcome.bookmarks_added, "", "s"),
    );
    let _ = writeln!(
        &mut out,
        "    {} new categor{}, {} new sub-categor{}",
        outcome.categories_added,
        plural(outcome.categories_added, "y", "ies"),
        outcome.sub_categories_added,
        plural(outcome.sub_categories_added, "y", "ies"),
    );
    if outcome.duplicates_skipped > 0 {
        let _ = writeln!(
            &mut out,
            "    {} duplicate{} skipped",
            outcome.duplicates_skipped,
            plural(outcome.duplicates_skipped, "", "s"),
        );
    }
    if outcome.orphans_skipped > 0 {
        let _ = writeln!(
            &mut out,
            "    {} bookmark{} without a sub-category skipped",
            outcome.orphans_skipped,
            plural(outcome.orphans_skipped, "", "s"),
        );
    }
    out
}

pub fn export_bookmarks(config: Arc<AppConfig>, storage: StorageHandle, args: ExportArgs) -> Result<()> {
    let format = args.format.unwrap_or(config.export.default_format);
    let library = storage.load_library().context("loading library")?;
    let document = render_library(&library, format)?;
    match args.output {
        Some(path) => {
            fs::write(&path, document)
                .with_context(|| format!("writing export {}", path.display()))?;
            let count = library.bookmarks.len();
            println!(
                "Exported {count} bookmark{} as {} to {}",
                plural(count, "", "s"),
                format.as_str(),
                path.display()
            );
        }
        None => print!("{document}"),
    }
    Ok(())
}

fn render_library(library: &Library, format: ExportFormat) -> Result<String> {
    match format {
        ExportFormat::Html => Ok(netscape::render(library)),
        ExportFormat::Json => json::render(library).context("rendering JSON export"),
    }
}

pub fn search_bookmarks(config: Arc<AppConfig>, storage: StorageHandle, args: SearchArgs) -> Result<()> {
    let emphasis = atty::is(atty::Stream::Stdout).then_some(EMPHASIS);
    let output = run_search(&config, &storage, &args, emphasis)?;
    print!("{output}");
    Ok(())
}

fn run_search(
    config: &AppConfig,
    storage: &StorageHandle,
    args: &SearchArgs,
    emphasis: Option<(&str, &str)>,
) -> Result<String> {
    let raw_query = args.query.join(" ");
    let trimmed = raw_query.trim();
    if trimmed.is_empty() {
        bail!("search query cannot be empty");
    }

    let query = parse_query(trimmed);
    if !query.has_terms() && !query.has_filters() {
        bail!("search query must contain terms or filters");
    }

    let limit = args.limit.min(config.search.max_results).max(1);
    let library = storage.load_library().context("loading library")?;
    let hits = search(&library, &query, limit);
    let regex = emphasis.and_then(|_| build_highlight_regex(&query.highlight_terms()));
    let highlight = regex
        .as_ref()
        .zip(emphasis)
        .map(|(regex, (open, close))| (regex, open, close));
    Ok(format_search_results(&hits, highlight))
}

/// Groups hits under their `category / sub-category` path, in order of best hit.
fn format_search_results(hits: &[SearchHit<'_>], highlight: Option<(&Regex, &str, &str)>) -> String {
    if hits.is_empty() {
        return "No matches found.\n".to_string();
    }
    let mark = |text: &str| match highlight {
        Some((regex, open, close)) => mark_matches(text, regex, open, close),
        None => text.to_string(),
    };

    let mut groups: IndexMap<(&str, &str), Vec<&SearchHit<'_>>> = IndexMap::new();
    for hit in hits {
        groups
            .entry((hit.category, hit.sub_category))
            .or_default()
            .push(hit);
    }

    let mut out = String::new();
    for ((category, sub_category), hits) in &groups {
        let _ = writeln!(&mut out, "{category} / {sub_category}");
        for hit in hits {
            let title = fit_width(&hit.bookmark.title, TITLE_WIDTH);
            let _ = writeln!(&mut out, "  {}", mark(&title));
            let _ = writeln!(
                &mut out,
                "      {}  [{}]",
                mark(&hit.bookmark.url),
                hit.bookmark.id
            );
        }
        out.push('\n');
    }
    out
}

pub fn list_library(storage: StorageHandle, args: ListArgs) -> Result<()> {
    let output = run_list(&storage, &args)?;
    print!("{output}");
    Ok(())
}

fn run_list(storage: &StorageHandle, args: &ListArgs) -> Result<String> {
    let library = storage.load_library().context("loading library")?;
    if library.is_empty() {
        return Ok("Library is empty. Import a browser export with `markshelf import <file>`.\n".to_string());
    }
    match args.category.as_deref() {
        Some(name) => {
            let category = library
                .category_named(name.trim())
                .with_context(|| format!("no category named '{}'", name.trim()))?;
            Ok(outline(std::slice::from_ref(category), &library.bookmarks))
        }
        None => {
            let summary = library.summary();
            let mut out = library.outline();
            let _ = writeln!(
                &mut out,
                "\n{} categor{}, {} sub-categor{}, {} bookmark{}",
                summary.categories,
                plural(summary.categories, "y", "ies"),
                summary.sub_categories,
                plural(summary.sub_categories, "y", "ies"),
                summary.bookmarks,
                plural(summary.bookmarks, "", "s"),
            );
            Ok(out)
        }
    }
}

pub fn add_bookmark(config: Arc<AppConfig>, storage: StorageHandle, args: AddArgs) -> Result<()> {
    let message = run_add(&config, &storage, args)?;
    println!("{message}");
    Ok(())
}

fn run_add(config: &AppConfig, storage: &StorageHandle, args: AddArgs) -> Result<String> {
    let url = args.url.trim();
    if url.is_empty() {
        bail!("bookmark URL cannot be empty");
    }
    let sub_name = args
        .sub
        .as_deref()
        .unwrap_or(&config.import.default_sub_category);
    let title = args
        .title
        .as_deref()
        .map(str::trim)
        .filter(|title| !title.is_empty())
        .unwrap_or(url);

    let mut library = storage.load_library().context("loading library")?;
    let sub_id = library.ensure_path(&args.category, sub_name, &mut UuidIds)?;
    if library.bookmarks_in(&sub_id).any(|bookmark| bookmark.url == url) {
        bail!("{url} is already saved in {} / {}", args.category.trim(), sub_name.trim());
    }
    let id = library.add_bookmark(&sub_id, title, url, &mut UuidIds)?;
    storage.save_library(&library).context("saving library")?;
    Ok(format!(
        "Added bookmark {id} to {} / {}",
        args.category.trim(),
        sub_name.trim()
    ))
}

pub fn remove_bookmark(storage: StorageHandle, args: RemoveArgs) -> Result<()> {
    let mut library = storage.load_library().context("loading library")?;
    let removed = library.remove_bookmark(args.id.trim())?;
    storage.save_library(&library).context("saving library")?;
    println!("Removed '{}' ({})", removed.title, removed.url);
    Ok(())
}

pub fn move_bookmark(config: Arc<AppConfig>, storage: StorageHandle, args: MoveArgs) -> Result<()> {
    let sub_name = args
        .sub
        .as_deref()
        .unwrap_or(&config.import.default_sub_category);
    let mut library = storage.load_library().context("loading library")?;
    if library.bookmark(args.id.trim()).is_none() {
        bail!("bookmark {} not found", args.id.trim());
    }
    let sub_id = library.ensure_path(&args.category, sub_name, &mut UuidIds)?;
    library.move_bookmark(args.id.trim(), &sub_id)?;
    storage.save_library(&library).context("saving library")?;
    println!(
        "Moved {} to {} / {}",
        args.id.trim(),
        args.category.trim(),
        sub_name.trim()
    );
    Ok(())
}

pub fn handle_category_command(storage: StorageHandle, args: CategoryArgs) -> Result<()> {
    let message = match args.command {
        CategoryCommand::Add(args) => category_add(&storage, args),
        CategoryCommand::Rename(args) => category_rename(&storage, args),
        CategoryCommand::Remove(args) => category_remove(&storage, args),
    }?;
    println!("{message}");
    Ok(())
}

fn category_add(storage: &StorageHandle, args: CategoryAddArgs) -> Result<String> {
    let mut library = storage.load_library().context("loading library")?;
    let id = library.add_category(&args.name, &mut UuidIds)?;
    storage.save_library(&library).context("saving library")?;
    Ok(format!("Created category '{}' ({id})", args.name.trim()))
}

fn category_rename(storage: &StorageHandle, args: CategoryRenameArgs) -> Result<String> {
    let from = args.from.trim();
    let mut library = storage.load_library().context("loading library")?;
    let id = library
        .category_named(from)
        .map(|category| category.id.clone())
        .with_context(|| format!("no category named '{from}'"))?;
    library.rename_category(&id, &args.to)?;
    storage.save_library(&library).context("saving library")?;
    Ok(format!("Renamed category '{from}' to '{}'", args.to.trim()))
}

fn category_remove(storage: &StorageHandle, args: CategoryRemoveArgs) -> Result<String> {
    let name = args.name.trim();
    let mut library = storage.load_library().context("loading library")?;
    let id = library
        .category_named(name)
        .map(|category| category.id.clone())
        .with_context(|| format!("no category named '{name}'"))?;
    let removed = library.remove_category(&id)?;
    storage.save_library(&library).context("saving library")?;
    Ok(format!(
        "Deleted category '{name}' (removed {removed} bookmark{})",
        plural(removed, "", "s")
    ))
}

pub fn show_history(storage: StorageHandle, args: HistoryArgs) -> Result<()> {
    let records = storage
        .recent_imports(args.limit)
        .context("loading import history")?;
    print!("{}", format_history(storage.database_path(), &records));
    Ok(())
}

fn format_history(database: &Path, records: &[ImportRecord]) -> String {
    if records.is_empty() {
        return format!("No imports recorded in {}.\n", database.display());
    }
    let mut out = format!("Imports recorded in {}\n", database.display());
    for record in records {
        let _ = writeln!(
            &mut out,
            "#{}  {}  {} ({})",
            record.id,
            format_timestamp(record.imported_at),
            record.source,
            record.format
        );
        let _ = writeln!(
            &mut out,
            "    +{} bookmarks, +{} categories, +{} sub-categories, {} duplicates skipped",
            record.bookmarks_added,
            record.categories_added,
            record.sub_categories_added,
            record.duplicates_skipped
        );
    }
    out
}

/// Cuts `text` to at most `max` terminal columns, marking the cut with an ellipsis.
fn fit_width(text: &str, max: usize) -> String {
    if UnicodeWidthStr::width(text) <= max {
        return text.to_string();
    }
    let budget = max.saturating_sub(1);
    let mut out = String::new();
    let mut width = 0;
    for ch in text.chars() {
        let ch_width = UnicodeWidthChar::width(ch).unwrap_or(0);
        if width + ch_width > budget {
            break;
        }
        width += ch_width;
        out.push(ch);
    }
    out.push('…');
    out
}

fn plural(count: usize, one: &'static str, many: &'static str) -> &'static str {
    if count == 1 {
        one
    } else {
        many
    }
}

fn format_timestamp(epoch: i64) -> String {
    OffsetDateTime::from_unix_timestamp(epoch)
        .map(|dt| dt.format(&Rfc3339).unwrap_or_else(|_| epoch.to_string()))
        .unwrap_or_else(|_| epoch.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{ConfigPaths, StorageOptions};
    use crate::storage;
    use tempfile::TempDir;

    type TestResult<T = ()> = Result<T>;

    const CHROME_EXPORT: &str = r#"<!DOCTYPE NETSCAPE-Bookmark-file-1>
<META HTTP-EQUIV="Content-Type" CONTENT="text/html; charset=UTF-8">
<TITLE>Bookmarks</TITLE>
<H1>Bookmarks</H1>
<DL><p>
    <DT><H3 ADD_DATE="1700000000" PERSONAL_TOOLBAR_FOLDER="true">Bookmarks bar</H3>
    <DL><p>
        <DT><A HREF="https://github.com/">GitHub</A>
        <DT><H3>Dev</H3>
        <DL><p>
            <DT><A HREF="https://doc.rust-lang.org/book/">The Rust Book</A>
            <DT><H3>Crates</H3>
            <DL><p>
                <DT><A HREF="https://docs.rs/serde">serde docs</A>
            </DL><p>
        </DL><p>
    </DL><p>
</DL><p>
"#;

    fn write_export(dir: &TempDir, name: &str, contents: &str) -> TestResult<PathBuf> {
        let path = dir.path().join(name);
        fs::write(&path, contents)?;
        Ok(path)
    }

    fn import_args(path: PathBuf, dry_run: bool) -> ImportArgs {
        ImportArgs {
            path,
            format: DocumentFormat::Auto,
            dry_run,
        }
    }

    #[test]
    fn cli_import_dry_run_leaves_library_untouched() -> TestResult {
        let (temp, storage) = setup_storage()?;
        let path = write_export(&temp, "chrome.html", CHROME_EXPORT)?;

        let output = run_import(&AppConfig::default(), &storage, &import_args(path, true))?;

        assert!(output.starts_with("Dry run:"));
        assert!(output.contains("3 bookmarks in 2 categories / 3 sub-categories"));
        assert!(output.contains("    serde docs  <https://docs.rs/serde>"));
        assert!(storage.load_library()?.is_empty());
        assert!(storage.recent_imports(5)?.is_empty());
        Ok(())
    }

    #[test]
    fn cli_reimport_skips_duplicates_and_logs_history() -> TestResult {
        let (temp, storage) = setup_storage()?;
        let path = write_export(&temp, "chrome.html", CHROME_EXPORT)?;
        let config = AppConfig::default();

        let first = run_import(&config, &storage, &import_args(path.clone(), false))?;
        assert!(first.starts_with("Imported 3 bookmarks"));
        let second = run_import(&config, &storage, &import_args(path, false))?;
        assert!(second.starts_with("Imported 0 bookmarks"));
        assert!(second.contains("3 duplicates skipped"));

        let library = storage.load_library()?;
        assert_eq!(library.summary().bookmarks, 3);
        assert_eq!(library.summary().categories, 2);

        let history = storage.recent_imports(5)?;
        assert_eq!(history.len(), 2);
        assert_eq!(history[0].duplicates_skipped, 3);
        assert_eq!(history[0].format, "html");
        let listing = format_history(storage.database_path(), &history);
        assert!(listing.starts_with("Imports recorded in "));
        assert!(listing.contains("markshelf.db"));
        assert!(listing.contains("chrome.html (html)"));
        Ok(())
    }

    #[test]
    fn cli_json_export_restores_into_fresh_store() -> TestResult {
        let (temp, storage) = setup_storage()?;
        let path = write_export(&temp, "chrome.html", CHROME_EXPORT)?;
        run_import(&AppConfig::default(), &storage, &import_args(path, false))?;
        let original = storage.load_library()?;

        let backup = render_library(&original, ExportFormat::Json)?;
        let backup_path = write_export(&temp, "backup.json", &backup)?;

        let (_other_temp, restored_storage) = setup_storage()?;
        run_import(
            &AppConfig::default(),
            &restored_storage,
            &import_args(backup_path, false),
        )?;
        let restored = restored_storage.load_library()?;
        assert_eq!(restored.outline(), original.outline());
        assert_eq!(restored_storage.recent_imports(1)?[0].format, "json");
        Ok(())
    }

    #[test]
    fn cli_import_rejects_documents_without_lists() -> TestResult {
        let (temp, storage) = setup_storage()?;
        let path = write_export(&temp, "notes.html", "<p>nothing here</p>")?;
        let err = run_import(&AppConfig::default(), &storage, &import_args(path, false))
            .unwrap_err();
        assert!(format!("{err:#}").contains("no bookmark list"));
        Ok(())
    }

    #[test]
    fn cli_search_groups_and_highlights() -> TestResult {
        let (temp, storage) = setup_storage()?;
        let path = write_export(&temp, "chrome.html", CHROME_EXPORT)?;
        run_import(&AppConfig::default(), &storage, &import_args(path, false))?;

        let args = SearchArgs {
            query: vec!["rust".into()],
            limit: 10,
        };
        let output = run_search(&AppConfig::default(), &storage, &args, Some(("[", "]")))?;
        assert!(output.starts_with("Dev / 默认\n"));
        assert!(output.contains("  The [Rust] Book\n"));
        assert!(output.contains("https://doc.[rust]-lang.org/book/"));
        assert!(!output.contains("GitHub"));

        let plain = run_search(&AppConfig::default(), &storage, &args, None)?;
        assert!(plain.contains("  The Rust Book\n"));

        let empty = SearchArgs {
            query: vec!["  ".into()],
            limit: 10,
        };
        assert!(run_search(&AppConfig::default(), &storage, &empty, None).is_err());
        Ok(())
    }

    #[test]
    fn cli_add_rejects_duplicate_urls() -> TestResult {
        let (_temp, storage) = setup_storage()?;
        let config = AppConfig::default();
        let args = AddArgs {
            url: "https://example.com".into(),
            category: "Reading".into(),
            sub: None,
            title: Some("  ".into()),
        };

        let message = run_add(&config, &storage, args.clone())?;
        assert!(message.ends_with("to Reading / 默认"));
        assert!(run_add(&config, &storage, args).is_err());

        let library = storage.load_library()?;
        assert_eq!(library.bookmarks.len(), 1);
        assert_eq!(library.bookmarks[0].title, "https://example.com");
        Ok(())
    }

    #[test]
    fn cli_category_rename_and_remove() -> TestResult {
        let (temp, storage) = setup_storage()?;
        let path = write_export(&temp, "chrome.html", CHROME_EXPORT)?;
        run_import(&AppConfig::default(), &storage, &import_args(path, false))?;

        category_rename(
            &storage,
            CategoryRenameArgs {
                from: "Dev".into(),
                to: "Programming".into(),
            },
        )?;
        let listing = run_list(
            &storage,
            &ListArgs {
                category: Some("Programming".into()),
            },
        )?;
        assert!(listing.starts_with("Programming\n"));
        assert!(!listing.contains("GitHub"));

        let message = category_remove(
            &storage,
            CategoryRemoveArgs {
                name: "Programming".into(),
            },
        )?;
        assert_eq!(message, "Deleted category 'Programming' (removed 2 bookmarks)");
        let library = storage.load_library()?;
        assert_eq!(library.bookmarks.len(), 1);
        assert!(library.category_named("Programming").is_none());
        Ok(())
    }

    #[test]
    fn fit_width_counts_terminal_columns() {
        assert_eq!(fit_width("short", 10), "short");
        assert_eq!(fit_width("abcdefghij", 5), "abcd…");
        assert_eq!(fit_width("未分类书签", 6), "未分…");
    }

    fn setup_storage() -> TestResult<(TempDir, StorageHandle)> {
        let temp = TempDir::new().context("creating temp dir")?;
        let root = temp.path();
        let paths = ConfigPaths {
            config_dir: root.join("config"),
            config_file: root.join("config/config.toml"),
            data_dir: root.join("data"),
            database_path: root.join("data/markshelf.db"),
        };
        let storage_opts = StorageOptions {
            database_path: paths.database_path.clone(),
            ..StorageOptions::default()
        };

        let handle = storage::init(&paths, &storage_opts)?;
        Ok((temp, handle))
    }
}
