use std::collections::HashMap;

use regex::{Regex, RegexBuilder};

use crate::library::Library;
use crate::model::Bookmark;

/// Parsed search input. All values are lowercased; matching is case-insensitive.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SearchQuery {
    /// Must each occur in the title, URL or description.
    pub terms: Vec<String>,
    /// `title:` terms, must each occur in the title.
    pub title_terms: Vec<String>,
    /// `cat:` filters, matched against category and sub-category names.
    pub categories: Vec<String>,
    /// `site:` filters, matched against the URL host.
    pub sites: Vec<String>,
}

impl SearchQuery {
    pub fn has_terms(&self) -> bool {
        !self.terms.is_empty() || !self.title_terms.is_empty()
    }

    pub fn has_filters(&self) -> bool {
        !self.categories.is_empty() || !self.sites.is_empty()
    }

    pub fn highlight_terms(&self) -> Vec<&str> {
        self.terms
            .iter()
            .chain(&self.title_terms)
            .map(String::as_str)
            .collect()
    }
}

pub fn parse_query(input: &str) -> SearchQuery {
    let mut query = SearchQuery::default();
    for raw in input.split_whitespace() {
        let (target, value) = if let Some(value) = raw.strip_prefix("title:") {
            (&mut query.title_terms, value)
        } else if let Some(value) = raw.strip_prefix("cat:") {
            (&mut query.categories, value)
        } else if let Some(value) = raw.strip_prefix("site:") {
            (&mut query.sites, value)
        } else {
            (&mut query.terms, raw)
        };
        let value = value.trim_matches('"');
        if !value.is_empty() {
            target.push(value.to_lowercase());
        }
    }
    query
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SearchHit<'a> {
    pub bookmark: &'a Bookmark,
    pub category: &'a str,
    pub sub_category: &'a str,
}

/// Bookmarks matching every part of `query`, title hits ahead of URL or description
/// hits, otherwise in library order.
pub fn search<'a>(library: &'a Library, query: &SearchQuery, limit: usize) -> Vec<SearchHit<'a>> {
    let locations: HashMap<&str, (&str, &str)> = library
        .categories
        .iter()
        .flat_map(|category| {
            category
                .sub_categories
                .iter()
                .map(move |sub| (sub.id.as_str(), (category.name.as_str(), sub.name.as_str())))
        })
        .collect();

    let mut ranked: Vec<(bool, SearchHit<'a>)> = Vec::new();
    for bookmark in &library.bookmarks {
        let Some(&(category, sub_category)) = locations.get(bookmark.sub_category_id.as_str())
        else {
            continue;
        };
        if !matches_filters(query, bookmark, category, sub_category) {
            continue;
        }
        let title = bookmark.title.to_lowercase();
        if !query.title_terms.iter().all(|term| title.contains(term.as_str())) {
            continue;
        }
        let url = bookmark.url.to_lowercase();
        let description = bookmark
            .description
            .as_deref()
            .map(str::to_lowercase)
            .unwrap_or_default();
        let matches_term = |term: &String| {
            title.contains(term.as_str())
                || url.contains(term.as_str())
                || description.contains(term.as_str())
        };
        if !query.terms.iter().all(matches_term) {
            continue;
        }
        let title_hit = !query.title_terms.is_empty()
            || query.terms.iter().any(|term| title.contains(term.as_str()));
        ranked.push((
            title_hit,
            SearchHit {
                bookmark,
                category,
                sub_category,
            },
        ));
    }

    ranked.sort_by_key(|(title_hit, _)| !*title_hit);
    ranked.into_iter().take(limit).map(|(_, hit)| hit).collect()
}

fn matches_filters(query: &SearchQuery, bookmark: &Bookmark, category: &str, sub: &str) -> bool {
    if !query.categories.is_empty() {
        let category = category.to_lowercase();
        let sub = sub.to_lowercase();
        let in_category = query
            .categories
            .iter()
            .all(|wanted| category.contains(wanted.as_str()) || sub.contains(wanted.as_str()));
        if !in_category {
            return false;
        }
    }
    if !query.sites.is_empty() {
        let host = bookmark.host();
        if !query.sites.iter().all(|site| host.contains(site.as_str())) {
            return false;
        }
    }
    true
}

/// Case-insensitive alternation of `tokens`, longest first so overlapping tokens mark
/// the widest span.
pub fn build_highlight_regex(tokens: &[&str]) -> Option<Regex> {
    let mut unique: Vec<String> = tokens
        .iter()
        .filter(|token| !token.is_empty())
        .map(|token| token.to_lowercase())
        .collect();
    unique.sort_by(|a, b| b.len().cmp(&a.len()).then_with(|| a.cmp(b)));
    unique.dedup();
    if unique.is_empty() {
        return None;
    }
    let pattern = unique
        .iter()
        .map(|token| regex::escape(token))
        .collect::<Vec<_>>()
        .join("|");
    RegexBuilder::new(&pattern)
        .case_insensitive(true)
        .build()
        .ok()
}

/// Wraps every match of `regex` in `open`/`close`.
pub fn mark_matches(text: &str, regex: &Regex, open: &str, close: &str) -> String {
    regex
        .replace_all(text, |caps: &regex::Captures<'_>| format!("{open}{}{close}", &caps[0]))
        .into_owned()
}
