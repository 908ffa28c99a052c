//! Literal text search for InkEdit.
//!
//! `search_text` scans one buffer line by line; `search_tree` walks a folder
//! through the host filesystem, pruning hidden and build/dependency folders and
//! skipping binary formats by extension. `SearchReport` groups the flat match
//! list by file for result panels and the CLI.

mod walk;

use std::path::PathBuf;

use regex::{Regex, RegexBuilder};
use thiserror::Error;

pub use walk::{is_binary_file, search_tree, should_skip_entry, BINARY_EXTENSIONS, SKIPPED_DIRS};

/// Error conditions raised by the search engine.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum SearchError {
    #[error("invalid pattern: {0}")]
    InvalidPattern(String),
}

/// One occurrence inside a single buffer. Columns are character offsets into
/// `line_text`, half-open.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct LineMatch {
    pub line_number: usize,
    pub line_text: String,
    pub match_start: usize,
    pub match_end: usize,
}

/// One occurrence inside a file of a workspace search.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SearchMatch {
    pub file_path: PathBuf,
    pub file_name: String,
    pub line_number: usize,
    pub line_text: String,
    pub match_start: usize,
    pub match_end: usize,
}

impl SearchMatch {
    pub fn from_line(file_path: PathBuf, line: LineMatch) -> Self {
        let file_name = file_path
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_else(|| file_path.display().to_string());
        Self {
            file_path,
            file_name,
            line_number: line.line_number,
            line_text: line.line_text,
            match_start: line.match_start,
            match_end: line.match_end,
        }
    }
}

/// Returns `true` when a query should clear results instead of searching.
pub fn is_blank_query(query: &str) -> bool {
    query.trim().is_empty()
}

/// Finds every non-overlapping, case-sensitive, literal occurrence of `query`,
/// left to right within each line. An empty query yields no matches.
pub fn search_text(content: &str, query: &str) -> Result<Vec<LineMatch>, SearchError> {
    if query.is_empty() {
        return Ok(Vec::new());
    }
    let regex = build_literal(query)?;
    let mut matches = Vec::new();
    for (index, raw_line) in content.split('\n').enumerate() {
        let line = raw_line.strip_suffix('\r').unwrap_or(raw_line);
        for found in regex.find_iter(line) {
            let match_start = line[..found.start()].chars().count();
            let match_end = match_start + found.as_str().chars().count();
            matches.push(LineMatch {
                line_number: index + 1,
                line_text: line.to_string(),
                match_start,
                match_end,
            });
        }
    }
    Ok(matches)
}

fn build_literal(query: &str) -> Result<Regex, SearchError> {
    RegexBuilder::new(&regex::escape(query))
        .case_insensitive(false)
        .build()
        .map_err(|err| SearchError::InvalidPattern(err.to_string()))
}

/// Summary of search results, used for UI counters.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct SearchSummary {
    pub total_matches: usize,
    pub files_with_matches: usize,
}

/// All matches of one file, in line order.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct FileMatches {
    pub file_path: PathBuf,
    pub file_name: String,
    pub matches: Vec<SearchMatch>,
}

/// Workspace results grouped by file, in discovery order.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct SearchReport {
    pub query: String,
    pub files: Vec<FileMatches>,
    pub total_matches: usize,
}

impl SearchReport {
    pub fn new(query: impl Into<String>, matches: Vec<SearchMatch>) -> Self {
        let total_matches = matches.len();
        let mut files: Vec<FileMatches> = Vec::new();
        for found in matches {
            match files.last_mut() {
                Some(group) if group.file_path == found.file_path => group.matches.push(found),
                _ => files.push(FileMatches {
                    file_path: found.file_path.clone(),
                    file_name: found.file_name.clone(),
                    matches: vec![found],
                }),
            }
        }
        Self {
            query: query.into(),
            files,
            total_matches,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.total_matches == 0
    }

    /// Returns a compact summary with aggregate statistics.
    pub fn summary(&self) -> SearchSummary {
        SearchSummary {
            total_matches: self.total_matches,
            files_with_matches: self.files.len(),
        }
    }

    /// Matches in the original flat order.
    pub fn matches(&self) -> impl Iterator<Item = &SearchMatch> {
        self.files.iter().flat_map(|group| group.matches.iter())
    }
}
