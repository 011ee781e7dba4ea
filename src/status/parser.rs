//! Pure parsers for status reports.
//!
//! # `datalad status` lines
//!
//! One entry per line, in the form
//!
//! ```text
//! <state>: <path> (<kind>)
//! ```
//!
//! where `<state>` is a lowercase word such as `modified`, `untracked`,
//! `deleted` or `added`, `<path>` is relative to the directory the command
//! ran in and may contain spaces, and the trailing parenthetical names the
//! entry kind (`file`, `directory`, `dataset`, `symlink`). The parenthetical
//! is optional. Blank lines and lines without a `state:` prefix are ignored.

use once_cell::sync::Lazy;
use regex::Regex;
use serde::Serialize;

static STATUS_LINE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^(?P<state>[a-z][a-z ]*?):\s+(?P<path>.+?)(?:\s+\((?P<kind>[^()]*)\))?\s*$")
        .expect("status line pattern is valid")
});

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum EntryState {
    Added,
    Modified,
    Deleted,
    Untracked,
    Clean,
    Other(String),
}

impl EntryState {
    fn parse(raw: &str) -> Self {
        match raw {
            "added" => Self::Added,
            "modified" => Self::Modified,
            "deleted" => Self::Deleted,
            "untracked" => Self::Untracked,
            "clean" => Self::Clean,
            other => Self::Other(other.to_string()),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum EntryKind {
    File,
    Directory,
    Dataset,
    Symlink,
    Other(String),
}

impl EntryKind {
    fn parse(raw: &str) -> Self {
        match raw {
            "file" => Self::File,
            "directory" => Self::Directory,
            "dataset" => Self::Dataset,
            "symlink" => Self::Symlink,
            other => Self::Other(other.to_string()),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StatusEntry {
    pub state: EntryState,
    pub path: String,
    pub kind: Option<EntryKind>,
}

impl StatusEntry {
    /// Last path component, as shown to users
    pub fn display_name(&self) -> String {
        display_name(&self.path)
    }
}

pub fn display_name(path: &str) -> String {
    path.trim_end_matches('/')
        .rsplit('/')
        .next()
        .unwrap_or(path)
        .to_string()
}

pub fn parse_status_line(line: &str) -> Option<StatusEntry> {
    let line = line.trim();
    if line.is_empty() {
        return None;
    }
    let caps = STATUS_LINE.captures(line)?;
    Some(StatusEntry {
        state: EntryState::parse(caps.name("state")?.as_str()),
        path: caps.name("path")?.as_str().to_string(),
        kind: caps.name("kind").map(|k| EntryKind::parse(k.as_str().trim())),
    })
}

pub fn parse_status_report(report: &str) -> Vec<StatusEntry> {
    report.lines().filter_map(parse_status_line).collect()
}

/// Entries reported as deleted
pub fn deleted_entries(report: &str) -> Vec<StatusEntry> {
    parse_status_report(report)
        .into_iter()
        .filter(|e| e.state == EntryState::Deleted)
        .collect()
}

/// Paths of nested datasets reported as modified, in report order
pub fn modified_datasets(report: &str) -> Vec<String> {
    parse_status_report(report)
        .into_iter()
        .filter(|e| e.state == EntryState::Modified && e.kind == Some(EntryKind::Dataset))
        .map(|e| e.path)
        .collect()
}
