use chrono::{DateTime, FixedOffset};

use super::{ChangeKind, CommitRecord, FileChangeRecord};
use crate::dataset::commands::LOG_RECORD_SEPARATOR;
use crate::error::{EngineError, Result};

const FIELD_COUNT: usize = 7;

/// Parse `git log` output produced with the engine's log format.
///
/// Records are separated by `0x1e` and keep the order git printed them in
/// (newest first). Only the body may contain `|`; it is the last field.
pub fn parse_log(output: &str) -> Result<Vec<CommitRecord>> {
    output
        .split(LOG_RECORD_SEPARATOR)
        .map(|record| record.trim_start_matches(['\n', '\r']))
        .filter(|record| !record.trim().is_empty())
        .map(parse_record)
        .collect()
}

fn parse_record(record: &str) -> Result<CommitRecord> {
    let fields: Vec<&str> = record.splitn(FIELD_COUNT, '|').collect();
    if fields.len() < FIELD_COUNT - 1 {
        return Err(EngineError::parse(
            "git log record",
            format!("expected {FIELD_COUNT} fields, got {}: {record:?}", fields.len()),
        ));
    }

    let timestamp = parse_timestamp(fields[4])?;
    Ok(CommitRecord {
        hash: fields[0].trim().to_string(),
        short_hash: fields[1].trim().to_string(),
        author_name: fields[2].to_string(),
        author_email: fields[3].to_string(),
        timestamp,
        subject: fields[5].to_string(),
        body: fields
            .get(6)
            .map(|b| b.trim_end().to_string())
            .unwrap_or_default(),
    })
}

pub fn parse_timestamp(raw: &str) -> Result<DateTime<FixedOffset>> {
    DateTime::parse_from_rfc3339(raw.trim())
        .map_err(|e| EngineError::parse("commit date", format!("{raw:?}: {e}")))
}

/// Parse `-z --name-status` output.
///
/// Fields are NUL-terminated: a status code, then one path, or two paths
/// (source, destination) for renames and copies. Paths arrive unquoted, so
/// non-ASCII names survive as-is.
pub fn parse_name_status(output: &str) -> Vec<FileChangeRecord> {
    let mut fields = output.split('\0');
    let mut changes = Vec::new();

    while let Some(field) = fields.next() {
        let code = field.trim();
        if code.is_empty() {
            continue;
        }
        let Some(first) = fields.next().map(str::to_string) else {
            break;
        };
        let (kind, path) = match code.chars().next() {
            Some('A') => (ChangeKind::Added, first),
            Some('M') => (ChangeKind::Modified, first),
            Some('D') => (ChangeKind::Deleted, first),
            Some('R') | Some('C') => {
                let Some(to) = fields.next().map(str::to_string) else {
                    break;
                };
                let kind = if code.starts_with('R') {
                    ChangeKind::Renamed { from: first }
                } else {
                    ChangeKind::Other {
                        code: code.to_string(),
                    }
                };
                (kind, to)
            }
            _ => (
                ChangeKind::Other {
                    code: code.to_string(),
                },
                first,
            ),
        };
        changes.push(FileChangeRecord {
            path,
            kind,
            size: None,
        });
    }
    changes
}
