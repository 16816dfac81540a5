//! Per-asset metadata resolution.
//!
//! Three descriptor schema variants exist on disk: the primary
//! `videoInfo.json`, the legacy `.videoInfo`, and the mobile client's
//! `entry.json`. They disagree on field names, so every logical field is
//! resolved through an ordered list of JSON paths where the first
//! non-empty match wins.

mod sanitize;

pub use sanitize::sanitize;

use crate::cache::DESCRIPTOR_NAMES;
use anyhow::{Context, Result};
use serde_json::Value;
use std::path::{Path, PathBuf};

/// Status values that mark an asset as fully cached. An absent or empty
/// status also counts as complete (legacy descriptors omit it).
const COMPLETED_STATUSES: &[&str] = &["completed", "视频已缓存完成"];

/// True when a raw status string marks a finished download.
pub fn status_is_complete(status: &str) -> bool {
    status.is_empty() || COMPLETED_STATUSES.contains(&status)
}

/// One logical field and its fallback chain of JSON paths.
struct FieldSpec {
    paths: &'static [&'static [&'static str]],
}

const GROUP_TITLE: FieldSpec = FieldSpec {
    paths: &[&["groupTitle"], &["owner_name"]],
};
const TITLE: FieldSpec = FieldSpec {
    paths: &[&["page_data", "download_subtitle"], &["title"]],
};
const OWNER_NAME: FieldSpec = FieldSpec {
    paths: &[&["uname"], &["title"]],
};
const STATUS: FieldSpec = FieldSpec {
    paths: &[&["status"], &["page_data", "download_title"]],
};
const GROUP_ID: FieldSpec = FieldSpec {
    paths: &[&["groupId"], &["season_id"]],
};
const UID: FieldSpec = FieldSpec {
    paths: &[&["uid"], &["owner_id"]],
};
const ITEM_ID: FieldSpec = FieldSpec {
    paths: &[&["itemId"], &["owner_id"]],
};

/// Canonical metadata record for one asset directory.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AssetMetadata {
    pub group_title: String,
    pub title: String,
    pub owner_name: String,
    pub status: String,
    pub item_id: i64,
    pub group_id: String,
    pub uid: String,
}

impl AssetMetadata {
    /// Whether the asset finished caching and may be synthesized.
    pub fn is_eligible(&self) -> bool {
        status_is_complete(&self.status)
    }

    /// Output subdirectory name: `<groupTitle>-<ownerName>`.
    pub fn group_dir_name(&self) -> String {
        format!("{}-{}", self.group_title, self.owner_name)
    }
}

/// Find the descriptor file of an asset directory, trying the known
/// filenames in order. None means the directory is skipped.
pub fn find_descriptor(dir: &Path) -> Option<PathBuf> {
    DESCRIPTOR_NAMES
        .iter()
        .map(|name| dir.join(name))
        .find(|p| p.exists())
}

/// Resolve the canonical metadata of one asset directory.
///
/// Errors here are per-directory recoverable: a missing descriptor or a
/// JSON parse failure skips the directory, never the run.
pub fn resolve(dir: &Path) -> Result<AssetMetadata> {
    let descriptor =
        find_descriptor(dir).with_context(|| format!("No descriptor file in {:?}", dir))?;

    let bytes = std::fs::read(&descriptor)
        .with_context(|| format!("Failed to read descriptor: {:?}", descriptor))?;
    let json: Value = serde_json::from_slice(&bytes)
        .with_context(|| format!("Failed to parse descriptor: {:?}", descriptor))?;

    Ok(resolve_from_json(&json))
}

/// Resolve all fields from parsed descriptor JSON.
pub fn resolve_from_json(json: &Value) -> AssetMetadata {
    AssetMetadata {
        group_title: resolve_string(json, &GROUP_TITLE),
        title: resolve_string(json, &TITLE),
        owner_name: resolve_string(json, &OWNER_NAME),
        status: resolve_string(json, &STATUS),
        item_id: resolve_int(json, &ITEM_ID),
        group_id: resolve_string(json, &GROUP_ID),
        uid: resolve_string(json, &UID),
    }
}

/// First non-empty match wins; the result passes the filename sanitizer.
fn resolve_string(json: &Value, spec: &FieldSpec) -> String {
    for path in spec.paths {
        let s = sanitize(&string_at(json, path));
        if !s.is_empty() {
            return s;
        }
    }
    String::new()
}

/// Integer chain: the primary path falls through when zero or unparsable.
fn resolve_int(json: &Value, spec: &FieldSpec) -> i64 {
    for path in spec.paths {
        match value_at(json, path) {
            Some(Value::Number(n)) => {
                if let Some(i) = n.as_i64() {
                    if i != 0 {
                        return i;
                    }
                }
            }
            Some(Value::String(s)) => {
                if let Ok(i) = s.parse::<i64>() {
                    if i != 0 {
                        return i;
                    }
                }
            }
            _ => {}
        }
    }
    0
}

fn value_at<'a>(json: &'a Value, path: &[&str]) -> Option<&'a Value> {
    let mut current = json;
    for key in path {
        current = current.get(key)?;
    }
    Some(current)
}

fn string_at(json: &Value, path: &[&str]) -> String {
    match value_at(json, path) {
        Some(Value::String(s)) => s.clone(),
        Some(Value::Number(n)) => n.to_string(),
        _ => String::new(),
    }
}
