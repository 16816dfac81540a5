//! Cache tree discovery.
//!
//! The streaming client leaves one directory per cached asset somewhere
//! under its cache root. Desktop builds keep fragments directly in the
//! asset directory next to a `.playurl` descriptor; mobile builds nest
//! them one level deeper (an `80/` media directory under the asset
//! directory, with `entry.json` at the asset level).

pub mod locate;
pub mod repair;

use anyhow::{Context, Result};
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

/// Raw fragment extension as written by the client.
pub const M4S_SUFFIX: &str = "m4s";

/// Suffix of a repaired video elementary stream.
pub const VIDEO_STREAM_SUFFIX: &str = "-video.mp4";

/// Suffix of a repaired audio elementary stream.
pub const AUDIO_STREAM_SUFFIX: &str = "-audio.mp3";

/// Mobile-client descriptor kept at the asset level.
pub const ENTRY_JSON: &str = "entry.json";

/// Descriptor filenames, in lookup order: primary, legacy, mobile.
pub const DESCRIPTOR_NAMES: &[&str] = &["videoInfo.json", ".videoInfo", ENTRY_JSON];

/// Stream-id descriptor next to desktop fragments.
pub const PLAYURL_NAME: &str = ".playurl";

/// Mobile-client comment stream kept at the asset level.
pub const DANMAKU_XML: &str = "danmaku.xml";

/// Name of the synthesis output directory under the cache root.
pub const OUTPUT_DIR_NAME: &str = "output";

/// True if `path` names a raw `.m4s` fragment.
pub fn is_fragment(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| ext.eq_ignore_ascii_case(M4S_SUFFIX))
        .unwrap_or(false)
}

/// True if `dir` directly holds one of the known descriptor files.
pub fn has_descriptor(dir: &Path) -> bool {
    DESCRIPTOR_NAMES.iter().any(|name| dir.join(name).exists())
}

/// Enumerate candidate asset directories under the cache root.
///
/// Every subdirectory is a candidate except the engine's own output
/// tree. When the root has no subdirectories at all but itself carries a
/// descriptor, the root is the single candidate (the user pointed us at
/// one asset directory rather than the cache root).
pub fn candidate_dirs(cache_root: &Path, output_dir: &Path) -> Result<Vec<PathBuf>> {
    // An unreadable root is fatal to the run.
    std::fs::read_dir(cache_root)
        .with_context(|| format!("Failed to read cache root: {:?}", cache_root))?;

    let mut dirs = Vec::new();
    for entry in WalkDir::new(cache_root).into_iter().filter_map(|e| e.ok()) {
        let path = entry.path();
        if !entry.file_type().is_dir() || path == cache_root {
            continue;
        }
        if path.starts_with(output_dir) {
            continue;
        }
        dirs.push(path.to_path_buf());
    }

    if dirs.is_empty() && has_descriptor(cache_root) {
        dirs.push(cache_root.to_path_buf());
    }

    Ok(dirs)
}

/// Walk the cache tree and repair every fragment into an elementary
/// stream. Returns the number of repaired fragments.
///
/// A fragment that fails to classify or repair is reported and skipped;
/// only an unreadable tree aborts the pass.
pub fn repair_all_fragments(cache_root: &Path) -> Result<usize> {
    // Readability check up front so walkdir errors deeper in the tree
    // stay per-fragment.
    std::fs::read_dir(cache_root)
        .with_context(|| format!("Failed to read cache root: {:?}", cache_root))?;

    let mut repaired = 0;
    for entry in WalkDir::new(cache_root).into_iter().filter_map(|e| e.ok()) {
        let path = entry.path();
        if !entry.file_type().is_file() || !is_fragment(path) {
            continue;
        }

        let role = match repair::classify_fragment(path) {
            Some(role) => role,
            None => {
                tracing::warn!("Could not classify fragment, skipping: {:?}", path);
                continue;
            }
        };

        let dst = repair::repaired_path(path, role);
        match repair::repair_fragment(path, &dst) {
            Ok(()) => {
                tracing::info!("Repaired {:?} fragment: {:?}", role, dst);
                repaired += 1;
            }
            Err(e) => {
                tracing::error!("Fragment repair failed for {:?}: {:#}", path, e);
            }
        }
    }

    Ok(repaired)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fragment_extension_detection() {
        assert!(is_fragment(Path::new("30080.m4s")));
        assert!(is_fragment(Path::new("/cache/123/30280.M4S")));
        assert!(!is_fragment(Path::new("video.mp4")));
        assert!(!is_fragment(Path::new("m4s")));
    }

    #[test]
    fn candidate_dirs_excludes_output() {
        let tmp = tempfile::tempdir().unwrap();
        let root = tmp.path();
        std::fs::create_dir_all(root.join("123")).unwrap();
        std::fs::create_dir_all(root.join("456/80")).unwrap();
        std::fs::create_dir_all(root.join("output/Show-Studio")).unwrap();

        let dirs = candidate_dirs(root, &root.join("output")).unwrap();
        assert!(dirs.contains(&root.join("123")));
        assert!(dirs.contains(&root.join("456")));
        assert!(dirs.contains(&root.join("456/80")));
        assert!(!dirs.iter().any(|d| d.starts_with(root.join("output"))));
    }

    #[test]
    fn bare_root_with_descriptor_is_candidate() {
        let tmp = tempfile::tempdir().unwrap();
        let root = tmp.path();
        std::fs::write(root.join("videoInfo.json"), "{}").unwrap();

        let dirs = candidate_dirs(root, &root.join("output")).unwrap();
        assert_eq!(dirs, vec![root.to_path_buf()]);
    }

    #[test]
    fn unreadable_root_is_fatal() {
        let err = candidate_dirs(Path::new("/no/such/cache"), Path::new("/no/such/cache/output"));
        assert!(err.is_err());
    }
}
