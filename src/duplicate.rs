//! Duplicate-safe synthesis gating.
//!
//! Decides whether a candidate pair has already been synthesized into
//! the target group directory. Two authoritative checks, either
//! sufficient: a hash sidecar matching the combined digest of the
//! streams, or container tags matching the asset's identifier triple.
//! Filenames are deliberately not trusted; outputs may be renamed
//! between runs.

use crate::cache::locate::MediaPair;
use crate::hashing;
use cachemux_av::{ContainerTags, MuxTool};
use std::path::{Path, PathBuf};

/// Tolerance of the last-resort size heuristic.
const SIZE_TOLERANCE: u64 = 1024 * 1024;

/// Which evidence identified an existing output as the same synthesis.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DuplicateReason {
    /// A hash sidecar matched the combined stream digest.
    HashSidecar,
    /// Embedded container tags matched the identifier triple.
    ContainerTags,
    /// Sizes matched within tolerance; probabilistic, used only when
    /// the streams could not be hashed.
    SimilarSize,
}

/// Outcome of the duplicate check for one candidate pair.
#[derive(Debug)]
pub enum DuplicateCheck {
    /// An existing output covers this pair; skip synthesis.
    Duplicate {
        existing: PathBuf,
        reason: DuplicateReason,
    },
    /// No existing output matched. Carries the combined digest (when
    /// computable) so the orchestrator can persist it after muxing.
    Unique { combined_hash: Option<String> },
}

/// Scan `group_dir` for an output identical to the candidate pair.
pub fn check(
    group_dir: &Path,
    pair: &MediaPair,
    tags: &ContainerTags,
    mux: &dyn MuxTool,
) -> DuplicateCheck {
    let entries = match std::fs::read_dir(group_dir) {
        Ok(entries) => entries,
        Err(e) => {
            tracing::debug!("Group directory not readable yet ({e}); treating as unique");
            return DuplicateCheck::Unique {
                combined_hash: hashing::combined_hash(&pair.video, &pair.audio).ok(),
            };
        }
    };

    let outputs: Vec<PathBuf> = entries
        .filter_map(|e| e.ok())
        .map(|e| e.path())
        .filter(|p| {
            p.is_file()
                && p.extension()
                    .and_then(|ext| ext.to_str())
                    .map(|ext| ext.eq_ignore_ascii_case("mp4"))
                    .unwrap_or(false)
        })
        .collect();

    let combined_hash = match hashing::combined_hash(&pair.video, &pair.audio) {
        Ok(hash) => Some(hash),
        Err(e) => {
            tracing::warn!("Stream hashing unavailable, falling back to size heuristic: {e:#}");
            None
        }
    };

    let Some(hash) = &combined_hash else {
        // Last resort: report a probable duplicate on size alone.
        let expected = pair.combined_size();
        for output in &outputs {
            let size = std::fs::metadata(output).map(|m| m.len()).unwrap_or(0);
            if size.abs_diff(expected) <= SIZE_TOLERANCE {
                tracing::info!(
                    "Probable duplicate by size only ({} vs {} expected): {:?}",
                    size,
                    expected,
                    output
                );
                return DuplicateCheck::Duplicate {
                    existing: output.clone(),
                    reason: DuplicateReason::SimilarSize,
                };
            }
        }
        return DuplicateCheck::Unique {
            combined_hash: None,
        };
    };

    for output in &outputs {
        let sidecar = hashing::sidecar_path(output);
        if let Ok(recorded) = std::fs::read_to_string(&sidecar) {
            if recorded.trim() == hash.as_str() {
                tracing::info!("Duplicate by hash sidecar: {:?}", output);
                return DuplicateCheck::Duplicate {
                    existing: output.clone(),
                    reason: DuplicateReason::HashSidecar,
                };
            }
        }

        // Outputs predating hash sidecars still carry their identifier
        // triple as container tags.
        if !tags.is_empty() {
            match mux.read_tags(output) {
                Ok(existing_tags) if existing_tags == *tags => {
                    tracing::info!("Duplicate by container tags: {:?}", output);
                    return DuplicateCheck::Duplicate {
                        existing: output.clone(),
                        reason: DuplicateReason::ContainerTags,
                    };
                }
                Ok(_) => {}
                Err(e) => {
                    tracing::debug!("Could not read tags of {:?}: {}", output, e);
                }
            }
        }
    }

    DuplicateCheck::Unique { combined_hash }
}
