//! Synthesis orchestration.
//!
//! Drives one full pass over the cache tree: repair fragments, walk
//! candidate directories, and for each one locate the pair, resolve
//! metadata, gate on the duplicate detector, and invoke the muxer.
//! Per-directory progression is
//! `Discovered → PairLocated → MetadataResolved → {Eligible |
//! SkippedIncomplete} → {DuplicateSkipped | Synthesized |
//! SynthesisFailed}`; terminal outcomes are never retried within a run.

use crate::cache;
use crate::config::{Config, NameClashPolicy};
use crate::duplicate::{self, DuplicateCheck};
use crate::hashing;
use crate::metadata::{self, AssetMetadata};
use crate::subtitle::{SubtitleFetcher, ASS_EXT};
use anyhow::Result;
use cachemux_av::{ContainerTags, MuxJob, MuxTool};
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

/// Container extension of synthesized outputs.
const OUTPUT_EXT: &str = "mp4";

/// Terminal state of one asset directory within a run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    /// The asset never finished caching; synthesis not attempted.
    SkippedIncomplete,
    /// An existing output already covers this pair.
    DuplicateSkipped,
    /// A new container file was produced.
    Synthesized(PathBuf),
    /// Pair location, metadata resolution, or muxing failed.
    SynthesisFailed,
}

/// Accumulated results of one walk-and-synthesize pass.
#[derive(Debug, Default)]
pub struct RunSummary {
    /// Outputs produced this run.
    pub produced: Vec<PathBuf>,
    /// Directories skipped because caching never completed.
    pub skipped_incomplete: Vec<PathBuf>,
    /// Directories whose output was not produced because of a failure.
    pub failed: Vec<PathBuf>,
    /// Directories gated out by the duplicate detector.
    pub duplicate_skips: usize,
    /// Fragments repaired during the discovery pass.
    pub repaired_fragments: usize,
    /// Wall-clock duration of the run.
    pub elapsed: Duration,
}

/// Sequences the full pipeline over one cache tree.
///
/// Configuration is immutable for the lifetime of the run; per-asset
/// state lives in short-lived values passed down the pipeline.
pub struct Synthesizer<'a, M: MuxTool> {
    config: &'a Config,
    muxer: &'a M,
    cache_root: PathBuf,
    output_dir: PathBuf,
    subtitles: SubtitleFetcher,
}

impl<'a, M: MuxTool> Synthesizer<'a, M> {
    pub fn new(config: &'a Config, cache_root: PathBuf, muxer: &'a M) -> Self {
        let output_dir = config
            .cache
            .output_dir
            .clone()
            .unwrap_or_else(|| cache_root.join(cache::OUTPUT_DIR_NAME));
        let subtitles = SubtitleFetcher::new(config.subtitles.clone());
        Self {
            config,
            muxer,
            cache_root,
            output_dir,
            subtitles,
        }
    }

    /// Where synthesized outputs land.
    pub fn output_dir(&self) -> &Path {
        &self.output_dir
    }

    /// Perform one full walk-and-synthesize pass.
    ///
    /// Only startup conditions (unreadable cache root) abort; everything
    /// per-directory is recorded in the summary and processing
    /// continues.
    pub fn run(&self) -> Result<RunSummary> {
        let started = Instant::now();
        let mut summary = RunSummary::default();

        tracing::info!("Searching {:?} for convertible fragments", self.cache_root);
        summary.repaired_fragments = cache::repair_all_fragments(&self.cache_root)?;

        let dirs = cache::candidate_dirs(&self.cache_root, &self.output_dir)?;
        tracing::info!("Found {} candidate asset directories", dirs.len());

        let mut failed_synthesis: Vec<PathBuf> = Vec::new();
        for dir in &dirs {
            // Directories without any descriptor are unrelated nesting
            // levels (e.g. a mobile media dir), not assets.
            if metadata::find_descriptor(dir).is_none() {
                continue;
            }
            if let Outcome::SynthesisFailed = self.process_dir(dir, &mut summary) {
                failed_synthesis.push(dir.clone());
            }
        }

        if self.config.output.collect_unmerged {
            for dir in &failed_synthesis {
                self.collect_unmerged(dir);
            }
        }

        summary.elapsed = started.elapsed();
        self.log_summary(&summary);

        if self.config.output.open_when_done && !summary.produced.is_empty() {
            open_folder(&self.output_dir);
        }

        Ok(summary)
    }

    /// Run one asset directory through the state machine.
    fn process_dir(&self, dir: &Path, summary: &mut RunSummary) -> Outcome {
        // Discovered → PairLocated
        let pair = match cache::locate::locate_pair(dir) {
            Ok(pair) => pair,
            Err(e) => {
                tracing::error!("No repaired audio/video pair: {e:#}");
                summary.failed.push(dir.to_path_buf());
                return Outcome::SynthesisFailed;
            }
        };

        // PairLocated → MetadataResolved
        let meta = match metadata::resolve(dir) {
            Ok(meta) => meta,
            Err(e) => {
                tracing::warn!("Skipping directory, metadata unavailable: {e:#}");
                summary.failed.push(dir.to_path_buf());
                return Outcome::SynthesisFailed;
            }
        };

        // MetadataResolved → Eligible | SkippedIncomplete
        if !meta.is_eligible() {
            tracing::warn!(
                "Not fully cached, skipping: {:?} ({}-{})",
                dir,
                meta.title,
                meta.owner_name
            );
            summary.skipped_incomplete.push(dir.to_path_buf());
            return Outcome::SkippedIncomplete;
        }

        // Subtitle retrieval is best-effort and independent of the
        // pair-location result.
        let subtitle = self.subtitles.fetch_for(&pair.video);

        let group_dir = self.output_dir.join(meta.group_dir_name());
        if let Err(e) = std::fs::create_dir_all(&group_dir) {
            tracing::error!("Cannot create output directory {:?}: {}", group_dir, e);
            summary.failed.push(dir.to_path_buf());
            return Outcome::SynthesisFailed;
        }

        let tags = ContainerTags {
            title: meta.group_id.clone(),
            artist: meta.uid.clone(),
            album: meta.item_id.to_string(),
        };

        // Eligible → DuplicateSkipped?
        let combined_hash = match duplicate::check(&group_dir, &pair, &tags, self.muxer) {
            DuplicateCheck::Duplicate { existing, reason } => {
                tracing::warn!("Skipping, identical output exists ({reason:?}): {:?}", existing);
                summary.duplicate_skips += 1;
                return Outcome::DuplicateSkipped;
            }
            DuplicateCheck::Unique { combined_hash } => combined_hash,
        };

        let (output, overwrite) = match self.resolve_output_name(&group_dir, &meta) {
            Some(resolved) => resolved,
            None => {
                summary.duplicate_skips += 1;
                return Outcome::DuplicateSkipped;
            }
        };

        // Eligible → Synthesized | SynthesisFailed
        let job = MuxJob {
            video: pair.video.clone(),
            audio: pair.audio.clone(),
            output: output.clone(),
            tags,
            copyright: meta.item_id.to_string(),
            overwrite,
        };
        if let Err(e) = self.muxer.mux(&job) {
            tracing::error!("Synthesis failed for {:?}: {}", output, e);
            summary.failed.push(dir.to_path_buf());
            return Outcome::SynthesisFailed;
        }

        self.persist_records(&output, combined_hash.as_deref(), subtitle.as_deref());

        tracing::info!("Synthesized {:?}", output);
        summary.produced.push(output.clone());
        Outcome::Synthesized(output)
    }

    /// Compute the output filename, applying the name-clash policy.
    ///
    /// The duplicate detector has already ruled the content distinct, so
    /// an existing file of the same name is a genuine collision:
    /// rename the new output with the item id, or overwrite. Returns
    /// None only when even the renamed path exists; nothing is ever
    /// silently replaced.
    fn resolve_output_name(&self, group_dir: &Path, meta: &AssetMetadata) -> Option<(PathBuf, bool)> {
        let title = if meta.title.is_empty() {
            meta.item_id.to_string()
        } else {
            meta.title.clone()
        };

        let output = group_dir.join(format!("{title}.{OUTPUT_EXT}"));
        if !output.exists() {
            return Some((output, self.config.output.overwrite));
        }

        match self.config.output.name_clash {
            NameClashPolicy::Overwrite => {
                tracing::warn!("Overwriting same-named output: {:?}", output);
                Some((output, true))
            }
            NameClashPolicy::Rename => {
                let renamed = group_dir.join(format!("{title}-{}.{OUTPUT_EXT}", meta.item_id));
                if renamed.exists() {
                    tracing::warn!(
                        "Both {:?} and {:?} exist, leaving them untouched",
                        output,
                        renamed
                    );
                    return None;
                }
                tracing::warn!("Name collision, writing {:?} instead", renamed);
                Some((renamed, self.config.output.overwrite))
            }
        }
    }

    /// Persist the duplicate record and the subtitle sidecar.
    fn persist_records(&self, output: &Path, hash: Option<&str>, subtitle: Option<&Path>) {
        if let Some(hash) = hash {
            let sidecar = hashing::sidecar_path(output);
            if let Err(e) = std::fs::write(&sidecar, hash) {
                tracing::warn!("Could not write hash sidecar {:?}: {}", sidecar, e);
            }
        }

        if let Some(ass) = subtitle {
            let dest = output.with_extension(ASS_EXT);
            if let Err(e) = std::fs::copy(ass, &dest) {
                tracing::warn!("Could not place subtitle sidecar {:?}: {}", dest, e);
            }
        }
    }

    /// Copy an unmuxed pair into the group's `unmerged` folder so the
    /// user still gets the streams when synthesis failed.
    fn collect_unmerged(&self, dir: &Path) {
        let (pair, meta) = match (cache::locate::locate_pair(dir), metadata::resolve(dir)) {
            (Ok(pair), Ok(meta)) => (pair, meta),
            _ => return,
        };
        if meta.title.is_empty() && meta.owner_name.is_empty() {
            tracing::warn!("No usable metadata, not collecting unmerged pair: {:?}", dir);
            return;
        }

        let unmerged = self.output_dir.join(meta.group_dir_name()).join("unmerged");
        if let Err(e) = std::fs::create_dir_all(&unmerged) {
            tracing::error!("Cannot create unmerged directory {:?}: {}", unmerged, e);
            return;
        }

        for (stream, label) in [(&pair.video, "video"), (&pair.audio, "audio")] {
            let ext = stream
                .extension()
                .map(|e| e.to_string_lossy().into_owned())
                .unwrap_or_default();
            let dest = unmerged.join(format!("{}_{label}.{ext}", meta.title));
            if dest.exists() {
                tracing::warn!("Unmerged copy already present, skipping: {:?}", dest);
                continue;
            }
            match std::fs::copy(stream, &dest) {
                Ok(_) => tracing::info!("Collected unmerged {label} stream: {:?}", dest),
                Err(e) => tracing::error!("Could not collect {:?}: {}", dest, e),
            }
        }
    }

    fn log_summary(&self, summary: &RunSummary) {
        if !summary.skipped_incomplete.is_empty() {
            tracing::info!(
                "Skipped (incomplete cache): {}",
                join_paths(&summary.skipped_incomplete)
            );
        }
        if !summary.failed.is_empty() {
            tracing::info!("Not produced (failures): {}", join_paths(&summary.failed));
        }
        if summary.produced.is_empty() {
            tracing::warn!("No files were synthesized");
        } else {
            tracing::info!("Output directory: {:?}", self.output_dir);
            tracing::info!("Synthesized files: {}", join_paths(&summary.produced));
        }
        tracing::info!(
            "Run complete: {} produced, {} duplicate-skipped, {} incomplete, {} failed in {:.1}s",
            summary.produced.len(),
            summary.duplicate_skips,
            summary.skipped_incomplete.len(),
            summary.failed.len(),
            summary.elapsed.as_secs_f64()
        );
    }
}

fn join_paths(paths: &[PathBuf]) -> String {
    paths
        .iter()
        .map(|p| p.display().to_string())
        .collect::<Vec<_>>()
        .join("\n")
}

/// Open the output directory in the platform file manager.
///
/// Fire-and-forget: the child is spawned and never awaited, and a
/// failure to spawn has no effect on the run result.
pub fn open_folder(dir: &Path) {
    #[cfg(target_os = "windows")]
    let program = "explorer";
    #[cfg(target_os = "macos")]
    let program = "open";
    #[cfg(not(any(target_os = "windows", target_os = "macos")))]
    let program = "xdg-open";

    if let Err(e) = std::process::Command::new(program).arg(dir).spawn() {
        tracing::debug!("Could not open output folder: {}", e);
    }
}
