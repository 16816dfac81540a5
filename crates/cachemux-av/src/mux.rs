//! Container muxing through GPAC's MP4Box.

use crate::info::{self, ContainerTags};
use crate::{tools, Error, Result};
use std::path::{Path, PathBuf};
use std::process::Command;

/// One muxing request: join a repaired video/audio pair into a container
/// file, embedding the identifying tags.
#[derive(Debug, Clone)]
pub struct MuxJob {
    /// Repaired video elementary stream.
    pub video: PathBuf,
    /// Repaired audio elementary stream.
    pub audio: PathBuf,
    /// Destination container path.
    pub output: PathBuf,
    /// Identifying tags embedded for later duplicate detection.
    pub tags: ContainerTags,
    /// Copyright string (the numeric item id).
    pub copyright: String,
    /// Pass `-force` so an existing output is replaced.
    pub overwrite: bool,
}

/// Seam between the engine and the external container tool.
///
/// The engine never spawns MP4Box directly; tests substitute a stub
/// implementation that writes deterministic bytes.
pub trait MuxTool {
    /// Join the pair described by `job` into `job.output`.
    fn mux(&self, job: &MuxJob) -> Result<()>;

    /// Read the embedded metadata tags of an existing container file.
    fn read_tags(&self, path: &Path) -> Result<ContainerTags>;
}

/// The real MP4Box-backed implementation.
#[derive(Debug, Clone)]
pub struct Mp4Box {
    executable: PathBuf,
}

impl Mp4Box {
    /// Wrap an already-resolved MP4Box path.
    pub fn new(executable: PathBuf) -> Self {
        Self { executable }
    }

    /// Locate MP4Box, preferring a configured path over PATH lookup.
    pub fn locate(configured: Option<&Path>) -> Result<Self> {
        let executable = tools::get_tool_path("MP4Box", configured)
            .or_else(|_| tools::require_tool("mp4box"))?;
        Ok(Self { executable })
    }

    /// Path of the wrapped executable.
    pub fn executable(&self) -> &Path {
        &self.executable
    }

    fn run_info(&self, path: &Path) -> Result<String> {
        if !path.exists() {
            return Err(Error::file_not_found(path));
        }
        let result = Command::new(&self.executable)
            .arg("-info")
            .arg(path)
            .output()
            .map_err(|e| {
                if e.kind() == std::io::ErrorKind::NotFound {
                    Error::tool_not_found("MP4Box")
                } else {
                    Error::Io(e)
                }
            })?;

        // The report goes to stderr on some GPAC builds, stdout on others.
        let mut report = String::from_utf8_lossy(&result.stdout).to_string();
        report.push_str(&String::from_utf8_lossy(&result.stderr));

        if !result.status.success() {
            return Err(Error::tool_failed("MP4Box", report));
        }
        Ok(report)
    }
}

impl MuxTool for Mp4Box {
    fn mux(&self, job: &MuxJob) -> Result<()> {
        let mut cmd = Command::new(&self.executable);
        if job.overwrite {
            cmd.arg("-force");
        }
        cmd.arg("-charset").arg("utf8");
        if !job.tags.is_empty() {
            cmd.arg("-tags").arg(job.tags.to_mp4box_arg());
        }
        cmd.arg("-cprt")
            .arg(&job.copyright)
            .arg("-add")
            .arg(format!("{}#video", job.video.display()))
            .arg("-add")
            .arg(format!("{}#audio", job.audio.display()))
            .arg("-new")
            .arg(&job.output);

        tracing::debug!("invoking muxer: {:?}", cmd);

        // Blocking child-process call; stdout/stderr are fully captured so
        // the child can never stall on a full pipe.
        let result = cmd.output().map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                Error::tool_not_found("MP4Box")
            } else {
                Error::Io(e)
            }
        })?;

        if !result.status.success() {
            let mut combined = String::from_utf8_lossy(&result.stdout).to_string();
            combined.push_str(&String::from_utf8_lossy(&result.stderr));
            return Err(Error::tool_failed("MP4Box", combined));
        }

        Ok(())
    }

    fn read_tags(&self, path: &Path) -> Result<ContainerTags> {
        let report = self.run_info(path)?;
        Ok(info::parse_tags(&report))
    }
}
