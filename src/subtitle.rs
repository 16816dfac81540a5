//! Best-effort subtitle retrieval.
//!
//! Each asset may have a raw fragment-timed comment stream (XML) either
//! cached locally or fetchable from one of two endpoints keyed by the
//! numeric content id in the asset directory name. The XML is handed to
//! an external converter that produces a presentation `.ass` file.
//! Every step here is single-attempt and warn-only: subtitle
//! unavailability never blocks media synthesis.

use crate::config::SubtitleConfig;
use anyhow::{Context, Result};
use std::path::{Path, PathBuf};
use std::process::Command;

/// Comment-stream XML extension.
const XML_EXT: &str = "xml";

/// Converted presentation-subtitle extension.
pub const ASS_EXT: &str = "ass";

fn comment_url(cid: &str) -> String {
    format!("https://comment.bilibili.com/{cid}.xml")
}

fn list_url(cid: &str) -> String {
    format!("https://api.bilibili.com/x/v1/dm/list.so?oid={cid}")
}

/// Retrieves and converts comment streams for located media pairs.
pub struct SubtitleFetcher {
    config: SubtitleConfig,
    client: reqwest::blocking::Client,
}

impl SubtitleFetcher {
    pub fn new(config: SubtitleConfig) -> Self {
        Self {
            config,
            client: reqwest::blocking::Client::new(),
        }
    }

    /// Fetch and convert the comment stream matching a located video.
    ///
    /// Returns the converted `.ass` path, or None when the stream is
    /// unavailable or conversion is not configured. Never errors.
    pub fn fetch_for(&self, video: &Path) -> Option<PathBuf> {
        if !self.config.enabled {
            return None;
        }

        let xml = match local_comment_stream(video) {
            Some(local) => local,
            None => {
                let (cid, dest) = download_target(video)?;
                match self.download(&cid, &dest) {
                    Ok(()) => dest,
                    Err(e) => {
                        tracing::warn!("Comment stream download failed for cid {cid}: {e:#}");
                        return None;
                    }
                }
            }
        };

        self.convert(&xml)
    }

    /// Try both endpoints in sequence, single attempt each.
    fn download(&self, cid: &str, dest: &Path) -> Result<()> {
        let primary = comment_url(cid);
        match self.download_one(&primary, dest) {
            Ok(()) => return Ok(()),
            Err(e) => {
                tracing::warn!("Primary comment endpoint failed: {e:#}");
            }
        }
        self.download_one(&list_url(cid), dest)
    }

    fn download_one(&self, url: &str, dest: &Path) -> Result<()> {
        let response = self
            .client
            .get(url)
            .send()
            .with_context(|| format!("Request failed: {url}"))?
            .error_for_status()
            .with_context(|| format!("Bad status from {url}"))?;
        let bytes = response.bytes().context("Failed to read response body")?;
        if bytes.is_empty() {
            anyhow::bail!("Empty response from {url}");
        }
        std::fs::write(dest, &bytes)
            .with_context(|| format!("Failed to write comment stream: {:?}", dest))?;
        Ok(())
    }

    /// Run the external XML-to-ASS converter over one comment stream.
    fn convert(&self, xml: &Path) -> Option<PathBuf> {
        let converter = match &self.config.converter {
            Some(c) => c,
            None => {
                tracing::debug!("No subtitle converter configured, keeping raw XML: {:?}", xml);
                return None;
            }
        };

        let ass = xml.with_extension(ASS_EXT);
        let result = Command::new(converter).arg(xml).output();
        match result {
            Ok(output) if output.status.success() && file_size(&ass) > 0 => Some(ass),
            Ok(output) => {
                tracing::warn!(
                    "Subtitle conversion failed for {:?}: {}",
                    xml,
                    String::from_utf8_lossy(&output.stderr)
                );
                None
            }
            Err(e) => {
                tracing::warn!("Could not run subtitle converter {:?}: {}", converter, e);
                None
            }
        }
    }
}

/// Locate an already-cached comment stream for a video, if any.
///
/// Desktop layout: `<asset dir>/<dirname>.xml` where the directory name
/// is the content id. Mobile layout: the media directory is a short
/// numeric quality label (e.g. `80`), and `danmaku.xml` sits at the
/// asset level one up.
pub fn local_comment_stream(video: &Path) -> Option<PathBuf> {
    let dir = video.parent()?;
    let dir_name = dir.file_name()?.to_string_lossy();

    if dir_name.len() < 6 {
        let danmaku = dir.parent()?.join(crate::cache::DANMAKU_XML);
        if file_size(&danmaku) > 0 {
            return Some(danmaku);
        }
        return None;
    }

    let xml = dir.join(format!("{dir_name}.{XML_EXT}"));
    if file_size(&xml) > 0 {
        return Some(xml);
    }
    None
}

/// Where a downloaded comment stream should land, and the content id to
/// fetch it by. None for the mobile layout (no id in the path).
fn download_target(video: &Path) -> Option<(String, PathBuf)> {
    let dir = video.parent()?;
    let dir_name = dir.file_name()?.to_string_lossy().into_owned();
    if dir_name.len() < 6 || !dir_name.chars().all(|c| c.is_ascii_digit()) {
        return None;
    }
    let dest = dir.join(format!("{dir_name}.{XML_EXT}"));
    Some((dir_name, dest))
}

fn file_size(path: &Path) -> u64 {
    std::fs::metadata(path).map(|m| m.len()).unwrap_or(0)
}
