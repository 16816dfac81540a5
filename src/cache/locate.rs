//! Media pair location.
//!
//! A pure traversal: find the single repaired video stream and the
//! single repaired audio stream belonging to one asset directory.
//! Subtitle retrieval is deliberately not done here; the orchestrator
//! decides that independently so the two concerns test in isolation.

use super::{AUDIO_STREAM_SUFFIX, VIDEO_STREAM_SUFFIX};
use anyhow::{bail, Result};
use std::path::{Path, PathBuf};

/// The located audio/video elementary stream pair for one asset.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MediaPair {
    pub video: PathBuf,
    pub audio: PathBuf,
}

impl MediaPair {
    /// Combined on-disk size of both streams, zero for unreadable files.
    pub fn combined_size(&self) -> u64 {
        let size = |p: &Path| std::fs::metadata(p).map(|m| m.len()).unwrap_or(0);
        size(&self.video) + size(&self.audio)
    }
}

/// Recursively search `dir` for exactly one video and one audio stream.
///
/// Mobile clients nest the media directory one level deeper than
/// desktop clients, so a complete pair found in a subdirectory wins.
/// Fails with a pair-not-found condition when either stream is absent.
pub fn locate_pair(dir: &Path) -> Result<MediaPair> {
    match search(dir)? {
        (Some(video), Some(audio)) => Ok(MediaPair { video, audio }),
        _ => bail!("No repaired audio/video pair in {:?}", dir),
    }
}

fn search(dir: &Path) -> Result<(Option<PathBuf>, Option<PathBuf>)> {
    let mut video = None;
    let mut audio = None;

    for entry in std::fs::read_dir(dir)? {
        let entry = entry?;
        let path = entry.path();

        if path.is_dir() {
            if let Ok((Some(v), Some(a))) = search(&path) {
                return Ok((Some(v), Some(a)));
            }
            continue;
        }

        let name = entry.file_name();
        let name = name.to_string_lossy();
        if name.ends_with(VIDEO_STREAM_SUFFIX) {
            video = Some(path);
        } else if name.ends_with(AUDIO_STREAM_SUFFIX) {
            audio = Some(path);
        }
    }

    Ok((video, audio))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn finds_pair_in_flat_dir() {
        let tmp = tempfile::tempdir().unwrap();
        let video = tmp.path().join("30080-video.mp4");
        let audio = tmp.path().join("30280-audio.mp3");
        std::fs::write(&video, b"v").unwrap();
        std::fs::write(&audio, b"a").unwrap();

        let pair = locate_pair(tmp.path()).unwrap();
        assert_eq!(pair.video, video);
        assert_eq!(pair.audio, audio);
        assert_eq!(pair.combined_size(), 2);
    }

    #[test]
    fn finds_pair_in_nested_media_dir() {
        let tmp = tempfile::tempdir().unwrap();
        let media = tmp.path().join("80");
        std::fs::create_dir(&media).unwrap();
        std::fs::write(media.join("video-video.mp4"), b"v").unwrap();
        std::fs::write(media.join("audio-audio.mp3"), b"a").unwrap();

        let pair = locate_pair(tmp.path()).unwrap();
        assert!(pair.video.starts_with(&media));
        assert!(pair.audio.starts_with(&media));
    }

    #[test]
    fn half_pair_is_not_found() {
        let tmp = tempfile::tempdir().unwrap();
        std::fs::write(tmp.path().join("30080-video.mp4"), b"v").unwrap();

        assert!(locate_pair(tmp.path()).is_err());
    }

    #[test]
    fn empty_dir_is_not_found() {
        let tmp = tempfile::tempdir().unwrap();
        assert!(locate_pair(tmp.path()).is_err());
    }
}
