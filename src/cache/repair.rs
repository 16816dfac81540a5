//! Fragment header repair and stream-role classification.
//!
//! Raw cache fragments are sometimes prefixed with a nine-byte padding
//! marker (ASCII `0` repeated) that must not appear in the reconstructed
//! elementary stream, and sometimes carry real stream data in those same
//! nine bytes. The repairer detects which case it is looking at instead
//! of assuming one.

use super::{AUDIO_STREAM_SUFFIX, VIDEO_STREAM_SUFFIX};
use anyhow::{Context, Result};
use std::fs::File;
use std::io::{self, BufReader, BufWriter, Read, Write};
use std::path::{Path, PathBuf};

/// The synthetic placeholder prefix.
pub const SYNTHETIC_HEADER: [u8; 9] = *b"000000000";

/// Which elementary stream a fragment belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StreamRole {
    Video,
    Audio,
}

/// Produce an elementary stream from a raw fragment.
///
/// Reads the first nine bytes of `src`; if they are exactly the
/// synthetic placeholder they are omitted from `dst`, otherwise they are
/// copied verbatim. The remainder is streamed byte-for-byte. A source
/// shorter than nine bytes, or any I/O failure, fails this fragment's
/// repair.
pub fn repair_fragment(src: &Path, dst: &Path) -> Result<()> {
    let file = File::open(src).with_context(|| format!("Failed to open fragment: {:?}", src))?;
    let mut reader = BufReader::new(file);

    let mut header = [0u8; 9];
    reader
        .read_exact(&mut header)
        .with_context(|| format!("Fragment shorter than 9-byte header: {:?}", src))?;

    let out = File::create(dst)
        .with_context(|| format!("Failed to create elementary stream: {:?}", dst))?;
    let mut writer = BufWriter::new(out);

    if header != SYNTHETIC_HEADER {
        writer
            .write_all(&header)
            .with_context(|| format!("Failed to write stream header: {:?}", dst))?;
    }

    io::copy(&mut reader, &mut writer)
        .with_context(|| format!("Failed to copy fragment payload: {:?}", src))?;
    writer.flush()?;

    Ok(())
}

/// Destination path for a repaired fragment: the fragment stem plus a
/// role-specific suffix, next to the source.
pub fn repaired_path(fragment: &Path, role: StreamRole) -> PathBuf {
    let stem = fragment
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default();
    let suffix = match role {
        StreamRole::Video => VIDEO_STREAM_SUFFIX,
        StreamRole::Audio => AUDIO_STREAM_SUFFIX,
    };
    fragment.with_file_name(format!("{stem}{suffix}"))
}

/// Determine whether a fragment is the video or the audio stream.
///
/// Desktop layout: a sibling `.playurl` JSON carries the numeric stream
/// ids under `data.dash` (plain videos) or `result.dash` (series); the
/// last entry of each array is the active quality. A fragment whose
/// filename contains the audio id is audio, anything else is video.
///
/// Mobile layout: no `.playurl`; fragments are literally named
/// `video.m4s` / `audio.m4s` inside a nested media directory, and the
/// asset-level `entry.json` one directory up carries the caching status.
/// Fragments of an unfinished mobile download are not classified, so the
/// repair pass leaves them alone.
pub fn classify_fragment(fragment: &Path) -> Option<StreamRole> {
    let dir = fragment.parent()?;

    if let Some((video_id, audio_id)) = read_playurl_ids(&dir.join(super::PLAYURL_NAME)) {
        let name = fragment.file_name()?.to_string_lossy();
        if name.contains(&audio_id) {
            return Some(StreamRole::Audio);
        }
        if !video_id.is_empty() {
            return Some(StreamRole::Video);
        }
        return None;
    }

    // Mobile fallback
    let role = match fragment.file_stem()?.to_string_lossy().as_ref() {
        "video" => StreamRole::Video,
        "audio" => StreamRole::Audio,
        _ => return None,
    };
    if mobile_download_complete(dir) {
        Some(role)
    } else {
        tracing::warn!("Mobile download not finished, skipping fragment: {:?}", fragment);
        None
    }
}

/// Completion gate for the mobile layout: `page_data.download_title` of
/// the asset-level `entry.json`. A missing or unparsable descriptor
/// fails the gate; an absent status field passes it.
fn mobile_download_complete(media_dir: &Path) -> bool {
    let Some(asset_dir) = media_dir.parent() else {
        return false;
    };
    let Ok(bytes) = std::fs::read(asset_dir.join(super::ENTRY_JSON)) else {
        return false;
    };
    let Ok(json) = serde_json::from_slice::<serde_json::Value>(&bytes) else {
        return false;
    };
    let status = json
        .pointer("/page_data/download_title")
        .and_then(|v| v.as_str())
        .unwrap_or("");
    crate::metadata::status_is_complete(status)
}

/// Extract `(video_id, audio_id)` from a `.playurl` descriptor.
fn read_playurl_ids(playurl: &Path) -> Option<(String, String)> {
    let bytes = std::fs::read(playurl).ok()?;
    let json: serde_json::Value = serde_json::from_slice(&bytes).ok()?;

    let dash = json
        .get("data")
        .or_else(|| json.get("result"))?
        .get("dash")?;

    let last_id = |key: &str| -> Option<String> {
        let id = dash.get(key)?.as_array()?.last()?.get("id")?;
        match id {
            serde_json::Value::Number(n) => Some(n.to_string()),
            serde_json::Value::String(s) => Some(s.clone()),
            _ => None,
        }
    };

    Some((last_id("video")?, last_id("audio")?))
}
