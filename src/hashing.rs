//! Content hashing for duplicate detection.

use anyhow::{Context, Result};
use md5::{Digest, Md5};
use std::fs::File;
use std::io::{BufReader, Read};
use std::path::Path;

/// Sidecar extension carrying the hex digest of a synthesized pair.
pub const HASH_SIDECAR_EXT: &str = "hash";

/// MD5 of the streamed concatenation of the video file then the audio
/// file, as lowercase hex. This is the canonical duplicate record.
pub fn combined_hash(video: &Path, audio: &Path) -> Result<String> {
    let mut hasher = Md5::new();
    stream_into(&mut hasher, video)?;
    stream_into(&mut hasher, audio)?;
    Ok(hex::encode(hasher.finalize()))
}

fn stream_into(hasher: &mut Md5, path: &Path) -> Result<()> {
    let file = File::open(path).with_context(|| format!("Failed to open {:?}", path))?;
    let mut reader = BufReader::new(file);
    let mut buffer = [0u8; 4096];
    loop {
        let n = reader
            .read(&mut buffer)
            .with_context(|| format!("Failed to read {:?}", path))?;
        if n == 0 {
            break;
        }
        hasher.update(&buffer[..n]);
    }
    Ok(())
}

/// Path of the hash sidecar belonging to a container output.
pub fn sidecar_path(output: &Path) -> std::path::PathBuf {
    output.with_extension(HASH_SIDECAR_EXT)
}
