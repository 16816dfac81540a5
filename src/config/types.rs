use serde::{Deserialize, Serialize};
use std::path::PathBuf;

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct Config {
    #[serde(default)]
    pub cache: CacheConfig,

    #[serde(default)]
    pub output: OutputConfig,

    #[serde(default)]
    pub subtitles: SubtitleConfig,

    #[serde(default)]
    pub tools: ToolsConfig,
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct CacheConfig {
    /// Root of the streaming client's cache tree.
    #[serde(default)]
    pub root: Option<PathBuf>,

    /// Where synthesized containers go (default: `<root>/output`).
    #[serde(default)]
    pub output_dir: Option<PathBuf>,
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct OutputConfig {
    /// Pass -force to the muxer so existing outputs are replaced.
    #[serde(default)]
    pub overwrite: bool,

    /// What to do when an output of the same name exists but neither
    /// duplicate check confirms identity.
    #[serde(default)]
    pub name_clash: NameClashPolicy,

    /// Copy eligible-but-unmuxed stream pairs into an `unmerged` folder.
    #[serde(default)]
    pub collect_unmerged: bool,

    /// Open the output directory in a file manager after a producing run.
    #[serde(default)]
    pub open_when_done: bool,
}

/// Policy for a filename collision that the duplicate detector could not
/// confirm as the same content. Data is never silently dropped.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum NameClashPolicy {
    /// Suffix the new output with the numeric item id.
    #[default]
    Rename,
    /// Replace the existing output.
    Overwrite,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct SubtitleConfig {
    /// Attempt subtitle retrieval alongside each located pair.
    #[serde(default = "default_true")]
    pub enabled: bool,

    /// External XML-to-ASS converter command. When unset, downloaded
    /// comment streams are left as-is and no .ass sidecar is produced.
    #[serde(default)]
    pub converter: Option<PathBuf>,
}

impl Default for SubtitleConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            converter: None,
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct ToolsConfig {
    /// Explicit path to MP4Box (default: PATH lookup).
    #[serde(default)]
    pub mp4box: Option<PathBuf>,
}

fn default_true() -> bool {
    true
}
