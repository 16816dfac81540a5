//! Parsing of `MP4Box -info` output.
//!
//! MP4Box has no machine-readable info mode, so the tag and stream facts
//! are scraped from its human-readable report. The parse functions here
//! are pure; the subprocess call lives in [`crate::mux`].

/// Metadata tags embedded in (or destined for) a container file.
///
/// Written at mux time as `title=..:artist=..:album=..` and read back
/// during duplicate detection.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ContainerTags {
    pub title: String,
    pub artist: String,
    pub album: String,
}

impl ContainerTags {
    /// True when no tag carries a value.
    pub fn is_empty(&self) -> bool {
        self.title.is_empty() && self.artist.is_empty() && self.album.is_empty()
    }

    /// Format as an MP4Box `-tags` argument value.
    pub fn to_mp4box_arg(&self) -> String {
        format!(
            "title={}:artist={}:album={}",
            self.title, self.artist, self.album
        )
    }
}

/// Key stream facts extracted from a container report.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StreamFacts {
    pub video_codec: Option<String>,
    pub resolution: Option<String>,
    pub frame_rate: Option<String>,
    pub audio_codec: Option<String>,
    pub sample_rate: Option<String>,
}

/// Extract metadata tags from `MP4Box -info` report text.
///
/// Lines look like `	title: Some Title` (case varies between GPAC
/// versions); a tag absent from the report resolves to an empty string.
pub fn parse_tags(report: &str) -> ContainerTags {
    ContainerTags {
        title: tag_value(report, "title:").unwrap_or_default(),
        artist: tag_value(report, "artist:").unwrap_or_default(),
        album: tag_value(report, "album:").unwrap_or_default(),
    }
}

/// Extract key stream facts from `MP4Box -info` report text.
pub fn parse_stream_facts(report: &str) -> StreamFacts {
    StreamFacts {
        video_codec: stream_label(report, "Video #"),
        resolution: field_value(report, "Resolution:", |c: char| {
            c.is_ascii_digit() || c == 'x'
        }),
        frame_rate: field_value(report, "Frame rate:", |c: char| {
            c.is_ascii_digit() || c == '.'
        }),
        audio_codec: stream_label(report, "Audio #"),
        sample_rate: field_value(report, "Sample rate:", |c: char| c.is_ascii_digit()),
    }
}

/// Find a line starting with `needle` (case-insensitive) and return the
/// remainder of that line, trimmed.
fn tag_value(report: &str, needle: &str) -> Option<String> {
    for line in report.lines() {
        let trimmed = line.trim_start();
        let Some(head) = trimmed.get(..needle.len()) else {
            continue;
        };
        if head.eq_ignore_ascii_case(needle) {
            let value = trimmed[needle.len()..].trim();
            if !value.is_empty() {
                return Some(value.to_string());
            }
        }
    }
    None
}

/// Return the codec label of the first `Video #n: <codec> (...)` style line.
fn stream_label(report: &str, prefix: &str) -> Option<String> {
    for line in report.lines() {
        let trimmed = line.trim_start();
        if let Some(rest) = trimmed.strip_prefix(prefix) {
            // Skip the stream number and separating ": "
            let after = rest.split_once(':').map(|(_, r)| r.trim())?;
            let label = after.split('(').next()?.trim();
            if !label.is_empty() {
                return Some(label.to_string());
            }
        }
    }
    None
}

/// Return the token after `needle` made of characters accepted by `accept`.
fn field_value(report: &str, needle: &str, accept: impl Fn(char) -> bool) -> Option<String> {
    let idx = report.find(needle)?;
    let rest = report[idx + needle.len()..].trim_start();
    let token: String = rest.chars().take_while(|&c| accept(c)).collect();
    if token.is_empty() {
        None
    } else {
        Some(token)
    }
}
