//! Shared fixtures for integration tests.

use cachemux::config::Config;
use cachemux_av::{ContainerTags, Error as AvError, MuxJob, MuxTool, Result as AvResult};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

/// Muxer stub: concatenates the pair into the output file and records
/// the tags it was given, so duplicate detection by tags is observable
/// without GPAC installed.
#[derive(Default)]
pub struct StubMuxer {
    tags: Mutex<HashMap<PathBuf, ContainerTags>>,
    pub fail: bool,
}

impl StubMuxer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn failing() -> Self {
        Self {
            fail: true,
            ..Self::default()
        }
    }
}

impl MuxTool for StubMuxer {
    fn mux(&self, job: &MuxJob) -> AvResult<()> {
        if self.fail {
            return Err(AvError::tool_failed("stub", "configured to fail"));
        }
        if job.output.exists() && !job.overwrite {
            return Err(AvError::tool_failed("stub", "output exists"));
        }
        let mut bytes = b"MUXED:".to_vec();
        bytes.extend(std::fs::read(&job.video)?);
        bytes.extend(std::fs::read(&job.audio)?);
        std::fs::write(&job.output, bytes)?;
        self.tags
            .lock()
            .unwrap()
            .insert(job.output.clone(), job.tags.clone());
        Ok(())
    }

    fn read_tags(&self, path: &Path) -> AvResult<ContainerTags> {
        Ok(self
            .tags
            .lock()
            .unwrap()
            .get(path)
            .cloned()
            .unwrap_or_default())
    }
}

/// Write one desktop-layout asset directory: raw fragments with the
/// synthetic header, a `.playurl` with the stream ids, and a primary
/// descriptor.
pub fn write_asset(cache_root: &Path, dir_name: &str, status: &str) -> PathBuf {
    let dir = cache_root.join(dir_name);
    std::fs::create_dir_all(&dir).unwrap();

    std::fs::write(
        dir.join(".playurl"),
        r#"{"data":{"dash":{"video":[{"id":30080}],"audio":[{"id":30280}]}}}"#,
    )
    .unwrap();
    std::fs::write(dir.join("30080.m4s"), b"000000000VIDEOPAYLOAD").unwrap();
    std::fs::write(dir.join("30280.m4s"), b"000000000AUDIOPAYLOAD").unwrap();

    let descriptor = format!(
        r#"{{
            "groupTitle": "Show",
            "title": "Ep1",
            "uname": "Studio",
            "status": "{status}",
            "itemId": 910,
            "groupId": "12345",
            "uid": "678"
        }}"#
    );
    std::fs::write(dir.join("videoInfo.json"), descriptor).unwrap();

    dir
}

/// Config pointing at a cache root, with network-touching features off.
pub fn test_config(cache_root: &Path) -> Config {
    let mut config = Config::default();
    config.cache.root = Some(cache_root.to_path_buf());
    config.subtitles.enabled = false;
    config
}
