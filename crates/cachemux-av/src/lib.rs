//! # cachemux-av
//!
//! External muxing tool invocation and container inspection for cachemux.
//!
//! This crate wraps everything cachemux needs from GPAC's MP4Box:
//! - Detecting the executable (`tools`)
//! - Joining a repaired video/audio pair into an MP4 with embedded
//!   metadata tags (`mux`)
//! - Parsing `MP4Box -info` output into container tags and key stream
//!   facts (`info`)
//!
//! The engine talks to the muxer exclusively through the [`MuxTool`]
//! trait so it can be exercised in tests without GPAC installed.
//!
//! ## Example
//!
//! ```no_run
//! use cachemux_av::{ContainerTags, Mp4Box, MuxJob, MuxTool};
//! use std::path::Path;
//!
//! let muxer = Mp4Box::locate(None)?;
//! let job = MuxJob {
//!     video: Path::new("30080-video.mp4").to_path_buf(),
//!     audio: Path::new("30280-audio.mp3").to_path_buf(),
//!     output: Path::new("out/Ep1.mp4").to_path_buf(),
//!     tags: ContainerTags {
//!         title: "12345".into(),
//!         artist: "678".into(),
//!         album: "910".into(),
//!     },
//!     copyright: "910".into(),
//!     overwrite: false,
//! };
//! muxer.mux(&job)?;
//! # Ok::<(), cachemux_av::Error>(())
//! ```

mod error;
pub mod info;
pub mod mux;
pub mod tools;

// Re-exports
pub use error::{Error, Result};
pub use info::{ContainerTags, StreamFacts};
pub use mux::{Mp4Box, MuxJob, MuxTool};
pub use tools::{check_tool, check_tools, require_tool, ToolInfo};
