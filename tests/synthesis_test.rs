//! End-to-end tests for the synthesis orchestrator.

mod common;

use cachemux::config::NameClashPolicy;
use cachemux::synthesis::Synthesizer;
use common::{test_config, write_asset, StubMuxer};

#[test]
fn produces_single_artifact_for_eligible_asset() {
    let tmp = tempfile::tempdir().unwrap();
    let root = tmp.path();
    write_asset(root, "asset1", "completed");

    let config = test_config(root);
    let muxer = StubMuxer::new();
    let summary = Synthesizer::new(&config, root.to_path_buf(), &muxer)
        .run()
        .unwrap();

    let output = root.join("output/Show-Studio/Ep1.mp4");
    assert_eq!(summary.produced, vec![output.clone()]);
    assert!(summary.skipped_incomplete.is_empty());
    assert!(summary.failed.is_empty());
    assert_eq!(summary.duplicate_skips, 0);
    assert_eq!(summary.repaired_fragments, 2);

    // The synthetic 9-byte header must not reach the muxed streams.
    let bytes = std::fs::read(&output).unwrap();
    assert_eq!(bytes, b"MUXED:VIDEOPAYLOADAUDIOPAYLOAD");

    // Duplicate record persisted for future runs.
    assert!(root.join("output/Show-Studio/Ep1.hash").exists());
}

#[test]
fn incomplete_asset_is_skipped() {
    let tmp = tempfile::tempdir().unwrap();
    let root = tmp.path();
    let dir = write_asset(root, "asset1", "进行中");

    let config = test_config(root);
    let muxer = StubMuxer::new();
    let summary = Synthesizer::new(&config, root.to_path_buf(), &muxer)
        .run()
        .unwrap();

    assert!(summary.produced.is_empty());
    assert_eq!(summary.skipped_incomplete, vec![dir]);
    assert!(summary.failed.is_empty());
}

#[test]
fn second_run_is_a_noop() {
    let tmp = tempfile::tempdir().unwrap();
    let root = tmp.path();
    write_asset(root, "asset1", "视频已缓存完成");

    let config = test_config(root);
    let muxer = StubMuxer::new();

    let first = Synthesizer::new(&config, root.to_path_buf(), &muxer)
        .run()
        .unwrap();
    assert_eq!(first.produced.len(), 1);

    let second = Synthesizer::new(&config, root.to_path_buf(), &muxer)
        .run()
        .unwrap();
    assert!(second.produced.is_empty());
    assert_eq!(second.duplicate_skips, first.produced.len());
    assert!(second.failed.is_empty());
}

#[test]
fn renamed_output_is_still_detected_by_hash() {
    let tmp = tempfile::tempdir().unwrap();
    let root = tmp.path();
    write_asset(root, "asset1", "completed");

    let config = test_config(root);
    let muxer = StubMuxer::new();
    Synthesizer::new(&config, root.to_path_buf(), &muxer)
        .run()
        .unwrap();

    // User renames the output (and its sidecar) between runs; identity
    // must come from content, not the filename.
    let group = root.join("output/Show-Studio");
    std::fs::rename(group.join("Ep1.mp4"), group.join("Renamed.mp4")).unwrap();
    std::fs::rename(group.join("Ep1.hash"), group.join("Renamed.hash")).unwrap();

    let second = Synthesizer::new(&config, root.to_path_buf(), &muxer)
        .run()
        .unwrap();
    assert!(second.produced.is_empty());
    assert_eq!(second.duplicate_skips, 1);
}

#[test]
fn name_clash_renames_with_item_id() {
    let tmp = tempfile::tempdir().unwrap();
    let root = tmp.path();
    write_asset(root, "asset1", "completed");

    // A same-named output with unrelated content and no duplicate
    // record already exists.
    let group = root.join("output/Show-Studio");
    std::fs::create_dir_all(&group).unwrap();
    std::fs::write(group.join("Ep1.mp4"), b"something else entirely").unwrap();

    let config = test_config(root);
    let muxer = StubMuxer::new();
    let summary = Synthesizer::new(&config, root.to_path_buf(), &muxer)
        .run()
        .unwrap();

    assert_eq!(summary.produced, vec![group.join("Ep1-910.mp4")]);
    // The unrelated file is untouched.
    assert_eq!(
        std::fs::read(group.join("Ep1.mp4")).unwrap(),
        b"something else entirely"
    );
}

#[test]
fn name_clash_overwrite_policy_replaces() {
    let tmp = tempfile::tempdir().unwrap();
    let root = tmp.path();
    write_asset(root, "asset1", "completed");

    let group = root.join("output/Show-Studio");
    std::fs::create_dir_all(&group).unwrap();
    std::fs::write(group.join("Ep1.mp4"), b"stale").unwrap();

    let mut config = test_config(root);
    config.output.name_clash = NameClashPolicy::Overwrite;

    let muxer = StubMuxer::new();
    let summary = Synthesizer::new(&config, root.to_path_buf(), &muxer)
        .run()
        .unwrap();

    assert_eq!(summary.produced, vec![group.join("Ep1.mp4")]);
    assert_eq!(
        std::fs::read(group.join("Ep1.mp4")).unwrap(),
        b"MUXED:VIDEOPAYLOADAUDIOPAYLOAD"
    );
}

#[test]
fn mux_failure_is_recorded_and_pair_collected() {
    let tmp = tempfile::tempdir().unwrap();
    let root = tmp.path();
    let dir = write_asset(root, "asset1", "completed");

    let mut config = test_config(root);
    config.output.collect_unmerged = true;

    let muxer = StubMuxer::failing();
    let summary = Synthesizer::new(&config, root.to_path_buf(), &muxer)
        .run()
        .unwrap();

    assert!(summary.produced.is_empty());
    assert_eq!(summary.failed, vec![dir]);

    // Failed pairs are still handed to the user as raw streams.
    let unmerged = root.join("output/Show-Studio/unmerged");
    assert!(unmerged.join("Ep1_video.mp4").exists());
    assert!(unmerged.join("Ep1_audio.mp3").exists());
}

#[test]
fn mobile_layout_asset_is_synthesized() {
    let tmp = tempfile::tempdir().unwrap();
    let root = tmp.path();

    // Mobile clients nest the media dir one level deeper and describe
    // the asset with entry.json instead of videoInfo.json.
    let asset = root.join("1234567");
    let media = asset.join("80");
    std::fs::create_dir_all(&media).unwrap();
    std::fs::write(media.join("video.m4s"), b"000000000VID").unwrap();
    std::fs::write(media.join("audio.m4s"), b"000000000AUD").unwrap();
    std::fs::write(
        asset.join("entry.json"),
        r#"{
            "owner_name": "Studio",
            "title": "Show",
            "owner_id": 678,
            "page_data": {
                "download_subtitle": "Ep2",
                "download_title": "completed"
            }
        }"#,
    )
    .unwrap();

    let config = test_config(root);
    let muxer = StubMuxer::new();
    let summary = Synthesizer::new(&config, root.to_path_buf(), &muxer)
        .run()
        .unwrap();

    assert_eq!(summary.produced, vec![root.join("output/Studio-Show/Ep2.mp4")]);
    assert_eq!(
        std::fs::read(&summary.produced[0]).unwrap(),
        b"MUXED:VIDAUD"
    );
}

#[test]
fn unfinished_mobile_fragments_are_left_untouched() {
    let tmp = tempfile::tempdir().unwrap();
    let root = tmp.path();

    let asset = root.join("7654321");
    let media = asset.join("80");
    std::fs::create_dir_all(&media).unwrap();
    std::fs::write(media.join("video.m4s"), b"000000000VID").unwrap();
    std::fs::write(media.join("audio.m4s"), b"000000000AUD").unwrap();
    std::fs::write(
        asset.join("entry.json"),
        r#"{
            "owner_name": "Studio",
            "title": "Show",
            "page_data": {
                "download_subtitle": "Ep3",
                "download_title": "正在缓存"
            }
        }"#,
    )
    .unwrap();

    let config = test_config(root);
    let muxer = StubMuxer::new();
    let summary = Synthesizer::new(&config, root.to_path_buf(), &muxer)
        .run()
        .unwrap();

    // No elementary streams are produced for a download still in flight.
    assert_eq!(summary.repaired_fragments, 0);
    assert!(!media.join("video-video.mp4").exists());
    assert!(!media.join("audio-audio.mp3").exists());
    assert!(summary.produced.is_empty());
}

#[test]
fn directory_without_descriptor_is_ignored() {
    let tmp = tempfile::tempdir().unwrap();
    let root = tmp.path();
    // Streams but no descriptor file of any schema.
    let dir = root.join("stray");
    std::fs::create_dir_all(&dir).unwrap();
    std::fs::write(dir.join("1-video.mp4"), b"v").unwrap();
    std::fs::write(dir.join("1-audio.mp3"), b"a").unwrap();

    let config = test_config(root);
    let muxer = StubMuxer::new();
    let summary = Synthesizer::new(&config, root.to_path_buf(), &muxer)
        .run()
        .unwrap();

    assert!(summary.produced.is_empty());
    assert!(summary.failed.is_empty());
    assert!(summary.skipped_incomplete.is_empty());
}
