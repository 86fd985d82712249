//! Captures against a stand-in player: `sh` running a script that writes
//! VLC-style diagnostics to stderr. The request URL is the script path, so
//! `sh <script> --sout=... --run-time=...` runs it with the VLC args ignored.

#![cfg(unix)]

use std::path::Path;

use dar_core::{MediaTypeConfig, StreamerConfig, StreamerKind};
use dar_streamer::{CaptureOutcome, CaptureRequest, Streamer, VlcStreamer};

fn sh_streamer(ignore: &[&str]) -> VlcStreamer {
    let mut media_types = std::collections::BTreeMap::new();
    media_types.insert(
        "audio/mpeg".to_string(),
        MediaTypeConfig {
            muxer: "raw".into(),
            file_type: "mp3".into(),
        },
    );
    VlcStreamer::new(
        "fake",
        StreamerConfig {
            kind: StreamerKind::Vlc,
            command: "sh".into(),
            media_types,
            ignore_errors: ignore.iter().map(|s| s.to_string()).collect(),
        },
    )
}

fn script(dir: &Path, body: &str) -> String {
    let path = dir.join("player.sh");
    std::fs::write(&path, body).unwrap();
    path.display().to_string()
}

fn request(url: String, dir: &Path) -> CaptureRequest {
    let filebase = dir.join("wfmu").display().to_string();
    CaptureRequest::new("fake", url, "audio/mpeg", filebase, 5u64)
}

#[tokio::test]
async fn ignored_errors_only_yield_artifact() {
    let dir = tempfile::tempdir().unwrap();
    let url = script(
        dir.path(),
        "echo '[0000beef] access error: connection reset' >&2\n\
         echo '[00000001] main input: playing' >&2\n\
         exit 0\n",
    );
    let outcome = sh_streamer(&["connection reset"])
        .save_stream(&request(url, dir.path()))
        .await
        .unwrap();
    assert_eq!(
        outcome,
        CaptureOutcome::Artifact(dir.path().join("wfmu.mp3"))
    );
}

#[tokio::test]
async fn unlisted_error_fails_despite_zero_exit() {
    let dir = tempfile::tempdir().unwrap();
    let url = script(
        dir.path(),
        "echo '[0000beef] access error: connection reset' >&2\n\
         echo '[0000beef] mp4 decoder error: decoder failure' >&2\n\
         exit 0\n",
    );
    let outcome = sh_streamer(&["connection reset"])
        .save_stream(&request(url, dir.path()))
        .await
        .unwrap();
    assert_eq!(outcome, CaptureOutcome::Failed("decoder failure".into()));
    assert!(!outcome.is_success());
}

#[tokio::test]
async fn ansi_coloured_diagnostics_are_recognised() {
    let dir = tempfile::tempdir().unwrap();
    let url = script(
        dir.path(),
        "printf '\\033[0;31m[0000beef] main error: stream ended\\033[0m\\n' >&2\n",
    );
    let outcome = sh_streamer(&[])
        .save_stream(&request(url, dir.path()))
        .await
        .unwrap();
    assert_eq!(outcome, CaptureOutcome::Failed("stream ended".into()));
}

#[tokio::test]
async fn non_zero_exit_without_diagnostics_fails() {
    let dir = tempfile::tempdir().unwrap();
    let url = script(dir.path(), "exit 3\n");
    let outcome = sh_streamer(&[])
        .save_stream(&request(url, dir.path()))
        .await
        .unwrap();
    assert!(matches!(outcome, CaptureOutcome::Failed(ref msg) if msg.starts_with("sh exited")));
}
