//! Program reloads against an on-disk config and job store.

use std::collections::BTreeSet;
use std::path::PathBuf;
use std::sync::Arc;

use dar_core::ConfigCache;
use dar_recorder::{Recorder, RecorderError, RecorderSettings, RecorderState, ReloadOptions};
use dar_scheduler::EventSink;

const STATIONS: &str = r#"
[default.stations.KQED]
stream_url = "http://kqed.example/stream"
media_type = "audio/aacp"

[default.streamers.vlc]
kind = "vlc"

[default.streamers.vlc.media_types."audio/aacp"]
muxer = "mp4"
file_type = "m4a"
"#;

const MORNING: &str = r#"
[default.programs.morning]
station = "KQED"
schedule = { type = "weekly", days = "mon-fri", start_time = "06:00:00", end_time = "09:00:00" }
"#;

const FORUM: &str = r#"
[default.programs.forum]
station = "KQED"
schedule = { type = "weekly", days = "mon,wed", start_time = "23:00:00", end_time = "01:00:00" }
"#;

struct Fixture {
    _dir: tempfile::TempDir,
    root: PathBuf,
    config_path: PathBuf,
}

impl Fixture {
    fn new() -> Self {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path().to_path_buf();
        std::fs::create_dir(root.join("rec")).unwrap();
        Self {
            config_path: root.join("dar.toml"),
            root,
            _dir: dir,
        }
    }

    fn write(&self, programs: &[&str]) {
        let scheduler = format!(
            "[default.scheduler]\ndb_dir = \"{}\"\nrec_dir = \"rec\"\n",
            self.root.display()
        );
        let body = format!("{scheduler}{STATIONS}{}", programs.concat());
        std::fs::write(&self.config_path, body).unwrap();
    }

    fn recorder(&self, streamer: &str) -> Recorder {
        let mut settings = RecorderSettings::new(self.config_path.clone());
        settings.streamer = streamer.to_string();
        Recorder::open(Arc::new(ConfigCache::new()), settings, EventSink::none()).unwrap()
    }
}

fn ids(names: &[&str]) -> BTreeSet<String> {
    names.iter().map(|s| s.to_string()).collect()
}

#[tokio::test]
async fn reload_is_idempotent() {
    let fx = Fixture::new();
    fx.write(&[MORNING, FORUM]);
    let rec = fx.recorder("vlc");

    let first = rec.reload(ReloadOptions::default()).await.unwrap();
    assert_eq!(first.created, ids(&["forum", "morning"]));
    assert!(first.updated.is_empty());
    assert!(first.paused.is_empty());
    // reload is a query: it leaves the engine paused, not firing
    assert_eq!(rec.get_state(), RecorderState::Paused);
    assert!(fx.root.join("rec").join("KQED").is_dir());

    let second = rec.reload(ReloadOptions::default()).await.unwrap();
    assert!(second.created.is_empty());
    assert_eq!(second.updated, ids(&["forum", "morning"]));
    assert!(second.paused.is_empty());

    let jobs = rec.list_jobs().await.unwrap();
    assert_eq!(jobs.len(), 2);
    assert!(jobs.iter().all(|j| !j.paused()));
    rec.stop(true).await.unwrap();
}

#[tokio::test]
async fn obsolete_programs_are_paused_not_removed() {
    let fx = Fixture::new();
    fx.write(&[MORNING, FORUM]);
    let rec = fx.recorder("vlc");
    rec.reload(ReloadOptions::default()).await.unwrap();

    fx.write(&[MORNING]);
    let keep = ReloadOptions {
        pause: false,
        ..ReloadOptions::default()
    };
    let result = rec.reload(keep).await.unwrap();
    assert!(result.paused.is_empty());
    assert!(!rec.get_job("forum").await.unwrap().unwrap().paused());

    let result = rec.reload(ReloadOptions::default()).await.unwrap();
    assert_eq!(result.paused, ids(&["forum"]));
    assert_eq!(result.updated, ids(&["morning"]));
    assert!(result.created.is_empty());

    let forum = rec.get_job("forum").await.unwrap().expect("forum kept");
    assert!(forum.paused());
    assert_eq!(forum.name, "forum");

    // bringing it back updates it in place and requeues it
    fx.write(&[MORNING, FORUM]);
    let result = rec.reload(ReloadOptions::default()).await.unwrap();
    assert_eq!(result.updated, ids(&["forum", "morning"]));
    assert!(!rec.get_job("forum").await.unwrap().unwrap().paused());
    rec.stop(true).await.unwrap();
}

#[tokio::test]
async fn create_disabled_skips_new_programs() {
    let fx = Fixture::new();
    fx.write(&[MORNING]);
    let rec = fx.recorder("vlc");
    rec.reload(ReloadOptions::default()).await.unwrap();

    fx.write(&[MORNING, FORUM]);
    let result = rec
        .reload(ReloadOptions {
            create: false,
            ..ReloadOptions::default()
        })
        .await
        .unwrap();
    assert!(result.created.is_empty());
    assert_eq!(result.updated, ids(&["morning"]));
    assert!(rec.get_job("forum").await.unwrap().is_none());
    rec.stop(true).await.unwrap();
}

#[tokio::test]
async fn resolution_failure_aborts_the_rest_of_the_pass() {
    let fx = Fixture::new();
    let broken = r#"
[default.programs.broken]
station = "KQED"
schedule = { type = "daily", start_time = "06:00:00", duration = 60 }
"#;
    // programs are processed in id order: broken, forum, morning
    fx.write(&[MORNING, FORUM, broken]);
    let rec = fx.recorder("vlc");

    let err = rec.reload(ReloadOptions::default()).await.unwrap_err();
    assert!(matches!(err, RecorderError::UnsupportedScheduleType(_)));
    assert!(rec.list_jobs().await.unwrap().is_empty());
    rec.stop(true).await.unwrap();
}

#[tokio::test]
async fn unknown_streamer_is_rejected_before_touching_jobs() {
    let fx = Fixture::new();
    fx.write(&[MORNING]);
    let rec = fx.recorder("mplayer");
    let err = rec.reload(ReloadOptions::default()).await.unwrap_err();
    assert_eq!(err.code(), "UNKNOWN_STREAMER");
    assert_eq!(rec.get_state(), RecorderState::Shutdown);
}

#[tokio::test]
async fn job_suspend_and_requeue() {
    let fx = Fixture::new();
    fx.write(&[MORNING]);
    let rec = fx.recorder("vlc");
    rec.reload(ReloadOptions::default()).await.unwrap();

    assert!(rec.pause_job("morning").await.unwrap().paused());
    let info = rec.get_info().await.unwrap();
    assert_eq!((info.jobs, info.queued, info.suspended), (1, 0, 1));

    let job = rec.resume_job("morning").await.unwrap().expect("weekly job requeued");
    assert!(!job.paused());
    let info = rec.get_info().await.unwrap();
    assert_eq!((info.queued, info.suspended), (1, 0));
    assert_eq!(info.state, RecorderState::Paused);
    rec.stop(true).await.unwrap();
}

#[tokio::test]
async fn jobs_persist_across_recorder_instances() {
    let fx = Fixture::new();
    fx.write(&[MORNING, FORUM]);
    {
        let rec = fx.recorder("vlc");
        rec.reload(ReloadOptions::default()).await.unwrap();
        rec.pause_job("forum").await.unwrap();
        rec.stop(true).await.unwrap();
    }
    let rec = fx.recorder("vlc");
    let jobs = rec.list_jobs().await.unwrap();
    assert_eq!(jobs.len(), 2);
    assert!(rec.get_job("forum").await.unwrap().unwrap().paused());
    rec.stop(true).await.unwrap();
}
