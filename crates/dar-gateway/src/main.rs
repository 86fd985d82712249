use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use clap::Parser;
use dar_core::{config::default_config_path, ConfigCache, DurationValue};
use dar_recorder::{Recorder, RecorderSettings, ReloadOptions};
use dar_scheduler::{EventSink, JobEvent};
use dar_streamer::{streamer_for, CaptureOutcome, CaptureRequest, Verbosity};
use tokio::sync::mpsc;
use tracing::{error, info};

mod app;
mod cli;
mod http;

use cli::{Cli, Commands};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.debug);

    let config_path = cli.config.clone().unwrap_or_else(default_config_path);
    let cache = Arc::new(ConfigCache::new());
    let settings = RecorderSettings {
        config_path,
        profile: cli.profile.clone(),
        streamer: cli.streamer.clone(),
        verbose: Verbosity::Level(cli.debug),
    };

    match cli.command.unwrap_or(Commands::Serve { public: false }) {
        Commands::Serve { public } => serve(cache, settings, public).await,
        Commands::List => {
            let recorder = open_recorder(cache, settings)?;
            for job in recorder.list_jobs().await? {
                println!("Scheduled job \"{}\":\n  {job}", job.id);
            }
            recorder.stop(true).await?;
            Ok(())
        }
        Commands::Reload {
            no_create,
            no_update,
            no_pause,
        } => {
            let recorder = open_recorder(cache, settings)?;
            let opts = ReloadOptions {
                create: !no_create,
                update: !no_update,
                pause: !no_pause,
            };
            let result = recorder.reload(opts).await?;
            for job in recorder.list_jobs().await? {
                let verb = if result.created.contains(&job.id) {
                    "Added"
                } else if result.updated.contains(&job.id) {
                    "Updated"
                } else if result.paused.contains(&job.id) {
                    "Pausing"
                } else {
                    "Unchanged"
                };
                println!("{verb} job \"{}\":\n  {job}", job.id);
            }
            recorder.stop(true).await?;
            Ok(())
        }
        Commands::Run { time, nowait } => {
            let recorder = open_recorder(cache, settings)?;
            recorder.start().await?;
            match time {
                Some(secs) => {
                    tokio::select! {
                        _ = tokio::time::sleep(Duration::from_secs(secs)) => {}
                        _ = tokio::signal::ctrl_c() => info!("interrupted"),
                    }
                }
                None => {
                    tokio::signal::ctrl_c().await?;
                    info!("interrupted");
                }
            }
            recorder.stop(!nowait).await?;
            Ok(())
        }
        Commands::Record {
            media_type,
            filebase,
            duration,
            add_ts,
            force,
            dryrun,
            url,
        } => {
            let config = cache.get(&settings.config_path, settings.profile.as_deref())?;
            let streamer = streamer_for(&settings.streamer, &config)?;
            let duration = match duration.parse::<u64>() {
                Ok(secs) => DurationValue::Seconds(secs),
                Err(_) => DurationValue::Text(duration),
            };
            let request = CaptureRequest {
                cfg_profile: settings.profile.clone(),
                add_timestamp: add_ts,
                force,
                verbose: settings.verbose,
                dryrun,
                ..CaptureRequest::new(&settings.streamer, url, media_type, filebase, duration)
            };
            match streamer.save_stream(&request).await? {
                CaptureOutcome::DryRun(cmd) => println!("Command line: {cmd}"),
                CaptureOutcome::Artifact(path) => println!("File created: {}", path.display()),
                CaptureOutcome::Failed(msg) => anyhow::bail!("capture failed: {msg}"),
            }
            Ok(())
        }
    }
}

/// `RUST_LOG` wins; otherwise `--debug` picks the level for the dar crates.
fn init_tracing(debug: u8) {
    let level = match debug {
        0 => "info",
        1 | 2 => "debug",
        _ => "trace",
    };
    let default = format!(
        "dar={level},dar_core={level},dar_scheduler={level},dar_streamer={level},\
         dar_recorder={level},tower_http=debug"
    );
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| default.into()),
        )
        .init();
}

/// Open the recorder with a task that logs its job events.
fn open_recorder(cache: Arc<ConfigCache>, settings: RecorderSettings) -> anyhow::Result<Arc<Recorder>> {
    let (tx, rx) = mpsc::channel::<JobEvent>(256);
    let recorder = Recorder::open(cache, settings, EventSink::new(tx))?;
    tokio::spawn(log_events(rx));
    Ok(Arc::new(recorder))
}

async fn log_events(mut rx: mpsc::Receiver<JobEvent>) {
    while let Some(event) = rx.recv().await {
        let detail = serde_json::to_string(&event).unwrap_or_else(|_| format!("{event:?}"));
        if event.is_error() {
            error!(job_id = event.job_id().unwrap_or("-"), "{detail}");
        } else {
            info!(job_id = event.job_id().unwrap_or("-"), "{detail}");
        }
    }
}

async fn serve(cache: Arc<ConfigCache>, settings: RecorderSettings, public: bool) -> anyhow::Result<()> {
    let config = cache.get(&settings.config_path, settings.profile.as_deref())?;
    let bind = if public {
        "0.0.0.0".to_string()
    } else {
        config.server.bind.clone()
    };
    let addr: SocketAddr = format!("{}:{}", bind, config.server.port).parse()?;
    let startup_delay = Duration::from_secs(config.scheduler.startup_delay_secs);

    let recorder = open_recorder(cache, settings)?;
    let router = app::build_router(Arc::new(app::AppState::new(Arc::clone(&recorder))));

    // bind before anything fires so a port conflict fails fast
    let listener = tokio::net::TcpListener::bind(addr).await?;
    info!("dar listening on {}", addr);

    let deferred = Arc::clone(&recorder);
    tokio::spawn(async move {
        tokio::time::sleep(startup_delay).await;
        if let Err(e) = deferred.start().await {
            error!("recorder start failed: {e}");
        }
    });

    axum::serve(listener, router)
        .with_graceful_shutdown(async {
            let _ = tokio::signal::ctrl_c().await;
            info!("shutting down");
        })
        .await?;

    recorder.stop(true).await?;
    Ok(())
}
