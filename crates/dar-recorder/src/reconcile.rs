//! Bring the job store in line with the programs in config.

use std::collections::{BTreeMap, BTreeSet};
use std::path::Path;

use dar_core::{DarConfig, ProgramConfig};
use dar_scheduler::{JobRecord, JobStore};
use dar_streamer::Verbosity;
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::error::{RecorderError, Result};
use crate::payload::CapturePayload;
use crate::resolve::{resolve_duration, resolve_trigger};

/// Which reconciliation actions are enabled.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReloadOptions {
    pub create: bool,
    pub update: bool,
    pub pause: bool,
}

impl Default for ReloadOptions {
    fn default() -> Self {
        Self {
            create: true,
            update: true,
            pause: true,
        }
    }
}

/// Job ids touched by one pass, by action. The three sets are disjoint.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReloadResult {
    pub created: BTreeSet<String>,
    pub updated: BTreeSet<String>,
    pub paused: BTreeSet<String>,
}

/// What a program registration needs besides the program itself.
pub struct Registrar<'a> {
    pub config: &'a DarConfig,
    pub streamer: &'a str,
    pub profile: Option<&'a str>,
    pub verbose: Verbosity,
    /// Root recordings are written under.
    pub rec_path: &'a Path,
}

impl Registrar<'_> {
    /// Resolve `program` into a capture job and upsert it under `id`.
    ///
    /// Creates the station's recording directory when missing.
    pub fn register(&self, store: &JobStore, id: &str, program: &ProgramConfig) -> Result<JobRecord> {
        let station = self.config.stations.get(&program.station).ok_or_else(|| {
            RecorderError::Config(format!(
                "station \"{}\" for program \"{id}\" not known",
                program.station
            ))
        })?;

        let station_path = self.rec_path.join(&program.station);
        if !station_path.is_dir() {
            std::fs::create_dir_all(&station_path).map_err(|e| {
                RecorderError::Config(format!("cannot create {}: {e}", station_path.display()))
            })?;
            info!(path = %station_path.display(), "station directory created");
        }
        let filebase = station_path.join(program.station.to_lowercase());

        let duration = resolve_duration(&program.schedule)?;
        let trigger = resolve_trigger(&program.schedule)?;
        let payload = CapturePayload(
            self.streamer.to_string(),
            self.profile.map(str::to_string),
            station.stream_url.clone(),
            station.media_type.clone(),
            filebase.display().to_string(),
            duration,
            true,
            self.verbose,
        );

        let job = store.add_or_replace(
            id,
            id,
            &trigger,
            &payload.to_value()?,
            self.config.scheduler.misfire_grace_secs,
        )?;
        Ok(job)
    }
}

/// Create, update and pause jobs so the store matches `desired`.
///
/// `current` is the set of job ids in the store before the pass. Jobs not in
/// `desired` are paused in place, never removed. The first program that fails
/// to resolve aborts the pass; jobs registered before it stay registered.
pub fn reconcile(
    store: &JobStore,
    registrar: &Registrar<'_>,
    desired: &BTreeMap<String, ProgramConfig>,
    current: &BTreeSet<String>,
    opts: ReloadOptions,
) -> Result<ReloadResult> {
    let mut result = ReloadResult::default();

    for (id, program) in desired {
        let scheduled = current.contains(id);
        if scheduled && opts.update {
            let job = registrar.register(store, id, program)?;
            info!(job_id = %id, %job, "program updated");
            result.updated.insert(id.clone());
        } else if !scheduled && opts.create {
            let job = registrar.register(store, id, program)?;
            info!(job_id = %id, %job, "program added");
            result.created.insert(id.clone());
        }
    }

    for id in current.iter().filter(|id| !desired.contains_key(*id)) {
        if opts.pause {
            let job = store.pause(id)?;
            info!(job_id = %id, %job, "obsolete program paused");
            result.paused.insert(id.clone());
        }
    }

    Ok(result)
}
