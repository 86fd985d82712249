use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use figment::{
    providers::{Env, Format, Toml},
    Figment,
};
use serde::{Deserialize, Serialize};

use crate::error::{DarError, Result};
use crate::types::{ProgramConfig, StationConfig, StreamerConfig};

pub const DEFAULT_PORT: u16 = 5000;
pub const DEFAULT_BIND: &str = "127.0.0.1";
pub const DEFAULT_PROFILE: &str = "default";
pub const DEFAULT_MISFIRE_GRACE_SECS: u64 = 300;

/// Top-level config (dar.toml profiles + DAR_* env overrides).
///
/// The file is organised by profile: `[default.*]` tables form the base and a
/// selected profile's tables are merged on top of them.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DarConfig {
    #[serde(default)]
    pub scheduler: SchedulerConfig,
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub stations: BTreeMap<String, StationConfig>,
    #[serde(default)]
    pub programs: BTreeMap<String, ProgramConfig>,
    #[serde(default)]
    pub streamers: BTreeMap<String, StreamerConfig>,
    /// Directory relative paths in this config are resolved against.
    #[serde(skip)]
    pub base_dir: PathBuf,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SchedulerConfig {
    #[serde(default)]
    pub db_dir: String,
    #[serde(default = "default_db_file")]
    pub db_file: String,
    #[serde(default)]
    pub rec_dir: String,
    /// How late a fire may start and still be honoured.
    #[serde(default = "default_misfire_grace")]
    pub misfire_grace_secs: u64,
    /// Delay between server launch and the scheduler start.
    #[serde(default = "default_startup_delay")]
    pub startup_delay_secs: u64,
    #[serde(default = "default_poll_interval")]
    pub poll_interval_ms: u64,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            db_dir: String::new(),
            db_file: default_db_file(),
            rec_dir: String::new(),
            misfire_grace_secs: DEFAULT_MISFIRE_GRACE_SECS,
            startup_delay_secs: default_startup_delay(),
            poll_interval_ms: default_poll_interval(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_port")]
    pub port: u16,
    #[serde(default = "default_bind")]
    pub bind: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            port: DEFAULT_PORT,
            bind: DEFAULT_BIND.to_string(),
        }
    }
}

fn default_db_file() -> String {
    "dar.db".to_string()
}
fn default_misfire_grace() -> u64 {
    DEFAULT_MISFIRE_GRACE_SECS
}
fn default_startup_delay() -> u64 {
    2
}
fn default_poll_interval() -> u64 {
    1000
}
fn default_port() -> u16 {
    DEFAULT_PORT
}
fn default_bind() -> String {
    DEFAULT_BIND.to_string()
}

impl DarConfig {
    /// Load config from a profile-organised TOML file with DAR_* env var
    /// overrides (`DAR_SCHEDULER__REC_DIR=/srv/rec`).
    ///
    /// `profile = None` selects the `default` profile only.
    pub fn load(path: &Path, profile: Option<&str>) -> Result<Self> {
        if !path.is_file() {
            return Err(DarError::Config(format!(
                "config file \"{}\" not found",
                path.display()
            )));
        }
        let mut config: DarConfig = Figment::new()
            .merge(Toml::file(path).nested())
            .merge(Env::prefixed("DAR_").split("__").global())
            .select(profile.unwrap_or(DEFAULT_PROFILE))
            .extract()
            .map_err(|e| DarError::Config(e.to_string()))?;

        config.base_dir = path
            .parent()
            .map(Path::to_path_buf)
            .unwrap_or_else(|| PathBuf::from("."));
        tracing::debug!(path = %path.display(), profile = ?profile, "config loaded");
        Ok(config)
    }

    /// Path of the job store database.
    pub fn db_path(&self) -> PathBuf {
        let dir = &self.scheduler.db_dir;
        if dir.is_empty() {
            PathBuf::from(&self.scheduler.db_file)
        } else {
            self.resolve_dir(dir).join(&self.scheduler.db_file)
        }
    }

    /// Root directory recordings are written under. Fails when it does not exist.
    pub fn rec_path(&self) -> Result<PathBuf> {
        let dir = &self.scheduler.rec_dir;
        let path = if dir.is_empty() {
            PathBuf::from(".")
        } else {
            self.resolve_dir(dir)
        };
        if !path.is_dir() {
            return Err(DarError::Config(format!(
                "rec_dir \"{dir}\" is not a valid directory"
            )));
        }
        Ok(path)
    }

    /// Absolute and `.`-prefixed paths are taken as-is, anything else is
    /// relative to the config file.
    fn resolve_dir(&self, dir: &str) -> PathBuf {
        if dir.starts_with('/') || dir.starts_with('.') {
            PathBuf::from(dir)
        } else {
            self.base_dir.join(dir)
        }
    }
}

/// `$DAR_CONFIG` or `~/.dar/dar.toml`.
pub fn default_config_path() -> PathBuf {
    if let Ok(p) = std::env::var("DAR_CONFIG") {
        return PathBuf::from(p);
    }
    let home = std::env::var("HOME").unwrap_or_else(|_| ".".to_string());
    PathBuf::from(home).join(".dar").join("dar.toml")
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    const SAMPLE: &str = r#"
[default.scheduler]
rec_dir = "recordings"
misfire_grace_secs = 120

[default.stations.WQXR]
stream_url = "http://stream.wqxr.org/wqxr.aac"
media_type = "audio/aacp"

[default.streamers.vlc]
kind = "vlc"
ignore_errors = ["buffer deadlock prevented"]

[default.streamers.vlc.media_types."audio/aacp"]
muxer = "mp4"
file_type = "m4a"

[default.programs.morning]
station = "WQXR"
schedule = { type = "weekly", days = "mon,wed", start_time = "07:30:00", duration = "1:00:00" }

[test.scheduler]
rec_dir = "/tmp"

[test.programs.quick]
station = "WQXR"
schedule = { type = "immediate", duration = 30 }
"#;

    fn write_config(dir: &Path) -> PathBuf {
        let path = dir.join("dar.toml");
        let mut f = std::fs::File::create(&path).unwrap();
        f.write_all(SAMPLE.as_bytes()).unwrap();
        path
    }

    #[test]
    fn default_profile_loads_sections() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_config(dir.path());
        let cfg = DarConfig::load(&path, None).unwrap();

        assert_eq!(cfg.scheduler.misfire_grace_secs, 120);
        assert_eq!(cfg.scheduler.db_file, "dar.db");
        assert_eq!(cfg.programs.len(), 1);
        assert_eq!(cfg.stations["WQXR"].media_type, "audio/aacp");
        let vlc = &cfg.streamers["vlc"];
        assert_eq!(vlc.media_types["audio/aacp"].file_type, "m4a");
        assert_eq!(vlc.ignore_errors, vec!["buffer deadlock prevented"]);
        assert_eq!(cfg.base_dir, dir.path());
    }

    #[test]
    fn profile_overlays_default() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_config(dir.path());
        let cfg = DarConfig::load(&path, Some("test")).unwrap();

        assert_eq!(cfg.scheduler.rec_dir, "/tmp");
        // untouched keys still come from the default profile
        assert_eq!(cfg.scheduler.misfire_grace_secs, 120);
        assert!(cfg.programs.contains_key("quick"));
        assert!(cfg.programs.contains_key("morning"));
    }

    #[test]
    fn relative_dirs_resolve_against_config_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_config(dir.path());
        let cfg = DarConfig::load(&path, None).unwrap();

        assert_eq!(cfg.db_path(), PathBuf::from("dar.db"));
        // rec_dir does not exist yet
        assert!(cfg.rec_path().is_err());
        std::fs::create_dir(dir.path().join("recordings")).unwrap();
        assert_eq!(cfg.rec_path().unwrap(), dir.path().join("recordings"));
    }

    #[test]
    fn missing_file_is_a_config_error() {
        let err = DarConfig::load(Path::new("/nonexistent/dar.toml"), None).unwrap_err();
        assert!(matches!(err, DarError::Config(_)));
    }
}
