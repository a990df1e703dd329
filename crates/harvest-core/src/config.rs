use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::error::ConfigError;
use crate::url_model::sanitize_segment;

/// How often a job is allowed to run. Fixed day counts, not calendar months/years.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Cadence {
    #[default]
    Daily,
    Weekly,
    Monthly,
    Yearly,
}

impl Cadence {
    /// Minimum number of whole days between two runs.
    pub fn days(self) -> i64 {
        match self {
            Cadence::Daily => 1,
            Cadence::Weekly => 7,
            Cadence::Monthly => 30,
            Cadence::Yearly => 365,
        }
    }

    pub fn min_interval(self) -> chrono::Duration {
        chrono::Duration::days(self.days())
    }
}

/// One schedulable job (a remote collector endpoint).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JobConfig {
    pub name: String,
    /// Invocation target. Filled from `base_url/function_name` when absent.
    #[serde(default)]
    pub url: Option<String>,
    #[serde(default)]
    pub function_name: Option<String>,
    #[serde(default = "default_job_timeout_secs")]
    pub timeout_secs: u64,
    #[serde(default = "default_true")]
    pub enabled: bool,
    #[serde(default)]
    pub cadence: Cadence,
}

impl JobConfig {
    pub fn new(name: impl Into<String>, url: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            url: Some(url.into()),
            function_name: None,
            timeout_secs: default_job_timeout_secs(),
            enabled: true,
            cadence: Cadence::default(),
        }
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    /// Explicit URL, else `<base_url>/<function_name>`.
    pub fn invocation_url(&self, base_url: Option<&str>) -> Option<String> {
        if let Some(url) = &self.url {
            return Some(url.clone());
        }
        let base = base_url?.trim_end_matches('/');
        let function = self.function_name.as_deref()?;
        Some(format!("{}/{}", base, function))
    }
}

fn default_job_timeout_secs() -> u64 {
    540
}

fn default_true() -> bool {
    true
}

/// Dispatcher settings (`[scheduler]`).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SchedulerConfig {
    /// Maximum jobs executing at once (W).
    #[serde(default = "default_max_concurrent_jobs")]
    pub max_concurrent_jobs: usize,
    /// Optional deadline for a whole cycle; unfinished direct jobs become timeouts.
    #[serde(default)]
    pub cycle_deadline_secs: Option<u64>,
    #[serde(default)]
    pub use_queue: bool,
    #[serde(default = "default_queue_name")]
    pub queue_name: String,
    /// Identity attached to queued work items.
    #[serde(default)]
    pub service_account_email: Option<String>,
    #[serde(default)]
    pub base_url: Option<String>,
    #[serde(default)]
    pub use_secret_store: bool,
    #[serde(default = "default_secret_name")]
    pub secret_name: String,
    #[serde(default)]
    pub secrets_dir: Option<PathBuf>,
    /// SQLite file backing the task queue (default under the XDG state dir).
    #[serde(default)]
    pub queue_db: Option<PathBuf>,
}

fn default_max_concurrent_jobs() -> usize {
    4
}

fn default_queue_name() -> String {
    "data-collectors".to_string()
}

fn default_secret_name() -> String {
    "function-auth-token".to_string()
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            max_concurrent_jobs: default_max_concurrent_jobs(),
            cycle_deadline_secs: None,
            use_queue: false,
            queue_name: default_queue_name(),
            service_account_email: None,
            base_url: None,
            use_secret_store: false,
            secret_name: default_secret_name(),
            secrets_dir: None,
            queue_db: None,
        }
    }
}

/// Cadence gate settings (`[gate]`).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GateConfig {
    /// When false every job is treated as due.
    #[serde(default = "default_true")]
    pub enabled: bool,
}

impl Default for GateConfig {
    fn default() -> Self {
        Self { enabled: true }
    }
}

/// Retry policy parameters (`[retry]`).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RetryConfig {
    /// Maximum number of attempts per download (including the first).
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,
    /// Base delay in seconds for exponential backoff.
    #[serde(default = "default_base_delay_secs")]
    pub base_delay_secs: f64,
    /// Maximum backoff delay in seconds.
    #[serde(default = "default_max_delay_secs")]
    pub max_delay_secs: u64,
    /// Deadline for a single attempt, in seconds.
    #[serde(default = "default_attempt_timeout_secs")]
    pub attempt_timeout_secs: u64,
}

fn default_max_attempts() -> u32 {
    3
}

fn default_base_delay_secs() -> f64 {
    4.0
}

fn default_max_delay_secs() -> u64 {
    30
}

fn default_attempt_timeout_secs() -> u64 {
    300
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: default_max_attempts(),
            base_delay_secs: default_base_delay_secs(),
            max_delay_secs: default_max_delay_secs(),
            attempt_timeout_secs: default_attempt_timeout_secs(),
        }
    }
}

/// Transfer settings (`[transfer]`).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TransferConfig {
    /// Directory for transient downloads (None = OS temp dir).
    #[serde(default)]
    pub work_dir: Option<PathBuf>,
    /// Compare against the stored object before downloading.
    #[serde(default = "default_true")]
    pub compare_existing: bool,
}

impl Default for TransferConfig {
    fn default() -> Self {
        Self {
            work_dir: None,
            compare_existing: true,
        }
    }
}

/// Object store location (`[storage]`).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageConfig {
    /// Directory acting as the bucket root.
    pub root: PathBuf,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            root: PathBuf::from("/var/lib/harvest/bucket"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Text,
    Json,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    #[serde(default)]
    pub format: LogFormat,
    #[serde(default = "default_true")]
    pub to_file: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            format: LogFormat::Text,
            to_file: true,
        }
    }
}

/// Content check a local collector applies to each downloaded file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CheckKind {
    Json,
    Nonempty,
}

/// One file fetched by a local collector.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SourceFileConfig {
    pub url: String,
    /// Partition under `raw/<collector>/`; defaults to the current UTC year.
    #[serde(default)]
    pub year: Option<String>,
    /// Stored file name; derived from the URL path when absent.
    #[serde(default)]
    pub name: Option<String>,
}

/// A collector run in-process (`[[collectors]]`).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CollectorConfig {
    pub name: String,
    #[serde(default)]
    pub files: Vec<SourceFileConfig>,
    #[serde(default)]
    pub check: Option<CheckKind>,
    #[serde(default)]
    pub cadence: Cadence,
}

/// Global configuration loaded from `~/.config/harvest/config.toml`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct HarvestConfig {
    #[serde(default)]
    pub scheduler: SchedulerConfig,
    #[serde(default)]
    pub gate: GateConfig,
    #[serde(default)]
    pub retry: RetryConfig,
    #[serde(default)]
    pub transfer: TransferConfig,
    #[serde(default)]
    pub storage: StorageConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
    #[serde(default)]
    pub jobs: Vec<JobConfig>,
    #[serde(default)]
    pub collectors: Vec<CollectorConfig>,
}

/// Names share `metadata/<segment>/`, so two names may not map to one segment.
fn check_storage_name<'a>(
    seen: &mut HashMap<String, &'a str>,
    what: &str,
    name: &'a str,
) -> Result<(), ConfigError> {
    match seen.insert(sanitize_segment(name), name) {
        Some(prev) if prev == name => Err(ConfigError(format!("duplicate {} name: {}", what, name))),
        Some(prev) => Err(ConfigError(format!(
            "{} names {:?} and {:?} map to the same storage key",
            what, prev, name
        ))),
        None => Ok(()),
    }
}

/// Settings that only come from the process environment.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EnvSettings {
    pub project_id: Option<String>,
    pub region: Option<String>,
    pub queue: Option<String>,
    pub base_url: Option<String>,
    pub auth_token: Option<String>,
    pub use_secret_store: Option<bool>,
}

impl EnvSettings {
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build from an arbitrary lookup (tests pass a map). Empty values count as unset.
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());
        Self {
            project_id: get("HARVEST_PROJECT_ID"),
            region: get("HARVEST_REGION"),
            queue: get("HARVEST_QUEUE"),
            base_url: get("HARVEST_BASE_URL"),
            auth_token: get("HARVEST_AUTH_TOKEN"),
            use_secret_store: get("HARVEST_USE_SECRET_STORE")
                .map(|v| matches!(v.to_ascii_lowercase().as_str(), "1" | "true" | "yes")),
        }
    }

    /// Queue mode needs both a project and a region to address the queue.
    pub fn has_queue_identifiers(&self) -> bool {
        self.project_id.is_some() && self.region.is_some()
    }
}

impl HarvestConfig {
    /// Apply environment overrides on top of file values.
    pub fn apply_env(&mut self, env: &EnvSettings) {
        if let Some(queue) = &env.queue {
            self.scheduler.queue_name = queue.clone();
        }
        if let Some(base) = &env.base_url {
            self.scheduler.base_url = Some(base.clone());
        }
        if let Some(flag) = env.use_secret_store {
            self.scheduler.use_secret_store = flag;
        }
    }

    /// Check settings that would make a cycle meaningless. Fatal at startup.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.scheduler.max_concurrent_jobs == 0 {
            return Err(ConfigError("scheduler.max_concurrent_jobs must be at least 1".into()));
        }
        if self.retry.max_attempts == 0 {
            return Err(ConfigError("retry.max_attempts must be at least 1".into()));
        }
        let mut seen = HashMap::new();
        for job in &self.jobs {
            if job.name.trim().is_empty() {
                return Err(ConfigError("job with empty name".into()));
            }
            check_storage_name(&mut seen, "job", &job.name)?;
            if !job.enabled {
                continue;
            }
            let Some(url) = job.invocation_url(self.scheduler.base_url.as_deref()) else {
                return Err(ConfigError(format!(
                    "job {} has no url (set url, or function_name with scheduler.base_url)",
                    job.name
                )));
            };
            if url::Url::parse(&url).is_err() {
                return Err(ConfigError(format!("job {} has invalid url: {}", job.name, url)));
            }
        }
        let mut collectors = HashMap::new();
        for c in &self.collectors {
            check_storage_name(&mut collectors, "collector", &c.name)?;
        }
        Ok(())
    }

    pub fn enabled_jobs(&self) -> Vec<JobConfig> {
        self.jobs.iter().filter(|j| j.enabled).cloned().collect()
    }

    pub fn collector(&self, name: &str) -> Option<&CollectorConfig> {
        self.collectors.iter().find(|c| c.name == name)
    }
}

pub fn config_path() -> Result<PathBuf> {
    let xdg_dirs = xdg::BaseDirectories::with_prefix("harvest")?;
    Ok(xdg_dirs.place_config_file("config.toml")?)
}

/// Default SQLite path for the task queue: `~/.local/state/harvest/tasks.db`.
pub fn default_queue_db_path() -> Result<PathBuf> {
    let xdg_dirs = xdg::BaseDirectories::with_prefix("harvest")?;
    Ok(xdg_dirs.get_state_home().join("tasks.db"))
}

/// Load configuration from disk, creating a default file if none exists.
pub fn load_or_init() -> Result<HarvestConfig> {
    let path = config_path()?;
    if !path.exists() {
        let default_cfg = HarvestConfig::default();
        let toml = toml::to_string_pretty(&default_cfg)?;
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(&path, toml)?;
        tracing::info!("created default config at {}", path.display());
        return Ok(default_cfg);
    }
    load_from_path(&path)
}

pub fn load_from_path(path: &Path) -> Result<HarvestConfig> {
    let data =
        fs::read_to_string(path).with_context(|| format!("read config {}", path.display()))?;
    let cfg: HarvestConfig =
        toml::from_str(&data).with_context(|| format!("parse config {}", path.display()))?;
    Ok(cfg)
}
