//! Configuration for coordinator and worker processes
//!
//! Supports multiple configuration sources with the following precedence (highest to lowest):
//! 1. CLI arguments
//! 2. Environment variables (FABRIC_* prefix)
//! 3. Configuration file (TOML)
//! 4. Default values
//!
//! The coordinator's worker list may additionally come from a YAML file of
//! `{name, addr}` entries.

use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::connection::{LinkConfig, DEFAULT_QUEUE_CAPACITY};
use crate::error::{Error, Result};
use crate::protocol::{FrameCodec, Framing, DEFAULT_MAX_FRAME_SIZE, DEFAULT_READ_BUFFER_SIZE};
use crate::task_source::DEFAULT_VOCABULARY;
use crate::types::WorkerSpec;

/// Full process configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct FabricConfig {
    /// Coordinator role settings
    pub coordinator: CoordinatorSettings,

    /// Worker role settings
    pub worker: WorkerSettings,

    /// Connection and wire settings shared by both roles
    pub connection: ConnectionSettings,

    /// Built-in task producer
    pub task_source: TaskSourceSettings,

    /// Logging configuration
    pub logging: LoggingSettings,
}

/// Coordinator settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CoordinatorSettings {
    /// Address results from workers are received on
    pub listen_addr: String,

    /// YAML file listing workers as `- name: ...\n  addr: ...`
    #[serde(skip_serializing_if = "Option::is_none")]
    pub workers_file: Option<String>,

    /// Inline worker entries, dialed before those from `workers_file`
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub workers: Vec<WorkerSpec>,
}

/// Worker settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct WorkerSettings {
    /// Name used in logs (defaults to the host name)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,

    /// Address tasks are received on
    pub listen_addr: String,

    /// Coordinator address results are relayed to (none = log only)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub coordinator_addr: Option<String>,
}

/// Connection settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ConnectionSettings {
    /// Wait between failed connection attempts in milliseconds
    pub reconnect_interval_ms: u64,

    /// Read buffer size in raw framing mode
    pub read_buffer_size: usize,

    /// Largest accepted length-prefixed frame in bytes
    pub max_frame_size: u32,

    /// Capacity of every internal queue
    pub queue_capacity: usize,

    /// Wire framing: "length-prefixed" or "raw"
    pub framing: Framing,
}

/// Task source settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TaskSourceSettings {
    /// Run the built-in producer
    pub enabled: bool,

    /// Emission interval in milliseconds
    pub interval_ms: u64,

    /// Payloads to pick from
    pub vocabulary: Vec<String>,
}

/// Logging settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingSettings {
    /// Log level: trace, debug, info, warn, error
    pub level: String,

    /// Log file path (empty = no file logging)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub file: Option<String>,

    /// Maximum log file size in MB before rotation
    pub max_file_size_mb: u64,

    /// Number of rotated log files to keep
    pub max_files: u32,

    /// Enable JSON formatted logging
    pub json_format: bool,
}

impl Default for CoordinatorSettings {
    fn default() -> Self {
        Self {
            listen_addr: ":3000".to_string(),
            workers_file: None,
            workers: Vec::new(),
        }
    }
}

impl Default for WorkerSettings {
    fn default() -> Self {
        Self {
            name: None,
            listen_addr: ":3333".to_string(),
            coordinator_addr: None,
        }
    }
}

impl Default for ConnectionSettings {
    fn default() -> Self {
        Self {
            reconnect_interval_ms: 3000,
            read_buffer_size: DEFAULT_READ_BUFFER_SIZE,
            max_frame_size: DEFAULT_MAX_FRAME_SIZE,
            queue_capacity: DEFAULT_QUEUE_CAPACITY,
            framing: Framing::LengthPrefixed,
        }
    }
}

impl Default for TaskSourceSettings {
    fn default() -> Self {
        Self {
            enabled: true,
            interval_ms: 2000,
            vocabulary: DEFAULT_VOCABULARY.iter().map(|s| s.to_string()).collect(),
        }
    }
}

impl Default for LoggingSettings {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            file: None,
            max_file_size_mb: 100,
            max_files: 5,
            json_format: false,
        }
    }
}

impl ConnectionSettings {
    pub fn codec(&self) -> FrameCodec {
        FrameCodec {
            framing: self.framing,
            read_buffer_size: self.read_buffer_size,
            max_frame_size: self.max_frame_size,
        }
    }

    pub fn reconnect_interval(&self) -> Duration {
        Duration::from_millis(self.reconnect_interval_ms)
    }

    pub fn link_config(&self) -> LinkConfig {
        LinkConfig {
            codec: self.codec(),
            reconnect_interval: self.reconnect_interval(),
            queue_capacity: self.queue_capacity,
        }
    }
}

impl TaskSourceSettings {
    pub fn interval(&self) -> Duration {
        Duration::from_millis(self.interval_ms)
    }
}

impl WorkerSettings {
    /// Configured name, else the host name
    pub fn resolved_name(&self) -> String {
        self.name
            .clone()
            .or_else(|| hostname::get().ok().and_then(|h| h.into_string().ok()))
            .unwrap_or_else(|| "worker".to_string())
    }
}

/// Which process a configuration is being checked for
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Role {
    Coordinator,
    Worker,
}

impl FabricConfig {
    /// Load configuration from file with environment variable overrides
    ///
    /// Only the checks shared by every role run here. Role-specific checks
    /// belong to [`FabricConfig::validate_for`], after CLI flags are merged.
    pub fn load(config_path: Option<&str>) -> Result<Self> {
        let config = Self::resolve(config_path)?;
        config.validate()?;
        Ok(config)
    }

    /// File, then environment overrides, then path expansion. No validation.
    pub fn resolve(config_path: Option<&str>) -> Result<Self> {
        let mut config = Self::default();

        // 1. Load from config file if it exists
        let config_file = Self::find_config_file(config_path)?;
        if let Some(path) = config_file {
            debug!(path = %path.display(), "Loading configuration file");
            config = Self::from_file(&path)?;
            info!(path = %path.display(), "Configuration loaded from file");
        }

        // 2. Apply environment variable overrides
        config.apply_env_overrides();

        // 3. Expand paths
        config.expand_paths();

        Ok(config)
    }

    /// Parse a TOML file without overrides or validation
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = read_config_file(path)?;
        toml::from_str(&content).map_err(|e| Error::config_parse(path, e.to_string()))
    }

    /// Find the configuration file to use
    fn find_config_file(explicit_path: Option<&str>) -> Result<Option<PathBuf>> {
        // If explicit path provided, use it (error if not found)
        if let Some(path) = explicit_path {
            let path = PathBuf::from(expand_path(path));
            if path.exists() {
                return Ok(Some(path));
            } else {
                return Err(Error::config_not_found(path));
            }
        }

        // Search in standard locations
        let search_paths = [
            // Current directory
            PathBuf::from("taskfabric.toml"),
            // User config directory
            dirs::config_dir()
                .map(|p| p.join("taskfabric").join("config.toml"))
                .unwrap_or_default(),
            // Home directory
            dirs::home_dir()
                .map(|p| p.join(".taskfabric").join("config.toml"))
                .unwrap_or_default(),
            // System config (Linux)
            PathBuf::from("/etc/taskfabric/config.toml"),
        ];

        for path in &search_paths {
            if !path.as_os_str().is_empty() && path.exists() {
                debug!(path = %path.display(), "Found configuration file");
                return Ok(Some(path.clone()));
            }
        }

        debug!("No configuration file found, using defaults");
        Ok(None)
    }

    /// Apply environment variable overrides
    fn apply_env_overrides(&mut self) {
        // Coordinator settings
        if let Ok(val) = std::env::var("FABRIC_COORDINATOR_LISTEN") {
            self.coordinator.listen_addr = val;
        }
        if let Ok(val) = std::env::var("FABRIC_WORKERS_FILE") {
            self.coordinator.workers_file = Some(val);
        }

        // Worker settings
        if let Ok(val) = std::env::var("FABRIC_WORKER_NAME") {
            self.worker.name = Some(val);
        }
        if let Ok(val) = std::env::var("FABRIC_WORKER_LISTEN") {
            self.worker.listen_addr = val;
        }
        if let Ok(val) = std::env::var("FABRIC_COORDINATOR_ADDR") {
            self.worker.coordinator_addr = Some(val);
        }

        // Connection settings
        if let Ok(val) = std::env::var("FABRIC_RECONNECT_INTERVAL_MS") {
            if let Ok(n) = val.parse() {
                self.connection.reconnect_interval_ms = n;
            }
        }
        if let Ok(val) = std::env::var("FABRIC_READ_BUFFER_SIZE") {
            if let Ok(n) = val.parse() {
                self.connection.read_buffer_size = n;
            }
        }
        if let Ok(val) = std::env::var("FABRIC_QUEUE_CAPACITY") {
            if let Ok(n) = val.parse() {
                self.connection.queue_capacity = n;
            }
        }
        if let Ok(val) = std::env::var("FABRIC_FRAMING") {
            if let Ok(framing) = val.parse() {
                self.connection.framing = framing;
            }
        }

        // Task source settings
        if let Ok(val) = std::env::var("FABRIC_TASK_SOURCE_ENABLED") {
            self.task_source.enabled = val.to_lowercase() == "true" || val == "1";
        }
        if let Ok(val) = std::env::var("FABRIC_TASK_INTERVAL_MS") {
            if let Ok(n) = val.parse() {
                self.task_source.interval_ms = n;
            }
        }

        // Logging settings
        if let Ok(val) = std::env::var("FABRIC_LOG_LEVEL") {
            self.logging.level = val;
        }
        if let Ok(val) = std::env::var("FABRIC_LOG_FILE") {
            self.logging.file = Some(val);
        }
        if let Ok(val) = std::env::var("FABRIC_LOG_JSON") {
            self.logging.json_format = val.to_lowercase() == "true" || val == "1";
        }
    }

    /// Expand ~ and other path variables
    fn expand_paths(&mut self) {
        if let Some(ref file) = self.coordinator.workers_file {
            self.coordinator.workers_file = Some(expand_path(file));
        }
        if let Some(ref file) = self.logging.file {
            self.logging.file = Some(expand_path(file));
        }
    }

    /// Validate everything one role needs, shared sections included
    pub fn validate_for(&self, role: Role) -> Result<()> {
        self.validate()?;
        match role {
            Role::Coordinator => {
                validate_addr("coordinator.listen_addr", &self.coordinator.listen_addr)?;
                self.validate_task_source()?;
                // Reads the YAML file and checks every entry
                self.resolved_workers()?;
            }
            Role::Worker => {
                validate_addr("worker.listen_addr", &self.worker.listen_addr)?;
                if let Some(ref addr) = self.worker.coordinator_addr {
                    validate_addr("worker.coordinator_addr", addr)?;
                }
            }
        }
        Ok(())
    }

    fn validate_task_source(&self) -> Result<()> {
        if !self.task_source.enabled {
            return Ok(());
        }
        if self.task_source.interval_ms == 0 {
            return Err(Error::config_field_invalid(
                "task_source.interval_ms",
                "must be greater than 0",
            ));
        }
        if self.task_source.vocabulary.is_empty() {
            return Err(Error::config_field_invalid(
                "task_source.vocabulary",
                "must contain at least one entry when the task source is enabled",
            ));
        }
        Ok(())
    }

    /// Validate the sections shared by both roles
    pub fn validate(&self) -> Result<()> {
        let conn = &self.connection;
        if conn.reconnect_interval_ms == 0 {
            return Err(Error::config_field_invalid(
                "connection.reconnect_interval_ms",
                "must be greater than 0",
            ));
        }
        if conn.read_buffer_size == 0 {
            return Err(Error::config_field_invalid(
                "connection.read_buffer_size",
                "must be greater than 0",
            ));
        }
        if conn.max_frame_size == 0 {
            return Err(Error::config_field_invalid(
                "connection.max_frame_size",
                "must be greater than 0",
            ));
        }
        if conn.queue_capacity == 0 {
            return Err(Error::config_field_invalid(
                "connection.queue_capacity",
                "must be greater than 0",
            ));
        }

        // Validate log level
        let valid_levels = ["trace", "debug", "info", "warn", "error"];
        if !valid_levels.contains(&self.logging.level.to_lowercase().as_str()) {
            return Err(Error::config_field_invalid(
                "logging.level",
                format!(
                    "Invalid log level '{}'. Must be one of: {}",
                    self.logging.level,
                    valid_levels.join(", ")
                ),
            ));
        }

        Ok(())
    }

    /// Worker list for the coordinator: inline entries, then the YAML file
    pub fn resolved_workers(&self) -> Result<Vec<WorkerSpec>> {
        let mut workers = self.coordinator.workers.clone();
        if let Some(ref file) = self.coordinator.workers_file {
            workers.extend(load_workers_file(Path::new(file))?);
        }

        let mut seen = HashSet::new();
        for worker in &workers {
            if worker.name.trim().is_empty() {
                return Err(Error::config_field_invalid(
                    "coordinator.workers",
                    "worker name cannot be empty",
                ));
            }
            if !seen.insert(worker.name.as_str()) {
                return Err(Error::config_field_invalid(
                    "coordinator.workers",
                    format!("duplicate worker name '{}'", worker.name),
                ));
            }
            validate_addr(&format!("coordinator.workers.{}", worker.name), &worker.addr)?;
        }

        Ok(workers)
    }
}

/// Read a YAML list of workers
pub fn load_workers_file(path: &Path) -> Result<Vec<WorkerSpec>> {
    let content = read_config_file(path)?;
    let workers: Vec<WorkerSpec> =
        serde_saphyr::from_str(&content).map_err(|e| Error::config_parse(path, e.to_string()))?;
    debug!(path = %path.display(), count = workers.len(), "Loaded workers file");
    Ok(workers)
}

fn read_config_file(path: &Path) -> Result<String> {
    fs::read_to_string(path).map_err(|source| match source.kind() {
        std::io::ErrorKind::NotFound => Error::ConfigNotFound {
            path: path.to_path_buf(),
            source: Some(source),
        },
        _ => Error::IoRead {
            path: path.to_path_buf(),
            source,
        },
    })
}

// ─────────────────────────────────────────────────────────────────
// Addresses
// ─────────────────────────────────────────────────────────────────

/// Address to bind: `:PORT` means every interface
pub fn listen_address(addr: &str) -> String {
    if addr.starts_with(':') {
        format!("0.0.0.0{}", addr)
    } else {
        addr.to_string()
    }
}

/// Address to dial: `:PORT` means this host
pub fn dial_address(addr: &str) -> String {
    if addr.starts_with(':') {
        format!("127.0.0.1{}", addr)
    } else {
        addr.to_string()
    }
}

fn validate_addr(field: &str, addr: &str) -> Result<()> {
    let port = addr
        .rsplit_once(':')
        .filter(|(host, _)| !host.chars().any(char::is_whitespace))
        .and_then(|(_, port)| port.parse::<u16>().ok());
    match port {
        Some(_) => Ok(()),
        None => Err(Error::config_field_invalid(
            field,
            format!("'{}' is not a host:port address", addr),
        )),
    }
}

/// Expand ~ and environment variables in paths
fn expand_path(path: &str) -> String {
    shellexpand::full(path)
        .unwrap_or_else(|_| std::borrow::Cow::Borrowed(path))
        .into_owned()
}

/// Initialize a new configuration file
pub fn init_config(path: Option<&str>, force: bool) -> Result<PathBuf> {
    let config_path = path
        .map(|p| PathBuf::from(expand_path(p)))
        .unwrap_or_else(|| {
            dirs::home_dir()
                .unwrap_or_else(|| PathBuf::from("."))
                .join(".taskfabric")
                .join("config.toml")
        });

    // Check if file exists
    if config_path.exists() && !force {
        return Err(Error::Config(format!(
            "Configuration file already exists: {}. Use --force to overwrite.",
            config_path.display()
        )));
    }

    // Create parent directories
    if let Some(parent) = config_path.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent).map_err(|source| Error::IoWrite {
                path: parent.to_path_buf(),
                source,
            })?;
        }
    }

    fs::write(&config_path, generate_default_config()).map_err(|source| Error::IoWrite {
        path: config_path.clone(),
        source,
    })?;

    Ok(config_path)
}

/// Generate default configuration content with comments
pub fn generate_default_config() -> String {
    r#"# Task fabric configuration

[coordinator]
# Address worker results are received on (":PORT" = all interfaces)
listen_addr = ":3000"

# YAML file listing workers to dial
# workers_file = "config/worker.yaml"

# Workers can also be listed inline
# [[coordinator.workers]]
# name = "w1"
# addr = ":3333"

[worker]
# Name used in logs (defaults to the host name)
# name = "w1"

# Address tasks are received on
listen_addr = ":3333"

# Coordinator to relay results to (omit to only log them)
# coordinator_addr = ":3000"

[connection]
# Wait between failed connection attempts in milliseconds
reconnect_interval_ms = 3000

# Wire framing: "length-prefixed" or "raw" (unframed, one read = one message)
framing = "length-prefixed"

# Read buffer size in bytes for raw framing
read_buffer_size = 1024

# Largest accepted frame in bytes for length-prefixed framing
max_frame_size = 1048576

# Capacity of internal queues
queue_capacity = 10

[task_source]
# Emit tasks from the built-in producer
enabled = true

# Emission interval in milliseconds
interval_ms = 2000

# Payloads to pick from
vocabulary = ["foo", "bar", "baz", "foobar", "foobaz"]

[logging]
# Log level: trace, debug, info, warn, error
level = "info"

# Log file path (omit for console only)
# file = "~/.taskfabric/logs/taskfabric.log"

# Number of rotated log files to keep
max_files = 5

# Maximum log file size in MB before rotation
max_file_size_mb = 100

# JSON formatted logs
json_format = false
"#
    .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::env;
    use std::io::Write;

    #[test]
    fn test_default_config() {
        let config = FabricConfig::default();
        assert_eq!(config.coordinator.listen_addr, ":3000");
        assert_eq!(config.worker.listen_addr, ":3333");
        assert_eq!(config.connection.reconnect_interval(), Duration::from_secs(3));
        assert_eq!(config.connection.read_buffer_size, 1024);
        assert_eq!(config.connection.framing, Framing::LengthPrefixed);
        assert_eq!(config.task_source.vocabulary.len(), 5);
        assert_eq!(config.logging.level, "info");
    }

    #[test]
    fn test_generated_default_matches_defaults() {
        let parsed: FabricConfig = toml::from_str(&generate_default_config()).unwrap();
        let defaults = FabricConfig::default();

        assert_eq!(parsed.coordinator.listen_addr, defaults.coordinator.listen_addr);
        assert_eq!(
            parsed.connection.reconnect_interval_ms,
            defaults.connection.reconnect_interval_ms
        );
        assert_eq!(parsed.connection.max_frame_size, defaults.connection.max_frame_size);
        assert_eq!(parsed.task_source.vocabulary, defaults.task_source.vocabulary);
        assert!(parsed.validate().is_ok());
    }

    #[test]
    fn test_env_override() {
        env::set_var("FABRIC_WORKER_LISTEN", ":4444");
        env::set_var("FABRIC_RECONNECT_INTERVAL_MS", "500");
        env::set_var("FABRIC_FRAMING", "raw");

        let mut config = FabricConfig::default();
        config.apply_env_overrides();

        assert_eq!(config.worker.listen_addr, ":4444");
        assert_eq!(config.connection.reconnect_interval_ms, 500);
        assert_eq!(config.connection.framing, Framing::Raw);

        env::remove_var("FABRIC_WORKER_LISTEN");
        env::remove_var("FABRIC_RECONNECT_INTERVAL_MS");
        env::remove_var("FABRIC_FRAMING");
    }

    #[test]
    fn test_validation_valid_config() {
        let config = FabricConfig::default();
        assert!(config.validate().is_ok());
        assert!(config.validate_for(Role::Coordinator).is_ok());
        assert!(config.validate_for(Role::Worker).is_ok());
    }

    #[test]
    fn test_validation_invalid_listen_addr() {
        let mut config = FabricConfig::default();
        config.coordinator.listen_addr = "localhost".to_string();
        assert!(config.validate_for(Role::Coordinator).is_err());
        assert!(config.validate_for(Role::Worker).is_ok());

        config.coordinator.listen_addr = "localhost:99999".to_string();
        assert!(config.validate_for(Role::Coordinator).is_err());
    }

    #[test]
    fn test_validation_zero_reconnect_interval() {
        let mut config = FabricConfig::default();
        config.connection.reconnect_interval_ms = 0;
        let err = config.validate().unwrap_err();
        assert!(matches!(
            err,
            Error::ConfigValidation { field: Some(ref f), .. }
                if f == "connection.reconnect_interval_ms"
        ));
    }

    #[test]
    fn test_validation_empty_vocabulary() {
        let mut config = FabricConfig::default();
        config.task_source.vocabulary.clear();
        assert!(config.validate_for(Role::Coordinator).is_err());
        assert!(config.validate_for(Role::Worker).is_ok());

        config.task_source.enabled = false;
        assert!(config.validate_for(Role::Coordinator).is_ok());
    }

    #[test]
    fn test_validation_invalid_log_level() {
        let mut config = FabricConfig::default();
        config.logging.level = "invalid".to_string();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_duplicate_worker_names_rejected() {
        let mut config = FabricConfig::default();
        config.coordinator.workers = vec![
            WorkerSpec::new("w1", ":3333"),
            WorkerSpec::new("w1", ":3334"),
        ];
        let err = config.resolved_workers().unwrap_err();
        assert!(err.to_string().contains("duplicate worker name 'w1'"));
    }

    #[test]
    fn test_workers_file_merged_after_inline() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(
            file,
            "- name: w2\n  addr: \":3334\"\n- name: w3\n  addr: \"10.0.0.3:3333\""
        )
        .unwrap();

        let mut config = FabricConfig::default();
        config.coordinator.workers = vec![WorkerSpec::new("w1", ":3333")];
        config.coordinator.workers_file = Some(file.path().to_string_lossy().into_owned());

        let names: Vec<_> = config
            .resolved_workers()
            .unwrap()
            .into_iter()
            .map(|w| w.name)
            .collect();
        assert_eq!(names, vec!["w1", "w2", "w3"]);
    }

    #[test]
    fn test_missing_workers_file_is_config_error() {
        let mut config = FabricConfig::default();
        config.coordinator.workers_file = Some("/nonexistent/worker.yaml".to_string());
        let err = config.validate_for(Role::Coordinator).unwrap_err();
        assert!(matches!(err, Error::ConfigNotFound { .. }));
    }

    #[test]
    fn test_worker_ignores_coordinator_workers_file() {
        let mut config = FabricConfig::default();
        config.coordinator.workers_file = Some("/nonexistent/worker.yaml".to_string());
        config.worker.coordinator_addr = Some("10.0.0.1:3000".to_string());

        assert!(config.validate().is_ok());
        assert!(config.validate_for(Role::Worker).is_ok());
    }

    #[test]
    fn test_worker_rejects_bad_coordinator_addr() {
        let mut config = FabricConfig::default();
        config.worker.coordinator_addr = Some("no-port".to_string());
        let err = config.validate_for(Role::Worker).unwrap_err();
        assert!(matches!(
            err,
            Error::ConfigValidation { field: Some(ref f), .. } if f == "worker.coordinator_addr"
        ));
    }

    #[test]
    fn test_address_normalization() {
        assert_eq!(listen_address(":3000"), "0.0.0.0:3000");
        assert_eq!(dial_address(":3000"), "127.0.0.1:3000");
        assert_eq!(dial_address("10.0.0.1:3000"), "10.0.0.1:3000");
    }

    #[test]
    fn test_path_expansion() {
        let mut config = FabricConfig::default();
        config.logging.file = Some("~/logs/taskfabric.log".to_string());
        config.expand_paths();

        assert!(!config.logging.file.unwrap().contains('~'));
    }

    #[test]
    fn test_parse_config_file() {
        let config_str = r#"
[coordinator]
listen_addr = "127.0.0.1:4000"

[[coordinator.workers]]
name = "w1"
addr = ":3333"

[worker]
name = "edge-1"
coordinator_addr = ":4000"

[connection]
framing = "raw"
read_buffer_size = 2048

[task_source]
enabled = false

[logging]
level = "debug"
"#;

        let config: FabricConfig = toml::from_str(config_str).unwrap();

        assert_eq!(config.coordinator.listen_addr, "127.0.0.1:4000");
        assert_eq!(config.coordinator.workers, vec![WorkerSpec::new("w1", ":3333")]);
        assert_eq!(config.worker.resolved_name(), "edge-1");
        assert_eq!(config.worker.coordinator_addr.as_deref(), Some(":4000"));
        assert_eq!(config.connection.codec(), FrameCodec::raw(2048));
        assert!(!config.task_source.enabled);
        assert_eq!(config.logging.level, "debug");
    }
}
