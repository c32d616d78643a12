// Unless explicitly stated otherwise all files in this repository are licensed
// under the Apache License Version 2.0.
// This product includes software developed at Datadog (https://www.datadoghq.com/).
// Copyright 2026-present Datadog, Inc.

use crate::client::{ApiConfig, DEFAULT_HOST, DEFAULT_PORT};
use crate::supervisor::SpawnOptions;
use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;

pub const CONFIG_ENV: &str = "SERVER_SUPERVISOR_CONFIG";
const DEFAULT_CONFIG_PATH: &str = "/etc/server-supervisor/supervisor.yaml";
const DEFAULT_LOG_FILE: &str = "/var/log/server-supervisor/server.log";

fn default_command() -> String {
    "ollama".to_string()
}

fn default_log_file() -> PathBuf {
    PathBuf::from(DEFAULT_LOG_FILE)
}

fn default_api_host() -> String {
    format!("{DEFAULT_HOST}:{DEFAULT_PORT}")
}

fn default_probe_timeout() -> u64 {
    5
}

fn default_log_level() -> String {
    "info".to_string()
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SupervisorConfig {
    /// Logical name of the server executable, resolved at spawn time.
    #[serde(default = "default_command")]
    pub command: String,
    #[serde(default = "default_log_file")]
    pub log_file: PathBuf,
    #[serde(default = "default_api_host")]
    pub api_host: String,
    /// Seconds to wait after SIGTERM on shutdown before killing the server.
    /// Absent means the server is left to exit on its own.
    pub stop_timeout: Option<u64>,
    #[serde(default = "default_probe_timeout")]
    pub probe_timeout: u64,
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

impl Default for SupervisorConfig {
    fn default() -> Self {
        Self {
            command: default_command(),
            log_file: default_log_file(),
            api_host: default_api_host(),
            stop_timeout: None,
            probe_timeout: default_probe_timeout(),
            log_level: default_log_level(),
        }
    }
}

impl SupervisorConfig {
    pub fn spawn_options(&self) -> SpawnOptions {
        SpawnOptions {
            log_file: self.log_file.clone(),
            stop_timeout: self.stop_timeout.map(Duration::from_secs),
        }
    }

    pub fn api_config(&self) -> ApiConfig {
        ApiConfig::new(self.api_host.clone())
    }

    pub fn probe_timeout(&self) -> Duration {
        Duration::from_secs(self.probe_timeout)
    }

    pub fn log_level(&self) -> Result<log::Level> {
        self.log_level
            .parse()
            .with_context(|| format!("invalid log_level: {}", self.log_level))
    }
}

/// Config file location: `SERVER_SUPERVISOR_CONFIG`, else the system default.
pub fn config_path() -> PathBuf {
    std::env::var(CONFIG_ENV)
        .map(PathBuf::from)
        .unwrap_or_else(|_| PathBuf::from(DEFAULT_CONFIG_PATH))
}

/// Load the config at `path`. A missing file yields the defaults; a file that
/// exists but cannot be read or parsed is an error. Runs before the logger is
/// set up, so callers report a missing file themselves.
pub fn load_config(path: &Path) -> Result<SupervisorConfig> {
    if !path.exists() {
        return Ok(SupervisorConfig::default());
    }
    let contents =
        std::fs::read_to_string(path).with_context(|| format!("reading {}", path.display()))?;
    if contents.trim().is_empty() {
        return Ok(SupervisorConfig::default());
    }
    let config: SupervisorConfig =
        serde_yaml::from_str(&contents).with_context(|| format!("parsing {}", path.display()))?;
    Ok(config)
}
