// Unless explicitly stated otherwise all files in this repository are licensed
// under the Apache License Version 2.0.
// This product includes software developed at Datadog (https://www.datadoghq.com/).
// Copyright 2026-present Datadog, Inc.

use std::path::PathBuf;
use thiserror::Error;

/// Setup failures returned by [`crate::spawn_server`] before the restart loop starts.
#[derive(Error, Debug)]
pub enum SpawnError {
    #[error("create server log dir {}: {source}", path.display())]
    LogDir {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("failed to create server log {}: {source}", path.display())]
    LogFile {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("failed to duplicate server log handle: {0}")]
    LogHandle(#[source] std::io::Error),
    #[error("failed to spawn server {stream} pipe")]
    Pipe { stream: &'static str },
    #[error("failed to start server {}: {source}", path.display())]
    Start {
        path: PathBuf,
        source: std::io::Error,
    },
}

/// Failures of the API client used by the liveness probe.
#[derive(Error, Debug)]
pub enum ClientError {
    #[error("invalid server host {host:?}: {reason}")]
    InvalidHost { host: String, reason: String },
    #[error("could not build http client: {0}")]
    Build(#[source] reqwest::Error),
    #[error("heartbeat request failed: {0}")]
    Request(#[source] reqwest::Error),
    #[error("heartbeat returned status {0}")]
    Status(reqwest::StatusCode),
    #[error("heartbeat timed out after {0:?}")]
    Timeout(std::time::Duration),
}
