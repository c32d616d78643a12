// Unless explicitly stated otherwise all files in this repository are licensed
// under the Apache License Version 2.0.
// This product includes software developed at Datadog (https://www.datadoghq.com/).
// Copyright 2026-present Datadog, Inc.

//! Keeps a local server executable running: launches it with `serve`, copies its
//! output into a log file, restarts it whenever it exits before shutdown, and
//! checks whether its API answers a heartbeat.

pub mod client;
pub mod config;
pub mod error;
pub mod probe;
pub mod process;
pub mod relay;
pub mod resolve;
pub mod state;
pub mod supervisor;

pub use client::{ApiClient, ApiConfig, HttpApiClient};
pub use error::{ClientError, SpawnError};
pub use probe::LivenessProber;
pub use resolve::{resolve_command, server_command};
pub use state::{ServerState, ServerStatus};
pub use supervisor::{ServerHandle, SpawnOptions, spawn_server};
