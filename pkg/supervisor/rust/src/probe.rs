// Unless explicitly stated otherwise all files in this repository are licensed
// under the Apache License Version 2.0.
// This product includes software developed at Datadog (https://www.datadoghq.com/).
// Copyright 2026-present Datadog, Inc.

use crate::client::{ApiClient, ApiConfig, HttpApiClient};
use log::{debug, info};
use std::time::Duration;

/// Answers "is the server currently serving its API?" with a single heartbeat.
#[derive(Debug, Clone)]
pub struct LivenessProber {
    config: ApiConfig,
}

impl LivenessProber {
    pub fn new(config: ApiConfig) -> Self {
        Self { config }
    }

    /// Returns false when the client cannot be built or the heartbeat fails for
    /// any reason, including `timeout`. Failures are logged, never returned.
    pub async fn is_running(&self, timeout: Duration) -> bool {
        match HttpApiClient::new(&self.config) {
            Ok(client) => heartbeat(&client, timeout).await,
            Err(e) => {
                debug!("server client: {e}");
                info!("unable to connect to server");
                false
            }
        }
    }
}

/// Single heartbeat through an already constructed client.
pub async fn heartbeat<C: ApiClient>(client: &C, timeout: Duration) -> bool {
    match client.heartbeat(timeout).await {
        Ok(()) => true,
        Err(e) => {
            debug!("heartbeat from server: {e}");
            info!("unable to connect to server");
            false
        }
    }
}
