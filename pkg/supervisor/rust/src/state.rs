// Unless explicitly stated otherwise all files in this repository are licensed
// under the Apache License Version 2.0.
// This product includes software developed at Datadog (https://www.datadoghq.com/).
// Copyright 2026-present Datadog, Inc.

use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ServerState {
    /// Log destination prepared, first child not started yet.
    Starting,
    /// A child process is alive.
    Running,
    /// The current child exited; the loop is deciding what to do next.
    Exited,
    /// Waiting out the respawn delay or backoff before the next start.
    Restarting,
    /// Shutdown observed, exit code delivered. Final.
    Terminated,
}

impl ServerState {
    pub fn is_alive(self) -> bool {
        self == ServerState::Running
    }

    pub(crate) fn can_transition_to(self, next: ServerState) -> bool {
        use ServerState::*;
        matches!(
            (self, next),
            (Starting, Running)
                | (Running, Exited)
                | (Exited, Restarting)
                | (Exited, Terminated)
                | (Restarting, Running)
                | (Restarting, Terminated)
                // a failed restart is observed as an immediate exit
                | (Restarting, Exited)
        )
    }
}

impl fmt::Display for ServerState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ServerState::Starting => write!(f, "starting"),
            ServerState::Running => write!(f, "running"),
            ServerState::Exited => write!(f, "exited"),
            ServerState::Restarting => write!(f, "restarting"),
            ServerState::Terminated => write!(f, "terminated"),
        }
    }
}

/// Snapshot of the supervised server, published on every state change.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ServerStatus {
    pub state: ServerState,
    pub pid: Option<u32>,
    pub crash_count: u32,
    pub last_exit_code: Option<i32>,
}

impl ServerStatus {
    pub(crate) fn starting() -> Self {
        Self {
            state: ServerState::Starting,
            pid: None,
            crash_count: 0,
            last_exit_code: None,
        }
    }
}
