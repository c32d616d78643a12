// Unless explicitly stated otherwise all files in this repository are licensed
// under the Apache License Version 2.0.
// This product includes software developed at Datadog (https://www.datadoghq.com/).
// Copyright 2026-present Datadog, Inc.

use crate::error::SpawnError;
use crate::relay::{LogSinks, relay_output};
use crate::resolve::{SERVE_ARG, server_command};
use log::{info, warn};
use std::fs::File;
use std::path::PathBuf;
use std::process::ExitStatus;
use tokio::process::{Child, ChildStdin};

/// One supervised server executable. Holds at most one live child at a time;
/// a new instance can only be started once the previous one has been waited on.
pub struct ServerProcess {
    path: PathBuf,
    log: File,
    child: Option<Child>,
    stdin: Option<ChildStdin>,
    crash_count: u32,
}

impl ServerProcess {
    pub fn new(path: PathBuf, log: File) -> Self {
        Self {
            path,
            log,
            child: None,
            stdin: None,
            crash_count: 0,
        }
    }

    pub fn args(&self) -> [&'static str; 1] {
        [SERVE_ARG]
    }

    pub fn is_running(&self) -> bool {
        self.child.is_some()
    }

    pub fn pid(&self) -> Option<u32> {
        self.child.as_ref().and_then(Child::id)
    }

    pub fn crash_count(&self) -> u32 {
        self.crash_count
    }

    /// Count one more restart cycle. Never reset for the lifetime of the process.
    pub fn record_crash(&mut self) -> u32 {
        self.crash_count += 1;
        self.crash_count
    }

    /// Start a new child instance and attach the output relays to it.
    pub fn spawn(&mut self) -> Result<(), SpawnError> {
        debug_assert!(self.child.is_none(), "previous instance not waited on");

        // Duplicated before launch: once the pipes are taken they must reach a relay.
        let sinks = LogSinks::duplicate(&self.log).map_err(SpawnError::LogHandle)?;
        let mut child = server_command(&self.path)
            .spawn()
            .map_err(|source| SpawnError::Start {
                path: self.path.clone(),
                source,
            })?;

        let stdout = child.stdout.take().ok_or(SpawnError::Pipe { stream: "stdout" })?;
        let stderr = child.stderr.take().ok_or(SpawnError::Pipe { stream: "stderr" })?;
        let stdin = child.stdin.take().ok_or(SpawnError::Pipe { stream: "stdin" })?;

        relay_output(stdout, stderr, sinks);

        info!(
            "[server] spawned (pid={}, cmd={})",
            child.id().unwrap_or(0),
            self.path.display()
        );
        self.child = Some(child);
        self.stdin = Some(stdin);
        Ok(())
    }

    /// Wait for the current child to exit, then close its stdin. Returns the
    /// exit code: 0 when there is no status to read, -1 when the child was
    /// terminated by a signal.
    ///
    /// Cancel safe: if the future is dropped the child stays attached.
    pub async fn wait(&mut self) -> i32 {
        let status = match self.child.as_mut() {
            Some(child) => Some(child.wait().await),
            None => None,
        };
        self.child = None;
        self.close_stdin();
        match status {
            Some(Ok(status)) => {
                info!("[server] exited with {status}");
                exit_code(status)
            }
            Some(Err(e)) => {
                warn!("[server] failed to wait on child: {e}");
                0
            }
            None => 0,
        }
    }

    fn close_stdin(&mut self) {
        self.stdin.take();
    }

    /// Ask the child to stop. On Unix this sends SIGTERM; elsewhere there is no
    /// graceful request and the child is left running.
    pub fn terminate(&self) {
        #[cfg(unix)]
        if let Some(pid) = self.pid() {
            use nix::sys::signal::{self, Signal};
            use nix::unistd::Pid;

            info!("[server] sending SIGTERM");
            if let Err(e) = signal::kill(Pid::from_raw(pid as i32), Signal::SIGTERM) {
                warn!("[server] failed to send SIGTERM: {e}");
            }
        }
    }

    /// Kill the child without waiting for it.
    pub fn kill(&mut self) {
        if let Some(ref mut child) = self.child {
            info!("[server] killing pid {}", child.id().unwrap_or(0));
            if let Err(e) = child.start_kill() {
                warn!("[server] failed to kill: {e}");
            }
        }
    }
}

fn exit_code(status: ExitStatus) -> i32 {
    status.code().unwrap_or(-1)
}
