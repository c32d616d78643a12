// Unless explicitly stated otherwise all files in this repository are licensed
// under the Apache License Version 2.0.
// This product includes software developed at Datadog (https://www.datadoghq.com/).
// Copyright 2026-present Datadog, Inc.

use crate::error::SpawnError;
use crate::process::ServerProcess;
use crate::resolve::resolve_command;
use crate::state::{ServerState, ServerStatus};
use log::{debug, error, info, warn};
use std::fs::{File, OpenOptions};
use std::path::{Path, PathBuf};
use tokio::sync::{oneshot, watch};
use tokio::task::JoinHandle;
use tokio::time::{Duration, timeout};
use tokio_util::sync::CancellationToken;

/// Pause between an unexpected exit and the next start attempt.
pub const RESPAWN_DELAY: Duration = Duration::from_millis(500);

/// Extra wait per recorded crash after a start attempt itself fails.
pub const RESTART_BACKOFF_STEP: Duration = Duration::from_secs(1);

/// Backoff applied after a failed restart: linear in the crash count.
pub fn restart_backoff(crash_count: u32) -> Duration {
    RESTART_BACKOFF_STEP * crash_count
}

#[derive(Debug, Clone)]
pub struct SpawnOptions {
    /// Append-only destination for the server's stdout and stderr.
    pub log_file: PathBuf,
    /// When set, a shutdown request sends SIGTERM to a running server and kills
    /// it after this long. When unset the server is left to exit on its own.
    pub stop_timeout: Option<Duration>,
}

impl SpawnOptions {
    pub fn new(log_file: impl Into<PathBuf>) -> Self {
        Self {
            log_file: log_file.into(),
            stop_timeout: None,
        }
    }
}

/// Handle to a supervision session. The final exit code is the only result the
/// session produces; it is delivered once, after shutdown has been requested and
/// the last server instance has exited.
pub struct ServerHandle {
    done: oneshot::Receiver<i32>,
    status: watch::Receiver<ServerStatus>,
    task: JoinHandle<()>,
}

impl ServerHandle {
    pub fn status(&self) -> ServerStatus {
        *self.status.borrow()
    }

    pub fn subscribe(&self) -> watch::Receiver<ServerStatus> {
        self.status.clone()
    }

    /// Wait for the session to end and return the server's last exit code.
    /// Returns -1 if the session ended without reporting one.
    pub async fn wait(self) -> i32 {
        let code = match self.done.await {
            Ok(code) => code,
            Err(_) => {
                warn!("[server] supervisor ended without an exit code");
                -1
            }
        };
        if let Err(e) = self.task.await
            && !e.is_cancelled()
        {
            warn!("[server] supervisor task failed: {e}");
        }
        code
    }

    /// Stop supervising immediately. The running server, if any, is left alone
    /// and no exit code is delivered.
    pub fn abort(&self) {
        self.task.abort();
    }
}

/// Start the server and keep it running until `shutdown` is cancelled.
///
/// Setup failures (log directory, log file, pipes, first start) are returned
/// here. Once the first instance is up the restart loop runs in a background
/// task and never gives up: each unexpected exit is followed by a short delay
/// and a new start, and failed starts back off linearly in the crash count.
pub fn spawn_server(
    shutdown: CancellationToken,
    command: &str,
    options: SpawnOptions,
) -> Result<ServerHandle, SpawnError> {
    if let Some(dir) = options.log_file.parent()
        && !dir.as_os_str().is_empty()
        && !dir.exists()
    {
        create_log_dir(dir)?;
    }

    let path = resolve_command(command);
    let log = open_log(&options.log_file)?;

    let mut process = ServerProcess::new(path, log);
    let (status_tx, status_rx) = watch::channel(ServerStatus::starting());
    let mut reporter = Reporter(status_tx);

    process.spawn()?;
    reporter.running(process.pid());
    info!("[server] logs {}", options.log_file.display());

    let (done_tx, done_rx) = oneshot::channel();
    let task = tokio::spawn(supervise(
        process,
        shutdown,
        options.stop_timeout,
        reporter,
        done_tx,
    ));

    Ok(ServerHandle {
        done: done_rx,
        status: status_rx,
        task,
    })
}

fn create_log_dir(dir: &Path) -> Result<(), SpawnError> {
    let mut builder = std::fs::DirBuilder::new();
    builder.recursive(true);
    #[cfg(unix)]
    {
        use std::os::unix::fs::DirBuilderExt;
        builder.mode(0o755);
    }
    builder.create(dir).map_err(|source| SpawnError::LogDir {
        path: dir.to_path_buf(),
        source,
    })
}

fn open_log(path: &Path) -> Result<File, SpawnError> {
    let mut options = OpenOptions::new();
    options.create(true).append(true);
    #[cfg(unix)]
    {
        use std::os::unix::fs::OpenOptionsExt;
        options.mode(0o755);
    }
    options.open(path).map_err(|source| SpawnError::LogFile {
        path: path.to_path_buf(),
        source,
    })
}

async fn supervise(
    mut process: ServerProcess,
    shutdown: CancellationToken,
    stop_timeout: Option<Duration>,
    mut reporter: Reporter,
    done: oneshot::Sender<i32>,
) {
    loop {
        let code = wait_for_exit(&mut process, &shutdown, stop_timeout).await;
        reporter.exited(code);

        if shutdown.is_cancelled() {
            debug!("[server] shutdown with exit code {code}");
            finish(&mut reporter, done, code);
            return;
        }

        let crashes = process.record_crash();
        warn!("[server] crash {crashes} - exit code {code} - respawning");
        reporter.restarting(crashes);

        if !pause(&shutdown, RESPAWN_DELAY).await {
            debug!("[server] shutdown during respawn delay, exit code {code}");
            finish(&mut reporter, done, code);
            return;
        }

        match process.spawn() {
            Ok(()) => reporter.running(process.pid()),
            Err(e) => {
                error!("[server] failed to restart server: {e}");
                // The next wait sees no child and counts it as an exit.
                pause(&shutdown, restart_backoff(crashes)).await;
            }
        }
    }
}

/// Wait for the current instance to exit. With a stop timeout configured, a
/// shutdown request while the server runs asks it to stop and then kills it.
async fn wait_for_exit(
    process: &mut ServerProcess,
    shutdown: &CancellationToken,
    stop_timeout: Option<Duration>,
) -> i32 {
    let Some(grace) = stop_timeout else {
        return process.wait().await;
    };
    if !process.is_running() {
        return process.wait().await;
    }

    tokio::select! {
        code = process.wait() => return code,
        _ = shutdown.cancelled() => {}
    }

    process.terminate();
    match timeout(grace, process.wait()).await {
        Ok(code) => code,
        Err(_) => {
            warn!(
                "[server] stop timeout ({}s) reached, killing",
                grace.as_secs_f32()
            );
            process.kill();
            process.wait().await
        }
    }
}

/// Sleep for `delay`. Returns false if shutdown was requested first.
async fn pause(shutdown: &CancellationToken, delay: Duration) -> bool {
    tokio::select! {
        _ = tokio::time::sleep(delay) => true,
        _ = shutdown.cancelled() => false,
    }
}

fn finish(reporter: &mut Reporter, done: oneshot::Sender<i32>, code: i32) {
    reporter.terminated();
    if done.send(code).is_err() {
        debug!("[server] nobody waiting for exit code {code}");
    }
}

/// Publishes status snapshots and checks that each transition is legal.
struct Reporter(watch::Sender<ServerStatus>);

impl Reporter {
    fn transition(&mut self, next: ServerState, update: impl FnOnce(&mut ServerStatus)) {
        self.0.send_modify(|status| {
            if !status.state.can_transition_to(next) {
                warn!("[server] unexpected transition {} -> {next}", status.state);
            }
            status.state = next;
            update(status);
        });
    }

    fn running(&mut self, pid: Option<u32>) {
        self.transition(ServerState::Running, |s| s.pid = pid);
    }

    fn exited(&mut self, code: i32) {
        self.transition(ServerState::Exited, |s| {
            s.pid = None;
            s.last_exit_code = Some(code);
        });
    }

    fn restarting(&mut self, crash_count: u32) {
        self.transition(ServerState::Restarting, |s| s.crash_count = crash_count);
    }

    fn terminated(&mut self) {
        self.transition(ServerState::Terminated, |_| {});
    }
}
