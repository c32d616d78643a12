// Unless explicitly stated otherwise all files in this repository are licensed
// under the Apache License Version 2.0.
// This product includes software developed at Datadog (https://www.datadoghq.com/).
// Copyright 2026-present Datadog, Inc.

use log::debug;
use std::ffi::OsString;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use tokio::process::Command;

/// The single directive the server is always launched with.
pub const SERVE_ARG: &str = "serve";

/// Locations consulted when turning a command name into a launchable path.
#[derive(Debug, Clone, Default)]
pub struct SearchRoots {
    /// Directory holding the running executable.
    pub exe_dir: Option<PathBuf>,
    /// Value of the command search path (`PATH`).
    pub search_path: Option<OsString>,
    /// Current working directory.
    pub cwd: Option<PathBuf>,
}

impl SearchRoots {
    pub fn from_env() -> Self {
        Self {
            exe_dir: std::env::current_exe()
                .ok()
                .and_then(|exe| exe.parent().map(Path::to_path_buf)),
            search_path: std::env::var_os("PATH"),
            cwd: std::env::current_dir().ok(),
        }
    }

    /// Resolve `name`: sibling of the running binary, then the search path, then
    /// the working directory. Each candidate must exist on disk; a search-path hit
    /// is stat'ed again. Falls back to the bare name, leaving the failure to the
    /// launch attempt.
    pub fn resolve(&self, name: &str) -> PathBuf {
        if let Some(path) = self.exe_dir.as_ref().map(|dir| dir.join(name))
            && exists(&path)
        {
            return path;
        }

        if let Some(ref paths) = self.search_path {
            let cwd = self.cwd.clone().unwrap_or_else(|| PathBuf::from("."));
            match which::which_in(name, Some(paths), cwd) {
                Ok(path) if exists(&path) => return path,
                Ok(path) => debug!("search path returned missing entry {}", path.display()),
                Err(e) => debug!("{name} not found on search path: {e}"),
            }
        }

        if let Some(path) = self.cwd.as_ref().map(|dir| dir.join(name))
            && exists(&path)
        {
            return path;
        }

        PathBuf::from(name)
    }
}

fn exists(path: &Path) -> bool {
    std::fs::metadata(path).is_ok()
}

/// Resolve `name` against the current process environment.
pub fn resolve_command(name: &str) -> PathBuf {
    SearchRoots::from_env().resolve(name)
}

/// Build the launch command for a resolved server path. All three standard
/// streams are piped.
pub fn server_command(path: &Path) -> Command {
    let mut cmd = Command::new(path);
    cmd.arg(SERVE_ARG)
        .stdin(Stdio::piped())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped());
    configure_platform(&mut cmd);
    cmd
}

#[cfg(windows)]
fn configure_platform(cmd: &mut Command) {
    use windows_sys::Win32::System::Threading::{CREATE_NEW_PROCESS_GROUP, CREATE_NO_WINDOW};

    // No console window, and keep the child out of our console's Ctrl+C group.
    cmd.creation_flags(CREATE_NO_WINDOW | CREATE_NEW_PROCESS_GROUP);
}

#[cfg(not(windows))]
fn configure_platform(_cmd: &mut Command) {}
