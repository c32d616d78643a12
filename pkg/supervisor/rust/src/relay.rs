// Unless explicitly stated otherwise all files in this repository are licensed
// under the Apache License Version 2.0.
// This product includes software developed at Datadog (https://www.datadoghq.com/).
// Copyright 2026-present Datadog, Inc.

use log::debug;
use std::fs::File;
use tokio::io::AsyncRead;
use tokio::task::JoinHandle;

/// Copy `stream` into `sink` until EOF. Errors end the copy and are only logged;
/// the supervisor loop, not the relay, decides whether the server is healthy.
/// The sink is dropped (closed) when the copy finishes.
pub fn relay<R>(name: &'static str, mut stream: R, sink: File) -> JoinHandle<u64>
where
    R: AsyncRead + Unpin + Send + 'static,
{
    tokio::spawn(async move {
        let mut sink = tokio::fs::File::from_std(sink);
        match tokio::io::copy(&mut stream, &mut sink).await {
            Ok(n) => {
                debug!("[server] {name} relay finished after {n} bytes");
                n
            }
            Err(e) => {
                debug!("[server] {name} relay ended early: {e}");
                0
            }
        }
    })
}

/// Duplicated log handles for one child instance, one per output stream.
/// Each relay closes only the handle it owns, so the shared log file is never
/// closed twice through the same handle.
#[derive(Debug)]
pub struct LogSinks {
    stdout: File,
    stderr: File,
}

impl LogSinks {
    pub fn duplicate(log: &File) -> std::io::Result<Self> {
        Ok(Self {
            stdout: log.try_clone()?,
            stderr: log.try_clone()?,
        })
    }
}

/// Start the stdout and stderr relays for one child instance.
pub fn relay_output<O, E>(
    stdout: O,
    stderr: E,
    sinks: LogSinks,
) -> (JoinHandle<u64>, JoinHandle<u64>)
where
    O: AsyncRead + Unpin + Send + 'static,
    E: AsyncRead + Unpin + Send + 'static,
{
    (
        relay("stdout", stdout, sinks.stdout),
        relay("stderr", stderr, sinks.stderr),
    )
}
