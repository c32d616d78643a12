// Unless explicitly stated otherwise all files in this repository are licensed
// under the Apache License Version 2.0.
// This product includes software developed at Datadog (https://www.datadoghq.com/).
// Copyright 2026-present Datadog, Inc.

use crate::error::ClientError;
use reqwest::Url;
use std::future::Future;
use std::time::Duration;

pub const DEFAULT_HOST: &str = "127.0.0.1";
pub const DEFAULT_PORT: u16 = 11434;

/// Where the server's API listens.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApiConfig {
    /// `host`, `host:port`, or `scheme://host:port/path`.
    pub host: String,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            host: format!("{DEFAULT_HOST}:{DEFAULT_PORT}"),
        }
    }
}

impl ApiConfig {
    pub fn new(host: impl Into<String>) -> Self {
        Self { host: host.into() }
    }

    /// Base URL of the API. A missing scheme means `http`; a missing host means
    /// 127.0.0.1; a missing port means 11434, or 80/443 when the scheme is given
    /// explicitly.
    pub fn base_url(&self) -> Result<Url, ClientError> {
        let raw = self.host.trim();
        let (scheme, rest, default_port) = match raw.split_once("://") {
            None => ("http", raw, DEFAULT_PORT),
            Some(("http", rest)) => ("http", rest, 80),
            Some(("https", rest)) => ("https", rest, 443),
            Some((scheme, _)) => {
                return Err(self.invalid(format!("unsupported scheme {scheme}")));
            }
        };
        let (hostport, path) = rest.split_once('/').unwrap_or((rest, ""));
        let (host, port) = self.split_host_port(hostport, default_port)?;

        Url::parse(&format!("{scheme}://{host}:{port}/{path}"))
            .map_err(|e| self.invalid(e.to_string()))
    }

    fn split_host_port(
        &self,
        hostport: &str,
        default_port: u16,
    ) -> Result<(String, u16), ClientError> {
        if hostport.is_empty() {
            return Ok((DEFAULT_HOST.to_string(), default_port));
        }

        if let Some(rest) = hostport.strip_prefix('[') {
            let (addr, tail) = rest
                .split_once(']')
                .ok_or_else(|| self.invalid("unterminated IPv6 address".to_string()))?;
            let port = match tail {
                "" => default_port,
                _ => match tail.strip_prefix(':') {
                    Some(port) => self.parse_port(port)?,
                    None => return Err(self.invalid(format!("unexpected {tail:?} after address"))),
                },
            };
            return Ok((format!("[{addr}]"), port));
        }

        match hostport.rsplit_once(':') {
            // bare IPv6 address without brackets
            Some((host, _)) if host.contains(':') => Ok((format!("[{hostport}]"), default_port)),
            Some((host, port)) => {
                let host = if host.is_empty() { DEFAULT_HOST } else { host };
                Ok((host.to_string(), self.parse_port(port)?))
            }
            None => Ok((hostport.to_string(), default_port)),
        }
    }

    fn parse_port(&self, port: &str) -> Result<u16, ClientError> {
        port.parse()
            .map_err(|_| self.invalid(format!("invalid port {port:?}")))
    }

    fn invalid(&self, reason: String) -> ClientError {
        ClientError::InvalidHost {
            host: self.host.clone(),
            reason,
        }
    }
}

/// The part of the server API the supervisor relies on.
pub trait ApiClient {
    /// One minimal round trip proving the API accepts requests.
    fn heartbeat(&self, timeout: Duration) -> impl Future<Output = Result<(), ClientError>> + Send;
}

pub struct HttpApiClient {
    base: Url,
    http: reqwest::Client,
}

impl HttpApiClient {
    pub fn new(config: &ApiConfig) -> Result<Self, ClientError> {
        let base = config.base_url()?;
        let http = reqwest::Client::builder()
            .user_agent(concat!("server-supervisor/", env!("CARGO_PKG_VERSION")))
            .no_proxy()
            .build()
            .map_err(ClientError::Build)?;
        Ok(Self { base, http })
    }
}

impl ApiClient for HttpApiClient {
    /// `HEAD /`; any status below 400 counts as alive.
    async fn heartbeat(&self, timeout: Duration) -> Result<(), ClientError> {
        let request = self.http.head(self.base.clone()).send();
        let response = tokio::time::timeout(timeout, request)
            .await
            .map_err(|_| ClientError::Timeout(timeout))?
            .map_err(ClientError::Request)?;

        let status = response.status();
        if status.is_client_error() || status.is_server_error() {
            return Err(ClientError::Status(status));
        }
        Ok(())
    }
}
