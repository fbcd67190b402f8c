//! FortiOS REST client
//!
//! Wraps `reqwest::Client` with CMDB URL construction, token auth, the
//! `{ results, status, http_status }` envelope, and a fixed retry counter for
//! connection-level failures. Device-side rejections are never retried.

use std::path::PathBuf;
use std::time::Duration;

use fortios_core::WireObject;
use fortios_core::capability::FirmwareVersion;
use fortios_core::transport::{BoxFuture, Transport, TransportError, TransportResult};
use reqwest::{Method, StatusCode, Url};
use serde::Deserialize;
use serde_json::Value as Json;

/// TLS verification mode
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum TlsMode {
    /// Use the system certificate store
    #[default]
    System,
    /// Use a custom CA certificate from the given PEM file
    CustomCa(PathBuf),
    /// Accept any certificate (factory self-signed devices)
    DangerAcceptInvalid,
}

/// Connection settings for one FortiGate
#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// Host name or base URL; `https://` is assumed when no scheme is given
    pub host: String,
    /// REST API administrator token
    pub token: String,
    /// Virtual domain used when a resource does not name one
    pub vdom: Option<String>,
    pub tls: TlsMode,
    pub timeout: Duration,
    /// Extra attempts after a connection failure or timeout
    pub retries: u32,
    pub retry_delay: Duration,
}

impl ClientConfig {
    pub fn new(host: impl Into<String>, token: impl Into<String>) -> Self {
        Self {
            host: host.into(),
            token: token.into(),
            vdom: None,
            tls: TlsMode::System,
            timeout: Duration::from_secs(30),
            retries: 3,
            retry_delay: Duration::from_secs(1),
        }
    }

    pub fn with_vdom(mut self, vdom: impl Into<String>) -> Self {
        let vdom = vdom.into();
        self.vdom = if vdom.is_empty() { None } else { Some(vdom) };
        self
    }

    pub fn with_tls(mut self, tls: TlsMode) -> Self {
        self.tls = tls;
        self
    }

    pub fn with_retries(mut self, retries: u32) -> Self {
        self.retries = retries;
        self
    }

    pub fn with_retry_delay(mut self, delay: Duration) -> Self {
        self.retry_delay = delay;
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Build a `reqwest::Client` from this config
    fn build_http(&self) -> Result<reqwest::Client, ClientError> {
        let mut builder = reqwest::Client::builder()
            .timeout(self.timeout)
            .user_agent(concat!("fortios/", env!("CARGO_PKG_VERSION")));

        match &self.tls {
            TlsMode::System => {}
            TlsMode::CustomCa(path) => {
                let cert_pem = std::fs::read(path)
                    .map_err(|e| ClientError::Tls(format!("failed to read CA cert: {e}")))?;
                let cert = reqwest::Certificate::from_pem(&cert_pem)
                    .map_err(|e| ClientError::Tls(format!("invalid CA cert: {e}")))?;
                builder = builder.add_root_certificate(cert);
            }
            TlsMode::DangerAcceptInvalid => {
                builder = builder.danger_accept_invalid_certs(true);
            }
        }

        builder
            .build()
            .map_err(|e| ClientError::Tls(format!("failed to build HTTP client: {e}")))
    }
}

/// Failure setting up the client
#[derive(Debug, thiserror::Error)]
pub enum ClientError {
    #[error("Invalid host '{host}': {message}")]
    InvalidHost { host: String, message: String },

    #[error("API token is empty")]
    MissingToken,

    #[error("TLS error: {0}")]
    Tls(String),
}

/// Response envelope shared by CMDB and monitor endpoints
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct Envelope {
    results: Json,
    mkey: Json,
    version: Option<String>,
    cli_error: Option<String>,
    error: Option<Json>,
    status: Option<String>,
}

impl Envelope {
    fn parse(body: &str) -> Self {
        serde_json::from_str(body).unwrap_or_default()
    }

    /// Human-readable failure text for a rejected request
    fn failure(&self, body: &str) -> String {
        if let Some(cli_error) = self.cli_error.as_deref().filter(|s| !s.is_empty()) {
            return cli_error.trim().to_string();
        }
        match &self.error {
            Some(Json::String(s)) => s.clone(),
            Some(code @ Json::Number(_)) => format!("error code {}", code),
            _ if !body.trim().is_empty() && self.status.is_none() => body.trim().to_string(),
            _ => "request rejected".to_string(),
        }
    }
}

/// HTTP client for the FortiOS REST API
pub struct FortiClient {
    http: reqwest::Client,
    base_url: Url,
    token: String,
    vdom: Option<String>,
    retries: u32,
    retry_delay: Duration,
}

impl FortiClient {
    pub fn new(config: &ClientConfig) -> Result<Self, ClientError> {
        let http = config.build_http()?;
        Self::with_client(http, config)
    }

    /// Create a client around a pre-built `reqwest::Client`
    pub fn with_client(http: reqwest::Client, config: &ClientConfig) -> Result<Self, ClientError> {
        if config.token.is_empty() {
            return Err(ClientError::MissingToken);
        }
        let base_url = parse_base_url(&config.host)?;
        Ok(Self {
            http,
            base_url,
            token: config.token.clone(),
            vdom: config.vdom.clone(),
            retries: config.retries,
            retry_delay: config.retry_delay,
        })
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    /// Build `{base}/api/v2/cmdb/{path}[/{mkey}]`; the mkey is percent-encoded
    pub(crate) fn cmdb_url(&self, path: &str, mkey: Option<&str>) -> Url {
        let mut url = self.base_url.clone();
        if let Ok(mut segments) = url.path_segments_mut() {
            segments
                .pop_if_empty()
                .extend(["api", "v2", "cmdb"])
                .extend(path.split('/').filter(|s| !s.is_empty()));
            if let Some(mkey) = mkey {
                segments.push(mkey);
            }
        }
        url
    }

    fn monitor_url(&self, path: &str) -> Url {
        let mut url = self.base_url.clone();
        if let Ok(mut segments) = url.path_segments_mut() {
            segments
                .pop_if_empty()
                .extend(["api", "v2", "monitor"])
                .extend(path.split('/').filter(|s| !s.is_empty()));
        }
        url
    }

    /// Firmware version reported by the device, if it reports one
    pub async fn device_version(&self) -> TransportResult<Option<FirmwareVersion>> {
        let url = self.monitor_url("system/status");
        let (status, body) = self.send(Method::GET, url, None, None).await?;
        if !status.is_success() {
            let envelope = Envelope::parse(&body);
            return Err(TransportError::new(envelope.failure(&body)).with_status(status.as_u16()));
        }
        let version = Envelope::parse(&body)
            .version
            .and_then(|v| v.parse::<FirmwareVersion>().ok());
        log::debug!("device firmware: {:?}", version);
        Ok(version)
    }

    /// Send one request, retrying connection failures and timeouts
    async fn send(
        &self,
        method: Method,
        url: Url,
        body: Option<&WireObject>,
        vdom: Option<&str>,
    ) -> TransportResult<(StatusCode, String)> {
        let vdom = vdom.or(self.vdom.as_deref());
        let mut attempt = 0;
        loop {
            log::debug!("{} {}", method, url);
            let mut request = self
                .http
                .request(method.clone(), url.clone())
                .bearer_auth(&self.token);
            if let Some(vdom) = vdom {
                request = request.query(&[("vdom", vdom)]);
            }
            if let Some(body) = body {
                request = request.json(body);
            }

            match request.send().await {
                Ok(response) => {
                    let status = response.status();
                    let text = response.text().await.map_err(|e| {
                        TransportError::new(format!("failed to read response: {e}"))
                            .with_status(status.as_u16())
                            .with_cause(e)
                    })?;
                    return Ok((status, text));
                }
                Err(e) if (e.is_connect() || e.is_timeout()) && attempt < self.retries => {
                    attempt += 1;
                    log::warn!(
                        "{} {} failed ({}), retrying ({}/{})",
                        method,
                        url,
                        e,
                        attempt,
                        self.retries
                    );
                    tokio::time::sleep(self.retry_delay).await;
                }
                Err(e) => {
                    return Err(
                        TransportError::new(format!("HTTP transport error: {e}")).with_cause(e)
                    );
                }
            }
        }
    }

    /// Send a request and decode the envelope of a successful response
    async fn call(
        &self,
        method: Method,
        url: Url,
        body: Option<&WireObject>,
        vdom: Option<&str>,
    ) -> TransportResult<Envelope> {
        let (status, text) = self.send(method, url, body, vdom).await?;
        let envelope = Envelope::parse(&text);
        if !status.is_success() || envelope.status.as_deref() == Some("error") {
            return Err(TransportError::new(envelope.failure(&text)).with_status(status.as_u16()));
        }
        Ok(envelope)
    }

    pub async fn create_object(
        &self,
        path: &str,
        obj: &WireObject,
        vdom: Option<&str>,
    ) -> TransportResult<WireObject> {
        let url = self.cmdb_url(path, None);
        let envelope = self.call(Method::POST, url, Some(obj), vdom).await?;
        Ok(mkey_object(envelope.mkey))
    }

    pub async fn read_object(
        &self,
        path: &str,
        mkey: Option<&str>,
        vdom: Option<&str>,
    ) -> TransportResult<Option<WireObject>> {
        let url = self.cmdb_url(path, mkey);
        let (status, text) = self.send(Method::GET, url, None, vdom).await?;
        if status == StatusCode::NOT_FOUND {
            return Ok(None);
        }
        let envelope = Envelope::parse(&text);
        if !status.is_success() {
            return Err(TransportError::new(envelope.failure(&text)).with_status(status.as_u16()));
        }

        let object = match envelope.results {
            Json::Array(items) => items.into_iter().next(),
            Json::Null => None,
            other => Some(other),
        };
        match object {
            Some(Json::Object(obj)) => Ok(Some(obj)),
            Some(other) => Err(TransportError::new(format!(
                "unexpected results entry: {}",
                other
            ))),
            None => Ok(None),
        }
    }

    pub async fn update_object(
        &self,
        path: &str,
        mkey: Option<&str>,
        obj: &WireObject,
        vdom: Option<&str>,
    ) -> TransportResult<WireObject> {
        let url = self.cmdb_url(path, mkey);
        let envelope = self.call(Method::PUT, url, Some(obj), vdom).await?;
        Ok(mkey_object(envelope.mkey))
    }

    pub async fn delete_object(
        &self,
        path: &str,
        mkey: &str,
        vdom: Option<&str>,
    ) -> TransportResult<()> {
        let url = self.cmdb_url(path, Some(mkey));
        self.call(Method::DELETE, url, None, vdom).await?;
        Ok(())
    }
}

impl Transport for FortiClient {
    fn create<'a>(
        &'a self,
        path: &'a str,
        obj: &'a WireObject,
        vdom: Option<&'a str>,
    ) -> BoxFuture<'a, TransportResult<WireObject>> {
        Box::pin(self.create_object(path, obj, vdom))
    }

    fn read<'a>(
        &'a self,
        path: &'a str,
        mkey: Option<&'a str>,
        vdom: Option<&'a str>,
    ) -> BoxFuture<'a, TransportResult<Option<WireObject>>> {
        Box::pin(self.read_object(path, mkey, vdom))
    }

    fn update<'a>(
        &'a self,
        path: &'a str,
        mkey: Option<&'a str>,
        obj: &'a WireObject,
        vdom: Option<&'a str>,
    ) -> BoxFuture<'a, TransportResult<WireObject>> {
        Box::pin(self.update_object(path, mkey, obj, vdom))
    }

    fn delete<'a>(
        &'a self,
        path: &'a str,
        mkey: &'a str,
        vdom: Option<&'a str>,
    ) -> BoxFuture<'a, TransportResult<()>> {
        Box::pin(self.delete_object(path, mkey, vdom))
    }
}

fn mkey_object(mkey: Json) -> WireObject {
    let mut obj = WireObject::new();
    if !mkey.is_null() {
        obj.insert("mkey".to_string(), mkey);
    }
    obj
}

fn parse_base_url(host: &str) -> Result<Url, ClientError> {
    let host = host.trim().trim_end_matches('/');
    if host.is_empty() {
        return Err(ClientError::InvalidHost {
            host: host.to_string(),
            message: "host is empty".to_string(),
        });
    }
    let with_scheme = if host.contains("://") {
        host.to_string()
    } else {
        format!("https://{}", host)
    };
    let url = Url::parse(&with_scheme).map_err(|e| ClientError::InvalidHost {
        host: host.to_string(),
        message: e.to_string(),
    })?;
    if url.cannot_be_a_base() {
        return Err(ClientError::InvalidHost {
            host: host.to_string(),
            message: "not a base URL".to_string(),
        });
    }
    Ok(url)
}
