use std::future::Future;
use std::io::Write;

use reqwest::{Method, Url};
use serde::Serialize;
use tracing::debug;

use crate::error::{Error, RequestError, Result, TransportError};
use crate::job::{Job, JobSummary, SyncJob};

/// One outbound call to the scheduler API.
#[derive(Debug, Clone, PartialEq)]
pub struct ApiRequest {
    /// HTTP method.
    pub method: Method,
    /// Path below the base URL, e.g. `/v1/jobs`.
    pub path: String,
    /// Raw request body, sent as `application/json`.
    pub body: Option<Vec<u8>>,
}

/// Status and body of a completed call.
#[derive(Debug, Clone, PartialEq)]
pub struct ApiResponse {
    /// HTTP status code.
    pub status: u16,
    /// Raw response body.
    pub body: Vec<u8>,
}

impl ApiResponse {
    fn is_success(&self) -> bool {
        (200..=299).contains(&self.status)
    }
}

/// Carries [`ApiRequest`]s to the scheduler.
pub trait Transport {
    /// Perform the request. `Err` means no response was received.
    fn send(&self, req: ApiRequest) -> impl Future<Output = std::result::Result<ApiResponse, TransportError>>;
}

/// reqwest-backed transport with an optional static proxy.
#[derive(Clone)]
pub struct HttpTransport {
    base: String,
    http: reqwest::Client,
}

impl HttpTransport {
    /// Build a transport for `base_url`, routing every request through `proxy` if given.
    pub fn new(base_url: &str, proxy: Option<&Url>) -> Result<Self> {
        let mut builder = reqwest::Client::builder();
        if let Some(p) = proxy {
            let proxy = reqwest::Proxy::all(p.clone())
                .map_err(|e| Error::InvalidArgument(format!("proxy value due to {e}")))?;
            builder = builder.proxy(proxy);
        }
        let http = builder
            .build()
            .map_err(|e| Error::InvalidArgument(format!("http client due to {e}")))?;
        Ok(Self { base: base_url.trim_end_matches('/').to_string(), http })
    }

    /// Base URL with trailing slashes removed.
    pub fn base_url(&self) -> &str {
        &self.base
    }
}

impl Transport for HttpTransport {
    async fn send(&self, req: ApiRequest) -> std::result::Result<ApiResponse, TransportError> {
        let url = format!("{}{}", self.base, req.path);
        debug!("{} {}", req.method, url);

        let mut rb = self.http.request(req.method, &url);
        if let Some(body) = req.body {
            rb = rb.header(reqwest::header::CONTENT_TYPE, "application/json").body(body);
        }
        let resp = rb.send().await?;
        let status = resp.status().as_u16();
        let body = resp.bytes().await?.to_vec();
        debug!("{} -> {}", url, status);
        Ok(ApiResponse { status, body })
    }
}

/// Client for the scheduler's job endpoints.
pub struct Client<T = HttpTransport> {
    transport: T,
}

impl Client<HttpTransport> {
    /// Build an HTTP client from resolved settings.
    pub fn from_settings(settings: &crate::cfg::Settings) -> Result<Self> {
        Ok(Self::new(HttpTransport::new(&settings.nomad_url, settings.proxy_url.as_ref())?))
    }
}

impl<T: Transport> Client<T> {
    /// Wrap a transport.
    pub fn new(transport: T) -> Self {
        Self { transport }
    }

    /// Borrow the underlying transport.
    pub fn transport(&self) -> &T {
        &self.transport
    }

    /// `GET /v1/jobs`.
    pub async fn jobs(&self) -> Result<Vec<JobSummary>> {
        let body = self.call(Method::GET, "/v1/jobs".to_string(), None, "fetch jobs").await?;
        Ok(serde_json::from_slice(&body)?)
    }

    /// `GET /v1/job/{id}`.
    pub async fn job(&self, id: &str) -> Result<Job> {
        check_id(id)?;
        let body = self.call(Method::GET, format!("/v1/job/{id}"), None, "fetch job").await?;
        Ok(serde_json::from_slice(&body)?)
    }

    /// Validate `raw` as a job document, then `PUT` the original bytes to `/v1/job/`.
    pub async fn submit_job(&self, raw: &str) -> Result<()> {
        SyncJob::from_json(raw)?;
        self.call(Method::PUT, "/v1/job/".to_string(), Some(raw.as_bytes().to_vec()), "add job")
            .await?;
        Ok(())
    }

    /// `DELETE /v1/job/{id}`.
    pub async fn delete_job(&self, id: &str) -> Result<()> {
        check_id(id)?;
        self.call(Method::DELETE, format!("/v1/job/{id}"), None, "delete job").await?;
        Ok(())
    }

    /// Fetch the job list and write it to `out` as JSON.
    pub async fn print_jobs<W: Write>(&self, pretty: bool, out: &mut W) -> Result<()> {
        let jobs = self.jobs().await?;
        write_json(&jobs, pretty, out)
    }

    /// Fetch one job and write it to `out` as JSON.
    pub async fn print_job<W: Write>(&self, id: &str, pretty: bool, out: &mut W) -> Result<()> {
        let job = self.job(id).await?;
        write_json(&job, pretty, out)
    }

    async fn call(
        &self,
        method: Method,
        path: String,
        body: Option<Vec<u8>>,
        op: &'static str,
    ) -> Result<Vec<u8>> {
        let resp = self
            .transport
            .send(ApiRequest { method, path, body })
            .await
            .map_err(|e| Error::request(op, RequestError::Transport(e)))?;
        if !resp.is_success() {
            return Err(Error::request(
                op,
                RequestError::Status { code: resp.status, body: resp.body },
            ));
        }
        Ok(resp.body)
    }
}

fn check_id(id: &str) -> Result<()> {
    if id.is_empty() {
        return Err(Error::InvalidArgument("job Id".to_string()));
    }
    Ok(())
}

fn write_json<T: Serialize, W: Write>(value: &T, pretty: bool, out: &mut W) -> Result<()> {
    let buf = if pretty { serde_json::to_vec_pretty(value)? } else { serde_json::to_vec(value)? };
    let io = |source: std::io::Error| Error::Io { path: "<stdout>".into(), source };
    out.write_all(&buf).map_err(io)?;
    out.write_all(b"\n").map_err(io)?;
    Ok(())
}
