//! In-memory stand-ins for the scheduler API and the image puller.

use std::collections::{BTreeMap, HashSet};
use std::sync::Mutex;

use reqwest::Method;
use serde_json::Value;

use crate::client::{ApiRequest, ApiResponse, Transport};
use crate::error::{Error, Result, TransportError};
use crate::images::ImagePuller;
use crate::job::JobSummary;

enum Forced {
    Respond(u16, Vec<u8>),
    Disconnect,
}

#[derive(Default)]
struct ApiState {
    jobs: BTreeMap<String, Value>,
    requests: Vec<ApiRequest>,
    forced: Option<Forced>,
}

/// Call-counting scheduler backed by a map of job id to job JSON.
#[derive(Default)]
pub struct StubApi {
    state: Mutex<ApiState>,
}

impl StubApi {
    pub fn fail_with(&self, code: u16) {
        self.respond_with(code, b"error");
    }

    pub fn respond_with(&self, code: u16, body: &[u8]) {
        self.state.lock().unwrap().forced = Some(Forced::Respond(code, body.to_vec()));
    }

    pub fn disconnect(&self) {
        self.state.lock().unwrap().forced = Some(Forced::Disconnect);
    }

    pub fn calls(&self) -> usize {
        self.state.lock().unwrap().requests.len()
    }

    pub fn requests(&self) -> Vec<ApiRequest> {
        self.state.lock().unwrap().requests.clone()
    }

    /// Ids of every job stored by a `PUT`, in request order.
    pub fn submitted_ids(&self) -> Vec<String> {
        self.requests()
            .iter()
            .filter(|r| r.method == Method::PUT)
            .filter_map(|r| serde_json::from_slice::<Value>(r.body.as_deref()?).ok())
            .filter_map(|v| v["Job"]["ID"].as_str().map(str::to_string))
            .collect()
    }

    fn route(state: &mut ApiState, req: &ApiRequest) -> ApiResponse {
        let ok = |body: Vec<u8>| ApiResponse { status: 200, body };
        let not_found = || ApiResponse { status: 404, body: b"job not found".to_vec() };

        match (&req.method, req.path.as_str()) {
            (m, "/v1/jobs") if *m == Method::GET => {
                let list: Vec<JobSummary> = state
                    .jobs
                    .values()
                    .filter_map(|j| serde_json::from_value(j.clone()).ok())
                    .collect();
                ok(serde_json::to_vec(&list).unwrap())
            }
            (m, "/v1/job/") if *m == Method::PUT => {
                let parsed = req
                    .body
                    .as_deref()
                    .and_then(|b| serde_json::from_slice::<Value>(b).ok());
                match parsed.as_ref().and_then(|v| v["Job"]["ID"].as_str()) {
                    Some(id) => {
                        state.jobs.insert(id.to_string(), parsed.as_ref().unwrap()["Job"].clone());
                        ok(br#"{"EvalID":"stub"}"#.to_vec())
                    }
                    None => ApiResponse { status: 400, body: b"missing job".to_vec() },
                }
            }
            (m, path) if path.starts_with("/v1/job/") => {
                let id = &path["/v1/job/".len()..];
                if *m == Method::GET {
                    match state.jobs.get(id) {
                        Some(job) => ok(serde_json::to_vec(job).unwrap()),
                        None => not_found(),
                    }
                } else if *m == Method::DELETE {
                    match state.jobs.remove(id) {
                        Some(_) => ok(br#"{"EvalID":"stub"}"#.to_vec()),
                        None => not_found(),
                    }
                } else {
                    ApiResponse { status: 405, body: Vec::new() }
                }
            }
            _ => ApiResponse { status: 404, body: Vec::new() },
        }
    }
}

impl Transport for StubApi {
    async fn send(&self, req: ApiRequest) -> std::result::Result<ApiResponse, TransportError> {
        let mut state = self.state.lock().unwrap();
        state.requests.push(req.clone());
        match &state.forced {
            Some(Forced::Disconnect) => return Err("connection refused".into()),
            Some(Forced::Respond(code, body)) => {
                return Ok(ApiResponse { status: *code, body: body.clone() })
            }
            None => {}
        }
        Ok(Self::route(&mut state, &req))
    }
}

/// Image puller that records every pull and fails for chosen images.
#[derive(Default)]
pub struct StubPuller {
    failing: HashSet<String>,
    pulled: Mutex<Vec<String>>,
}

impl StubPuller {
    pub fn failing(images: &[&str]) -> Self {
        Self { failing: images.iter().map(|s| s.to_string()).collect(), ..Self::default() }
    }

    pub fn pulled(&self) -> Vec<String> {
        self.pulled.lock().unwrap().clone()
    }
}

impl ImagePuller for StubPuller {
    async fn pull(&self, image: &str) -> Result<()> {
        self.pulled.lock().unwrap().push(image.to_string());
        if self.failing.contains(image) {
            return Err(Error::ExternalTool(format!("fail to pull {image}")));
        }
        Ok(())
    }
}
