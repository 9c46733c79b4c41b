//! Shared, cloneable client for the controller REST API.
//!
//! # Design
//! `Client` holds the configuration plus `Arc` handles to the transport and
//! clock, so cloning it is cheap and every accessor gets its own copy. Each
//! round-trip is split into a `build_*` step that produces an `HttpRequest`
//! and a `parse` step that consumes the `HttpResponse`; `get`, `post` and
//! `search` glue the two together through the transport.

use std::fmt;
use std::sync::Arc;

use serde::de::DeserializeOwned;
use serde::Serialize;
use tracing::debug;

use crate::config::ClientConfig;
use crate::error::{ApiError, Result, ServiceError};
use crate::export::ExportAccessor;
use crate::group::GroupAccessor;
use crate::http::{HttpMethod, HttpRequest, HttpResponse};
use crate::task::{Clock, SystemClock, TaskTracker};
use crate::transport::{Transport, UreqTransport};
use crate::types::{SearchResource, SearchResults};

pub const AUTH_TOKEN_HEADER: &str = "X-SDS-AUTH-TOKEN";

#[derive(Clone)]
pub struct Client {
    config: ClientConfig,
    transport: Arc<dyn Transport>,
    clock: Arc<dyn Clock>,
}

impl fmt::Debug for Client {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Client")
            .field("base_url", &self.config.base_url)
            .field("token", &self.config.token.as_ref().map(|_| "<redacted>"))
            .finish_non_exhaustive()
    }
}

impl Client {
    pub fn new(config: ClientConfig, transport: Arc<dyn Transport>) -> Self {
        Self {
            config,
            transport,
            clock: Arc::new(SystemClock),
        }
    }

    /// Client over a real HTTP transport built from `config`.
    pub fn from_config(config: ClientConfig) -> Self {
        let transport = Arc::new(UreqTransport::new(&config));
        Self::new(config, transport)
    }

    /// Replace the clock used while awaiting tasks.
    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    pub(crate) fn clock(&self) -> Arc<dyn Clock> {
        Arc::clone(&self.clock)
    }

    /// Accessor for export groups.
    pub fn export(&self) -> ExportAccessor {
        ExportAccessor::new(self.clone())
    }

    /// Accessor for consistency groups.
    pub fn group(&self) -> GroupAccessor {
        GroupAccessor::new(self.clone())
    }

    pub fn task(&self) -> TaskTracker {
        TaskTracker::new(self.clone())
    }

    pub fn url(&self, path: &str) -> String {
        format!(
            "{}/{}",
            self.config.base_url.trim_end_matches('/'),
            path.trim_start_matches('/')
        )
    }

    fn headers(&self, with_body: bool) -> Vec<(String, String)> {
        let mut headers = vec![("accept".to_string(), "application/json".to_string())];
        if with_body {
            headers.push(("content-type".to_string(), "application/json".to_string()));
        }
        if let Some(token) = &self.config.token {
            headers.push((AUTH_TOKEN_HEADER.to_string(), token.clone()));
        }
        headers
    }

    pub fn build_get(&self, path: &str) -> HttpRequest {
        HttpRequest {
            method: HttpMethod::Get,
            path: self.url(path),
            headers: self.headers(false),
            body: None,
        }
    }

    pub fn build_post<B: Serialize>(&self, path: &str, body: Option<&B>) -> Result<HttpRequest> {
        let body = body
            .map(serde_json::to_string)
            .transpose()
            .map_err(|e| ApiError::SerializationError(e.to_string()))?;
        Ok(HttpRequest {
            method: HttpMethod::Post,
            path: self.url(path),
            headers: self.headers(body.is_some()),
            body,
        })
    }

    /// Decode a 2xx body, or turn the status into the matching `ApiError`.
    pub fn parse<T: DeserializeOwned>(&self, response: HttpResponse) -> Result<T> {
        check_status(&response)?;
        serde_json::from_str(&response.body).map_err(|e| ApiError::DeserializationError(e.to_string()))
    }

    fn round_trip(&self, request: HttpRequest) -> Result<HttpResponse> {
        let method = request.method;
        let path = request.path.clone();
        let response = self.transport.execute(request)?;
        debug!(method = method.as_str(), %path, status = response.status, "controller round-trip");
        Ok(response)
    }

    pub fn get<T: DeserializeOwned>(&self, path: &str) -> Result<T> {
        let response = self.round_trip(self.build_get(path))?;
        self.parse(response)
    }

    pub fn post<B: Serialize, T: DeserializeOwned>(&self, path: &str, body: Option<&B>) -> Result<T> {
        let response = self.round_trip(self.build_post(path, body)?)?;
        self.parse(response)
    }

    /// POST without a request body.
    pub fn post_empty<T: DeserializeOwned>(&self, path: &str) -> Result<T> {
        self.post::<(), T>(path, None)
    }

    /// Run a `search.json` query and return the hits in controller order.
    pub fn search(&self, path: &str) -> Result<Vec<SearchResource>> {
        let results: SearchResults = self.get(path)?;
        Ok(results.resource)
    }
}

/// Map non-success status codes to the appropriate `ApiError` variant.
fn check_status(response: &HttpResponse) -> Result<()> {
    if response.is_success() {
        return Ok(());
    }
    if response.status == 404 {
        return Err(ApiError::NotFound);
    }
    match serde_json::from_str::<ServiceError>(&response.body) {
        Ok(err) if err.code != 0 => Err(ApiError::Service(err)),
        _ => Err(ApiError::Http {
            status: response.status,
            body: response.body.clone(),
        }),
    }
}
