//! GraphQL client for the users API
//!
//! Every call is a single `POST {query, variables}` to the configured
//! endpoint. The response envelope carries either `data` or a top-level
//! `errors` list. The HTTP status is not inspected; only the envelope
//! decides the outcome.

use crate::domain::error::{GatewayError, Operation};
use crate::infra::metrics::{Metrics, Upstream};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, error};

/// Log a failed backend call (cold path)
#[cold]
fn log_backend_failed(operation: Operation, latency_ms: u64, e: &dyn std::fmt::Display) {
    error!(op = operation.as_str(), latency_ms = latency_ms, error = %e, "graphql_call_failed");
}

/// Body sent to the backend
#[derive(Debug, Serialize)]
pub struct GraphqlRequest<'a, V: Serialize> {
    pub query: &'a str,
    pub variables: V,
}

/// Body returned by the backend
#[derive(Debug, Default, Deserialize)]
pub struct GraphqlResponse {
    #[serde(default)]
    pub data: Option<Value>,
    #[serde(default)]
    pub errors: Option<Value>,
}

impl GraphqlResponse {
    /// Extract `data.<field>` as `T`.
    ///
    /// A top-level `errors` list wins over any partial data and is surfaced
    /// verbatim. A missing or undecodable field means the backend is not
    /// speaking the expected schema.
    pub fn field<T: DeserializeOwned>(
        self,
        field: &str,
        operation: Operation,
    ) -> Result<T, GatewayError> {
        if let Some(errors) = self.errors {
            return Err(GatewayError::Backend { operation, errors });
        }

        let value = self
            .data
            .and_then(|mut data| data.get_mut(field).map(Value::take))
            .filter(|value| !value.is_null())
            .ok_or_else(|| GatewayError::BackendUnavailable {
                operation,
                reason: format!("missing data.{field}"),
            })?;

        serde_json::from_value(value).map_err(|e| GatewayError::BackendUnavailable {
            operation,
            reason: format!("invalid data.{field}: {e}"),
        })
    }
}

/// Client for the users GraphQL endpoint. Cloning shares the connection pool.
#[derive(Clone)]
pub struct GraphqlClient {
    http: reqwest::Client,
    url: String,
    timeout: Option<Duration>,
    metrics: Arc<Metrics>,
}

impl GraphqlClient {
    pub fn new(
        http: reqwest::Client,
        url: &str,
        timeout: Option<Duration>,
        metrics: Arc<Metrics>,
    ) -> Self {
        Self { http, url: url.to_string(), timeout, metrics }
    }

    /// Send one query or mutation and decode the response envelope
    pub async fn execute<V: Serialize>(
        &self,
        operation: Operation,
        query: &str,
        variables: V,
    ) -> Result<GraphqlResponse, GatewayError> {
        let start = Instant::now();

        let mut request = self.http.post(&self.url).json(&GraphqlRequest { query, variables });
        if let Some(timeout) = self.timeout {
            request = request.timeout(timeout);
        }

        let result = match request.send().await {
            Ok(response) => {
                let status = response.status();
                response.json::<GraphqlResponse>().await.map(|body| (status, body))
            }
            Err(e) => Err(e),
        };
        let latency_ms = start.elapsed().as_millis() as u64;

        match result {
            Ok((status, body)) => {
                self.metrics.record_upstream_call(Upstream::Backend, latency_ms, true);
                debug!(
                    op = operation.as_str(),
                    status = %status.as_u16(),
                    latency_ms = latency_ms,
                    has_errors = body.errors.is_some(),
                    "graphql_call"
                );
                Ok(body)
            }
            Err(e) => {
                self.metrics.record_upstream_call(Upstream::Backend, latency_ms, false);
                log_backend_failed(operation, latency_ms, &e);
                Err(GatewayError::BackendUnavailable { operation, reason: e.to_string() })
            }
        }
    }
}
