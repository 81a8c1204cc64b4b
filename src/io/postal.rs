//! ViaCEP postal code lookup
//!
//! `GET <template with {cep} substituted>`; the answer is either the
//! address fields or an object carrying the `erro` marker.

use crate::domain::error::GatewayError;
use crate::domain::types::PostalLookup;
use crate::infra::config::CEP_PLACEHOLDER;
use crate::infra::metrics::{Metrics, Upstream};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, warn};

/// Log a failed lookup (cold path)
#[cold]
fn log_lookup_failed(latency_ms: u64, reason: &dyn std::fmt::Display) {
    warn!(latency_ms = latency_ms, reason = %reason, "postal_lookup_failed");
}

#[derive(Clone)]
pub struct PostalClient {
    http: reqwest::Client,
    url_template: String,
    timeout: Option<Duration>,
    metrics: Arc<Metrics>,
}

impl PostalClient {
    pub fn new(
        http: reqwest::Client,
        url_template: &str,
        timeout: Option<Duration>,
        metrics: Arc<Metrics>,
    ) -> Self {
        Self { http, url_template: url_template.to_string(), timeout, metrics }
    }

    pub fn lookup_url(&self, cep: &str) -> String {
        self.url_template.replace(CEP_PLACEHOLDER, cep)
    }

    /// Resolve a postal code.
    ///
    /// Transport failures, non-2xx answers and unreadable bodies are all
    /// `UpstreamLookup`; the `erro` marker is `PostalCodeNotFound`.
    pub async fn lookup(&self, cep: &str) -> Result<PostalLookup, GatewayError> {
        let start = Instant::now();

        let mut request = self.http.get(self.lookup_url(cep));
        if let Some(timeout) = self.timeout {
            request = request.timeout(timeout);
        }

        let result = self.fetch(request).await;
        let latency_ms = start.elapsed().as_millis() as u64;
        self.metrics.record_upstream_call(Upstream::Postal, latency_ms, result.is_ok());

        let lookup = match result {
            Ok(lookup) => lookup,
            Err(reason) => {
                log_lookup_failed(latency_ms, &reason);
                return Err(GatewayError::UpstreamLookup(reason));
            }
        };

        if lookup.is_not_found() {
            debug!(cep = %cep, latency_ms = latency_ms, "postal_code_not_found");
            return Err(GatewayError::PostalCodeNotFound);
        }

        debug!(cep = %cep, latency_ms = latency_ms, "postal_lookup_ok");
        Ok(lookup)
    }

    async fn fetch(&self, request: reqwest::RequestBuilder) -> Result<PostalLookup, String> {
        // The URL embeds the postal code; keep it out of error reasons
        let response = request.send().await.map_err(|e| e.without_url().to_string())?;

        let status = response.status();
        if !status.is_success() {
            return Err(format!("status {}", status.as_u16()));
        }

        response.json::<PostalLookup>().await.map_err(|e| e.without_url().to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lookup_url() {
        let client = PostalClient::new(
            reqwest::Client::new(),
            "https://viacep.com.br/ws/{cep}/json/",
            None,
            Arc::new(Metrics::new()),
        );
        assert_eq!(client.lookup_url("01310100"), "https://viacep.com.br/ws/01310100/json/");
    }

    #[tokio::test]
    async fn test_unreachable_lookup_is_upstream_error() {
        let metrics = Arc::new(Metrics::new());
        // Port 9 (discard) on localhost is not expected to accept HTTP
        let client = PostalClient::new(
            reqwest::Client::new(),
            "http://127.0.0.1:9/ws/{cep}/json/",
            Some(Duration::from_millis(500)),
            metrics.clone(),
        );

        let err = client.lookup("01310100").await.unwrap_err();
        match &err {
            GatewayError::UpstreamLookup(reason) => assert!(!reason.contains("01310100")),
            other => panic!("unexpected error: {other:?}"),
        }
        assert!(!err.to_string().contains("01310100"));
        assert_eq!(err.status(), 400);
        assert_eq!(metrics.upstream_calls(Upstream::Postal), 1);
    }
}
