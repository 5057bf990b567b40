//! Upstream HTTP client (C1).
//!
//! A thin wrapper around a single `reqwest::Client` configured with one
//! timeout for every outbound call. Every call to Cars, Payment, or Rental
//! goes through here so timeouts are applied uniformly; callers decide what
//! a given status code means (404 vs any other non-2xx) since that varies by
//! endpoint.

use std::time::Duration;

use reqwest::{Response, StatusCode};
use serde::Serialize;
use thiserror::Error;

/// Transport-level failure: timeout, connection refused, DNS failure. Always
/// counts as a circuit breaker failure and, in the create-rental saga, always
/// maps to the uniform 503 response.
#[derive(Debug, Error)]
#[error("transport error calling {service}: {source}")]
pub struct TransportError {
    pub service: &'static str,
    #[source]
    pub source: reqwest::Error,
}

#[derive(Clone)]
pub struct UpstreamClient {
    http: reqwest::Client,
}

impl UpstreamClient {
    pub fn new(timeout: Duration) -> Self {
        let http = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .expect("failed to construct reqwest client");
        Self { http }
    }

    pub async fn get(&self, service: &'static str, url: &str) -> Result<Response, TransportError> {
        self.send(service, self.http.get(url)).await
    }

    pub async fn get_query(
        &self,
        service: &'static str,
        url: &str,
        query: &[(&str, String)],
    ) -> Result<Response, TransportError> {
        self.send(service, self.http.get(url).query(query)).await
    }

    pub async fn post_json<B: Serialize + ?Sized>(
        &self,
        service: &'static str,
        url: &str,
        body: &B,
    ) -> Result<Response, TransportError> {
        self.send(service, self.http.post(url).json(body)).await
    }

    pub async fn patch_query(
        &self,
        service: &'static str,
        url: &str,
        query: &[(&str, String)],
    ) -> Result<Response, TransportError> {
        self.send(service, self.http.patch(url).query(query)).await
    }

    pub async fn delete(&self, service: &'static str, url: &str) -> Result<Response, TransportError> {
        self.send(service, self.http.delete(url)).await
    }

    pub async fn delete_query(
        &self,
        service: &'static str,
        url: &str,
        query: &[(&str, String)],
    ) -> Result<Response, TransportError> {
        self.send(service, self.http.delete(url).query(query)).await
    }

    pub async fn post_query(
        &self,
        service: &'static str,
        url: &str,
        query: &[(&str, String)],
    ) -> Result<Response, TransportError> {
        self.send(service, self.http.post(url).query(query)).await
    }

    async fn send(
        &self,
        service: &'static str,
        request: reqwest::RequestBuilder,
    ) -> Result<Response, TransportError> {
        request
            .send()
            .await
            .map_err(|source| TransportError { service, source })
    }
}

/// True if the response is a well-formed success per the gateway's contract.
pub fn is_success(status: StatusCode) -> bool {
    status.is_success()
}
