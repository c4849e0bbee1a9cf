// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Shared plumbing for calls to collaborator services.
//!
//! Every collaborator call is bounded by a timeout; a timeout is reported
//! exactly like any other upstream failure. Requests made while serving an
//! inbound request carry its `X-Request-ID` and `X-Trace-Id`.

use crate::error::AppError;
use crate::middleware::correlation::{self, REQUEST_ID_HEADER, TRACE_ID_HEADER};
use serde::{de::DeserializeOwned, Serialize};
use std::future::Future;
use std::time::Duration;

/// Run a collaborator call with an upper bound on its duration.
pub async fn with_timeout<T, F>(what: &str, limit: Duration, call: F) -> Result<T, AppError>
where
    F: Future<Output = Result<T, AppError>>,
{
    match tokio::time::timeout(limit, call).await {
        Ok(result) => result,
        Err(_) => {
            tracing::warn!(call = what, timeout_ms = limit.as_millis() as u64, "Upstream call timed out");
            Err(AppError::Upstream(format!(
                "{} timed out after {:?}",
                what, limit
            )))
        }
    }
}

/// Minimal JSON-over-HTTP client for one collaborator.
#[derive(Clone)]
pub struct JsonHttpClient {
    http: reqwest::Client,
    base_url: String,
    service: &'static str,
}

impl JsonHttpClient {
    pub fn new(service: &'static str, base_url: &str, timeout: Duration) -> Result<Self, AppError> {
        let http = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| AppError::Internal(anyhow::anyhow!("Failed to build HTTP client: {}", e)))?;

        Ok(Self {
            http,
            base_url: base_url.trim_end_matches('/').to_string(),
            service,
        })
    }

    pub fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    /// GET a JSON resource. A 404 is reported as `Ok(None)`.
    pub async fn get_optional<T: DeserializeOwned>(&self, path: &str) -> Result<Option<T>, AppError> {
        let response = with_correlation(self.http.get(self.url(path)))
            .send()
            .await
            .map_err(|e| self.transport_error(e))?;

        if response.status() == reqwest::StatusCode::NOT_FOUND {
            return Ok(None);
        }

        self.check_response_json(response).await.map(Some)
    }

    /// POST a JSON body and parse the JSON reply.
    pub async fn post_json<B: Serialize + ?Sized, T: DeserializeOwned>(
        &self,
        path: &str,
        body: &B,
    ) -> Result<T, AppError> {
        let response = self.send_post(path, body).await?;
        self.check_response_json(response).await
    }

    /// POST a JSON body, ignoring any reply body.
    pub async fn post_empty<B: Serialize + ?Sized>(&self, path: &str, body: &B) -> Result<(), AppError> {
        let response = self.send_post(path, body).await?;
        self.check_response(response).await
    }

    async fn send_post<B: Serialize + ?Sized>(
        &self,
        path: &str,
        body: &B,
    ) -> Result<reqwest::Response, AppError> {
        with_correlation(self.http.post(self.url(path)))
            .json(body)
            .send()
            .await
            .map_err(|e| self.transport_error(e))
    }

    fn transport_error(&self, e: reqwest::Error) -> AppError {
        if e.is_timeout() {
            AppError::Upstream(format!("{} request timed out", self.service))
        } else {
            AppError::Upstream(format!("{} request failed: {}", self.service, e))
        }
    }

    /// Check response status and return error if not successful.
    async fn check_response(&self, response: reqwest::Response) -> Result<(), AppError> {
        if response.status().is_success() {
            return Ok(());
        }
        Err(self.status_error(response).await)
    }

    /// Check response and parse JSON body.
    async fn check_response_json<T: DeserializeOwned>(
        &self,
        response: reqwest::Response,
    ) -> Result<T, AppError> {
        if !response.status().is_success() {
            return Err(self.status_error(response).await);
        }

        response.json().await.map_err(|e| {
            AppError::Upstream(format!("{} JSON parse error: {}", self.service, e))
        })
    }

    async fn status_error(&self, response: reqwest::Response) -> AppError {
        let status = response.status();
        let body = response.text().await.unwrap_or_default();
        tracing::warn!(service = self.service, status = %status, "Upstream returned error status");
        AppError::Upstream(format!("{} returned HTTP {}: {}", self.service, status, body))
    }
}

fn with_correlation(request: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
    match correlation::current() {
        Some(ids) => request
            .header(REQUEST_ID_HEADER, ids.request_id)
            .header(TRACE_ID_HEADER, ids.trace_id),
        None => request,
    }
}
