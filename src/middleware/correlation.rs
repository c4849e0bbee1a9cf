// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Request correlation headers.
//!
//! Every request carries an `X-Request-ID` and an `X-Trace-Id`. Incoming
//! values are kept, missing ones are generated, and both are echoed on the
//! response and recorded on a tracing span around the handler. While the
//! handler runs the ids are held in a task-local, so collaborator clients can
//! forward them downstream.

use axum::{
    extract::Request,
    http::{HeaderMap, HeaderValue},
    middleware::Next,
    response::Response,
};
use std::future::Future;
use tracing::Instrument;
use uuid::Uuid;

pub const REQUEST_ID_HEADER: &str = "x-request-id";
pub const TRACE_ID_HEADER: &str = "x-trace-id";

/// Correlation ids for one request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CorrelationIds {
    pub request_id: String,
    pub trace_id: String,
}

tokio::task_local! {
    static CURRENT: CorrelationIds;
}

/// Ids of the request the current task is serving, if any.
pub fn current() -> Option<CorrelationIds> {
    CURRENT.try_with(Clone::clone).ok()
}

/// Run `fut` with `ids` as the current correlation ids.
pub async fn scoped<F: Future>(ids: CorrelationIds, fut: F) -> F::Output {
    CURRENT.scope(ids, fut).await
}

fn header_or_new(headers: &HeaderMap, name: &str) -> String {
    headers
        .get(name)
        .and_then(|v| v.to_str().ok())
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(str::to_string)
        .unwrap_or_else(|| Uuid::new_v4().to_string())
}

pub async fn propagate_correlation_ids(req: Request, next: Next) -> Response {
    let ids = CorrelationIds {
        request_id: header_or_new(req.headers(), REQUEST_ID_HEADER),
        trace_id: header_or_new(req.headers(), TRACE_ID_HEADER),
    };

    let span = tracing::info_span!(
        "request",
        request_id = %ids.request_id,
        trace_id = %ids.trace_id,
    );

    let mut response = scoped(ids.clone(), next.run(req)).instrument(span).await;

    let headers = response.headers_mut();
    if let Ok(v) = HeaderValue::from_str(&ids.request_id) {
        headers.insert(REQUEST_ID_HEADER, v);
    }
    if let Ok(v) = HeaderValue::from_str(&ids.trace_id) {
        headers.insert(TRACE_ID_HEADER, v);
    }

    response
}
