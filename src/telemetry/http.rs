use std::time::Instant;

use axum::{
    extract::{MatchedPath, Request},
    http::{HeaderName, HeaderValue},
    middleware::Next,
    response::Response,
};
use tracing::{Instrument, field};
use uuid::Uuid;

pub const REQUEST_ID_HEADER: &str = "x-request-id";
pub const TRACE_ID_HEADER: &str = "x-trace-id";

/// Longest caller-supplied id echoed back; longer ones are replaced.
const MAX_ID_LEN: usize = 128;

struct RequestIds {
    request_id: String,
    trace_id: String,
}

impl RequestIds {
    fn from_request(req: &Request) -> Self {
        let request_id =
            incoming_id(req, REQUEST_ID_HEADER).unwrap_or_else(|| Uuid::now_v7().to_string());
        let trace_id = incoming_id(req, TRACE_ID_HEADER).unwrap_or_else(|| request_id.clone());
        Self {
            request_id,
            trace_id,
        }
    }
}

pub async fn request_logging_middleware(req: Request, next: Next) -> Response {
    let ids = RequestIds::from_request(&req);
    let method = req.method().clone();
    let route = req
        .extensions()
        .get::<MatchedPath>()
        .map(|matched| matched.as_str().to_string())
        .unwrap_or_else(|| req.uri().path().to_string());

    let span = tracing::info_span!(
        "http_request",
        request_id = %ids.request_id,
        trace_id = %ids.trace_id,
        method = %method,
        route = %route,
        status = field::Empty,
        latency_ms = field::Empty
    );

    let start = Instant::now();
    let mut response = next.run(req).instrument(span.clone()).await;
    let latency_ms = start.elapsed().as_millis();
    let status = response.status().as_u16();

    span.record("status", status);
    span.record("latency_ms", field::display(latency_ms));

    match status {
        500.. => tracing::error!(parent: &span, status, %latency_ms, "Request failed"),
        400..=499 => tracing::warn!(parent: &span, status, %latency_ms, "Request rejected"),
        _ => tracing::info!(parent: &span, status, %latency_ms, "Request completed"),
    }

    set_header(&mut response, REQUEST_ID_HEADER, &ids.request_id);
    set_header(&mut response, TRACE_ID_HEADER, &ids.trace_id);

    response
}

fn incoming_id(req: &Request, name: &str) -> Option<String> {
    req.headers()
        .get(name)
        .and_then(|value| value.to_str().ok())
        .map(str::trim)
        .filter(|value| !value.is_empty() && value.len() <= MAX_ID_LEN)
        .map(str::to_string)
}

fn set_header(response: &mut Response, name: &'static str, value: &str) {
    if let Ok(value) = HeaderValue::from_str(value) {
        response
            .headers_mut()
            .insert(HeaderName::from_static(name), value);
    }
}
