// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Activity proxy: every forwarded request counts as activity for the
//! idle reaper, then goes to the pod's public endpoint.

use std::sync::Arc;

use axum::body::Body;
use axum::extract::{Request, State};
use axum::http::{header, HeaderMap, HeaderName};
use axum::response::Response;
use mp_adapters::PodProvider;
use mp_core::Clock;
use tracing::{debug, warn};

use super::GatewayState;
use crate::error::ApiError;
use crate::worker::MIRROR_HEADER;

/// Connection-scoped headers that must not be forwarded in either direction.
const HOP_BY_HOP: [HeaderName; 9] = [
    header::CONNECTION,
    HeaderName::from_static("keep-alive"),
    header::PROXY_AUTHENTICATE,
    header::PROXY_AUTHORIZATION,
    header::TE,
    header::TRAILER,
    header::TRANSFER_ENCODING,
    header::UPGRADE,
    header::HOST,
];

pub(super) fn strip_hop_by_hop(headers: &mut HeaderMap) {
    // Headers named in `Connection` are hop-by-hop too
    let named: Vec<HeaderName> = headers
        .get_all(header::CONNECTION)
        .iter()
        .filter_map(|v| v.to_str().ok())
        .flat_map(|v| v.split(','))
        .filter_map(|name| HeaderName::from_bytes(name.trim().as_bytes()).ok())
        .collect();
    for name in named.iter().chain(HOP_BY_HOP.iter()) {
        headers.remove(name);
    }
    headers.remove(header::CONTENT_LENGTH);
}

pub(super) async fn forward<P: PodProvider, C: Clock>(
    State(state): State<Arc<GatewayState<P, C>>>,
    req: Request,
) -> Result<Response, ApiError> {
    let entry = state.pods().load().await.map_err(|e| ApiError::Internal(e.to_string()))?;

    // Stamp before forwarding so even a failed request keeps the pod alive.
    // Without a pod_id there is nothing to keep alive.
    if entry.pod_id.is_some() {
        if let Err(e) = state.pods().touch(state.clock.epoch_ms()).await {
            warn!(error = %e, "failed to record activity");
        }
    }

    let base =
        entry.pod_url.ok_or_else(|| ApiError::Unavailable("pod is not running".to_string()))?;
    forward_to(&state, &base, req).await
}

pub(super) async fn forward_to<P: PodProvider, C: Clock>(
    state: &GatewayState<P, C>,
    base: &str,
    req: Request,
) -> Result<Response, ApiError> {
    let (parts, body) = req.into_parts();
    let path = parts.uri.path_and_query().map(|pq| pq.as_str()).unwrap_or("/");
    let url = format!("{}{}", base.trim_end_matches('/'), path);

    let mut headers = parts.headers;
    strip_hop_by_hop(&mut headers);
    // Only the mirror may mark a request as passive
    headers.remove(MIRROR_HEADER);
    debug!(method = %parts.method, %url, "forwarding");

    let upstream = state
        .client
        .request(parts.method, &url)
        .headers(headers)
        .body(reqwest::Body::wrap_stream(body.into_data_stream()))
        .send();

    let response = match tokio::time::timeout(state.proxy_timeout, upstream).await {
        Err(_) => {
            return Err(ApiError::GatewayTimeout(format!(
                "pod did not respond within {}ms",
                state.proxy_timeout.as_millis()
            )))
        }
        Ok(Err(e)) if e.is_timeout() => {
            return Err(ApiError::GatewayTimeout(format!("pod request timed out: {e}")))
        }
        Ok(Err(e)) => return Err(ApiError::BadGateway(format!("pod unreachable: {e}"))),
        Ok(Ok(response)) => response,
    };

    let status = response.status();
    let mut headers = response.headers().clone();
    strip_hop_by_hop(&mut headers);
    // The gateway's CORS layer answers for the pod
    let cors: Vec<HeaderName> = headers
        .keys()
        .filter(|name| name.as_str().starts_with("access-control-"))
        .cloned()
        .collect();
    for name in cors {
        headers.remove(name);
    }

    let mut out = Response::new(Body::from_stream(response.bytes_stream()));
    *out.status_mut() = status;
    *out.headers_mut() = headers;
    Ok(out)
}
