use std::fmt::Write as _;
use std::sync::Arc;

use axum::Json;
use axum::body::Body;
use axum::extract::State;
use axum::extract::rejection::JsonRejection;
use axum::http::{HeaderMap, HeaderValue, StatusCode, header};
use axum::response::{IntoResponse, Response};
use bytes::Bytes;
use cyclops_shared::{RegionCatalog, RegionSelection, RegionsPayload};
use tokio::sync::oneshot;
use tracing::warn;

use crate::config::LEGEND_STOPS;
use crate::services::view_driver::{ViewCommand, region_summary};
use crate::state::{AppState, ObservabilitySnapshot};
use crate::view_state::ViewError;

const PROMETHEUS_CONTENT_TYPE: &str = "text/plain; version=0.0.4; charset=utf-8";

pub async fn health(State(state): State<AppState>) -> Json<serde_json::Value> {
    let (seq, timestamp, region, city_count) = {
        let live = state.live_view.read().await;
        (
            live.seq,
            live.timestamp.clone(),
            live.region.clone(),
            live.city_count,
        )
    };
    let observability = state.observability.snapshot();
    Json(serde_json::json!({
        "status": "ok",
        "seq": seq,
        "published_at": timestamp,
        "region": region,
        "cities": city_count,
        "regions": state.catalog.len(),
        "observability": {
            "view_requests_total": observability.view_requests_total,
            "refresh_ticks_total": observability.refresh_ticks_total,
            "provider_requests_total": observability.provider_requests_total,
            "provider_failures_total": observability.provider_failures_total,
            "region_switches_total": observability.region_switches_total,
            "rejected_region_switches_total": observability.rejected_region_switches_total,
        }
    }))
}

/// Serve the pre-serialized view; no re-serialization per request.
pub async fn get_view(State(state): State<AppState>, headers: HeaderMap) -> impl IntoResponse {
    state.observability.record_view_request();
    let (etag, json): (String, Arc<Bytes>) = {
        let live = state.live_view.read().await;
        (view_etag(state.instance, live.seq), Arc::clone(&live.view_json))
    };

    if json.is_empty() {
        return error_response(StatusCode::SERVICE_UNAVAILABLE, "view not published yet");
    }

    if if_none_match_matches(&headers, &etag) {
        return not_modified_response("no-cache", Some(etag.as_str()));
    }

    json_bytes_response((*json).clone(), "no-cache", Some(etag.as_str()))
}

pub async fn get_regions(State(state): State<AppState>) -> Json<RegionsPayload> {
    let active_key = state.live_view.read().await.region.clone();
    Json(regions_payload(&state.catalog, &active_key))
}

pub async fn select_region(
    State(state): State<AppState>,
    body: Result<Json<RegionSelection>, JsonRejection>,
) -> Response {
    let Json(selection) = match body {
        Ok(body) => body,
        Err(rejection) => {
            return error_response(StatusCode::BAD_REQUEST, &rejection.body_text());
        }
    };

    let (reply, response) = oneshot::channel();
    if state
        .commands
        .send(ViewCommand::SelectRegion { selection, reply })
        .await
        .is_err()
    {
        warn!("view driver is not running; cannot switch region");
        return error_response(StatusCode::SERVICE_UNAVAILABLE, "view driver unavailable");
    }

    match response.await {
        Ok(Ok(summary)) => Json(summary).into_response(),
        Ok(Err(e)) => error_response(view_error_status(&e), &e.to_string()),
        Err(_) => error_response(StatusCode::SERVICE_UNAVAILABLE, "view driver unavailable"),
    }
}

pub async fn get_color_scale(State(state): State<AppState>) -> impl IntoResponse {
    (
        [(header::CACHE_CONTROL, "public, max-age=3600")],
        Json(state.scale.legend(LEGEND_STOPS)),
    )
}

pub async fn metrics(State(state): State<AppState>) -> impl IntoResponse {
    let (seq, city_count) = {
        let live = state.live_view.read().await;
        (live.seq, live.city_count)
    };
    let body = render_prometheus_metrics(
        city_count,
        state.catalog.len(),
        seq,
        state.observability.snapshot(),
    );

    (
        [
            (header::CONTENT_TYPE, PROMETHEUS_CONTENT_TYPE),
            (header::CACHE_CONTROL, "no-store"),
        ],
        body,
    )
}

fn regions_payload(catalog: &RegionCatalog, active_key: &str) -> RegionsPayload {
    let active = catalog
        .position(active_key)
        .or_else(|| catalog.position(catalog.default_region()))
        .unwrap_or(0);
    RegionsPayload {
        active,
        regions: catalog
            .regions()
            .iter()
            .enumerate()
            .map(|(index, region)| region_summary(index, region))
            .collect(),
    }
}

fn view_error_status(error: &ViewError) -> StatusCode {
    match error {
        ViewError::UnknownRegion(_) | ViewError::RegionIndexOutOfRange { .. } => {
            StatusCode::NOT_FOUND
        }
        ViewError::SampleCountMismatch { .. } => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

fn render_prometheus_metrics(
    city_count: usize,
    region_count: usize,
    seq: u64,
    observability: ObservabilitySnapshot,
) -> String {
    let gauges = [
        (
            "cyclops_displayed_cities",
            "Number of cities in the active region.",
            city_count as u64,
        ),
        (
            "cyclops_regions",
            "Number of regions in the catalog.",
            region_count as u64,
        ),
        (
            "cyclops_view_seq",
            "Sequence number of the last published view.",
            seq,
        ),
    ];
    let counters = [
        (
            "cyclops_view_requests_total",
            "Total /api/view requests.",
            observability.view_requests_total,
        ),
        (
            "cyclops_refresh_ticks_total",
            "Total weather refreshes run.",
            observability.refresh_ticks_total,
        ),
        (
            "cyclops_provider_requests_total",
            "Total per-city weather provider requests.",
            observability.provider_requests_total,
        ),
        (
            "cyclops_provider_failures_total",
            "Total per-city provider failures degraded to a zero sample.",
            observability.provider_failures_total,
        ),
        (
            "cyclops_region_switches_total",
            "Total successful region switches.",
            observability.region_switches_total,
        ),
        (
            "cyclops_rejected_region_switches_total",
            "Total region selections rejected as unknown.",
            observability.rejected_region_switches_total,
        ),
    ];

    let mut body = String::new();
    for (name, help, value) in gauges {
        let _ = writeln!(body, "# HELP {name} {help}");
        let _ = writeln!(body, "# TYPE {name} gauge");
        let _ = writeln!(body, "{name} {value}");
    }
    for (name, help, value) in counters {
        let _ = writeln!(body, "# HELP {name} {help}");
        let _ = writeln!(body, "# TYPE {name} counter");
        let _ = writeln!(body, "{name} {value}");
    }
    body
}

/// Includes the process instance so a restarted server never revalidates an old view.
fn view_etag(instance: u64, seq: u64) -> String {
    format!("\"view-{instance:x}-{seq}\"")
}

fn error_response(status: StatusCode, message: &str) -> Response {
    (status, Json(serde_json::json!({ "error": message }))).into_response()
}

fn json_bytes_response(body: Bytes, cache_control: &'static str, etag: Option<&str>) -> Response {
    let mut response = Response::new(Body::from(body));
    let headers = response.headers_mut();
    headers.insert(
        header::CONTENT_TYPE,
        HeaderValue::from_static("application/json"),
    );
    headers.insert(
        header::CACHE_CONTROL,
        HeaderValue::from_static(cache_control),
    );
    if let Some(etag) = etag
        && let Ok(etag_header) = HeaderValue::from_str(etag)
    {
        headers.insert(header::ETAG, etag_header);
    }
    response
}

fn not_modified_response(cache_control: &'static str, etag: Option<&str>) -> Response {
    let mut response = StatusCode::NOT_MODIFIED.into_response();
    let headers = response.headers_mut();
    headers.insert(
        header::CACHE_CONTROL,
        HeaderValue::from_static(cache_control),
    );
    if let Some(etag) = etag
        && let Ok(etag_header) = HeaderValue::from_str(etag)
    {
        headers.insert(header::ETAG, etag_header);
    }
    response
}

fn normalize_etag(candidate: &str) -> &str {
    candidate.strip_prefix("W/").unwrap_or(candidate).trim()
}

fn if_none_match_matches(headers: &HeaderMap, etag: &str) -> bool {
    let Some(value) = headers.get(header::IF_NONE_MATCH) else {
        return false;
    };
    let Ok(raw) = value.to_str() else {
        return false;
    };

    raw.split(',').any(|candidate| {
        let candidate = candidate.trim();
        candidate == "*" || normalize_etag(candidate) == normalize_etag(etag)
    })
}
