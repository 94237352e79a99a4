//! Plain-HTTP route handlers: health, search history, range comparison.

use std::collections::HashMap;
use std::sync::Arc;

use axum::extract::{Query, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::Json;
use time::format_description::well_known::Rfc3339;
use time::macros::format_description;
use time::{Date, OffsetDateTime};

use spillway_pipeline::{compare_range, CompareError};

use super::{json_error, AppState};

/// Fallback handler for unmatched routes.
pub(crate) async fn handle_not_found() -> impl IntoResponse {
    json_error(StatusCode::NOT_FOUND, "not found")
}

/// GET /health
pub(crate) async fn handle_health() -> impl IntoResponse {
    let response = serde_json::json!({
        "status": "ok",
        "version": env!("CARGO_PKG_VERSION"),
    });
    (StatusCode::OK, Json(response))
}

/// GET /history
///
/// The ten most recent searches, newest first.
pub(crate) async fn handle_history(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    match state.store.recent_searches(10).await {
        Ok(records) => (StatusCode::OK, Json(records)).into_response(),
        Err(e) => {
            tracing::error!(error = %e, "history query failed");
            json_error(
                StatusCode::INTERNAL_SERVER_ERROR,
                "Could not fetch search history.",
            )
            .into_response()
        }
    }
}

/// GET /water-level-difference?dam_name=...&start=...&end=...
///
/// Compares the stored water levels of the most recent analysis for
/// `dam_name` between two dates. Dates are `YYYY-MM-DD` or full RFC 3339
/// timestamps, of which only the calendar date is kept.
pub(crate) async fn handle_water_level_difference(
    State(state): State<Arc<AppState>>,
    Query(params): Query<HashMap<String, String>>,
) -> impl IntoResponse {
    let (Some(dam_name), Some(start_raw), Some(end_raw)) = (
        params.get("dam_name"),
        params.get("start"),
        params.get("end"),
    ) else {
        return json_error(
            StatusCode::BAD_REQUEST,
            "Missing 'dam_name', 'start', or 'end' query parameters.",
        )
        .into_response();
    };

    let Some(start) = parse_day(start_raw) else {
        return json_error(
            StatusCode::BAD_REQUEST,
            &format!("Invalid 'start' date: {}", start_raw),
        )
        .into_response();
    };
    let Some(end) = parse_day(end_raw) else {
        return json_error(
            StatusCode::BAD_REQUEST,
            &format!("Invalid 'end' date: {}", end_raw),
        )
        .into_response();
    };

    match compare_range(state.store.as_ref(), &state.registry, dam_name, start, end).await {
        Ok(comparison) => (StatusCode::OK, Json(comparison)).into_response(),
        Err(e @ CompareError::NoDataInRange) => {
            json_error(StatusCode::NOT_FOUND, &e.to_string()).into_response()
        }
        Err(e @ CompareError::NoPriorAnalysis) => {
            json_error(StatusCode::INTERNAL_SERVER_ERROR, &e.to_string()).into_response()
        }
        Err(CompareError::Storage(e)) => {
            tracing::error!(error = %e, "range comparison failed");
            json_error(
                StatusCode::INTERNAL_SERVER_ERROR,
                "Could not compare water levels.",
            )
            .into_response()
        }
    }
}

/// Parse a query-string date: bare `YYYY-MM-DD`, or an RFC 3339 timestamp
/// whose calendar date is taken.
fn parse_day(raw: &str) -> Option<Date> {
    if let Ok(timestamp) = OffsetDateTime::parse(raw, &Rfc3339) {
        return Some(timestamp.date());
    }
    Date::parse(raw, format_description!("[year]-[month]-[day]")).ok()
}
