use axum::extract::State;
use axum::http::StatusCode;
use axum::routing::post;
use axum::{Json, Router};
use serde::Deserialize;
use serde_json::{json, Value};

use crate::db::flags::ReportReasons;
use crate::db::models::Report;
use crate::error::AppResult;
use crate::extractors::BearerToken;
use crate::routes::authed;
use crate::social::reports;
use crate::state::AppState;

pub fn router() -> Router<AppState> {
    Router::new().route(
        "/report/post",
        post(report_post).get(list_reports).patch(resolve_report),
    )
}

#[derive(Deserialize)]
struct ReportRequest {
    post_id: i64,
    report_reasons: ReportReasons,
    #[serde(default)]
    supplementary_info: Option<String>,
}

async fn report_post(
    State(state): State<AppState>,
    bearer: BearerToken,
    Json(req): Json<ReportRequest>,
) -> AppResult<(StatusCode, Json<Value>)> {
    let id = authed(&state, &bearer, |conn, principal| {
        reports::report_post(
            conn,
            principal,
            req.post_id,
            req.report_reasons,
            req.supplementary_info.as_deref(),
        )
    })?;
    Ok((StatusCode::CREATED, Json(json!({ "id": id }))))
}

async fn list_reports(
    State(state): State<AppState>,
    bearer: BearerToken,
) -> AppResult<Json<Vec<Report>>> {
    let reports = authed(&state, &bearer, |conn, principal| {
        reports::list_active_reports(conn, principal)
    })?;
    Ok(Json(reports))
}

#[derive(Deserialize)]
struct ResolveRequest {
    report_id: i64,
}

async fn resolve_report(
    State(state): State<AppState>,
    bearer: BearerToken,
    Json(req): Json<ResolveRequest>,
) -> AppResult<Json<Report>> {
    let report = authed(&state, &bearer, |conn, principal| {
        reports::resolve_report(conn, principal, req.report_id)
    })?;
    Ok(Json(report))
}
