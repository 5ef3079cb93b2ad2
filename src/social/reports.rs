//! Post reports. Resolving a report flips its state; the row stays until the reported
//! post is deleted.

use rusqlite::{params, Connection};

use crate::auth::Principal;
use crate::db::flags::{ApiKeyPermission, ReportReasons};
use crate::db::models::{Report, ReportState};
use crate::db::timestamp;
use crate::error::{AppError, AppResult, ErrorCode};
use crate::social::{char_len, posts, REPORT_SUPPLEMENTARY_INFO_MAX_LEN};

pub fn report_post(
    conn: &Connection,
    principal: &Principal,
    post_id: i64,
    reasons: ReportReasons,
    supplementary_info: Option<&str>,
) -> AppResult<i64> {
    principal.require(ApiKeyPermission::Report)?;

    if reasons.is_empty() {
        return Err(AppError::Validation(ErrorCode::ReportReasonMissing));
    }
    let info = supplementary_info
        .map(str::trim)
        .filter(|info| !info.is_empty());
    if info.is_some_and(|info| char_len(info) > REPORT_SUPPLEMENTARY_INFO_MAX_LEN) {
        return Err(AppError::Validation(ErrorCode::ReportInfoTooLong));
    }

    let post = posts::visible_post(conn, principal, post_id)?;

    let already: bool = conn.query_row(
        "SELECT EXISTS (SELECT 1 FROM post_reports
                        WHERE post_id = ?1 AND reporter_id = ?2 AND state = ?3)",
        params![post.id, principal.user_id(), ReportState::Active],
        |row| row.get(0),
    )?;
    if already {
        return Err(AppError::Conflict(ErrorCode::AlreadyReported));
    }

    conn.execute(
        "INSERT INTO post_reports
            (post_id, reporter_id, state, report_reasons, supplementary_info, creation_time)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
        params![
            post.id,
            principal.user_id(),
            ReportState::Active,
            reasons,
            info,
            timestamp()
        ],
    )?;
    Ok(conn.last_insert_rowid())
}

pub fn list_active_reports(conn: &Connection, principal: &Principal) -> AppResult<Vec<Report>> {
    principal.require_moderator()?;

    let mut stmt = conn.prepare(
        "SELECT id, post_id, reporter_id, state, report_reasons, supplementary_info,
                creation_time
         FROM post_reports WHERE state = ?1 ORDER BY id",
    )?;
    let reports = stmt
        .query_map(params![ReportState::Active], Report::from_row)?
        .collect::<Result<Vec<_>, _>>()?;
    Ok(reports)
}

pub fn resolve_report(conn: &Connection, principal: &Principal, report_id: i64) -> AppResult<Report> {
    principal.require_moderator()?;

    let report =
        Report::by_id(conn, report_id)?.ok_or(AppError::NotFound(ErrorCode::ReportNotFound))?;
    if report.state == ReportState::Resolved {
        return Err(AppError::Conflict(ErrorCode::ReportAlreadyResolved));
    }

    conn.execute(
        "UPDATE post_reports SET state = ?1 WHERE id = ?2",
        params![ReportState::Resolved, report.id],
    )?;
    tracing::info!(
        "Moderator {} resolved report {}",
        principal.user_id(),
        report.id
    );

    Ok(Report {
        state: ReportState::Resolved,
        ..report
    })
}
