use crate::error::{AppError, AppResult};
use crate::ipc::error::respond;
use crate::ipc::helpers::{optional_i64, optional_str, require_db, required_str, student_key};
use crate::ipc::types::{AppState, Request};
use crate::ledger::{self, check_claim, new_session_record, LedgerIndex, SessionClaim};
use crate::model::{
    is_valid_date, periode_of_session, today, AttendanceRecord, PaymentStatus, StudentKey, MAX_PERIODE,
    MAX_SESSION_NUMBER,
};
use crate::payments::ensure_package_for;
use crate::store::{self, AttendanceFilter};
use crate::workflow::{is_active_report, is_official_for, next_reportable_periode};
use rusqlite::Connection;
use serde_json::json;
use tracing::info;

fn package_events(
    conn: &Connection,
    package_id: &str,
    student: &StudentKey,
) -> AppResult<Vec<AttendanceRecord>> {
    let rows = store::attendance_select(conn, &AttendanceFilter::for_package(package_id, student))?;
    Ok(LedgerIndex::build(&rows).sessions(package_id, student).to_vec())
}

fn ledger_summary(events: &[AttendanceRecord]) -> serde_json::Value {
    let current_max = ledger::current_max(events);
    let next = (current_max < MAX_SESSION_NUMBER).then_some(current_max + 1);
    json!({
        "sessions": events,
        "currentMax": current_max,
        "nextSession": next,
    })
}

fn sessions_list(conn: &Connection, params: &serde_json::Value) -> AppResult<serde_json::Value> {
    let package_id = required_str(params, "packageId")?;
    let (_, key) = student_key(params)?;
    let events = package_events(conn, &package_id, &key)?;
    Ok(ledger_summary(&events))
}

fn sessions_claim_next(
    conn: &Connection,
    params: &serde_json::Value,
) -> AppResult<serde_json::Value> {
    let package_id = required_str(params, "packageId")?;
    let (student_name, key) = student_key(params)?;
    let requested = optional_i64(params, "sessionNumber")?;
    let teacher_id = optional_str(params, "teacherId");
    let teacher_name = optional_str(params, "teacherName").unwrap_or_default();
    let date = optional_str(params, "date").unwrap_or_else(today);
    if !is_valid_date(&date) {
        return Err(AppError::BadParams("date must be YYYY-MM-DD".to_string()));
    }

    let package = store::payments_require(conn, &package_id)?;
    ensure_package_for(&package, &key)?;

    let events = package_events(conn, &package_id, &key)?;
    let requested = requested.unwrap_or_else(|| ledger::current_max(&events) + 1);
    let session_number = check_claim(&events, requested)?;

    let rec = new_session_record(&SessionClaim {
        package_id: &package_id,
        student_name: &student_name,
        session_number,
        teacher: teacher_id
            .as_deref()
            .map(|id| (id, teacher_name.as_str())),
        date: &date,
    });
    store::attendance_insert(conn, &rec)?;
    info!(id = %rec.id, package = %package_id, session = session_number, "session logged");

    let events = package_events(conn, &package_id, &key)?;
    let mut out = ledger_summary(&events);
    out["session"] = json!(rec);
    Ok(out)
}

fn packages_list(conn: &Connection, params: &serde_json::Value) -> AppResult<serde_json::Value> {
    let (_, key) = student_key(params)?;
    let packages: Vec<_> = store::payments_select(conn, Some(&key))?
        .into_iter()
        .filter(|p| p.status == PaymentStatus::Verified)
        .collect();
    let rows = store::attendance_select(
        conn,
        &AttendanceFilter {
            student_key: Some(key.clone()),
            ..Default::default()
        },
    )?;
    let index = LedgerIndex::build(&rows);

    let mut out = Vec::new();
    for p in &packages {
        let events = index.sessions(&p.id, &key);
        let package_rows: Vec<AttendanceRecord> =
            rows.iter().filter(|r| r.package_id == p.id).cloned().collect();
        let current_max = ledger::current_max(events);
        let current_periode = periode_of_session(current_max + 1).min(MAX_PERIODE);
        let periods: Vec<_> = (1..=current_periode)
            .map(|periode| {
                let report = package_rows
                    .iter()
                    .filter(|r| r.periode == periode && is_active_report(r))
                    .filter(|r| !ledger::is_attendance_event(r))
                    .max_by(|a, b| a.id.cmp(&b.id));
                json!({
                    "periode": periode,
                    "completed": ledger::completed_in_period(events, periode),
                    "reportId": report.map(|r| r.id.clone()),
                    "reportStatus": report.map(|r| r.status),
                    "official": report.map(|r| is_official_for(r, &p.id)).unwrap_or(false),
                })
            })
            .collect();
        out.push(json!({
            "package": p,
            "sessionsCompleted": events.len(),
            "currentMax": current_max,
            "nextSession": (current_max < MAX_SESSION_NUMBER).then_some(current_max + 1),
            "currentPeriode": current_periode,
            "reportablePeriode": next_reportable_periode(&package_rows, &p.id),
            "periods": periods,
        }));
    }
    Ok(json!({ "packages": out }))
}

fn handle_sessions_list(state: &mut AppState, req: &Request) -> serde_json::Value {
    respond(&req.id, require_db(state).and_then(|conn| sessions_list(conn, &req.params)))
}

fn handle_sessions_claim_next(state: &mut AppState, req: &Request) -> serde_json::Value {
    respond(
        &req.id,
        require_db(state).and_then(|conn| sessions_claim_next(conn, &req.params)),
    )
}

fn handle_packages_list(state: &mut AppState, req: &Request) -> serde_json::Value {
    respond(&req.id, require_db(state).and_then(|conn| packages_list(conn, &req.params)))
}

pub fn try_handle(state: &mut AppState, req: &Request) -> Option<serde_json::Value> {
    match req.method.as_str() {
        "sessions.list" => Some(handle_sessions_list(state, req)),
        "sessions.claimNext" => Some(handle_sessions_claim_next(state, req)),
        "packages.list" => Some(handle_packages_list(state, req)),
        _ => None,
    }
}
