use crate::error::{AppError, AppResult};
use crate::inbox::{DraftPatch, Inboxes};
use crate::ipc::error::respond;
use crate::ipc::helpers::{optional_i64_list, optional_periode, optional_str_list, required_str};
use crate::ipc::types::{AppState, Request};
use crate::store;
use crate::workflow::ReportSummary;
use rusqlite::Connection;
use serde_json::json;
use tracing::debug;

fn inbox_state(inboxes: &Inboxes, params: &serde_json::Value) -> AppResult<serde_json::Value> {
    let teacher_id = required_str(params, "teacherId")?;
    Ok(json!({ "inbox": inboxes.get(&teacher_id) }))
}

fn inbox_view(
    conn: &Connection,
    inboxes: &mut Inboxes,
    params: &serde_json::Value,
) -> AppResult<serde_json::Value> {
    let teacher_id = required_str(params, "teacherId")?;
    let id = required_str(params, "id")?;
    let rec = store::attendance_require(conn, &id)?;
    let inbox = inboxes.entry(&teacher_id);
    inbox.view(&rec.id)?;
    Ok(json!({
        "report": ReportSummary::from_record(&rec),
        "inbox": inbox,
    }))
}

fn inbox_confirm_reject(
    conn: &Connection,
    inboxes: &mut Inboxes,
    params: &serde_json::Value,
) -> AppResult<serde_json::Value> {
    let teacher_id = required_str(params, "teacherId")?;
    let id = required_str(params, "id")?;
    let rec = store::attendance_require(conn, &id)?;
    let inbox = inboxes.entry(&teacher_id);
    inbox.confirm_reject(&rec.id)?;
    Ok(json!({ "inbox": inbox }))
}

fn inbox_update_draft(
    inboxes: &mut Inboxes,
    params: &serde_json::Value,
) -> AppResult<serde_json::Value> {
    let teacher_id = required_str(params, "teacherId")?;
    let patch = DraftPatch {
        topics: optional_str_list(params, "topics")?,
        scores: optional_i64_list(params, "scores")?,
        narrative: params
            .get("narrative")
            .and_then(|v| v.as_str())
            .map(|s| s.to_string()),
        periode: optional_periode(params, "periode")?,
    };
    let inbox = inboxes.entry(&teacher_id);
    inbox.update_draft(patch)?;
    Ok(json!({ "inbox": inbox }))
}

fn inbox_close(inboxes: &mut Inboxes, params: &serde_json::Value) -> AppResult<serde_json::Value> {
    let teacher_id = required_str(params, "teacherId")?;
    let inbox = inboxes.entry(&teacher_id);
    debug!(teacher = %teacher_id, report = ?inbox.report_id(), "inbox closed");
    inbox.close();
    Ok(json!({ "inbox": inbox }))
}

fn handle_inbox_state(state: &mut AppState, req: &Request) -> serde_json::Value {
    respond(&req.id, inbox_state(&state.inboxes, &req.params))
}

fn handle_inbox_view(state: &mut AppState, req: &Request) -> serde_json::Value {
    let AppState { db, inboxes, .. } = state;
    let result = match db.as_ref() {
        Some(conn) => inbox_view(conn, inboxes, &req.params),
        None => Err(AppError::NoWorkspace),
    };
    respond(&req.id, result)
}

fn handle_inbox_confirm_reject(state: &mut AppState, req: &Request) -> serde_json::Value {
    let AppState { db, inboxes, .. } = state;
    let result = match db.as_ref() {
        Some(conn) => inbox_confirm_reject(conn, inboxes, &req.params),
        None => Err(AppError::NoWorkspace),
    };
    respond(&req.id, result)
}

fn handle_inbox_update_draft(state: &mut AppState, req: &Request) -> serde_json::Value {
    respond(&req.id, inbox_update_draft(&mut state.inboxes, &req.params))
}

fn handle_inbox_close(state: &mut AppState, req: &Request) -> serde_json::Value {
    respond(&req.id, inbox_close(&mut state.inboxes, &req.params))
}

pub fn try_handle(state: &mut AppState, req: &Request) -> Option<serde_json::Value> {
    match req.method.as_str() {
        "inbox.state" => Some(handle_inbox_state(state, req)),
        "inbox.view" => Some(handle_inbox_view(state, req)),
        "inbox.confirmReject" => Some(handle_inbox_confirm_reject(state, req)),
        "inbox.updateDraft" => Some(handle_inbox_update_draft(state, req)),
        "inbox.close" => Some(handle_inbox_close(state, req)),
        _ => None,
    }
}
