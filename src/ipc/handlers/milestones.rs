use crate::error::AppResult;
use crate::ipc::error::respond;
use crate::ipc::helpers::{optional_periode, required_str, student_key};
use crate::ipc::types::{AppState, Request};
use crate::milestones::derive_grid;
use crate::model::AttendanceRecord;
use crate::store::{self, AttendanceFilter};
use serde_json::json;

fn milestones_view(state: &AppState, params: &serde_json::Value) -> AppResult<serde_json::Value> {
    let package_id = required_str(params, "packageId")?;
    let (_, key) = student_key(params)?;
    let periode = optional_periode(params, "periode")?.unwrap_or(1);

    // Without an open workspace the ledger has not been loaded yet.
    let ledger: Option<Vec<AttendanceRecord>> = match state.db.as_ref() {
        Some(conn) => Some(store::attendance_select(
            conn,
            &AttendanceFilter::for_package(&package_id, &key),
        )?),
        None => None,
    };
    let view = derive_grid(ledger.as_deref(), &package_id, &key, periode);
    Ok(json!(view))
}

fn handle_milestones_view(state: &mut AppState, req: &Request) -> serde_json::Value {
    respond(&req.id, milestones_view(state, &req.params))
}

pub fn try_handle(state: &mut AppState, req: &Request) -> Option<serde_json::Value> {
    match req.method.as_str() {
        "milestones.view" => Some(handle_milestones_view(state, req)),
        _ => None,
    }
}
