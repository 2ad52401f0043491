use crate::error::{AppError, AppResult};
use crate::inbox::{InboxState, Inboxes};
use crate::ipc::error::respond;
use crate::ipc::helpers::{
    optional_bool, optional_i64, optional_i64_list, optional_periode, optional_str,
    optional_str_list, require_db, required_str, student_key,
};
use crate::ipc::types::{AppState, Request};
use crate::ledger::is_attendance_event;
use crate::model::{today, AttendanceRecord, RecordStatus};
use crate::payments::ensure_package_for;
use crate::store::{self, AttendanceFilter};
use crate::workflow::{
    self, is_published, next_reportable_periode, plan_submission, sort_history, AuthoringDraft,
    ReportForm, ReportSummary, SubmitRequest,
};
use rusqlite::Connection;
use serde_json::json;
use tracing::info;

fn summaries(rows: &[AttendanceRecord]) -> Vec<ReportSummary> {
    rows.iter().map(ReportSummary::from_record).collect()
}

fn class_name_for(conn: &Connection, package_id: &str) -> AppResult<String> {
    Ok(store::payments_get(conn, package_id)?
        .map(|p| p.class_name)
        .unwrap_or_default())
}

/// Keeps the public verification row in step with a published report.
fn publish(conn: &Connection, rec: &AttendanceRecord) -> AppResult<()> {
    let class_name = class_name_for(conn, &rec.package_id)?;
    store::public_report_upsert(conn, &workflow::public_report(rec, &class_name))
}

fn transitioned(rec: &AttendanceRecord, inbox: &InboxState) -> serde_json::Value {
    info!(id = %rec.id, status = rec.status.as_str(), "report transition");
    json!({
        "report": ReportSummary::from_record(rec),
        "inbox": inbox,
    })
}

fn reports_submit(conn: &Connection, params: &serde_json::Value) -> AppResult<serde_json::Value> {
    let package_id = required_str(params, "packageId")?;
    let (student_name, key) = student_key(params)?;
    let teacher_id = required_str(params, "teacherId")?;
    let teacher_name = optional_str(params, "teacherName").unwrap_or_default();

    let package = store::payments_require(conn, &package_id)?;
    ensure_package_for(&package, &key)?;

    let rows = store::attendance_select(conn, &AttendanceFilter::for_package(&package_id, &key))?;
    let periode = match optional_periode(params, "periode")? {
        Some(p) => p,
        None => next_reportable_periode(&rows, &package_id).ok_or_else(|| {
            AppError::InvalidTransition("no periode is ready for a report yet".to_string())
        })?,
    };
    let date = today();
    let plan = plan_submission(
        &rows,
        &SubmitRequest {
            package_id: &package_id,
            student_name: &student_name,
            teacher_id: &teacher_id,
            teacher_name: &teacher_name,
            periode,
            date: &date,
        },
    )?;

    let tx = conn.unchecked_transaction()?;
    for id in &plan.delete_ids {
        store::attendance_delete(&tx, id)?;
    }
    store::attendance_insert(&tx, &plan.request)?;
    tx.commit()?;
    info!(
        id = %plan.request.id,
        package = %package_id,
        periode,
        replaced = plan.delete_ids.len(),
        "report requested"
    );

    let stored = store::attendance_require(conn, &plan.request.id)?;
    Ok(json!({ "report": ReportSummary::from_record(&stored) }))
}

fn reports_accept(
    conn: &Connection,
    inboxes: &mut Inboxes,
    params: &serde_json::Value,
) -> AppResult<serde_json::Value> {
    let id = required_str(params, "id")?;
    let teacher_id = required_str(params, "teacherId")?;
    let teacher_name = optional_str(params, "teacherName").unwrap_or_default();

    let inbox = inboxes.entry(&teacher_id);
    inbox.ensure_not_busy()?;
    let rec = store::attendance_require(conn, &id)?;
    let next = workflow::accept(&rec, &teacher_id, &teacher_name)?;
    store::attendance_update(conn, &next)?;

    let stored = store::attendance_require(conn, &id)?;
    inbox.begin_authoring(AuthoringDraft::seed(&stored))?;
    Ok(transitioned(&stored, inbox))
}

fn reports_reject(
    conn: &Connection,
    inboxes: &mut Inboxes,
    params: &serde_json::Value,
) -> AppResult<serde_json::Value> {
    let id = required_str(params, "id")?;
    let teacher_id = required_str(params, "teacherId")?;

    let inbox = inboxes.entry(&teacher_id);
    inbox.ensure_not_busy()?;
    let rec = store::attendance_require(conn, &id)?;
    let next = workflow::reject(&rec, &teacher_id)?;
    store::attendance_update(conn, &next)?;

    let stored = store::attendance_require(conn, &id)?;
    inbox.close();
    Ok(transitioned(&stored, inbox))
}

/// Form fields from params override the open draft, which overrides the stored row.
fn form_for_save(rec: &AttendanceRecord, inbox: &InboxState, params: &serde_json::Value) -> AppResult<ReportForm> {
    let mut form = match inbox.draft() {
        Some(draft) if draft.report_id == rec.id => draft.form.clone(),
        _ => ReportForm::from_record(rec),
    };
    if let Some(topics) = optional_str_list(params, "topics")? {
        form.topics = topics;
    }
    if let Some(scores) = optional_i64_list(params, "scores")? {
        form.scores = scores;
    }
    if let Some(narrative) = params.get("narrative").and_then(|v| v.as_str()) {
        form.narrative = narrative.to_string();
    }
    if let Some(periode) = optional_i64(params, "periode")? {
        form.periode = periode;
    }
    Ok(form)
}

fn reports_save(
    conn: &Connection,
    inboxes: &mut Inboxes,
    params: &serde_json::Value,
) -> AppResult<serde_json::Value> {
    let id = required_str(params, "id")?;
    let teacher_id = required_str(params, "teacherId")?;

    let inbox = inboxes.entry(&teacher_id);
    inbox.ensure_not_busy()?;
    let rec = store::attendance_require(conn, &id)?;
    let form = form_for_save(&rec, inbox, params)?;

    let next = match workflow::apply_save(&rec, &teacher_id, &form, &today()) {
        Ok(next) => next,
        Err(AppError::Validation { message, fields }) => {
            let mut draft = AuthoringDraft::seed(&rec);
            draft.form = form;
            draft.session_labels = workflow::session_labels(draft.form.periode);
            inbox.begin_authoring(draft)?;
            inbox.mark_invalid(fields.clone());
            return Err(AppError::Validation { message, fields });
        }
        Err(e) => return Err(e),
    };
    if next.periode != rec.periode {
        let rows = store::attendance_select(
            conn,
            &AttendanceFilter::for_package(&rec.package_id, &rec.student_key()),
        )?;
        workflow::check_periode_move(&rows, &rec, next.periode)?;
    }
    store::attendance_update(conn, &next)?;

    let stored = store::attendance_require(conn, &id)?;
    if is_published(&stored) {
        publish(conn, &stored)?;
    }
    inbox.close();
    Ok(transitioned(&stored, inbox))
}

fn reports_send(
    conn: &Connection,
    inboxes: &mut Inboxes,
    params: &serde_json::Value,
) -> AppResult<serde_json::Value> {
    let id = required_str(params, "id")?;
    let teacher_id = required_str(params, "teacherId")?;
    let stamp = (!optional_bool(params, "keepDate")).then(today);

    let inbox = inboxes.entry(&teacher_id);
    inbox.ensure_not_busy()?;
    let rec = store::attendance_require(conn, &id)?;
    let next = workflow::send(&rec, &teacher_id, stamp.as_deref())?;

    let tx = conn.unchecked_transaction()?;
    store::attendance_update(&tx, &next)?;
    publish(&tx, &next)?;
    tx.commit()?;

    let stored = store::attendance_require(conn, &id)?;
    inbox.close();
    Ok(transitioned(&stored, inbox))
}

fn reports_edit(
    conn: &Connection,
    inboxes: &mut Inboxes,
    params: &serde_json::Value,
) -> AppResult<serde_json::Value> {
    let id = required_str(params, "id")?;
    let teacher_id = required_str(params, "teacherId")?;

    let rec = store::attendance_require(conn, &id)?;
    let draft = workflow::open_edit(&rec, &teacher_id)?;
    let inbox = inboxes.entry(&teacher_id);
    inbox.begin_authoring(draft)?;
    Ok(json!({
        "report": ReportSummary::from_record(&rec),
        "inbox": inbox,
    }))
}

fn reports_get(conn: &Connection, params: &serde_json::Value) -> AppResult<serde_json::Value> {
    let id = required_str(params, "id")?;
    let rec = store::attendance_require(conn, &id)?;
    Ok(json!({ "report": ReportSummary::from_record(&rec) }))
}

fn reports_inbox(
    conn: &Connection,
    inboxes: &Inboxes,
    params: &serde_json::Value,
) -> AppResult<serde_json::Value> {
    let teacher_id = required_str(params, "teacherId")?;
    let last_actioned = optional_str(params, "lastActionedId");

    let mut rows = store::attendance_select(
        conn,
        &AttendanceFilter {
            teacher_id: Some(teacher_id.clone()),
            ..Default::default()
        },
    )?;
    rows.extend(store::attendance_select_unassigned(conn)?);

    let mut pending = Vec::new();
    let mut ready = Vec::new();
    let mut history = Vec::new();
    for rec in rows.into_iter().filter(|r| !is_attendance_event(r)) {
        match rec.status {
            RecordStatus::ReportRequest
            | RecordStatus::PendingReportAssignment
            | RecordStatus::ReportProcessing => pending.push(rec),
            RecordStatus::ReportReady => ready.push(rec),
            _ => history.push(rec),
        }
    }
    for list in [&mut pending, &mut ready, &mut history] {
        sort_history(list, last_actioned.as_deref());
    }

    Ok(json!({
        "pending": summaries(&pending),
        "ready": summaries(&ready),
        "history": summaries(&history),
        "inbox": inboxes.get(&teacher_id),
    }))
}

fn reports_student_list(
    conn: &Connection,
    params: &serde_json::Value,
) -> AppResult<serde_json::Value> {
    let (_, key) = student_key(params)?;
    let last_actioned = optional_str(params, "lastActionedId");
    let rows = store::attendance_select(
        conn,
        &AttendanceFilter {
            package_id: optional_str(params, "packageId"),
            student_key: Some(key),
            ..Default::default()
        },
    )?;

    let (mut published, mut requests): (Vec<_>, Vec<_>) = rows
        .into_iter()
        .filter(|r| !is_attendance_event(r))
        .partition(is_published);
    sort_history(&mut published, last_actioned.as_deref());
    sort_history(&mut requests, last_actioned.as_deref());

    Ok(json!({
        "published": summaries(&published),
        "requests": summaries(&requests),
    }))
}

fn handle_with_inbox(
    state: &mut AppState,
    req: &Request,
    f: fn(&Connection, &mut Inboxes, &serde_json::Value) -> AppResult<serde_json::Value>,
) -> serde_json::Value {
    let AppState { db, inboxes, .. } = state;
    let result = match db.as_ref() {
        Some(conn) => f(conn, inboxes, &req.params),
        None => Err(AppError::NoWorkspace),
    };
    respond(&req.id, result)
}

fn handle_reports_submit(state: &mut AppState, req: &Request) -> serde_json::Value {
    respond(&req.id, require_db(state).and_then(|conn| reports_submit(conn, &req.params)))
}

fn handle_reports_get(state: &mut AppState, req: &Request) -> serde_json::Value {
    respond(&req.id, require_db(state).and_then(|conn| reports_get(conn, &req.params)))
}

fn handle_reports_inbox(state: &mut AppState, req: &Request) -> serde_json::Value {
    let result = require_db(state).and_then(|conn| reports_inbox(conn, &state.inboxes, &req.params));
    respond(&req.id, result)
}

fn handle_reports_student_list(state: &mut AppState, req: &Request) -> serde_json::Value {
    respond(
        &req.id,
        require_db(state).and_then(|conn| reports_student_list(conn, &req.params)),
    )
}

pub fn try_handle(state: &mut AppState, req: &Request) -> Option<serde_json::Value> {
    match req.method.as_str() {
        "reports.submit" => Some(handle_reports_submit(state, req)),
        "reports.accept" => Some(handle_with_inbox(state, req, reports_accept)),
        "reports.reject" => Some(handle_with_inbox(state, req, reports_reject)),
        "reports.save" => Some(handle_with_inbox(state, req, reports_save)),
        "reports.send" => Some(handle_with_inbox(state, req, reports_send)),
        "reports.edit" => Some(handle_with_inbox(state, req, reports_edit)),
        "reports.get" => Some(handle_reports_get(state, req)),
        "reports.inbox" => Some(handle_reports_inbox(state, req)),
        "reports.studentList" => Some(handle_reports_student_list(state, req)),
        _ => None,
    }
}
