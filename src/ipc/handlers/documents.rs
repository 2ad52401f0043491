use crate::config::AppConfig;
use crate::document::{self, Audience, SvgRasterizer};
use crate::error::{AppError, AppResult};
use crate::inbox::Inboxes;
use crate::ipc::error::respond;
use crate::ipc::helpers::{optional_str, required_str, student_key};
use crate::ipc::types::{AppState, Request};
use crate::milestones::derive_grid;
use crate::payments::ensure_package_for;
use crate::store::{self, AttendanceFilter};
use crate::templates::{self, ReportContext};
use crate::workflow::is_published;
use rusqlite::Connection;
use serde_json::json;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use tracing::info;

fn export_dir(workspace: &Path, config: &AppConfig, params: &serde_json::Value) -> PathBuf {
    match optional_str(params, "outDir") {
        Some(dir) => PathBuf::from(dir),
        None => workspace.join(&config.documents.export_dir),
    }
}

fn export_report(
    conn: &Connection,
    workspace: &Path,
    config: &AppConfig,
    inboxes: &mut Inboxes,
    params: &serde_json::Value,
) -> AppResult<serde_json::Value> {
    let id = required_str(params, "id")?;
    let audience = Audience::parse(optional_str(params, "audience").as_deref())?;
    let teacher_id = optional_str(params, "teacherId");

    let rec = store::attendance_require(conn, &id)?;
    if !rec.has_report_content() {
        return Err(AppError::InvalidTransition(
            "report has no content to export yet".to_string(),
        ));
    }
    if audience == Audience::Student && !is_published(&rec) {
        return Err(AppError::NotPermitted(
            "report has not been sent to the student".to_string(),
        ));
    }

    let class_name = store::payments_get(conn, &rec.package_id)?
        .map(|p| p.class_name)
        .unwrap_or_default();
    let student = rec.student_key();
    let ledger =
        store::attendance_select(conn, &AttendanceFilter::for_package(&rec.package_id, &student))?;
    let milestones = derive_grid(Some(ledger.as_slice()), &rec.package_id, &student, rec.periode);
    let pages = templates::report_templates(&ReportContext {
        report: &rec,
        class_name: &class_name,
        milestones: &milestones,
        config,
    });
    let layout = document::report_layout(&rec.id, audience);
    let out_path = export_dir(workspace, config, params)
        .join(document::report_file_name(rec.student_name(), &rec.id));

    // Teacher exports occupy the teacher's inbox until the file is written.
    let summary = match teacher_id {
        Some(teacher_id) => {
            let inbox = inboxes.entry(&teacher_id);
            let prior = inbox.begin_download(&rec.id)?;
            let result = document::export_document(
                &SvgRasterizer,
                &pages,
                &layout,
                config.documents.scale,
                &out_path,
                |p| inbox.set_progress(p),
            );
            inbox.finish_download(prior);
            result?
        }
        None => document::export_document(
            &SvgRasterizer,
            &pages,
            &layout,
            config.documents.scale,
            &out_path,
            |_| {},
        )?,
    };
    info!(id = %rec.id, path = %summary.path, pages = summary.pages.len(), "report exported");
    Ok(json!(summary))
}

fn export_receipt(
    conn: &Connection,
    workspace: &Path,
    config: &AppConfig,
    params: &serde_json::Value,
) -> AppResult<serde_json::Value> {
    let payment_id = required_str(params, "paymentId")?;
    let (student_name, key) = student_key(params)?;
    let payment = store::payments_require(conn, &payment_id)?;
    ensure_package_for(&payment, &key)?;

    let template = templates::receipt_template(&payment, config);
    let pages = HashMap::from([(template.id.clone(), template)]);
    let out_path = export_dir(workspace, config, params)
        .join(document::receipt_file_name(&student_name, &payment.id));
    let summary = document::export_document(
        &SvgRasterizer,
        &pages,
        &document::receipt_layout(&payment.id),
        config.documents.scale,
        &out_path,
        |_| {},
    )?;
    info!(id = %payment.id, path = %summary.path, "receipt exported");
    Ok(json!(summary))
}

fn handle_export_report(state: &mut AppState, req: &Request) -> serde_json::Value {
    let AppState {
        workspace,
        db,
        config,
        inboxes,
    } = state;
    let result = match (db.as_ref(), workspace.as_ref()) {
        (Some(conn), Some(ws)) => export_report(conn, ws, config, inboxes, &req.params),
        _ => Err(AppError::NoWorkspace),
    };
    respond(&req.id, result)
}

fn handle_export_receipt(state: &mut AppState, req: &Request) -> serde_json::Value {
    let result = match (state.db.as_ref(), state.workspace.as_ref()) {
        (Some(conn), Some(ws)) => export_receipt(conn, ws, &state.config, &req.params),
        _ => Err(AppError::NoWorkspace),
    };
    respond(&req.id, result)
}

pub fn try_handle(state: &mut AppState, req: &Request) -> Option<serde_json::Value> {
    match req.method.as_str() {
        "documents.exportReport" => Some(handle_export_report(state, req)),
        "documents.exportReceipt" => Some(handle_export_receipt(state, req)),
        _ => None,
    }
}
