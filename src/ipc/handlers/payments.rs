use crate::config::PaymentConfig;
use crate::error::AppResult;
use crate::ipc::error::respond;
use crate::ipc::helpers::{optional_i64, optional_str, require_db, required_str, student_key};
use crate::ipc::types::{AppState, Request};
use crate::model::{today, StudentKey};
use crate::payments::{self, compose_class_name, PaymentFields};
use crate::store;
use rusqlite::Connection;
use serde_json::json;
use tracing::info;

/// `className` wins; otherwise it is composed from subject, level and room.
fn class_name_param(params: &serde_json::Value) -> Option<String> {
    optional_str(params, "className").or_else(|| {
        let composed = compose_class_name(
            &optional_str(params, "subject").unwrap_or_default(),
            &optional_str(params, "level").unwrap_or_default(),
            &optional_str(params, "room").unwrap_or_default(),
        );
        (!composed.is_empty()).then_some(composed)
    })
}

fn payments_list(conn: &Connection, params: &serde_json::Value) -> AppResult<serde_json::Value> {
    let student = optional_str(params, "studentName").map(|n| StudentKey::from_name(&n));
    let rows = store::payments_select(conn, student.as_ref())?;
    Ok(json!({ "payments": rows }))
}

fn payments_create(
    conn: &Connection,
    cfg: &PaymentConfig,
    params: &serde_json::Value,
) -> AppResult<serde_json::Value> {
    let fields = PaymentFields {
        student_name: optional_str(params, "studentName").unwrap_or_default(),
        class_name: class_name_param(params).unwrap_or_default(),
        amount: optional_i64(params, "amount")?.unwrap_or(0),
        date: optional_str(params, "date").unwrap_or_else(today),
        receipt_data: optional_str(params, "receiptData").unwrap_or_default(),
    };
    payments::validate_fields(&fields, cfg.max_receipt_bytes)?;
    let p = payments::new_payment(fields);
    store::payments_insert(conn, &p)?;
    info!(id = %p.id, amount = p.amount, "payment recorded");

    let stored = store::payments_require(conn, &p.id)?;
    Ok(json!({ "payment": stored }))
}

fn payments_update(
    conn: &Connection,
    cfg: &PaymentConfig,
    params: &serde_json::Value,
) -> AppResult<serde_json::Value> {
    let id = required_str(params, "id")?;
    let (_, actor) = student_key(params)?;
    let current = store::payments_require(conn, &id)?;
    payments::ensure_mutable(&current, &actor)?;

    let fields = PaymentFields {
        student_name: current.student_name.clone(),
        class_name: class_name_param(params).unwrap_or_else(|| current.class_name.clone()),
        amount: optional_i64(params, "amount")?.unwrap_or(current.amount),
        date: optional_str(params, "date").unwrap_or_else(|| current.date.clone()),
        receipt_data: optional_str(params, "receiptData")
            .unwrap_or_else(|| current.receipt_data.clone()),
    };
    payments::validate_fields(&fields, cfg.max_receipt_bytes)?;
    let mut next = current;
    next.class_name = fields.class_name;
    next.amount = fields.amount;
    next.date = fields.date;
    next.receipt_data = fields.receipt_data;
    store::payments_update(conn, &next)?;

    let stored = store::payments_require(conn, &id)?;
    Ok(json!({ "payment": stored }))
}

fn payments_delete(conn: &Connection, params: &serde_json::Value) -> AppResult<serde_json::Value> {
    let id = required_str(params, "id")?;
    let (_, actor) = student_key(params)?;
    let current = store::payments_require(conn, &id)?;
    payments::ensure_mutable(&current, &actor)?;
    let deleted = store::payments_delete(conn, &id)?;
    info!(id = %id, "payment deleted");
    Ok(json!({ "deleted": deleted }))
}

fn payments_verify(conn: &Connection, params: &serde_json::Value) -> AppResult<serde_json::Value> {
    let id = required_str(params, "id")?;
    let current = store::payments_require(conn, &id)?;
    let next = payments::verify(&current)?;
    store::payments_update(conn, &next)?;
    info!(id = %id, "payment verified");

    let stored = store::payments_require(conn, &id)?;
    Ok(json!({ "payment": stored }))
}

fn handle_payments_list(state: &mut AppState, req: &Request) -> serde_json::Value {
    respond(&req.id, require_db(state).and_then(|conn| payments_list(conn, &req.params)))
}

fn handle_payments_create(state: &mut AppState, req: &Request) -> serde_json::Value {
    let result = require_db(state)
        .and_then(|conn| payments_create(conn, &state.config.payments, &req.params));
    respond(&req.id, result)
}

fn handle_payments_update(state: &mut AppState, req: &Request) -> serde_json::Value {
    let result = require_db(state)
        .and_then(|conn| payments_update(conn, &state.config.payments, &req.params));
    respond(&req.id, result)
}

fn handle_payments_delete(state: &mut AppState, req: &Request) -> serde_json::Value {
    respond(&req.id, require_db(state).and_then(|conn| payments_delete(conn, &req.params)))
}

fn handle_payments_verify(state: &mut AppState, req: &Request) -> serde_json::Value {
    respond(&req.id, require_db(state).and_then(|conn| payments_verify(conn, &req.params)))
}

pub fn try_handle(state: &mut AppState, req: &Request) -> Option<serde_json::Value> {
    match req.method.as_str() {
        "payments.list" => Some(handle_payments_list(state, req)),
        "payments.create" => Some(handle_payments_create(state, req)),
        "payments.update" => Some(handle_payments_update(state, req)),
        "payments.delete" => Some(handle_payments_delete(state, req)),
        "payments.verify" => Some(handle_payments_verify(state, req)),
        _ => None,
    }
}
