use crate::error::{AppError, AppResult};
use crate::ipc::types::AppState;
use crate::model::{is_valid_periode, StudentKey, MAX_PERIODE};
use rusqlite::Connection;
use serde_json::Value;

pub fn require_db(state: &AppState) -> AppResult<&Connection> {
    state.db.as_ref().ok_or(AppError::NoWorkspace)
}

pub fn optional_str(params: &Value, key: &str) -> Option<String> {
    params
        .get(key)
        .and_then(|v| v.as_str())
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
}

pub fn required_str(params: &Value, key: &str) -> AppResult<String> {
    optional_str(params, key).ok_or_else(|| AppError::MissingParam(key.to_string()))
}

pub fn optional_i64(params: &Value, key: &str) -> AppResult<Option<i64>> {
    match params.get(key) {
        None | Some(Value::Null) => Ok(None),
        Some(v) => v
            .as_i64()
            .map(Some)
            .ok_or_else(|| AppError::BadParams(format!("{key} must be an integer"))),
    }
}

pub fn optional_periode(params: &Value, key: &str) -> AppResult<Option<i64>> {
    match optional_i64(params, key)? {
        Some(p) if !is_valid_periode(p) => Err(AppError::BadParams(format!(
            "{key} must be between 1 and {MAX_PERIODE}"
        ))),
        other => Ok(other),
    }
}

pub fn optional_bool(params: &Value, key: &str) -> bool {
    params.get(key).and_then(|v| v.as_bool()).unwrap_or(false)
}

pub fn optional_str_list(params: &Value, key: &str) -> AppResult<Option<Vec<String>>> {
    match params.get(key) {
        None | Some(Value::Null) => Ok(None),
        Some(Value::Array(items)) => items
            .iter()
            .map(|v| {
                v.as_str()
                    .map(|s| s.to_string())
                    .ok_or_else(|| AppError::BadParams(format!("{key} must be a list of strings")))
            })
            .collect::<AppResult<Vec<_>>>()
            .map(Some),
        Some(_) => Err(AppError::BadParams(format!("{key} must be a list of strings"))),
    }
}

pub fn optional_i64_list(params: &Value, key: &str) -> AppResult<Option<Vec<i64>>> {
    match params.get(key) {
        None | Some(Value::Null) => Ok(None),
        Some(Value::Array(items)) => items
            .iter()
            .map(|v| {
                v.as_i64()
                    .ok_or_else(|| AppError::BadParams(format!("{key} must be a list of integers")))
            })
            .collect::<AppResult<Vec<_>>>()
            .map(Some),
        Some(_) => Err(AppError::BadParams(format!("{key} must be a list of integers"))),
    }
}

pub fn student_key(params: &Value) -> AppResult<(String, StudentKey)> {
    let name = required_str(params, "studentName")?;
    let key = StudentKey::from_name(&name);
    Ok((name, key))
}
