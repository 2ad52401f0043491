use crate::config;
use crate::db;
use crate::error::AppError;
use crate::inbox::Inboxes;
use crate::ipc::error::{fail, ok};
use crate::ipc::types::{AppState, Request};
use serde_json::json;
use std::path::PathBuf;
use tracing::info;

fn handle_health(state: &mut AppState, req: &Request) -> serde_json::Value {
    ok(
        &req.id,
        json!({
            "version": env!("CARGO_PKG_VERSION"),
            "workspacePath": state.workspace.as_ref().map(|p| p.to_string_lossy().to_string())
        }),
    )
}

/// Opens the database and loads `rapotd.toml`. Nothing changes unless both succeed.
pub fn select_workspace(state: &mut AppState, path: PathBuf) -> Result<(), AppError> {
    let cfg = config::load_workspace_config(&path).map_err(|e| AppError::Config(format!("{e:#}")))?;
    let conn = db::open_db(&path).map_err(|e| {
        AppError::Io(std::io::Error::new(std::io::ErrorKind::Other, format!("{e:#}")))
    })?;
    info!(workspace = %path.to_string_lossy(), school = %cfg.school.name, "workspace selected");
    state.workspace = Some(path);
    state.db = Some(conn);
    state.config = cfg;
    state.inboxes = Inboxes::default();
    Ok(())
}

fn handle_workspace_select(state: &mut AppState, req: &Request) -> serde_json::Value {
    let p = req
        .params
        .get("path")
        .and_then(|v| v.as_str())
        .map(PathBuf::from);
    let Some(path) = p else {
        return fail(&req.id, &AppError::MissingParam("path".to_string()));
    };

    match select_workspace(state, path.clone()) {
        Ok(()) => ok(
            &req.id,
            json!({
                "workspacePath": path.to_string_lossy(),
                "school": state.config.school.name,
            }),
        ),
        Err(e) => fail(&req.id, &e),
    }
}

pub fn try_handle(state: &mut AppState, req: &Request) -> Option<serde_json::Value> {
    match req.method.as_str() {
        "health" => Some(handle_health(state, req)),
        "workspace.select" => Some(handle_workspace_select(state, req)),
        _ => None,
    }
}
