//! Public certificate lookup. Callers only ever learn "valid" or
//! "validation failed"; the cause of a failure is logged, not returned.

use crate::error::{AppError, AppResult};
use crate::model::PublicReport;
use crate::store;
use rusqlite::Connection;
use serde::Serialize;
use tracing::debug;

pub const FAILURE_MESSAGE: &str = "validation failed";

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum Verification {
    Valid { valid: bool, report: PublicReport },
    Invalid { valid: bool, message: &'static str },
}

impl Verification {
    fn valid(report: PublicReport) -> Self {
        Verification::Valid {
            valid: true,
            report,
        }
    }

    fn invalid() -> Self {
        Verification::Invalid {
            valid: false,
            message: FAILURE_MESSAGE,
        }
    }
}

/// Pulls `id` out of `id=...`, `?id=...` or a full link ending in one.
pub fn id_from_query(query: &str) -> Option<String> {
    let query = query.trim();
    let query = query.rsplit_once('?').map(|(_, q)| q).unwrap_or(query);
    query
        .split('&')
        .filter_map(|pair| pair.split_once('='))
        .find(|(k, _)| k.trim() == "id")
        .map(|(_, v)| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

fn lookup(conn: Option<&Connection>, id: Option<&str>) -> AppResult<PublicReport> {
    let conn = conn.ok_or(AppError::NoWorkspace)?;
    let id = id.ok_or_else(|| AppError::MissingParam("id".to_string()))?;
    store::public_report_get(conn, id)?.ok_or(AppError::NotFound("certificate"))
}

pub fn verify_certificate(conn: Option<&Connection>, id: Option<&str>) -> Verification {
    match lookup(conn, id) {
        Ok(report) => Verification::valid(report),
        Err(e) => {
            debug!(code = e.code(), "certificate rejected: {e}");
            Verification::invalid()
        }
    }
}
