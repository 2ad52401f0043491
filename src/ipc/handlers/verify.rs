use crate::ipc::error::ok;
use crate::ipc::helpers::optional_str;
use crate::ipc::types::{AppState, Request};
use crate::verify::{id_from_query, verify_certificate};
use serde_json::json;

/// Always answers `ok`; an unknown or malformed id is a negative verification.
fn handle_certificates_verify(state: &mut AppState, req: &Request) -> serde_json::Value {
    let id = optional_str(&req.params, "id")
        .or_else(|| optional_str(&req.params, "query").and_then(|q| id_from_query(&q)));
    let outcome = verify_certificate(state.db.as_ref(), id.as_deref());
    ok(&req.id, json!(outcome))
}

pub fn try_handle(state: &mut AppState, req: &Request) -> Option<serde_json::Value> {
    match req.method.as_str() {
        "certificates.verify" => Some(handle_certificates_verify(state, req)),
        _ => None,
    }
}
