use crate::ipc::error::{err, ok};
use crate::ipc::helpers::db_conn;
use crate::ipc::types::{AppState, Request};
use crate::photoboard::{self, error::PageError, Outcome};
use serde_json::Value;

fn page_err(req: &Request, e: &PageError) -> Value {
    match e {
        PageError::Storage(inner) => tracing::error!(error = ?inner, "photoboard.storage_error"),
        PageError::Render(inner) => tracing::error!(error = %inner, "photoboard.render_error"),
        _ => tracing::info!(code = e.code(), "photoboard.refused"),
    }
    err(&req.id, e.code(), e.to_string(), e.details())
}

fn handle_render(state: &mut AppState, req: &Request) -> Result<Value, Value> {
    let conn = db_conn(state, req)?;
    let outcome = photoboard::render(conn, &req.params).map_err(|e| page_err(req, &e))?;
    if let Outcome::Rendered(page) = &outcome {
        tracing::debug!(
            course_id = page.course_id,
            matched = page.matched,
            grand_total = page.grand_total,
            page = page.page,
            per_page = page.per_page,
            "photoboard.rendered"
        );
    }
    let result = serde_json::to_value(&outcome)
        .map_err(|e| err(&req.id, "internal_error", e.to_string(), None))?;
    Ok(ok(&req.id, result))
}

pub fn try_handle(state: &mut AppState, req: &Request) -> Option<serde_json::Value> {
    match req.method.as_str() {
        "photoboard.render" => Some(handle_render(state, req).unwrap_or_else(|e| e)),
        _ => None,
    }
}
