use crate::ipc::error::{err, ok};
use crate::ipc::helpers::{db_conn, db_failed};
use crate::ipc::types::{AppState, Request};
use crate::settings::{self, SetupSection};
use serde_json::{json, Map, Value};

fn handle_setup_get(state: &mut AppState, req: &Request) -> Result<Value, Value> {
    let conn = db_conn(state, req)?;
    let mut out = Map::new();
    for section in SetupSection::ALL {
        let value =
            settings::load_section(conn, section).map_err(|e| db_failed(req, "db_query_failed", e))?;
        out.insert(section.name().to_string(), value);
    }
    Ok(ok(&req.id, Value::Object(out)))
}

fn handle_setup_update(state: &mut AppState, req: &Request) -> Result<Value, Value> {
    let conn = db_conn(state, req)?;
    let Some(section_raw) = req.params.get("section").and_then(|v| v.as_str()) else {
        return Err(err(&req.id, "bad_params", "missing section", None));
    };
    let Some(section) = SetupSection::parse(section_raw) else {
        return Err(err(&req.id, "bad_params", "unknown section", None));
    };
    let Some(patch_obj) = req.params.get("patch").and_then(|v| v.as_object()) else {
        return Err(err(&req.id, "bad_params", "patch must be an object", None));
    };

    match settings::update_section(conn, section, patch_obj) {
        Ok(Ok(current)) => {
            tracing::info!(section = section.name(), "setup.updated");
            Ok(ok(&req.id, json!({ "ok": true, "section": current })))
        }
        Ok(Err(msg)) => Err(err(&req.id, "bad_params", msg, None)),
        Err(e) => Err(db_failed(req, "db_update_failed", e)),
    }
}

pub fn try_handle(state: &mut AppState, req: &Request) -> Option<serde_json::Value> {
    let resp = match req.method.as_str() {
        "setup.get" => handle_setup_get(state, req),
        "setup.update" => handle_setup_update(state, req),
        _ => return None,
    };
    Some(resp.unwrap_or_else(|e| e))
}
