use crate::ipc::error::{err, ok};
use crate::ipc::helpers::{db_conn, db_failed, optional_i64, required_i64, required_str};
use crate::ipc::types::{AppState, Request};
use crate::platform::{events, session, users};
use serde_json::{json, Value};

fn handle_sessions_open(state: &mut AppState, req: &Request) -> Result<Value, Value> {
    let conn = db_conn(state, req)?;
    let user_id = required_i64(req, "userId")?;
    let user =
        users::user_by_id(conn, user_id).map_err(|e| db_failed(req, "db_query_failed", e))?;
    if user.is_none() {
        return Err(err(&req.id, "not_found", "user not found", None));
    }
    let (token, sess) =
        session::open_session(conn, user_id).map_err(|e| db_failed(req, "db_insert_failed", e))?;
    tracing::debug!(user_id, "sessions.opened");
    Ok(ok(
        &req.id,
        json!({ "token": token, "sesskey": sess.sesskey }),
    ))
}

fn handle_sessions_close(state: &mut AppState, req: &Request) -> Result<Value, Value> {
    let conn = db_conn(state, req)?;
    let token = required_str(req, "token")?;
    let closed =
        session::close_session(conn, &token).map_err(|e| db_failed(req, "db_delete_failed", e))?;
    Ok(ok(&req.id, json!({ "closed": closed })))
}

fn handle_events_list(state: &mut AppState, req: &Request) -> Result<Value, Value> {
    let conn = db_conn(state, req)?;
    let course_id = optional_i64(req, "courseId")?;
    let list =
        events::list_events(conn, course_id).map_err(|e| db_failed(req, "db_query_failed", e))?;
    Ok(ok(&req.id, json!({ "events": list })))
}

pub fn try_handle(state: &mut AppState, req: &Request) -> Option<serde_json::Value> {
    let resp = match req.method.as_str() {
        "sessions.open" => handle_sessions_open(state, req),
        "sessions.close" => handle_sessions_close(state, req),
        "events.list" => handle_events_list(state, req),
        _ => return None,
    };
    Some(resp.unwrap_or_else(|e| e))
}
