use crate::ipc::error::{err, ok};
use crate::ipc::helpers::{
    db_conn, db_failed, optional_i64, optional_str, required_i64, required_str,
};
use crate::ipc::types::{AppState, Request};
use crate::platform::access::{self, Permission};
use crate::platform::context::{self, SYSTEM_CONTEXT_ID};
use crate::platform::{roles, users};
use serde_json::{json, Value};

fn role_exists(conn: &rusqlite::Connection, req: &Request, role_id: i64) -> Result<(), Value> {
    let hit: i64 = conn
        .query_row("SELECT COUNT(*) FROM roles WHERE id = ?", [role_id], |r| r.get(0))
        .map_err(|e| db_failed(req, "db_query_failed", e.into()))?;
    if hit == 0 {
        return Err(err(&req.id, "not_found", "role not found", None));
    }
    Ok(())
}

fn context_exists(conn: &rusqlite::Connection, req: &Request, context_id: i64) -> Result<(), Value> {
    let ctx = context::context_by_id(conn, context_id)
        .map_err(|e| db_failed(req, "db_query_failed", e))?;
    if ctx.is_none() {
        return Err(err(&req.id, "not_found", "context not found", None));
    }
    Ok(())
}

fn handle_roles_create(state: &mut AppState, req: &Request) -> Result<Value, Value> {
    let conn = db_conn(state, req)?;
    let shortname = required_str(req, "shortname")?;
    let name = required_str(req, "name")?;
    let sortorder = optional_i64(req, "sortorder")?.unwrap_or(0);
    let role_id = roles::create_role(conn, &shortname, &name, sortorder)
        .map_err(|e| db_failed(req, "db_insert_failed", e))?;
    Ok(ok(&req.id, json!({ "roleId": role_id })))
}

fn handle_roles_assign(state: &mut AppState, req: &Request) -> Result<Value, Value> {
    let conn = db_conn(state, req)?;
    let role_id = required_i64(req, "roleId")?;
    let user_id = required_i64(req, "userId")?;
    let context_id = required_i64(req, "contextId")?;

    role_exists(conn, req, role_id)?;
    context_exists(conn, req, context_id)?;
    let user =
        users::user_by_id(conn, user_id).map_err(|e| db_failed(req, "db_query_failed", e))?;
    if user.is_none() {
        return Err(err(&req.id, "not_found", "user not found", None));
    }
    roles::assign_role(conn, role_id, user_id, context_id)
        .map_err(|e| db_failed(req, "db_insert_failed", e))?;
    Ok(ok(&req.id, json!({ "ok": true })))
}

fn handle_roles_grant(state: &mut AppState, req: &Request) -> Result<Value, Value> {
    let conn = db_conn(state, req)?;
    let role_id = required_i64(req, "roleId")?;
    let capability = required_str(req, "capability")?;
    let permission = match optional_str(req, "permission") {
        None => Permission::Allow,
        Some(s) => Permission::parse(&s).ok_or_else(|| {
            err(&req.id, "bad_params", format!("unknown permission: {}", s), None)
        })?,
    };
    let context_id = optional_i64(req, "contextId")?.unwrap_or(SYSTEM_CONTEXT_ID);

    role_exists(conn, req, role_id)?;
    context_exists(conn, req, context_id)?;
    access::grant(conn, role_id, context_id, &capability, permission)
        .map_err(|e| db_failed(req, "db_update_failed", e))?;
    Ok(ok(&req.id, json!({ "ok": true })))
}

pub fn try_handle(state: &mut AppState, req: &Request) -> Option<serde_json::Value> {
    let resp = match req.method.as_str() {
        "roles.create" => handle_roles_create(state, req),
        "roles.assign" => handle_roles_assign(state, req),
        "roles.grant" => handle_roles_grant(state, req),
        _ => return None,
    };
    Some(resp.unwrap_or_else(|e| e))
}
