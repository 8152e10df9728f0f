use crate::ipc::error::{err, ok};
use crate::ipc::helpers::{db_conn, db_failed, optional_str, required_i64, required_str};
use crate::ipc::types::{AppState, Request};
use crate::platform::{context, groups, session, users};
use serde_json::{json, Value};

fn handle_groups_create(state: &mut AppState, req: &Request) -> Result<Value, Value> {
    let conn = db_conn(state, req)?;
    let course_id = required_i64(req, "courseId")?;
    let name = required_str(req, "name")?;
    let description = optional_str(req, "description").unwrap_or_default();

    let course = context::course_by_id(conn, course_id)
        .map_err(|e| db_failed(req, "db_query_failed", e))?;
    if course.is_none() {
        return Err(err(&req.id, "not_found", "course not found", None));
    }
    let group_id = groups::create_group(conn, course_id, &name, &description)
        .map_err(|e| db_failed(req, "db_insert_failed", e))?;
    Ok(ok(&req.id, json!({ "groupId": group_id })))
}

fn handle_groups_add_member(state: &mut AppState, req: &Request) -> Result<Value, Value> {
    let conn = db_conn(state, req)?;
    let group_id = required_i64(req, "groupId")?;
    let user_id = required_i64(req, "userId")?;

    let group =
        groups::group_by_id(conn, group_id).map_err(|e| db_failed(req, "db_query_failed", e))?;
    if group.is_none() {
        return Err(err(&req.id, "not_found", "group not found", None));
    }
    let user =
        users::user_by_id(conn, user_id).map_err(|e| db_failed(req, "db_query_failed", e))?;
    if user.is_none() {
        return Err(err(&req.id, "not_found", "user not found", None));
    }
    groups::add_member(conn, group_id, user_id)
        .map_err(|e| db_failed(req, "db_insert_failed", e))?;
    Ok(ok(&req.id, json!({ "ok": true })))
}

fn handle_groups_set_active(state: &mut AppState, req: &Request) -> Result<Value, Value> {
    let conn = db_conn(state, req)?;
    let token = required_str(req, "token")?;
    let course_id = required_i64(req, "courseId")?;
    let group_id = required_i64(req, "groupId")?;

    let Some(sess) =
        session::resolve_session(conn, &token).map_err(|e| db_failed(req, "db_query_failed", e))?
    else {
        return Err(err(&req.id, "not_found", "session not found", None));
    };
    if group_id != 0 {
        let group = groups::group_by_id(conn, group_id)
            .map_err(|e| db_failed(req, "db_query_failed", e))?;
        match group {
            Some(g) if g.course_id == course_id => {}
            _ => {
                return Err(err(
                    &req.id,
                    "not_found",
                    "group not found in course",
                    Some(json!({ "courseId": course_id, "groupId": group_id })),
                ))
            }
        }
    }
    groups::set_active_group(conn, &sess, course_id, group_id)
        .map_err(|e| db_failed(req, "db_update_failed", e))?;
    Ok(ok(&req.id, json!({ "ok": true })))
}

pub fn try_handle(state: &mut AppState, req: &Request) -> Option<serde_json::Value> {
    let resp = match req.method.as_str() {
        "groups.create" => handle_groups_create(state, req),
        "groups.addMember" => handle_groups_add_member(state, req),
        "groups.setActive" => handle_groups_set_active(state, req),
        _ => return None,
    };
    Some(resp.unwrap_or_else(|e| e))
}
