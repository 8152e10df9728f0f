use crate::ipc::error::{err, ok};
use crate::ipc::helpers::{
    db_conn, db_failed, optional_bool, optional_str, required_i64, required_str,
};
use crate::ipc::types::{AppState, Request};
use crate::platform::context::{self, GroupMode, NewCourse};
use crate::platform::users::{self, EnrolStatus, NewUser};
use serde_json::{json, Value};

fn parse_groupmode(req: &Request) -> Result<GroupMode, Value> {
    match req.params.get("groupmode") {
        None | Some(Value::Null) => Ok(GroupMode::NoGroups),
        Some(Value::String(s)) => GroupMode::parse(s)
            .ok_or_else(|| err(&req.id, "bad_params", format!("unknown groupmode: {}", s), None)),
        Some(v) => v
            .as_i64()
            .and_then(GroupMode::from_code)
            .ok_or_else(|| err(&req.id, "bad_params", "groupmode must be 0, 1 or 2", None)),
    }
}

fn handle_courses_create(state: &mut AppState, req: &Request) -> Result<Value, Value> {
    let conn = db_conn(state, req)?;
    let shortname = required_str(req, "shortname")?;
    let fullname = required_str(req, "fullname")?;
    let format = optional_str(req, "format")
        .filter(|s| !s.is_empty())
        .unwrap_or_else(|| "topics".to_string());
    let course = NewCourse {
        shortname,
        fullname,
        format,
        groupmode: parse_groupmode(req)?,
        visible: optional_bool(req, "visible", true)?,
    };

    let (course_id, context_id) =
        context::create_course(conn, &course).map_err(|e| db_failed(req, "db_insert_failed", e))?;
    tracing::info!(course_id, context_id, shortname = %course.shortname, "courses.created");
    Ok(ok(
        &req.id,
        json!({ "courseId": course_id, "contextId": context_id }),
    ))
}

fn handle_users_create(state: &mut AppState, req: &Request) -> Result<Value, Value> {
    let conn = db_conn(state, req)?;
    let user = NewUser {
        username: required_str(req, "username")?,
        firstname: required_str(req, "firstname")?,
        lastname: required_str(req, "lastname")?,
        email: optional_str(req, "email").unwrap_or_default(),
        suspended: optional_bool(req, "suspended", false)?,
    };
    let user_id =
        users::create_user(conn, &user).map_err(|e| db_failed(req, "db_insert_failed", e))?;
    Ok(ok(&req.id, json!({ "userId": user_id })))
}

fn handle_enrol_add(state: &mut AppState, req: &Request) -> Result<Value, Value> {
    let conn = db_conn(state, req)?;
    let course_id = required_i64(req, "courseId")?;
    let user_id = required_i64(req, "userId")?;
    let status = match optional_str(req, "status") {
        None => EnrolStatus::Active,
        Some(s) => EnrolStatus::parse(&s)
            .ok_or_else(|| err(&req.id, "bad_params", format!("unknown status: {}", s), None))?,
    };

    let course = context::course_by_id(conn, course_id)
        .map_err(|e| db_failed(req, "db_query_failed", e))?;
    if course.is_none() {
        return Err(err(&req.id, "not_found", "course not found", None));
    }
    let user =
        users::user_by_id(conn, user_id).map_err(|e| db_failed(req, "db_query_failed", e))?;
    if user.is_none() {
        return Err(err(&req.id, "not_found", "user not found", None));
    }

    users::enrol_user(conn, course_id, user_id, status)
        .map_err(|e| db_failed(req, "db_update_failed", e))?;
    Ok(ok(&req.id, json!({ "ok": true })))
}

pub fn try_handle(state: &mut AppState, req: &Request) -> Option<serde_json::Value> {
    let resp = match req.method.as_str() {
        "courses.create" => handle_courses_create(state, req),
        "users.create" => handle_users_create(state, req),
        "enrol.add" => handle_enrol_add(state, req),
        _ => return None,
    };
    Some(resp.unwrap_or_else(|e| e))
}
