use crate::platform::context::{Context, Course};
use rusqlite::Connection;
use serde::Serialize;
use serde_json::json;

pub const USER_LIST_VIEWED: &str = "\\core\\event\\user_list_viewed";

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LoggedEvent {
    pub id: i64,
    pub event_name: String,
    pub course_id: i64,
    pub context_id: i64,
    pub user_id: i64,
    pub other: serde_json::Value,
    pub time_created: String,
}

fn append(
    conn: &Connection,
    event_name: &str,
    course_id: i64,
    context_id: i64,
    user_id: i64,
    other: &serde_json::Value,
) -> anyhow::Result<i64> {
    conn.execute(
        "INSERT INTO log_events(event_name, course_id, context_id, user_id, other_json, time_created)
         VALUES(?, ?, ?, ?, ?, ?)",
        (
            event_name,
            course_id,
            context_id,
            user_id,
            serde_json::to_string(other)?,
            chrono::Utc::now().to_rfc3339(),
        ),
    )?;
    Ok(conn.last_insert_rowid())
}

pub fn user_list_viewed(
    conn: &Connection,
    course: &Course,
    context: &Context,
    user_id: i64,
) -> anyhow::Result<()> {
    let id = append(
        conn,
        USER_LIST_VIEWED,
        course.id,
        context.id,
        user_id,
        &json!({
            "courseshortname": course.shortname,
            "coursefullname": course.fullname,
        }),
    )?;
    tracing::info!(
        event_id = id,
        course_id = course.id,
        context_id = context.id,
        user_id,
        "event.user_list_viewed"
    );
    Ok(())
}

pub fn list_events(conn: &Connection, course_id: Option<i64>) -> anyhow::Result<Vec<LoggedEvent>> {
    let mut stmt = conn.prepare(
        "SELECT id, event_name, course_id, context_id, user_id, other_json, time_created
         FROM log_events
         WHERE (?1 IS NULL OR course_id = ?1)
         ORDER BY id",
    )?;
    let rows = stmt
        .query_map([course_id], |r| {
            Ok((
                r.get::<_, i64>(0)?,
                r.get::<_, String>(1)?,
                r.get::<_, i64>(2)?,
                r.get::<_, i64>(3)?,
                r.get::<_, i64>(4)?,
                r.get::<_, String>(5)?,
                r.get::<_, String>(6)?,
            ))
        })?
        .collect::<Result<Vec<_>, _>>()?;

    let mut out = Vec::with_capacity(rows.len());
    for (id, event_name, course_id, context_id, user_id, other_json, time_created) in rows {
        out.push(LoggedEvent {
            id,
            event_name,
            course_id,
            context_id,
            user_id,
            other: serde_json::from_str(&other_json)?,
            time_created,
        });
    }
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db;
    use crate::platform::context::{course_by_id, course_context, create_course, GroupMode, NewCourse};

    #[test]
    fn user_list_viewed_is_listed_per_course() {
        let conn = db::open_in_memory().expect("db");
        let mut courses = Vec::new();
        for name in ["ONE", "TWO"] {
            let (id, _) = create_course(
                &conn,
                &NewCourse {
                    shortname: name.into(),
                    fullname: format!("Course {}", name),
                    format: "topics".into(),
                    groupmode: GroupMode::NoGroups,
                    visible: true,
                },
            )
            .expect("course");
            let course = course_by_id(&conn, id).expect("q").expect("course");
            let ctx = course_context(&conn, id).expect("q").expect("ctx");
            courses.push((course, ctx));
        }
        user_list_viewed(&conn, &courses[0].0, &courses[0].1, 42).expect("log");
        user_list_viewed(&conn, &courses[1].0, &courses[1].1, 42).expect("log");

        assert_eq!(list_events(&conn, None).expect("all").len(), 2);
        let first = list_events(&conn, Some(courses[0].0.id)).expect("one");
        assert_eq!(first.len(), 1);
        assert_eq!(first[0].event_name, USER_LIST_VIEWED);
        assert_eq!(first[0].user_id, 42);
        assert_eq!(first[0].other["courseshortname"], "ONE");
    }
}
