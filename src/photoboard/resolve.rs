use crate::photoboard::error::PageError;
use crate::platform::context::{self, Context, ContextLevel, Course};
use rusqlite::Connection;

/// Resolves the page's course and course context. A non-zero `contextid` takes precedence
/// over `courseid`.
pub fn resolve_course_context(
    conn: &Connection,
    contextid: i64,
    courseid: i64,
) -> Result<(Course, Context), PageError> {
    if contextid != 0 {
        let ctx = context::context_by_id(conn, contextid)?.ok_or(PageError::RecordNotFound {
            table: "context",
            id: contextid,
        })?;
        if ctx.level != ContextLevel::Course {
            return Err(PageError::InvalidContext(contextid));
        }
        let course = context::course_by_id(conn, ctx.instance_id)?.ok_or(
            PageError::RecordNotFound {
                table: "course",
                id: ctx.instance_id,
            },
        )?;
        return Ok((course, ctx));
    }

    let course = context::course_by_id(conn, courseid)?.ok_or(PageError::RecordNotFound {
        table: "course",
        id: courseid,
    })?;
    let ctx = context::course_context(conn, course.id)?.ok_or(PageError::RecordNotFound {
        table: "context",
        id: course.id,
    })?;
    Ok((course, ctx))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db;
    use crate::platform::context::{create_course, GroupMode, NewCourse, SYSTEM_CONTEXT_ID};

    fn course(conn: &Connection, shortname: &str) -> (i64, i64) {
        create_course(
            conn,
            &NewCourse {
                shortname: shortname.into(),
                fullname: shortname.into(),
                format: "topics".into(),
                groupmode: GroupMode::NoGroups,
                visible: true,
            },
        )
        .expect("course")
    }

    #[test]
    fn context_and_course_id_agree() {
        let conn = db::open_in_memory().expect("db");
        let _ = course(&conn, "A");
        let (course_id, context_id) = course(&conn, "B");

        let (by_ctx, ctx1) = resolve_course_context(&conn, context_id, 0).expect("by ctx");
        let (by_id, ctx2) = resolve_course_context(&conn, 0, course_id).expect("by id");
        assert_eq!(by_ctx, by_id);
        assert_eq!(ctx1, ctx2);
        assert_eq!(by_ctx.shortname, "B");

        // contextid wins when both are supplied.
        let (both, _) = resolve_course_context(&conn, context_id, 9999).expect("both");
        assert_eq!(both.id, course_id);
    }

    #[test]
    fn system_context_is_invalid_context() {
        let conn = db::open_in_memory().expect("db");
        let err = resolve_course_context(&conn, SYSTEM_CONTEXT_ID, 0).unwrap_err();
        assert_eq!(err.code(), "invalid_context");
    }

    #[test]
    fn missing_records_are_record_not_found() {
        let conn = db::open_in_memory().expect("db");
        assert_eq!(
            resolve_course_context(&conn, 0, 0).unwrap_err().code(),
            "record_not_found"
        );
        assert_eq!(
            resolve_course_context(&conn, 77, 0).unwrap_err().code(),
            "record_not_found"
        );
    }
}
