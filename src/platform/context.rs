use rusqlite::{Connection, OptionalExtension};

pub const SYSTEM_CONTEXT_ID: i64 = 1;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContextLevel {
    System,
    Course,
    Other(i64),
}

impl ContextLevel {
    pub fn from_code(code: i64) -> Self {
        match code {
            10 => Self::System,
            50 => Self::Course,
            other => Self::Other(other),
        }
    }

    pub fn code(self) -> i64 {
        match self {
            Self::System => 10,
            Self::Course => 50,
            Self::Other(v) => v,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Context {
    pub id: i64,
    pub level: ContextLevel,
    pub instance_id: i64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GroupMode {
    NoGroups,
    Separate,
    Visible,
}

impl GroupMode {
    pub fn from_code(code: i64) -> Option<Self> {
        match code {
            0 => Some(Self::NoGroups),
            1 => Some(Self::Separate),
            2 => Some(Self::Visible),
            _ => None,
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "none" | "nogroups" => Some(Self::NoGroups),
            "separate" => Some(Self::Separate),
            "visible" => Some(Self::Visible),
            _ => None,
        }
    }

    pub fn code(self) -> i64 {
        match self {
            Self::NoGroups => 0,
            Self::Separate => 1,
            Self::Visible => 2,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Course {
    pub id: i64,
    pub shortname: String,
    pub fullname: String,
    pub format: String,
    pub groupmode: GroupMode,
    pub visible: bool,
}

#[derive(Debug, Clone)]
pub struct NewCourse {
    pub shortname: String,
    pub fullname: String,
    pub format: String,
    pub groupmode: GroupMode,
    pub visible: bool,
}

pub fn context_by_id(conn: &Connection, id: i64) -> anyhow::Result<Option<Context>> {
    let row = conn
        .query_row(
            "SELECT id, contextlevel, instanceid FROM contexts WHERE id = ?",
            [id],
            |r| {
                Ok(Context {
                    id: r.get(0)?,
                    level: ContextLevel::from_code(r.get(1)?),
                    instance_id: r.get(2)?,
                })
            },
        )
        .optional()?;
    Ok(row)
}

pub fn course_context(conn: &Connection, course_id: i64) -> anyhow::Result<Option<Context>> {
    let row = conn
        .query_row(
            "SELECT id, instanceid FROM contexts WHERE contextlevel = ? AND instanceid = ?",
            (ContextLevel::Course.code(), course_id),
            |r| {
                Ok(Context {
                    id: r.get(0)?,
                    level: ContextLevel::Course,
                    instance_id: r.get(1)?,
                })
            },
        )
        .optional()?;
    Ok(row)
}

pub fn course_by_id(conn: &Connection, id: i64) -> anyhow::Result<Option<Course>> {
    let row = conn
        .query_row(
            "SELECT id, shortname, fullname, format, groupmode, visible FROM courses WHERE id = ?",
            [id],
            |r| {
                let groupmode: i64 = r.get(4)?;
                Ok(Course {
                    id: r.get(0)?,
                    shortname: r.get(1)?,
                    fullname: r.get(2)?,
                    format: r.get(3)?,
                    // Unknown stored modes behave like "no groups".
                    groupmode: GroupMode::from_code(groupmode).unwrap_or(GroupMode::NoGroups),
                    visible: r.get::<_, i64>(5)? != 0,
                })
            },
        )
        .optional()?;
    Ok(row)
}

/// Inserts the course and its course-level context in one transaction.
/// Returns `(course_id, context_id)`.
pub fn create_course(conn: &Connection, course: &NewCourse) -> anyhow::Result<(i64, i64)> {
    let tx = conn.unchecked_transaction()?;
    tx.execute(
        "INSERT INTO courses(shortname, fullname, format, groupmode, visible) VALUES(?, ?, ?, ?, ?)",
        (
            &course.shortname,
            &course.fullname,
            &course.format,
            course.groupmode.code(),
            course.visible as i64,
        ),
    )?;
    let course_id = tx.last_insert_rowid();
    tx.execute(
        "INSERT INTO contexts(contextlevel, instanceid) VALUES(?, ?)",
        (ContextLevel::Course.code(), course_id),
    )?;
    let context_id = tx.last_insert_rowid();
    tx.commit()?;
    Ok((course_id, context_id))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db;

    fn sample_course(shortname: &str, groupmode: GroupMode) -> NewCourse {
        NewCourse {
            shortname: shortname.to_string(),
            fullname: format!("{} full", shortname),
            format: "topics".to_string(),
            groupmode,
            visible: true,
        }
    }

    #[test]
    fn create_course_registers_course_context() {
        let conn = db::open_in_memory().expect("db");
        let (course_id, context_id) =
            create_course(&conn, &sample_course("C1", GroupMode::Separate)).expect("create");
        let ctx = context_by_id(&conn, context_id).expect("query").expect("context");
        assert_eq!(ctx.level, ContextLevel::Course);
        assert_eq!(ctx.instance_id, course_id);
        assert_eq!(
            course_context(&conn, course_id).expect("query"),
            Some(ctx)
        );
        let course = course_by_id(&conn, course_id).expect("query").expect("course");
        assert_eq!(course.groupmode, GroupMode::Separate);
        assert!(course.visible);
    }

    #[test]
    fn missing_rows_are_none() {
        let conn = db::open_in_memory().expect("db");
        assert!(course_by_id(&conn, 0).expect("query").is_none());
        assert!(context_by_id(&conn, 999).expect("query").is_none());
        let system = context_by_id(&conn, SYSTEM_CONTEXT_ID)
            .expect("query")
            .expect("system");
        assert_eq!(system.level, ContextLevel::System);
    }
}
