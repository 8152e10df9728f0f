use rusqlite::{Connection, OptionalExtension};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct User {
    pub id: i64,
    pub username: String,
    pub firstname: String,
    pub lastname: String,
    pub email: String,
    pub suspended: bool,
    pub deleted: bool,
}

impl User {
    pub fn full_name(&self) -> String {
        format!("{} {}", self.firstname, self.lastname)
    }
}

#[derive(Debug, Clone)]
pub struct NewUser {
    pub username: String,
    pub firstname: String,
    pub lastname: String,
    pub email: String,
    pub suspended: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EnrolStatus {
    Active,
    Suspended,
}

impl EnrolStatus {
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "active" => Some(Self::Active),
            "suspended" => Some(Self::Suspended),
            _ => None,
        }
    }

    fn code(self) -> i64 {
        match self {
            Self::Active => 0,
            Self::Suspended => 1,
        }
    }
}

pub fn create_user(conn: &Connection, user: &NewUser) -> anyhow::Result<i64> {
    conn.execute(
        "INSERT INTO users(username, firstname, lastname, email, suspended) VALUES(?, ?, ?, ?, ?)",
        (
            &user.username,
            &user.firstname,
            &user.lastname,
            &user.email,
            user.suspended as i64,
        ),
    )?;
    Ok(conn.last_insert_rowid())
}

pub fn user_by_id(conn: &Connection, id: i64) -> anyhow::Result<Option<User>> {
    let row = conn
        .query_row(
            "SELECT id, username, firstname, lastname, email, suspended, deleted
             FROM users WHERE id = ?",
            [id],
            |r| {
                Ok(User {
                    id: r.get(0)?,
                    username: r.get(1)?,
                    firstname: r.get(2)?,
                    lastname: r.get(3)?,
                    email: r.get(4)?,
                    suspended: r.get::<_, i64>(5)? != 0,
                    deleted: r.get::<_, i64>(6)? != 0,
                })
            },
        )
        .optional()?;
    Ok(row)
}

/// Enrols (or re-enrols with a new status) a user in a course.
pub fn enrol_user(
    conn: &Connection,
    course_id: i64,
    user_id: i64,
    status: EnrolStatus,
) -> anyhow::Result<()> {
    conn.execute(
        "INSERT INTO user_enrolments(course_id, user_id, status) VALUES(?, ?, ?)
         ON CONFLICT(course_id, user_id) DO UPDATE SET status = excluded.status",
        (course_id, user_id, status.code()),
    )?;
    Ok(())
}

pub fn is_enrolled_active(conn: &Connection, course_id: i64, user_id: i64) -> anyhow::Result<bool> {
    let hit = conn
        .query_row(
            "SELECT 1 FROM user_enrolments WHERE course_id = ? AND user_id = ? AND status = 0",
            (course_id, user_id),
            |r| r.get::<_, i64>(0),
        )
        .optional()?;
    Ok(hit.is_some())
}
