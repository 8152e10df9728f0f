use crate::platform::context::{Course, GroupMode};
use crate::platform::session::Session;
use rusqlite::{Connection, OptionalExtension};

/// Group filter value meaning "users who belong to no group in the course".
pub const USERS_WITHOUT_GROUP: i64 = -1;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Group {
    pub id: i64,
    pub course_id: i64,
    pub name: String,
    pub description: String,
}

pub fn create_group(
    conn: &Connection,
    course_id: i64,
    name: &str,
    description: &str,
) -> anyhow::Result<i64> {
    conn.execute(
        "INSERT INTO course_groups(course_id, name, description) VALUES(?, ?, ?)",
        (course_id, name, description),
    )?;
    Ok(conn.last_insert_rowid())
}

pub fn add_member(conn: &Connection, group_id: i64, user_id: i64) -> anyhow::Result<()> {
    conn.execute(
        "INSERT OR IGNORE INTO group_members(group_id, user_id) VALUES(?, ?)",
        (group_id, user_id),
    )?;
    Ok(())
}

pub fn group_by_id(conn: &Connection, id: i64) -> anyhow::Result<Option<Group>> {
    let row = conn
        .query_row(
            "SELECT id, course_id, name, description FROM course_groups WHERE id = ?",
            [id],
            |r| {
                Ok(Group {
                    id: r.get(0)?,
                    course_id: r.get(1)?,
                    name: r.get(2)?,
                    description: r.get(3)?,
                })
            },
        )
        .optional()?;
    Ok(row)
}

pub fn member_count(conn: &Connection, group_id: i64) -> anyhow::Result<i64> {
    Ok(conn.query_row(
        "SELECT COUNT(*) FROM group_members WHERE group_id = ?",
        [group_id],
        |r| r.get(0),
    )?)
}

/// All groups of a course, ordered by name.
pub fn course_groups(conn: &Connection, course_id: i64) -> anyhow::Result<Vec<Group>> {
    let mut stmt = conn.prepare(
        "SELECT id, course_id, name, description FROM course_groups
         WHERE course_id = ?
         ORDER BY name, id",
    )?;
    let groups = stmt
        .query_map([course_id], |r| {
            Ok(Group {
                id: r.get(0)?,
                course_id: r.get(1)?,
                name: r.get(2)?,
                description: r.get(3)?,
            })
        })?
        .collect::<Result<Vec<_>, _>>()?;
    Ok(groups)
}

/// The user's groups in a course, ordered by name.
pub fn user_groups(conn: &Connection, course_id: i64, user_id: i64) -> anyhow::Result<Vec<Group>> {
    let mut stmt = conn.prepare(
        "SELECT g.id, g.course_id, g.name, g.description
         FROM course_groups g
         JOIN group_members gm ON gm.group_id = g.id
         WHERE g.course_id = ? AND gm.user_id = ?
         ORDER BY g.name, g.id",
    )?;
    let groups = stmt
        .query_map((course_id, user_id), |r| {
            Ok(Group {
                id: r.get(0)?,
                course_id: r.get(1)?,
                name: r.get(2)?,
                description: r.get(3)?,
            })
        })?
        .collect::<Result<Vec<_>, _>>()?;
    Ok(groups)
}

pub fn set_active_group(
    conn: &Connection,
    session: &Session,
    course_id: i64,
    group_id: i64,
) -> anyhow::Result<()> {
    conn.execute(
        "INSERT INTO session_active_groups(token_hash, course_id, group_id) VALUES(?, ?, ?)
         ON CONFLICT(token_hash, course_id) DO UPDATE SET group_id = excluded.group_id",
        (&session.token_hash, course_id, group_id),
    )?;
    Ok(())
}

/// The group this session is currently looking at in the course. A stored choice is kept
/// while it is still a group the user may select. Otherwise the user's first group is
/// picked. Otherwise the result is 0 ("all participants"). The resolved value is stored
/// back on the session.
pub fn course_active_group(
    conn: &Connection,
    session: &Session,
    course: &Course,
    can_access_all_groups: bool,
) -> anyhow::Result<i64> {
    if course.groupmode == GroupMode::NoGroups {
        return Ok(0);
    }
    let own: Vec<i64> = user_groups(conn, course.id, session.user_id)?
        .into_iter()
        .map(|g| g.id)
        .collect();
    let selectable: Vec<i64> =
        if course.groupmode == GroupMode::Visible || can_access_all_groups {
            course_groups(conn, course.id)?.into_iter().map(|g| g.id).collect()
        } else {
            own.clone()
        };

    let stored: Option<i64> = conn
        .query_row(
            "SELECT group_id FROM session_active_groups WHERE token_hash = ? AND course_id = ?",
            (&session.token_hash, course.id),
            |r| r.get(0),
        )
        .optional()?;

    let active = match stored {
        Some(g) if selectable.contains(&g) => g,
        Some(0) if course.groupmode == GroupMode::Visible || can_access_all_groups => 0,
        _ => own.first().copied().unwrap_or(0),
    };
    set_active_group(conn, session, course.id, active)?;
    Ok(active)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db;
    use crate::platform::context::{course_by_id, create_course, NewCourse};
    use crate::platform::session::open_session;

    fn course(conn: &Connection, mode: GroupMode) -> Course {
        let (id, _) = create_course(
            conn,
            &NewCourse {
                shortname: "GEO".into(),
                fullname: "Geography".into(),
                format: "topics".into(),
                groupmode: mode,
                visible: true,
            },
        )
        .expect("course");
        course_by_id(conn, id).expect("query").expect("course")
    }

    fn user(conn: &Connection, id: i64) {
        conn.execute(
            "INSERT INTO users(id, username, firstname, lastname) VALUES(?, ?, 'F', 'L')",
            (id, format!("user{}", id)),
        )
        .expect("user");
    }

    #[test]
    fn user_groups_are_course_scoped_and_name_ordered() {
        let conn = db::open_in_memory().expect("db");
        let c = course(&conn, GroupMode::Separate);
        user(&conn, 10);
        let b = create_group(&conn, c.id, "Beta", "").expect("group");
        let a = create_group(&conn, c.id, "Alpha", "").expect("group");
        let _c = create_group(&conn, c.id, "Gamma", "").expect("group");
        add_member(&conn, b, 10).expect("member");
        add_member(&conn, a, 10).expect("member");
        add_member(&conn, a, 10).expect("member twice");

        let ids: Vec<i64> = user_groups(&conn, c.id, 10)
            .expect("groups")
            .into_iter()
            .map(|g| g.id)
            .collect();
        assert_eq!(ids, vec![a, b]);
        assert_eq!(member_count(&conn, a).expect("count"), 1);
        assert_eq!(course_groups(&conn, c.id).expect("all").len(), 3);
    }

    #[test]
    fn active_group_defaults_to_first_own_group_then_sticks() {
        let conn = db::open_in_memory().expect("db");
        let c = course(&conn, GroupMode::Visible);
        user(&conn, 10);
        let (_, session) = open_session(&conn, 10).expect("session");

        // Not a member anywhere: visible groups fall back to all participants.
        assert_eq!(course_active_group(&conn, &session, &c, false).expect("active"), 0);

        let g1 = create_group(&conn, c.id, "One", "").expect("group");
        let g2 = create_group(&conn, c.id, "Two", "").expect("group");
        add_member(&conn, g2, 10).expect("member");
        // Stored 0 is still a valid choice in visible mode.
        assert_eq!(course_active_group(&conn, &session, &c, false).expect("active"), 0);

        set_active_group(&conn, &session, c.id, g1).expect("set");
        assert_eq!(course_active_group(&conn, &session, &c, false).expect("active"), g1);

        set_active_group(&conn, &session, c.id, 9999).expect("set stale");
        assert_eq!(course_active_group(&conn, &session, &c, false).expect("active"), g2);
    }
}
