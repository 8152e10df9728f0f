use rusqlite::{Connection, OptionalExtension};
use std::path::Path;

pub fn open_db(workspace: &Path) -> anyhow::Result<Connection> {
    std::fs::create_dir_all(workspace)?;
    let db_path = workspace.join("photoboard.sqlite3");
    let conn = Connection::open(db_path)?;
    init_schema(&conn)?;
    Ok(conn)
}

/// Creates every table the platform modules read. Idempotent, so it also serves as the
/// migration step for workspaces created by older builds.
pub fn init_schema(conn: &Connection) -> anyhow::Result<()> {
    conn.execute("PRAGMA foreign_keys = ON", [])?;

    conn.execute(
        "CREATE TABLE IF NOT EXISTS settings(
            key TEXT PRIMARY KEY,
            value_json TEXT NOT NULL
        )",
        [],
    )?;

    conn.execute(
        "CREATE TABLE IF NOT EXISTS contexts(
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            contextlevel INTEGER NOT NULL,
            instanceid INTEGER NOT NULL,
            UNIQUE(contextlevel, instanceid)
        )",
        [],
    )?;
    // The system context always exists and always has id 1.
    conn.execute(
        "INSERT OR IGNORE INTO contexts(id, contextlevel, instanceid) VALUES (1, 10, 0)",
        [],
    )?;

    conn.execute(
        "CREATE TABLE IF NOT EXISTS courses(
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            shortname TEXT NOT NULL UNIQUE,
            fullname TEXT NOT NULL,
            format TEXT NOT NULL DEFAULT 'topics',
            groupmode INTEGER NOT NULL DEFAULT 0,
            visible INTEGER NOT NULL DEFAULT 1
        )",
        [],
    )?;

    conn.execute(
        "CREATE TABLE IF NOT EXISTS users(
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            username TEXT NOT NULL UNIQUE,
            firstname TEXT NOT NULL,
            lastname TEXT NOT NULL,
            email TEXT NOT NULL DEFAULT '',
            suspended INTEGER NOT NULL DEFAULT 0,
            deleted INTEGER NOT NULL DEFAULT 0
        )",
        [],
    )?;

    conn.execute(
        "CREATE TABLE IF NOT EXISTS user_enrolments(
            course_id INTEGER NOT NULL,
            user_id INTEGER NOT NULL,
            status INTEGER NOT NULL DEFAULT 0,
            PRIMARY KEY(course_id, user_id),
            FOREIGN KEY(course_id) REFERENCES courses(id),
            FOREIGN KEY(user_id) REFERENCES users(id)
        )",
        [],
    )?;
    conn.execute(
        "CREATE INDEX IF NOT EXISTS idx_user_enrolments_user ON user_enrolments(user_id)",
        [],
    )?;

    // "groups" is a keyword in recent SQLite releases.
    conn.execute(
        "CREATE TABLE IF NOT EXISTS course_groups(
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            course_id INTEGER NOT NULL,
            name TEXT NOT NULL,
            description TEXT NOT NULL DEFAULT '',
            FOREIGN KEY(course_id) REFERENCES courses(id)
        )",
        [],
    )?;
    conn.execute(
        "CREATE INDEX IF NOT EXISTS idx_course_groups_course ON course_groups(course_id)",
        [],
    )?;
    conn.execute(
        "CREATE TABLE IF NOT EXISTS group_members(
            group_id INTEGER NOT NULL,
            user_id INTEGER NOT NULL,
            PRIMARY KEY(group_id, user_id),
            FOREIGN KEY(group_id) REFERENCES course_groups(id),
            FOREIGN KEY(user_id) REFERENCES users(id)
        )",
        [],
    )?;
    conn.execute(
        "CREATE INDEX IF NOT EXISTS idx_group_members_user ON group_members(user_id)",
        [],
    )?;

    conn.execute(
        "CREATE TABLE IF NOT EXISTS roles(
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            shortname TEXT NOT NULL UNIQUE,
            name TEXT NOT NULL,
            sortorder INTEGER NOT NULL DEFAULT 0
        )",
        [],
    )?;
    conn.execute(
        "CREATE TABLE IF NOT EXISTS role_assignments(
            role_id INTEGER NOT NULL,
            user_id INTEGER NOT NULL,
            context_id INTEGER NOT NULL,
            PRIMARY KEY(role_id, user_id, context_id),
            FOREIGN KEY(role_id) REFERENCES roles(id),
            FOREIGN KEY(user_id) REFERENCES users(id),
            FOREIGN KEY(context_id) REFERENCES contexts(id)
        )",
        [],
    )?;
    conn.execute(
        "CREATE INDEX IF NOT EXISTS idx_role_assignments_user ON role_assignments(user_id, context_id)",
        [],
    )?;
    conn.execute(
        "CREATE TABLE IF NOT EXISTS role_capabilities(
            role_id INTEGER NOT NULL,
            context_id INTEGER NOT NULL,
            capability TEXT NOT NULL,
            permission INTEGER NOT NULL,
            PRIMARY KEY(role_id, context_id, capability),
            FOREIGN KEY(role_id) REFERENCES roles(id),
            FOREIGN KEY(context_id) REFERENCES contexts(id)
        )",
        [],
    )?;

    conn.execute(
        "CREATE TABLE IF NOT EXISTS sessions(
            token_hash TEXT PRIMARY KEY,
            user_id INTEGER NOT NULL,
            sesskey TEXT NOT NULL,
            created_at TEXT NOT NULL,
            FOREIGN KEY(user_id) REFERENCES users(id)
        )",
        [],
    )?;
    conn.execute(
        "CREATE TABLE IF NOT EXISTS session_active_groups(
            token_hash TEXT NOT NULL,
            course_id INTEGER NOT NULL,
            group_id INTEGER NOT NULL,
            PRIMARY KEY(token_hash, course_id),
            FOREIGN KEY(token_hash) REFERENCES sessions(token_hash) ON DELETE CASCADE
        )",
        [],
    )?;

    conn.execute(
        "CREATE TABLE IF NOT EXISTS log_events(
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            event_name TEXT NOT NULL,
            course_id INTEGER NOT NULL,
            context_id INTEGER NOT NULL,
            user_id INTEGER NOT NULL,
            other_json TEXT NOT NULL,
            time_created TEXT NOT NULL
        )",
        [],
    )?;
    conn.execute(
        "CREATE INDEX IF NOT EXISTS idx_log_events_course ON log_events(course_id)",
        [],
    )?;

    Ok(())
}

pub fn settings_get_json(conn: &Connection, key: &str) -> anyhow::Result<Option<serde_json::Value>> {
    let raw: Option<String> = conn
        .query_row(
            "SELECT value_json FROM settings WHERE key = ?",
            [key],
            |r| r.get(0),
        )
        .optional()?;
    match raw {
        Some(s) => Ok(Some(serde_json::from_str(&s)?)),
        None => Ok(None),
    }
}

pub fn settings_set_json(
    conn: &Connection,
    key: &str,
    value: &serde_json::Value,
) -> anyhow::Result<()> {
    conn.execute(
        "INSERT INTO settings(key, value_json) VALUES(?, ?)
         ON CONFLICT(key) DO UPDATE SET value_json = excluded.value_json",
        (key, serde_json::to_string(value)?),
    )?;
    Ok(())
}

#[cfg(test)]
pub fn open_in_memory() -> anyhow::Result<Connection> {
    let conn = Connection::open_in_memory()?;
    init_schema(&conn)?;
    Ok(conn)
}
