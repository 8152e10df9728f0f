use crate::settings::SiteSettings;
use rusqlite::{params_from_iter, Connection};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Role {
    pub id: i64,
    pub shortname: String,
    pub name: String,
    pub sortorder: i64,
}

pub fn create_role(
    conn: &Connection,
    shortname: &str,
    name: &str,
    sortorder: i64,
) -> anyhow::Result<i64> {
    conn.execute(
        "INSERT INTO roles(shortname, name, sortorder) VALUES(?, ?, ?)",
        (shortname, name, sortorder),
    )?;
    Ok(conn.last_insert_rowid())
}

pub fn assign_role(
    conn: &Connection,
    role_id: i64,
    user_id: i64,
    context_id: i64,
) -> anyhow::Result<()> {
    conn.execute(
        "INSERT OR IGNORE INTO role_assignments(role_id, user_id, context_id) VALUES(?, ?, ?)",
        (role_id, user_id, context_id),
    )?;
    Ok(())
}

fn roles_by_ids(conn: &Connection, ids: &[i64]) -> anyhow::Result<Vec<Role>> {
    if ids.is_empty() {
        return Ok(Vec::new());
    }
    let placeholders = vec!["?"; ids.len()].join(", ");
    let sql = format!(
        "SELECT id, shortname, name, sortorder FROM roles WHERE id IN ({}) ORDER BY sortorder, id",
        placeholders
    );
    let mut stmt = conn.prepare(&sql)?;
    let roles = stmt
        .query_map(params_from_iter(ids.iter()), |r| {
            Ok(Role {
                id: r.get(0)?,
                shortname: r.get(1)?,
                name: r.get(2)?,
                sortorder: r.get(3)?,
            })
        })?
        .collect::<Result<Vec<_>, _>>()?;
    Ok(roles)
}

/// Roles the site shows on profile pages, as configured in `profileRoles`. Ids that no
/// longer name a role are skipped.
pub fn profile_roles(conn: &Connection, site: &SiteSettings) -> anyhow::Result<Vec<Role>> {
    roles_by_ids(conn, &site.profile_roles)
}
