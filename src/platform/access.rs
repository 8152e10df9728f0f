use crate::platform::context::{Context, SYSTEM_CONTEXT_ID};
use crate::settings::SiteSettings;
use rusqlite::Connection;
use std::collections::BTreeSet;

pub const CAP_VIEW_PARTICIPANTS: &str = "moodle/course:viewparticipants";
pub const CAP_ACCESS_ALL_GROUPS: &str = "moodle/site:accessallgroups";
pub const CAP_COURSE_VIEW: &str = "moodle/course:view";
pub const CAP_VIEW_HIDDEN_COURSES: &str = "moodle/course:viewhiddencourses";
pub const CAP_VIEW_ALL_PHOTOBOARD: &str = "local/photoboard:viewall";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Permission {
    Allow,
    Prevent,
    Prohibit,
}

impl Permission {
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "allow" => Some(Self::Allow),
            "prevent" => Some(Self::Prevent),
            "prohibit" => Some(Self::Prohibit),
            _ => None,
        }
    }

    fn code(self) -> i64 {
        match self {
            Self::Allow => 1,
            Self::Prevent => -1,
            Self::Prohibit => -1000,
        }
    }

    fn from_code(code: i64) -> Option<Self> {
        match code {
            1 => Some(Self::Allow),
            -1 => Some(Self::Prevent),
            -1000 => Some(Self::Prohibit),
            _ => None,
        }
    }
}

/// Defines (or overrides, when `context_id` is not the system context) a capability
/// permission for a role.
pub fn grant(
    conn: &Connection,
    role_id: i64,
    context_id: i64,
    capability: &str,
    permission: Permission,
) -> anyhow::Result<()> {
    conn.execute(
        "INSERT INTO role_capabilities(role_id, context_id, capability, permission) VALUES(?, ?, ?, ?)
         ON CONFLICT(role_id, context_id, capability) DO UPDATE SET permission = excluded.permission",
        (role_id, context_id, capability, permission.code()),
    )?;
    Ok(())
}

fn roles_in_scope(
    conn: &Connection,
    site: &SiteSettings,
    user_id: i64,
    context: &Context,
) -> anyhow::Result<BTreeSet<i64>> {
    let mut stmt = conn.prepare(
        "SELECT role_id FROM role_assignments WHERE user_id = ? AND context_id IN (?, ?)",
    )?;
    let mut roles = stmt
        .query_map((user_id, context.id, SYSTEM_CONTEXT_ID), |r| r.get::<_, i64>(0))?
        .collect::<Result<BTreeSet<_>, _>>()?;
    if let Some(default_role) = site.default_user_role_id {
        roles.insert(default_role);
    }
    Ok(roles)
}

/// Resolves one role's permission: a context override beats the system definition.
fn role_permission(
    conn: &Connection,
    role_id: i64,
    capability: &str,
    context: &Context,
) -> anyhow::Result<Option<Permission>> {
    let mut stmt = conn.prepare(
        "SELECT context_id, permission FROM role_capabilities
         WHERE role_id = ? AND capability = ? AND context_id IN (?, ?)",
    )?;
    let rows = stmt
        .query_map((role_id, capability, context.id, SYSTEM_CONTEXT_ID), |r| {
            Ok((r.get::<_, i64>(0)?, r.get::<_, i64>(1)?))
        })?
        .collect::<Result<Vec<_>, _>>()?;

    // A prohibit anywhere on the path cannot be overridden.
    if rows
        .iter()
        .any(|(_, p)| Permission::from_code(*p) == Some(Permission::Prohibit))
    {
        return Ok(Some(Permission::Prohibit));
    }
    let local = rows.iter().find(|(ctx, _)| *ctx == context.id && *ctx != SYSTEM_CONTEXT_ID);
    let system = rows.iter().find(|(ctx, _)| *ctx == SYSTEM_CONTEXT_ID);
    Ok(local.or(system).and_then(|(_, p)| Permission::from_code(*p)))
}

pub fn has_capability(
    conn: &Connection,
    site: &SiteSettings,
    user_id: i64,
    capability: &str,
    context: &Context,
) -> anyhow::Result<bool> {
    if site.is_site_admin(user_id) {
        return Ok(true);
    }
    let mut allowed = false;
    for role_id in roles_in_scope(conn, site, user_id, context)? {
        match role_permission(conn, role_id, capability, context)? {
            Some(Permission::Prohibit) => return Ok(false),
            Some(Permission::Allow) => allowed = true,
            Some(Permission::Prevent) | None => {}
        }
    }
    Ok(allowed)
}
