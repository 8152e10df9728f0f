//! Participant listing for a course.
//!
//! A [`FilterSet`] describes which enrolled users to list. [`ParticipantsSearch`] turns it
//! into SQL. Counting and page fetching are separate queries, so callers can compute the
//! grand total, the matched total and the page rows in any order.

use crate::platform::context::{Context, Course};
use crate::platform::groups::USERS_WITHOUT_GROUP;
use rusqlite::types::Value;
use rusqlite::{params_from_iter, Connection};
use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum JoinType {
    Any,
    All,
    None,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum FilterField {
    CourseId,
    Groups,
    Roles,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Filter {
    pub field: FilterField,
    pub join: JoinType,
    pub values: Vec<i64>,
}

impl Filter {
    pub fn new(field: FilterField, values: Vec<i64>) -> Self {
        Self {
            field,
            join: JoinType::Any,
            values,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FilterSet {
    pub join: JoinType,
    filters: Vec<Filter>,
}

impl FilterSet {
    /// The minimal filter set: every participant of one course.
    pub fn for_course(course_id: i64) -> Self {
        Self {
            join: JoinType::All,
            filters: vec![Filter::new(FilterField::CourseId, vec![course_id])],
        }
    }

    /// Adds a filter. A second filter on the same field replaces the first.
    pub fn add(&mut self, filter: Filter) {
        self.filters.retain(|f| f.field != filter.field);
        self.filters.push(filter);
    }

    pub fn filters(&self) -> &[Filter] {
        &self.filters
    }

    pub fn get(&self, field: FilterField) -> Option<&Filter> {
        self.filters.iter().find(|f| f.field == field)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ParticipantRow {
    pub id: i64,
    pub firstname: String,
    pub lastname: String,
    pub email: String,
    pub roles: Vec<String>,
    pub groups: Vec<String>,
}

impl ParticipantRow {
    pub fn full_name(&self) -> String {
        format!("{} {}", self.firstname, self.lastname)
    }
}

pub struct ParticipantsSearch<'a> {
    conn: &'a Connection,
    course_id: i64,
    context_id: i64,
}

impl<'a> ParticipantsSearch<'a> {
    pub fn new(conn: &'a Connection, course: &Course, context: &Context) -> Self {
        Self {
            conn,
            course_id: course.id,
            context_id: context.id,
        }
    }

    fn value_predicate(&self, field: FilterField, value: i64, args: &mut Vec<Value>) -> Option<String> {
        match field {
            // Course scope is part of the base query.
            FilterField::CourseId => None,
            FilterField::Groups if value == USERS_WITHOUT_GROUP => {
                args.push(Value::Integer(self.course_id));
                Some(
                    "NOT EXISTS (SELECT 1 FROM group_members gm
                                 JOIN course_groups g ON g.id = gm.group_id
                                 WHERE gm.user_id = u.id AND g.course_id = ?)"
                        .to_string(),
                )
            }
            FilterField::Groups => {
                args.push(Value::Integer(value));
                Some(
                    "EXISTS (SELECT 1 FROM group_members gm WHERE gm.user_id = u.id AND gm.group_id = ?)"
                        .to_string(),
                )
            }
            FilterField::Roles => {
                args.push(Value::Integer(value));
                args.push(Value::Integer(self.context_id));
                Some(
                    "EXISTS (SELECT 1 FROM role_assignments ra
                             WHERE ra.user_id = u.id AND ra.role_id = ? AND ra.context_id = ?)"
                        .to_string(),
                )
            }
        }
    }

    fn filter_predicate(&self, filter: &Filter, args: &mut Vec<Value>) -> Option<String> {
        let parts: Vec<String> = filter
            .values
            .iter()
            .filter_map(|v| self.value_predicate(filter.field, *v, args))
            .collect();
        combine(&parts, filter.join)
    }

    fn where_clause(&self, filterset: &FilterSet) -> (String, Vec<Value>) {
        let mut args = vec![Value::Integer(self.course_id)];
        let mut sql = "ue.course_id = ? AND ue.status = 0 AND u.deleted = 0 AND u.suspended = 0"
            .to_string();
        let parts: Vec<String> = filterset
            .filters
            .iter()
            .filter_map(|f| self.filter_predicate(f, &mut args))
            .collect();
        if let Some(extra) = combine(&parts, filterset.join) {
            sql.push_str(" AND ");
            sql.push_str(&extra);
        }
        (sql, args)
    }

    pub fn count(&self, filterset: &FilterSet) -> anyhow::Result<i64> {
        let (where_sql, args) = self.where_clause(filterset);
        let sql = format!(
            "SELECT COUNT(*) FROM users u
             JOIN user_enrolments ue ON ue.user_id = u.id
             WHERE {}",
            where_sql
        );
        Ok(self
            .conn
            .query_row(&sql, params_from_iter(args.iter()), |r| r.get(0))?)
    }

    /// Fetches one page (0-based) ordered by last name, first name, id.
    pub fn fetch_page(
        &self,
        filterset: &FilterSet,
        page: i64,
        per_page: i64,
    ) -> anyhow::Result<Vec<ParticipantRow>> {
        let (where_sql, mut args) = self.where_clause(filterset);
        let sql = format!(
            "SELECT u.id, u.firstname, u.lastname, u.email FROM users u
             JOIN user_enrolments ue ON ue.user_id = u.id
             WHERE {}
             ORDER BY u.lastname, u.firstname, u.id
             LIMIT ? OFFSET ?",
            where_sql
        );
        args.push(Value::Integer(per_page));
        args.push(Value::Integer(page.saturating_mul(per_page)));

        let mut stmt = self.conn.prepare(&sql)?;
        let mut rows = stmt
            .query_map(params_from_iter(args.iter()), |r| {
                Ok(ParticipantRow {
                    id: r.get(0)?,
                    firstname: r.get(1)?,
                    lastname: r.get(2)?,
                    email: r.get(3)?,
                    roles: Vec::new(),
                    groups: Vec::new(),
                })
            })?
            .collect::<Result<Vec<_>, _>>()?;

        let mut role_stmt = self.conn.prepare(
            "SELECT r.name FROM role_assignments ra
             JOIN roles r ON r.id = ra.role_id
             WHERE ra.user_id = ? AND ra.context_id = ?
             ORDER BY r.sortorder, r.id",
        )?;
        let mut group_stmt = self.conn.prepare(
            "SELECT g.name FROM group_members gm
             JOIN course_groups g ON g.id = gm.group_id
             WHERE gm.user_id = ? AND g.course_id = ?
             ORDER BY g.name, g.id",
        )?;
        for row in rows.iter_mut() {
            row.roles = role_stmt
                .query_map((row.id, self.context_id), |r| r.get::<_, String>(0))?
                .collect::<Result<Vec<_>, _>>()?;
            row.groups = group_stmt
                .query_map((row.id, self.course_id), |r| r.get::<_, String>(0))?
                .collect::<Result<Vec<_>, _>>()?;
        }
        Ok(rows)
    }
}

fn combine(parts: &[String], join: JoinType) -> Option<String> {
    if parts.is_empty() {
        return None;
    }
    let joined = |op: &str| {
        parts
            .iter()
            .map(|p| format!("({})", p))
            .collect::<Vec<_>>()
            .join(op)
    };
    Some(match join {
        JoinType::Any => format!("({})", joined(" OR ")),
        JoinType::All => format!("({})", joined(" AND ")),
        JoinType::None => format!("NOT ({})", joined(" OR ")),
    })
}
