use crate::db;
use serde::Deserialize;
use serde_json::{json, Map, Value};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SetupSection {
    Site,
    Photoboard,
}

impl SetupSection {
    pub const ALL: [SetupSection; 2] = [SetupSection::Site, SetupSection::Photoboard];

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "site" => Some(Self::Site),
            "photoboard" => Some(Self::Photoboard),
            _ => None,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            Self::Site => "site",
            Self::Photoboard => "photoboard",
        }
    }

    fn key(self) -> &'static str {
        match self {
            Self::Site => "setup.site",
            Self::Photoboard => "setup.photoboard",
        }
    }
}

fn default_section(section: SetupSection) -> Value {
    match section {
        SetupSection::Site => json!({
            "wwwroot": "http://localhost",
            "profileRoles": [],
            "siteAdmins": [],
            "defaultUserRoleId": null
        }),
        SetupSection::Photoboard => json!({
            "defaultPageSize": 10,
            "showAllPageSize": 5000
        }),
    }
}

fn as_object_mut(value: &mut Value) -> Result<&mut Map<String, Value>, String> {
    value
        .as_object_mut()
        .ok_or_else(|| "internal setup object must be a JSON object".to_string())
}

fn parse_i64_range(v: &Value, key: &str, min: i64, max: i64) -> Result<i64, String> {
    let n = v
        .as_i64()
        .ok_or_else(|| format!("{} must be integer", key))?;
    if !(min..=max).contains(&n) {
        return Err(format!("{} must be in {}..={}", key, min, max));
    }
    Ok(n)
}

fn parse_string_max(v: &Value, key: &str, max_len: usize) -> Result<String, String> {
    let s = v.as_str().ok_or_else(|| format!("{} must be string", key))?;
    let s = s.trim();
    if s.len() > max_len {
        return Err(format!("{} length must be <= {}", key, max_len));
    }
    Ok(s.to_string())
}

/// Accepts either an integer array or the comma separated form sites usually keep
/// (`"5,3"`). Blank items are dropped.
fn parse_id_list(v: &Value, key: &str) -> Result<Vec<i64>, String> {
    if let Some(s) = v.as_str() {
        return s
            .split(',')
            .map(str::trim)
            .filter(|t| !t.is_empty())
            .map(|t| {
                t.parse::<i64>()
                    .map_err(|_| format!("{} must contain integer ids", key))
            })
            .collect();
    }
    let arr = v
        .as_array()
        .ok_or_else(|| format!("{} must be an array or comma separated string", key))?;
    arr.iter()
        .map(|item| {
            item.as_i64()
                .ok_or_else(|| format!("{} must contain integer ids", key))
        })
        .collect()
}

pub fn merge_section_patch(
    section: SetupSection,
    current: &mut Value,
    patch: &Map<String, Value>,
) -> Result<(), String> {
    let obj = as_object_mut(current)?;
    for (k, v) in patch {
        match section {
            SetupSection::Site => match k.as_str() {
                "wwwroot" => {
                    let s = parse_string_max(v, k, 255)?;
                    if s.is_empty() {
                        return Err("wwwroot must not be empty".into());
                    }
                    obj.insert(k.clone(), Value::String(s.trim_end_matches('/').to_string()));
                }
                "profileRoles" | "siteAdmins" => {
                    obj.insert(k.clone(), json!(parse_id_list(v, k)?));
                }
                "defaultUserRoleId" => {
                    if v.is_null() {
                        obj.insert(k.clone(), Value::Null);
                    } else {
                        obj.insert(k.clone(), Value::from(parse_i64_range(v, k, 1, i64::MAX)?));
                    }
                }
                _ => return Err(format!("unknown site field: {}", k)),
            },
            SetupSection::Photoboard => match k.as_str() {
                "defaultPageSize" => {
                    obj.insert(k.clone(), Value::from(parse_i64_range(v, k, 1, 1000)?));
                }
                "showAllPageSize" => {
                    obj.insert(k.clone(), Value::from(parse_i64_range(v, k, 10, 100_000)?));
                }
                _ => return Err(format!("unknown photoboard field: {}", k)),
            },
        }
    }
    Ok(())
}

pub fn load_section(conn: &rusqlite::Connection, section: SetupSection) -> anyhow::Result<Value> {
    let mut current = default_section(section);
    if let Some(saved) = db::settings_get_json(conn, section.key())? {
        if let Some(saved_obj) = saved.as_object() {
            // Malformed historical values fall back to defaults rather than blocking the page.
            let _ = merge_section_patch(section, &mut current, saved_obj);
        }
    }
    Ok(current)
}

pub fn update_section(
    conn: &rusqlite::Connection,
    section: SetupSection,
    patch: &Map<String, Value>,
) -> anyhow::Result<Result<Value, String>> {
    let mut current = load_section(conn, section)?;
    if let Err(msg) = merge_section_patch(section, &mut current, patch) {
        return Ok(Err(msg));
    }
    db::settings_set_json(conn, section.key(), &current)?;
    Ok(Ok(current))
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SiteSettings {
    pub wwwroot: String,
    pub profile_roles: Vec<i64>,
    pub site_admins: Vec<i64>,
    pub default_user_role_id: Option<i64>,
}

impl SiteSettings {
    pub fn load(conn: &rusqlite::Connection) -> anyhow::Result<Self> {
        Ok(serde_json::from_value(load_section(conn, SetupSection::Site)?)?)
    }

    pub fn is_site_admin(&self, user_id: i64) -> bool {
        self.site_admins.contains(&user_id)
    }
}

#[derive(Debug, Clone, Copy, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PageSettings {
    pub default_page_size: i64,
    pub show_all_page_size: i64,
}

impl PageSettings {
    pub fn load(conn: &rusqlite::Connection) -> anyhow::Result<Self> {
        Ok(serde_json::from_value(load_section(
            conn,
            SetupSection::Photoboard,
        )?)?)
    }
}

impl Default for PageSettings {
    fn default() -> Self {
        Self {
            default_page_size: 10,
            show_all_page_size: 5000,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_load_without_saved_rows() {
        let conn = db::open_in_memory().expect("db");
        let site = SiteSettings::load(&conn).expect("site");
        assert_eq!(site.wwwroot, "http://localhost");
        assert!(site.profile_roles.is_empty());
        let page = PageSettings::load(&conn).expect("page");
        assert_eq!(page.default_page_size, 10);
        assert_eq!(page.show_all_page_size, 5000);
    }

    #[test]
    fn profile_roles_accept_comma_separated_form() {
        let conn = db::open_in_memory().expect("db");
        let patch = json!({ "profileRoles": "5, 3,,9" });
        let res = update_section(&conn, SetupSection::Site, patch.as_object().expect("obj"))
            .expect("update");
        assert!(res.is_ok());
        let site = SiteSettings::load(&conn).expect("site");
        assert_eq!(site.profile_roles, vec![5, 3, 9]);
    }

    #[test]
    fn unknown_and_out_of_range_fields_are_rejected() {
        let mut current = default_section(SetupSection::Photoboard);
        let bad = json!({ "defaultPageSize": 0 });
        assert!(merge_section_patch(
            SetupSection::Photoboard,
            &mut current,
            bad.as_object().expect("obj")
        )
        .is_err());
        let unknown = json!({ "colour": "red" });
        let msg = merge_section_patch(
            SetupSection::Photoboard,
            &mut current,
            unknown.as_object().expect("obj"),
        )
        .unwrap_err();
        assert!(msg.contains("unknown photoboard field"));
    }
}
