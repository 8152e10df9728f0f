use crate::photoboard::error::PageError;
use serde_json::Value;

/// Inbound page parameters. Every integer defaults to 0 except `perpage`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PhotoboardParams {
    pub token: Option<String>,
    pub page: i64,
    pub perpage: i64,
    pub contextid: i64,
    pub courseid: i64,
    pub roleid: i64,
    pub group: i64,
}

/// Reads an integer parameter the way query strings arrive: JSON numbers or numeric
/// strings. Missing or null means the default.
fn optional_int(params: &Value, key: &'static str, default: i64) -> Result<i64, PageError> {
    match params.get(key) {
        None | Some(Value::Null) => Ok(default),
        Some(Value::Number(n)) => n.as_i64().ok_or_else(|| PageError::BadParams {
            name: key,
            reason: "must be an integer".to_string(),
        }),
        Some(Value::String(s)) if s.trim().is_empty() => Ok(default),
        Some(Value::String(s)) => s.trim().parse::<i64>().map_err(|_| PageError::BadParams {
            name: key,
            reason: "must be an integer".to_string(),
        }),
        Some(_) => Err(PageError::BadParams {
            name: key,
            reason: "must be an integer".to_string(),
        }),
    }
}

impl PhotoboardParams {
    pub fn from_json(params: &Value, default_page_size: i64) -> Result<Self, PageError> {
        let token = params
            .get("token")
            .and_then(|v| v.as_str())
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(str::to_string);
        let perpage = optional_int(params, "perpage", default_page_size)?;
        Ok(Self {
            token,
            page: optional_int(params, "page", 0)?.max(0),
            perpage: if perpage < 1 { default_page_size } else { perpage },
            contextid: optional_int(params, "contextid", 0)?,
            courseid: optional_int(params, "id", 0)?,
            roleid: optional_int(params, "roleid", 0)?,
            group: optional_int(params, "group", 0)?,
        })
    }
}
