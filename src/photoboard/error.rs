use serde_json::json;

#[derive(Debug, thiserror::Error)]
pub enum PageError {
    #[error("invalid parameter {name}: {reason}")]
    BadParams { name: &'static str, reason: String },
    #[error("context {0} is not a course context")]
    InvalidContext(i64),
    #[error("{table} record {id} not found")]
    RecordNotFound { table: &'static str, id: i64 },
    #[error("you must log in to view this page")]
    RequireLogin { redirect: String },
    #[error("this course is currently unavailable")]
    CourseHidden { course_id: i64 },
    #[error("missing capability {capability}")]
    AccessDenied { capability: &'static str },
    #[error("invalid request")]
    InvalidRequest,
    #[error(transparent)]
    Storage(#[from] anyhow::Error),
    #[error("page template failed: {0}")]
    Render(#[from] askama::Error),
}

impl PageError {
    pub fn code(&self) -> &'static str {
        match self {
            Self::BadParams { .. } => "bad_params",
            Self::InvalidContext(_) => "invalid_context",
            Self::RecordNotFound { .. } => "record_not_found",
            Self::RequireLogin { .. } => "require_login",
            Self::CourseHidden { .. } => "course_hidden",
            Self::AccessDenied { .. } => "access_denied",
            Self::InvalidRequest => "invalid_request",
            Self::Storage(_) => "db_query_failed",
            Self::Render(_) => "render_failed",
        }
    }

    pub fn details(&self) -> Option<serde_json::Value> {
        match self {
            Self::InvalidContext(id) => Some(json!({ "contextId": id })),
            Self::RecordNotFound { table, id } => Some(json!({ "table": table, "id": id })),
            Self::RequireLogin { redirect } => Some(json!({ "redirect": redirect })),
            Self::CourseHidden { course_id } => Some(json!({ "courseId": course_id })),
            Self::AccessDenied { capability } => Some(json!({ "capability": capability })),
            _ => None,
        }
    }
}
