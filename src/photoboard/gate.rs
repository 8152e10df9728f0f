use crate::photoboard::error::PageError;
use crate::platform::access::{
    self, CAP_COURSE_VIEW, CAP_VIEW_HIDDEN_COURSES, CAP_VIEW_PARTICIPANTS,
};
use crate::platform::context::{Context, Course};
use crate::platform::session::{self, Session};
use crate::platform::users::{self, User};
use crate::settings::SiteSettings;
use rusqlite::Connection;

pub fn has_capability(
    conn: &Connection,
    site: &SiteSettings,
    user_id: i64,
    capability: &str,
    context: &Context,
) -> Result<bool, PageError> {
    Ok(access::has_capability(conn, site, user_id, capability, context)?)
}

/// Requires a live session whose user may enter the course. Returns the session and user.
pub fn require_login(
    conn: &Connection,
    site: &SiteSettings,
    token: Option<&str>,
    course: &Course,
    context: &Context,
) -> Result<(Session, User), PageError> {
    let login = || PageError::RequireLogin {
        redirect: format!("{}/login/index.php", site.wwwroot),
    };

    let Some(token) = token else {
        return Err(login());
    };
    let Some(session) = session::resolve_session(conn, token)? else {
        return Err(login());
    };
    let Some(user) = users::user_by_id(conn, session.user_id)? else {
        return Err(login());
    };
    if user.deleted || user.suspended {
        return Err(login());
    }

    if !course.visible
        && !has_capability(conn, site, user.id, CAP_VIEW_HIDDEN_COURSES, context)?
    {
        return Err(PageError::CourseHidden {
            course_id: course.id,
        });
    }

    if !users::is_enrolled_active(conn, course.id, user.id)?
        && !has_capability(conn, site, user.id, CAP_COURSE_VIEW, context)?
    {
        return Err(PageError::RequireLogin {
            redirect: format!("{}/enrol/index.php?id={}", site.wwwroot, course.id),
        });
    }

    Ok((session, user))
}

pub fn require_view_participants(
    conn: &Connection,
    site: &SiteSettings,
    user_id: i64,
    context: &Context,
) -> Result<(), PageError> {
    if has_capability(conn, site, user_id, CAP_VIEW_PARTICIPANTS, context)? {
        Ok(())
    } else {
        Err(PageError::AccessDenied {
            capability: CAP_VIEW_PARTICIPANTS,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db;
    use crate::platform::access::{grant, Permission};
    use crate::platform::context::{
        course_by_id, course_context, create_course, GroupMode, NewCourse, SYSTEM_CONTEXT_ID,
    };
    use crate::platform::roles::{assign_role, create_role};
    use crate::platform::session::open_session;
    use crate::platform::users::{create_user, enrol_user, EnrolStatus, NewUser};

    fn site() -> SiteSettings {
        SiteSettings {
            wwwroot: "https://lms.example".into(),
            profile_roles: vec![],
            site_admins: vec![],
            default_user_role_id: None,
        }
    }

    fn setup(visible: bool) -> (Connection, Course, Context, i64) {
        let conn = db::open_in_memory().expect("db");
        let (course_id, _) = create_course(
            &conn,
            &NewCourse {
                shortname: "ART".into(),
                fullname: "Art".into(),
                format: "topics".into(),
                groupmode: GroupMode::NoGroups,
                visible,
            },
        )
        .expect("course");
        let user_id = create_user(
            &conn,
            &NewUser {
                username: "kim".into(),
                firstname: "Kim".into(),
                lastname: "Park".into(),
                email: String::new(),
                suspended: false,
            },
        )
        .expect("user");
        let course = course_by_id(&conn, course_id).expect("q").expect("course");
        let ctx = course_context(&conn, course_id).expect("q").expect("ctx");
        (conn, course, ctx, user_id)
    }

    #[test]
    fn login_requires_session_and_enrolment() {
        let (conn, course, ctx, user_id) = setup(true);
        let err = require_login(&conn, &site(), None, &course, &ctx).unwrap_err();
        assert_eq!(err.code(), "require_login");
        assert_eq!(
            err.details().expect("details")["redirect"],
            "https://lms.example/login/index.php"
        );

        let (token, _) = open_session(&conn, user_id).expect("session");
        let err = require_login(&conn, &site(), Some(&token), &course, &ctx).unwrap_err();
        assert_eq!(
            err.details().expect("details")["redirect"],
            format!("https://lms.example/enrol/index.php?id={}", course.id)
        );

        enrol_user(&conn, course.id, user_id, EnrolStatus::Active).expect("enrol");
        let (session, user) =
            require_login(&conn, &site(), Some(&token), &course, &ctx).expect("login");
        assert_eq!(session.user_id, user_id);
        assert_eq!(user.username, "kim");

        conn.execute("UPDATE users SET suspended = 1 WHERE id = ?", [user_id])
            .expect("suspend");
        let err = require_login(&conn, &site(), Some(&token), &course, &ctx).unwrap_err();
        assert_eq!(err.code(), "require_login");
    }

    #[test]
    fn hidden_course_needs_capability() {
        let (conn, course, ctx, user_id) = setup(false);
        enrol_user(&conn, course.id, user_id, EnrolStatus::Active).expect("enrol");
        let (token, _) = open_session(&conn, user_id).expect("session");
        let err = require_login(&conn, &site(), Some(&token), &course, &ctx).unwrap_err();
        assert_eq!(err.code(), "course_hidden");

        let role = create_role(&conn, "teacher", "Teacher", 1).expect("role");
        assign_role(&conn, role, user_id, ctx.id).expect("assign");
        grant(&conn, role, SYSTEM_CONTEXT_ID, CAP_VIEW_HIDDEN_COURSES, Permission::Allow)
            .expect("grant");
        assert!(require_login(&conn, &site(), Some(&token), &course, &ctx).is_ok());
    }

    #[test]
    fn view_participants_is_access_denied_without_capability() {
        let (conn, _course, ctx, user_id) = setup(true);
        let err = require_view_participants(&conn, &site(), user_id, &ctx).unwrap_err();
        assert_eq!(err.code(), "access_denied");
        assert_eq!(
            err.details().expect("details")["capability"],
            CAP_VIEW_PARTICIPANTS
        );
    }
}
