//! The course photoboard page: a filtered, paginated grid of course participants.

pub mod error;
pub mod gate;
pub mod params;
pub mod policy;
pub mod render;
pub mod resolve;

use crate::platform::access::{CAP_ACCESS_ALL_GROUPS, CAP_VIEW_ALL_PHOTOBOARD};
use crate::platform::context::GroupMode;
use crate::platform::participants::{Filter, FilterField, FilterSet, ParticipantsSearch};
use crate::platform::{events, groups, roles};
use crate::settings::{PageSettings, SiteSettings};
use error::PageError;
use params::PhotoboardParams;
use policy::{CallerMode, GroupDecision};
use render::{FilterOption, FilterWidget, GroupDetails, JsCall, PageUrl, PerPageToggle, PAGE_PATH};
use rusqlite::Connection;
use serde::Serialize;

/// A rendered photoboard together with the numbers and filters it was built from.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RenderedPage {
    pub html: String,
    pub unique_id: String,
    pub course_id: i64,
    pub context_id: i64,
    pub matched: i64,
    pub grand_total: i64,
    pub page: i64,
    pub per_page: i64,
    pub filters: FilterSet,
    pub per_page_toggle: PerPageToggle,
    pub js_init: JsCall,
}

#[derive(Debug, Clone, Serialize)]
#[serde(tag = "outcome", rename_all = "lowercase")]
pub enum Outcome {
    /// The participant grid.
    Rendered(Box<RenderedPage>),
    /// The caller may not see any group; only a notice is shown.
    Notice { html: String },
}

/// Loads settings and parameters from the workspace, then renders the page.
pub fn render(conn: &Connection, raw_params: &serde_json::Value) -> Result<Outcome, PageError> {
    let site = SiteSettings::load(conn)?;
    let page_cfg = PageSettings::load(conn)?;
    let params = PhotoboardParams::from_json(raw_params, page_cfg.default_page_size)?;
    render_with(conn, &site, &page_cfg, &params)
}

/// Runs one page request: access checks, group and role policy, counting, then HTML.
pub fn render_with(
    conn: &Connection,
    site: &SiteSettings,
    page_cfg: &PageSettings,
    params: &PhotoboardParams,
) -> Result<Outcome, PageError> {
    let page_url = PageUrl::new(&site.wwwroot, PAGE_PATH)
        .param("page", params.page)
        .param("perpage", params.perpage)
        .param("contextid", params.contextid)
        .param("id", params.courseid);

    let (course, context) = resolve::resolve_course_context(conn, params.contextid, params.courseid)?;
    let (session, user) =
        gate::require_login(conn, site, params.token.as_deref(), &course, &context)?;
    gate::require_view_participants(conn, site, user.id, &context)?;
    events::user_list_viewed(conn, &course, &context, user.id)?;

    let can_access_all_groups =
        gate::has_capability(conn, site, user.id, CAP_ACCESS_ALL_GROUPS, &context)?;
    let caller = CallerMode::from_capability(gate::has_capability(
        conn,
        site,
        user.id,
        CAP_VIEW_ALL_PHOTOBOARD,
        &context,
    )?);

    let mut filterset = FilterSet::for_course(course.id);
    let own_groups = groups::user_groups(conn, course.id, user.id)?;
    let own_group_ids: Vec<i64> = own_groups.iter().map(|g| g.id).collect();

    match policy::restrict_groups(
        course.groupmode,
        can_access_all_groups,
        params.group,
        &own_group_ids,
    ) {
        GroupDecision::NotInGroup => {
            tracing::info!(course_id = course.id, user_id = user.id, "photoboard.not_in_group");
            return Ok(Outcome::Notice {
                html: render::render_not_in_group()?,
            });
        }
        GroupDecision::Groups(ids) => {
            if !ids.is_empty() {
                filterset.add(Filter::new(FilterField::Groups, ids));
            }
        }
        GroupDecision::UseActiveGroup => {
            let active =
                groups::course_active_group(conn, &session, &course, can_access_all_groups)?;
            if active > 0 {
                filterset.add(Filter::new(FilterField::Groups, vec![active]));
            }
        }
    }

    let group_details = if policy::shows_group_details(
        course.groupmode,
        can_access_all_groups,
        params.group,
    ) {
        match groups::group_by_id(conn, params.group)? {
            Some(g) if g.course_id == course.id => Some(GroupDetails {
                member_count: groups::member_count(conn, g.id)?,
                name: g.name,
                description: g.description,
            }),
            _ => None,
        }
    } else {
        None
    };

    let profile_roles = roles::profile_roles(conn, site)?;
    let viewable_role_ids: Vec<i64> = profile_roles.iter().map(|r| r.id).collect();
    if let Some(filter) =
        policy::role_filter(caller, params.roleid, &viewable_role_ids, &site.profile_roles)?
    {
        filterset.add(filter);
    }

    // Paging and toggle links must reproduce the same filters when followed.
    let mut base_url = PageUrl::new(&site.wwwroot, PAGE_PATH)
        .param("contextid", context.id)
        .param("id", course.id)
        .param("perpage", params.perpage);
    if params.group != 0 {
        base_url.set("group", params.group);
    }
    if filterset.get(FilterField::Roles).is_some() {
        base_url.set("roleid", params.roleid);
    }

    let search = ParticipantsSearch::new(conn, &course, &context);
    let grand_total = search.count(&FilterSet::for_course(course.id))?;
    let matched = search.count(&filterset)?;
    let per_page = params.perpage;
    let last_page = if matched == 0 { 0 } else { (matched - 1) / per_page };
    let page = params.page.min(last_page);
    let rows = search.fetch_page(&filterset, page, per_page)?;

    let mut widget = FilterWidget::default();
    if caller == CallerMode::Privileged && !profile_roles.is_empty() {
        let options = profile_roles
            .iter()
            .map(|r| FilterOption {
                value: r.id,
                label: r.name.clone(),
            })
            .collect();
        let selected = filterset
            .get(FilterField::Roles)
            .and_then(|f| f.values.first().copied())
            .unwrap_or(0);
        widget.roles = Some((options, selected));
    }
    if course.groupmode != GroupMode::NoGroups {
        let selectable = if can_access_all_groups || course.groupmode == GroupMode::Visible {
            groups::course_groups(conn, course.id)?
        } else {
            own_groups
        };
        if !selectable.is_empty() {
            let mut options: Vec<FilterOption> = selectable
                .into_iter()
                .map(|g| FilterOption {
                    value: g.id,
                    label: g.name,
                })
                .collect();
            if can_access_all_groups {
                options.push(FilterOption {
                    value: groups::USERS_WITHOUT_GROUP,
                    label: "No group".to_string(),
                });
            }
            widget.groups = Some((options, params.group));
        }
    }

    let toggle = render::per_page_toggle(&base_url, per_page, matched, page_cfg);

    let unique_id = format!("photoboard-{}", course.id);
    let js_init = JsCall::participants_init(&unique_id);
    let html = render::render_page(&render::PageView {
        wwwroot: &site.wwwroot,
        course: &course,
        unique_id: &unique_id,
        page_url: &page_url,
        base_url: &base_url,
        sesskey: &session.sesskey,
        matched,
        grand_total,
        rows: &rows,
        page,
        per_page,
        default_page_size: page_cfg.default_page_size,
        group_details: group_details.as_ref(),
        filters: &widget,
        toggle: &toggle,
        js_init: &js_init,
    })?;

    tracing::info!(
        course_id = course.id,
        user_id = user.id,
        caller = ?caller,
        matched,
        grand_total,
        page,
        "photoboard.rendered"
    );

    Ok(Outcome::Rendered(Box::new(RenderedPage {
        html,
        unique_id,
        course_id: course.id,
        context_id: context.id,
        matched,
        grand_total,
        page,
        per_page,
        filters: filterset,
        per_page_toggle: toggle,
        js_init,
    })))
}
