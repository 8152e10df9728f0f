//! HTML output for the photoboard page.
//!
//! Rendering is a pure function of a [`PageView`]. All counts are computed before the view
//! is built, so the heading and the table come out of the same pass. Markup lives in the
//! askama templates under `templates/photoboard/`, which escape every interpolated value.

use crate::platform::context::Course;
use crate::platform::participants::ParticipantRow;
use crate::settings::PageSettings;
use askama::Template;
use serde::Serialize;
use serde_json::json;

pub const PAGE_PATH: &str = "/local/photoboard/index.php";

const STR_MATCHED: &str = "Matched: ";
const STR_NOT_IN_GROUP: &str = "Sorry, but you need to be part of a group to see this page.";
const STR_NOTHING_TO_DISPLAY: &str = "Nothing to display";

/// A site URL with ordered query parameters. Setting an existing parameter replaces it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageUrl {
    base: String,
    params: Vec<(&'static str, String)>,
}

impl PageUrl {
    pub fn new(wwwroot: &str, path: &str) -> Self {
        Self {
            base: format!("{}{}", wwwroot.trim_end_matches('/'), path),
            params: Vec::new(),
        }
    }

    pub fn param(mut self, key: &'static str, value: impl ToString) -> Self {
        self.set(key, value);
        self
    }

    pub fn set(&mut self, key: &'static str, value: impl ToString) {
        let value = value.to_string();
        match self.params.iter_mut().find(|(k, _)| *k == key) {
            Some(slot) => slot.1 = value,
            None => self.params.push((key, value)),
        }
    }

    /// The raw URL, unescaped.
    pub fn out(&self) -> String {
        if self.params.is_empty() {
            return self.base.clone();
        }
        let query: Vec<String> = self
            .params
            .iter()
            .map(|(k, v)| format!("{}={}", k, v))
            .collect();
        format!("{}?{}", self.base, query.join("&"))
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PerPageToggle {
    pub url: String,
    pub target_page_size: i64,
    pub visible: bool,
    pub text: String,
}

/// The "show all / show default" link under the table.
pub fn per_page_toggle(
    url: &PageUrl,
    perpage: i64,
    matched: i64,
    cfg: &PageSettings,
) -> PerPageToggle {
    if perpage == cfg.show_all_page_size && matched > cfg.default_page_size {
        PerPageToggle {
            url: url.clone().param("perpage", cfg.default_page_size).out(),
            target_page_size: cfg.default_page_size,
            visible: true,
            text: format!("Show {} per page", cfg.default_page_size),
        }
    } else if perpage < matched {
        PerPageToggle {
            url: url.clone().param("perpage", cfg.show_all_page_size).out(),
            target_page_size: cfg.show_all_page_size,
            visible: true,
            text: format!("Show all {}", matched),
        }
    } else {
        PerPageToggle {
            url: url.out(),
            target_page_size: cfg.default_page_size,
            visible: false,
            text: String::new(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct GroupDetails {
    pub name: String,
    pub description: String,
    pub member_count: i64,
}

#[derive(Debug, Clone)]
pub struct FilterOption {
    pub value: i64,
    pub label: String,
}

#[derive(Debug, Clone, Default)]
pub struct FilterWidget {
    pub roles: Option<(Vec<FilterOption>, i64)>,
    pub groups: Option<(Vec<FilterOption>, i64)>,
}

#[derive(Debug, Clone, Serialize)]
pub struct JsCall {
    pub module: String,
    pub function: String,
    pub args: serde_json::Value,
}

impl JsCall {
    pub fn participants_init(unique_id: &str) -> Self {
        Self {
            module: "core_user/participants".to_string(),
            function: "init".to_string(),
            args: json!([{ "uniqueid": unique_id }]),
        }
    }

    /// Arguments as they appear inside the call parentheses.
    fn call_args(&self) -> String {
        match self.args.as_array() {
            Some(items) => items
                .iter()
                .map(|v| v.to_string())
                .collect::<Vec<_>>()
                .join(", "),
            None => self.args.to_string(),
        }
    }
}

pub struct PageView<'a> {
    pub wwwroot: &'a str,
    pub course: &'a Course,
    pub unique_id: &'a str,
    pub page_url: &'a PageUrl,
    pub base_url: &'a PageUrl,
    pub sesskey: &'a str,
    pub matched: i64,
    pub grand_total: i64,
    pub rows: &'a [ParticipantRow],
    pub page: i64,
    pub per_page: i64,
    pub default_page_size: i64,
    pub group_details: Option<&'a GroupDetails>,
    pub filters: &'a FilterWidget,
    pub toggle: &'a PerPageToggle,
    pub js_init: &'a JsCall,
}

#[derive(Template)]
#[template(path = "photoboard/notice.html")]
struct NoticeTemplate {
    message: &'static str,
}

struct SelectOption {
    value: i64,
    label: String,
    selected: bool,
}

struct SelectView {
    filter_type: &'static str,
    name: &'static str,
    select_id: String,
    label: &'static str,
    all_label: &'static str,
    options: Vec<SelectOption>,
}

struct CardView {
    id: i64,
    name: String,
    profile_href: String,
    picture: String,
    roles: String,
    groups: String,
}

/// One numbered link of the paging bar. The current page has no href.
struct PageLink {
    number: i64,
    href: Option<String>,
}

#[derive(Template)]
#[template(path = "photoboard/page.html")]
struct PageTemplate {
    group_details: Option<GroupDetails>,
    matched_label: &'static str,
    matched: i64,
    grand_total: i64,
    participants_href: String,
    photoboard_href: String,
    unique_id: String,
    selects: Vec<SelectView>,
    course_id: i64,
    default_per_page: i64,
    sesskey: String,
    returnto: String,
    nothing_to_display: &'static str,
    cards: Vec<CardView>,
    page_links: Vec<PageLink>,
    toggle_href: String,
    toggle_target: i64,
    toggle_class: &'static str,
    toggle_text: String,
    js_module: String,
    js_function: String,
    js_args: String,
}

pub fn render_not_in_group() -> askama::Result<String> {
    NoticeTemplate {
        message: STR_NOT_IN_GROUP,
    }
    .render()
}

fn select_view(
    unique_id: &str,
    filter_type: &'static str,
    name: &'static str,
    labels: (&'static str, &'static str),
    (options, selected): &(Vec<FilterOption>, i64),
) -> SelectView {
    SelectView {
        filter_type,
        name,
        select_id: format!("{}-filter-{}", unique_id, filter_type),
        label: labels.0,
        all_label: labels.1,
        options: options
            .iter()
            .map(|o| SelectOption {
                value: o.value,
                label: o.label.clone(),
                selected: o.value == *selected,
            })
            .collect(),
    }
}

fn card_view(view: &PageView, row: &ParticipantRow) -> CardView {
    CardView {
        id: row.id,
        name: row.full_name(),
        profile_href: PageUrl::new(view.wwwroot, "/user/view.php")
            .param("id", row.id)
            .param("course", view.course.id)
            .out(),
        picture: format!(
            "{}/user/pix.php/{}/f1.jpg",
            view.wwwroot.trim_end_matches('/'),
            row.id
        ),
        roles: row.roles.join(", "),
        groups: row.groups.join(", "),
    }
}

fn page_links(view: &PageView) -> Vec<PageLink> {
    if view.matched <= view.per_page {
        return Vec::new();
    }
    let pages = (view.matched + view.per_page - 1) / view.per_page;
    (0..pages)
        .map(|p| PageLink {
            number: p + 1,
            href: (p != view.page).then(|| view.base_url.clone().param("page", p).out()),
        })
        .collect()
}

pub fn render_page(view: &PageView) -> askama::Result<String> {
    let mut selects = Vec::new();
    if let Some(roles) = &view.filters.roles {
        selects.push(select_view(
            view.unique_id,
            "roles",
            "roleid",
            ("Roles", "All roles"),
            roles,
        ));
    }
    if let Some(groups) = &view.filters.groups {
        selects.push(select_view(
            view.unique_id,
            "groups",
            "group",
            ("Groups", "All participants"),
            groups,
        ));
    }

    PageTemplate {
        group_details: view.group_details.cloned(),
        matched_label: STR_MATCHED,
        matched: view.matched,
        grand_total: view.grand_total,
        participants_href: PageUrl::new(view.wwwroot, "/user/index.php")
            .param("id", view.course.id)
            .out(),
        photoboard_href: PageUrl::new(view.wwwroot, PAGE_PATH)
            .param("id", view.course.id)
            .out(),
        unique_id: view.unique_id.to_string(),
        selects,
        course_id: view.course.id,
        default_per_page: view.per_page.min(view.default_page_size),
        sesskey: view.sesskey.to_string(),
        returnto: view.page_url.out(),
        nothing_to_display: STR_NOTHING_TO_DISPLAY,
        cards: view.rows.iter().map(|row| card_view(view, row)).collect(),
        page_links: page_links(view),
        toggle_href: view.toggle.url.clone(),
        toggle_target: view.toggle.target_page_size,
        toggle_class: if view.toggle.visible { "" } else { "hidden" },
        toggle_text: view.toggle.text.clone(),
        js_module: view.js_init.module.clone(),
        js_function: view.js_init.function.clone(),
        js_args: view.js_init.call_args(),
    }
    .render()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::platform::context::GroupMode;

    fn cfg() -> PageSettings {
        PageSettings::default()
    }

    fn url() -> PageUrl {
        PageUrl::new("https://lms.example/", PAGE_PATH)
            .param("contextid", 12)
            .param("id", 5)
    }

    #[test]
    fn url_params_replace_in_place() {
        let u = url().param("perpage", 10).param("id", 6);
        assert_eq!(
            u.out(),
            "https://lms.example/local/photoboard/index.php?contextid=12&id=6&perpage=10"
        );
    }

    #[test]
    fn toggle_hidden_when_everything_fits() {
        let t = per_page_toggle(&url(), 10, 10, &cfg());
        assert!(!t.visible);
        assert!(t.text.is_empty());
    }

    #[test]
    fn toggle_offers_show_all_when_rows_overflow() {
        let t = per_page_toggle(&url(), 10, 37, &cfg());
        assert!(t.visible);
        assert_eq!(t.text, "Show all 37");
        assert_eq!(t.target_page_size, 5000);
        assert!(t.url.ends_with("perpage=5000"));
    }

    #[test]
    fn toggle_offers_default_size_when_showing_all() {
        let t = per_page_toggle(&url(), 5000, 37, &cfg());
        assert!(t.visible);
        assert_eq!(t.text, "Show 10 per page");
        assert_eq!(t.target_page_size, 10);
        assert!(t.url.ends_with("perpage=10"));

        // Show-all with few rows has nothing to collapse.
        let t = per_page_toggle(&url(), 5000, 8, &cfg());
        assert!(!t.visible);
    }

    fn course() -> Course {
        Course {
            id: 5,
            shortname: "C5".into(),
            fullname: "Course five".into(),
            format: "topics".into(),
            groupmode: GroupMode::NoGroups,
            visible: true,
        }
    }

    fn row(id: i64, firstname: &str) -> ParticipantRow {
        ParticipantRow {
            id,
            firstname: firstname.into(),
            lastname: "Li".into(),
            email: String::new(),
            roles: vec!["Student".into()],
            groups: vec![],
        }
    }

    #[test]
    fn page_escapes_names_and_closes_form() {
        let course = course();
        let rows = vec![row(3, "<b>Bo</b>")];
        let page_url = url().param("page", 0);
        let base = url();
        let toggle = per_page_toggle(&base, 10, 1, &cfg());
        let js = JsCall::participants_init("photoboard-5");
        let filters = FilterWidget::default();
        let html = render_page(&PageView {
            wwwroot: "https://lms.example",
            course: &course,
            unique_id: "photoboard-5",
            page_url: &page_url,
            base_url: &base,
            sesskey: "abc123",
            matched: 1,
            grand_total: 4,
            rows: &rows,
            page: 0,
            per_page: 10,
            default_page_size: 10,
            group_details: None,
            filters: &filters,
            toggle: &toggle,
            js_init: &js,
        })
        .expect("render");
        assert!(html.starts_with(
            "<h3>Matched: <span data-region=\"photoboard-count\">1</span>/4</h3>"
        ));
        assert!(html.contains("&lt;b&gt;Bo"));
        assert!(!html.contains("<b>Bo</b>"));
        assert!(!html.contains("participants-filter"));
        assert!(!html.contains("class=\"pagination\""));
        assert!(html.contains("id=\"participantsform\""));
        assert!(html.contains("value=\"abc123\""));
        assert!(html.contains("contextid=12&amp;id=5&amp;page=0"));
        assert!(html.contains("class=\"hidden\"></a></div></div></form>"));
        assert!(html.trim_end().ends_with(
            "<script>require(['core_user/participants'], function(amd) { amd.init({\"uniqueid\":\"photoboard-5\"}); });</script>"
        ));
    }

    #[test]
    fn paging_bar_links_every_page_but_the_current_one() {
        let course = course();
        let rows = vec![row(3, "Bo")];
        let page_url = url().param("page", 1);
        let base = url().param("perpage", 10).param("group", 7);
        let toggle = per_page_toggle(&base, 10, 25, &cfg());
        let js = JsCall::participants_init("photoboard-5");
        let filters = FilterWidget {
            roles: None,
            groups: Some((
                vec![FilterOption {
                    value: 7,
                    label: "Blue & Green".into(),
                }],
                7,
            )),
        };
        let html = render_page(&PageView {
            wwwroot: "https://lms.example",
            course: &course,
            unique_id: "photoboard-5",
            page_url: &page_url,
            base_url: &base,
            sesskey: "abc123",
            matched: 25,
            grand_total: 25,
            rows: &rows,
            page: 1,
            per_page: 10,
            default_page_size: 10,
            group_details: None,
            filters: &filters,
            toggle: &toggle,
            js_init: &js,
        })
        .expect("render");
        assert!(html.contains("perpage=10&amp;group=7&amp;page=0\">1</a>"));
        assert!(html.contains("<li class=\"page-item active\"><span class=\"page-link\">2</span></li>"));
        assert!(html.contains("perpage=10&amp;group=7&amp;page=2\">3</a>"));
        assert!(html.contains("<option value=\"7\" selected>Blue &amp; Green</option>"));
        assert!(html.contains(">Show all 25</a>"));
    }

    #[test]
    fn notice_is_a_single_alert() {
        let html = render_not_in_group().expect("render");
        assert_eq!(
            html.trim_end(),
            "<div class=\"alert alert-info alert-block\" role=\"alert\">Sorry, but you need to be part of a group to see this page.</div>"
        );
    }
}
