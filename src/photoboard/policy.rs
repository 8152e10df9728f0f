//! Group and role restriction rules for the photoboard.
//!
//! Both rules are plain functions of their inputs. The page fetches group memberships and
//! capabilities first and then asks these functions what to filter.

use crate::photoboard::error::PageError;
use crate::platform::context::GroupMode;
use crate::platform::participants::{Filter, FilterField};

/// How the caller may filter by role, resolved once per request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CallerMode {
    /// Can see every profile role and use the role filter freely.
    Privileged,
    /// Sees exactly one fixed profile role, which must be named in the request.
    Restricted,
}

impl CallerMode {
    pub fn from_capability(can_view_all: bool) -> Self {
        if can_view_all {
            Self::Privileged
        } else {
            Self::Restricted
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GroupDecision {
    /// Filter by these groups. Empty means no group filter.
    Groups(Vec<i64>),
    /// The caller belongs to no usable group in a separate-groups course.
    NotInGroup,
    /// Nothing usable in a visible-groups course: use the session's active group.
    UseActiveGroup,
}

/// Decides the group filter.
///
/// `own_groups` is only consulted when a restriction applies.
pub fn restrict_groups(
    mode: GroupMode,
    can_access_all_groups: bool,
    url_group: i64,
    own_groups: &[i64],
) -> GroupDecision {
    let requested: Vec<i64> = if url_group != 0 {
        vec![url_group]
    } else {
        Vec::new()
    };

    if mode == GroupMode::NoGroups || can_access_all_groups {
        return GroupDecision::Groups(requested);
    }

    let restricted: Vec<i64> = if requested.is_empty() {
        own_groups.to_vec()
    } else {
        requested
            .into_iter()
            .filter(|g| own_groups.contains(g))
            .collect()
    };

    if !restricted.is_empty() {
        return GroupDecision::Groups(restricted);
    }
    match mode {
        GroupMode::Separate => GroupDecision::NotInGroup,
        _ => GroupDecision::UseActiveGroup,
    }
}

/// Whether the single-group details block may be shown for a URL group.
pub fn shows_group_details(mode: GroupMode, can_access_all_groups: bool, url_group: i64) -> bool {
    url_group > 0 && (mode != GroupMode::Separate || can_access_all_groups)
}

/// Decides the role filter.
///
/// * `viewable_roles`: profile roles that exist in this context (privileged path).
/// * `profile_roles`: the configured profile role ids (restricted path).
pub fn role_filter(
    caller: CallerMode,
    roleid: i64,
    viewable_roles: &[i64],
    profile_roles: &[i64],
) -> Result<Option<Filter>, PageError> {
    match caller {
        CallerMode::Privileged => {
            if roleid != 0 && viewable_roles.contains(&roleid) {
                Ok(Some(Filter::new(FilterField::Roles, vec![roleid])))
            } else {
                Ok(None)
            }
        }
        CallerMode::Restricted => {
            if roleid != 0 && profile_roles.contains(&roleid) {
                Ok(Some(Filter::new(FilterField::Roles, vec![roleid])))
            } else {
                Err(PageError::InvalidRequest)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn no_groups_or_access_all_uses_url_group_verbatim() {
        assert_eq!(
            restrict_groups(GroupMode::NoGroups, false, 0, &[1, 2]),
            GroupDecision::Groups(vec![])
        );
        assert_eq!(
            restrict_groups(GroupMode::NoGroups, false, 9, &[]),
            GroupDecision::Groups(vec![9])
        );
        assert_eq!(
            restrict_groups(GroupMode::Separate, true, 9, &[1]),
            GroupDecision::Groups(vec![9])
        );
    }

    #[test]
    fn restricted_caller_sees_own_groups_or_intersection() {
        assert_eq!(
            restrict_groups(GroupMode::Separate, false, 0, &[3, 4]),
            GroupDecision::Groups(vec![3, 4])
        );
        assert_eq!(
            restrict_groups(GroupMode::Visible, false, 4, &[3, 4]),
            GroupDecision::Groups(vec![4])
        );
    }

    #[test]
    fn empty_restriction_depends_on_mode() {
        assert_eq!(
            restrict_groups(GroupMode::Separate, false, 0, &[]),
            GroupDecision::NotInGroup
        );
        assert_eq!(
            restrict_groups(GroupMode::Separate, false, 7, &[3]),
            GroupDecision::NotInGroup
        );
        assert_eq!(
            restrict_groups(GroupMode::Visible, false, 7, &[3]),
            GroupDecision::UseActiveGroup
        );
    }

    #[test]
    fn group_details_hidden_in_separate_mode_without_access_all() {
        assert!(shows_group_details(GroupMode::Visible, false, 2));
        assert!(shows_group_details(GroupMode::Separate, true, 2));
        assert!(!shows_group_details(GroupMode::Separate, false, 2));
        assert!(!shows_group_details(GroupMode::NoGroups, true, 0));
    }

    #[test]
    fn privileged_ignores_unknown_roles() {
        assert_eq!(
            role_filter(CallerMode::Privileged, 99, &[5], &[5]).expect("ok"),
            None
        );
        assert_eq!(role_filter(CallerMode::Privileged, 0, &[5], &[5]).expect("ok"), None);
        let f = role_filter(CallerMode::Privileged, 5, &[5], &[5])
            .expect("ok")
            .expect("filter");
        assert_eq!(f.field, FilterField::Roles);
        assert_eq!(f.values, vec![5]);
    }

    #[test]
    fn restricted_requires_profile_role() {
        for roleid in [0, 3] {
            let err = role_filter(CallerMode::Restricted, roleid, &[], &[5]).unwrap_err();
            assert_eq!(err.code(), "invalid_request");
        }
        let f = role_filter(CallerMode::Restricted, 5, &[], &[5])
            .expect("ok")
            .expect("filter");
        assert_eq!(f.values, vec![5]);
    }
}
