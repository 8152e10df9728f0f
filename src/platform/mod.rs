//! Platform services the photoboard page is glued onto: contexts and courses, capability
//! checks, sessions, users and enrolments, groups, roles, the participant search and the
//! event log. All of them read and write the workspace SQLite database.

pub mod access;
pub mod context;
pub mod events;
pub mod groups;
pub mod participants;
pub mod roles;
pub mod session;
pub mod users;
