pub mod core;
pub mod courses;
pub mod groups;
pub mod photoboard;
pub mod roles;
pub mod sessions;
pub mod setup;
