pub mod authorization;

pub use authorization::{AccessPolicy, Actor, ROLE_ADMIN, ROLE_USER};
