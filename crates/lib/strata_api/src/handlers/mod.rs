//! Request handlers.

pub mod auth;
pub mod me;
pub mod users;
