pub mod admin;
pub mod event_log;
pub mod user;
