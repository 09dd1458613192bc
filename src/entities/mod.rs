pub mod prelude;

pub mod admins;
pub mod allowed_models;
pub mod allowed_services;
pub mod event_logs;
pub mod users;
