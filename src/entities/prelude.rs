pub use super::admins::Entity as Admins;
pub use super::allowed_models::Entity as AllowedModels;
pub use super::allowed_services::Entity as AllowedServices;
pub use super::event_logs::Entity as EventLogs;
pub use super::users::Entity as Users;
