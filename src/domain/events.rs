//! Audit events recorded for every admin action.
//!
//! Events are published on the audit bus and persisted asynchronously by the
//! audit log service. Their string forms are what ends up in `event_logs`.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Kind of admin action being audited.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum EventType {
    Login,
    AdminCreate,
    PasswordChange,
    UserCreate,
    UserUpdate,
    UserDelete,
}

impl EventType {
    pub const ALL: [Self; 6] = [
        Self::Login,
        Self::AdminCreate,
        Self::PasswordChange,
        Self::UserCreate,
        Self::UserUpdate,
        Self::UserDelete,
    ];

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Login => "LOGIN",
            Self::AdminCreate => "ADMIN_CREATE",
            Self::PasswordChange => "PASSWORD_CHANGE",
            Self::UserCreate => "USER_CREATE",
            Self::UserUpdate => "USER_UPDATE",
            Self::UserDelete => "USER_DELETE",
        }
    }
}

impl fmt::Display for EventType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for EventType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|t| t.as_str().eq_ignore_ascii_case(s))
            .ok_or_else(|| format!("Unknown event type: {s}"))
    }
}

/// Outcome of an audited action.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum EventResult {
    Success,
    Failure,
}

impl EventResult {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Success => "SUCCESS",
            Self::Failure => "FAILURE",
        }
    }
}

impl fmt::Display for EventResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for EventResult {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_uppercase().as_str() {
            "SUCCESS" => Ok(Self::Success),
            "FAILURE" => Ok(Self::Failure),
            _ => Err(format!("Unknown event result: {s}")),
        }
    }
}

/// Width of the `event_logs.admin_id` column.
pub const MAX_ADMIN_ID_LEN: usize = 50;

/// A single audit record travelling over the audit bus.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuditEvent {
    pub event_type: EventType,
    pub result: EventResult,
    /// Username of the acting admin, if known.
    pub admin: Option<String>,
    /// Target user, set only when exactly one user is affected.
    pub user_id: Option<String>,
    pub detail: String,
}

impl AuditEvent {
    #[must_use]
    pub fn success(event_type: EventType, detail: impl Into<String>) -> Self {
        Self {
            event_type,
            result: EventResult::Success,
            admin: None,
            user_id: None,
            detail: detail.into(),
        }
    }

    #[must_use]
    pub fn failure(event_type: EventType, detail: impl Into<String>) -> Self {
        Self {
            result: EventResult::Failure,
            ..Self::success(event_type, detail)
        }
    }

    #[must_use]
    pub fn by(mut self, admin: impl Into<String>) -> Self {
        self.admin = Some(admin.into());
        self
    }

    #[must_use]
    pub fn for_user(mut self, user_id: impl Into<String>) -> Self {
        self.user_id = Some(user_id.into());
        self
    }

    /// Attaches the user only if `user_ids` names exactly one.
    #[must_use]
    pub fn for_single_user(self, user_ids: &[String]) -> Self {
        match user_ids {
            [only] => self.for_user(only.clone()),
            _ => self,
        }
    }
}

/// Renders ids the way audit details list them: `[a, b, c]`.
#[must_use]
pub fn id_list(ids: &[String]) -> String {
    format!("[{}]", ids.join(", "))
}
