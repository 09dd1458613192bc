use crate::entities::{event_logs, prelude::*};
use anyhow::Result;
use sea_orm::sea_query::LikeExpr;
use sea_orm::{ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter, QueryOrder, QuerySelect, Set};

/// Row to append to the audit trail.
#[derive(Debug, Clone)]
pub struct NewEventLog {
    pub admin_id: Option<String>,
    pub user_id: Option<String>,
    pub event_type: String,
    pub event_detail: Option<String>,
    pub result: Option<String>,
}

/// Filters for audit queries. Dates are normalized timestamps comparable
/// with the stored `created_at` strings.
#[derive(Debug, Clone, Default)]
pub struct EventLogFilter {
    pub event_type: Option<String>,
    pub result: Option<String>,
    pub admin_username: Option<String>,
    pub user_id: Option<String>,
    pub start: Option<String>,
    pub end: Option<String>,
}

pub struct EventLogRepository {
    conn: DatabaseConnection,
}

impl EventLogRepository {
    pub const fn new(conn: DatabaseConnection) -> Self {
        Self { conn }
    }

    pub async fn add(&self, entry: NewEventLog) -> Result<()> {
        let active_model = event_logs::ActiveModel {
            admin_id: Set(entry.admin_id),
            user_id: Set(entry.user_id),
            event_type: Set(entry.event_type),
            event_detail: Set(entry.event_detail),
            result: Set(entry.result),
            created_at: Set(crate::db::now_timestamp()),
            ..Default::default()
        };

        EventLogs::insert(active_model).exec(&self.conn).await?;
        Ok(())
    }

    /// Newest first, capped at `limit` rows.
    pub async fn query(&self, filter: &EventLogFilter, limit: u64) -> Result<Vec<event_logs::Model>> {
        let mut query = EventLogs::find()
            .order_by_desc(event_logs::Column::CreatedAt)
            .order_by_desc(event_logs::Column::Id);

        if let Some(event_type) = &filter.event_type {
            query = query.filter(event_logs::Column::EventType.eq(event_type.as_str()));
        }

        if let Some(result) = &filter.result {
            query = query.filter(event_logs::Column::Result.eq(result.as_str()));
        }

        if let Some(admin) = &filter.admin_username {
            query = query.filter(event_logs::Column::AdminId.eq(admin.as_str()));
        }

        if let Some(user_id) = &filter.user_id {
            let pattern = format!("%{}%", escape_like(user_id));
            query = query.filter(event_logs::Column::UserId.like(LikeExpr::new(pattern).escape('\\')));
        }

        if let Some(start) = &filter.start {
            query = query.filter(event_logs::Column::CreatedAt.gte(start.as_str()));
        }

        if let Some(end) = &filter.end {
            query = query.filter(event_logs::Column::CreatedAt.lte(end.as_str()));
        }

        Ok(query.limit(limit).all(&self.conn).await?)
    }
}

/// Escapes LIKE wildcards so user input matches literally under `ESCAPE '\'`.
fn escape_like(value: &str) -> String {
    let mut escaped = String::with_capacity(value.len());
    for c in value.chars() {
        if matches!(c, '%' | '_' | '\\') {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped
}

#[cfg(test)]
mod tests {
    use super::escape_like;

    #[test]
    fn like_wildcards_are_escaped() {
        assert_eq!(escape_like("alice"), "alice");
        assert_eq!(escape_like("test_user"), "test\\_user");
        assert_eq!(escape_like("100%"), "100\\%");
        assert_eq!(escape_like("a\\b"), "a\\\\b");
    }
}
