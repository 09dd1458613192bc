use axum::{
    Json,
    extract::{Query, State},
};
use chrono::{DateTime, Duration, NaiveDate, NaiveDateTime, NaiveTime, Utc};
use serde::Deserialize;
use std::sync::Arc;

use super::validation::validate_limit;
use super::{ApiError, AppState, EventLogDto};
use crate::db::{EventLogFilter, format_timestamp};
use crate::domain::events::{EventResult, EventType};

#[derive(Debug, Deserialize)]
pub struct EventLogsQuery {
    pub event_type: Option<String>,
    pub result: Option<String>,
    pub admin_username: Option<String>,
    pub user_id: Option<String>,
    pub start_date: Option<String>,
    pub end_date: Option<String>,
    #[serde(default = "default_limit")]
    pub limit: u64,
}

const fn default_limit() -> u64 {
    100
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Bound {
    Start,
    End,
}

/// Parses a date filter into the stored timestamp format.
///
/// Accepts RFC 3339, `YYYY-MM-DDTHH:MM[:SS]` (UTC), and `YYYY-MM-DD`. An end
/// bound given without seconds or without a time covers the whole minute or day.
fn parse_bound(raw: &str, bound: Bound) -> Result<String, ApiError> {
    let raw = raw.trim();

    if let Ok(at) = DateTime::parse_from_rfc3339(raw) {
        return Ok(format_timestamp(at.with_timezone(&Utc)));
    }

    if let Ok(at) = NaiveDateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M:%S%.f") {
        return Ok(format_timestamp(at.and_utc()));
    }

    if let Ok(at) = NaiveDateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M") {
        let at = match bound {
            Bound::Start => at,
            Bound::End => at + Duration::minutes(1) - Duration::microseconds(1),
        };
        return Ok(format_timestamp(at.and_utc()));
    }

    if let Ok(day) = NaiveDate::parse_from_str(raw, "%Y-%m-%d") {
        let at = match bound {
            Bound::Start => day.and_time(NaiveTime::MIN),
            Bound::End => day.and_time(NaiveTime::MIN) + Duration::days(1) - Duration::microseconds(1),
        };
        return Ok(format_timestamp(at.and_utc()));
    }

    Err(ApiError::validation(format!(
        "Invalid date: {raw}. Use YYYY-MM-DD or an RFC 3339 timestamp"
    )))
}

fn non_empty(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

fn build_filter(query: EventLogsQuery) -> Result<EventLogFilter, ApiError> {
    let event_type = non_empty(query.event_type)
        .map(|raw| raw.parse::<EventType>().map_err(ApiError::validation))
        .transpose()?
        .map(|t| t.as_str().to_string());

    let result = non_empty(query.result)
        .map(|raw| raw.parse::<EventResult>().map_err(ApiError::validation))
        .transpose()?
        .map(|r| r.as_str().to_string());

    let start = non_empty(query.start_date)
        .map(|raw| parse_bound(&raw, Bound::Start))
        .transpose()?;
    let end = non_empty(query.end_date)
        .map(|raw| parse_bound(&raw, Bound::End))
        .transpose()?;

    if let (Some(start), Some(end)) = (&start, &end)
        && start > end
    {
        return Err(ApiError::validation("start_date must not be after end_date"));
    }

    Ok(EventLogFilter {
        event_type,
        result,
        admin_username: non_empty(query.admin_username),
        user_id: non_empty(query.user_id),
        start,
        end,
    })
}

/// GET /event-logs
pub async fn list_event_logs(
    State(state): State<Arc<AppState>>,
    Query(query): Query<EventLogsQuery>,
) -> Result<Json<Vec<EventLogDto>>, ApiError> {
    let limit = validate_limit(query.limit)?;
    let filter = build_filter(query)?;

    let logs = state
        .store()
        .query_event_logs(&filter, limit)
        .await
        .map_err(|e| ApiError::DatabaseError(e.to_string()))?;

    Ok(Json(logs.into_iter().map(EventLogDto::from).collect()))
}
