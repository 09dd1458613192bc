use crate::db::{NewEventLog, Store};
use crate::domain::events::AuditEvent;
use std::sync::Arc;
use tokio::sync::broadcast;
use tracing::{debug, error};

/// Publishing side of the audit bus. Cheap to clone.
#[derive(Clone)]
pub struct AuditLog {
    bus: broadcast::Sender<AuditEvent>,
}

impl AuditLog {
    #[must_use]
    pub fn new(buffer_size: usize) -> Self {
        let (bus, _) = broadcast::channel(buffer_size.max(1));
        Self { bus }
    }

    /// Best effort: an event with no listener is dropped.
    pub fn record(&self, event: AuditEvent) {
        debug!(
            event_type = %event.event_type,
            result = %event.result,
            admin = event.admin.as_deref().unwrap_or("-"),
            "{}",
            event.detail
        );
        metrics::counter!(
            "audit_events_total",
            "event_type" => event.event_type.as_str(),
            "result" => event.result.as_str()
        )
        .increment(1);
        if self.bus.send(event).is_err() {
            debug!("No audit listener, event dropped");
        }
    }

    #[must_use]
    pub fn subscribe(&self) -> broadcast::Receiver<AuditEvent> {
        self.bus.subscribe()
    }
}

/// Persists audit events as `event_logs` rows.
pub struct AuditLogService {
    store: Store,
    audit: AuditLog,
}

impl AuditLogService {
    #[must_use]
    pub const fn new(store: Store, audit: AuditLog) -> Self {
        Self { store, audit }
    }

    pub fn start_listener(self: Arc<Self>) {
        let mut rx = self.audit.subscribe();
        let service = self;

        tokio::spawn(async move {
            loop {
                match rx.recv().await {
                    Ok(event) => {
                        if let Err(e) = service.handle_event(event).await {
                            error!(error = %e, "Failed to save event log");
                        }
                    }
                    Err(broadcast::error::RecvError::Lagged(count)) => {
                        error!(count, "Audit listener lagged");
                    }
                    Err(broadcast::error::RecvError::Closed) => {
                        debug!("Audit bus closed");
                        break;
                    }
                }
            }
        });
    }

    async fn handle_event(&self, event: AuditEvent) -> anyhow::Result<()> {
        self.store
            .add_event_log(NewEventLog {
                admin_id: event.admin,
                user_id: event.user_id,
                event_type: event.event_type.as_str().to_string(),
                event_detail: Some(event.detail),
                result: Some(event.result.as_str().to_string()),
            })
            .await
    }
}
