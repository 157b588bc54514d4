//! Calendar sync client.
//!
//! After a reservation changes, the core service is told to re-sync its
//! calendar entry. Delivery is best effort: failures are logged and never
//! reach the caller.

use std::time::Duration;

use serde::Serialize;
use tracing::{info, warn};
use url::Url;
use uuid::Uuid;

use crate::config::CalendarConfig;

const SYNC_PATH: &str = "/internal/calendar/sync-reservation";
const REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

#[derive(Debug, Serialize)]
struct SyncRequest {
    reservation_id: Uuid,
}

/// Outcome of one sync attempt, for logging and tests.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SyncOutcome {
    /// No base URL configured.
    Skipped,
    Synced,
    /// Non-2xx response.
    Rejected(u16),
    /// Transport failure.
    Failed(String),
}

/// HTTP client for the core calendar endpoint.
#[derive(Debug, Clone)]
pub struct CalendarSync {
    client: reqwest::Client,
    endpoint: Option<Url>,
    internal_token: String,
}

impl CalendarSync {
    pub fn new(config: &CalendarConfig) -> Self {
        let endpoint = config.base_url.as_ref().and_then(|base| match base.join(SYNC_PATH) {
            Ok(url) => Some(url),
            Err(e) => {
                warn!(base = %base, error = %e, "calendar endpoint unusable; sync disabled");
                None
            }
        });
        let client = reqwest::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .unwrap_or_default();
        Self {
            client,
            endpoint,
            internal_token: config.internal_token.clone(),
        }
    }

    pub fn is_enabled(&self) -> bool {
        self.endpoint.is_some()
    }

    /// Notify the core service once and log the result.
    pub async fn sync_reservation(&self, reservation_id: Uuid) -> SyncOutcome {
        let Some(endpoint) = &self.endpoint else {
            info!(%reservation_id, "calendar sync not configured; skipping");
            return SyncOutcome::Skipped;
        };

        let result = self
            .client
            .post(endpoint.clone())
            .header("x-internal-token", &self.internal_token)
            .json(&SyncRequest { reservation_id })
            .send()
            .await;

        match result {
            Ok(resp) if resp.status().is_success() => {
                info!(%reservation_id, "calendar sync ok");
                SyncOutcome::Synced
            }
            Ok(resp) => {
                let status = resp.status().as_u16();
                let body = resp.text().await.unwrap_or_default();
                warn!(%reservation_id, status, %body, "calendar sync rejected");
                SyncOutcome::Rejected(status)
            }
            Err(e) => {
                warn!(%reservation_id, error = %e, "calendar sync failed");
                SyncOutcome::Failed(e.to_string())
            }
        }
    }

    /// Fire-and-forget variant used by request handlers.
    pub fn spawn_sync(&self, reservation_id: Uuid) {
        let this = self.clone();
        tokio::spawn(async move {
            this.sync_reservation(reservation_id).await;
        });
    }
}
