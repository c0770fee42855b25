use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::slot::SlotDescriptor;

/// A temporary claim on a slot while the holder completes checkout. Expiry
/// is time-driven and evaluated at query time; rows are never reaped by the
/// engine.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TimerHold {
    pub id: Uuid,
    /// Set once the hold is tied to a created booking.
    pub booking_id: Option<Uuid>,
    pub holder_uuid: String,
    pub slot: SlotDescriptor,
    pub created_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
}

impl TimerHold {
    pub fn is_active(&self, now: DateTime<Utc>) -> bool {
        self.expires_at > now
    }
}
