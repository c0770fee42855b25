use async_trait::async_trait;
use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::booking::Booking;
use crate::hold::TimerHold;
use crate::search::{BookingSearchCriteria, SlotSearchCriteria};
use crate::slot::SlotDescriptor;

pub type StoreError = Box<dyn std::error::Error + Send + Sync>;

/// Booking persistence. Confirmed bookings are never deleted; drafts are.
#[async_trait]
pub trait BookingStore: Send + Sync {
    /// Confirmed bookings whose slots match the criteria's descriptor
    /// fields anywhere inside its date range.
    async fn find_confirmed_bookings(
        &self,
        criteria: &SlotSearchCriteria,
    ) -> Result<Vec<Booking>, StoreError>;

    async fn find_by_booking_no(&self, booking_no: &str) -> Result<Option<Booking>, StoreError>;

    async fn search(&self, criteria: &BookingSearchCriteria) -> Result<Vec<Booking>, StoreError>;

    async fn count(&self, criteria: &BookingSearchCriteria) -> Result<u64, StoreError>;

    async fn insert(&self, booking: &Booking) -> Result<(), StoreError>;

    /// Queued persist; ordering against other writers is not guaranteed.
    async fn update(&self, booking: &Booking) -> Result<(), StoreError>;

    /// Transactional persist; the write is visible once this returns.
    async fn update_synchronously(&self, booking: &Booking) -> Result<(), StoreError>;

    /// Id of the user's live draft, if any. At most one per user.
    async fn find_draft_by_user(&self, user_uuid: &str) -> Result<Option<Uuid>, StoreError>;

    async fn find_drafts(&self, criteria: &BookingSearchCriteria) -> Result<Vec<Booking>, StoreError>;

    async fn insert_draft(&self, draft: &Booking) -> Result<(), StoreError>;

    async fn update_draft(&self, draft: &Booking) -> Result<(), StoreError>;

    /// Idempotent: deleting an unknown draft id is a no-op.
    async fn delete_draft(&self, draft_id: Uuid) -> Result<(), StoreError>;
}

/// Payment-timer hold persistence. Expired rows stay in place; every read
/// filters on the expiry instant it is handed.
#[async_trait]
pub trait TimerHoldStore: Send + Sync {
    async fn find_active_holds(
        &self,
        criteria: &SlotSearchCriteria,
        now: DateTime<Utc>,
    ) -> Result<Vec<TimerHold>, StoreError>;

    /// Conditional insert: at most one user may hold a slot at a time.
    /// Re-acquiring one's own live hold refreshes its expiry.
    async fn acquire_hold(
        &self,
        slot: &SlotDescriptor,
        holder_uuid: &str,
        booking_id: Option<Uuid>,
    ) -> Result<TimerHold, StoreError>;

    /// Stamp a created booking onto the holder's live holds covering `slots`.
    async fn assign_booking(
        &self,
        holder_uuid: &str,
        slots: &[SlotDescriptor],
        booking_id: Uuid,
    ) -> Result<(), StoreError>;

    /// Drop the holds tied to a booking once it is confirmed or abandoned.
    async fn release_holds(&self, booking_id: Uuid) -> Result<(), StoreError>;
}
