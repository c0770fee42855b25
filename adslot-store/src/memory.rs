//! In-memory stores for tests and local runs. The write locks double as
//! the serialization point the relational schema provides in production:
//! draft uniqueness per user and at-most-one live hold per slot are both
//! checked under the lock.

use std::collections::HashMap;

use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use tokio::sync::RwLock;
use uuid::Uuid;

use adslot_domain::repository::{BookingStore, StoreError, TimerHoldStore};
use adslot_domain::{
    Booking, BookingSearchCriteria, BookingStatus, SlotDescriptor, SlotSearchCriteria, TimerHold,
};

pub struct MemoryBookingStore {
    bookings: RwLock<HashMap<Uuid, Booking>>,
    drafts: RwLock<HashMap<Uuid, Booking>>,
}

impl MemoryBookingStore {
    pub fn new() -> Self {
        Self {
            bookings: RwLock::new(HashMap::new()),
            drafts: RwLock::new(HashMap::new()),
        }
    }
}

impl Default for MemoryBookingStore {
    fn default() -> Self {
        Self::new()
    }
}

fn matches_criteria(booking: &Booking, criteria: &BookingSearchCriteria) -> bool {
    criteria.tenant_id.as_ref().map_or(true, |t| &booking.tenant_id == t)
        && criteria.booking_no.as_ref().map_or(true, |n| &booking.booking_no == n)
        && criteria.status.map_or(true, |s| booking.status == s)
        && criteria.created_by.as_ref().map_or(true, |u| &booking.created_by == u)
        && criteria
            .applicant_name
            .as_ref()
            .map_or(true, |n| booking.applicant.name.expose() == n)
        && criteria
            .mobile_number
            .as_ref()
            .map_or(true, |m| booking.applicant.mobile_number.expose() == m)
}

fn slot_matches_search(slot: &SlotDescriptor, criteria: &SlotSearchCriteria) -> bool {
    slot.advertisement_type == criteria.advertisement_type
        && slot.location == criteria.location
        && slot.face_area == criteria.face_area
        && slot.night_light == criteria.night_light
        && slot.booking_date >= criteria.booking_start_date
        && slot.booking_date <= criteria.booking_end_date
}

#[async_trait]
impl BookingStore for MemoryBookingStore {
    async fn find_confirmed_bookings(
        &self,
        criteria: &SlotSearchCriteria,
    ) -> Result<Vec<Booking>, StoreError> {
        let bookings = self.bookings.read().await;
        Ok(bookings
            .values()
            .filter(|b| b.status == BookingStatus::Booked && b.tenant_id == criteria.tenant_id)
            .filter(|b| b.slots.iter().any(|s| slot_matches_search(s, criteria)))
            .cloned()
            .collect())
    }

    async fn find_by_booking_no(&self, booking_no: &str) -> Result<Option<Booking>, StoreError> {
        let bookings = self.bookings.read().await;
        Ok(bookings
            .values()
            .find(|b| b.booking_no == booking_no)
            .cloned())
    }

    async fn search(&self, criteria: &BookingSearchCriteria) -> Result<Vec<Booking>, StoreError> {
        let bookings = self.bookings.read().await;
        let mut results: Vec<Booking> = bookings
            .values()
            .filter(|b| matches_criteria(b, criteria))
            .cloned()
            .collect();
        results.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(results)
    }

    async fn count(&self, criteria: &BookingSearchCriteria) -> Result<u64, StoreError> {
        let bookings = self.bookings.read().await;
        Ok(bookings
            .values()
            .filter(|b| matches_criteria(b, criteria))
            .count() as u64)
    }

    async fn insert(&self, booking: &Booking) -> Result<(), StoreError> {
        let mut bookings = self.bookings.write().await;
        bookings.insert(booking.booking_id, booking.clone());
        Ok(())
    }

    async fn update(&self, booking: &Booking) -> Result<(), StoreError> {
        self.update_synchronously(booking).await
    }

    async fn update_synchronously(&self, booking: &Booking) -> Result<(), StoreError> {
        let mut bookings = self.bookings.write().await;
        if !bookings.contains_key(&booking.booking_id) {
            return Err(format!("booking {} does not exist", booking.booking_id).into());
        }
        bookings.insert(booking.booking_id, booking.clone());
        Ok(())
    }

    async fn find_draft_by_user(&self, user_uuid: &str) -> Result<Option<Uuid>, StoreError> {
        let drafts = self.drafts.read().await;
        Ok(drafts
            .values()
            .find(|d| d.created_by == user_uuid)
            .and_then(|d| d.draft_id))
    }

    async fn find_drafts(
        &self,
        criteria: &BookingSearchCriteria,
    ) -> Result<Vec<Booking>, StoreError> {
        let drafts = self.drafts.read().await;
        Ok(drafts
            .values()
            .filter(|d| matches_criteria(d, criteria))
            .cloned()
            .collect())
    }

    async fn insert_draft(&self, draft: &Booking) -> Result<(), StoreError> {
        let draft_id = draft
            .draft_id
            .ok_or("draft id is required for draft insert")?;
        let mut drafts = self.drafts.write().await;
        if drafts.values().any(|d| d.created_by == draft.created_by) {
            return Err(format!("user {} already has a live draft", draft.created_by).into());
        }
        drafts.insert(draft_id, draft.clone());
        Ok(())
    }

    async fn update_draft(&self, draft: &Booking) -> Result<(), StoreError> {
        let draft_id = draft
            .draft_id
            .ok_or("draft id is required for draft update")?;
        let mut drafts = self.drafts.write().await;
        if !drafts.contains_key(&draft_id) {
            return Err(format!("draft {} does not exist", draft_id).into());
        }
        drafts.insert(draft_id, draft.clone());
        Ok(())
    }

    async fn delete_draft(&self, draft_id: Uuid) -> Result<(), StoreError> {
        let mut drafts = self.drafts.write().await;
        drafts.remove(&draft_id);
        Ok(())
    }
}

pub struct MemoryTimerHoldStore {
    holds: RwLock<Vec<TimerHold>>,
    ttl: Duration,
}

impl MemoryTimerHoldStore {
    pub fn new(ttl: Duration) -> Self {
        Self {
            holds: RwLock::new(Vec::new()),
            ttl,
        }
    }
}

#[async_trait]
impl TimerHoldStore for MemoryTimerHoldStore {
    async fn find_active_holds(
        &self,
        criteria: &SlotSearchCriteria,
        now: DateTime<Utc>,
    ) -> Result<Vec<TimerHold>, StoreError> {
        let holds = self.holds.read().await;
        Ok(holds
            .iter()
            .filter(|h| h.is_active(now))
            .filter(|h| h.slot.tenant_id == criteria.tenant_id)
            .filter(|h| slot_matches_search(&h.slot, criteria))
            .cloned()
            .collect())
    }

    async fn acquire_hold(
        &self,
        slot: &SlotDescriptor,
        holder_uuid: &str,
        booking_id: Option<Uuid>,
    ) -> Result<TimerHold, StoreError> {
        let mut holds = self.holds.write().await;
        let now = Utc::now();

        if let Some(existing) = holds.iter_mut().find(|h| &h.slot == slot && h.is_active(now)) {
            if existing.holder_uuid == holder_uuid {
                existing.expires_at = now + self.ttl;
                return Ok(existing.clone());
            }
            return Err(format!(
                "slot is already held by another user until {}",
                existing.expires_at
            )
            .into());
        }

        let hold = TimerHold {
            id: Uuid::new_v4(),
            booking_id,
            holder_uuid: holder_uuid.to_string(),
            slot: slot.clone(),
            created_at: now,
            expires_at: now + self.ttl,
        };
        holds.push(hold.clone());
        Ok(hold)
    }

    async fn assign_booking(
        &self,
        holder_uuid: &str,
        slots: &[SlotDescriptor],
        booking_id: Uuid,
    ) -> Result<(), StoreError> {
        let mut holds = self.holds.write().await;
        let now = Utc::now();
        for hold in holds.iter_mut() {
            if hold.holder_uuid == holder_uuid && hold.is_active(now) && slots.contains(&hold.slot)
            {
                hold.booking_id = Some(booking_id);
            }
        }
        Ok(())
    }

    async fn release_holds(&self, booking_id: Uuid) -> Result<(), StoreError> {
        let mut holds = self.holds.write().await;
        holds.retain(|h| h.booking_id != Some(booking_id));
        Ok(())
    }
}
