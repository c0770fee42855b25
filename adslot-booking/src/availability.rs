//! Slot-availability computation: expand the requested date range, build a
//! baseline grid of open cells, then overlay confirmed bookings and active
//! payment-timer holds. Each stage is a pure function returning a new
//! sequence; the service composes them left-to-right.

use std::sync::Arc;

use chrono::{NaiveDate, Utc};
use uuid::Uuid;

use adslot_domain::repository::{BookingStore, StoreError, TimerHoldStore};
use adslot_domain::{Booking, SlotAvailability, SlotSearchCriteria, SlotStatus, TimerHold};

/// Longest window a single availability query (and booking) may span.
pub const MAX_BOOKING_DAYS: i64 = 90;

#[derive(Debug, thiserror::Error)]
pub enum AvailabilityError {
    #[error("booking is not allowed for {days} days: the window is capped at 90")]
    InvalidRange { days: i64 },

    #[error("store error: {0}")]
    Store(#[from] StoreError),
}

/// Inclusive ascending calendar days from `start` to `end`. Empty when the
/// start falls after the end; fails once the window exceeds the cap.
pub fn expand_date_range(
    start: NaiveDate,
    end: NaiveDate,
) -> Result<Vec<NaiveDate>, AvailabilityError> {
    if start > end {
        return Ok(Vec::new());
    }
    let days = (end - start).num_days() + 1;
    if days > MAX_BOOKING_DAYS {
        return Err(AvailabilityError::InvalidRange { days });
    }
    Ok(start.iter_days().take(days as usize).collect())
}

/// Baseline grid: one open cell per day carrying the criteria's descriptor.
pub fn build_slot_grid(criteria: &SlotSearchCriteria, dates: &[NaiveDate]) -> Vec<SlotAvailability> {
    dates
        .iter()
        .map(|date| SlotAvailability::available(criteria.descriptor_for(*date)))
        .collect()
}

/// Mark cells occupied by confirmed bookings. A caller editing its own
/// booking (`editing_booking_id`) sees that booking's slots as selectable.
pub fn merge_confirmed_bookings(
    grid: Vec<SlotAvailability>,
    confirmed: &[Booking],
    editing_booking_id: Option<Uuid>,
) -> Vec<SlotAvailability> {
    grid.into_iter()
        .map(|mut cell| {
            if let Some(owner) = confirmed.iter().find(|b| b.covers_slot(&cell.slot)) {
                cell.status = SlotStatus::Booked;
                cell.booking_id = Some(owner.booking_id);
            }
            if editing_booking_id.is_some() && cell.booking_id == editing_booking_id {
                cell.status = SlotStatus::Available;
            }
            cell
        })
        .collect()
}

/// Overlay active payment-timer holds. Runs strictly after the confirmed
/// merge: cells already attributed to a confirmed booking are settled and
/// holds only escalate open cells. The requester's own holds render as
/// available to them.
pub fn merge_timer_holds(
    grid: Vec<SlotAvailability>,
    holds: &[TimerHold],
    requester_uuid: &str,
) -> Vec<SlotAvailability> {
    grid.into_iter()
        .map(|mut cell| {
            if cell.status == SlotStatus::Booked && cell.booking_id.is_some() {
                return cell;
            }
            let matched = holds.iter().find(|hold| {
                hold.slot.advertisement_type == cell.slot.advertisement_type
                    && hold.slot.location == cell.slot.location
                    && hold.slot.face_area == cell.slot.face_area
                    && hold.slot.night_light == cell.slot.night_light
                    && hold.slot.booking_date == cell.slot.booking_date
            });
            if let Some(hold) = matched {
                cell.status = SlotStatus::Booked;
                cell.holder_uuid = Some(hold.holder_uuid.clone());
            }
            if cell.holder_uuid.as_deref() == Some(requester_uuid) {
                cell.status = SlotStatus::Available;
            }
            cell
        })
        .collect()
}

/// Read-side availability over the booking and timer stores.
pub struct AvailabilityService {
    bookings: Arc<dyn BookingStore>,
    timers: Arc<dyn TimerHoldStore>,
}

impl AvailabilityService {
    pub fn new(bookings: Arc<dyn BookingStore>, timers: Arc<dyn TimerHoldStore>) -> Self {
        Self { bookings, timers }
    }

    /// Availability for every day in the criteria's range, as seen by
    /// `requester_uuid`. When the criteria asks for a timer, holds are
    /// acquired for the cells still open after the merge.
    pub async fn slot_availability(
        &self,
        criteria: &SlotSearchCriteria,
        requester_uuid: &str,
    ) -> Result<Vec<SlotAvailability>, AvailabilityError> {
        let dates = expand_date_range(criteria.booking_start_date, criteria.booking_end_date)?;
        let grid = build_slot_grid(criteria, &dates);

        let confirmed = self.bookings.find_confirmed_bookings(criteria).await?;
        let grid = merge_confirmed_bookings(grid, &confirmed, criteria.booking_id);

        let holds = self.timers.find_active_holds(criteria, Utc::now()).await?;
        let grid = merge_timer_holds(grid, &holds, requester_uuid);

        tracing::info!(
            tenant = %criteria.tenant_id,
            location = %criteria.location,
            days = grid.len(),
            "computed slot availability"
        );

        if criteria.is_timer_required {
            self.acquire_holds(&grid, requester_uuid, criteria.booking_id)
                .await?;
        }

        Ok(grid)
    }

    /// Claim payment-timer holds for every cell still open in `grid`.
    /// Side-effecting; kept separate from the pure merge stages.
    pub async fn acquire_holds(
        &self,
        grid: &[SlotAvailability],
        requester_uuid: &str,
        booking_id: Option<Uuid>,
    ) -> Result<Vec<TimerHold>, AvailabilityError> {
        let mut acquired = Vec::new();
        for cell in grid.iter().filter(|c| c.status == SlotStatus::Available) {
            let hold = self
                .timers
                .acquire_hold(&cell.slot, requester_uuid, booking_id)
                .await?;
            acquired.push(hold);
        }
        if !acquired.is_empty() {
            tracing::info!(user = %requester_uuid, holds = acquired.len(), "acquired payment-timer holds");
        }
        Ok(acquired)
    }
}
