//! Full flow against the in-memory stores: availability → checkout hold →
//! booking creation → payment confirmation, checking what each user sees at
//! every step.

use std::sync::Arc;

use chrono::{Duration, NaiveDate, Utc};

use adslot_booking::{AvailabilityService, BookingManager};
use adslot_domain::crypto::PassthroughEncryption;
use adslot_domain::demand::NoopDemandService;
use adslot_domain::mdms::{MdmsData, StaticMasterData};
use adslot_domain::{
    ApplicantDetail, Booking, BookingStatus, PaymentDetail, SlotSearchCriteria, SlotStatus,
};
use adslot_store::{MemoryBookingStore, MemoryTimerHoldStore};

fn date(day: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(2024, 3, day).unwrap()
}

fn criteria(start: u32, end: u32) -> SlotSearchCriteria {
    SlotSearchCriteria {
        tenant_id: "pb.amritsar".to_string(),
        advertisement_type: "Hoarding".to_string(),
        location: "Mall Road".to_string(),
        face_area: "20x10".to_string(),
        night_light: true,
        booking_start_date: date(start),
        booking_end_date: date(end),
        booking_id: None,
        is_timer_required: false,
    }
}

struct Harness {
    availability: AvailabilityService,
    manager: BookingManager,
}

fn harness() -> Harness {
    let bookings = Arc::new(MemoryBookingStore::new());
    let timers = Arc::new(MemoryTimerHoldStore::new(Duration::minutes(30)));
    let master_data = Arc::new(StaticMasterData::new(MdmsData {
        advertisement_types: vec!["Hoarding".to_string()],
        locations: vec!["Mall Road".to_string()],
        face_areas: vec!["20x10".to_string()],
    }));

    Harness {
        availability: AvailabilityService::new(bookings.clone(), timers.clone()),
        manager: BookingManager::new(
            bookings,
            timers,
            master_data,
            Arc::new(PassthroughEncryption),
            Arc::new(NoopDemandService),
        ),
    }
}

fn booking_request(criteria: &SlotSearchCriteria, days: &[u32]) -> Booking {
    let slots = days.iter().map(|d| criteria.descriptor_for(date(*d))).collect();
    Booking::new(
        criteria.tenant_id.clone(),
        ApplicantDetail::new("Asha Verma", "9876543210"),
        slots,
        "placeholder",
    )
}

#[tokio::test]
async fn test_checkout_flow_end_to_end() {
    let h = harness();
    let alice = "alice-uuid";
    let bob = "bob-uuid";

    // 1. Alice checks availability for three days with a timer: all open,
    //    and holds are acquired on her behalf.
    let mut search = criteria(1, 3);
    search.is_timer_required = true;
    let grid = h.availability.slot_availability(&search, alice).await.unwrap();
    assert_eq!(grid.len(), 3);
    assert!(grid.iter().all(|c| c.status == SlotStatus::Available));

    // 2. Bob sees the same days blocked by Alice's timer; Alice still sees
    //    them open.
    let search = criteria(1, 3);
    let bob_grid = h.availability.slot_availability(&search, bob).await.unwrap();
    assert!(bob_grid.iter().all(|c| c.status == SlotStatus::Booked));
    assert!(bob_grid
        .iter()
        .all(|c| c.holder_uuid.as_deref() == Some(alice)));

    let alice_grid = h.availability.slot_availability(&search, alice).await.unwrap();
    assert!(alice_grid.iter().all(|c| c.status == SlotStatus::Available));

    // 3. Alice creates the booking; it enters PENDING_FOR_PAYMENT.
    let created = h
        .manager
        .create_booking(booking_request(&search, &[1, 2, 3]), alice)
        .await
        .unwrap();
    assert_eq!(created.status, BookingStatus::PendingForPayment);

    // 4. Payment lands; the synchronous update confirms the booking and
    //    releases the timer holds.
    let payment = PaymentDetail {
        receipt_number: "RCPT-1001".to_string(),
        receipt_date: Utc::now(),
    };
    let confirmed = h
        .manager
        .update_booking_synchronously(created.clone(), Some(payment), BookingStatus::Booked)
        .await
        .unwrap();
    assert_eq!(confirmed.status, BookingStatus::Booked);
    assert_eq!(confirmed.receipt_no.as_deref(), Some("RCPT-1001"));

    // 5. Bob now sees the days blocked by the confirmed booking itself.
    let bob_grid = h.availability.slot_availability(&search, bob).await.unwrap();
    assert!(bob_grid.iter().all(|c| c.status == SlotStatus::Booked));
    assert!(bob_grid
        .iter()
        .all(|c| c.booking_id == Some(confirmed.booking_id)));

    // 6. Editing her own booking, Alice sees her slots as selectable.
    let mut edit_search = criteria(1, 3);
    edit_search.booking_id = Some(confirmed.booking_id);
    let edit_grid = h
        .availability
        .slot_availability(&edit_search, alice)
        .await
        .unwrap();
    assert!(edit_grid.iter().all(|c| c.status == SlotStatus::Available));

    // 7. A day outside the booking stays open for Bob.
    let outside = h
        .availability
        .slot_availability(&criteria(4, 4), bob)
        .await
        .unwrap();
    assert_eq!(outside.len(), 1);
    assert_eq!(outside[0].status, SlotStatus::Available);
}

#[tokio::test]
async fn test_draft_promotion_flow() {
    let h = harness();
    let alice = "alice-uuid";

    // Alice saves a draft while deciding.
    let search = criteria(10, 12);
    let draft = h
        .manager
        .upsert_draft(booking_request(&search, &[10, 11, 12]), alice)
        .await
        .unwrap();
    let draft_id = draft.draft_id.expect("draft id assigned");

    // Promotion consumes the draft.
    let mut request = booking_request(&search, &[10, 11, 12]);
    request.draft_id = Some(draft_id);
    let created = h.manager.create_booking(request, alice).await.unwrap();
    assert_eq!(created.draft_id, Some(draft_id));

    let drafts = h
        .manager
        .draft_applications(&Default::default())
        .await
        .unwrap();
    assert!(drafts.is_empty());

    // Discarding the consumed draft again is a harmless no-op.
    h.manager.discard_draft(Some(draft_id)).await.unwrap();
}
