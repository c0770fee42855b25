//! Booking lifecycle: draft → pending-for-payment → booked/expired. All
//! collaborators are passed in at construction; the manager decides what to
//! write and the stores decide how to serialize the writes.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use uuid::Uuid;

use adslot_domain::crypto::EncryptionService;
use adslot_domain::demand::DemandService;
use adslot_domain::mdms::{MasterDataService, MdmsData};
use adslot_domain::repository::{BookingStore, StoreError, TimerHoldStore};
use adslot_domain::{
    ApplicantDetail, Booking, BookingSearchCriteria, BookingStatus, PaymentDetail,
};
use adslot_shared::pii::Masked;
use adslot_shared::tenancy;

#[derive(Debug, thiserror::Error)]
pub enum BookingError {
    #[error("invalid tenant id '{0}': a city-level tenant like 'pb.amritsar' is required")]
    InvalidTenant(String),

    #[error("no booking found for booking no {0}")]
    NotFound(String),

    #[error("validation failed: {0}")]
    Validation(String),

    #[error("invalid state transition from {from} to {to}")]
    InvalidTransition {
        from: BookingStatus,
        to: BookingStatus,
    },

    #[error("store error: {0}")]
    Store(#[from] StoreError),
}

pub struct BookingManager {
    bookings: Arc<dyn BookingStore>,
    timers: Arc<dyn TimerHoldStore>,
    master_data: Arc<dyn MasterDataService>,
    encryption: Arc<dyn EncryptionService>,
    demands: Arc<dyn DemandService>,
}

impl BookingManager {
    pub fn new(
        bookings: Arc<dyn BookingStore>,
        timers: Arc<dyn TimerHoldStore>,
        master_data: Arc<dyn MasterDataService>,
        encryption: Arc<dyn EncryptionService>,
        demands: Arc<dyn DemandService>,
    ) -> Self {
        Self {
            bookings,
            timers,
            master_data,
            encryption,
            demands,
        }
    }

    /// Create a booking in `PendingForPayment`. Consumes the draft it was
    /// promoted from and ties the requester's live timer holds to the new
    /// booking id.
    pub async fn create_booking(
        &self,
        mut booking: Booking,
        requester_uuid: &str,
    ) -> Result<Booking, BookingError> {
        tracing::info!(tenant = %booking.tenant_id, user = %requester_uuid, "creating advertisement booking");

        if !tenancy::is_city_tenant(&booking.tenant_id) {
            return Err(BookingError::InvalidTenant(booking.tenant_id.clone()));
        }
        let state_tenant = tenancy::state_tenant(&booking.tenant_id);

        let master_data = self.master_data.fetch(state_tenant).await?;
        validate_create(&booking, &master_data)?;

        let draft_id = booking.draft_id;
        let now = Utc::now();
        booking.booking_id = Uuid::new_v4();
        booking.booking_no = next_booking_no(now);
        booking.status = BookingStatus::PendingForPayment;
        booking.created_by = requester_uuid.to_string();
        booking.created_at = now;
        booking.updated_at = now;

        booking.applicant = self.encryption.encrypt_applicant(&booking.applicant).await?;

        self.demands.create_demand(&booking).await?;
        self.bookings.insert(&booking).await?;

        self.timers
            .assign_booking(requester_uuid, &booking.slots, booking.booking_id)
            .await?;

        if let Some(draft_id) = draft_id {
            tracing::info!(%draft_id, "consuming draft after booking creation");
            self.bookings.delete_draft(draft_id).await?;
        }

        booking.applicant = self.encryption.decrypt_applicant(&booking.applicant).await?;
        Ok(booking)
    }

    /// Queued update: the persist is acknowledged but not ordered against
    /// other writers.
    pub async fn update_booking(
        &self,
        incoming: Booking,
        payment: Option<PaymentDetail>,
        status: BookingStatus,
    ) -> Result<Booking, BookingError> {
        self.apply_update(incoming, payment, status, false).await
    }

    /// Transactional update for callers that must observe the write before
    /// returning, e.g. payment confirmation.
    pub async fn update_booking_synchronously(
        &self,
        incoming: Booking,
        payment: Option<PaymentDetail>,
        status: BookingStatus,
    ) -> Result<Booking, BookingError> {
        self.apply_update(incoming, payment, status, true).await
    }

    async fn apply_update(
        &self,
        incoming: Booking,
        payment: Option<PaymentDetail>,
        status: BookingStatus,
        synchronous: bool,
    ) -> Result<Booking, BookingError> {
        if incoming.booking_no.is_empty() {
            return Err(BookingError::Validation(
                "booking no is required for update".to_string(),
            ));
        }
        tracing::info!(booking_no = %incoming.booking_no, %status, "updating booking");

        let mut stored = self
            .bookings
            .find_by_booking_no(&incoming.booking_no)
            .await?
            .ok_or_else(|| BookingError::NotFound(incoming.booking_no.clone()))?;

        if !stored.status.can_transition_to(status) {
            return Err(BookingError::InvalidTransition {
                from: stored.status,
                to: status,
            });
        }

        // File references are written once; an already-stored id wins.
        if stored.permission_letter_filestore_id.is_none() {
            stored.permission_letter_filestore_id = incoming.permission_letter_filestore_id;
        }
        if stored.payment_receipt_filestore_id.is_none() {
            stored.payment_receipt_filestore_id = incoming.payment_receipt_filestore_id;
        }

        stored.status = status;
        stored.updated_at = Utc::now();

        if let Some(payment) = payment {
            stored.receipt_no = Some(payment.receipt_number);
            stored.payment_date = Some(payment.receipt_date);
        }

        if synchronous {
            self.bookings.update_synchronously(&stored).await?;
        } else {
            self.bookings.update(&stored).await?;
        }

        // A confirmed booking no longer needs its payment timer.
        if stored.status == BookingStatus::Booked {
            self.timers.release_holds(stored.booking_id).await?;
        }

        Ok(stored)
    }

    /// Booking search. PII criteria are encrypted to match stored values;
    /// results come back decrypted.
    pub async fn search_bookings(
        &self,
        criteria: &BookingSearchCriteria,
    ) -> Result<Vec<Booking>, BookingError> {
        let mut criteria = criteria.clone();

        if criteria.applicant_name.is_some() || criteria.mobile_number.is_some() {
            let probe = ApplicantDetail {
                name: Masked(criteria.applicant_name.clone().unwrap_or_default()),
                mobile_number: Masked(criteria.mobile_number.clone().unwrap_or_default()),
            };
            let encrypted = self.encryption.encrypt_applicant(&probe).await?;
            if criteria.applicant_name.is_some() {
                criteria.applicant_name = Some(encrypted.name.expose().clone());
            }
            if criteria.mobile_number.is_some() {
                criteria.mobile_number = Some(encrypted.mobile_number.expose().clone());
            }
        }

        let mut results = self.bookings.search(&criteria).await?;
        for booking in &mut results {
            booking.applicant = self.encryption.decrypt_applicant(&booking.applicant).await?;
        }
        Ok(results)
    }

    pub async fn booking_count(
        &self,
        criteria: &BookingSearchCriteria,
    ) -> Result<u64, BookingError> {
        Ok(self.bookings.count(criteria).await?)
    }

    /// Draft upsert. With a draft id the draft is updated in place; without
    /// one a fresh draft is inserted only if the user has none yet
    /// (insert-or-skip; the store's uniqueness constraint closes the window
    /// this read leaves open).
    pub async fn upsert_draft(
        &self,
        mut draft: Booking,
        requester_uuid: &str,
    ) -> Result<Booking, BookingError> {
        draft.status = BookingStatus::Draft;
        draft.updated_at = Utc::now();

        if let Some(draft_id) = draft.draft_id {
            tracing::info!(%draft_id, "updating draft application");
            self.bookings.update_draft(&draft).await?;
            return Ok(draft);
        }

        draft.draft_id = Some(Uuid::new_v4());
        draft.created_by = requester_uuid.to_string();
        draft.created_at = draft.updated_at;

        match self.bookings.find_draft_by_user(requester_uuid).await? {
            Some(existing) => {
                tracing::info!(draft_id = %existing, "user already has a live draft, skipping insert");
                draft.draft_id = Some(existing);
            }
            None => self.bookings.insert_draft(&draft).await?,
        }
        Ok(draft)
    }

    pub async fn draft_applications(
        &self,
        criteria: &BookingSearchCriteria,
    ) -> Result<Vec<Booking>, BookingError> {
        Ok(self.bookings.find_drafts(criteria).await?)
    }

    /// Idempotent: a blank draft id and an already-deleted draft are both
    /// no-ops.
    pub async fn discard_draft(&self, draft_id: Option<Uuid>) -> Result<(), BookingError> {
        let Some(draft_id) = draft_id else {
            return Ok(());
        };
        tracing::info!(%draft_id, "discarding draft application");
        self.bookings.delete_draft(draft_id).await?;
        Ok(())
    }
}

fn validate_create(booking: &Booking, master_data: &MdmsData) -> Result<(), BookingError> {
    if booking.slots.is_empty() {
        return Err(BookingError::Validation(
            "at least one slot is required".to_string(),
        ));
    }
    if booking.applicant.name.expose().trim().is_empty() {
        return Err(BookingError::Validation(
            "applicant name is required".to_string(),
        ));
    }
    for slot in &booking.slots {
        if slot.tenant_id != booking.tenant_id {
            return Err(BookingError::Validation(format!(
                "slot tenant '{}' does not match booking tenant '{}'",
                slot.tenant_id, booking.tenant_id
            )));
        }
        if !master_data
            .advertisement_types
            .contains(&slot.advertisement_type)
        {
            return Err(BookingError::Validation(format!(
                "unknown advertisement type '{}'",
                slot.advertisement_type
            )));
        }
        if !master_data.locations.contains(&slot.location) {
            return Err(BookingError::Validation(format!(
                "unknown location '{}'",
                slot.location
            )));
        }
        if !master_data.face_areas.contains(&slot.face_area) {
            return Err(BookingError::Validation(format!(
                "unknown face area '{}'",
                slot.face_area
            )));
        }
    }
    Ok(())
}

fn next_booking_no(now: DateTime<Utc>) -> String {
    let suffix = Uuid::new_v4().simple().to_string();
    format!("ADV-{}-{}", now.format("%Y%m%d"), &suffix[..8])
}

#[cfg(test)]
mod tests {
    use super::*;
    use adslot_domain::crypto::PassthroughEncryption;
    use adslot_domain::demand::NoopDemandService;
    use adslot_domain::mdms::StaticMasterData;
    use adslot_domain::{SlotDescriptor, SlotSearchCriteria};
    use adslot_store::{MemoryBookingStore, MemoryTimerHoldStore};
    use async_trait::async_trait;
    use chrono::{Duration, NaiveDate};

    fn master_data() -> MdmsData {
        MdmsData {
            advertisement_types: vec!["Hoarding".to_string(), "Unipole".to_string()],
            locations: vec!["Mall Road".to_string(), "Station Road".to_string()],
            face_areas: vec!["20x10".to_string(), "40x20".to_string()],
        }
    }

    fn slot(day: u32) -> SlotDescriptor {
        SlotDescriptor {
            advertisement_type: "Hoarding".to_string(),
            location: "Mall Road".to_string(),
            face_area: "20x10".to_string(),
            night_light: false,
            booking_date: NaiveDate::from_ymd_opt(2024, 1, day).unwrap(),
            tenant_id: "pb.amritsar".to_string(),
        }
    }

    fn request(tenant: &str) -> Booking {
        let mut slots = vec![slot(1), slot(2)];
        for s in &mut slots {
            s.tenant_id = tenant.to_string();
        }
        Booking::new(
            tenant,
            ApplicantDetail::new("Asha Verma", "9876543210"),
            slots,
            "placeholder",
        )
    }

    struct Fixture {
        manager: BookingManager,
        bookings: Arc<MemoryBookingStore>,
        timers: Arc<MemoryTimerHoldStore>,
    }

    fn fixture() -> Fixture {
        fixture_with_encryption(Arc::new(PassthroughEncryption))
    }

    fn fixture_with_encryption(encryption: Arc<dyn EncryptionService>) -> Fixture {
        let bookings = Arc::new(MemoryBookingStore::new());
        let timers = Arc::new(MemoryTimerHoldStore::new(Duration::minutes(30)));
        let manager = BookingManager::new(
            bookings.clone(),
            timers.clone(),
            Arc::new(StaticMasterData::new(master_data())),
            encryption,
            Arc::new(NoopDemandService),
        );
        Fixture {
            manager,
            bookings,
            timers,
        }
    }

    #[tokio::test]
    async fn test_create_enters_pending_for_payment() {
        let fx = fixture();
        let created = fx
            .manager
            .create_booking(request("pb.amritsar"), "user-1")
            .await
            .unwrap();

        assert_eq!(created.status, BookingStatus::PendingForPayment);
        assert!(created.booking_no.starts_with("ADV-"));
        assert_eq!(created.created_by, "user-1");

        let stored = fx
            .bookings
            .find_by_booking_no(&created.booking_no)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(stored.booking_id, created.booking_id);
    }

    #[tokio::test]
    async fn test_create_rejects_bare_tenant() {
        let fx = fixture();
        let err = fx
            .manager
            .create_booking(request("pb"), "user-1")
            .await
            .unwrap_err();
        assert!(matches!(err, BookingError::InvalidTenant(t) if t == "pb"));
    }

    #[tokio::test]
    async fn test_create_rejects_values_outside_master_data() {
        let fx = fixture();
        let mut req = request("pb.amritsar");
        req.slots[0].advertisement_type = "Blimp".to_string();

        let err = fx.manager.create_booking(req, "user-1").await.unwrap_err();
        assert!(matches!(err, BookingError::Validation(_)));
    }

    #[tokio::test]
    async fn test_create_consumes_draft_and_links_holds() {
        let fx = fixture();

        // The user held both slots during checkout and has a saved draft.
        let draft = fx
            .manager
            .upsert_draft(request("pb.amritsar"), "user-1")
            .await
            .unwrap();
        let draft_id = draft.draft_id.unwrap();
        for s in [slot(1), slot(2)] {
            fx.timers.acquire_hold(&s, "user-1", None).await.unwrap();
        }

        let mut req = request("pb.amritsar");
        req.draft_id = Some(draft_id);
        let created = fx.manager.create_booking(req, "user-1").await.unwrap();

        // Draft consumed exactly once.
        assert!(fx
            .bookings
            .find_draft_by_user("user-1")
            .await
            .unwrap()
            .is_none());

        // Holds now carry the booking id.
        let criteria = SlotSearchCriteria {
            tenant_id: "pb.amritsar".to_string(),
            advertisement_type: "Hoarding".to_string(),
            location: "Mall Road".to_string(),
            face_area: "20x10".to_string(),
            night_light: false,
            booking_start_date: NaiveDate::from_ymd_opt(2024, 1, 1).unwrap(),
            booking_end_date: NaiveDate::from_ymd_opt(2024, 1, 2).unwrap(),
            booking_id: None,
            is_timer_required: false,
        };
        let holds = fx
            .timers
            .find_active_holds(&criteria, Utc::now())
            .await
            .unwrap();
        assert_eq!(holds.len(), 2);
        assert!(holds.iter().all(|h| h.booking_id == Some(created.booking_id)));
    }

    #[tokio::test]
    async fn test_update_requires_known_booking_no() {
        let fx = fixture();
        let mut incoming = request("pb.amritsar");
        incoming.booking_no = "ADV-UNKNOWN".to_string();

        let err = fx
            .manager
            .update_booking(incoming, None, BookingStatus::Booked)
            .await
            .unwrap_err();
        assert!(matches!(err, BookingError::NotFound(no) if no == "ADV-UNKNOWN"));
    }

    #[tokio::test]
    async fn test_update_merges_file_ids_fill_only_if_empty() {
        let fx = fixture();
        let created = fx
            .manager
            .create_booking(request("pb.amritsar"), "user-1")
            .await
            .unwrap();

        // First update attaches a permission letter.
        let mut first = created.clone();
        first.permission_letter_filestore_id = Some("file-1".to_string());
        fx.manager
            .update_booking(first, None, BookingStatus::PendingForPayment)
            .await
            .unwrap();

        // A later request with a different id must not overwrite it, but an
        // empty stored field adopts the incoming value.
        let mut second = created.clone();
        second.permission_letter_filestore_id = Some("file-2".to_string());
        second.payment_receipt_filestore_id = Some("receipt-9".to_string());
        let updated = fx
            .manager
            .update_booking(second, None, BookingStatus::PendingForPayment)
            .await
            .unwrap();

        assert_eq!(updated.permission_letter_filestore_id.as_deref(), Some("file-1"));
        assert_eq!(updated.payment_receipt_filestore_id.as_deref(), Some("receipt-9"));
    }

    #[tokio::test]
    async fn test_payment_confirmation_stamps_receipt_and_releases_holds() {
        let fx = fixture();
        let created = fx
            .manager
            .create_booking(request("pb.amritsar"), "user-1")
            .await
            .unwrap();
        fx.timers
            .acquire_hold(&slot(1), "user-1", Some(created.booking_id))
            .await
            .unwrap();

        let payment = PaymentDetail {
            receipt_number: "RCPT-42".to_string(),
            receipt_date: Utc::now(),
        };
        let confirmed = fx
            .manager
            .update_booking_synchronously(created.clone(), Some(payment), BookingStatus::Booked)
            .await
            .unwrap();

        assert_eq!(confirmed.status, BookingStatus::Booked);
        assert_eq!(confirmed.receipt_no.as_deref(), Some("RCPT-42"));
        assert!(confirmed.payment_date.is_some());

        let criteria = SlotSearchCriteria {
            tenant_id: "pb.amritsar".to_string(),
            advertisement_type: "Hoarding".to_string(),
            location: "Mall Road".to_string(),
            face_area: "20x10".to_string(),
            night_light: false,
            booking_start_date: NaiveDate::from_ymd_opt(2024, 1, 1).unwrap(),
            booking_end_date: NaiveDate::from_ymd_opt(2024, 1, 2).unwrap(),
            booking_id: None,
            is_timer_required: false,
        };
        let holds = fx
            .timers
            .find_active_holds(&criteria, Utc::now())
            .await
            .unwrap();
        assert!(holds.is_empty());
    }

    #[tokio::test]
    async fn test_update_refuses_illegal_transition() {
        let fx = fixture();
        let created = fx
            .manager
            .create_booking(request("pb.amritsar"), "user-1")
            .await
            .unwrap();

        let err = fx
            .manager
            .update_booking(created.clone(), None, BookingStatus::Draft)
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            BookingError::InvalidTransition {
                from: BookingStatus::PendingForPayment,
                to: BookingStatus::Draft,
            }
        ));
    }

    #[tokio::test]
    async fn test_draft_upsert_is_insert_or_skip() {
        let fx = fixture();

        let first = fx
            .manager
            .upsert_draft(request("pb.amritsar"), "user-1")
            .await
            .unwrap();
        let first_id = first.draft_id.unwrap();

        // No draft id on the second request: the existing draft wins.
        let second = fx
            .manager
            .upsert_draft(request("pb.amritsar"), "user-1")
            .await
            .unwrap();
        assert_eq!(second.draft_id, Some(first_id));

        // With the draft id supplied, the draft is updated in place.
        let mut edit = request("pb.amritsar");
        edit.draft_id = Some(first_id);
        edit.applicant = ApplicantDetail::new("Ravi Kumar", "9000000000");
        fx.manager.upsert_draft(edit, "user-1").await.unwrap();

        let drafts = fx
            .manager
            .draft_applications(&BookingSearchCriteria {
                created_by: Some("user-1".to_string()),
                ..Default::default()
            })
            .await
            .unwrap();
        assert_eq!(drafts.len(), 1);
        assert_eq!(drafts[0].applicant.name.expose(), "Ravi Kumar");
    }

    #[tokio::test]
    async fn test_discard_draft_is_idempotent() {
        let fx = fixture();
        let draft = fx
            .manager
            .upsert_draft(request("pb.amritsar"), "user-1")
            .await
            .unwrap();
        let draft_id = draft.draft_id;

        fx.manager.discard_draft(draft_id).await.unwrap();
        // Second discard of the same id, and a blank discard: both no-ops.
        fx.manager.discard_draft(draft_id).await.unwrap();
        fx.manager.discard_draft(None).await.unwrap();

        assert!(fx
            .bookings
            .find_draft_by_user("user-1")
            .await
            .unwrap()
            .is_none());
    }

    /// Marks values so the test can observe which side of the boundary a
    /// field crossed.
    struct TaggingEncryption;

    #[async_trait]
    impl EncryptionService for TaggingEncryption {
        async fn encrypt_applicant(
            &self,
            applicant: &ApplicantDetail,
        ) -> Result<ApplicantDetail, StoreError> {
            Ok(ApplicantDetail::new(
                format!("enc:{}", applicant.name.expose()),
                format!("enc:{}", applicant.mobile_number.expose()),
            ))
        }

        async fn decrypt_applicant(
            &self,
            applicant: &ApplicantDetail,
        ) -> Result<ApplicantDetail, StoreError> {
            Ok(ApplicantDetail::new(
                applicant.name.expose().trim_start_matches("enc:"),
                applicant.mobile_number.expose().trim_start_matches("enc:"),
            ))
        }
    }

    #[tokio::test]
    async fn test_search_encrypts_pii_criteria_and_decrypts_results() {
        let fx = fixture_with_encryption(Arc::new(TaggingEncryption));
        let created = fx
            .manager
            .create_booking(request("pb.amritsar"), "user-1")
            .await
            .unwrap();
        // The manager returned the decrypted view.
        assert_eq!(created.applicant.name.expose(), "Asha Verma");

        // Searching by the plaintext name must hit the encrypted row.
        let results = fx
            .manager
            .search_bookings(&BookingSearchCriteria {
                applicant_name: Some("Asha Verma".to_string()),
                ..Default::default()
            })
            .await
            .unwrap();
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].applicant.name.expose(), "Asha Verma");

        // A name that never existed still misses.
        let results = fx
            .manager
            .search_bookings(&BookingSearchCriteria {
                applicant_name: Some("Nobody".to_string()),
                ..Default::default()
            })
            .await
            .unwrap();
        assert!(results.is_empty());
    }
}
