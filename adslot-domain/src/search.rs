use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::booking::BookingStatus;
use crate::slot::SlotDescriptor;

/// Criteria for the slot-availability computation: the descriptor fields a
/// caller wants to book, over an inclusive date range.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SlotSearchCriteria {
    pub tenant_id: String,
    pub advertisement_type: String,
    pub location: String,
    pub face_area: String,
    pub night_light: bool,
    pub booking_start_date: NaiveDate,
    pub booking_end_date: NaiveDate,
    /// Set when the caller is editing an existing booking; its own slots
    /// then render as available to it.
    pub booking_id: Option<Uuid>,
    /// When set, payment-timer holds are acquired for the open cells after
    /// the availability read.
    #[serde(default)]
    pub is_timer_required: bool,
}

impl SlotSearchCriteria {
    /// The candidate descriptor for one day of this search.
    pub fn descriptor_for(&self, date: NaiveDate) -> SlotDescriptor {
        SlotDescriptor {
            advertisement_type: self.advertisement_type.clone(),
            location: self.location.clone(),
            face_area: self.face_area.clone(),
            night_light: self.night_light,
            booking_date: date,
            tenant_id: self.tenant_id.clone(),
        }
    }
}

/// Filter for booking searches. PII fields are encrypted before they reach
/// the store.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct BookingSearchCriteria {
    pub tenant_id: Option<String>,
    pub booking_no: Option<String>,
    pub applicant_name: Option<String>,
    pub mobile_number: Option<String>,
    pub status: Option<BookingStatus>,
    pub created_by: Option<String>,
}

/// Receipt details forwarded by the payment gateway on successful payment.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PaymentDetail {
    pub receipt_number: String,
    pub receipt_date: DateTime<Utc>,
}
