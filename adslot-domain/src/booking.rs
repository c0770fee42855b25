use adslot_shared::pii::Masked;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

use crate::slot::SlotDescriptor;

/// Booking lifecycle status.
///
/// `Draft` is an unsubmitted application; `PendingForPayment` is a created
/// booking waiting on the payment timer; `Booked` and `Expired` are
/// terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum BookingStatus {
    Draft,
    PendingForPayment,
    Booked,
    Expired,
}

impl BookingStatus {
    pub fn is_terminal(self) -> bool {
        matches!(self, BookingStatus::Booked | BookingStatus::Expired)
    }

    /// Legal lifecycle moves. Re-stamping the current status is allowed so
    /// document-only updates do not need a separate path.
    pub fn can_transition_to(self, next: BookingStatus) -> bool {
        use BookingStatus::*;
        match (self, next) {
            (Draft, PendingForPayment) => true,
            (Draft, Expired) => true,
            (PendingForPayment, Booked) => true,
            (PendingForPayment, Expired) => true,
            (from, to) => from == to,
        }
    }
}

impl fmt::Display for BookingStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            BookingStatus::Draft => "DRAFT",
            BookingStatus::PendingForPayment => "PENDING_FOR_PAYMENT",
            BookingStatus::Booked => "BOOKED",
            BookingStatus::Expired => "EXPIRED",
        };
        f.write_str(s)
    }
}

impl FromStr for BookingStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "DRAFT" => Ok(BookingStatus::Draft),
            "PENDING_FOR_PAYMENT" => Ok(BookingStatus::PendingForPayment),
            "BOOKED" => Ok(BookingStatus::Booked),
            "EXPIRED" => Ok(BookingStatus::Expired),
            other => Err(format!("unknown booking status '{other}'")),
        }
    }
}

/// Applicant contact details. PII: masked in logs, encrypted at rest.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApplicantDetail {
    pub name: Masked<String>,
    pub mobile_number: Masked<String>,
}

impl ApplicantDetail {
    pub fn new(name: impl Into<String>, mobile_number: impl Into<String>) -> Self {
        Self {
            name: Masked(name.into()),
            mobile_number: Masked(mobile_number.into()),
        }
    }
}

/// An advertisement booking. Mutated only through the lifecycle manager;
/// never deleted once confirmed.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Booking {
    pub booking_id: Uuid,
    pub booking_no: String,
    /// Draft this booking was promoted from, consumed on creation.
    pub draft_id: Option<Uuid>,
    pub tenant_id: String,
    pub applicant: ApplicantDetail,
    pub slots: Vec<SlotDescriptor>,
    pub status: BookingStatus,
    pub permission_letter_filestore_id: Option<String>,
    pub payment_receipt_filestore_id: Option<String>,
    pub receipt_no: Option<String>,
    pub payment_date: Option<DateTime<Utc>>,
    pub created_by: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Booking {
    /// A fresh application in `Draft` status. Identifiers beyond the
    /// booking id are assigned by the lifecycle manager.
    pub fn new(
        tenant_id: impl Into<String>,
        applicant: ApplicantDetail,
        slots: Vec<SlotDescriptor>,
        created_by: impl Into<String>,
    ) -> Self {
        let now = Utc::now();
        Self {
            booking_id: Uuid::new_v4(),
            booking_no: String::new(),
            draft_id: None,
            tenant_id: tenant_id.into(),
            applicant,
            slots,
            status: BookingStatus::Draft,
            permission_letter_filestore_id: None,
            payment_receipt_filestore_id: None,
            receipt_no: None,
            payment_date: None,
            created_by: created_by.into(),
            created_at: now,
            updated_at: now,
        }
    }

    pub fn covers_slot(&self, slot: &SlotDescriptor) -> bool {
        self.slots.iter().any(|s| s == slot)
    }
}
