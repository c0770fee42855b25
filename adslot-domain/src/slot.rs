use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Identity key of a bookable slot: one advertisement face on one calendar
/// day, scoped to a tenant. Two descriptors name the same slot iff every
/// field matches.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SlotDescriptor {
    pub advertisement_type: String,
    pub location: String,
    pub face_area: String,
    pub night_light: bool,
    pub booking_date: NaiveDate,
    pub tenant_id: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SlotStatus {
    Available,
    Booked,
}

/// Per-day availability as seen by one requester. Computed fresh for every
/// query, never persisted.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SlotAvailability {
    #[serde(flatten)]
    pub slot: SlotDescriptor,
    pub status: SlotStatus,
    /// Confirmed booking occupying the slot, when there is one.
    pub booking_id: Option<Uuid>,
    /// User whose payment timer currently holds the slot.
    pub holder_uuid: Option<String>,
}

impl SlotAvailability {
    pub fn available(slot: SlotDescriptor) -> Self {
        Self {
            slot,
            status: SlotStatus::Available,
            booking_id: None,
            holder_uuid: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn descriptor(date: NaiveDate) -> SlotDescriptor {
        SlotDescriptor {
            advertisement_type: "Hoarding".to_string(),
            location: "Mall Road".to_string(),
            face_area: "20x10".to_string(),
            night_light: true,
            booking_date: date,
            tenant_id: "pb.amritsar".to_string(),
        }
    }

    #[test]
    fn test_descriptor_identity_is_all_six_fields() {
        let date = NaiveDate::from_ymd_opt(2024, 1, 2).unwrap();
        let a = descriptor(date);
        let b = descriptor(date);
        assert_eq!(a, b);

        let mut c = descriptor(date);
        c.night_light = false;
        assert_ne!(a, c);

        let d = descriptor(NaiveDate::from_ymd_opt(2024, 1, 3).unwrap());
        assert_ne!(a, d);
    }
}
