pub mod booking;
pub mod crypto;
pub mod demand;
pub mod hold;
pub mod mdms;
pub mod repository;
pub mod search;
pub mod slot;

pub use booking::{ApplicantDetail, Booking, BookingStatus};
pub use hold::TimerHold;
pub use search::{BookingSearchCriteria, PaymentDetail, SlotSearchCriteria};
pub use slot::{SlotAvailability, SlotDescriptor, SlotStatus};
