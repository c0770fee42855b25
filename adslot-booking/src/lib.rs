pub mod availability;
pub mod manager;

pub use availability::{
    build_slot_grid, expand_date_range, merge_confirmed_bookings, merge_timer_holds,
    AvailabilityError, AvailabilityService, MAX_BOOKING_DAYS,
};
pub use manager::{BookingError, BookingManager};
