use async_trait::async_trait;

use crate::booking::Booking;
use crate::repository::StoreError;

/// Billing collaborator: raises the payment demand a created booking is
/// waiting on.
#[async_trait]
pub trait DemandService: Send + Sync {
    async fn create_demand(&self, booking: &Booking) -> Result<(), StoreError>;
}

/// Skips demand generation. Used by tests and local runs.
pub struct NoopDemandService;

#[async_trait]
impl DemandService for NoopDemandService {
    async fn create_demand(&self, booking: &Booking) -> Result<(), StoreError> {
        tracing::debug!(booking_id = %booking.booking_id, "skipping demand creation");
        Ok(())
    }
}
