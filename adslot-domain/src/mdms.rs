use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::repository::StoreError;

/// Master-data enumerations a tenant's bookings must draw their descriptor
/// values from.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MdmsData {
    pub advertisement_types: Vec<String>,
    pub locations: Vec<String>,
    pub face_areas: Vec<String>,
}

/// Master-data lookup, keyed by the state-level tenant.
#[async_trait]
pub trait MasterDataService: Send + Sync {
    async fn fetch(&self, tenant_id: &str) -> Result<MdmsData, StoreError>;
}

/// Serves one fixed data set for every tenant. Used by tests and local
/// runs in place of the platform MDMS service.
pub struct StaticMasterData {
    data: MdmsData,
}

impl StaticMasterData {
    pub fn new(data: MdmsData) -> Self {
        Self { data }
    }
}

#[async_trait]
impl MasterDataService for StaticMasterData {
    async fn fetch(&self, tenant_id: &str) -> Result<MdmsData, StoreError> {
        tracing::debug!(%tenant_id, "serving static master data");
        Ok(self.data.clone())
    }
}
