use async_trait::async_trait;

use crate::booking::ApplicantDetail;
use crate::repository::StoreError;

/// PII encryption boundary. Applicant details are encrypted before they
/// reach the store and decrypted before they leave the engine; search
/// criteria carrying PII go through the same transformation so they match
/// stored ciphertext.
#[async_trait]
pub trait EncryptionService: Send + Sync {
    async fn encrypt_applicant(&self, applicant: &ApplicantDetail) -> Result<ApplicantDetail, StoreError>;

    async fn decrypt_applicant(&self, applicant: &ApplicantDetail) -> Result<ApplicantDetail, StoreError>;
}

/// No-op implementation for tests and local runs.
pub struct PassthroughEncryption;

#[async_trait]
impl EncryptionService for PassthroughEncryption {
    async fn encrypt_applicant(&self, applicant: &ApplicantDetail) -> Result<ApplicantDetail, StoreError> {
        Ok(applicant.clone())
    }

    async fn decrypt_applicant(&self, applicant: &ApplicantDetail) -> Result<ApplicantDetail, StoreError> {
        Ok(applicant.clone())
    }
}
