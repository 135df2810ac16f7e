use async_trait::async_trait;
use uuid::Uuid;

use crate::models::{Doctor, DoctorError};

/// Lookups the booking workflow needs from the doctor directory.
#[async_trait]
pub trait DoctorDirectory: Send + Sync {
    /// Doctor record by its own id. Fails with `DoctorError::NotFound`.
    async fn get_by_id(&self, doctor_id: Uuid) -> Result<Doctor, DoctorError>;

    /// Doctor record owned by an identity. Fails with `DoctorError::ProfileNotFound`.
    async fn get_by_user_id(&self, user_id: Uuid) -> Result<Doctor, DoctorError>;
}
