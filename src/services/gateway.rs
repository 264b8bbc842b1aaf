use async_trait::async_trait;

use crate::error::GatewayError;
use crate::models::{AttachedFile, BillRecord, UploadedFile};

/// Boundary to the remote bill backend. Implementations never panic or
/// retry; every failure comes back as a classified [`GatewayError`].
#[async_trait]
pub trait RemoteBillGateway: Send + Sync {
    async fn list(&self) -> Result<Vec<BillRecord>, GatewayError>;

    async fn upload_file(&self, file: &AttachedFile) -> Result<UploadedFile, GatewayError>;

    /// Persists a draft and returns it with its backend-assigned `id`.
    async fn create(&self, record: &BillRecord) -> Result<BillRecord, GatewayError>;
}
