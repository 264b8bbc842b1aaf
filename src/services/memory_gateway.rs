use async_trait::async_trait;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;
use tracing::debug;

use crate::error::GatewayError;
use crate::models::{AttachedFile, BillRecord, UploadedFile};
use crate::services::gateway::RemoteBillGateway;
use crate::utils::sha256_bytes;

/// In-process backend keeping bills in memory. Counts calls and can be
/// scripted to fail, which makes it the gateway of choice for tests and
/// offline runs.
#[derive(Default)]
pub struct InMemoryGateway {
    bills: Mutex<Vec<BillRecord>>,
    next_id: Mutex<Option<String>>,
    upload_url: Option<String>,
    list_error: Mutex<Option<GatewayError>>,
    upload_error: Mutex<Option<GatewayError>>,
    create_error: Mutex<Option<GatewayError>>,
    list_calls: AtomicUsize,
    upload_calls: AtomicUsize,
    create_calls: AtomicUsize,
}

impl InMemoryGateway {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_bills(bills: Vec<BillRecord>) -> Self {
        InMemoryGateway {
            bills: Mutex::new(bills),
            ..Self::default()
        }
    }

    /// Id handed to the next created bill instead of a generated one.
    pub fn with_next_id(self, id: impl Into<String>) -> Self {
        *lock(&self.next_id) = Some(id.into());
        self
    }

    /// Fixed URL returned by every upload.
    pub fn with_upload_url(mut self, url: impl Into<String>) -> Self {
        self.upload_url = Some(url.into());
        self
    }

    /// Makes every following `list` call fail with `error`.
    pub fn fail_list(&self, error: GatewayError) {
        *lock(&self.list_error) = Some(error);
    }

    pub fn fail_upload(&self, error: GatewayError) {
        *lock(&self.upload_error) = Some(error);
    }

    pub fn fail_create(&self, error: GatewayError) {
        *lock(&self.create_error) = Some(error);
    }

    /// Clears all scripted failures.
    pub fn recover(&self) {
        *lock(&self.list_error) = None;
        *lock(&self.upload_error) = None;
        *lock(&self.create_error) = None;
    }

    pub fn bills(&self) -> Vec<BillRecord> {
        lock(&self.bills).clone()
    }

    pub fn list_calls(&self) -> usize {
        self.list_calls.load(Ordering::SeqCst)
    }

    pub fn upload_calls(&self) -> usize {
        self.upload_calls.load(Ordering::SeqCst)
    }

    pub fn create_calls(&self) -> usize {
        self.create_calls.load(Ordering::SeqCst)
    }
}

fn lock<T>(mutex: &Mutex<T>) -> std::sync::MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

fn generate_id() -> String {
    uuid::Uuid::new_v4().simple().to_string()[..20].to_string()
}

#[async_trait]
impl RemoteBillGateway for InMemoryGateway {
    async fn list(&self) -> Result<Vec<BillRecord>, GatewayError> {
        self.list_calls.fetch_add(1, Ordering::SeqCst);
        if let Some(err) = lock(&self.list_error).clone() {
            return Err(err);
        }
        Ok(self.bills())
    }

    async fn upload_file(&self, file: &AttachedFile) -> Result<UploadedFile, GatewayError> {
        self.upload_calls.fetch_add(1, Ordering::SeqCst);
        if let Some(err) = lock(&self.upload_error).clone() {
            return Err(err);
        }
        let file_url = match &self.upload_url {
            Some(url) => url.clone(),
            None => format!(
                "memory://receipts/{}/{}",
                &sha256_bytes(&file.content)[..16],
                file.file_name
            ),
        };
        debug!(%file_url, "stored receipt in memory");
        Ok(UploadedFile {
            file_url,
            file_name: file.file_name.clone(),
        })
    }

    async fn create(&self, record: &BillRecord) -> Result<BillRecord, GatewayError> {
        self.create_calls.fetch_add(1, Ordering::SeqCst);
        if let Some(err) = lock(&self.create_error).clone() {
            return Err(err);
        }
        let id = lock(&self.next_id).take().unwrap_or_else(generate_id);
        let mut created = record.clone();
        created.id = Some(id);
        lock(&self.bills).push(created.clone());
        Ok(created)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;
    use crate::models::{BillDraft, ExpenseType, Session};

    fn draft_record() -> BillRecord {
        let draft = BillDraft::new(ExpenseType::Transports, "2021-07-19", 50.0);
        BillRecord::from_draft(&draft, &Session::new("t@t.fr"), None)
    }

    #[tokio::test]
    async fn created_bill_is_listed_with_its_id() {
        let gateway = InMemoryGateway::new().with_next_id("47qAXb6fIm2zOKkLzMro");
        let created = gateway.create(&draft_record()).await.unwrap();
        assert_eq!(created.id.as_deref(), Some("47qAXb6fIm2zOKkLzMro"));

        let bills = gateway.list().await.unwrap();
        assert_eq!(bills.len(), 1);
        assert_eq!(bills[0].id, created.id);
        assert_eq!(gateway.create_calls(), 1);
        assert_eq!(gateway.list_calls(), 1);
    }

    #[tokio::test]
    async fn generated_ids_are_unique() {
        let gateway = InMemoryGateway::new();
        let a = gateway.create(&draft_record()).await.unwrap();
        let b = gateway.create(&draft_record()).await.unwrap();
        assert_eq!(a.id.as_ref().map(|id| id.len()), Some(20));
        assert_ne!(a.id, b.id);
    }

    #[tokio::test]
    async fn upload_url_is_content_addressed_by_default() {
        let gateway = InMemoryGateway::new();
        let file = AttachedFile::new("text.png", b"(-_-)".to_vec());
        let first = gateway.upload_file(&file).await.unwrap();
        let second = gateway.upload_file(&file).await.unwrap();
        assert_eq!(first, second);
        assert!(first.file_url.ends_with("/text.png"));
    }

    #[tokio::test]
    async fn scripted_failures_until_recovered() {
        let gateway = InMemoryGateway::new();
        gateway.fail_list(GatewayError::from_status(500, ""));
        let err = gateway.list().await.unwrap_err();
        assert_eq!(err.kind, ErrorKind::Server);
        assert_eq!(err.message, "Erreur 500");

        gateway.recover();
        assert!(gateway.list().await.unwrap().is_empty());
        assert_eq!(gateway.list_calls(), 2);
    }
}
