use anyhow::{anyhow, Result};
use std::sync::{Arc, Mutex};
use tracing::warn;

use crate::db::Database;
use crate::models::{BillRecord, Session, Settings};
use crate::services::fetch_state::{refresh, BillListStore, FetchState};
use crate::services::gateway::RemoteBillGateway;
use crate::services::presenter::{present, BillsView};
use crate::services::submission::{BillSubmissionWorkflow, SubmissionState};

/// Collaborators shared by the command handlers of one running session.
pub struct AppState {
    pub db: Arc<Mutex<Database>>,
    pub settings: Arc<Mutex<Settings>>,
    gateway: Arc<dyn RemoteBillGateway>,
    bills: Mutex<BillListStore>,
}

impl AppState {
    pub fn new(db: Database, settings: Settings, gateway: Arc<dyn RemoteBillGateway>) -> Self {
        AppState {
            db: Arc::new(Mutex::new(db)),
            settings: Arc::new(Mutex::new(settings)),
            gateway,
            bills: Mutex::new(BillListStore::new()),
        }
    }

    pub fn gateway(&self) -> &dyn RemoteBillGateway {
        self.gateway.as_ref()
    }

    /// Identity of the configured employee.
    pub fn session(&self) -> Result<Session> {
        let settings = self.settings.lock().map_err(|_| anyhow!("Settings lock"))?;
        let email = settings
            .email
            .as_deref()
            .map(str::trim)
            .filter(|e| !e.is_empty())
            .ok_or_else(|| anyhow!("Employee email missing, run `billed config set --email <email>`"))?;
        Ok(Session::new(email))
    }

    pub async fn refresh_bills(&self) -> Result<BillsView> {
        refresh(&self.bills, self.gateway()).await?;
        self.bills_view()
    }

    pub fn bills_view(&self) -> Result<BillsView> {
        let store = self.bills.lock().map_err(|_| anyhow!("Bill list lock"))?;
        Ok(present(store.state()))
    }

    /// Looks up a bill in the last loaded list.
    pub fn find_bill(&self, id: &str) -> Result<Option<BillRecord>> {
        let store = self.bills.lock().map_err(|_| anyhow!("Bill list lock"))?;
        Ok(match store.state() {
            FetchState::Loaded(records) => records.iter().find(|r| r.id.as_deref() == Some(id)).cloned(),
            _ => None,
        })
    }

    pub fn new_submission(&self) -> Result<BillSubmissionWorkflow> {
        Ok(BillSubmissionWorkflow::new(self.session()?))
    }

    /// Appends the terminal outcome of a submission to the local log.
    pub fn record_submission(&self, state: &SubmissionState) -> Result<()> {
        let db = self.db.lock().map_err(|_| anyhow!("DB lock poisoned"))?;
        match state {
            SubmissionState::Submitted { bill } => {
                db.log_submission(bill.id.as_deref(), "create", "submitted", None)?;
            }
            SubmissionState::Failed { stage, kind, message } => {
                let detail = format!("{}: {}", kind, message);
                db.log_submission(None, stage.as_str(), "failed", Some(detail.as_str()))?;
            }
            other => warn!(state = ?other, "not recording a non-terminal submission"),
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::GatewayError;
    use crate::models::{BillDraft, ExpenseType};
    use crate::services::memory_gateway::InMemoryGateway;

    fn state_with(gateway: Arc<InMemoryGateway>, email: Option<&str>) -> (tempfile::TempDir, AppState) {
        let dir = tempfile::tempdir().unwrap();
        let db = Database::new(dir.path().join("billed.sqlite")).unwrap();
        let settings = Settings {
            api_url: None,
            api_token: None,
            email: email.map(str::to_string),
            timeout_secs: 30,
        };
        (dir, AppState::new(db, settings, gateway))
    }

    #[test]
    fn session_requires_email() {
        let (_dir, state) = state_with(Arc::new(InMemoryGateway::new()), Some("  "));
        assert!(state.session().is_err());
        let (_dir, state) = state_with(Arc::new(InMemoryGateway::new()), Some("t@t.fr"));
        assert_eq!(state.session().unwrap(), Session::new("t@t.fr"));
    }

    #[tokio::test]
    async fn refresh_then_find() {
        let draft = BillDraft::new(ExpenseType::Transports, "2021-07-19", 23.0);
        let mut bill = BillRecord::from_draft(&draft, &Session::new("t@t.fr"), None);
        bill.id = Some("abc".to_string());
        let gateway = Arc::new(InMemoryGateway::with_bills(vec![bill]));
        let (_dir, state) = state_with(gateway, Some("t@t.fr"));

        assert!(state.find_bill("abc").unwrap().is_none());
        let view = state.refresh_bills().await.unwrap();
        assert!(matches!(view, BillsView::Bills { ref rows } if rows.len() == 1));
        assert!(state.find_bill("abc").unwrap().is_some());
        assert!(state.find_bill("zzz").unwrap().is_none());
    }

    #[tokio::test]
    async fn failed_refresh_renders_error() {
        let gateway = Arc::new(InMemoryGateway::new());
        gateway.fail_list(GatewayError::from_status(500, ""));
        let (_dir, state) = state_with(gateway, Some("t@t.fr"));
        let view = state.refresh_bills().await.unwrap();
        assert_eq!(
            view,
            BillsView::Error {
                message: "Erreur 500".to_string()
            }
        );
    }

    #[test]
    fn records_terminal_outcomes_only() {
        let (_dir, state) = state_with(Arc::new(InMemoryGateway::new()), Some("t@t.fr"));
        state.record_submission(&SubmissionState::Uploading).unwrap();
        state
            .record_submission(&SubmissionState::Failed {
                stage: crate::services::submission::SubmissionStage::Upload,
                kind: crate::error::ErrorKind::Network,
                message: "Erreur réseau: reset".to_string(),
            })
            .unwrap();

        let logs = state.db.lock().unwrap().recent_submissions(10).unwrap();
        assert_eq!(logs.len(), 1);
        assert_eq!(logs[0].stage, "upload");
        assert_eq!(logs[0].message.as_deref(), Some("network: Erreur réseau: reset"));
    }
}
