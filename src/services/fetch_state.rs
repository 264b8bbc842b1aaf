use anyhow::{anyhow, Result};
use std::sync::Mutex;
use tracing::{debug, warn};

use crate::error::{ErrorKind, GatewayError};
use crate::models::BillRecord;
use crate::services::gateway::RemoteBillGateway;

/// Lifecycle of one bill-list retrieval.
#[derive(Debug, Clone, PartialEq, Default)]
pub enum FetchState {
    #[default]
    Idle,
    Loading,
    /// Records in retrieval order; sorting is left to the presenter.
    Loaded(Vec<BillRecord>),
    Failed { kind: ErrorKind, message: String },
}

impl FetchState {
    pub fn is_terminal(&self) -> bool {
        matches!(self, FetchState::Loaded(_) | FetchState::Failed { .. })
    }
}

/// Identifies one issued fetch. Only the ticket of the most recently issued
/// fetch may commit.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FetchTicket(u64);

/// Holds the [`FetchState`] of a list view and enforces last-issued-wins.
#[derive(Debug, Default)]
pub struct BillListStore {
    state: FetchState,
    issued: u64,
}

impl BillListStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn state(&self) -> &FetchState {
        &self.state
    }

    /// Enters `Loading` and supersedes every fetch issued before.
    pub fn begin_fetch(&mut self) -> FetchTicket {
        self.issued += 1;
        self.state = FetchState::Loading;
        debug!(ticket = self.issued, "bill list fetch started");
        FetchTicket(self.issued)
    }

    pub fn is_current(&self, ticket: FetchTicket) -> bool {
        ticket.0 == self.issued && self.state == FetchState::Loading
    }

    /// Commits the outcome of `ticket`. Returns `false` and leaves the state
    /// untouched when the ticket was superseded or already resolved.
    pub fn resolve(&mut self, ticket: FetchTicket, outcome: Result<Vec<BillRecord>, GatewayError>) -> bool {
        if !self.is_current(ticket) {
            debug!(ticket = ticket.0, latest = self.issued, "discarding stale bill list result");
            return false;
        }
        self.state = match outcome {
            Ok(records) => {
                debug!(count = records.len(), "bill list loaded");
                FetchState::Loaded(records)
            }
            Err(err) => {
                warn!(kind = %err.kind, message = %err.message, "bill list fetch failed");
                FetchState::Failed {
                    kind: err.kind,
                    message: err.message,
                }
            }
        };
        true
    }
}

/// Runs one `list` call against `gateway` and commits it to `store` unless a
/// newer fetch was issued meanwhile. The lock is not held across the call.
pub async fn refresh(store: &Mutex<BillListStore>, gateway: &dyn RemoteBillGateway) -> Result<bool> {
    let ticket = store
        .lock()
        .map_err(|_| anyhow!("Bill list lock"))?
        .begin_fetch();

    let outcome = gateway.list().await;

    let mut store = store.lock().map_err(|_| anyhow!("Bill list lock"))?;
    Ok(store.resolve(ticket, outcome))
}
