use serde::Serialize;
use tracing::{debug, info, warn};

use crate::error::{ErrorKind, GatewayError, ValidationError};
use crate::models::{AttachedFile, BillDraft, BillRecord, Session, UploadedFile};
use crate::services::file_validator;
use crate::services::gateway::RemoteBillGateway;
use crate::services::navigation::{Navigator, Route};
use crate::utils::is_iso_date;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum SubmissionStage {
    Validation,
    Upload,
    Create,
}

impl SubmissionStage {
    pub fn as_str(self) -> &'static str {
        match self {
            SubmissionStage::Validation => "validation",
            SubmissionStage::Upload => "upload",
            SubmissionStage::Create => "create",
        }
    }
}

impl std::fmt::Display for SubmissionStage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum SubmissionState {
    Editing,
    Validating,
    Uploading,
    Creating,
    Submitted { bill: BillRecord },
    Failed {
        stage: SubmissionStage,
        kind: ErrorKind,
        message: String,
    },
}

impl SubmissionState {
    pub fn accepts_submit(&self) -> bool {
        matches!(self, SubmissionState::Editing | SubmissionState::Failed { .. })
    }

    /// Backend id of the created bill, once submitted.
    pub fn bill_id(&self) -> Option<&str> {
        match self {
            SubmissionState::Submitted { bill } => bill.id.as_deref(),
            _ => None,
        }
    }

    fn failed(stage: SubmissionStage, kind: ErrorKind, message: impl Into<String>) -> Self {
        SubmissionState::Failed {
            stage,
            kind,
            message: message.into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum SubmissionEvent {
    Edit,
    Submit,
    DraftAccepted { upload_needed: bool },
    DraftRejected(ValidationError),
    Uploaded(UploadedFile),
    UploadFailed(GatewayError),
    Created(BillRecord),
    CreateFailed(GatewayError),
}

/// Pure transition function of the submission state machine. Events that
/// make no sense in the current state leave it unchanged.
pub fn transition(state: SubmissionState, event: SubmissionEvent) -> SubmissionState {
    use SubmissionEvent as E;
    use SubmissionState as S;

    match (state, event) {
        (S::Editing | S::Failed { .. }, E::Edit) => S::Editing,
        (S::Editing | S::Failed { .. }, E::Submit) => S::Validating,
        (S::Validating, E::DraftAccepted { upload_needed: true }) => S::Uploading,
        (S::Validating, E::DraftAccepted { upload_needed: false }) => S::Creating,
        (S::Validating, E::DraftRejected(err)) => {
            S::failed(SubmissionStage::Validation, ErrorKind::Validation, err.to_string())
        }
        (S::Uploading, E::Uploaded(file)) if !file.file_url.is_empty() && !file.file_name.is_empty() => {
            S::Creating
        }
        (S::Uploading, E::Uploaded(_)) => S::failed(
            SubmissionStage::Upload,
            ErrorKind::Server,
            "upload returned no file URL or name",
        ),
        (S::Uploading, E::UploadFailed(err)) => S::failed(SubmissionStage::Upload, err.kind, err.message),
        (S::Creating, E::Created(bill)) if bill.id.is_some() => S::Submitted { bill },
        (S::Creating, E::Created(_)) => S::failed(
            SubmissionStage::Create,
            ErrorKind::Server,
            "created bill has no id",
        ),
        (S::Creating, E::CreateFailed(err)) => S::failed(SubmissionStage::Create, err.kind, err.message),
        (state, event) => {
            warn!(?state, ?event, "ignoring submission event");
            state
        }
    }
}

/// Checks the draft fields before any network effort.
pub fn validate_draft(draft: &BillDraft) -> Result<(), ValidationError> {
    if !draft.amount.is_finite() || draft.amount < 0.0 {
        return Err(ValidationError::InvalidDraft(format!(
            "amount must be a non-negative number, got {}",
            draft.amount
        )));
    }
    if let Some(pct) = draft.pct {
        if pct > 100 {
            return Err(ValidationError::InvalidDraft(format!(
                "pct must be between 0 and 100, got {}",
                pct
            )));
        }
    }
    if !is_iso_date(&draft.date) {
        return Err(ValidationError::InvalidDraft(format!(
            "date must be a YYYY-MM-DD calendar date, got {:?}",
            draft.date
        )));
    }
    Ok(())
}

/// Drives one new-bill form: receipt attachment, then upload, record
/// creation and navigation back to the list.
pub struct BillSubmissionWorkflow {
    session: Session,
    state: SubmissionState,
    attachment: Option<AttachedFile>,
    uploaded: Option<UploadedFile>,
}

impl BillSubmissionWorkflow {
    pub fn new(session: Session) -> Self {
        BillSubmissionWorkflow {
            session,
            state: SubmissionState::Editing,
            attachment: None,
            uploaded: None,
        }
    }

    pub fn state(&self) -> &SubmissionState {
        &self.state
    }

    pub fn session(&self) -> &Session {
        &self.session
    }

    pub fn attachment(&self) -> Option<&AttachedFile> {
        self.attachment.as_ref()
    }

    /// Validates and holds `file` as the receipt. A rejected file is not
    /// kept and replaces any previously attached one.
    pub fn attach_file(&mut self, file: AttachedFile) -> Result<String, ValidationError> {
        if matches!(self.state, SubmissionState::Submitted { .. }) {
            return Err(ValidationError::AlreadySubmitted);
        }
        self.apply(SubmissionEvent::Edit);
        self.uploaded = None;

        match file_validator::validate(&file.file_name) {
            Ok(extension) => {
                debug!(file_name = %file.file_name, %extension, "receipt attached");
                self.attachment = Some(file);
                Ok(extension)
            }
            Err(err) => {
                warn!(file_name = %file.file_name, "receipt rejected: {}", err);
                self.attachment = None;
                Err(err)
            }
        }
    }

    /// Runs validation, upload and creation in sequence. Always returns
    /// with the workflow in `Submitted` or `Failed`; on success the
    /// navigator is sent back to the bill list.
    pub async fn submit(
        &mut self,
        draft: &BillDraft,
        gateway: &dyn RemoteBillGateway,
        navigator: &dyn Navigator,
    ) -> &SubmissionState {
        if !self.state.accepts_submit() {
            warn!(state = ?self.state, "submit ignored");
            return &self.state;
        }
        self.apply(SubmissionEvent::Submit);

        if let Err(err) = validate_draft(draft) {
            self.apply(SubmissionEvent::DraftRejected(err));
            return &self.state;
        }

        let upload_needed = self.attachment.is_some() && self.uploaded.is_none();
        self.apply(SubmissionEvent::DraftAccepted { upload_needed });

        if upload_needed {
            if let Some(file) = &self.attachment {
                match gateway.upload_file(file).await {
                    Ok(uploaded) => {
                        debug!(file_url = %uploaded.file_url, "receipt uploaded");
                        self.apply(SubmissionEvent::Uploaded(uploaded.clone()));
                        if !matches!(self.state, SubmissionState::Creating) {
                            return &self.state;
                        }
                        self.uploaded = Some(uploaded);
                    }
                    Err(err) => {
                        self.apply(SubmissionEvent::UploadFailed(err));
                        return &self.state;
                    }
                }
            }
        }

        let record = BillRecord::from_draft(draft, &self.session, self.uploaded.as_ref());
        match gateway.create(&record).await {
            Ok(created) => self.apply(SubmissionEvent::Created(created)),
            Err(err) => self.apply(SubmissionEvent::CreateFailed(err)),
        }

        if let SubmissionState::Submitted { bill } = &self.state {
            info!(id = bill.id.as_deref().unwrap_or_default(), "bill submitted");
            navigator.navigate(Route::Bills);
        }
        &self.state
    }

    fn apply(&mut self, event: SubmissionEvent) {
        let current = std::mem::replace(&mut self.state, SubmissionState::Editing);
        self.state = transition(current, event);
        match &self.state {
            SubmissionState::Failed { stage, kind, message } => {
                warn!(%stage, %kind, %message, "bill submission failed")
            }
            state => debug!(?state, "submission state"),
        }
    }
}
