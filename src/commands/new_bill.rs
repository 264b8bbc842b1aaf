use anyhow::{anyhow, Result};
use std::path::Path;

use crate::models::{AttachedFile, BillDraft};
use crate::services::file_validator;
use crate::services::navigation::Navigator;
use crate::services::state::AppState;
use crate::services::submission::{BillSubmissionWorkflow, SubmissionState};

/// Attaches the receipt at `path` to the form. The name is checked before
/// the file is read.
pub async fn handle_change_file(workflow: &mut BillSubmissionWorkflow, path: &Path) -> Result<String> {
    let file_name = path
        .file_name()
        .and_then(|n| n.to_str())
        .ok_or_else(|| anyhow!("Invalid path: {}", path.display()))?
        .to_string();
    file_validator::validate(&file_name)?;

    let content = tokio::fs::read(path)
        .await
        .map_err(|e| anyhow!("Read {}: {}", path.display(), e))?;
    Ok(workflow.attach_file(AttachedFile::new(file_name, content))?)
}

/// Submits the form and records the outcome in the local log.
pub async fn handle_submit(
    state: &AppState,
    workflow: &mut BillSubmissionWorkflow,
    draft: &BillDraft,
    navigator: &dyn Navigator,
) -> Result<SubmissionState> {
    let outcome = workflow
        .submit(draft, state.gateway(), navigator)
        .await
        .clone();
    state.record_submission(&outcome)?;
    Ok(outcome)
}
