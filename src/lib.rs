//! Client-side logic for listing and submitting employee expense bills
//! against a remote backend.

pub mod commands;
pub mod db;
pub mod error;
pub mod models;
pub mod services;
pub mod utils;

pub use error::{ErrorKind, GatewayError, ValidationError};
pub use models::{AttachedFile, BillDraft, BillRecord, BillStatus, ExpenseType, Session, UploadedFile};
pub use services::fetch_state::{BillListStore, FetchState};
pub use services::gateway::RemoteBillGateway;
pub use services::navigation::{Navigator, Route};
pub use services::presenter::{present, BillRow, BillsView};
pub use services::submission::{BillSubmissionWorkflow, SubmissionStage, SubmissionState};
