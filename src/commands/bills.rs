use anyhow::{anyhow, Result};

use crate::services::navigation::{Navigator, Route};
use crate::services::presenter::{receipt_preview, BillRow, BillsView, ReceiptPreview};
use crate::services::state::AppState;

/// Loads the employee's bills and renders the list view.
pub async fn get_bills(state: &AppState) -> Result<BillsView> {
    state.refresh_bills().await
}

pub fn handle_click_new_bill(navigator: &dyn Navigator) {
    navigator.navigate(Route::NewBill);
}

/// Receipt shown when the eye icon of bill `bill_id` is clicked.
pub fn handle_click_icon_eye(state: &AppState, bill_id: &str, modal_width: u32) -> Result<ReceiptPreview> {
    let bill = state
        .find_bill(bill_id)?
        .ok_or_else(|| anyhow!("Bill not found: {}", bill_id))?;
    receipt_preview(&BillRow::from(&bill), modal_width)
        .ok_or_else(|| anyhow!("Bill {} has no receipt", bill_id))
}

pub fn open_receipt(preview: &ReceiptPreview) -> Result<()> {
    open::that(&preview.file_url).map_err(|e| anyhow!("Open receipt: {}", e))
}
