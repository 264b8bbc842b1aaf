use serde::Serialize;

use crate::error::ErrorKind;
use crate::models::BillRecord;
use crate::services::fetch_state::FetchState;
use crate::utils::{format_amount, format_date, is_iso_date};

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BillRow {
    pub id: Option<String>,
    pub expense_type: String,
    pub name: String,
    pub date: String,
    pub display_date: String,
    pub amount: String,
    pub status: String,
    pub file_url: Option<String>,
    pub file_name: Option<String>,
}

impl From<&BillRecord> for BillRow {
    fn from(record: &BillRecord) -> Self {
        let receipt = record.receipt();
        BillRow {
            id: record.id.clone(),
            expense_type: record.expense_type.label().to_string(),
            name: record.name.clone(),
            date: record.date.clone(),
            display_date: format_date(&record.date),
            amount: format_amount(record.amount),
            status: record.status.label().to_string(),
            file_url: receipt.map(|(url, _)| url.to_string()),
            file_name: receipt.map(|(_, name)| name.to_string()),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "view", rename_all = "snake_case")]
pub enum BillsView {
    Loading,
    Error { message: String },
    Bills { rows: Vec<BillRow> },
}

/// Renders a fetch snapshot. A `NotFound` failure means there is nothing to
/// show and renders as an empty list; `Idle` renders the same way.
pub fn present(state: &FetchState) -> BillsView {
    match state {
        FetchState::Idle => BillsView::Bills { rows: Vec::new() },
        FetchState::Loading => BillsView::Loading,
        FetchState::Failed {
            kind: ErrorKind::NotFound,
            ..
        } => BillsView::Bills { rows: Vec::new() },
        FetchState::Failed { message, .. } => BillsView::Error {
            message: message.clone(),
        },
        FetchState::Loaded(records) => BillsView::Bills {
            rows: sort_by_date_desc(records).into_iter().map(BillRow::from).collect(),
        },
    }
}

/// Most recent first. Fixed-width ISO dates compare correctly as strings;
/// equal dates keep retrieval order. Records with malformed dates follow
/// the dated ones, in retrieval order.
pub fn sort_by_date_desc(records: &[BillRecord]) -> Vec<&BillRecord> {
    let (mut dated, undated): (Vec<&BillRecord>, Vec<&BillRecord>) =
        records.iter().partition(|r| is_iso_date(&r.date));
    dated.sort_by(|a, b| b.date.cmp(&a.date));
    dated.extend(undated);
    dated
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ReceiptPreview {
    pub file_url: String,
    pub file_name: String,
    pub width: u32,
}

/// What the receipt modal shows for `row`: the image at half the modal width.
pub fn receipt_preview(row: &BillRow, modal_width: u32) -> Option<ReceiptPreview> {
    let file_url = row.file_url.clone()?;
    Some(ReceiptPreview {
        file_url,
        file_name: row.file_name.clone().unwrap_or_default(),
        width: modal_width / 2,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{BillDraft, BillStatus, ExpenseType, Session};
    use pretty_assertions::assert_eq;

    fn bill(name: &str, date: &str) -> BillRecord {
        let mut draft = BillDraft::new(ExpenseType::HotelEtLogement, date, 400.0);
        draft.name = name.to_string();
        BillRecord::from_draft(&draft, &Session::new("a@a"), None)
    }

    fn names(view: &BillsView) -> Vec<String> {
        match view {
            BillsView::Bills { rows } => rows.iter().map(|r| r.name.clone()).collect(),
            other => panic!("unexpected view {:?}", other),
        }
    }

    #[test]
    fn loading_has_no_rows() {
        assert_eq!(present(&FetchState::Loading), BillsView::Loading);
    }

    #[test]
    fn failure_shows_exact_message() {
        let state = FetchState::Failed {
            kind: ErrorKind::Network,
            message: "Erreur 404".to_string(),
        };
        assert_eq!(
            present(&state),
            BillsView::Error {
                message: "Erreur 404".to_string()
            }
        );
    }

    #[test]
    fn not_found_renders_empty_list() {
        let state = FetchState::Failed {
            kind: ErrorKind::NotFound,
            message: "Erreur 404".to_string(),
        };
        assert_eq!(present(&state), BillsView::Bills { rows: vec![] });
    }

    #[test]
    fn rows_are_most_recent_first() {
        let records = vec![
            bill("a", "2003-03-03"),
            bill("b", "2004-04-04"),
            bill("c", "2001-01-01"),
            bill("d", "2002-02-02"),
        ];
        let view = present(&FetchState::Loaded(records));
        assert_eq!(names(&view), vec!["b", "a", "d", "c"]);
    }

    #[test]
    fn equal_dates_keep_retrieval_order() {
        let records = vec![
            bill("first", "2021-07-19"),
            bill("older", "2020-01-01"),
            bill("second", "2021-07-19"),
            bill("third", "2021-07-19"),
        ];
        let view = present(&FetchState::Loaded(records));
        assert_eq!(names(&view), vec!["first", "second", "third", "older"]);
    }

    #[test]
    fn malformed_dates_go_last_without_failing() {
        let records = vec![
            bill("bad1", "19/07/2021"),
            bill("ok1", "2020-01-01"),
            bill("bad2", ""),
            bill("ok2", "2021-01-01"),
        ];
        let view = present(&FetchState::Loaded(records));
        assert_eq!(names(&view), vec!["ok2", "ok1", "bad1", "bad2"]);
    }

    #[test]
    fn adjacent_rows_never_increase() {
        let dates = [
            "2019-12-31", "2021-07-19", "2020-02-29", "2021-07-19", "2018-01-01", "2021-07-20",
        ];
        let records: Vec<BillRecord> = dates.iter().enumerate().map(|(i, d)| bill(&i.to_string(), d)).collect();
        let sorted = sort_by_date_desc(&records);
        for pair in sorted.windows(2) {
            assert!(pair[0].date >= pair[1].date);
        }
        // the two 2021-07-19 bills were at positions 1 and 3
        let equal: Vec<&str> = sorted
            .iter()
            .filter(|r| r.date == "2021-07-19")
            .map(|r| r.name.as_str())
            .collect();
        assert_eq!(equal, vec!["1", "3"]);
    }

    #[test]
    fn row_formats_display_fields() {
        let mut record = bill("Hôtel Paris", "2021-07-19");
        record.id = Some("47qAXb6fIm2zOKkLzMro".to_string());
        record.status = BillStatus::Accepted;
        record.file_url = "testURL".to_string();
        record.file_name = "text.png".to_string();

        let row = BillRow::from(&record);
        assert_eq!(
            row,
            BillRow {
                id: Some("47qAXb6fIm2zOKkLzMro".to_string()),
                expense_type: "Hôtel et logement".to_string(),
                name: "Hôtel Paris".to_string(),
                date: "2021-07-19".to_string(),
                display_date: "19 Jui. 21".to_string(),
                amount: "400 €".to_string(),
                status: "Accepté".to_string(),
                file_url: Some("testURL".to_string()),
                file_name: Some("text.png".to_string()),
            }
        );
    }

    #[test]
    fn preview_uses_half_the_modal_width() {
        let mut record = bill("r", "2021-07-19");
        record.file_url = "https://files/r.jpg".to_string();
        record.file_name = "r.jpg".to_string();
        let preview = receipt_preview(&BillRow::from(&record), 801).unwrap();
        assert_eq!(preview.width, 400);
        assert_eq!(preview.file_url, "https://files/r.jpg");
    }

    #[test]
    fn no_preview_without_receipt() {
        let row = BillRow::from(&bill("r", "2021-07-19"));
        assert_eq!(receipt_preview(&row, 800), None);
    }
}
