use std::cell::Cell;

use billed::services::memory_gateway::InMemoryGateway;
use billed::{
    AttachedFile, BillDraft, BillSubmissionWorkflow, ErrorKind, ExpenseType, GatewayError, Route, Session,
    SubmissionStage, SubmissionState,
};

fn transports_draft() -> BillDraft {
    let mut draft = BillDraft::new(ExpenseType::Transports, "2021-07-19", 23.0);
    draft.pct = Some(20);
    draft
}

#[tokio::test]
async fn png_receipt_is_uploaded_then_bill_created() {
    let gateway = InMemoryGateway::new()
        .with_upload_url("testURL")
        .with_next_id("47qAXb6fIm2zOKkLzMro");
    let navigations = Cell::new(0);
    let last_route = Cell::new(None);
    let navigator = |route: Route| {
        navigations.set(navigations.get() + 1);
        last_route.set(Some(route));
    };

    let mut workflow = BillSubmissionWorkflow::new(Session::new("t@t.fr"));
    let ext = workflow
        .attach_file(AttachedFile::new("text.png", b"(-_-)".to_vec()))
        .unwrap();
    assert_eq!(ext, "png");

    let state = workflow.submit(&transports_draft(), &gateway, &navigator).await;

    match state {
        SubmissionState::Submitted { bill } => {
            assert_eq!(bill.id.as_deref(), Some("47qAXb6fIm2zOKkLzMro"));
            assert_eq!(bill.file_url, "testURL");
            assert_eq!(bill.file_name, "text.png");
            assert_eq!(bill.email, "t@t.fr");
            assert_eq!(bill.amount, 23.0);
            assert_eq!(bill.pct, 20);
        }
        other => panic!("expected Submitted, got {:?}", other),
    }
    assert_eq!(navigations.get(), 1);
    assert_eq!(last_route.get(), Some(Route::Bills));
    assert_eq!(gateway.upload_calls(), 1);
    assert_eq!(gateway.create_calls(), 1);
}

#[tokio::test]
async fn bill_without_receipt_skips_upload() {
    let gateway = InMemoryGateway::new();
    let mut workflow = BillSubmissionWorkflow::new(Session::new("t@t.fr"));

    let state = workflow
        .submit(&transports_draft(), &gateway, &|_: Route| {})
        .await
        .clone();

    assert!(matches!(state, SubmissionState::Submitted { .. }));
    assert_eq!(gateway.upload_calls(), 0);
    let created = gateway.bills();
    assert_eq!(created.len(), 1);
    assert!(created[0].file_url.is_empty());
    assert!(created[0].file_name.is_empty());
}

#[tokio::test]
async fn failed_upload_keeps_draft_for_retry() {
    let gateway = InMemoryGateway::new();
    gateway.fail_upload(GatewayError::from_status(503, ""));
    let navigations = Cell::new(0);
    let navigator = |_: Route| navigations.set(navigations.get() + 1);

    let mut workflow = BillSubmissionWorkflow::new(Session::new("t@t.fr"));
    workflow
        .attach_file(AttachedFile::new("ticket.JPG", vec![0xff, 0xd8]))
        .unwrap();
    let draft = transports_draft();

    let state = workflow.submit(&draft, &gateway, &navigator).await.clone();
    assert_eq!(
        state,
        SubmissionState::Failed {
            stage: SubmissionStage::Upload,
            kind: ErrorKind::Server,
            message: "Erreur 503".to_string(),
        }
    );
    assert_eq!(gateway.create_calls(), 0);
    assert!(workflow.attachment().is_some());

    gateway.recover();
    let state = workflow.submit(&draft, &gateway, &navigator).await;
    assert!(matches!(state, SubmissionState::Submitted { .. }));
    assert_eq!(gateway.upload_calls(), 2);
    assert_eq!(gateway.create_calls(), 1);
    assert_eq!(navigations.get(), 1);
}

#[tokio::test]
async fn unsupported_receipt_never_reaches_the_backend() {
    let gateway = InMemoryGateway::new();
    let mut workflow = BillSubmissionWorkflow::new(Session::new("t@t.fr"));

    let err = workflow
        .attach_file(AttachedFile::new("text.gif", b"GIF89a".to_vec()))
        .unwrap_err();
    assert_eq!(err.to_string(), "unsupported file type");
    assert_eq!(workflow.state(), &SubmissionState::Editing);

    // submitting now goes through without any receipt
    workflow.submit(&transports_draft(), &gateway, &|_: Route| {}).await;
    assert_eq!(gateway.upload_calls(), 0);
    assert!(gateway.bills()[0].file_name.is_empty());
}
