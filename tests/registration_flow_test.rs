//! Registration flow tests through the public API
//!
//! These run the flow against the file-backed store and a trait object to
//! make sure both wiring styles behave the same way.

use golf_registration::{
    FieldUpdate, FlowPhase, HandPreference, JsonLinesRecordStore, RecordStore, RegistrationFlow,
    RegistrationPolicy, SubmitError,
};
use std::sync::Arc;
use tempfile::TempDir;

fn fill<S: RecordStore>(flow: &RegistrationFlow<S>, username: &str) {
    flow.update_field(FieldUpdate::Identifier(username.to_string()));
    flow.update_field(FieldUpdate::DisplayName("Lydia".to_string()));
    flow.update_field(FieldUpdate::Email("lydia@golf.nz".to_string()));
    flow.update_field(FieldUpdate::ContactNumber("021 555 0199".to_string()));
    flow.update_field(FieldUpdate::Hand(HandPreference::Right));
    flow.toggle_product("None");
    flow.update_field(FieldUpdate::Consent(true));
}

#[tokio::test]
async fn test_file_store_round_trip_through_flow() {
    let dir = TempDir::new().unwrap();
    let store = Arc::new(JsonLinesRecordStore::new(dir.path().join("players.jsonl")));
    let flow = RegistrationFlow::new(Arc::clone(&store), RegistrationPolicy::default());

    fill(&flow, "lydia");
    let receipt = flow.submit().await.unwrap();
    assert_eq!(flow.phase(), FlowPhase::Done);
    assert!(flow.draft().is_pristine());

    fill(&flow, "lydia");
    let err = flow.submit().await.unwrap_err();
    assert!(matches!(err, SubmitError::Conflict { .. }));

    let records = store.records().await.unwrap();
    assert_eq!(records.len(), 1);
    assert_eq!(records[0].0, receipt.record_id);
    assert_eq!(records[0].1["products"][0], "None");
}

#[tokio::test]
async fn test_flow_accepts_trait_object_store() {
    let dir = TempDir::new().unwrap();
    let store: Arc<dyn RecordStore> =
        Arc::new(JsonLinesRecordStore::new(dir.path().join("players.jsonl")));
    let flow = RegistrationFlow::new(store, RegistrationPolicy::default());

    fill(&flow, "minjee");
    flow.submit().await.unwrap();

    fill(&flow, "minjee");
    assert!(flow.store().exists("username", "minjee").await.unwrap());
    assert!(matches!(
        flow.submit().await.unwrap_err(),
        SubmitError::Conflict { .. }
    ));
}

#[tokio::test]
async fn test_strict_product_policy_rejects_none_only() {
    let dir = TempDir::new().unwrap();
    let store = JsonLinesRecordStore::new(dir.path().join("players.jsonl"));
    let policy = RegistrationPolicy {
        none_satisfies_products: false,
        ..RegistrationPolicy::default()
    };
    let flow = RegistrationFlow::new(store, policy);

    fill(&flow, "lydia");
    let err = flow.submit().await.unwrap_err();
    let SubmitError::Invalid(state) = err else {
        panic!("expected validation failure");
    };
    assert_eq!(state.error_count(), 1);
    assert!(state.message(golf_registration::Field::OwnedProducts).is_some());
}
