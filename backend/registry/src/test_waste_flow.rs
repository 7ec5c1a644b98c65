use mockito::Matcher;
use serde_json::json;

use crate::credits::CategoryFactors;
use crate::errors::RegistryError;
use crate::models::{PoolAllocation, PoolStatus, TransferRecord, WasteRecord};
use crate::path::{Collection, DocPath};
use crate::payout::PayoutMode;
use crate::queries;
use crate::status::WasteStatus;
use crate::store::{now_millis, Versioned};
use crate::test_utils::{
    allow_writes, fail_writes, memory_pool, memory_workflow, mock_ledger, new_waste, workflow_on,
};
use crate::workflow::Workflow;

const BUYER: &str = "recycler-7";

async fn waste(workflow: &Workflow, path: &DocPath) -> WasteRecord {
    let record: Versioned<WasteRecord> = workflow.store().require(path).await.unwrap();
    record.value
}

/// Submit and walk a batch up to `WEIGHT_VERIFIED`.
async fn verified_batch(
    workflow: &Workflow,
    name: &str,
    declared_kg: f64,
    reported_kg: f64,
    payout: Option<&str>,
) -> DocPath {
    let path = workflow
        .submit_waste("ravi.k@mail.com", new_waste(name, declared_kg, payout))
        .await
        .unwrap();
    workflow.classify_waste(&path).await.unwrap();
    workflow.approve_waste(&path, "admin-1").await.unwrap();
    workflow.reserve_waste(&path, BUYER).await.unwrap();
    workflow
        .verify_weight(&path, BUYER, reported_kg)
        .await
        .unwrap();
    path
}

async fn pooled_batch(workflow: &Workflow, payout: Option<&str>) -> DocPath {
    let path = verified_batch(workflow, "Rice husk", 20.0, 20.0, payout).await;
    workflow.allocate_to_pool(&path).await.unwrap();
    path
}

fn receipt_body(status: &str) -> String {
    json!({"jsonrpc": "2.0", "id": 1, "result": {"status": status}}).to_string()
}

fn hash_body(hash: &str) -> String {
    json!({"jsonrpc": "2.0", "id": 1, "result": {"hash": hash}}).to_string()
}

async fn submit_mock(server: &mut mockito::ServerGuard, hash: &str, hits: usize) -> mockito::Mock {
    server
        .mock("POST", "/")
        .match_body(Matcher::PartialJson(json!({"method": "registerProject"})))
        .with_header("content-type", "application/json")
        .with_body(hash_body(hash))
        .expect(hits)
        .create_async()
        .await
}

/// Receipt for `hash`; `status` of `None` means still pending.
async fn receipt_mock(
    server: &mut mockito::ServerGuard,
    hash: &str,
    status: Option<&str>,
) -> mockito::Mock {
    let body = match status {
        Some(status) => receipt_body(status),
        None => json!({"jsonrpc": "2.0", "id": 1, "result": null}).to_string(),
    };
    server
        .mock("POST", "/")
        .match_body(Matcher::PartialJson(json!({
            "method": "getTransactionReceipt",
            "params": { "hash": hash }
        })))
        .with_header("content-type", "application/json")
        .with_body(body)
        .create_async()
        .await
}

#[tokio::test]
async fn test_rice_husk_end_to_end_bank_payout() {
    let workflow = memory_workflow(None).await;
    let path = workflow
        .submit_waste("ravi.k@mail.com", new_waste("Rice husk", 20.0, Some("ravi@okaxis")))
        .await
        .unwrap();

    let classified = workflow.classify_waste(&path).await.unwrap();
    assert_eq!(classified.status, WasteStatus::AiVerified);
    assert_eq!(classified.ai_category.as_deref(), Some("Organic"));

    let approved = workflow.approve_waste(&path, "admin-1").await.unwrap();
    assert_eq!(approved.status, WasteStatus::Approved);
    assert_eq!(approved.approved_by.as_deref(), Some("admin-1"));

    let reserved = workflow.reserve_waste(&path, BUYER).await.unwrap();
    assert_eq!(reserved.buyer_id.as_deref(), Some(BUYER));

    let weighed = workflow.verify_weight(&path, BUYER, 20.0).await.unwrap();
    assert_eq!(weighed.status, WasteStatus::WeightVerified);
    assert_eq!(weighed.final_weight_kg, Some(20.0));

    let (allocated, entry) = workflow.allocate_to_pool(&path).await.unwrap();
    assert_eq!(allocated.status, WasteStatus::PoolAllocated);
    assert!((allocated.plantation_units.unwrap() - 24.0).abs() < 1e-9);
    assert_eq!(allocated.pool_entry_id.as_deref(), Some(entry.path.id.as_str()));

    let stored_entry: Versioned<PoolAllocation> =
        workflow.store().require(&entry.path).await.unwrap();
    assert_eq!(stored_entry.value.status, PoolStatus::Locked);
    assert_eq!(stored_entry.value.waste_id, path.id);
    assert_eq!(stored_entry.value.owner_key, "ravi,k@mail,com");
    assert_eq!(stored_entry.value.category.as_deref(), Some("Organic"));

    let outcome = workflow.execute_plantation(&path).await.unwrap();
    assert_eq!(outcome.credits, 240);
    assert_eq!(outcome.payout_mode, PayoutMode::Bank);
    assert_eq!(outcome.blockchain_tx, None);

    let credited = waste(&workflow, &path).await;
    assert_eq!(credited.status, WasteStatus::Credited);
    assert_eq!(credited.credits_issued, Some(240));
    assert_eq!(credited.payout_mode, Some(PayoutMode::Bank));
    assert_eq!(credited.payout_attempts, 1);
    assert!(credited.planted_at.is_some());
    assert!(credited.credited_at.is_some());

    let transfers = queries::transfers_for(workflow.store(), &path.owner)
        .await
        .unwrap();
    assert_eq!(transfers.len(), 1);
    assert_eq!(transfers[0].path, outcome.transfer);
    let transfer: &TransferRecord = &transfers[0].value;
    assert_eq!(transfer.credits, 240);
    assert_eq!(transfer.waste_id.as_deref(), Some(path.id.as_str()));
    assert_eq!(transfer.upi_id.as_deref(), Some("ravi@okaxis"));
    assert_eq!(transfer.user_wallet, None);
}

#[tokio::test]
async fn test_weight_is_capped_at_declared() {
    let workflow = memory_workflow(None).await;

    let over = verified_batch(&workflow, "tin can", 100.0, 150.0, None).await;
    let record = waste(&workflow, &over).await;
    assert_eq!(record.recycler_reported_weight_kg, Some(150.0));
    assert_eq!(record.final_weight_kg, Some(100.0));

    let under = verified_batch(&workflow, "tin can", 100.0, 80.0, None).await;
    assert_eq!(waste(&workflow, &under).await.final_weight_kg, Some(80.0));
}

#[tokio::test]
async fn test_only_reserving_buyer_reports_weight() {
    let workflow = memory_workflow(None).await;
    let path = workflow
        .submit_waste("a@b.com", new_waste("paper", 10.0, None))
        .await
        .unwrap();
    workflow.classify_waste(&path).await.unwrap();
    workflow.approve_waste(&path, "admin").await.unwrap();
    workflow.reserve_waste(&path, BUYER).await.unwrap();

    let err = workflow
        .verify_weight(&path, "someone-else", 10.0)
        .await
        .unwrap_err();
    assert!(matches!(err, RegistryError::Precondition(_)));
    assert_eq!(waste(&workflow, &path).await.status, WasteStatus::Reserved);
}

#[tokio::test]
async fn test_out_of_order_transitions_are_refused() {
    let workflow = memory_workflow(None).await;
    let path = workflow
        .submit_waste("a@b.com", new_waste("mobile", 2.0, None))
        .await
        .unwrap();

    let err = workflow.approve_waste(&path, "admin").await.unwrap_err();
    assert!(matches!(err, RegistryError::InvalidTransition { .. }));

    workflow.classify_waste(&path).await.unwrap();
    let rejected = workflow.reject_waste(&path, "admin").await.unwrap();
    assert_eq!(rejected.status, WasteStatus::Rejected);
    assert_eq!(rejected.rejected_by.as_deref(), Some("admin"));

    let err = workflow.reserve_waste(&path, BUYER).await.unwrap_err();
    assert!(matches!(err, RegistryError::InvalidTransition { .. }));
    let err = workflow.execute_plantation(&path).await.unwrap_err();
    assert!(matches!(err, RegistryError::Precondition(_)));
    assert_eq!(waste(&workflow, &path).await.status, WasteStatus::Rejected);
}

#[tokio::test]
async fn test_concurrent_reservations_one_wins() {
    let workflow = memory_workflow(None).await;
    let path = workflow
        .submit_waste("a@b.com", new_waste("can", 5.0, None))
        .await
        .unwrap();
    workflow.classify_waste(&path).await.unwrap();
    workflow.approve_waste(&path, "admin").await.unwrap();

    let (first, second) = tokio::join!(
        workflow.reserve_waste(&path, "buyer-a"),
        workflow.reserve_waste(&path, "buyer-b"),
    );
    let results = [first, second];
    let winners: Vec<_> = results.iter().filter_map(|r| r.as_ref().ok()).collect();
    assert_eq!(winners.len(), 1);
    for loser in results.iter().filter_map(|r| r.as_ref().err()) {
        assert!(matches!(
            loser,
            RegistryError::Conflict(_) | RegistryError::InvalidTransition { .. }
        ));
    }

    let stored = waste(&workflow, &path).await;
    assert_eq!(stored.buyer_id, winners[0].buyer_id);
}

#[tokio::test]
async fn test_credit_is_issued_at_most_once() {
    let workflow = memory_workflow(None).await;
    let path = pooled_batch(&workflow, Some("ravi@okaxis")).await;

    workflow.execute_plantation(&path).await.unwrap();
    let err = workflow.execute_plantation(&path).await.unwrap_err();
    assert!(matches!(err, RegistryError::AlreadyCredited(_)));

    let record = waste(&workflow, &path).await;
    assert_eq!(record.credits_issued, Some(240));
    assert_eq!(record.payout_attempts, 1);
    let transfers = queries::transfers_for(workflow.store(), &path.owner)
        .await
        .unwrap();
    assert_eq!(transfers.len(), 1);
}

#[tokio::test]
async fn test_concurrent_execution_pays_once() {
    let workflow = memory_workflow(None).await;
    let path = pooled_batch(&workflow, Some("ravi@okaxis")).await;

    let (first, second) = tokio::join!(
        workflow.execute_plantation(&path),
        workflow.execute_plantation(&path),
    );
    assert_eq!(u8::from(first.is_ok()) + u8::from(second.is_ok()), 1);

    let transfers = queries::transfers_for(workflow.store(), &path.owner)
        .await
        .unwrap();
    assert_eq!(transfers.len(), 1);
}

#[tokio::test]
async fn test_chain_payout_registers_project() {
    let mut server = mockito::Server::new_async().await;
    let submit = server
        .mock("POST", "/")
        .match_body(Matcher::PartialJson(json!({
            "method": "registerProject",
            "params": { "owner": "0x9f2b", "credits": 240, "projectType": 1 }
        })))
        .with_header("content-type", "application/json")
        .with_body(r#"{"jsonrpc":"2.0","id":1,"result":{"hash":"0xfeed"}}"#)
        .expect(1)
        .create_async()
        .await;
    server
        .mock("POST", "/")
        .match_body(Matcher::PartialJson(json!({"method": "getTransactionReceipt"})))
        .with_header("content-type", "application/json")
        .with_body(receipt_body("success"))
        .create_async()
        .await;

    let workflow = memory_workflow(Some(mock_ledger(&server.url()))).await;
    let path = pooled_batch(&workflow, Some("0x9f2b")).await;

    let outcome = workflow.execute_plantation(&path).await.unwrap();
    assert_eq!(outcome.payout_mode, PayoutMode::Crypto);
    assert_eq!(outcome.blockchain_tx.as_deref(), Some("0xfeed"));
    submit.assert_async().await;

    let record = waste(&workflow, &path).await;
    assert_eq!(record.status, WasteStatus::Credited);
    assert_eq!(record.blockchain_tx.as_deref(), Some("0xfeed"));

    let transfer: Versioned<TransferRecord> =
        workflow.store().require(&outcome.transfer).await.unwrap();
    assert_eq!(transfer.value.user_wallet.as_deref(), Some("0x9f2b"));
    assert_eq!(transfer.value.blockchain_tx.as_deref(), Some("0xfeed"));
}

#[tokio::test]
async fn test_chain_payout_without_gateway_leaves_record_untouched() {
    let workflow = memory_workflow(None).await;
    let path = pooled_batch(&workflow, Some("0x9f2b")).await;

    let err = workflow.execute_plantation(&path).await.unwrap_err();
    assert!(matches!(err, RegistryError::Precondition(_)));
    let record = waste(&workflow, &path).await;
    assert_eq!(record.status, WasteStatus::PoolAllocated);
    assert_eq!(record.payout_attempts, 0);
}

#[tokio::test]
async fn test_failed_payout_can_be_reclaimed() {
    let mut failing = mockito::Server::new_async().await;
    failing
        .mock("POST", "/")
        .with_header("content-type", "application/json")
        .with_body(r#"{"jsonrpc":"2.0","id":1,"error":{"code":-32000,"message":"out of gas"}}"#)
        .create_async()
        .await;

    let workflow = memory_workflow(Some(mock_ledger(&failing.url()))).await;
    let path = pooled_batch(&workflow, Some("0x9f2b")).await;

    let err = workflow.execute_plantation(&path).await.unwrap_err();
    assert!(matches!(err, RegistryError::Ledger(_)));

    let record = waste(&workflow, &path).await;
    assert_eq!(record.status, WasteStatus::Planted);
    assert_eq!(record.payout_attempts, 1);
    assert!(record.payout_error.as_deref().unwrap().contains("out of gas"));
    assert_eq!(record.credits_issued, None);

    // Same records, healthy gateway.
    let mut healthy = mockito::Server::new_async().await;
    healthy
        .mock("POST", "/")
        .match_body(Matcher::PartialJson(json!({"method": "registerProject"})))
        .with_body(r#"{"jsonrpc":"2.0","id":1,"result":{"hash":"0xbeef"}}"#)
        .create_async()
        .await;
    healthy
        .mock("POST", "/")
        .match_body(Matcher::PartialJson(json!({"method": "getTransactionReceipt"})))
        .with_body(receipt_body("success"))
        .create_async()
        .await;
    let retry = Workflow::new(
        workflow.store().clone(),
        Some(mock_ledger(&healthy.url())),
        CategoryFactors::default(),
    );

    let outcome = retry.execute_plantation(&path).await.unwrap();
    assert_eq!(outcome.blockchain_tx.as_deref(), Some("0xbeef"));

    let record = waste(&retry, &path).await;
    assert_eq!(record.status, WasteStatus::Credited);
    assert_eq!(record.payout_attempts, 2);
    assert_eq!(record.payout_error, None);
}

#[tokio::test]
async fn test_in_flight_payout_blocks_reclaim() {
    let workflow = memory_workflow(None).await;
    let path = pooled_batch(&workflow, Some("ravi@okaxis")).await;

    // Another actor holds the claim and has not finished paying out.
    let mut record = waste(&workflow, &path).await;
    record.status = WasteStatus::Planted;
    record.payout_attempts = 1;
    record.claimed_at = Some(now_millis());
    workflow.store().set(&path, &record).await.unwrap();

    let err = workflow.execute_plantation(&path).await.unwrap_err();
    assert!(matches!(err, RegistryError::Conflict(_)));
    assert_eq!(waste(&workflow, &path).await.payout_attempts, 1);
}

#[tokio::test]
async fn test_missing_payout_is_a_precondition() {
    let workflow = memory_workflow(None).await;
    let path = pooled_batch(&workflow, None).await;
    let err = workflow.execute_plantation(&path).await.unwrap_err();
    assert!(matches!(err, RegistryError::Precondition(_)));
    assert_eq!(waste(&workflow, &path).await.status, WasteStatus::PoolAllocated);
}

#[tokio::test]
async fn test_missing_category_uses_default_factor_but_blocks_execution() {
    let workflow = memory_workflow(None).await;
    let path = DocPath::waste("o", "legacy");
    let legacy = WasteRecord {
        waste_name: "mixed".into(),
        waste_weight: 10.0,
        final_weight_kg: Some(10.0),
        status: WasteStatus::WeightVerified,
        payout: crate::payout::PayoutDestination::parse_optional(Some("o@upi")).unwrap(),
        ..Default::default()
    };
    workflow.store().set(&path, &legacy).await.unwrap();

    let (allocated, entry) = workflow.allocate_to_pool(&path).await.unwrap();
    assert!((allocated.plantation_units.unwrap() - 1.0).abs() < 1e-9);
    assert_eq!(entry.value.category, None);

    let err = workflow.execute_plantation(&path).await.unwrap_err();
    assert!(matches!(err, RegistryError::Precondition(_)));
}

#[tokio::test]
async fn test_zero_credit_batch_is_not_executed() {
    let workflow = memory_workflow(None).await;
    // Inert 0.5 kg -> floor(0.5) = 0 credits.
    let path = verified_batch(&workflow, "rubble", 0.5, 0.5, Some("o@upi")).await;
    workflow.allocate_to_pool(&path).await.unwrap();

    let err = workflow.execute_plantation(&path).await.unwrap_err();
    assert!(matches!(err, RegistryError::Precondition(_)));
    assert_eq!(waste(&workflow, &path).await.status, WasteStatus::PoolAllocated);
}

#[tokio::test]
async fn test_pool_lists_allocations() {
    let workflow = memory_workflow(None).await;
    pooled_batch(&workflow, None).await;
    pooled_batch(&workflow, None).await;

    let entries: Vec<Versioned<PoolAllocation>> = workflow
        .store()
        .collection(Collection::PlantationPool)
        .await
        .unwrap();
    assert_eq!(entries.len(), 2);
    assert!(entries.iter().all(|e| e.value.status == PoolStatus::Locked));
}

#[tokio::test]
async fn test_unconfirmed_payout_is_polled_not_resubmitted() {
    let mut slow = mockito::Server::new_async().await;
    let submit = submit_mock(&mut slow, "0xslow", 1).await;
    receipt_mock(&mut slow, "0xslow", None).await;

    let workflow = memory_workflow(Some(mock_ledger(&slow.url()))).await;
    let path = pooled_batch(&workflow, Some("0x9f2b")).await;

    for _ in 0..2 {
        let err = workflow.execute_plantation(&path).await.unwrap_err();
        assert!(err.to_string().contains("0xslow not confirmed"));
    }
    submit.assert_async().await;

    let record = waste(&workflow, &path).await;
    assert_eq!(record.status, WasteStatus::Planted);
    assert_eq!(record.pending_tx.as_deref(), Some("0xslow"));
    assert!(record.payout_error.is_some());
    assert_eq!(record.blockchain_tx, None);
    assert_eq!(record.payout_attempts, 2);

    // The transaction lands later; the retry picks up the same hash.
    let mut settled = mockito::Server::new_async().await;
    let resubmit = submit_mock(&mut settled, "0xother", 0).await;
    receipt_mock(&mut settled, "0xslow", Some("success")).await;
    let retry = Workflow::new(
        workflow.store().clone(),
        Some(mock_ledger(&settled.url())),
        CategoryFactors::default(),
    );

    let outcome = retry.execute_plantation(&path).await.unwrap();
    assert_eq!(outcome.blockchain_tx.as_deref(), Some("0xslow"));
    resubmit.assert_async().await;

    let record = waste(&retry, &path).await;
    assert_eq!(record.status, WasteStatus::Credited);
    assert_eq!(record.blockchain_tx.as_deref(), Some("0xslow"));
    assert_eq!(record.pending_tx, None);
    assert_eq!(record.payout_error, None);
}

#[tokio::test]
async fn test_reverted_pending_transaction_is_resubmitted() {
    let mut server = mockito::Server::new_async().await;
    let submit = submit_mock(&mut server, "0xnew", 1).await;
    receipt_mock(&mut server, "0xdead", Some("failed")).await;
    receipt_mock(&mut server, "0xnew", Some("success")).await;

    let workflow = memory_workflow(Some(mock_ledger(&server.url()))).await;
    let path = pooled_batch(&workflow, Some("0x9f2b")).await;

    // Left behind by an earlier attempt whose receipt was never seen.
    let mut record = waste(&workflow, &path).await;
    record.status = WasteStatus::Planted;
    record.payout_attempts = 1;
    record.claimed_at = Some(now_millis());
    record.pending_tx = Some("0xdead".into());
    record.payout_error = Some("Transaction 0xdead not confirmed after 3 polls".into());
    workflow.store().set(&path, &record).await.unwrap();

    let outcome = workflow.execute_plantation(&path).await.unwrap();
    assert_eq!(outcome.blockchain_tx.as_deref(), Some("0xnew"));
    submit.assert_async().await;
    assert_eq!(waste(&workflow, &path).await.payout_attempts, 2);
}

#[tokio::test]
async fn test_abandoned_claim_is_taken_over_after_timeout() {
    let mut server = mockito::Server::new_async().await;
    let submit = submit_mock(&mut server, "0xother", 0).await;
    receipt_mock(&mut server, "0xfeed", Some("success")).await;

    let workflow = memory_workflow(Some(mock_ledger(&server.url()))).await;
    let path = pooled_batch(&workflow, Some("0x9f2b")).await;

    // Claimed and submitted a minute ago, then nothing more was written.
    let mut record = waste(&workflow, &path).await;
    record.status = WasteStatus::Planted;
    record.payout_attempts = 1;
    record.claimed_at = Some(now_millis() - 60_000);
    record.pending_tx = Some("0xfeed".into());
    workflow.store().set(&path, &record).await.unwrap();

    let err = workflow.execute_plantation(&path).await.unwrap_err();
    assert!(matches!(err, RegistryError::Conflict(_)));

    let impatient = Workflow::new(
        workflow.store().clone(),
        Some(mock_ledger(&server.url())),
        CategoryFactors::default(),
    )
    .with_claim_timeout(std::time::Duration::from_secs(30));
    let outcome = impatient.execute_plantation(&path).await.unwrap();
    assert_eq!(outcome.blockchain_tx.as_deref(), Some("0xfeed"));
    submit.assert_async().await;

    let record = waste(&impatient, &path).await;
    assert_eq!(record.status, WasteStatus::Credited);
    assert_eq!(record.payout_attempts, 2);
}

#[tokio::test]
async fn test_failed_credit_write_keeps_confirmed_transaction() {
    let mut server = mockito::Server::new_async().await;
    let submit = submit_mock(&mut server, "0xfeed", 1).await;
    receipt_mock(&mut server, "0xfeed", Some("success")).await;

    let pool = memory_pool().await;
    let workflow = workflow_on(&pool, Some(mock_ledger(&server.url())));
    let path = pooled_batch(&workflow, Some("0x9f2b")).await;

    fail_writes(&pool, "no_credit", "UPDATE", "NEW.status = 'CREDITED'").await;
    assert!(workflow.execute_plantation(&path).await.is_err());

    let record = waste(&workflow, &path).await;
    assert_eq!(record.status, WasteStatus::Planted);
    assert_eq!(record.pending_tx.as_deref(), Some("0xfeed"));
    assert!(record.payout_error.is_some());

    allow_writes(&pool, "no_credit").await;
    let outcome = workflow.execute_plantation(&path).await.unwrap();
    assert_eq!(outcome.blockchain_tx.as_deref(), Some("0xfeed"));
    submit.assert_async().await;

    let transfers = queries::transfers_for(workflow.store(), &path.owner)
        .await
        .unwrap();
    assert_eq!(transfers.len(), 1);
}

#[tokio::test]
async fn test_allocation_rolls_back_without_pool_entry() {
    let pool = memory_pool().await;
    let workflow = workflow_on(&pool, None);
    let path = verified_batch(&workflow, "Rice husk", 20.0, 20.0, Some("ravi@okaxis")).await;

    fail_writes(&pool, "no_pool", "INSERT", "NEW.collection = 'PlantationPool'").await;
    assert!(workflow.allocate_to_pool(&path).await.is_err());

    let record = waste(&workflow, &path).await;
    assert_eq!(record.status, WasteStatus::WeightVerified);
    assert_eq!(record.pool_entry_id, None);

    allow_writes(&pool, "no_pool").await;
    let (allocated, entry) = workflow.allocate_to_pool(&path).await.unwrap();
    assert_eq!(allocated.pool_entry_id.as_deref(), Some(entry.path.id.as_str()));
    workflow.execute_plantation(&path).await.unwrap();
}

#[tokio::test]
async fn test_execution_requires_pool_entry() {
    let workflow = memory_workflow(None).await;
    let path = pooled_batch(&workflow, Some("ravi@okaxis")).await;

    let mut record = waste(&workflow, &path).await;
    record.pool_entry_id = Some("-Nmissing".into());
    workflow.store().set(&path, &record).await.unwrap();

    let err = workflow.execute_plantation(&path).await.unwrap_err();
    assert!(matches!(err, RegistryError::Precondition(_)));
    let record = waste(&workflow, &path).await;
    assert_eq!(record.status, WasteStatus::PoolAllocated);
    assert_eq!(record.payout_attempts, 0);
}
