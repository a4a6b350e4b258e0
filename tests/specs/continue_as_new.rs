// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Continue-as-new: the old run closes and its successor starts, with
//! compensating cleanup when the second step fails.

use chronicle_core::{EventAttributes, FakeClock, RunId, WorkflowExecution};
use chronicle_history::{ExecutionCache, MutableState, ShardContext, TestEnv};
use chronicle_store::{ExecutionStore, Fault, StoreOp};
use std::sync::Arc;

fn cache(env: &TestEnv) -> ExecutionCache<FakeClock> {
    ExecutionCache::new(
        Arc::clone(&env.shard) as Arc<dyn ShardContext>,
        Arc::clone(&env.store) as Arc<dyn ExecutionStore>,
        env.clock.clone(),
    )
}

fn successor_state(
    env: &TestEnv,
    domain_id: &chronicle_core::DomainId,
    old: &WorkflowExecution,
) -> (WorkflowExecution, MutableState<FakeClock>) {
    let new_execution = WorkflowExecution::new(old.workflow_id.clone(), RunId::new());
    let mut state = MutableState::new(domain_id.clone(), new_execution.clone(), env.clock.clone());
    state.add_event(EventAttributes::WorkflowStarted {
        workflow_type: "test-workflow".into(),
        task_list: "default".into(),
        input: None,
        continued_from_run_id: Some(old.run_id.clone()),
    });
    (new_execution, state)
}

/// Happy path: successor history appends first, then the old run commits
/// once as continued-as-new with the bridging context blob.
#[tokio::test]
async fn old_run_closes_and_successor_starts() {
    let env = TestEnv::new();
    let domain_id = env.register_domain("orders", false, 3);
    let execution = env.seed_running(&domain_id, "wf-order", 11, None);
    let cache = cache(&env);

    let ctx = cache.get_or_create(&domain_id, &execution);
    let mut guard = ctx.lock().await;
    let state = guard.load().await.unwrap();
    let (new_execution, new_state) = successor_state(&env, &domain_id, &execution);
    state.add_event(EventAttributes::WorkflowContinuedAsNew {
        new_run_id: new_execution.run_id.clone(),
    });

    let transaction_id = env.shard.next_transaction_id();
    guard
        .continue_as_new(b"bridge".to_vec(), new_state, vec![], vec![], transaction_id)
        .await
        .unwrap();

    // Successor history starts at event 1
    let successor_history =
        env.store.history(&domain_id, &new_execution.workflow_id, &new_execution.run_id);
    assert_eq!(successor_history.len(), 1);
    assert_eq!(successor_history[0].first_event_id, 1);

    // The old run's single conditioned commit closed it
    let update = &env.store.updates()[0];
    assert!(update.continue_as_new);
    assert!(update.finish_execution);
    assert_eq!(update.execution_info.execution_context.as_deref(), Some(b"bridge".as_ref()));
    let stored =
        env.store.snapshot(&domain_id, &execution.workflow_id, &execution.run_id).unwrap();
    assert_eq!(stored.execution_info.state, chronicle_store::WorkflowState::Completed);
}

/// The successor's history lands but the old run's commit fails: the
/// error surfaces, the cache is dropped, and the orphaned history is
/// reclaimed so no unreachable run lingers.
#[tokio::test]
async fn failed_second_step_reclaims_orphan_history() {
    let env = TestEnv::new();
    let domain_id = env.register_domain("orders", false, 3);
    let execution = env.seed_running(&domain_id, "wf-order", 11, None);
    let cache = cache(&env);

    let ctx = cache.get_or_create(&domain_id, &execution);
    let mut guard = ctx.lock().await;
    let state = guard.load().await.unwrap();
    let (new_execution, new_state) = successor_state(&env, &domain_id, &execution);
    state.add_event(EventAttributes::WorkflowContinuedAsNew {
        new_run_id: new_execution.run_id.clone(),
    });

    env.store.inject_fault(StoreOp::Update, Fault::ConditionFailed);
    let transaction_id = env.shard.next_transaction_id();
    let err = guard
        .continue_as_new(b"bridge".to_vec(), new_state, vec![], vec![], transaction_id)
        .await
        .unwrap_err();
    assert!(err.is_conflict());
    assert!(guard.mutable_state().is_none());

    // The orphan was deleted; the old run is untouched
    assert!(env
        .store
        .history(&domain_id, &new_execution.workflow_id, &new_execution.run_id)
        .is_empty());
    let stored =
        env.store.snapshot(&domain_id, &execution.workflow_id, &execution.run_id).unwrap();
    assert_eq!(stored.execution_info.next_event_id, 11);
    assert!(env.shard.notifications().is_empty());
}
