// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Local decision commits: the plain update path end to end.

use chronicle_core::{EventAttributes, FakeClock, TimerTask, TimerTaskKind};
use chronicle_history::{serialization, ExecutionCache, ShardContext, TestEnv, SECONDS_IN_DAY};
use chronicle_store::{ExecutionStore, Fault, StoreOp};
use std::sync::Arc;

fn cache(env: &TestEnv) -> ExecutionCache<FakeClock> {
    ExecutionCache::new(
        Arc::clone(&env.shard) as Arc<dyn ShardContext>,
        Arc::clone(&env.store) as Arc<dyn ExecutionStore>,
        env.clock.clone(),
    )
}

fn timer(id: &str) -> TimerTask {
    TimerTask::new(TimerTaskKind::UserTimer { timer_id: id.into(), fire_at_ms: 5_000 })
}

/// A caller adds three decision events and two timer tasks to a stored
/// execution at event 11, on a non-replicated domain.
#[tokio::test]
async fn fresh_local_update_without_replication() {
    let env = TestEnv::new();
    let domain_id = env.register_domain("orders", false, 3);
    let execution = env.seed_running(&domain_id, "wf-order", 11, None);
    let cache = cache(&env);

    let ctx = cache.get_or_create(&domain_id, &execution);
    let mut guard = ctx.lock().await;
    let state = guard.load().await.unwrap();
    let scheduled = state.add_event(EventAttributes::DecisionScheduled {
        task_list: "default".into(),
        attempt: 0,
    });
    let started =
        state.add_event(EventAttributes::DecisionStarted { scheduled_event_id: scheduled });
    state.add_event(EventAttributes::DecisionCompleted {
        scheduled_event_id: scheduled,
        started_event_id: started,
    });
    guard
        .update(vec![], vec![timer("t1"), timer("t2")], 42)
        .await
        .unwrap();

    // History: one batch, events 11..13, under transaction 42
    let appends = env.store.appends();
    assert_eq!(appends.len(), 1);
    assert_eq!(appends[0].first_event_id, 11);
    assert_eq!(appends[0].transaction_id, 42);
    let events = serialization::decode_events(&appends[0].events).unwrap();
    assert_eq!(events.iter().map(|e| e.event_id).collect::<Vec<_>>(), vec![11, 12, 13]);

    // Execution update: conditioned on 11, carries the timers, no
    // replication artifacts, not finishing
    let update = &env.store.updates()[0];
    assert_eq!(update.condition, 11);
    assert_eq!(update.timer_tasks.len(), 2);
    assert!(update.replication_tasks.is_empty());
    assert!(update.replication_state.is_none());
    assert!(!update.finish_execution);

    // Post-state: both sides agree on the next event id
    assert_eq!(guard.update_condition(), 14);
    let stored =
        env.store.snapshot(&domain_id, &execution.workflow_id, &execution.run_id).unwrap();
    assert_eq!(stored.execution_info.next_event_id, 14);
}

/// The store rejects the conditioned update; the caller gets the
/// conflict sentinel and the next load refetches.
#[tokio::test]
async fn conflicting_update_reports_conflict_and_reloads() {
    let env = TestEnv::new();
    let domain_id = env.register_domain("orders", false, 3);
    let execution = env.seed_running(&domain_id, "wf-order", 11, None);
    let cache = cache(&env);

    let ctx = cache.get_or_create(&domain_id, &execution);
    let mut guard = ctx.lock().await;
    let state = guard.load().await.unwrap();
    state.add_event(EventAttributes::DecisionScheduled {
        task_list: "default".into(),
        attempt: 0,
    });

    env.store.inject_fault(StoreOp::Update, Fault::ConditionFailed);
    let err = guard.update(vec![], vec![], 42).await.unwrap_err();
    assert!(err.is_conflict());

    // The cached view is gone; loading again goes back to the store
    let fetches = env.store.get_count();
    guard.load().await.unwrap();
    assert_eq!(env.store.get_count(), fetches + 1);
    assert_eq!(guard.update_condition(), 11);
}

/// Completing a workflow on a domain with 7-day retention instructs the
/// store to expire the current-run pointer after 7 * 86400 seconds.
#[tokio::test]
async fn completed_workflow_carries_retention_ttl() {
    let env = TestEnv::new();
    let domain_id = env.register_domain("orders", false, 7);
    let execution = env.seed_running(&domain_id, "wf-order", 11, None);
    let cache = cache(&env);

    let ctx = cache.get_or_create(&domain_id, &execution);
    let mut guard = ctx.lock().await;
    let state = guard.load().await.unwrap();
    state.add_event(EventAttributes::WorkflowCompleted { result: None });
    let transaction_id = env.shard.next_transaction_id();
    guard.update(vec![], vec![], transaction_id).await.unwrap();

    let update = &env.store.updates()[0];
    assert!(update.finish_execution);
    assert_eq!(update.finish_execution_ttl_secs, 7 * SECONDS_IN_DAY);
    assert_eq!(update.finish_execution_ttl_secs, 604_800);

    // Watchers learn the run stopped
    let notifications = env.shard.notifications();
    assert_eq!(notifications.len(), 1);
    assert!(!notifications[0].is_running);
}
