// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Globally replicated domains: replication bookkeeping on local commits
//! and the remote-batch apply path.

use chronicle_core::{
    EventAttributes, FakeClock, HistoryEvent, ReplicationInfo, TransferTask, TransferTaskKind,
};
use chronicle_history::{
    serialization, ExecutionCache, ReplicateRequest, ShardContext, TestEnv,
};
use chronicle_store::ExecutionStore;
use std::sync::Arc;

fn cache(env: &TestEnv) -> ExecutionCache<FakeClock> {
    ExecutionCache::new(
        Arc::clone(&env.shard) as Arc<dyn ShardContext>,
        Arc::clone(&env.store) as Arc<dyn ExecutionStore>,
        env.clock.clone(),
    )
}

/// A local commit on a global domain at failover version 17: the
/// replication state is stamped, one replication task ships the batch,
/// and every task carries the version.
#[tokio::test]
async fn global_domain_update_ships_replication_task() {
    let env = TestEnv::global();
    let domain_id = env.register_domain("orders", true, 3);
    env.set_failover_version(&domain_id, 17);
    let execution = env.seed_running(&domain_id, "wf-order", 11, Some(1));
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
    let transfer = TransferTask::new(TransferTaskKind::DecisionTask {
        task_list: "default".into(),
        schedule_id: scheduled,
    });
    let transaction_id = env.shard.next_transaction_id();
    guard.update(vec![transfer], vec![], transaction_id).await.unwrap();

    let update = &env.store.updates()[0];

    // Replication state: last event stamped after the session closed
    let rs = update.replication_state.as_ref().unwrap();
    assert_eq!(rs.current_version, 17);
    assert_eq!(rs.last_write_version, 17);
    assert_eq!(rs.last_write_event_id, 13);

    // One task shipping events 11..14 at version 17
    assert_eq!(update.replication_tasks.len(), 1);
    let task = &update.replication_tasks[0];
    assert_eq!(task.first_event_id, 11);
    assert_eq!(task.next_event_id, 14);
    assert_eq!(task.version, 17);

    // Transfer tasks route with the same version
    assert!(update.transfer_tasks.iter().all(|t| t.version == 17));

    // Generated events carry the stamped version too
    let events = serialization::decode_events(&env.store.appends()[0].events).unwrap();
    assert!(events.iter().all(|e| e.version == 17));
}

/// Applying a remote batch: events 8..10 from cluster "west" at version
/// 5. The supplied events are appended verbatim, the replication state
/// records the remote write, and no replication task is emitted.
#[tokio::test]
async fn replication_apply_uses_the_remote_batch() {
    let env = TestEnv::global();
    let domain_id = env.register_domain("orders", true, 3);
    let execution = env.seed_running(&domain_id, "wf-order", 8, Some(1));
    let cache = cache(&env);

    let remote_events: Vec<HistoryEvent> = (8..=10)
        .map(|id| {
            HistoryEvent::new(id, 5, 2_000, EventAttributes::WorkflowSignaled {
                signal_name: "remote-signal".into(),
                input: None,
            })
        })
        .collect();

    let ctx = cache.get_or_create(&domain_id, &execution);
    let mut guard = ctx.lock().await;
    guard.load().await.unwrap();
    let transaction_id = env.shard.next_transaction_id();
    guard
        .replicate(
            ReplicateRequest {
                source_cluster: "west".into(),
                version: 5,
                history: remote_events.clone(),
            },
            vec![],
            vec![],
            10,
            transaction_id,
        )
        .await
        .unwrap();

    // The remote batch landed verbatim
    let appends = env.store.appends();
    assert_eq!(appends.len(), 1);
    assert_eq!(appends[0].first_event_id, 8);
    assert_eq!(serialization::decode_events(&appends[0].events).unwrap(), remote_events);

    // Remote write recorded; the apply produced no replication task
    let update = &env.store.updates()[0];
    assert!(update.replication_tasks.is_empty());
    let rs = update.replication_state.as_ref().unwrap();
    assert_eq!(
        rs.last_replication_info["west"],
        ReplicationInfo { version: 5, last_event_id: 10 }
    );

    // next_event_id follows the authoritative remote batch
    assert_eq!(update.execution_info.next_event_id, 11);
    assert_eq!(guard.update_condition(), 11);
}
