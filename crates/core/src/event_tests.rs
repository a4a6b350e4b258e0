// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use proptest::prelude::*;

fn event(attributes: EventAttributes) -> HistoryEvent {
    HistoryEvent::new(7, 3, 1_000, attributes)
}

#[test]
fn serializes_with_type_tag() {
    let ev = event(EventAttributes::TimerStarted { timer_id: "t1".into(), fire_after_ms: 500 });
    let json = serde_json::to_value(&ev).unwrap();
    assert_eq!(json["type"], "timer:started");
    assert_eq!(json["event_id"], 7);
    assert_eq!(json["version"], 3);
    assert_eq!(json["timer_id"], "t1");
}

#[test]
fn unknown_type_tag_deserializes_to_custom() {
    let json = r#"{"event_id":1,"version":-1,"timestamp_ms":0,"type":"workflow:hologram"}"#;
    let ev: HistoryEvent = serde_json::from_str(json).unwrap();
    assert_eq!(ev.attributes, EventAttributes::Custom);
}

#[test]
fn optional_fields_are_omitted_when_none() {
    let ev = event(EventAttributes::WorkflowCompleted { result: None });
    let json = serde_json::to_value(&ev).unwrap();
    assert!(json.get("result").is_none());
}

#[yare::parameterized(
    completed        = { EventAttributes::WorkflowCompleted { result: None }, true },
    failed           = { EventAttributes::WorkflowFailed { reason: "boom".into(), details: None }, true },
    continued        = { EventAttributes::WorkflowContinuedAsNew { new_run_id: RunId::from_string("run-2") }, true },
    started          = { EventAttributes::WorkflowStarted { workflow_type: "t".into(), task_list: "tl".into(), input: None, continued_from_run_id: None }, false },
    signaled         = { EventAttributes::WorkflowSignaled { signal_name: "s".into(), input: None }, false },
    decision_started = { EventAttributes::DecisionStarted { scheduled_event_id: 2 }, false },
)]
fn terminal_iff_closing_attributes(attributes: EventAttributes, expected: bool) {
    assert_eq!(attributes.is_terminal(), expected);
}

fn arb_attributes() -> impl Strategy<Value = EventAttributes> {
    prop_oneof![
        Just(EventAttributes::WorkflowCompleted { result: None }),
        ".{1,12}".prop_map(|r| EventAttributes::WorkflowFailed { reason: r.into(), details: None }),
        (1i64..100).prop_map(|id| EventAttributes::DecisionStarted { scheduled_event_id: id }),
        (".{1,8}", 0u64..10_000).prop_map(|(t, ms)| EventAttributes::TimerStarted {
            timer_id: t.into(),
            fire_after_ms: ms,
        }),
        (1i64..100, 1i64..100).prop_map(|(s, st)| EventAttributes::DecisionCompleted {
            scheduled_event_id: s,
            started_event_id: st,
        }),
    ]
}

proptest! {
    #[test]
    fn event_serde_roundtrip(
        event_id in 1i64..1_000_000,
        version in -1i64..100,
        attributes in arb_attributes(),
    ) {
        let ev = HistoryEvent::new(event_id, version, 42, attributes);
        let json = serde_json::to_string(&ev).unwrap();
        let back: HistoryEvent = serde_json::from_str(&json).unwrap();
        prop_assert_eq!(ev, back);
    }
}
