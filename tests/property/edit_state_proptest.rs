//! Property-based tests for the edit gate

use planning_sync::client::sync::{EditState, EditStateTracker, EditTiming, RefreshOutcome};
use proptest::prelude::*;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::time::Instant;

#[derive(Debug, Clone)]
enum Op {
    EditStart,
    EditEnd,
    Request,
    Wait(u64),
}

fn op() -> impl Strategy<Value = Op> {
    prop_oneof![
        3 => Just(Op::EditStart),
        3 => Just(Op::EditEnd),
        4 => Just(Op::Request),
        3 => (1u64..4_000).prop_map(Op::Wait),
    ]
}

#[derive(Debug, Default)]
struct Trace {
    refreshes: Vec<Instant>,
    editing: Vec<(Instant, Option<Instant>)>,
    executed: usize,
    deferred: usize,
    edit_ends: usize,
}

fn run(ops: Vec<Op>) -> (Trace, EditState) {
    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_time()
        .start_paused(true)
        .build()
        .unwrap();

    runtime.block_on(async move {
        let refreshes: Arc<Mutex<Vec<Instant>>> = Arc::new(Mutex::new(Vec::new()));
        let log = Arc::clone(&refreshes);
        let tracker = EditStateTracker::new(
            EditTiming::default(),
            Arc::new(move || log.lock().unwrap().push(Instant::now())),
            tokio::runtime::Handle::current(),
        );

        let mut trace = Trace::default();
        let mut user_editing = false;
        for op in ops {
            match op {
                Op::EditStart => {
                    tracker.edit_start();
                    if !user_editing {
                        trace.editing.push((Instant::now(), None));
                        user_editing = true;
                    }
                }
                Op::EditEnd => {
                    tracker.edit_end();
                    if user_editing {
                        if let Some(interval) = trace.editing.last_mut() {
                            interval.1 = Some(Instant::now());
                        }
                        trace.edit_ends += 1;
                        user_editing = false;
                    }
                }
                Op::Request => match tracker.request_refresh() {
                    RefreshOutcome::Executed => trace.executed += 1,
                    RefreshOutcome::Deferred => trace.deferred += 1,
                    RefreshOutcome::Coalesced => {}
                },
                Op::Wait(ms) => tokio::time::sleep(Duration::from_millis(ms)).await,
            }
        }
        if !user_editing {
            tokio::time::sleep(Duration::from_secs(10)).await;
        }

        trace.refreshes = refreshes.lock().unwrap().clone();
        (trace, tracker.state())
    })
}

proptest! {
    #[test]
    fn test_refresh_never_runs_while_editing(ops in prop::collection::vec(op(), 1..40)) {
        let (trace, _) = run(ops);
        for at in &trace.refreshes {
            for (start, end) in &trace.editing {
                let inside = *at > *start && end.map_or(true, |end| *at < end);
                prop_assert!(!inside, "refresh at {:?} inside edit {:?}..{:?}", at, start, end);
            }
        }
    }

    #[test]
    fn test_each_deferral_runs_at_most_once(ops in prop::collection::vec(op(), 1..40)) {
        let (trace, _) = run(ops);
        let deferred_runs = trace.refreshes.len() - trace.executed;
        prop_assert!(deferred_runs <= trace.deferred);
        prop_assert!(deferred_runs <= trace.edit_ends);
    }

    #[test]
    fn test_gate_drains_once_editing_stops(ops in prop::collection::vec(op(), 1..40)) {
        let ends_idle = ops
            .iter()
            .rev()
            .find(|op| matches!(op, Op::EditStart | Op::EditEnd))
            .map_or(true, |op| matches!(op, Op::EditEnd));
        let (_, state) = run(ops);
        if ends_idle {
            prop_assert_eq!(state, EditState::default());
        }
    }
}
