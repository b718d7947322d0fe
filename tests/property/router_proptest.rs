//! Property-based tests for event routing

use planning_sync::client::sync::{SubscriptionId, UpdateEventRouter};
use planning_sync::shared::{EventSource, OriginFlags, RefreshDisposition, SyncEvent};
use proptest::prelude::*;
use std::sync::{Arc, Mutex};

#[derive(Debug, Clone)]
enum Op {
    Subscribe,
    Unsubscribe(usize),
    Publish,
}

fn op() -> impl Strategy<Value = Op> {
    prop_oneof![
        3 => Just(Op::Subscribe),
        2 => any::<usize>().prop_map(Op::Unsubscribe),
        3 => Just(Op::Publish),
    ]
}

proptest! {
    #[test]
    fn test_publish_reaches_live_subscribers_in_order(ops in prop::collection::vec(op(), 1..60)) {
        let router = UpdateEventRouter::new();
        let log: Arc<Mutex<Vec<usize>>> = Arc::new(Mutex::new(Vec::new()));
        let mut live: Vec<(usize, SubscriptionId)> = Vec::new();
        let mut next_label = 0;

        for op in ops {
            match op {
                Op::Subscribe => {
                    let label = next_label;
                    next_label += 1;
                    let log = Arc::clone(&log);
                    let id = router.subscribe(move |_| log.lock().unwrap().push(label));
                    live.push((label, id));
                }
                Op::Unsubscribe(pick) => {
                    if !live.is_empty() {
                        let (_, id) = live.remove(pick % live.len());
                        prop_assert!(router.unsubscribe(id));
                        prop_assert!(!router.unsubscribe(id));
                    }
                }
                Op::Publish => {
                    log.lock().unwrap().clear();
                    router.publish(SyncEvent::synced_change(EventSource::CrossTab));
                    let expected: Vec<usize> = live.iter().map(|(label, _)| *label).collect();
                    prop_assert_eq!(&*log.lock().unwrap(), &expected);
                }
            }
            prop_assert_eq!(router.subscriber_count(), live.len());
        }
    }

    #[test]
    fn test_only_both_flags_suppress(no_refresh in any::<bool>(), from_sync in any::<bool>()) {
        let disposition = OriginFlags { no_refresh, from_sync }.disposition();
        let expected = match (no_refresh, from_sync) {
            (true, true) => RefreshDisposition::Suppress,
            (true, false) => RefreshDisposition::BookkeepingOnly,
            _ => RefreshDisposition::Refresh,
        };
        prop_assert_eq!(disposition, expected);
    }

    #[test]
    fn test_nested_publishes_never_interleave(depth in 1usize..6) {
        let router = UpdateEventRouter::new();
        let log: Arc<Mutex<Vec<(usize, usize)>>> = Arc::new(Mutex::new(Vec::new()));
        let remaining = Arc::new(Mutex::new(depth));

        for handler in 0..2 {
            let log = Arc::clone(&log);
            let remaining = Arc::clone(&remaining);
            let inner = router.clone();
            router.subscribe(move |_| {
                {
                    let mut log = log.lock().unwrap();
                    let round = log.iter().filter(|(h, _)| *h == handler).count();
                    log.push((handler, round));
                }
                if handler == 0 {
                    let mut left = remaining.lock().unwrap();
                    if *left > 0 {
                        *left -= 1;
                        drop(left);
                        inner.publish(SyncEvent::edit_start());
                    }
                }
            });
        }

        router.publish(SyncEvent::edit_start());

        let log = log.lock().unwrap();
        prop_assert_eq!(log.len(), 2 * (depth + 1));
        for (i, entry) in log.iter().enumerate() {
            prop_assert_eq!(*entry, (i % 2, i / 2));
        }
    }
}
