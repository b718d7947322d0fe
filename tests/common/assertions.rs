//! Custom assertion macros and utilities
//!
//! Provides assertion macros with more descriptive failure output for the
//! counters and logs the sync tests inspect.

/// Assert that a result is an error, optionally of a given variant
#[macro_export]
macro_rules! assert_err {
    ($result:expr) => {
        assert!($result.is_err(), "Expected Err, got Ok");
    };
    ($result:expr, $pattern:pat) => {
        match $result {
            Err($pattern) => {}
            Ok(value) => panic!("Expected Err, got Ok: {:?}", value),
            Err(e) => panic!("Expected different error variant, got: {:?}", e),
        }
    };
}

/// Assert that the refresh callback ran exactly `n` times
#[macro_export]
macro_rules! assert_refreshes {
    ($harness:expr, $n:expr) => {
        let actual = $harness.refresh_count();
        assert_eq!(
            actual, $n,
            "Expected {} refreshes, got {} (metrics: {:?})",
            $n,
            actual,
            $harness.session.metrics()
        );
    };
}

/// Assert the exact sequence of notification levels shown so far
#[macro_export]
macro_rules! assert_notification_levels {
    ($harness:expr, [$($level:expr),* $(,)?]) => {
        let actual: Vec<_> = $harness
            .notifications
            .entries()
            .iter()
            .map(|n| n.level)
            .collect();
        let expected: Vec<planning_sync::shared::NotificationLevel> = vec![$($level),*];
        assert_eq!(actual, expected, "Unexpected notification sequence");
    };
}

/// Assert that a string contains a substring
#[macro_export]
macro_rules! assert_contains {
    ($haystack:expr, $needle:expr) => {
        assert!(
            $haystack.contains($needle),
            "Expected '{}' to contain '{}'",
            $haystack,
            $needle
        );
    };
}
