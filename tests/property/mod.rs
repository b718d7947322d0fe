//! Property-based tests

pub mod edit_state_proptest;
pub mod router_proptest;
