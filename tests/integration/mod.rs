//! Integration tests driving a full sync session

pub mod connectivity_test;
pub mod cross_tab_test;
pub mod session_test;
