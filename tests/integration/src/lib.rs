//! Integration test utilities for the gateway client
//!
//! Mock platform endpoints and a scripted websocket gateway for end-to-end
//! session tests.

pub mod fixtures;
pub mod helpers;

pub use fixtures::*;
pub use helpers::*;
