//! Edge Leap library
//!
//! Publishes edge module configurations to an IoT hub and tags devices so
//! the hub's rollout engine applies them.

pub mod app;
pub mod errors;
pub mod http;
pub mod logs;
pub mod models;
pub mod release;
pub mod utils;
