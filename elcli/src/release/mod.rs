//! Release orchestration against the hub

pub mod fsm;
pub mod provider;
pub mod releaser;
