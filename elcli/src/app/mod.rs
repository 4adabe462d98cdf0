//! Command flows and their settings

pub mod run;
pub mod settings;
