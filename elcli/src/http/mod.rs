//! Hub REST client and resource accessors

pub mod client;
pub mod configurations;
pub mod response;
pub mod twins;

/// API version pinned for every hub call
pub const API_VERSION: &str = "2021-04-12";
