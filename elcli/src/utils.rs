//! Utility functions

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::errors::LeapError;

/// Version information for the cli
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VersionInfo {
    pub version: String,
    pub git_hash: String,
    pub build_time: String,
}

/// Get version information
pub fn version_info() -> VersionInfo {
    VersionInfo {
        version: env!("CARGO_PKG_VERSION").to_string(),
        git_hash: option_env!("GIT_HASH").unwrap_or("unknown").to_string(),
        build_time: option_env!("BUILD_TIME").unwrap_or("unknown").to_string(),
    }
}

/// First 8 hex characters of a random UUID v4
pub fn short_id() -> String {
    uuid::Uuid::new_v4().simple().to_string()[..8].to_string()
}

/// Last group of a random UUID v4, used to label a release attempt
pub fn release_id() -> String {
    let id = uuid::Uuid::new_v4().to_string();
    id.rsplit('-').next().unwrap_or_default().to_string()
}

/// Split `["K=V", ...]` into a map. Each entry must split into exactly two parts.
pub fn split_key_values<S: AsRef<str>>(
    entries: &[S],
    sep: &str,
) -> Result<BTreeMap<String, String>, LeapError> {
    let mut map = BTreeMap::new();
    for entry in entries {
        let entry = entry.as_ref();
        let parts: Vec<&str> = entry.split(sep).collect();
        if parts.len() != 2 {
            return Err(LeapError::ConfigError(format!(
                "invalid key-value pair: {}",
                entry
            )));
        }
        map.insert(parts[0].to_string(), parts[1].to_string());
    }
    Ok(map)
}
