//! Device twin model

use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};

use crate::models::null_as_default;

/// A device twin as returned by the hub. Only tags are interpreted.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Twin {
    pub device_id: String,

    #[serde(default, deserialize_with = "null_as_default")]
    pub tags: Map<String, Value>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub etag: Option<String>,
}

impl Twin {
    /// Version tagged for `module` under `application`, if any
    pub fn application_version(&self, module: &str) -> Option<&str> {
        self.tags.get("application")?.get(module)?.as_str()
    }
}

/// Partial tag update sent with PATCH. Leaves not present are left untouched by the hub.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TagPatch {
    pub tags: Map<String, Value>,
}

impl TagPatch {
    /// Patch setting `tags.application.<module>` to `version`
    pub fn application(module: &str, version: &str) -> Self {
        let mut tags = Map::new();
        tags.insert("application".to_string(), json!({ module: version }));
        Self { tags }
    }

    /// Patch erasing `tags.application.<module>`; the hub removes null leaves
    pub fn clear_application(module: &str) -> Self {
        let mut tags = Map::new();
        tags.insert("application".to_string(), json!({ module: Value::Null }));
        Self { tags }
    }
}

/// Merge `patch` into `tags` the way the hub applies a partial twin update
pub fn merge_tags(tags: &mut Map<String, Value>, patch: &Map<String, Value>) {
    for (key, value) in patch {
        if value.is_null() {
            tags.remove(key);
            continue;
        }

        if let (Some(Value::Object(existing)), Value::Object(incoming)) = (tags.get_mut(key), value) {
            merge_tags(existing, incoming);
            continue;
        }

        tags.insert(key.clone(), value.clone());
    }
}
