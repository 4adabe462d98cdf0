//! Configuration (layered deployment) model

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};

use crate::errors::LeapError;
use crate::models::null_as_default;

/// Prefix of the edge agent key holding a module's desired properties
pub const MODULE_PROPERTIES_PREFIX: &str = "properties.desired.modules.";

/// A hub configuration resource.
///
/// Fields after `labels` are assigned by the hub. They are kept so a fetched
/// configuration can be re-created verbatim during rollback.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Configuration {
    /// Remote key, stable across re-releases of the same deployment
    pub id: String,

    /// Higher wins when target conditions overlap
    #[serde(default)]
    pub priority: i16,

    /// e.g. `tags.application.web='v2'`
    #[serde(default, deserialize_with = "null_as_default")]
    pub target_condition: String,

    #[serde(default, deserialize_with = "null_as_default")]
    pub content: Map<String, Value>,

    #[serde(
        default,
        deserialize_with = "null_as_default",
        skip_serializing_if = "BTreeMap::is_empty"
    )]
    pub labels: BTreeMap<String, String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub etag: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub schema_version: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_time_utc: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_updated_time_utc: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metrics: Option<Value>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub system_metrics: Option<Value>,
}

/// Desired runtime settings for a single edge module
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ModuleSpec {
    pub name: String,
    pub image: String,
    pub create_options: String,
    pub startup_order: u32,
    pub env: BTreeMap<String, String>,
}

impl Configuration {
    pub fn new(id: impl Into<String>, priority: i16, target_condition: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            priority,
            target_condition: target_condition.into(),
            ..Default::default()
        }
    }

    /// Attach a label, replacing any previous value for `key`
    pub fn with_label(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.labels.insert(key.into(), value.into());
        self
    }

    /// Replace the content with a layered edge agent deployment of `module`
    pub fn set_content(&mut self, module: &ModuleSpec) {
        let env: Map<String, Value> = module
            .env
            .iter()
            .map(|(k, v)| (k.clone(), json!({ "value": v })))
            .collect();

        let properties = json!({
            "settings": {
                "image": module.image,
                "createOptions": module.create_options,
            },
            "type": "docker",
            "status": "running",
            "restartPolicy": "always",
            "version": "1.0",
            "startupOrder": module.startup_order,
            "env": env,
        });

        let mut edge_agent = Map::new();
        edge_agent.insert(module_properties_key(&module.name), properties);

        let mut content = Map::new();
        content.insert(
            "modulesContent".to_string(),
            json!({ "$edgeAgent": Value::Object(edge_agent) }),
        );

        self.content = content;
    }

    /// Desired properties of `module` inside the edge agent content, if present
    pub fn module_properties(&self, module: &str) -> Option<&Map<String, Value>> {
        self.content
            .get("modulesContent")?
            .get("$edgeAgent")?
            .get(module_properties_key(module))?
            .as_object()
    }

    /// Image reference of `module`, if present
    pub fn module_image(&self, module: &str) -> Option<&str> {
        self.module_properties(module)?
            .get("settings")?
            .get("image")?
            .as_str()
    }

    /// Check that the content declares `module` as a desired edge agent module
    pub fn validate_content(&self, module: &str) -> Result<(), LeapError> {
        let properties = self.module_properties(module).ok_or_else(|| {
            LeapError::ContentError(format!("module {} is not set as a desired module", module))
        })?;

        if !properties.contains_key("settings") {
            return Err(LeapError::ContentError(format!(
                "module {} is missing its settings",
                module
            )));
        }

        Ok(())
    }

    /// Copy of this configuration with hub-assigned fields cleared
    pub fn without_server_fields(&self) -> Self {
        Self {
            id: self.id.clone(),
            priority: self.priority,
            target_condition: self.target_condition.clone(),
            content: self.content.clone(),
            labels: self.labels.clone(),
            ..Default::default()
        }
    }
}

/// Edge agent key for a module's desired properties
pub fn module_properties_key(module: &str) -> String {
    format!("{}{}", MODULE_PROPERTIES_PREFIX, module)
}

/// Target condition matching devices tagged with `module` at `version`
pub fn target_condition_for(module: &str, version: &str) -> String {
    format!("tags.application.{}='{}'", module, version)
}
