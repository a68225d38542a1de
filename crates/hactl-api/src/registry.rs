// Registry catalogs and the entity→area resolver.
//
// The server keeps entities and devices in two separate catalogs. An
// entity's area is either assigned directly or inherited from its device;
// `resolve` reconciles both catalogs into the set of exposed entities and
// their effective areas.

use std::collections::{BTreeMap, HashMap};

use indexmap::IndexSet;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{debug, warn};

use crate::error::Error;
use crate::session::Session;

const ENTITY_REGISTRY_LIST: &str = "config/entity_registry/list";
const DEVICE_REGISTRY_LIST: &str = "config/device_registry/list";
const AREA_REGISTRY_LIST: &str = "config/area_registry/list";

// ── Catalog entries ──────────────────────────────────────────────────

/// One row of `config/entity_registry/list`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EntityRegistryEntry {
    pub entity_id: String,

    #[serde(default)]
    pub device_id: Option<String>,

    /// Set only when the area is assigned to the entity itself.
    #[serde(default)]
    pub area_id: Option<String>,

    #[serde(default)]
    pub name: Option<String>,

    #[serde(default)]
    pub platform: Option<String>,

    #[serde(default)]
    pub options: Option<EntityOptions>,
}

/// Per-integration option blocks of an entity. Only the conversation
/// block is read.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EntityOptions {
    #[serde(default)]
    pub conversation: Option<ConversationOptions>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConversationOptions {
    #[serde(default)]
    pub should_expose: bool,
}

impl EntityRegistryEntry {
    /// Whether the entity is exposed to the voice assistant.
    pub fn is_exposed(&self) -> bool {
        self.options
            .as_ref()
            .and_then(|o| o.conversation.as_ref())
            .is_some_and(|c| c.should_expose)
    }
}

/// One row of `config/device_registry/list`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeviceRegistryEntry {
    pub id: String,

    #[serde(default)]
    pub area_id: Option<String>,

    #[serde(default)]
    pub name: Option<String>,
}

/// One row of `config/area_registry/list`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AreaEntry {
    pub area_id: String,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub picture: Option<String>,
}

// ── ResolvedRegistry ─────────────────────────────────────────────────

/// Exposed entities and their effective areas.
///
/// `exposed` keeps entity-catalog order. `entity_area` only holds exposed
/// entities whose area could be resolved.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResolvedRegistry {
    pub exposed: IndexSet<String>,
    pub entity_area: BTreeMap<String, String>,
}

impl ResolvedRegistry {
    pub fn is_exposed(&self, entity_id: &str) -> bool {
        self.exposed.contains(entity_id)
    }

    pub fn area_of(&self, entity_id: &str) -> Option<&str> {
        self.entity_area.get(entity_id).map(String::as_str)
    }
}

fn non_empty(value: Option<&String>) -> Option<&str> {
    value.map(String::as_str).filter(|s| !s.is_empty())
}

/// Reconcile the two catalogs.
///
/// An entity's own `area_id` wins over its device's. Non-exposed entities
/// are dropped entirely; exposed ones without any area stay in `exposed`
/// but get no `entity_area` entry.
pub fn resolve(entities: &[EntityRegistryEntry], devices: &[DeviceRegistryEntry]) -> ResolvedRegistry {
    let device_area: HashMap<&str, &str> = devices
        .iter()
        .filter_map(|d| non_empty(d.area_id.as_ref()).map(|area| (d.id.as_str(), area)))
        .collect();

    let mut resolved = ResolvedRegistry::default();
    for entity in entities.iter().filter(|e| e.is_exposed()) {
        resolved.exposed.insert(entity.entity_id.clone());

        let area = non_empty(entity.area_id.as_ref()).or_else(|| {
            non_empty(entity.device_id.as_ref()).and_then(|dev| device_area.get(dev).copied())
        });
        if let Some(area) = area {
            resolved
                .entity_area
                .insert(entity.entity_id.clone(), area.to_owned());
        }
    }
    resolved
}

// ── Session operations ───────────────────────────────────────────────

impl Session {
    /// Fetch the entity catalog.
    pub async fn list_entity_registry(&mut self) -> Result<Vec<EntityRegistryEntry>, Error> {
        self.call_as(ENTITY_REGISTRY_LIST, Value::Null).await
    }

    /// Fetch the device catalog.
    pub async fn list_device_registry(&mut self) -> Result<Vec<DeviceRegistryEntry>, Error> {
        self.call_as(DEVICE_REGISTRY_LIST, Value::Null).await
    }

    /// Fetch every area defined on the server.
    pub async fn list_areas(&mut self) -> Result<Vec<AreaEntry>, Error> {
        self.call_as(AREA_REGISTRY_LIST, Value::Null).await
    }

    /// Fetch both catalogs, one after the other, and resolve them.
    ///
    /// A failed entity catalog fails the whole operation. A failed device
    /// catalog only disables area inheritance; it is logged and resolution
    /// continues with no device areas (indistinguishable from a server with
    /// zero devices).
    pub async fn resolve_registry(&mut self) -> Result<ResolvedRegistry, Error> {
        let entities = self.list_entity_registry().await?;
        debug!(count = entities.len(), "entity registry fetched");

        let devices = match self.list_device_registry().await {
            Ok(devices) => devices,
            Err(e) => {
                warn!(error = %e, "device registry unavailable, area inheritance disabled");
                Vec::new()
            }
        };
        debug!(count = devices.len(), "device registry fetched");

        Ok(resolve(&entities, &devices))
    }
}

// ── Tests ────────────────────────────────────────────────────────────
