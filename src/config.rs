//! Serde-backed configuration: initial map options and codegen settings
use crate::errors::MapError;
use crate::kind_set::KindSet;
use crate::map_view::{CameraPosition, PropertyValue};
use crate::modifier::Modifier;
use crate::overlay::OverlayModifiers;
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

/// Options a map view starts with.
///
/// Fields missing from the JSON fall back to their defaults.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct MapViewOptions {
    pub camera: Option<CameraPosition>,
    pub map_type: Option<String>,
    /// Any other SDK option, applied in the order given.
    pub options: IndexMap<String, PropertyValue>,
}

impl MapViewOptions {
    pub fn from_json(json: &str) -> Result<Self, MapError> {
        Ok(serde_json::from_str(json)?)
    }

    /// Root-chain contributions applying these options.
    pub fn to_modifier(&self) -> Modifier {
        let mut modifier = Modifier::empty();
        if let Some(camera) = self.camera {
            modifier = modifier.camera(camera);
        }
        if let Some(map_type) = &self.map_type {
            modifier = modifier.map_option("mapType", map_type.clone());
        }
        for (name, value) in &self.options {
            modifier = modifier.property(KindSet::MAP_VIEW, name.clone(), value.clone());
        }
        modifier
    }
}

/// Settings for the modifier code generator
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct GeneratorConfig {
    /// Path the generated code imports the runtime from.
    pub crate_path: String,
    /// Emit setters the SDK marks deprecated (with `#[deprecated]`).
    pub include_deprecated: bool,
    pub emit_doc_links: bool,
    /// Prefix for generated function names; defaults to the overlay name.
    pub fn_prefix: Option<String>,
}

impl Default for GeneratorConfig {
    fn default() -> Self {
        GeneratorConfig {
            crate_path: "map_reconciler".to_string(),
            include_deprecated: true,
            emit_doc_links: true,
            fn_prefix: None,
        }
    }
}

impl GeneratorConfig {
    pub fn from_json(json: &str) -> Result<Self, MapError> {
        Ok(serde_json::from_str(json)?)
    }
}
