//! Boundary to the native map SDK
//!
//! The crate never renders anything. It drives a [`MapView`] through its
//! lifecycle entry points and mutates overlays through [`Overlay`]; both are
//! implemented by the embedding host (see `recording` for an in-memory one).
use crate::kind_set::KindSet;
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::rc::Rc;

/// State the map view writes on save and reads back on create
pub type SavedState = IndexMap<String, serde_json::Value>;

/// Returns true when the click was consumed.
pub type OverlayClickListener = Rc<dyn Fn(&dyn Overlay) -> bool>;
pub type MapClickListener = Rc<dyn Fn(LatLng)>;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LatLng {
    pub lat: f64,
    pub lng: f64,
}

impl LatLng {
    pub const fn new(lat: f64, lng: f64) -> Self {
        LatLng { lat, lng }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CameraPosition {
    pub target: LatLng,
    pub zoom: f64,
    #[serde(default)]
    pub tilt: f64,
    #[serde(default)]
    pub bearing: f64,
}

/// A value written to a map option or an overlay property
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "value", rename_all = "snake_case")]
pub enum PropertyValue {
    Bool(bool),
    Int(i64),
    Float(f64),
    Text(String),
    Color(u32),
    LatLng(LatLng),
    Coords(Vec<LatLng>),
    Camera(CameraPosition),
    List(Vec<PropertyValue>),
}

impl From<bool> for PropertyValue {
    fn from(v: bool) -> Self {
        PropertyValue::Bool(v)
    }
}

impl From<i32> for PropertyValue {
    fn from(v: i32) -> Self {
        PropertyValue::Int(i64::from(v))
    }
}

impl From<i64> for PropertyValue {
    fn from(v: i64) -> Self {
        PropertyValue::Int(v)
    }
}

impl From<f32> for PropertyValue {
    fn from(v: f32) -> Self {
        PropertyValue::Float(f64::from(v))
    }
}

impl From<f64> for PropertyValue {
    fn from(v: f64) -> Self {
        PropertyValue::Float(v)
    }
}

impl From<String> for PropertyValue {
    fn from(v: String) -> Self {
        PropertyValue::Text(v)
    }
}

impl From<&str> for PropertyValue {
    fn from(v: &str) -> Self {
        PropertyValue::Text(v.to_string())
    }
}

impl From<LatLng> for PropertyValue {
    fn from(v: LatLng) -> Self {
        PropertyValue::LatLng(v)
    }
}

impl From<Vec<LatLng>> for PropertyValue {
    fn from(v: Vec<LatLng>) -> Self {
        PropertyValue::Coords(v)
    }
}

impl From<CameraPosition> for PropertyValue {
    fn from(v: CameraPosition) -> Self {
        PropertyValue::Camera(v)
    }
}

/// Concrete overlay types the SDK can create
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OverlayKind {
    Marker,
    InfoWindow,
    Circle,
    Polyline,
    Polygon,
    Path,
    GroundOverlay,
    LocationOverlay,
}

impl OverlayKind {
    pub const ALL: [OverlayKind; 8] = [
        OverlayKind::Marker,
        OverlayKind::InfoWindow,
        OverlayKind::Circle,
        OverlayKind::Polyline,
        OverlayKind::Polygon,
        OverlayKind::Path,
        OverlayKind::GroundOverlay,
        OverlayKind::LocationOverlay,
    ];

    pub const fn kind_bit(self) -> KindSet {
        match self {
            OverlayKind::Marker => KindSet::MARKER,
            OverlayKind::InfoWindow => KindSet::INFO_WINDOW,
            OverlayKind::Circle => KindSet::CIRCLE,
            OverlayKind::Polyline => KindSet::POLYLINE,
            OverlayKind::Polygon => KindSet::POLYGON,
            OverlayKind::Path => KindSet::PATH,
            OverlayKind::GroundOverlay => KindSet::GROUND_OVERLAY,
            OverlayKind::LocationOverlay => KindSet::LOCATION_OVERLAY,
        }
    }

    pub const fn name(self) -> &'static str {
        match self {
            OverlayKind::Marker => "Marker",
            OverlayKind::InfoWindow => "InfoWindow",
            OverlayKind::Circle => "Circle",
            OverlayKind::Polyline => "Polyline",
            OverlayKind::Polygon => "Polygon",
            OverlayKind::Path => "Path",
            OverlayKind::GroundOverlay => "GroundOverlay",
            OverlayKind::LocationOverlay => "LocationOverlay",
        }
    }

    /// Accepts both the SDK class name (`Marker`) and the snake form (`marker`).
    pub fn parse(name: &str) -> Option<OverlayKind> {
        OverlayKind::ALL.into_iter().find(|kind| {
            kind.name() == name || kind.name().eq_ignore_ascii_case(&name.replace('_', ""))
        })
    }
}

impl fmt::Display for OverlayKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// The native map view.
///
/// Methods take `&self`: the SDK object is shared between the root node and
/// every contributor that mutates it.
pub trait MapView {
    fn on_create(&self, saved_state: Option<&SavedState>);
    fn on_start(&self);
    fn on_resume(&self);
    fn on_pause(&self);
    fn on_stop(&self);
    fn on_destroy(&self);
    fn on_low_memory(&self);
    fn on_save_instance_state(&self, out: &mut SavedState);

    fn option(&self, name: &str) -> Option<PropertyValue>;
    /// `None` resets the option to the SDK default.
    fn set_option(&self, name: &str, value: Option<PropertyValue>);

    fn add_overlay(&self, kind: OverlayKind) -> Rc<dyn Overlay>;
    fn remove_overlay(&self, overlay: &dyn Overlay);

    fn set_click_listener(&self, listener: Option<MapClickListener>);
}

/// A native overlay owned by a map view
pub trait Overlay {
    /// SDK-assigned handle, stable for the overlay's lifetime.
    fn handle(&self) -> u64;
    fn kind(&self) -> OverlayKind;
    fn property(&self, name: &str) -> Option<PropertyValue>;
    /// `None` resets the property to the SDK default.
    fn set_property(&self, name: &str, value: Option<PropertyValue>);
    fn set_click_listener(&self, listener: Option<OverlayClickListener>);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn overlay_kind_parses_both_spellings() {
        assert_eq!(OverlayKind::parse("Marker"), Some(OverlayKind::Marker));
        assert_eq!(OverlayKind::parse("info_window"), Some(OverlayKind::InfoWindow));
        assert_eq!(OverlayKind::parse("GroundOverlay"), Some(OverlayKind::GroundOverlay));
        assert_eq!(OverlayKind::parse("Balloon"), None);
    }

    #[test]
    fn each_kind_has_its_own_bit() {
        let mut seen = KindSet::EMPTY;
        for kind in OverlayKind::ALL {
            assert!(!seen.includes(kind.kind_bit()), "{} shares a bit", kind);
            seen |= kind.kind_bit();
        }
    }

    #[test]
    fn property_value_json_shape() {
        let value = PropertyValue::from(LatLng::new(37.5, 127.0));
        let json = serde_json::to_value(&value).unwrap();
        assert_eq!(json["type"], "lat_lng");
        assert_eq!(json["value"]["lat"], 37.5);
        let back: PropertyValue = serde_json::from_value(json).unwrap();
        assert_eq!(back, value);
    }
}
