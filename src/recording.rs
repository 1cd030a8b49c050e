//! In-memory map SDK that records every call it receives
//!
//! Backs the Python session and the tests; hosts with a real SDK implement
//! [`MapView`] and [`Overlay`] themselves.
use crate::map_view::{
    LatLng, MapClickListener, MapView, Overlay, OverlayClickListener, OverlayKind, PropertyValue,
    SavedState,
};
use indexmap::IndexMap;
use serde::Serialize;
use std::cell::{Cell, RefCell};
use std::rc::Rc;

/// One call made against the recording SDK
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "call", rename_all = "snake_case")]
pub enum MapCall {
    Create { restored: bool },
    Start,
    Resume,
    Pause,
    Stop,
    Destroy,
    LowMemory,
    SaveState,
    SetOption { name: String, value: Option<PropertyValue> },
    SetMapClickListener { present: bool },
    AddOverlay { handle: u64, kind: OverlayKind },
    RemoveOverlay { handle: u64 },
    SetProperty { handle: u64, name: String, value: Option<PropertyValue> },
    SetClickListener { handle: u64, present: bool },
}

type CallLog = Rc<RefCell<Vec<MapCall>>>;

pub struct RecordingOverlay {
    handle: u64,
    kind: OverlayKind,
    properties: RefCell<IndexMap<String, PropertyValue>>,
    listener: RefCell<Option<OverlayClickListener>>,
    calls: CallLog,
}

impl RecordingOverlay {
    pub fn properties(&self) -> IndexMap<String, PropertyValue> {
        self.properties.borrow().clone()
    }

    pub fn has_click_listener(&self) -> bool {
        self.listener.borrow().is_some()
    }
}

impl Overlay for RecordingOverlay {
    fn handle(&self) -> u64 {
        self.handle
    }

    fn kind(&self) -> OverlayKind {
        self.kind
    }

    fn property(&self, name: &str) -> Option<PropertyValue> {
        self.properties.borrow().get(name).cloned()
    }

    fn set_property(&self, name: &str, value: Option<PropertyValue>) {
        match &value {
            Some(v) => {
                self.properties.borrow_mut().insert(name.to_string(), v.clone());
            }
            None => {
                self.properties.borrow_mut().shift_remove(name);
            }
        }
        self.calls.borrow_mut().push(MapCall::SetProperty {
            handle: self.handle,
            name: name.to_string(),
            value,
        });
    }

    fn set_click_listener(&self, listener: Option<OverlayClickListener>) {
        let present = listener.is_some();
        *self.listener.borrow_mut() = listener;
        self.calls.borrow_mut().push(MapCall::SetClickListener {
            handle: self.handle,
            present,
        });
    }
}

/// A map view that keeps its state in memory
#[derive(Default)]
pub struct RecordingMap {
    calls: CallLog,
    options: RefCell<IndexMap<String, PropertyValue>>,
    overlays: RefCell<IndexMap<u64, Rc<RecordingOverlay>>>,
    next_handle: Cell<u64>,
    click_listener: RefCell<Option<MapClickListener>>,
    /// Written by `on_save_instance_state`.
    state: RefCell<SavedState>,
}

impl RecordingMap {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn calls(&self) -> Vec<MapCall> {
        self.calls.borrow().clone()
    }

    pub fn take_calls(&self) -> Vec<MapCall> {
        std::mem::take(&mut *self.calls.borrow_mut())
    }

    pub fn overlay(&self, handle: u64) -> Option<Rc<RecordingOverlay>> {
        self.overlays.borrow().get(&handle).cloned()
    }

    /// Live overlays in creation order.
    pub fn overlays(&self) -> Vec<Rc<RecordingOverlay>> {
        self.overlays.borrow().values().cloned().collect()
    }

    /// Simulates a tap on an overlay. Returns whether a listener consumed it.
    pub fn click_overlay(&self, handle: u64) -> bool {
        let Some(overlay) = self.overlay(handle) else {
            return false;
        };
        let listener = overlay.listener.borrow().clone();
        match listener {
            Some(listener) => listener(overlay.as_ref()),
            None => false,
        }
    }

    /// Simulates a tap on the map surface.
    pub fn click_map(&self, at: LatLng) {
        let listener = self.click_listener.borrow().clone();
        if let Some(listener) = listener {
            listener(at);
        }
    }

    fn record(&self, call: MapCall) {
        self.calls.borrow_mut().push(call);
    }
}

impl MapView for RecordingMap {
    fn on_create(&self, saved_state: Option<&SavedState>) {
        if let Some(saved) = saved_state {
            *self.state.borrow_mut() = saved.clone();
        }
        self.record(MapCall::Create {
            restored: saved_state.is_some_and(|s| !s.is_empty()),
        });
    }

    fn on_start(&self) {
        self.record(MapCall::Start);
    }

    fn on_resume(&self) {
        self.record(MapCall::Resume);
    }

    fn on_pause(&self) {
        self.record(MapCall::Pause);
    }

    fn on_stop(&self) {
        self.record(MapCall::Stop);
    }

    fn on_destroy(&self) {
        self.record(MapCall::Destroy);
    }

    fn on_low_memory(&self) {
        self.record(MapCall::LowMemory);
    }

    fn on_save_instance_state(&self, out: &mut SavedState) {
        if let Some(PropertyValue::Camera(camera)) = self.option("camera") {
            if let Ok(value) = serde_json::to_value(camera) {
                out.insert("camera".to_string(), value);
            }
        }
        out.insert(
            "overlay_count".to_string(),
            serde_json::Value::from(self.overlays.borrow().len()),
        );
        *self.state.borrow_mut() = out.clone();
        self.record(MapCall::SaveState);
    }

    fn option(&self, name: &str) -> Option<PropertyValue> {
        self.options.borrow().get(name).cloned()
    }

    fn set_option(&self, name: &str, value: Option<PropertyValue>) {
        match &value {
            Some(v) => {
                self.options.borrow_mut().insert(name.to_string(), v.clone());
            }
            None => {
                self.options.borrow_mut().shift_remove(name);
            }
        }
        self.record(MapCall::SetOption {
            name: name.to_string(),
            value,
        });
    }

    fn add_overlay(&self, kind: OverlayKind) -> Rc<dyn Overlay> {
        let handle = self.next_handle.get() + 1;
        self.next_handle.set(handle);
        let overlay = Rc::new(RecordingOverlay {
            handle,
            kind,
            properties: RefCell::default(),
            listener: RefCell::default(),
            calls: self.calls.clone(),
        });
        self.overlays.borrow_mut().insert(handle, overlay.clone());
        self.record(MapCall::AddOverlay { handle, kind });
        overlay
    }

    fn remove_overlay(&self, overlay: &dyn Overlay) {
        let handle = overlay.handle();
        self.overlays.borrow_mut().shift_remove(&handle);
        self.record(MapCall::RemoveOverlay { handle });
    }

    fn set_click_listener(&self, listener: Option<MapClickListener>) {
        let present = listener.is_some();
        *self.click_listener.borrow_mut() = listener;
        self.record(MapCall::SetMapClickListener { present });
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn overlays_share_the_map_call_log() {
        let map = RecordingMap::new();
        let marker = map.add_overlay(OverlayKind::Marker);
        marker.set_property("zIndex", Some(PropertyValue::Int(3)));
        map.remove_overlay(marker.as_ref());
        assert_eq!(
            map.take_calls(),
            [
                MapCall::AddOverlay { handle: 1, kind: OverlayKind::Marker },
                MapCall::SetProperty {
                    handle: 1,
                    name: "zIndex".into(),
                    value: Some(PropertyValue::Int(3)),
                },
                MapCall::RemoveOverlay { handle: 1 },
            ]
        );
        assert!(map.overlays().is_empty());
        assert!(map.calls().is_empty());
    }

    #[test]
    fn click_reaches_installed_listener() {
        let map = RecordingMap::new();
        let marker = map.add_overlay(OverlayKind::Marker);
        assert!(!map.click_overlay(marker.handle()));
        marker.set_click_listener(Some(Rc::new(|o: &dyn Overlay| o.kind() == OverlayKind::Marker)));
        assert!(map.click_overlay(marker.handle()));
        assert!(!map.click_overlay(99));
    }

    #[test]
    fn calls_serialize_tagged() {
        let json = serde_json::to_value(MapCall::AddOverlay {
            handle: 4,
            kind: OverlayKind::GroundOverlay,
        })
        .unwrap();
        assert_eq!(json["call"], "add_overlay");
        assert_eq!(json["kind"], "ground_overlay");
    }
}
