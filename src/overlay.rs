//! Standard contributions for overlays and the map view
use crate::contributor::{AttachTarget, Contributor, DetachHandle, downcast_contributor};
use crate::kind_set::KindSet;
use crate::map_view::{
    CameraPosition, LatLng, MapClickListener, Overlay, OverlayClickListener, PropertyValue,
};
use crate::modifier::{Modifier, ModifierElement};
use crate::types::CapabilityTag;
use log::trace;
use std::borrow::Cow;
use std::cell::RefCell;
use std::fmt;
use std::rc::Rc;

const PROPERTY_NAMESPACE: &str = "property";
const LISTENER_NAMESPACE: &str = "listener";

fn read(target: &AttachTarget, name: &str) -> Option<PropertyValue> {
    match target.overlay() {
        Some(overlay) => overlay.property(name),
        None => target.map().option(name),
    }
}

fn write(target: &AttachTarget, name: &str, value: Option<PropertyValue>) {
    match target.overlay() {
        Some(overlay) => overlay.set_property(name, value),
        None => target.map().set_option(name, value),
    }
}

/// Sets one named property on an overlay, or one option on the map view.
///
/// The value found before attaching is restored on detach, so stacked
/// elements writing the same name unwind correctly.
#[derive(Debug, Clone)]
pub struct Property {
    kinds: KindSet,
    name: Cow<'static, str>,
    value: PropertyValue,
}

impl Property {
    pub fn new(
        kinds: KindSet,
        name: impl Into<Cow<'static, str>>,
        value: impl Into<PropertyValue>,
    ) -> Self {
        Property {
            kinds,
            name: name.into(),
            value: value.into(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn value(&self) -> &PropertyValue {
        &self.value
    }
}

#[derive(Debug)]
pub struct PropertyContributor {
    name: Cow<'static, str>,
    value: PropertyValue,
    restore: DetachHandle,
}

impl PropertyContributor {
    pub fn value(&self) -> &PropertyValue {
        &self.value
    }
}

impl Contributor for PropertyContributor {
    fn detach(&mut self) {
        trace!("PropertyContributor: restoring '{}'", self.name);
        self.restore.run();
    }
}

impl ModifierElement for Property {
    fn tag(&self) -> CapabilityTag {
        CapabilityTag::in_namespace(self.kinds, PROPERTY_NAMESPACE, self.name.clone())
    }

    fn create(&self, target: &AttachTarget) -> Box<dyn Contributor> {
        let previous = read(target, &self.name);
        write(target, &self.name, Some(self.value.clone()));
        let restore_target = target.clone();
        let restore_name = self.name.clone();
        Box::new(PropertyContributor {
            name: self.name.clone(),
            value: self.value.clone(),
            restore: DetachHandle::new(move || write(&restore_target, &restore_name, previous)),
        })
    }

    fn update(&self, contributor: &mut dyn Contributor, target: &AttachTarget) {
        let contributor = downcast_contributor::<PropertyContributor>(contributor);
        if contributor.value != self.value {
            write(target, &self.name, Some(self.value.clone()));
            contributor.value = self.value.clone();
        }
    }
}

/// Click handling for overlays.
///
/// The native listener is installed once; recomposition only swaps the
/// callback it forwards to.
#[derive(Clone)]
pub struct OnOverlayClick {
    kinds: KindSet,
    callback: OverlayClickListener,
}

impl OnOverlayClick {
    pub fn new(kinds: KindSet, callback: impl Fn(&dyn Overlay) -> bool + 'static) -> Self {
        OnOverlayClick {
            kinds,
            callback: Rc::new(callback),
        }
    }
}

impl fmt::Debug for OnOverlayClick {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("OnOverlayClick")
            .field("kinds", &self.kinds)
            .finish_non_exhaustive()
    }
}

/// Holds the callback a registered listener forwards to.
pub struct CallbackContributor<F: ?Sized> {
    slot: Rc<RefCell<Rc<F>>>,
    unregister: DetachHandle,
}

impl<F: ?Sized> fmt::Debug for CallbackContributor<F> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CallbackContributor")
            .field("unregister", &self.unregister)
            .finish_non_exhaustive()
    }
}

impl<F: ?Sized + 'static> Contributor for CallbackContributor<F> {
    fn detach(&mut self) {
        self.unregister.run();
    }
}

type OverlayCallback = dyn Fn(&dyn Overlay) -> bool;
type MapCallback = dyn Fn(LatLng);

impl ModifierElement for OnOverlayClick {
    fn tag(&self) -> CapabilityTag {
        CapabilityTag::in_namespace(self.kinds, LISTENER_NAMESPACE, "onClick")
    }

    fn create(&self, target: &AttachTarget) -> Box<dyn Contributor> {
        let Some(overlay) = target.overlay() else {
            panic!("OnOverlayClick routed to {:?}, which is not an overlay", target);
        };
        let slot: Rc<RefCell<Rc<OverlayCallback>>> = Rc::new(RefCell::new(self.callback.clone()));
        let forward = slot.clone();
        overlay.set_click_listener(Some(Rc::new(move |o: &dyn Overlay| {
            let callback = forward.borrow().clone();
            callback(o)
        })));
        let registered = overlay.clone();
        Box::new(CallbackContributor {
            slot,
            unregister: DetachHandle::new(move || registered.set_click_listener(None)),
        })
    }

    fn update(&self, contributor: &mut dyn Contributor, _target: &AttachTarget) {
        let contributor = downcast_contributor::<CallbackContributor<OverlayCallback>>(contributor);
        *contributor.slot.borrow_mut() = self.callback.clone();
    }
}

/// Click handling for the map surface
#[derive(Clone)]
pub struct OnMapClick {
    callback: MapClickListener,
}

impl OnMapClick {
    pub fn new(callback: impl Fn(LatLng) + 'static) -> Self {
        OnMapClick {
            callback: Rc::new(callback),
        }
    }
}

impl fmt::Debug for OnMapClick {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("OnMapClick").finish_non_exhaustive()
    }
}

impl ModifierElement for OnMapClick {
    fn tag(&self) -> CapabilityTag {
        CapabilityTag::in_namespace(KindSet::MAP_VIEW, LISTENER_NAMESPACE, "onMapClick")
    }

    fn create(&self, target: &AttachTarget) -> Box<dyn Contributor> {
        let map = target.map().clone();
        let slot: Rc<RefCell<Rc<MapCallback>>> = Rc::new(RefCell::new(self.callback.clone()));
        let forward = slot.clone();
        map.set_click_listener(Some(Rc::new(move |at: LatLng| {
            let callback = forward.borrow().clone();
            callback(at);
        })));
        Box::new(CallbackContributor {
            slot,
            unregister: DetachHandle::new(move || map.set_click_listener(None)),
        })
    }

    fn update(&self, contributor: &mut dyn Contributor, _target: &AttachTarget) {
        let contributor = downcast_contributor::<CallbackContributor<MapCallback>>(contributor);
        *contributor.slot.borrow_mut() = self.callback.clone();
    }
}

const POSITIONED: KindSet = KindSet::MARKER
    .union(KindSet::INFO_WINDOW)
    .union(KindSet::LOCATION_OVERLAY);
const TRANSLUCENT: KindSet = KindSet::MARKER
    .union(KindSet::INFO_WINDOW)
    .union(KindSet::GROUND_OVERLAY);
const SHAPED: KindSet = KindSet::POLYLINE
    .union(KindSet::POLYGON)
    .union(KindSet::PATH);
const COLORED: KindSet = SHAPED.union(KindSet::CIRCLE);

/// Builder methods for the standard contributions
pub trait OverlayModifiers: Sized {
    fn then_element(self, element: impl ModifierElement) -> Modifier;

    fn property(
        self,
        kinds: KindSet,
        name: impl Into<Cow<'static, str>>,
        value: impl Into<PropertyValue>,
    ) -> Modifier {
        self.then_element(Property::new(kinds, name, value))
    }

    fn position(self, position: LatLng) -> Modifier {
        self.property(POSITIONED, "position", position)
    }

    fn z_index(self, z_index: i32) -> Modifier {
        self.property(KindSet::OVERLAY, "zIndex", z_index)
    }

    fn visible(self, visible: bool) -> Modifier {
        self.property(KindSet::OVERLAY, "visible", visible)
    }

    fn alpha(self, alpha: f32) -> Modifier {
        self.property(TRANSLUCENT, "alpha", alpha)
    }

    fn caption(self, text: impl Into<String>) -> Modifier {
        self.property(KindSet::MARKER, "captionText", text.into())
    }

    fn center(self, center: LatLng) -> Modifier {
        self.property(KindSet::CIRCLE, "center", center)
    }

    fn radius(self, meters: f64) -> Modifier {
        self.property(KindSet::CIRCLE, "radius", meters)
    }

    fn coords(self, coords: Vec<LatLng>) -> Modifier {
        self.property(SHAPED, "coords", coords)
    }

    fn color(self, argb: u32) -> Modifier {
        self.property(COLORED, "color", PropertyValue::Color(argb))
    }

    fn on_click(self, callback: impl Fn(&dyn Overlay) -> bool + 'static) -> Modifier {
        self.then_element(OnOverlayClick::new(KindSet::OVERLAY, callback))
    }

    fn camera(self, camera: CameraPosition) -> Modifier {
        self.property(KindSet::MAP_VIEW, "camera", camera)
    }

    fn map_option(self, name: impl Into<Cow<'static, str>>, value: impl Into<PropertyValue>) -> Modifier {
        self.property(KindSet::MAP_VIEW, name, value)
    }

    fn on_map_click(self, callback: impl Fn(LatLng) + 'static) -> Modifier {
        self.then_element(OnMapClick::new(callback))
    }
}

impl OverlayModifiers for Modifier {
    fn then_element(self, element: impl ModifierElement) -> Modifier {
        self.then(Modifier::element(element))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::diff_engine::ContributorChain;
    use crate::map_view::{MapView, OverlayKind};
    use crate::recording::{MapCall, RecordingMap};
    use crate::types::ChainAction;
    use std::cell::Cell;

    fn marker_target(map: &Rc<RecordingMap>) -> AttachTarget {
        let overlay = map.add_overlay(OverlayKind::Marker);
        map.take_calls();
        AttachTarget::Overlay {
            map: map.clone(),
            overlay,
        }
    }

    #[test]
    fn property_restores_previous_value_on_detach() {
        let map = Rc::new(RecordingMap::new());
        let target = marker_target(&map);
        target
            .overlay()
            .unwrap()
            .set_property("zIndex", Some(PropertyValue::Int(1)));

        let mut chain = ContributorChain::new();
        chain.update(&target, &Modifier::empty().z_index(5));
        assert_eq!(
            target.overlay().unwrap().property("zIndex"),
            Some(PropertyValue::Int(5))
        );
        chain.detach_all();
        assert_eq!(
            target.overlay().unwrap().property("zIndex"),
            Some(PropertyValue::Int(1))
        );
    }

    #[test]
    fn stacked_writes_unwind_in_reverse() {
        let map = Rc::new(RecordingMap::new());
        let target = marker_target(&map);
        let mut chain = ContributorChain::new();
        chain.update(&target, &Modifier::empty().alpha(0.5).alpha(0.25));
        map.take_calls();

        chain.detach_all();
        let restored: Vec<Option<PropertyValue>> = map
            .take_calls()
            .into_iter()
            .filter_map(|call| match call {
                MapCall::SetProperty { value, .. } => Some(value),
                _ => None,
            })
            .collect();
        assert_eq!(restored, [Some(PropertyValue::Float(0.5)), None]);
    }

    #[test]
    fn equal_value_update_writes_nothing() {
        let map = Rc::new(RecordingMap::new());
        let target = marker_target(&map);
        let mut chain = ContributorChain::new();
        chain.update(&target, &Modifier::empty().caption("Seoul"));
        map.take_calls();

        chain.update(&target, &Modifier::empty().caption("Seoul"));
        assert!(map.take_calls().is_empty());
        chain.update(&target, &Modifier::empty().caption("Busan"));
        assert_eq!(map.take_calls().len(), 1);
    }

    #[test]
    fn click_update_swaps_callback_without_reregistering() {
        let map = Rc::new(RecordingMap::new());
        let target = marker_target(&map);
        let handle = target.overlay().unwrap().handle();
        let hits = Rc::new(Cell::new(0));
        let mut chain = ContributorChain::new();

        let first = hits.clone();
        chain.update(
            &target,
            &Modifier::empty().on_click(move |_| {
                first.set(first.get() + 1);
                true
            }),
        );
        let second = hits.clone();
        chain.update(
            &target,
            &Modifier::empty().on_click(move |_| {
                second.set(second.get() + 10);
                false
            }),
        );
        assert_eq!(
            map.take_calls(),
            [MapCall::SetClickListener { handle, present: true }]
        );
        assert!(!map.click_overlay(handle));
        assert_eq!(hits.get(), 10);

        chain.detach_all();
        assert!(!map.overlay(handle).unwrap().has_click_listener());
    }

    #[test]
    fn routing_skips_properties_for_other_kinds() {
        let map = Rc::new(RecordingMap::new());
        let target = marker_target(&map);
        let mut chain = ContributorChain::new();
        let patches = chain.update(
            &target,
            &Modifier::empty()
                .radius(30.0)
                .camera(CameraPosition {
                    target: LatLng::new(0.0, 0.0),
                    zoom: 3.0,
                    tilt: 0.0,
                    bearing: 0.0,
                })
                .visible(false),
        );
        assert_eq!(patches.len(), 1);
        assert_eq!(patches[0].tag.key, "visible");
    }

    #[test]
    fn map_click_reaches_latest_callback() {
        let map = Rc::new(RecordingMap::new());
        let target = AttachTarget::Map(map.clone());
        let seen = Rc::new(Cell::new(0.0));
        let mut chain = ContributorChain::new();
        let sink = seen.clone();
        chain.update(&target, &Modifier::empty().on_map_click(move |at| sink.set(at.lat)));
        map.click_map(LatLng::new(12.5, 0.0));
        assert_eq!(seen.get(), 12.5);
        chain.detach_all();
        map.click_map(LatLng::new(99.0, 0.0));
        assert_eq!(seen.get(), 12.5);
    }

    #[test]
    fn property_named_like_a_listener_is_replaced_not_updated() {
        let map = Rc::new(RecordingMap::new());
        let target = AttachTarget::Map(map.clone());
        let mut chain = ContributorChain::new();
        chain.update(&target, &Modifier::empty().map_option("onMapClick", true));
        map.take_calls();

        let patches = chain.update(&target, &Modifier::empty().on_map_click(|_| {}));
        let actions: Vec<ChainAction> = patches.iter().map(|p| p.action).collect();
        assert_eq!(actions, [ChainAction::Detach, ChainAction::Replace]);
        assert_eq!(
            map.take_calls(),
            [
                MapCall::SetOption { name: "onMapClick".into(), value: None },
                MapCall::SetMapClickListener { present: true },
            ]
        );
    }
}
