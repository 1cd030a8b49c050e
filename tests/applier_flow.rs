use map_reconciler::compare::{Order, same_instances};
use map_reconciler::lifecycle::{LifecycleEvent, LifecycleRegistry, LifecycleState, MapLifecycle};
use map_reconciler::map_view::{CameraPosition, LatLng, OverlayKind, PropertyValue, SavedState};
use map_reconciler::recording::{MapCall, RecordingMap};
use map_reconciler::{
    Applier, ChainAction, EditOp, MapApplier, MapNode, MapNodeRef, Modifier, OverlayModifiers,
    apply_edits,
};
use std::cell::{Cell, RefCell};
use std::rc::Rc;

struct Session {
    map: Rc<RecordingMap>,
    registry: Rc<LifecycleRegistry>,
    saved: Rc<RefCell<SavedState>>,
    applier: MapApplier,
}

fn seoul() -> CameraPosition {
    CameraPosition {
        target: LatLng::new(37.5666, 126.9784),
        zoom: 12.0,
        tilt: 0.0,
        bearing: 0.0,
    }
}

fn session(registry: Rc<LifecycleRegistry>, saved: Rc<RefCell<SavedState>>) -> Session {
    let map = Rc::new(RecordingMap::new());
    let mut applier = MapApplier::new(MapNode::root(map.clone()));
    applier.set_modifier(
        Modifier::empty()
            .camera(seoul())
            .then(Modifier::element(MapLifecycle::new(registry.clone(), saved.clone()))),
    );
    Session {
        map,
        registry,
        saved,
        applier,
    }
}

fn actions(patches: &[map_reconciler::ChainPatch]) -> Vec<ChainAction> {
    patches.iter().map(|p| p.action).collect()
}

fn insert(node: &MapNodeRef, index: usize) -> [EditOp; 2] {
    [
        EditOp::InsertTopDown { index, node: node.clone() },
        EditOp::InsertBottomUp { index, node: node.clone() },
    ]
}

#[test]
fn full_session_from_first_frame_to_dispose() {
    let registry = Rc::new(LifecycleRegistry::new());
    let mut s = session(registry, Rc::default());
    for event in [LifecycleEvent::Create, LifecycleEvent::Start, LifecycleEvent::Resume] {
        s.registry.handle_event(event);
    }
    assert_eq!(
        s.map.take_calls(),
        [
            MapCall::SetOption {
                name: "camera".into(),
                value: Some(PropertyValue::Camera(seoul())),
            },
            MapCall::Create { restored: false },
            MapCall::Start,
            MapCall::Resume,
        ]
    );

    // First frame: a clickable marker and a circle.
    let clicks = Rc::new(Cell::new(0));
    let counted = clicks.clone();
    let position = LatLng::new(37.0, 127.0);
    let marker = MapNode::overlay_with(
        OverlayKind::Marker,
        Modifier::empty().position(position).z_index(1).on_click(move |_| {
            counted.set(counted.get() + 1);
            true
        }),
    );
    let circle = MapNode::overlay_with(
        OverlayKind::Circle,
        Modifier::empty().center(position).radius(100.0),
    );
    let mut ops: Vec<EditOp> = insert(&marker, 0).into();
    ops.extend(insert(&circle, 1));
    apply_edits(&mut s.applier, ops);

    assert_eq!(
        s.map.take_calls(),
        [
            MapCall::AddOverlay { handle: 1, kind: OverlayKind::Marker },
            MapCall::SetProperty {
                handle: 1,
                name: "position".into(),
                value: Some(PropertyValue::LatLng(position)),
            },
            MapCall::SetProperty {
                handle: 1,
                name: "zIndex".into(),
                value: Some(PropertyValue::Int(1)),
            },
            MapCall::SetClickListener { handle: 1, present: true },
            MapCall::AddOverlay { handle: 2, kind: OverlayKind::Circle },
            MapCall::SetProperty {
                handle: 2,
                name: "center".into(),
                value: Some(PropertyValue::LatLng(position)),
            },
            MapCall::SetProperty {
                handle: 2,
                name: "radius".into(),
                value: Some(PropertyValue::Float(100.0)),
            },
        ]
    );
    assert!(s.map.click_overlay(1));
    assert_eq!(clicks.get(), 1);

    // Recomposition with the same shape updates in place.
    let swapped = Rc::new(Cell::new(false));
    let flag = swapped.clone();
    let patches = apply_edits(
        &mut s.applier,
        [
            EditOp::Down(marker.clone()),
            EditOp::SetModifier(Modifier::empty().position(position).z_index(2).on_click(
                move |_| {
                    flag.set(true);
                    false
                },
            )),
            EditOp::Up,
        ],
    );
    assert_eq!(
        actions(&patches),
        [ChainAction::Update, ChainAction::Update, ChainAction::Update]
    );
    assert_eq!(
        s.map.take_calls(),
        [MapCall::SetProperty {
            handle: 1,
            name: "zIndex".into(),
            value: Some(PropertyValue::Int(2)),
        }]
    );
    assert!(!s.map.click_overlay(1));
    assert!(swapped.get());
    assert_eq!(clicks.get(), 1);

    // A different capability at one position replaces only that position.
    s.applier.down(marker.clone());
    let patches = s.applier.set_modifier(
        Modifier::empty()
            .position(position)
            .caption("City Hall")
            .on_click(|_| true),
    );
    s.applier.up();
    assert_eq!(
        actions(&patches),
        [
            ChainAction::Detach,
            ChainAction::Update,
            ChainAction::Replace,
            ChainAction::Update,
        ]
    );
    assert_eq!(
        s.map.take_calls(),
        [
            MapCall::SetProperty { handle: 1, name: "zIndex".into(), value: None },
            MapCall::SetProperty {
                handle: 1,
                name: "captionText".into(),
                value: Some(PropertyValue::Text("City Hall".into())),
            },
        ]
    );

    // Reordering siblings never touches the SDK.
    s.applier.move_nodes(1, 0, 1);
    assert!(same_instances(
        s.applier.root().borrow().children(),
        &[circle.clone(), marker.clone()],
        Order::Exact
    ));
    assert!(s.map.take_calls().is_empty());

    s.registry.handle_event(LifecycleEvent::Pause);
    s.applier.remove(0, 1);
    assert!(!circle.borrow().is_attached());
    assert_eq!(
        s.map.take_calls(),
        [
            MapCall::Pause,
            MapCall::SetProperty { handle: 2, name: "radius".into(), value: None },
            MapCall::SetProperty { handle: 2, name: "center".into(), value: None },
            MapCall::RemoveOverlay { handle: 2 },
        ]
    );

    let registry = s.registry.clone();
    let saved = s.saved.clone();
    let map = s.map.clone();
    s.applier.dispose();
    assert_eq!(
        map.take_calls(),
        [
            MapCall::SetClickListener { handle: 1, present: false },
            MapCall::SetProperty { handle: 1, name: "captionText".into(), value: None },
            MapCall::SetProperty { handle: 1, name: "position".into(), value: None },
            MapCall::RemoveOverlay { handle: 1 },
            MapCall::SaveState,
            MapCall::Stop,
            MapCall::Destroy,
            MapCall::SetOption { name: "camera".into(), value: None },
        ]
    );
    assert_eq!(registry.observer_count(), 0);
    assert_eq!(registry.low_memory_callback_count(), 0);
    assert!(saved.borrow().contains_key("camera"));
    assert_eq!(saved.borrow()["overlay_count"], 0);
    assert!(map.overlays().is_empty());
}

#[test]
fn recreated_session_restores_saved_state() {
    let registry = Rc::new(LifecycleRegistry::new());
    let saved: Rc<RefCell<SavedState>> = Rc::default();
    registry.handle_event(LifecycleEvent::Create);
    registry.handle_event(LifecycleEvent::Start);

    let first = session(registry.clone(), saved.clone());
    first.applier.dispose();
    assert!(!saved.borrow().is_empty());

    let second = session(registry.clone(), saved);
    assert_eq!(
        second.map.take_calls(),
        [
            MapCall::SetOption {
                name: "camera".into(),
                value: Some(PropertyValue::Camera(seoul())),
            },
            MapCall::Create { restored: true },
            MapCall::Start,
        ]
    );
    assert_eq!(registry.state(), LifecycleState::Started);
}

#[test]
fn nested_subtree_attaches_once_and_clears_innermost_first() {
    let registry = Rc::new(LifecycleRegistry::new());
    let mut s = session(registry, Rc::default());
    s.map.take_calls();

    let marker = MapNode::overlay(OverlayKind::Marker);
    let window = MapNode::overlay_with(OverlayKind::InfoWindow, Modifier::empty().alpha(0.5));
    apply_edits(
        &mut s.applier,
        [
            EditOp::InsertTopDown { index: 0, node: marker.clone() },
            EditOp::Down(marker.clone()),
            EditOp::InsertTopDown { index: 0, node: window.clone() },
            EditOp::InsertBottomUp { index: 0, node: window.clone() },
            EditOp::Up,
            EditOp::InsertBottomUp { index: 0, node: marker.clone() },
        ],
    );
    assert_eq!(marker.borrow().attach_count(), 1);
    assert_eq!(window.borrow().attach_count(), 1);
    assert_eq!(s.map.overlays().len(), 2);

    // Contributions for other kinds are skipped, not applied.
    s.applier.down(window.clone());
    let patches = s.applier.set_modifier(Modifier::empty().alpha(0.5).radius(10.0));
    assert_eq!(actions(&patches), [ChainAction::Update]);
    assert_eq!(window.borrow().contributor_count(), 1);

    s.map.take_calls();
    apply_edits(&mut s.applier, [EditOp::Clear]);
    assert_eq!(s.applier.depth(), 0);
    assert_eq!(
        s.map.take_calls(),
        [
            MapCall::SetProperty { handle: 2, name: "alpha".into(), value: None },
            MapCall::RemoveOverlay { handle: 2 },
            MapCall::RemoveOverlay { handle: 1 },
        ]
    );
}
