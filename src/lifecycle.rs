//! Host lifecycle delivery and the map-view lifecycle contribution
//!
//! The host owns a [`LifecycleRegistry`]. A [`MapLifecycle`] element on the
//! root chain observes it and drives the map view along the ladder
//! `Created <-> Started <-> Resumed`, so duplicated or replayed host events
//! never produce duplicated SDK calls.
use crate::contributor::{AttachTarget, Contributor, downcast_contributor};
use crate::errors::MapError;
use crate::kind_set::KindSet;
use crate::map_view::{MapView, SavedState};
use crate::modifier::ModifierElement;
use crate::types::CapabilityTag;
use indexmap::IndexMap;
use log::{debug, trace};
use serde::{Deserialize, Serialize};
use std::cell::{Cell, RefCell};
use std::fmt;
use std::rc::Rc;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LifecycleEvent {
    Create,
    Start,
    Resume,
    Pause,
    Stop,
    Destroy,
    /// Matches every event in host APIs; never a real transition.
    Any,
}

impl LifecycleEvent {
    /// State reached once the event has been handled. `None` for `Any`.
    pub fn target_state(self) -> Option<LifecycleState> {
        match self {
            LifecycleEvent::Create | LifecycleEvent::Stop => Some(LifecycleState::Created),
            LifecycleEvent::Start | LifecycleEvent::Pause => Some(LifecycleState::Started),
            LifecycleEvent::Resume => Some(LifecycleState::Resumed),
            LifecycleEvent::Destroy => Some(LifecycleState::Destroyed),
            LifecycleEvent::Any => None,
        }
    }

    pub fn parse(name: &str) -> Result<Self, MapError> {
        let normalized = name.trim().to_ascii_lowercase();
        let normalized = normalized.strip_prefix("on_").unwrap_or(normalized.as_str());
        match normalized {
            "create" => Ok(LifecycleEvent::Create),
            "start" => Ok(LifecycleEvent::Start),
            "resume" => Ok(LifecycleEvent::Resume),
            "pause" => Ok(LifecycleEvent::Pause),
            "stop" => Ok(LifecycleEvent::Stop),
            "destroy" => Ok(LifecycleEvent::Destroy),
            "any" => Ok(LifecycleEvent::Any),
            _ => Err(MapError::UnknownLifecycleEvent(name.to_string())),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum LifecycleState {
    Destroyed,
    Initialized,
    Created,
    Started,
    Resumed,
}

impl LifecycleState {
    fn rank(self) -> usize {
        match self {
            LifecycleState::Destroyed | LifecycleState::Initialized => 0,
            LifecycleState::Created => 1,
            LifecycleState::Started => 2,
            LifecycleState::Resumed => 3,
        }
    }

    pub fn is_alive(self) -> bool {
        self.rank() > 0
    }
}

const UP: [LifecycleEvent; 3] = [
    LifecycleEvent::Create,
    LifecycleEvent::Start,
    LifecycleEvent::Resume,
];
const DOWN: [LifecycleEvent; 3] = [
    LifecycleEvent::Destroy,
    LifecycleEvent::Stop,
    LifecycleEvent::Pause,
];

/// Events that move something from `from` to `to` one rung at a time.
///
/// Going down from `Resumed` to `Destroyed` yields pause, stop, destroy;
/// a state that was never created has nothing to tear down.
pub fn transitions(from: LifecycleState, to: LifecycleState) -> Vec<LifecycleEvent> {
    let (mut at, goal) = (from.rank(), to.rank());
    let mut events = Vec::new();
    while at < goal {
        events.push(UP[at]);
        at += 1;
    }
    while at > goal {
        events.push(DOWN[at - 1]);
        at -= 1;
    }
    events
}

pub type LifecycleObserver = Rc<dyn Fn(LifecycleEvent)>;
pub type LowMemoryCallback = Rc<dyn Fn()>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ObserverId(u64);

/// Host-side lifecycle source
///
/// New observers are caught up with the events leading to the current state,
/// the way platform lifecycle owners do.
pub struct LifecycleRegistry {
    state: Cell<LifecycleState>,
    observers: RefCell<IndexMap<u64, LifecycleObserver>>,
    low_memory: RefCell<IndexMap<u64, LowMemoryCallback>>,
    next_id: Cell<u64>,
}

impl Default for LifecycleRegistry {
    fn default() -> Self {
        LifecycleRegistry {
            state: Cell::new(LifecycleState::Initialized),
            observers: RefCell::default(),
            low_memory: RefCell::default(),
            next_id: Cell::new(0),
        }
    }
}

impl LifecycleRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn state(&self) -> LifecycleState {
        self.state.get()
    }

    fn next_id(&self) -> u64 {
        let id = self.next_id.get() + 1;
        self.next_id.set(id);
        id
    }

    pub fn add_observer(&self, observer: LifecycleObserver) -> ObserverId {
        let id = self.next_id();
        self.observers.borrow_mut().insert(id, observer.clone());
        let state = self.state.get();
        if state.is_alive() {
            for event in transitions(LifecycleState::Initialized, state) {
                observer(event);
            }
        }
        ObserverId(id)
    }

    pub fn remove_observer(&self, id: ObserverId) -> bool {
        self.observers.borrow_mut().shift_remove(&id.0).is_some()
    }

    pub fn observer_count(&self) -> usize {
        self.observers.borrow().len()
    }

    /// Records the event and delivers it to every observer, oldest first.
    pub fn handle_event(&self, event: LifecycleEvent) {
        if let Some(state) = event.target_state() {
            self.state.set(state);
        }
        trace!("LifecycleRegistry: {:?} -> {:?}", event, self.state.get());
        // Observers may (un)register while being notified.
        let observers: Vec<LifecycleObserver> = self.observers.borrow().values().cloned().collect();
        for observer in observers {
            observer(event);
        }
    }

    pub fn add_low_memory_callback(&self, callback: LowMemoryCallback) -> ObserverId {
        let id = self.next_id();
        self.low_memory.borrow_mut().insert(id, callback);
        ObserverId(id)
    }

    pub fn remove_low_memory_callback(&self, id: ObserverId) -> bool {
        self.low_memory.borrow_mut().shift_remove(&id.0).is_some()
    }

    pub fn low_memory_callback_count(&self) -> usize {
        self.low_memory.borrow().len()
    }

    pub fn dispatch_low_memory(&self) {
        let callbacks: Vec<LowMemoryCallback> = self.low_memory.borrow().values().cloned().collect();
        for callback in callbacks {
            callback();
        }
    }
}

impl fmt::Debug for LifecycleRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LifecycleRegistry")
            .field("state", &self.state.get())
            .field("observers", &self.observer_count())
            .field("low_memory", &self.low_memory_callback_count())
            .finish()
    }
}

/// Binds the map view to a host lifecycle
#[derive(Clone)]
pub struct MapLifecycle {
    registry: Rc<LifecycleRegistry>,
    saved_state: Rc<RefCell<SavedState>>,
}

impl MapLifecycle {
    pub fn new(registry: Rc<LifecycleRegistry>, saved_state: Rc<RefCell<SavedState>>) -> Self {
        MapLifecycle {
            registry,
            saved_state,
        }
    }
}

impl fmt::Debug for MapLifecycle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MapLifecycle")
            .field("registry", &self.registry)
            .finish_non_exhaustive()
    }
}

/// Where the map view stands and what the host last told it
struct MapState {
    map: Rc<dyn MapView>,
    state: Cell<LifecycleState>,
    last_event: Cell<Option<LifecycleEvent>>,
    saved_state: RefCell<Rc<RefCell<SavedState>>>,
}

impl MapState {
    /// # Panics
    ///
    /// On `LifecycleEvent::Any`, which no host delivers as a real transition.
    fn forward(&self, event: LifecycleEvent) {
        let Some(target) = event.target_state() else {
            panic!("unhandled lifecycle event {:?} forwarded to the map view", event);
        };
        let (at, goal) = (self.state.get().rank(), target.rank());
        let upward = matches!(
            event,
            LifecycleEvent::Create | LifecycleEvent::Start | LifecycleEvent::Resume
        );
        // Replayed or duplicated events never move the view backwards.
        if (upward && goal > at) || (!upward && goal < at) {
            self.drive_to(target);
        }
        self.last_event.set(Some(event));
    }

    fn drive_to(&self, target: LifecycleState) {
        for step in transitions(self.state.get(), target) {
            trace!("MapLifecycle: {:?}", step);
            match step {
                LifecycleEvent::Create => {
                    let saved = self.saved_state.borrow().clone();
                    let saved = saved.borrow();
                    self.map
                        .on_create(if saved.is_empty() { None } else { Some(&*saved) });
                }
                LifecycleEvent::Start => self.map.on_start(),
                LifecycleEvent::Resume => self.map.on_resume(),
                LifecycleEvent::Pause => self.map.on_pause(),
                LifecycleEvent::Stop => self.map.on_stop(),
                LifecycleEvent::Destroy => self.map.on_destroy(),
                LifecycleEvent::Any => unreachable!("transitions never yields Any"),
            }
        }
        self.state.set(target);
    }
}

struct Registration {
    registry: Rc<LifecycleRegistry>,
    observer: ObserverId,
    low_memory: ObserverId,
}

impl Registration {
    fn register(registry: Rc<LifecycleRegistry>, map_state: &Rc<MapState>) -> Self {
        let observed = map_state.clone();
        let observer = registry.add_observer(Rc::new(move |event| observed.forward(event)));
        let map = map_state.map.clone();
        let low_memory = registry.add_low_memory_callback(Rc::new(move || map.on_low_memory()));
        Registration {
            registry,
            observer,
            low_memory,
        }
    }

    fn unregister(self) {
        self.registry.remove_observer(self.observer);
        self.registry.remove_low_memory_callback(self.low_memory);
    }
}

pub struct MapLifecycleContributor {
    map_state: Rc<MapState>,
    registration: Option<Registration>,
}

impl MapLifecycleContributor {
    pub fn state(&self) -> LifecycleState {
        self.map_state.state.get()
    }

    pub fn last_event(&self) -> Option<LifecycleEvent> {
        self.map_state.last_event.get()
    }
}

impl fmt::Debug for MapLifecycleContributor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MapLifecycleContributor")
            .field("state", &self.state())
            .field("last_event", &self.last_event())
            .field("registered", &self.registration.is_some())
            .finish()
    }
}

impl Contributor for MapLifecycleContributor {
    /// Saves state, drops the host registrations, then walks the map view
    /// down to destroyed from wherever it was left.
    fn detach(&mut self) {
        let Some(registration) = self.registration.take() else {
            return;
        };
        let map_state = &self.map_state;
        if map_state.state.get().is_alive() {
            let saved = map_state.saved_state.borrow().clone();
            map_state.map.on_save_instance_state(&mut saved.borrow_mut());
        }
        registration.unregister();
        debug!(
            "MapLifecycle: tearing down from {:?} (last event {:?})",
            map_state.state.get(),
            map_state.last_event.get()
        );
        map_state.drive_to(LifecycleState::Destroyed);
    }
}

impl ModifierElement for MapLifecycle {
    fn tag(&self) -> CapabilityTag {
        CapabilityTag::in_namespace(KindSet::MAP_VIEW, "lifecycle", "lifecycle")
    }

    fn create(&self, target: &AttachTarget) -> Box<dyn Contributor> {
        let map_state = Rc::new(MapState {
            map: target.map().clone(),
            state: Cell::new(LifecycleState::Initialized),
            last_event: Cell::new(None),
            saved_state: RefCell::new(self.saved_state.clone()),
        });
        let registration = Registration::register(self.registry.clone(), &map_state);
        Box::new(MapLifecycleContributor {
            map_state,
            registration: Some(registration),
        })
    }

    fn update(&self, contributor: &mut dyn Contributor, _target: &AttachTarget) {
        let contributor = downcast_contributor::<MapLifecycleContributor>(contributor);
        *contributor.map_state.saved_state.borrow_mut() = self.saved_state.clone();
        let moved = match &contributor.registration {
            Some(current) => !Rc::ptr_eq(&current.registry, &self.registry),
            None => false,
        };
        if moved {
            debug!("MapLifecycle: lifecycle owner changed, moving observer");
            if let Some(old) = contributor.registration.take() {
                old.unregister();
            }
            contributor.registration =
                Some(Registration::register(self.registry.clone(), &contributor.map_state));
        }
    }
}
