//! A self-contained map session: one recording map, its lifecycle and its
//! node tree, addressed by node id
//!
//! Everything a scripting host needs goes through here, so malformed input
//! comes back as [`MapError::InvalidEdit`] instead of tripping the applier's
//! contract panics.
use crate::applier::{Applier, MapApplier, is_same_node};
use crate::config::MapViewOptions;
use crate::errors::MapError;
use crate::kind_set::KindSet;
use crate::lifecycle::{LifecycleEvent, LifecycleRegistry, LifecycleState, MapLifecycle};
use crate::map_view::{OverlayKind, PropertyValue, SavedState};
use crate::modifier::Modifier;
use crate::node::{MapNode, MapNodeKind, MapNodeRef};
use crate::overlay::OverlayModifiers;
use crate::recording::RecordingMap;
use crate::types::ChainPatch;
use indexmap::IndexMap;
use log::debug;
use std::cell::RefCell;
use std::rc::Rc;

pub type Properties = IndexMap<String, PropertyValue>;

pub struct MapSession {
    map: Rc<RecordingMap>,
    registry: Rc<LifecycleRegistry>,
    saved_state: Rc<RefCell<SavedState>>,
    /// Root chain prefix: the configured options, then the lifecycle binding.
    /// Both keep their positions whatever root properties follow them.
    root_base: Modifier,
    applier: Option<MapApplier>,
    nodes: IndexMap<u64, MapNodeRef>,
}

impl MapSession {
    pub fn new(options: &MapViewOptions) -> Self {
        let map = Rc::new(RecordingMap::new());
        let registry = Rc::new(LifecycleRegistry::new());
        let saved_state = Rc::new(RefCell::new(SavedState::new()));
        let root_base = options
            .to_modifier()
            .then(Modifier::element(MapLifecycle::new(registry.clone(), saved_state.clone())));

        let mut applier = MapApplier::new(MapNode::root(map.clone()));
        applier.set_modifier(root_base.clone());
        debug!("MapSession: created {:?}", applier);

        MapSession {
            map,
            registry,
            saved_state,
            root_base,
            applier: Some(applier),
            nodes: IndexMap::new(),
        }
    }

    pub fn map(&self) -> &Rc<RecordingMap> {
        &self.map
    }

    pub fn registry(&self) -> &Rc<LifecycleRegistry> {
        &self.registry
    }

    pub fn saved_state(&self) -> SavedState {
        self.saved_state.borrow().clone()
    }

    /// Nodes the session still knows by id.
    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    /// Creates a detached overlay node and returns its id.
    pub fn create_overlay(&mut self, kind: &str, properties: Properties) -> Result<u64, MapError> {
        let kind =
            OverlayKind::parse(kind).ok_or_else(|| MapError::UnknownOverlayKind(kind.to_string()))?;
        let node = MapNode::overlay_with(kind, property_modifier(kind.kind_bit(), properties));
        let id = node.borrow().id().get();
        self.nodes.insert(id, node);
        Ok(id)
    }

    pub fn down(&mut self, node: u64) -> Result<(), MapError> {
        let node = self.node(node)?;
        self.applier()?.down(node);
        Ok(())
    }

    pub fn up(&mut self) -> Result<(), MapError> {
        let applier = self.applier()?;
        if applier.depth() == 0 {
            return Err(invalid("up() at the root"));
        }
        applier.up();
        Ok(())
    }

    pub fn insert_top_down(&mut self, index: usize, node: u64) -> Result<(), MapError> {
        let node = self.node(node)?;
        self.applier()?.insert_top_down(index, node);
        Ok(())
    }

    pub fn insert_bottom_up(&mut self, index: usize, node: u64) -> Result<(), MapError> {
        let id = node;
        let node = self.node(id)?;
        let applier = self.applier()?;
        if is_same_node(applier.current(), &node) {
            return Err(invalid(format!("node {} inserted into itself", id)));
        }
        if node.borrow().is_attached() {
            return Err(invalid(format!("node {} is already attached", id)));
        }
        let children = applier.current().borrow().child_count();
        if index > children {
            return Err(invalid(format!("insert at {} past {} children", index, children)));
        }
        applier.insert_bottom_up(index, node);
        Ok(())
    }

    pub fn remove(&mut self, index: usize, count: usize) -> Result<(), MapError> {
        let applier = self.applier()?;
        check_range(index, count, applier.current().borrow().child_count())?;
        applier.remove(index, count);
        self.forget_detached();
        Ok(())
    }

    pub fn move_nodes(&mut self, from: usize, to: usize, count: usize) -> Result<(), MapError> {
        let applier = self.applier()?;
        let children = applier.current().borrow().child_count();
        let end = check_range(from, count, children)?;
        if to > children {
            return Err(invalid(format!("move target {} past {} children", to, children)));
        }
        if from < to && to < end {
            return Err(invalid(format!("move target {} inside {}..{}", to, from, end)));
        }
        applier.move_nodes(from, to, count);
        Ok(())
    }

    pub fn clear(&mut self) -> Result<(), MapError> {
        self.applier()?.clear();
        self.forget_detached();
        Ok(())
    }

    /// Replaces the current node's properties.
    ///
    /// On the root they are appended after the options and the lifecycle
    /// binding, which stay in place.
    pub fn set_properties(&mut self, properties: Properties) -> Result<Vec<ChainPatch>, MapError> {
        let root_base = self.root_base.clone();
        let applier = self.applier()?;
        let kind = applier.current().borrow().kind();
        let modifier = match kind {
            MapNodeKind::Root => root_base.then(property_modifier(KindSet::MAP_VIEW, properties)),
            MapNodeKind::Overlay(kind) => property_modifier(kind.kind_bit(), properties),
        };
        Ok(applier.set_modifier(modifier))
    }

    /// Delivers a host lifecycle event by name (`"resume"`, `"on_stop"`, ...).
    pub fn lifecycle_event(&self, name: &str) -> Result<(), MapError> {
        match LifecycleEvent::parse(name)? {
            LifecycleEvent::Any => Err(MapError::UnknownLifecycleEvent(name.to_string())),
            event => {
                self.registry.handle_event(event);
                Ok(())
            }
        }
    }

    pub fn low_memory(&self) {
        self.registry.dispatch_low_memory();
    }

    pub fn lifecycle_state(&self) -> LifecycleState {
        self.registry.state()
    }

    pub fn click_overlay(&self, handle: u64) -> bool {
        self.map.click_overlay(handle)
    }

    /// Tears the whole map down. Every later edit fails.
    pub fn dispose(&mut self) -> Result<Vec<ChainPatch>, MapError> {
        let applier = self.applier.take().ok_or_else(disposed)?;
        let patches = applier.dispose();
        self.nodes.clear();
        Ok(patches)
    }

    fn applier(&mut self) -> Result<&mut MapApplier, MapError> {
        self.applier.as_mut().ok_or_else(disposed)
    }

    fn node(&self, id: u64) -> Result<MapNodeRef, MapError> {
        self.nodes
            .get(&id)
            .cloned()
            .ok_or_else(|| invalid(format!("unknown node {}", id)))
    }

    /// Drops nodes that were attached once and have since been removed.
    /// Nodes still waiting for their first insertion stay.
    fn forget_detached(&mut self) {
        let before = self.nodes.len();
        self.nodes.retain(|_, node| {
            let node = node.borrow();
            node.is_attached() || node.attach_count() == 0
        });
        debug!("MapSession: forgot {} removed nodes", before - self.nodes.len());
    }
}

fn property_modifier(kinds: KindSet, properties: Properties) -> Modifier {
    properties
        .into_iter()
        .fold(Modifier::empty(), |modifier, (name, value)| {
            modifier.property(kinds, name, value)
        })
}

/// `start..start + count` within `len` children; returns the range end.
fn check_range(start: usize, count: usize, len: usize) -> Result<usize, MapError> {
    match start.checked_add(count) {
        Some(end) if end <= len => Ok(end),
        _ => Err(invalid(format!(
            "range {}+{} out of bounds for {} children",
            start, count, len
        ))),
    }
}

fn invalid(message: impl Into<String>) -> MapError {
    MapError::InvalidEdit(message.into())
}

fn disposed() -> MapError {
    invalid("session already disposed")
}
