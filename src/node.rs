//! The tree of live, map-attached nodes the applier mutates
use crate::contributor::AttachTarget;
use crate::diff_engine::ContributorChain;
use crate::map_view::{MapView, OverlayKind};
use crate::modifier::Modifier;
use crate::types::{ChainPatch, NodeId};
use log::{debug, trace};
use std::cell::RefCell;
use std::fmt;
use std::rc::Rc;

pub type MapNodeRef = Rc<RefCell<MapNode>>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MapNodeKind {
    /// The map view itself; attached for its whole life.
    Root,
    Overlay(OverlayKind),
}

pub struct MapNode {
    id: NodeId,
    kind: MapNodeKind,
    modifier: Modifier,
    chain: ContributorChain,
    target: Option<AttachTarget>,
    children: Vec<MapNodeRef>,
    attach_count: u32,
}

impl MapNode {
    fn new(kind: MapNodeKind, target: Option<AttachTarget>) -> Self {
        MapNode {
            id: NodeId::next(),
            kind,
            modifier: Modifier::empty(),
            chain: ContributorChain::new(),
            target,
            children: Vec::new(),
            attach_count: 0,
        }
    }

    pub fn root(map: Rc<dyn MapView>) -> MapNodeRef {
        let mut node = MapNode::new(MapNodeKind::Root, Some(AttachTarget::Map(map)));
        node.attach_count = 1;
        Rc::new(RefCell::new(node))
    }

    /// A detached overlay node. The native overlay is created on attach.
    pub fn overlay(kind: OverlayKind) -> MapNodeRef {
        Rc::new(RefCell::new(MapNode::new(MapNodeKind::Overlay(kind), None)))
    }

    pub fn overlay_with(kind: OverlayKind, modifier: Modifier) -> MapNodeRef {
        let node = MapNode::overlay(kind);
        node.borrow_mut().set_modifier(modifier);
        node
    }

    pub fn id(&self) -> NodeId {
        self.id
    }

    pub fn kind(&self) -> MapNodeKind {
        self.kind
    }

    pub fn is_attached(&self) -> bool {
        self.target.is_some()
    }

    pub fn target(&self) -> Option<&AttachTarget> {
        self.target.as_ref()
    }

    /// How many times this node received an attach notification.
    pub fn attach_count(&self) -> u32 {
        self.attach_count
    }

    pub fn modifier(&self) -> &Modifier {
        &self.modifier
    }

    pub fn contributor_count(&self) -> usize {
        self.chain.len()
    }

    pub fn children(&self) -> &[MapNodeRef] {
        &self.children
    }

    pub fn child_count(&self) -> usize {
        self.children.len()
    }

    /// Stores the new chain and, when attached, reconciles the live
    /// contributors against it.
    pub fn set_modifier(&mut self, modifier: Modifier) -> Vec<ChainPatch> {
        self.modifier = modifier;
        match &self.target {
            Some(target) => self.chain.update(target, &self.modifier),
            None => Vec::new(),
        }
    }

    pub fn insert_child(&mut self, index: usize, child: MapNodeRef) {
        trace!("MapNode {:?}: insert child at {}", self.id, index);
        self.children.insert(index, child.clone());
        if let Some(target) = &self.target {
            child.borrow_mut().attach(target.map().clone());
        }
    }

    /// Moves `count` children starting at `from` so they sit before the child
    /// that was at `to` prior to the move.
    ///
    /// # Panics
    ///
    /// When `to` falls strictly inside the moved range.
    pub fn move_children(&mut self, from: usize, to: usize, count: usize) {
        assert!(
            to <= from || to >= from + count,
            "MapNode {:?}: move target {} lies inside the moved range {}..{}",
            self.id,
            to,
            from,
            from + count
        );
        let dest = if from > to { to } else { to - count };
        let moved: Vec<MapNodeRef> = self.children.drain(from..from + count).collect();
        self.children.splice(dest..dest, moved);
    }

    pub fn remove_children(&mut self, index: usize, count: usize) {
        let removed: Vec<MapNodeRef> = self.children.drain(index..index + count).collect();
        for child in removed.iter().rev() {
            child.borrow_mut().detach();
        }
    }

    pub fn remove_all_children(&mut self) {
        let count = self.children.len();
        self.remove_children(0, count);
    }

    /// Creates the native overlay, applies the chain, then attaches the
    /// already-populated subtree.
    ///
    /// # Panics
    ///
    /// When the node is already attached; a node is attached once per insertion.
    fn attach(&mut self, map: Rc<dyn MapView>) {
        assert!(
            self.target.is_none(),
            "MapNode {:?} attached twice without being removed",
            self.id
        );
        let target = match self.kind {
            MapNodeKind::Root => AttachTarget::Map(map.clone()),
            MapNodeKind::Overlay(kind) => AttachTarget::Overlay {
                map: map.clone(),
                overlay: map.add_overlay(kind),
            },
        };
        debug!("MapNode {:?}: attaching to {:?}", self.id, target);
        self.chain.update(&target, &self.modifier);
        self.target = Some(target);
        self.attach_count += 1;
        for child in &self.children {
            child.borrow_mut().attach(map.clone());
        }
    }

    /// Mirror of `attach`: children last-first, own chain innermost-first,
    /// then the native overlay. Does nothing when already detached.
    fn detach(&mut self) {
        let Some(target) = self.target.take() else {
            return;
        };
        for child in self.children.iter().rev() {
            child.borrow_mut().detach();
        }
        self.chain.detach_all();
        if let AttachTarget::Overlay { map, overlay } = &target {
            map.remove_overlay(overlay.as_ref());
        }
        debug!("MapNode {:?}: detached from {:?}", self.id, target);
    }

    /// Tears down the root's own contributions. Children must be removed first.
    pub(crate) fn dispose_root(&mut self) -> Vec<ChainPatch> {
        self.chain.detach_all()
    }
}

impl fmt::Debug for MapNode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MapNode")
            .field("id", &self.id)
            .field("kind", &self.kind)
            .field("attached", &self.is_attached())
            .field("modifier", &self.modifier)
            .field("children", &self.children.len())
            .finish()
    }
}
