//! Applies the host's tree-edit stream to the live map node tree
use crate::modifier::Modifier;
use crate::node::MapNodeRef;
use crate::types::ChainPatch;
use log::{debug, trace};
use std::fmt;
use std::rc::Rc;

/// Receiver of a tree-edit stream.
///
/// The host guarantees a balanced stream delivered from one thread; every
/// method may treat a violation of that contract as fatal.
pub trait Applier<N> {
    fn current(&self) -> &N;

    /// Descends into `node`, which becomes the current node.
    fn down(&mut self, node: N);

    /// Returns to the parent of the current node.
    fn up(&mut self);

    fn insert_top_down(&mut self, index: usize, instance: N);

    fn insert_bottom_up(&mut self, index: usize, instance: N);

    fn remove(&mut self, index: usize, count: usize);

    fn move_nodes(&mut self, from: usize, to: usize, count: usize);

    /// Tears the whole tree down and returns to the root.
    fn clear(&mut self);

    fn on_begin_changes(&mut self) {}

    fn on_end_changes(&mut self) {}
}

/// Applier over [`MapNode`](crate::node::MapNode)s.
///
/// The ancestor stack belongs to the instance; two appliers never share one.
pub struct MapApplier {
    root: MapNodeRef,
    current: MapNodeRef,
    stack: Vec<MapNodeRef>,
}

impl MapApplier {
    pub fn new(root: MapNodeRef) -> Self {
        MapApplier {
            current: root.clone(),
            root,
            stack: Vec::new(),
        }
    }

    pub fn root(&self) -> &MapNodeRef {
        &self.root
    }

    pub fn depth(&self) -> usize {
        self.stack.len()
    }

    /// Sets the chain of the current node and reconciles it.
    pub fn set_modifier(&mut self, modifier: Modifier) -> Vec<ChainPatch> {
        self.current.borrow_mut().set_modifier(modifier)
    }

    /// Final teardown: clears the tree, then detaches the root's own
    /// contributions (its lifecycle binding among them).
    pub fn dispose(mut self) -> Vec<ChainPatch> {
        self.clear();
        debug!("MapApplier: disposing root");
        self.root.borrow_mut().dispose_root()
    }
}

impl Applier<MapNodeRef> for MapApplier {
    fn current(&self) -> &MapNodeRef {
        &self.current
    }

    fn down(&mut self, node: MapNodeRef) {
        trace!("MapApplier: down into {:?}", node.borrow().id());
        let parent = std::mem::replace(&mut self.current, node);
        self.stack.push(parent);
    }

    /// # Panics
    ///
    /// When the stack is empty, i.e. the edit stream is unbalanced.
    fn up(&mut self) {
        let Some(parent) = self.stack.pop() else {
            panic!("MapApplier::up called with an empty stack; the edit stream is unbalanced");
        };
        self.current = parent;
    }

    /// Ignored: nodes are inserted bottom-up so a subtree is complete before
    /// it is attached.
    fn insert_top_down(&mut self, _index: usize, _instance: MapNodeRef) {}

    fn insert_bottom_up(&mut self, index: usize, instance: MapNodeRef) {
        self.current.borrow_mut().insert_child(index, instance);
    }

    fn remove(&mut self, index: usize, count: usize) {
        self.current.borrow_mut().remove_children(index, count);
    }

    fn move_nodes(&mut self, from: usize, to: usize, count: usize) {
        self.current.borrow_mut().move_children(from, to, count);
    }

    fn clear(&mut self) {
        debug!("MapApplier: clearing {} ancestors", self.stack.len());
        for node in self.stack.drain(..).rev() {
            node.borrow_mut().remove_all_children();
        }
        self.root.borrow_mut().remove_all_children();
        self.current = self.root.clone();
    }
}

impl fmt::Debug for MapApplier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MapApplier")
            .field("root", &self.root.borrow().id())
            .field("current", &self.current.borrow().id())
            .field("depth", &self.stack.len())
            .finish()
    }
}

/// One operation of a recorded edit stream
#[derive(Clone)]
pub enum EditOp {
    Down(MapNodeRef),
    Up,
    InsertTopDown { index: usize, node: MapNodeRef },
    InsertBottomUp { index: usize, node: MapNodeRef },
    Remove { index: usize, count: usize },
    Move { from: usize, to: usize, count: usize },
    /// Replaces the modifier chain of the current node.
    SetModifier(Modifier),
    Clear,
}

impl fmt::Debug for EditOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EditOp::Down(node) => write!(f, "Down({:?})", node.borrow().id()),
            EditOp::Up => write!(f, "Up"),
            EditOp::InsertTopDown { index, node } => {
                write!(f, "InsertTopDown({}, {:?})", index, node.borrow().id())
            }
            EditOp::InsertBottomUp { index, node } => {
                write!(f, "InsertBottomUp({}, {:?})", index, node.borrow().id())
            }
            EditOp::Remove { index, count } => write!(f, "Remove({}, {})", index, count),
            EditOp::Move { from, to, count } => write!(f, "Move({}, {}, {})", from, to, count),
            EditOp::SetModifier(modifier) => write!(f, "SetModifier({:?})", modifier),
            EditOp::Clear => write!(f, "Clear"),
        }
    }
}

/// Feeds a batch of edits to `applier`, bracketed by the change callbacks.
pub fn apply_edits(applier: &mut MapApplier, ops: impl IntoIterator<Item = EditOp>) -> Vec<ChainPatch> {
    let mut patches = Vec::new();
    applier.on_begin_changes();
    for op in ops {
        trace!("apply_edits: {:?}", op);
        match op {
            EditOp::Down(node) => applier.down(node),
            EditOp::Up => applier.up(),
            EditOp::InsertTopDown { index, node } => applier.insert_top_down(index, node),
            EditOp::InsertBottomUp { index, node } => applier.insert_bottom_up(index, node),
            EditOp::Remove { index, count } => applier.remove(index, count),
            EditOp::Move { from, to, count } => applier.move_nodes(from, to, count),
            EditOp::SetModifier(modifier) => patches.extend(applier.set_modifier(modifier)),
            EditOp::Clear => applier.clear(),
        }
    }
    applier.on_end_changes();
    patches
}

/// Identity check used by tests and hosts holding node handles.
pub fn is_same_node(a: &MapNodeRef, b: &MapNodeRef) -> bool {
    Rc::ptr_eq(a, b)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::map_view::OverlayKind;
    use crate::node::MapNode;
    use crate::recording::{MapCall, RecordingMap};

    fn applier() -> (Rc<RecordingMap>, MapApplier) {
        let map = Rc::new(RecordingMap::new());
        let root = MapNode::root(map.clone());
        (map, MapApplier::new(root))
    }

    #[test]
    fn down_and_up_track_the_cursor() {
        let (_map, mut applier) = applier();
        let marker = MapNode::overlay(OverlayKind::Marker);
        applier.down(marker.clone());
        assert!(is_same_node(applier.current(), &marker));
        assert_eq!(applier.depth(), 1);
        applier.up();
        assert!(is_same_node(applier.current(), applier.root()));
        assert_eq!(applier.depth(), 0);
    }

    #[test]
    #[should_panic(expected = "empty stack")]
    fn up_on_empty_stack_is_fatal() {
        let (_map, mut applier) = applier();
        applier.up();
    }

    #[test]
    fn top_down_insert_is_ignored() {
        let (map, mut applier) = applier();
        applier.insert_top_down(0, MapNode::overlay(OverlayKind::Marker));
        assert_eq!(applier.root().borrow().child_count(), 0);
        assert!(map.calls().is_empty());
    }

    #[test]
    fn bottom_up_stream_attaches_each_node_once() {
        let (map, mut applier) = applier();
        let marker = MapNode::overlay(OverlayKind::Marker);
        let window = MapNode::overlay(OverlayKind::InfoWindow);
        apply_edits(
            &mut applier,
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
        assert_eq!(
            map.take_calls(),
            [
                MapCall::AddOverlay { handle: 1, kind: OverlayKind::Marker },
                MapCall::AddOverlay { handle: 2, kind: OverlayKind::InfoWindow },
            ]
        );
    }

    #[test]
    fn clear_empties_stack_and_tree() {
        let (map, mut applier) = applier();
        let marker = MapNode::overlay(OverlayKind::Marker);
        applier.insert_bottom_up(0, marker.clone());
        applier.down(marker.clone());
        applier.insert_bottom_up(0, MapNode::overlay(OverlayKind::InfoWindow));
        map.take_calls();

        applier.clear();
        assert_eq!(applier.depth(), 0);
        assert!(is_same_node(applier.current(), applier.root()));
        assert_eq!(applier.root().borrow().child_count(), 0);
        assert!(!marker.borrow().is_attached());
        assert_eq!(
            map.take_calls(),
            [
                MapCall::RemoveOverlay { handle: 2 },
                MapCall::RemoveOverlay { handle: 1 },
            ]
        );
    }
}
