//! Live contributors and the targets they attach to
use crate::kind_set::KindSet;
use crate::map_view::{MapView, Overlay};
use std::any::{Any, type_name};
use std::fmt;
use std::rc::Rc;

/// Downcast support for trait objects. Implemented for every sized `'static` type.
pub trait AsAny: Any {
    fn as_any(&self) -> &dyn Any;
    fn as_any_mut(&mut self) -> &mut dyn Any;
}

impl<T: Any> AsAny for T {
    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }
}

/// The live object realizing one contribution.
///
/// `detach` undoes whatever the contributor did to its target. It may be
/// called more than once (host teardown is not guaranteed to be ordered) and
/// must only act the first time.
pub trait Contributor: AsAny + fmt::Debug {
    fn detach(&mut self);
}

/// Holds a contributor's undo step and runs it at most once
#[derive(Default)]
pub struct DetachHandle {
    callback: Option<Box<dyn FnOnce()>>,
}

impl DetachHandle {
    pub fn new(callback: impl FnOnce() + 'static) -> Self {
        DetachHandle {
            callback: Some(Box::new(callback)),
        }
    }

    pub fn is_armed(&self) -> bool {
        self.callback.is_some()
    }

    pub fn run(&mut self) {
        if let Some(callback) = self.callback.take() {
            callback();
        }
    }
}

impl fmt::Debug for DetachHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DetachHandle")
            .field("armed", &self.is_armed())
            .finish()
    }
}

/// Recovers the concrete contributor an element created earlier.
///
/// # Panics
///
/// When the contributor is of another type. The reconciler only pairs
/// elements with contributors created under the same tag, so this means an
/// element implementation broke that contract.
pub fn downcast_contributor<C: Contributor>(contributor: &mut dyn Contributor) -> &mut C {
    match AsAny::as_any_mut(contributor).downcast_mut::<C>() {
        Some(concrete) => concrete,
        None => panic!(
            "wrong contributor type: expected {}, the element that created it used another tag",
            type_name::<C>()
        ),
    }
}

/// The live object a chain is attached to
#[derive(Clone)]
pub enum AttachTarget {
    Map(Rc<dyn MapView>),
    Overlay {
        map: Rc<dyn MapView>,
        overlay: Rc<dyn Overlay>,
    },
}

impl AttachTarget {
    /// Capability bits this target accepts.
    pub fn kinds(&self) -> KindSet {
        match self {
            AttachTarget::Map(_) => KindSet::ANY | KindSet::MAP_VIEW,
            AttachTarget::Overlay { overlay, .. } => {
                KindSet::ANY | KindSet::OVERLAY | overlay.kind().kind_bit()
            }
        }
    }

    pub fn accepts(&self, kinds: KindSet) -> bool {
        self.kinds().includes(kinds)
    }

    pub fn map(&self) -> &Rc<dyn MapView> {
        match self {
            AttachTarget::Map(map) => map,
            AttachTarget::Overlay { map, .. } => map,
        }
    }

    pub fn overlay(&self) -> Option<&Rc<dyn Overlay>> {
        match self {
            AttachTarget::Map(_) => None,
            AttachTarget::Overlay { overlay, .. } => Some(overlay),
        }
    }
}

impl fmt::Debug for AttachTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AttachTarget::Map(_) => write!(f, "AttachTarget::Map"),
            AttachTarget::Overlay { overlay, .. } => write!(
                f,
                "AttachTarget::Overlay({} #{})",
                overlay.kind(),
                overlay.handle()
            ),
        }
    }
}
