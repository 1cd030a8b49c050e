//! Immutable modifier chains built with `then`
use crate::contributor::{AttachTarget, Contributor};
use crate::types::{CapabilityTag, ElementId};
use std::fmt;
use std::rc::Rc;

/// The declarative half of a contribution.
///
/// An element is immutable. It knows how to create a [`Contributor`] for a
/// target and how to push its own data into a contributor that an element
/// with the same [`CapabilityTag`] created earlier.
pub trait ModifierElement: fmt::Debug + 'static {
    fn tag(&self) -> CapabilityTag;

    fn create(&self, target: &AttachTarget) -> Box<dyn Contributor>;

    fn update(&self, contributor: &mut dyn Contributor, target: &AttachTarget);
}

struct ElementCell {
    id: ElementId,
    element: Box<dyn ModifierElement>,
}

/// A shared handle to one element of a chain, carrying its identity
#[derive(Clone)]
pub struct ElementRef(Rc<ElementCell>);

impl ElementRef {
    pub fn new(element: impl ModifierElement) -> Self {
        ElementRef(Rc::new(ElementCell {
            id: ElementId::next(),
            element: Box::new(element),
        }))
    }

    pub fn id(&self) -> ElementId {
        self.0.id
    }

    pub fn tag(&self) -> CapabilityTag {
        self.0.element.tag()
    }

    pub fn element(&self) -> &dyn ModifierElement {
        self.0.element.as_ref()
    }
}

impl fmt::Debug for ElementRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{} {:?}", self.0.id.get(), self.0.element)
    }
}

/// Binary node of a chain; `outer` comes first in registration order.
pub struct CombinedModifier {
    outer: Modifier,
    inner: Modifier,
}

impl CombinedModifier {
    pub fn outer(&self) -> &Modifier {
        &self.outer
    }

    pub fn inner(&self) -> &Modifier {
        &self.inner
    }
}

/// An ordered chain of modifier elements.
///
/// Chains are persistent: `then` never copies or flattens its operands, it
/// links them under a new binary node. Cloning is cheap and shares structure.
#[derive(Clone, Default)]
pub enum Modifier {
    #[default]
    Empty,
    Element(ElementRef),
    Combined(Rc<CombinedModifier>),
}

impl Modifier {
    pub fn empty() -> Self {
        Modifier::Empty
    }

    pub fn element(element: impl ModifierElement) -> Self {
        Modifier::Element(ElementRef::new(element))
    }

    /// Appends `other` after `self`.
    ///
    /// The empty chain is an identity on both sides: the other operand comes
    /// back unchanged, sharing its structure.
    pub fn then(self, other: Modifier) -> Modifier {
        if self.is_empty() {
            return other;
        }
        if other.is_empty() {
            return self;
        }
        Modifier::Combined(Rc::new(CombinedModifier {
            outer: self,
            inner: other,
        }))
    }

    pub fn is_empty(&self) -> bool {
        matches!(self, Modifier::Empty)
    }

    /// Visits elements outer to inner (registration order).
    pub fn fold_in<R>(&self, initial: R, mut operation: impl FnMut(R, &ElementRef) -> R) -> R {
        self.fold_in_dyn(initial, &mut operation)
    }

    /// Visits elements inner to outer (reverse registration order).
    pub fn fold_out<R>(&self, initial: R, mut operation: impl FnMut(&ElementRef, R) -> R) -> R {
        self.fold_out_dyn(initial, &mut operation)
    }

    fn fold_in_dyn<R>(&self, acc: R, operation: &mut dyn FnMut(R, &ElementRef) -> R) -> R {
        match self {
            Modifier::Empty => acc,
            Modifier::Element(element) => operation(acc, element),
            Modifier::Combined(node) => {
                let acc = node.outer().fold_in_dyn(acc, operation);
                node.inner().fold_in_dyn(acc, operation)
            }
        }
    }

    fn fold_out_dyn<R>(&self, acc: R, operation: &mut dyn FnMut(&ElementRef, R) -> R) -> R {
        match self {
            Modifier::Empty => acc,
            Modifier::Element(element) => operation(element, acc),
            Modifier::Combined(node) => {
                let acc = node.inner().fold_out_dyn(acc, operation);
                node.outer().fold_out_dyn(acc, operation)
            }
        }
    }

    pub fn any(&self, mut predicate: impl FnMut(&ElementRef) -> bool) -> bool {
        self.any_dyn(&mut predicate)
    }

    fn any_dyn(&self, predicate: &mut dyn FnMut(&ElementRef) -> bool) -> bool {
        match self {
            Modifier::Empty => false,
            Modifier::Element(element) => predicate(element),
            Modifier::Combined(node) => {
                node.outer().any_dyn(predicate) || node.inner().any_dyn(predicate)
            }
        }
    }

    pub fn all(&self, mut predicate: impl FnMut(&ElementRef) -> bool) -> bool {
        !self.any(|element| !predicate(element))
    }

    /// Elements in registration order.
    pub fn elements(&self) -> Vec<ElementRef> {
        self.fold_in(Vec::new(), |mut acc, element| {
            acc.push(element.clone());
            acc
        })
    }

    pub fn len(&self) -> usize {
        self.fold_in(0, |count, _| count + 1)
    }

    /// Structural identity: both chains are the very same nodes.
    pub fn same_as(&self, other: &Modifier) -> bool {
        match (self, other) {
            (Modifier::Empty, Modifier::Empty) => true,
            (Modifier::Element(a), Modifier::Element(b)) => a.id() == b.id(),
            (Modifier::Combined(a), Modifier::Combined(b)) => Rc::ptr_eq(a, b),
            _ => false,
        }
    }
}

impl fmt::Debug for Modifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list().entries(self.elements()).finish()
    }
}
