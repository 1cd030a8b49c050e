//! Identity-based collection comparison
use crate::modifier::ElementRef;
use std::rc::Rc;

/// Values compared by who they are, not by what they contain.
pub trait Identity {
    fn is_same(&self, other: &Self) -> bool;
}

impl<T: ?Sized> Identity for Rc<T> {
    fn is_same(&self, other: &Self) -> bool {
        Rc::ptr_eq(self, other)
    }
}

impl Identity for ElementRef {
    fn is_same(&self, other: &Self) -> bool {
        self.id() == other.id()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Order {
    /// Same instance at every position.
    Exact,
    /// Some pairing matches every instance exactly once.
    AnyOrder,
}

/// True when `actual` holds exactly the instances of `expected`.
///
/// Under [`Order::AnyOrder`] each expected instance must claim a distinct
/// actual one, so a missing or duplicated instance fails the comparison.
pub fn same_instances<T: Identity>(expected: &[T], actual: &[T], order: Order) -> bool {
    if expected.len() != actual.len() {
        return false;
    }
    match order {
        Order::Exact => expected.iter().zip(actual).all(|(e, a)| e.is_same(a)),
        Order::AnyOrder => {
            let mut claimed = vec![false; actual.len()];
            expected.iter().all(|e| {
                let found = actual
                    .iter()
                    .enumerate()
                    .position(|(i, a)| !claimed[i] && e.is_same(a));
                match found {
                    Some(i) => {
                        claimed[i] = true;
                        true
                    }
                    None => false,
                }
            })
        }
    }
}
