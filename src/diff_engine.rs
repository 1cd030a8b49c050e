//! Modifier-chain reconciliation: reuse, update in place, or replace
use crate::contributor::{AttachTarget, Contributor};
use crate::modifier::{ElementRef, Modifier};
use crate::types::{ChainAction, ChainPatch};
use log::{debug, trace};
use std::fmt;

/// Decides what one chain position needs when `old` is followed by `new`.
///
/// Identity wins over everything; otherwise the capability tag alone decides
/// whether the existing contributor can take the new data.
pub fn decide(old: &ElementRef, new: &ElementRef) -> ChainAction {
    if old.id() == new.id() {
        ChainAction::Reuse
    } else if old.tag() == new.tag() {
        ChainAction::Update
    } else {
        ChainAction::Replace
    }
}

struct AttachedEntry {
    element: ElementRef,
    contributor: Box<dyn Contributor>,
}

/// The contributors currently realizing a node's modifier chain, in
/// registration order.
#[derive(Default)]
pub struct ContributorChain {
    entries: Vec<AttachedEntry>,
}

impl ContributorChain {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Elements currently attached, in registration order.
    pub fn elements(&self) -> Vec<ElementRef> {
        self.entries.iter().map(|e| e.element.clone()).collect()
    }

    /// Brings the attached contributors in line with `modifier`.
    ///
    /// Elements whose kinds the target does not accept are skipped. Returns
    /// the steps taken, in the order they ran.
    pub fn update(&mut self, target: &AttachTarget, modifier: &Modifier) -> Vec<ChainPatch> {
        let mut engine = DiffEngine::new(target, &mut self.entries);
        engine.reconcile(modifier);
        engine.patches
    }

    /// Detaches everything, innermost first.
    pub fn detach_all(&mut self) -> Vec<ChainPatch> {
        let mut patches = Vec::with_capacity(self.entries.len());
        let count = self.entries.len();
        for (offset, mut entry) in self.entries.drain(..).rev().enumerate() {
            entry.contributor.detach();
            patches.push(ChainPatch {
                action: ChainAction::Detach,
                position: count - 1 - offset,
                element: entry.element.id(),
                tag: entry.element.tag(),
            });
        }
        patches
    }
}

impl fmt::Debug for ContributorChain {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list()
            .entries(self.entries.iter().map(|e| &e.contributor))
            .finish()
    }
}

struct DiffEngine<'a> {
    target: &'a AttachTarget,
    entries: &'a mut Vec<AttachedEntry>,
    patches: Vec<ChainPatch>,
}

impl<'a> DiffEngine<'a> {
    fn new(target: &'a AttachTarget, entries: &'a mut Vec<AttachedEntry>) -> Self {
        DiffEngine {
            target,
            entries,
            patches: Vec::new(),
        }
    }

    fn reconcile(&mut self, modifier: &Modifier) {
        let incoming = self.routed_elements(modifier);
        let mut old: Vec<Option<AttachedEntry>> = self.entries.drain(..).map(Some).collect();

        let plan: Vec<ChainAction> = (0..old.len().max(incoming.len()))
            .map(|i| match (old[..].get(i), incoming.get(i)) {
                (Some(Some(entry)), Some(new)) => decide(&entry.element, new),
                (Some(_), None) => ChainAction::Detach,
                _ => ChainAction::Attach,
            })
            .collect();

        // Every detach runs before any create, innermost first.
        for position in (0..old.len()).rev() {
            if matches!(plan[position], ChainAction::Replace | ChainAction::Detach) {
                if let Some(mut entry) = old[position].take() {
                    entry.contributor.detach();
                    self.record(ChainAction::Detach, position, &entry.element);
                }
            }
        }

        for (position, new) in incoming.iter().enumerate() {
            let action = plan[position];
            let entry = match (action, old.get_mut(position).and_then(Option::take)) {
                (ChainAction::Reuse, Some(entry)) => entry,
                (ChainAction::Update, Some(mut entry)) => {
                    new.element().update(entry.contributor.as_mut(), self.target);
                    entry.element = new.clone();
                    entry
                }
                _ => AttachedEntry {
                    element: new.clone(),
                    contributor: new.element().create(self.target),
                },
            };
            self.record(action, position, new);
            self.entries.push(entry);
        }

        debug!(
            "DiffEngine: reconciled {:?}: {} positions, {} attached",
            self.target,
            plan.len(),
            self.entries.len()
        );
    }

    fn routed_elements(&self, modifier: &Modifier) -> Vec<ElementRef> {
        modifier.fold_in(Vec::new(), |mut acc, element| {
            let tag = element.tag();
            if self.target.accepts(tag.kinds) {
                acc.push(element.clone());
            } else {
                debug!(
                    "DiffEngine: skipping '{}' ({:?}), not accepted by {:?}",
                    tag.key, tag.kinds, self.target
                );
            }
            acc
        })
    }

    fn record(&mut self, action: ChainAction, position: usize, element: &ElementRef) {
        trace!("DiffEngine: {} at {} -> {:?}", action, position, element);
        self.patches.push(ChainPatch {
            action,
            position,
            element: element.id(),
            tag: element.tag(),
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::contributor::downcast_contributor;
    use crate::kind_set::KindSet;
    use crate::modifier::ModifierElement;
    use crate::recording::RecordingMap;
    use crate::types::CapabilityTag;
    use std::cell::RefCell;
    use std::rc::Rc;

    type Log = Rc<RefCell<Vec<String>>>;

    #[derive(Debug)]
    struct Probe {
        key: &'static str,
        kinds: KindSet,
        label: &'static str,
        log: Log,
    }

    #[derive(Debug)]
    struct ProbeContributor {
        label: &'static str,
        log: Log,
    }

    impl Contributor for ProbeContributor {
        fn detach(&mut self) {
            self.log.borrow_mut().push(format!("detach {}", self.label));
        }
    }

    impl ModifierElement for Probe {
        fn tag(&self) -> CapabilityTag {
            CapabilityTag::new(self.kinds, self.key)
        }

        fn create(&self, _target: &AttachTarget) -> Box<dyn Contributor> {
            self.log.borrow_mut().push(format!("create {}", self.label));
            Box::new(ProbeContributor {
                label: self.label,
                log: self.log.clone(),
            })
        }

        fn update(&self, contributor: &mut dyn Contributor, _target: &AttachTarget) {
            let contributor = downcast_contributor::<ProbeContributor>(contributor);
            self.log
                .borrow_mut()
                .push(format!("update {} -> {}", contributor.label, self.label));
            contributor.label = self.label;
        }
    }

    fn probe(log: &Log, key: &'static str, label: &'static str) -> Modifier {
        Modifier::element(Probe {
            key,
            kinds: KindSet::ANY,
            label,
            log: log.clone(),
        })
    }

    fn element_of(modifier: &Modifier) -> ElementRef {
        modifier.elements().remove(0)
    }

    fn map_target() -> AttachTarget {
        AttachTarget::Map(Rc::new(RecordingMap::new()))
    }

    fn actions(patches: &[ChainPatch]) -> Vec<ChainAction> {
        patches.iter().map(|p| p.action).collect()
    }

    #[test]
    fn decide_follows_identity_then_tag() {
        let log = Log::default();
        let a = element_of(&probe(&log, "alpha", "a"));
        let a_again = element_of(&probe(&log, "alpha", "a2"));
        let b = element_of(&probe(&log, "beta", "b"));
        assert_eq!(decide(&a, &a.clone()), ChainAction::Reuse);
        assert_eq!(decide(&a, &a_again), ChainAction::Update);
        assert_eq!(decide(&a, &b), ChainAction::Replace);
    }

    #[test]
    fn first_update_attaches_in_order() {
        let log = Log::default();
        let target = map_target();
        let mut chain = ContributorChain::new();
        let modifier = probe(&log, "a", "A").then(probe(&log, "b", "B"));
        let patches = chain.update(&target, &modifier);
        assert_eq!(actions(&patches), [ChainAction::Attach, ChainAction::Attach]);
        assert_eq!(*log.borrow(), ["create A", "create B"]);
        assert_eq!(chain.len(), 2);
    }

    #[test]
    fn replaced_tail_detaches_old_and_keeps_stable_head() {
        let log = Log::default();
        let target = map_target();
        let mut chain = ContributorChain::new();
        let a = probe(&log, "a", "A");
        chain.update(&target, &a.clone().then(probe(&log, "b", "B")));
        log.borrow_mut().clear();

        let patches = chain.update(&target, &a.then(probe(&log, "c", "C")));
        assert_eq!(
            actions(&patches),
            [ChainAction::Detach, ChainAction::Reuse, ChainAction::Replace]
        );
        assert_eq!(*log.borrow(), ["detach B", "create C"]);
    }

    #[test]
    fn same_tag_updates_in_place() {
        let log = Log::default();
        let target = map_target();
        let mut chain = ContributorChain::new();
        chain.update(&target, &probe(&log, "a", "A1"));
        log.borrow_mut().clear();

        let next = probe(&log, "a", "A2");
        let patches = chain.update(&target, &next);
        assert_eq!(actions(&patches), [ChainAction::Update]);
        assert_eq!(*log.borrow(), ["update A1 -> A2"]);
        assert_eq!(chain.elements()[0].id(), element_of(&next).id());
    }

    #[test]
    fn all_detaches_run_inner_first_before_any_create() {
        let log = Log::default();
        let target = map_target();
        let mut chain = ContributorChain::new();
        let old = probe(&log, "a", "A")
            .then(probe(&log, "b", "B"))
            .then(probe(&log, "c", "C"));
        chain.update(&target, &old);
        log.borrow_mut().clear();

        chain.update(&target, &probe(&log, "x", "X"));
        assert_eq!(
            *log.borrow(),
            ["detach C", "detach B", "detach A", "create X"]
        );
    }

    #[test]
    fn detach_all_runs_in_fold_out_order() {
        let log = Log::default();
        let target = map_target();
        let mut chain = ContributorChain::new();
        let modifier = probe(&log, "a", "A")
            .then(probe(&log, "b", "B"))
            .then(probe(&log, "c", "C"));
        chain.update(&target, &modifier);
        log.borrow_mut().clear();

        let patches = chain.detach_all();
        assert_eq!(*log.borrow(), ["detach C", "detach B", "detach A"]);
        assert_eq!(
            patches.iter().map(|p| p.position).collect::<Vec<_>>(),
            [2, 1, 0]
        );
        assert!(chain.is_empty());
    }

    #[test]
    fn unaccepted_kinds_are_routed_away() {
        let log = Log::default();
        let target = map_target();
        let mut chain = ContributorChain::new();
        let modifier = Modifier::element(Probe {
            key: "marker-only",
            kinds: KindSet::MARKER,
            label: "M",
            log: log.clone(),
        })
        .then(probe(&log, "any", "Z"));
        let patches = chain.update(&target, &modifier);
        assert_eq!(patches.len(), 1);
        assert_eq!(*log.borrow(), ["create Z"]);
    }
}
