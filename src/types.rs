//! Identity tokens and reconciliation records shared across the crate
use crate::kind_set::KindSet;
use serde::Serialize;
use std::borrow::Cow;
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};

static NEXT_ELEMENT_ID: AtomicU64 = AtomicU64::new(1);
static NEXT_NODE_ID: AtomicU64 = AtomicU64::new(1);

/// Identity of a modifier element. Clones of a chain share it, a freshly
/// built element never does.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct ElementId(u64);

impl ElementId {
    pub fn next() -> Self {
        ElementId(NEXT_ELEMENT_ID.fetch_add(1, Ordering::Relaxed))
    }

    pub fn get(self) -> u64 {
        self.0
    }
}

/// Identity of an attached map node.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct NodeId(u64);

impl NodeId {
    pub fn next() -> Self {
        NodeId(NEXT_NODE_ID.fetch_add(1, Ordering::Relaxed))
    }

    pub fn get(self) -> u64 {
        self.0
    }
}

/// Compatibility tag of a contribution.
///
/// Two elements with equal tags can update each other's contributor in place,
/// whatever their concrete fields are. `kinds` also decides routing.
///
/// `namespace` names the contributor family. Keys only need to be unique
/// within one family, so a property called `onClick` never matches the
/// click listener's tag.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct CapabilityTag {
    pub kinds: KindSet,
    pub namespace: &'static str,
    pub key: Cow<'static, str>,
}

impl CapabilityTag {
    /// Namespace for elements defined outside this crate.
    pub const ELEMENT: &'static str = "element";

    pub fn new(kinds: KindSet, key: impl Into<Cow<'static, str>>) -> Self {
        CapabilityTag::in_namespace(kinds, CapabilityTag::ELEMENT, key)
    }

    pub fn in_namespace(
        kinds: KindSet,
        namespace: &'static str,
        key: impl Into<Cow<'static, str>>,
    ) -> Self {
        CapabilityTag {
            kinds,
            namespace,
            key: key.into(),
        }
    }
}

/// What happened at one chain position during reconciliation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ChainAction {
    Attach,
    Reuse,
    Update,
    Replace,
    Detach,
}

impl fmt::Display for ChainAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ChainAction::Attach => "ATTACH",
            ChainAction::Reuse => "REUSE",
            ChainAction::Update => "UPDATE",
            ChainAction::Replace => "REPLACE",
            ChainAction::Detach => "DETACH",
        };
        f.write_str(name)
    }
}

/// One reconciliation step, in execution order
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ChainPatch {
    pub action: ChainAction,
    pub position: usize,
    pub element: ElementId,
    pub tag: CapabilityTag,
}
