//! Capability bits used to route contributions to the right live target
use serde::{Serialize, Serializer};
use std::fmt;
use std::ops::{BitOr, BitOrAssign};

/// A set of capability bits.
///
/// Targets advertise the bits they accept and contributions declare the bits
/// they affect. A contribution is delivered to a target when the two sets
/// share at least one bit; there is no type hierarchy involved.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct KindSet(u32);

const NAMES: [(KindSet, &str); 11] = [
    (KindSet::ANY, "ANY"),
    (KindSet::MAP_VIEW, "MAP_VIEW"),
    (KindSet::OVERLAY, "OVERLAY"),
    (KindSet::MARKER, "MARKER"),
    (KindSet::INFO_WINDOW, "INFO_WINDOW"),
    (KindSet::CIRCLE, "CIRCLE"),
    (KindSet::POLYLINE, "POLYLINE"),
    (KindSet::POLYGON, "POLYGON"),
    (KindSet::PATH, "PATH"),
    (KindSet::GROUND_OVERLAY, "GROUND_OVERLAY"),
    (KindSet::LOCATION_OVERLAY, "LOCATION_OVERLAY"),
];

impl KindSet {
    pub const EMPTY: KindSet = KindSet(0);
    /// Accepted by every attachable target.
    pub const ANY: KindSet = KindSet(1 << 0);
    /// The map view itself.
    pub const MAP_VIEW: KindSet = KindSet(1 << 1);
    /// Any overlay, whatever its concrete kind.
    pub const OVERLAY: KindSet = KindSet(1 << 2);
    pub const MARKER: KindSet = KindSet(1 << 3);
    pub const INFO_WINDOW: KindSet = KindSet(1 << 4);
    pub const CIRCLE: KindSet = KindSet(1 << 5);
    pub const POLYLINE: KindSet = KindSet(1 << 6);
    pub const POLYGON: KindSet = KindSet(1 << 7);
    pub const PATH: KindSet = KindSet(1 << 8);
    pub const GROUND_OVERLAY: KindSet = KindSet(1 << 9);
    pub const LOCATION_OVERLAY: KindSet = KindSet(1 << 10);

    pub const fn from_bits(bits: u32) -> Self {
        KindSet(bits)
    }

    pub const fn bits(self) -> u32 {
        self.0
    }

    pub const fn union(self, other: KindSet) -> KindSet {
        KindSet(self.0 | other.0)
    }

    /// Membership test: true when the sets share any bit.
    pub const fn includes(self, other: KindSet) -> bool {
        self.0 & other.0 != 0
    }

    /// True when every bit of `other` is also set here.
    pub const fn contains_all(self, other: KindSet) -> bool {
        self.0 & other.0 == other.0
    }

    pub const fn is_empty(self) -> bool {
        self.0 == 0
    }
}

impl BitOr for KindSet {
    type Output = KindSet;

    fn bitor(self, rhs: KindSet) -> KindSet {
        self.union(rhs)
    }
}

impl BitOrAssign for KindSet {
    fn bitor_assign(&mut self, rhs: KindSet) {
        self.0 |= rhs.0;
    }
}

impl Serialize for KindSet {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_u32(self.0)
    }
}

impl fmt::Debug for KindSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut names = NAMES
            .iter()
            .filter(|(bit, _)| self.contains_all(*bit))
            .map(|(_, name)| *name)
            .peekable();
        if names.peek().is_none() {
            return write!(f, "KindSet({:#x})", self.0);
        }
        write!(f, "KindSet(")?;
        let mut first = true;
        for name in names {
            if !first {
                write!(f, " | ")?;
            }
            write!(f, "{}", name)?;
            first = false;
        }
        write!(f, ")")
    }
}
