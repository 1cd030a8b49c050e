//! Reconciles a declarative map tree and its modifier chains against a
//! retained-mode map SDK.
//!
//! The host feeds tree edits to a [`MapApplier`]; each node's [`Modifier`]
//! chain is diffed position by position and only the changed contributions
//! touch the SDK.
pub mod applier;
pub mod codegen;
pub mod compare;
pub mod config;
pub mod contributor;
pub mod converters;
pub mod diff_engine;
pub mod errors;
pub mod kind_set;
pub mod lifecycle;
pub mod map_view;
pub mod modifier;
pub mod node;
pub mod overlay;
pub mod recording;
pub mod session;
pub mod types;

#[cfg(feature = "python")]
mod python;

pub use applier::{Applier, EditOp, MapApplier, apply_edits};
pub use compare::{Order, same_instances};
pub use config::{GeneratorConfig, MapViewOptions};
pub use contributor::{AttachTarget, Contributor};
pub use diff_engine::ContributorChain;
pub use errors::MapError;
pub use kind_set::KindSet;
pub use lifecycle::{LifecycleEvent, LifecycleRegistry, LifecycleState, MapLifecycle};
pub use map_view::{CameraPosition, LatLng, MapView, Overlay, OverlayKind, PropertyValue};
pub use modifier::{Modifier, ModifierElement};
pub use node::{MapNode, MapNodeRef};
pub use overlay::OverlayModifiers;
pub use session::MapSession;
pub use types::{ChainAction, ChainPatch};

#[cfg(feature = "python")]
use pyo3::prelude::*;

#[cfg(feature = "python")]
#[pymodule]
fn map_reconciler(m: &Bound<'_, PyModule>) -> PyResult<()> {
    m.add_class::<python::PyMapSession>()?;

    m.add("ATTACH", types::ChainAction::Attach.to_string())?;
    m.add("REUSE", types::ChainAction::Reuse.to_string())?;
    m.add("UPDATE", types::ChainAction::Update.to_string())?;
    m.add("REPLACE", types::ChainAction::Replace.to_string())?;
    m.add("DETACH", types::ChainAction::Detach.to_string())?;

    Ok(())
}
