// /src/errors.rs
//! Recoverable failures. Broken edit-stream contracts panic instead; see the applier.
use thiserror::Error;

#[derive(Error, Debug)]
pub enum MapError {
    #[error("Invalid overlay descriptor '{name}': {details}")]
    DescriptorError { name: String, details: String },

    #[error("Unsupported parameter type '{type_name}' for '{method}.{parameter}'")]
    UnsupportedType {
        method: String,
        parameter: String,
        type_name: String,
    },

    #[error("Unknown overlay kind '{0}'")]
    UnknownOverlayKind(String),

    #[error("Unknown lifecycle event '{0}'")]
    UnknownLifecycleEvent(String),

    #[error("Invalid edit: {0}")]
    InvalidEdit(String),

    #[error("Type conversion error: expected {expected}, got {actual}")]
    TypeConversionError { expected: String, actual: String },

    #[error("Serialization error: {0}")]
    SerdeError(#[from] serde_json::Error),

    #[error("Python call failed: {0}")]
    PythonError(String),
}

#[cfg(feature = "python")]
impl From<MapError> for pyo3::PyErr {
    fn from(err: MapError) -> Self {
        pyo3::exceptions::PyValueError::new_err(err.to_string())
    }
}

#[cfg(feature = "python")]
impl From<pyo3::PyErr> for MapError {
    fn from(err: pyo3::PyErr) -> Self {
        MapError::PythonError(err.to_string())
    }
}
