//! Conversions between host values and [`PropertyValue`]s
//!
//! Loose JSON (what a scripting host naturally produces) is read here; the
//! Python side goes through JSON so both paths share one set of rules.
use crate::errors::MapError;
use crate::map_view::{LatLng, PropertyValue};
use serde_json::Value;

/// Reads a loosely-typed JSON value as a property value.
///
/// Explicitly tagged values (`{"type": "color", "value": ...}`) keep their
/// tag; `{"lat", "lng"}` objects become coordinates and arrays made only of
/// them become coordinate lists.
pub fn json_to_property(value: &Value) -> Result<PropertyValue, MapError> {
    match value {
        Value::Bool(b) => Ok(PropertyValue::Bool(*b)),
        Value::Number(n) => match n.as_i64() {
            Some(i) => Ok(PropertyValue::Int(i)),
            None => n.as_f64().map(PropertyValue::Float).ok_or_else(|| {
                MapError::TypeConversionError {
                    expected: "number within f64 range".into(),
                    actual: n.to_string(),
                }
            }),
        },
        Value::String(s) => Ok(PropertyValue::Text(s.clone())),
        Value::Object(map) if map.contains_key("type") && map.contains_key("value") => {
            Ok(serde_json::from_value(value.clone())?)
        }
        Value::Object(_) => as_lat_lng(value)
            .map(PropertyValue::LatLng)
            .ok_or_else(|| MapError::TypeConversionError {
                expected: "tagged value or {lat, lng}".into(),
                actual: value.to_string(),
            }),
        Value::Array(items) => {
            let coords: Option<Vec<LatLng>> = items.iter().map(as_lat_lng).collect();
            match coords {
                Some(coords) if !coords.is_empty() => Ok(PropertyValue::Coords(coords)),
                _ => items
                    .iter()
                    .map(json_to_property)
                    .collect::<Result<_, _>>()
                    .map(PropertyValue::List),
            }
        }
        Value::Null => Err(MapError::TypeConversionError {
            expected: "property value".into(),
            actual: "null".into(),
        }),
    }
}

fn as_lat_lng(value: &Value) -> Option<LatLng> {
    let map = value.as_object()?;
    if map.len() != 2 {
        return None;
    }
    Some(LatLng::new(map.get("lat")?.as_f64()?, map.get("lng")?.as_f64()?))
}

#[cfg(feature = "python")]
pub use self::py::*;

#[cfg(feature = "python")]
mod py {
    use super::json_to_property;
    use crate::errors::MapError;
    use crate::map_view::PropertyValue;
    use indexmap::IndexMap;
    use pyo3::prelude::*;
    use pyo3::types::{PyBool, PyDict, PyFloat, PyList, PyModule, PyString};
    use serde_json::Value;

    /// Python dict of property name -> value, in insertion order
    pub fn py_dict_to_properties<'py>(
        py: Python<'py>,
        obj: &Bound<'py, PyAny>,
    ) -> Result<IndexMap<String, PropertyValue>, MapError> {
        match python_to_json(py, obj)? {
            Value::Object(map) => map
                .iter()
                .map(|(name, value)| Ok((name.clone(), json_to_property(value)?)))
                .collect(),
            other => Err(MapError::TypeConversionError {
                expected: "dict".into(),
                actual: format!("value is not a dict (was {})", other),
            }),
        }
    }

    pub fn python_to_json<'py>(
        py: Python<'py>,
        obj: &Bound<'py, PyAny>,
    ) -> Result<Value, MapError> {
        let dumps = PyModule::import(py, "json")?.getattr("dumps")?;
        let dumped: String = dumps.call1((obj,))?.extract()?;
        serde_json::from_str(&dumped).map_err(|e| MapError::TypeConversionError {
            expected: "JSON-serializable value".into(),
            actual: e.to_string(),
        })
    }

    /// Builds the Python value for `value`. Integers stay integers across
    /// the whole `i64`/`u64` range; only true fractions become floats.
    pub fn json_to_pyobject<'py>(py: Python<'py>, value: &Value) -> PyResult<Bound<'py, PyAny>> {
        Ok(match value {
            Value::Null => py.None().into_bound(py),
            Value::Bool(flag) => PyBool::new(py, *flag).to_owned().into_any(),
            Value::Number(n) => match (n.as_i64(), n.as_u64()) {
                (Some(signed), _) => signed.into_pyobject(py)?.into_any(),
                (None, Some(unsigned)) => unsigned.into_pyobject(py)?.into_any(),
                (None, None) => PyFloat::new(py, n.as_f64().unwrap_or(f64::NAN)).into_any(),
            },
            Value::String(text) => PyString::new(py, text).into_any(),
            Value::Array(items) => {
                let items = items
                    .iter()
                    .map(|item| json_to_pyobject(py, item))
                    .collect::<PyResult<Vec<_>>>()?;
                PyList::new(py, items)?.into_any()
            }
            Value::Object(fields) => {
                let dict = PyDict::new(py);
                for (key, item) in fields {
                    dict.set_item(key, json_to_pyobject(py, item)?)?;
                }
                dict.into_any()
            }
        })
    }

    /// Serializes any value to its Python form via JSON.
    pub fn to_pyobject<'py, T: serde::Serialize>(
        py: Python<'py>,
        value: &T,
    ) -> PyResult<Bound<'py, PyAny>> {
        let json = serde_json::to_value(value).map_err(MapError::from)?;
        json_to_pyobject(py, &json)
    }
}
