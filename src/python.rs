//! Python bindings over [`MapSession`]
use crate::config::MapViewOptions;
use crate::converters::{py_dict_to_properties, to_pyobject};
use crate::session::{MapSession, Properties};
use pyo3::prelude::*;

/// One map view backed by the in-memory SDK.
///
/// Nodes are referred to by the integer id `create_overlay` returns. Bad
/// edits raise `ValueError`.
#[pyclass(name = "MapSession", unsendable)]
pub struct PyMapSession {
    inner: MapSession,
}

#[pymethods]
impl PyMapSession {
    #[new]
    #[pyo3(signature = (options_json=None))]
    fn new(options_json: Option<&str>) -> PyResult<Self> {
        let options = match options_json {
            Some(json) => MapViewOptions::from_json(json)?,
            None => MapViewOptions::default(),
        };
        Ok(PyMapSession {
            inner: MapSession::new(&options),
        })
    }

    #[pyo3(signature = (kind, properties=None))]
    fn create_overlay<'py>(
        &mut self,
        py: Python<'py>,
        kind: &str,
        properties: Option<&Bound<'py, PyAny>>,
    ) -> PyResult<u64> {
        let properties = match properties {
            Some(props) => py_dict_to_properties(py, props)?,
            None => Properties::new(),
        };
        Ok(self.inner.create_overlay(kind, properties)?)
    }

    fn down(&mut self, node: u64) -> PyResult<()> {
        Ok(self.inner.down(node)?)
    }

    fn up(&mut self) -> PyResult<()> {
        Ok(self.inner.up()?)
    }

    fn insert_top_down(&mut self, index: usize, node: u64) -> PyResult<()> {
        Ok(self.inner.insert_top_down(index, node)?)
    }

    fn insert_bottom_up(&mut self, index: usize, node: u64) -> PyResult<()> {
        Ok(self.inner.insert_bottom_up(index, node)?)
    }

    fn remove(&mut self, index: usize, count: usize) -> PyResult<()> {
        Ok(self.inner.remove(index, count)?)
    }

    fn move_nodes(&mut self, from: usize, to: usize, count: usize) -> PyResult<()> {
        Ok(self.inner.move_nodes(from, to, count)?)
    }

    fn clear(&mut self) -> PyResult<()> {
        Ok(self.inner.clear()?)
    }

    /// Replaces the current node's properties and returns the patches.
    fn set_properties<'py>(
        &mut self,
        py: Python<'py>,
        properties: &Bound<'py, PyAny>,
    ) -> PyResult<Bound<'py, PyAny>> {
        let patches = self.inner.set_properties(py_dict_to_properties(py, properties)?)?;
        to_pyobject(py, &patches)
    }

    fn lifecycle_event(&self, name: &str) -> PyResult<()> {
        Ok(self.inner.lifecycle_event(name)?)
    }

    fn low_memory(&self) {
        self.inner.low_memory();
    }

    fn lifecycle_state(&self) -> String {
        format!("{:?}", self.inner.lifecycle_state())
    }

    fn click_overlay(&self, handle: u64) -> bool {
        self.inner.click_overlay(handle)
    }

    /// SDK calls made since the last call, as dicts.
    fn take_calls<'py>(&self, py: Python<'py>) -> PyResult<Bound<'py, PyAny>> {
        to_pyobject(py, &self.inner.map().take_calls())
    }

    fn saved_state<'py>(&self, py: Python<'py>) -> PyResult<Bound<'py, PyAny>> {
        to_pyobject(py, &self.inner.saved_state())
    }

    /// Tears the whole map down. The session is unusable afterwards.
    fn dispose<'py>(&mut self, py: Python<'py>) -> PyResult<Bound<'py, PyAny>> {
        let patches = self.inner.dispose()?;
        to_pyobject(py, &patches)
    }
}
