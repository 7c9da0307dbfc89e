//! Named kernel parameters.
//!
//! Hosts bind resources and uniforms by name, the way a shader property
//! sheet works. Backends resolve the names they need against
//! [`crate::layout`] when a kernel is dispatched.

use std::collections::HashMap;

use crate::{BufferHandle, ComputeError, ImageHandle};

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ParamValue {
    Image(ImageHandle),
    Buffer(BufferHandle),
    Int(i32),
    Float(f32),
    Vector([f32; 4]),
    /// Column-major 4x4 matrix.
    Matrix([[f32; 4]; 4]),
}

impl ParamValue {
    const fn kind(&self) -> &'static str {
        match self {
            ParamValue::Image(_) => "image",
            ParamValue::Buffer(_) => "buffer",
            ParamValue::Int(_) => "int",
            ParamValue::Float(_) => "float",
            ParamValue::Vector(_) => "vector",
            ParamValue::Matrix(_) => "matrix",
        }
    }
}

/// The full parameter set for one dispatch.
#[derive(Debug, Default, Clone)]
pub struct KernelParams {
    values: HashMap<&'static str, ParamValue>,
}

impl KernelParams {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set(&mut self, name: &'static str, value: ParamValue) -> &mut Self {
        self.values.insert(name, value);
        self
    }

    pub fn set_image(&mut self, name: &'static str, image: ImageHandle) -> &mut Self {
        self.set(name, ParamValue::Image(image))
    }

    pub fn set_buffer(&mut self, name: &'static str, buffer: BufferHandle) -> &mut Self {
        self.set(name, ParamValue::Buffer(buffer))
    }

    pub fn set_int(&mut self, name: &'static str, value: i32) -> &mut Self {
        self.set(name, ParamValue::Int(value))
    }

    pub fn set_float(&mut self, name: &'static str, value: f32) -> &mut Self {
        self.set(name, ParamValue::Float(value))
    }

    pub fn set_vector(&mut self, name: &'static str, value: [f32; 4]) -> &mut Self {
        self.set(name, ParamValue::Vector(value))
    }

    pub fn set_matrix(&mut self, name: &'static str, value: [[f32; 4]; 4]) -> &mut Self {
        self.set(name, ParamValue::Matrix(value))
    }

    #[must_use]
    pub fn get(&self, name: &str) -> Option<ParamValue> {
        self.values.get(name).copied()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.values.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn image(&self, name: &'static str) -> Result<ImageHandle, ComputeError> {
        match self.require(name)? {
            ParamValue::Image(image) => Ok(image),
            other => Err(type_error(name, "image", other)),
        }
    }

    pub fn buffer(&self, name: &'static str) -> Result<BufferHandle, ComputeError> {
        match self.require(name)? {
            ParamValue::Buffer(buffer) => Ok(buffer),
            other => Err(type_error(name, "buffer", other)),
        }
    }

    pub fn int(&self, name: &'static str) -> Result<i32, ComputeError> {
        match self.require(name)? {
            ParamValue::Int(value) => Ok(value),
            other => Err(type_error(name, "int", other)),
        }
    }

    pub fn float(&self, name: &'static str) -> Result<f32, ComputeError> {
        match self.require(name)? {
            ParamValue::Float(value) => Ok(value),
            other => Err(type_error(name, "float", other)),
        }
    }

    pub fn vector(&self, name: &'static str) -> Result<[f32; 4], ComputeError> {
        match self.require(name)? {
            ParamValue::Vector(value) => Ok(value),
            other => Err(type_error(name, "vector", other)),
        }
    }

    pub fn matrix(&self, name: &'static str) -> Result<[[f32; 4]; 4], ComputeError> {
        match self.require(name)? {
            ParamValue::Matrix(value) => Ok(value),
            other => Err(type_error(name, "matrix", other)),
        }
    }

    fn require(&self, name: &'static str) -> Result<ParamValue, ComputeError> {
        self.get(name).ok_or(ComputeError::MissingParam(name))
    }
}

fn type_error(name: &'static str, expected: &'static str, found: ParamValue) -> ComputeError {
    ComputeError::ParamType { name, expected, found: found.kind() }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn typed_getters_return_bound_values() {
        let mut params = KernelParams::new();
        params.set_int("count", 3).set_float("time", 1.5).set_vector("light", [1.0, 2.0, 3.0, 1.0]);

        assert_eq!(params.int("count").unwrap(), 3);
        assert_eq!(params.float("time").unwrap(), 1.5);
        assert_eq!(params.vector("light").unwrap(), [1.0, 2.0, 3.0, 1.0]);
        assert_eq!(params.len(), 3);
    }

    #[test]
    fn missing_param_is_reported_by_name() {
        let params = KernelParams::new();
        assert!(matches!(params.buffer("shapes"), Err(ComputeError::MissingParam("shapes"))));
    }

    #[test]
    fn wrong_type_is_reported() {
        let mut params = KernelParams::new();
        params.set_float("count", 2.0);
        let err = params.int("count").unwrap_err();
        assert!(
            matches!(err, ComputeError::ParamType { name: "count", expected: "int", found: "float" }),
            "unexpected error {err:?}"
        );
    }

    #[test]
    fn rebinding_overwrites_previous_value() {
        let mut params = KernelParams::new();
        params.set_int("count", 1);
        params.set_int("count", 7);
        assert_eq!(params.int("count").unwrap(), 7);
        assert_eq!(params.len(), 1);
    }
}
