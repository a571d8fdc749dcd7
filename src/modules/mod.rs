//! Processing-module framework
//!
//! Every algorithm is exposed as a module that can describe itself and be
//! invoked with a flat parameter mapping. The command-line runner drives
//! modules through this interface only: it reads the description to build
//! the argument list, loads the declared inputs, invokes the algorithm, and
//! saves the declared outputs.

use std::collections::HashMap;

use crate::matrix::Matrix;
use crate::volume::Volume;

mod compute_glm;

pub use compute_glm::{normalize_params, ComputeGlmModule};

/// A data handle passed into or out of a module
#[derive(Clone, Debug)]
pub enum DataObject {
    Image(Volume),
    Matrix(Matrix),
}

/// Kind of data a module input or output carries
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum DataKind {
    Image,
    Matrix,
}

/// Kind of a scalar parameter
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ParamKind {
    Int,
    Float,
    Bool,
    Str,
}

/// A scalar parameter value
#[derive(Clone, Debug, PartialEq)]
pub enum ParamValue {
    Int(i32),
    Float(f64),
    Bool(bool),
    Str(String),
}

/// Human-readable description of one parameter
pub struct ParamDescription {
    pub name: &'static str,
    pub description: &'static str,
    pub kind: ParamKind,
    pub default: ParamValue,
}

/// Description of one declared input
pub struct InputDescription {
    pub name: &'static str,
    pub description: &'static str,
    pub kind: DataKind,
    pub required: bool,
}

/// Description of one declared output
pub struct OutputDescription {
    pub name: &'static str,
    pub description: &'static str,
    pub kind: DataKind,
}

/// Module metadata consumed by runners and user interfaces
pub struct ModuleDescription {
    pub name: &'static str,
    pub description: &'static str,
    pub params: Vec<ParamDescription>,
    pub inputs: Vec<InputDescription>,
    pub outputs: Vec<OutputDescription>,
}

/// Flat name -> value parameter mapping with defaulting getters
#[derive(Default)]
pub struct ParamValues(HashMap<String, ParamValue>);

impl ParamValues {
    pub fn new() -> Self {
        ParamValues(HashMap::new())
    }

    pub fn set(&mut self, name: &str, value: ParamValue) {
        self.0.insert(name.to_string(), value);
    }

    pub fn get_int(&self, name: &str, default: i32) -> i32 {
        match self.0.get(name) {
            Some(ParamValue::Int(v)) => *v,
            _ => default,
        }
    }

    pub fn get_float(&self, name: &str, default: f64) -> f64 {
        match self.0.get(name) {
            Some(ParamValue::Float(v)) => *v,
            _ => default,
        }
    }

    pub fn get_bool(&self, name: &str, default: bool) -> bool {
        match self.0.get(name) {
            Some(ParamValue::Bool(v)) => *v,
            _ => default,
        }
    }

    pub fn get_str(&self, name: &str, default: &str) -> String {
        match self.0.get(name) {
            Some(ParamValue::Str(v)) => v.clone(),
            _ => default.to_string(),
        }
    }
}

/// A processing module: self-describing, invokable algorithm wrapper
pub trait ProcessingModule {
    fn name(&self) -> &'static str;

    /// Module metadata: parameters, inputs, outputs
    fn create_description(&self) -> ModuleDescription;

    /// Attach an input data object by declared name
    fn set_input(&mut self, name: &str, obj: DataObject);

    /// Remove and return an output by declared name
    fn take_output(&mut self, name: &str) -> Option<DataObject>;

    /// Run the algorithm
    ///
    /// Returns true on success with outputs stored, false on any failure.
    /// Failures are reported as a printed diagnostic only; callers learn
    /// nothing beyond the boolean.
    fn direct_invoke_algorithm(&mut self, vals: &ParamValues) -> bool;
}
