//! Opaque model state and shape compatibility checks
//!
//! Model state is a parameter-name → tensor mapping produced and
//! consumed by the surrounding model-definition collaborator. This crate
//! never interprets the values; it only serializes them and checks
//! shapes against a target model's expectations.

use ndarray::{ArrayD, IxDyn};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::error::{Error, Result};

/// Ordered parameter-name → tensor mapping.
///
/// Insertion order is preserved (and round-trips through storage);
/// lookups are by exact parameter name.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct ModelState {
    parameters: Vec<(String, ArrayD<f32>)>,
}

impl ModelState {
    /// Empty state.
    pub fn new() -> Self {
        Self::default()
    }

    /// Build from an ordered parameter list.
    pub fn from_parameters(parameters: Vec<(String, ArrayD<f32>)>) -> Self {
        Self { parameters }
    }

    /// Insert a parameter, replacing any existing tensor of the same name
    /// in place.
    pub fn insert(&mut self, name: impl Into<String>, tensor: ArrayD<f32>) {
        let name = name.into();
        match self.parameters.iter_mut().find(|(n, _)| *n == name) {
            Some((_, existing)) => *existing = tensor,
            None => self.parameters.push((name, tensor)),
        }
    }

    /// Tensor by exact parameter name.
    pub fn get(&self, name: &str) -> Option<&ArrayD<f32>> {
        self.parameters.iter().find(|(n, _)| n == name).map(|(_, t)| t)
    }

    /// Iterate `(name, tensor)` pairs in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &ArrayD<f32>)> {
        self.parameters.iter().map(|(n, t)| (n.as_str(), t))
    }

    /// Consume into the ordered parameter list.
    pub fn into_parameters(self) -> Vec<(String, ArrayD<f32>)> {
        self.parameters
    }

    /// Number of parameters.
    pub fn len(&self) -> usize {
        self.parameters.len()
    }

    /// Whether the state holds no parameters.
    pub fn is_empty(&self) -> bool {
        self.parameters.is_empty()
    }

    /// Best-effort compatibility filter: keep only entries whose shape
    /// exactly matches `spec`'s expectation for the same name.
    /// Mismatched, extra, and missing entries are dropped silently —
    /// this never fails on shape differences.
    pub fn retain_matching(&self, spec: &ShapeSpec) -> ModelState {
        ModelState {
            parameters: self
                .parameters
                .iter()
                .filter(|(name, tensor)| spec.expected(name) == Some(tensor.shape()))
                .cloned()
                .collect(),
        }
    }

    /// Strict compatibility check: every spec entry must be present with
    /// an exactly matching shape and the state must carry nothing the
    /// spec does not declare.
    pub fn check_strict(&self, spec: &ShapeSpec) -> Result<()> {
        for (name, expected) in spec.iter() {
            match self.get(name) {
                None => {
                    return Err(Error::ShapeMismatch {
                        name: name.to_string(),
                        expected: expected.to_vec(),
                        found: Vec::new(),
                    })
                }
                Some(tensor) if tensor.shape() != expected => {
                    return Err(Error::ShapeMismatch {
                        name: name.to_string(),
                        expected: expected.to_vec(),
                        found: tensor.shape().to_vec(),
                    })
                }
                Some(_) => {}
            }
        }
        for (name, tensor) in self.iter() {
            if spec.expected(name).is_none() {
                return Err(Error::ShapeMismatch {
                    name: name.to_string(),
                    expected: Vec::new(),
                    found: tensor.shape().to_vec(),
                });
            }
        }
        Ok(())
    }

    pub(crate) fn to_file(&self) -> StateFile {
        let mut data = Vec::new();
        let parameters = self
            .parameters
            .iter()
            .map(|(name, tensor)| {
                data.extend(tensor.iter().copied());
                ParameterInfo {
                    name: name.clone(),
                    shape: tensor.shape().to_vec(),
                    dtype: "f32".to_string(),
                }
            })
            .collect();
        StateFile { parameters, data }
    }

    pub(crate) fn from_file(file: StateFile) -> Result<Self> {
        let mut offset = 0;
        let mut parameters = Vec::with_capacity(file.parameters.len());
        for info in file.parameters {
            let size: usize = info.shape.iter().product();
            let end = offset + size;
            if end > file.data.len() {
                return Err(Error::Serialization(format!(
                    "state data truncated at parameter '{}'",
                    info.name
                )));
            }
            let tensor = ArrayD::from_shape_vec(IxDyn(&info.shape), file.data[offset..end].to_vec())
                .map_err(|e| {
                    Error::Serialization(format!("bad shape for parameter '{}': {e}", info.name))
                })?;
            offset = end;
            parameters.push((info.name, tensor));
        }
        if offset != file.data.len() {
            return Err(Error::Serialization(format!(
                "state data has {} trailing values",
                file.data.len() - offset
            )));
        }
        Ok(Self { parameters })
    }
}

/// Per-parameter layout in the serialized state.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub(crate) struct ParameterInfo {
    pub name: String,
    pub shape: Vec<usize>,
    pub dtype: String,
}

/// On-disk form of [`ModelState`]: parameter layout plus flattened data.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub(crate) struct StateFile {
    pub parameters: Vec<ParameterInfo>,
    pub data: Vec<f32>,
}

/// Expected parameter shapes of a target model, keyed by parameter name.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ShapeSpec {
    entries: BTreeMap<String, Vec<usize>>,
}

impl ShapeSpec {
    /// Empty spec.
    pub fn new() -> Self {
        Self::default()
    }

    /// Derive the shape spec a state itself satisfies.
    pub fn of_state(state: &ModelState) -> Self {
        let mut spec = Self::new();
        for (name, tensor) in state.iter() {
            spec.insert(name, tensor.shape().to_vec());
        }
        spec
    }

    /// Add an expected parameter shape.
    pub fn insert(&mut self, name: impl Into<String>, shape: Vec<usize>) {
        self.entries.insert(name.into(), shape);
    }

    /// Builder form of [`insert`](ShapeSpec::insert).
    #[must_use]
    pub fn with(mut self, name: impl Into<String>, shape: Vec<usize>) -> Self {
        self.insert(name, shape);
        self
    }

    /// Expected shape for a parameter name.
    pub fn expected(&self, name: &str) -> Option<&[usize]> {
        self.entries.get(name).map(Vec::as_slice)
    }

    /// Iterate `(name, shape)` entries in name order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &[usize])> {
        self.entries.iter().map(|(n, s)| (n.as_str(), s.as_slice()))
    }

    /// Merge another spec's entries into this one.
    pub fn extend(&mut self, other: &ShapeSpec) {
        for (name, shape) in other.iter() {
            self.insert(name, shape.to_vec());
        }
    }

    /// Number of declared parameters.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether no parameters are declared.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
