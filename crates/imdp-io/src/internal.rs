//! Internal JSON model and specification documents.
//!
//! The model document is a tagged union: `{"kind": "imdp", ...}` with a
//! state pointer and sparse interval triplets, or `{"kind": "factored",
//! ...}` with per-marginal parent lists and column-major bounds. The
//! specification document is the serde form of
//! [`Specification`](imdp_core::Specification) over `f64`.

use std::fs;
use std::path::Path;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use imdp_core::{
    DenseIntervalMatrix, FactoredImdp, IntervalMatrix, IntervalMdp, Marginal,
    SparseIntervalMatrix, Specification,
};

/// One sparse interval transition: column `column` reaches `target`
/// with probability in `[lower, upper]`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TransitionEntry {
    pub column: usize,
    pub target: usize,
    pub lower: f64,
    pub upper: f64,
}

/// Single-variable model document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ImdpDocument {
    pub num_states: usize,
    pub stateptr: Vec<usize>,
    pub transitions: Vec<TransitionEntry>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub initial_states: Option<Vec<usize>>,
}

/// One marginal of a factored model document, bounds column-major.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MarginalDocument {
    pub num_rows: usize,
    pub num_cols: usize,
    pub action_parents: Vec<usize>,
    pub state_parents: Vec<usize>,
    #[serde(default)]
    pub has_sink: bool,
    pub lower: Vec<f64>,
    pub upper: Vec<f64>,
}

/// Factored model document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FactoredDocument {
    pub state_dims: Vec<usize>,
    pub action_dims: Vec<usize>,
    pub marginals: Vec<MarginalDocument>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub initial_states: Option<Vec<usize>>,
}

/// Any model document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ModelDocument {
    Imdp(ImdpDocument),
    Factored(FactoredDocument),
}

impl ImdpDocument {
    /// Validate and build the model.
    pub fn to_model(&self) -> Result<IntervalMdp<SparseIntervalMatrix<f64>>> {
        let num_cols = self.stateptr.last().copied().unwrap_or(0);
        let triplets: Vec<(usize, usize, f64, f64)> = self
            .transitions
            .iter()
            .map(|t| (t.target, t.column, t.lower, t.upper))
            .collect();
        let matrix = SparseIntervalMatrix::try_from_triplets(self.num_states, num_cols, &triplets)
            .context("building the transition matrix")?;
        let mut model = IntervalMdp::new(matrix, self.stateptr.clone())?;
        if let Some(initial) = &self.initial_states {
            model = model.with_initial_states(initial.clone())?;
        }
        Ok(model)
    }

    /// Snapshot a model into its document form.
    pub fn from_model(model: &IntervalMdp<SparseIntervalMatrix<f64>>) -> Self {
        let matrix = model.transition();
        let mut transitions = Vec::with_capacity(matrix.nnz());
        for column in 0..matrix.num_cols() {
            for (target, lower, upper) in matrix.col_entries(column) {
                transitions.push(TransitionEntry {
                    column,
                    target,
                    lower,
                    upper,
                });
            }
        }
        Self {
            num_states: model.num_states(),
            stateptr: model.stateptr().to_vec(),
            transitions,
            initial_states: model.initial_states().map(<[usize]>::to_vec),
        }
    }
}

impl FactoredDocument {
    /// Validate and build the factored model.
    pub fn to_model(&self) -> Result<FactoredImdp<f64>> {
        let mut marginals = Vec::with_capacity(self.marginals.len());
        for (i, doc) in self.marginals.iter().enumerate() {
            let matrix = if doc.has_sink {
                DenseIntervalMatrix::try_new_substochastic(
                    doc.num_rows,
                    doc.num_cols,
                    doc.lower.clone(),
                    doc.upper.clone(),
                )
            } else {
                DenseIntervalMatrix::try_new(
                    doc.num_rows,
                    doc.num_cols,
                    doc.lower.clone(),
                    doc.upper.clone(),
                )
            }
            .with_context(|| format!("building marginal {i}"))?;
            let marginal = if doc.has_sink {
                Marginal::try_new_with_sink(
                    matrix,
                    doc.action_parents.clone(),
                    doc.state_parents.clone(),
                )
            } else {
                Marginal::try_new(
                    matrix,
                    doc.action_parents.clone(),
                    doc.state_parents.clone(),
                )
            }?;
            marginals.push(marginal);
        }
        let mut model =
            FactoredImdp::new(self.state_dims.clone(), self.action_dims.clone(), marginals)?;
        if let Some(initial) = &self.initial_states {
            model = model.with_initial_states(initial.clone())?;
        }
        Ok(model)
    }

    /// Snapshot a factored model into its document form.
    pub fn from_model(model: &FactoredImdp<f64>) -> Self {
        let marginals = model
            .marginals()
            .iter()
            .map(|marginal| {
                let matrix = marginal.matrix();
                let mut lower = Vec::with_capacity(matrix.num_rows() * matrix.num_cols());
                let mut upper = Vec::with_capacity(matrix.num_rows() * matrix.num_cols());
                for col in 0..matrix.num_cols() {
                    let view = matrix.column(col);
                    for k in 0..view.nnz() {
                        lower.push(view.lower(k));
                        upper.push(view.upper(k));
                    }
                }
                MarginalDocument {
                    num_rows: matrix.num_rows(),
                    num_cols: matrix.num_cols(),
                    action_parents: marginal.action_parents().to_vec(),
                    state_parents: marginal.state_parents().to_vec(),
                    has_sink: marginal.has_sink(),
                    lower,
                    upper,
                }
            })
            .collect();
        Self {
            state_dims: model.state_dims().to_vec(),
            action_dims: model.action_dims().to_vec(),
            marginals,
            initial_states: model.initial_states().map(<[usize]>::to_vec),
        }
    }
}

/// Read a model document from a JSON file.
pub fn read_model(path: &Path) -> Result<ModelDocument> {
    let content = fs::read_to_string(path)
        .with_context(|| format!("reading model file: {}", path.display()))?;
    serde_json::from_str(&content)
        .with_context(|| format!("parsing model file: {}", path.display()))
}

/// Write a model document as pretty JSON.
pub fn write_model(path: &Path, model: &ModelDocument) -> Result<()> {
    let content = serde_json::to_string_pretty(model)?;
    fs::write(path, content)
        .with_context(|| format!("writing model file: {}", path.display()))
}

/// Read a specification document from a JSON file.
pub fn read_specification(path: &Path) -> Result<Specification<f64>> {
    let content = fs::read_to_string(path)
        .with_context(|| format!("reading specification file: {}", path.display()))?;
    serde_json::from_str(&content)
        .with_context(|| format!("parsing specification file: {}", path.display()))
}

/// Write a specification document as pretty JSON.
pub fn write_specification(path: &Path, spec: &Specification<f64>) -> Result<()> {
    let content = serde_json::to_string_pretty(spec)?;
    fs::write(path, content)
        .with_context(|| format!("writing specification file: {}", path.display()))
}
