//! JSON solution report.

use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use imdp_core::Strategy;

/// Solver output in its file form.
///
/// `additional` is a free-form map for algorithm-specific fields
/// (timings, backend identifiers) that do not warrant schema changes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SolutionReport {
    pub value_function: Vec<f64>,
    pub num_iterations: usize,
    pub residual: f64,
    pub converged: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub strategy: Option<Strategy>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub additional: BTreeMap<String, serde_json::Value>,
}

impl SolutionReport {
    /// Assemble a report from solver output.
    pub fn new(
        value_function: Vec<f64>,
        num_iterations: usize,
        residual: f64,
        converged: bool,
        strategy: Option<Strategy>,
    ) -> Self {
        Self {
            value_function,
            num_iterations,
            residual,
            converged,
            strategy,
            additional: BTreeMap::new(),
        }
    }

    /// Attach an algorithm-specific field.
    pub fn with_field(mut self, key: &str, value: serde_json::Value) -> Self {
        self.additional.insert(key.to_string(), value);
        self
    }

    /// Write the report as pretty JSON.
    pub fn write(&self, path: &Path) -> Result<()> {
        let content = serde_json::to_string_pretty(self)?;
        fs::write(path, content)
            .with_context(|| format!("writing solution file: {}", path.display()))
    }

    /// Read a report back.
    pub fn read(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)
            .with_context(|| format!("reading solution file: {}", path.display()))?;
        serde_json::from_str(&content)
            .with_context(|| format!("parsing solution file: {}", path.display()))
    }
}
