//! bmdp-tool single-file format.
//!
//! Layout:
//!
//! ```text
//! <num_states>
//! <num_actions>
//! <num_terminal>
//! <terminal id>          (one line per terminal state)
//! <src> <act> <dest> <p_lo> <p_up>
//! ...
//! ```
//!
//! Action indices are zero-based and must be contiguous per source
//! state; states may use fewer actions than the declared total.

use std::fs;
use std::path::Path;

use anyhow::{anyhow, bail, Context, Result};

use imdp_core::{IntervalMdp, SparseIntervalMatrix};

/// A parsed bmdp-tool file: the model plus its terminal set.
#[derive(Debug, Clone)]
pub struct BmdpModel {
    pub model: IntervalMdp<SparseIntervalMatrix<f64>>,
    pub terminal_states: Vec<usize>,
}

/// Read a bmdp-tool file.
pub fn read_bmdp(path: &Path) -> Result<BmdpModel> {
    let content = fs::read_to_string(path)
        .with_context(|| format!("reading bmdp file: {}", path.display()))?;
    parse_bmdp(&content).with_context(|| format!("parsing bmdp file: {}", path.display()))
}

fn parse_bmdp(content: &str) -> Result<BmdpModel> {
    let mut lines = content
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty() && !line.starts_with('#'));

    let num_states: usize = lines
        .next()
        .ok_or_else(|| anyhow!("missing state count"))?
        .parse()
        .context("state count")?;
    let num_actions: usize = lines
        .next()
        .ok_or_else(|| anyhow!("missing action count"))?
        .parse()
        .context("action count")?;
    let num_terminal: usize = lines
        .next()
        .ok_or_else(|| anyhow!("missing terminal count"))?
        .parse()
        .context("terminal count")?;

    let mut terminal_states = Vec::with_capacity(num_terminal);
    for _ in 0..num_terminal {
        let id: usize = lines
            .next()
            .ok_or_else(|| anyhow!("missing terminal state id"))?
            .parse()
            .context("terminal state id")?;
        if id >= num_states {
            bail!("terminal state {id} outside the {num_states}-state space");
        }
        terminal_states.push(id);
    }

    // (src, act, dest, lo, up) rows; actions per state are discovered
    // from the rows themselves.
    let mut rows = Vec::new();
    let mut actions_per_state = vec![0usize; num_states];
    for line in lines {
        let fields: Vec<&str> = line.split_whitespace().collect();
        if fields.len() != 5 {
            bail!("expected 'src act dest p_lo p_up', got: {line}");
        }
        let src: usize = fields[0].parse().context("source state")?;
        let act: usize = fields[1].parse().context("action index")?;
        let dest: usize = fields[2].parse().context("destination state")?;
        let lo: f64 = fields[3].parse().context("lower probability")?;
        let up: f64 = fields[4].parse().context("upper probability")?;
        if src >= num_states || dest >= num_states {
            bail!("transition {src} -> {dest} outside the {num_states}-state space");
        }
        if act >= num_actions {
            bail!("action {act} exceeds the declared {num_actions} actions");
        }
        actions_per_state[src] = actions_per_state[src].max(act + 1);
        rows.push((src, act, dest, lo, up));
    }

    let mut stateptr = Vec::with_capacity(num_states + 1);
    stateptr.push(0);
    for &count in &actions_per_state {
        if count == 0 {
            bail!(
                "state {} has no transitions",
                stateptr.len() - 1
            );
        }
        stateptr.push(stateptr.last().unwrap() + count);
    }
    let num_cols = *stateptr.last().unwrap();

    let triplets: Vec<(usize, usize, f64, f64)> = rows
        .iter()
        .map(|&(src, act, dest, lo, up)| (dest, stateptr[src] + act, lo, up))
        .collect();
    let matrix = SparseIntervalMatrix::try_from_triplets(num_states, num_cols, &triplets)?;
    let model = IntervalMdp::new(matrix, stateptr)?;

    Ok(BmdpModel {
        model,
        terminal_states,
    })
}

/// Write a model (with its terminal set) in bmdp-tool layout.
pub fn write_bmdp(
    path: &Path,
    model: &IntervalMdp<SparseIntervalMatrix<f64>>,
    terminal_states: &[usize],
) -> Result<()> {
    let mut out = String::new();
    out.push_str(&format!("{}\n", model.num_states()));
    out.push_str(&format!("{}\n", model.max_actions()));
    out.push_str(&format!("{}\n", terminal_states.len()));
    for &t in terminal_states {
        out.push_str(&format!("{t}\n"));
    }
    let matrix = model.transition();
    for src in 0..model.num_states() {
        for act in 0..model.num_actions(src) {
            let col = model.column_of(src, act);
            for (dest, lo, up) in matrix.col_entries(col) {
                out.push_str(&format!("{src} {act} {dest} {lo} {up}\n"));
            }
        }
    }
    fs::write(path, out).with_context(|| format!("writing bmdp file: {}", path.display()))
}
