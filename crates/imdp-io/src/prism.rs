//! PRISM-style four-file flavor.
//!
//! A model is spread over `<prefix>.sta` (states), `<prefix>.tra`
//! (interval transitions), `<prefix>.lab` (labels), and `<prefix>.pctl`
//! (one property string):
//!
//! ```text
//! model.sta        model.tra                  model.lab
//! (s)              3 4 7                      0="init" 1="reach"
//! 0:(0)            0 0 1 [0.3,0.8] a0         0: 0
//! 1:(1)            0 0 2 [0.2,0.7] a0         2: 1
//! 2:(2)            0 1 2 [1.0,1.0] a1
//!                  ...
//! ```
//!
//! The property string uses PRISM's robust-MDP operator prefixes:
//! `Pmaxmin=?` optimizes the strategy upward against the worst-case
//! adversary, `Pminmax=?` the reverse, and so on; plain `Pmax=?` and
//! `Pmin=?` abbreviate `Pmaxmax=?` and `Pminmin=?`. Bodies cover
//! `F "reach"`, `F<=k "reach"`, `F=k "reach"`, `G !"avoid"`,
//! `G "safe"`, `!"avoid" U "reach"`, and their step-bounded forms.
//! Reward and exit-time properties are JSON-only. Unbounded forms get
//! the default residual threshold `1e-6`.

use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{anyhow, bail, Context, Result};
use thiserror::Error;

use imdp_core::{
    IntervalMdp, Property, SatisfactionMode, SparseIntervalMatrix, Specification, StrategyMode,
};

/// Residual threshold assumed for unbounded property strings.
pub const DEFAULT_EPSILON: f64 = 1e-6;

/// Errors specific to the property-string subset.
#[derive(Debug, Error)]
pub enum PctlError {
    #[error("unsupported property string: {0}")]
    Unsupported(String),
    #[error("unknown label \"{0}\"")]
    UnknownLabel(String),
    #[error("malformed probability operator: {0}")]
    BadOperator(String),
}

/// A parsed PRISM model bundle.
#[derive(Debug, Clone)]
pub struct PrismModel {
    pub model: IntervalMdp<SparseIntervalMatrix<f64>>,
    pub specification: Specification<f64>,
}

fn file(prefix: &Path, ext: &str) -> PathBuf {
    let mut path = prefix.as_os_str().to_os_string();
    path.push(".");
    path.push(ext);
    PathBuf::from(path)
}

/// Write the four files for `model` and `spec` under `prefix`.
pub fn write_prism(
    prefix: &Path,
    model: &IntervalMdp<SparseIntervalMatrix<f64>>,
    spec: &Specification<f64>,
) -> Result<()> {
    let num_states = model.num_states();

    let mut sta = String::from("(s)\n");
    for s in 0..num_states {
        sta.push_str(&format!("{s}:({s})\n"));
    }
    fs::write(file(prefix, "sta"), sta)
        .with_context(|| format!("writing {}.sta", prefix.display()))?;

    let matrix = model.transition();
    let mut tra = format!(
        "{} {} {}\n",
        num_states,
        model.num_choices(),
        matrix.nnz()
    );
    for src in 0..num_states {
        for act in 0..model.num_actions(src) {
            let col = model.column_of(src, act);
            for (dest, lo, up) in matrix.col_entries(col) {
                tra.push_str(&format!("{src} {act} {dest} [{lo},{up}] a{act}\n"));
            }
        }
    }
    fs::write(file(prefix, "tra"), tra)
        .with_context(|| format!("writing {}.tra", prefix.display()))?;

    let (pctl, label_sets) = render_property(spec)?;
    fs::write(file(prefix, "pctl"), format!("{pctl}\n"))
        .with_context(|| format!("writing {}.pctl", prefix.display()))?;

    let mut names: Vec<&str> = vec!["init"];
    names.extend(label_sets.iter().map(|(name, _)| *name));
    let mut lab = names
        .iter()
        .enumerate()
        .map(|(id, name)| format!("{id}=\"{name}\""))
        .collect::<Vec<_>>()
        .join(" ");
    lab.push('\n');

    let mut per_state: Vec<Vec<usize>> = vec![Vec::new(); num_states];
    for &s in model.initial_states().unwrap_or(&[]) {
        per_state[s].push(0);
    }
    for (id, (_, set)) in label_sets.iter().enumerate() {
        for &s in set {
            per_state[s].push(id + 1);
        }
    }
    for (s, ids) in per_state.iter().enumerate() {
        if !ids.is_empty() {
            let ids = ids
                .iter()
                .map(usize::to_string)
                .collect::<Vec<_>>()
                .join(" ");
            lab.push_str(&format!("{s}: {ids}\n"));
        }
    }
    fs::write(file(prefix, "lab"), lab)
        .with_context(|| format!("writing {}.lab", prefix.display()))?;

    Ok(())
}

/// Render the property string and the label sets it references.
fn render_property(spec: &Specification<f64>) -> Result<(String, Vec<(&'static str, Vec<usize>)>)> {
    let prefix = match (spec.strategy_mode, spec.satisfaction_mode) {
        (StrategyMode::Maximize, SatisfactionMode::Optimistic) => "Pmaxmax",
        (StrategyMode::Maximize, SatisfactionMode::Pessimistic) => "Pmaxmin",
        (StrategyMode::Minimize, SatisfactionMode::Pessimistic) => "Pminmin",
        (StrategyMode::Minimize, SatisfactionMode::Optimistic) => "Pminmax",
    };
    let (body, sets) = match &spec.property {
        Property::FiniteTimeReachability { reach, horizon } => (
            format!("F<={horizon} \"reach\""),
            vec![("reach", reach.clone())],
        ),
        Property::InfiniteTimeReachability { reach, .. } => {
            ("F \"reach\"".to_string(), vec![("reach", reach.clone())])
        }
        Property::ExactTimeReachability { reach, horizon } => (
            format!("F={horizon} \"reach\""),
            vec![("reach", reach.clone())],
        ),
        Property::FiniteTimeReachAvoid {
            reach,
            avoid,
            horizon,
        } => (
            format!("!\"avoid\" U<={horizon} \"reach\""),
            vec![("reach", reach.clone()), ("avoid", avoid.clone())],
        ),
        Property::InfiniteTimeReachAvoid { reach, avoid, .. } => (
            "!\"avoid\" U \"reach\"".to_string(),
            vec![("reach", reach.clone()), ("avoid", avoid.clone())],
        ),
        Property::FiniteTimeSafety { avoid, horizon } => (
            format!("G<={horizon} !\"avoid\""),
            vec![("avoid", avoid.clone())],
        ),
        Property::InfiniteTimeSafety { avoid, .. } => {
            ("G !\"avoid\"".to_string(), vec![("avoid", avoid.clone())])
        }
        Property::FiniteTimeReward { .. }
        | Property::InfiniteTimeReward { .. }
        | Property::ExpectedExitTime { .. } => {
            bail!("reward and exit-time properties have no PRISM property string; use the JSON specification format")
        }
    };
    Ok((format!("{prefix}=? [ {body} ]"), sets))
}

/// Read the four files under `prefix`.
pub fn read_prism(prefix: &Path) -> Result<PrismModel> {
    let sta_path = file(prefix, "sta");
    let sta = fs::read_to_string(&sta_path)
        .with_context(|| format!("reading {}", sta_path.display()))?;
    let num_states = parse_states(&sta)?;

    let tra_path = file(prefix, "tra");
    let tra = fs::read_to_string(&tra_path)
        .with_context(|| format!("reading {}", tra_path.display()))?;
    let model = parse_transitions(&tra, num_states)
        .with_context(|| format!("parsing {}", tra_path.display()))?;

    let lab_path = file(prefix, "lab");
    let lab = fs::read_to_string(&lab_path)
        .with_context(|| format!("reading {}", lab_path.display()))?;
    let labels = parse_labels(&lab, num_states)
        .with_context(|| format!("parsing {}", lab_path.display()))?;

    let pctl_path = file(prefix, "pctl");
    let pctl = fs::read_to_string(&pctl_path)
        .with_context(|| format!("reading {}", pctl_path.display()))?;
    let specification = parse_property(pctl.trim(), &labels, num_states)
        .with_context(|| format!("parsing {}", pctl_path.display()))?;

    let model = match labels.get("init") {
        Some(initial) if !initial.is_empty() => model.with_initial_states(initial.clone())?,
        _ => model,
    };

    Ok(PrismModel {
        model,
        specification,
    })
}

fn parse_states(content: &str) -> Result<usize> {
    let mut max_id = None;
    for line in content.lines().map(str::trim) {
        if line.is_empty() || !line.contains(':') {
            continue;
        }
        let (id, _) = line.split_once(':').unwrap_or((line, ""));
        let id: usize = id.trim().parse().context("state id")?;
        max_id = Some(max_id.map_or(id, |m: usize| m.max(id)));
    }
    max_id
        .map(|m| m + 1)
        .ok_or_else(|| anyhow!("state file lists no states"))
}

fn parse_transitions(
    content: &str,
    num_states: usize,
) -> Result<IntervalMdp<SparseIntervalMatrix<f64>>> {
    let mut lines = content
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty());
    let header = lines.next().ok_or_else(|| anyhow!("missing header"))?;
    let header_fields: Vec<&str> = header.split_whitespace().collect();
    if header_fields.len() != 3 {
        bail!("expected 'states choices transitions' header, got: {header}");
    }
    let declared_states: usize = header_fields[0].parse().context("state count")?;
    if declared_states != num_states {
        bail!("header declares {declared_states} states but the state file has {num_states}");
    }

    let mut rows = Vec::new();
    let mut actions_per_state = vec![0usize; num_states];
    for line in lines {
        let fields: Vec<&str> = line.split_whitespace().collect();
        if fields.len() < 4 {
            bail!("expected 'src choice dest interval', got: {line}");
        }
        let src: usize = fields[0].parse().context("source state")?;
        let act: usize = fields[1].parse().context("choice index")?;
        let dest: usize = fields[2].parse().context("destination state")?;
        let (lo, up) = parse_interval(fields[3])?;
        if src >= num_states || dest >= num_states {
            bail!("transition {src} -> {dest} outside the {num_states}-state space");
        }
        actions_per_state[src] = actions_per_state[src].max(act + 1);
        rows.push((src, act, dest, lo, up));
    }

    let mut stateptr = Vec::with_capacity(num_states + 1);
    stateptr.push(0usize);
    for (s, &count) in actions_per_state.iter().enumerate() {
        if count == 0 {
            bail!("state {s} has no transitions");
        }
        stateptr.push(stateptr.last().unwrap() + count);
    }
    let num_cols = *stateptr.last().unwrap();

    let triplets: Vec<(usize, usize, f64, f64)> = rows
        .iter()
        .map(|&(src, act, dest, lo, up)| (dest, stateptr[src] + act, lo, up))
        .collect();
    let matrix = SparseIntervalMatrix::try_from_triplets(num_states, num_cols, &triplets)?;
    Ok(IntervalMdp::new(matrix, stateptr)?)
}

/// Accepts `[lo,up]` or a single point probability.
fn parse_interval(field: &str) -> Result<(f64, f64)> {
    if let Some(inner) = field.strip_prefix('[').and_then(|f| f.strip_suffix(']')) {
        let (lo, up) = inner
            .split_once(',')
            .ok_or_else(|| anyhow!("malformed interval: {field}"))?;
        Ok((
            lo.trim().parse().context("lower probability")?,
            up.trim().parse().context("upper probability")?,
        ))
    } else {
        let p: f64 = field.parse().context("probability")?;
        Ok((p, p))
    }
}

fn parse_labels(content: &str, num_states: usize) -> Result<HashMap<String, Vec<usize>>> {
    let mut lines = content.lines().map(str::trim).filter(|l| !l.is_empty());
    let header = lines.next().ok_or_else(|| anyhow!("missing label table"))?;

    let mut names: HashMap<usize, String> = HashMap::new();
    for token in header.split_whitespace() {
        let (id, name) = token
            .split_once('=')
            .ok_or_else(|| anyhow!("malformed label declaration: {token}"))?;
        let id: usize = id.parse().context("label id")?;
        names.insert(id, name.trim_matches('"').to_string());
    }

    let mut labels: HashMap<String, Vec<usize>> = HashMap::new();
    for name in names.values() {
        labels.entry(name.clone()).or_default();
    }
    for line in lines {
        let (state, ids) = line
            .split_once(':')
            .ok_or_else(|| anyhow!("malformed label line: {line}"))?;
        let state: usize = state.trim().parse().context("state id")?;
        if state >= num_states {
            bail!("label line references state {state} outside the {num_states}-state space");
        }
        for id in ids.split_whitespace() {
            let id: usize = id.parse().context("label id")?;
            let name = names
                .get(&id)
                .ok_or_else(|| anyhow!("label id {id} not declared"))?;
            labels.entry(name.clone()).or_default().push(state);
        }
    }
    Ok(labels)
}

/// Parse a property string like `Pmaxmin=? [ F<=10 "reach" ]`.
pub fn parse_property(
    line: &str,
    labels: &HashMap<String, Vec<usize>>,
    num_states: usize,
) -> Result<Specification<f64>> {
    let line = line.trim();
    let rest = line
        .strip_prefix('P')
        .ok_or_else(|| PctlError::BadOperator(line.to_string()))?;
    let (modes, rest) = rest
        .split_once("=?")
        .ok_or_else(|| PctlError::BadOperator(line.to_string()))?;
    let (strategy_mode, satisfaction_mode) = match modes {
        "max" | "maxmax" => (StrategyMode::Maximize, SatisfactionMode::Optimistic),
        "maxmin" => (StrategyMode::Maximize, SatisfactionMode::Pessimistic),
        "min" | "minmin" => (StrategyMode::Minimize, SatisfactionMode::Pessimistic),
        "minmax" => (StrategyMode::Minimize, SatisfactionMode::Optimistic),
        other => return Err(PctlError::BadOperator(other.to_string()).into()),
    };

    let body = rest
        .trim()
        .strip_prefix('[')
        .and_then(|b| b.strip_suffix(']'))
        .ok_or_else(|| PctlError::Unsupported(line.to_string()))?
        .trim();

    let property = parse_body(body, labels, num_states)?;
    Ok(Specification::new(property, satisfaction_mode, strategy_mode))
}

fn resolve(label: &str, labels: &HashMap<String, Vec<usize>>) -> Result<Vec<usize>> {
    labels
        .get(label)
        .cloned()
        .ok_or_else(|| PctlError::UnknownLabel(label.to_string()).into())
}

fn complement(set: &[usize], num_states: usize) -> Vec<usize> {
    let mut member = vec![false; num_states];
    for &s in set {
        member[s] = true;
    }
    (0..num_states).filter(|&s| !member[s]).collect()
}

/// Leading `<=k` or `=k` step bound.
fn parse_bound(s: &str) -> Result<(Option<usize>, bool, &str)> {
    if let Some(rest) = s.strip_prefix("<=") {
        let digits: String = rest.chars().take_while(char::is_ascii_digit).collect();
        let k = digits.parse().context("step bound")?;
        Ok((Some(k), false, rest[digits.len()..].trim_start()))
    } else if let Some(rest) = s.strip_prefix('=') {
        let digits: String = rest.chars().take_while(char::is_ascii_digit).collect();
        let k = digits.parse().context("step bound")?;
        Ok((Some(k), true, rest[digits.len()..].trim_start()))
    } else {
        Ok((None, false, s))
    }
}

fn parse_quoted(s: &str) -> Result<&str> {
    let s = s.trim();
    s.strip_prefix('"')
        .and_then(|rest| rest.strip_suffix('"'))
        .ok_or_else(|| PctlError::Unsupported(s.to_string()).into())
}

fn parse_body(
    body: &str,
    labels: &HashMap<String, Vec<usize>>,
    num_states: usize,
) -> Result<Property<f64>> {
    if let Some((left, right)) = body.split_once(" U") {
        // Reach-avoid: !"avoid" U "reach" (or true U "reach").
        let left = left.trim();
        let avoid = if left == "true" {
            Vec::new()
        } else if let Some(negated) = left.strip_prefix('!') {
            resolve(parse_quoted(negated)?, labels)?
        } else {
            return Err(PctlError::Unsupported(body.to_string()).into());
        };
        let (bound, exact, rest) = parse_bound(right.trim_start())?;
        if exact {
            return Err(PctlError::Unsupported(body.to_string()).into());
        }
        let reach = resolve(parse_quoted(rest)?, labels)?;
        return Ok(match bound {
            Some(horizon) => Property::FiniteTimeReachAvoid {
                reach,
                avoid,
                horizon,
            },
            None => Property::InfiniteTimeReachAvoid {
                reach,
                avoid,
                epsilon: DEFAULT_EPSILON,
            },
        });
    }

    if let Some(rest) = body.strip_prefix('F') {
        let (bound, exact, rest) = parse_bound(rest.trim_start())?;
        let reach = resolve(parse_quoted(rest)?, labels)?;
        return Ok(match (bound, exact) {
            (Some(horizon), true) => Property::ExactTimeReachability { reach, horizon },
            (Some(horizon), false) => Property::FiniteTimeReachability { reach, horizon },
            (None, _) => Property::InfiniteTimeReachability {
                reach,
                epsilon: DEFAULT_EPSILON,
            },
        });
    }

    if let Some(rest) = body.strip_prefix('G') {
        let (bound, exact, rest) = parse_bound(rest.trim_start())?;
        if exact {
            return Err(PctlError::Unsupported(body.to_string()).into());
        }
        let avoid = if let Some(negated) = rest.strip_prefix('!') {
            resolve(parse_quoted(negated)?, labels)?
        } else {
            // G "safe": avoid everything not labeled safe.
            complement(&resolve(parse_quoted(rest)?, labels)?, num_states)
        };
        return Ok(match bound {
            Some(horizon) => Property::FiniteTimeSafety { avoid, horizon },
            None => Property::InfiniteTimeSafety {
                avoid,
                epsilon: DEFAULT_EPSILON,
            },
        });
    }

    Err(PctlError::Unsupported(body.to_string()).into())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn chain_model() -> IntervalMdp<SparseIntervalMatrix<f64>> {
        let triplets = vec![
            (0, 0, 0.0, 0.5),
            (1, 0, 0.1, 0.6),
            (2, 0, 0.2, 0.7),
            (0, 1, 0.5, 0.7),
            (1, 1, 0.3, 0.5),
            (2, 1, 0.1, 0.3),
            (2, 2, 1.0, 1.0),
        ];
        let matrix = SparseIntervalMatrix::try_from_triplets(3, 3, &triplets).unwrap();
        IntervalMdp::chain(matrix).unwrap()
    }

    fn reach_labels() -> HashMap<String, Vec<usize>> {
        let mut labels = HashMap::new();
        labels.insert("reach".to_string(), vec![2]);
        labels.insert("avoid".to_string(), vec![1]);
        labels.insert("safe".to_string(), vec![0, 2]);
        labels
    }

    #[test]
    fn test_parse_property_prefixes() {
        let labels = reach_labels();
        let spec = parse_property("Pmaxmin=? [ F \"reach\" ]", &labels, 3).unwrap();
        assert_eq!(spec.strategy_mode, StrategyMode::Maximize);
        assert_eq!(spec.satisfaction_mode, SatisfactionMode::Pessimistic);

        let spec = parse_property("Pmin=? [ F<=7 \"reach\" ]", &labels, 3).unwrap();
        assert_eq!(spec.satisfaction_mode, SatisfactionMode::Pessimistic);
        assert_eq!(
            spec.property,
            Property::FiniteTimeReachability {
                reach: vec![2],
                horizon: 7
            }
        );

        assert!(parse_property("Pboth=? [ F \"reach\" ]", &labels, 3).is_err());
    }

    #[test]
    fn test_parse_property_bodies() {
        let labels = reach_labels();

        let spec = parse_property("Pmax=? [ F=4 \"reach\" ]", &labels, 3).unwrap();
        assert_eq!(
            spec.property,
            Property::ExactTimeReachability {
                reach: vec![2],
                horizon: 4
            }
        );

        let spec = parse_property("Pmax=? [ !\"avoid\" U<=9 \"reach\" ]", &labels, 3).unwrap();
        assert_eq!(
            spec.property,
            Property::FiniteTimeReachAvoid {
                reach: vec![2],
                avoid: vec![1],
                horizon: 9
            }
        );

        let spec = parse_property("Pmin=? [ G !\"avoid\" ]", &labels, 3).unwrap();
        assert_eq!(
            spec.property,
            Property::InfiniteTimeSafety {
                avoid: vec![1],
                epsilon: DEFAULT_EPSILON
            }
        );

        // G over a safe label complements it into an avoid set.
        let spec = parse_property("Pmin=? [ G<=3 \"safe\" ]", &labels, 3).unwrap();
        assert_eq!(
            spec.property,
            Property::FiniteTimeSafety {
                avoid: vec![1],
                horizon: 3
            }
        );

        let err = parse_property("Pmax=? [ X \"reach\" ]", &labels, 3).unwrap_err();
        assert!(err.to_string().contains("unsupported"));
    }

    #[test]
    fn test_interval_field_forms() {
        assert_eq!(parse_interval("[0.25,0.75]").unwrap(), (0.25, 0.75));
        assert_eq!(parse_interval("0.5").unwrap(), (0.5, 0.5));
        assert!(parse_interval("[0.25;0.75]").is_err());
    }

    #[test]
    fn test_write_read_roundtrip() {
        let dir = tempfile::tempdir().unwrap();
        let prefix = dir.path().join("chain");
        let model = chain_model().with_initial_states(vec![0]).unwrap();
        let spec = Specification::new(
            Property::FiniteTimeReachability {
                reach: vec![2],
                horizon: 10,
            },
            SatisfactionMode::Pessimistic,
            StrategyMode::Maximize,
        );

        write_prism(&prefix, &model, &spec).unwrap();
        let parsed = read_prism(&prefix).unwrap();

        assert_eq!(parsed.specification, spec);
        assert_eq!(parsed.model.num_states(), 3);
        assert_eq!(parsed.model.stateptr(), model.stateptr());
        assert_eq!(parsed.model.initial_states(), Some(&[0][..]));
        for col in 0..model.num_choices() {
            let a: Vec<_> = model.transition().col_entries(col).collect();
            let b: Vec<_> = parsed.model.transition().col_entries(col).collect();
            assert_eq!(a, b);
        }
    }

    #[test]
    fn test_reward_property_has_no_prism_form() {
        let dir = tempfile::tempdir().unwrap();
        let prefix = dir.path().join("reward");
        let spec = Specification::new(
            Property::FiniteTimeReward {
                reward: vec![0.0; 3],
                discount: 0.9,
                horizon: 5,
            },
            SatisfactionMode::Pessimistic,
            StrategyMode::Maximize,
        );
        assert!(write_prism(&prefix, &chain_model(), &spec).is_err());
    }
}
