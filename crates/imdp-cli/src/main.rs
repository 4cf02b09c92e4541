use std::path::Path;

use anyhow::{anyhow, bail, Context, Result};
use clap::Parser;
use rayon::ThreadPoolBuilder;
use tracing::{error, info};
use tracing_subscriber::FmtSubscriber;

use imdp_algo::{Problem, RobustBellman, RobustValueIteration, Solution};
use imdp_cli::cli::{Cli, Commands, ModelFormat};
use imdp_core::{FactoredImdp, IntervalMdp, Property, SparseIntervalMatrix, Specification};
use imdp_io::{
    read_bmdp, read_model, read_prism, read_specification, write_bmdp, write_model, write_prism,
    ImdpDocument, ModelDocument, SolutionReport,
};

fn configure_threads(spec: &str) {
    let count = if spec.eq_ignore_ascii_case("auto") {
        num_cpus::get()
    } else {
        spec.parse().unwrap_or_else(|_| num_cpus::get())
    };
    let _ = ThreadPoolBuilder::new().num_threads(count).build_global();
}

/// Either model family, loaded at f64.
enum LoadedModel {
    Single(IntervalMdp<SparseIntervalMatrix<f64>>),
    Factored(FactoredImdp<f64>),
}

impl LoadedModel {
    fn initial_states(&self) -> Option<Vec<usize>> {
        match self {
            LoadedModel::Single(m) => m.initial_states().map(<[usize]>::to_vec),
            LoadedModel::Factored(m) => m.initial_states().map(<[usize]>::to_vec),
        }
    }
}

fn load_model(
    path: &Path,
    format: ModelFormat,
    spec_path: Option<&Path>,
) -> Result<(LoadedModel, Specification<f64>)> {
    match format {
        ModelFormat::Prism => {
            let prism = read_prism(path)?;
            let spec = match spec_path {
                Some(sp) => read_specification(sp)?,
                None => prism.specification,
            };
            Ok((LoadedModel::Single(prism.model), spec))
        }
        ModelFormat::Bmdp => {
            let bmdp = read_bmdp(path)?;
            let sp = spec_path
                .ok_or_else(|| anyhow!("--spec is required for bmdp-tool models"))?;
            Ok((LoadedModel::Single(bmdp.model), read_specification(sp)?))
        }
        ModelFormat::Json => {
            let sp = spec_path.ok_or_else(|| anyhow!("--spec is required for JSON models"))?;
            let spec = read_specification(sp)?;
            let model = match read_model(path)? {
                ModelDocument::Imdp(doc) => LoadedModel::Single(doc.to_model()?),
                ModelDocument::Factored(doc) => LoadedModel::Factored(doc.to_model()?),
            };
            Ok((model, spec))
        }
    }
}

fn run_solve<B: RobustBellman<Scalar = f64>>(
    model: B,
    spec: Specification<f64>,
    synthesize: bool,
    max_iterations: usize,
) -> Result<Solution<f64>> {
    let vi = RobustValueIteration::new().with_max_iterations(max_iterations);
    let problem = Problem::new(model, spec);
    let solution = if synthesize {
        vi.synthesize(&problem)?
    } else {
        vi.verify(&problem)?
    };
    Ok(solution)
}

fn cmd_solve(
    model_path: &Path,
    format: ModelFormat,
    spec_path: Option<&Path>,
    output: Option<&Path>,
    synthesize: bool,
    max_iterations: usize,
) -> Result<()> {
    let (model, spec) = load_model(model_path, format, spec_path)?;
    let initial = model.initial_states();

    info!("solving {:?} over {} threads", spec.property, rayon::current_num_threads());
    let solution = match model {
        LoadedModel::Single(m) => run_solve(m, spec, synthesize, max_iterations)?,
        LoadedModel::Factored(m) => run_solve(m, spec, synthesize, max_iterations)?,
    };

    if !solution.converged {
        error!(
            iterations = solution.iterations,
            residual = solution.residual,
            "iteration cap reached before convergence"
        );
    }

    match &initial {
        Some(set) if !set.is_empty() => {
            for &s in set {
                println!("state {s}: {}", solution.value_function[s]);
            }
        }
        _ => {
            let min = solution.value_function.iter().copied().fold(f64::INFINITY, f64::min);
            let max = solution
                .value_function
                .iter()
                .copied()
                .fold(f64::NEG_INFINITY, f64::max);
            println!("value bounds over all states: [{min}, {max}]");
        }
    }
    println!(
        "{} iterations, residual {}, converged: {}",
        solution.iterations, solution.residual, solution.converged
    );

    if let Some(output) = output {
        let report = SolutionReport::new(
            solution.value_function,
            solution.iterations,
            solution.residual,
            solution.converged,
            solution.strategy,
        );
        report.write(output)?;
        info!("solution report written to {}", output.display());
    }
    Ok(())
}

fn cmd_inspect(model_path: &Path, format: ModelFormat) -> Result<()> {
    match format {
        ModelFormat::Prism => {
            let prism = read_prism(model_path)?;
            let m = &prism.model;
            println!(
                "PRISM model: {} states, {} choices, {} transitions",
                m.num_states(),
                m.num_choices(),
                m.transition().nnz()
            );
            println!("property: {:?}", prism.specification.property);
        }
        ModelFormat::Bmdp => {
            let bmdp = read_bmdp(model_path)?;
            let m = &bmdp.model;
            println!(
                "bmdp-tool model: {} states, {} choices, {} transitions, {} terminal states",
                m.num_states(),
                m.num_choices(),
                m.transition().nnz(),
                bmdp.terminal_states.len()
            );
        }
        ModelFormat::Json => match read_model(model_path)? {
            ModelDocument::Imdp(doc) => {
                let m = doc.to_model()?;
                println!(
                    "IMDP: {} states, {} choices, {} transitions",
                    m.num_states(),
                    m.num_choices(),
                    m.transition().nnz()
                );
            }
            ModelDocument::Factored(doc) => {
                let m = doc.to_model()?;
                println!(
                    "factored IMDP: state dims {:?}, action dims {:?}, {} joint states",
                    m.state_dims(),
                    m.action_dims(),
                    m.num_joint_states()
                );
                for (i, marginal) in m.marginals().iter().enumerate() {
                    println!(
                        "  marginal {i}: {} targets{}, action parents {:?}, state parents {:?}",
                        marginal.target_card(),
                        if marginal.has_sink() { " (sink)" } else { "" },
                        marginal.action_parents(),
                        marginal.state_parents()
                    );
                }
            }
        },
    }
    Ok(())
}

/// Terminal set to carry into the bmdp-tool header, when the
/// specification implies one.
fn terminal_hint(spec: Option<&Specification<f64>>) -> Vec<usize> {
    match spec.map(|s| &s.property) {
        Some(Property::ExpectedExitTime { terminal, .. }) => terminal.clone(),
        Some(Property::FiniteTimeReachability { reach, .. })
        | Some(Property::InfiniteTimeReachability { reach, .. })
        | Some(Property::ExactTimeReachability { reach, .. }) => reach.clone(),
        _ => Vec::new(),
    }
}

fn cmd_convert(
    input: &Path,
    from: ModelFormat,
    output: &Path,
    to: ModelFormat,
    spec_path: Option<&Path>,
) -> Result<()> {
    let (model, spec) = match from {
        ModelFormat::Prism => {
            let prism = read_prism(input)?;
            (prism.model, Some(prism.specification))
        }
        ModelFormat::Bmdp => (read_bmdp(input)?.model, None),
        ModelFormat::Json => match read_model(input)? {
            ModelDocument::Imdp(doc) => (doc.to_model()?, None),
            ModelDocument::Factored(_) => {
                bail!("factored models only exist in the JSON flavor; nothing to convert")
            }
        },
    };
    let spec = match spec_path {
        Some(sp) => Some(read_specification(sp)?),
        None => spec,
    };

    match to {
        ModelFormat::Json => {
            write_model(output, &ModelDocument::Imdp(ImdpDocument::from_model(&model)))?
        }
        ModelFormat::Bmdp => write_bmdp(output, &model, &terminal_hint(spec.as_ref()))?,
        ModelFormat::Prism => {
            let spec = spec.ok_or_else(|| {
                anyhow!("converting to the PRISM flavor needs a property; pass --spec")
            })?;
            write_prism(output, &model, &spec)?;
        }
    }
    info!("wrote {}", output.display());
    Ok(())
}

fn main() {
    let cli = Cli::parse();

    let subscriber = FmtSubscriber::builder()
        .with_max_level(cli.log_level)
        .finish();
    tracing::subscriber::set_global_default(subscriber).expect("setting default subscriber failed");

    configure_threads(&cli.threads);

    let result = match &cli.command {
        Commands::Solve {
            model,
            format,
            spec,
            output,
            synthesize,
            max_iterations,
        } => cmd_solve(
            model,
            *format,
            spec.as_deref(),
            output.as_deref(),
            *synthesize,
            *max_iterations,
        )
        .with_context(|| format!("solving {}", model.display())),
        Commands::Inspect { model, format } => cmd_inspect(model, *format)
            .with_context(|| format!("inspecting {}", model.display())),
        Commands::Convert {
            input,
            from,
            output,
            to,
            spec,
        } => cmd_convert(input, *from, output, *to, spec.as_deref())
            .with_context(|| format!("converting {}", input.display())),
    };

    if let Err(err) = result {
        error!("{err:#}");
        std::process::exit(1);
    }
}
