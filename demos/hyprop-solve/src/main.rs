use std::{path::PathBuf, sync::Arc};

use ariadne::{ColorGenerator, Label, Report, ReportKind, Source};
use clap::Parser as ClapParser;
use hylattice::{registry::LatticeRegistry, solver::FixedPoint};
use hymodel::{Error as ModelError, manifest::ModelManifest};
use hyprop::{
    PropError,
    solver::{PropertyConstraintSolver, SolverAction},
    utils::conf::SolverConfig,
};
use log::{error, info};

/// Resolve the properties of a model described by a TOML manifest
#[derive(ClapParser)]
#[command(version, about, long_about = None)]
pub struct Arguments {
    /// Model manifest
    manifest: PathBuf,

    /// Solver configuration (defaults to `HYPROP_CONFIG` or `hyprop.toml` when present)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Lattice to resolve in, overriding the configuration
    #[arg(short, long)]
    lattice: Option<String>,

    /// One of annotate, training, test, clear, view, collect_constraints, initialize_solver
    #[arg(short, long)]
    action: Option<SolverAction>,

    /// Solve for the greatest fixed point
    #[arg(long, default_value_t = false)]
    greatest: bool,

    /// Seed the resolution with the annotations of the manifest
    #[arg(long, default_value_t = false)]
    manual_annotation: bool,

    /// Directory receiving the constraint logs
    #[arg(long)]
    log_directory: Option<PathBuf>,

    /// Print the constraints instead of solving them
    #[arg(long, default_value_t = false)]
    constraints: bool,

    /// Print the lattices known to the solver and exit
    #[arg(long, default_value_t = false)]
    list_lattices: bool,
}

fn load_config(args: &Arguments) -> Result<SolverConfig, PropError> {
    let mut config = match &args.config {
        Some(path) => SolverConfig::from_path(path)?,
        None => {
            let path = SolverConfig::default_path();
            if path.exists() {
                SolverConfig::from_path(&path)?
            } else {
                SolverConfig::default()
            }
        }
    };

    if let Some(lattice) = &args.lattice {
        config.lattice = lattice.clone();
    }
    if let Some(action) = args.action {
        config.action = action;
    }
    if args.greatest {
        config.fixed_point = FixedPoint::Greatest;
    }
    if args.manual_annotation {
        config.manual_annotation = true;
    }
    if let Some(directory) = &args.log_directory {
        config.log_directory = Some(directory.clone());
    }
    Ok(config)
}

fn run(args: &Arguments) -> Result<(), PropError> {
    let config = load_config(args)?;
    let registry = Arc::new(LatticeRegistry::with_builtins());
    let mut solver = PropertyConstraintSolver::new(registry, config)?;

    if args.list_lattices {
        for name in solver.registry().names() {
            println!("{}", name);
        }
        return Ok(());
    }

    let mut model = ModelManifest::from_path(&args.manifest)?.build()?;

    if args.constraints {
        print!("{}", solver.constraint_log(&model)?);
        return Ok(());
    }

    let resolution = solver.resolve_properties(&mut model)?;
    info!(
        "Resolved {} propert(ies) of `{}`",
        resolution.entries.len(),
        model.name()
    );
    println!("{}", resolution);
    Ok(())
}

/// Render expression parse errors against the expression they come from.
fn report_parse_errors(error: &ModelError) -> bool {
    let ModelError::ParserErrors {
        source_text,
        errors,
    } = error
    else {
        return false;
    };

    let mut colors = ColorGenerator::new();
    let color = colors.next();
    for error in errors {
        let name = error
            .file
            .clone()
            .unwrap_or_else(|| "<expression>".to_string());
        let span = (name.clone(), error.start..error.end);
        let printed = Report::build(ReportKind::Error, span.clone())
            .with_message(&error.message)
            .with_label(
                Label::new(span)
                    .with_message("The error occurred here")
                    .with_color(color),
            )
            .finish()
            .eprint((name, Source::from(source_text.as_str())));
        if printed.is_err() {
            eprintln!("{}", error);
        }
    }
    true
}

fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    let args = Arguments::parse();

    if let Err(err) = run(&args) {
        let reported = match &err {
            PropError::Model(model_error) => report_parse_errors(model_error),
            _ => false,
        };
        if !reported {
            error!("{}", err);
        }
        std::process::exit(1);
    }
}
