// src/main.rs
//! Command line front end: fit a hand skeleton to joint targets, print poses
//! and manage the configuration file.

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use hand_fitter::data::{FitExporter, JointErrorStats};
use hand_fitter::labels::{read_label_file, target_from_label, LABEL_JOINT_COUNT};
use hand_fitter::reference::example_target;
use hand_fitter::{evaluate, AngleVector, AppConfig, EnergyKind, Fitter, HandSkeleton, Handedness};
use nalgebra::DMatrix;
use std::path::{Path, PathBuf};
use tracing::info;

/// Hand skeleton fitting
#[derive(Parser)]
#[command(name = "hand_fitter")]
#[command(about = "Fit a kinematic hand skeleton to 3D joint positions", long_about = None)]
#[command(version)]
struct Cli {
    /// Configuration file (defaults to the per-user config if present)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Fit joint angles to a target and export the results
    Fit {
        /// Joint label file (21 joints, root first)
        #[arg(long, conflicts_with = "example")]
        label: Option<PathBuf>,

        /// Built-in example target (1 or 2)
        #[arg(long, default_value_t = 2)]
        example: u8,

        /// Starting angle vector: a JSON list of 23 or 26 numbers, or an
        /// exported theta.json
        #[arg(long)]
        initial: Option<PathBuf>,

        #[arg(long)]
        iterations: Option<usize>,

        #[arg(long)]
        learning_rate: Option<f64>,

        #[arg(long)]
        log_interval: Option<usize>,

        /// position, limit or total
        #[arg(long)]
        energy: Option<EnergyKind>,

        /// Output directory for exported results
        #[arg(long)]
        output: Option<PathBuf>,

        /// Session name (defaults to a timestamp)
        #[arg(long)]
        session: Option<String>,

        /// Skip writing result files
        #[arg(long)]
        no_export: bool,
    },

    /// Evaluate the model and print the 21x3 joint matrix as CSV
    Pose {
        /// Comma separated angle vector (23 or 26 values)
        #[arg(long, value_delimiter = ',', allow_hyphen_values = true, conflicts_with = "uniform")]
        angles: Option<Vec<f64>>,

        /// Set every angle to this value
        #[arg(long, allow_hyphen_values = true)]
        uniform: Option<f64>,

        #[arg(long, value_enum, default_value_t = HandArg::Right)]
        hand: HandArg,
    },

    /// Write a configuration file with the default settings
    InitConfig {
        /// Destination (defaults to the per-user config location)
        #[arg(long)]
        path: Option<PathBuf>,

        /// Overwrite an existing file
        #[arg(long)]
        force: bool,
    },
}

#[derive(Clone, Copy, ValueEnum)]
enum HandArg {
    Right,
    Left,
}

impl From<HandArg> for Handedness {
    fn from(hand: HandArg) -> Self {
        match hand {
            HandArg::Right => Handedness::Right,
            HandArg::Left => Handedness::Left,
        }
    }
}

fn main() -> Result<()> {
    // Initialize logging
    tracing_subscriber::fmt::init();

    let cli = Cli::parse();
    let config_path = cli.config.as_deref();

    match cli.command {
        Commands::Fit {
            label,
            example,
            initial,
            iterations,
            learning_rate,
            log_interval,
            energy,
            output,
            session,
            no_export,
        } => {
            let mut config = AppConfig::load_or_default(config_path)?;
            if let Some(iterations) = iterations {
                config.fit.max_iterations = iterations;
            }
            if let Some(learning_rate) = learning_rate {
                config.fit.learning_rate = learning_rate;
            }
            if let Some(log_interval) = log_interval {
                config.fit.log_interval = log_interval;
            }
            if let Some(energy) = energy {
                config.energy = energy;
            }
            if let Some(output) = output {
                config.output_directory = output;
            }

            let target = load_target(label.as_deref(), example)?;
            let initial = match initial {
                Some(path) => read_angle_file(&path)?,
                None => AngleVector::uniform(config.initial_angle),
            };
            run_fit(&config, &target, initial, session, !no_export)
        }
        Commands::Pose {
            angles,
            uniform,
            hand,
        } => {
            let theta = match (angles, uniform) {
                (Some(values), _) => AngleVector::from_slice(&values)?,
                (None, Some(angle)) => AngleVector::uniform(angle),
                (None, None) => AngleVector::zeros(),
            };
            print_pose(&theta, &HandSkeleton::for_hand(hand.into()));
            Ok(())
        }
        Commands::InitConfig { path, force } => {
            let path = match path.or_else(AppConfig::default_path) {
                Some(path) => path,
                None => bail!("No home directory found; pass --path"),
            };
            if path.exists() && !force {
                bail!("{} already exists; use --force to overwrite", path.display());
            }
            AppConfig::default().save(&path)?;
            println!("Wrote {}", path.display());
            Ok(())
        }
    }
}

fn load_target(label: Option<&Path>, example: u8) -> Result<DMatrix<f64>> {
    match label {
        Some(path) => {
            let joints = read_label_file(path, LABEL_JOINT_COUNT)
                .with_context(|| format!("Failed to read label {}", path.display()))?;
            Ok(target_from_label(&joints)?)
        }
        None => example_target(example)
            .with_context(|| format!("No example target {example}; choose 1 or 2")),
    }
}

fn read_angle_file(path: &Path) -> Result<AngleVector> {
    let text = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read {}", path.display()))?;
    let mut value: serde_json::Value = serde_json::from_str(&text)
        .with_context(|| format!("Failed to parse {}", path.display()))?;
    if let Some(params) = value.get_mut("params") {
        value = params.take();
    }
    let theta: AngleVector = serde_json::from_value(value)
        .with_context(|| format!("{} does not hold an angle vector", path.display()))?;
    Ok(theta)
}

fn run_fit(
    config: &AppConfig,
    target: &DMatrix<f64>,
    initial: AngleVector,
    session: Option<String>,
    export: bool,
) -> Result<()> {
    let fitter = Fitter::new(
        &config.energy,
        target,
        &config.skeleton,
        initial,
        config.fit.clone(),
    )?;
    let initial_loss = fitter.loss()?;
    info!(energy = %config.energy, initial_loss, "fitting");

    let outcome = fitter.run_with(None, |sample, _| {
        println!("iteration {:>6}  loss {:.4}", sample.iteration, sample.loss);
    })?;

    let pose = evaluate(&outcome.theta, &config.skeleton);
    let stats = JointErrorStats::compute(&pose, target)?;
    println!(
        "done: {} iterations, loss {:.4} -> {:.4}, mean joint error {:.2} mm (max {:.2} mm)",
        outcome.iterations,
        initial_loss,
        outcome.final_loss().unwrap_or(initial_loss),
        stats.mean,
        stats.max
    );

    if export {
        let exporter = FitExporter::new(&config.output_directory, session);
        let dir = exporter.export_all(&outcome, &pose, target)?;
        println!("Results written to {}", dir.display());
    }
    Ok(())
}

fn print_pose(theta: &AngleVector, skeleton: &HandSkeleton) {
    let matrix = evaluate(theta, skeleton).to_matrix(true);
    println!("x,y,z");
    for row in matrix.row_iter() {
        println!("{},{},{}", row[0], row[1], row[2]);
    }
}
