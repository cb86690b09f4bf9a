use clap::Args;
use clap::Parser;
use clap::Subcommand;
use ior_sweep::diversity::column_usage;
use ior_sweep::diversity::diversity_scores;
use ior_sweep::read_rows_from_path;
use ior_sweep::space::ParameterSpace;
use ior_sweep::targeted::TargetedPlan;
use ior_sweep::write_rows_to_path;
use ior_sweep::ConfigRow;
use ior_sweep::PARAMETER_COLUMNS;
use rand::rngs::StdRng;
use rand::SeedableRng;
use serde::de::DeserializeOwned;
use std::error::Error;
use std::fs::read_to_string;
use std::path::Path;
use std::path::PathBuf;
use std::process::ExitCode;
use tracing::error;
use tracing::info;
use tracing::warn;

/*

# IOR sweep

Generates configuration tables for IOR runs. `grid` writes every combination of the parameter lists, `targeted` samples from groups that each push a different family of Darshan counters, and `diversity` ranks an existing table by how rare each row's parameter values are.

Every list can be overridden from a YAML file (see cfg/). Lists that aren't mentioned keep their built-in values.

*/

#[derive(Debug, Parser)]
#[command(author, version, about)]
struct Cli {
  #[command(subcommand)]
  command: Commands,
}

#[derive(Args, Debug)]
struct CmdGrid {
  /// YAML file overriding parameter lists.
  #[arg(long)]
  cfg: Option<PathBuf>,

  #[arg(long, default_value = "ior_configurations.csv")]
  out: PathBuf,
}

#[derive(Args, Debug)]
struct CmdTargeted {
  /// YAML file overriding the base space, the groups, or the sample count.
  #[arg(long)]
  cfg: Option<PathBuf>,

  #[arg(long, default_value = "ior_configurations_targeted.csv")]
  out: PathBuf,

  /// Seed for reproducible sampling. Uses OS entropy if not set.
  #[arg(long)]
  seed: Option<u64>,

  /// Rows drawn per group (overrides config).
  #[arg(long)]
  samples_per_group: Option<usize>,
}

#[derive(Args, Debug)]
struct CmdDiversity {
  /// Configuration table to score.
  csv: PathBuf,

  /// How many of the most diverse rows to print.
  #[arg(long, default_value_t = 10)]
  top: usize,
}

#[derive(Debug, Subcommand)]
enum Commands {
  Grid(CmdGrid),
  Targeted(CmdTargeted),
  Diversity(CmdDiversity),
}

fn load_cfg<T: DeserializeOwned + Default>(path: Option<&Path>) -> Result<T, Box<dyn Error>> {
  let Some(path) = path else {
    return Ok(T::default());
  };
  let raw = read_to_string(path).map_err(|e| format!("failed to read {}: {e}", path.display()))?;
  Ok(serde_yaml::from_str(&raw)?)
}

fn write_table(out: &Path, rows: &[ConfigRow]) -> Result<(), Box<dyn Error>> {
  let incompatible = rows.iter().filter(|r| !r.ior_compatible()).count();
  if incompatible > 0 {
    warn!(
      incompatible,
      "some rows have a block size that isn't a multiple of the transfer size"
    );
  };
  write_rows_to_path(out, rows)?;
  info!(rows = rows.len(), path = %out.display(), "wrote configurations");
  Ok(())
}

fn cmd_grid(cmd: CmdGrid) -> Result<ExitCode, Box<dyn Error>> {
  let space: ParameterSpace = load_cfg(cmd.cfg.as_deref())?;
  info!(combinations = space.combinations(), "enumerating parameter space");
  let rows = space.enumerate();
  write_table(&cmd.out, &rows)?;
  Ok(ExitCode::SUCCESS)
}

fn cmd_targeted(cmd: CmdTargeted) -> Result<ExitCode, Box<dyn Error>> {
  let mut plan: TargetedPlan = load_cfg(cmd.cfg.as_deref())?;
  if let Some(n) = cmd.samples_per_group {
    plan.samples_per_group = n;
  };
  let mut rng = match cmd.seed {
    Some(seed) => StdRng::seed_from_u64(seed),
    None => StdRng::from_entropy(),
  };
  info!(
    groups = plan.groups.len(),
    samples_per_group = plan.samples_per_group,
    "sampling targeted configurations"
  );
  let rows = plan.sample(&mut rng);
  write_table(&cmd.out, &rows)?;
  Ok(ExitCode::SUCCESS)
}

fn cmd_diversity(cmd: CmdDiversity) -> Result<ExitCode, Box<dyn Error>> {
  if !cmd.csv.exists() {
    error!(path = %cmd.csv.display(), "configuration table not found");
    return Ok(ExitCode::FAILURE);
  };
  let (rows, skipped) = read_rows_from_path(&cmd.csv)?;
  if rows.is_empty() {
    warn!(skipped, "no usable configuration rows");
    return Ok(ExitCode::FAILURE);
  };
  info!(rows = rows.len(), skipped, "loaded configurations");

  println!("Top {} most diverse configurations:", cmd.top);
  println!("{:>10}  {:>8}  {}", "config_id", "score", PARAMETER_COLUMNS.join(" "));
  for s in diversity_scores(&rows).iter().take(cmd.top) {
    println!(
      "{:>10}  {:>8.3}  {}",
      s.row.config_id,
      s.score,
      s.row.parameter_values().join(" ")
    );
  }

  println!();
  println!("Parameter usage:");
  for usage in column_usage(&rows) {
    let counts = usage
      .counts
      .iter()
      .map(|(v, n)| format!("{v}={n}"))
      .collect::<Vec<_>>()
      .join(", ");
    println!("  {}: {}", usage.column, counts);
  }
  Ok(ExitCode::SUCCESS)
}

fn main() -> ExitCode {
  tracing_subscriber::fmt::init();

  let cli = Cli::parse();
  let res = match cli.command {
    Commands::Grid(cmd) => cmd_grid(cmd),
    Commands::Targeted(cmd) => cmd_targeted(cmd),
    Commands::Diversity(cmd) => cmd_diversity(cmd),
  };
  match res {
    Ok(code) => code,
    Err(err) => {
      error!(error = %err, "failed");
      ExitCode::FAILURE
    }
  }
}
