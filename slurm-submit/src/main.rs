pub mod conf;
pub mod emit;
pub mod job;
pub mod scheduler;

use clap::Parser;
use conf::JobConf;
use emit::emit;
use emit::EmitOpts;
use ior_sweep::read_rows_from_path;
use scheduler::Sbatch;
use std::error::Error;
use std::fs::read_to_string;
use std::path::PathBuf;
use std::process::ExitCode;
use tracing::error;
use tracing::info;
use tracing::warn;

/*

# SLURM submitter

Turns every row of a configuration table into a batch job that runs IOR with Darshan preloaded, submits it, and deletes the job file again. Darshan writes one log per job named after the row's test file, which is what the counter extractor consumes later.

Submission is fire-and-forget: nothing waits for jobs to finish, and a rejected submission is logged and skipped.

*/

#[derive(Debug, Parser)]
#[command(author, version, about)]
struct Cli {
  /// Configuration table produced by ior-sweep.
  configs: PathBuf,

  /// YAML job template. Fields not set keep their built-in values.
  #[arg(long)]
  cfg: Option<PathBuf>,

  /// Submission executable (overrides the default `sbatch`).
  #[arg(long)]
  sbatch: Option<PathBuf>,

  /// Directory for generated job files (overrides config).
  #[arg(long)]
  job_dir: Option<PathBuf>,

  /// Render and log each job without submitting it.
  #[arg(long)]
  dry_run: bool,

  /// Don't delete job files after submission.
  #[arg(long)]
  keep: bool,
}

fn run(cli: Cli) -> Result<ExitCode, Box<dyn Error>> {
  let mut conf: JobConf = match &cli.cfg {
    Some(path) => serde_yaml::from_str(
      &read_to_string(path).map_err(|e| format!("failed to read {}: {e}", path.display()))?,
    )?,
    None => JobConf::default(),
  };
  if let Some(dir) = cli.job_dir {
    conf.job_dir = dir;
  };

  if !cli.configs.exists() {
    error!(path = %cli.configs.display(), "configuration table not found");
    return Ok(ExitCode::FAILURE);
  };
  let (rows, skipped) = read_rows_from_path(&cli.configs)?;
  if rows.is_empty() {
    warn!(skipped, "no usable configuration rows");
    return Ok(ExitCode::FAILURE);
  };
  info!(rows = rows.len(), skipped, "loaded configurations");

  let sbatch = cli.sbatch.map(|bin| Sbatch { bin }).unwrap_or_default();
  let stats = emit(&conf, &rows, &sbatch, &EmitOpts {
    dry_run: cli.dry_run,
    keep: cli.keep,
  })?;
  info!(
    submitted = stats.submitted,
    failed = stats.failed,
    dry_run = stats.dry_run,
    "all jobs processed"
  );
  Ok(ExitCode::SUCCESS)
}

fn main() -> ExitCode {
  tracing_subscriber::fmt::init();

  let cli = Cli::parse();
  match run(cli) {
    Ok(code) => code,
    Err(err) => {
      error!(error = %err, "failed");
      ExitCode::FAILURE
    }
  }
}
