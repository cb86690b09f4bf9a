use clap::Args;
use clap::Parser;
use clap::Subcommand;
use counter_report::compare;
use counter_report::compare::format_table;
use counter_report::compare::load_dir;
use counter_report::compare::performance_summary;
use counter_report::coverage;
use counter_report::coverage::analyze;
use counter_report::coverage::SUMMARY_TEXT_FILE;
use counter_report::histograms;
use counter_report::presence::presence;
use darshan_counters::table::Table;
use std::error::Error;
use std::fs;
use std::path::Path;
use std::path::PathBuf;
use std::process::ExitCode;
use tracing::error;
use tracing::info;
use tracing::warn;

/*

# Counter report

Charts and summaries over counter tables written by darshan-counters.

- `coverage` reports how many entries have non-zero POSIX counters and writes a heatmap, distributions, a coverage bar chart, and a text summary.
- `presence` draws which numeric columns are non-zero in each row.
- `histograms` draws one histogram of raw values per numeric column plus a combined grid.
- `compare` merges every `*_counters_*.csv` in a results directory and compares configurations and benchmark types.

*/

#[derive(Debug, Parser)]
#[command(author, version, about)]
struct Cli {
  #[command(subcommand)]
  command: Commands,
}

#[derive(Args, Debug)]
struct CmdCoverage {
  csv: PathBuf,

  #[arg(long, default_value = "logs")]
  out_dir: PathBuf,
}

#[derive(Args, Debug)]
struct CmdPresence {
  csv: PathBuf,

  #[arg(long, default_value = "presence_matrix_heatmap.png")]
  out: PathBuf,

  #[arg(long, default_values = ["test_id"])]
  exclude: Vec<String>,
}

#[derive(Args, Debug)]
struct CmdHistograms {
  csv: PathBuf,

  #[arg(long, default_value = "plots/io_counter_histograms")]
  out_dir: PathBuf,

  #[arg(long, default_value_t = 50)]
  bins: usize,

  #[arg(long, default_values = ["test_id"])]
  exclude: Vec<String>,
}

#[derive(Args, Debug)]
struct CmdCompare {
  /// Directory holding `*_counters_*.csv` files. Outputs are written here too.
  results_dir: PathBuf,
}

#[derive(Debug, Subcommand)]
enum Commands {
  Coverage(CmdCoverage),
  Presence(CmdPresence),
  Histograms(CmdHistograms),
  Compare(CmdCompare),
}

fn load(path: &Path) -> Result<Option<Table>, Box<dyn Error>> {
  if !path.exists() {
    error!(path = %path.display(), "input not found");
    return Ok(None);
  };
  let table = Table::read_path(path)?;
  info!(
    rows = table.rows.len(),
    columns = table.columns.len(),
    path = %path.display(),
    "loaded table"
  );
  if table.rows.is_empty() {
    warn!("table has no rows");
    return Ok(None);
  };
  Ok(Some(table))
}

fn cmd_coverage(cmd: CmdCoverage) -> Result<ExitCode, Box<dyn Error>> {
  let Some(table) = load(&cmd.csv)? else {
    return Ok(ExitCode::FAILURE);
  };
  let report = analyze(&table);
  println!("{}", report.report_text());

  fs::create_dir_all(&cmd.out_dir)?;
  coverage::render(&table, &report, &cmd.out_dir)?;
  let summary_path = cmd.out_dir.join(SUMMARY_TEXT_FILE);
  fs::write(&summary_path, report.summary_text())?;

  println!("=== Summary Report ===");
  println!("Total entries analyzed: {}", report.rows);
  println!("Entries with complete I/O counter data: {}", report.complete);
  println!("Percentage with complete data: {:.1}%", report.complete_pct());
  println!("Total missing values: {}", report.total_missing());
  info!(summary = %summary_path.display(), out_dir = %cmd.out_dir.display(), "wrote coverage report");
  Ok(ExitCode::SUCCESS)
}

fn cmd_presence(cmd: CmdPresence) -> Result<ExitCode, Box<dyn Error>> {
  let Some(table) = load(&cmd.csv)? else {
    return Ok(ExitCode::FAILURE);
  };
  let p = presence(&table, &cmd.exclude);
  if let Some(parent) = cmd.out.parent().filter(|p| !p.as_os_str().is_empty()) {
    fs::create_dir_all(parent)?;
  };
  p.render(&cmd.out)?;
  info!(columns = p.columns.len(), out = %cmd.out.display(), "saved presence matrix heatmap");
  Ok(ExitCode::SUCCESS)
}

fn cmd_histograms(cmd: CmdHistograms) -> Result<ExitCode, Box<dyn Error>> {
  let Some(table) = load(&cmd.csv)? else {
    return Ok(ExitCode::FAILURE);
  };
  let written = histograms::render(&table, &cmd.exclude, &cmd.out_dir, cmd.bins)?;
  info!(histograms = written, out_dir = %cmd.out_dir.display(), "saved histograms");
  Ok(ExitCode::SUCCESS)
}

fn cmd_compare(cmd: CmdCompare) -> Result<ExitCode, Box<dyn Error>> {
  let dir = &cmd.results_dir;
  if !dir.is_dir() {
    error!(path = %dir.display(), "results directory not found");
    return Ok(ExitCode::FAILURE);
  };
  let combined = load_dir(dir)?;
  if combined.rows.is_empty() {
    warn!("no counter data found");
    return Ok(ExitCode::FAILURE);
  };
  info!(
    rows = combined.rows.len(),
    columns = combined.columns.len(),
    "combined counter tables"
  );

  compare::render(&combined, dir)?;
  let summary = performance_summary(&combined);
  if !summary.rows.is_empty() {
    let path = dir.join(compare::SUMMARY_FILE);
    summary.write_path(&path)?;
    info!(path = %path.display(), "performance summary saved");
    println!("Performance Summary:");
    print!("{}", format_table(&summary));
  };

  let path = dir.join(compare::COMBINED_FILE);
  combined.write_path(&path)?;
  info!(path = %path.display(), "combined results saved");
  Ok(ExitCode::SUCCESS)
}

fn main() -> ExitCode {
  tracing_subscriber::fmt::init();

  let cli = Cli::parse();
  let res = match cli.command {
    Commands::Coverage(cmd) => cmd_coverage(cmd),
    Commands::Presence(cmd) => cmd_presence(cmd),
    Commands::Histograms(cmd) => cmd_histograms(cmd),
    Commands::Compare(cmd) => cmd_compare(cmd),
  };
  match res {
    Ok(code) => code,
    Err(err) => {
      error!(error = %err, "failed");
      ExitCode::FAILURE
    }
  }
}
