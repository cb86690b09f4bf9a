use clap::Args;
use clap::Parser;
use clap::Subcommand;
use darshan_counters::extract::extract_dir;
use darshan_counters::extract::extract_file;
use darshan_counters::extract::extract_text_file;
use darshan_counters::extract::DarshanParser;
use darshan_counters::extract::Extraction;
use darshan_counters::normalize::normalize_l2;
use darshan_counters::normalize::normalize_log;
use darshan_counters::normalize::normalize_log_scaled_tag;
use darshan_counters::summary::summarize;
use darshan_counters::table::Table;
use std::error::Error;
use std::fs::read_to_string;
use std::path::Path;
use std::path::PathBuf;
use std::process::ExitCode;
use tracing::error;
use tracing::info;
use tracing::warn;

/*

# Darshan counters

Turns Darshan logs into counter tables and prepares those tables for training.

- `extract` and `extract-dir` run darshan-parser and sum the allow-listed POSIX and LUSTRE counters per rank. Each row also gets a `tag`, the bytes moved per second of POSIX metadata time.
- `summarize` collapses one job's log into a single log10-scaled row, optionally with HDF5 counters.
- `normalize` rewrites the numeric columns of a table in place (log, row-wise L2, or log with a rescaled tag).
- `sort-by-tag` lists test ids from lowest to highest tag.

Lines darshan-parser emits that can't be parsed are skipped and counted; the count is logged as a warning.

*/

#[derive(Debug, Parser)]
#[command(author, version, about)]
struct Cli {
  #[command(subcommand)]
  command: Commands,
}

#[derive(Args, Debug)]
struct CmdExtract {
  /// Darshan log, or a saved darshan-parser dump with --text.
  log: PathBuf,

  #[arg(default_value = "darshan_parsed_output.csv")]
  out: PathBuf,

  #[arg(long, default_value = "darshan-parser")]
  parser_cmd: PathBuf,

  /// Treat the input as darshan-parser output instead of a binary log.
  #[arg(long)]
  text: bool,
}

#[derive(Args, Debug)]
struct CmdExtractDir {
  /// Searched recursively for *.darshan files.
  dir: PathBuf,

  #[arg(default_value = "darshan_parsed_output.csv")]
  out: PathBuf,

  #[arg(long, default_value = "darshan-parser")]
  parser_cmd: PathBuf,
}

#[derive(Args, Debug)]
struct CmdSummarize {
  log: PathBuf,

  out: PathBuf,

  /// Also sum HDF5 opens, reads, writes, and bytes.
  #[arg(long)]
  hdf5: bool,

  #[arg(long, default_value = "darshan-parser")]
  parser_cmd: PathBuf,

  #[arg(long)]
  text: bool,
}

#[derive(Args, Debug)]
struct CmdNormLog {
  input: PathBuf,

  output: PathBuf,

  /// Columns left untouched.
  #[arg(long, default_values = ["test_id"])]
  exclude: Vec<String>,
}

#[derive(Args, Debug)]
struct CmdNormL2 {
  input: PathBuf,

  output: PathBuf,

  #[arg(long, default_values = ["tag", "test_id"])]
  exclude: Vec<String>,
}

#[derive(Args, Debug)]
struct CmdNormScaledTag {
  input: PathBuf,

  output: PathBuf,

  /// Largest tag value after scaling, i.e. the maximum seen in training data.
  #[arg(long, default_value_t = 4.0)]
  tag_target_max: f64,

  #[arg(long)]
  exclude: Vec<String>,
}

#[derive(Debug, Subcommand)]
enum NormalizeMode {
  /// log10(x + 1) on every numeric column.
  Log(CmdNormLog),
  /// Divide each row by its Euclidean norm.
  L2(CmdNormL2),
  /// log10(x + 1), with the tag rescaled to a target maximum first.
  LogScaledTag(CmdNormScaledTag),
}

#[derive(Args, Debug)]
struct CmdSortByTag {
  input: PathBuf,

  output: PathBuf,
}

#[derive(Debug, Subcommand)]
enum Commands {
  Extract(CmdExtract),
  ExtractDir(CmdExtractDir),
  Summarize(CmdSummarize),
  #[command(subcommand)]
  Normalize(NormalizeMode),
  SortByTag(CmdSortByTag),
}

fn missing(path: &Path) -> bool {
  if path.exists() {
    return false;
  };
  error!(path = %path.display(), "input not found");
  true
}

fn write_extraction(ex: &Extraction, out: &Path) -> Result<ExitCode, Box<dyn Error>> {
  Ok(match ex.write_path(out)? {
    true => ExitCode::SUCCESS,
    false => ExitCode::FAILURE,
  })
}

fn cmd_extract(cmd: CmdExtract) -> Result<ExitCode, Box<dyn Error>> {
  if missing(&cmd.log) {
    return Ok(ExitCode::FAILURE);
  };
  let ex = if cmd.text {
    extract_text_file(&cmd.log)?
  } else {
    extract_file(&DarshanParser { cmd: cmd.parser_cmd }, &cmd.log)?
  };
  write_extraction(&ex, &cmd.out)
}

fn cmd_extract_dir(cmd: CmdExtractDir) -> Result<ExitCode, Box<dyn Error>> {
  if missing(&cmd.dir) {
    return Ok(ExitCode::FAILURE);
  };
  let ex = extract_dir(&DarshanParser { cmd: cmd.parser_cmd }, &cmd.dir);
  write_extraction(&ex, &cmd.out)
}

fn cmd_summarize(cmd: CmdSummarize) -> Result<ExitCode, Box<dyn Error>> {
  if missing(&cmd.log) {
    return Ok(ExitCode::FAILURE);
  };
  let text = if cmd.text {
    read_to_string(&cmd.log)?
  } else {
    DarshanParser {
      cmd: cmd.parser_cmd,
    }
    .dump(&cmd.log)?
  };
  let summary = summarize(&text, cmd.hdf5);
  if summary.stats.dropped > 0 {
    warn!(dropped = summary.stats.dropped, "dropped malformed counter lines");
  };
  if summary.stats.accumulated == 0 {
    warn!("no counters found");
    return Ok(ExitCode::FAILURE);
  };
  summary.to_table().write_path(&cmd.out)?;
  info!(
    nprocs = summary.nprocs,
    label = summary.label(),
    out = %cmd.out.display(),
    "wrote summary"
  );
  Ok(ExitCode::SUCCESS)
}

fn load(path: &Path) -> Result<Option<Table>, Box<dyn Error>> {
  if missing(path) {
    return Ok(None);
  };
  let table = Table::read_path(path)?;
  info!(rows = table.rows.len(), path = %path.display(), "loaded table");
  if table.rows.is_empty() {
    warn!("table has no rows");
    return Ok(None);
  };
  Ok(Some(table))
}

fn cmd_normalize(mode: NormalizeMode) -> Result<ExitCode, Box<dyn Error>> {
  let (input, output) = match &mode {
    NormalizeMode::Log(c) => (c.input.clone(), c.output.clone()),
    NormalizeMode::L2(c) => (c.input.clone(), c.output.clone()),
    NormalizeMode::LogScaledTag(c) => (c.input.clone(), c.output.clone()),
  };
  let Some(mut table) = load(&input)? else {
    return Ok(ExitCode::FAILURE);
  };
  match mode {
    NormalizeMode::Log(c) => {
      let cols = normalize_log(&mut table, &c.exclude);
      info!(columns = ?cols, "applied log10(x + 1)");
    }
    NormalizeMode::L2(c) => {
      let cols = normalize_l2(&mut table, &c.exclude);
      info!(columns = ?cols, excluded = ?c.exclude, "applied row-wise L2");
    }
    NormalizeMode::LogScaledTag(c) => {
      let scale = normalize_log_scaled_tag(&mut table, c.tag_target_max, &c.exclude)?;
      info!(
        raw_max = scale.raw_max,
        divisor = scale.divisor,
        "applied log10(x + 1) with scaled tag"
      );
    }
  };
  table.write_path(&output)?;
  info!(rows = table.rows.len(), out = %output.display(), "wrote normalized table");
  Ok(ExitCode::SUCCESS)
}

fn cmd_sort_by_tag(cmd: CmdSortByTag) -> Result<ExitCode, Box<dyn Error>> {
  let Some(table) = load(&cmd.input)? else {
    return Ok(ExitCode::FAILURE);
  };
  let sorted = table.sorted_by_tag()?;
  sorted.write_path(&cmd.output)?;
  info!(rows = sorted.rows.len(), out = %cmd.output.display(), "wrote test ids sorted by tag");
  Ok(ExitCode::SUCCESS)
}

fn main() -> ExitCode {
  tracing_subscriber::fmt::init();

  let cli = Cli::parse();
  let res = match cli.command {
    Commands::Extract(cmd) => cmd_extract(cmd),
    Commands::ExtractDir(cmd) => cmd_extract_dir(cmd),
    Commands::Summarize(cmd) => cmd_summarize(cmd),
    Commands::Normalize(mode) => cmd_normalize(mode),
    Commands::SortByTag(cmd) => cmd_sort_by_tag(cmd),
  };
  match res {
    Ok(code) => code,
    Err(err) => {
      error!(error = %err, "failed");
      ExitCode::FAILURE
    }
  }
}
