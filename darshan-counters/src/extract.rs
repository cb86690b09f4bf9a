use crate::counter::Counter;
use crate::counter::CounterValues;
use crate::table::Cell;
use crate::table::Table;
use crate::table::TableResult;
use ahash::HashMap;
use ahash::HashMapExt;
use std::error::Error;
use std::fmt;
use std::fmt::Display;
use std::io;
use std::path::Path;
use std::path::PathBuf;
use std::process::Command;
use std::process::ExitStatus;
use strum::EnumCount;
use tracing::info;
use tracing::warn;
use walkdir::WalkDir;

/// Substituted for a non-positive elapsed time when deriving the tag.
pub const MIN_ELAPSED_SECS: f64 = 1e-9;

const NAMESPACES: [&str; 2] = ["POSIX", "LUSTRE"];

#[derive(Debug)]
pub enum ExtractError {
  Spawn { cmd: PathBuf, source: io::Error },
  ParserFailed {
    log: PathBuf,
    status: ExitStatus,
    stderr: String,
  },
  Io(io::Error),
}

impl Display for ExtractError {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match self {
      ExtractError::Spawn { cmd, source } => write!(f, "failed to run {}: {source}", cmd.display()),
      ExtractError::ParserFailed {
        log,
        status,
        stderr,
      } => write!(
        f,
        "parser exited with {status} on {}: {}",
        log.display(),
        stderr.trim()
      ),
      ExtractError::Io(e) => write!(f, "I/O error: {e}"),
    }
  }
}

impl Error for ExtractError {}

impl From<io::Error> for ExtractError {
  fn from(e: io::Error) -> Self {
    ExtractError::Io(e)
  }
}

/// Aggregated counters for one rank. Rank -1 holds records Darshan reduced across all ranks.
#[derive(Clone, Debug, PartialEq)]
pub struct RankRecord {
  pub rank: i64,
  pub values: CounterValues,
}

impl RankRecord {
  pub fn get(&self, c: Counter) -> f64 {
    self.values[c as usize]
  }

  /// Bytes moved per second of metadata time.
  pub fn tag(&self) -> f64 {
    let bytes = self.get(Counter::PosixBytesRead) + self.get(Counter::PosixBytesWritten);
    let mut secs = self.get(Counter::PosixFMetaTime);
    if secs <= 0.0 {
      secs = MIN_ELAPSED_SECS;
    };
    bytes / secs
  }
}

/// What happened to the lines of one parser dump.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct ExtractStats {
  /// Lines in the POSIX or LUSTRE namespace.
  pub candidates: usize,
  /// Lines added into a rank's counters.
  pub accumulated: usize,
  /// Namespace lines with too few fields or an unparseable rank or value.
  pub dropped: usize,
}

impl ExtractStats {
  pub fn merge(&mut self, other: ExtractStats) {
    self.candidates += other.candidates;
    self.accumulated += other.accumulated;
    self.dropped += other.dropped;
  }
}

#[derive(Clone, Debug, Default, PartialEq)]
pub struct Extraction {
  /// Sorted by rank.
  pub records: Vec<RankRecord>,
  pub stats: ExtractStats,
}

/// Splits one tab-separated parser line into (rank, counter name, value). Returns `None` for lines that should be counted as dropped.
pub(crate) fn split_counter_line(line: &str) -> Option<(i64, &str, f64)> {
  let mut fields = line.split('\t');
  let _module = fields.next()?;
  let rank = fields.next()?;
  let _record_id = fields.next()?;
  let counter = fields.next()?;
  let value = fields.next()?;
  let rank = rank.trim().parse().ok()?;
  let value = value.trim().parse().ok()?;
  Some((rank, counter.trim(), value))
}

/// Sums every allow-listed counter per rank. Lines outside the namespaces are ignored; malformed namespace lines are counted and skipped.
pub fn aggregate(text: &str) -> Extraction {
  let mut by_rank = HashMap::<i64, CounterValues>::new();
  let mut stats = ExtractStats::default();
  for line in text.lines() {
    if !NAMESPACES.iter().any(|ns| line.starts_with(ns)) {
      continue;
    };
    stats.candidates += 1;
    let Some((rank, name, value)) = split_counter_line(line) else {
      stats.dropped += 1;
      continue;
    };
    let Ok(counter) = name.parse::<Counter>() else {
      continue;
    };
    by_rank.entry(rank).or_insert([0.0; Counter::COUNT])[counter as usize] += value;
    stats.accumulated += 1;
  }
  let mut records = by_rank
    .into_iter()
    .map(|(rank, values)| RankRecord { rank, values })
    .collect::<Vec<_>>();
  records.sort_by_key(|r| r.rank);
  Extraction { records, stats }
}

/// Runs `darshan-parser` (or a compatible command) and returns its text output.
pub struct DarshanParser {
  pub cmd: PathBuf,
}

impl Default for DarshanParser {
  fn default() -> Self {
    Self {
      cmd: PathBuf::from("darshan-parser"),
    }
  }
}

impl DarshanParser {
  pub fn dump(&self, log: &Path) -> Result<String, ExtractError> {
    let out = Command::new(&self.cmd)
      .arg(log)
      .output()
      .map_err(|source| ExtractError::Spawn {
        cmd: self.cmd.clone(),
        source,
      })?;
    if !out.status.success() {
      return Err(ExtractError::ParserFailed {
        log: log.to_path_buf(),
        status: out.status,
        stderr: String::from_utf8_lossy(&out.stderr).into_owned(),
      });
    };
    Ok(String::from_utf8_lossy(&out.stdout).into_owned())
  }
}

fn warn_dropped(log: &Path, stats: &ExtractStats) {
  if stats.dropped > 0 {
    warn!(
      log = %log.display(),
      dropped = stats.dropped,
      candidates = stats.candidates,
      "dropped malformed counter lines"
    );
  };
}

pub fn extract_file(parser: &DarshanParser, log: &Path) -> Result<Extraction, ExtractError> {
  let ex = aggregate(&parser.dump(log)?);
  warn_dropped(log, &ex.stats);
  Ok(ex)
}

/// Aggregates a parser dump that was saved to disk earlier.
pub fn extract_text_file(path: &Path) -> Result<Extraction, ExtractError> {
  let ex = aggregate(&std::fs::read_to_string(path)?);
  warn_dropped(path, &ex.stats);
  Ok(ex)
}

/// Every `*.darshan` file under `dir`, in path order.
pub fn find_logs(dir: &Path) -> Vec<PathBuf> {
  let mut logs = WalkDir::new(dir)
    .into_iter()
    .filter_map(|e| match e {
      Ok(e) => Some(e),
      Err(err) => {
        warn!(error = %err, "failed to read directory entry");
        None
      }
    })
    .filter(|e| e.file_type().is_file())
    .map(|e| e.into_path())
    .filter(|p| p.extension().is_some_and(|ext| ext == "darshan"))
    .collect::<Vec<_>>();
  logs.sort();
  logs
}

/// Extracts every log under `dir` separately and merges the records. A log the parser fails on is logged and skipped.
pub fn extract_dir(parser: &DarshanParser, dir: &Path) -> Extraction {
  let mut merged = Extraction::default();
  for log in find_logs(dir) {
    info!(log = %log.display(), "processing");
    match extract_file(parser, &log) {
      Ok(ex) => {
        merged.records.extend(ex.records);
        merged.stats.merge(ex.stats);
      }
      Err(err) => warn!(log = %log.display(), error = %err, "skipping log"),
    };
  }
  merged.records.sort_by_key(|r| r.rank);
  merged
}

pub fn output_columns() -> Vec<String> {
  let mut cols = vec!["nprocs".to_string()];
  cols.extend(Counter::written().map(|c| c.name().to_string()));
  cols.push("tag".to_string());
  cols
}

impl Extraction {
  /// `nprocs` (the rank), every written counter in allow-list order, then `tag`.
  pub fn to_table(&self) -> Table {
    let mut table = Table::new(output_columns());
    for r in self.records.iter() {
      let mut row = vec![Cell::Num(r.rank as f64)];
      row.extend(Counter::written().map(|c| Cell::Num(r.get(c))));
      row.push(Cell::Num(r.tag()));
      table.push_row(row);
    }
    table
  }

  /// Writes the rank table to `out`. Returns false and writes nothing when no records were found.
  pub fn write_path(&self, out: &Path) -> TableResult<bool> {
    if self.records.is_empty() {
      warn!(
        candidates = self.stats.candidates,
        dropped = self.stats.dropped,
        "no records found"
      );
      return Ok(false);
    };
    self.to_table().write_path(out)?;
    info!(rows = self.records.len(), out = %out.display(), "wrote ranks");
    Ok(true)
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use std::fs;
  use tracing_test::traced_test;

  fn line(module: &str, rank: &str, counter: &str, value: &str) -> String {
    format!("{module}\t{rank}\t1234567\t{counter}\t{value}\t/scratch/test00001\t/scratch\tlustre\n")
  }

  #[test]
  fn test_repeated_counters_sum() {
    let text = [
      "# darshan log version: 3.41\n".to_string(),
      line("POSIX", "0", "POSIX_WRITES", "3.0"),
      line("POSIX", "0", "POSIX_WRITES", "4.0"),
      line("MPI-IO", "0", "MPIIO_INDEP_WRITES", "9"),
    ]
    .concat();
    let ex = aggregate(&text);
    assert_eq!(ex.records.len(), 1);
    assert_eq!(ex.records[0].rank, 0);
    assert_eq!(ex.records[0].get(Counter::PosixWrites), 7.0);
    assert_eq!(ex.stats, ExtractStats {
      candidates: 2,
      accumulated: 2,
      dropped: 0,
    });
  }

  #[test]
  fn test_tag_floors_elapsed_time() {
    let text = [
      line("POSIX", "0", "POSIX_BYTES_READ", "100"),
      line("POSIX", "0", "POSIX_BYTES_WRITTEN", "0"),
      line("POSIX", "0", "POSIX_F_META_TIME", "0"),
    ]
    .concat();
    let ex = aggregate(&text);
    assert!((ex.records[0].tag() - 1e11).abs() < 1e-3);

    let text = [
      line("POSIX", "1", "POSIX_BYTES_READ", "100"),
      line("POSIX", "1", "POSIX_BYTES_WRITTEN", "300"),
      line("POSIX", "1", "POSIX_F_META_TIME", "2"),
    ]
    .concat();
    assert_eq!(aggregate(&text).records[0].tag(), 200.0);
  }

  #[test]
  fn test_ranks_sorted_and_lustre_included() {
    let text = [
      line("POSIX", "3", "POSIX_OPENS", "1"),
      line("LUSTRE", "-1", "LUSTRE_STRIPE_WIDTH", "4"),
      line("POSIX", "0", "POSIX_OPENS", "2"),
    ]
    .concat();
    let ex = aggregate(&text);
    let ranks = ex.records.iter().map(|r| r.rank).collect::<Vec<_>>();
    assert_eq!(ranks, vec![-1, 0, 3]);
    assert_eq!(ex.records[0].get(Counter::LustreStripeWidth), 4.0);
    assert_eq!(ex.records[0].get(Counter::PosixOpens), 0.0);
  }

  #[test]
  fn test_column_order_ignores_log_order() {
    let text = [
      line("POSIX", "0", "POSIX_ACCESS4_COUNT", "5"),
      line("POSIX", "0", "POSIX_OPENS", "1"),
      line("POSIX", "0", "POSIX_F_META_TIME", "1"),
    ]
    .concat();
    let table = aggregate(&text).to_table();
    assert_eq!(table.columns.len(), 46);
    assert_eq!(table.columns[0], "nprocs");
    assert_eq!(table.columns[1], "POSIX_OPENS");
    assert_eq!(table.columns[44], "POSIX_ACCESS4_COUNT");
    assert_eq!(table.columns[45], "tag");
    assert!(!table.columns.iter().any(|c| c == "POSIX_F_META_TIME"));
    assert_eq!(table.rows[0][1], Cell::Num(1.0));
    assert_eq!(table.rows[0][44], Cell::Num(5.0));
  }

  #[test]
  fn test_no_matching_lines_is_empty() {
    let ex = aggregate("# nprocs: 4\nMPI-IO\t0\t1\tMPIIO_INDEP_OPENS\t1\n\n");
    assert!(ex.records.is_empty());
    assert_eq!(ex.stats, ExtractStats::default());
    assert!(ex.to_table().rows.is_empty());
  }

  #[traced_test]
  #[test]
  fn test_malformed_lines_are_dropped_and_reported() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("dump.txt");
    let text = [
      line("POSIX", "0", "POSIX_READS", "2"),
      line("POSIX", "zero", "POSIX_READS", "5"),
      line("POSIX", "0", "POSIX_READS", "lots"),
      "POSIX\t0\tPOSIX_READS\n".to_string(),
    ]
    .concat();
    fs::write(&path, text).unwrap();
    let ex = extract_text_file(&path).unwrap();
    assert_eq!(ex.records[0].get(Counter::PosixReads), 2.0);
    assert_eq!(ex.stats.dropped, 3);
    assert!(logs_contain("dropped malformed counter lines"));
    assert!(logs_contain("dropped=3"));
  }

  #[test]
  fn test_find_logs_recurses() {
    let dir = tempfile::tempdir().unwrap();
    fs::create_dir_all(dir.path().join("2025/8/14")).unwrap();
    fs::write(dir.path().join("2025/8/14/b.darshan"), "").unwrap();
    fs::write(dir.path().join("a.darshan"), "").unwrap();
    fs::write(dir.path().join("notes.txt"), "").unwrap();
    let logs = find_logs(dir.path());
    assert_eq!(logs, vec![
      dir.path().join("2025/8/14/b.darshan"),
      dir.path().join("a.darshan"),
    ]);
  }

  #[test]
  fn test_missing_parser_is_spawn_error() {
    let parser = DarshanParser {
      cmd: PathBuf::from("/nonexistent/darshan-parser"),
    };
    let err = extract_file(&parser, Path::new("x.darshan")).unwrap_err();
    assert!(matches!(err, ExtractError::Spawn { .. }));
  }

  #[traced_test]
  #[test]
  fn test_write_path_needs_records() {
    let dir = tempfile::tempdir().unwrap();
    let out = dir.path().join("ranks.csv");
    let empty = aggregate("# nothing here\n");
    assert!(!empty.write_path(&out).unwrap());
    assert!(!out.exists());
    assert!(logs_contain("no records found"));

    let ex = aggregate(&line("POSIX", "2", "POSIX_OPENS", "5"));
    assert!(ex.write_path(&out).unwrap());
    let table = Table::read_path(&out).unwrap();
    assert_eq!(table.rows.len(), 1);
    assert_eq!(table.rows[0][0], Cell::Num(2.0));
    assert_eq!(table.rows[0][1], Cell::Num(5.0));
  }
}
