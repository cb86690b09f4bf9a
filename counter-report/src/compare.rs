use ahash::HashSet;
use ahash::HashSetExt;
use crate::chart::boxplot_grid_png;
use crate::chart::BoxPanel;
use crate::chart::ChartResult;
use crate::coverage::KEY_COUNTERS;
use crate::stats::mean;
use darshan_counters::table::Cell;
use darshan_counters::table::Table;
use once_cell::sync::Lazy;
use regex::Regex;
use std::fmt::Write;
use std::fs;
use std::io;
use std::path::Path;
use std::path::PathBuf;
use tracing::info;
use tracing::warn;

static COUNTER_FILE_RE: Lazy<Regex> =
  Lazy::new(|| Regex::new(r"^(.*?)_counters_.*\.csv$").unwrap());

pub const CONFIG_COLUMN: &str = "config_name";
pub const TYPE_COLUMN: &str = "benchmark_type";
pub const SOURCE_COLUMN: &str = "source_file";

pub const COMBINED_FILE: &str = "combined_benchmark_results.csv";
pub const CONFIG_CHART_FILE: &str = "configuration_comparison.png";
pub const TYPE_CHART_FILE: &str = "benchmark_type_comparison.png";
pub const SUMMARY_FILE: &str = "performance_summary.csv";

/// Output column and the counter it averages.
const SUMMARY_METRICS: [(&str, &str); 6] = [
  ("Processes", "nprocs"),
  ("POSIX Opens", "POSIX_OPENS"),
  ("POSIX Reads", "POSIX_READS"),
  ("POSIX Writes", "POSIX_WRITES"),
  ("Bytes Read", "POSIX_BYTES_READ"),
  ("Bytes Written", "POSIX_BYTES_WRITTEN"),
];

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum BenchType {
  Posix,
  Hdf5,
  Unknown,
}

impl BenchType {
  pub fn as_str(&self) -> &'static str {
    match self {
      BenchType::Posix => "posix",
      BenchType::Hdf5 => "hdf5",
      BenchType::Unknown => "unknown",
    }
  }
}

/// Configuration name and benchmark type from a `<config>_<type>..._counters_....csv` file name. None if the name doesn't match.
pub fn parse_file_name(name: &str) -> Option<(String, BenchType)> {
  let prefix = COUNTER_FILE_RE.captures(name)?.get(1)?.as_str();
  let parts = prefix.split('_').collect::<Vec<_>>();
  if parts.len() < 2 {
    return Some(("unknown".to_string(), BenchType::Unknown));
  };
  let bench = match parts[1] {
    "posix" => BenchType::Posix,
    "hdf5" => BenchType::Hdf5,
    _ => BenchType::Unknown,
  };
  Some((parts[0].to_string(), bench))
}

/// Entries of `dir` (not recursive) whose names look like counter tables, sorted by name.
pub fn counter_files(dir: &Path) -> io::Result<Vec<PathBuf>> {
  let mut files = Vec::new();
  for entry in fs::read_dir(dir)? {
    let entry = entry?;
    let name = entry.file_name().to_string_lossy().to_string();
    if COUNTER_FILE_RE.is_match(&name) {
      files.push(entry.path());
    };
  }
  files.sort();
  Ok(files)
}

/// Reads every counter table in `dir` and stacks them with their source columns added. Files that can't be read are logged and skipped.
pub fn load_dir(dir: &Path) -> io::Result<Table> {
  let files = counter_files(dir)?;
  info!(files = files.len(), "found counter files");
  let mut tables = Vec::new();
  for path in files {
    let name = path
      .file_name()
      .map(|n| n.to_string_lossy().to_string())
      .unwrap_or_default();
    let Some((config, bench)) = parse_file_name(&name) else {
      continue;
    };
    let mut table = match Table::read_path(&path) {
      Ok(t) => t,
      Err(err) => {
        warn!(file = %name, error = %err, "failed to load counter file");
        continue;
      }
    };
    table.add_constant_column(CONFIG_COLUMN, Cell::Text(config));
    table.add_constant_column(TYPE_COLUMN, Cell::Text(bench.as_str().to_string()));
    table.add_constant_column(SOURCE_COLUMN, Cell::Text(name));
    tables.push(table);
  }
  Ok(Table::concat(tables))
}

/// Distinct values of a column in first-seen order.
pub fn distinct(table: &Table, col: usize) -> Vec<String> {
  let mut seen = HashSet::new();
  let mut out = Vec::new();
  for row in table.rows.iter() {
    let v = row[col].to_string();
    if seen.insert(v.clone()) {
      out.push(v);
    };
  }
  out
}

/// Finite numeric values of `metric` in rows where every `(column, value)` key matches.
fn subset_values(table: &Table, keys: &[(usize, &str)], metric: usize) -> Vec<f64> {
  table
    .rows
    .iter()
    .filter(|row| keys.iter().all(|(c, v)| row[*c].to_string() == *v))
    .filter_map(|row| row[metric].num())
    .filter(|v| v.is_finite())
    .collect()
}

/// One panel per key counter. Groups with no values or a zero sum are left out; absent counters give an empty panel.
fn comparison_panels(
  table: &Table,
  key_col: usize,
  groups: &[(String, String)],
  title: impl Fn(&str) -> String,
) -> Vec<BoxPanel> {
  KEY_COUNTERS
    .iter()
    .map(|metric| {
      let groups = match table.column(metric) {
        None => Vec::new(),
        Some(m) => groups
          .iter()
          .map(|(label, key)| {
            let values = subset_values(table, &[(key_col, key.as_str())], m);
            (label.clone(), values)
          })
          .filter(|(_, v)| !v.is_empty() && v.iter().sum::<f64>() != 0.0)
          .collect(),
      };
      BoxPanel {
        title: title(metric),
        groups,
      }
    })
    .collect()
}

pub fn config_panels(table: &Table) -> Vec<BoxPanel> {
  let Some(c) = table.column(CONFIG_COLUMN) else {
    return Vec::new();
  };
  let groups = distinct(table, c)
    .into_iter()
    .map(|g| (g.clone(), g))
    .collect::<Vec<_>>();
  comparison_panels(table, c, &groups, |m| format!("{m} by Configuration"))
}

/// POSIX against HDF5. Empty when fewer than two benchmark types are present.
pub fn type_panels(table: &Table) -> Vec<BoxPanel> {
  let Some(c) = table.column(TYPE_COLUMN) else {
    return Vec::new();
  };
  if distinct(table, c).len() < 2 {
    return Vec::new();
  };
  let groups = [BenchType::Posix, BenchType::Hdf5]
    .iter()
    .map(|b| (b.as_str().to_uppercase(), b.as_str().to_string()))
    .collect::<Vec<_>>();
  comparison_panels(table, c, &groups, |m| format!("{m}: POSIX vs HDF5"))
}

/// Mean of each key counter per configuration and benchmark type. Counters the table doesn't have are 0; a subset with no values for a counter gets an empty cell.
pub fn performance_summary(table: &Table) -> Table {
  let mut columns = vec!["Configuration".to_string(), "Benchmark Type".to_string()];
  columns.extend(SUMMARY_METRICS.iter().map(|(name, _)| name.to_string()));
  let mut out = Table::new(columns);
  let (Some(cc), Some(tc)) = (table.column(CONFIG_COLUMN), table.column(TYPE_COLUMN)) else {
    return out;
  };
  let types = distinct(table, tc);
  for config in distinct(table, cc) {
    for bench in types.iter() {
      let keys = [(cc, config.as_str()), (tc, bench.as_str())];
      let present = table
        .rows
        .iter()
        .any(|row| keys.iter().all(|(c, v)| row[*c].to_string() == *v));
      if !present {
        continue;
      };
      let mut row = vec![Cell::Text(config.clone()), Cell::Text(bench.clone())];
      row.extend(SUMMARY_METRICS.iter().map(|(_, counter)| {
        match table.column(counter) {
          None => Cell::Num(0.0),
          Some(m) => mean(&subset_values(table, &keys, m))
            .map(Cell::Num)
            .unwrap_or(Cell::Empty),
        }
      }));
      out.push_row(row);
    }
  }
  out
}

/// Right-aligned plain-text rendering for the terminal.
pub fn format_table(table: &Table) -> String {
  let cells = table
    .rows
    .iter()
    .map(|row| row.iter().map(|c| c.to_string()).collect::<Vec<_>>())
    .collect::<Vec<_>>();
  let widths = table
    .columns
    .iter()
    .enumerate()
    .map(|(i, h)| {
      cells
        .iter()
        .map(|r| r[i].len())
        .chain([h.len()])
        .max()
        .unwrap_or(0)
    })
    .collect::<Vec<_>>();
  let line = |fields: Vec<&str>| {
    fields
      .iter()
      .zip(widths.iter())
      .map(|(f, &w)| format!("{f:>w$}"))
      .collect::<Vec<_>>()
      .join(" ")
  };
  let mut out = String::new();
  let _ = writeln!(out, "{}", line(table.columns.iter().map(|s| s.as_str()).collect()));
  for r in cells.iter() {
    let _ = writeln!(out, "{}", line(r.iter().map(|s| s.as_str()).collect()));
  }
  out
}

pub fn render(table: &Table, dir: &Path) -> ChartResult {
  boxplot_grid_png(&dir.join(CONFIG_CHART_FILE), (2, 3), &config_panels(table))?;
  info!("configuration comparison chart saved");
  let by_type = type_panels(table);
  if !by_type.is_empty() {
    boxplot_grid_png(&dir.join(TYPE_CHART_FILE), (2, 3), &by_type)?;
    info!("benchmark type comparison chart saved");
  };
  Ok(())
}
