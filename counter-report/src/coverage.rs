use crate::chart::bar_chart_png;
use crate::chart::heatmap_png;
use crate::chart::histogram_grid_png;
use crate::chart::ChartResult;
use crate::stats::describe;
use crate::stats::nonzero;
use crate::stats::pct;
use crate::stats::Describe;
use darshan_counters::table::Cell;
use darshan_counters::table::Table;
use std::fmt::Write;
use std::path::Path;
use tracing::info;

/// Counters an entry must have non-zero to count as complete.
pub const REQUIRED_COUNTERS: [&str; 7] = [
  "POSIX_OPENS",
  "POSIX_READS",
  "POSIX_WRITES",
  "POSIX_BYTES_READ",
  "POSIX_BYTES_WRITTEN",
  "POSIX_SEEKS",
  "POSIX_STATS",
];

pub const KEY_COUNTERS: [&str; 6] = [
  "nprocs",
  "POSIX_OPENS",
  "POSIX_READS",
  "POSIX_WRITES",
  "POSIX_BYTES_READ",
  "POSIX_BYTES_WRITTEN",
];

const HEATMAP_MARKERS: [&str; 6] = ["OPENS", "READS", "WRITES", "BYTES", "SEEKS", "STATS"];
const HEATMAP_LIMIT: usize = 15;
const DISTRIBUTION_BINS: usize = 30;

pub const HEATMAP_FILE: &str = "io_counter_coverage_heatmap.png";
pub const DISTRIBUTIONS_FILE: &str = "io_counter_distributions.png";
pub const SUMMARY_CHART_FILE: &str = "io_counter_coverage_summary.png";
pub const SUMMARY_TEXT_FILE: &str = "csv_analysis_summary.txt";

/// Empty cells and text are not non-zero.
pub fn is_nonzero(cell: &Cell) -> bool {
  matches!(cell, Cell::Num(v) if *v != 0.0)
}

pub fn nonzero_count(table: &Table, col: usize) -> usize {
  table.rows.iter().filter(|row| is_nonzero(&row[col])).count()
}

#[derive(Clone, Debug, PartialEq)]
pub struct Coverage {
  pub column: String,
  pub nonzero: usize,
  pub pct: f64,
}

#[derive(Clone, Debug)]
pub struct CoverageReport {
  pub rows: usize,
  pub columns: Vec<String>,
  /// Only columns with at least one empty cell.
  pub missing: Vec<(String, usize)>,
  pub posix: Vec<Coverage>,
  pub lustre_count: usize,
  pub complete: usize,
  pub key_stats: Vec<(String, Describe)>,
}

pub fn analyze(table: &Table) -> CoverageReport {
  let rows = table.rows.len();
  let missing = table
    .columns
    .iter()
    .enumerate()
    .map(|(c, name)| {
      let n = table
        .rows
        .iter()
        .filter(|row| row[c] == Cell::Empty)
        .count();
      (name.clone(), n)
    })
    .filter(|(_, n)| *n > 0)
    .collect();
  let posix = table
    .columns
    .iter()
    .enumerate()
    .filter(|(_, name)| name.starts_with("POSIX_"))
    .map(|(c, name)| {
      let n = nonzero_count(table, c);
      Coverage {
        column: name.clone(),
        nonzero: n,
        pct: pct(n, rows),
      }
    })
    .collect();
  let lustre_count = table
    .columns
    .iter()
    .filter(|c| c.starts_with("LUSTRE_"))
    .count();
  let required = REQUIRED_COUNTERS
    .iter()
    .filter_map(|c| table.column(c))
    .collect::<Vec<_>>();
  let complete = table
    .rows
    .iter()
    .filter(|row| required.iter().all(|&c| is_nonzero(&row[c])))
    .count();
  let key_stats = KEY_COUNTERS
    .iter()
    .filter_map(|name| {
      let d = describe(&table.values(table.column(name)?))?;
      Some((name.to_string(), d))
    })
    .collect();
  CoverageReport {
    rows,
    columns: table.columns.clone(),
    missing,
    posix,
    lustre_count,
    complete,
    key_stats,
  }
}

impl CoverageReport {
  pub fn total_missing(&self) -> usize {
    self.missing.iter().map(|(_, n)| n).sum()
  }

  pub fn complete_pct(&self) -> f64 {
    pct(self.complete, self.rows)
  }

  pub fn posix_count(&self) -> usize {
    self.posix.len()
  }

  /// Everything shown on the terminal.
  pub fn report_text(&self) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "=== Dataset Overview ===");
    let _ = writeln!(out, "Shape: ({}, {})", self.rows, self.columns.len());
    let _ = writeln!(out, "Columns: {}", self.columns.join(", "));
    let _ = writeln!(out, "\n=== Missing Values Analysis ===");
    for (c, n) in self.missing.iter() {
      let _ = writeln!(out, "  {c}: {n} ({:.1}%)", pct(*n, self.rows));
    }
    let _ = writeln!(out, "Total missing values: {}", self.total_missing());
    let _ = writeln!(out, "\n=== I/O Counter Coverage Analysis ===");
    let _ = writeln!(out, "POSIX counters found: {}", self.posix_count());
    let _ = writeln!(out, "Lustre counters found: {}", self.lustre_count);
    let _ = writeln!(out, "\n=== POSIX Counter Coverage ===");
    for c in self.posix.iter() {
      let _ = writeln!(out, "{}: {}/{} ({:.1}%)", c.column, c.nonzero, self.rows, c.pct);
    }
    let _ = writeln!(out, "\n=== Complete Data Analysis ===");
    let _ = writeln!(
      out,
      "Entries with all required POSIX counters: {}/{} ({:.1}%)",
      self.complete,
      self.rows,
      self.complete_pct()
    );
    let _ = writeln!(out, "\n=== Data Distribution Analysis ===");
    for (name, d) in self.key_stats.iter() {
      let _ = writeln!(out, "\n{name}:");
      let _ = writeln!(out, "  Min: {:.3}", d.min);
      let _ = writeln!(out, "  Max: {:.3}", d.max);
      let _ = writeln!(out, "  Mean: {:.3}", d.mean);
      let _ = writeln!(out, "  Std: {:.3}", d.std);
    }
    out
  }

  /// Contents of `csv_analysis_summary.txt`.
  pub fn summary_text(&self) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "CSV Data Analysis Summary");
    let _ = writeln!(out, "{}\n", "=".repeat(50));
    let _ = writeln!(out, "Total entries: {}", self.rows);
    let _ = writeln!(out, "Complete entries: {}", self.complete);
    let _ = writeln!(out, "Complete percentage: {:.1}%", self.complete_pct());
    let _ = writeln!(out, "Missing values: {}\n", self.total_missing());
    let _ = writeln!(out, "POSIX Counter Coverage:");
    for c in self.posix.iter() {
      let _ = writeln!(out, "  {}: {:.1}%", c.column, c.pct);
    }
    out
  }
}

/// POSIX columns shown in the coverage heatmap, in table order.
pub fn heatmap_columns(table: &Table) -> Vec<usize> {
  table
    .columns
    .iter()
    .enumerate()
    .filter(|(_, name)| {
      name.starts_with("POSIX_") && HEATMAP_MARKERS.iter().any(|m| name.contains(m))
    })
    .map(|(c, _)| c)
    .take(HEATMAP_LIMIT)
    .collect()
}

pub fn render(table: &Table, report: &CoverageReport, out_dir: &Path) -> ChartResult {
  let cols = heatmap_columns(table);
  if !cols.is_empty() {
    let labels = cols
      .iter()
      .map(|&c| table.columns[c].clone())
      .collect::<Vec<_>>();
    let matrix = cols
      .iter()
      .map(|&c| table.rows.iter().map(|row| is_nonzero(&row[c])).collect())
      .collect::<Vec<Vec<bool>>>();
    heatmap_png(
      &out_dir.join(HEATMAP_FILE),
      "I/O Counter Data Coverage (rows: counters, columns: entries)",
      ("Entry Index", "POSIX Counters"),
      &[],
      &labels,
      &matrix,
    )?;
    info!(counters = cols.len(), "coverage heatmap saved");
  };

  // Absent metrics leave their panel blank.
  let panels = KEY_COUNTERS
    .iter()
    .map(|name| {
      let values = table
        .column(name)
        .map(|c| nonzero(&table.values(c)))
        .unwrap_or_default();
      (format!("{name} (non-zero values only)"), values)
    })
    .collect::<Vec<_>>();
  histogram_grid_png(&out_dir.join(DISTRIBUTIONS_FILE), (2, 3), &panels, DISTRIBUTION_BINS)?;
  info!("distribution plots saved");

  let bars = REQUIRED_COUNTERS
    .iter()
    .filter_map(|name| {
      let c = table.column(name)?;
      let label = name.trim_start_matches("POSIX_").to_string();
      Some((label, pct(nonzero_count(table, c), report.rows)))
    })
    .collect::<Vec<_>>();
  if !bars.is_empty() {
    bar_chart_png(
      &out_dir.join(SUMMARY_CHART_FILE),
      "I/O Counter Coverage Percentage",
      bars,
    )?;
    info!("coverage summary chart saved");
  };
  Ok(())
}

#[cfg(test)]
mod tests {
  use super::*;

  const CSV: &str = "\
rank,nprocs,POSIX_OPENS,POSIX_READS,POSIX_WRITES,POSIX_BYTES_READ,POSIX_BYTES_WRITTEN,POSIX_SEEKS,POSIX_STATS,POSIX_MODE,LUSTRE_STRIPE_WIDTH,tag
0,4,1,2,3,4,5,6,7,0,1,a
1,4,1,0,3,4,5,6,7,0,1,b
2,4,1,2,3,4,5,6,,0,1,c
3,4,2,2,3,4,5,6,7,0,1,
";

  fn table() -> Table {
    Table::read(CSV.as_bytes()).unwrap()
  }

  #[test]
  fn test_is_nonzero() {
    assert!(is_nonzero(&Cell::Num(-1.0)));
    assert!(!is_nonzero(&Cell::Num(0.0)));
    assert!(!is_nonzero(&Cell::Empty));
    assert!(!is_nonzero(&Cell::Text("x".to_string())));
  }

  #[test]
  fn test_analyze() {
    let r = analyze(&table());
    assert_eq!(r.rows, 4);
    assert_eq!(r.posix_count(), 8);
    assert_eq!(r.lustre_count, 1);
    assert_eq!(
      r.missing,
      vec![("POSIX_STATS".to_string(), 1), ("tag".to_string(), 1)]
    );
    assert_eq!(r.total_missing(), 2);
    // Row 1 has no reads and row 2 has no stats.
    assert_eq!(r.complete, 2);
    assert_eq!(r.complete_pct(), 50.0);
    let reads = r.posix.iter().find(|c| c.column == "POSIX_READS").unwrap();
    assert_eq!(reads.nonzero, 3);
    assert_eq!(reads.pct, 75.0);
    let mode = r.posix.iter().find(|c| c.column == "POSIX_MODE").unwrap();
    assert_eq!(mode.nonzero, 0);
  }

  #[test]
  fn test_key_stats() {
    let r = analyze(&table());
    let names = r.key_stats.iter().map(|(n, _)| n.as_str()).collect::<Vec<_>>();
    assert_eq!(names, KEY_COUNTERS.to_vec());
    let opens = &r.key_stats[1].1;
    assert_eq!(opens.min, 1.0);
    assert_eq!(opens.max, 2.0);
    assert_eq!(opens.mean, 1.25);
    assert_eq!(r.key_stats[0].1.std, 0.0);
  }

  #[test]
  fn test_complete_ignores_absent_columns() {
    let t = Table::read("POSIX_OPENS,POSIX_READS\n1,1\n1,0\n".as_bytes()).unwrap();
    assert_eq!(analyze(&t).complete, 1);
  }

  #[test]
  fn test_heatmap_columns() {
    let t = table();
    let names = heatmap_columns(&t)
      .into_iter()
      .map(|c| t.columns[c].as_str())
      .collect::<Vec<_>>();
    assert_eq!(names, REQUIRED_COUNTERS.to_vec());

    let many = (0..20)
      .map(|i| format!("POSIX_BYTES_{i}"))
      .collect::<Vec<_>>();
    let wide = Table::new(many);
    assert_eq!(heatmap_columns(&wide), (0..15).collect::<Vec<_>>());
  }

  #[test]
  fn test_summary_text() {
    let text = analyze(&table()).summary_text();
    assert!(text.starts_with("CSV Data Analysis Summary\n"));
    assert!(text.contains("Total entries: 4\n"));
    assert!(text.contains("Complete entries: 2\n"));
    assert!(text.contains("Complete percentage: 50.0%\n"));
    assert!(text.contains("Missing values: 2\n"));
    assert!(text.contains("  POSIX_READS: 75.0%\n"));
  }

  #[test]
  fn test_report_text() {
    let text = analyze(&table()).report_text();
    assert!(text.contains("Shape: (4, 12)"));
    assert!(text.contains("POSIX counters found: 8"));
    assert!(text.contains("  tag: 1 (25.0%)"));
    assert!(text.contains("POSIX_OPENS: 4/4 (100.0%)"));
    assert!(text.contains("  Mean: 1.250"));
  }

  #[test]
  fn test_render_writes_charts() {
    let mut t = table();
    t.rows[0][1] = Cell::Num(f64::NEG_INFINITY);
    t.rows[1][2] = Cell::Num(f64::NAN);
    let r = analyze(&t);
    let dir = tempfile::tempdir().unwrap();
    render(&t, &r, dir.path()).unwrap();
    for name in [HEATMAP_FILE, DISTRIBUTIONS_FILE, SUMMARY_CHART_FILE] {
      let meta = std::fs::metadata(dir.path().join(name)).unwrap();
      assert!(meta.len() > 0, "{name} is empty");
    }
  }
}
