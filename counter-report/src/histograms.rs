use crate::chart::histogram_grid_png;
use crate::chart::histogram_png;
use crate::stats::finite;
use darshan_counters::table::Table;
use std::error::Error;
use std::fs;
use std::path::Path;
use tracing::info;
use tracing::warn;

pub const GRID: (usize, usize) = (3, 4);
pub const GRID_FILE: &str = "combined_grid_histograms_actual.png";

/// File name of a column's histogram. Path separators in the column name are replaced.
pub fn file_name(column: &str) -> String {
  format!("{}_hist_actual.png", column.replace(['/', '\\'], "_"))
}

pub fn plot_columns(table: &Table, exclude: &[String]) -> Vec<usize> {
  table
    .numeric_columns()
    .into_iter()
    .filter(|&c| !exclude.contains(&table.columns[c]))
    .collect()
}

/// Writes one histogram per column of raw values plus a grid of the first columns. Returns the number of single histograms written.
pub fn render(
  table: &Table,
  exclude: &[String],
  out_dir: &Path,
  bins: usize,
) -> Result<usize, Box<dyn Error>> {
  if bins == 0 {
    return Err("bin count must be at least 1".into());
  };
  fs::create_dir_all(out_dir)?;
  let cols = plot_columns(table, exclude);
  let mut written = 0;
  for &c in cols.iter() {
    let name = &table.columns[c];
    let values = table.values(c);
    if finite(&values).is_empty() {
      warn!(column = %name, "no finite values, skipping histogram");
      continue;
    };
    let path = out_dir.join(file_name(name));
    histogram_png(&path, &format!("Histogram of {name}"), &values, bins)?;
    info!(column = %name, path = %path.display(), "saved histogram");
    written += 1;
  }

  let panels = cols
    .iter()
    .take(GRID.0 * GRID.1)
    .map(|&c| (table.columns[c].clone(), table.values(c)))
    .collect::<Vec<_>>();
  let grid = out_dir.join(GRID_FILE);
  histogram_grid_png(&grid, GRID, &panels, bins)?;
  info!(panels = panels.len(), path = %grid.display(), "saved combined grid");
  Ok(written)
}
