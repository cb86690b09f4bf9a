use crate::chart::heatmap_png;
use crate::chart::ChartResult;
use crate::coverage::is_nonzero;
use darshan_counters::table::Table;
use std::path::Path;

/// Which numeric counters each row reports as non-zero.
#[derive(Clone, Debug, PartialEq)]
pub struct Presence {
  pub columns: Vec<String>,
  /// One entry per table row, one flag per column.
  pub matrix: Vec<Vec<bool>>,
}

pub fn presence(table: &Table, exclude: &[String]) -> Presence {
  let cols = table
    .numeric_columns()
    .into_iter()
    .filter(|&c| !exclude.contains(&table.columns[c]))
    .collect::<Vec<_>>();
  Presence {
    columns: cols.iter().map(|&c| table.columns[c].clone()).collect(),
    matrix: table
      .rows
      .iter()
      .map(|row| cols.iter().map(|&c| is_nonzero(&row[c])).collect())
      .collect(),
  }
}

impl Presence {
  pub fn render(&self, out: &Path) -> ChartResult {
    heatmap_png(
      out,
      "Presence Matrix: Non-Zero Counters per Config",
      ("Counters", "Configs (rows)"),
      &self.columns,
      &[],
      &self.matrix,
    )
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn test_presence() {
    let t = Table::read("test_id,a,name,b\n1,0,x,5\n2,3,y,\n".as_bytes()).unwrap();
    let p = presence(&t, &["test_id".to_string()]);
    assert_eq!(p.columns, vec!["a", "b"]);
    assert_eq!(p.matrix, vec![vec![false, true], vec![true, false]]);
  }

  #[test]
  fn test_render() {
    let t = Table::read("a,b\n0,NaN\n3,\n".as_bytes()).unwrap();
    let dir = tempfile::tempdir().unwrap();
    let out = dir.path().join("presence.png");
    presence(&t, &[]).render(&out).unwrap();
    assert!(std::fs::metadata(&out).unwrap().len() > 0);
  }
}
