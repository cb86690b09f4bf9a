use crate::table::Cell;
use crate::table::Table;
use crate::table::TableError;
use crate::table::TableResult;

pub fn log10_positive(x: f64) -> f64 {
  if x > 0.0 {
    x.log10()
  } else {
    0.0
  }
}

/// log10(x + 1). Maps 0 to 0.
pub fn log1p10(x: f64) -> f64 {
  (x + 1.0).log10()
}

/// Numeric columns whose names aren't excluded.
fn target_columns(table: &Table, exclude: &[String]) -> Vec<usize> {
  table
    .numeric_columns()
    .into_iter()
    .filter(|&c| !exclude.contains(&table.columns[c]))
    .collect()
}

fn map_columns(table: &mut Table, cols: &[usize], f: impl Fn(f64) -> f64) {
  for row in table.rows.iter_mut() {
    for &c in cols {
      if let Cell::Num(v) = row[c] {
        row[c] = Cell::Num(f(v));
      };
    }
  }
}

fn names(table: &Table, cols: &[usize]) -> Vec<String> {
  cols.iter().map(|&c| table.columns[c].clone()).collect()
}

/// Applies log10(x + 1) to every numeric column not excluded. Returns the names of the columns that changed.
pub fn normalize_log(table: &mut Table, exclude: &[String]) -> Vec<String> {
  let cols = target_columns(table, exclude);
  map_columns(table, &cols, log1p10);
  names(table, &cols)
}

/// Divides each row's numeric, non-excluded cells by their Euclidean norm. Empty cells count as 0 and stay empty; an all-zero row stays all zero.
pub fn normalize_l2(table: &mut Table, exclude: &[String]) -> Vec<String> {
  let cols = target_columns(table, exclude);
  for row in table.rows.iter_mut() {
    let mut norm = cols
      .iter()
      .filter_map(|&c| row[c].num())
      .map(|v| v * v)
      .sum::<f64>()
      .sqrt();
    if norm == 0.0 {
      norm = 1.0;
    };
    for &c in cols.iter() {
      if let Cell::Num(v) = row[c] {
        row[c] = Cell::Num(v / norm);
      };
    }
  }
  names(table, &cols)
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct TagScale {
  pub raw_max: f64,
  pub divisor: f64,
}

impl TagScale {
  /// Picks the divisor so the largest raw tag lands at `target_max` after scaling.
  pub fn new(raw_max: f64, target_max: f64) -> TagScale {
    TagScale {
      raw_max,
      divisor: (raw_max + 1.0) / 10f64.powf(target_max),
    }
  }

  pub fn apply(&self, raw: f64) -> f64 {
    log1p10(raw / self.divisor)
  }
}

/// Like `normalize_log`, but the tag column is rescaled with `TagScale` instead.
pub fn normalize_log_scaled_tag(
  table: &mut Table,
  target_max: f64,
  exclude: &[String],
) -> TableResult<TagScale> {
  let tag = table.require_column("tag")?;
  if !table.is_numeric(tag) {
    return Err(TableError::NonNumeric("tag".to_string()));
  };
  let raw_max = table
    .values(tag)
    .into_iter()
    .fold(f64::NEG_INFINITY, f64::max);
  let scale = TagScale::new(if raw_max.is_finite() { raw_max } else { 0.0 }, target_max);

  let cols = target_columns(table, exclude)
    .into_iter()
    .filter(|&c| c != tag)
    .collect::<Vec<_>>();
  map_columns(table, &cols, log1p10);
  map_columns(table, &[tag], |v| scale.apply(v));
  Ok(scale)
}

#[cfg(test)]
mod tests {
  use super::*;

  fn approx(a: f64, b: f64) -> bool {
    (a - b).abs() < 1e-12
  }

  fn nums(row: &[Cell]) -> Vec<f64> {
    row.iter().map(|c| c.num().unwrap()).collect()
  }

  #[test]
  fn test_log_functions() {
    assert_eq!(log1p10(0.0), 0.0);
    assert!(approx(log1p10(9.0), 1.0));
    assert_eq!(log10_positive(0.0), 0.0);
    assert_eq!(log10_positive(-5.0), 0.0);
    assert!(approx(log10_positive(1000.0), 3.0));
  }

  #[test]
  fn test_log_skips_excluded_and_text() {
    let mut t = Table::read("test_id,name,a,b\n7,x,0,9\n".as_bytes()).unwrap();
    let changed = normalize_log(&mut t, &["test_id".to_string()]);
    assert_eq!(changed, vec!["a", "b"]);
    assert_eq!(t.rows[0][0], Cell::Num(7.0));
    assert_eq!(t.rows[0][1], Cell::Text("x".to_string()));
    assert_eq!(t.rows[0][2], Cell::Num(0.0));
    assert!(approx(t.rows[0][3].num().unwrap(), 1.0));
  }

  #[test]
  fn test_l2() {
    let mut t = Table::read("a,b\n3,4\n0,0\n".as_bytes()).unwrap();
    normalize_l2(&mut t, &[]);
    let r0 = nums(&t.rows[0]);
    assert!(approx(r0[0], 0.6));
    assert!(approx(r0[1], 0.8));
    assert_eq!(nums(&t.rows[1]), vec![0.0, 0.0]);
  }

  #[test]
  fn test_l2_keeps_column_order_and_excluded_values() {
    let mut t = Table::read("tag,a,test_id,b\n100,3,5,4\n".as_bytes()).unwrap();
    normalize_l2(&mut t, &["tag".to_string(), "test_id".to_string()]);
    assert_eq!(t.columns, vec!["tag", "a", "test_id", "b"]);
    let r = nums(&t.rows[0]);
    assert_eq!(r[0], 100.0);
    assert!(approx(r[1], 0.6));
    assert_eq!(r[2], 5.0);
    assert!(approx(r[3], 0.8));
  }

  #[test]
  fn test_l2_empty_cells_stay_empty() {
    let mut t = Table::read("a,b,c\n3,,4\n".as_bytes()).unwrap();
    normalize_l2(&mut t, &[]);
    assert!(approx(t.rows[0][0].num().unwrap(), 0.6));
    assert_eq!(t.rows[0][1], Cell::Empty);
    assert!(approx(t.rows[0][2].num().unwrap(), 0.8));
  }

  #[test]
  fn test_scaled_tag() {
    let mut t = Table::read("nprocs,tag\n0,999\n1,0\n".as_bytes()).unwrap();
    let scale = normalize_log_scaled_tag(&mut t, 2.0, &[]).unwrap();
    assert_eq!(scale.raw_max, 999.0);
    assert!(approx(scale.divisor, 10.0));
    assert!(approx(t.rows[0][1].num().unwrap(), (999.0f64 / 10.0 + 1.0).log10()));
    assert_eq!(t.rows[1][1], Cell::Num(0.0));
    assert!(approx(t.rows[1][0].num().unwrap(), 2f64.log10()));
  }

  #[test]
  fn test_scaled_tag_requires_tag() {
    let mut t = Table::read("a\n1\n".as_bytes()).unwrap();
    assert!(matches!(
      normalize_log_scaled_tag(&mut t, 4.0, &[]),
      Err(TableError::MissingColumn(_))
    ));
  }
}
