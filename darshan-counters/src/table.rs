use ahash::HashMap;
use ahash::HashMapExt;
use std::cmp::Ordering;
use std::error::Error;
use std::fmt;
use std::fmt::Display;
use std::fs;
use std::fs::File;
use std::io;
use std::path::Path;
use tracing::warn;

pub type TableResult<T> = Result<T, TableError>;

#[derive(Debug)]
pub enum TableError {
  Csv(csv::Error),
  Io(io::Error),
  MissingColumn(String),
  NonNumeric(String),
}

impl Display for TableError {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match self {
      TableError::Csv(e) => write!(f, "CSV error: {e}"),
      TableError::Io(e) => write!(f, "I/O error: {e}"),
      TableError::MissingColumn(c) => write!(f, "table has no {c:?} column"),
      TableError::NonNumeric(c) => write!(f, "column {c:?} is not numeric"),
    }
  }
}

impl Error for TableError {}

impl From<csv::Error> for TableError {
  fn from(e: csv::Error) -> Self {
    TableError::Csv(e)
  }
}

impl From<io::Error> for TableError {
  fn from(e: io::Error) -> Self {
    TableError::Io(e)
  }
}

#[derive(Clone, Debug, PartialEq)]
pub enum Cell {
  Num(f64),
  Text(String),
  Empty,
}

impl Cell {
  pub fn parse(raw: &str) -> Cell {
    let s = raw.trim();
    if s.is_empty() {
      return Cell::Empty;
    };
    match s.parse::<f64>() {
      Ok(v) => Cell::Num(v),
      Err(_) => Cell::Text(s.to_string()),
    }
  }

  pub fn num(&self) -> Option<f64> {
    match self {
      Cell::Num(v) => Some(*v),
      _ => None,
    }
  }
}

impl Display for Cell {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match self {
      // NaN is written as a missing value.
      Cell::Num(v) if v.is_nan() => Ok(()),
      Cell::Num(v) if *v != 0.0 && v.is_finite() && (v.abs() >= 1e16 || v.abs() < 1e-4) => {
        write!(f, "{v:e}")
      }
      Cell::Num(v) => write!(f, "{v}"),
      Cell::Text(s) => f.write_str(s),
      Cell::Empty => Ok(()),
    }
  }
}

/// A CSV table with a header row. Column order is kept exactly as read.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Table {
  pub columns: Vec<String>,
  pub rows: Vec<Vec<Cell>>,
}

impl Table {
  pub fn new(columns: Vec<String>) -> Table {
    Table {
      columns,
      rows: Vec::new(),
    }
  }

  pub fn column(&self, name: &str) -> Option<usize> {
    self.columns.iter().position(|c| c == name)
  }

  pub fn require_column(&self, name: &str) -> TableResult<usize> {
    self
      .column(name)
      .ok_or_else(|| TableError::MissingColumn(name.to_string()))
  }

  /// A column is numeric when none of its cells are text. Empty cells don't count either way.
  pub fn is_numeric(&self, col: usize) -> bool {
    self
      .rows
      .iter()
      .all(|row| !matches!(row[col], Cell::Text(_)))
  }

  pub fn numeric_columns(&self) -> Vec<usize> {
    (0..self.columns.len())
      .filter(|&c| self.is_numeric(c))
      .collect()
  }

  /// Numeric values of a column, skipping empty and text cells.
  pub fn values(&self, col: usize) -> Vec<f64> {
    self.rows.iter().filter_map(|row| row[col].num()).collect()
  }

  pub fn push_row(&mut self, row: Vec<Cell>) {
    debug_assert_eq!(row.len(), self.columns.len());
    self.rows.push(row);
  }

  /// Appends a column holding the same value in every row.
  pub fn add_constant_column(&mut self, name: &str, value: Cell) {
    self.columns.push(name.to_string());
    for row in self.rows.iter_mut() {
      row.push(value.clone());
    }
  }

  /// Rows with the wrong number of fields are skipped with a warning.
  pub fn read<R: io::Read>(input: R) -> TableResult<Table> {
    let mut rdr = csv::Reader::from_reader(input);
    let columns = rdr
      .headers()?
      .iter()
      .map(|h| h.trim().to_string())
      .collect::<Vec<_>>();
    let mut table = Table::new(columns);
    for (i, res) in rdr.records().enumerate() {
      let record = match res {
        Ok(r) => r,
        Err(err) if err.is_io_error() => return Err(err.into()),
        Err(err) => {
          warn!(row = i + 1, error = %err, "skipping malformed row");
          continue;
        }
      };
      table.push_row(record.iter().map(Cell::parse).collect());
    }
    Ok(table)
  }

  pub fn read_path(path: &Path) -> TableResult<Table> {
    Table::read(File::open(path)?)
  }

  pub fn write<W: io::Write>(&self, out: W) -> TableResult<()> {
    let mut wtr = csv::Writer::from_writer(out);
    wtr.write_record(&self.columns)?;
    for row in self.rows.iter() {
      wtr.write_record(row.iter().map(|c| c.to_string()))?;
    }
    wtr.flush()?;
    Ok(())
  }

  /// Creates the parent directory if needed. Overwrites any existing file.
  pub fn write_path(&self, path: &Path) -> TableResult<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
      fs::create_dir_all(parent)?;
    };
    self.write(File::create(path)?)
  }

  /// Stacks tables vertically. Columns are the union in first-seen order; cells a table doesn't have are empty.
  pub fn concat(tables: Vec<Table>) -> Table {
    let mut columns = Vec::<String>::new();
    let mut index = HashMap::<String, usize>::new();
    for t in tables.iter() {
      for c in t.columns.iter() {
        if !index.contains_key(c) {
          index.insert(c.clone(), columns.len());
          columns.push(c.clone());
        };
      }
    }
    let mut out = Table::new(columns);
    for t in tables {
      let slots = t.columns.iter().map(|c| index[c]).collect::<Vec<_>>();
      for row in t.rows {
        let mut cells = vec![Cell::Empty; out.columns.len()];
        for (cell, &slot) in row.into_iter().zip(slots.iter()) {
          cells[slot] = cell;
        }
        out.rows.push(cells);
      }
    }
    out
  }

  /// Keeps only `test_id` and `tag`, ordered by ascending tag. Rows without a tag go last. Ties keep table order.
  pub fn sorted_by_tag(&self) -> TableResult<Table> {
    let id = self.require_column("test_id")?;
    let tag = self.require_column("tag")?;
    if !self.is_numeric(tag) {
      return Err(TableError::NonNumeric("tag".to_string()));
    };
    let mut rows = self
      .rows
      .iter()
      .map(|row| vec![row[id].clone(), row[tag].clone()])
      .collect::<Vec<_>>();
    rows.sort_by(|a, b| match (a[1].num(), b[1].num()) {
      (Some(x), Some(y)) => x.total_cmp(&y),
      (Some(_), None) => Ordering::Less,
      (None, Some(_)) => Ordering::Greater,
      (None, None) => Ordering::Equal,
    });
    Ok(Table {
      columns: vec!["test_id".to_string(), "tag".to_string()],
      rows,
    })
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn test_read_keeps_order_and_types() {
    let t = Table::read("b,a,name\n1,2.5,x\n,3,y\n".as_bytes()).unwrap();
    assert_eq!(t.columns, vec!["b", "a", "name"]);
    assert_eq!(t.rows[0], vec![Cell::Num(1.0), Cell::Num(2.5), Cell::Text("x".to_string())]);
    assert_eq!(t.rows[1][0], Cell::Empty);
    assert_eq!(t.numeric_columns(), vec![0, 1]);
    assert_eq!(t.values(0), vec![1.0]);
  }

  #[test]
  fn test_read_skips_short_rows() {
    let t = Table::read("a,b\n1,2\n3\n4,5\n".as_bytes()).unwrap();
    assert_eq!(t.rows.len(), 2);
    assert_eq!(t.rows[1], vec![Cell::Num(4.0), Cell::Num(5.0)]);
  }

  #[test]
  fn test_write() {
    let mut t = Table::new(vec!["nprocs".to_string(), "tag".to_string(), "label".to_string()]);
    t.push_row(vec![Cell::Num(-1.0), Cell::Num(0.5), Cell::Empty]);
    t.push_row(vec![Cell::Num(3.0), Cell::Num(1e11), Cell::Text("x".to_string())]);
    let mut out = Vec::new();
    t.write(&mut out).unwrap();
    assert_eq!(
      String::from_utf8(out).unwrap(),
      "nprocs,tag,label\n-1,0.5,\n3,100000000000,x\n"
    );
  }

  #[test]
  fn test_write_extreme_numbers() {
    let mut t = Table::new(vec!["a".to_string()]);
    for v in [f64::NAN, 1e300, 2.5e-7, 0.0, 1234.5, f64::NEG_INFINITY] {
      t.push_row(vec![Cell::Num(v)]);
    }
    let mut out = Vec::new();
    t.write(&mut out).unwrap();
    let text = String::from_utf8(out).unwrap();
    assert_eq!(text, "a\n\"\"\n1e300\n2.5e-7\n0\n1234.5\n-inf\n");

    let back = Table::read(text.as_bytes()).unwrap();
    assert_eq!(back.rows[0][0], Cell::Empty);
    assert_eq!(back.rows[1][0], Cell::Num(1e300));
    assert_eq!(back.rows[2][0], Cell::Num(2.5e-7));
    assert_eq!(back.rows[5][0], Cell::Num(f64::NEG_INFINITY));
  }

  #[test]
  fn test_concat_unions_columns() {
    let a = Table::read("x,y\n1,2\n".as_bytes()).unwrap();
    let b = Table::read("y,z\n3,4\n".as_bytes()).unwrap();
    let t = Table::concat(vec![a, b]);
    assert_eq!(t.columns, vec!["x", "y", "z"]);
    assert_eq!(t.rows[0], vec![Cell::Num(1.0), Cell::Num(2.0), Cell::Empty]);
    assert_eq!(t.rows[1], vec![Cell::Empty, Cell::Num(3.0), Cell::Num(4.0)]);
  }

  #[test]
  fn test_sorted_by_tag() {
    let t = Table::read("test_id,other,tag\n1,9,0.5\n2,9,\n3,9,0.1\n4,9,0.5\n".as_bytes()).unwrap();
    let sorted = t.sorted_by_tag().unwrap();
    assert_eq!(sorted.columns, vec!["test_id", "tag"]);
    let ids = sorted
      .rows
      .iter()
      .map(|r| r[0].to_string())
      .collect::<Vec<_>>();
    assert_eq!(ids, vec!["3", "1", "4", "2"]);
  }

  #[test]
  fn test_sorted_by_tag_needs_both_columns() {
    let t = Table::read("tag\n1\n".as_bytes()).unwrap();
    assert!(matches!(t.sorted_by_tag(), Err(TableError::MissingColumn(c)) if c == "test_id"));
  }
}
