use crate::counter::Counter;
use crate::counter::CounterValues;
use crate::extract::split_counter_line;
use crate::extract::ExtractStats;
use crate::normalize::log10_positive;
use crate::table::Cell;
use crate::table::Table;
use once_cell::sync::Lazy;
use regex::Regex;
use strum::EnumCount;

static NPROCS_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"nprocs:\s*(\d+)").unwrap());

pub const HDF5_COLUMNS: [&str; 5] = [
  "HDF5_OPENS",
  "HDF5_READS",
  "HDF5_WRITES",
  "HDF5_BYTES_READ",
  "HDF5_BYTES_WRITTEN",
];

/// Output slot for an HDF5 counter. Darshan's H5F/H5D modules and older HDF5_* names both land in the same columns.
fn hdf5_slot(name: &str) -> Option<usize> {
  Some(match name {
    "HDF5_OPENS" | "H5F_OPENS" => 0,
    "HDF5_READS" | "H5D_READS" => 1,
    "HDF5_WRITES" | "H5D_WRITES" => 2,
    "HDF5_BYTES_READ" | "H5D_BYTES_READ" => 3,
    "HDF5_BYTES_WRITTEN" | "H5D_BYTES_WRITTEN" => 4,
    _ => return None,
  })
}

pub struct Summary {
  pub nprocs: u64,
  pub counters: CounterValues,
  /// Only filled when HDF5 counters were requested.
  pub hdf5: Option<[f64; 5]>,
  pub stats: ExtractStats,
}

/// Sums counters over every rank of one job. `nprocs` comes from the dump's `# nprocs:` header and is 0 if there isn't one.
pub fn summarize(text: &str, hdf5: bool) -> Summary {
  let nprocs = NPROCS_RE
    .captures(text)
    .and_then(|c| c.get(1))
    .and_then(|m| m.as_str().parse().ok())
    .unwrap_or(0);
  let mut counters = [0.0; Counter::COUNT];
  let mut hdf5_values = [0.0; 5];
  let mut stats = ExtractStats::default();
  for line in text.lines() {
    let posix = line.starts_with("POSIX") || line.starts_with("LUSTRE");
    let h5 = hdf5 && (line.starts_with("HDF5") || line.starts_with("H5F") || line.starts_with("H5D"));
    if !posix && !h5 {
      continue;
    };
    stats.candidates += 1;
    let Some((_, name, value)) = split_counter_line(line) else {
      stats.dropped += 1;
      continue;
    };
    if posix {
      if let Ok(c) = name.parse::<Counter>() {
        counters[c as usize] += value;
        stats.accumulated += 1;
      };
    } else if let Some(slot) = hdf5_slot(name) {
      hdf5_values[slot] += value;
      stats.accumulated += 1;
    };
  }
  Summary {
    nprocs,
    counters,
    hdf5: hdf5.then_some(hdf5_values),
    stats,
  }
}

impl Summary {
  pub fn label(&self) -> &'static str {
    if self.hdf5.is_some() {
      "ior_hdf5_benchmark"
    } else {
      "ior_benchmark"
    }
  }

  /// A one-row table: `nprocs`, the written counters, any HDF5 columns, then the text `tag`. Every number is passed through `log10_positive`.
  pub fn to_table(&self) -> Table {
    let mut columns = vec!["nprocs".to_string()];
    columns.extend(Counter::written().map(|c| c.name().to_string()));
    let mut row = vec![Cell::Num(log10_positive(self.nprocs as f64))];
    row.extend(Counter::written().map(|c| Cell::Num(log10_positive(self.counters[c as usize]))));
    if let Some(h) = &self.hdf5 {
      columns.extend(HDF5_COLUMNS.iter().map(|c| c.to_string()));
      row.extend(h.iter().map(|&v| Cell::Num(log10_positive(v))));
    };
    columns.push("tag".to_string());
    row.push(Cell::Text(self.label().to_string()));
    let mut table = Table::new(columns);
    table.push_row(row);
    table
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  const DUMP: &str = "# darshan log version: 3.41\n\
# nprocs: 16\n\
POSIX\t0\t11\tPOSIX_OPENS\t10\t/f\t/\tlustre\n\
POSIX\t1\t11\tPOSIX_OPENS\t90\t/f\t/\tlustre\n\
POSIX\t1\t11\tPOSIX_BYTES_WRITTEN\t1000\t/f\t/\tlustre\n\
H5F\t-1\t12\tH5F_OPENS\t100\t/f\t/\tlustre\n\
H5D\t-1\t13\tH5D_BYTES_WRITTEN\t1e6\t/f\t/\tlustre\n\
HDF5\t0\t13\tHDF5_READS\tbad\t/f\t/\tlustre\n";

  fn approx(cell: &Cell, v: f64) -> bool {
    (cell.num().unwrap() - v).abs() < 1e-12
  }

  #[test]
  fn test_posix_summary() {
    let s = summarize(DUMP, false);
    assert_eq!(s.nprocs, 16);
    assert_eq!(s.counters[Counter::PosixOpens as usize], 100.0);
    assert!(s.hdf5.is_none());
    let t = s.to_table();
    assert_eq!(t.columns.len(), 46);
    assert_eq!(t.columns[45], "tag");
    let row = &t.rows[0];
    assert!(approx(&row[0], 16f64.log10()));
    assert!(approx(&row[1], 2.0));
    assert_eq!(row[2], Cell::Num(0.0));
    assert_eq!(row[45], Cell::Text("ior_benchmark".to_string()));
  }

  #[test]
  fn test_hdf5_summary() {
    let s = summarize(DUMP, true);
    let h = s.hdf5.unwrap();
    assert_eq!(h[0], 100.0);
    assert_eq!(h[4], 1e6);
    assert_eq!(s.stats.dropped, 1);
    let t = s.to_table();
    assert_eq!(t.columns.len(), 51);
    assert_eq!(t.columns[45], "HDF5_OPENS");
    let row = &t.rows[0];
    assert!(approx(&row[45], 2.0));
    assert!(approx(&row[49], 6.0));
    assert_eq!(row[50], Cell::Text("ior_hdf5_benchmark".to_string()));
  }

  #[test]
  fn test_missing_header() {
    let s = summarize("POSIX\t0\t1\tPOSIX_READS\t5\n", false);
    assert_eq!(s.nprocs, 0);
    assert_eq!(s.to_table().rows[0][0], Cell::Num(0.0));
  }
}
