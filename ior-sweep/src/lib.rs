pub mod diversity;
pub mod space;
pub mod targeted;

use serde::de;
use serde::Deserialize;
use serde::Deserializer;
use serde::Serialize;
use serde::Serializer;
use std::error::Error;
use std::fmt;
use std::fmt::Display;
use std::fs::File;
use std::io;
use std::path::Path;
use std::str::FromStr;
use tracing::warn;

/// Column order of a configuration table. `ConfigRow` serializes in exactly this order.
pub const HEADER: [&str; 14] = [
  "config_id",
  "testFile",
  "api",
  "transferSize",
  "blockSize",
  "segmentCount",
  "numTasks",
  "filePerProc",
  "useStridedDatatype",
  "setAlignment",
  "useO_DIRECT",
  "fsync",
  "LUSTRE_STRIPE_SIZE",
  "LUSTRE_STRIPE_WIDTH",
];

/// The benchmark parameter columns, i.e. everything except the identifier and test file.
pub const PARAMETER_COLUMNS: [&str; 12] = [
  "api",
  "transferSize",
  "blockSize",
  "segmentCount",
  "numTasks",
  "filePerProc",
  "useStridedDatatype",
  "setAlignment",
  "useO_DIRECT",
  "fsync",
  "LUSTRE_STRIPE_SIZE",
  "LUSTRE_STRIPE_WIDTH",
];

pub type SweepResult<T> = Result<T, SweepError>;

#[derive(Debug)]
pub enum SweepError {
  Csv(csv::Error),
  InvalidSize(String),
  Io(io::Error),
  Yaml(serde_yaml::Error),
}

impl Display for SweepError {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match self {
      SweepError::Csv(e) => write!(f, "failed to read or write configuration table: {e}"),
      SweepError::InvalidSize(s) => write!(f, "{s:?} is not a valid IOR size"),
      SweepError::Io(e) => write!(f, "I/O error: {e}"),
      SweepError::Yaml(e) => write!(f, "failed to parse sweep config: {e}"),
    }
  }
}

impl Error for SweepError {}

impl From<csv::Error> for SweepError {
  fn from(e: csv::Error) -> Self {
    SweepError::Csv(e)
  }
}

impl From<io::Error> for SweepError {
  fn from(e: io::Error) -> Self {
    SweepError::Io(e)
  }
}

impl From<serde_yaml::Error> for SweepError {
  fn from(e: serde_yaml::Error) -> Self {
    SweepError::Yaml(e)
  }
}

#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug, Deserialize, Serialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Api {
  Posix,
  Mpiio,
  Hdf5,
}

impl Display for Api {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(match self {
      Api::Posix => "POSIX",
      Api::Mpiio => "MPIIO",
      Api::Hdf5 => "HDF5",
    })
  }
}

const KIB: u64 = 1024;
const MIB: u64 = 1024 * KIB;
const GIB: u64 = 1024 * MIB;
const TIB: u64 = 1024 * GIB;

/// A byte count written in IOR's suffix notation (`4K`, `1M`, `1G`). Suffixes are powers of 1024.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Debug)]
pub struct IorSize(u64);

impl IorSize {
  pub const fn b(n: u64) -> Self {
    Self(n)
  }

  pub const fn k(n: u64) -> Self {
    Self(n * KIB)
  }

  pub const fn m(n: u64) -> Self {
    Self(n * MIB)
  }

  pub const fn g(n: u64) -> Self {
    Self(n * GIB)
  }

  pub fn bytes(self) -> u64 {
    self.0
  }
}

impl Display for IorSize {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    let n = self.0;
    if n == 0 {
      return write!(f, "0");
    };
    for (unit, suffix) in [(TIB, "T"), (GIB, "G"), (MIB, "M"), (KIB, "K")] {
      if n % unit == 0 {
        return write!(f, "{}{}", n / unit, suffix);
      };
    }
    write!(f, "{n}")
  }
}

impl FromStr for IorSize {
  type Err = SweepError;

  fn from_str(s: &str) -> Result<Self, Self::Err> {
    let raw = s.trim();
    let invalid = || SweepError::InvalidSize(s.to_string());
    let (digits, unit) = match raw.char_indices().last() {
      Some((i, c)) if c.is_ascii_alphabetic() => {
        let unit = match c.to_ascii_uppercase() {
          'K' => KIB,
          'M' => MIB,
          'G' => GIB,
          'T' => TIB,
          _ => return Err(invalid()),
        };
        (&raw[..i], unit)
      }
      Some(_) => (raw, 1),
      None => return Err(invalid()),
    };
    let n: u64 = digits.parse().map_err(|_| invalid())?;
    n.checked_mul(unit).map(IorSize).ok_or_else(invalid)
  }
}

impl Serialize for IorSize {
  fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
    serializer.collect_str(self)
  }
}

struct IorSizeVisitor;

impl<'de> de::Visitor<'de> for IorSizeVisitor {
  type Value = IorSize;

  fn expecting(&self, f: &mut fmt::Formatter) -> fmt::Result {
    write!(f, "a byte count like 4K, 1M or 1G")
  }

  fn visit_u64<E: de::Error>(self, v: u64) -> Result<Self::Value, E> {
    Ok(IorSize(v))
  }

  fn visit_i64<E: de::Error>(self, v: i64) -> Result<Self::Value, E> {
    u64::try_from(v)
      .map(IorSize)
      .map_err(|_| E::invalid_value(de::Unexpected::Signed(v), &self))
  }

  fn visit_str<E: de::Error>(self, v: &str) -> Result<Self::Value, E> {
    v.parse().map_err(E::custom)
  }
}

impl<'de> Deserialize<'de> for IorSize {
  fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
    deserializer.deserialize_any(IorSizeVisitor)
  }
}

/// Boolean benchmark flags are written as `0`/`1`. Reading also accepts `true`/`false`.
mod flag {
  use serde::de;
  use serde::Deserializer;
  use serde::Serializer;
  use std::fmt;

  pub fn serialize<S: Serializer>(v: &bool, serializer: S) -> Result<S::Ok, S::Error> {
    serializer.serialize_u8(u8::from(*v))
  }

  struct FlagVisitor;

  impl<'de> de::Visitor<'de> for FlagVisitor {
    type Value = bool;

    fn expecting(&self, f: &mut fmt::Formatter) -> fmt::Result {
      write!(f, "0, 1, true or false")
    }

    fn visit_bool<E: de::Error>(self, v: bool) -> Result<bool, E> {
      Ok(v)
    }

    fn visit_u64<E: de::Error>(self, v: u64) -> Result<bool, E> {
      match v {
        0 => Ok(false),
        1 => Ok(true),
        _ => Err(E::invalid_value(de::Unexpected::Unsigned(v), &self)),
      }
    }

    fn visit_i64<E: de::Error>(self, v: i64) -> Result<bool, E> {
      match v {
        0 => Ok(false),
        1 => Ok(true),
        _ => Err(E::invalid_value(de::Unexpected::Signed(v), &self)),
      }
    }

    fn visit_str<E: de::Error>(self, v: &str) -> Result<bool, E> {
      match v.trim() {
        "0" | "false" | "False" => Ok(false),
        "1" | "true" | "True" => Ok(true),
        _ => Err(E::invalid_value(de::Unexpected::Str(v), &self)),
      }
    }
  }

  pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<bool, D::Error> {
    deserializer.deserialize_any(FlagVisitor)
  }
}

/// One point in the parameter space, before it is numbered.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Parameters {
  pub api: Api,
  pub transfer_size: IorSize,
  pub block_size: IorSize,
  pub segment_count: u64,
  pub num_tasks: u64,
  pub file_per_proc: bool,
  pub use_strided_datatype: bool,
  pub set_alignment: IorSize,
  pub use_o_direct: bool,
  pub fsync: bool,
  pub lustre_stripe_size: IorSize,
  pub lustre_stripe_width: u64,
}

#[derive(Clone, Debug, PartialEq, Eq, Deserialize, Serialize)]
pub struct ConfigRow {
  pub config_id: String,
  #[serde(rename = "testFile")]
  pub test_file: String,
  pub api: Api,
  #[serde(rename = "transferSize")]
  pub transfer_size: IorSize,
  #[serde(rename = "blockSize")]
  pub block_size: IorSize,
  #[serde(rename = "segmentCount")]
  pub segment_count: u64,
  #[serde(rename = "numTasks")]
  pub num_tasks: u64,
  #[serde(rename = "filePerProc", with = "flag")]
  pub file_per_proc: bool,
  #[serde(rename = "useStridedDatatype", with = "flag")]
  pub use_strided_datatype: bool,
  #[serde(rename = "setAlignment")]
  pub set_alignment: IorSize,
  #[serde(rename = "useO_DIRECT", with = "flag")]
  pub use_o_direct: bool,
  #[serde(with = "flag")]
  pub fsync: bool,
  #[serde(rename = "LUSTRE_STRIPE_SIZE")]
  pub lustre_stripe_size: IorSize,
  #[serde(rename = "LUSTRE_STRIPE_WIDTH")]
  pub lustre_stripe_width: u64,
}

impl ConfigRow {
  /// `n` is 1-based; the identifier is zero-padded to `width` digits.
  pub fn numbered(n: usize, width: usize, p: Parameters) -> Self {
    let config_id = format!("{:0width$}", n, width = width);
    Self {
      test_file: format!("test{}", config_id),
      config_id,
      api: p.api,
      transfer_size: p.transfer_size,
      block_size: p.block_size,
      segment_count: p.segment_count,
      num_tasks: p.num_tasks,
      file_per_proc: p.file_per_proc,
      use_strided_datatype: p.use_strided_datatype,
      set_alignment: p.set_alignment,
      use_o_direct: p.use_o_direct,
      fsync: p.fsync,
      lustre_stripe_size: p.lustre_stripe_size,
      lustre_stripe_width: p.lustre_stripe_width,
    }
  }

  /// IOR rejects runs whose block size is not a multiple of the transfer size.
  pub fn ior_compatible(&self) -> bool {
    let ts = self.transfer_size.bytes();
    ts != 0 && self.block_size.bytes() % ts == 0
  }

  /// Values of `PARAMETER_COLUMNS`, rendered the same way they appear in the CSV.
  pub fn parameter_values(&self) -> [String; 12] {
    [
      self.api.to_string(),
      self.transfer_size.to_string(),
      self.block_size.to_string(),
      self.segment_count.to_string(),
      self.num_tasks.to_string(),
      u8::from(self.file_per_proc).to_string(),
      u8::from(self.use_strided_datatype).to_string(),
      self.set_alignment.to_string(),
      u8::from(self.use_o_direct).to_string(),
      u8::from(self.fsync).to_string(),
      self.lustre_stripe_size.to_string(),
      self.lustre_stripe_width.to_string(),
    ]
  }
}

/// Digits needed to print `total`, which is the identifier width for a table of `total` rows.
pub fn pad_width(total: usize) -> usize {
  total.to_string().len()
}

pub fn write_rows<W: io::Write>(out: W, rows: &[ConfigRow]) -> SweepResult<()> {
  let mut wtr = csv::Writer::from_writer(out);
  if rows.is_empty() {
    wtr.write_record(HEADER)?;
  };
  for row in rows {
    wtr.serialize(row)?;
  }
  wtr.flush()?;
  Ok(())
}

pub fn write_rows_to_path(path: &Path, rows: &[ConfigRow]) -> SweepResult<()> {
  write_rows(File::create(path)?, rows)
}

/// Returns the parsed rows and how many malformed rows were skipped.
pub fn read_rows<R: io::Read>(input: R) -> SweepResult<(Vec<ConfigRow>, usize)> {
  let mut rdr = csv::Reader::from_reader(input);
  let mut rows = Vec::new();
  let mut skipped = 0;
  for res in rdr.deserialize::<ConfigRow>() {
    match res {
      Ok(row) => rows.push(row),
      Err(err) if err.is_io_error() => return Err(err.into()),
      Err(err) => {
        warn!(error = %err, "skipping malformed configuration row");
        skipped += 1;
      }
    };
  }
  Ok((rows, skipped))
}

pub fn read_rows_from_path(path: &Path) -> SweepResult<(Vec<ConfigRow>, usize)> {
  read_rows(File::open(path)?)
}

#[cfg(test)]
mod tests {
  use super::*;

  fn sample_row() -> ConfigRow {
    ConfigRow::numbered(7, 5, Parameters {
      api: Api::Hdf5,
      transfer_size: IorSize::k(64),
      block_size: IorSize::m(4),
      segment_count: 16,
      num_tasks: 4,
      file_per_proc: true,
      use_strided_datatype: false,
      set_alignment: IorSize::k(4),
      use_o_direct: true,
      fsync: false,
      lustre_stripe_size: IorSize::m(1),
      lustre_stripe_width: 4,
    })
  }

  #[test]
  fn test_ior_size_parse_and_display() {
    assert_eq!("4K".parse::<IorSize>().unwrap(), IorSize::k(4));
    assert_eq!("10k".parse::<IorSize>().unwrap().bytes(), 10 * 1024);
    assert_eq!("1G".parse::<IorSize>().unwrap(), IorSize::g(1));
    assert_eq!("512".parse::<IorSize>().unwrap(), IorSize::b(512));
    assert!("".parse::<IorSize>().is_err());
    assert!("4Q".parse::<IorSize>().is_err());
    assert!("M".parse::<IorSize>().is_err());

    assert_eq!(IorSize::k(100).to_string(), "100K");
    assert_eq!(IorSize::m(256).to_string(), "256M");
    assert_eq!(IorSize::k(1024).to_string(), "1M");
    assert_eq!(IorSize::b(1000).to_string(), "1000");
    assert_eq!(IorSize::b(0).to_string(), "0");
  }

  #[test]
  fn test_numbered_row() {
    let row = sample_row();
    assert_eq!(row.config_id, "00007");
    assert_eq!(row.test_file, "test00007");
  }

  #[test]
  fn test_csv_layout() {
    let mut out = Vec::new();
    write_rows(&mut out, &[sample_row()]).unwrap();
    let text = String::from_utf8(out).unwrap();
    let mut lines = text.lines();
    assert_eq!(lines.next().unwrap(), HEADER.join(","));
    assert_eq!(
      lines.next().unwrap(),
      "00007,test00007,HDF5,64K,4M,16,4,1,0,4K,1,0,1M,4"
    );
    assert!(lines.next().is_none());
  }

  #[test]
  fn test_empty_table_still_has_header() {
    let mut out = Vec::new();
    write_rows(&mut out, &[]).unwrap();
    assert_eq!(String::from_utf8(out).unwrap().trim_end(), HEADER.join(","));
  }

  #[test]
  fn test_read_skips_malformed_rows() {
    let input = format!(
      "{}\n{}\n{}\n",
      HEADER.join(","),
      "1,test1,POSIX,4K,1M,1,4,0,1,4K,0,1,1M,1",
      "2,test2,POSIX,4X,1M,1,4,0,1,4K,0,1,1M,1",
    );
    let (rows, skipped) = read_rows(input.as_bytes()).unwrap();
    assert_eq!(skipped, 1);
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0].config_id, "1");
    assert!(!rows[0].file_per_proc);
    assert!(rows[0].use_strided_datatype);
    assert!(rows[0].fsync);
  }

  #[test]
  fn test_file_round_trip_keeps_padded_ids() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("ior_configurations.csv");
    write_rows_to_path(&path, &[sample_row()]).unwrap();
    let (rows, skipped) = read_rows_from_path(&path).unwrap();
    assert_eq!(skipped, 0);
    assert_eq!(rows, vec![sample_row()]);
    assert!(read_rows_from_path(&dir.path().join("missing.csv")).is_err());
  }

  #[test]
  fn test_ior_compatible() {
    let mut row = sample_row();
    assert!(row.ior_compatible());
    row.transfer_size = IorSize::k(10);
    row.block_size = IorSize::m(1);
    assert!(!row.ior_compatible());
  }
}
