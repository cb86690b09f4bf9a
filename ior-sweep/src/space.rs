use crate::pad_width;
use crate::Api;
use crate::ConfigRow;
use crate::IorSize;
use crate::Parameters;
use itertools::Itertools;
use rand::seq::SliceRandom;
use rand::Rng;
use serde::Deserialize;
use serde::Serialize;

fn default_apis() -> Vec<Api> {
  vec![Api::Posix, Api::Hdf5]
}

fn default_transfer_sizes() -> Vec<IorSize> {
  vec![IorSize::k(4), IorSize::k(64), IorSize::m(1)]
}

fn default_block_sizes() -> Vec<IorSize> {
  vec![IorSize::m(1), IorSize::m(4), IorSize::m(16)]
}

fn default_segment_counts() -> Vec<u64> {
  vec![1, 16, 256]
}

fn default_num_tasks() -> Vec<u64> {
  vec![4, 16, 64]
}

fn default_flag() -> Vec<u8> {
  vec![0, 1]
}

fn default_alignments() -> Vec<IorSize> {
  vec![IorSize::k(4), IorSize::m(1)]
}

fn default_lustre_stripe_sizes() -> Vec<IorSize> {
  vec![IorSize::m(1), IorSize::m(4)]
}

fn default_lustre_stripe_widths() -> Vec<u64> {
  vec![1, 4]
}

/// Allowed values for every benchmark parameter. Flags are listed as `0`/`1`; any non-zero value means set.
#[derive(Clone, Debug, PartialEq, Eq, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct ParameterSpace {
  #[serde(default = "default_apis")]
  pub apis: Vec<Api>,
  #[serde(default = "default_transfer_sizes")]
  pub transfer_sizes: Vec<IorSize>,
  #[serde(default = "default_block_sizes")]
  pub block_sizes: Vec<IorSize>,
  #[serde(default = "default_segment_counts")]
  pub segment_counts: Vec<u64>,
  #[serde(default = "default_num_tasks")]
  pub num_tasks: Vec<u64>,
  #[serde(default = "default_flag")]
  pub file_per_proc: Vec<u8>,
  #[serde(default = "default_flag")]
  pub use_strided_datatype: Vec<u8>,
  #[serde(default = "default_alignments")]
  pub set_alignment: Vec<IorSize>,
  #[serde(default = "default_flag")]
  pub use_o_direct: Vec<u8>,
  #[serde(default = "default_flag")]
  pub fsync: Vec<u8>,
  #[serde(default = "default_lustre_stripe_sizes")]
  pub lustre_stripe_sizes: Vec<IorSize>,
  #[serde(default = "default_lustre_stripe_widths")]
  pub lustre_stripe_widths: Vec<u64>,
}

impl Default for ParameterSpace {
  fn default() -> Self {
    Self {
      apis: default_apis(),
      transfer_sizes: default_transfer_sizes(),
      block_sizes: default_block_sizes(),
      segment_counts: default_segment_counts(),
      num_tasks: default_num_tasks(),
      file_per_proc: default_flag(),
      use_strided_datatype: default_flag(),
      set_alignment: default_alignments(),
      use_o_direct: default_flag(),
      fsync: default_flag(),
      lustre_stripe_sizes: default_lustre_stripe_sizes(),
      lustre_stripe_widths: default_lustre_stripe_widths(),
    }
  }
}

impl ParameterSpace {
  /// List lengths in column order. The last dimension varies fastest during enumeration.
  fn dimensions(&self) -> [usize; 12] {
    [
      self.apis.len(),
      self.transfer_sizes.len(),
      self.block_sizes.len(),
      self.segment_counts.len(),
      self.num_tasks.len(),
      self.file_per_proc.len(),
      self.use_strided_datatype.len(),
      self.set_alignment.len(),
      self.use_o_direct.len(),
      self.fsync.len(),
      self.lustre_stripe_sizes.len(),
      self.lustre_stripe_widths.len(),
    ]
  }

  pub fn combinations(&self) -> usize {
    self.dimensions().iter().product()
  }

  fn at(&self, idx: &[usize]) -> Parameters {
    Parameters {
      api: self.apis[idx[0]],
      transfer_size: self.transfer_sizes[idx[1]],
      block_size: self.block_sizes[idx[2]],
      segment_count: self.segment_counts[idx[3]],
      num_tasks: self.num_tasks[idx[4]],
      file_per_proc: self.file_per_proc[idx[5]] != 0,
      use_strided_datatype: self.use_strided_datatype[idx[6]] != 0,
      set_alignment: self.set_alignment[idx[7]],
      use_o_direct: self.use_o_direct[idx[8]] != 0,
      fsync: self.fsync[idx[9]] != 0,
      lustre_stripe_size: self.lustre_stripe_sizes[idx[10]],
      lustre_stripe_width: self.lustre_stripe_widths[idx[11]],
    }
  }

  /// Every combination, in lexicographic order of list positions.
  pub fn enumerate(&self) -> Vec<ConfigRow> {
    let width = pad_width(self.combinations());
    self
      .dimensions()
      .into_iter()
      .map(|len| 0..len)
      .multi_cartesian_product()
      .enumerate()
      .map(|(i, idx)| ConfigRow::numbered(i + 1, width, self.at(&idx)))
      .collect()
  }

  /// Picks one value per list uniformly at random. Returns `None` if any list is empty.
  pub fn choose<R: Rng + ?Sized>(&self, rng: &mut R) -> Option<Parameters> {
    Some(Parameters {
      api: *self.apis.choose(rng)?,
      transfer_size: *self.transfer_sizes.choose(rng)?,
      block_size: *self.block_sizes.choose(rng)?,
      segment_count: *self.segment_counts.choose(rng)?,
      num_tasks: *self.num_tasks.choose(rng)?,
      file_per_proc: *self.file_per_proc.choose(rng)? != 0,
      use_strided_datatype: *self.use_strided_datatype.choose(rng)? != 0,
      set_alignment: *self.set_alignment.choose(rng)?,
      use_o_direct: *self.use_o_direct.choose(rng)? != 0,
      fsync: *self.fsync.choose(rng)? != 0,
      lustre_stripe_size: *self.lustre_stripe_sizes.choose(rng)?,
      lustre_stripe_width: *self.lustre_stripe_widths.choose(rng)?,
    })
  }
}
