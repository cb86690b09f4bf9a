use crate::pad_width;
use crate::space::ParameterSpace;
use crate::Api;
use crate::ConfigRow;
use crate::IorSize;
use rand::Rng;
use serde::Deserialize;
use serde::Serialize;
use tracing::warn;

const MIN_ID_WIDTH: usize = 5;

/// Replaces some of the base lists for one sampling group. Unset lists fall back to the base space.
#[derive(Clone, Debug, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct GroupOverride {
  /// Only used in log output.
  pub name: Option<String>,
  pub apis: Option<Vec<Api>>,
  pub transfer_sizes: Option<Vec<IorSize>>,
  pub block_sizes: Option<Vec<IorSize>>,
  pub segment_counts: Option<Vec<u64>>,
  pub num_tasks: Option<Vec<u64>>,
  pub file_per_proc: Option<Vec<u8>>,
  pub use_strided_datatype: Option<Vec<u8>>,
  pub set_alignment: Option<Vec<IorSize>>,
  pub use_o_direct: Option<Vec<u8>>,
  pub fsync: Option<Vec<u8>>,
  pub lustre_stripe_sizes: Option<Vec<IorSize>>,
  pub lustre_stripe_widths: Option<Vec<u64>>,
}

impl GroupOverride {
  pub fn resolve(&self, base: &ParameterSpace) -> ParameterSpace {
    fn pick<T: Clone>(over: &Option<Vec<T>>, base: &[T]) -> Vec<T> {
      over.clone().unwrap_or_else(|| base.to_vec())
    }
    ParameterSpace {
      apis: pick(&self.apis, &base.apis),
      transfer_sizes: pick(&self.transfer_sizes, &base.transfer_sizes),
      block_sizes: pick(&self.block_sizes, &base.block_sizes),
      segment_counts: pick(&self.segment_counts, &base.segment_counts),
      num_tasks: pick(&self.num_tasks, &base.num_tasks),
      file_per_proc: pick(&self.file_per_proc, &base.file_per_proc),
      use_strided_datatype: pick(&self.use_strided_datatype, &base.use_strided_datatype),
      set_alignment: pick(&self.set_alignment, &base.set_alignment),
      use_o_direct: pick(&self.use_o_direct, &base.use_o_direct),
      fsync: pick(&self.fsync, &base.fsync),
      lustre_stripe_sizes: pick(&self.lustre_stripe_sizes, &base.lustre_stripe_sizes),
      lustre_stripe_widths: pick(&self.lustre_stripe_widths, &base.lustre_stripe_widths),
    }
  }
}

fn access_group(name: &str, fpp: &[u8], strided: u8, odirect: u8, fsync: u8) -> GroupOverride {
  GroupOverride {
    name: Some(name.to_string()),
    file_per_proc: Some(fpp.to_vec()),
    use_strided_datatype: Some(vec![strided]),
    use_o_direct: Some(vec![odirect]),
    fsync: Some(vec![fsync]),
    ..Default::default()
  }
}

fn edge_group(
  base: GroupOverride,
  transfer_sizes: Vec<IorSize>,
  block_size: IorSize,
  segment_count: u64,
) -> GroupOverride {
  GroupOverride {
    transfer_sizes: Some(transfer_sizes),
    block_sizes: Some(vec![block_size]),
    segment_counts: Some(vec![segment_count]),
    num_tasks: Some(vec![16]),
    ..base
  }
}

fn default_groups() -> Vec<GroupOverride> {
  vec![
    access_group("sequential", &[1], 0, 0, 0),
    access_group("strided", &[1], 1, 0, 0),
    access_group("shared-odirect", &[0], 0, 1, 1),
    access_group("mixed-fsync", &[1, 0], 0, 1, 1),
    // Pushes POSIX_SEQ_WRITES up.
    edge_group(
      access_group("huge-sequential", &[1], 0, 0, 0),
      vec![IorSize::m(1)],
      IorSize::g(1),
      4,
    ),
    // Hits every stride counter.
    edge_group(
      access_group("multi-strided", &[1], 1, 0, 0),
      vec![IorSize::k(64)],
      IorSize::m(4),
      64,
    ),
    // Covers the 10K-100K size buckets.
    edge_group(
      access_group("medium-transfers", &[1], 0, 0, 0),
      vec![IorSize::k(10), IorSize::k(64), IorSize::k(100)],
      IorSize::m(1),
      16,
    ),
    edge_group(
      access_group("tiny-writes", &[1], 1, 0, 1),
      vec![IorSize::k(4)],
      IorSize::m(1),
      256,
    ),
  ]
}

fn default_base() -> ParameterSpace {
  ParameterSpace {
    apis: vec![Api::Posix, Api::Mpiio],
    transfer_sizes: vec![
      IorSize::k(4),
      IorSize::k(10),
      IorSize::k(64),
      IorSize::k(100),
      IorSize::m(1),
    ],
    block_sizes: vec![
      IorSize::m(1),
      IorSize::m(4),
      IorSize::m(16),
      IorSize::m(256),
      IorSize::g(1),
    ],
    segment_counts: vec![1, 16, 64, 256],
    ..ParameterSpace::default()
  }
}

fn default_samples_per_group() -> usize {
  500
}

#[derive(Clone, Debug, PartialEq, Eq, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct TargetedPlan {
  #[serde(default = "default_samples_per_group")]
  pub samples_per_group: usize,
  #[serde(default = "default_base")]
  pub base: ParameterSpace,
  #[serde(default = "default_groups")]
  pub groups: Vec<GroupOverride>,
}

impl Default for TargetedPlan {
  fn default() -> Self {
    Self {
      samples_per_group: default_samples_per_group(),
      base: default_base(),
      groups: default_groups(),
    }
  }
}

impl TargetedPlan {
  /// Draws `samples_per_group` rows from each group in order. Rows are numbered across all groups.
  pub fn sample<R: Rng + ?Sized>(&self, rng: &mut R) -> Vec<ConfigRow> {
    let total = self.samples_per_group * self.groups.len();
    let width = pad_width(total).max(MIN_ID_WIDTH);
    let mut rows = Vec::with_capacity(total);
    for (i, group) in self.groups.iter().enumerate() {
      let space = group.resolve(&self.base);
      for _ in 0..self.samples_per_group {
        let Some(params) = space.choose(rng) else {
          warn!(
            group = i,
            name = group.name.as_deref().unwrap_or(""),
            "group has an empty parameter list, skipping"
          );
          break;
        };
        rows.push(ConfigRow::numbered(rows.len() + 1, width, params));
      }
    }
    rows
  }
}
