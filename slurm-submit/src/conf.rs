use serde::Deserialize;
use serde::Serialize;
use std::path::PathBuf;

fn default_account() -> String {
  "bdau-delta-gpu".to_string()
}

fn default_partition() -> String {
  "gpuA100x4-interactive".to_string()
}

fn default_nodes() -> u32 {
  1
}

fn default_gres() -> Option<String> {
  Some("gpu:1".to_string())
}

fn default_cpus_per_task() -> u32 {
  2
}

fn default_mem() -> String {
  "64G".to_string()
}

fn default_time() -> String {
  "01:00:00".to_string()
}

fn default_ior_bin() -> String {
  "~/.conda/envs/ior_env/bin/ior".to_string()
}

fn default_darshan_lib() -> String {
  "$HOME/.conda/envs/ior_env/lib/libdarshan.so".to_string()
}

fn default_darshan_enable_nonmpi() -> bool {
  true
}

fn default_log_dir() -> String {
  "logs/slurm".to_string()
}

fn default_job_dir() -> PathBuf {
  PathBuf::from("generated_slurms")
}

/// Everything about a job that doesn't come from the configuration row. Paths that end up inside the job script are kept as strings so shell expansions like `~` and `$HOME` survive.
#[derive(Clone, Debug, PartialEq, Eq, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct JobConf {
  #[serde(default = "default_account")]
  pub account: String,
  #[serde(default = "default_partition")]
  pub partition: String,
  #[serde(default = "default_nodes")]
  pub nodes: u32,
  /// Omitted from the script when null.
  #[serde(default = "default_gres")]
  pub gres: Option<String>,
  #[serde(default = "default_cpus_per_task")]
  pub cpus_per_task: u32,
  #[serde(default = "default_mem")]
  pub mem: String,
  #[serde(default = "default_time")]
  pub time: String,
  #[serde(default = "default_ior_bin")]
  pub ior_bin: String,
  #[serde(default = "default_darshan_lib")]
  pub darshan_lib: String,
  #[serde(default = "default_darshan_enable_nonmpi")]
  pub darshan_enable_nonmpi: bool,
  #[serde(default = "default_log_dir")]
  pub log_dir: String,
  /// Where job scripts are written before submission.
  #[serde(default = "default_job_dir")]
  pub job_dir: PathBuf,
}

impl Default for JobConf {
  fn default() -> Self {
    Self {
      account: default_account(),
      partition: default_partition(),
      nodes: default_nodes(),
      gres: default_gres(),
      cpus_per_task: default_cpus_per_task(),
      mem: default_mem(),
      time: default_time(),
      ior_bin: default_ior_bin(),
      darshan_lib: default_darshan_lib(),
      darshan_enable_nonmpi: default_darshan_enable_nonmpi(),
      log_dir: default_log_dir(),
      job_dir: default_job_dir(),
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn test_partial_yaml_keeps_defaults() {
    let conf: JobConf = serde_yaml::from_str("partition: cpu\ngres: null\n").unwrap();
    assert_eq!(conf.partition, "cpu");
    assert_eq!(conf.gres, None);
    assert_eq!(conf.account, "bdau-delta-gpu");
    assert_eq!(conf.job_dir, PathBuf::from("generated_slurms"));
  }

  #[test]
  fn test_unknown_field_is_rejected() {
    assert!(serde_yaml::from_str::<JobConf>("acount: typo\n").is_err());
  }
}
