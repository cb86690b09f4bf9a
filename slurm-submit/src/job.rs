use crate::conf::JobConf;
use ior_sweep::ConfigRow;
use std::path::PathBuf;

pub fn job_name(row: &ConfigRow) -> String {
  format!("ior_{}", row.config_id)
}

pub fn job_path(conf: &JobConf, row: &ConfigRow) -> PathBuf {
  conf
    .job_dir
    .join(format!("ior_config_{}.slurm", row.config_id))
}

/// The `mpirun` line. Optional flags are present only when the row enables them. Alignment and Lustre striping aren't IOR flags and don't appear.
pub fn ior_command(conf: &JobConf, row: &ConfigRow) -> String {
  let mut args = vec![
    "mpirun".to_string(),
    "-n".to_string(),
    row.num_tasks.to_string(),
    conf.ior_bin.clone(),
    "-a".to_string(),
    row.api.to_string(),
    "-b".to_string(),
    row.block_size.to_string(),
    "-t".to_string(),
    row.transfer_size.to_string(),
    "-s".to_string(),
    row.segment_count.to_string(),
  ];
  if row.file_per_proc {
    args.push("-F".to_string());
  };
  args.push("-z".to_string());
  if row.fsync {
    args.push("-e".to_string());
  };
  args.push("-C".to_string());
  if row.use_strided_datatype {
    args.push("--mpiio.useStridedDatatype".to_string());
  };
  if row.use_o_direct {
    args.push("--posix.odirect".to_string());
  };
  args.push("-o".to_string());
  args.push(row.test_file.clone());
  args.join(" ")
}

pub fn render_job(conf: &JobConf, row: &ConfigRow) -> String {
  let name = job_name(row);
  let mut lines = vec![
    "#!/bin/bash".to_string(),
    format!("#SBATCH --job-name={name}"),
    format!("#SBATCH --account={}", conf.account),
    format!("#SBATCH --partition={}", conf.partition),
    format!("#SBATCH --nodes={}", conf.nodes),
    format!("#SBATCH --ntasks={}", row.num_tasks),
  ];
  if let Some(gres) = &conf.gres {
    lines.push(format!("#SBATCH --gres={gres}"));
  };
  lines.extend([
    format!("#SBATCH --cpus-per-task={}", conf.cpus_per_task),
    format!("#SBATCH --mem={}", conf.mem),
    format!("#SBATCH --time={}", conf.time),
    format!("#SBATCH --output={}/{name}_%j.out", conf.log_dir),
    format!("#SBATCH --error={}/{name}_%j.err", conf.log_dir),
    String::new(),
    format!("export LD_PRELOAD=\"{}\"", conf.darshan_lib),
  ]);
  if conf.darshan_enable_nonmpi {
    lines.push("export DARSHAN_ENABLE_NONMPI=1".to_string());
  };
  lines.extend([
    format!("export DARSHAN_LOGFILE=\"darshan_{}.darshan\"", row.test_file),
    String::new(),
    ior_command(conf, row),
    format!("echo \"Finished: {}\"", row.config_id),
  ]);
  let mut script = lines.join("\n");
  script.push('\n');
  script
}

#[cfg(test)]
mod tests {
  use super::*;
  use ior_sweep::Api;
  use ior_sweep::IorSize;
  use ior_sweep::Parameters;

  fn row(file_per_proc: bool, strided: bool, odirect: bool, fsync: bool) -> ConfigRow {
    ConfigRow::numbered(42, 5, Parameters {
      api: Api::Mpiio,
      transfer_size: IorSize::k(64),
      block_size: IorSize::m(4),
      segment_count: 16,
      num_tasks: 16,
      file_per_proc,
      use_strided_datatype: strided,
      set_alignment: IorSize::k(4),
      use_o_direct: odirect,
      fsync,
      lustre_stripe_size: IorSize::m(1),
      lustre_stripe_width: 4,
    })
  }

  #[test]
  fn test_command_without_flags() {
    assert_eq!(
      ior_command(&JobConf::default(), &row(false, false, false, false)),
      "mpirun -n 16 ~/.conda/envs/ior_env/bin/ior -a MPIIO -b 4M -t 64K -s 16 -z -C -o test00042"
    );
  }

  #[test]
  fn test_command_with_all_flags() {
    assert_eq!(
      ior_command(&JobConf::default(), &row(true, true, true, true)),
      "mpirun -n 16 ~/.conda/envs/ior_env/bin/ior -a MPIIO -b 4M -t 64K -s 16 -F -z -e -C --mpiio.useStridedDatatype --posix.odirect -o test00042"
    );
  }

  #[test]
  fn test_render_job() {
    let script = render_job(&JobConf::default(), &row(true, false, false, true));
    let lines = script.lines().collect::<Vec<_>>();
    assert_eq!(lines[0], "#!/bin/bash");
    assert!(lines.contains(&"#SBATCH --job-name=ior_00042"));
    assert!(lines.contains(&"#SBATCH --ntasks=16"));
    assert!(lines.contains(&"#SBATCH --gres=gpu:1"));
    assert!(lines.contains(&"#SBATCH --output=logs/slurm/ior_00042_%j.out"));
    assert!(lines.contains(&"#SBATCH --error=logs/slurm/ior_00042_%j.err"));
    assert!(lines.contains(&"export LD_PRELOAD=\"$HOME/.conda/envs/ior_env/lib/libdarshan.so\""));
    assert!(lines.contains(&"export DARSHAN_ENABLE_NONMPI=1"));
    assert!(lines.contains(&"export DARSHAN_LOGFILE=\"darshan_test00042.darshan\""));
    assert_eq!(lines.last().unwrap(), &"echo \"Finished: 00042\"");
    // Pass-through parameters never reach the command line.
    assert!(!script.contains("LUSTRE"));
    assert!(!script.contains("setAlignment"));
  }

  #[test]
  fn test_optional_directives() {
    let conf = JobConf {
      gres: None,
      darshan_enable_nonmpi: false,
      ..Default::default()
    };
    let script = render_job(&conf, &row(false, false, false, false));
    assert!(!script.contains("--gres"));
    assert!(!script.contains("DARSHAN_ENABLE_NONMPI"));
  }

  #[test]
  fn test_job_path() {
    assert_eq!(
      job_path(&JobConf::default(), &row(false, false, false, false)),
      PathBuf::from("generated_slurms/ior_config_00042.slurm")
    );
  }
}
