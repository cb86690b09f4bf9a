use crate::conf::JobConf;
use crate::job::job_name;
use crate::job::job_path;
use crate::job::render_job;
use crate::scheduler::Scheduler;
use ior_sweep::ConfigRow;
use std::fs;
use std::io;
use tracing::debug;
use tracing::error;
use tracing::info;
use tracing::warn;

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct EmitStats {
  pub submitted: usize,
  pub failed: usize,
  pub dry_run: usize,
}

pub struct EmitOpts {
  /// Render and write jobs but don't hand them to the scheduler.
  pub dry_run: bool,
  /// Leave job files on disk after submission.
  pub keep: bool,
}

/// Writes, submits, and then deletes one job file per row. A failure only affects its own row.
pub fn emit(
  conf: &JobConf,
  rows: &[ConfigRow],
  scheduler: &dyn Scheduler,
  opts: &EmitOpts,
) -> io::Result<EmitStats> {
  fs::create_dir_all(&conf.job_dir)?;
  let mut stats = EmitStats::default();
  for row in rows {
    let path = job_path(conf, row);
    let script = render_job(conf, row);
    if let Err(err) = fs::write(&path, &script) {
      error!(path = %path.display(), error = %err, "failed to write job file");
      stats.failed += 1;
      continue;
    };
    debug!(path = %path.display(), "generated job file");

    if opts.dry_run {
      info!(job = %job_name(row), path = %path.display(), "dry run, not submitting");
      debug!(%script, "job script");
      stats.dry_run += 1;
    } else {
      match scheduler.submit(&path) {
        Ok(sub) => {
          info!(job = %job_name(row), job_id = ?sub.job_id, "submitted");
          stats.submitted += 1;
        }
        Err(err) => {
          error!(job = %job_name(row), error = %err, "submission failed");
          stats.failed += 1;
        }
      };
    };

    if !opts.keep {
      if let Err(err) = fs::remove_file(&path) {
        warn!(path = %path.display(), error = %err, "failed to delete job file");
      };
    };
  }
  Ok(stats)
}
