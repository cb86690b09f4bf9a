use once_cell::sync::Lazy;
use regex::Regex;
use std::error::Error;
use std::fmt;
use std::fmt::Display;
use std::io;
use std::path::Path;
use std::path::PathBuf;
use std::process::Command;
use std::process::ExitStatus;

static SUBMITTED_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"Submitted batch job (\d+)").unwrap());

#[derive(Debug)]
pub enum SubmitError {
  Spawn { bin: PathBuf, source: io::Error },
  Rejected { status: ExitStatus, stderr: String },
}

impl Display for SubmitError {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match self {
      SubmitError::Spawn { bin, source } => {
        write!(f, "failed to run {}: {source}", bin.display())
      }
      SubmitError::Rejected { status, stderr } => {
        write!(f, "scheduler exited with {status}: {}", stderr.trim())
      }
    }
  }
}

impl Error for SubmitError {}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Submission {
  /// Absent when the scheduler's output didn't mention one.
  pub job_id: Option<u64>,
}

pub trait Scheduler {
  fn submit(&self, job_file: &Path) -> Result<Submission, SubmitError>;
}

pub fn parse_job_id(stdout: &str) -> Option<u64> {
  SUBMITTED_RE.captures(stdout)?.get(1)?.as_str().parse().ok()
}

/// Submits through the `sbatch` executable.
pub struct Sbatch {
  pub bin: PathBuf,
}

impl Default for Sbatch {
  fn default() -> Self {
    Self {
      bin: PathBuf::from("sbatch"),
    }
  }
}

impl Scheduler for Sbatch {
  fn submit(&self, job_file: &Path) -> Result<Submission, SubmitError> {
    let out = Command::new(&self.bin)
      .arg(job_file)
      .output()
      .map_err(|source| SubmitError::Spawn {
        bin: self.bin.clone(),
        source,
      })?;
    if !out.status.success() {
      return Err(SubmitError::Rejected {
        status: out.status,
        stderr: String::from_utf8_lossy(&out.stderr).into_owned(),
      });
    };
    Ok(Submission {
      job_id: parse_job_id(&String::from_utf8_lossy(&out.stdout)),
    })
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn test_parse_job_id() {
    assert_eq!(parse_job_id("Submitted batch job 123456\n"), Some(123456));
    assert_eq!(parse_job_id("sbatch: queued\n"), None);
  }

  #[test]
  fn test_missing_binary_is_spawn_error() {
    let sbatch = Sbatch {
      bin: PathBuf::from("/nonexistent/sbatch"),
    };
    let err = sbatch.submit(Path::new("job.slurm")).unwrap_err();
    assert!(matches!(err, SubmitError::Spawn { .. }));
  }
}
