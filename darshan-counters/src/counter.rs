use strum::EnumCount;
use strum::EnumIter;
use strum::EnumString;
use strum::IntoEnumIterator;
use strum::IntoStaticStr;

/// Darshan counters that are extracted per rank, in output column order. `PosixFMetaTime` is only used to derive the tag and is never written.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug, EnumCount, EnumIter, EnumString, IntoStaticStr)]
pub enum Counter {
  #[strum(serialize = "POSIX_OPENS")]
  PosixOpens,
  #[strum(serialize = "LUSTRE_STRIPE_SIZE")]
  LustreStripeSize,
  #[strum(serialize = "LUSTRE_STRIPE_WIDTH")]
  LustreStripeWidth,
  #[strum(serialize = "POSIX_FILENOS")]
  PosixFilenos,
  #[strum(serialize = "POSIX_MEM_ALIGNMENT")]
  PosixMemAlignment,
  #[strum(serialize = "POSIX_FILE_ALIGNMENT")]
  PosixFileAlignment,
  #[strum(serialize = "POSIX_READS")]
  PosixReads,
  #[strum(serialize = "POSIX_WRITES")]
  PosixWrites,
  #[strum(serialize = "POSIX_SEEKS")]
  PosixSeeks,
  #[strum(serialize = "POSIX_STATS")]
  PosixStats,
  #[strum(serialize = "POSIX_BYTES_READ")]
  PosixBytesRead,
  #[strum(serialize = "POSIX_BYTES_WRITTEN")]
  PosixBytesWritten,
  #[strum(serialize = "POSIX_CONSEC_READS")]
  PosixConsecReads,
  #[strum(serialize = "POSIX_CONSEC_WRITES")]
  PosixConsecWrites,
  #[strum(serialize = "POSIX_SEQ_READS")]
  PosixSeqReads,
  #[strum(serialize = "POSIX_SEQ_WRITES")]
  PosixSeqWrites,
  #[strum(serialize = "POSIX_RW_SWITCHES")]
  PosixRwSwitches,
  #[strum(serialize = "POSIX_MEM_NOT_ALIGNED")]
  PosixMemNotAligned,
  #[strum(serialize = "POSIX_FILE_NOT_ALIGNED")]
  PosixFileNotAligned,
  #[strum(serialize = "POSIX_SIZE_READ_0_100")]
  PosixSizeRead0To100,
  #[strum(serialize = "POSIX_SIZE_READ_100_1K")]
  PosixSizeRead100To1K,
  #[strum(serialize = "POSIX_SIZE_READ_1K_10K")]
  PosixSizeRead1KTo10K,
  #[strum(serialize = "POSIX_SIZE_READ_100K_1M")]
  PosixSizeRead100KTo1M,
  #[strum(serialize = "POSIX_SIZE_WRITE_0_100")]
  PosixSizeWrite0To100,
  #[strum(serialize = "POSIX_SIZE_WRITE_100_1K")]
  PosixSizeWrite100To1K,
  #[strum(serialize = "POSIX_SIZE_WRITE_1K_10K")]
  PosixSizeWrite1KTo10K,
  #[strum(serialize = "POSIX_SIZE_WRITE_10K_100K")]
  PosixSizeWrite10KTo100K,
  #[strum(serialize = "POSIX_SIZE_WRITE_100K_1M")]
  PosixSizeWrite100KTo1M,
  #[strum(serialize = "POSIX_STRIDE1_STRIDE")]
  PosixStride1Stride,
  #[strum(serialize = "POSIX_STRIDE2_STRIDE")]
  PosixStride2Stride,
  #[strum(serialize = "POSIX_STRIDE3_STRIDE")]
  PosixStride3Stride,
  #[strum(serialize = "POSIX_STRIDE4_STRIDE")]
  PosixStride4Stride,
  #[strum(serialize = "POSIX_STRIDE1_COUNT")]
  PosixStride1Count,
  #[strum(serialize = "POSIX_STRIDE2_COUNT")]
  PosixStride2Count,
  #[strum(serialize = "POSIX_STRIDE3_COUNT")]
  PosixStride3Count,
  #[strum(serialize = "POSIX_STRIDE4_COUNT")]
  PosixStride4Count,
  #[strum(serialize = "POSIX_ACCESS1_ACCESS")]
  PosixAccess1Access,
  #[strum(serialize = "POSIX_ACCESS2_ACCESS")]
  PosixAccess2Access,
  #[strum(serialize = "POSIX_ACCESS3_ACCESS")]
  PosixAccess3Access,
  #[strum(serialize = "POSIX_ACCESS4_ACCESS")]
  PosixAccess4Access,
  #[strum(serialize = "POSIX_ACCESS1_COUNT")]
  PosixAccess1Count,
  #[strum(serialize = "POSIX_ACCESS2_COUNT")]
  PosixAccess2Count,
  #[strum(serialize = "POSIX_ACCESS3_COUNT")]
  PosixAccess3Count,
  #[strum(serialize = "POSIX_ACCESS4_COUNT")]
  PosixAccess4Count,
  #[strum(serialize = "POSIX_F_META_TIME")]
  PosixFMetaTime,
}

/// One slot per counter, indexed by `Counter as usize`.
pub type CounterValues = [f64; Counter::COUNT];

impl Counter {
  pub fn name(self) -> &'static str {
    self.into()
  }

  pub fn is_written(self) -> bool {
    self != Counter::PosixFMetaTime
  }

  /// Counters that appear as output columns, in order.
  pub fn written() -> impl Iterator<Item = Counter> {
    Counter::iter().filter(|c| c.is_written())
  }
}
