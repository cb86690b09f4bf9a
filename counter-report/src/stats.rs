/// Summary statistics of one column. `std` is the sample standard deviation and is NaN for a single value.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Describe {
  pub count: usize,
  pub min: f64,
  pub max: f64,
  pub mean: f64,
  pub std: f64,
  pub q1: f64,
  pub median: f64,
  pub q3: f64,
}

pub fn mean(values: &[f64]) -> Option<f64> {
  if values.is_empty() {
    return None;
  };
  Some(values.iter().sum::<f64>() / values.len() as f64)
}

/// Uses n - 1 in the denominator.
pub fn sample_std(values: &[f64]) -> Option<f64> {
  let m = mean(values)?;
  if values.len() < 2 {
    return Some(f64::NAN);
  };
  let ss = values.iter().map(|v| (v - m) * (v - m)).sum::<f64>();
  Some((ss / (values.len() - 1) as f64).sqrt())
}

/// Linear interpolation between closest ranks. `sorted` must be ascending and non-empty.
fn percentile(sorted: &[f64], p: f64) -> f64 {
  let pos = p * (sorted.len() - 1) as f64;
  let lo = pos.floor() as usize;
  let hi = pos.ceil() as usize;
  sorted[lo] + (sorted[hi] - sorted[lo]) * (pos - lo as f64)
}

pub fn describe(values: &[f64]) -> Option<Describe> {
  let mut sorted = values.to_vec();
  sorted.sort_by(f64::total_cmp);
  Some(Describe {
    count: values.len(),
    min: *sorted.first()?,
    max: *sorted.last()?,
    mean: mean(values)?,
    std: sample_std(values)?,
    q1: percentile(&sorted, 0.25),
    median: percentile(&sorted, 0.5),
    q3: percentile(&sorted, 0.75),
  })
}

#[derive(Clone, Debug, PartialEq)]
pub struct Histogram {
  pub lo: f64,
  pub width: f64,
  pub counts: Vec<usize>,
}

impl Histogram {
  pub fn hi(&self) -> f64 {
    self.lo + self.width * self.counts.len() as f64
  }

  /// Left and right edge of bin `i`.
  pub fn edges(&self, i: usize) -> (f64, f64) {
    let l = self.lo + self.width * i as f64;
    (l, l + self.width)
  }
}

/// Values that are neither NaN nor infinite, in order.
pub fn finite(values: &[f64]) -> Vec<f64> {
  values.iter().copied().filter(|v| v.is_finite()).collect()
}

/// Equal-width bins spanning min to max of the finite values. The last bin includes the maximum. Constant data gets a unit-wide range centered on the value.
pub fn histogram(values: &[f64], bins: usize) -> Option<Histogram> {
  let values = finite(values);
  if values.is_empty() || bins == 0 {
    return None;
  };
  let (mut lo, mut hi) = values
    .iter()
    .fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), &v| (lo.min(v), hi.max(v)));
  if lo == hi {
    lo -= 0.5;
    hi += 0.5;
  };
  let width = (hi - lo) / bins as f64;
  if !width.is_finite() {
    return None;
  };
  let mut counts = vec![0; bins];
  for &v in values.iter() {
    let i = (((v - lo) / width).floor() as usize).min(bins - 1);
    counts[i] += 1;
  }
  Some(Histogram { lo, width, counts })
}

pub fn nonzero(values: &[f64]) -> Vec<f64> {
  values.iter().copied().filter(|&v| v != 0.0).collect()
}

pub fn pct(part: usize, whole: usize) -> f64 {
  if whole == 0 {
    0.0
  } else {
    part as f64 * 100.0 / whole as f64
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn test_describe() {
    let d = describe(&[4.0, 1.0, 3.0, 2.0]).unwrap();
    assert_eq!(d.count, 4);
    assert_eq!(d.min, 1.0);
    assert_eq!(d.max, 4.0);
    assert_eq!(d.mean, 2.5);
    assert!((d.std - (5.0f64 / 3.0).sqrt()).abs() < 1e-12);
    assert_eq!(d.q1, 1.75);
    assert_eq!(d.median, 2.5);
    assert_eq!(d.q3, 3.25);
    assert!(describe(&[]).is_none());
    assert!(describe(&[7.0]).unwrap().std.is_nan());
  }

  #[test]
  fn test_histogram() {
    let h = histogram(&[0.0, 1.0, 2.0, 3.0, 4.0], 4).unwrap();
    assert_eq!(h.lo, 0.0);
    assert_eq!(h.width, 1.0);
    assert_eq!(h.counts, vec![1, 1, 1, 2]);
    assert_eq!(h.hi(), 4.0);
    assert_eq!(h.edges(2), (2.0, 3.0));
  }

  #[test]
  fn test_histogram_constant() {
    let h = histogram(&[5.0, 5.0], 10).unwrap();
    assert_eq!(h.lo, 4.5);
    assert_eq!(h.counts.iter().sum::<usize>(), 2);
    assert!(histogram(&[], 10).is_none());
  }

  #[test]
  fn test_histogram_skips_non_finite() {
    let h = histogram(&[f64::NEG_INFINITY, 0.0, f64::NAN, 2.0, f64::INFINITY], 2).unwrap();
    assert_eq!(h.lo, 0.0);
    assert_eq!(h.hi(), 2.0);
    assert_eq!(h.counts, vec![1, 1]);
    assert!(histogram(&[f64::NAN, f64::INFINITY], 5).is_none());
    assert!(histogram(&[1.0], 0).is_none());
  }

  #[test]
  fn test_pct() {
    assert_eq!(pct(1, 4), 25.0);
    assert_eq!(pct(0, 0), 0.0);
    assert_eq!(nonzero(&[0.0, 2.0, 0.0, -1.0]), vec![2.0, -1.0]);
  }
}
