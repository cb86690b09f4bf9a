use crate::ConfigRow;
use crate::PARAMETER_COLUMNS;
use ahash::HashMap;
use ahash::HashMapExt;

/// How often each value appears in each parameter column, most used first.
pub struct ColumnUsage {
  pub column: &'static str,
  pub counts: Vec<(String, usize)>,
}

pub struct Scored<'a> {
  pub row: &'a ConfigRow,
  pub score: f64,
}

fn frequencies(rows: &[ConfigRow]) -> Vec<HashMap<String, usize>> {
  let mut freq = vec![HashMap::<String, usize>::new(); PARAMETER_COLUMNS.len()];
  for row in rows {
    for (col, v) in row.parameter_values().into_iter().enumerate() {
      *freq[col].entry(v).or_default() += 1;
    }
  }
  freq
}

/// Scores each row by the sum of 1/frequency of its value in every parameter column. Rows with rarer values rank higher. Ties keep table order.
pub fn diversity_scores(rows: &[ConfigRow]) -> Vec<Scored<'_>> {
  let freq = frequencies(rows);
  let mut scored = rows
    .iter()
    .map(|row| {
      let score = row
        .parameter_values()
        .iter()
        .enumerate()
        .map(|(col, v)| 1.0 / freq[col][v] as f64)
        .sum();
      Scored { row, score }
    })
    .collect::<Vec<_>>();
  scored.sort_by(|a, b| b.score.total_cmp(&a.score));
  scored
}

pub fn column_usage(rows: &[ConfigRow]) -> Vec<ColumnUsage> {
  frequencies(rows)
    .into_iter()
    .zip(PARAMETER_COLUMNS)
    .map(|(freq, column)| {
      let mut counts = freq.into_iter().collect::<Vec<_>>();
      counts.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(&b.0)));
      ColumnUsage { column, counts }
    })
    .collect()
}
