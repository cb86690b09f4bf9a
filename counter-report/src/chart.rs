use crate::stats::finite;
use crate::stats::histogram;
use charts_rs::svg_to_png;
use charts_rs::BarChart;
use charts_rs::HorizontalBarChart;
use charts_rs::Series;
use plotters::coord::Shift;
use plotters::prelude::*;
use std::error::Error;
use std::fs;
use std::path::Path;
use tracing::warn;

pub type ChartResult = Result<(), Box<dyn Error>>;

type Area<'a> = DrawingArea<BitMapBackend<'a>, Shift>;

const BAR: RGBColor = RGBColor(70, 130, 180);
const PRESENT: RGBColor = RGBColor(35, 139, 69);
const ABSENT: RGBColor = RGBColor(247, 252, 245);

/// Plot ranges can't include NaN or infinities, so those values are dropped with a warning.
fn plottable(title: &str, values: &[f64]) -> Vec<f64> {
  let kept = finite(values);
  if kept.len() < values.len() {
    warn!(
      panel = %title,
      dropped = values.len() - kept.len(),
      "dropped non-finite values"
    );
  };
  kept
}

/// Horizontal bars, largest first.
pub fn bar_chart_png(path: &Path, title: &str, data: Vec<(String, f64)>) -> ChartResult {
  let mut sorted = data;
  sorted.sort_by(|a, b| b.1.total_cmp(&a.1));

  let labels = sorted.iter().map(|(l, _)| l.clone()).collect::<Vec<_>>();
  let values = sorted.iter().map(|(_, v)| *v as f32).collect::<Vec<_>>();

  let series = Series::new("".to_string(), values);
  let mut chart = HorizontalBarChart::new_with_theme(vec![series], labels, "light");
  chart.title_text = title.to_string();
  chart.width = 1200.0;
  chart.height = 80.0 + sorted.len() as f32 * 35.0;
  chart.legend_show = Some(false);

  let svg = chart.svg()?;
  fs::write(path, svg_to_png(&svg)?)?;
  Ok(())
}

fn draw_histogram(area: &Area, title: &str, values: &[f64], bins: usize) -> ChartResult {
  let Some(h) = histogram(&plottable(title, values), bins) else {
    return Ok(());
  };
  let ymax = h.counts.iter().copied().max().unwrap_or(0).max(1) as f64;
  let mut chart = ChartBuilder::on(area)
    .caption(title, ("sans-serif", 18))
    .margin(10)
    .x_label_area_size(35)
    .y_label_area_size(50)
    .build_cartesian_2d(h.lo..h.hi(), 0.0..ymax * 1.05)?;
  chart
    .configure_mesh()
    .x_desc("Value")
    .y_desc("Frequency")
    .draw()?;
  chart.draw_series(h.counts.iter().enumerate().map(|(i, &c)| {
    let (l, r) = h.edges(i);
    Rectangle::new([(l, 0.0), (r, c as f64)], BAR.mix(0.8).filled())
  }))?;
  Ok(())
}

/// Single histogram as a bar chart. Bars are labeled with their left edge.
pub fn histogram_png(path: &Path, title: &str, values: &[f64], bins: usize) -> ChartResult {
  let Some(h) = histogram(&plottable(title, values), bins) else {
    return Ok(());
  };
  let labels = (0..h.counts.len())
    .map(|i| format!("{:.3}", h.edges(i).0))
    .collect::<Vec<_>>();
  let counts = h.counts.iter().map(|&c| c as f32).collect::<Vec<_>>();

  let series = Series::new("Frequency".to_string(), counts);
  let mut chart = BarChart::new_with_theme(vec![series], labels, "light");
  chart.title_text = title.to_string();
  chart.width = 1200.0;
  chart.height = 800.0;
  chart.legend_show = Some(false);

  let svg = chart.svg()?;
  fs::write(path, svg_to_png(&svg)?)?;
  Ok(())
}

/// One histogram per panel, filled row by row. Panels past `rows * cols` are ignored.
pub fn histogram_grid_png(
  path: &Path,
  (rows, cols): (usize, usize),
  panels: &[(String, Vec<f64>)],
  bins: usize,
) -> ChartResult {
  let root = BitMapBackend::new(path, (cols as u32 * 420, rows as u32 * 340)).into_drawing_area();
  root.fill(&WHITE)?;
  for (area, (title, values)) in root.split_evenly((rows, cols)).iter().zip(panels) {
    draw_histogram(area, title, values, bins)?;
  }
  root.present()?;
  Ok(())
}

/// Filled cells for `true`. `matrix[y][x]`; row 0 is drawn at the top. Label slices may be empty.
pub fn heatmap_png(
  path: &Path,
  title: &str,
  (x_desc, y_desc): (&str, &str),
  x_labels: &[String],
  y_labels: &[String],
  matrix: &[Vec<bool>],
) -> ChartResult {
  let ny = matrix.len() as i32;
  let nx = matrix.first().map(|r| r.len()).unwrap_or(0) as i32;
  let root = BitMapBackend::new(path, (1600, 1000)).into_drawing_area();
  root.fill(&WHITE)?;
  let mut chart = ChartBuilder::on(&root)
    .caption(title, ("sans-serif", 28))
    .margin(20)
    .x_label_area_size(if x_labels.is_empty() { 40 } else { 160 })
    .y_label_area_size(if y_labels.is_empty() { 60 } else { 240 })
    .build_cartesian_2d(0..nx.max(1), 0..ny.max(1))?;
  let label = |labels: &[String], i: i32| -> String {
    if labels.is_empty() {
      return i.to_string();
    };
    labels.get(i as usize).cloned().unwrap_or_default()
  };
  chart
    .configure_mesh()
    .disable_mesh()
    .x_desc(x_desc)
    .y_desc(y_desc)
    .x_labels(if x_labels.is_empty() { 10 } else { x_labels.len() })
    .y_labels(if y_labels.is_empty() { 10 } else { y_labels.len() })
    .x_label_formatter(&|x| label(x_labels, *x))
    .y_label_formatter(&|y| label(y_labels, ny - 1 - *y))
    .x_label_style(("sans-serif", 11).into_font().transform(FontTransform::Rotate90))
    .y_label_style(("sans-serif", 11))
    .draw()?;
  chart.draw_series(matrix.iter().enumerate().flat_map(|(y, row)| {
    let top = ny - 1 - y as i32;
    row.iter().enumerate().map(move |(x, &on)| {
      let color = if on { PRESENT } else { ABSENT };
      Rectangle::new([(x as i32, top), (x as i32 + 1, top + 1)], color.filled())
    })
  }))?;
  root.present()?;
  Ok(())
}

/// Box plots of several groups in one panel.
pub struct BoxPanel {
  pub title: String,
  pub groups: Vec<(String, Vec<f64>)>,
}

fn draw_boxes(area: &Area, panel: &BoxPanel) -> ChartResult {
  let groups = panel
    .groups
    .iter()
    .map(|(name, v)| (name.clone(), plottable(&format!("{} / {name}", panel.title), v)))
    .filter(|(_, v)| !v.is_empty())
    .collect::<Vec<_>>();
  if groups.is_empty() {
    return Ok(());
  };
  let (lo, hi) = groups
    .iter()
    .flat_map(|(_, v)| v.iter())
    .fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), &v| (lo.min(v), hi.max(v)));
  let pad = ((hi - lo) * 0.05).max(0.5);
  let (lo, hi) = ((lo - pad) as f32, (hi + pad) as f32);
  if !lo.is_finite() || !hi.is_finite() {
    warn!(panel = %panel.title, "value range exceeds the plot axis");
    return Ok(());
  };
  let names = groups.iter().map(|(n, _)| n.clone()).collect::<Vec<_>>();
  let mut chart = ChartBuilder::on(area)
    .caption(&panel.title, ("sans-serif", 18))
    .margin(10)
    .x_label_area_size(60)
    .y_label_area_size(50)
    .build_cartesian_2d((0..groups.len() as i32).into_segmented(), lo..hi)?;
  chart
    .configure_mesh()
    .y_desc("Value (log10)")
    .x_label_formatter(&|v| match v {
      SegmentValue::CenterOf(i) => names.get(*i as usize).cloned().unwrap_or_default(),
      _ => String::new(),
    })
    .draw()?;
  chart.draw_series(groups.iter().enumerate().map(|(i, (_, values))| {
    Boxplot::new_vertical(SegmentValue::CenterOf(i as i32), &Quartiles::new(values.as_slice()))
      .width(24)
      .style(BAR)
  }))?;
  Ok(())
}

pub fn boxplot_grid_png(path: &Path, (rows, cols): (usize, usize), panels: &[BoxPanel]) -> ChartResult {
  let root = BitMapBackend::new(path, (cols as u32 * 560, rows as u32 * 460)).into_drawing_area();
  root.fill(&WHITE)?;
  for (area, panel) in root.split_evenly((rows, cols)).iter().zip(panels) {
    draw_boxes(area, panel)?;
  }
  root.present()?;
  Ok(())
}

#[cfg(test)]
mod tests {
  use super::*;
  use tempfile::tempdir;
  use tracing_test::traced_test;

  fn non_empty(path: &Path) -> bool {
    fs::metadata(path).map(|m| m.len() > 0).unwrap_or(false)
  }

  #[traced_test]
  #[test]
  fn test_histogram_grid_drops_infinities() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("grid.png");
    let panels = vec![
      ("x".to_string(), vec![f64::NEG_INFINITY, 0.0, 0.3]),
      ("empty".to_string(), vec![]),
      ("nan".to_string(), vec![f64::NAN]),
    ];
    histogram_grid_png(&path, (2, 2), &panels, 50).unwrap();
    assert!(non_empty(&path));
    assert!(logs_contain("dropped non-finite values"));
    assert!(logs_contain("dropped=1"));
  }

  #[test]
  fn test_histogram_png() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("h.png");
    histogram_png(&path, "h", &[1.0, 2.0, 2.0, f64::INFINITY], 4).unwrap();
    assert!(non_empty(&path));
  }

  #[test]
  fn test_boxplot_grid_with_nan() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("box.png");
    let panels = vec![
      BoxPanel {
        title: "opens".to_string(),
        groups: vec![
          ("a".to_string(), vec![f64::NAN, 2.0, 3.0]),
          ("b".to_string(), vec![f64::INFINITY]),
        ],
      },
      BoxPanel {
        title: "huge".to_string(),
        groups: vec![("a".to_string(), vec![1e300])],
      },
      BoxPanel {
        title: "blank".to_string(),
        groups: vec![],
      },
    ];
    boxplot_grid_png(&path, (1, 3), &panels).unwrap();
    assert!(non_empty(&path));
  }

  #[test]
  fn test_heatmap_and_bars() {
    let dir = tempdir().unwrap();
    let heat = dir.path().join("heat.png");
    heatmap_png(
      &heat,
      "t",
      ("x", "y"),
      &["a".to_string(), "b".to_string()],
      &[],
      &[vec![true, false], vec![false, true]],
    )
    .unwrap();
    assert!(non_empty(&heat));

    let bars = dir.path().join("bars.png");
    bar_chart_png(&bars, "t", vec![("a".to_string(), 25.0), ("b".to_string(), 75.0)]).unwrap();
    assert!(non_empty(&bars));
  }
}
