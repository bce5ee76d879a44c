use anyhow::{Context, Result};
use plotters::prelude::*;

use std::io::Read;
use std::path::Path;

const AXIS_LABELS: [&str; 3] = ["X Position", "Y Position", "Z Position"];

/// One marker's trajectory pulled back out of the table, with frame indices
/// already converted to seconds.
#[derive(Debug)]
pub struct MarkerSeries {
    pub time: Vec<f64>,
    /// X, Y and Z columns in that order.
    pub axes: [Vec<f64>; 3],
}

/// Reads the delimited table and extracts the `<marker>_X/_Y/_Z` columns.
/// time = frame_index / rate.
pub fn load_marker_series<R: Read>(input: R, rate: f32, marker: &str) -> Result<MarkerSeries> {
    let mut reader = csv::Reader::from_reader(input);
    let headers = reader.headers()?.clone();
    let col = |name: String| {
        headers
            .iter()
            .position(|h| h == name)
            .with_context(|| format!("column `{}` is not in the table", name))
    };
    let frame_col = col("Frame".to_string())?;
    let cols = [
        col(format!("{}_X", marker))?,
        col(format!("{}_Y", marker))?,
        col(format!("{}_Z", marker))?,
    ];

    let mut series = MarkerSeries {
        time: vec![],
        axes: [vec![], vec![], vec![]],
    };
    for record in reader.records() {
        let record = record?;
        let cell = |i: usize| -> Result<f64> {
            Ok(record.get(i).context("row is too short")?.parse()?)
        };
        series.time.push(cell(frame_col)? / rate as f64);
        for (axis, &c) in series.axes.iter_mut().zip(cols.iter()) {
            axis.push(cell(c)?);
        }
    }
    Ok(series)
}

/// Three stacked line charts, X/Y/Z against time, for one marker.
pub fn render(series: &MarkerSeries, marker: &str, out: &Path, size: (u32, u32)) -> Result<()> {
    let root = BitMapBackend::new(out, size).into_drawing_area();
    root.fill(&WHITE)?;
    let root = root.titled(
        &format!("Time series for marker: {}", marker),
        ("sans-serif", 24),
    )?;
    let panes = root.split_evenly((3, 1));

    let t_max = series.time.last().copied().unwrap_or(0.0);
    let t_max = if t_max > 0.0 { t_max } else { 1.0 };

    for (pane, (axis_label, values)) in panes
        .iter()
        .zip(AXIS_LABELS.iter().zip(series.axes.iter()))
    {
        let (lo, hi) = value_range(values);
        let mut chart = ChartBuilder::on(pane)
            .margin(10)
            .set_label_area_size(LabelAreaPosition::Left, 60)
            .set_label_area_size(LabelAreaPosition::Bottom, 30)
            .build_cartesian_2d(0.0..t_max, lo..hi)?;
        chart
            .configure_mesh()
            .x_desc("Time (seconds)")
            .y_desc(*axis_label)
            .draw()?;
        for segment in segments(&series.time, values) {
            chart.draw_series(LineSeries::new(segment.into_iter(), &BLUE))?;
        }
    }
    root.present()?;
    Ok(())
}

fn value_range(values: &[f64]) -> (f64, f64) {
    let mut lo = f64::INFINITY;
    let mut hi = f64::NEG_INFINITY;
    for &v in values.iter().filter(|v| v.is_finite()) {
        lo = lo.min(v);
        hi = hi.max(v);
    }
    if !lo.is_finite() || !hi.is_finite() {
        return (0.0, 1.0);
    }
    let pad = ((hi - lo) * 0.05).max(1e-3);
    (lo - pad, hi + pad)
}

/// Occluded samples (NaN) split the trace instead of being drawn.
fn segments(time: &[f64], values: &[f64]) -> Vec<Vec<(f64, f64)>> {
    let mut out = vec![];
    let mut current = vec![];
    for (&t, &v) in time.iter().zip(values) {
        if v.is_finite() {
            current.push((t, v));
        } else if !current.is_empty() {
            out.push(std::mem::take(&mut current));
        }
    }
    if !current.is_empty() {
        out.push(current);
    }
    out
}

#[cfg(test)]
mod test {
    use super::*;

    const TABLE: &str = "\
Frame,RHEE_X,RHEE_Y,RHEE_Z
0,1,2,3
1,1.5,2.5,3.5
2,2,3,4
";

    #[test]
    fn time_axis_divides_frame_index_by_rate() {
        let series = load_marker_series(TABLE.as_bytes(), 120.0, "RHEE").unwrap();
        assert_eq!(series.time, [0.0, 1.0 / 120.0, 2.0 / 120.0]);
        assert_eq!(series.axes[0], [1.0, 1.5, 2.0]);
        assert_eq!(series.axes[2], [3.0, 3.5, 4.0]);
    }

    #[test]
    fn unknown_marker_is_an_error() {
        let err = load_marker_series(TABLE.as_bytes(), 120.0, "SACR").unwrap_err();
        assert!(err.to_string().contains("SACR_X"));
    }

    #[test]
    fn nan_cells_parse_and_split_the_trace() {
        let table = "Frame,A_X,A_Y,A_Z\n0,1,0,0\n1,NaN,NaN,NaN\n2,2,0,0\n3,3,0,0\n";
        let series = load_marker_series(table.as_bytes(), 100.0, "A").unwrap();
        assert!(series.axes[0][1].is_nan());
        let segs = segments(&series.time, &series.axes[0]);
        assert_eq!(segs.len(), 2);
        assert_eq!(segs[0], [(0.0, 1.0)]);
        assert_eq!(segs[1], [(0.02, 2.0), (0.03, 3.0)]);
    }
}
