//! ASCII plotting for terminal output.
//!
//! This is intentionally "dumb" (fixed-size grid), optimized for:
//! - quick visual sanity checks in a terminal
//! - deterministic output (helpful for golden tests)
//!
//! Plot elements:
//! - observed BOD: `o`
//! - fitted curve: `-` line

use crate::domain::{CurveModel, Observation, ReportFile};
use crate::models::{Logistic, ModelForm};

/// Render observations with an optional fitted curve on top.
pub fn render_ascii_plot(
    observations: &[Observation],
    curve: Option<&CurveModel>,
    width: usize,
    height: usize,
) -> String {
    let points: Vec<(f64, f64)> = observations.iter().map(|o| (o.time_days, o.bod)).collect();
    let (t_min, t_max) = x_range(&points).unwrap_or((0.0, 30.0));
    let curve_points = curve.map(|c| sample_curve(c, t_min, t_max, width.max(2)));
    render_plot(&points, curve_points.as_deref(), t_min, t_max, width, height)
}

/// Render the fitted grid stored in a report JSON file.
pub fn render_ascii_plot_from_report(report: &ReportFile, width: usize, height: usize) -> String {
    let curve_points: Vec<(f64, f64)> = report
        .grid
        .time_days
        .iter()
        .zip(report.grid.bod.iter())
        .map(|(&t, &y)| (t, y))
        .collect();
    let (t_min, t_max) = x_range(&curve_points).unwrap_or((0.0, 30.0));
    render_plot(&[], Some(&curve_points), t_min, t_max, width, height)
}

fn render_plot(
    points: &[(f64, f64)],
    curve_points: Option<&[(f64, f64)]>,
    t_min: f64,
    t_max: f64,
    width: usize,
    height: usize,
) -> String {
    let width = width.max(10);
    let height = height.max(5);

    let (y_min, y_max) = y_range(points, curve_points).unwrap_or((0.0, 1.0));
    let (y_min, y_max) = pad_range(y_min, y_max, 0.05);

    let mut grid = vec![vec![' '; width]; height];

    // Curve first so points overlay it.
    if let Some(curve) = curve_points {
        draw_curve(&mut grid, curve, t_min, t_max, y_min, y_max);
    }

    for &(t, y) in points {
        if !(t.is_finite() && y.is_finite()) {
            continue;
        }
        let x = map_x(t, t_min, t_max, width);
        let row = map_y(y, y_min, y_max, height);
        grid[row][x] = 'o';
    }

    let mut out = String::new();
    out.push_str(&format!(
        "Plot: t=[{t_min:.2}, {t_max:.2}] d | BOD=[{y_min:.2}, {y_max:.2}] mg/L\n"
    ));
    for row in grid {
        out.push_str(&row.into_iter().collect::<String>());
        out.push('\n');
    }
    out
}

fn x_range(points: &[(f64, f64)]) -> Option<(f64, f64)> {
    let (min_t, max_t) = points
        .iter()
        .map(|&(t, _)| t)
        .filter(|t| t.is_finite())
        .fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), t| (lo.min(t), hi.max(t)));
    if min_t.is_finite() && max_t.is_finite() && max_t > min_t {
        Some((min_t, max_t))
    } else {
        None
    }
}

fn sample_curve(curve: &CurveModel, t_min: f64, t_max: f64, n: usize) -> Vec<(f64, f64)> {
    let n = n.max(2);
    (0..n)
        .map(|i| {
            let u = i as f64 / (n as f64 - 1.0);
            let t = t_min + u * (t_max - t_min);
            (t, Logistic.predict(t, &curve.params))
        })
        .collect()
}

fn y_range(points: &[(f64, f64)], curve: Option<&[(f64, f64)]>) -> Option<(f64, f64)> {
    let mut min_y = f64::INFINITY;
    let mut max_y = f64::NEG_INFINITY;
    for &(_, y) in points.iter().chain(curve.unwrap_or(&[])) {
        if y.is_finite() {
            min_y = min_y.min(y);
            max_y = max_y.max(y);
        }
    }
    if min_y.is_finite() && max_y.is_finite() && max_y > min_y {
        Some((min_y, max_y))
    } else {
        None
    }
}

fn pad_range(min: f64, max: f64, frac: f64) -> (f64, f64) {
    let span = (max - min).abs();
    let pad = (span * frac).max(1e-12);
    (min - pad, max + pad)
}

fn map_x(t: f64, t_min: f64, t_max: f64, width: usize) -> usize {
    let width = width.max(2);
    let u = ((t - t_min) / (t_max - t_min)).clamp(0.0, 1.0);
    (u * (width as f64 - 1.0)).round() as usize
}

fn map_y(y: f64, y_min: f64, y_max: f64, height: usize) -> usize {
    let height = height.max(2);
    let u = ((y - y_min) / (y_max - y_min)).clamp(0.0, 1.0);
    // Row 0 is the top (largest BOD).
    (height as f64 - 1.0 - (u * (height as f64 - 1.0))).round() as usize
}

fn draw_curve(grid: &mut [Vec<char>], curve: &[(f64, f64)], t_min: f64, t_max: f64, y_min: f64, y_max: f64) {
    if curve.len() < 2 {
        return;
    }
    let height = grid.len();
    let width = grid[0].len();

    let mut prev = None;
    for &(t, y) in curve.iter().filter(|(t, y)| t.is_finite() && y.is_finite()) {
        let x = map_x(t, t_min, t_max, width);
        let row = map_y(y, y_min, y_max, height);
        match prev {
            Some((x0, y0)) => draw_line(grid, x0, y0, x, row, '-'),
            None => grid[row][x] = '-',
        }
        prev = Some((x, row));
    }
}

/// Integer line drawing (Bresenham).
fn draw_line(grid: &mut [Vec<char>], x0: usize, y0: usize, x1: usize, y1: usize, ch: char) {
    let (mut x, mut y) = (x0 as isize, y0 as isize);
    let (x1, y1) = (x1 as isize, y1 as isize);

    let dx = (x1 - x).abs();
    let sx = if x < x1 { 1 } else { -1 };
    let dy = -(y1 - y).abs();
    let sy = if y < y1 { 1 } else { -1 };
    let mut err = dx + dy;

    loop {
        if let Some(cell) = grid.get_mut(y as usize).and_then(|r| r.get_mut(x as usize)) {
            if *cell == ' ' {
                *cell = ch;
            }
        }
        if x == x1 && y == y1 {
            break;
        }
        let e2 = 2 * err;
        if e2 >= dy {
            err += dy;
            x += sx;
        }
        if e2 <= dx {
            err += dx;
            y += sy;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{Habitat, Parameters, Treatment};

    fn obs(t: f64, bod: f64) -> Observation {
        Observation {
            reactor: "R1".to_string(),
            habitat: Habitat::Sand,
            treatment: Treatment::Paper,
            time_days: t,
            pressure: 0.0,
            adjusted_pressure: 0.0,
            bod,
        }
    }

    #[test]
    fn plot_golden_snapshot_small() {
        // limit=0 gives a flat curve along the bottom row.
        let flat = CurveModel {
            params: Parameters::new(0.0, 1.0, 0.0),
            rss: 0.0,
            iterations: 1,
        };
        let txt = render_ascii_plot(&[obs(0.0, 0.0), obs(10.0, 10.0)], Some(&flat), 10, 5);
        let expected = concat!(
            "Plot: t=[0.00, 10.00] d | BOD=[-0.50, 10.50] mg/L\n",
            "         o\n",
            "          \n",
            "          \n",
            "          \n",
            "o---------\n",
        );
        assert_eq!(txt, expected);
    }

    #[test]
    fn rising_curve_reaches_the_top_right() {
        let curve = CurveModel {
            params: Parameters::new(5.0, 2.0, 70.0),
            rss: 0.0,
            iterations: 1,
        };
        let txt = render_ascii_plot(&[obs(0.0, 0.0), obs(10.0, 70.0)], Some(&curve), 20, 8);
        let rows: Vec<&str> = txt.lines().skip(1).collect();
        assert_eq!(rows.len(), 8);
        assert!(rows[0].ends_with('o'));
        assert!(rows[7].starts_with('o'));
        assert!(rows.iter().any(|r| r.contains('-')));
    }
}
