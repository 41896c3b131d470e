//! Final figure: both panels drawn with `plotters` and written as EPS.

pub mod eps;

use std::path::Path;

use color_eyre::Result;
use plotters::{
    coord::Shift, drawing::DrawingAreaErrorKind, prelude::*, style::FontTransform,
};
use plotters_backend::DrawingBackend;

use crate::{
    chart::{ChartView, X_AXIS_LABEL, Y_AXIS_LABEL, series_name},
    frame::Node,
};
use eps::EpsBackend;

/// Page size in points (7 × 6 in).
pub const FIGURE_SIZE: (u32, u32) = (504, 432);

pub fn write_eps(view: &ChartView<'_>, path: &Path) -> Result<()> {
    let root = EpsBackend::new(path, FIGURE_SIZE).into_drawing_area();
    draw_figure(&root, view)?;
    root.present()?;
    Ok(())
}

/// Two stacked panels sharing the timestamp axis; only the bottom one shows it.
pub fn draw_figure<DB: DrawingBackend>(
    root: &DrawingArea<DB, Shift>,
    view: &ChartView<'_>,
) -> Result<(), DrawingAreaErrorKind<DB::ErrorType>> {
    root.fill(&WHITE)?;
    let panels = root.split_evenly((2, 1));
    let times = view.timestamps();
    let [x_min, x_max] = view.x_bounds();

    let timestamp_label = |x: &f64| {
        let i = x.round();
        if (x - i).abs() > 1e-6 || i < 0.0 {
            return String::new();
        }
        times.get(i as usize).map(|t| t.to_string()).unwrap_or_default()
    };
    let no_label = |_: &f64| String::new();

    for (panel, node) in panels.iter().zip(Node::ALL) {
        let bottom = node == Node::Two;
        let [_, y_max] = view.y_bounds(node);

        let mut chart = ChartBuilder::on(panel)
            .caption(view.title(node), ("sans-serif", 13).into_font())
            .margin(8)
            .x_label_area_size(if bottom { 100 } else { 10 })
            .y_label_area_size(55)
            .build_cartesian_2d(x_min..x_max, 0f64..y_max)?;

        let mut mesh = chart.configure_mesh();
        mesh.y_desc(Y_AXIS_LABEL)
            .axis_desc_style(("sans-serif", 10))
            .x_labels(times.len().max(2));
        if bottom {
            mesh.x_desc(X_AXIS_LABEL)
                .x_label_formatter(&timestamp_label)
                .x_label_style(
                    ("sans-serif", 8)
                        .into_font()
                        .transform(FontTransform::Rotate90),
                );
        } else {
            mesh.x_label_formatter(&no_label);
        }
        mesh.draw()?;

        chart
            .draw_series(LineSeries::new(view.points(node), &BLUE))?
            .label(series_name(node))
            .legend(|(x, y)| PathElement::new(vec![(x, y), (x + 16, y)], BLUE));
        chart.draw_series(
            view.points(node)
                .into_iter()
                .map(|p| Circle::new(p, 2, BLUE.filled())),
        )?;
        chart
            .configure_series_labels()
            .position(SeriesLabelPosition::UpperRight)
            .label_font(("sans-serif", 9))
            .background_style(WHITE.mix(0.8))
            .border_style(BLACK)
            .draw()?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{buffers::SampleWindow, chart::Titles, sample::Sample};
    use std::fs;

    #[test]
    fn writes_an_eps_with_titles_and_timestamps() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("Figura_datos_toma_1.eps");

        let mut window = SampleWindow::new(48);
        window.push(&Sample::new("2026-10-19 10:00:00", 12.5, 3.0));
        window.push(&Sample::new("2026-10-19 11:00:00", 14.0, 0.0));
        let mut titles = Titles::default();
        titles.apply_label(Node::One, Some("Sótano"));

        write_eps(&ChartView::new(&window, &titles), &path).unwrap();

        let eps = fs::read_to_string(&path).unwrap();
        assert!(eps.starts_with("%!PS-Adobe-3.0 EPSF-3.0\n%%BoundingBox: 0 0 504 432\n"));
        assert!(eps.trim_end().ends_with("%%EOF"));
        assert!(eps.contains("(Actividad de rad\\363n en el laboratorio S\\363tano)"));
        assert!(eps.contains("(Actividad de rad\\363n en el laboratorio nodo 2)"));
        assert!(eps.contains("(2026-10-19 11:00:00)"));
        assert!(eps.contains("-90 rotate"));
    }

    #[test]
    fn empty_window_still_exports() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("empty.eps");
        let window = SampleWindow::new(48);
        let titles = Titles::default();
        write_eps(&ChartView::new(&window, &titles), &path).unwrap();
        assert!(fs::read_to_string(&path).unwrap().contains("showpage"));
    }

    #[test]
    fn unwritable_path_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("missing").join("figure.eps");
        let window = SampleWindow::new(4);
        let titles = Titles::default();
        assert!(write_eps(&ChartView::new(&window, &titles), &path).is_err());
    }
}
