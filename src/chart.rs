//! Chart model shared by the live dashboard and the exported figure.

use crate::{buffers::SampleWindow, frame::Node};

pub const Y_AXIS_LABEL: &str = "Actividad de Radón [Bq/m³]";
pub const X_AXIS_LABEL: &str = "Día y fecha del muestreo";
const TITLE_PREFIX: &str = "Actividad de radón en el laboratorio";
const HEADROOM: f64 = 1.1;

/// Per-panel chart titles.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Titles {
    node1: String,
    node2: String,
}

impl Default for Titles {
    fn default() -> Self {
        Self {
            node1: default_title(Node::One),
            node2: default_title(Node::Two),
        }
    }
}

impl Titles {
    pub fn get(&self, node: Node) -> &str {
        match node {
            Node::One => &self.node1,
            Node::Two => &self.node2,
        }
    }

    /// Title a panel after a laboratory name; blank names restore the default.
    pub fn apply_label(&mut self, node: Node, label: Option<&str>) {
        let title = match label.map(str::trim) {
            Some(lab) if !lab.is_empty() => format!("{TITLE_PREFIX} {lab}"),
            _ => default_title(node),
        };
        match node {
            Node::One => self.node1 = title,
            Node::Two => self.node2 = title,
        }
    }
}

pub fn default_title(node: Node) -> String {
    format!("{TITLE_PREFIX} nodo {}", node.number())
}

pub fn series_name(node: Node) -> String {
    format!("Nodo {} (Bq/m³)", node.number())
}

/// Upper Y limit: 1.1 × the series maximum, floored at 1.0 before scaling.
pub fn y_upper_bound<'a>(values: impl IntoIterator<Item = &'a f64>) -> f64 {
    let max = values.into_iter().copied().fold(f64::NEG_INFINITY, f64::max);
    let max = if max.is_finite() && max > 0.0 { max } else { 1.0 };
    max * HEADROOM
}

/// A borrowed, render-ready view of the sample window.
#[derive(Debug, Clone, Copy)]
pub struct ChartView<'a> {
    pub window: &'a SampleWindow,
    pub titles: &'a Titles,
}

impl<'a> ChartView<'a> {
    pub fn new(window: &'a SampleWindow, titles: &'a Titles) -> Self {
        Self { window, titles }
    }

    pub fn len(&self) -> usize {
        self.window.len()
    }

    pub fn is_empty(&self) -> bool {
        self.window.is_empty()
    }

    /// X runs over sample positions; keep a non-degenerate span when short.
    pub fn x_bounds(&self) -> [f64; 2] {
        [0.0, (self.len().saturating_sub(1)).max(1) as f64]
    }

    pub fn y_bounds(&self, node: Node) -> [f64; 2] {
        [0.0, y_upper_bound(self.values(node))]
    }

    pub fn values(&self, node: Node) -> impl Iterator<Item = &'a f64> + 'a {
        match node {
            Node::One => self.window.node1().iter(),
            Node::Two => self.window.node2().iter(),
        }
    }

    pub fn points(&self, node: Node) -> Vec<(f64, f64)> {
        self.values(node)
            .enumerate()
            .map(|(i, v)| (i as f64, *v))
            .collect()
    }

    pub fn timestamps(&self) -> Vec<&'a str> {
        self.window.times().iter().map(String::as_str).collect()
    }

    pub fn title(&self, node: Node) -> &'a str {
        self.titles.get(node)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sample::Sample;

    #[test]
    fn empty_or_non_positive_series_floor_at_one() {
        assert_eq!(y_upper_bound(&[]), 1.1);
        assert_eq!(y_upper_bound(&[0.0, 0.0]), 1.1);
        assert_eq!(y_upper_bound(&[-3.0]), 1.1);
    }

    #[test]
    fn positive_series_gets_headroom() {
        let bound = y_upper_bound(&[2.0, 10.0, 4.0]);
        assert!((bound - 11.0).abs() < 1e-9);
    }

    #[test]
    fn labels_replace_titles_and_blank_restores_default() {
        let mut titles = Titles::default();
        titles.apply_label(Node::One, Some("  Física Nuclear "));
        titles.apply_label(Node::Two, Some("   "));
        assert_eq!(
            titles.get(Node::One),
            "Actividad de radón en el laboratorio Física Nuclear"
        );
        assert_eq!(titles.get(Node::Two), "Actividad de radón en el laboratorio nodo 2");

        titles.apply_label(Node::One, None);
        assert_eq!(titles.get(Node::One), default_title(Node::One));
    }

    #[test]
    fn view_scales_each_node_independently() {
        let mut window = SampleWindow::new(4);
        window.push(&Sample::new("a", 5.0, 0.0));
        window.push(&Sample::new("b", 20.0, 0.0));
        let titles = Titles::default();
        let view = ChartView::new(&window, &titles);

        assert_eq!(view.x_bounds(), [0.0, 1.0]);
        assert!((view.y_bounds(Node::One)[1] - 22.0).abs() < 1e-9);
        assert_eq!(view.y_bounds(Node::Two), [0.0, 1.1]);
        assert_eq!(view.points(Node::One), vec![(0.0, 5.0), (1.0, 20.0)]);
        assert_eq!(view.timestamps(), vec!["a", "b"]);
    }
}
