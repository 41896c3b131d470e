use ratatui::{
    Frame,
    layout::{Alignment, Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style, Stylize},
    symbols::Marker,
    text::{Line, Span, Text},
    widgets::{Axis, Block, Chart, Clear, Dataset, GraphType, Paragraph, Wrap},
};

use super::{DashboardState, Prompt};
use crate::{
    chart::{ChartView, Y_AXIS_LABEL, series_name},
    frame::Node,
};

const STOP_LABEL: &str = "Parar mediciones";

/// Draw the whole dashboard; returns the stop button's area.
pub fn draw(frame: &mut Frame, state: &DashboardState, prompt: Option<&Prompt>) -> Rect {
    let rows = Layout::default()
        .direction(Direction::Vertical)
        .constraints(vec![
            Constraint::Length(4),
            Constraint::Min(10),
            Constraint::Length(3),
        ])
        .split(frame.area());

    let body = Layout::default()
        .direction(Direction::Horizontal)
        .constraints(vec![Constraint::Percentage(75), Constraint::Percentage(25)])
        .split(rows[1]);

    draw_header(frame, rows[0], state);
    draw_charts(frame, body[0], &state.view());
    draw_side(frame, body[1], state);
    let button = draw_footer(frame, rows[2], state);

    if let Some(prompt) = prompt {
        draw_prompt(frame, prompt);
    }
    button
}

fn draw_header(frame: &mut Frame, area: Rect, state: &DashboardState) {
    let run = &state.run;
    let text = Text::from(vec![
        Line::from(vec![
            Span::styled("Puerto: ", Style::default().fg(Color::Gray)),
            Span::raw(state.port.clone()),
            Span::styled("   Toma: ", Style::default().fg(Color::Gray)),
            Span::raw(run.index.to_string()),
            Span::styled("   Muestras: ", Style::default().fg(Color::Gray)),
            Span::raw(state.samples.to_string()),
        ]),
        Line::from(vec![
            Span::styled("Datos: ", Style::default().fg(Color::Gray)),
            Span::raw(run.csv.display().to_string()),
            Span::styled("   Figura: ", Style::default().fg(Color::Gray)),
            Span::raw(run.figure.display().to_string()),
        ]),
    ]);
    frame.render_widget(
        Paragraph::new(text).block(Block::bordered().title("Control radón")),
        area,
    );
}

fn draw_charts(frame: &mut Frame, area: Rect, view: &ChartView<'_>) {
    let panels = Layout::default()
        .direction(Direction::Vertical)
        .constraints(vec![Constraint::Percentage(50), Constraint::Percentage(50)])
        .split(area);

    for (panel, node) in panels.iter().zip(Node::ALL) {
        draw_chart(frame, *panel, view, node);
    }
}

fn draw_chart(frame: &mut Frame, area: Rect, view: &ChartView<'_>, node: Node) {
    let block = Block::bordered().title(view.title(node).to_string());
    if view.is_empty() {
        frame.render_widget(
            Paragraph::new("Esperando datos (RADON_JSON)...").block(block),
            area,
        );
        return;
    }

    let points = view.points(node);
    let dataset = Dataset::default()
        .name(series_name(node))
        .marker(Marker::Braille)
        .graph_type(GraphType::Line)
        .style(Color::Cyan)
        .data(&points);

    let [y_min, y_max] = view.y_bounds(node);
    let y_labels = vec![
        format!("{y_min:.0}"),
        format!("{:.1}", y_max / 2.0),
        format!("{y_max:.1}"),
    ];

    // Shared time axis: only the bottom panel carries timestamps.
    let x_axis = Axis::default().bounds(view.x_bounds());
    let x_axis = if node == Node::Two {
        x_axis.labels(time_labels(&view.timestamps()))
    } else {
        x_axis
    };

    let chart = Chart::new(vec![dataset])
        .block(block)
        .x_axis(x_axis.style(Style::default().fg(Color::Gray)))
        .y_axis(
            Axis::default()
                .title(Y_AXIS_LABEL)
                .style(Style::default().fg(Color::Gray))
                .bounds([y_min, y_max])
                .labels(y_labels),
        );
    frame.render_widget(chart, area);
}

/// First, middle and last timestamps; a terminal axis has no room for all N.
fn time_labels(times: &[&str]) -> Vec<String> {
    match times {
        [] => Vec::new(),
        [only] => vec![only.to_string(), String::new()],
        [first, .., last] if times.len() == 2 => vec![first.to_string(), last.to_string()],
        [first, .., last] => vec![
            first.to_string(),
            times[times.len() / 2].to_string(),
            last.to_string(),
        ],
    }
}

fn draw_side(frame: &mut Frame, area: Rect, state: &DashboardState) {
    let split = Layout::default()
        .direction(Direction::Vertical)
        .constraints(vec![Constraint::Length(6), Constraint::Min(3)])
        .split(area);

    let mut nodes = Text::default();
    for node in Node::ALL {
        let (label, color) = if state.is_connected(node) {
            ("CONECTADO", Color::Green)
        } else {
            ("sin handshake", Color::DarkGray)
        };
        nodes.extend([Line::from(vec![
            Span::raw(format!("Nodo {}: ", node.number())),
            Span::styled(label, Style::default().fg(color)),
        ])]);
    }
    if let Some(last) = &state.last_sample {
        nodes.extend([Line::from(format!("Última: {}", last.timestamp))]);
        nodes.extend([Line::from(format!("  {:.3} / {:.3} Bq/m³", last.node1, last.node2))]);
    }
    frame.render_widget(
        Paragraph::new(nodes).block(Block::bordered().title("Nodos")),
        split[0],
    );

    let height = split[1].height.saturating_sub(2) as usize;
    let skip = state.serial_lines.len().saturating_sub(height);
    let lines: Vec<Line> = state
        .serial_lines
        .iter()
        .skip(skip)
        .map(|l| Line::from(l.as_str()))
        .collect();
    frame.render_widget(
        Paragraph::new(lines).block(Block::bordered().title("Puerto serie")),
        split[1],
    );
}

fn draw_footer(frame: &mut Frame, area: Rect, state: &DashboardState) -> Rect {
    let split = Layout::default()
        .direction(Direction::Horizontal)
        .constraints(vec![
            Constraint::Min(20),
            Constraint::Length(STOP_LABEL.len() as u16 + 6),
        ])
        .split(area);

    let help = Line::from(vec![
        Span::raw(state.status.clone()),
        Span::styled(
            "   s/Enter: parar  q/Esc: cerrar  Ctrl+C: salir",
            Style::default().fg(Color::DarkGray),
        ),
    ]);
    frame.render_widget(
        Paragraph::new(help).block(Block::bordered().title("Estado")),
        split[0],
    );

    let button = split[1];
    frame.render_widget(
        Paragraph::new(STOP_LABEL)
            .alignment(Alignment::Center)
            .style(
                Style::default()
                    .fg(Color::White)
                    .bg(Color::Red)
                    .add_modifier(Modifier::BOLD),
            )
            .block(Block::bordered()),
        button,
    );
    button
}

fn draw_prompt(frame: &mut Frame, prompt: &Prompt) {
    let area = centered(frame.area(), 64, 7);
    let text = Text::from(vec![
        Line::from(prompt.question()),
        Line::from(""),
        Line::from(vec![
            Span::raw("> "),
            Span::raw(prompt.input.clone()).yellow(),
            Span::raw("_").slow_blink(),
        ]),
    ]);
    frame.render_widget(Clear, area);
    frame.render_widget(
        Paragraph::new(text)
            .wrap(Wrap { trim: false })
            .block(
                Block::bordered()
                    .title(prompt.title())
                    .title_bottom("Enter: aceptar  Esc: omitir")
                    .style(Style::default().fg(Color::Cyan)),
            ),
        area,
    );
}

fn centered(area: Rect, width: u16, height: u16) -> Rect {
    let width = width.min(area.width);
    let height = height.min(area.height);
    Rect {
        x: area.x + (area.width - width) / 2,
        y: area.y + (area.height - height) / 2,
        width,
        height,
    }
}
