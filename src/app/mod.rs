mod ui;

use std::{collections::VecDeque, io, time::Duration};

use color_eyre::Result;
use crossterm::{
    event::{
        self, DisableMouseCapture, Event, KeyCode, KeyEvent, KeyEventKind, KeyModifiers,
        MouseButton, MouseEventKind,
    },
    execute,
};
use ratatui::{Terminal, backend::Backend, layout::Rect};
use tracing::{info, warn};

use crate::{
    buffers::SampleWindow,
    chart::{ChartView, Titles},
    frame::Node,
    run::RunPaths,
    sample::Sample,
    session::{Activity, ControlPanel, ControlSignal, LiveChart},
};

const MAX_SERIAL_LINES: usize = 200;

/// Everything the dashboard draws, kept apart from the terminal handle.
#[derive(Debug)]
pub struct DashboardState {
    port: String,
    run: RunPaths,
    status: String,
    connected: [bool; 2],
    serial_lines: VecDeque<String>,
    samples: u64,
    last_sample: Option<Sample>,
    window: SampleWindow,
    titles: Titles,
    /// Where the stop button was last drawn, for mouse hits.
    stop_button: Rect,
}

impl DashboardState {
    pub fn new(port: &str, run: RunPaths, max_points: usize) -> Self {
        Self {
            port: port.to_string(),
            status: format!("Escuchando en {port}..."),
            run,
            connected: [false; 2],
            serial_lines: VecDeque::new(),
            samples: 0,
            last_sample: None,
            window: SampleWindow::new(max_points),
            titles: Titles::default(),
            stop_button: Rect::default(),
        }
    }

    fn view(&self) -> ChartView<'_> {
        ChartView::new(&self.window, &self.titles)
    }

    fn is_connected(&self, node: Node) -> bool {
        self.connected[node.number() as usize - 1]
    }

    fn apply(&mut self, activity: Activity<'_>) {
        match activity {
            Activity::Line(line) => {
                self.serial_lines.push_back(line.to_string());
                while self.serial_lines.len() > MAX_SERIAL_LINES {
                    self.serial_lines.pop_front();
                }
            }
            Activity::Connected(node) => {
                self.connected[node.number() as usize - 1] = true;
                self.status = format!("Nodo {} reportado como CONECTADO", node.number());
            }
            Activity::Rejected(line) => {
                self.status = format!("Paquete inválido: {line}");
            }
            Activity::Recorded(sample) => {
                self.samples += 1;
                self.last_sample = Some(sample.clone());
            }
        }
    }

    /// Map a terminal event to a control signal.
    fn handle_event(&mut self, event: &Event) -> ControlSignal {
        match event {
            Event::Key(key) if key.kind == KeyEventKind::Press => self.on_key_event(*key),
            Event::Mouse(mouse) => {
                let hit = self.stop_button.contains((mouse.column, mouse.row).into());
                if hit && mouse.kind == MouseEventKind::Down(MouseButton::Left) {
                    self.press_stop()
                } else {
                    ControlSignal::Continue
                }
            }
            _ => ControlSignal::Continue,
        }
    }

    fn on_key_event(&mut self, key: KeyEvent) -> ControlSignal {
        match (key.modifiers, key.code) {
            (KeyModifiers::CONTROL, KeyCode::Char('c') | KeyCode::Char('C')) => {
                self.status = "Saliendo por Ctrl+C...".into();
                ControlSignal::Interrupt
            }
            (_, KeyCode::Esc | KeyCode::Char('q') | KeyCode::Char('Q')) => {
                self.status = "Ventana de control cerrada.".into();
                ControlSignal::Closed
            }
            (_, KeyCode::Char('s') | KeyCode::Char('S') | KeyCode::Enter | KeyCode::Char(' ')) => {
                self.press_stop()
            }
            _ => ControlSignal::Continue,
        }
    }

    fn press_stop(&mut self) -> ControlSignal {
        info!("'Parar mediciones' pressed");
        self.status = "Botón 'Parar mediciones' pulsado. Deteniendo adquisición...".into();
        ControlSignal::Stop
    }
}

/// Laboratory name entry shown after acquisition stops.
#[derive(Debug)]
pub struct Prompt {
    node: Node,
    input: String,
}

#[derive(Debug, PartialEq, Eq)]
enum PromptOutcome {
    Answer(String),
    Cancelled,
}

impl Prompt {
    fn new(node: Node) -> Self {
        Self {
            node,
            input: String::new(),
        }
    }

    fn title(&self) -> String {
        format!("Laboratorio nodo {}", self.node.number())
    }

    fn question(&self) -> String {
        format!(
            "Escriba el nombre del laboratorio donde se hizo la medición (nodo {}):",
            self.node.number()
        )
    }

    fn on_key_event(&mut self, key: KeyEvent) -> Option<PromptOutcome> {
        if key.kind != KeyEventKind::Press {
            return None;
        }
        match (key.modifiers, key.code) {
            (KeyModifiers::CONTROL, KeyCode::Char('c') | KeyCode::Char('C')) | (_, KeyCode::Esc) => {
                Some(PromptOutcome::Cancelled)
            }
            (_, KeyCode::Enter) => Some(PromptOutcome::Answer(std::mem::take(&mut self.input))),
            (_, KeyCode::Backspace) => {
                self.input.pop();
                None
            }
            (_, KeyCode::Char(c)) => {
                self.input.push(c);
                None
            }
            _ => None,
        }
    }
}

/// The terminal dashboard: live chart plus the control panel.
pub struct App<B: Backend> {
    terminal: Terminal<B>,
    state: DashboardState,
    destroyed: bool,
}

impl<B: Backend> App<B> {
    pub fn new(terminal: Terminal<B>, state: DashboardState) -> Self {
        Self {
            terminal,
            state,
            destroyed: false,
        }
    }

    fn render(&mut self, prompt: Option<&Prompt>) -> io::Result<()> {
        let state = &self.state;
        let mut stop_button = Rect::default();
        self.terminal
            .draw(|frame| stop_button = ui::draw(frame, state, prompt))?;
        self.state.stop_button = stop_button;
        Ok(())
    }

    /// Draw the dashboard as it stands, logging a failed draw.
    pub fn repaint(&mut self) {
        if let Err(e) = self.render(None) {
            warn!("could not draw dashboard: {e}");
        }
    }
}

impl<B: Backend> LiveChart for App<B> {
    fn redraw(&mut self, view: ChartView<'_>) -> Result<()> {
        self.state.window = view.window.clone();
        self.state.titles = view.titles.clone();
        self.render(None)?;
        Ok(())
    }

    fn note(&mut self, activity: Activity<'_>) {
        self.state.apply(activity);
        // `redraw` follows every recorded sample.
        if !matches!(activity, Activity::Recorded(_)) {
            self.repaint();
        }
    }
}

impl<B: Backend> ControlPanel for App<B> {
    fn poll(&mut self) -> ControlSignal {
        if self.destroyed {
            return ControlSignal::Closed;
        }
        loop {
            match event::poll(Duration::ZERO) {
                Ok(false) => return ControlSignal::Continue,
                Ok(true) => {}
                Err(e) => {
                    warn!("control panel event stream failed: {e}");
                    return ControlSignal::Closed;
                }
            }
            let event = match event::read() {
                Ok(event) => event,
                Err(e) => {
                    warn!("control panel event stream failed: {e}");
                    return ControlSignal::Closed;
                }
            };
            let signal = self.state.handle_event(&event);
            if signal != ControlSignal::Continue {
                // Show the status change before the loop winds down.
                self.repaint();
                return signal;
            }
            if let Event::Resize(_, _) = event {
                self.repaint();
            }
        }
    }

    fn prompt_label(&mut self, node: Node) -> Result<Option<String>> {
        let mut prompt = Prompt::new(node);
        loop {
            self.render(Some(&prompt))?;
            if let Event::Key(key) = event::read()? {
                match prompt.on_key_event(key) {
                    Some(PromptOutcome::Answer(label)) => return Ok(Some(label)),
                    Some(PromptOutcome::Cancelled) => return Ok(None),
                    None => {}
                }
            }
        }
    }

    fn destroy(&mut self) -> Result<()> {
        if self.destroyed {
            return Ok(());
        }
        self.destroyed = true;
        execute!(io::stdout(), DisableMouseCapture)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{esp_port::SerialLineSource, recorder::Recorder, session::Session};
    use crossterm::event::{KeyEventState, MouseEvent};
    use ratatui::backend::TestBackend;
    use std::io::Cursor;

    fn state() -> DashboardState {
        DashboardState::new("/dev/ttyUSB0", RunPaths::new("/tmp/Datos_radon", 7), 48)
    }

    fn key(code: KeyCode, modifiers: KeyModifiers) -> Event {
        Event::Key(KeyEvent {
            code,
            modifiers,
            kind: KeyEventKind::Press,
            state: KeyEventState::NONE,
        })
    }

    fn click(column: u16, row: u16) -> Event {
        Event::Mouse(MouseEvent {
            kind: MouseEventKind::Down(MouseButton::Left),
            column,
            row,
            modifiers: KeyModifiers::NONE,
        })
    }

    fn screen(app: &App<TestBackend>) -> String {
        let buffer = app.terminal.backend().buffer();
        let mut text = String::new();
        for y in 0..buffer.area.height {
            for x in 0..buffer.area.width {
                text.push_str(buffer[(x, y)].symbol());
            }
            text.push('\n');
        }
        text
    }

    #[test]
    fn keys_map_to_control_signals() {
        let mut state = state();
        assert_eq!(
            state.handle_event(&key(KeyCode::Char('c'), KeyModifiers::CONTROL)),
            ControlSignal::Interrupt
        );
        assert_eq!(
            state.handle_event(&key(KeyCode::Char('s'), KeyModifiers::NONE)),
            ControlSignal::Stop
        );
        assert_eq!(
            state.handle_event(&key(KeyCode::Esc, KeyModifiers::NONE)),
            ControlSignal::Closed
        );
        assert_eq!(
            state.handle_event(&key(KeyCode::Char('x'), KeyModifiers::NONE)),
            ControlSignal::Continue
        );
    }

    #[test]
    fn clicking_the_drawn_button_requests_stop() {
        let terminal = Terminal::new(TestBackend::new(120, 40)).unwrap();
        let mut app = App::new(terminal, state());
        app.render(None).unwrap();

        let button = app.state.stop_button;
        assert!(button.width > 0);
        assert_eq!(app.state.handle_event(&click(0, 0)), ControlSignal::Continue);
        assert_eq!(
            app.state.handle_event(&click(button.x + 1, button.y)),
            ControlSignal::Stop
        );
    }

    #[test]
    fn redraw_shows_titles_status_and_button() {
        let terminal = Terminal::new(TestBackend::new(140, 40)).unwrap();
        let mut app = App::new(terminal, state());

        let mut window = SampleWindow::new(48);
        let sample = Sample::new("2026-10-19 10:00:00", 12.5, 0.0);
        window.push(&sample);
        let mut titles = Titles::default();
        titles.apply_label(Node::One, Some("Sótano"));

        app.note(Activity::Line("[HANDSHAKE] Conectado: Nodo_1"));
        app.note(Activity::Connected(Node::One));
        app.note(Activity::Recorded(&sample));
        app.redraw(ChartView::new(&window, &titles)).unwrap();

        let text = screen(&app);
        assert!(text.contains("Actividad de radón en el laboratorio Sótano"));
        assert!(text.contains("Actividad de radón en el laboratorio nodo 2"));
        assert!(text.contains("Parar mediciones"));
        assert!(text.contains("Datos_7.csv"));
        assert!(text.contains("Nodo 1 reportado como CONECTADO"));
    }

    #[test]
    fn panel_is_live_before_any_data_frame() {
        let dir = tempfile::tempdir().unwrap();
        let run = RunPaths::allocate(dir.path()).unwrap();
        let recorder = Recorder::create(&run.csv).unwrap();
        let serial = Cursor::new(b"[HANDSHAKE] Conectado: Nodo_1\nHeartbeat base OK\n".to_vec());
        let source = SerialLineSource::from_reader(serial, "test", Duration::from_secs(1));
        let mut session = Session::new(source, recorder, run.clone(), 48);

        let terminal = Terminal::new(TestBackend::new(140, 40)).unwrap();
        let mut app = App::new(terminal, DashboardState::new("/dev/ttyUSB0", run, 48));
        session.step(&mut app).unwrap();
        session.step(&mut app).unwrap();

        let text = screen(&app);
        assert!(text.contains("Parar mediciones"));
        assert!(text.contains("Nodo 1 reportado como CONECTADO"));
        assert!(text.contains("Heartbeat base OK"));
        let button = app.state.stop_button;
        assert!(button.width > 0);
        assert_eq!(
            app.state.handle_event(&click(button.x + 1, button.y + 1)),
            ControlSignal::Stop
        );
    }

    #[test]
    fn prompt_collects_text_until_enter() {
        let mut prompt = Prompt::new(Node::Two);
        for c in "Lab A".chars() {
            assert_eq!(prompt.on_key_event(KeyEvent::new(KeyCode::Char(c), KeyModifiers::NONE)), None);
        }
        prompt.on_key_event(KeyEvent::new(KeyCode::Backspace, KeyModifiers::NONE));
        assert_eq!(
            prompt.on_key_event(KeyEvent::new(KeyCode::Enter, KeyModifiers::NONE)),
            Some(PromptOutcome::Answer("Lab ".into()))
        );
        assert_eq!(
            prompt.on_key_event(KeyEvent::new(KeyCode::Esc, KeyModifiers::NONE)),
            Some(PromptOutcome::Cancelled)
        );
    }

    #[test]
    fn prompt_is_drawn_over_the_dashboard() {
        let terminal = Terminal::new(TestBackend::new(120, 40)).unwrap();
        let mut app = App::new(terminal, state());
        let prompt = Prompt::new(Node::One);
        app.render(Some(&prompt)).unwrap();
        let text = screen(&app);
        assert!(text.contains("Laboratorio nodo 1"));
    }
}
