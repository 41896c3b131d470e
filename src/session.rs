//! Acquisition loop and end-of-run finalization.
//!
//! One thread does everything: poll the control panel, read a line, parse
//! it, record the sample, redraw. The dashboard is reached only through
//! [`LiveChart`] and [`ControlPanel`], so the loop runs without a terminal.

use std::path::PathBuf;

use color_eyre::{
    Report, Result,
    eyre::{WrapErr, eyre},
};
use tracing::{debug, error, info, warn};

use crate::{
    buffers::SampleWindow,
    chart::{ChartView, Titles},
    esp_port::LineSource,
    export,
    frame::{self, Node},
    recorder::Recorder,
    run::RunPaths,
    sample::Sample,
};

/// What the control panel reported on its latest poll.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ControlSignal {
    Continue,
    /// The stop button was pressed.
    Stop,
    /// The panel is gone (closed by the operator or its event stream failed).
    Closed,
    /// Ctrl-C.
    Interrupt,
}

/// Side information the dashboard may show; it never affects acquisition.
#[derive(Debug, Clone, Copy)]
pub enum Activity<'a> {
    Line(&'a str),
    Connected(Node),
    Rejected(&'a str),
    Recorded(&'a Sample),
}

pub trait LiveChart {
    fn redraw(&mut self, view: ChartView<'_>) -> Result<()>;

    fn note(&mut self, _activity: Activity<'_>) {}
}

pub trait ControlPanel {
    /// Must not block.
    fn poll(&mut self) -> ControlSignal;

    /// Ask for the laboratory name of `node`. `None` means no answer.
    fn prompt_label(&mut self, node: Node) -> Result<Option<String>>;

    fn destroy(&mut self) -> Result<()>;
}

#[derive(Debug)]
pub enum StopReason {
    Requested,
    PanelClosed,
    Interrupted,
    Failed(Report),
}

impl StopReason {
    fn from_signal(signal: ControlSignal) -> Option<Self> {
        match signal {
            ControlSignal::Continue => None,
            ControlSignal::Stop => Some(StopReason::Requested),
            ControlSignal::Closed => Some(StopReason::PanelClosed),
            ControlSignal::Interrupt => Some(StopReason::Interrupted),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FinalizeStep {
    PromptLabel(Node),
    ApplyTitles,
    ExportFigure,
    CloseLog,
    DestroyPanel,
}

/// Outcome of [`Session::finalize`].
#[derive(Debug)]
pub struct Summary {
    pub reason: StopReason,
    pub samples: u64,
    pub csv: PathBuf,
    pub figure: Option<PathBuf>,
    pub titles: Titles,
    pub failures: Vec<(FinalizeStep, Report)>,
}

pub struct Session<S> {
    source: S,
    window: SampleWindow,
    recorder: Option<Recorder>,
    run: RunPaths,
    titles: Titles,
    samples: u64,
}

impl<S: LineSource> Session<S> {
    pub fn new(source: S, recorder: Recorder, run: RunPaths, max_points: usize) -> Self {
        Self {
            source,
            window: SampleWindow::new(max_points),
            recorder: Some(recorder),
            run,
            titles: Titles::default(),
            samples: 0,
        }
    }

    pub fn view(&self) -> ChartView<'_> {
        ChartView::new(&self.window, &self.titles)
    }

    /// Run until the control panel asks to stop or something fails.
    pub fn run<D: LiveChart + ControlPanel>(&mut self, dashboard: &mut D) -> StopReason {
        loop {
            if let Some(reason) = StopReason::from_signal(dashboard.poll()) {
                match reason {
                    StopReason::Requested => info!("stop button pressed, stopping acquisition"),
                    StopReason::PanelClosed => info!("control panel closed, stopping acquisition"),
                    StopReason::Interrupted => info!("interrupted, stopping acquisition"),
                    StopReason::Failed(_) => {}
                }
                return reason;
            }

            if let Err(e) = self.step(dashboard) {
                error!("acquisition stopped: {e:#}");
                return StopReason::Failed(e);
            }
        }
    }

    /// Read and handle at most one line.
    pub fn step<C: LiveChart>(&mut self, chart: &mut C) -> Result<()> {
        let line = self
            .source
            .read_line()
            .wrap_err("reading from the serial port")?;
        match line {
            Some(raw) if !raw.is_empty() => self.handle_line(&raw, chart),
            _ => Ok(()),
        }
    }

    pub fn handle_line<C: LiveChart>(&mut self, raw: &str, chart: &mut C) -> Result<()> {
        debug!(target: "serial", "{raw}");
        chart.note(Activity::Line(raw));

        for node in frame::handshake_nodes(raw) {
            info!("node {} reported as connected", node.number());
            chart.note(Activity::Connected(node));
        }

        let reading = match frame::parse_line(raw) {
            Ok(Some(reading)) => reading,
            Ok(None) => return Ok(()),
            Err(e) => {
                warn!("skipping frame: {e}");
                chart.note(Activity::Rejected(raw));
                return Ok(());
            }
        };

        let sample = Sample::now(reading.node1, reading.node2);
        self.record(&sample)?;
        chart.note(Activity::Recorded(&sample));
        chart.redraw(self.view())
    }

    /// Append to the CSV log, then to the chart window.
    pub fn record(&mut self, sample: &Sample) -> Result<()> {
        let recorder = self
            .recorder
            .as_mut()
            .ok_or_else(|| eyre!("CSV log already closed"))?;
        recorder
            .write_sample(sample)
            .wrap_err_with(|| format!("writing {}", recorder.path().display()))?;
        self.window.push(sample);
        self.samples += 1;
        Ok(())
    }

    /// Label, export and release everything. Every step runs even if an
    /// earlier one failed.
    pub fn finalize<D: LiveChart + ControlPanel>(
        mut self,
        dashboard: &mut D,
        reason: StopReason,
    ) -> Summary {
        let mut failures = Vec::new();

        for node in Node::ALL {
            let label = match dashboard.prompt_label(node) {
                Ok(label) => label,
                Err(e) => {
                    warn!("label prompt for node {} failed: {e:#}", node.number());
                    failures.push((FinalizeStep::PromptLabel(node), e));
                    None
                }
            };
            self.titles.apply_label(node, label.as_deref());
        }

        if let Err(e) = dashboard.redraw(self.view()) {
            warn!("could not redraw with final titles: {e:#}");
            failures.push((FinalizeStep::ApplyTitles, e));
        }

        info!("saving figure to {}", self.run.figure.display());
        let figure = match export::write_eps(&self.view(), &self.run.figure) {
            Ok(()) => {
                info!("figure saved to {}", self.run.figure.display());
                Some(self.run.figure.clone())
            }
            Err(e) => {
                error!("could not save figure: {e:#}");
                failures.push((FinalizeStep::ExportFigure, e));
                None
            }
        };

        if let Some(recorder) = self.recorder.take() {
            let path = recorder.path().to_path_buf();
            if let Err(e) = recorder.close() {
                error!("could not close {}: {e}", path.display());
                failures.push((FinalizeStep::CloseLog, Report::new(e)));
            }
        }

        self.source.close();
        info!("serial port closed");

        if let Err(e) = dashboard.destroy() {
            warn!("could not tear down control panel: {e:#}");
            failures.push((FinalizeStep::DestroyPanel, e));
        }

        Summary {
            reason,
            samples: self.samples,
            csv: self.run.csv.clone(),
            figure,
            titles: self.titles,
            failures,
        }
    }
}
