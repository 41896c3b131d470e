use std::io;

use color_eyre::{Result, eyre::WrapErr};
use crossterm::{event::EnableMouseCapture, execute};
use tracing::info;

pub mod app;
pub mod buffers;
pub mod chart;
pub mod config;
pub mod esp_port;
pub mod export;
pub mod frame;
pub mod logging;
pub mod recorder;
pub mod run;
pub mod sample;
pub mod session;

use crate::{
    app::{App, DashboardState},
    config::Config,
    esp_port::{FALLBACK_PORT, SerialLineSource},
    frame::Node,
    recorder::Recorder,
    run::RunPaths,
    session::{Session, StopReason},
};

/// Entry point: open the port and log, run the dashboard, then finalize.
fn main() -> Result<()> {
    color_eyre::install()?;
    let config = Config::load()?;

    let run = RunPaths::allocate(config.output_dir())
        .wrap_err("preparing the output folder")?;
    let _log_guard = logging::init(&run.dir);
    info!("data folder: {}", run.dir.display());
    info!("data file: {}", run.csv.display());
    info!("figure file: {}", run.figure.display());

    let port_name = config
        .port
        .clone()
        .or_else(esp_port::find_esp_port)
        .unwrap_or_else(|| FALLBACK_PORT.to_string());
    let source = SerialLineSource::open(&port_name, config.baud_rate, config.read_timeout())
        .wrap_err_with(|| format!("opening serial port {port_name}"))?;
    info!("listening on {} at {} baud", port_name, config.baud_rate);

    let recorder = Recorder::create(&run.csv)
        .wrap_err_with(|| format!("creating {}", run.csv.display()))?;

    let terminal = ratatui::init();
    if let Err(e) = execute!(io::stdout(), EnableMouseCapture) {
        ratatui::restore();
        return Err(e).wrap_err("enabling mouse capture");
    }
    let mut app = App::new(
        terminal,
        DashboardState::new(&port_name, run.clone(), config.max_points),
    );
    let mut session = Session::new(source, recorder, run, config.max_points);
    app.repaint();

    let reason = session.run(&mut app);
    let summary = session.finalize(&mut app, reason);
    drop(app);
    ratatui::restore();

    match &summary.figure {
        Some(path) => println!("Figura guardada en: {}", path.display()),
        None => println!("No se pudo guardar la figura (ver {})", logging::LOG_FILE),
    }
    for node in Node::ALL {
        println!("Panel {}: {}", node.number(), summary.titles.get(node));
    }
    println!(
        "{} muestras registradas en {}. Puerto serie cerrado.",
        summary.samples,
        summary.csv.display()
    );
    for (step, err) in &summary.failures {
        eprintln!("{step:?}: {err:#}");
    }

    match summary.reason {
        StopReason::Failed(e) => Err(e),
        _ => Ok(()),
    }
}
