use std::{
    fs::File,
    io,
    path::{Path, PathBuf},
};

use csv::{Terminator, Writer, WriterBuilder};

use crate::sample::Sample;

pub const CSV_HEADER: [&str; 3] = ["hora", "nodo1_Bq_m3", "nodo2_Bq_m3"];

/// Append-only CSV log of accepted samples, flushed after every row.
pub struct Recorder {
    out: Writer<File>,
    path: PathBuf,
}

impl Recorder {
    /// Create (truncate) the log and write the header row.
    pub fn create(path: impl AsRef<Path>) -> io::Result<Self> {
        let path = path.as_ref().to_path_buf();
        let mut out = WriterBuilder::new()
            .has_headers(false)
            .terminator(Terminator::Any(b'\n'))
            .from_writer(File::create(&path)?);
        out.write_record(CSV_HEADER)?;
        out.flush()?;
        Ok(Self { out, path })
    }

    pub fn write_sample(&mut self, sample: &Sample) -> io::Result<()> {
        self.out.write_record([
            sample.timestamp.as_str(),
            &format_value(sample.node1),
            &format_value(sample.node2),
        ])?;
        self.out.flush()?;
        Ok(())
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn close(mut self) -> io::Result<()> {
        self.out.flush()
    }
}

// Always keep a decimal point so spreadsheets read the column as numeric.
fn format_value(v: f64) -> String {
    format!("{v:?}")
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    #[test]
    fn header_once_then_one_line_per_sample() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("Datos_1.csv");
        let mut recorder = Recorder::create(&path).unwrap();

        recorder
            .write_sample(&Sample::new("2026-10-19 10:00:00", 12.5, 0.0))
            .unwrap();
        // Visible before close: every row is flushed.
        let partial = fs::read_to_string(&path).unwrap();
        assert_eq!(partial, "hora,nodo1_Bq_m3,nodo2_Bq_m3\n2026-10-19 10:00:00,12.5,0.0\n");

        recorder
            .write_sample(&Sample::new("2026-10-19 11:00:00", 3.0, 41.25))
            .unwrap();
        recorder.close().unwrap();

        let content = fs::read_to_string(&path).unwrap();
        let lines: Vec<_> = content.lines().collect();
        assert_eq!(
            lines,
            vec![
                "hora,nodo1_Bq_m3,nodo2_Bq_m3",
                "2026-10-19 10:00:00,12.5,0.0",
                "2026-10-19 11:00:00,3.0,41.25",
            ]
        );
    }
}
