use std::{
    fs, io,
    path::{Path, PathBuf},
};

const CSV_PREFIX: &str = "Datos_";
const CSV_SUFFIX: &str = ".csv";

/// Output files for one acquisition run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunPaths {
    pub index: u32,
    pub dir: PathBuf,
    pub csv: PathBuf,
    pub figure: PathBuf,
}

impl RunPaths {
    pub fn new(dir: impl Into<PathBuf>, index: u32) -> Self {
        let dir = dir.into();
        Self {
            index,
            csv: dir.join(format!("{CSV_PREFIX}{index}{CSV_SUFFIX}")),
            figure: dir.join(format!("Figura_datos_toma_{index}.eps")),
            dir,
        }
    }

    /// Create `dir` if needed and pick the next unused run index in it.
    pub fn allocate(dir: impl Into<PathBuf>) -> io::Result<Self> {
        let dir = dir.into();
        fs::create_dir_all(&dir)?;
        let index = next_run_index(&dir)?;
        Ok(Self::new(dir, index))
    }
}

/// One past the highest `Datos_<n>.csv` in `dir`, or 1 if there is none.
pub fn next_run_index(dir: &Path) -> io::Result<u32> {
    let mut highest = 0;
    for entry in fs::read_dir(dir)? {
        let entry = entry?;
        let name = entry.file_name();
        if let Some(idx) = name.to_str().and_then(run_index_of) {
            highest = highest.max(idx);
        }
    }
    highest.checked_add(1).ok_or_else(|| {
        io::Error::other(format!(
            "no run index left after {CSV_PREFIX}{highest}{CSV_SUFFIX} in {}",
            dir.display()
        ))
    })
}

fn run_index_of(file_name: &str) -> Option<u32> {
    let digits = file_name
        .strip_prefix(CSV_PREFIX)?
        .strip_suffix(CSV_SUFFIX)?;
    if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    digits.parse().ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_dir_starts_at_one() {
        let dir = tempfile::tempdir().unwrap();
        assert_eq!(next_run_index(dir.path()).unwrap(), 1);
    }

    #[test]
    fn next_index_is_one_past_the_highest() {
        let dir = tempfile::tempdir().unwrap();
        for name in ["Datos_1.csv", "Datos_3.csv", "Datos_4.csv"] {
            fs::write(dir.path().join(name), "").unwrap();
        }
        assert_eq!(next_run_index(dir.path()).unwrap(), 5);
    }

    #[test]
    fn unrelated_names_are_ignored() {
        let dir = tempfile::tempdir().unwrap();
        for name in [
            "Datos_9.csv.bak",
            "Datos_x.csv",
            "Datos_+7.csv",
            "Datos_.csv",
            "Figura_datos_toma_12.eps",
            "Datos_2.csv",
        ] {
            fs::write(dir.path().join(name), "").unwrap();
        }
        assert_eq!(next_run_index(dir.path()).unwrap(), 3);
    }

    #[test]
    fn exhausted_index_is_an_error_not_an_overwrite() {
        let dir = tempfile::tempdir().unwrap();
        let last = dir.path().join(format!("Datos_{}.csv", u32::MAX));
        fs::write(&last, "hora,nodo1_Bq_m3,nodo2_Bq_m3\n").unwrap();

        assert!(next_run_index(dir.path()).is_err());
        assert!(RunPaths::allocate(dir.path()).is_err());
        assert_eq!(fs::read_to_string(&last).unwrap(), "hora,nodo1_Bq_m3,nodo2_Bq_m3\n");
    }

    #[test]
    fn allocate_creates_the_folder_and_derives_paths() {
        let dir = tempfile::tempdir().unwrap();
        let out = dir.path().join("Desktop").join("Datos_radon");
        let run = RunPaths::allocate(&out).unwrap();
        assert!(out.is_dir());
        assert_eq!(run.index, 1);
        assert_eq!(run.csv, out.join("Datos_1.csv"));
        assert_eq!(run.figure, out.join("Figura_datos_toma_1.eps"));
    }
}
