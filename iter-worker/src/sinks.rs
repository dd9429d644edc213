use std::fs::File;
use std::io::Write;
use std::path::{Path, PathBuf};

const CSV_HEADER: &str =
    "cycle;phase;idx;time_ms;iter_mV;ao_V;AI0;AI1;AI2;AI3;AI4;AI5;AI6;AI7;Calc0;Calc1;Calc2;Calc3;Calc4;Calc5;Calc6;Calc7";

/// One CSV row, matching the original's `fprintf` field order exactly so
/// any downstream tooling built against the legacy format keeps working.
#[derive(Debug, Clone, Copy)]
pub struct CsvRow {
    pub cycle: u64,
    pub phase: u32,
    pub idx: u32,
    pub time_ms: f64,
    pub iter_mv: i32,
    pub ao_v: f64,
    pub ai: [f32; 8],
    pub calc: [f32; 8],
}

impl CsvRow {
    fn render(&self) -> String {
        let mut s = format!(
            "{};{};{};{:.3};{};{:.3}",
            self.cycle, self.phase, self.idx, self.time_ms, self.iter_mv, self.ao_v
        );
        for v in self.ai.iter().chain(self.calc.iter()) {
            s.push(';');
            s.push_str(&format!("{v:.4}"));
        }
        s.push('\n');
        s
    }
}

/// Per-cycle CSV and log sinks, each rotated current->previous atomically
/// at the end of a successful cycle (spec §4.5's "Per-cycle file sinks").
pub struct WorkerSinks {
    csv_dir: PathBuf,
    log_dir: PathBuf,
    csv_file: Option<File>,
}

impl WorkerSinks {
    pub fn new(csv_dir: impl Into<PathBuf>, log_dir: impl Into<PathBuf>) -> anyhow::Result<Self> {
        let csv_dir = csv_dir.into();
        let log_dir = log_dir.into();
        std::fs::create_dir_all(&csv_dir)?;
        std::fs::create_dir_all(&log_dir)?;
        Ok(Self {
            csv_dir,
            log_dir,
            csv_file: None,
        })
    }

    fn csv_current(&self) -> PathBuf {
        self.csv_dir.join("iter_current.csv")
    }

    fn csv_previous(&self) -> PathBuf {
        self.csv_dir.join("iter_previous.csv")
    }

    pub fn log_current(&self) -> PathBuf {
        self.log_dir.join("worker_current.log")
    }

    pub fn log_previous(&self) -> PathBuf {
        self.log_dir.join("worker_previous.log")
    }

    /// Opens a fresh `iter_current.csv`, dropping any previous open handle
    /// without rotating it — used when a cycle aborts, matching the
    /// original's "if (f) fclose(f)" without a rename on failure.
    pub fn begin_cycle(&mut self) -> anyhow::Result<()> {
        self.csv_file = None;
        let mut f = File::create(self.csv_current())?;
        writeln!(f, "{CSV_HEADER}")?;
        f.flush()?;
        self.csv_file = Some(f);
        Ok(())
    }

    pub fn append_row(&mut self, row: &CsvRow) -> anyhow::Result<()> {
        if let Some(f) = &mut self.csv_file {
            f.write_all(row.render().as_bytes())?;
        }
        Ok(())
    }

    pub fn flush(&mut self) -> anyhow::Result<()> {
        if let Some(f) = &mut self.csv_file {
            f.flush()?;
        }
        Ok(())
    }

    /// Closes the current CSV, atomically promotes it to "previous", and
    /// promotes the log file the same way. Called only after a fully
    /// successful cycle (spec: aborted cycles leave `iter_previous.csv`
    /// untouched).
    pub fn finish_cycle_success(&mut self) -> anyhow::Result<()> {
        self.flush()?;
        self.csv_file = None;
        iter_common::promote_sink(&self.csv_current(), &self.csv_previous())?;
        iter_common::promote_sink(&self.log_current(), &self.log_previous())?;
        Ok(())
    }

    pub fn abort_cycle(&mut self) {
        self.csv_file = None;
    }
}

/// Writable path for a `tracing` file layer, rotated in lockstep with the
/// CSV sink (`iter_common::logging_setup` accepts anything
/// `Write + Clone + Send`, so a shared handle to this path works the same
/// way the teacher's binaries use it).
pub fn open_log_writer(path: &Path) -> anyhow::Result<File> {
    Ok(File::create(path)?)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rotates_current_to_previous_on_success() {
        let dir = tempfile::tempdir().unwrap();
        let mut sinks = WorkerSinks::new(dir.path().join("csv"), dir.path().join("log")).unwrap();

        sinks.begin_cycle().unwrap();
        sinks
            .append_row(&CsvRow {
                cycle: 1,
                phase: 1,
                idx: 0,
                time_ms: 12.3,
                iter_mv: -5000,
                ao_v: -5.0,
                ai: [0.0; 8],
                calc: [0.0; 8],
            })
            .unwrap();
        sinks.finish_cycle_success().unwrap();

        assert!(!sinks.csv_current().exists());
        assert!(sinks.csv_previous().exists());
        let contents = std::fs::read_to_string(sinks.csv_previous()).unwrap();
        assert!(contents.starts_with(CSV_HEADER));
        assert!(contents.contains("-5000"));
    }

    #[test]
    fn aborted_cycle_does_not_touch_previous() {
        let dir = tempfile::tempdir().unwrap();
        let mut sinks = WorkerSinks::new(dir.path().join("csv"), dir.path().join("log")).unwrap();
        sinks.begin_cycle().unwrap();
        sinks.abort_cycle();
        assert!(!sinks.csv_previous().exists());
    }
}
