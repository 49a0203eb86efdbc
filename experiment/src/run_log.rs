use std::fs::{File, OpenOptions};
use std::io::{self, Write};
use std::path::Path;

use tracing::info;

/// Status lines of one run, mirrored to the console and to the run's log file.
pub struct RunLog {
    file: File,
}

impl RunLog {
    /// Opens `path` for appending, so repeated runs accumulate in the same log.
    pub fn open(path: &Path) -> io::Result<Self> {
        let file = OpenOptions::new().create(true).append(true).open(path)?;
        Ok(Self { file })
    }

    pub fn line(&mut self, msg: impl AsRef<str>) -> io::Result<()> {
        let msg = msg.as_ref();
        info!("{}", msg);
        writeln!(self.file, "{}", msg)
    }

    pub fn lines<I, S>(&mut self, msgs: I) -> io::Result<()>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        for msg in msgs {
            self.line(msg)?;
        }
        Ok(())
    }

    pub fn rule(&mut self) -> io::Result<()> {
        self.line("=".repeat(70))
    }
}
