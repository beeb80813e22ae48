//! # Snapshots and Run Summaries
//!
//! Snapshots are taken by the coordinator between StepDone and the next
//! rebuild, while it holds every block lock. They never run on a worker.
//!
//! The text format is the one existing trajectory viewers read:
//!
//! ```text
//!   <n> <size>        written once, before the first frame
//!   <x> <y>           n lines per frame, in store order
//! ```

use std::fs::OpenOptions;
use std::io::Write;
use std::path::Path;

use crate::error::SimResult;
use crate::particle::StoreView;

/// Receives the particle store after a completed step.
pub trait SnapshotSink {
    /// Records the state at the end of `step`.
    ///
    /// # Errors
    ///
    /// Returns [`crate::SimError::Snapshot`] if the output cannot be written.
    fn save(&mut self, step: usize, view: &StoreView<'_, '_>) -> SimResult<()>;
}

/// Plain-text trajectory writer.
#[derive(Debug)]
pub struct TextSnapshot<W: Write> {
    out: W,
    size: f64,
    header_written: bool,
    frames: usize,
}

impl<W: Write> TextSnapshot<W> {
    /// Wraps `out` for a domain of side `size`.
    pub fn new(out: W, size: f64) -> Self {
        Self {
            out,
            size,
            header_written: false,
            frames: 0,
        }
    }

    /// Frames written so far.
    #[must_use]
    pub const fn frames(&self) -> usize {
        self.frames
    }

    /// Flushes and returns the underlying writer.
    ///
    /// # Errors
    ///
    /// Returns [`crate::SimError::Snapshot`] if the flush fails.
    pub fn finish(mut self) -> SimResult<W> {
        self.out.flush()?;
        Ok(self.out)
    }
}

impl<W: Write> SnapshotSink for TextSnapshot<W> {
    fn save(&mut self, _step: usize, view: &StoreView<'_, '_>) -> SimResult<()> {
        if !self.header_written {
            writeln!(self.out, "{} {}", view.len(), self.size)?;
            self.header_written = true;
        }
        for particle in view.iter() {
            writeln!(self.out, "{} {}", particle.x, particle.y)?;
        }
        self.frames += 1;
        Ok(())
    }
}

/// Appends `"<n> <seconds>"` to the summary file at `path`, creating it if needed.
///
/// # Errors
///
/// Returns [`crate::SimError::Snapshot`] if the file cannot be opened or written.
pub fn append_summary(path: &Path, particles: usize, seconds: f64) -> SimResult<()> {
    let mut file = OpenOptions::new().create(true).append(true).open(path)?;
    writeln!(file, "{particles} {seconds}")?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::particle::{Particle, ParticleBlocks};
    use crate::partition::WorkPartition;

    fn sample() -> Vec<Particle> {
        vec![Particle::at(0.25, 0.5), Particle::at(0.75, 0.125)]
    }

    #[test]
    fn test_header_written_once() {
        let mut particles = sample();
        let partition = WorkPartition::new(1, 2, 2).unwrap();
        let blocks = ParticleBlocks::split(&mut particles, &partition).unwrap();

        let mut sink = TextSnapshot::new(Vec::new(), 1.5);
        sink.save(0, &blocks.view()).unwrap();
        sink.save(1, &blocks.view()).unwrap();
        assert_eq!(sink.frames(), 2);

        let text = String::from_utf8(sink.finish().unwrap()).unwrap();
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines, vec!["2 1.5", "0.25 0.5", "0.75 0.125", "0.25 0.5", "0.75 0.125"]);
    }

    #[test]
    fn test_summary_appends() {
        let id = std::time::SystemTime::now()
            .duration_since(std::time::UNIX_EPOCH)
            .unwrap()
            .as_nanos();
        let path = std::env::temp_dir().join(format!("slicesim_summary_{id}.txt"));

        append_summary(&path, 100, 0.5).unwrap();
        append_summary(&path, 200, 1.25).unwrap();
        let text = std::fs::read_to_string(&path).unwrap();
        assert_eq!(text, "100 0.5\n200 1.25\n");

        std::fs::remove_file(&path).ok();
    }

    #[test]
    fn test_write_failure_maps_to_snapshot_error() {
        struct Broken;
        impl Write for Broken {
            fn write(&mut self, _: &[u8]) -> std::io::Result<usize> {
                Err(std::io::Error::new(std::io::ErrorKind::Other, "pipe closed"))
            }
            fn flush(&mut self) -> std::io::Result<()> {
                Ok(())
            }
        }

        let mut particles = sample();
        let partition = WorkPartition::new(1, 2, 1).unwrap();
        let blocks = ParticleBlocks::split(&mut particles, &partition).unwrap();
        let mut sink = TextSnapshot::new(Broken, 1.0);
        assert!(matches!(
            sink.save(0, &blocks.view()),
            Err(crate::SimError::Snapshot(_))
        ));
    }
}
