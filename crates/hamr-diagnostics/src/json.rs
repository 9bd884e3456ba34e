//! JSON-lines output, one stream per diagnostic kind.

use std::fs::{self, File};
use std::io::{BufWriter, Write};
use std::path::Path;

use crate::writers::{DiagnosticKind, Entry};
use crate::DiagnosticError;

/// Writes entries as JSON lines to one sink per [`DiagnosticKind`].
///
/// Generic over `W: Write` so tests can use `Vec<u8>` and runs can use
/// buffered files.
#[derive(Debug)]
pub struct JsonDiagnosticWriter<W: Write> {
    sinks: [W; 3],
    lines: usize,
}

impl JsonDiagnosticWriter<BufWriter<File>> {
    /// Create `<dir>/<kind>.jsonl` for every kind, truncating existing
    /// files.
    pub fn create(dir: &Path) -> Result<Self, DiagnosticError> {
        fs::create_dir_all(dir).map_err(|source| DiagnosticError::CreateFile {
            path: dir.to_path_buf(),
            source,
        })?;
        let open = |kind: DiagnosticKind| {
            let path = dir.join(format!("{}.jsonl", kind.name()));
            File::create(&path)
                .map(BufWriter::new)
                .map_err(|source| DiagnosticError::CreateFile { path, source })
        };
        Ok(Self::from_sinks(
            open(DiagnosticKind::Electromag)?,
            open(DiagnosticKind::Fluid)?,
            open(DiagnosticKind::Particles)?,
        ))
    }
}

impl<W: Write> JsonDiagnosticWriter<W> {
    /// Writer over explicit sinks.
    pub fn from_sinks(electromag: W, fluid: W, particles: W) -> Self {
        Self {
            sinks: [electromag, fluid, particles],
            lines: 0,
        }
    }

    /// Append `entry` to the stream of `kind`.
    pub fn write(&mut self, kind: DiagnosticKind, entry: &Entry) -> Result<(), DiagnosticError> {
        let sink = &mut self.sinks[kind.index()];
        serde_json::to_writer(&mut *sink, entry)?;
        sink.write_all(b"\n")?;
        self.lines += 1;
        Ok(())
    }

    /// Flush every sink.
    pub fn flush(&mut self) -> Result<(), DiagnosticError> {
        for sink in &mut self.sinks {
            sink.flush()?;
        }
        Ok(())
    }

    /// Lines written so far.
    pub fn lines_written(&self) -> usize {
        self.lines
    }

    /// The sinks, electromag first.
    pub fn into_sinks(self) -> [W; 3] {
        self.sinks
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn entries_land_in_the_stream_of_their_kind() {
        let mut writer = JsonDiagnosticWriter::from_sinks(Vec::new(), Vec::new(), Vec::new());
        let entry = Entry::Field {
            path: "/t/0/pl0/p0#0/ions/density".to_string(),
            time: 0.0,
            lower: 4,
            values: vec![1.0, 2.0],
        };
        writer.write(DiagnosticKind::Fluid, &entry).unwrap();
        writer
            .write(
                DiagnosticKind::Fluid,
                &Entry::Padding {
                    path: "/t/0/pl0/p0#1".to_string(),
                    time: 0.0,
                },
            )
            .unwrap();
        assert_eq!(writer.lines_written(), 2);

        let [electromag, fluid, particles] = writer.into_sinks();
        assert!(electromag.is_empty() && particles.is_empty());
        let text = String::from_utf8(fluid).unwrap();
        let lines: Vec<serde_json::Value> = text
            .lines()
            .map(|l| serde_json::from_str(l).unwrap())
            .collect();
        assert_eq!(lines[0]["kind"], "field");
        assert_eq!(lines[0]["lower"], 4);
        assert_eq!(lines[0]["values"], serde_json::json!([1.0, 2.0]));
        assert_eq!(lines[1]["kind"], "padding");
    }
}
