//! Dumps of a whole hierarchy.

use std::io::Write;

use hamr_amr::PatchHierarchy;
use hamr_model::PhysicalModel;
use tracing::{debug, info};

use crate::collective::{Collective, LocalCollective};
use crate::json::JsonDiagnosticWriter;
use crate::writers::{DiagnosticKind, Entry};
use crate::DiagnosticError;

/// Writes the selected diagnostic kinds of every patch of a hierarchy.
///
/// Every rank emits, per level and kind, one group of entries per patch
/// up to the largest patch count of the level over all ranks; ranks with
/// fewer patches pad with [`Entry::Padding`].
#[derive(Debug)]
pub struct DiagnosticsManager<W: Write, C: Collective = LocalCollective> {
    writer: JsonDiagnosticWriter<W>,
    collective: C,
    kinds: Vec<DiagnosticKind>,
    dumps: usize,
}

impl<W: Write> DiagnosticsManager<W, LocalCollective> {
    /// Single-process manager writing every kind.
    pub fn new(writer: JsonDiagnosticWriter<W>) -> Self {
        Self::with_collective(writer, LocalCollective)
    }
}

impl<W: Write, C: Collective> DiagnosticsManager<W, C> {
    /// Manager writing every kind, reducing patch counts over
    /// `collective`.
    pub fn with_collective(writer: JsonDiagnosticWriter<W>, collective: C) -> Self {
        Self {
            writer,
            collective,
            kinds: DiagnosticKind::ALL.to_vec(),
            dumps: 0,
        }
    }

    /// Only write `kinds`.
    pub fn with_kinds(mut self, kinds: &[DiagnosticKind]) -> Self {
        self.kinds = kinds.to_vec();
        self
    }

    /// Dumps done so far.
    pub fn dumps(&self) -> usize {
        self.dumps
    }

    /// The underlying writer.
    pub fn writer(&self) -> &JsonDiagnosticWriter<W> {
        &self.writer
    }

    /// Give the writer back.
    pub fn into_writer(self) -> JsonDiagnosticWriter<W> {
        self.writer
    }

    /// Write every level of `hierarchy` at `time`; `models[L]` is the
    /// model of level `L`. Returns the number of entries written.
    pub fn dump(
        &mut self,
        hierarchy: &PatchHierarchy,
        models: &[&PhysicalModel],
        time: f64,
    ) -> Result<usize, DiagnosticError> {
        let rank = self.collective.rank();
        let mut written = 0;
        let mut entries = Vec::new();
        for level_number in 0..hierarchy.number_of_levels() {
            let level = hierarchy.level(level_number)?;
            let model = models
                .get(level_number)
                .ok_or(DiagnosticError::MissingModel {
                    level: level_number,
                })?;
            let max_patches = self.collective.max(level.len());
            let total: usize = self.collective.all_gather(level.len()).iter().sum();
            debug!(
                level = level_number,
                local = level.len(),
                max_patches,
                total,
                "dumping level"
            );
            for &kind in &self.kinds {
                for index in 0..max_patches {
                    let prefix = format!("/t/{time}/pl{level_number}/p{rank}#{index}");
                    entries.clear();
                    match level.patches().get(index) {
                        Some(patch) => kind.collect(patch, model, &prefix, time, &mut entries)?,
                        None => entries.push(Entry::Padding {
                            path: prefix,
                            time,
                        }),
                    }
                    for entry in &entries {
                        self.writer.write(kind, entry)?;
                    }
                    written += entries.len();
                }
            }
        }
        self.writer.flush()?;
        self.dumps += 1;
        info!(time, entries = written, "diagnostics written");
        Ok(written)
    }
}
