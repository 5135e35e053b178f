//! Reference implementation of the engine contract.
//!
//! Feature extraction partitions each raster into a coarse grid and keeps
//! the mean intensity per cell; images sharing an eye label are averaged
//! into one code per eye, and matching takes the minimum normalized mean
//! absolute difference over comparable eyes. Nothing here is meant to be
//! competitive; the engine exists so the contract and harness can be
//! exercised end to end with real image data.

use std::path::Path;

use tracing::debug;

use crate::config::EngineConfig;
use crate::engine::{Candidate, DatabaseEntry, Engine};
use crate::iris::{EyeLabel, IrisImage, PixelFormat};
use crate::ranking;
use crate::status::{ReturnCode, ReturnStatus, TemplateType};
use crate::store;
use crate::template::{EyeCode, IrisTemplate};

/// Grid-intensity reference engine.
///
/// One instance serves either template creation or identification within a
/// process, mirroring the two initialization paths of the contract; the
/// enrollment catalog carries state between processes.
#[derive(Debug, Default)]
pub struct ReferenceEngine {
    config: EngineConfig,
    template_ready: bool,
    identification_ready: bool,
    /// Enrollment insertion order preserved; populated by
    /// `initialize_identification`.
    database: Vec<(String, IrisTemplate)>,
}

impl ReferenceEngine {
    pub fn new() -> Self {
        Self::default()
    }

    /// Extracts one eye code, or `None` when the cells show no usable
    /// contrast (no iris found).
    fn extract_code(&self, iris: &IrisImage) -> Option<EyeCode> {
        let cells = grid_cells(iris, self.config.grid_rows, self.config.grid_cols);
        let brightest = cells.iter().copied().max()?;
        let darkest = cells.iter().copied().min()?;
        if brightest - darkest < self.config.min_contrast {
            return None;
        }
        Some(EyeCode {
            label: iris.label,
            rows: self.config.grid_rows,
            cols: self.config.grid_cols,
            cells,
        })
    }
}

impl Engine for ReferenceEngine {
    fn initialize_template_creation(
        &mut self,
        config_dir: &Path,
        template_type: TemplateType,
    ) -> ReturnStatus {
        self.config = match EngineConfig::load(config_dir) {
            Ok(config) => config,
            Err(err) => return ReturnStatus::new(ReturnCode::ConfigDirError, err.to_string()),
        };
        self.template_ready = true;
        debug!(?template_type, config = ?self.config, "template creation initialized");
        ReturnStatus::ok()
    }

    fn create_template(&mut self, irides: &[IrisImage], template: &mut Vec<u8>) -> ReturnStatus {
        template.clear();
        if !self.template_ready {
            return ReturnStatus::new(
                ReturnCode::ParticipantError,
                "template creation session not initialized",
            );
        }
        if irides.is_empty() {
            return ReturnStatus::new(ReturnCode::FormatError, "no samples supplied");
        }
        for iris in irides {
            if iris.validate_raster().is_err() {
                return ReturnStatus::new(
                    ReturnCode::FormatError,
                    format!(
                        "raster of {} bytes does not match {}x{} geometry",
                        iris.data.len(),
                        iris.width,
                        iris.height
                    ),
                );
            }
        }

        // One code per eye label, averaged cell-wise across that eye's
        // images; images without detectable contrast contribute nothing.
        let mut per_eye: Vec<(EyeLabel, Vec<u32>, u32)> = Vec::new();
        for iris in irides {
            let Some(code) = self.extract_code(iris) else {
                continue;
            };
            match per_eye.iter_mut().find(|(label, _, _)| *label == code.label) {
                Some((_, sums, count)) => {
                    for (sum, cell) in sums.iter_mut().zip(&code.cells) {
                        *sum += u32::from(*cell);
                    }
                    *count += 1;
                }
                None => {
                    let sums = code.cells.iter().map(|&cell| u32::from(cell)).collect();
                    per_eye.push((code.label, sums, 1));
                }
            }
        }

        let eyes: Vec<EyeCode> = per_eye
            .into_iter()
            .map(|(label, sums, count)| EyeCode {
                label,
                rows: self.config.grid_rows,
                cols: self.config.grid_cols,
                cells: sums.into_iter().map(|sum| (sum / count) as u8).collect(),
            })
            .collect();

        let detected = !eyes.is_empty();
        *template = IrisTemplate { eyes }.encode();

        if detected {
            ReturnStatus::ok()
        } else {
            ReturnStatus::new(
                ReturnCode::DetectError,
                format!("no iris detected in {} sample(s)", irides.len()),
            )
        }
    }

    fn create_database(
        &mut self,
        enroll_dir: &Path,
        _config_dir: &Path,
        entries: &[DatabaseEntry],
    ) -> ReturnStatus {
        match store::write_catalog(enroll_dir, entries) {
            Ok(written) => {
                debug!(records = entries.len(), written, "enrollment database ready");
                ReturnStatus::ok()
            }
            Err(err) => ReturnStatus::new(ReturnCode::EnrollDirError, err.to_string()),
        }
    }

    fn initialize_identification(&mut self, enroll_dir: &Path, config_dir: &Path) -> ReturnStatus {
        self.config = match EngineConfig::load(config_dir) {
            Ok(config) => config,
            Err(err) => return ReturnStatus::new(ReturnCode::ConfigDirError, err.to_string()),
        };

        let entries = match store::read_catalog(enroll_dir) {
            Ok(entries) => entries,
            Err(err) => return ReturnStatus::new(ReturnCode::EnrollDirError, err.to_string()),
        };

        self.database.clear();
        for entry in entries {
            let Some(template) = IrisTemplate::decode(&entry.template) else {
                return ReturnStatus::new(
                    ReturnCode::FormatError,
                    format!("enrolled template `{}` is malformed", entry.id),
                );
            };
            self.database.push((entry.id, template));
        }

        self.identification_ready = true;
        debug!(records = self.database.len(), "identification initialized");
        ReturnStatus::ok()
    }

    fn identify(
        &mut self,
        probe: &[u8],
        num_candidates: u32,
        candidates: &mut Vec<Candidate>,
    ) -> ReturnStatus {
        candidates.clear();
        if !self.identification_ready {
            return ReturnStatus::new(
                ReturnCode::ParticipantError,
                "identification session not initialized",
            );
        }

        let Some(probe) = IrisTemplate::decode(probe) else {
            return ReturnStatus::new(ReturnCode::FormatError, "malformed search template");
        };
        if !probe.has_signal() {
            return ReturnStatus::new(
                ReturnCode::IdentError,
                "search template contains no matchable data",
            );
        }

        for (id, enrolled) in &self.database {
            // Entries without a comparable eye (including degraded,
            // signal-free enrollments) are not valid candidates.
            if let Some(distance) = probe.distance(enrolled) {
                candidates.push(Candidate::new(id.clone(), distance));
            }
        }
        ranking::finalize_candidates(candidates, num_candidates);

        ReturnStatus::ok()
    }
}

/// Row-major mean intensity per grid cell; RGB rasters are reduced to the
/// channel average first.
fn grid_cells(iris: &IrisImage, rows: u16, cols: u16) -> Vec<u8> {
    let width = iris.width as usize;
    let height = iris.height as usize;
    let bpp = iris.pixel_format.bytes_per_pixel();
    let rows = rows as usize;
    let cols = cols as usize;

    let mut cells = Vec::with_capacity(rows * cols);
    for row in 0..rows {
        let y0 = row * height / rows;
        let y1 = ((row + 1) * height / rows).max(y0 + 1);
        for col in 0..cols {
            let x0 = col * width / cols;
            let x1 = ((col + 1) * width / cols).max(x0 + 1);

            let mut sum = 0u64;
            let mut count = 0u64;
            for y in y0..y1.min(height) {
                for x in x0..x1.min(width) {
                    let offset = (y * width + x) * bpp;
                    let value = match iris.pixel_format {
                        PixelFormat::Grayscale => u64::from(iris.data[offset]),
                        PixelFormat::Rgb => {
                            (u64::from(iris.data[offset])
                                + u64::from(iris.data[offset + 1])
                                + u64::from(iris.data[offset + 2]))
                                / 3
                        }
                    };
                    sum += value;
                    count += 1;
                }
            }
            cells.push(if count == 0 { 0 } else { (sum / count) as u8 });
        }
    }
    cells
}
