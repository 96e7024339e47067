use anyhow::{Context, Result};
use log::{debug, error, warn};
use std::fs::{self, File};
use std::io::{BufRead, BufReader};
use std::path::Path;

use crate::error::{AnalysisError, AnalysisResult};

/// Column of the run log holding the total energy.
const ENERGY_COLUMN: usize = 1;
const LOG_EXTENSION: &str = "txt";

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Tolerance {
    pub rtol: f64,
    pub atol: f64,
}

impl Default for Tolerance {
    fn default() -> Self {
        Self {
            rtol: 1e-12,
            atol: 1e-15,
        }
    }
}

impl Tolerance {
    /// `|a - b| <= atol + rtol * |b|`, asymmetric in `b`.
    #[inline]
    #[must_use]
    pub fn is_close(&self, a: f64, b: f64) -> bool {
        (a - b).abs() <= self.atol + self.rtol * b.abs()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FlowState {
    Jammed,
    Flowing,
}

impl FlowState {
    /// A run whose last two energies coincide has stopped relaxing.
    #[must_use]
    pub fn classify(e1: f64, e2: f64, tolerance: &Tolerance) -> Self {
        if tolerance.is_close(e1, e2) {
            Self::Jammed
        } else {
            Self::Flowing
        }
    }
}

/// Energies of the last two non-empty lines of a run log.
pub fn read_final_energies(path: &Path) -> AnalysisResult<(f64, f64)> {
    let log_err = |reason: String| AnalysisError::MalformedLog {
        path: path.to_path_buf(),
        reason,
    };
    let file = File::open(path).map_err(|err| AnalysisError::from_io(path.to_path_buf(), err))?;
    let mut tail: (Option<String>, Option<String>) = (None, None);
    for line in BufReader::new(file).lines() {
        let line = line.map_err(|source| AnalysisError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        if !line.trim().is_empty() {
            tail = (tail.1, Some(line));
        }
    }
    let (Some(second_last), Some(last)) = tail else {
        return Err(log_err("fewer than two lines".to_string()));
    };
    let energy = |line: &str| -> AnalysisResult<f64> {
        let field = line
            .split_whitespace()
            .nth(ENERGY_COLUMN)
            .ok_or_else(|| log_err(format!("no energy column in {line:?}")))?;
        field
            .parse::<f64>()
            .map_err(|err| log_err(format!("energy {field:?}: {err}")))
    };
    Ok((energy(&second_last)?, energy(&last)?))
}

pub fn classify_log(path: &Path, tolerance: &Tolerance) -> AnalysisResult<FlowState> {
    let (e1, e2) = read_final_energies(path)?;
    let state = FlowState::classify(e1, e2, tolerance);
    debug!("{}: {e1:e} -> {e2:e}: {state:?}", path.display());
    Ok(state)
}

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct FlowCounts {
    pub flowing: usize,
    pub jammed: usize,
    pub skipped: usize,
}

impl FlowCounts {
    pub fn add(&mut self, state: FlowState) {
        match state {
            FlowState::Flowing => self.flowing += 1,
            FlowState::Jammed => self.jammed += 1,
        }
    }

    #[inline]
    #[must_use]
    pub fn classified(&self) -> usize {
        self.flowing + self.jammed
    }

    /// Undefined when no run of `param` could be classified.
    pub fn percent_flowing(&self, param: f64) -> AnalysisResult<f64> {
        match self.classified() {
            0 => Err(AnalysisError::UndefinedAggregate { param }),
            total => Ok(100.0 * self.flowing as f64 / total as f64),
        }
    }
}

/// Classifies every `.txt` run log in `dir`. Unusable logs are counted as
/// skipped.
pub fn flow_counts(dir: &Path, tolerance: &Tolerance) -> Result<FlowCounts> {
    let mut paths = fs::read_dir(dir)
        .with_context(|| format!("Reading {}", dir.display()))?
        .map(|entry| entry.map(|e| e.path()))
        .collect::<Result<Vec<_>, _>>()
        .with_context(|| format!("Listing {}", dir.display()))?;
    paths.retain(|p| p.is_file() && p.extension().is_some_and(|ext| ext == LOG_EXTENSION));
    paths.sort();

    let mut counts = FlowCounts::default();
    for path in paths {
        match classify_log(&path, tolerance) {
            Ok(state) => counts.add(state),
            Err(err) if err.is_data_error() => {
                warn!("Skipping run log: {err}");
                counts.skipped += 1;
            }
            Err(err) => {
                error!("Unable to classify {}: {err}", path.display());
                counts.skipped += 1;
            }
        }
    }
    Ok(counts)
}
