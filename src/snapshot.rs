use log::{debug, warn};
use nalgebra::{point, Point2};
use std::fmt;
use std::fs::File;
use std::io::{self, BufRead, BufReader};
use std::iter;
use std::path::Path;

use crate::error::{AnalysisError, AnalysisResult};

/// Positions of the particle count and box dimensions in the header line.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HeaderLayout {
    pub count: usize,
    pub lx: usize,
    pub ly: usize,
}

impl Default for HeaderLayout {
    fn default() -> Self {
        Self {
            count: 1,
            lx: 2,
            ly: 3,
        }
    }
}

impl HeaderLayout {
    fn min_fields(&self) -> usize {
        self.count.max(self.lx).max(self.ly) + 1
    }
}

/// Particle positions of one simulation frame.
///
/// `declared_count` is the particle count from the header, `positions` holds
/// every parsed row. The loader guarantees `positions.len() >= declared_count`.
#[derive(Clone)]
pub struct Snapshot {
    pub id: String,
    pub declared_count: usize,
    pub lx: f64,
    pub ly: f64,
    positions: Vec<Point2<f64>>,
}

impl Snapshot {
    #[must_use]
    pub fn new(
        id: impl Into<String>,
        declared_count: usize,
        lx: f64,
        ly: f64,
        positions: Vec<Point2<f64>>,
    ) -> Self {
        Self {
            id: id.into(),
            declared_count,
            lx,
            ly,
            positions,
        }
    }

    pub fn read(path: &Path) -> AnalysisResult<Self> {
        Self::read_with_layout(path, HeaderLayout::default())
    }

    pub fn read_with_layout(path: &Path, layout: HeaderLayout) -> AnalysisResult<Self> {
        let file =
            File::open(path).map_err(|err| AnalysisError::from_io(path.to_path_buf(), err))?;
        let snapshot = Self::parse(path, BufReader::new(file).lines(), layout)?;
        debug!(
            "{}: N = {}, box = {} x {}",
            path.display(),
            snapshot.declared_count,
            snapshot.lx,
            snapshot.ly
        );
        Ok(snapshot)
    }

    /// `path` is only used for error reporting.
    pub fn parse<I>(path: &Path, lines: I, layout: HeaderLayout) -> AnalysisResult<Self>
    where
        I: IntoIterator<Item = io::Result<String>>,
    {
        let io_err = |source: io::Error| AnalysisError::Io {
            path: path.to_path_buf(),
            source,
        };
        let header_err = |reason: String| AnalysisError::MalformedHeader {
            path: path.to_path_buf(),
            reason,
        };

        let mut lines = lines.into_iter();
        let header = lines
            .next()
            .ok_or_else(|| header_err("empty file".to_string()))?
            .map_err(io_err)?;
        let fields = header.split_whitespace().collect::<Vec<_>>();
        if fields.len() < layout.min_fields() {
            return Err(header_err(format!(
                "expected at least {} fields, found {}",
                layout.min_fields(),
                fields.len()
            )));
        }
        let declared_count = fields[layout.count]
            .parse::<usize>()
            .map_err(|err| header_err(format!("particle count {:?}: {err}", fields[layout.count])))?;
        let lx = fields[layout.lx]
            .parse::<f64>()
            .map_err(|err| header_err(format!("Lx {:?}: {err}", fields[layout.lx])))?;
        let ly = fields[layout.ly]
            .parse::<f64>()
            .map_err(|err| header_err(format!("Ly {:?}: {err}", fields[layout.ly])))?;
        for (name, length) in [("Lx", lx), ("Ly", ly)] {
            if !(length.is_finite() && length > 0.0) {
                return Err(header_err(format!("{name} has to be positive, found {length}")));
            }
        }

        let mut positions = Vec::with_capacity(declared_count);
        for (line_number, line) in iter::zip(2.., lines) {
            let line = line.map_err(io_err)?;
            let mut columns = line.split_whitespace().peekable();
            if columns.peek().is_none() {
                continue;
            }
            let mut next_value = |name: &str| -> AnalysisResult<f64> {
                let row_err = |reason: String| AnalysisError::MalformedRow {
                    path: path.to_path_buf(),
                    line: line_number,
                    reason,
                };
                let value = columns
                    .next()
                    .ok_or_else(|| row_err(format!("missing {name} column")))?
                    .parse::<f64>()
                    .map_err(|err| row_err(format!("{name}: {err}")))?;
                if value.is_finite() {
                    Ok(value)
                } else {
                    Err(row_err(format!("{name} is {value}")))
                }
            };
            let x = next_value("x")?;
            let y = next_value("y")?;
            positions.push(point![x, y]);
        }

        if positions.len() < declared_count {
            return Err(AnalysisError::ParticleCountMismatch {
                expected: declared_count,
                found: positions.len(),
            });
        }
        if positions.len() > declared_count {
            warn!(
                "{}: header declares {declared_count} particles, found {} rows",
                path.display(),
                positions.len()
            );
        }

        Ok(Self {
            id: fields[0].to_string(),
            declared_count,
            lx,
            ly,
            positions,
        })
    }

    #[inline]
    #[must_use]
    pub fn positions(&self) -> &[Point2<f64>] {
        &self.positions
    }

    /// Number of parsed rows.
    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.positions.len()
    }

    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.positions.is_empty()
    }
}

impl fmt::Debug for Snapshot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Snapshot")
            .field("id", &self.id)
            .field("declared_count", &self.declared_count)
            .field("lx", &self.lx)
            .field("ly", &self.ly)
            .field("rows", &self.positions.len())
            .finish()
    }
}
