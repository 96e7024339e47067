use itertools::izip;
use log::warn;
use nalgebra::{vector, Point2, Vector2};

use crate::error::{AnalysisError, AnalysisResult};
use crate::math::IteratorAvg;
use crate::snapshot::Snapshot;

/// Minimum-image correction of a displacement `d` across a periodic box of
/// length `l`. Ties round to even, so the correction is idempotent and the
/// result lies in `[-l/2, l/2]`.
#[inline]
#[must_use]
pub fn minimum_image(d: f64, l: f64) -> f64 {
    d - l * (d / l).round_ties_even()
}

/// Per-particle displacements between two frames.
///
/// Only x is periodic, y is bounded by walls and never wrapped.
#[derive(Debug, Clone)]
pub struct DisplacementField {
    origins: Vec<Point2<f64>>,
    displacements: Vec<Vector2<f64>>,
}

impl DisplacementField {
    /// Periodic-corrected displacements, drift kept.
    pub fn raw(earlier: &[Point2<f64>], later: &[Point2<f64>], lx: f64) -> AnalysisResult<Self> {
        if earlier.len() != later.len() {
            return Err(AnalysisError::ParticleCountMismatch {
                expected: earlier.len(),
                found: later.len(),
            });
        }
        if !(lx.is_finite() && lx > 0.0) {
            return Err(AnalysisError::DegenerateField(format!("box width {lx}")));
        }
        let displacements = izip!(earlier, later)
            .map(|(a, b)| b - a)
            .map(|d| vector![minimum_image(d.x, lx), d.y])
            .collect::<Vec<_>>();
        if let Some(i) = displacements.iter().position(|d| !(d.x.is_finite() && d.y.is_finite())) {
            return Err(AnalysisError::DegenerateField(format!(
                "non-finite displacement of particle {i}"
            )));
        }
        Ok(Self {
            origins: earlier.to_vec(),
            displacements,
        })
    }

    /// Periodic-corrected displacements with the mean drift removed.
    pub fn compute(earlier: &[Point2<f64>], later: &[Point2<f64>], lx: f64) -> AnalysisResult<Self> {
        let mut field = Self::raw(earlier, later, lx)?;
        field.remove_drift();
        Ok(field)
    }

    /// Box width is taken from the earlier header.
    pub fn from_snapshots(earlier: &Snapshot, later: &Snapshot) -> AnalysisResult<Self> {
        check_counts(earlier, later)?;
        Self::compute(earlier.positions(), later.positions(), earlier.lx)
    }

    /// Same as [`DisplacementField::from_snapshots`] without drift removal.
    pub fn raw_from_snapshots(earlier: &Snapshot, later: &Snapshot) -> AnalysisResult<Self> {
        check_counts(earlier, later)?;
        Self::raw(earlier.positions(), later.positions(), earlier.lx)
    }

    /// Mean displacement, `None` for an empty field.
    #[must_use]
    pub fn drift(&self) -> Option<Vector2<f64>> {
        let x = self.dx().avg()?;
        let y = self.dy().avg()?;
        Some(vector![x, y])
    }

    pub fn remove_drift(&mut self) {
        if let Some(drift) = self.drift() {
            self.displacements.iter_mut().for_each(|d| *d -= drift);
        }
    }

    #[inline]
    #[must_use]
    pub fn origins(&self) -> &[Point2<f64>] {
        &self.origins
    }

    #[inline]
    #[must_use]
    pub fn displacements(&self) -> &[Vector2<f64>] {
        &self.displacements
    }

    pub fn dx(&self) -> impl Iterator<Item = f64> + '_ {
        self.displacements.iter().map(|d| d.x)
    }

    pub fn dy(&self) -> impl Iterator<Item = f64> + '_ {
        self.displacements.iter().map(|d| d.y)
    }

    /// Component-wise minimum and maximum of the displacements.
    #[must_use]
    pub fn bounds(&self) -> Option<(Vector2<f64>, Vector2<f64>)> {
        let first = *self.displacements.first()?;
        Some(
            self.displacements
                .iter()
                .fold((first, first), |(lo, hi), d| (lo.inf(d), hi.sup(d))),
        )
    }

    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.displacements.len()
    }

    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.displacements.is_empty()
    }
}

fn check_counts(earlier: &Snapshot, later: &Snapshot) -> AnalysisResult<()> {
    if earlier.declared_count != later.declared_count {
        return Err(AnalysisError::ParticleCountMismatch {
            expected: earlier.declared_count,
            found: later.declared_count,
        });
    }
    if earlier.lx != later.lx {
        warn!(
            "box width differs between frames {} and {}: {} vs {}",
            earlier.id, later.id, earlier.lx, later.lx
        );
    }
    Ok(())
}
