use nalgebra::Matrix2;

use crate::displacement::DisplacementField;
use crate::error::{AnalysisError, AnalysisResult};
use crate::snapshot::Snapshot;

/// Divisor used when building the covariance matrix.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
#[cfg_attr(feature = "clap", derive(clap::ValueEnum))]
pub enum Normalization {
    /// Particle count from the snapshot header
    #[default]
    Declared,
    /// Number of parsed particle rows
    Parsed,
}

/// M = (1/n) Σ [[dx², dx·dy], [dx·dy, dy²]]. Zero for `n == 0`.
#[must_use]
pub fn covariance(field: &DisplacementField, n: usize) -> Matrix2<f64> {
    if n == 0 {
        return Matrix2::zeros();
    }
    let (m11, m12, m22) = field
        .displacements()
        .iter()
        .fold((0.0, 0.0, 0.0), |(m11, m12, m22), d| {
            (m11 + d.x * d.x, m12 + d.x * d.y, m22 + d.y * d.y)
        });
    Matrix2::new(m11, m12, m12, m22) / n as f64
}

/// Anisotropy of a symmetric positive semi-definite matrix:
/// `(λmax - λmin) / (λmax + λmin)`, or 0 when both eigenvalues vanish.
/// Non-finite entries give NaN.
#[must_use]
pub fn anisotropy_of_matrix(m: &Matrix2<f64>) -> f64 {
    if !m.iter().all(|v| v.is_finite()) {
        return f64::NAN;
    }
    let eigenvalues = m.symmetric_eigenvalues();
    // PSD, negatives are round-off
    let clamp = |lam: f64| if lam < 0.0 { 0.0 } else { lam };
    let lam_min = clamp(eigenvalues.min());
    let lam_max = clamp(eigenvalues.max());
    let sum = lam_min + lam_max;
    if sum == 0.0 {
        0.0
    } else {
        (lam_max - lam_min) / sum
    }
}

#[inline]
#[must_use]
pub fn anisotropy(field: &DisplacementField, n: usize) -> f64 {
    anisotropy_of_matrix(&covariance(field, n))
}

/// Displacement, covariance and anisotropy for one pair of frames.
pub fn pair_anisotropy(
    earlier: &Snapshot,
    later: &Snapshot,
    normalization: Normalization,
) -> AnalysisResult<f64> {
    let field = DisplacementField::from_snapshots(earlier, later)?;
    let n = match normalization {
        Normalization::Declared => earlier.declared_count,
        Normalization::Parsed => field.len(),
    };
    if n == 0 || field.is_empty() {
        return Err(AnalysisError::DegenerateField(format!(
            "frames {} and {} have no particles",
            earlier.id, later.id
        )));
    }
    Ok(anisotropy(&field, n))
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_float_eq::assert_f64_near;
    use nalgebra::{point, Point2};

    const EPS: f64 = 1e-12;

    #[test]
    fn test_isotropic_matrix() {
        let m = Matrix2::new(2.0, 0.0, 0.0, 2.0);
        assert!(anisotropy_of_matrix(&m).abs() < EPS);
        assert_f64_near!(anisotropy_of_matrix(&Matrix2::zeros()), 0.0);
    }

    #[test]
    fn test_single_axis_matrix() {
        let m = Matrix2::new(4.0, 0.0, 0.0, 0.0);
        assert!((anisotropy_of_matrix(&m) - 1.0).abs() < EPS);
        let m = Matrix2::new(1.0, 1.0, 1.0, 1.0);
        assert!((anisotropy_of_matrix(&m) - 1.0).abs() < EPS);
        let m = Matrix2::new(3.0, 0.0, 0.0, 1.0);
        assert!((anisotropy_of_matrix(&m) - 0.5).abs() < EPS);
    }

    #[test]
    fn test_anisotropy_bounds() {
        let values = [-3.0, -1.5, -0.2, 0.0, 0.1, 0.7, 2.0, 5.0];
        for a in values {
            for b in values {
                for c in values {
                    for d in values {
                        let root = Matrix2::new(a, b, c, d);
                        let m = root.transpose() * root;
                        let value = anisotropy_of_matrix(&m);
                        assert!((0.0..=1.0).contains(&value), "A = {value} for {m}");
                    }
                }
            }
        }
    }

    #[test]
    fn test_wrapped_pair_is_fully_anisotropic() {
        let earlier = Snapshot::new(
            "0",
            3,
            10.0,
            10.0,
            vec![point![0.0, 0.0], point![5.0, 0.0], point![9.0, 0.0]],
        );
        let later = Snapshot::new(
            "1",
            3,
            10.0,
            10.0,
            vec![point![1.0, 0.0], point![6.0, 0.0], point![0.5, 0.0]],
        );
        let field = DisplacementField::from_snapshots(&earlier, &later).unwrap();
        let m = covariance(&field, 3);
        assert!((m[(0, 0)] - 1.0 / 18.0).abs() < EPS);
        assert_f64_near!(m[(0, 1)], 0.0);
        assert_f64_near!(m[(1, 1)], 0.0);
        let value = pair_anisotropy(&earlier, &later, Normalization::Declared).unwrap();
        assert!((value - 1.0).abs() < EPS);
    }

    #[test]
    fn test_isotropic_field() {
        let earlier = vec![Point2::origin(); 4];
        let later = vec![
            point![1.0, 0.0],
            point![-1.0, 0.0],
            point![0.0, 1.0],
            point![0.0, -1.0],
        ];
        let field = DisplacementField::compute(&earlier, &later, 10.0).unwrap();
        let m = covariance(&field, 4);
        assert_f64_near!(m[(0, 0)], 0.5);
        assert_f64_near!(m[(1, 1)], 0.5);
        assert!(anisotropy(&field, 4).abs() < EPS);
    }

    #[test]
    fn test_nan_matrix_is_not_isotropic() {
        let m = Matrix2::new(f64::NAN, 0.0, 0.0, 1.0);
        assert!(anisotropy_of_matrix(&m).is_nan());
    }

    #[test]
    fn test_unusable_pairs_are_errors() {
        let positions = vec![point![0.0, 0.0], point![1.0, 1.0]];
        let moved = vec![point![0.5, 0.0], point![1.0, 1.5]];
        for lx in [0.0, f64::NAN] {
            let earlier = Snapshot::new("0", 2, lx, 10.0, positions.clone());
            let later = Snapshot::new("1", 2, lx, 10.0, moved.clone());
            let err = pair_anisotropy(&earlier, &later, Normalization::Declared).unwrap_err();
            assert!(matches!(err, AnalysisError::DegenerateField(_)), "lx = {lx}");
        }

        let earlier = Snapshot::new("0", 2, 10.0, 10.0, positions.clone());
        let later = Snapshot::new(
            "1",
            2,
            10.0,
            10.0,
            vec![point![0.5, 0.0], point![1.0, f64::INFINITY]],
        );
        let err = pair_anisotropy(&earlier, &later, Normalization::Declared).unwrap_err();
        assert!(matches!(err, AnalysisError::DegenerateField(_)));

        let earlier = Snapshot::new("0", 0, 10.0, 10.0, Vec::new());
        let later = Snapshot::new("1", 0, 10.0, 10.0, Vec::new());
        for normalization in [Normalization::Declared, Normalization::Parsed] {
            let err = pair_anisotropy(&earlier, &later, normalization).unwrap_err();
            assert!(matches!(err, AnalysisError::DegenerateField(_)));
        }

        let earlier = Snapshot::new("0", 0, 10.0, 10.0, positions);
        let later = Snapshot::new("1", 0, 10.0, 10.0, moved);
        let err = pair_anisotropy(&earlier, &later, Normalization::Declared).unwrap_err();
        assert!(matches!(err, AnalysisError::DegenerateField(_)));
        assert!(pair_anisotropy(&earlier, &later, Normalization::Parsed).is_ok());
    }

    #[cfg(feature = "clap")]
    #[test]
    fn test_normalization_value_names() {
        use clap::ValueEnum;
        assert_eq!(
            Normalization::from_str("declared", false).unwrap(),
            Normalization::Declared
        );
        assert_eq!(
            Normalization::from_str("parsed", false).unwrap(),
            Normalization::Parsed
        );
        assert!(Normalization::from_str("rows", false).is_err());
    }

    #[test]
    fn test_normalization_scales_matrix_only() {
        let earlier = Snapshot::new(
            "0",
            2,
            10.0,
            10.0,
            vec![point![0.0, 0.0], point![1.0, 1.0], point![2.0, 2.0]],
        );
        let later = Snapshot::new(
            "1",
            2,
            10.0,
            10.0,
            vec![point![0.5, 0.1], point![1.0, 1.3], point![2.2, 1.9]],
        );
        let field = DisplacementField::from_snapshots(&earlier, &later).unwrap();
        let declared = covariance(&field, earlier.declared_count);
        let parsed = covariance(&field, field.len());
        assert!((declared * 2.0 - parsed * 3.0).norm() < EPS);
        let a_declared = pair_anisotropy(&earlier, &later, Normalization::Declared).unwrap();
        let a_parsed = pair_anisotropy(&earlier, &later, Normalization::Parsed).unwrap();
        assert!((a_declared - a_parsed).abs() < EPS);
    }
}
