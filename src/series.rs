use log::{debug, error, warn};
use std::path::{Path, PathBuf};

use crate::anisotropy::{pair_anisotropy, Normalization};
use crate::error::{AnalysisError, AnalysisResult};
use crate::snapshot::{HeaderLayout, Snapshot};

/// Snapshot files are named `<prefix><index>` with the index zero-padded to
/// one of `widths`, tried in order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SnapshotNaming {
    pub prefix: String,
    pub widths: Vec<usize>,
}

impl Default for SnapshotNaming {
    fn default() -> Self {
        Self {
            prefix: "data_".to_string(),
            widths: vec![4, 5],
        }
    }
}

impl SnapshotNaming {
    #[must_use]
    pub fn file_name(&self, index: usize, width: usize) -> String {
        format!("{}{index:0width$}", self.prefix)
    }

    /// Both files have to exist under the same padding width.
    pub fn resolve_pair(
        &self,
        dir: &Path,
        first: usize,
        second: usize,
    ) -> AnalysisResult<(PathBuf, PathBuf)> {
        for &width in &self.widths {
            let a = dir.join(self.file_name(first, width));
            let b = dir.join(self.file_name(second, width));
            if a.is_file() && b.is_file() {
                return Ok((a, b));
            }
        }
        let width = self.widths.first().copied().unwrap_or_default();
        let a = dir.join(self.file_name(first, width));
        let missing = if a.is_file() {
            dir.join(self.file_name(second, width))
        } else {
            a
        };
        Err(AnalysisError::MissingFile(missing))
    }
}

/// Pairs `(i, i + step)` for `i` in `start..end` by `step`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PairSchedule {
    pub start: usize,
    pub step: usize,
    pub end: usize,
}

impl Default for PairSchedule {
    fn default() -> Self {
        Self {
            start: 1000,
            step: 120,
            end: 9999,
        }
    }
}

impl PairSchedule {
    pub fn pairs(&self) -> impl Iterator<Item = (usize, usize)> {
        let step = self.step.max(1);
        (self.start..self.end)
            .step_by(step)
            .map(move |i| (i, i + step))
    }
}

#[derive(Debug, Clone, Default)]
pub struct SeriesConfig {
    pub naming: SnapshotNaming,
    pub schedule: PairSchedule,
    pub layout: HeaderLayout,
    pub normalization: Normalization,
}

#[derive(Debug, Clone)]
pub struct PairSample {
    pub first: PathBuf,
    pub second: PathBuf,
    pub indices: (usize, usize),
    pub anisotropy: f64,
}

pub fn pair_sample(
    dir: &Path,
    config: &SeriesConfig,
    first: usize,
    second: usize,
) -> AnalysisResult<PairSample> {
    let (first_path, second_path) = config.naming.resolve_pair(dir, first, second)?;
    let earlier = Snapshot::read_with_layout(&first_path, config.layout)?;
    let later = Snapshot::read_with_layout(&second_path, config.layout)?;
    let anisotropy = pair_anisotropy(&earlier, &later, config.normalization)?;
    Ok(PairSample {
        first: first_path,
        second: second_path,
        indices: (first, second),
        anisotropy,
    })
}

/// Anisotropy of every scheduled pair in `dir`. Failing pairs are logged and
/// left out.
pub fn anisotropy_samples(dir: &Path, config: &SeriesConfig) -> Vec<PairSample> {
    config
        .schedule
        .pairs()
        .filter_map(|(i, j)| match pair_sample(dir, config, i, j) {
            Ok(sample) => {
                debug!(
                    "{} -> {}: A = {:.6}",
                    sample.first.display(),
                    sample.second.display(),
                    sample.anisotropy
                );
                Some(sample)
            }
            Err(err) if err.is_data_error() => {
                warn!("{}: skipping pair {i} -> {j}: {err}", dir.display());
                None
            }
            Err(err) => {
                error!("{}: pair {i} -> {j} failed: {err}", dir.display());
                None
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::snapshot::tests::write_file;

    #[test]
    fn test_file_name() {
        let naming = SnapshotNaming::default();
        assert_eq!(naming.file_name(120, 4), "data_0120");
        assert_eq!(naming.file_name(8090, 4), "data_8090");
        assert_eq!(naming.file_name(8090, 5), "data_08090");
        assert_eq!(naming.file_name(10090, 4), "data_10090");
    }

    #[test]
    fn test_schedule() {
        let schedule = PairSchedule {
            start: 1000,
            step: 120,
            end: 1300,
        };
        assert_eq!(
            schedule.pairs().collect::<Vec<_>>(),
            vec![(1000, 1120), (1120, 1240), (1240, 1360)]
        );
        let empty = PairSchedule {
            start: 10,
            step: 5,
            end: 10,
        };
        assert_eq!(empty.pairs().count(), 0);
    }

    #[test]
    fn test_resolve_pair_widths() {
        let dir = tempfile::tempdir().unwrap();
        let naming = SnapshotNaming::default();
        write_file(dir.path(), "data_1000", "");
        write_file(dir.path(), "data_01120", "");
        write_file(dir.path(), "data_01000", "");
        let (a, b) = naming.resolve_pair(dir.path(), 1000, 1120).unwrap();
        assert_eq!(a, dir.path().join("data_01000"));
        assert_eq!(b, dir.path().join("data_01120"));

        write_file(dir.path(), "data_1240", "");
        let (a, b) = naming.resolve_pair(dir.path(), 1000, 1240).unwrap();
        assert_eq!(a, dir.path().join("data_1000"));
        assert_eq!(b, dir.path().join("data_1240"));

        match naming.resolve_pair(dir.path(), 1000, 1360) {
            Err(AnalysisError::MissingFile(path)) => {
                assert_eq!(path, dir.path().join("data_1360"));
            }
            other => panic!("unexpected result: {other:?}"),
        }
    }

    #[test]
    fn test_anisotropy_samples_skip_bad_pairs() {
        let dir = tempfile::tempdir().unwrap();
        let frame = |rows: &str| format!("0.0 3 10.0 10.0\n{rows}");
        write_file(dir.path(), "data_0010", &frame("0 0\n5 0\n9 0\n"));
        write_file(dir.path(), "data_0020", &frame("1 0\n6 0\n0.5 0\n"));
        write_file(dir.path(), "data_0030", "0.0 3 10.0\n");
        write_file(dir.path(), "data_0040", &frame("1 1\n6 2\n0.5 3\n"));
        let config = SeriesConfig {
            schedule: PairSchedule {
                start: 10,
                step: 10,
                end: 50,
            },
            ..SeriesConfig::default()
        };
        let samples = anisotropy_samples(dir.path(), &config);
        assert_eq!(samples.len(), 1);
        assert_eq!(samples[0].indices, (10, 20));
        assert!((samples[0].anisotropy - 1.0).abs() < 1e-12);
    }
}
