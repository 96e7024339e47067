use anyhow::{Context, Result};
use log::{debug, info, warn};
use regex::Regex;
use std::fs::read_dir;
use std::path::{Path, PathBuf};

use crate::error::{AnalysisError, AnalysisResult};
use crate::math::IteratorAvg;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SampleStats {
    pub count: usize,
    pub mean: f64,
    pub std: f64,
}

impl SampleStats {
    /// Mean and population standard deviation, undefined without samples.
    pub fn from_samples(param: f64, samples: &[f64]) -> AnalysisResult<Self> {
        let (mean, std) = samples
            .iter()
            .copied()
            .avg_with_std()
            .ok_or(AnalysisError::UndefinedAggregate { param })?;
        Ok(Self {
            count: samples.len(),
            mean,
            std,
        })
    }
}

/// Aggregates keyed by a control parameter, ordered by parameter.
///
/// Parameters whose aggregate could not be computed are kept apart in
/// [`Sweep::undefined`] and never show up among the points.
#[derive(Debug, Clone)]
pub struct Sweep<T> {
    points: Vec<(f64, T)>,
    undefined: Vec<f64>,
}

impl<T> Default for Sweep<T> {
    fn default() -> Self {
        Self {
            points: Vec::new(),
            undefined: Vec::new(),
        }
    }
}

impl<T> Sweep<T> {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(&mut self, param: f64, value: AnalysisResult<T>) {
        self.points.retain(|(p, _)| *p != param);
        self.undefined.retain(|p| *p != param);
        match value {
            Ok(value) => {
                self.points.push((param, value));
                self.points.sort_by(|a, b| a.0.total_cmp(&b.0));
            }
            Err(err) => {
                if matches!(err, AnalysisError::UndefinedAggregate { .. }) {
                    info!("{err}");
                } else {
                    warn!("parameter value {param}: {err}");
                }
                self.undefined.push(param);
                self.undefined.sort_by(f64::total_cmp);
            }
        }
    }

    #[must_use]
    pub fn get(&self, param: f64) -> Option<&T> {
        self.points
            .iter()
            .find(|(p, _)| *p == param)
            .map(|(_, value)| value)
    }

    #[inline]
    #[must_use]
    pub fn points(&self) -> &[(f64, T)] {
        &self.points
    }

    #[inline]
    #[must_use]
    pub fn undefined(&self) -> &[f64] {
        &self.undefined
    }

    /// Numeric series for plotting.
    pub fn series<F>(&self, f: F) -> Vec<(f64, f64)>
    where
        F: Fn(&T) -> f64,
    {
        self.points.iter().map(|(p, value)| (*p, f(value))).collect()
    }
}

impl<T> FromIterator<(f64, AnalysisResult<T>)> for Sweep<T> {
    fn from_iter<I: IntoIterator<Item = (f64, AnalysisResult<T>)>>(iter: I) -> Self {
        iter.into_iter().fold(Self::new(), |mut sweep, (param, value)| {
            sweep.record(param, value);
            sweep
        })
    }
}

/// Extracts a control parameter from a directory name: the number right
/// after the last occurrence of the key, e.g. `delta0.150` or `fx_ext0.001`.
#[derive(Debug, Clone)]
pub struct ParamPattern {
    re: Regex,
}

impl ParamPattern {
    pub fn new(key: &str) -> Result<Self> {
        let re = Regex::new(&format!(
            r"{}([-+]?\d+(?:\.\d*)?(?:[eE][-+]?\d+)?)",
            regex::escape(key)
        ))?;
        Ok(Self { re })
    }

    #[must_use]
    pub fn parse(&self, name: &str) -> Option<f64> {
        self.re
            .captures_iter(name)
            .last()
            .and_then(|caps| caps[1].parse::<f64>().ok())
    }
}

#[derive(Debug, Clone)]
pub struct SweepDir {
    pub path: PathBuf,
    pub param: f64,
}

/// Sub-directories of `base` whose names carry `key`, ordered by parameter.
pub fn get_sweep_dirs(base: &Path, key: &str) -> Result<Vec<SweepDir>> {
    let pattern = ParamPattern::new(key)?;
    let mut dirs = Vec::new();
    for entry in read_dir(base).with_context(|| format!("Reading {}", base.display()))? {
        let path = entry?.path();
        if !path.is_dir() {
            continue;
        }
        let name = path
            .file_name()
            .unwrap_or_default()
            .to_string_lossy()
            .into_owned();
        match pattern.parse(&name) {
            Some(param) => dirs.push(SweepDir { path, param }),
            None => debug!("{name}: no {key} value, ignored"),
        }
    }
    dirs.sort_by(|a, b| a.param.total_cmp(&b.param));
    Ok(dirs)
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_float_eq::assert_f64_near;
    use std::fs;

    const FLOW_DIR: &str = "Flow_N900_alpha2.500_phi1.200_delta0.150_gamma3.000_w0.500\
                            _sigm_obs10.000_K10.000_fx_ext0.001000_dt0.100";

    #[test]
    fn test_param_pattern() {
        let delta = ParamPattern::new("delta").unwrap();
        assert_f64_near!(delta.parse(FLOW_DIR).unwrap(), 0.15);
        let force = ParamPattern::new("fx_ext").unwrap();
        assert_f64_near!(force.parse(FLOW_DIR).unwrap(), 0.001);
        assert_f64_near!(force.parse("run_fx_ext1e-3").unwrap(), 0.001);
        let phi = ParamPattern::new("phi").unwrap();
        assert_f64_near!(phi.parse("phi0.9_x_phi1.2").unwrap(), 1.2);
        assert!(delta.parse("Flow_N900_alpha2.500").is_none());
    }

    #[test]
    fn test_sample_stats() {
        let stats = SampleStats::from_samples(0.1, &[0.2, 0.4, 0.6]).unwrap();
        assert_eq!(stats.count, 3);
        assert!((stats.mean - 0.4).abs() < 1e-12);
        assert!((stats.std - (0.08_f64 / 3.0).sqrt()).abs() < 1e-12);
        assert!(matches!(
            SampleStats::from_samples(0.1, &[]),
            Err(AnalysisError::UndefinedAggregate { .. })
        ));
    }

    #[test]
    fn test_sweep_skips_undefined() {
        let sweep = [
            (0.3, SampleStats::from_samples(0.3, &[0.5])),
            (0.0, SampleStats::from_samples(0.0, &[0.1, 0.3])),
            (0.05, SampleStats::from_samples(0.05, &[])),
        ]
        .into_iter()
        .collect::<Sweep<_>>();
        assert_eq!(sweep.points().len(), 2);
        assert!(sweep.get(0.05).is_none());
        assert_eq!(sweep.undefined(), &[0.05]);
        let series = sweep.series(|stats| stats.mean);
        assert_eq!(series.len(), 2);
        assert_f64_near!(series[0].0, 0.0);
        assert!((series[0].1 - 0.2).abs() < 1e-12);
        assert_f64_near!(series[1].0, 0.3);
        assert!(series.iter().all(|(p, _)| *p != 0.05));
    }

    #[test]
    fn test_sweep_record_replaces() {
        let mut sweep = Sweep::new();
        sweep.record(1.0, Err(AnalysisError::UndefinedAggregate { param: 1.0 }));
        sweep.record(1.0, Ok(50.0));
        assert_eq!(sweep.get(1.0), Some(&50.0));
        assert!(sweep.undefined().is_empty());
    }

    #[test]
    fn test_get_sweep_dirs() {
        let base = tempfile::tempdir().unwrap();
        for name in [
            "Flow_delta0.150_fx_ext0.001",
            "Flow_delta0.001_fx_ext0.001",
            "Flow_nothing",
        ] {
            fs::create_dir(base.path().join(name)).unwrap();
        }
        fs::write(base.path().join("Flow_delta0.3_notes"), "").unwrap();
        let dirs = get_sweep_dirs(base.path(), "delta").unwrap();
        assert_eq!(dirs.len(), 2);
        assert_f64_near!(dirs[0].param, 0.001);
        assert_f64_near!(dirs[1].param, 0.15);
        assert!(dirs[1].path.ends_with("Flow_delta0.150_fx_ext0.001"));
        assert!(get_sweep_dirs(&base.path().join("absent"), "delta").is_err());
    }
}
