mod anisotropy;
mod displacement;
mod energy_log;
mod error;
mod math;
mod series;
mod snapshot;
mod sweep;

pub use anisotropy::{anisotropy, anisotropy_of_matrix, covariance, pair_anisotropy, Normalization};
pub use displacement::{minimum_image, DisplacementField};
pub use energy_log::{
    classify_log, flow_counts, read_final_energies, FlowCounts, FlowState, Tolerance,
};
pub use error::{AnalysisError, AnalysisResult};
pub use math::IteratorAvg;
pub use series::{
    anisotropy_samples, pair_sample, PairSample, PairSchedule, SeriesConfig, SnapshotNaming,
};
pub use snapshot::{HeaderLayout, Snapshot};
pub use sweep::{get_sweep_dirs, ParamPattern, SampleStats, Sweep, SweepDir};
