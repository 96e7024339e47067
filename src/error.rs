use std::fmt;
use std::io;
use std::path::PathBuf;

#[derive(Debug)]
pub enum AnalysisError {
    MissingFile(PathBuf),
    MalformedHeader {
        path: PathBuf,
        reason: String,
    },
    MalformedRow {
        path: PathBuf,
        line: usize,
        reason: String,
    },
    ParticleCountMismatch {
        expected: usize,
        found: usize,
    },
    /// Displacements that cannot be reduced: empty, zero divisor, bad box or
    /// non-finite values.
    DegenerateField(String),
    MalformedLog {
        path: PathBuf,
        reason: String,
    },
    UndefinedAggregate {
        param: f64,
    },
    Io {
        path: PathBuf,
        source: io::Error,
    },
}

impl AnalysisError {
    /// Opening errors are split so that an absent file is told apart
    /// from e.g. a permission failure.
    pub(crate) fn from_io(path: PathBuf, source: io::Error) -> Self {
        if source.kind() == io::ErrorKind::NotFound {
            Self::MissingFile(path)
        } else {
            Self::Io { path, source }
        }
    }

    /// Data errors a sweep skips over with a warning. Everything else is
    /// reported as an error but still only costs one pair or run.
    #[must_use]
    pub fn is_data_error(&self) -> bool {
        !matches!(self, Self::Io { .. })
    }
}

impl fmt::Display for AnalysisError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::MissingFile(path) => write!(f, "missing file: {}", path.display()),
            Self::MalformedHeader { path, reason } => {
                write!(f, "{}: malformed header: {reason}", path.display())
            }
            Self::MalformedRow { path, line, reason } => {
                write!(f, "{}:{line}: malformed row: {reason}", path.display())
            }
            Self::ParticleCountMismatch { expected, found } => {
                write!(f, "particle count mismatch: expected {expected}, found {found}")
            }
            Self::DegenerateField(reason) => write!(f, "degenerate displacement field: {reason}"),
            Self::MalformedLog { path, reason } => {
                write!(f, "{}: malformed run log: {reason}", path.display())
            }
            Self::UndefinedAggregate { param } => {
                write!(f, "no valid samples for parameter value {param}")
            }
            Self::Io { path, source } => write!(f, "{}: {source}", path.display()),
        }
    }
}

impl std::error::Error for AnalysisError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Io { source, .. } => Some(source),
            _ => None,
        }
    }
}

pub type AnalysisResult<T> = Result<T, AnalysisError>;
