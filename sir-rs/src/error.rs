use thiserror::Error;

pub type SimResult<T> = Result<T, SimError>;

#[derive(Debug, Error)]
pub enum SimError {
    #[error("unknown disease '{key}'")]
    UnknownDisease { key: String },

    #[error("invalid {field} = {value}: {reason}")]
    InvalidParameter {
        field: &'static str,
        value: f64,
        reason: &'static str,
    },

    #[error("numerical instability at t = {time}: {reason}")]
    NumericalInstability { time: f64, reason: String },

    #[error("degenerate recovery rate gamma = {gamma}, R0 is undefined")]
    DegenerateRate { gamma: f64 },

    #[error("solver used its budget of {max_steps} steps before reaching t = {time}")]
    StepBudgetExceeded { max_steps: usize, time: f64 },

    #[error("trajectory has no samples")]
    EmptyTrajectory,

    #[error("invalid disease profile '{key}': {reason}")]
    InvalidProfile { key: String, reason: String },

    #[error("disease '{key}' requested more than once")]
    DuplicateRun { key: String },

    #[error("{disease}: {source}")]
    Run {
        disease: String,
        #[source]
        source: Box<SimError>,
    },

    #[error("missing input: {0}")]
    MissingInput(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("TOML error: {0}")]
    Toml(#[from] toml::de::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),
}

impl SimError {
    pub(crate) fn invalid(field: &'static str, value: f64, reason: &'static str) -> Self {
        Self::InvalidParameter {
            field,
            value,
            reason,
        }
    }

    pub(crate) fn instability(time: f64, reason: impl Into<String>) -> Self {
        Self::NumericalInstability {
            time,
            reason: reason.into(),
        }
    }

    pub(crate) fn in_run(disease: impl Into<String>, source: SimError) -> Self {
        Self::Run {
            disease: disease.into(),
            source: Box::new(source),
        }
    }

    /// The innermost error beneath any per-run context.
    pub fn cause(&self) -> &SimError {
        match self {
            Self::Run { source, .. } => source.cause(),
            other => other,
        }
    }

    /// Disease key the error is attributed to, if any.
    pub fn disease(&self) -> Option<&str> {
        match self {
            Self::Run { disease, .. } => Some(disease),
            Self::UnknownDisease { key } | Self::DuplicateRun { key } => Some(key),
            _ => None,
        }
    }
}
