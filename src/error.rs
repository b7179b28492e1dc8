use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Clone)]
pub struct AppError {
    exit_code: u8,
    message: String,
}

impl AppError {
    pub fn new(exit_code: u8, message: impl Into<String>) -> Self {
        Self {
            exit_code,
            message: message.into(),
        }
    }

    pub fn exit_code(&self) -> u8 {
        self.exit_code
    }
}

impl std::fmt::Display for AppError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl std::fmt::Debug for AppError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppError")
            .field("exit_code", &self.exit_code)
            .field("message", &self.message)
            .finish()
    }
}

impl std::error::Error for AppError {}

/// Why a single nonlinear fit did not produce a curve.
///
/// These are recorded per bootstrap trial and never abort a batch.
#[derive(Debug, Clone, PartialEq, Error, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum FitFailure {
    #[error("initial guess contains non-finite values")]
    NonFiniteStart,
    #[error("only {distinct_times} distinct time points; at least 3 are needed")]
    RankDeficient { distinct_times: usize },
    #[error("singular gradient at iteration {iteration}")]
    SingularGradient { iteration: usize },
    #[error("step factor reduced below minimum at iteration {iteration}")]
    StepFactorReduced { iteration: usize },
    #[error("no convergence within {max_iterations} iterations")]
    IterationLimit { max_iterations: usize },
    #[error("non-finite residuals at iteration {iteration}")]
    NonFinite { iteration: usize },
}

impl FitFailure {
    /// Short machine-friendly label used in exports.
    pub fn label(&self) -> &'static str {
        match self {
            FitFailure::NonFiniteStart => "non_finite_start",
            FitFailure::RankDeficient { .. } => "rank_deficient",
            FitFailure::SingularGradient { .. } => "singular_gradient",
            FitFailure::StepFactorReduced { .. } => "step_factor_reduced",
            FitFailure::IterationLimit { .. } => "iteration_limit",
            FitFailure::NonFinite { .. } => "non_finite",
        }
    }
}

/// Errors surfaced by the bootstrap fitter to its caller.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum BootstrapError {
    #[error("invalid configuration: {0}")]
    InvalidConfiguration(String),
    #[error("insufficient samples: {successful} successful fits, at least {required} required")]
    InsufficientSamples { successful: usize, required: usize },
    #[error("fit failed: {0}")]
    Fit(#[from] FitFailure),
}

impl From<BootstrapError> for AppError {
    fn from(err: BootstrapError) -> Self {
        let code = match err {
            BootstrapError::InvalidConfiguration(_) => 2,
            BootstrapError::InsufficientSamples { .. } | BootstrapError::Fit(_) => 4,
        };
        AppError::new(code, err.to_string())
    }
}
