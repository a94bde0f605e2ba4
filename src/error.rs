use thiserror::Error;

// Unified error type for krysolve

/// Fatal conditions raised by solvers and preconditioners.
///
/// Soft non-convergence is never an error: it is reported through
/// `SolveStats::converged == false`.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum KError {
    /// Singular system: zero pivot in Gaussian elimination or a vanishing
    /// diagonal entry of the IDR(s) projection matrix.
    #[error("singular matrix in {context} (index {index})")]
    SingularMatrix { context: &'static str, index: usize },
    /// The stabilization (relaxation) factor of a Krylov recurrence vanished.
    #[error("stabilization breakdown in {context} at iteration {iteration}")]
    StabilizationBreakdown { context: &'static str, iteration: usize },
    /// Structurally missing diagonal entry required by a relaxation sweep.
    #[error("zero pivot at row {0}")]
    ZeroPivot(usize),
    #[error("dimension mismatch: expected {expected}, found {found}")]
    DimensionMismatch { expected: usize, found: usize },
    #[error("invalid parameter: {0}")]
    InvalidParameter(String),
    #[error("unsupported operation: {0}")]
    Unsupported(&'static str),
}
