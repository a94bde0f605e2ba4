//! Convergence tracking & tolerance checks for iterative solvers.

use crate::core::traits::Real;

/// Stopping criteria.
///
/// With `relative == true` the residual is measured against a reference norm
/// (usually `‖b‖`); a zero reference falls back to the absolute test.
#[derive(Clone, Debug, PartialEq)]
pub struct Convergence<T> {
    pub tol: T,
    pub max_iters: usize,
    pub relative: bool,
}

#[derive(Clone, Debug, PartialEq)]
pub struct SolveStats<T> {
    pub iterations: usize,
    pub final_residual: T,
    pub converged: bool,
}

impl<T: Real> SolveStats<T> {
    /// Stats of a driver that has not solved anything yet.
    pub fn unset() -> Self {
        Self { iterations: 0, final_residual: -T::one(), converged: false }
    }
}

impl<T: Real> Convergence<T> {
    pub fn new(tol: T, max_iters: usize, relative: bool) -> Self {
        Self { tol, max_iters, relative }
    }

    /// Divisor applied to residual norms before they are compared with `tol`.
    pub fn reference_norm(&self, norm_b: T) -> T {
        if norm_b == T::zero() || !self.relative { T::one() } else { norm_b }
    }

    /// Returns (converged, stats) for the scaled residual `resid` at iteration `i`.
    pub fn check(&self, resid: T, i: usize) -> (bool, SolveStats<T>) {
        let converged = resid <= self.tol;
        (converged, SolveStats { iterations: i, final_residual: resid, converged })
    }

    /// Stats of a run that spent `i` iterations without meeting the tolerance.
    pub fn exhausted(&self, resid: T, i: usize) -> SolveStats<T> {
        SolveStats { iterations: i, final_residual: resid, converged: false }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn relative_reference_falls_back_to_one() {
        let rel = Convergence::new(1e-6, 10, true);
        assert_eq!(rel.reference_norm(4.0), 4.0);
        assert_eq!(rel.reference_norm(0.0), 1.0);
        let abs = Convergence::new(1e-6, 10, false);
        assert_eq!(abs.reference_norm(4.0), 1.0);
    }

    #[test]
    fn check_is_inclusive() {
        let conv = Convergence::new(0.0, 10, false);
        let (ok, stats) = conv.check(0.0, 0);
        assert!(ok && stats.converged);
        assert_eq!(stats.iterations, 0);
    }
}
